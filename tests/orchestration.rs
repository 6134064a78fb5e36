//! End-to-end runs through the public library API: orchestrator, workers,
//! reporting channel and the display loop, against the simulated backend.

use inference_latency_tester::{
    logging::Logger,
    models::{BenchConfig, WorkerExit},
    orchestrator::Orchestrator,
    reporting::{self, ResultsBoard},
    sdk::{ModelDescriptor, SimulatedBackend, DESCRIPTOR_FILE},
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn setup(threads: usize, interval_ms: u64) -> (TempDir, BenchConfig) {
    let dir = TempDir::new().unwrap();
    let image_path = SimulatedBackend::write_example_model(dir.path()).unwrap();
    let config = BenchConfig {
        model_dir: dir.path().to_path_buf(),
        image_path,
        threads,
        interval_ms,
        history_capacity: 5,
        refresh_ms: 20,
        enable_color: false,
        ..Default::default()
    };
    (dir, config)
}

fn orchestrator() -> Orchestrator<SimulatedBackend> {
    let (logger, _) = Logger::buffered("TEST".to_string());
    Orchestrator::new(Arc::new(SimulatedBackend::with_latency_scale(0.0)), logger)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_paced_run_fills_every_row() {
    let (_dir, config) = setup(3, 20);
    let (sink, receiver) = reporting::channel();

    let mut refreshes = 0u32;
    let display = tokio::spawn(async move {
        let board = reporting::drain(receiver, ResultsBoard::new(5), Duration::from_millis(20), |_| {
            refreshes += 1
        })
        .await;
        (board, refreshes)
    });

    let mut orch = orchestrator();
    assert!(orch.start(&config, sink).unwrap());
    tokio::time::sleep(Duration::from_millis(300)).await;
    orch.stop();
    let exits = tokio::task::spawn_blocking(move || orch.join()).await.unwrap();

    let (board, refreshes) = display.await.unwrap();
    assert!(refreshes >= 2);
    assert_eq!(exits.len(), 3);
    assert!(exits.iter().all(WorkerExit::is_clean));
    assert!(board.all_stopped());

    for row in board.rows() {
        assert!(row.last_ms.is_some(), "worker {} never reported", row.worker);
        assert!(row.history.len() <= 5);
        assert_eq!(row.history.latest(), row.last_ms);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_restart_resets_board() {
    let (_dir, mut config) = setup(3, 20);
    let (sink, receiver) = reporting::channel();
    let display = tokio::spawn(reporting::drain(
        receiver,
        ResultsBoard::new(5),
        Duration::from_millis(20),
        |_| {},
    ));

    let mut orch = orchestrator();
    orch.start(&config, sink.clone()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    orch.stop();
    let (mut orch, _) = tokio::task::spawn_blocking(move || {
        let exits = orch.join();
        (orch, exits)
    })
    .await
    .unwrap();

    config.threads = 1;
    orch.start(&config, sink).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    orch.stop();
    let exits = tokio::task::spawn_blocking(move || orch.join()).await.unwrap();
    assert_eq!(exits.len(), 1);

    let board = display.await.unwrap();
    assert_eq!(board.rows().len(), 1);
}

#[test]
fn test_pacing_bounds_sample_rate() {
    let (_dir, config) = setup(1, 50);
    let (sink, mut receiver) = reporting::channel();

    let mut orch = orchestrator();
    orch.start(&config, sink).unwrap();
    std::thread::sleep(Duration::from_millis(500));
    orch.stop();
    orch.join();

    let mut board = ResultsBoard::new(50);
    while let Some(event) = receiver.try_recv() {
        board.apply(event);
    }
    let samples = board.row(0).unwrap().stats.count;
    // One per 50 ms tick over half a second, allowing for scheduler slack
    assert!(samples >= 3, "only {} samples", samples);
    assert!(samples <= 12, "{} samples", samples);
}

#[test]
fn test_missing_module_fails_every_worker() {
    let (_dir, mut config) = setup(2, 20);
    config.module_id = Some("no-such-variant".to_string());
    let (sink, _receiver) = reporting::channel();

    let mut orch = orchestrator();
    orch.start(&config, sink).unwrap();
    while !orch.all_finished() {
        std::thread::sleep(Duration::from_millis(5));
    }
    let exits = orch.join();
    assert!(exits.iter().all(|e| matches!(e, WorkerExit::LoadFailed { .. })));
}

#[test]
fn test_burst_with_missing_image_fails() {
    let (_dir, mut config) = setup(2, 20);
    config.image_path = config.model_dir.join("missing.png");

    let err = orchestrator().run_burst(&config, 2).unwrap_err();
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn test_worker_panic_is_collected_by_join() {
    let (_dir, config) = setup(2, 20);
    let mut descriptor = ModelDescriptor::example();
    for module in &mut descriptor.modules {
        module.panic_on_call = Some(2);
    }
    std::fs::write(
        config.model_dir.join(DESCRIPTOR_FILE),
        serde_json::to_string(&descriptor).unwrap(),
    )
    .unwrap();
    let (sink, mut receiver) = reporting::channel();

    let mut orch = orchestrator();
    orch.start(&config, sink).unwrap();
    while !orch.all_finished() {
        std::thread::sleep(Duration::from_millis(5));
    }
    let exits = orch.join();
    assert_eq!(
        exits,
        vec![WorkerExit::Panicked { worker: 0 }, WorkerExit::Panicked { worker: 1 }]
    );

    let mut board = ResultsBoard::new(5);
    while let Some(event) = receiver.try_recv() {
        board.apply(event);
    }
    assert!(board.all_stopped());
    // the first call of each worker completed before the crash
    for row in board.rows() {
        assert_eq!(row.stats.count, 1);
    }
}
