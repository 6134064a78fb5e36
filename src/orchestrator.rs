//! Run lifecycle: spawning workers, stopping them and collecting their exits
//!
//! A run goes idle → running → stopping → idle. Configuration is read once
//! when the run starts; nothing a worker sees changes until the next run.

use crate::error::{AppError, Result};
use crate::logging::Logger;
use crate::models::{BenchConfig, BurstRound, WorkerExit};
use crate::pacing::StopSignal;
use crate::reporting::ReportingSink;
use crate::sdk::{open_pipeline, InferenceBackend, Pipeline};
use crate::worker::Worker;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

struct ActiveRun {
    stop: StopSignal,
    sink: ReportingSink,
    handles: Vec<(usize, JoinHandle<WorkerExit>)>,
}

/// Starts and stops runs of paced workers
pub struct Orchestrator<B: InferenceBackend> {
    backend: Arc<B>,
    logger: Logger,
    active: Option<ActiveRun>,
}

impl<B: InferenceBackend> Orchestrator<B> {
    pub fn new(backend: Arc<B>, logger: Logger) -> Self {
        Self {
            backend,
            logger,
            active: None,
        }
    }

    /// True between `start` and `join`; configuration is locked meanwhile
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Spawn one worker per configured thread.
    ///
    /// Returns `Ok(false)` without doing anything if a run is already active.
    pub fn start(&mut self, config: &BenchConfig, sink: ReportingSink) -> Result<bool> {
        if self.is_running() {
            self.logger.warn("start ignored: run already active").log();
            return Ok(false);
        }
        config.validate()?;

        let config = Arc::new(config.clone());
        let stop = StopSignal::new();
        sink.run_started(config.threads);

        let mut handles = Vec::with_capacity(config.threads);
        for index in 0..config.threads {
            let worker = Worker::new(
                index,
                Arc::clone(&config),
                Arc::clone(&self.backend),
                stop.clone(),
                sink.clone(),
                &self.logger,
            );
            let spawned = thread::Builder::new()
                .name(format!("ilt-worker-{}", index))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => handles.push((index, handle)),
                Err(e) => {
                    stop.stop();
                    for (_, handle) in handles {
                        let _ = handle.join();
                    }
                    return Err(AppError::internal(format!("cannot spawn worker {}: {}", index, e)));
                }
            }
        }

        self.logger
            .info("run started")
            .field("threads", config.threads)
            .field("interval_ms", config.interval_ms)
            .field("model_dir", config.model_dir.display().to_string())
            .log();

        self.active = Some(ActiveRun { stop, sink, handles });
        Ok(true)
    }

    /// True once every worker of the active run has returned on its own,
    /// which only happens when none could create a pipeline
    pub fn all_finished(&self) -> bool {
        match &self.active {
            Some(run) => run.handles.iter().all(|(_, handle)| handle.is_finished()),
            None => true,
        }
    }

    /// Signal every worker to stop. Returns false when idle or already stopping.
    pub fn stop(&self) -> bool {
        match &self.active {
            Some(run) => {
                let flipped = run.stop.stop();
                if flipped {
                    self.logger.info("stop requested").log();
                }
                flipped
            }
            None => false,
        }
    }

    /// Wait for every worker of the active run and return to idle.
    ///
    /// Blocks until the workers observe a stop; call [`stop`](Self::stop)
    /// first. Exits are ordered by worker index.
    pub fn join(&mut self) -> Vec<WorkerExit> {
        let Some(run) = self.active.take() else {
            return Vec::new();
        };

        let mut exits = Vec::with_capacity(run.handles.len());
        for (index, handle) in run.handles {
            let exit = match handle.join() {
                Ok(exit) => exit,
                Err(_) => {
                    self.logger.error("worker panicked").field("worker", index).log();
                    let exit = WorkerExit::Panicked { worker: index };
                    run.sink.worker_exited(exit.clone());
                    exit
                }
            };
            exits.push(exit);
        }

        let clean = exits.iter().filter(|e| e.is_clean()).count();
        self.logger
            .info("run finished")
            .field("workers", exits.len())
            .field("clean_exits", clean)
            .log();
        exits
    }

    /// Fire every pipeline once per round, all at the same time.
    ///
    /// One model is loaded and shared; each thread gets its own pipeline and
    /// its own decoded request. Per-call failures are recorded as `None`.
    pub fn run_burst(&self, config: &BenchConfig, runs: u32) -> Result<Vec<BurstRound>> {
        if self.is_running() {
            return Err(AppError::config("cannot start a burst while a paced run is active"));
        }
        config.validate()?;
        if runs == 0 {
            return Err(AppError::config("Burst run count must be greater than 0"));
        }

        let model = self.backend.load_model(&config.model_dir)?;
        let mut pipelines = Vec::with_capacity(config.threads);
        let mut requests = Vec::with_capacity(config.threads);
        let mut module_id = String::new();
        for _ in 0..config.threads {
            let (id, pipeline) =
                open_pipeline(&model, config.module_id.as_deref(), config.variant_order, config.device())?;
            module_id = id;
            pipelines.push(pipeline);
            requests.push(self.backend.decode_image(&config.image_path)?);
        }

        self.logger
            .info("burst started")
            .field("threads", config.threads)
            .field("runs", runs)
            .field("module_id", &module_id)
            .log();

        let mut rounds = Vec::with_capacity(runs as usize);
        for round in 1..=runs {
            let started = Instant::now();
            let thread_costs_ms = thread::scope(|scope| {
                let handles: Vec<_> = pipelines
                    .iter_mut()
                    .zip(requests.iter())
                    .map(|(pipeline, request)| {
                        scope.spawn(move || {
                            let call = Instant::now();
                            pipeline.run(request).map(|_| call.elapsed().as_secs_f64() * 1000.0)
                        })
                    })
                    .collect();

                handles
                    .into_iter()
                    .enumerate()
                    .map(|(thread_index, handle)| match handle.join() {
                        Ok(Ok(ms)) => Some(ms),
                        Ok(Err(e)) => {
                            self.logger
                                .warn("burst call failed")
                                .field("round", round)
                                .field("thread", thread_index)
                                .error_info(&e)
                                .log();
                            None
                        }
                        Err(_) => {
                            self.logger.error("burst thread panicked").field("thread", thread_index).log();
                            None
                        }
                    })
                    .collect::<Vec<_>>()
            });
            let wall_ms = started.elapsed().as_secs_f64() * 1000.0;

            self.logger.debug("burst round").field("round", round).field("wall_ms", wall_ms).log();
            rounds.push(BurstRound {
                round,
                thread_costs_ms,
                wall_ms,
            });
        }

        Ok(rounds)
    }
}

impl<B: InferenceBackend> Drop for Orchestrator<B> {
    fn drop(&mut self) {
        if self.is_running() {
            self.stop();
            self.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::{channel, ReportEvent};
    use crate::sdk::SimulatedBackend;
    use std::time::Duration;
    use tempfile::TempDir;

    fn setup(threads: usize) -> (TempDir, BenchConfig) {
        let dir = TempDir::new().unwrap();
        let image_path = SimulatedBackend::write_example_model(dir.path()).unwrap();
        let config = BenchConfig {
            model_dir: dir.path().to_path_buf(),
            image_path,
            threads,
            interval_ms: 20,
            ..Default::default()
        };
        (dir, config)
    }

    fn orchestrator() -> Orchestrator<SimulatedBackend> {
        let (logger, _) = Logger::buffered("ORCH".to_string());
        Orchestrator::new(Arc::new(SimulatedBackend::with_latency_scale(0.0)), logger)
    }

    #[test]
    fn test_start_twice_is_noop() {
        let (_dir, config) = setup(2);
        let mut orch = orchestrator();
        let (sink, mut receiver) = channel();

        assert!(orch.start(&config, sink.clone()).unwrap());
        assert!(orch.is_running());
        assert!(!orch.start(&config, sink).unwrap());

        assert!(orch.stop());
        assert!(!orch.stop());
        let exits = orch.join();
        assert!(!orch.is_running());
        assert_eq!(exits.len(), 2);

        let starts = std::iter::from_fn(|| receiver.try_recv())
            .filter(|e| matches!(e, ReportEvent::RunStarted { .. }))
            .count();
        assert_eq!(starts, 1);
    }

    #[test]
    fn test_invalid_config_spawns_nothing() {
        let (_dir, mut config) = setup(0);
        config.threads = 0;
        let mut orch = orchestrator();
        let (sink, mut receiver) = channel();

        let err = orch.start(&config, sink).unwrap_err();
        assert_eq!(err.category(), "CONFIG");
        assert!(!orch.is_running());
        assert!(receiver.try_recv().is_none());
    }

    #[test]
    fn test_load_failure_finishes_without_stop() {
        let (dir, mut config) = setup(2);
        config.model_dir = dir.path().join("missing");
        let mut orch = orchestrator();
        let (sink, _receiver) = channel();

        orch.start(&config, sink).unwrap();
        while !orch.all_finished() {
            std::thread::sleep(Duration::from_millis(5));
        }
        let exits = orch.join();
        assert_eq!(exits.len(), 2);
        assert!(exits.iter().all(|e| matches!(e, WorkerExit::LoadFailed { .. })));
    }

    #[test]
    fn test_idle_stop_and_join() {
        let mut orch = orchestrator();
        assert!(!orch.stop());
        assert!(orch.join().is_empty());
    }

    #[test]
    fn test_workers_have_unique_indices() {
        let (_dir, config) = setup(4);
        let mut orch = orchestrator();
        let (sink, _receiver) = channel();

        orch.start(&config, sink).unwrap();
        std::thread::sleep(Duration::from_millis(60));
        orch.stop();
        let exits = orch.join();

        let indices: Vec<usize> = exits.iter().map(WorkerExit::worker).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert!(exits.iter().all(WorkerExit::is_clean));
    }

    #[test]
    fn test_burst_rounds() {
        let (_dir, config) = setup(3);
        let orch = orchestrator();
        let rounds = orch.run_burst(&config, 4).unwrap();

        assert_eq!(rounds.len(), 4);
        for (i, round) in rounds.iter().enumerate() {
            assert_eq!(round.round, i as u32 + 1);
            assert_eq!(round.thread_costs_ms.len(), 3);
            assert_eq!(round.failures(), 0);
            assert!(round.wall_ms >= 0.0);
        }
    }

    #[test]
    fn test_burst_rejects_zero_runs() {
        let (_dir, config) = setup(1);
        assert!(orchestrator().run_burst(&config, 0).is_err());
    }
}
