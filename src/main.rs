//! Inference Latency Tester - Main CLI Application

use clap::Parser;
use inference_latency_tester::{
    cli::Cli,
    config::{display_config_summary, load_config, EnvManager},
    error::{AppError, ErrorReporter, Result},
    log_debug, log_info, log_warn,
    logging::{Logger, LoggerFactory},
    models::{BenchConfig, RunMode, WorkerExit},
    orchestrator::Orchestrator,
    output::{to_json, BurstReport, OutputCoordinator, RunReport},
    reporting::{self, ResultsBoard},
    sdk::SimulatedBackend,
    BUILD_TIME, GIT_COMMIT, PKG_NAME, VERSION,
};
use std::io::IsTerminal;
use std::process;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    // Worker panics are collected by `Orchestrator::join`, so only report here
    std::panic::set_hook(Box::new(|panic_info| {
        let thread = std::thread::current();
        eprintln!("Panic in thread '{}': {}", thread.name().unwrap_or("unnamed"), panic_info);
    }));

    let cli = Cli::parse();
    let reporter = ErrorReporter::new(cli.use_colors(), cli.verbose);

    if let Err(message) = cli.validate() {
        reporter.report_error(&AppError::config(message));
        process::exit(1);
    }

    if let Err(e) = run_application(cli).await {
        reporter.report_error(&e);
        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run_application(cli: Cli) -> Result<()> {
    if cli.print_env_example {
        print!("{}", EnvManager::create_example_env_content());
        return Ok(());
    }

    if let Some(ref dir) = cli.init_model {
        let image = SimulatedBackend::write_example_model(dir)?;
        println!("Wrote example model to {}", dir.display());
        println!("Try: ilt --model-dir {} --image {}", dir.display(), image.display());
        return Ok(());
    }

    let config = load_config(cli)?;
    let factory = LoggerFactory::new(config.clone());
    let logger = factory.create_logger("ilt");

    log_debug!(
        logger,
        "{} v{} ({}) built {}",
        PKG_NAME,
        VERSION,
        GIT_COMMIT.unwrap_or("unknown"),
        BUILD_TIME.unwrap_or("unknown")
    );
    log_debug!(logger, "configuration:\n{}", display_config_summary(&config));

    if !config.image_path.exists() {
        log_warn!(logger, "image {} does not exist; every cycle will be skipped", config.image_path.display());
    }

    let cores = num_cpus::get();
    if !config.use_gpu && config.threads > cores {
        log_warn!(
            logger,
            "{} CPU workers on {} cores; latencies will include scheduling delay",
            config.threads,
            cores
        );
    }

    let backend = Arc::new(SimulatedBackend::new());
    match config.mode {
        RunMode::Paced => run_paced(config, backend, logger, factory.session_id().to_string()).await,
        RunMode::Burst { runs } => run_burst(config, backend, logger, runs, factory.session_id().to_string()).await,
    }
}

/// Paced workers until Ctrl-C, `--duration`, or every worker failing to load
async fn run_paced(
    config: BenchConfig,
    backend: Arc<SimulatedBackend>,
    logger: Logger,
    session_id: String,
) -> Result<()> {
    let output = OutputCoordinator::new(&config);
    let (sink, receiver) = reporting::channel();

    let live = !config.json_output;
    let clear_screen = std::io::stdout().is_terminal();
    let frames = OutputCoordinator::new(&config);
    let display = tokio::spawn(reporting::drain(
        receiver,
        ResultsBoard::new(config.history_capacity),
        config.refresh(),
        move |board| {
            if !live {
                return;
            }
            if let Ok(frame) = frames.display_live(board.rows()) {
                if clear_screen {
                    print!("\x1b[2J\x1b[H");
                }
                println!("{}", frame);
            }
        },
    ));

    let mut orchestrator = Orchestrator::new(backend, logger.named("orchestrator"));
    orchestrator.start(&config, sink)?;

    if live {
        let until = match config.duration_secs {
            Some(secs) => format!("for {}s", secs),
            None => "until Ctrl-C".to_string(),
        };
        println!(
            "{}",
            output.message(&format!(
                "Running {} workers every {} ms {}",
                config.threads, config.interval_ms, until
            ))?
        );
    }

    let deadline = async {
        match config.duration_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);
    let mut poll = tokio::time::interval(Duration::from_millis(100));

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.map_err(|e| AppError::io(format!("cannot listen for Ctrl-C: {}", e)))?;
                log_info!(logger, "interrupted");
                break;
            }
            _ = &mut deadline => {
                log_info!(logger, "duration elapsed");
                break;
            }
            _ = poll.tick() => {
                if orchestrator.all_finished() {
                    log_warn!(logger, "all workers exited");
                    break;
                }
            }
        }
    }

    orchestrator.stop();
    let exits = tokio::task::spawn_blocking(move || orchestrator.join())
        .await
        .map_err(|e| AppError::internal(format!("worker join task failed: {}", e)))?;
    let board = display
        .await
        .map_err(|e| AppError::internal(format!("display task failed: {}", e)))?;

    let summaries = board.summaries();
    if config.json_output {
        let report = RunReport {
            session_id,
            finished_at: chrono::Utc::now(),
            threads: config.threads,
            interval_ms: config.interval_ms,
            workers: summaries,
            exits: exits.clone(),
        };
        println!("{}", to_json(&report)?);
    } else {
        println!("{}", output.display_summary(&summaries, &exits)?);
    }

    if !exits.is_empty() && exits.iter().all(|e| matches!(e, WorkerExit::LoadFailed { .. })) {
        return Err(AppError::load("no worker could create a pipeline"));
    }
    if !exits.iter().any(WorkerExit::is_clean) && exits.iter().any(|e| matches!(e, WorkerExit::Panicked { .. })) {
        return Err(AppError::internal("every worker stopped abnormally"));
    }
    Ok(())
}

/// Fixed number of concurrent rounds
async fn run_burst(
    config: BenchConfig,
    backend: Arc<SimulatedBackend>,
    logger: Logger,
    runs: u32,
    session_id: String,
) -> Result<()> {
    let output = OutputCoordinator::new(&config);
    let burst_config = config.clone();
    let orchestrator = Orchestrator::new(backend, logger.named("orchestrator"));

    let rounds = tokio::task::spawn_blocking(move || orchestrator.run_burst(&burst_config, runs))
        .await
        .map_err(|e| AppError::internal(format!("burst task failed: {}", e)))??;

    if config.json_output {
        let report = BurstReport {
            session_id,
            finished_at: chrono::Utc::now(),
            threads: config.threads,
            rounds,
        };
        println!("{}", to_json(&report)?);
    } else {
        println!("{}", output.display_burst(&rounds)?);
    }
    Ok(())
}
