//! Paced inference worker
//!
//! Each worker owns its own model handle and pipeline for its whole life.
//! The only state it shares with anything else is the [`StopSignal`] and its
//! clone of the [`ReportingSink`].

use crate::error::Result;
use crate::logging::{LogLevel, Logger};
use crate::models::{BenchConfig, LatencySample, WorkerExit};
use crate::pacing::{Pacer, StopSignal, Tick};
use crate::reporting::ReportingSink;
use crate::sdk::{open_pipeline, InferenceBackend, ModelHandle, Pipeline};
use std::sync::Arc;
use std::time::Instant;

/// One paced inference loop
pub struct Worker<B: InferenceBackend> {
    index: usize,
    config: Arc<BenchConfig>,
    backend: Arc<B>,
    stop: StopSignal,
    sink: ReportingSink,
    logger: Logger,
}

impl<B: InferenceBackend> Worker<B> {
    pub fn new(
        index: usize,
        config: Arc<BenchConfig>,
        backend: Arc<B>,
        stop: StopSignal,
        sink: ReportingSink,
        logger: &Logger,
    ) -> Self {
        let logger = logger.named(&format!("worker-{}", index));
        logger.add_context_field("worker".to_string(), index);
        Self {
            index,
            config,
            backend,
            stop,
            sink,
            logger,
        }
    }

    /// Run until the stop signal fires or setup fails
    pub fn run(self) -> WorkerExit {
        let exit = match self.open() {
            Ok((module_id, pipeline)) => {
                self.logger
                    .info("pipeline ready")
                    .field("module_id", &module_id)
                    .field("use_gpu", self.config.use_gpu)
                    .field("device_id", self.config.device_id)
                    .log();
                self.pace(pipeline)
            }
            Err(e) => {
                self.logger.error("cannot create pipeline").error_info(&e).log();
                WorkerExit::LoadFailed {
                    worker: self.index,
                    reason: e.to_string(),
                }
            }
        };

        self.sink.worker_exited(exit.clone());
        self.logger.info("worker stopped").field("clean", exit.is_clean()).log();
        exit
    }

    fn open(&self) -> Result<(String, <B::Model as ModelHandle>::Pipeline)> {
        let model = self.backend.load_model(&self.config.model_dir)?;
        open_pipeline(
            &model,
            self.config.module_id.as_deref(),
            self.config.variant_order,
            self.config.device(),
        )
    }

    fn pace<P: Pipeline>(&self, mut pipeline: P) -> WorkerExit {
        let mut pacer = Pacer::new(self.config.interval(), self.stop.clone());
        let mut cycle: u64 = 0;
        let mut samples: u64 = 0;
        let mut failures: u64 = 0;

        while pacer.wait_next_tick() == Tick::Ready {
            cycle += 1;

            let request = match self.backend.decode_image(&self.config.image_path) {
                Ok(request) => request,
                Err(e) => {
                    failures += 1;
                    self.logger.warn("skipping cycle").field("cycle", cycle).error_info(&e).log();
                    continue;
                }
            };

            let started = Instant::now();
            match pipeline.run(&request) {
                Ok(_) => {
                    let sample = LatencySample::new(self.index, started.elapsed(), cycle);
                    if self.logger.would_log(LogLevel::Debug) {
                        self.logger.debug("inference complete").sample(&sample).log();
                    }
                    self.sink.sample(sample);
                    samples += 1;
                }
                Err(e) => {
                    failures += 1;
                    self.logger.warn("inference failed").field("cycle", cycle).error_info(&e).log();
                }
            }
        }

        WorkerExit::Stopped {
            worker: self.index,
            samples,
            failures,
        }
    }
}
