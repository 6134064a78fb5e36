//! Descriptor-driven backend that stands in for the vendor SDK
//!
//! A model directory holds `model.vimosln`, a JSON document listing the
//! module variants and how long a call to each should take. Pipelines sleep
//! for that long (with a small deterministic jitter) and return per-channel
//! image means as outputs.

use super::{DeviceSelection, InferenceBackend, ModelHandle, ModuleInfo, Pipeline, Request, Response};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// File name of the model descriptor inside a model directory
pub const DESCRIPTOR_FILE: &str = "model.vimosln";

/// Upper bound for `latency_ms` and `jitter_ms`: one hour
pub const MAX_LATENCY_MS: f64 = 3_600_000.0;

/// Upper bound for `cpu_slowdown`
pub const MAX_CPU_SLOWDOWN: f64 = 1_000.0;

/// Contents of `model.vimosln`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    /// Number of GPUs pipelines may be placed on
    #[serde(default = "default_devices")]
    pub devices: u32,
    /// Latency multiplier applied to CPU pipelines
    #[serde(default = "default_cpu_slowdown")]
    pub cpu_slowdown: f64,
    pub modules: Vec<ModuleSpec>,
    #[serde(default)]
    pub edges: Vec<(String, String)>,
}

/// One module variant in the descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub latency_ms: f64,
    #[serde(default)]
    pub jitter_ms: f64,
    /// Every n-th call fails with an inference error
    #[serde(default)]
    pub fail_every: Option<u64>,
    /// Call number on which the pipeline panics, like a crashing vendor library
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panic_on_call: Option<u64>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

fn default_devices() -> u32 {
    1
}

fn default_cpu_slowdown() -> f64 {
    3.0
}

impl ModelDescriptor {
    /// Parse and sanity-check a descriptor document
    pub fn from_json(text: &str) -> Result<Self> {
        let descriptor: Self = serde_json::from_str(text)
            .map_err(|e| AppError::load(format!("malformed {}: {}", DESCRIPTOR_FILE, e)))?;

        if !in_range(descriptor.cpu_slowdown, MAX_CPU_SLOWDOWN) || descriptor.cpu_slowdown == 0.0 {
            return Err(AppError::load(format!(
                "cpu_slowdown must be above 0 and at most {}",
                MAX_CPU_SLOWDOWN
            )));
        }
        for module in &descriptor.modules {
            if module.id.trim().is_empty() {
                return Err(AppError::load("module id cannot be empty"));
            }
            if !in_range(module.latency_ms, MAX_LATENCY_MS) {
                return Err(AppError::load(format!("module '{}' has an invalid latency", module.id)));
            }
            if !in_range(module.jitter_ms, MAX_LATENCY_MS) {
                return Err(AppError::load(format!("module '{}' has an invalid jitter", module.id)));
            }
        }

        Ok(descriptor)
    }

    /// Descriptor written by `ilt --init-model`
    pub fn example() -> Self {
        let module = |id: &str, name: &str, latency_ms: f64| ModuleSpec {
            id: id.to_string(),
            name: name.to_string(),
            latency_ms,
            jitter_ms: latency_ms * 0.2,
            fail_every: None,
            panic_on_call: None,
            metadata: BTreeMap::new(),
        };
        Self {
            name: "example-inspection".to_string(),
            devices: 1,
            cpu_slowdown: default_cpu_slowdown(),
            modules: vec![
                module("1", "segmentation-v1", 18.0),
                module("2", "segmentation-v2", 14.0),
                module("10", "segmentation-v10", 11.0),
            ],
            edges: vec![
                ("input".to_string(), "segmentation".to_string()),
                ("segmentation".to_string(), "output".to_string()),
            ],
        }
    }
}

fn in_range(value: f64, max: f64) -> bool {
    value.is_finite() && (0.0..=max).contains(&value)
}

/// Backend reading [`ModelDescriptor`] files
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    /// Scales every simulated latency; 0 makes calls instant
    latency_scale: f64,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self { latency_scale: 1.0 }
    }

    pub fn with_latency_scale(latency_scale: f64) -> Self {
        Self {
            latency_scale: latency_scale.max(0.0),
        }
    }

    /// Write an example descriptor and a small test image into `dir`.
    ///
    /// Returns the image path.
    pub fn write_example_model(dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let descriptor = serde_json::to_string_pretty(&ModelDescriptor::example())?;
        std::fs::write(dir.join(DESCRIPTOR_FILE), descriptor)?;

        let image_path = dir.join("image.png");
        let img = ::image::RgbImage::from_fn(64, 64, |x, y| ::image::Rgb([(x * 4) as u8, (y * 4) as u8, 128]));
        img.save(&image_path)
            .map_err(|e| AppError::io(format!("cannot write {}: {}", image_path.display(), e)))?;
        Ok(image_path)
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceBackend for SimulatedBackend {
    type Model = SimulatedModel;

    fn load_model(&self, dir: &Path) -> Result<SimulatedModel> {
        let path = dir.join(DESCRIPTOR_FILE);
        let text = std::fs::read_to_string(&path)
            .map_err(|e| AppError::load(format!("cannot read {}: {}", path.display(), e)))?;
        let descriptor = ModelDescriptor::from_json(&text)?;
        Ok(SimulatedModel {
            descriptor: Arc::new(descriptor),
            latency_scale: self.latency_scale,
        })
    }
}

/// A loaded descriptor
#[derive(Debug, Clone)]
pub struct SimulatedModel {
    descriptor: Arc<ModelDescriptor>,
    latency_scale: f64,
}

impl ModelHandle for SimulatedModel {
    type Pipeline = SimulatedPipeline;

    fn list_module_variants(&self) -> Vec<ModuleInfo> {
        self.descriptor
            .modules
            .iter()
            .map(|m| ModuleInfo {
                id: m.id.clone(),
                name: m.name.clone(),
                metadata: m.metadata.clone(),
            })
            .collect()
    }

    fn edge_list(&self) -> Vec<(String, String)> {
        self.descriptor.edges.clone()
    }

    fn create_pipeline(&self, variant_id: &str, device: DeviceSelection) -> Result<SimulatedPipeline> {
        let module = self
            .descriptor
            .modules
            .iter()
            .find(|m| m.id == variant_id)
            .ok_or_else(|| AppError::load(format!("unknown module variant '{}'", variant_id)))?;

        if device.use_gpu && device.device_id >= self.descriptor.devices {
            return Err(AppError::load(format!(
                "GPU device {} not available ({} device(s))",
                device.device_id, self.descriptor.devices
            )));
        }

        let slowdown = if device.use_gpu { 1.0 } else { self.descriptor.cpu_slowdown };
        Ok(SimulatedPipeline {
            module: module.clone(),
            latency_factor: self.latency_scale * slowdown,
            calls: 0,
        })
    }
}

/// A pipeline for one module variant
#[derive(Debug)]
pub struct SimulatedPipeline {
    module: ModuleSpec,
    latency_factor: f64,
    calls: u64,
}

impl SimulatedPipeline {
    /// Simulated latency of call number `call` (1-based)
    fn latency_for_call(&self, call: u64) -> Result<Duration> {
        let jitter = self.module.jitter_ms * (call as f64 * 1.7).sin();
        let ms = ((self.module.latency_ms + jitter) * self.latency_factor).max(0.0);
        Duration::try_from_secs_f64(ms / 1000.0).map_err(|e| {
            AppError::inference(format!("module '{}' latency {} ms: {}", self.module.id, ms, e))
        })
    }
}

impl Pipeline for SimulatedPipeline {
    fn run(&mut self, request: &Request) -> Result<Response> {
        self.calls += 1;

        let image = request.image();
        if image.is_empty() {
            return Err(AppError::inference("input image is empty"));
        }

        std::thread::sleep(self.latency_for_call(self.calls)?);

        if self.module.panic_on_call == Some(self.calls) {
            panic!("module '{}' crashed on call {}", self.module.id, self.calls);
        }

        if let Some(n) = self.module.fail_every {
            if n > 0 && self.calls % n == 0 {
                return Err(AppError::inference(format!(
                    "module '{}' rejected call {}",
                    self.module.id, self.calls
                )));
            }
        }

        let outputs = image
            .channel_means()
            .into_iter()
            .enumerate()
            .map(|(i, mean)| (format!("channel_{}", i), mean / 255.0))
            .collect();
        Ok(Response { outputs })
    }
}
