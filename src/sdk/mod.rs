//! Capability interface to the inference SDK
//!
//! The harness never looks inside a model. Everything it needs from an
//! inference library is expressed by three traits:
//! - [`InferenceBackend`] loads model directories and decodes input images
//! - [`ModelHandle`] lists module variants and creates pipelines
//! - [`Pipeline`] runs one request at a time
//!
//! [`SimulatedBackend`] implements them against a JSON descriptor so the
//! harness can be exercised without a vendor library or a GPU.

pub mod decode;
pub mod simulated;

pub use decode::{decode_image_bytes, decode_image_file, DecodedImage};
pub use simulated::{ModelDescriptor, ModuleSpec, SimulatedBackend, SimulatedModel, SimulatedPipeline, DESCRIPTOR_FILE};

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

/// Device placement for a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSelection {
    pub use_gpu: bool,
    /// GPU ordinal, ignored when `use_gpu` is false
    pub device_id: u32,
}

impl Default for DeviceSelection {
    fn default() -> Self {
        Self { use_gpu: true, device_id: 0 }
    }
}

/// A module variant exposed by a loaded model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ModuleInfo {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            metadata: BTreeMap::new(),
        }
    }
}

/// Input for one inference call
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    image: DecodedImage,
}

impl Request {
    pub fn new(image: DecodedImage) -> Self {
        Self { image }
    }

    pub fn image(&self) -> &DecodedImage {
        &self.image
    }
}

/// Output of one inference call
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Response {
    /// Named output scores; their meaning belongs to the model
    pub outputs: Vec<(String, f32)>,
}

/// How "latest" is decided among module variant ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VariantOrdering {
    /// Ids that are unsigned integers compare by value ("10" after "2") and
    /// rank above non-numeric ids, which compare as strings
    #[default]
    Numeric,
    /// Plain string ordering ("2" after "10")
    Lexicographic,
}

impl VariantOrdering {
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match self {
            Self::Lexicographic => a.cmp(b),
            Self::Numeric => numeric_key(a).cmp(&numeric_key(b)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Lexicographic => "lexical",
        }
    }
}

fn numeric_key(id: &str) -> (bool, u128, &str) {
    match id.parse::<u128>() {
        Ok(value) => (true, value, id),
        Err(_) => (false, 0, id),
    }
}

impl FromStr for VariantOrdering {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "numeric" | "number" => Ok(Self::Numeric),
            "lexical" | "lexicographic" | "string" => Ok(Self::Lexicographic),
            _ => Err(AppError::config(format!(
                "Invalid variant ordering '{}': expected 'numeric' or 'lexical'",
                s
            ))),
        }
    }
}

/// Loads models and decodes inputs
pub trait InferenceBackend: Send + Sync + 'static {
    type Model: ModelHandle;

    /// Load the model stored in `dir`
    fn load_model(&self, dir: &Path) -> Result<Self::Model>;

    /// Read and decode the image at `path` into a request
    fn decode_image(&self, path: &Path) -> Result<Request> {
        decode_image_file(path).map(Request::new)
    }
}

/// A loaded model
pub trait ModelHandle: Send {
    type Pipeline: Pipeline;

    fn list_module_variants(&self) -> Vec<ModuleInfo>;

    /// Graph edges as (node, next node) pairs
    fn edge_list(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    fn create_pipeline(&self, variant_id: &str, device: DeviceSelection) -> Result<Self::Pipeline>;
}

/// A runnable pipeline; owned by exactly one thread at a time
pub trait Pipeline: Send {
    fn run(&mut self, request: &Request) -> Result<Response>;
}

/// Pick the variant to run.
///
/// An explicit id must exist in `variants`. Without one, the greatest id
/// under `ordering` wins.
pub fn select_variant<'a>(
    variants: &'a [ModuleInfo],
    explicit: Option<&str>,
    ordering: VariantOrdering,
) -> Result<&'a ModuleInfo> {
    if variants.is_empty() {
        return Err(AppError::load("Model exposes no module variants"));
    }

    if let Some(id) = explicit {
        return variants.iter().find(|v| v.id == id).ok_or_else(|| {
            let known: Vec<&str> = variants.iter().map(|v| v.id.as_str()).collect();
            AppError::load(format!("Module variant '{}' not found (available: {})", id, known.join(", ")))
        });
    }

    variants
        .iter()
        .max_by(|a, b| ordering.compare(&a.id, &b.id))
        .ok_or_else(|| AppError::load("Model exposes no module variants"))
}

/// Select a variant on `model` and create a pipeline for it
pub fn open_pipeline<M: ModelHandle>(
    model: &M,
    explicit: Option<&str>,
    ordering: VariantOrdering,
    device: DeviceSelection,
) -> Result<(String, M::Pipeline)> {
    let variants = model.list_module_variants();
    let chosen = select_variant(&variants, explicit, ordering)?;
    let pipeline = model.create_pipeline(&chosen.id, device)?;
    Ok((chosen.id.clone(), pipeline))
}
