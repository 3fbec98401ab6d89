// -- submodules
mod cache;
mod onnx;

pub use cache::ModelCache;
pub use onnx::OnnxClassifier;

// -- external imports
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use strum::{Display, EnumString, VariantNames};

use crate::classes::CLASS_NAMES;
use crate::error::Result;
use crate::preprocess::{NormalizedTensor, Normalization, deserialize_normalization};

pub const DEFAULT_MODEL_PATH: &str = "best_mobilenetv2.onnx";

// -- enums

/// Memory layout the artifact expects for its single input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display, VariantNames)]
pub enum TensorLayout {
    /// `[1, H, W, C]`, Keras exports
    #[default]
    #[strum(serialize = "nhwc")]
    Nhwc,

    /// `[1, C, H, W]`
    #[strum(serialize = "nchw")]
    Nchw,
}

/// What the last layer of the artifact emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display, VariantNames)]
pub enum OutputActivation {
    /// Already a probability distribution (softmax head)
    #[default]
    #[strum(serialize = "probabilities")]
    Probabilities,

    /// Raw scores, softmax is applied after the forward pass
    #[strum(serialize = "logits")]
    Logits,
}

fn deserialize_variant<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: FromStr + VariantNames,
{
    let value = String::deserialize(deserializer)?;
    T::from_str(&value).map_err(|_| {
        serde::de::Error::invalid_value(
            serde::de::Unexpected::Str(&value),
            &format!("one of {}", T::VARIANTS.join(", ")).as_str(),
        )
    })
}

// -- config

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the ONNX artifact
    pub path: PathBuf,

    /// Input tensor layout
    #[serde(deserialize_with = "deserialize_variant")]
    pub layout: TensorLayout,

    /// Pixel normalization used at training time
    #[serde(deserialize_with = "deserialize_normalization")]
    pub normalization: Normalization,

    /// Activation of the output layer
    #[serde(deserialize_with = "deserialize_variant")]
    pub output: OutputActivation,

    /// Output-layer class ordering; must equal the built-in vocabulary
    pub class_names: Vec<String>,

    /// Intra-op threads for the runtime (None lets the runtime decide)
    pub intra_threads: Option<usize>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_MODEL_PATH),
            layout: Default::default(),
            normalization: Default::default(),
            output: Default::default(),
            class_names: CLASS_NAMES.iter().map(|s| s.to_string()).collect(),
            intra_threads: None,
        }
    }
}

// -- traits

/// A loaded, inference-only image classifier over the fixed class vocabulary.
///
/// Implementations are immutable once constructed and may be shared across
/// threads behind an `Arc`.
pub trait Classifier: Send + Sync {
    /// One forward pass with batch size 1, returning the raw output row.
    fn forward(&self, input: &NormalizedTensor) -> Result<Vec<f32>>;

    fn normalization(&self) -> Normalization {
        Normalization::default()
    }

    fn output_activation(&self) -> OutputActivation {
        OutputActivation::default()
    }
}

impl<C: Classifier + ?Sized> Classifier for Arc<C> {
    fn forward(&self, input: &NormalizedTensor) -> Result<Vec<f32>> {
        (**self).forward(input)
    }

    fn normalization(&self) -> Normalization {
        (**self).normalization()
    }

    fn output_activation(&self) -> OutputActivation {
        (**self).output_activation()
    }
}

// -- public API

static MODEL_CACHE: ModelCache<OnnxClassifier> = ModelCache::new();

/// Load the ONNX classifier once per process.
///
/// The first successful call reads the artifact; every later call returns the
/// same handle without touching the file, whatever `config` it is given.
/// Failures are not cached.
pub fn load_model(config: &ModelConfig) -> Result<Arc<OnnxClassifier>> {
    load_model_into(&MODEL_CACHE, config)
}

fn load_model_into(
    cache: &ModelCache<OnnxClassifier>,
    config: &ModelConfig,
) -> Result<Arc<OnnxClassifier>> {
    let model = cache.get_or_load(|| OnnxClassifier::load(config))?;
    if model.path() != config.path.as_path() {
        tracing::warn!(
            "Model already loaded from {:?}, ignoring requested path {:?}",
            model.path(),
            config.path
        );
    }
    Ok(model)
}

/// Handle loaded by a previous [`load_model`] call, if any.
pub fn loaded_model() -> Option<Arc<OnnxClassifier>> {
    MODEL_CACHE.get()
}

// -- tests

#[cfg(test)]
mod tests {
    use super::*;
    use super::onnx::tests::fixture_config;

    #[derive(Debug, Deserialize)]
    struct Wrapper {
        model: ModelConfig,
    }

    #[test]
    fn test_model_config_defaults() {
        let cfg = ModelConfig::default();
        assert_eq!(cfg.path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert_eq!(cfg.layout, TensorLayout::Nhwc);
        assert_eq!(cfg.normalization, Normalization::MobileNetV2);
        assert_eq!(cfg.output, OutputActivation::Probabilities);
        assert_eq!(cfg.class_names, CLASS_NAMES);
    }

    #[test]
    fn test_model_config_from_toml() {
        let w: Wrapper = toml::from_str(
            r#"
[model]
path = "models/cls.onnx"
layout = "nchw"
normalization = "imagenet"
output = "logits"
intra_threads = 2
"#,
        )
        .unwrap();
        assert_eq!(w.model.path, PathBuf::from("models/cls.onnx"));
        assert_eq!(w.model.layout, TensorLayout::Nchw);
        assert_eq!(w.model.normalization, Normalization::ImageNet);
        assert_eq!(w.model.output, OutputActivation::Logits);
        assert_eq!(w.model.intra_threads, Some(2));
    }

    #[test]
    fn test_model_config_rejects_unknown_variant() {
        let err = toml::from_str::<Wrapper>("[model]\nlayout = \"nwhc\"\n").unwrap_err();
        assert!(err.to_string().contains("nhwc, nchw"));
    }

    #[test]
    fn test_load_model_missing_artifact() {
        let cfg = ModelConfig {
            path: PathBuf::from("/nonexistent/best_mobilenetv2.onnx"),
            ..Default::default()
        };
        let err = load_model(&cfg).unwrap_err();
        assert!(err.is_model_unavailable());
        assert!(err.to_string().contains("model not found"));
        assert!(loaded_model().is_none());
    }

    #[test]
    fn test_load_model_returns_same_handle() {
        let cache = ModelCache::new();
        let cfg = fixture_config("tiny_classifier.onnx");

        let first = load_model_into(&cache, &cfg).unwrap();
        let second = load_model_into(&cache, &cfg).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        // a later config is ignored once a model is loaded
        let other = ModelConfig {
            path: PathBuf::from("/nonexistent/best_mobilenetv2.onnx"),
            ..Default::default()
        };
        let third = load_model_into(&cache, &other).unwrap();
        assert!(Arc::ptr_eq(&first, &third));
        assert!(Arc::ptr_eq(&first, &cache.get().unwrap()));
    }

    #[test]
    fn test_failed_load_is_retried() {
        let cache = ModelCache::new();
        let missing = ModelConfig {
            path: PathBuf::from("/nonexistent/best_mobilenetv2.onnx"),
            ..Default::default()
        };
        assert!(load_model_into(&cache, &missing).unwrap_err().is_model_unavailable());
        assert!(!cache.is_loaded());

        let model = load_model_into(&cache, &fixture_config("tiny_classifier.onnx")).unwrap();
        assert!(Arc::ptr_eq(&model, &cache.get().unwrap()));
    }
}
