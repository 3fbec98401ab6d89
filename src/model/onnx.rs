use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::classes::{CLASS_NAMES, NUM_CLASSES, matches_class_order};
use crate::error::{AppError, Result};
use crate::preprocess::{NormalizedTensor, Normalization};

use super::{Classifier, ModelConfig, OutputActivation, TensorLayout};

/// Artifact metadata keys that may carry the output-layer class ordering.
const CLASS_METADATA_KEYS: [&str; 2] = ["class_names", "names"];

/// Classifier backed by an ONNX Runtime session.
pub struct OnnxClassifier {
    // a run needs exclusive access to the session
    session: Mutex<Session>,
    path: PathBuf,
    layout: TensorLayout,
    normalization: Normalization,
    activation: OutputActivation,
}

impl OnnxClassifier {
    /// Load an artifact in inference-only mode and check it against the
    /// fixed input shape and class vocabulary.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ModelUnavailable` if:
    /// - The artifact path does not point to a file
    /// - The runtime cannot parse the artifact
    /// - The configured or embedded class ordering differs from `CLASS_NAMES`
    /// - A probe forward pass does not yield one score per class
    pub fn load(config: &ModelConfig) -> Result<Self> {
        if !matches_class_order(&config.class_names) {
            return Err(AppError::ModelUnavailable(format!(
                "configured class order {:?} does not match {:?}",
                config.class_names, CLASS_NAMES
            )));
        }

        let path = &config.path;
        if !path.is_file() {
            return Err(AppError::ModelUnavailable(format!(
                "model not found: {:?}",
                path
            )));
        }

        tracing::info!("Loading model from {:?}", path);
        let session = build_session(path, config.intra_threads).map_err(|e| {
            AppError::ModelUnavailable(format!("failed to load {:?}: {}", path, e))
        })?;

        if let Some(input) = session.inputs.first() {
            tracing::debug!("[Model input]: {} {:?}", input.name, input.input_type);
        }
        check_class_metadata(&session)?;

        let classifier = Self {
            session: Mutex::new(session),
            path: path.clone(),
            layout: config.layout,
            normalization: config.normalization,
            activation: config.output,
        };

        // Shape contract: the artifact must accept our input and emit one score per class
        let probe = classifier
            .forward(&NormalizedTensor::zeros())
            .map_err(|e| AppError::ModelUnavailable(format!("probe forward pass failed: {e}")))?;
        if probe.len() != NUM_CLASSES {
            return Err(AppError::ModelUnavailable(format!(
                "model emits {} scores, expected {}",
                probe.len(),
                NUM_CLASSES
            )));
        }

        tracing::info!(
            "Model ready: layout={}, normalization={}, output={}",
            classifier.layout,
            classifier.normalization,
            classifier.activation
        );
        Ok(classifier)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub const fn layout(&self) -> TensorLayout {
        self.layout
    }
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("path", &self.path)
            .field("layout", &self.layout)
            .field("normalization", &self.normalization)
            .field("activation", &self.activation)
            .finish_non_exhaustive()
    }
}

impl Classifier for OnnxClassifier {
    fn forward(&self, input: &NormalizedTensor) -> Result<Vec<f32>> {
        let batch = match self.layout {
            TensorLayout::Nhwc => input.to_nhwc(),
            TensorLayout::Nchw => input.to_nchw(),
        };
        let tensor = Tensor::from_array(batch)?;

        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        let outputs = session.run(ort::inputs![tensor])?;
        let (_shape, scores) = outputs[0].try_extract_tensor::<f32>()?;
        Ok(scores.to_vec())
    }

    fn normalization(&self) -> Normalization {
        self.normalization
    }

    fn output_activation(&self) -> OutputActivation {
        self.activation
    }
}

fn build_session(path: &Path, intra_threads: Option<usize>) -> ort::Result<Session> {
    let mut builder = Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)?;
    if let Some(n) = intra_threads {
        builder = builder.with_intra_threads(n)?;
    }
    builder.commit_from_file(path)
}

/// Assert the class ordering embedded in the artifact, when there is one.
fn check_class_metadata(session: &Session) -> Result<()> {
    match session.metadata() {
        Ok(metadata) => verify_class_metadata(|key| metadata.custom(key).ok().flatten()),
        Err(e) => {
            tracing::warn!("Could not read model metadata: {}", e);
            Ok(())
        }
    }
}

/// Check the first class list found under `CLASS_METADATA_KEYS`.
/// `lookup` returns the custom metadata value stored under a key.
fn verify_class_metadata(lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
    for key in CLASS_METADATA_KEYS {
        if let Some(value) = lookup(key) {
            let names = parse_class_list(&value);
            if !matches_class_order(&names) {
                return Err(AppError::ModelUnavailable(format!(
                    "artifact class order {:?} does not match {:?}",
                    names, CLASS_NAMES
                )));
            }
            tracing::debug!("Artifact class order verified via metadata key '{}'", key);
            return Ok(());
        }
    }

    tracing::warn!(
        "Artifact carries no class metadata, assuming output order {:?}",
        CLASS_NAMES
    );
    Ok(())
}

/// Parse a class list stored as `a,b,c`, `["a", "b"]` or `{0: 'a', 1: 'b'}`.
fn parse_class_list(raw: &str) -> Vec<String> {
    let trimmed = raw
        .trim()
        .trim_start_matches(['[', '{'])
        .trim_end_matches([']', '}']);

    trimmed
        .split(',')
        .map(|item| {
            let item = match item.split_once(':') {
                Some((_key, name)) => name,
                None => item,
            };
            item.trim().trim_matches(['"', '\'']).to_string()
        })
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Tiny NHWC graphs: mean over H and W, a 3×N linear head, softmax.
    pub(crate) fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("assets/models")
            .join(name)
    }

    pub(crate) fn fixture_config(name: &str) -> ModelConfig {
        ModelConfig {
            path: fixture(name),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_class_list_formats() {
        let expected = vec!["glioma", "meningioma", "notumor", "pituitary"];
        assert_eq!(parse_class_list("glioma,meningioma,notumor,pituitary"), expected);
        assert_eq!(
            parse_class_list(r#"["glioma", "meningioma", "notumor", "pituitary"]"#),
            expected
        );
        assert_eq!(
            parse_class_list("{0: 'glioma', 1: 'meningioma', 2: 'notumor', 3: 'pituitary'}"),
            expected
        );
        assert!(parse_class_list("").is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let cfg = ModelConfig {
            path: temp_dir.path().join("best_mobilenetv2.onnx"),
            ..Default::default()
        };
        let err = OnnxClassifier::load(&cfg).unwrap_err();
        assert!(err.is_model_unavailable());
        assert!(err.to_string().contains("model not found"));
    }

    #[test]
    fn test_load_directory_is_not_a_model() {
        let temp_dir = TempDir::new().unwrap();
        let cfg = ModelConfig {
            path: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        assert!(OnnxClassifier::load(&cfg).unwrap_err().is_model_unavailable());
    }

    #[test]
    fn test_load_rejects_reordered_classes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("model.onnx");
        fs::write(&path, b"not checked").unwrap();

        let cfg = ModelConfig {
            path,
            class_names: ["meningioma", "glioma", "notumor", "pituitary"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ..Default::default()
        };
        let err = OnnxClassifier::load(&cfg).unwrap_err();
        assert!(err.is_model_unavailable());
        assert!(err.to_string().contains("class order"));
    }

    #[test]
    fn test_load_corrupt_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("best_mobilenetv2.onnx");
        fs::write(&path, b"not an onnx graph").unwrap();

        let cfg = ModelConfig {
            path,
            ..Default::default()
        };
        let err = OnnxClassifier::load(&cfg).unwrap_err();
        assert!(err.is_model_unavailable());
        assert!(err.to_string().contains("failed to load"));
    }

    #[test]
    fn test_verify_class_metadata() {
        let lookup = |pairs: &'static [(&'static str, &'static str)]| {
            move |key: &str| {
                pairs
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| v.to_string())
            }
        };

        assert!(verify_class_metadata(lookup(&[])).is_ok());
        assert!(
            verify_class_metadata(lookup(&[("class_names", "glioma,meningioma,notumor,pituitary")]))
                .is_ok()
        );
        assert!(
            verify_class_metadata(lookup(&[(
                "names",
                "{0: 'glioma', 1: 'meningioma', 2: 'notumor', 3: 'pituitary'}"
            )]))
            .is_ok()
        );

        let err =
            verify_class_metadata(lookup(&[("class_names", "meningioma,glioma,notumor,pituitary")]))
                .unwrap_err();
        assert!(err.is_model_unavailable());
        assert!(err.to_string().contains("artifact class order"));

        // the first key present decides
        let err = verify_class_metadata(lookup(&[
            ("class_names", "glioma,notumor"),
            ("names", "glioma,meningioma,notumor,pituitary"),
        ]))
        .unwrap_err();
        assert!(err.is_model_unavailable());
    }

    #[test]
    fn test_load_fixture_model() {
        let model = OnnxClassifier::load(&fixture_config("tiny_classifier.onnx")).unwrap();
        assert_eq!(model.layout(), TensorLayout::Nhwc);
        assert_eq!(model.path(), fixture("tiny_classifier.onnx"));

        // zero input: equal logits, uniform distribution
        let scores = model.forward(&NormalizedTensor::zeros()).unwrap();
        assert_eq!(scores.len(), NUM_CLASSES);
        for score in scores {
            assert!((score - 0.25).abs() < 1e-5);
        }
    }

    #[test]
    fn test_load_rejects_wrong_output_width() {
        let err = OnnxClassifier::load(&fixture_config("three_class.onnx")).unwrap_err();
        assert!(err.is_model_unavailable());
        assert!(err.to_string().contains("emits 3 scores"));
    }

    #[test]
    fn test_load_rejects_artifact_class_order() {
        let err = OnnxClassifier::load(&fixture_config("reordered_classes.onnx")).unwrap_err();
        assert!(err.is_model_unavailable());
        assert!(err.to_string().contains("artifact class order"));
    }

    #[test]
    fn test_nchw_layout_is_rejected_by_nhwc_graph() {
        let cfg = ModelConfig {
            layout: TensorLayout::Nchw,
            ..fixture_config("tiny_classifier.onnx")
        };
        let err = OnnxClassifier::load(&cfg).unwrap_err();
        assert!(err.is_model_unavailable());
        assert!(err.to_string().contains("probe forward pass failed"));
    }
}
