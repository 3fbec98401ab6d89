mod annotate;
mod classes;
mod error;
mod logging;
mod model;
mod pipeline;
mod predict;
mod preprocess;
mod progress_bar;
mod report;
mod session;
mod source;
mod toml_utils;

pub use annotate::{AnnotateConfigs, annotate_image, annotate_with_font};
pub use classes::{CHANNELS, CLASS_NAMES, INPUT_SIZE, NUM_CLASSES, PROBABILITY_TOLERANCE, TumorClass};
pub use error::{AppError, Result};
pub use logging::init_logger;
pub use progress_bar::progress_bar_style;
pub use source::{Source, SourceLoader, SourceMeta, UPLOAD_EXTENSIONS, collect_images_from_dir, is_upload_file};
pub use toml_utils::parse_toml;

// Model loading
pub use model::{
    Classifier, DEFAULT_MODEL_PATH, ModelCache, ModelConfig, OnnxClassifier, OutputActivation,
    TensorLayout, load_model, loaded_model,
};

// Core inference pipeline
pub use pipeline::{Prediction, decode_image, predict, predict_bytes};
pub use preprocess::{NormalizedTensor, Normalization, preprocess};

// Presentation
pub use report::{Advisory, AdvisoryLevel, advisory, probability_bar, render_report};
pub use session::{AnalysisSession, MODEL_NOT_FOUND, SessionState};

// Batch runs
pub use predict::{InferResult, PredictArgs, RunSummary, run_prediction, run_with_model};
