use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum AppError {
    #[error("TOML config file error: {0}")]
    TomlConfig(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The classifier artifact could not be loaded (missing, corrupt, or
    /// not matching the expected input/output contract).
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Any failure on the prediction path: decode, resize, normalize or
    /// forward pass.
    #[error("Inference failed: {0}")]
    InferenceFailure(String),

    /// Analysis was requested before any image was accepted.
    #[error("No image uploaded")]
    NoImage,

    #[error("Unsupported upload: {0}")]
    UnsupportedUpload(String),

    #[error("Font loading failed: {0}")]
    FontLoad(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl AppError {
    pub const fn is_model_unavailable(&self) -> bool {
        matches!(self, AppError::ModelUnavailable(_))
    }
}

impl From<ort::Error> for AppError {
    fn from(e: ort::Error) -> Self {
        AppError::InferenceFailure(e.to_string())
    }
}

/// Result type with default AppError
pub type Result<T, E = AppError> = std::result::Result<T, E>;
