//! Event-driven analysis session.
//!
//! One session models one user working through the classification page:
//! upload an image, ask for an analysis, look at the result, upload another.
//! Each transition recomputes only what it needs; the model handle is taken
//! once at construction and reused for every analysis.

use image::DynamicImage;
use std::path::Path;
use strum::Display;

use crate::error::{AppError, Result};
use crate::model::Classifier;
use crate::pipeline::{Prediction, decode_image, predict};
use crate::source::is_upload_file;

pub const MODEL_NOT_FOUND: &str = "model not found";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SessionState {
    Idle,
    ImageLoaded,
    Predicting,
    ResultReady,
    Error,
}

#[derive(Debug)]
struct Upload {
    name: String,
    image: DynamicImage,
}

#[derive(Debug)]
pub struct AnalysisSession<C> {
    model: Option<C>,
    state: SessionState,
    upload: Option<Upload>,
    prediction: Option<Prediction>,
    error: Option<String>,
}

impl<C: Classifier> AnalysisSession<C> {
    /// Start a session. `None` means the model could not be loaded: the
    /// session still accepts uploads but refuses every analysis.
    pub fn new(model: Option<C>) -> Self {
        if model.is_none() {
            tracing::warn!("Session started without a model, analysis disabled");
        }
        Self {
            model,
            state: SessionState::Idle,
            upload: None,
            prediction: None,
            error: None,
        }
    }

    /// Start a session from the outcome of a model load.
    pub fn from_load(loaded: Result<C>) -> Self {
        match loaded {
            Ok(model) => Self::new(Some(model)),
            Err(e) => {
                tracing::error!("{}", e);
                Self::new(None)
            }
        }
    }

    pub const fn state(&self) -> SessionState {
        self.state
    }

    pub const fn model_available(&self) -> bool {
        self.model.is_some()
    }

    pub const fn prediction(&self) -> Option<&Prediction> {
        self.prediction.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn image_name(&self) -> Option<&str> {
        self.upload.as_ref().map(|u| u.name.as_str())
    }

    pub fn image(&self) -> Option<&DynamicImage> {
        self.upload.as_ref().map(|u| &u.image)
    }

    /// A new file was chosen. Accepts `jpg`, `jpeg` and `png` names only.
    pub fn upload(&mut self, name: &str, bytes: &[u8]) -> Result<SessionState> {
        if !is_upload_file(Path::new(name)) {
            let err = AppError::UnsupportedUpload(format!(
                "{name}: expected a jpg, jpeg or png file"
            ));
            self.upload = None;
            return Err(self.fail(err));
        }

        let image = match decode_image(bytes) {
            Ok(image) => image,
            Err(e) => {
                self.upload = None;
                return Err(self.fail(e));
            }
        };
        tracing::debug!("[Upload] {} ({}x{})", name, image.width(), image.height());

        self.upload = Some(Upload {
            name: name.to_string(),
            image,
        });
        self.prediction = None;
        self.error = None;
        self.transition(SessionState::ImageLoaded);
        Ok(self.state)
    }

    /// The analyze action. Runs one prediction on the current upload.
    ///
    /// Without an accepted upload this returns `AppError::NoImage` and the
    /// state is left as it was: nothing was attempted.
    pub fn analyze(&mut self) -> Result<&Prediction> {
        let Some(model) = self.model.as_ref() else {
            let err = AppError::ModelUnavailable(MODEL_NOT_FOUND.to_string());
            return Err(self.fail(err));
        };
        let Some(upload) = self.upload.as_ref() else {
            tracing::warn!("[Session] analyze requested without an image");
            return Err(AppError::NoImage);
        };

        self.state = SessionState::Predicting;
        tracing::debug!("[Session] -> {}", self.state);

        match predict(&upload.image, model) {
            Ok(prediction) => {
                self.error = None;
                self.transition(SessionState::ResultReady);
                Ok(&*self.prediction.insert(prediction))
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Back to the empty page. The model stays loaded.
    pub fn reset(&mut self) {
        self.upload = None;
        self.prediction = None;
        self.error = None;
        self.transition(SessionState::Idle);
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!("[Session] {} -> {}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, err: AppError) -> AppError {
        let message = match &err {
            AppError::ModelUnavailable(_) => MODEL_NOT_FOUND.to_string(),
            other => other.to_string(),
        };
        tracing::error!("{}", err);
        self.error = Some(message);
        self.prediction = None;
        self.transition(SessionState::Error);
        err
    }
}
