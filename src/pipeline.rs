use image::DynamicImage;
use std::time::Instant;

use crate::classes::{NUM_CLASSES, PROBABILITY_TOLERANCE, TumorClass};
use crate::error::{AppError, Result};
use crate::model::{Classifier, OutputActivation};
use crate::preprocess::preprocess;

/// Probability distribution over the class vocabulary plus its arg-max.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    label: TumorClass,
    probabilities: [f32; NUM_CLASSES],
}

impl Prediction {
    /// Build from a validated distribution. Ties pick the lowest index.
    pub fn from_probabilities(probabilities: [f32; NUM_CLASSES]) -> Result<Self> {
        validate_distribution(&probabilities)?;
        let label = TumorClass::from_index(argmax(&probabilities))
            .ok_or_else(|| AppError::InferenceFailure("empty probability vector".into()))?;
        Ok(Self {
            label,
            probabilities,
        })
    }

    pub const fn label(&self) -> TumorClass {
        self.label
    }

    pub const fn probabilities(&self) -> &[f32; NUM_CLASSES] {
        &self.probabilities
    }

    pub fn probability(&self, class: TumorClass) -> f32 {
        self.probabilities[class.index()]
    }

    /// Probability of the predicted label.
    pub fn confidence(&self) -> f32 {
        self.probability(self.label)
    }

    /// `(class, probability)` pairs in vocabulary order.
    pub fn iter(&self) -> impl Iterator<Item = (TumorClass, f32)> + '_ {
        TumorClass::ALL.into_iter().zip(self.probabilities.iter().copied())
    }

    /// The `k` most probable classes, most probable first.
    pub fn top_k(&self, k: usize) -> Vec<(TumorClass, f32)> {
        let mut ranked: Vec<_> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.index().cmp(&b.0.index())));
        ranked.truncate(k);
        ranked
    }
}

// -- public API

/// Classify one decoded image with a loaded model.
///
/// Batch size is always one. Any failure along the way is returned as
/// `AppError::InferenceFailure`; nothing is retried and no fallback class is
/// produced.
pub fn predict<C: Classifier + ?Sized>(image: &DynamicImage, model: &C) -> Result<Prediction> {
    let start_time = Instant::now();

    let input = preprocess(image, model.normalization())?;
    let raw = model
        .forward(&input)
        .map_err(|e| match e {
            AppError::InferenceFailure(_) => e,
            other => AppError::InferenceFailure(other.to_string()),
        })?;

    let scores: [f32; NUM_CLASSES] = raw.as_slice().try_into().map_err(|_| {
        AppError::InferenceFailure(format!(
            "model returned {} scores, expected {}",
            raw.len(),
            NUM_CLASSES
        ))
    })?;

    let probabilities = match model.output_activation() {
        OutputActivation::Probabilities => scores,
        OutputActivation::Logits => softmax(&scores),
    };
    let prediction = Prediction::from_probabilities(probabilities)?;

    tracing::debug!(
        "Predicted {} ({:.4}) in {:.3?}",
        prediction.label(),
        prediction.confidence(),
        start_time.elapsed()
    );
    Ok(prediction)
}

/// Decode uploaded bytes (format sniffed from content) and classify them.
pub fn predict_bytes<C: Classifier + ?Sized>(bytes: &[u8], model: &C) -> Result<Prediction> {
    let image = decode_image(bytes)?;
    predict(&image, model)
}

pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes)
        .map_err(|e| AppError::InferenceFailure(format!("cannot decode image: {e}")))
}

// -- helpers

fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best_idx, best), (idx, &v)| {
            if v > best { (idx, v) } else { (best_idx, best) }
        })
        .0
}

fn softmax(logits: &[f32; NUM_CLASSES]) -> [f32; NUM_CLASSES] {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps = logits.map(|x| (x - max).exp());
    let sum: f32 = exps.iter().sum();
    exps.map(|e| e / sum)
}

fn validate_distribution(probabilities: &[f32]) -> Result<()> {
    if let Some(bad) = probabilities
        .iter()
        .find(|p| !p.is_finite() || **p < 0.0 || **p > 1.0)
    {
        return Err(AppError::InferenceFailure(format!(
            "model output {bad} is not a probability"
        )));
    }
    let sum: f32 = probabilities.iter().sum();
    if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(AppError::InferenceFailure(format!(
            "model outputs sum to {sum}, expected 1.0; is the output activation configured correctly?"
        )));
    }
    Ok(())
}
