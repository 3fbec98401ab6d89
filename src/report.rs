use std::fmt::Write;

use crate::classes::TumorClass;
use crate::pipeline::Prediction;

const BAR_WIDTH: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvisoryLevel {
    Success,
    Warning,
}

/// Category-dependent message shown under a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advisory {
    pub level: AdvisoryLevel,
    pub headline: String,
    pub note: &'static str,
}

pub fn advisory(label: TumorClass) -> Advisory {
    if label.is_tumor() {
        Advisory {
            level: AdvisoryLevel::Warning,
            headline: format!("Indication of {} tumor.", label.display_name()),
            note: "This result is not a final diagnosis. Consult a doctor promptly.",
        }
    } else {
        Advisory {
            level: AdvisoryLevel::Success,
            headline: "No tumor detected.".to_string(),
            note: "Still consult a doctor for an accurate result.",
        }
    }
}

/// Fixed-width text bar for a probability in [0, 1].
pub fn probability_bar(probability: f32, width: usize) -> String {
    let filled = ((probability.clamp(0.0, 1.0) * width as f32).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), ".".repeat(width - filled))
}

/// Human-facing summary: headline label, one bar per class, advisory.
pub fn render_report(prediction: &Prediction) -> String {
    let mut out = String::new();
    let label = prediction.label();

    let _ = writeln!(out, "Prediction: {}", label.name().to_uppercase());
    let _ = writeln!(out, "Probabilities:");
    for (class, prob) in prediction.iter() {
        let _ = writeln!(
            out,
            "  {:<12}{} {:>6.2}%",
            class.display_name(),
            probability_bar(prob, BAR_WIDTH),
            prob * 100.0
        );
    }

    let advice = advisory(label);
    let marker = match advice.level {
        AdvisoryLevel::Success => "[ok]",
        AdvisoryLevel::Warning => "[!]",
    };
    let _ = writeln!(out, "{} {}", marker, advice.headline);
    let _ = write!(out, "{}", advice.note);
    out
}
