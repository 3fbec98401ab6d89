use indicatif::{ProgressFinish, ProgressIterator};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Instant;

use crate::annotate::{AnnotateConfigs, annotate_with_font};
use crate::error::{AppError, Result};
use crate::model::{Classifier, ModelConfig, load_model};
use crate::pipeline::{Prediction, predict};
use crate::progress_bar::progress_bar_style;
use crate::report::render_report;
use crate::source::{Source, SourceLoader, SourceMeta, deserialize_source};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PredictArgs {
    /// Model artifact and how to feed it
    #[serde(skip)]
    pub model: ModelConfig,

    /// Input source (image, directory, or list of both)
    #[serde(deserialize_with = "deserialize_source")]
    pub source: Source,

    /// Directory to save annotated images
    pub save_dir: Option<PathBuf>,

    /// Whether to draw the prediction onto the image
    pub annotate: bool,

    /// Annotate configurations
    #[serde(skip)]
    pub annotate_cfg: AnnotateConfigs,

    /// Whether to print a text report per image
    pub report: bool,

    /// Whether to store and return inference results
    pub return_result: bool,

    /// Show verbose output
    pub verbose: bool,
}

impl Default for PredictArgs {
    fn default() -> Self {
        Self {
            model: Default::default(),
            source: Default::default(),
            save_dir: None,
            annotate: false,
            annotate_cfg: Default::default(),
            report: true,
            return_result: false,
            verbose: false,
        }
    }
}

/// Outcome for a single image
#[derive(Debug)]
pub struct InferResult {
    pub prediction: Prediction,

    /// Annotated image after inference
    pub annotated: Option<image::DynamicImage>,

    /// Source meta information
    pub meta: SourceMeta,
}

/// Totals of a prediction run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub processed: usize,
    pub failed: usize,
    pub results: Option<Vec<InferResult>>,
}

// -- public API

/// Core prediction API: load (or reuse) the cached model and classify every
/// image of `args.source`.
///
/// # Errors
///
/// Returns `AppError::ModelUnavailable` if the artifact cannot be loaded; no
/// image is processed in that case. Per-image failures are logged, counted,
/// and do not stop the run.
pub fn run_prediction(args: &PredictArgs) -> Result<RunSummary> {
    let start_time = Instant::now();
    let model = load_model(&args.model)?;
    let summary = run_with_model(model.as_ref(), &args.source, args)?;

    tracing::info!("Total prediction time: {:.3?}", start_time.elapsed());
    Ok(summary)
}

/// Classify every image of `source` with an already loaded model, one image
/// at a time.
pub fn run_with_model<C: Classifier + ?Sized>(
    model: &C,
    source: &Source,
    args: &PredictArgs,
) -> Result<RunSummary> {
    if source.is_none() {
        return Err(AppError::Config("no input source given".to_string()));
    }

    let save_dir = if args.annotate {
        args.save_dir.as_ref()
    } else {
        None
    };
    if let Some(dir) = save_dir {
        std::fs::create_dir_all(dir)?;
    }

    // one font for the whole run; a bad font path fails before any image
    let font = if args.annotate {
        args.annotate_cfg.load_font()?
    } else {
        None
    };

    let loader = SourceLoader::new(source)?;
    let total_frames = loader.len();
    tracing::info!("[Source]: {:?}", source_label(source));
    tracing::info!("Total images to process: {}", total_frames);

    let mut summary = RunSummary {
        results: args.return_result.then(|| Vec::with_capacity(total_frames)),
        ..Default::default()
    };

    for (image, meta) in loader
        .progress_with_style(progress_bar_style())
        .with_message("Classifying")
        .with_finish(ProgressFinish::WithMessage("Finished".into()))
    {
        tracing::debug!("Processing: {}", meta.frame_name());

        let outcome = image.and_then(|img| {
            let prediction = predict(&img, model)?;
            let annotated = args
                .annotate
                .then(|| annotate_with_font(&img, &prediction, &args.annotate_cfg, font.as_ref()));
            Ok((prediction, annotated))
        });

        let (prediction, annotated) = match outcome {
            Ok(r) => r,
            Err(e) => {
                tracing::error!("{}: {}", meta.frame_name(), e);
                summary.failed += 1;
                continue;
            }
        };

        if args.report {
            println!("== {}\n{}\n", meta.frame_name(), render_report(&prediction));
        }

        if let (Some(dir), Some(img)) = (save_dir, &annotated) {
            let save_path = dir.join(format!("{}.png", meta.frame_stem()));
            if let Err(e) = img.save(&save_path) {
                tracing::error!("Failed to save annotated image to {:?}: {}", save_path, e);
            }
        }

        summary.processed += 1;
        if let Some(vec) = summary.results.as_mut() {
            vec.push(InferResult {
                prediction,
                annotated,
                meta,
            });
        }
    }

    if let Some(dir) = save_dir {
        tracing::info!("Results saved to directory: {:?}", dir);
    }
    tracing::info!(
        "Classified {} image(s), {} failed",
        summary.processed,
        summary.failed
    );
    Ok(summary)
}

fn source_label(source: &Source) -> String {
    match source {
        Source::Image(img) => format!("in-memory image {}x{}", img.width(), img.height()),
        other => format!("{:?}", other),
    }
}
