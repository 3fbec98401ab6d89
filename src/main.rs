//! Classify brain MRI images from the command line.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use brain_mri_classifier::{
    AnalysisSession, MODEL_NOT_FOUND, PredictArgs, Source, init_logger, load_model, parse_toml,
    render_report, run_prediction,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML config file; relative paths inside it resolve against its directory
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// ONNX model artifact (overrides the config)
    #[arg(long, value_name = "FILE")]
    model: Option<PathBuf>,

    /// Draw the prediction onto each image
    #[arg(long)]
    annotate: bool,

    /// Directory for annotated images
    #[arg(long, value_name = "DIR")]
    save_dir: Option<PathBuf>,

    /// TrueType font for annotation labels
    #[arg(long, value_name = "FILE")]
    font: Option<PathBuf>,

    /// Do not print per-image reports
    #[arg(long)]
    quiet: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// MRI images (jpg, jpeg, png) or directories containing them
    #[arg(value_name = "SOURCE")]
    sources: Vec<PathBuf>,
}

impl Cli {
    fn into_args(self) -> Result<PredictArgs> {
        let mut args = match &self.config {
            Some(path) => {
                let root = path.parent().unwrap_or(Path::new("."));
                parse_toml(path, root)
                    .with_context(|| format!("Failed to parse TOML config: {:?}", path))?
            }
            None => PredictArgs::default(),
        };

        if let Some(model) = self.model {
            args.model.path = model;
        }
        if !self.sources.is_empty() {
            args.source = Source::from(self.sources);
        }
        if self.save_dir.is_some() {
            args.save_dir = self.save_dir;
        }
        if self.font.is_some() {
            args.annotate_cfg.font = self.font;
        }
        args.annotate |= self.annotate;
        args.verbose |= self.verbose;
        args.report &= !self.quiet;
        Ok(args)
    }
}

/// One image, no annotation: the upload → analyze flow of a single session.
fn analyze_single(path: &Path, args: &PredictArgs) -> Result<ExitCode> {
    let mut session = AnalysisSession::from_load(load_model(&args.model));

    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let name = path.file_name().unwrap_or_default().to_string_lossy();
    session.upload(&name, &bytes)?;

    match session.analyze() {
        Ok(prediction) => {
            if args.report {
                println!("{}", render_report(prediction));
            } else {
                tracing::info!("{}: {}", name, prediction.label());
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_model_unavailable() => {
            eprintln!("Error: {}", MODEL_NOT_FOUND);
            Ok(ExitCode::from(2))
        }
        Err(e) => Err(e.into()),
    }
}

fn main() -> Result<ExitCode> {
    let args = Cli::parse().into_args()?;
    init_logger(args.verbose);

    if let Source::ImagePath(path) = &args.source
        && !args.annotate
    {
        return analyze_single(path, &args);
    }

    match run_prediction(&args) {
        Ok(summary) => {
            if summary.processed == 0 && summary.failed > 0 {
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_model_unavailable() => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", MODEL_NOT_FOUND);
            Ok(ExitCode::from(2))
        }
        Err(e) => Err(e.into()),
    }
}
