// -- imports
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::annotate::AnnotateConfigs;
use crate::error::{AppError, Result};
use crate::model::ModelConfig;
use crate::predict::PredictArgs;
use crate::source::Source;

// -- config

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TomlConfig {
    model: ModelConfig,
    predict: PredictArgs,
    annotate: AnnotateConfigs,
}

impl TomlConfig {
    /// Parse TOML config file with explicit project root for path resolution.
    ///
    /// # Arguments
    ///
    /// * `toml_path` - Path to the TOML config file
    /// * `project_root` - Base directory for resolving relative paths
    ///
    /// # Errors
    ///
    /// Returns `AppError` if:
    /// - The path is not a valid toml file
    /// - File read fails
    /// - TOML parsing fails
    pub fn from_toml(toml_path: &Path, project_root: &Path) -> Result<Self> {
        if !toml_path.is_file() || toml_path.extension().is_none_or(|ext| ext != "toml") {
            return Err(AppError::Config(format!(
                "TOML config path is not a valid .toml file: {:?}",
                toml_path
            )));
        }

        let content = std::fs::read_to_string(toml_path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.resolve_paths(project_root);
        Ok(config)
    }

    /// Resolve relative paths against project root
    fn resolve_paths(&mut self, project_root: &Path) {
        let resolve = |p: &Path| -> PathBuf {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                project_root.join(p)
            }
        };

        self.model.path = resolve(&self.model.path);

        // re-derive single paths: a relative directory is only found once resolved
        self.predict.source = match &self.predict.source {
            Source::ImagePath(p) | Source::Directory(p) => Source::from(resolve(p)),
            Source::PathVec(paths) => Source::PathVec(paths.iter().map(|p| resolve(p)).collect()),
            other => other.clone(),
        };

        if let Some(save_dir) = self.predict.save_dir.as_mut() {
            *save_dir = resolve(save_dir);
        }

        if let Some(font) = self.annotate.font.as_mut() {
            *font = resolve(font);
        }
    }
}

impl From<TomlConfig> for PredictArgs {
    fn from(config: TomlConfig) -> Self {
        Self {
            model: config.model,
            annotate_cfg: config.annotate,
            ..config.predict
        }
    }
}

// -- public API

/// Parse TOML config file and return PredictArgs.
///
/// # Arguments
///
/// * `toml_path` - Path to the TOML config file
/// * `project_root` - Base directory for resolving relative paths
///
/// # Errors
///
/// Returns `AppError` if TOML parsing or path resolution fails.
pub fn parse_toml(toml_path: &Path, project_root: &Path) -> Result<PredictArgs> {
    TomlConfig::from_toml(toml_path, project_root).map(Into::into)
}

// -- tests
