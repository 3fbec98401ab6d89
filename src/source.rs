// -- submodules
mod loader;
mod source_utils;

pub use loader::SourceLoader;
pub use source_utils::{UPLOAD_EXTENSIONS, collect_images_from_dir, is_upload_file};

// -- external imports
use image::DynamicImage;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct SourceMeta {
    /// Current image index (0-based).
    pub frame_idx: usize,
    /// Total images in the source.
    pub total_frames: usize,
    /// Source path if available.
    pub source_path: Option<PathBuf>,
}

impl SourceMeta {
    pub fn frame_stem(&self) -> String {
        match &self.source_path {
            Some(p) => p
                .file_stem()
                .unwrap_or_default()
                .to_string_lossy()
                .into_owned(),
            None => format!("image_{}", self.frame_idx),
        }
    }

    pub fn frame_name(&self) -> String {
        match &self.source_path {
            Some(p) => p
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .into_owned(),
            None => format!("image_{}", self.frame_idx),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum Source {
    /// Nothing selected yet
    #[default]
    None,

    /// Path to a single image file
    ImagePath(PathBuf),

    /// Path to directory containing MRI images
    Directory(PathBuf),

    /// List of image paths and/or directories
    PathVec(Vec<PathBuf>),

    /// Image data in memory
    Image(DynamicImage),
}

impl Source {
    pub fn is_none(&self) -> bool {
        matches!(self, Source::None)
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Source::ImagePath(_) | Source::Image(_))
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        if path.as_os_str().is_empty() {
            Source::None
        } else if path.is_dir() {
            Source::Directory(path)
        } else {
            Source::ImagePath(path)
        }
    }
}

impl From<&str> for Source {
    fn from(path: &str) -> Self {
        Source::from(PathBuf::from(path))
    }
}

impl From<Vec<PathBuf>> for Source {
    fn from(mut paths: Vec<PathBuf>) -> Self {
        match paths.len() {
            0 => Source::None,
            1 => paths.remove(0).into(),
            _ => Source::PathVec(paths),
        }
    }
}

impl From<DynamicImage> for Source {
    fn from(image: DynamicImage) -> Self {
        Source::Image(image)
    }
}

/// Custom deserializer for Source from toml
/// Only supports path-based variants
pub fn deserialize_source<'de, D>(deserializer: D) -> Result<Source, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PathOrVec {
        Path(PathBuf),
        Vec(Vec<PathBuf>),
    }

    match PathOrVec::deserialize(deserializer)? {
        PathOrVec::Path(path) => Ok(path.into()),
        PathOrVec::Vec(paths) => Ok(paths.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_source_from_pathbuf() {
        let path = PathBuf::from("scan.jpg");
        match Source::from(path.clone()) {
            Source::ImagePath(p) => assert_eq!(p, path),
            other => panic!("Expected ImagePath, got {:?}", other),
        }

        let temp_dir = TempDir::new().unwrap();
        match Source::from(temp_dir.path().to_path_buf()) {
            Source::Directory(p) => assert_eq!(p, temp_dir.path()),
            other => panic!("Expected Directory, got {:?}", other),
        }

        assert!(Source::from("").is_none());
    }

    #[test]
    fn test_source_from_vec() {
        assert!(Source::from(Vec::<PathBuf>::new()).is_none());
        assert!(Source::from(vec![PathBuf::from("a.png")]).is_image());
        assert!(matches!(
            Source::from(vec![PathBuf::from("a.png"), PathBuf::from("b.png")]),
            Source::PathVec(v) if v.len() == 2
        ));
    }

    #[test]
    fn test_meta_names() {
        let meta = SourceMeta {
            frame_idx: 3,
            total_frames: 5,
            source_path: Some(PathBuf::from("/data/Tr-gl_0010.jpg")),
        };
        assert_eq!(meta.frame_stem(), "Tr-gl_0010");
        assert_eq!(meta.frame_name(), "Tr-gl_0010.jpg");

        let meta = SourceMeta {
            source_path: None,
            ..meta
        };
        assert_eq!(meta.frame_stem(), "image_3");
    }
}
