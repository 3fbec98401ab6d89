use std::path::{Path, PathBuf};

use crate::error::Result;

/// Extensions accepted for uploaded MRI images.
pub const UPLOAD_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

pub fn is_upload_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| {
        let ext = ext.to_string_lossy().to_lowercase();
        UPLOAD_EXTENSIONS.contains(&ext.as_str())
    })
}

/// Image files directly inside `dir`, sorted by path.
pub fn collect_images_from_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut image_paths = vec![];
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_upload_file(&path) {
            image_paths.push(path);
        }
    }
    image_paths.sort();
    Ok(image_paths)
}
