use image::{DynamicImage, ImageReader};
use std::iter::ExactSizeIterator;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

use super::source_utils::{collect_images_from_dir, is_upload_file};
use super::{Source, SourceMeta};

#[derive(Debug, Clone)]
enum FrameData {
    Path(PathBuf),
    Image(DynamicImage),
}

/// Lazily opens the images of a [`Source`], one per step.
#[derive(Debug)]
pub struct SourceLoader {
    current_idx: usize,
    frames: Vec<FrameData>,
    len: usize,
}

impl SourceLoader {
    pub fn new(source: &Source) -> Result<Self> {
        let frames = match source {
            Source::None => vec![],
            Source::ImagePath(path) => {
                if is_upload_file(path) {
                    vec![FrameData::Path(path.clone())]
                } else {
                    tracing::warn!("Skipping {:?}: not a jpg, jpeg or png file", path);
                    vec![]
                }
            }
            Source::Directory(dir_path) => collect_images_from_dir(dir_path)?
                .into_iter()
                .map(FrameData::Path)
                .collect(),
            Source::PathVec(paths) => {
                let mut frames = vec![];
                for p in paths {
                    if p.is_dir() {
                        frames.extend(collect_images_from_dir(p)?.into_iter().map(FrameData::Path));
                    } else if is_upload_file(p) {
                        frames.push(FrameData::Path(p.clone()));
                    } else {
                        tracing::warn!("Skipping {:?}: not a jpg, jpeg or png file", p);
                    }
                }
                frames
            }
            Source::Image(img) => vec![FrameData::Image(img.clone())],
        };
        let len = frames.len();

        Ok(Self {
            current_idx: 0,
            frames,
            len,
        })
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Iterator for SourceLoader {
    /// A decode failure is reported for its image instead of ending the run.
    type Item = (Result<DynamicImage>, SourceMeta);

    fn next(&mut self) -> Option<Self::Item> {
        let frame_data = self.frames.get(self.current_idx)?;
        let (image, source_path) = match frame_data {
            FrameData::Path(p) => (open_image(p), Some(p.clone())),
            FrameData::Image(img) => (Ok(img.clone()), None),
        };

        let meta = SourceMeta {
            frame_idx: self.current_idx,
            total_frames: self.len,
            source_path,
        };

        self.current_idx += 1;
        Some((image, meta))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.current_idx;
        (remaining, Some(remaining))
    }
}

/// Decode by content, like an upload; the extension only filters the listing.
fn open_image(p: &Path) -> Result<DynamicImage> {
    ImageReader::open(p)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(image::ImageError::IoError)
        .and_then(|reader| reader.decode())
        .map_err(|e| AppError::InferenceFailure(format!("cannot decode {:?}: {}", p, e)))
}

/// Implement ExactSizeIterator (to use indicatif's ProgressIterator)
impl ExactSizeIterator for SourceLoader {}
