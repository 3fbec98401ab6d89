use ab_glyph::FontVec;
use std::path::Path;

use crate::error::{AppError, Result};

pub fn load_font(font_path: &Path) -> Result<FontVec> {
    let data = std::fs::read(font_path)
        .map_err(|e| AppError::FontLoad(format!("{:?}: {}", font_path, e)))?;
    FontVec::try_from_vec(data)
        .map_err(|e| AppError::FontLoad(format!("{:?}: {}", font_path, e)))
}
