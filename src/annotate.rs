// -- submodules
mod annotate_utils;
mod classification;
mod font;

use ab_glyph::FontVec;
use classification::draw_classification;
use font::load_font;
use serde::Deserialize;
use std::path::PathBuf;

// -- external imports
use crate::error::Result;
use crate::pipeline::Prediction;
use image::DynamicImage;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnnotateConfigs {
    /// whether to draw probability bars
    pub show_bars: bool,

    /// whether to write class names and percentages (needs `font`)
    pub show_label: bool,

    /// TrueType font used for labels
    pub font: Option<PathBuf>,

    /// (top-k) number of classes to show
    pub top_k: Option<usize>,
}

impl Default for AnnotateConfigs {
    fn default() -> Self {
        Self {
            show_bars: true,
            show_label: true,
            font: None,
            top_k: None,
        }
    }
}

impl AnnotateConfigs {
    /// Read the label font, if labels are wanted and a font is configured.
    pub fn load_font(&self) -> Result<Option<FontVec>> {
        match (&self.font, self.show_label) {
            (Some(path), true) => load_font(path).map(Some),
            (None, true) => {
                tracing::debug!("No font configured, drawing bars without labels");
                Ok(None)
            }
            _ => Ok(None),
        }
    }
}

/// Draw the prediction panel onto a copy of `img`.
///
/// Reads the configured font on every call; batch callers load it once with
/// [`AnnotateConfigs::load_font`] and use [`annotate_with_font`].
pub fn annotate_image(
    img: &DynamicImage,
    prediction: &Prediction,
    configs: &AnnotateConfigs,
) -> Result<DynamicImage> {
    let font = configs.load_font()?;
    Ok(annotate_with_font(img, prediction, configs, font.as_ref()))
}

/// Draw the prediction panel with an already loaded font.
pub fn annotate_with_font(
    img: &DynamicImage,
    prediction: &Prediction,
    configs: &AnnotateConfigs,
    font: Option<&FontVec>,
) -> DynamicImage {
    let mut annotated = img.to_rgb8();
    let top_k = configs.top_k.unwrap_or(crate::classes::NUM_CLASSES);
    draw_classification(&mut annotated, prediction, font, top_k, configs.show_bars);
    DynamicImage::ImageRgb8(annotated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use image::{GenericImageView, Rgb, RgbImage};

    fn prediction() -> Prediction {
        Prediction::from_probabilities([0.7, 0.1, 0.1, 0.1]).unwrap()
    }

    #[test]
    fn test_annotate_draws_bars() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 300, Rgb([128, 128, 128])));
        let annotated = annotate_image(&img, &prediction(), &AnnotateConfigs::default()).unwrap();
        assert_eq!(annotated.dimensions(), (300, 300));
        assert_ne!(annotated.to_rgb8(), img.to_rgb8());
    }

    #[test]
    fn test_annotate_without_bars_or_font_keeps_pixels_outside_panel() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 300, Rgb([255, 255, 255])));
        let cfg = AnnotateConfigs {
            show_bars: false,
            ..Default::default()
        };
        let annotated = annotate_with_font(&img, &prediction(), &cfg, None).to_rgb8();
        assert_eq!(annotated.get_pixel(299, 299).0, [255, 255, 255]);
        assert_ne!(annotated.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_annotate_missing_font() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(50, 50));
        let cfg = AnnotateConfigs {
            font: Some(PathBuf::from("/nonexistent/font.ttf")),
            ..Default::default()
        };
        let err = annotate_image(&img, &prediction(), &cfg).unwrap_err();
        assert!(matches!(err, AppError::FontLoad(_)));

        // labels off: the font is never read
        let cfg = AnnotateConfigs {
            show_label: false,
            ..cfg
        };
        assert!(cfg.load_font().unwrap().is_none());
    }
}
