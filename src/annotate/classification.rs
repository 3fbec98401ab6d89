use ab_glyph::{Font, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::pipeline::Prediction;

use super::annotate_utils::{class_color, draw_transparent_rect};

/// Draw the per-class probability panel in the top-left corner
pub fn draw_classification<F: Font>(
    img: &mut RgbImage,
    prediction: &Prediction,
    font: Option<&F>,
    top_k: usize,
    show_bars: bool,
) {
    let entries = prediction.top_k(top_k);
    if entries.is_empty() || (font.is_none() && !show_bars) {
        // keep the panel background so the image is visibly marked
        if !entries.is_empty() {
            let (width, height) = img.dimensions();
            draw_transparent_rect(img, 0, 0, width / 2, height / 4, Rgb([0, 0, 0]), 0.4);
        }
        return;
    }

    let (width, _height) = img.dimensions();

    // Adaptive font scale based on image width
    let scale_factor = (width as f32 / 600.0).clamp(0.4, 2.0);
    let scale = PxScale::from(24.0 * scale_factor);
    let line_height = (scale.y * 1.3) as i32;
    let bar_height = ((scale.y * 0.5) as u32).max(2);
    let bar_max_width = ((140.0 * scale_factor) as u32).max(10);

    let x_pos = (12.0 * scale_factor) as i32;
    let mut y_pos = (12.0 * scale_factor) as i32;

    let labels: Vec<String> = entries
        .iter()
        .map(|(class, prob)| format!("{} {:.1}%", class.display_name(), prob * 100.0))
        .collect();

    // Basic approximation: chars * scale * 0.5 (average char width)
    let text_width = if font.is_some() {
        labels
            .iter()
            .map(|l| (l.len() as f32 * scale.x * 0.5) as u32)
            .max()
            .unwrap_or(0)
    } else {
        0
    };
    let bar_width = if show_bars { bar_max_width + 10 } else { 0 };

    let box_width = text_width + bar_width + 20;
    let box_height = (entries.len() as i32 * line_height) as u32 + 10;
    draw_transparent_rect(
        img,
        x_pos - 5,
        y_pos - 5,
        box_width,
        box_height,
        Rgb([0, 0, 0]),
        0.45,
    );

    for ((class, prob), label) in entries.iter().zip(&labels) {
        let mut x = x_pos;

        if let Some(font) = font {
            draw_text_mut(img, Rgb([255, 255, 255]), x, y_pos, scale, font, label);
            x += text_width as i32 + 10;
        }

        if show_bars {
            let bar_y = y_pos + (line_height - bar_height as i32) / 2;
            let outline = Rect::at(x, bar_y).of_size(bar_max_width, bar_height);
            draw_hollow_rect_mut(img, outline, Rgb([255, 255, 255]));

            let filled = (prob.clamp(0.0, 1.0) * bar_max_width as f32).round() as u32;
            if filled > 0 {
                let fill = Rect::at(x, bar_y).of_size(filled, bar_height);
                draw_filled_rect_mut(img, fill, class_color(class.is_tumor()));
            }
        }

        y_pos += line_height;
    }
}
