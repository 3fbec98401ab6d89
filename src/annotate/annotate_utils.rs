use image::{Rgb, RgbImage};

/// Draw a transparent rectangle on an image
pub fn draw_transparent_rect(
    img: &mut RgbImage,
    x: i32,
    y: i32,
    w: u32,
    h: u32,
    color: Rgb<u8>,
    alpha: f32,
) {
    let (width, height) = img.dimensions();
    let alpha = alpha.clamp(0.0, 1.0);
    let inv_alpha = 1.0 - alpha;

    let tint = color.0.map(|c| f32::from(c) * alpha);

    for py in y.max(0)..(y + h as i32).min(height as i32) {
        for px in x.max(0)..(x + w as i32).min(width as i32) {
            let pixel = img.get_pixel_mut(px as u32, py as u32);
            for (channel, t) in pixel.0.iter_mut().zip(tint) {
                *channel = f32::from(*channel).mul_add(inv_alpha, t) as u8;
            }
        }
    }
}

/// Color used for a class bar: green for the healthy class, amber otherwise.
pub const fn class_color(is_tumor: bool) -> Rgb<u8> {
    if is_tumor {
        Rgb([246, 196, 69])
    } else {
        Rgb([87, 204, 153])
    }
}
