// crates/cv-synth/src/placeholder.rs

use std::io::Cursor;

use image::{ImageFormat, ImageResult, Rgba, RgbaImage};

/// Extract a color hint from the prompt
pub fn color_from_prompt(prompt: &str) -> [u8; 3] {
    let prompt_lower = prompt.to_lowercase();

    if prompt_lower.contains("red") {
        [255, 100, 100]
    } else if prompt_lower.contains("blue") {
        [100, 100, 255]
    } else if prompt_lower.contains("green") {
        [100, 255, 100]
    } else if prompt_lower.contains("yellow") {
        [255, 255, 100]
    } else if prompt_lower.contains("purple") {
        [200, 100, 255]
    } else {
        // neutral gray-blue
        [150, 150, 180]
    }
}

/// Render one lit sphere on a gradient. `variation` moves the light so that redundant
/// requests for the same prompt still come back visibly different.
pub fn render_variation(variation: usize, base_color: [u8; 3], (width, height): (u32, u32)) -> RgbaImage {
    let mut img = RgbaImage::new(width, height);

    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;
    let radius = width.min(height) as f32 * 0.3;

    let angle = (variation % 4) as f32 * std::f32::consts::FRAC_PI_2;
    let light_angle = angle + std::f32::consts::FRAC_PI_4;
    let light_x = light_angle.cos() * radius * 0.66;
    let light_y = light_angle.sin() * radius * 0.66;

    for (x, y, pixel) in img.enumerate_pixels_mut() {
        let dx = x as f32 - center_x;
        let dy = y as f32 - center_y;
        let dist = (dx * dx + dy * dy).sqrt();

        *pixel = if dist < radius {
            let depth = (1.0 - (dist / radius).powi(2)).sqrt();
            let brightness = depth * 0.7 + 0.3;

            let light_dist = ((dx - light_x).powi(2) + (dy - light_y).powi(2)).sqrt();
            let light_factor = (1.0 - (light_dist / (radius * 2.0)).min(1.0)) * 0.3 + 0.7;
            let shade = brightness * light_factor;

            Rgba([
                (base_color[0] as f32 * shade) as u8,
                (base_color[1] as f32 * shade) as u8,
                (base_color[2] as f32 * shade) as u8,
                255,
            ])
        } else {
            let bg = 0.2 + (y as f32 / height as f32) * 0.1;
            Rgba([(50.0 * bg) as u8, (50.0 * bg) as u8, (60.0 * bg) as u8, 255])
        };
    }

    img
}

pub fn encode_png(img: &RgbaImage) -> ImageResult<Vec<u8>> {
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, ImageFormat::Png)?;
    Ok(bytes.into_inner())
}
