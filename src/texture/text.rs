//! Print-like text decal bitmaps: outlined glyphs with a soft shadow, ink grain
//! clipped to the glyph fill, and a light distress pass.

use super::canvas::{rgb_unit, Canvas, CoverageMask};
use super::glyphs::GlyphRasterizer;
use crate::color::HexColor;
use image::RgbaImage;
use rand::Rng;

pub const TEXT_CANVAS_WIDTH: u32 = 1024;
pub const TEXT_CANVAS_HEIGHT: u32 = 256;
pub const TEXT_FONT_PX: f32 = 120.0;
/// Visible characters kept for rasterization.
pub const MAX_TEXT_CHARS: usize = 18;

const OUTLINE_RADIUS: u32 = 6;
const SHADOW_BLUR: u32 = 6;
const SHADOW_ALPHA: f32 = 0.22;
const OUTLINE_LUMINANCE_THRESHOLD: f32 = 0.6;
pub const DARK_OUTLINE: HexColor = HexColor::new(0x11, 0x11, 0x11);
pub const LIGHT_OUTLINE: HexColor = HexColor::new(0xf5, 0xf5, 0xf5);

const SPECKLE_COUNT: usize = 2400;
const DISTRESS_COUNT: usize = 320;

pub fn truncate_text(text: &str) -> String {
    text.chars().take(MAX_TEXT_CHARS).collect()
}

/// Dark outline behind light fills, light outline behind dark fills.
pub fn outline_color(fill: HexColor) -> HexColor {
    if fill.relative_luminance() > OUTLINE_LUMINANCE_THRESHOLD {
        DARK_OUTLINE
    } else {
        LIGHT_OUTLINE
    }
}

pub fn render_text_bitmap<R: Rng + ?Sized>(
    glyphs: &dyn GlyphRasterizer,
    text: &str,
    color: HexColor,
    rng: &mut R,
) -> RgbaImage {
    let content = truncate_text(text);
    let fill = glyphs.rasterize_line(&content, TEXT_FONT_PX, TEXT_CANVAS_WIDTH, TEXT_CANVAS_HEIGHT);
    let outline = fill.dilate(OUTLINE_RADIUS);
    let shadow = outline.blur(SHADOW_BLUR);

    let mut canvas = Canvas::new(TEXT_CANVAS_WIDTH, TEXT_CANVAS_HEIGHT);
    canvas.fill_mask(&shadow, [0.0, 0.0, 0.0], SHADOW_ALPHA);
    let outline_rgb = outline_color(color);
    canvas.fill_mask(&outline, rgb_unit([outline_rgb.r, outline_rgb.g, outline_rgb.b]), 1.0);
    canvas.fill_mask(&fill, rgb_unit([color.r, color.g, color.b]), 1.0);

    apply_ink_grain(&mut canvas, &fill, rng);
    apply_distress(&mut canvas, rng);
    canvas.into_image()
}

/// Semi-transparent dark and light speckles, painted source-atop and only where
/// the glyph fill has coverage.
pub fn apply_ink_grain<R: Rng + ?Sized>(canvas: &mut Canvas, clip: &CoverageMask, rng: &mut R) {
    let (width, height) = (canvas.width() as f32, canvas.height() as f32);
    for _ in 0..SPECKLE_COUNT {
        let x = rng.gen_range(0.0..width);
        let y = rng.gen_range(0.0..height);
        let w = rng.gen_range(1.0f32..3.0);
        let h = rng.gen_range(1.0f32..3.0);
        let grey = if rng.gen_bool(0.5) {
            rng.gen_range(12.0f32..32.0)
        } else {
            rng.gen_range(223.0f32..243.0)
        } / 255.0;
        let alpha = rng.gen_range(0.05f32..0.10);

        let (x0, y0) = (x.floor() as i64, y.floor() as i64);
        let (x1, y1) = ((x + w).ceil() as i64, (y + h).ceil() as i64);
        for py in y0..y1 {
            for px in x0..x1 {
                let coverage = clip.get(px, py);
                if coverage > 0.0 {
                    canvas.source_atop(px, py, [grey, grey, grey], alpha * coverage);
                }
            }
        }
    }
}

/// Destination-out specks of sub-pixel to ~1.6 px radius.
pub fn apply_distress<R: Rng + ?Sized>(canvas: &mut Canvas, rng: &mut R) {
    let (width, height) = (canvas.width() as f32, canvas.height() as f32);
    for _ in 0..DISTRESS_COUNT {
        let cx = rng.gen_range(0.0..width);
        let cy = rng.gen_range(0.0..height);
        let radius = rng.gen_range(0.4f32..1.6);
        let alpha = rng.gen_range(0.08f32..0.20);
        let reach = (radius + 1.0).ceil() as i64;
        let (ix, iy) = (cx.floor() as i64, cy.floor() as i64);
        for py in iy - reach..=iy + reach {
            for px in ix - reach..=ix + reach {
                let dx = px as f32 + 0.5 - cx;
                let dy = py as f32 + 0.5 - cy;
                // one pixel of antialiasing at the rim
                let coverage = (radius + 0.5 - (dx * dx + dy * dy).sqrt()).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    canvas.destination_out(px, py, alpha * coverage);
                }
            }
        }
    }
}
