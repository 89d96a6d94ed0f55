use super::canvas::Canvas;
use image::RgbaImage;

pub const SELECTION_SIZE: u32 = 512;
const INSET: f32 = 16.0;
const DASH: f32 = 28.0;
const GAP: f32 = 18.0;
const UNDERLAY_HALF_WIDTH: f32 = 5.0;
const OVERLAY_HALF_WIDTH: f32 = 2.0;

/// Dashed rectangle, white underlay then black overlay, readable on any garment.
pub fn render_selection_indicator() -> RgbaImage {
    let mut canvas = Canvas::new(SELECTION_SIZE, SELECTION_SIZE);
    stroke_dashed_rect(&mut canvas, UNDERLAY_HALF_WIDTH, [1.0, 1.0, 1.0]);
    stroke_dashed_rect(&mut canvas, OVERLAY_HALF_WIDTH, [0.0, 0.0, 0.0]);
    canvas.into_image()
}

fn stroke_dashed_rect(canvas: &mut Canvas, half_width: f32, rgb: [f32; 3]) {
    let (w, h) = (canvas.width() as f32, canvas.height() as f32);
    let (left, top, right, bottom) = (INSET, INSET, w - INSET, h - INSET);
    let inner_w = right - left;
    let inner_h = bottom - top;

    for y in 0..canvas.height() as i64 {
        for x in 0..canvas.width() as i64 {
            let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
            // distance from the rectangle path and the arc length along it
            let candidates = [
                ((py - top).abs(), px - left, (left..=right).contains(&px)),
                ((px - right).abs(), inner_w + (py - top), (top..=bottom).contains(&py)),
                ((py - bottom).abs(), inner_w + inner_h + (right - px), (left..=right).contains(&px)),
                ((px - left).abs(), 2.0 * inner_w + inner_h + (bottom - py), (top..=bottom).contains(&py)),
            ];
            let hit = candidates
                .iter()
                .filter(|(distance, _, along)| *along && *distance <= half_width)
                .map(|(_, arc, _)| *arc)
                .next();
            if let Some(arc) = hit {
                if arc.rem_euclid(DASH + GAP) < DASH {
                    canvas.source_over(x, y, rgb, 1.0);
                }
            }
        }
    }
}
