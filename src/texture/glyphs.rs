use super::canvas::CoverageMask;
use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use std::path::{Path, PathBuf};

/// Bold system faces tried when no font is configured.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\segoeuib.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

#[derive(Debug, thiserror::Error)]
pub enum GlyphError {
    #[error("failed to read font {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid font data in {path}")]
    InvalidFont { path: String },
}

/// Produces single-line glyph coverage centred in a fixed mask.
pub trait GlyphRasterizer: Send {
    fn rasterize_line(&self, text: &str, px_size: f32, width: u32, height: u32) -> CoverageMask;

    fn name(&self) -> &str;
}

pub struct FontGlyphs {
    font: FontVec,
    name: String,
}

impl FontGlyphs {
    pub fn from_path(path: &Path) -> Result<Self, GlyphError> {
        let bytes = std::fs::read(path).map_err(|source| GlyphError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let font = FontVec::try_from_vec(bytes).map_err(|_| GlyphError::InvalidFont {
            path: path.display().to_string(),
        })?;
        Ok(Self {
            font,
            name: path.display().to_string(),
        })
    }
}

impl GlyphRasterizer for FontGlyphs {
    fn rasterize_line(&self, text: &str, px_size: f32, width: u32, height: u32) -> CoverageMask {
        let mut mask = CoverageMask::new(width, height);
        let scale = PxScale::from(px_size);
        let scaled = self.font.as_scaled(scale);

        let mut caret = 0.0f32;
        let mut prev = None;
        let mut placed = Vec::with_capacity(text.len());
        for ch in text.chars() {
            let id = self.font.glyph_id(ch);
            if let Some(prev_id) = prev {
                caret += scaled.kern(prev_id, id);
            }
            placed.push((id, caret));
            caret += scaled.h_advance(id);
            prev = Some(id);
        }

        // Centre horizontally; vertically centre the ascent/descent span like a
        // "middle" baseline.
        let origin_x = (width as f32 - caret) * 0.5;
        let baseline = height as f32 * 0.5 + (scaled.ascent() + scaled.descent()) * 0.5;

        for (id, x) in placed {
            let glyph = id.with_scale_and_position(scale, point(origin_x + x, baseline));
            let Some(outlined) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                mask.accumulate(
                    bounds.min.x as i64 + gx as i64,
                    bounds.min.y as i64 + gy as i64,
                    coverage,
                );
            });
        }
        mask
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Solid block per visible character. Used when no font face can be loaded so
/// decals still show legible extents.
pub struct BlockGlyphs;

impl GlyphRasterizer for BlockGlyphs {
    fn rasterize_line(&self, text: &str, px_size: f32, width: u32, height: u32) -> CoverageMask {
        let mut mask = CoverageMask::new(width, height);
        let advance = px_size * 0.62;
        let block_w = px_size * 0.5;
        let block_h = px_size * 0.7;
        let count = text.chars().count() as f32;
        let origin_x = (width as f32 - advance * count) * 0.5;
        let top = (height as f32 - block_h) * 0.5;
        for (i, ch) in text.chars().enumerate() {
            if ch.is_whitespace() {
                continue;
            }
            let x0 = origin_x + i as f32 * advance + (advance - block_w) * 0.5;
            mask.fill_rect(
                x0.round() as i64,
                top.round() as i64,
                (x0 + block_w).round() as i64,
                (top + block_h).round() as i64,
                1.0,
            );
        }
        mask
    }

    fn name(&self) -> &str {
        "block-fallback"
    }
}

/// Configured font first, then common bold system faces, then block glyphs.
pub fn load_glyphs(configured: Option<&Path>) -> Box<dyn GlyphRasterizer> {
    let candidates = configured
        .map(Path::to_path_buf)
        .into_iter()
        .chain(SYSTEM_FONT_CANDIDATES.iter().map(PathBuf::from));
    for path in candidates {
        if !path.exists() {
            continue;
        }
        match FontGlyphs::from_path(&path) {
            Ok(glyphs) => {
                log::info!("Text decals use font {}", glyphs.name());
                return Box::new(glyphs);
            }
            Err(err) => log::warn!("Skipping font: {}", err),
        }
    }
    log::warn!("No usable font found; text decals fall back to block glyphs");
    Box::new(BlockGlyphs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_glyphs_are_centred() {
        let mask = BlockGlyphs.rasterize_line("AB", 100.0, 400, 200);
        assert!(!mask.is_blank());
        // symmetric around the centre column
        let left: f32 = (0..200).map(|x| (0..200).map(|y| mask.get(x, y)).sum::<f32>()).sum();
        let right: f32 = (200..400).map(|x| (0..200).map(|y| mask.get(x, y)).sum::<f32>()).sum();
        assert!((left - right).abs() <= 200.0);
        assert_eq!(mask.get(0, 0), 0.0);
    }

    #[test]
    fn whitespace_is_blank() {
        assert!(BlockGlyphs.rasterize_line("   ", 100.0, 400, 200).is_blank());
    }

    #[test]
    fn missing_font_reports_read_error() {
        let result = FontGlyphs::from_path(Path::new("/definitely/not/here.ttf"));
        assert!(matches!(result, Err(GlyphError::Read { .. })));
    }

    #[test]
    fn garbage_font_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"not a font").unwrap();
        let result = FontGlyphs::from_path(file.path());
        assert!(matches!(result, Err(GlyphError::InvalidFont { .. })));
    }
}
