//! Texture synthesis for decals: text and selection bitmaps, decoded images, and
//! the registry that owns every bitmap handed to the renderer.

mod canvas;
pub mod decode;
pub mod glyphs;
pub mod selection;
pub mod text;

pub use canvas::{Canvas, CoverageMask};
pub use decode::{DecodeError, DecodeQueue, DecodedImage, ImageSource};
pub use glyphs::{load_glyphs, BlockGlyphs, FontGlyphs, GlyphError, GlyphRasterizer};
pub use selection::render_selection_indicator;
pub use text::{outline_color, render_text_bitmap, truncate_text, MAX_TEXT_CHARS};

use crate::color::HexColor;
use image::RgbaImage;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;

/// Handle to a bitmap owned by [`BitmapRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BitmapId(u64);

impl BitmapId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Owns synthesized and decoded bitmaps. Every id is released at most once;
/// a second release is reported and ignored.
#[derive(Default)]
pub struct BitmapRegistry {
    next_id: u64,
    live: HashMap<BitmapId, Arc<RgbaImage>>,
    released: u64,
}

impl BitmapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, image: impl Into<Arc<RgbaImage>>) -> BitmapId {
        self.next_id += 1;
        let id = BitmapId(self.next_id);
        self.live.insert(id, image.into());
        id
    }

    pub fn get(&self, id: BitmapId) -> Option<&RgbaImage> {
        self.live.get(&id).map(Arc::as_ref)
    }

    pub fn contains(&self, id: BitmapId) -> bool {
        self.live.contains_key(&id)
    }

    pub fn release(&mut self, id: BitmapId) -> bool {
        if self.live.remove(&id).is_some() {
            self.released += 1;
            true
        } else {
            log::warn!("Bitmap {} released twice or never registered", id.0);
            false
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn released_count(&self) -> u64 {
        self.released
    }
}

/// Glyph backend plus the procedural pipeline for text decals.
pub struct TextureSynthesizer {
    glyphs: Box<dyn GlyphRasterizer>,
}

impl TextureSynthesizer {
    pub fn new(glyphs: Box<dyn GlyphRasterizer>) -> Self {
        Self { glyphs }
    }

    pub fn glyph_source(&self) -> &str {
        self.glyphs.name()
    }

    pub fn render_text(&self, text: &str, color: HexColor) -> RgbaImage {
        self.render_text_with(text, color, &mut rand::thread_rng())
    }

    pub fn render_text_with<R: Rng + ?Sized>(
        &self,
        text: &str,
        color: HexColor,
        rng: &mut R,
    ) -> RgbaImage {
        render_text_bitmap(self.glyphs.as_ref(), text, color, rng)
    }

    pub fn render_selection_indicator(&self) -> RgbaImage {
        render_selection_indicator()
    }
}
