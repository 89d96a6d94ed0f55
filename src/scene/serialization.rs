//! Versioned design documents.
//!
//! Export is deliberately narrow: only text elements are written, since an
//! image element's source bitmap is not itself persisted. Importing a document
//! therefore replaces the whole element collection with its text elements.

use crate::color::HexColor;
use crate::scene::{Anchor, DesignState, ElementId, ElementKind, SeedPlacement, TextSeed};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DESIGN_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported design version {0}")]
    UnsupportedVersion(u32),
}

pub type Result<T> = std::result::Result<T, SerializationError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignDocument {
    pub version: u32,
    pub garment_type: String,
    pub garment_color: HexColor,
    pub background: HexColor,
    #[serde(default)]
    pub elements: Vec<DesignElementRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignElementRecord {
    pub id: ElementId,
    pub kind: ElementKind,
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_text_color")]
    pub color: HexColor,
    /// Local to the element's anchor mesh. Absent for elements not yet
    /// placed on a garment, which land at their default placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f32; 3]>,
    /// Nudge from the default placement, for records without a position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<[f32; 3]>,
}

fn default_text_color() -> HexColor {
    HexColor::INK
}

impl DesignDocument {
    /// Snapshot of the text elements in `design`.
    pub fn capture(garment_type: &str, garment_color: HexColor, background: HexColor, design: &DesignState) -> Self {
        let elements = design
            .elements()
            .iter()
            .filter_map(|element| {
                let (text, color) = element.text()?;
                let (position, offset) = match (&element.anchor, element.local_position()) {
                    (_, Some(position)) => (Some(position.to_array()), None),
                    (Anchor::Pending { offset, .. }, None) => (None, Some(offset.to_array())),
                    (_, None) => (None, None),
                };
                Some(DesignElementRecord {
                    id: element.id.clone(),
                    kind: ElementKind::Text,
                    text: text.to_string(),
                    color,
                    position,
                    offset,
                })
            })
            .collect();
        Self {
            version: DESIGN_VERSION,
            garment_type: garment_type.to_string(),
            garment_color,
            background,
            elements,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let document: Self = serde_json::from_str(json)?;
        document.check_version()?;
        Ok(document)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn check_version(&self) -> Result<()> {
        if self.version != DESIGN_VERSION {
            return Err(SerializationError::UnsupportedVersion(self.version));
        }
        Ok(())
    }

    /// Text elements to rebuild. Records of any other kind are skipped.
    pub fn text_seeds(&self) -> Vec<TextSeed> {
        self.elements
            .iter()
            .filter(|record| {
                let keep = record.kind == ElementKind::Text;
                if !keep {
                    log::warn!("Skipping non-text element {} in design document", record.id);
                }
                keep
            })
            .map(|record| {
                let position = record.position.map(Vec3::from_array).filter(|p| p.is_finite());
                let placement = match position {
                    Some(position) => SeedPlacement::Local(position),
                    None => SeedPlacement::Default {
                        offset: record
                            .offset
                            .map(Vec3::from_array)
                            .filter(|o| o.is_finite())
                            .unwrap_or(Vec3::ZERO),
                    },
                };
                TextSeed {
                    id: Some(record.id.clone()),
                    text: record.text.clone(),
                    color: record.color,
                    placement,
                }
            })
            .collect()
    }
}

pub fn save_design_to_file(document: &DesignDocument, path: &Path) -> Result<()> {
    let json = document.to_json()?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_design_from_file(path: &Path) -> Result<DesignDocument> {
    let json = std::fs::read_to_string(path)?;
    DesignDocument::from_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::GarmentAsset;
    use crate::texture::decode::DecodedImage;
    use crate::texture::{BitmapRegistry, BlockGlyphs, TextureSynthesizer};
    use image::RgbaImage;
    use std::sync::Arc;

    fn design_with_text_and_image() -> DesignState {
        let synth = TextureSynthesizer::new(Box::new(BlockGlyphs));
        let mut bitmaps = BitmapRegistry::new();
        let asset = GarmentAsset::placeholder("tee", "tee.glb", HexColor::WHITE);
        let mut design = DesignState::new();
        design.add_text("Team 7", &synth, &mut bitmaps, Some(&asset));
        let decoded = DecodedImage {
            source_hash: "feed".into(),
            image: Arc::new(RgbaImage::new(2, 2)),
        };
        design.add_image(&decoded, &mut bitmaps, Some(&asset));
        design
    }

    #[test]
    fn export_keeps_only_text_elements() {
        let design = design_with_text_and_image();
        let document = DesignDocument::capture("tee", HexColor::new(0xd9, 0xd9, 0xd9), HexColor::WHITE, &design);
        assert_eq!(document.version, 1);
        assert_eq!(document.elements.len(), 1);
        let record = &document.elements[0];
        assert_eq!(record.text, "Team 7");
        assert_eq!(record.kind, ElementKind::Text);
        assert_eq!(record.id, design.elements()[0].id);
    }

    #[test]
    fn document_uses_camel_case_shape() {
        let design = design_with_text_and_image();
        let document = DesignDocument::capture("hoodie", HexColor::BLACK, HexColor::WHITE, &design);
        let value: serde_json::Value = serde_json::from_str(&document.to_json().unwrap()).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["garmentType"], "hoodie");
        assert_eq!(value["garmentColor"], "#000000");
        assert_eq!(value["background"], "#ffffff");
        assert_eq!(value["elements"][0]["kind"], "text");
        assert_eq!(value["elements"][0]["color"], "#121212");
        assert_eq!(value["elements"][0]["position"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn other_versions_are_rejected() {
        let json = r##"{"version":2,"garmentType":"tee","garmentColor":"#ffffff","background":"#ffffff","elements":[]}"##;
        assert!(matches!(
            DesignDocument::from_json(json),
            Err(SerializationError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn seeds_skip_image_records() {
        let json = r##"{
            "version": 1,
            "garmentType": "tee",
            "garmentColor": "#d9d9d9",
            "background": "#ffffff",
            "elements": [
                {"id": "a", "kind": "text", "text": "Hi", "color": "#ff0000", "position": [0.1, 0.2, 0.3]},
                {"id": "b", "kind": "image", "position": [0, 0, 0]}
            ]
        }"##;
        let document = DesignDocument::from_json(json).unwrap();
        let seeds = document.text_seeds();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].text, "Hi");
        assert_eq!(seeds[0].color, HexColor::new(255, 0, 0));
        assert_eq!(seeds[0].placement, SeedPlacement::Local(Vec3::new(0.1, 0.2, 0.3)));
    }

    #[test]
    fn unplaced_elements_export_their_offset() {
        let synth = TextureSynthesizer::new(Box::new(BlockGlyphs));
        let mut bitmaps = BitmapRegistry::new();
        let mut design = DesignState::new();
        design.add_text("early", &synth, &mut bitmaps, None);
        design.move_selected(0.0, 0.06);

        let document = DesignDocument::capture("tee", HexColor::WHITE, HexColor::WHITE, &design);
        let record = &document.elements[0];
        assert_eq!(record.position, None);
        assert_eq!(record.offset, Some([0.0, 0.06, 0.0]));
        let value: serde_json::Value = serde_json::from_str(&document.to_json().unwrap()).unwrap();
        assert!(value["elements"][0].get("position").is_none());

        let seeds = document.text_seeds();
        assert_eq!(
            seeds[0].placement,
            SeedPlacement::Default {
                offset: Vec3::new(0.0, 0.06, 0.0)
            }
        );
    }

    #[test]
    fn non_finite_positions_fall_back_to_default_placement() {
        let mut document = DesignDocument::capture("tee", HexColor::WHITE, HexColor::WHITE, &DesignState::new());
        document.elements.push(DesignElementRecord {
            id: ElementId::new("x"),
            kind: ElementKind::Text,
            text: "x".into(),
            color: HexColor::INK,
            position: Some([f32::NAN, 0.0, 0.0]),
            offset: None,
        });
        assert_eq!(
            document.text_seeds()[0].placement,
            SeedPlacement::Default { offset: Vec3::ZERO }
        );
    }

    #[test]
    fn save_and_load_via_file() {
        let design = design_with_text_and_image();
        let document = DesignDocument::capture("jacket", HexColor::WHITE, HexColor::WHITE, &design);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("design.json");
        for _ in 0..10 {
            save_design_to_file(&document, &path).unwrap();
            assert_eq!(load_design_from_file(&path).unwrap(), document);
        }
        assert!(matches!(
            load_design_from_file(&dir.path().join("missing.json")),
            Err(SerializationError::Io(_))
        ));
    }
}
