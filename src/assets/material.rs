//! Normalized metal/roughness material records and the translation from legacy
//! material extensions.

use crate::color::HexColor;
use crate::render::easing::damp_factor;

/// Texture slot reference into the source asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRef {
    pub index: usize,
    pub tex_coord: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialOrigin {
    MetallicRoughness,
    /// Lossy translation from `KHR_materials_pbrSpecularGlossiness`.
    SpecularGlossiness,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StandardMaterial {
    pub name: Option<String>,
    /// Linear RGBA.
    pub base_color: [f32; 4],
    pub base_color_texture: Option<TextureRef>,
    pub metallic: f32,
    pub roughness: f32,
    pub metallic_roughness_texture: Option<TextureRef>,
    pub double_sided: bool,
    pub origin: MaterialOrigin,
}

impl Default for StandardMaterial {
    fn default() -> Self {
        Self {
            name: None,
            base_color: [1.0, 1.0, 1.0, 1.0],
            base_color_texture: None,
            metallic: 1.0,
            roughness: 1.0,
            metallic_roughness_texture: None,
            double_sided: false,
            origin: MaterialOrigin::MetallicRoughness,
        }
    }
}

impl StandardMaterial {
    pub fn flat(color: HexColor, roughness: f32, metallic: f32) -> Self {
        let [r, g, b] = color.to_linear();
        Self {
            name: Some("placeholder".to_string()),
            base_color: [r, g, b, 1.0],
            metallic,
            roughness,
            origin: MaterialOrigin::Placeholder,
            ..Self::default()
        }
    }

    pub fn rgb(&self) -> [f32; 3] {
        [self.base_color[0], self.base_color[1], self.base_color[2]]
    }

    /// Replace the colour, keeping alpha.
    pub fn set_rgb(&mut self, rgb: [f32; 3]) {
        self.base_color[..3].copy_from_slice(&rgb);
    }

    /// Exponentially ease the colour toward `target` (linear RGB).
    pub fn ease_rgb(&mut self, target: [f32; 3], time_constant: f32, dt: f32) {
        let k = damp_factor(time_constant, dt);
        for (channel, goal) in self.base_color.iter_mut().zip(target) {
            *channel += (goal - *channel) * k;
        }
    }
}

/// Material extensions with a known translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyExtension {
    SpecularGlossiness,
}

impl LegacyExtension {
    pub const ALL: [LegacyExtension; 1] = [LegacyExtension::SpecularGlossiness];

    pub fn tag(self) -> &'static str {
        match self {
            Self::SpecularGlossiness => "KHR_materials_pbrSpecularGlossiness",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ext| ext.tag() == tag)
    }
}

/// The parts of a specular/glossiness description that survive migration.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecularGlossiness {
    pub diffuse_factor: [f32; 4],
    pub specular_factor: [f32; 3],
    pub glossiness_factor: f32,
    pub diffuse_texture: Option<TextureRef>,
    pub specular_glossiness_texture: Option<TextureRef>,
}

impl Default for SpecularGlossiness {
    fn default() -> Self {
        Self {
            diffuse_factor: [1.0; 4],
            specular_factor: [1.0; 3],
            glossiness_factor: 1.0,
            diffuse_texture: None,
            specular_glossiness_texture: None,
        }
    }
}

/// Diffuse maps straight to base colour, roughness is `1 - glossiness` and
/// metalness is forced to zero. The specular/glossiness texture is reused as the
/// roughness map, which only approximates the original look.
pub fn migrate_specular_glossiness(
    name: Option<String>,
    legacy: &SpecularGlossiness,
    double_sided: bool,
) -> StandardMaterial {
    StandardMaterial {
        name,
        base_color: legacy.diffuse_factor,
        base_color_texture: legacy.diffuse_texture,
        metallic: 0.0,
        roughness: (1.0 - legacy.glossiness_factor).clamp(0.0, 1.0),
        metallic_roughness_texture: legacy.specular_glossiness_texture,
        double_sided,
        origin: MaterialOrigin::SpecularGlossiness,
    }
}
