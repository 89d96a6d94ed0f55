pub mod serialization;

use crate::assets::{GarmentAsset, MeshId};
use crate::color::HexColor;
use crate::config::OrphanPolicy;
use crate::render::projector::SurfaceHit;
use crate::render::ray::Aabb;
use crate::texture::{BitmapId, BitmapRegistry, DecodedImage, TextureSynthesizer};
use glam::{Vec2, Vec3};
use rand::Rng;
use std::collections::HashSet;
use std::fmt;

pub const MIN_ELEMENT_SCALE: f32 = 0.2;
pub const MAX_ELEMENT_SCALE: f32 = 6.0;
/// Local-space distance of one nudge command.
pub const NUDGE_STEP: f32 = 0.06;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Text,
    Image,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementContent {
    Text { text: String, color: HexColor },
    Image { source_hash: String },
}

impl ElementContent {
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Text { .. } => ElementKind::Text,
            Self::Image { .. } => ElementKind::Image,
        }
    }
}

/// Scalar for text, per-axis for images.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElementScale {
    Uniform(f32),
    Axes(Vec2),
}

impl ElementScale {
    pub fn multiplied(self, factor: f32) -> Self {
        let clamp = |value: f32| (value * factor).clamp(MIN_ELEMENT_SCALE, MAX_ELEMENT_SCALE);
        match self {
            Self::Uniform(s) => Self::Uniform(clamp(s)),
            Self::Axes(v) => Self::Axes(Vec2::new(clamp(v.x), clamp(v.y))),
        }
    }

    pub fn axes(self) -> Vec2 {
        match self {
            Self::Uniform(s) => Vec2::splat(s),
            Self::Axes(v) => v,
        }
    }
}

/// Where an element lives.
#[derive(Debug, Clone, PartialEq)]
pub enum Anchor {
    /// Glued to a mesh of the current asset; `position` and `normal` are local to it.
    Mesh(MeshId),
    /// Waiting for an asset; it lands at the kind's default placement plus
    /// `offset`. `orphaned_from` is set when the element lost its mesh.
    Pending {
        offset: Vec3,
        orphaned_from: Option<MeshId>,
    },
    /// Waiting for an asset with an explicit position (imported designs).
    Detached,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecalElement {
    pub id: ElementId,
    pub content: ElementContent,
    pub bitmap: BitmapId,
    pub position: Vec3,
    pub normal: Vec3,
    pub anchor: Anchor,
    pub scale: ElementScale,
}

impl DecalElement {
    pub fn kind(&self) -> ElementKind {
        self.content.kind()
    }

    pub fn anchor_mesh(&self) -> Option<&MeshId> {
        match &self.anchor {
            Anchor::Mesh(id) => Some(id),
            _ => None,
        }
    }

    /// Position local to the anchor mesh, or `None` while the element waits
    /// for its default placement.
    pub fn local_position(&self) -> Option<Vec3> {
        match self.anchor {
            Anchor::Pending { .. } => None,
            _ => Some(self.position),
        }
    }

    pub fn text(&self) -> Option<(&str, HexColor)> {
        match &self.content {
            ElementContent::Text { text, color } => Some((text, *color)),
            ElementContent::Image { .. } => None,
        }
    }
}

/// Default placement on an anchor mesh: above center for text, chest height
/// for images, just inside the front of the mesh's local bounds.
pub fn default_position(kind: ElementKind, bounds: Aabb) -> Vec3 {
    let center = bounds.center();
    let size = bounds.size();
    let lift = match kind {
        ElementKind::Text => 0.15,
        ElementKind::Image => 0.05,
    };
    Vec3::new(
        center.x,
        center.y + size.y * lift,
        bounds.max.z - size.z * 0.08,
    )
}

/// Where an imported element goes once a garment is present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeedPlacement {
    Local(Vec3),
    Default { offset: Vec3 },
}

/// A text element read from a design document.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSeed {
    pub id: Option<ElementId>,
    pub text: String,
    pub color: HexColor,
    pub placement: SeedPlacement,
}

/// Owned session state for placed decals: elements, selection and drag.
#[derive(Debug, Default)]
pub struct DesignState {
    elements: Vec<DecalElement>,
    selected: Option<ElementId>,
    dragging: Option<ElementId>,
    id_counter: u64,
}

impl DesignState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> &[DecalElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn element(&self, id: &ElementId) -> Option<&DecalElement> {
        self.elements.iter().find(|el| &el.id == id)
    }

    pub fn selected_id(&self) -> Option<&ElementId> {
        self.selected.as_ref()
    }

    pub fn selected(&self) -> Option<&DecalElement> {
        self.selected.as_ref().and_then(|id| self.element(id))
    }

    pub fn dragging(&self) -> Option<&ElementId> {
        self.dragging.as_ref()
    }

    fn selected_mut(&mut self) -> Option<&mut DecalElement> {
        let id = self.selected.clone()?;
        self.elements.iter_mut().find(|el| el.id == id)
    }

    fn next_id(&mut self) -> ElementId {
        loop {
            self.id_counter += 1;
            let suffix: u32 = rand::thread_rng().gen();
            let id = ElementId(format!("{:x}-{:08x}", self.id_counter, suffix));
            if self.element(&id).is_none() {
                return id;
            }
        }
    }

    fn push(&mut self, content: ElementContent, bitmap: BitmapId, scale: ElementScale, asset: Option<&GarmentAsset>) -> ElementId {
        let id = self.next_id();
        let kind = content.kind();
        let (anchor, position) = match asset {
            Some(asset) => {
                let primary = asset.primary_mesh();
                (
                    Anchor::Mesh(primary.id.clone()),
                    default_position(kind, primary.local_bounds()),
                )
            }
            None => (
                Anchor::Pending {
                    offset: Vec3::ZERO,
                    orphaned_from: None,
                },
                Vec3::ZERO,
            ),
        };
        self.elements.push(DecalElement {
            id: id.clone(),
            content,
            bitmap,
            position,
            normal: Vec3::Z,
            anchor,
            scale,
        });
        self.selected = Some(id.clone());
        id
    }

    pub fn add_text(
        &mut self,
        text: &str,
        synth: &TextureSynthesizer,
        bitmaps: &mut BitmapRegistry,
        asset: Option<&GarmentAsset>,
    ) -> ElementId {
        let color = HexColor::INK;
        let bitmap = bitmaps.insert(synth.render_text(text, color));
        let content = ElementContent::Text {
            text: text.to_string(),
            color,
        };
        let id = self.push(content, bitmap, ElementScale::Uniform(1.0), asset);
        log::debug!("Added text element {}", id);
        id
    }

    /// Takes ownership of a decoded image through a fresh registry entry.
    pub fn add_image(
        &mut self,
        decoded: &DecodedImage,
        bitmaps: &mut BitmapRegistry,
        asset: Option<&GarmentAsset>,
    ) -> ElementId {
        let bitmap = bitmaps.insert(decoded.image.clone());
        let content = ElementContent::Image {
            source_hash: decoded.source_hash.clone(),
        };
        let id = self.push(content, bitmap, ElementScale::Axes(Vec2::ONE), asset);
        log::debug!("Added image element {}", id);
        id
    }

    /// Selecting an unknown id is a no-op.
    pub fn select(&mut self, id: &ElementId) -> bool {
        if self.element(id).is_none() {
            log::debug!("Ignoring selection of unknown element {}", id);
            return false;
        }
        self.selected = Some(id.clone());
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn set_selected_text(
        &mut self,
        text: &str,
        synth: &TextureSynthesizer,
        bitmaps: &mut BitmapRegistry,
    ) -> bool {
        self.restyle_selected(synth, bitmaps, |current, color| {
            (current != text).then(|| (text.to_string(), color))
        })
    }

    pub fn set_selected_color(
        &mut self,
        color: HexColor,
        synth: &TextureSynthesizer,
        bitmaps: &mut BitmapRegistry,
    ) -> bool {
        self.restyle_selected(synth, bitmaps, |current, old| {
            (old != color).then(|| (current.to_string(), color))
        })
    }

    /// Re-render the selected text element when `change` yields new text/colour,
    /// releasing the superseded bitmap.
    fn restyle_selected(
        &mut self,
        synth: &TextureSynthesizer,
        bitmaps: &mut BitmapRegistry,
        change: impl FnOnce(&str, HexColor) -> Option<(String, HexColor)>,
    ) -> bool {
        let Some(element) = self.selected_mut() else {
            log::debug!("No selection to restyle");
            return false;
        };
        let ElementContent::Text { text, color } = &mut element.content else {
            log::debug!("Selected element {} is not text", element.id);
            return false;
        };
        let Some((next_text, next_color)) = change(text, *color) else {
            return true;
        };
        let bitmap = bitmaps.insert(synth.render_text(&next_text, next_color));
        bitmaps.release(element.bitmap);
        element.bitmap = bitmap;
        *text = next_text;
        *color = next_color;
        true
    }

    pub fn move_selected(&mut self, dx: f32, dy: f32) -> bool {
        if !dx.is_finite() || !dy.is_finite() {
            log::debug!("Ignoring non-finite move ({}, {})", dx, dy);
            return false;
        }
        let Some(element) = self.selected_mut() else {
            return false;
        };
        let delta = Vec3::new(dx, dy, 0.0);
        match &mut element.anchor {
            Anchor::Pending { offset, .. } => *offset += delta,
            _ => element.position += delta,
        }
        true
    }

    pub fn scale_selected(&mut self, factor: f32) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            log::debug!("Ignoring scale factor {}", factor);
            return false;
        }
        let Some(element) = self.selected_mut() else {
            return false;
        };
        element.scale = element.scale.multiplied(factor);
        true
    }

    pub fn remove_selected(&mut self, bitmaps: &mut BitmapRegistry) -> Option<DecalElement> {
        let id = self.selected.take()?;
        let index = self.elements.iter().position(|el| el.id == id)?;
        if self.dragging.as_ref() == Some(&id) {
            self.dragging = None;
        }
        let removed = self.elements.remove(index);
        bitmaps.release(removed.bitmap);
        Some(removed)
    }

    pub fn clear(&mut self, bitmaps: &mut BitmapRegistry) {
        for element in self.elements.drain(..) {
            bitmaps.release(element.bitmap);
        }
        self.selected = None;
        self.dragging = None;
    }

    /// Arm a drag on an existing element. Selecting it is the caller's call.
    pub fn arm_drag(&mut self, id: &ElementId) -> bool {
        if self.element(id).is_none() {
            return false;
        }
        self.dragging = Some(id.clone());
        true
    }

    pub fn disarm_drag(&mut self) {
        self.dragging = None;
    }

    /// Move the dragged element onto `hit`. A miss leaves the element where it
    /// was and disarms the drag.
    pub fn drag_to(&mut self, hit: Option<SurfaceHit>) -> bool {
        let Some(id) = self.dragging.clone() else {
            return false;
        };
        let Some(hit) = hit else {
            log::debug!("Drag of {} lost the surface", id);
            self.dragging = None;
            return false;
        };
        let Some(element) = self.elements.iter_mut().find(|el| el.id == id) else {
            self.dragging = None;
            return false;
        };
        element.anchor = Anchor::Mesh(hit.mesh_id);
        element.position = hit.point;
        element.normal = hit.normal;
        true
    }

    /// Detach every element from the outgoing asset. `position` keeps the
    /// last local position on the old mesh.
    pub fn orphan_all(&mut self) {
        self.dragging = None;
        for element in &mut self.elements {
            if let Anchor::Mesh(id) = &element.anchor {
                element.anchor = Anchor::Pending {
                    offset: Vec3::ZERO,
                    orphaned_from: Some(id.clone()),
                };
            }
        }
    }

    /// Anchor everything not resting on a mesh of `asset` to its primary mesh.
    /// Orphans of a previous asset are dropped instead under [`OrphanPolicy::Drop`].
    /// Returns the number of elements dropped.
    pub fn adopt(&mut self, asset: &GarmentAsset, policy: OrphanPolicy, bitmaps: &mut BitmapRegistry) -> usize {
        let primary = asset.primary_mesh();
        let bounds = primary.local_bounds();
        let mut dropped = Vec::new();
        for element in &mut self.elements {
            let anchor = std::mem::replace(&mut element.anchor, Anchor::Mesh(primary.id.clone()));
            match anchor {
                Anchor::Mesh(id) if asset.contains(&id) => element.anchor = Anchor::Mesh(id),
                Anchor::Mesh(stale) => {
                    log::warn!("Element {} referenced missing mesh {}", element.id, stale);
                    if policy == OrphanPolicy::Drop {
                        dropped.push(element.id.clone());
                    }
                    element.position = default_position(element.content.kind(), bounds);
                    element.normal = Vec3::Z;
                }
                Anchor::Pending {
                    offset,
                    orphaned_from,
                } => {
                    if orphaned_from.is_some() && policy == OrphanPolicy::Drop {
                        dropped.push(element.id.clone());
                    }
                    element.position = default_position(element.content.kind(), bounds) + offset;
                    element.normal = Vec3::Z;
                }
                Anchor::Detached => {}
            }
        }
        for id in &dropped {
            if let Some(index) = self.elements.iter().position(|el| &el.id == id) {
                let removed = self.elements.remove(index);
                bitmaps.release(removed.bitmap);
                log::info!("Dropped orphaned element {}", removed.id);
            }
        }
        if self.selected.as_ref().map_or(false, |id| self.element(id).is_none()) {
            self.selected = None;
        }
        dropped.len()
    }

    /// Replace every element with imported text elements. Duplicate ids keep the
    /// first occurrence.
    pub fn import_text(
        &mut self,
        seeds: Vec<TextSeed>,
        synth: &TextureSynthesizer,
        bitmaps: &mut BitmapRegistry,
        asset: Option<&GarmentAsset>,
    ) -> usize {
        self.clear(bitmaps);
        let mut seen = HashSet::new();
        for seed in seeds {
            let id = match seed.id {
                Some(id) if !seen.contains(&id) => id,
                Some(id) => {
                    log::warn!("Skipping duplicate element id {}", id);
                    continue;
                }
                None => self.next_id(),
            };
            seen.insert(id.clone());
            let (anchor, position) = match (asset, seed.placement) {
                (Some(asset), placement) => {
                    let primary = asset.primary_mesh();
                    let position = match placement {
                        SeedPlacement::Local(position) => position,
                        SeedPlacement::Default { offset } => {
                            default_position(ElementKind::Text, primary.local_bounds()) + offset
                        }
                    };
                    (Anchor::Mesh(primary.id.clone()), position)
                }
                (None, SeedPlacement::Local(position)) => (Anchor::Detached, position),
                (None, SeedPlacement::Default { offset }) => (
                    Anchor::Pending {
                        offset,
                        orphaned_from: None,
                    },
                    Vec3::ZERO,
                ),
            };
            let bitmap = bitmaps.insert(synth.render_text(&seed.text, seed.color));
            self.elements.push(DecalElement {
                id,
                content: ElementContent::Text {
                    text: seed.text,
                    color: seed.color,
                },
                bitmap,
                position,
                normal: Vec3::Z,
                anchor,
                scale: ElementScale::Uniform(1.0),
            });
        }
        self.elements.len()
    }

    /// Elements that can be drawn against `asset`: anchored to one of its
    /// meshes, first occurrence per id.
    pub fn renderable<'a>(&'a self, asset: &'a GarmentAsset) -> impl Iterator<Item = &'a DecalElement> + 'a {
        let mut seen = HashSet::new();
        self.elements.iter().filter(move |el| {
            let anchored = el.anchor_mesh().map_or(false, |mesh| asset.contains(mesh));
            anchored && seen.insert(&el.id)
        })
    }
}
