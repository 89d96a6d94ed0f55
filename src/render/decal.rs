//! Decal render list: one projected box per placed element, plus the
//! selection indicator, ready for whatever backend draws them.

use super::projector::orientation_from_normal;
use super::ray::{Aabb, Ray};
use crate::assets::{GarmentAsset, MeshId};
use crate::scene::{DecalElement, DesignState, ElementId, ElementKind};
use crate::texture::BitmapId;
use glam::{Mat4, Quat, Vec3};

/// Projection depth of every decal box.
pub const DECAL_DEPTH: f32 = 0.6;
const TEXT_BOX: [f32; 2] = [0.7, 0.22];
const IMAGE_BOX: f32 = 0.6;
const MIN_DECAL_EXTENT: f32 = 0.05;
const SELECTION_GROWTH: f32 = 1.1;
const SELECTION_LIFT: f32 = 0.002;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Normal,
    Multiply,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecalMaterial {
    pub blend: BlendMode,
    pub opacity: f32,
    pub polygon_offset: f32,
    pub depth_write: bool,
    pub alpha_test: f32,
}

impl DecalMaterial {
    pub const TEXT: Self = Self {
        blend: BlendMode::Multiply,
        opacity: 0.9,
        polygon_offset: -4.0,
        depth_write: false,
        alpha_test: 0.05,
    };
    pub const IMAGE: Self = Self {
        blend: BlendMode::Normal,
        opacity: 0.97,
        ..Self::TEXT
    };
    pub const SELECTION: Self = Self {
        blend: BlendMode::Normal,
        opacity: 1.0,
        ..Self::TEXT
    };

    pub fn for_kind(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Text => Self::TEXT,
            ElementKind::Image => Self::IMAGE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecalLayer {
    Content,
    Selection,
}

/// A decal box in its anchor mesh's local space.
#[derive(Debug, Clone, PartialEq)]
pub struct DecalInstance {
    pub element_id: ElementId,
    pub layer: DecalLayer,
    pub mesh_id: MeshId,
    pub bitmap: BitmapId,
    pub position: Vec3,
    pub orientation: Quat,
    pub size: Vec3,
    pub material: DecalMaterial,
    /// Anchor mesh local to world at build time.
    pub mesh_world: Mat4,
}

impl DecalInstance {
    /// Unit box to world.
    pub fn world_transform(&self) -> Mat4 {
        self.mesh_world * Mat4::from_scale_rotation_translation(self.size, self.orientation, self.position)
    }
}

/// Box extents for an element: text `[0.7s, 0.22s]`, images `[0.6sx, 0.6sy]`.
pub fn decal_size(element: &DecalElement) -> Vec3 {
    let axes = element.scale.axes();
    let (w, h) = match element.kind() {
        ElementKind::Text => (TEXT_BOX[0] * axes.x, TEXT_BOX[1] * axes.x),
        ElementKind::Image => (IMAGE_BOX * axes.x, IMAGE_BOX * axes.y),
    };
    Vec3::new(
        w.max(MIN_DECAL_EXTENT),
        h.max(MIN_DECAL_EXTENT),
        DECAL_DEPTH,
    )
}

/// Content decals for every renderable element, followed by the selection
/// indicator when the selected element is among them.
pub fn build_render_list(
    design: &DesignState,
    asset: &GarmentAsset,
    rig_angle: f32,
    selection_bitmap: Option<BitmapId>,
) -> Vec<DecalInstance> {
    let mut list = Vec::with_capacity(design.len() + 1);
    let mut selection = None;
    for element in design.renderable(asset) {
        let Some(mesh_id) = element.anchor_mesh() else {
            continue;
        };
        let Some(mesh_world) = asset.mesh_world(mesh_id, rig_angle) else {
            continue;
        };
        let instance = DecalInstance {
            element_id: element.id.clone(),
            layer: DecalLayer::Content,
            mesh_id: mesh_id.clone(),
            bitmap: element.bitmap,
            position: element.position,
            orientation: orientation_from_normal(element.normal),
            size: decal_size(element),
            material: DecalMaterial::for_kind(element.kind()),
            mesh_world,
        };
        if design.selected_id() == Some(&element.id) {
            if let Some(bitmap) = selection_bitmap {
                let normal = element.normal.try_normalize().unwrap_or(Vec3::Z);
                selection = Some(DecalInstance {
                    layer: DecalLayer::Selection,
                    bitmap,
                    position: instance.position + normal * SELECTION_LIFT,
                    size: Vec3::new(
                        instance.size.x * SELECTION_GROWTH,
                        instance.size.y * SELECTION_GROWTH,
                        instance.size.z,
                    ),
                    material: DecalMaterial::SELECTION,
                    ..instance.clone()
                });
            }
        }
        list.push(instance);
    }
    list.extend(selection);
    list
}

/// Nearest content decal under the ray, with its world distance.
pub fn pick_decal(ray: &Ray, instances: &[DecalInstance]) -> Option<(ElementId, f32)> {
    let unit = Aabb::from_center_size(Vec3::ZERO, Vec3::ONE);
    let mut nearest: Option<(f32, &ElementId)> = None;
    for instance in instances.iter().filter(|i| i.layer == DecalLayer::Content) {
        let world = instance.world_transform();
        if world.determinant().abs() < 1e-12 {
            continue;
        }
        let local = ray.transformed(&world.inverse());
        let Some(t) = unit.intersect_ray(&local) else {
            continue;
        };
        let distance = world.transform_point3(local.at(t)).distance(ray.origin);
        if nearest.map_or(true, |(best, _)| distance < best) {
            nearest = Some((distance, &instance.element_id));
        }
    }
    nearest.map(|(distance, id)| (id.clone(), distance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::HexColor;
    use crate::texture::{BitmapRegistry, BlockGlyphs, TextureSynthesizer};

    struct Stage {
        design: DesignState,
        synth: TextureSynthesizer,
        bitmaps: BitmapRegistry,
        asset: GarmentAsset,
    }

    fn stage() -> Stage {
        Stage {
            design: DesignState::new(),
            synth: TextureSynthesizer::new(Box::new(BlockGlyphs)),
            bitmaps: BitmapRegistry::new(),
            asset: GarmentAsset::placeholder("tee", "tee.glb", HexColor::WHITE),
        }
    }

    #[test]
    fn text_box_follows_uniform_scale() {
        let mut s = stage();
        let id = s.design.add_text("A", &s.synth, &mut s.bitmaps, Some(&s.asset));
        s.design.scale_selected(2.0);
        let size = decal_size(s.design.element(&id).unwrap());
        assert!((size - Vec3::new(1.4, 0.44, 0.6)).length() < 1e-6);
    }

    #[test]
    fn selection_indicator_is_larger_and_lifted() {
        let mut s = stage();
        s.design.add_text("A", &s.synth, &mut s.bitmaps, Some(&s.asset));
        let ring = s.bitmaps.insert(s.synth.render_selection_indicator());
        let list = build_render_list(&s.design, &s.asset, 0.0, Some(ring));
        assert_eq!(list.len(), 2);
        let (content, selection) = (&list[0], &list[1]);
        assert_eq!(content.material, DecalMaterial::TEXT);
        assert_eq!(selection.layer, DecalLayer::Selection);
        assert_eq!(selection.bitmap, ring);
        assert!((selection.size.x - content.size.x * 1.1).abs() < 1e-6);
        assert!((selection.position.z - content.position.z - 0.002).abs() < 1e-6);

        s.design.clear_selection();
        assert_eq!(build_render_list(&s.design, &s.asset, 0.0, Some(ring)).len(), 1);
    }

    #[test]
    fn orphans_are_not_rendered() {
        let mut s = stage();
        s.design.add_text("A", &s.synth, &mut s.bitmaps, Some(&s.asset));
        s.design.orphan_all();
        assert!(build_render_list(&s.design, &s.asset, 0.0, None).is_empty());
    }

    #[test]
    fn picking_finds_decal_under_pointer() {
        let mut s = stage();
        let id = s.design.add_text("A", &s.synth, &mut s.bitmaps, Some(&s.asset));
        let list = build_render_list(&s.design, &s.asset, 0.0, None);
        // text sits at y = 0.21 on the placeholder front
        let hit = Ray::new(Vec3::new(0.0, 0.21, 5.0), Vec3::NEG_Z);
        let (picked, distance) = pick_decal(&hit, &list).unwrap();
        assert_eq!(picked, id);
        // box front sits 0.3 in front of the decal centre
        assert!((distance - (5.0 - 0.489)).abs() < 1e-3, "{distance}");
        let miss = Ray::new(Vec3::new(0.0, -0.5, 5.0), Vec3::NEG_Z);
        assert!(pick_decal(&miss, &list).is_none());
    }

    #[test]
    fn decals_turn_with_the_rig() {
        let mut s = stage();
        s.design.add_text("A", &s.synth, &mut s.bitmaps, Some(&s.asset));
        let list = build_render_list(&s.design, &s.asset, std::f32::consts::FRAC_PI_2, None);
        let center = list[0].world_transform().transform_point3(Vec3::ZERO);
        // local +Z front swings to world +X
        assert!(center.x > 0.1 && center.z.abs() < 1e-4, "{center:?}");
    }
}
