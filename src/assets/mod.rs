pub mod fit;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod gltf_import;
pub mod loader;
pub mod material;
pub mod mesh;

pub use fit::{fit_scale, FitInputs};
pub use gltf_import::{parse_garment, ParsedGarment};
pub use loader::{AssetFetcher, FileFetcher, GarmentLoader, LoadOutcome, LoadRequest, LoadState};
pub use material::StandardMaterial;
pub use mesh::{GarmentMesh, MeshGeometry, MeshId};

use crate::color::HexColor;
use crate::config::FitConfig;
use crate::render::ray::Aabb;
use glam::{Mat4, Quat, Vec3};
use std::sync::Arc;

const PLACEHOLDER_SIZE: Vec3 = Vec3::new(1.2, 1.4, 0.45);
const PLACEHOLDER_ROUGHNESS: f32 = 0.55;
const PLACEHOLDER_METALNESS: f32 = 0.08;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to fetch garment asset {path}: {source}")]
    Fetch {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse garment asset {path}: {message}")]
    Parse { path: String, message: String },
    #[error("garment asset {path} has no triangle meshes")]
    Empty { path: String },
    #[error("no asset path configured for garment '{0}'")]
    UnknownGarment(String),
    #[error("loader worker for {path} stopped before finishing")]
    WorkerLost { path: String },
}

/// The garment currently on stage: recentered meshes with their own materials,
/// plus the fit scale for the current camera.
#[derive(Debug)]
pub struct GarmentAsset {
    garment: String,
    source: String,
    meshes: Vec<GarmentMesh>,
    primary: usize,
    bounds: Aabb,
    center: Vec3,
    fit_scale: f32,
    target_color: [f32; 3],
    placeholder: bool,
}

impl GarmentAsset {
    /// Clone materials out of a cached parse, recenter on the bounds center and fit.
    pub fn instantiate(
        garment: &str,
        parsed: &ParsedGarment,
        color: HexColor,
        inputs: &FitInputs,
        fit: &FitConfig,
    ) -> Self {
        let center = parsed.bounds.center();
        let recenter = Mat4::from_translation(-center);
        let target_color = color.to_linear();
        let meshes = parsed
            .meshes
            .iter()
            .map(|mesh| {
                let mut material = mesh.material.clone();
                material.set_rgb(target_color);
                GarmentMesh {
                    id: MeshId::new(format!("{}/{}", garment, mesh.key)),
                    geometry: Arc::clone(&mesh.geometry),
                    local_to_asset: recenter * mesh.node_transform,
                    material,
                }
            })
            .collect();
        let bounds = parsed.bounds.translated(-center);
        let mut asset = Self::assemble(garment, &parsed.source, meshes, bounds, center, target_color, false);
        asset.refit(inputs, fit);
        log::info!(
            "Garment '{}' ready: {} meshes, primary {}, fit scale {:.3}",
            garment,
            asset.meshes.len(),
            asset.primary_mesh().id,
            asset.fit_scale
        );
        asset
    }

    /// Flat box standing in for an asset that failed to load. Never refit.
    pub fn placeholder(garment: &str, source: &str, color: HexColor) -> Self {
        let geometry = Arc::new(MeshGeometry::cuboid(PLACEHOLDER_SIZE));
        let bounds = geometry.bounds();
        let mesh = GarmentMesh {
            id: MeshId::placeholder(garment),
            geometry,
            local_to_asset: Mat4::IDENTITY,
            material: StandardMaterial::flat(color, PLACEHOLDER_ROUGHNESS, PLACEHOLDER_METALNESS),
        };
        log::warn!("Garment '{}' is showing a placeholder box", garment);
        Self::assemble(garment, source, vec![mesh], bounds, Vec3::ZERO, color.to_linear(), true)
    }

    fn assemble(
        garment: &str,
        source: &str,
        meshes: Vec<GarmentMesh>,
        bounds: Aabb,
        center: Vec3,
        target_color: [f32; 3],
        placeholder: bool,
    ) -> Self {
        let primary = meshes
            .iter()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, mesh)| {
                let volume = mesh.asset_bounds().volume();
                if volume > best.1 {
                    (i, volume)
                } else {
                    best
                }
            })
            .0;
        Self {
            garment: garment.to_string(),
            source: source.to_string(),
            meshes,
            primary,
            bounds,
            center,
            fit_scale: 1.0,
            target_color,
            placeholder,
        }
    }

    pub fn garment(&self) -> &str {
        &self.garment
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn meshes(&self) -> &[GarmentMesh] {
        &self.meshes
    }

    pub fn mesh(&self, id: &MeshId) -> Option<&GarmentMesh> {
        self.meshes.iter().find(|mesh| &mesh.id == id)
    }

    pub fn contains(&self, id: &MeshId) -> bool {
        self.mesh(id).is_some()
    }

    /// Largest mesh by bounding-box volume.
    pub fn primary_mesh(&self) -> &GarmentMesh {
        &self.meshes[self.primary]
    }

    /// Recentered bounds in asset space.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Authored bounds center that was moved to the origin.
    pub fn source_center(&self) -> Vec3 {
        self.center
    }

    pub fn fit_scale(&self) -> f32 {
        self.fit_scale
    }

    pub fn scaled_size(&self) -> Vec3 {
        self.bounds.size() * self.fit_scale
    }

    pub fn refit(&mut self, inputs: &FitInputs, fit: &FitConfig) {
        if self.placeholder {
            return;
        }
        self.fit_scale = fit_scale(self.bounds.size(), inputs, fit);
    }

    /// `R_y(angle) * S(fit)`: asset space to world.
    pub fn root_transform(&self, rig_angle: f32) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.fit_scale),
            Quat::from_rotation_y(rig_angle),
            Vec3::ZERO,
        )
    }

    pub fn mesh_world(&self, id: &MeshId, rig_angle: f32) -> Option<Mat4> {
        self.mesh(id)
            .map(|mesh| self.root_transform(rig_angle) * mesh.local_to_asset)
    }

    pub fn set_target_color(&mut self, color: HexColor) {
        self.target_color = color.to_linear();
    }

    pub fn target_color(&self) -> [f32; 3] {
        self.target_color
    }

    pub fn tick_colors(&mut self, time_constant: f32, dt: f32) {
        let target = self.target_color;
        for mesh in &mut self.meshes {
            mesh.material.ease_rgb(target, time_constant, dt);
        }
    }
}

impl Drop for GarmentAsset {
    fn drop(&mut self) {
        log::info!(
            "Released garment '{}' ({} meshes)",
            self.garment,
            self.meshes.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::fixtures::{FixtureMesh, GltfFixture};

    fn frame() -> FitInputs {
        FitInputs {
            camera_distance: 6.0,
            fov_y_deg: 22.0,
            aspect: 1.0,
        }
    }

    fn parsed() -> ParsedGarment {
        let bytes = GltfFixture::new()
            .mesh(FixtureMesh::cuboid("Body", [2.0, 3.0, 0.0], [1.2, 1.4, 0.45]))
            .mesh(FixtureMesh::cuboid("Sleeve", [2.9, 3.3, 0.0], [0.3, 0.6, 0.3]))
            .to_bytes();
        parse_garment(&bytes, "tee.gltf", None).unwrap()
    }

    #[test]
    fn instantiate_recenters_and_picks_largest_mesh() {
        let asset = GarmentAsset::instantiate("tee", &parsed(), HexColor::WHITE, &frame(), &FitConfig::default());
        let center = asset.bounds().center();
        assert!(center.length() < 1e-5, "{center:?}");
        assert_eq!(asset.primary_mesh().id.as_str(), "tee/Body/0");
        assert_eq!(asset.meshes().len(), 2);
        assert!(asset.contains(&MeshId::new("tee/Sleeve/0")));
        assert!(asset.fit_scale() > 0.0);
        let size = asset.scaled_size();
        assert!(size.y <= frame().visible_height() * 0.78 + 1e-4);
    }

    #[test]
    fn materials_are_cloned_per_instance() {
        let parsed = parsed();
        let mut red = GarmentAsset::instantiate("tee", &parsed, HexColor::new(255, 0, 0), &frame(), &FitConfig::default());
        let blue = GarmentAsset::instantiate("tee", &parsed, HexColor::new(0, 0, 255), &frame(), &FitConfig::default());
        assert_eq!(red.meshes()[0].material.rgb(), [1.0, 0.0, 0.0]);
        assert_eq!(blue.meshes()[0].material.rgb(), [0.0, 0.0, 1.0]);
        assert_eq!(parsed.meshes[0].material.rgb(), [1.0, 1.0, 1.0]);

        red.set_target_color(HexColor::new(0, 0, 255));
        red.tick_colors(0.25, 0.05);
        let rgb = red.meshes()[0].material.rgb();
        assert!(rgb[0] < 1.0 && rgb[0] > 0.5 && rgb[2] > 0.0);
    }

    #[test]
    fn placeholder_keeps_unit_fit() {
        let mut asset = GarmentAsset::placeholder("jacket", "jacket.glb", HexColor::WHITE);
        asset.refit(&frame(), &FitConfig::default());
        assert_eq!(asset.fit_scale(), 1.0);
        assert!(asset.is_placeholder());
        assert_eq!(asset.primary_mesh().id, MeshId::placeholder("jacket"));
        assert!((asset.bounds().size() - PLACEHOLDER_SIZE).length() < 1e-6);
    }

    #[test]
    fn mesh_world_applies_rig_rotation() {
        let asset = GarmentAsset::placeholder("tee", "tee.glb", HexColor::WHITE);
        let id = asset.primary_mesh().id.clone();
        let world = asset.mesh_world(&id, std::f32::consts::FRAC_PI_2).unwrap();
        let p = world.transform_point3(Vec3::Z);
        assert!((p - Vec3::X).length() < 1e-5, "{p:?}");
        assert!(asset.mesh_world(&MeshId::new("tee/other"), 0.0).is_none());
    }
}
