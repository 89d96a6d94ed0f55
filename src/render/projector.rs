//! Pointer rays against the garment's meshes, resolved into the hit mesh's
//! local space.

use super::ray::Ray;
use crate::assets::{GarmentAsset, MeshGeometry, MeshId};
use glam::{Mat4, Quat, Vec3};

/// One mesh the projector may hit.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionTarget<'a> {
    pub id: &'a MeshId,
    pub geometry: &'a MeshGeometry,
    /// Mesh-local to world.
    pub world: Mat4,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceHit {
    pub mesh_id: MeshId,
    /// Local to `mesh_id`.
    pub point: Vec3,
    /// Unit normal, local to `mesh_id`.
    pub normal: Vec3,
    /// World-space distance from the ray origin.
    pub distance: f32,
}

/// Every mesh of the asset under the current rig angle.
pub fn asset_targets(asset: &GarmentAsset, rig_angle: f32) -> Vec<ProjectionTarget<'_>> {
    let root = asset.root_transform(rig_angle);
    asset
        .meshes()
        .iter()
        .map(|mesh| ProjectionTarget {
            id: &mesh.id,
            geometry: &mesh.geometry,
            world: root * mesh.local_to_asset,
        })
        .collect()
}

/// Nearest hit across all targets.
pub fn project<'a>(ray: &Ray, targets: impl IntoIterator<Item = ProjectionTarget<'a>>) -> Option<SurfaceHit> {
    let mut nearest: Option<SurfaceHit> = None;
    for target in targets {
        if target.world.determinant().abs() < 1e-12 {
            continue;
        }
        let local_ray = ray.transformed(&target.world.inverse());
        let Some(hit) = target.geometry.raycast(&local_ray) else {
            continue;
        };
        let distance = target.world.transform_point3(hit.point).distance(ray.origin);
        if nearest.as_ref().map_or(true, |best| distance < best.distance) {
            let normal = hit.normal.try_normalize().unwrap_or(Vec3::Z);
            nearest = Some(SurfaceHit {
                mesh_id: target.id.clone(),
                point: hit.point,
                normal,
                distance,
            });
        }
    }
    nearest
}

/// Shortest-arc rotation taking +Z onto `normal`.
pub fn orientation_from_normal(normal: Vec3) -> Quat {
    match normal.try_normalize() {
        Some(n) => Quat::from_rotation_arc(Vec3::Z, n),
        None => Quat::IDENTITY,
    }
}
