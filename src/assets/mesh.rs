use super::material::StandardMaterial;
use crate::render::ray::{intersect_triangle, Aabb, Ray};
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Stable identifier of one renderable surface of a garment asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeshId(String);

impl MeshId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn placeholder(garment: &str) -> Self {
        Self(format!("{garment}/placeholder"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Garment type this mesh was created for.
    pub fn garment(&self) -> &str {
        self.0.split('/').next().unwrap_or_default()
    }
}

impl fmt::Display for MeshId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Triangle soup in mesh-local space. Shared between instantiations of a cached asset.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshGeometry {
    positions: Vec<Vec3>,
    indices: Vec<u32>,
    bounds: Aabb,
}

/// Ray intersection in mesh-local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalHit {
    pub point: Vec3,
    pub normal: Vec3,
}

impl MeshGeometry {
    /// Indices that do not form whole triangles or point past the vertex list are dropped.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let vertex_count = positions.len() as u32;
        let mut indices: Vec<u32> = indices
            .chunks_exact(3)
            .filter(|tri| tri.iter().all(|&i| i < vertex_count))
            .flatten()
            .copied()
            .collect();
        indices.shrink_to_fit();
        let bounds = Aabb::from_points(positions.iter().copied());
        Self {
            positions,
            indices,
            bounds,
        }
    }

    /// Sequential triangles, for non-indexed primitives.
    pub fn unindexed(positions: Vec<Vec3>) -> Self {
        let indices = (0..positions.len() as u32).collect();
        Self::new(positions, indices)
    }

    pub fn cuboid(size: Vec3) -> Self {
        let h = size * 0.5;
        let positions = vec![
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ];
        #[rustfmt::skip]
        let indices = vec![
            4, 5, 6, 4, 6, 7, // +z
            1, 0, 3, 1, 3, 2, // -z
            5, 1, 2, 5, 2, 6, // +x
            0, 4, 7, 0, 7, 3, // -x
            7, 6, 2, 7, 2, 3, // +y
            0, 1, 5, 0, 5, 4, // -y
        ];
        Self::new(positions, indices)
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Nearest front-or-back face hit. The normal is the face normal turned
    /// toward the ray origin, or +Z when the face is degenerate.
    pub fn raycast(&self, ray: &Ray) -> Option<LocalHit> {
        self.bounds.intersect_ray(ray)?;
        let mut best: Option<(f32, usize)> = None;
        for (tri, chunk) in self.indices.chunks_exact(3).enumerate() {
            let [a, b, c] = self.triangle(chunk);
            if let Some(t) = intersect_triangle(ray, a, b, c) {
                if best.map_or(true, |(best_t, _)| t < best_t) {
                    best = Some((t, tri));
                }
            }
        }
        let (t, tri) = best?;
        let [a, b, c] = self.triangle(&self.indices[tri * 3..tri * 3 + 3]);
        let mut normal = (b - a).cross(c - a).normalize_or_zero();
        if normal == Vec3::ZERO {
            normal = Vec3::Z;
        } else if normal.dot(ray.direction) > 0.0 {
            normal = -normal;
        }
        Some(LocalHit {
            point: ray.at(t),
            normal,
        })
    }

    fn triangle(&self, chunk: &[u32]) -> [Vec3; 3] {
        [
            self.positions[chunk[0] as usize],
            self.positions[chunk[1] as usize],
            self.positions[chunk[2] as usize],
        ]
    }
}

/// One surface of an instantiated garment: shared geometry, its own material.
#[derive(Debug, Clone)]
pub struct GarmentMesh {
    pub id: MeshId,
    pub geometry: Arc<MeshGeometry>,
    /// Mesh-local to asset space, with the recentering offset already applied.
    pub local_to_asset: Mat4,
    pub material: StandardMaterial,
}

impl GarmentMesh {
    /// Geometry bounds in mesh-local space.
    pub fn local_bounds(&self) -> Aabb {
        self.geometry.bounds()
    }

    pub fn asset_bounds(&self) -> Aabb {
        self.geometry.bounds().transformed(&self.local_to_asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuboid_front_face_hit_faces_camera() {
        let geometry = MeshGeometry::cuboid(Vec3::new(1.2, 1.4, 0.45));
        assert_eq!(geometry.triangle_count(), 12);
        let ray = Ray::new(Vec3::new(0.1, 0.2, 5.0), Vec3::NEG_Z);
        let hit = geometry.raycast(&ray).unwrap();
        assert!((hit.point.z - 0.225).abs() < 1e-5);
        assert!((hit.normal - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn back_face_normal_is_flipped_toward_ray() {
        let geometry = MeshGeometry::cuboid(Vec3::ONE);
        let ray = Ray::new(Vec3::new(0.1, 0.2, -5.0), Vec3::Z);
        let hit = geometry.raycast(&ray).unwrap();
        assert!((hit.point.z + 0.5).abs() < 1e-5);
        assert!((hit.normal - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn misses_and_bad_indices() {
        let geometry = MeshGeometry::cuboid(Vec3::ONE);
        let ray = Ray::new(Vec3::new(3.0, 0.0, 5.0), Vec3::NEG_Z);
        assert!(geometry.raycast(&ray).is_none());

        let broken = MeshGeometry::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2, 0, 1, 9, 0]);
        assert_eq!(broken.triangle_count(), 1);
    }

    #[test]
    fn mesh_id_reports_garment() {
        assert_eq!(MeshId::placeholder("hoodie").as_str(), "hoodie/placeholder");
        assert_eq!(MeshId::new("tee/Body/0").garment(), "tee");
    }
}
