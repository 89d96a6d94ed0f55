//! Ray casting primitives for pointer picking and surface projection.

use glam::{Mat4, Vec3};

/// A ray with a normalized direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Express this ray in another space. The direction is re-normalized, so `t`
    /// values are not comparable across spaces; compare hit points instead.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Self::new(
            matrix.transform_point3(self.origin),
            matrix.transform_vector3(self.direction),
        )
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |mut acc, p| {
            acc.include(p);
            acc
        })
    }

    pub fn include(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn center(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            (self.min + self.max) * 0.5
        }
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn volume(&self) -> f32 {
        let size = self.size();
        size.x * size.y * size.z
    }

    pub fn translated(&self, offset: Vec3) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        Aabb {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Bounds of the eight transformed corners.
    pub fn transformed(&self, matrix: &Mat4) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let corners = (0..8).map(|i| {
            Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        });
        Aabb::from_points(corners.map(|c| matrix.transform_point3(c)))
    }

    /// Slab test. Returns the entry distance (0 when the origin is inside).
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        let mut t_min = 0.0f32;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let origin = ray.origin[axis];
            let dir = ray.direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);
            if dir.abs() < 1e-8 {
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dir;
            let mut t0 = (lo - origin) * inv;
            let mut t1 = (hi - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }
}

/// Möller–Trumbore ray/triangle test, double sided. Returns distance along the ray.
pub fn intersect_triangle(ray: &Ray, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    const EPSILON: f32 = 1e-7;
    let edge1 = b - a;
    let edge2 = c - a;
    let pvec = ray.direction.cross(edge2);
    let det = edge1.dot(pvec);
    if det.abs() < EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let tvec = ray.origin - a;
    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let qvec = tvec.cross(edge1);
    let v = ray.direction.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(qvec) * inv_det;
    (t > EPSILON).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_hit_and_miss() {
        let ray = Ray::new(Vec3::new(0.2, 0.2, 5.0), Vec3::NEG_Z);
        let (a, b, c) = (Vec3::ZERO, Vec3::X, Vec3::Y);
        let t = intersect_triangle(&ray, a, b, c).unwrap();
        assert!((t - 5.0).abs() < 1e-5);

        let away = Ray::new(Vec3::new(0.2, 0.2, 5.0), Vec3::Z);
        assert!(intersect_triangle(&away, a, b, c).is_none());

        let outside = Ray::new(Vec3::new(0.9, 0.9, 5.0), Vec3::NEG_Z);
        assert!(intersect_triangle(&outside, a, b, c).is_none());
    }

    #[test]
    fn aabb_slab_test() {
        let bounds = Aabb::from_center_size(Vec3::ZERO, Vec3::splat(2.0));
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        assert!((bounds.intersect_ray(&ray).unwrap() - 9.0).abs() < 1e-5);

        let inside = Ray::new(Vec3::ZERO, Vec3::X);
        assert_eq!(bounds.intersect_ray(&inside), Some(0.0));

        let miss = Ray::new(Vec3::new(5.0, 0.0, 10.0), Vec3::NEG_Z);
        assert!(bounds.intersect_ray(&miss).is_none());
    }

    #[test]
    fn empty_bounds_are_inert() {
        let empty = Aabb::from_points(std::iter::empty());
        assert!(empty.is_empty());
        assert_eq!(empty.size(), Vec3::ZERO);
        assert_eq!(empty.center(), Vec3::ZERO);
        assert!(empty.intersect_ray(&Ray::new(Vec3::ZERO, Vec3::X)).is_none());
    }

    #[test]
    fn transformed_bounds_follow_rotation() {
        let bounds = Aabb::from_center_size(Vec3::ZERO, Vec3::new(2.0, 1.0, 1.0));
        let rotated = bounds.transformed(&Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2));
        let size = rotated.size();
        assert!((size.x - 1.0).abs() < 1e-5);
        assert!((size.z - 2.0).abs() < 1e-5);
    }
}
