//! Camera, rays and decal placement math. Drawing itself belongs to the host.

pub mod camera;
pub mod decal;
pub mod easing;
pub mod projector;
pub mod ray;

pub use camera::{Camera, RotateDirection, ViewRig};
pub use decal::{build_render_list, pick_decal, BlendMode, DecalInstance, DecalLayer, DecalMaterial};
pub use projector::{asset_targets, orientation_from_normal, project, ProjectionTarget, SurfaceHit};
pub use ray::{Aabb, Ray};
