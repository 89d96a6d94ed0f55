use super::easing::damp;
use super::ray::Ray;
use crate::assets::FitInputs;
use crate::config::{CameraConfig, ViewportConfig};
use glam::{Mat4, Vec2, Vec3};

/// Fixed perspective camera looking down -Z. The garment turns, not the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
    pub viewport: [u32; 2],
}

impl Camera {
    pub fn new(camera: &CameraConfig, viewport: &ViewportConfig) -> Self {
        Self {
            position: Vec3::from(camera.position),
            fov_y_deg: camera.fov_deg,
            near: camera.near,
            far: camera.far,
            viewport: [viewport.width.max(1), viewport.height.max(1)],
        }
    }

    pub fn aspect(&self) -> f32 {
        self.viewport[0].max(1) as f32 / self.viewport[1].max(1) as f32
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, Vec3::NEG_Z, Vec3::Y)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_deg.to_radians(),
            self.aspect(),
            self.near,
            self.far,
        )
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    /// World-space ray through a viewport pixel (origin top-left).
    pub fn screen_to_ray(&self, x: f32, y: f32) -> Ray {
        let ndc = Vec2::new(
            2.0 * x / self.viewport[0].max(1) as f32 - 1.0,
            1.0 - 2.0 * y / self.viewport[1].max(1) as f32,
        );
        let inverse = self.view_projection().inverse();
        let near = inverse.project_point3(ndc.extend(0.0));
        let far = inverse.project_point3(ndc.extend(1.0));
        Ray::new(near, far - near)
    }

    /// Viewport pixel of a world point, `None` behind the camera.
    pub fn world_to_screen(&self, point: Vec3) -> Option<Vec2> {
        let clip = self.view_projection() * point.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = Vec2::new(clip.x, clip.y) / clip.w;
        Some(Vec2::new(
            (ndc.x + 1.0) * 0.5 * self.viewport[0] as f32,
            (1.0 - ndc.y) * 0.5 * self.viewport[1] as f32,
        ))
    }

    pub fn fit_inputs(&self) -> FitInputs {
        FitInputs {
            camera_distance: self.position.z,
            fov_y_deg: self.fov_y_deg,
            aspect: self.aspect(),
        }
    }
}

pub const TAP_STEP: f32 = 0.2;
pub const HOLD_STEP: f32 = 0.06;
pub const HOLD_INTERVAL: f32 = 0.04;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotateDirection {
    Left,
    Right,
}

impl RotateDirection {
    fn sign(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Hold {
    direction: RotateDirection,
    elapsed: f32,
}

/// Rotation of the whole garment around Y. Commands move the target; the
/// displayed angle follows it with exponential damping.
#[derive(Debug, Clone)]
pub struct ViewRig {
    target: f32,
    angle: f32,
    hold: Option<Hold>,
    time_constant: f32,
}

impl ViewRig {
    pub fn new(time_constant: f32) -> Self {
        Self {
            target: 0.0,
            angle: 0.0,
            hold: None,
            time_constant,
        }
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn is_holding(&self) -> bool {
        self.hold.is_some()
    }

    pub fn tap(&mut self, direction: RotateDirection) {
        self.target += TAP_STEP * direction.sign();
    }

    /// Steps once immediately, then every [`HOLD_INTERVAL`] until released.
    pub fn begin_hold(&mut self, direction: RotateDirection) {
        self.target += HOLD_STEP * direction.sign();
        self.hold = Some(Hold {
            direction,
            elapsed: 0.0,
        });
    }

    pub fn end_hold(&mut self) {
        self.hold = None;
    }

    pub fn reset(&mut self) {
        self.hold = None;
        self.target = 0.0;
    }

    pub fn tick(&mut self, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        if let Some(hold) = self.hold.as_mut() {
            hold.elapsed += dt;
            let steps = (hold.elapsed / HOLD_INTERVAL).floor();
            hold.elapsed -= steps * HOLD_INTERVAL;
            self.target += steps * HOLD_STEP * hold.direction.sign();
        }
        self.angle = damp(self.angle, self.target, self.time_constant, dt);
    }
}
