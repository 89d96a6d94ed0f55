use crate::config::FitConfig;
use glam::Vec3;

/// Camera and viewport parameters the fit scale depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitInputs {
    pub camera_distance: f32,
    pub fov_y_deg: f32,
    pub aspect: f32,
}

impl FitInputs {
    pub fn visible_height(&self) -> f32 {
        let distance = self.camera_distance.abs().max(0.001);
        2.0 * distance * (self.fov_y_deg.to_radians() * 0.5).tan()
    }

    pub fn visible_width(&self) -> f32 {
        self.visible_height() * self.aspect
    }
}

/// Uniform scale that fits `size` (recentered bounds) into the visible
/// frustum at the camera distance, leaving `margin` of the frame.
pub fn fit_scale(size: Vec3, inputs: &FitInputs, config: &FitConfig) -> f32 {
    let bounds_x = finite_or(size.x, 0.0).max(config.min_bound);
    let bounds_y = finite_or(size.y, 0.0).max(config.min_bound);
    let by_width = inputs.visible_width() * config.margin / bounds_x;
    let by_height = inputs.visible_height() * config.margin / bounds_y;
    let scale = finite_or(by_width.min(by_height), 1.0);
    scale.clamp(config.min_scale, config.max_scale)
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn inputs(aspect: f32) -> FitInputs {
        FitInputs {
            camera_distance: 6.0,
            fov_y_deg: 22.0,
            aspect,
        }
    }

    #[test]
    fn visible_height_at_working_distance() {
        let expected = 2.0 * 6.0 * 11f32.to_radians().tan();
        assert!((expected - 2.3326).abs() < 1e-3);
        assert!((inputs(1.0).visible_height() - expected).abs() < 1e-5);
    }

    #[test]
    fn square_viewport_fits_height_first() {
        let config = FitConfig::default();
        let size = Vec3::new(1.2, 1.4, 0.45);
        let frame = inputs(1.0);
        let scale = fit_scale(size, &frame, &config);
        let visible = frame.visible_height();
        assert!(scale * 1.4 <= visible * 0.78 + 1e-5);
        assert!(scale * 1.2 <= frame.visible_width() * 0.78 + 1e-5);
        // y is the taller side on a square frame, so it binds
        assert!((scale - visible * 0.78 / 1.4).abs() < 1e-5);
    }

    #[test]
    fn narrow_viewport_fits_width_first() {
        let config = FitConfig::default();
        let size = Vec3::new(1.2, 1.4, 0.45);
        let frame = inputs(0.5);
        let scale = fit_scale(size, &frame, &config);
        assert!((scale - frame.visible_width() * 0.78 / 1.2).abs() < 1e-5);
    }

    #[test]
    fn degenerate_bounds_are_floored_and_clamped() {
        let config = FitConfig::default();
        let flat = fit_scale(Vec3::ZERO, &inputs(1.0), &config);
        assert!((flat - inputs(1.0).visible_height() * 0.78 / 0.25).abs() < 1e-4);

        let broken = fit_scale(Vec3::splat(f32::NAN), &inputs(1.0), &config);
        assert!(broken.is_finite());

        let huge = fit_scale(Vec3::splat(1.0e6), &inputs(1.0), &config);
        assert_eq!(huge, config.min_scale);
    }

    proptest! {
        #[test]
        fn scale_stays_in_range(
            x in 0.0f32..1000.0,
            y in 0.0f32..1000.0,
            distance in -50.0f32..50.0,
            fov in 1.0f32..170.0,
            aspect in 0.1f32..4.0,
        ) {
            let config = FitConfig::default();
            let frame = FitInputs { camera_distance: distance, fov_y_deg: fov, aspect };
            let scale = fit_scale(Vec3::new(x, y, 1.0), &frame, &config);
            prop_assert!(scale >= config.min_scale && scale <= config.max_scale);
        }
    }
}
