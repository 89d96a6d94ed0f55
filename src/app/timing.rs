use std::time::{Duration, Instant};

/// Longest step handed to easing and hold timers, so a stalled frame does not
/// fire a burst of rotation steps.
pub const MAX_FRAME_DT: f32 = 0.1;

pub struct FrameClock {
    last_frame_time: Option<Instant>,
    last_report_time: Option<Instant>,
    frame_count: u32,
    pub frame_dt: f32,
    fps: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last_frame_time: None,
            last_report_time: None,
            frame_count: 0,
            frame_dt: 1.0 / 60.0,
            fps: 0.0,
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Advance to `now` and return the clamped step in seconds.
    pub fn update(&mut self, now: Instant) -> f32 {
        let dt_duration = if let Some(last) = self.last_frame_time {
            now.saturating_duration_since(last)
        } else {
            Duration::from_millis(16)
        };
        self.last_frame_time = Some(now);
        self.frame_dt = dt_duration.as_secs_f32().clamp(0.0, MAX_FRAME_DT);

        self.frame_count = self.frame_count.saturating_add(1);
        let report_start = *self.last_report_time.get_or_insert(now);
        let elapsed = now.saturating_duration_since(report_start);
        if elapsed.as_secs_f32() >= 0.5 {
            self.fps = self.frame_count as f32 / elapsed.as_secs_f32();
            log::trace!("{:.1} fps (cadence {:.2} ms)", self.fps, self.frame_dt * 1000.0);
            self.frame_count = 0;
            self.last_report_time = Some(now);
        }
        self.frame_dt
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_assumes_sixty_hz_and_long_gaps_clamp() {
        let mut clock = FrameClock::new();
        let start = Instant::now();
        assert!((clock.update(start) - 0.016).abs() < 1e-6);
        let dt = clock.update(start + Duration::from_millis(20));
        assert!((dt - 0.02).abs() < 1e-4);
        assert_eq!(clock.update(start + Duration::from_secs(5)), MAX_FRAME_DT);
        assert!(clock.fps() > 0.0);
    }
}
