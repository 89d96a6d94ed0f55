use glam::Vec3;

/// Undrained events kept before the oldest are discarded.
pub const MAX_STATUS_EVENTS: usize = 64;

/// Something the host UI may want to show: asset lifecycle and failures that
/// never surface as command errors.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    Loading {
        garment: String,
        path: String,
    },
    Loaded {
        garment: String,
        path: String,
        scaled_bounds: Vec3,
    },
    Failed {
        garment: String,
        path: String,
        error: String,
    },
    DecodeFailed {
        error: String,
    },
}

impl StatusEvent {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::DecodeFailed { .. })
    }

    fn line(&self) -> String {
        match self {
            Self::Loading { garment, path } => format!("Loading {} ({})", garment, path),
            Self::Loaded {
                garment,
                scaled_bounds,
                ..
            } => format!(
                "{} ready (extent {:.2}, {:.2}, {:.2})",
                garment, scaled_bounds.x, scaled_bounds.y, scaled_bounds.z
            ),
            Self::Failed { garment, error, .. } => {
                format!("{} failed to load, showing placeholder: {}", garment, error)
            }
            Self::DecodeFailed { error } => format!("Image upload failed: {}", error),
        }
    }
}

#[derive(Debug, Default)]
pub struct StatusFeed {
    events: Vec<StatusEvent>,
    summary: String,
}

impl StatusFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// A `Loaded` for the garment the last event already reported replaces it.
    pub fn push(&mut self, event: StatusEvent) {
        self.summary = event.line();
        if let (
            StatusEvent::Loaded { garment, .. },
            Some(StatusEvent::Loaded { garment: last, .. }),
        ) = (&event, self.events.last())
        {
            if garment == last {
                if let Some(slot) = self.events.last_mut() {
                    *slot = event;
                }
                return;
            }
        }
        self.events.push(event);
        if self.events.len() > MAX_STATUS_EVENTS {
            let excess = self.events.len() - MAX_STATUS_EVENTS;
            self.events.drain(..excess);
        }
    }

    /// Latest status line.
    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn events(&self) -> &[StatusEvent] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<StatusEvent> {
        std::mem::take(&mut self.events)
    }
}
