use super::Studio;
use crate::color::HexColor;
use crate::render::RotateDirection;
use crate::scene::serialization::DesignDocument;
use crate::scene::ElementId;
use serde::{Deserialize, Serialize};

/// Frame step used when a script advances time.
pub const SCRIPT_FRAME_DT: f32 = 1.0 / 60.0;
/// Longest span a single `advance` command simulates.
pub const MAX_SCRIPT_ADVANCE: f32 = 60.0;

/// Everything the host can ask of a studio session, in serializable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum StudioCommand {
    AddText { text: String },
    AddImage { source: String },
    SetGarmentType { garment: String },
    SetGarmentColor { color: HexColor },
    SetSelectedText { text: String },
    SetSelectedColor { color: HexColor },
    MoveSelected { dx: f32, dy: f32 },
    ScaleSelected { factor: f32 },
    DeleteSelected,
    Select { id: ElementId },
    ClearSelection,
    PointerDown { x: f32, y: f32 },
    PointerMove { x: f32, y: f32 },
    PointerUp,
    PointerLeave,
    RotateTap { direction: RotateDirection },
    RotateHold { direction: RotateDirection },
    RotateRelease,
    RotateReset,
    SetViewport { width: u32, height: u32 },
    SetCameraFov { fov_deg: f32 },
    SetCameraDistance { distance: f32 },
    ImportDesign { document: DesignDocument },
    /// Pump frames for `seconds` of simulated time.
    Advance { seconds: f32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    Ignored,
    Created(ElementId),
    /// Image decode submitted under this ticket.
    Queued(u64),
}

impl From<bool> for CommandOutcome {
    fn from(applied: bool) -> Self {
        if applied {
            Self::Applied
        } else {
            Self::Ignored
        }
    }
}

impl Studio {
    pub fn apply(&mut self, command: StudioCommand) -> CommandOutcome {
        log::debug!("Applying {:?}", command);
        match command {
            StudioCommand::AddText { text } => CommandOutcome::Created(self.add_text(&text)),
            StudioCommand::AddImage { source } => CommandOutcome::Queued(self.add_image(&source)),
            StudioCommand::SetGarmentType { garment } => self.set_garment_type(&garment).into(),
            StudioCommand::SetGarmentColor { color } => {
                self.set_garment_color(color);
                CommandOutcome::Applied
            }
            StudioCommand::SetSelectedText { text } => self.set_selected_text(&text).into(),
            StudioCommand::SetSelectedColor { color } => self.set_selected_color(color).into(),
            StudioCommand::MoveSelected { dx, dy } => self.move_selected(dx, dy).into(),
            StudioCommand::ScaleSelected { factor } => self.scale_selected(factor).into(),
            StudioCommand::DeleteSelected => self.delete_selected().into(),
            StudioCommand::Select { id } => self.select(&id).into(),
            StudioCommand::ClearSelection => {
                self.clear_selection();
                CommandOutcome::Applied
            }
            StudioCommand::PointerDown { x, y } => self.pointer_down(x, y).is_some().into(),
            StudioCommand::PointerMove { x, y } => self.pointer_move(x, y).into(),
            StudioCommand::PointerUp => {
                self.pointer_up();
                CommandOutcome::Applied
            }
            StudioCommand::PointerLeave => {
                self.pointer_leave();
                CommandOutcome::Applied
            }
            StudioCommand::RotateTap { direction } => {
                self.rotate_tap(direction);
                CommandOutcome::Applied
            }
            StudioCommand::RotateHold { direction } => {
                self.rotate_hold(direction);
                CommandOutcome::Applied
            }
            StudioCommand::RotateRelease => {
                self.rotate_release();
                CommandOutcome::Applied
            }
            StudioCommand::RotateReset => {
                self.rotate_reset();
                CommandOutcome::Applied
            }
            StudioCommand::SetViewport { width, height } => self.set_viewport(width, height).into(),
            StudioCommand::SetCameraFov { fov_deg } => self.set_camera_fov(fov_deg).into(),
            StudioCommand::SetCameraDistance { distance } => self.set_camera_distance(distance).into(),
            StudioCommand::ImportDesign { document } => self.import_design(&document).into(),
            StudioCommand::Advance { seconds } => {
                if !seconds.is_finite() || seconds < 0.0 {
                    return CommandOutcome::Ignored;
                }
                if seconds > MAX_SCRIPT_ADVANCE {
                    log::warn!("Advance of {}s capped to {}s", seconds, MAX_SCRIPT_ADVANCE);
                }
                let frames = (seconds.min(MAX_SCRIPT_ADVANCE) / SCRIPT_FRAME_DT).ceil() as u32;
                for _ in 0..frames {
                    self.tick(SCRIPT_FRAME_DT);
                }
                CommandOutcome::Applied
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_read_from_json_script() {
        let script = r##"[
            {"command": "add_text", "text": "Team 7"},
            {"command": "move_selected", "dx": 0.0, "dy": 0.06},
            {"command": "set_garment_color", "color": "#1e3a8a"},
            {"command": "rotate_hold", "direction": "left"},
            {"command": "advance", "seconds": 0.5},
            {"command": "delete_selected"}
        ]"##;
        let commands: Vec<StudioCommand> = serde_json::from_str(script).unwrap();
        assert_eq!(commands.len(), 6);
        assert_eq!(
            commands[2],
            StudioCommand::SetGarmentColor {
                color: HexColor::new(0x1e, 0x3a, 0x8a)
            }
        );
        assert_eq!(
            commands[3],
            StudioCommand::RotateHold {
                direction: RotateDirection::Left
            }
        );
    }

    #[test]
    fn bad_colour_rejects_the_command() {
        let json = r#"{"command": "set_selected_color", "color": "teal"}"#;
        assert!(serde_json::from_str::<StudioCommand>(json).is_err());
    }
}
