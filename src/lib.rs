//! Decal placement and texture synthesis for 3D garment customization.
//!
//! A [`app::Studio`] owns one design session: the garment asset and its
//! loader, the placed decal elements and their bitmaps, and the view rig.
//! Hosts drive it through commands and pointer events and draw whatever
//! [`app::Studio::render_list`] returns.

pub mod app;
pub mod assets;
pub mod color;
pub mod config;
pub mod render;
pub mod scene;
pub mod texture;
pub mod ui;

pub use app::{CommandOutcome, Studio, StudioCommand};
pub use config::StudioConfig;
