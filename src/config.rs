use crate::color::HexColor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable the binary consults for a config file path.
pub const CONFIG_ENV: &str = "VESTRA_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.2, 6.0],
            fov_deg: 22.0,
            near: 0.1,
            far: 200.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Fraction of the visible frustum the garment may occupy.
    pub margin: f32,
    /// Floor applied to each bounds axis before dividing.
    pub min_bound: f32,
    pub min_scale: f32,
    pub max_scale: f32,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            margin: 0.78,
            min_bound: 0.25,
            min_scale: 0.01,
            max_scale: 100.0,
        }
    }
}

/// What happens to elements whose anchor mesh disappeared with a garment swap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    #[default]
    Reparent,
    Drop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub camera: CameraConfig,
    pub viewport: ViewportConfig,
    /// Directory garment asset paths are resolved against.
    pub asset_root: PathBuf,
    pub garments: BTreeMap<String, String>,
    pub default_garment: String,
    pub garment_color: HexColor,
    pub background: HexColor,
    pub fit: FitConfig,
    pub easing_time_constant: f32,
    pub font_path: Option<PathBuf>,
    pub orphan_policy: OrphanPolicy,
}

impl Default for StudioConfig {
    fn default() -> Self {
        let garments = [
            ("tee", "assets/shirt_baked.glb"),
            ("hoodie", "assets/hoodie.glb"),
            ("jacket", "assets/basketball_jacket.glb"),
        ]
        .into_iter()
        .map(|(kind, path)| (kind.to_string(), path.to_string()))
        .collect();

        Self {
            camera: CameraConfig::default(),
            viewport: ViewportConfig::default(),
            asset_root: PathBuf::from("."),
            garments,
            default_garment: "tee".to_string(),
            garment_color: HexColor::new(0xd9, 0xd9, 0xd9),
            background: HexColor::WHITE,
            fit: FitConfig::default(),
            easing_time_constant: 0.25,
            font_path: None,
            orphan_policy: OrphanPolicy::Reparent,
        }
    }
}

impl StudioConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Load from `VESTRA_CONFIG` when set, defaults otherwise.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    /// Resolve a requested garment type to a known one, falling back to the default.
    pub fn resolve_garment<'a>(&'a self, requested: &'a str) -> &'a str {
        if self.garments.contains_key(requested) {
            requested
        } else {
            log::warn!(
                "Unknown garment type '{}', using '{}'",
                requested,
                self.default_garment
            );
            &self.default_garment
        }
    }

    pub fn garment_path(&self, garment: &str) -> Option<&str> {
        self.garments.get(garment).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: StudioConfig =
            serde_json::from_str(r##"{ "garment_color": "#ff0000", "fit": { "margin": 0.5 } }"##)
                .unwrap();
        assert_eq!(config.garment_color, HexColor::new(0xff, 0, 0));
        assert_eq!(config.fit.margin, 0.5);
        assert_eq!(config.fit.min_bound, 0.25);
        assert_eq!(config.camera.fov_deg, 22.0);
        assert_eq!(config.garment_path("hoodie"), Some("assets/hoodie.glb"));
    }

    #[test]
    fn unknown_garment_falls_back_to_default() {
        let config = StudioConfig::default();
        assert_eq!(config.resolve_garment("cape"), "tee");
        assert_eq!(config.resolve_garment("jacket"), "jacket");
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studio.json");
        std::fs::write(&path, r#"{ "orphan_policy": "drop", "default_garment": "hoodie" }"#)
            .unwrap();
        let config = StudioConfig::load(&path).unwrap();
        assert_eq!(config.orphan_policy, OrphanPolicy::Drop);
        assert_eq!(config.default_garment, "hoodie");

        let missing = StudioConfig::load(&dir.path().join("nope.json"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
