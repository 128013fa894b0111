//! Init-time configuration for the framebuffer backend.
//!
//! All values are read once during initialization. The frontend fills them
//! from an optional JSON file and then applies command-line overrides.

use crate::error::FbError;
use crate::types::{LOGICAL_HEIGHT, LOGICAL_WIDTH};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Which raw keyboard protocol to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputBackendKind {
    /// Typed records from `/dev/input/eventN` (keyboard and mouse)
    #[default]
    Evdev,
    /// Single-byte mediumraw keycodes from a virtual terminal
    Tty,
    /// No input at all
    None,
}

impl InputBackendKind {
    pub fn name(&self) -> &str {
        match self {
            InputBackendKind::Evdev => "evdev",
            InputBackendKind::Tty => "tty",
            InputBackendKind::None => "none",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "evdev" | "event" => Some(InputBackendKind::Evdev),
            "tty" | "mediumraw" => Some(InputBackendKind::Tty),
            "none" | "off" => Some(InputBackendKind::None),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub framebuffer: PathBuf,
    /// Explicit integer scale; `None` picks the largest factor that fits
    pub scaling: Option<u32>,
    /// Swap red and blue offsets after querying the device
    pub bgra: bool,
    /// Present through a shared mapping instead of positioned writes
    pub use_mmap: bool,
    pub logical_width: usize,
    pub logical_height: usize,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            framebuffer: PathBuf::from("/dev/fb0"),
            scaling: None,
            bgra: false,
            use_mmap: true,
            logical_width: LOGICAL_WIDTH,
            logical_height: LOGICAL_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    pub backend: InputBackendKind,
    /// Skip keyboard setup entirely (tty backend)
    pub no_keyboard: bool,
    pub registry: PathBuf,
    pub keyboard_name: String,
    pub mouse_name: String,
    /// Directory holding the `eventN` nodes
    pub event_dir: PathBuf,
    pub tty_candidates: Vec<PathBuf>,
    pub mouse_gain: i32,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            backend: InputBackendKind::default(),
            no_keyboard: false,
            registry: PathBuf::from("/proc/bus/input/devices"),
            keyboard_name: "kbdsrv virtual keyboard".to_string(),
            mouse_name: "kbdsrv virtual mouse".to_string(),
            event_dir: PathBuf::from("/dev/input"),
            tty_candidates: vec![
                PathBuf::from("/dev/tty"),
                PathBuf::from("/dev/tty0"),
                PathBuf::from("/dev/console"),
            ],
            mouse_gain: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub display: DisplaySettings,
    pub input: InputSettings,
}

impl Settings {
    /// Load settings from a JSON file.
    ///
    /// Missing fields take their defaults; an unreadable or malformed file is an error.
    pub fn load(path: &Path) -> Result<Self, FbError> {
        let contents = fs::read_to_string(path).map_err(|source| FbError::SettingsRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| FbError::Settings {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load settings, falling back to defaults on any error
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{}. Using defaults.", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), FbError> {
        let contents = serde_json::to_string_pretty(self).map_err(|source| FbError::Settings {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.display.framebuffer, PathBuf::from("/dev/fb0"));
        assert_eq!(settings.display.scaling, None);
        assert!(settings.display.use_mmap);
        assert!(!settings.display.bgra);
        assert_eq!(settings.input.backend, InputBackendKind::Evdev);
        assert_eq!(settings.input.mouse_gain, 5);
        assert_eq!(settings.input.tty_candidates.len(), 3);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let json = r#"{ "display": { "scaling": 2, "bgra": true }, "input": { "backend": "tty" } }"#;
        let settings: Settings = serde_json::from_str(json).expect("parse");
        assert_eq!(settings.display.scaling, Some(2));
        assert!(settings.display.bgra);
        assert!(settings.display.use_mmap);
        assert_eq!(settings.input.backend, InputBackendKind::Tty);
        assert_eq!(settings.input.keyboard_name, "kbdsrv virtual keyboard");
    }

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!(InputBackendKind::parse("EVDEV"), Some(InputBackendKind::Evdev));
        assert_eq!(InputBackendKind::parse("mediumraw"), Some(InputBackendKind::Tty));
        assert_eq!(InputBackendKind::parse("off"), Some(InputBackendKind::None));
        assert_eq!(InputBackendKind::parse("joystick"), None);
        assert_eq!(InputBackendKind::Tty.name(), "tty");
    }

    #[test]
    fn test_settings_save_load() {
        let test_dir = std::env::temp_dir().join("fbdev_core_test_settings");
        fs::create_dir_all(&test_dir).unwrap();
        let path = test_dir.join("settings.json");

        let settings = Settings {
            display: DisplaySettings {
                scaling: Some(3),
                use_mmap: false,
                ..Default::default()
            },
            ..Default::default()
        };
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, settings);

        fs::remove_dir_all(&test_dir).unwrap();
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let test_dir = std::env::temp_dir().join("fbdev_core_test_bad_settings");
        fs::create_dir_all(&test_dir).unwrap();
        let path = test_dir.join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(Settings::load(&path), Err(FbError::Settings { .. })));
        assert_eq!(Settings::load_or_default(&path), Settings::default());

        fs::remove_dir_all(&test_dir).unwrap();
    }

    #[test]
    fn test_missing_file_is_a_settings_error() {
        let path = std::env::temp_dir().join("fbdev_core_no_such_settings.json");
        let _ = fs::remove_file(&path);

        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, FbError::SettingsRead { .. }));
        assert!(err.to_string().contains("settings file"));
        assert!(err.is_fatal());
    }
}
