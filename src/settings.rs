use std::path::{Path, PathBuf};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// The player's audio and input preferences.
///
/// This is what gets written to disk and loaded back when the game starts.
/// Fields use #[serde(default)] so a settings file written before a field
/// existed still parses; the missing field takes its default value.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSettings {
    #[serde(default = "enabled")]
    pub music_on: bool,
    #[serde(default = "enabled")]
    pub sound_on: bool,
    #[serde(default = "enabled")]
    pub mic_on: bool,
}

fn enabled() -> bool {
    true
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            music_on: true,
            sound_on: true,
            mic_on: true,
        }
    }
}

/// `<config dir>/dessert-dash/settings.ron`, or a local `settings.ron` when
/// the platform has no config directory.
fn settings_file_path() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join("dessert-dash").join("settings.ron"),
        None => PathBuf::from("settings.ron"),
    }
}

/// Loads settings from the default location, falling back to defaults.
pub fn load_settings() -> AudioSettings {
    load_from(&settings_file_path()).unwrap_or_default()
}

/// Writes settings to the default location. Failures are logged, never fatal.
pub fn save_settings(settings: &AudioSettings) {
    save_to(&settings_file_path(), settings);
}

/// Reads settings from `path`, or returns None if there is no usable file.
pub fn load_from(path: &Path) -> Option<AudioSettings> {
    if !path.exists() {
        info!("No settings file found at {:?}. Using defaults.", path);
        return None;
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match ron::from_str::<AudioSettings>(&contents) {
            Ok(settings) => {
                info!("Loaded settings from {:?}: {:?}", path, settings);
                Some(settings)
            }
            Err(e) => {
                // Corrupted or from an incompatible version: keep playing on defaults.
                error!("Failed to parse settings file: {}. Using defaults.", e);
                None
            }
        },
        Err(e) => {
            error!("Failed to read settings file: {}. Using defaults.", e);
            None
        }
    }
}

pub fn save_to(path: &Path, settings: &AudioSettings) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            error!("Failed to create settings directory: {}", e);
            return;
        }
    }

    let pretty = ron::ser::PrettyConfig::default();
    match ron::ser::to_string_pretty(settings, pretty) {
        Ok(serialized) => {
            if let Err(e) = std::fs::write(path, serialized) {
                error!("Failed to write settings file: {}", e);
            } else {
                debug!("Settings saved to {:?}", path);
            }
        }
        Err(e) => error!("Failed to serialize settings: {}", e),
    }
}
