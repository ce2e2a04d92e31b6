//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/stationmap/stationmap.toml`
//! 3. Explicit config file (`--config`)
//! 4. Environment variables: `STATIONMAP_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{ACCENT_COLOR, DEFAULT_PALETTE};

/// Circular drop target that turns a drag into a removal request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RemovalZone {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// Force simulation tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutSettings {
    /// Canvas size; centering pulls toward its middle
    pub width: f64,
    pub height: f64,
    /// Rest length of parent→child springs
    pub link_distance: f64,
    pub link_strength: f64,
    /// Pairwise repulsion, negative pushes apart
    pub charge_strength: f64,
    /// Per-axis pull toward the canvas center
    pub center_strength: f64,
    /// Collision radius = base + per_char * label length, capped at max
    pub collide_base: f64,
    pub collide_per_char: f64,
    pub collide_max: f64,
    pub alpha_min: f64,
    pub alpha_decay: f64,
    pub velocity_decay: f64,
    /// Excitation kept up while a node is dragged
    pub drag_alpha_target: f64,
    /// Max distance from the drop point to a node that becomes the new parent
    pub drop_radius: f64,
    pub removal_zone: RemovalZone,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        let alpha_min: f64 = 0.001;
        Self {
            width: 1200.0,
            height: 800.0,
            link_distance: 90.0,
            link_strength: 1.0,
            charge_strength: -300.0,
            center_strength: 0.05,
            collide_base: 20.0,
            collide_per_char: 3.5,
            collide_max: 70.0,
            alpha_min,
            // Settles in ~300 ticks
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            velocity_decay: 0.4,
            drag_alpha_target: 0.3,
            drop_radius: 80.0,
            removal_zone: RemovalZone {
                x: 1140.0,
                y: 740.0,
                radius: 40.0,
            },
        }
    }
}

impl LayoutSettings {
    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }

    /// Collision radius for a label of `chars` characters.
    pub fn collide_radius(&self, chars: usize) -> f64 {
        (self.collide_base + self.collide_per_char * chars as f64).min(self.collide_max)
    }
}

/// Raw settings for intermediate parsing (Option to detect "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub data_file: Option<PathBuf>,
    pub undo_capacity: Option<usize>,
    pub save_debounce_ms: Option<u64>,
    pub palette: Option<Vec<String>>,
    pub layout: Option<LayoutSettings>,
}

/// Unified configuration for stationmap.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Forest document location (default: <data dir>/forest.json)
    pub data_file: PathBuf,
    /// Undo history depth
    pub undo_capacity: usize,
    /// Quiet window before a burst of mutations is written
    pub save_debounce_ms: u64,
    /// Colors handed to new top-level branches
    pub palette: Vec<String>,
    pub layout: LayoutSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            undo_capacity: 10,
            save_debounce_ms: 800,
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            layout: LayoutSettings::default(),
        }
    }
}

fn default_data_file() -> PathBuf {
    ProjectDirs::from("", "", "stationmap")
        .map(|dirs| dirs.data_dir().join("forest.json"))
        .unwrap_or_else(|| PathBuf::from("~/.stationmap/forest.json"))
}

/// Get the XDG config directory for stationmap.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "stationmap").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("stationmap.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Overlay wins wherever it specifies a value. Arrays replace.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            data_file: overlay
                .data_file
                .clone()
                .unwrap_or_else(|| self.data_file.clone()),
            undo_capacity: overlay.undo_capacity.unwrap_or(self.undo_capacity),
            save_debounce_ms: overlay.save_debounce_ms.unwrap_or(self.save_debounce_ms),
            palette: overlay
                .palette
                .clone()
                .unwrap_or_else(|| self.palette.clone()),
            layout: overlay
                .layout
                .clone()
                .unwrap_or_else(|| self.layout.clone()),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `explicit` - Optional config file given on the command line
    pub fn load(explicit: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            current = current.merge_with(&load_raw_settings(path)?);
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        current.validate()?;

        Ok(current)
    }

    /// Apply STATIONMAP_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("STATIONMAP")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("palette")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("data_file") {
            settings.data_file = PathBuf::from(val);
        }
        if let Ok(val) = config.get::<usize>("undo_capacity") {
            settings.undo_capacity = val;
        }
        if let Ok(val) = config.get::<u64>("save_debounce_ms") {
            settings.save_debounce_ms = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("palette") {
            settings.palette = val;
        }
        if let Ok(val) = config.get::<f64>("layout.drop_radius") {
            settings.layout.drop_radius = val;
        }

        Ok(settings)
    }

    /// Expand shell variables and tilde in the data file path.
    fn expand_paths(&mut self) {
        let raw = self.data_file.to_string_lossy().to_string();
        let expanded = shellexpand::full(&raw)
            .map(|s| s.into_owned())
            .unwrap_or(raw);
        self.data_file = PathBuf::from(expanded);
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        if self.undo_capacity == 0 {
            return Err(ApplicationError::Config {
                message: "undo_capacity must be at least 1".into(),
            });
        }
        if self.palette.is_empty() {
            return Err(ApplicationError::Config {
                message: "palette must not be empty".into(),
            });
        }
        if self.palette.iter().any(|c| c == ACCENT_COLOR) {
            return Err(ApplicationError::Config {
                message: format!("palette must not contain the reserved color {ACCENT_COLOR:?}"),
            });
        }
        let layout = &self.layout;
        if !(layout.alpha_decay > 0.0 && layout.alpha_decay < 1.0) {
            return Err(ApplicationError::Config {
                message: format!("layout.alpha_decay must be in (0, 1): {}", layout.alpha_decay),
            });
        }
        if !(0.0..=1.0).contains(&layout.velocity_decay) {
            return Err(ApplicationError::Config {
                message: format!(
                    "layout.velocity_decay must be in [0, 1]: {}",
                    layout.velocity_decay
                ),
            });
        }
        Ok(())
    }

    pub fn save_debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.save_debounce_ms)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r##"# stationmap configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/stationmap/stationmap.toml
#   Local:  --config <file>
#   Env:    STATIONMAP_* environment variables (STATIONMAP_LAYOUT__DROP_RADIUS=60)
#
# Later layers replace earlier values; arrays and the [layout] table replace as a whole.

# Forest document
# data_file = "~/.local/share/stationmap/forest.json"

# Undo history depth
# undo_capacity = 10

# Quiet window (ms) before a burst of edits is written
# save_debounce_ms = 800

# Colors for new top-level branches
# palette = ["#e6194b", "#3cb44b", "#4363d8"]

# [layout]
# width = 1200.0
# height = 800.0
# link_distance = 90.0
# charge_strength = -300.0
# drop_radius = 80.0
# removal_zone = { x = 1140.0, y = 740.0, radius = 40.0 }
"##
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
