//! TOML-based configuration persistence for the viewer.
//!
//! Reads [`AppConfig`] from the platform-appropriate config file:
//! - Windows:  `%APPDATA%\CamGrid\config.toml`
//! - Linux:    `~/.config/camgrid/config.toml`
//! - macOS:    `~/Library/Application Support/CamGrid/config.toml`
//!
//! A different file can be given with `--config` (or `CAMGRID_CONFIG`).
//!
//! # Example
//!
//! ```toml
//! [viewer]
//! title = "Front office"
//! mode = "grid"
//!
//! [layout]
//! visible_count = 4
//! category = "Gate"
//!
//! [media]
//! network_caching_ms = 500
//!
//! [[cameras]]
//! id = 1
//! name = "Gate 1"
//! url = "rtsp://10.0.0.11:554/stream1"
//! area = "Gate"
//! ```
//!
//! # Serde default values
//!
//! Every section and every field has a default, so an empty file, a missing
//! file and a file written by an older version are all accepted.  When the
//! `[[cameras]]` list is empty the viewer falls back to a built-in demo list.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use camgrid_core::{
    CameraDescriptor, CameraId, CategoryFilter, GridPolicy, HealthPolicy, MediaOptions, TileSpec,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::layout_manager::{LayoutMode, LayoutSettings};
use crate::application::viewer::ViewerConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// Two cameras share one id.
    #[error("camera id {0} is used more than once")]
    DuplicateCamera(CameraId),

    /// A setting parsed but has a value the viewer cannot run with.
    #[error("invalid value for {key}: {reason}")]
    InvalidSetting { key: String, reason: &'static str },
}

fn invalid(key: impl Into<String>, reason: &'static str) -> ConfigError {
    ConfigError::InvalidSetting {
        key: key.into(),
        reason,
    }
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub viewer: ViewerSection,
    #[serde(default)]
    pub layout: LayoutSection,
    #[serde(default)]
    pub media: MediaOptions,
    #[serde(default)]
    pub health: HealthSection,
    #[serde(default)]
    pub cameras: Vec<CameraDescriptor>,
}

/// Wall window and process settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewerSection {
    #[serde(default = "default_title")]
    pub title: String,
    /// Initial wall window size.
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    /// Size of the screen the wall is shown on, used in fullscreen.
    #[serde(default = "default_screen_width")]
    pub screen_width: u32,
    #[serde(default = "default_screen_height")]
    pub screen_height: u32,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Where camera failures are appended.
    #[serde(default = "default_failure_log_path")]
    pub failure_log_path: PathBuf,
    #[serde(default)]
    pub mode: LayoutMode,
}

/// Layout tunables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutSection {
    #[serde(default = "default_visible_count")]
    pub visible_count: usize,
    #[serde(default = "default_visible_count")]
    pub max_visible: usize,
    /// Area name, or `"all"`.
    #[serde(default = "default_category")]
    pub category: String,
    /// Quiet time after a resize before the layout pass runs.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// When the decoded video size is read after each start.
    #[serde(default = "default_ratio_sample_delays_ms")]
    pub ratio_sample_delays_ms: Vec<u64>,
    #[serde(default)]
    pub grid: GridPolicy,
    #[serde(default = "TileSpec::featured_six")]
    pub spanning: TileSpec,
}

/// Health polling and reconnect timing, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthSection {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
    #[serde(default = "default_min_attempt_gap_ms")]
    pub min_attempt_gap_ms: u64,
    #[serde(default = "default_true")]
    pub auto_reconnect: bool,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_title() -> String {
    "CamGrid".to_string()
}
fn default_window_width() -> u32 {
    1600
}
fn default_window_height() -> u32 {
    900
}
fn default_screen_width() -> u32 {
    1920
}
fn default_screen_height() -> u32 {
    1080
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_failure_log_path() -> PathBuf {
    PathBuf::from("failed_cams.txt")
}
fn default_visible_count() -> usize {
    6
}
fn default_category() -> String {
    "all".to_string()
}
fn default_settle_delay_ms() -> u64 {
    50
}
fn default_ratio_sample_delays_ms() -> Vec<u64> {
    vec![1200, 2500]
}
fn default_poll_interval_ms() -> u64 {
    2000
}
fn default_grace_period_ms() -> u64 {
    2000
}
fn default_retry_interval_ms() -> u64 {
    5000
}
fn default_min_attempt_gap_ms() -> u64 {
    1000
}
fn default_true() -> bool {
    true
}

impl Default for ViewerSection {
    fn default() -> Self {
        Self {
            title: default_title(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            screen_width: default_screen_width(),
            screen_height: default_screen_height(),
            log_level: default_log_level(),
            failure_log_path: default_failure_log_path(),
            mode: LayoutMode::default(),
        }
    }
}

impl Default for LayoutSection {
    fn default() -> Self {
        Self {
            visible_count: default_visible_count(),
            max_visible: default_visible_count(),
            category: default_category(),
            settle_delay_ms: default_settle_delay_ms(),
            ratio_sample_delays_ms: default_ratio_sample_delays_ms(),
            grid: GridPolicy::default(),
            spanning: TileSpec::featured_six(),
        }
    }
}

impl Default for HealthSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            grace_period_ms: default_grace_period_ms(),
            retry_interval_ms: default_retry_interval_ms(),
            min_attempt_gap_ms: default_min_attempt_gap_ms(),
            auto_reconnect: default_true(),
        }
    }
}

impl HealthSection {
    pub fn to_policy(&self) -> HealthPolicy {
        HealthPolicy {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            grace_period: Duration::from_millis(self.grace_period_ms),
            retry_interval: Duration::from_millis(self.retry_interval_ms),
            min_attempt_gap: Duration::from_millis(self.min_attempt_gap_ms),
            auto_reconnect: self.auto_reconnect,
        }
    }
}

/// Cameras used when the config lists none: six streams from a local RTSP
/// server plus two placeholder slots.
pub fn demo_cameras() -> Vec<CameraDescriptor> {
    vec![
        CameraDescriptor::new(1, "Gate 1", "rtsp://127.0.0.1:8554/cam1", "Gate"),
        CameraDescriptor::new(2, "Lobby 1", "rtsp://127.0.0.1:8554/cam2", "Lobby"),
        CameraDescriptor::new(3, "Fence", "rtsp://127.0.0.1:8554/cam3", "Fence"),
        CameraDescriptor::new(4, "Gate 2", "rtsp://127.0.0.1:8554/cam4", "Gate"),
        CameraDescriptor::new(5, "Lobby 2", "rtsp://127.0.0.1:8554/cam5", "Lobby"),
        CameraDescriptor::new(6, "Fence east", "rtsp://127.0.0.1:8554/cam6", "Fence"),
        CameraDescriptor::new(7, "Spare 7", "", "Gate"),
        CameraDescriptor::new(8, "Spare 8", "", "Gate"),
    ]
}

impl AppConfig {
    /// Checks what serde cannot: camera ids must be unique, timers must
    /// be non-zero and every grid shape needs at least one row and column.
    ///
    /// A zero poll interval or settle delay would re-arm its deadline at the
    /// current instant and keep the event loop spinning.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateCamera`] for the first repeated id and
    /// [`ConfigError::InvalidSetting`] for the first unusable value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = BTreeSet::new();
        for camera in &self.cameras {
            if !seen.insert(camera.id) {
                return Err(ConfigError::DuplicateCamera(camera.id));
            }
        }

        let timers = [
            ("layout.settle_delay_ms", self.layout.settle_delay_ms),
            ("health.poll_interval_ms", self.health.poll_interval_ms),
            ("health.retry_interval_ms", self.health.retry_interval_ms),
        ];
        for (key, value) in timers {
            if value == 0 {
                return Err(invalid(key, "must be greater than 0"));
            }
        }

        let grid = &self.layout.grid;
        for (index, rule) in grid.rules.iter().enumerate() {
            if rule.rows == 0 || rule.columns == 0 {
                return Err(invalid(
                    format!("layout.grid.rules[{index}]"),
                    "rows and columns must be greater than 0",
                ));
            }
        }
        if grid.fallback.rows == 0 || grid.fallback.columns == 0 {
            return Err(invalid(
                "layout.grid.fallback",
                "rows and columns must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Returns the configured cameras, or the demo list when none are set.
    pub fn cameras_or_demo(&self) -> Vec<CameraDescriptor> {
        if self.cameras.is_empty() {
            demo_cameras()
        } else {
            self.cameras.clone()
        }
    }

    /// Builds the runtime configuration of the viewer.
    pub fn viewer_config(&self) -> ViewerConfig {
        ViewerConfig {
            layout: LayoutSettings {
                mode: self.viewer.mode,
                visible_count: self.layout.visible_count,
                max_visible: self.layout.max_visible,
                category: CategoryFilter::from_label(&self.layout.category),
                grid_policy: self.layout.grid.clone(),
                spanning: self.layout.spanning.clone(),
            },
            media: self.media.clone(),
            health: self.health.to_policy(),
            settle_delay: Duration::from_millis(self.layout.settle_delay_ms),
            ratio_sample_delays: self
                .layout
                .ratio_sample_delays_ms
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from the platform config file.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Resolves the platform config base directory, including the `CamGrid`
/// subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // %APPDATA% e.g. C:\Users\<user>\AppData\Roaming
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("CamGrid"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("camgrid"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("CamGrid")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use camgrid_core::{GridRule, GridShape, TileSpan};

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("camgrid-config-{}-{}", name, std::process::id()))
            .join("config.toml")
    }

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_app_config_default_has_expected_viewer_settings() {
        // Arrange / Act
        let cfg = AppConfig::default();

        // Assert
        assert_eq!(cfg.viewer.title, "CamGrid");
        assert_eq!((cfg.viewer.window_width, cfg.viewer.window_height), (1600, 900));
        assert_eq!(cfg.viewer.log_level, "info");
        assert_eq!(cfg.viewer.failure_log_path, PathBuf::from("failed_cams.txt"));
        assert_eq!(cfg.viewer.mode, LayoutMode::Grid);
    }

    #[test]
    fn test_default_viewer_config_matches_runtime_defaults() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.viewer_config(), ViewerConfig::default());
    }

    #[test]
    fn test_empty_camera_list_falls_back_to_demo() {
        let cfg = AppConfig::default();

        let cameras = cfg.cameras_or_demo();

        assert_eq!(cameras, demo_cameras());
        assert!(cameras.iter().any(|c| !c.has_stream()));
    }

    // ── Parsing ───────────────────────────────────────────────────────────────

    #[test]
    fn test_deserialize_empty_toml_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("deserialize empty");

        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_deserialize_partial_sections_override_defaults() {
        // Arrange
        let toml_str = r#"
[viewer]
mode = "spanning"

[layout]
visible_count = 4
category = "Gate"

[media]
network_caching_ms = 500

[health]
auto_reconnect = false

[[cameras]]
id = 1
name = "Gate 1"
url = "rtsp://10.0.0.11/stream1"
area = "Gate"

[[cameras]]
id = 2
name = "Spare"
"#;

        // Act
        let cfg: AppConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.viewer.mode, LayoutMode::Spanning);
        assert_eq!(cfg.viewer.window_width, 1600);
        assert_eq!(cfg.layout.visible_count, 4);
        assert_eq!(cfg.layout.max_visible, 6);
        assert_eq!(cfg.media.network_caching_ms, 500);
        assert!(cfg.media.force_tcp);
        assert!(!cfg.health.auto_reconnect);
        assert_eq!(cfg.health.retry_interval_ms, 5000);
        assert_eq!(cfg.cameras.len(), 2);
        assert!(!cfg.cameras[1].has_stream());

        let viewer = cfg.viewer_config();
        assert_eq!(viewer.layout.category, CategoryFilter::Area("Gate".into()));
        assert_eq!(viewer.media.network_caching_ms, 500);
        assert!(!viewer.health.auto_reconnect);
    }

    #[test]
    fn test_deserialize_custom_grid_and_spanning_spec() {
        let toml_str = r#"
[layout.grid]
rules = [{ max_count = 3, rows = 1, columns = 3 }]
fallback = { rows = 3, columns = 3 }

[layout.spanning]
columns = 2
rows = 1
spans = [
  { start_col = 0, start_row = 0, end_col = 1, end_row = 1 },
  { start_col = 1, start_row = 0, end_col = 2, end_row = 1 },
]
"#;

        let cfg: AppConfig = toml::from_str(toml_str).expect("deserialize grid");

        assert_eq!(cfg.layout.grid.rules, vec![GridRule::new(3, 1, 3)]);
        assert_eq!(cfg.layout.grid.fallback, GridShape::new(3, 3));
        assert_eq!(cfg.layout.spanning.span(1), Some(&TileSpan::cell(1, 0)));
    }

    #[test]
    fn test_deserialize_out_of_grid_span_is_rejected() {
        let toml_str = r#"
[layout.spanning]
columns = 1
rows = 1
spans = [{ start_col = 0, start_row = 0, end_col = 2, end_row = 1 }]
"#;

        let result: Result<AppConfig, toml::de::Error> = toml::from_str(toml_str);

        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_invalid_toml_returns_parse_error() {
        let result: Result<AppConfig, toml::de::Error> = toml::from_str("[[[ not valid toml");

        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_camera_ids() {
        let mut cfg = AppConfig::default();
        cfg.cameras.push(CameraDescriptor::new(1, "A", "rtsp://a/", "Gate"));
        cfg.cameras.push(CameraDescriptor::new(1, "B", "rtsp://b/", "Gate"));

        let result = cfg.validate();

        assert!(matches!(result, Err(ConfigError::DuplicateCamera(CameraId(1)))));
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_poll_interval() {
        // Arrange
        let cfg: AppConfig = toml::from_str("[health]\npoll_interval_ms = 0").unwrap();

        // Act
        let result = cfg.validate();

        // Assert
        match result {
            Err(ConfigError::InvalidSetting { key, .. }) => {
                assert_eq!(key, "health.poll_interval_ms");
            }
            other => panic!("expected InvalidSetting, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_zero_settle_delay_and_retry_interval() {
        let settle: AppConfig = toml::from_str("[layout]\nsettle_delay_ms = 0").unwrap();
        let retry: AppConfig = toml::from_str("[health]\nretry_interval_ms = 0").unwrap();

        assert!(matches!(
            settle.validate(),
            Err(ConfigError::InvalidSetting { ref key, .. }) if key == "layout.settle_delay_ms"
        ));
        assert!(matches!(
            retry.validate(),
            Err(ConfigError::InvalidSetting { ref key, .. }) if key == "health.retry_interval_ms"
        ));
    }

    #[test]
    fn test_validate_rejects_grid_shapes_without_columns_or_rows() {
        // Arrange
        let rule: AppConfig = toml::from_str(
            "[layout.grid]\nrules = [{ max_count = 2, rows = 1, columns = 0 }]\nfallback = { rows = 3, columns = 3 }",
        )
        .unwrap();
        let fallback: AppConfig = toml::from_str(
            "[layout.grid]\nrules = []\nfallback = { rows = 0, columns = 3 }",
        )
        .unwrap();

        // Act / Assert
        assert!(matches!(
            rule.validate(),
            Err(ConfigError::InvalidSetting { ref key, .. }) if key == "layout.grid.rules[0]"
        ));
        assert!(matches!(
            fallback.validate(),
            Err(ConfigError::InvalidSetting { ref key, .. }) if key == "layout.grid.fallback"
        ));
    }

    // ── Load ───────────────────────────────────────────────────────────

    #[test]
    fn test_load_config_from_missing_file_returns_default() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/config.toml");

        let cfg = load_config_from(&path).expect("missing file is not an error");

        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_load_malformed_file_returns_parse_error() {
        let path = temp_path("malformed");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[viewer\n").unwrap();

        let result = load_config_from(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
