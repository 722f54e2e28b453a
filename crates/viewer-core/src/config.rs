//! Viewport configuration.
//!
//! Every tunable of the viewport engine lives in [`ViewportConfig`]: zoom
//! presets, scrollbar metrics, gesture and swipe thresholds, and keyboard
//! scroll steps. Configuration can be loaded from a TOML file, from
//! environment variables, or built programmatically.

use crate::zoom_manager::ZoomBehavior;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Zoom stops used by zoom in/out; the first and last entries bound every zoom.
pub const DEFAULT_PRESET_ZOOM_FACTORS: [f64; 17] = [
    0.25,
    1.0 / 3.0,
    0.5,
    2.0 / 3.0,
    0.75,
    0.8,
    0.9,
    1.0,
    1.1,
    1.25,
    1.5,
    1.75,
    2.0,
    2.5,
    3.0,
    4.0,
    5.0,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Scrollbar thickness in pixels
    pub scrollbar_width: f64,
    /// Upper bound for the zoom picked when a document first loads
    pub default_zoom: f64,
    pub preset_zoom_factors: Vec<f64>,
    /// Whether keyboard paging requests smooth scrolls
    pub smooth_scrolling: bool,
    /// UI writing direction
    pub right_to_left: bool,
    pub zoom_behavior: ZoomBehavior,
    pub initial_browser_zoom: f64,
    pub gesture: GestureConfig,
    pub swipe: SwipeConfig,
    pub keyboard: KeyboardConfig,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            scrollbar_width: 15.0,
            default_zoom: 1.0,
            preset_zoom_factors: DEFAULT_PRESET_ZOOM_FACTORS.to_vec(),
            smooth_scrolling: false,
            right_to_left: false,
            zoom_behavior: ZoomBehavior::Inactive,
            initial_browser_zoom: 1.0,
            gesture: GestureConfig::default(),
            swipe: SwipeConfig::default(),
            keyboard: KeyboardConfig::default(),
        }
    }
}

/// Pinch emulation for ctrl+wheel input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Quiet period after the last ctrl+wheel tick before the pinch ends
    pub wheel_end_delay_ms: u64,
    pub min_wheel_scale: f64,
    pub max_wheel_scale: f64,
    /// Per-tick scale is `exp(-delta_y / wheel_delta_divisor)`
    pub wheel_delta_divisor: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            wheel_end_delay_ms: 100,
            min_wheel_scale: 0.75,
            max_wheel_scale: 1.25,
            wheel_delta_divisor: 100.0,
        }
    }
}

impl GestureConfig {
    pub fn wheel_end_delay(&self) -> Duration {
        Duration::from_millis(self.wheel_end_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwipeConfig {
    pub max_duration_ms: u64,
    pub min_horizontal_px: f64,
    pub max_vertical_px: f64,
}

impl Default for SwipeConfig {
    fn default() -> Self {
        Self { max_duration_ms: 200, min_horizontal_px: 150.0, max_vertical_px: 100.0 }
    }
}

impl SwipeConfig {
    pub fn max_duration(&self) -> Duration {
        Duration::from_millis(self.max_duration_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
    /// Arrow key scroll step in pixels
    pub scroll_increment_px: f64,
    /// Fraction of the window height scrolled by PageUp/PageDown/Space
    pub page_step_fraction: f64,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self { scroll_increment_px: 40.0, page_step_fraction: 0.875 }
    }
}

impl ViewportConfig {
    /// Sets the scrollbar width in pixels.
    pub fn with_scrollbar_width(mut self, width: f64) -> Self {
        self.scrollbar_width = width;
        self
    }

    /// Sets the default zoom used on first document load.
    pub fn with_default_zoom(mut self, zoom: f64) -> Self {
        self.default_zoom = zoom;
        self
    }

    /// Replaces the preset zoom factors.
    pub fn with_preset_zoom_factors(mut self, factors: Vec<f64>) -> Self {
        self.preset_zoom_factors = factors;
        self
    }

    pub fn with_smooth_scrolling(mut self, smooth: bool) -> Self {
        self.smooth_scrolling = smooth;
        self
    }

    pub fn with_right_to_left(mut self, rtl: bool) -> Self {
        self.right_to_left = rtl;
        self
    }

    pub fn with_zoom_behavior(mut self, behavior: ZoomBehavior) -> Self {
        self.zoom_behavior = behavior;
        self
    }

    pub fn with_initial_browser_zoom(mut self, zoom: f64) -> Self {
        self.initial_browser_zoom = zoom;
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables:
    /// - `VIEWPORT_SCROLLBAR_WIDTH`: scrollbar width in pixels (default: 15)
    /// - `VIEWPORT_DEFAULT_ZOOM`: default zoom factor (default: 1.0)
    /// - `VIEWPORT_SMOOTH_SCROLLING`: `true` or `false` (default: false)
    /// - `VIEWPORT_RTL`: `true` for right-to-left UI (default: false)
    /// - `VIEWPORT_ZOOM_BEHAVIOR`: `inactive`, `active` or `embedded`
    /// - `VIEWPORT_WHEEL_END_DELAY_MS`: ctrl+wheel pinch end delay (default: 100)
    ///
    /// # Errors
    /// Returns an error if any variable holds an unparsable or invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(width) = env_value("VIEWPORT_SCROLLBAR_WIDTH")? {
            config.scrollbar_width = width;
        }
        if let Some(zoom) = env_value("VIEWPORT_DEFAULT_ZOOM")? {
            config.default_zoom = zoom;
        }
        if let Some(smooth) = env_value("VIEWPORT_SMOOTH_SCROLLING")? {
            config.smooth_scrolling = smooth;
        }
        if let Some(rtl) = env_value("VIEWPORT_RTL")? {
            config.right_to_left = rtl;
        }
        if let Some(behavior) = env_value("VIEWPORT_ZOOM_BEHAVIOR")? {
            config.zoom_behavior = behavior;
        }
        if let Some(delay) = env_value("VIEWPORT_WHEEL_END_DELAY_MS")? {
            config.gesture.wheel_end_delay_ms = delay;
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// Missing keys take their default values:
    /// ```toml
    /// scrollbar_width = 15.0
    /// default_zoom = 1.0
    /// zoom_behavior = "embedded"
    ///
    /// [gesture]
    /// wheel_end_delay_ms = 100
    /// ```
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        Ok(())
    }

    /// Checks cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(reason) = zoom_factors_problem(&self.preset_zoom_factors) {
            return Err(invalid("preset_zoom_factors", reason));
        }
        if !is_positive(self.default_zoom) {
            return Err(invalid("default_zoom", "must be positive"));
        }
        if !is_positive(self.initial_browser_zoom) {
            return Err(invalid("initial_browser_zoom", "must be positive"));
        }
        if self.scrollbar_width.is_nan() || self.scrollbar_width < 0.0 {
            return Err(invalid("scrollbar_width", "must not be negative"));
        }
        let gesture = &self.gesture;
        if !is_positive(gesture.min_wheel_scale) || gesture.min_wheel_scale > gesture.max_wheel_scale {
            return Err(invalid("gesture.min_wheel_scale", "must be positive and <= max_wheel_scale"));
        }
        if !is_positive(gesture.wheel_delta_divisor) {
            return Err(invalid("gesture.wheel_delta_divisor", "must be positive"));
        }
        if !is_positive(self.keyboard.page_step_fraction) || self.keyboard.page_step_fraction > 1.0 {
            return Err(invalid("keyboard.page_step_fraction", "must be in (0, 1]"));
        }
        Ok(())
    }
}

/// Describes why a zoom factor list cannot bound zooming, if it can't.
pub(crate) fn zoom_factors_problem(factors: &[f64]) -> Option<&'static str> {
    if factors.is_empty() {
        Some("must not be empty")
    } else if factors.iter().any(|factor| !is_positive(*factor)) {
        Some("factors must be positive")
    } else if factors.windows(2).any(|pair| pair[0] >= pair[1]) {
        Some("factors must be strictly ascending")
    } else {
        None
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn env_value<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(key, &format!("cannot parse {raw:?}"))),
        Err(_) => Ok(None),
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue { key: key.to_string(), reason: reason.to_string() }
}

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key {key}: {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const ENV_KEYS: [&str; 6] = [
        "VIEWPORT_SCROLLBAR_WIDTH",
        "VIEWPORT_DEFAULT_ZOOM",
        "VIEWPORT_SMOOTH_SCROLLING",
        "VIEWPORT_RTL",
        "VIEWPORT_ZOOM_BEHAVIOR",
        "VIEWPORT_WHEEL_END_DELAY_MS",
    ];

    fn clear_env() {
        for key in ENV_KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = ViewportConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.preset_zoom_factors.first(), Some(&0.25));
        assert_eq!(config.preset_zoom_factors.last(), Some(&5.0));
        assert_eq!(config.gesture.wheel_end_delay(), Duration::from_millis(100));
        assert_eq!(config.swipe.max_duration(), Duration::from_millis(200));
    }

    #[test]
    fn test_builder_methods() {
        let config = ViewportConfig::default()
            .with_scrollbar_width(0.0)
            .with_default_zoom(1.5)
            .with_smooth_scrolling(true)
            .with_right_to_left(true)
            .with_zoom_behavior(ZoomBehavior::Embedded)
            .with_initial_browser_zoom(2.0);

        assert_eq!(config.scrollbar_width, 0.0);
        assert_eq!(config.default_zoom, 1.5);
        assert!(config.smooth_scrolling);
        assert!(config.right_to_left);
        assert_eq!(config.zoom_behavior, ZoomBehavior::Embedded);
        assert_eq!(config.initial_browser_zoom, 2.0);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ViewportConfig::from_toml_str(
            "scrollbar_width = 0.0\nzoom_behavior = \"active\"\n\n[swipe]\nmax_duration_ms = 300\n",
        )
        .unwrap();

        assert_eq!(config.scrollbar_width, 0.0);
        assert_eq!(config.zoom_behavior, ZoomBehavior::Active);
        assert_eq!(config.swipe.max_duration_ms, 300);
        assert_eq!(config.swipe.min_horizontal_px, 150.0);
        assert_eq!(config.default_zoom, 1.0);
    }

    #[test]
    fn test_validate_rejects_unsorted_presets() {
        let config = ViewportConfig::default().with_preset_zoom_factors(vec![1.0, 0.5]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "preset_zoom_factors"
        ));

        let empty = ViewportConfig::default().with_preset_zoom_factors(Vec::new());
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_toml_parse_error() {
        let result = ViewportConfig::from_toml_str("scrollbar_width = \"wide\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewport.toml");

        let config = ViewportConfig::default().with_default_zoom(0.75).with_right_to_left(true);
        config.save_to_file(&path).unwrap();

        let loaded = ViewportConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file() {
        let result = ViewportConfig::from_file("/nonexistent/viewport.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_env();
        env::set_var("VIEWPORT_SCROLLBAR_WIDTH", "12");
        env::set_var("VIEWPORT_RTL", "true");
        env::set_var("VIEWPORT_ZOOM_BEHAVIOR", "embedded");
        env::set_var("VIEWPORT_WHEEL_END_DELAY_MS", "250");

        let config = ViewportConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.scrollbar_width, 12.0);
        assert!(config.right_to_left);
        assert_eq!(config.zoom_behavior, ZoomBehavior::Embedded);
        assert_eq!(config.gesture.wheel_end_delay_ms, 250);
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_value() {
        clear_env();
        env::set_var("VIEWPORT_DEFAULT_ZOOM", "lots");

        let result = ViewportConfig::from_env();
        clear_env();

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key, .. }) if key == "VIEWPORT_DEFAULT_ZOOM"
        ));
    }
}
