//! Engine settings
//!
//! The matrix owns one `SplomSettings` and hands a shared reference to each
//! plot it creates.

use serde::{Deserialize, Serialize};

/// RGBA color, 8 bits per channel
pub type Rgba = [u8; 4];

/// Colors the renderer should use for each point emphasis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub point: Rgba,
    pub selection: Rgba,
    pub highlight: Rgba,
    pub hover: Rgba,
    pub previous_hover: Rgba,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            point: [31, 119, 180, 160],
            selection: [255, 127, 14, 255],
            highlight: [214, 39, 40, 255],
            hover: [44, 160, 44, 255],
            previous_hover: [44, 160, 44, 96],
        }
    }
}

/// Tunables for transforms, indexing and interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplomSettings {
    /// Bucket grid size of each plot's spatial index
    pub grid_resolution: (usize, usize),

    /// Padding added on each side of a column range, as a fraction of its span
    pub range_margin: f64,

    /// Half-width used to widen zero-variance columns
    pub degenerate_epsilon: f64,

    /// Pick radius for hover queries
    pub pick_radius_px: f64,

    /// Target number of ticks per axis
    pub desired_tick_count: usize,

    /// Zoom factor applied per wheel notch
    pub zoom_step: f64,

    pub min_scale: f64,
    pub max_scale: f64,

    /// Gap between neighbouring plots of the matrix
    pub plot_spacing_px: f64,

    pub palette: Palette,
}

impl Default for SplomSettings {
    fn default() -> Self {
        Self {
            grid_resolution: (100, 100),
            range_margin: 0.05,
            degenerate_epsilon: 0.1,
            pick_radius_px: 5.0,
            desired_tick_count: 5,
            zoom_step: 1.25,
            min_scale: 0.1,
            max_scale: 1000.0,
            plot_spacing_px: 4.0,
            palette: Palette::default(),
        }
    }
}

impl SplomSettings {
    /// Parse settings from JSON, filling missing keys with defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let settings: SplomSettings = serde_json::from_str(json)?;
        Ok(settings.sanitized())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Replace unusable values with their defaults
    pub fn sanitized(mut self) -> Self {
        let defaults = SplomSettings::default();
        if self.grid_resolution.0 == 0 || self.grid_resolution.1 == 0 {
            tracing::warn!("Invalid grid resolution {:?}, using default", self.grid_resolution);
            self.grid_resolution = defaults.grid_resolution;
        }
        if !(self.range_margin >= 0.0) {
            self.range_margin = defaults.range_margin;
        }
        if !(self.degenerate_epsilon > 0.0) {
            self.degenerate_epsilon = defaults.degenerate_epsilon;
        }
        if !(self.pick_radius_px > 0.0) {
            self.pick_radius_px = defaults.pick_radius_px;
        }
        if self.desired_tick_count == 0 {
            self.desired_tick_count = defaults.desired_tick_count;
        }
        if !(self.zoom_step > 1.0) {
            self.zoom_step = defaults.zoom_step;
        }
        if !(self.min_scale > 0.0 && self.max_scale >= self.min_scale) {
            self.min_scale = defaults.min_scale;
            self.max_scale = defaults.max_scale;
        }
        if !(self.plot_spacing_px >= 0.0) {
            self.plot_spacing_px = defaults.plot_spacing_px;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = SplomSettings::from_json(r#"{ "pick_radius_px": 8.0 }"#).unwrap();
        assert_eq!(settings.pick_radius_px, 8.0);
        assert_eq!(settings.grid_resolution, (100, 100));
        assert_eq!(settings.palette, Palette::default());
    }

    #[test]
    fn test_invalid_values_are_sanitized() {
        let settings = SplomSettings::from_json(
            r#"{ "grid_resolution": [0, 10], "min_scale": -1.0, "zoom_step": 0.5 }"#,
        )
        .unwrap();
        assert_eq!(settings.grid_resolution, (100, 100));
        assert_eq!(settings.min_scale, 0.1);
        assert_eq!(settings.zoom_step, 1.25);
    }

    #[test]
    fn test_settings_json_roundtrip() {
        let settings = SplomSettings {
            grid_resolution: (32, 64),
            ..Default::default()
        };
        let json = settings.to_json().unwrap();
        assert_eq!(SplomSettings::from_json(&json).unwrap(), settings);
    }
}
