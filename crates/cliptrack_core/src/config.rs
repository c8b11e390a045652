use crate::error::{CoreError, Result};
use crate::types::TimeUs;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunables for the editing session. Times are in seconds, sizes in pixels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    pub min_clip_duration: f64,
    pub duplicate_gap: f64,
    /// Floor for the timeline length, so an empty or short track still scrubs.
    pub min_timeline_duration: f64,
    pub snap_threshold: f64,
    pub label_width_px: f64,
    pub track_width_px: f64,
    pub initial_zoom: f64,
    pub max_zoom: f64,
    pub playing_seek_threshold: f64,
    pub idle_seek_threshold: f64,
    /// Tick rate of the playback loop and commit rate of drag gestures.
    pub frame_rate: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_clip_duration: 0.1,
            duplicate_gap: 0.1,
            min_timeline_duration: 10.0,
            snap_threshold: 0.25,
            label_width_px: 48.0,
            track_width_px: 1200.0,
            initial_zoom: 40.0,
            max_zoom: 400.0,
            playing_seek_threshold: 0.05,
            idle_seek_threshold: 0.2,
            frame_rate: 60.0,
        }
    }
}

impl EditorConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: EditorConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("min_clip_duration", self.min_clip_duration),
            ("min_timeline_duration", self.min_timeline_duration),
            ("track_width_px", self.track_width_px),
            ("initial_zoom", self.initial_zoom),
            ("max_zoom", self.max_zoom),
            ("frame_rate", self.frame_rate),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(CoreError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        let non_negative = [
            ("duplicate_gap", self.duplicate_gap),
            ("snap_threshold", self.snap_threshold),
            ("label_width_px", self.label_width_px),
            ("playing_seek_threshold", self.playing_seek_threshold),
            ("idle_seek_threshold", self.idle_seek_threshold),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(CoreError::InvalidConfig(format!(
                    "{} must not be negative, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    pub fn min_clip_duration_us(&self) -> TimeUs {
        TimeUs::from_seconds(self.min_clip_duration)
    }

    pub fn duplicate_gap_us(&self) -> TimeUs {
        TimeUs::from_seconds(self.duplicate_gap)
    }

    pub fn min_timeline_duration_us(&self) -> TimeUs {
        TimeUs::from_seconds(self.min_timeline_duration)
    }

    pub fn snap_threshold_us(&self) -> TimeUs {
        TimeUs::from_seconds(self.snap_threshold)
    }

    pub fn playing_seek_threshold_us(&self) -> TimeUs {
        TimeUs::from_seconds(self.playing_seek_threshold)
    }

    pub fn idle_seek_threshold_us(&self) -> TimeUs {
        TimeUs::from_seconds(self.idle_seek_threshold)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate.max(1.0))
    }
}
