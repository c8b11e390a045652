//! Time-to-pixel mapping for the track view: zoom bounds, coordinate
//! conversion, snapping and ruler ticks.

use crate::config::EditorConfig;
use crate::snapping::{collect_snap_points, find_snap_point};
use crate::types::*;

/// Sources shorter than this never push the minimum zoom further out.
const MIN_ZOOM_SPAN_SECS: f64 = 60.0;
const ZOOM_STEP: f64 = 1.25;
const TARGET_PX_PER_TICK: f64 = 90.0;
const NICE_TICK_SECS: [f64; 10] = [0.5, 1.0, 2.0, 5.0, 10.0, 15.0, 30.0, 60.0, 120.0, 300.0];

/// A labelled major tick on the time ruler.
#[derive(Debug, Clone, PartialEq)]
pub struct RulerTick {
    pub time: TimeUs,
    pub x: f64,
    pub label: String,
}

/// Maps between timeline seconds and track pixels.
#[derive(Debug, Clone)]
pub struct TimeScale {
    /// Pixels per second.
    scale: f64,
    min_zoom: f64,
    max_zoom: f64,
    label_width: f64,
    track_width: f64,
    timeline_duration: TimeUs,
    snap_threshold: TimeUs,
}

impl Default for TimeScale {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}

impl TimeScale {
    pub fn new(config: &EditorConfig) -> Self {
        let mut scale = Self {
            scale: config.initial_zoom,
            min_zoom: 0.0,
            max_zoom: config.max_zoom,
            label_width: config.label_width_px,
            track_width: config.track_width_px,
            timeline_duration: config.min_timeline_duration_us(),
            snap_threshold: config.snap_threshold_us(),
        };
        scale.recompute_bounds(&[], scale.timeline_duration);
        scale
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn min_zoom(&self) -> f64 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    pub fn label_width(&self) -> f64 {
        self.label_width
    }

    pub fn timeline_duration(&self) -> TimeUs {
        self.timeline_duration
    }

    /// Refresh the content-derived minimum zoom and the clamp range for
    /// `pixel_to_time`. Call after every clip edit.
    pub fn recompute_bounds(&mut self, clips: &[TimelineClip], timeline_duration: TimeUs) {
        let longest = clips
            .iter()
            .map(|c| c.original_duration().as_seconds())
            .fold(0.0, f64::max);
        let span = MIN_ZOOM_SPAN_SECS.max(longest * 2.0);
        self.min_zoom = (self.track_width / span).min(self.max_zoom);
        self.timeline_duration = timeline_duration.max(TimeUs::ZERO);
        self.scale = self.scale.clamp(self.min_zoom, self.max_zoom);
    }

    /// Set pixels-per-second, clamped to the zoom bounds. Returns the applied value.
    pub fn set_scale(&mut self, scale: f64) -> f64 {
        if scale.is_finite() {
            self.scale = scale.clamp(self.min_zoom, self.max_zoom);
        }
        self.scale
    }

    pub fn zoom_by(&mut self, factor: f64) -> f64 {
        self.set_scale(self.scale * factor)
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.zoom_by(ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.zoom_by(1.0 / ZOOM_STEP)
    }

    /// Pick the scale that fits the whole timeline into the track area.
    pub fn zoom_to_fit(&mut self) -> f64 {
        let secs = self.timeline_duration.as_seconds();
        let usable = (self.track_width - self.label_width).max(1.0);
        if secs <= 0.0 {
            return self.scale;
        }
        self.set_scale(usable / secs)
    }

    pub fn time_to_pixel(&self, t: TimeUs) -> f64 {
        self.label_width + t.as_seconds() * self.scale
    }

    /// Pointer x to timeline time, clamped to `[0, timeline_duration]`.
    pub fn pixel_to_time(&self, x: f64) -> TimeUs {
        let t = TimeUs::from_seconds((x - self.label_width) / self.scale);
        t.clamp(TimeUs::ZERO, self.timeline_duration)
    }

    pub fn duration_to_pixels(&self, d: TimeUs) -> f64 {
        d.as_seconds() * self.scale
    }

    /// Signed pixel delta to a time delta, for drag gestures.
    pub fn pixels_to_duration(&self, dx: f64) -> TimeUs {
        TimeUs::from_seconds(dx / self.scale)
    }

    /// Snap to the playhead or a clip edge when within the threshold.
    pub fn snap(
        &self,
        candidate: TimeUs,
        clips: &[TimelineClip],
        playhead: TimeUs,
        exclude_clip_id: Option<ClipId>,
    ) -> TimeUs {
        let points = collect_snap_points(clips, playhead, exclude_clip_id);
        find_snap_point(candidate, &points, self.snap_threshold)
    }

    /// Major ruler ticks over the whole timeline, spaced on a "nice" interval
    /// close to `TARGET_PX_PER_TICK` apart.
    pub fn ruler_ticks(&self) -> Vec<RulerTick> {
        let step = self.tick_interval_secs();
        let total = self.timeline_duration.as_seconds();
        let count = (total / step).floor() as usize + 1;

        (0..count)
            .map(|i| {
                let secs = i as f64 * step;
                let time = TimeUs::from_seconds(secs);
                RulerTick {
                    time,
                    x: self.time_to_pixel(time),
                    label: tick_label(secs),
                }
            })
            .collect()
    }

    pub fn tick_interval_secs(&self) -> f64 {
        let target = (TARGET_PX_PER_TICK / self.scale.max(0.1)).max(NICE_TICK_SECS[0]);
        NICE_TICK_SECS
            .iter()
            .copied()
            .find(|&tick| tick >= target)
            .unwrap_or(NICE_TICK_SECS[NICE_TICK_SECS.len() - 1])
    }
}

fn tick_label(secs: f64) -> String {
    let whole = secs.floor() as i64;
    let minutes = whole / 60;
    let seconds = whole % 60;
    if secs.fract() > 0.0 {
        format!("{}:{:02}.5", minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
