use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::time::Duration;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// TimeUs
// ---------------------------------------------------------------------------

/// A point or span on either time axis, in whole microseconds.
///
/// Arithmetic saturates at the `i64` range.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct TimeUs(pub i64);

impl TimeUs {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(i64::MAX);

    /// Rounds to the nearest microsecond so decimal inputs like `7.3` land exactly.
    pub fn from_seconds(s: f64) -> Self {
        Self((s * 1_000_000.0).round() as i64)
    }

    pub fn from_duration(d: Duration) -> Self {
        Self(d.as_micros().min(i64::MAX as u128) as i64)
    }

    pub fn as_seconds(&self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    pub fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }
}

impl Add for TimeUs {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for TimeUs {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for TimeUs {
    type Output = Self;
    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl Mul<i64> for TimeUs {
    type Output = Self;
    fn mul(self, rhs: i64) -> Self {
        Self(self.0.saturating_mul(rhs))
    }
}

impl Div<i64> for TimeUs {
    type Output = Self;
    fn div(self, rhs: i64) -> Self {
        Self(self.0.checked_div(rhs).unwrap_or(i64::MAX))
    }
}

impl fmt::Display for TimeUs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_us = self.0.unsigned_abs();
        let total_ms = total_us / 1_000;
        let ms = total_ms % 1_000;
        let total_secs = total_ms / 1_000;
        let secs = total_secs % 60;
        let total_mins = total_secs / 60;
        let mins = total_mins % 60;
        let hours = total_mins / 60;
        if self.0 < 0 {
            write!(f, "-{:02}:{:02}:{:02}.{:03}", hours, mins, secs, ms)
        } else {
            write!(f, "{:02}:{:02}:{:02}.{:03}", hours, mins, secs, ms)
        }
    }
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

pub type ClipId = Uuid;

/// Opaque handle to a source owned by the media subsystem. Passed through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SourceRef(pub String);

impl SourceRef {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// TrimHandle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TrimHandle {
    Start,
    End,
}

// ---------------------------------------------------------------------------
// ImportedMedia
// ---------------------------------------------------------------------------

/// Probe metadata handed over by the import collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportedMedia {
    pub source_ref: SourceRef,
    pub name: String,
    pub duration: TimeUs,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub fps: f64,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub format: String,
}

// ---------------------------------------------------------------------------
// ClipSpec
// ---------------------------------------------------------------------------

/// Everything needed to place a new clip. Duration is derived from the trims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClipSpec {
    pub source_ref: SourceRef,
    pub name: String,
    pub start_time: TimeUs,
    pub trim_in: TimeUs,
    pub trim_out: TimeUs,
    pub original_duration: TimeUs,
}

impl ClipSpec {
    /// Full-length clip for a freshly imported source.
    pub fn from_import(media: &ImportedMedia, start_time: TimeUs) -> Self {
        Self {
            source_ref: media.source_ref.clone(),
            name: media.name.clone(),
            start_time,
            trim_in: TimeUs::ZERO,
            trim_out: media.duration,
            original_duration: media.duration,
        }
    }
}

// ---------------------------------------------------------------------------
// TimelineClip
// ---------------------------------------------------------------------------

/// A placed span of a source on the track.
///
/// Only `start_time` and the trims are stored; `duration` and `end_time` are
/// derived so they can never drift from the trim values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineClip {
    pub(crate) id: ClipId,
    pub(crate) source_ref: SourceRef,
    pub(crate) name: String,
    pub(crate) start_time: TimeUs,
    pub(crate) trim_in: TimeUs,
    pub(crate) trim_out: TimeUs,
    pub(crate) original_duration: TimeUs,
}

impl TimelineClip {
    pub fn id(&self) -> ClipId {
        self.id
    }

    pub fn source_ref(&self) -> &SourceRef {
        &self.source_ref
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_time(&self) -> TimeUs {
        self.start_time
    }

    pub fn end_time(&self) -> TimeUs {
        self.start_time + self.duration()
    }

    pub fn trim_in(&self) -> TimeUs {
        self.trim_in
    }

    pub fn trim_out(&self) -> TimeUs {
        self.trim_out
    }

    pub fn duration(&self) -> TimeUs {
        self.trim_out - self.trim_in
    }

    pub fn original_duration(&self) -> TimeUs {
        self.original_duration
    }

    pub fn trim(&self, handle: TrimHandle) -> TimeUs {
        match handle {
            TrimHandle::Start => self.trim_in,
            TrimHandle::End => self.trim_out,
        }
    }

    /// Half-open containment: the end instant belongs to the next clip.
    pub fn contains(&self, t: TimeUs) -> bool {
        self.start_time <= t && t < self.end_time()
    }

    /// Source-relative time for a timeline instant, capped at `trim_out`.
    pub fn source_time_at(&self, t: TimeUs) -> TimeUs {
        (self.trim_in + (t - self.start_time)).min(self.trim_out)
    }
}

// ---------------------------------------------------------------------------
// ExportEntry
// ---------------------------------------------------------------------------

/// One row of the ordered clip list handed to the export collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportEntry {
    pub source_ref: SourceRef,
    pub trim_in: TimeUs,
    pub trim_out: TimeUs,
    pub start_time: TimeUs,
}

// ---------------------------------------------------------------------------
// EditOutcome
// ---------------------------------------------------------------------------

/// What a move or trim did. Mutations never fail; this only reports the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// Committed exactly as requested.
    Applied,
    /// Committed after clamping an out-of-range input to the nearest legal value.
    Clamped,
    /// The candidate interval overlapped another clip; nothing changed.
    CollisionRejected,
    /// The request resolved to the current state; nothing changed.
    Unchanged,
    /// No clip with that id.
    NotFound,
}

impl EditOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, EditOutcome::Applied | EditOutcome::Clamped)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
