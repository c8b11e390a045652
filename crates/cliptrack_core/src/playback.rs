//! Playhead and transport state, independent of any timer.
//!
//! The controller only does arithmetic. Whoever owns the frame clock calls
//! [`PlaybackController::tick`] with the elapsed wall time between frames.

use crate::store::ClipStore;
use crate::types::*;
use std::time::Duration;
use tracing::debug;

/// Result of advancing the playhead by one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not playing; nothing moved.
    Idle,
    Advanced,
    /// Hit the end of the timeline and stopped.
    ReachedEnd,
}

/// What the media renderer should show for the current playhead.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaTarget {
    Clip {
        clip_id: ClipId,
        source_ref: SourceRef,
        source_time: TimeUs,
    },
    /// The playhead sits between clips or past the last one.
    Gap,
}

impl MediaTarget {
    /// Resolve the clip under `playhead` and the source time to request from it.
    pub fn resolve(store: &ClipStore, playhead: TimeUs) -> Self {
        match store.clip_at_time(playhead) {
            Some(clip) => MediaTarget::Clip {
                clip_id: clip.id(),
                source_ref: clip.source_ref().clone(),
                source_time: clip.source_time_at(playhead),
            },
            None => MediaTarget::Gap,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlaybackController {
    is_playing: bool,
    playhead: TimeUs,
    timeline_duration: TimeUs,
}

impl PlaybackController {
    pub fn new(timeline_duration: TimeUs) -> Self {
        Self {
            is_playing: false,
            playhead: TimeUs::ZERO,
            timeline_duration: timeline_duration.max(TimeUs::ZERO),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn playhead(&self) -> TimeUs {
        self.playhead
    }

    pub fn timeline_duration(&self) -> TimeUs {
        self.timeline_duration
    }

    /// Track a new timeline length, pulling the playhead back inside if it shrank.
    pub fn set_timeline_duration(&mut self, duration: TimeUs) {
        self.timeline_duration = duration.max(TimeUs::ZERO);
        if self.playhead > self.timeline_duration {
            self.playhead = self.timeline_duration;
        }
    }

    /// Jump the playhead. Does not touch the play state.
    pub fn scrub(&mut self, time: TimeUs) {
        self.playhead = time.clamp(TimeUs::ZERO, self.timeline_duration);
    }

    /// Start playing. From the very end, playback restarts at zero.
    pub fn play(&mut self) {
        if self.is_playing {
            return;
        }
        if self.playhead >= self.timeline_duration {
            self.playhead = TimeUs::ZERO;
        }
        self.is_playing = true;
        debug!(playhead = %self.playhead, "playback started");
    }

    pub fn pause(&mut self) {
        if !self.is_playing {
            return;
        }
        self.is_playing = false;
        debug!(playhead = %self.playhead, "playback paused");
    }

    pub fn toggle_play(&mut self) {
        if self.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn skip_to_start(&mut self) {
        self.playhead = TimeUs::ZERO;
    }

    pub fn skip_to_end(&mut self) {
        self.playhead = self.timeline_duration;
    }

    /// Move the playhead by a signed amount, clamped to the timeline.
    pub fn step(&mut self, delta: TimeUs) {
        self.scrub(self.playhead + delta);
    }

    /// Advance by the wall time since the previous frame. Auto-stops at the end.
    pub fn tick(&mut self, elapsed: Duration) -> TickOutcome {
        if !self.is_playing {
            return TickOutcome::Idle;
        }
        self.playhead = self.playhead + TimeUs::from_duration(elapsed);
        if self.playhead >= self.timeline_duration {
            self.playhead = self.timeline_duration;
            self.is_playing = false;
            debug!(playhead = %self.playhead, "playback reached end");
            return TickOutcome::ReachedEnd;
        }
        TickOutcome::Advanced
    }
}
