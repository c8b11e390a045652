//! Pointer-drag bookkeeping for moving and trimming clips.
//!
//! A [`DragGesture`] lives in the widget handling the pointer, not in the
//! store. It remembers where the gesture started and turns pointer positions
//! into [`DragEdit`]s, throttled to the frame rate. The pointer-up edit from
//! [`DragGesture::finish`] is never throttled.

use crate::session::EditorSession;
use crate::types::*;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Move,
    Trim(TrimHandle),
}

/// An edit computed from the pointer, ready for [`EditorSession::apply_drag_edit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragEdit {
    Move { clip_id: ClipId, start: TimeUs },
    /// Absolute trim value for the handle; the session turns it into a delta.
    Trim {
        clip_id: ClipId,
        handle: TrimHandle,
        target: TimeUs,
    },
}

#[derive(Debug, Clone)]
pub struct DragGesture {
    clip_id: ClipId,
    kind: DragKind,
    anchor_x: f64,
    origin_start: TimeUs,
    origin_duration: TimeUs,
    origin_trim: TimeUs,
    min_interval: Duration,
    last_commit: Option<Instant>,
}

impl DragGesture {
    /// Start a gesture on a clip at pointer `x`. `None` if the clip is gone.
    pub fn begin(session: &EditorSession, clip_id: ClipId, kind: DragKind, x: f64) -> Option<Self> {
        let clip = session.store().get(clip_id)?;
        let origin_trim = match kind {
            DragKind::Move => TimeUs::ZERO,
            DragKind::Trim(handle) => clip.trim(handle),
        };
        Some(Self {
            clip_id,
            kind,
            anchor_x: x,
            origin_start: clip.start_time(),
            origin_duration: clip.duration(),
            origin_trim,
            min_interval: session.config().frame_interval(),
            last_commit: None,
        })
    }

    pub fn clip_id(&self) -> ClipId {
        self.clip_id
    }

    pub fn kind(&self) -> DragKind {
        self.kind
    }

    /// Pointer moved. Yields an edit at most once per frame interval.
    pub fn update(&mut self, session: &EditorSession, x: f64, now: Instant) -> Option<DragEdit> {
        if let Some(last) = self.last_commit {
            if now.saturating_duration_since(last) < self.min_interval {
                return None;
            }
        }
        self.last_commit = Some(now);
        Some(self.edit_for(session, x))
    }

    /// Pointer released. Always yields the final edit.
    pub fn finish(self, session: &EditorSession, x: f64) -> DragEdit {
        self.edit_for(session, x)
    }

    fn edit_for(&self, session: &EditorSession, x: f64) -> DragEdit {
        let delta = session.scale().pixels_to_duration(x - self.anchor_x);
        match self.kind {
            DragKind::Move => DragEdit::Move {
                clip_id: self.clip_id,
                start: self.snapped_start(session, self.origin_start + delta),
            },
            DragKind::Trim(handle) => DragEdit::Trim {
                clip_id: self.clip_id,
                handle,
                target: self.origin_trim + delta,
            },
        }
    }

    /// Snap the leading edge first; failing that, let the trailing edge snap.
    fn snapped_start(&self, session: &EditorSession, start: TimeUs) -> TimeUs {
        let clips = session.store().clips();
        let playhead = session.playback().playhead();
        let scale = session.scale();

        let snapped = scale.snap(start, clips, playhead, Some(self.clip_id));
        if snapped != start {
            return snapped;
        }
        let end = start + self.origin_duration;
        let snapped_end = scale.snap(end, clips, playhead, Some(self.clip_id));
        snapped_end - self.origin_duration
    }
}
