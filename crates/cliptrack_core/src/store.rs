use crate::collision::{first_conflict, intervals_overlap, overlaps};
use crate::config::EditorConfig;
use crate::selection::Selection;
use crate::types::*;
use tracing::debug;
use uuid::Uuid;

/// The single track: clips kept in `start_time` order, plus the UI selection.
///
/// Every mutator is total. Out-of-range inputs are clamped, colliding moves
/// and trims are dropped whole, and unknown ids are ignored.
#[derive(Debug, Clone)]
pub struct ClipStore {
    clips: Vec<TimelineClip>,
    selection: Selection,
    min_clip_duration: TimeUs,
    duplicate_gap: TimeUs,
}

impl Default for ClipStore {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}

impl ClipStore {
    pub fn new(config: &EditorConfig) -> Self {
        Self::with_limits(config.min_clip_duration_us(), config.duplicate_gap_us())
    }

    pub fn with_limits(min_clip_duration: TimeUs, duplicate_gap: TimeUs) -> Self {
        Self {
            clips: Vec::new(),
            selection: Selection::new(),
            min_clip_duration: min_clip_duration.max(TimeUs(1)),
            duplicate_gap: duplicate_gap.max(TimeUs::ZERO),
        }
    }

    pub fn clips(&self) -> &[TimelineClip] {
        &self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn get(&self, id: ClipId) -> Option<&TimelineClip> {
        self.clips.iter().find(|c| c.id == id)
    }

    pub fn min_clip_duration(&self) -> TimeUs {
        self.min_clip_duration
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    /// Forget selected ids that no longer name a clip on the track.
    pub fn prune_selection(&mut self) {
        let clips = &self.clips;
        self.selection
            .retain_existing(|id| clips.iter().any(|c| c.id == id));
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Place a new clip. Placement is the caller's call: no collision check here.
    /// Trims are clamped into the source; a source shorter than the minimum
    /// clip duration is refused.
    pub fn add_clip(&mut self, spec: ClipSpec) -> Option<ClipId> {
        let min = self.min_clip_duration;
        let original = spec.original_duration;
        if original < min {
            debug!(
                name = %spec.name,
                duration = %original,
                "refusing clip shorter than the minimum duration"
            );
            return None;
        }

        let trim_in = spec.trim_in.clamp(TimeUs::ZERO, original - min);
        let trim_out = spec.trim_out.clamp(trim_in + min, original);
        let clip = TimelineClip {
            id: Uuid::new_v4(),
            source_ref: spec.source_ref,
            name: spec.name,
            start_time: spec
                .start_time
                .clamp(TimeUs::ZERO, TimeUs::MAX - (trim_out - trim_in)),
            trim_in,
            trim_out,
            original_duration: original,
        };
        let id = clip.id;
        debug!(%id, start = %clip.start_time, duration = %clip.duration(), "clip added");
        self.clips.push(clip);
        self.sort();
        Some(id)
    }

    /// Import a probed source as a full-length clip appended at the track end.
    pub fn append_imported(&mut self, media: &ImportedMedia) -> Option<ClipId> {
        let start = self.track_end();
        self.add_clip(ClipSpec::from_import(media, start))
    }

    /// Move a clip so it starts at `new_start`. Negative starts clamp to zero
    /// and the end never runs past `TimeUs::MAX`; a destination that overlaps
    /// another clip leaves everything untouched.
    pub fn move_clip(&mut self, id: ClipId, new_start: TimeUs) -> EditOutcome {
        let Some(idx) = self.index_of(id) else {
            return EditOutcome::NotFound;
        };

        let clip = &self.clips[idx];
        let start = new_start.clamp(TimeUs::ZERO, TimeUs::MAX - clip.duration());
        if start == clip.start_time {
            return EditOutcome::Unchanged;
        }

        let end = start + clip.duration();
        if let Some(blocker) = first_conflict(&self.clips, Some(id), start, end) {
            debug!(%id, %start, blocker = %blocker.id, "move rejected: overlap");
            return EditOutcome::CollisionRejected;
        }

        self.clips[idx].start_time = start;
        self.sort();
        debug!(%id, %start, "clip moved");
        if start != new_start {
            EditOutcome::Clamped
        } else {
            EditOutcome::Applied
        }
    }

    /// Nudge one trim handle by `delta`.
    ///
    /// The start handle moves `start_time` along with `trim_in` so the end stays
    /// put; the end handle moves `end_time` and leaves the start alone. The
    /// trim is clamped to the source bounds and the minimum duration, and the
    /// start handle additionally cannot drag the clip before zero.
    pub fn set_clip_trim(&mut self, id: ClipId, handle: TrimHandle, delta: TimeUs) -> EditOutcome {
        let Some(idx) = self.index_of(id) else {
            return EditOutcome::NotFound;
        };

        let min = self.min_clip_duration;
        let clip = &self.clips[idx];
        let (new_trim, requested, candidate_start, candidate_end) = match handle {
            TrimHandle::Start => {
                let requested = clip.trim_in + delta;
                let lower = TimeUs::ZERO.max(clip.trim_in - clip.start_time);
                let new_in = requested.clamp(lower, clip.trim_out - min);
                let start = clip.start_time + (new_in - clip.trim_in);
                (new_in, requested, start, clip.end_time())
            }
            TrimHandle::End => {
                let requested = clip.trim_out + delta;
                let upper = clip
                    .original_duration
                    .min(clip.trim_out + (TimeUs::MAX - clip.end_time()));
                let new_out = requested.clamp(clip.trim_in + min, upper);
                let end = clip.end_time() + (new_out - clip.trim_out);
                (new_out, requested, clip.start_time, end)
            }
        };

        if new_trim == clip.trim(handle) {
            return EditOutcome::Unchanged;
        }

        if let Some(blocker) = first_conflict(&self.clips, Some(id), candidate_start, candidate_end)
        {
            debug!(%id, ?handle, blocker = %blocker.id, "trim rejected: overlap");
            return EditOutcome::CollisionRejected;
        }

        let clip = &mut self.clips[idx];
        match handle {
            TrimHandle::Start => {
                clip.trim_in = new_trim;
                clip.start_time = candidate_start;
            }
            TrimHandle::End => clip.trim_out = new_trim,
        }
        debug!(
            %id,
            ?handle,
            trim_in = %clip.trim_in,
            trim_out = %clip.trim_out,
            "clip trimmed"
        );
        self.sort();

        if new_trim != requested {
            EditOutcome::Clamped
        } else {
            EditOutcome::Applied
        }
    }

    /// Cut a clip in two at a timeline instant. Both halves get fresh ids and
    /// the original id is retired. The cut must leave at least the minimum
    /// duration on each side. Returns the (left, right) ids.
    pub fn split_clip(&mut self, id: ClipId, split_time: TimeUs) -> Option<(ClipId, ClipId)> {
        let idx = self.index_of(id)?;
        let clip = &self.clips[idx];
        let min = self.min_clip_duration;

        if split_time < clip.start_time + min || split_time > clip.end_time() - min {
            debug!(%id, at = %split_time, "split ignored: too close to an edge");
            return None;
        }

        let offset = split_time - clip.start_time;
        let source_split = clip.trim_in + offset;

        let left = TimelineClip {
            id: Uuid::new_v4(),
            trim_out: source_split,
            ..clip.clone()
        };
        let right = TimelineClip {
            id: Uuid::new_v4(),
            start_time: split_time,
            trim_in: source_split,
            ..clip.clone()
        };
        let ids = (left.id, right.id);

        self.clips[idx] = left;
        self.clips.insert(idx + 1, right);

        if self.selection.remove(id) {
            self.selection.extend([ids.0]);
        }
        debug!(%id, at = %split_time, left = %ids.0, right = %ids.1, "clip split");
        Some(ids)
    }

    /// Remove a clip and forget it in the selection. Returns the removed clip.
    pub fn delete_clip(&mut self, id: ClipId) -> Option<TimelineClip> {
        let idx = self.index_of(id)?;
        let removed = self.clips.remove(idx);
        self.selection.remove(id);
        debug!(%id, "clip deleted");
        Some(removed)
    }

    /// Copy a clip, trims included, just after the original. If that slot is
    /// taken the copy goes after the last clip instead.
    pub fn duplicate_clip(&mut self, id: ClipId) -> Option<ClipId> {
        let original = self.get(id)?.clone();
        let duration = original.duration();

        let mut start = original.end_time() + self.duplicate_gap;
        if overlaps(&self.clips, None, start, start + duration) {
            start = self.track_end() + self.duplicate_gap;
        }

        let copy = TimelineClip {
            id: Uuid::new_v4(),
            start_time: start,
            ..original
        };
        let copy_id = copy.id;
        self.clips.push(copy);
        self.sort();
        debug!(%id, copy = %copy_id, %start, "clip duplicated");
        Some(copy_id)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The clip whose `[start, end)` contains `t`.
    pub fn clip_at_time(&self, t: TimeUs) -> Option<&TimelineClip> {
        self.clips.iter().find(|c| c.contains(t))
    }

    /// Clips intersecting `[from, to)`, in start order.
    pub fn clips_in_range(&self, from: TimeUs, to: TimeUs) -> Vec<&TimelineClip> {
        self.clips
            .iter()
            .filter(|c| intervals_overlap(c.start_time, c.end_time(), from, to))
            .collect()
    }

    /// Pre-flight check for drag previews: would `[start, end)` fit?
    pub fn can_place_clip(&self, start: TimeUs, end: TimeUs, exclude_id: Option<ClipId>) -> bool {
        start >= TimeUs::ZERO && start < end && !overlaps(&self.clips, exclude_id, start, end)
    }

    /// End of the last clip, or zero on an empty track.
    pub fn track_end(&self) -> TimeUs {
        self.clips
            .iter()
            .map(|c| c.end_time())
            .max()
            .unwrap_or(TimeUs::ZERO)
    }

    pub fn timeline_duration(&self, floor: TimeUs) -> TimeUs {
        self.track_end().max(floor)
    }

    /// Ordered clip list for the export collaborator.
    pub fn export_entries(&self) -> Vec<ExportEntry> {
        self.clips
            .iter()
            .map(|c| ExportEntry {
                source_ref: c.source_ref.clone(),
                trim_in: c.trim_in,
                trim_out: c.trim_out,
                start_time: c.start_time,
            })
            .collect()
    }

    fn index_of(&self, id: ClipId) -> Option<usize> {
        self.clips.iter().position(|c| c.id == id)
    }

    fn sort(&mut self) {
        self.clips.sort_by_key(|c| c.start_time);
    }
}
