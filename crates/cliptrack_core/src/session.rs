use crate::config::EditorConfig;
use crate::drag::DragEdit;
use crate::playback::{MediaTarget, PlaybackController, TickOutcome};
use crate::scale::TimeScale;
use crate::store::ClipStore;
use crate::types::*;
use std::time::Duration;
use tracing::{info, warn};

/// One open timeline: clips, playhead and view scale, created by the host
/// and handed to whatever needs it.
///
/// Edits go through the session so the playhead range and zoom bounds are
/// refreshed after every change.
#[derive(Debug, Clone)]
pub struct EditorSession {
    config: EditorConfig,
    store: ClipStore,
    playback: PlaybackController,
    scale: TimeScale,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EditorSession {
    pub fn new(config: EditorConfig) -> Self {
        let store = ClipStore::new(&config);
        let playback = PlaybackController::new(config.min_timeline_duration_us());
        let scale = TimeScale::new(&config);
        info!(
            min_clip = config.min_clip_duration,
            snap = config.snap_threshold,
            "editor session created"
        );
        Self {
            config,
            store,
            playback,
            scale,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &ClipStore {
        &self.store
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn scale(&self) -> &TimeScale {
        &self.scale
    }

    pub fn scale_mut(&mut self) -> &mut TimeScale {
        &mut self.scale
    }

    pub fn timeline_duration(&self) -> TimeUs {
        self.store
            .timeline_duration(self.config.min_timeline_duration_us())
    }

    // -----------------------------------------------------------------------
    // Clip edits
    // -----------------------------------------------------------------------

    pub fn add_clip(&mut self, spec: ClipSpec) -> Option<ClipId> {
        let id = self.store.add_clip(spec);
        self.refresh();
        id
    }

    pub fn import(&mut self, media: &ImportedMedia) -> Option<ClipId> {
        let id = self.store.append_imported(media);
        if id.is_none() {
            warn!(source = %media.source_ref, "import skipped: source too short");
        }
        self.refresh();
        id
    }

    pub fn move_clip(&mut self, id: ClipId, new_start: TimeUs) -> EditOutcome {
        let outcome = self.store.move_clip(id, new_start);
        self.refresh_if(outcome);
        outcome
    }

    pub fn trim_clip(&mut self, id: ClipId, handle: TrimHandle, delta: TimeUs) -> EditOutcome {
        let outcome = self.store.set_clip_trim(id, handle, delta);
        self.refresh_if(outcome);
        outcome
    }

    pub fn split_clip(&mut self, id: ClipId, at: TimeUs) -> Option<(ClipId, ClipId)> {
        let ids = self.store.split_clip(id, at);
        self.refresh();
        ids
    }

    /// Split whatever clip sits under the playhead.
    pub fn split_at_playhead(&mut self) -> Option<(ClipId, ClipId)> {
        let playhead = self.playback.playhead();
        let id = self.store.clip_at_time(playhead)?.id();
        self.split_clip(id, playhead)
    }

    pub fn delete_clip(&mut self, id: ClipId) -> Option<TimelineClip> {
        let removed = self.store.delete_clip(id);
        self.refresh();
        removed
    }

    /// Delete every selected clip. Returns how many were removed.
    pub fn delete_selected(&mut self) -> usize {
        let ids: Vec<ClipId> = self.store.selection().ids().collect();
        let removed = ids
            .into_iter()
            .filter(|id| self.store.delete_clip(*id).is_some())
            .count();
        self.refresh();
        removed
    }

    pub fn duplicate_clip(&mut self, id: ClipId) -> Option<ClipId> {
        let copy = self.store.duplicate_clip(id);
        self.refresh();
        copy
    }

    pub fn select_only(&mut self, id: ClipId) {
        if self.store.get(id).is_some() {
            self.store.selection_mut().select_only(id);
        }
    }

    pub fn toggle_selected(&mut self, id: ClipId) {
        if self.store.get(id).is_some() {
            self.store.selection_mut().toggle(id);
        }
    }

    pub fn clear_selection(&mut self) {
        self.store.selection_mut().clear();
    }

    /// Commit an edit produced by a drag gesture.
    pub fn apply_drag_edit(&mut self, edit: DragEdit) -> EditOutcome {
        let outcome = match edit {
            DragEdit::Move { clip_id, start } => self.move_clip(clip_id, start),
            DragEdit::Trim {
                clip_id,
                handle,
                target,
            } => match self.store.get(clip_id) {
                Some(clip) => {
                    let delta = target - clip.trim(handle);
                    self.trim_clip(clip_id, handle, delta)
                }
                None => EditOutcome::NotFound,
            },
        };
        if outcome == EditOutcome::CollisionRejected {
            warn!(?edit, "drag edit rejected: overlap");
        }
        outcome
    }

    // -----------------------------------------------------------------------
    // Playback
    // -----------------------------------------------------------------------

    pub fn play(&mut self) {
        self.playback.play();
    }

    pub fn pause(&mut self) {
        self.playback.pause();
    }

    pub fn toggle_play(&mut self) {
        self.playback.toggle_play();
    }

    pub fn scrub(&mut self, time: TimeUs) {
        self.playback.scrub(time);
    }

    /// Scrub to a pointer position on the track.
    pub fn scrub_to_pixel(&mut self, x: f64) {
        let t = self.scale.pixel_to_time(x);
        self.playback.scrub(t);
    }

    pub fn skip_to_start(&mut self) {
        self.playback.skip_to_start();
    }

    pub fn skip_to_end(&mut self) {
        self.playback.skip_to_end();
    }

    pub fn step(&mut self, delta: TimeUs) {
        self.playback.step(delta);
    }

    pub fn tick(&mut self, elapsed: Duration) -> TickOutcome {
        self.playback.tick(elapsed)
    }

    /// What the media renderer should show at the current playhead.
    pub fn media_target(&self) -> MediaTarget {
        MediaTarget::resolve(&self.store, self.playback.playhead())
    }

    pub fn export_entries(&self) -> Vec<ExportEntry> {
        self.store.export_entries()
    }

    fn refresh_if(&mut self, outcome: EditOutcome) {
        if outcome.is_committed() {
            self.refresh();
        }
    }

    fn refresh(&mut self) {
        self.store.prune_selection();
        let duration = self.timeline_duration();
        self.playback.set_timeline_duration(duration);
        self.scale.recompute_bounds(self.store.clips(), duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drag::{DragGesture, DragKind};
    use uuid::Uuid;

    fn secs(s: f64) -> TimeUs {
        TimeUs::from_seconds(s)
    }

    fn media(name: &str, duration: f64) -> ImportedMedia {
        ImportedMedia {
            source_ref: SourceRef::new(format!("/media/{}", name)),
            name: name.to_string(),
            duration: secs(duration),
            width: 1920,
            height: 1080,
            fps: 30.0,
            file_size: 0,
            format: "mp4".to_string(),
        }
    }

    #[test]
    fn imports_append_back_to_back() {
        let mut session = EditorSession::default();
        let a = session.import(&media("a.mp4", 6.0)).unwrap();
        let b = session.import(&media("b.mp4", 8.0)).unwrap();

        assert_eq!(session.store().get(a).unwrap().end_time(), secs(6.0));
        assert_eq!(session.store().get(b).unwrap().start_time(), secs(6.0));
        assert_eq!(session.timeline_duration(), secs(14.0));
        assert_eq!(session.playback().timeline_duration(), secs(14.0));
    }

    #[test]
    fn import_of_empty_source_is_skipped() {
        let mut session = EditorSession::default();
        assert!(session.import(&media("empty.mp4", 0.0)).is_none());
        assert!(session.store().is_empty());
    }

    #[test]
    fn deleting_tail_clip_pulls_playhead_back() {
        let mut session = EditorSession::default();
        session.import(&media("a.mp4", 6.0)).unwrap();
        let b = session.import(&media("b.mp4", 8.0)).unwrap();
        session.skip_to_end();
        assert_eq!(session.playback().playhead(), secs(14.0));

        session.delete_clip(b);
        // Falls back to the 10s floor.
        assert_eq!(session.playback().playhead(), secs(10.0));
    }

    #[test]
    fn long_import_lowers_min_zoom() {
        let mut session = EditorSession::default();
        let before = session.scale().min_zoom();
        session.import(&media("long.mp4", 600.0)).unwrap();
        assert!(session.scale().min_zoom() < before);
    }

    #[test]
    fn scrub_resolves_source_time() {
        let mut session = EditorSession::default();
        session
            .add_clip(ClipSpec {
                source_ref: SourceRef::new("/media/c.mp4"),
                name: "c.mp4".to_string(),
                start_time: secs(5.0),
                trim_in: secs(1.0),
                trim_out: secs(8.0),
                original_duration: secs(10.0),
            })
            .unwrap();
        session.scrub(secs(7.3));
        match session.media_target() {
            MediaTarget::Clip { source_time, .. } => assert_eq!(source_time, secs(3.3)),
            MediaTarget::Gap => panic!("expected clip"),
        }
    }

    #[test]
    fn scrub_to_pixel_uses_scale() {
        let mut session = EditorSession::default();
        session.scale_mut().set_scale(40.0);
        session.scrub_to_pixel(148.0);
        assert_eq!(session.playback().playhead(), secs(2.5));
    }

    #[test]
    fn split_at_playhead_splits_clip_under_it() {
        let mut session = EditorSession::default();
        session.import(&media("a.mp4", 10.0)).unwrap();
        session.scrub(secs(4.0));
        let (left, right) = session.split_at_playhead().unwrap();
        assert_eq!(session.store().get(left).unwrap().end_time(), secs(4.0));
        assert_eq!(session.store().get(right).unwrap().start_time(), secs(4.0));

        session.scrub(secs(12.0));
        assert!(session.split_at_playhead().is_none());
    }

    #[test]
    fn delete_selected_clears_selection() {
        let mut session = EditorSession::default();
        let a = session.import(&media("a.mp4", 2.0)).unwrap();
        let b = session.import(&media("b.mp4", 2.0)).unwrap();
        let c = session.import(&media("c.mp4", 2.0)).unwrap();
        session.select_only(a);
        session.toggle_selected(c);
        session.toggle_selected(Uuid::new_v4());

        assert_eq!(session.delete_selected(), 2);
        assert!(session.store().selection().is_empty());
        assert_eq!(session.store().len(), 1);
        assert!(session.store().get(b).is_some());
    }

    #[test]
    fn drag_trim_applies_delta_from_target() {
        let mut session = EditorSession::default();
        session.scale_mut().set_scale(40.0);
        let a = session.import(&media("a.mp4", 10.0)).unwrap();

        let drag = DragGesture::begin(&session, a, DragKind::Trim(TrimHandle::End), 448.0).unwrap();
        // Drag the end handle 2s to the left.
        let edit = drag.finish(&session, 368.0);
        assert_eq!(session.apply_drag_edit(edit), EditOutcome::Applied);
        let clip = session.store().get(a).unwrap();
        assert_eq!(clip.trim_out(), secs(8.0));
        assert_eq!(clip.start_time(), TimeUs::ZERO);
    }

    #[test]
    fn drag_move_into_neighbour_is_rejected() {
        let mut session = EditorSession::default();
        session.scale_mut().set_scale(40.0);
        let a = session.import(&media("a.mp4", 5.0)).unwrap();
        session.import(&media("b.mp4", 5.0)).unwrap();

        let drag = DragGesture::begin(&session, a, DragKind::Move, 100.0).unwrap();
        let edit = drag.finish(&session, 180.0);
        assert_eq!(
            session.apply_drag_edit(edit),
            EditOutcome::CollisionRejected
        );
        assert_eq!(session.store().get(a).unwrap().start_time(), TimeUs::ZERO);
    }

    #[test]
    fn tick_drives_playhead() {
        let mut session = EditorSession::default();
        session.play();
        assert_eq!(session.tick(Duration::from_secs(2)), TickOutcome::Advanced);
        assert_eq!(session.playback().playhead(), secs(2.0));
        session.toggle_play();
        assert_eq!(session.tick(Duration::from_secs(2)), TickOutcome::Idle);
    }

    #[test]
    fn export_matches_store_order() {
        let mut session = EditorSession::default();
        session.import(&media("a.mp4", 3.0)).unwrap();
        session.import(&media("b.mp4", 4.0)).unwrap();
        let entries = session.export_entries();
        assert_eq!(entries[0].source_ref, SourceRef::new("/media/a.mp4"));
        assert_eq!(entries[1].start_time, secs(3.0));
    }
}
