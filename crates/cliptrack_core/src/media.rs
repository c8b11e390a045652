//! Boundary to the external media renderer and the seek policy that keeps it
//! in step with the playhead.

use crate::config::EditorConfig;
use crate::playback::MediaTarget;
use crate::types::*;
use tracing::{debug, warn};

/// An instruction for the media renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaCommand {
    /// Open a source and position it.
    Load { source_ref: SourceRef, at: TimeUs },
    Seek { at: TimeUs },
    Play,
    Pause,
    /// Nothing to show: the playhead is over a gap.
    Hide,
}

/// The renderer that decodes and displays frames. This crate never decodes.
pub trait MediaSink {
    type Error: std::error::Error;

    fn load(&mut self, source_ref: &SourceRef, at: TimeUs) -> Result<(), Self::Error>;
    fn seek(&mut self, at: TimeUs) -> Result<(), Self::Error>;
    fn play(&mut self) -> Result<(), Self::Error>;
    fn pause(&mut self) -> Result<(), Self::Error>;
    /// Stop showing anything. The loaded source is dropped; the next clip
    /// arrives with a fresh `load`.
    fn hide(&mut self) -> Result<(), Self::Error>;
    /// Current source-relative position, if the renderer can report one.
    fn position(&mut self) -> Result<Option<TimeUs>, Self::Error>;

    fn apply(&mut self, command: &MediaCommand) -> Result<(), Self::Error> {
        match command {
            MediaCommand::Load { source_ref, at } => self.load(source_ref, *at),
            MediaCommand::Seek { at } => self.seek(*at),
            MediaCommand::Play => self.play(),
            MediaCommand::Pause => self.pause(),
            MediaCommand::Hide => self.hide(),
        }
    }
}

/// Decides when the renderer needs a seek.
///
/// Small drift is tolerated (a tight threshold while playing, a looser one
/// when idle) so the renderer isn't re-seeked every frame. A seek is forced
/// whenever the active clip changes or playback resumes. Hiding over a gap
/// unloads the source, so leaving the gap reloads it.
#[derive(Debug, Clone)]
pub struct MediaSync {
    active_clip: Option<ClipId>,
    loaded_source: Option<SourceRef>,
    sink_playing: bool,
    hidden: bool,
    playing_threshold: TimeUs,
    idle_threshold: TimeUs,
}

impl Default for MediaSync {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}

impl MediaSync {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            active_clip: None,
            loaded_source: None,
            sink_playing: false,
            hidden: false,
            playing_threshold: config.playing_seek_threshold_us(),
            idle_threshold: config.idle_seek_threshold_us(),
        }
    }

    /// Commands that bring the renderer in line with `target`.
    /// `reported` is the renderer's own position, when it has one.
    pub fn plan(
        &mut self,
        target: &MediaTarget,
        reported: Option<TimeUs>,
        is_playing: bool,
    ) -> Vec<MediaCommand> {
        let mut commands = Vec::new();

        let (clip_id, source_ref, at) = match target {
            MediaTarget::Gap => {
                if !self.hidden {
                    if self.sink_playing {
                        commands.push(MediaCommand::Pause);
                        self.sink_playing = false;
                    }
                    commands.push(MediaCommand::Hide);
                    self.hidden = true;
                    self.loaded_source = None;
                }
                self.active_clip = None;
                return commands;
            }
            MediaTarget::Clip {
                clip_id,
                source_ref,
                source_time,
            } => (*clip_id, source_ref, *source_time),
        };

        let clip_changed = self.active_clip != Some(clip_id);
        let resumed = is_playing && !self.sink_playing;

        if self.loaded_source.as_ref() != Some(source_ref) {
            commands.push(MediaCommand::Load {
                source_ref: source_ref.clone(),
                at,
            });
            self.loaded_source = Some(source_ref.clone());
        } else if clip_changed || resumed {
            commands.push(MediaCommand::Seek { at });
        } else {
            let threshold = if is_playing {
                self.playing_threshold
            } else {
                self.idle_threshold
            };
            let drifted = reported.map_or(true, |pos| (pos - at).abs() > threshold);
            if drifted {
                commands.push(MediaCommand::Seek { at });
            }
        }

        if is_playing != self.sink_playing {
            commands.push(if is_playing {
                MediaCommand::Play
            } else {
                MediaCommand::Pause
            });
            self.sink_playing = is_playing;
        }

        self.active_clip = Some(clip_id);
        self.hidden = false;
        commands
    }

    /// Plan against a live sink and send the commands. Sink errors are logged
    /// and skipped; the next frame re-plans from scratch.
    pub fn sync<S: MediaSink>(&mut self, sink: &mut S, target: &MediaTarget, is_playing: bool) {
        let reported = match sink.position() {
            Ok(pos) => pos,
            Err(e) => {
                warn!(error = %e, "media position unavailable");
                None
            }
        };

        for command in self.plan(target, reported, is_playing) {
            debug!(?command, "media command");
            if let Err(e) = sink.apply(&command) {
                warn!(error = %e, ?command, "media command failed");
                // Force a fresh load next time round.
                self.loaded_source = None;
            }
        }
    }

    /// Forget what the renderer is showing, e.g. after it was restarted.
    pub fn reset(&mut self) {
        self.active_clip = None;
        self.loaded_source = None;
        self.sink_playing = false;
        self.hidden = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;
    use uuid::Uuid;

    fn secs(s: f64) -> TimeUs {
        TimeUs::from_seconds(s)
    }

    fn clip_target(clip_id: ClipId, source: &str, at: f64) -> MediaTarget {
        MediaTarget::Clip {
            clip_id,
            source_ref: SourceRef::new(source),
            source_time: secs(at),
        }
    }

    #[test]
    fn first_frame_loads_source() {
        let mut sync = MediaSync::default();
        let id = Uuid::new_v4();
        let cmds = sync.plan(&clip_target(id, "/a.mp4", 1.0), None, false);
        assert_eq!(
            cmds,
            vec![MediaCommand::Load {
                source_ref: SourceRef::new("/a.mp4"),
                at: secs(1.0)
            }]
        );
    }

    #[test]
    fn small_drift_while_playing_is_tolerated() {
        let mut sync = MediaSync::default();
        let id = Uuid::new_v4();
        sync.plan(&clip_target(id, "/a.mp4", 1.0), None, true);

        let cmds = sync.plan(&clip_target(id, "/a.mp4", 1.5), Some(secs(1.47)), true);
        assert!(cmds.is_empty());

        let cmds = sync.plan(&clip_target(id, "/a.mp4", 2.0), Some(secs(1.9)), true);
        assert_eq!(cmds, vec![MediaCommand::Seek { at: secs(2.0) }]);
    }

    #[test]
    fn idle_threshold_is_looser() {
        let mut sync = MediaSync::default();
        let id = Uuid::new_v4();
        sync.plan(&clip_target(id, "/a.mp4", 1.0), None, false);

        // 0.15s off: fine when idle, would re-seek while playing.
        let cmds = sync.plan(&clip_target(id, "/a.mp4", 1.15), Some(secs(1.0)), false);
        assert!(cmds.is_empty());

        let cmds = sync.plan(&clip_target(id, "/a.mp4", 1.5), Some(secs(1.0)), false);
        assert_eq!(cmds, vec![MediaCommand::Seek { at: secs(1.5) }]);
    }

    #[test]
    fn clip_change_forces_seek() {
        let mut sync = MediaSync::default();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        sync.plan(&clip_target(a, "/a.mp4", 4.0), None, false);

        // Same source, different clip, position happens to match: still seeks.
        let cmds = sync.plan(&clip_target(b, "/a.mp4", 4.0), Some(secs(4.0)), false);
        assert_eq!(cmds, vec![MediaCommand::Seek { at: secs(4.0) }]);
    }

    #[test]
    fn new_source_loads() {
        let mut sync = MediaSync::default();
        sync.plan(&clip_target(Uuid::new_v4(), "/a.mp4", 4.0), None, false);
        let cmds = sync.plan(&clip_target(Uuid::new_v4(), "/b.mp4", 0.0), None, false);
        assert!(matches!(cmds[0], MediaCommand::Load { .. }));
    }

    #[test]
    fn resume_forces_seek_and_play() {
        let mut sync = MediaSync::default();
        let id = Uuid::new_v4();
        sync.plan(&clip_target(id, "/a.mp4", 2.0), None, false);

        let cmds = sync.plan(&clip_target(id, "/a.mp4", 2.0), Some(secs(2.0)), true);
        assert_eq!(
            cmds,
            vec![MediaCommand::Seek { at: secs(2.0) }, MediaCommand::Play]
        );

        let cmds = sync.plan(&clip_target(id, "/a.mp4", 2.0), Some(secs(2.0)), false);
        assert_eq!(cmds, vec![MediaCommand::Pause]);
    }

    #[test]
    fn gap_hides_once() {
        let mut sync = MediaSync::default();
        let id = Uuid::new_v4();
        sync.plan(&clip_target(id, "/a.mp4", 2.0), None, true);

        let cmds = sync.plan(&MediaTarget::Gap, None, true);
        assert_eq!(cmds, vec![MediaCommand::Pause, MediaCommand::Hide]);
        assert!(sync.plan(&MediaTarget::Gap, None, true).is_empty());

        // Hide unloaded the source: coming back reloads it at the playhead.
        let cmds = sync.plan(&clip_target(id, "/a.mp4", 3.0), None, true);
        assert_eq!(
            cmds,
            vec![
                MediaCommand::Load {
                    source_ref: SourceRef::new("/a.mp4"),
                    at: secs(3.0)
                },
                MediaCommand::Play
            ]
        );
    }

    // -----------------------------------------------------------------------
    // sync against a sink
    // -----------------------------------------------------------------------

    #[derive(Debug)]
    struct Broken;

    impl fmt::Display for Broken {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("renderer gone")
        }
    }

    impl std::error::Error for Broken {}

    #[derive(Default)]
    struct FlakySink {
        fail_loads: bool,
        applied: Vec<MediaCommand>,
    }

    impl MediaSink for FlakySink {
        type Error = Broken;

        fn load(&mut self, source_ref: &SourceRef, at: TimeUs) -> Result<(), Broken> {
            if self.fail_loads {
                return Err(Broken);
            }
            self.applied.push(MediaCommand::Load {
                source_ref: source_ref.clone(),
                at,
            });
            Ok(())
        }

        fn seek(&mut self, at: TimeUs) -> Result<(), Broken> {
            self.applied.push(MediaCommand::Seek { at });
            Ok(())
        }

        fn play(&mut self) -> Result<(), Broken> {
            self.applied.push(MediaCommand::Play);
            Ok(())
        }

        fn pause(&mut self) -> Result<(), Broken> {
            self.applied.push(MediaCommand::Pause);
            Ok(())
        }

        fn hide(&mut self) -> Result<(), Broken> {
            self.applied.push(MediaCommand::Hide);
            Ok(())
        }

        fn position(&mut self) -> Result<Option<TimeUs>, Broken> {
            Err(Broken)
        }
    }

    #[test]
    fn leaving_gap_reloads_through_sink() {
        let mut sync = MediaSync::default();
        let mut sink = FlakySink::default();
        let id = Uuid::new_v4();

        sync.sync(&mut sink, &clip_target(id, "/a.mp4", 1.0), true);
        sync.sync(&mut sink, &MediaTarget::Gap, true);
        sink.applied.clear();

        sync.sync(&mut sink, &clip_target(id, "/a.mp4", 3.0), true);
        assert_eq!(
            sink.applied,
            vec![
                MediaCommand::Load {
                    source_ref: SourceRef::new("/a.mp4"),
                    at: secs(3.0)
                },
                MediaCommand::Play
            ]
        );
    }

    #[test]
    fn failed_load_is_retried_next_frame() {
        let mut sync = MediaSync::default();
        let mut sink = FlakySink {
            fail_loads: true,
            ..FlakySink::default()
        };
        let target = clip_target(Uuid::new_v4(), "/a.mp4", 1.0);

        sync.sync(&mut sink, &target, false);
        assert!(sink.applied.is_empty());

        sink.fail_loads = false;
        sync.sync(&mut sink, &target, false);
        assert_eq!(
            sink.applied,
            vec![MediaCommand::Load {
                source_ref: SourceRef::new("/a.mp4"),
                at: secs(1.0)
            }]
        );
    }
}
