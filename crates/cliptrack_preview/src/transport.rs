//! Frame clock that drives a shared [`EditorSession`] and keeps a media sink
//! in step with its playhead.
//!
//! The session lock is only held to advance the playhead and resolve the
//! media target. Sink I/O runs on tokio's blocking pool with the session
//! unlocked, so a slow renderer never stalls edits or the runtime.

use cliptrack_core::media::{MediaSink, MediaSync};
use cliptrack_core::playback::{MediaTarget, TickOutcome};
use cliptrack_core::session::EditorSession;
use cliptrack_core::types::TimeUs;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

struct Preview<S> {
    sink: S,
    sync: MediaSync,
    /// Bumped on every play/pause so frames planned by an aborted loop are dropped.
    epoch: u64,
}

impl<S: MediaSink> Preview<S> {
    fn sync_to(&mut self, target: &MediaTarget, playing: bool) {
        self.sync.sync(&mut self.sink, target, playing);
    }
}

/// Play, pause and scrub with a live preview.
///
/// While playing, one tokio task ticks the session at the configured frame
/// rate. The task ends on its own when playback stops.
pub struct Transport<S> {
    session: Arc<Mutex<EditorSession>>,
    preview: Arc<Mutex<Preview<S>>>,
    frame_interval: Duration,
    task: Option<JoinHandle<()>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn snapshot(session: &Mutex<EditorSession>) -> (MediaTarget, bool) {
    let session = lock(session);
    (session.media_target(), session.playback().is_playing())
}

impl<S: MediaSink + Send + 'static> Transport<S> {
    pub fn new(session: Arc<Mutex<EditorSession>>, sink: S) -> Self {
        let (sync, frame_interval) = {
            let s = lock(&session);
            (MediaSync::new(s.config()), s.config().frame_interval())
        };
        Self {
            session,
            preview: Arc::new(Mutex::new(Preview {
                sink,
                sync,
                epoch: 0,
            })),
            frame_interval,
            task: None,
        }
    }

    pub fn session(&self) -> Arc<Mutex<EditorSession>> {
        Arc::clone(&self.session)
    }

    /// Run `f` against the sink, e.g. to read back what it recorded.
    pub fn with_sink<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut lock(&self.preview).sink)
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Start playback and the frame loop. Must be called inside a tokio runtime.
    pub fn play(&mut self) {
        let epoch = self.abort();
        lock(&self.session).play();
        self.task = Some(tokio::spawn(run_loop(
            Arc::clone(&self.session),
            Arc::clone(&self.preview),
            self.frame_interval,
            epoch,
        )));
    }

    pub fn pause(&mut self) {
        self.abort();
        lock(&self.session).pause();
        self.refresh();
    }

    pub fn toggle_play(&mut self) {
        let playing = lock(&self.session).playback().is_playing();
        if playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Move the playhead and show the frame there. Keeps playing if it was.
    pub fn scrub(&mut self, time: TimeUs) {
        lock(&self.session).scrub(time);
        self.refresh();
    }

    /// Push the current playhead to the sink once, on the calling thread.
    pub fn refresh(&self) {
        let (target, playing) = snapshot(&self.session);
        lock(&self.preview).sync_to(&target, playing);
    }

    /// Stop playback and drop whatever the sink thought it was showing.
    pub fn stop(&mut self) {
        self.pause();
        lock(&self.preview).sync.reset();
    }

    /// Cancel the loop and invalidate its pending frames. Returns the new epoch.
    fn abort(&mut self) -> u64 {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        let mut preview = lock(&self.preview);
        preview.epoch += 1;
        preview.epoch
    }
}

impl<S> Drop for Transport<S> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_loop<S: MediaSink + Send + 'static>(
    session: Arc<Mutex<EditorSession>>,
    preview: Arc<Mutex<Preview<S>>>,
    frame_interval: Duration,
    epoch: u64,
) {
    let mut ticker = tokio::time::interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last = Instant::now();
    debug!(?frame_interval, epoch, "transport loop started");

    loop {
        ticker.tick().await;
        let now = Instant::now();
        let elapsed = now.duration_since(last);
        last = now;

        let (outcome, target, playing) = {
            let mut session = lock(&session);
            let outcome = session.tick(elapsed);
            (
                outcome,
                session.media_target(),
                session.playback().is_playing(),
            )
        };

        let frame_preview = Arc::clone(&preview);
        let synced = tokio::task::spawn_blocking(move || {
            let mut preview = lock(&frame_preview);
            if preview.epoch == epoch {
                preview.sync_to(&target, playing);
            }
        })
        .await;
        if let Err(e) = synced {
            warn!(error = %e, "media sync task failed");
        }

        match outcome {
            TickOutcome::Advanced => {}
            TickOutcome::ReachedEnd => {
                info!("playback reached end of timeline");
                break;
            }
            TickOutcome::Idle => {
                debug!("playback stopped, transport loop exiting");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cliptrack_core::config::EditorConfig;
    use cliptrack_core::media::MediaCommand;
    use cliptrack_core::types::{ClipSpec, SourceRef};
    use std::convert::Infallible;

    fn secs(s: f64) -> TimeUs {
        TimeUs::from_seconds(s)
    }

    #[derive(Default)]
    struct RecordingSink {
        log: Vec<MediaCommand>,
        /// When set, every position query checks whether this session is locked.
        watch: Option<Arc<Mutex<EditorSession>>>,
        position_calls: usize,
        saw_session_locked: bool,
    }

    impl MediaSink for RecordingSink {
        type Error = Infallible;

        fn load(&mut self, source_ref: &SourceRef, at: TimeUs) -> Result<(), Infallible> {
            self.log.push(MediaCommand::Load {
                source_ref: source_ref.clone(),
                at,
            });
            Ok(())
        }

        fn seek(&mut self, at: TimeUs) -> Result<(), Infallible> {
            self.log.push(MediaCommand::Seek { at });
            Ok(())
        }

        fn play(&mut self) -> Result<(), Infallible> {
            self.log.push(MediaCommand::Play);
            Ok(())
        }

        fn pause(&mut self) -> Result<(), Infallible> {
            self.log.push(MediaCommand::Pause);
            Ok(())
        }

        fn hide(&mut self) -> Result<(), Infallible> {
            self.log.push(MediaCommand::Hide);
            Ok(())
        }

        fn position(&mut self) -> Result<Option<TimeUs>, Infallible> {
            self.position_calls += 1;
            if let Some(session) = &self.watch {
                if session.try_lock().is_err() {
                    self.saw_session_locked = true;
                }
            }
            Ok(None)
        }
    }

    /// A 2s clip at the start of a timeline floored at 3s.
    fn make_transport() -> Transport<RecordingSink> {
        let config = EditorConfig {
            min_timeline_duration: 3.0,
            ..EditorConfig::default()
        };
        let mut session = EditorSession::new(config);
        session
            .add_clip(ClipSpec {
                source_ref: SourceRef::new("/media/a.mp4"),
                name: "a.mp4".to_string(),
                start_time: TimeUs::ZERO,
                trim_in: TimeUs::ZERO,
                trim_out: secs(2.0),
                original_duration: secs(2.0),
            })
            .unwrap();
        Transport::new(Arc::new(Mutex::new(session)), RecordingSink::default())
    }

    fn commands(transport: &Transport<RecordingSink>) -> Vec<MediaCommand> {
        transport.with_sink(|sink| sink.log.clone())
    }

    #[test]
    fn scrub_while_stopped_loads_without_playing() {
        let mut transport = make_transport();
        transport.scrub(secs(1.0));
        assert_eq!(
            commands(&transport),
            vec![MediaCommand::Load {
                source_ref: SourceRef::new("/media/a.mp4"),
                at: secs(1.0)
            }]
        );
        assert!(!transport.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn plays_to_end_and_stops() {
        let mut transport = make_transport();
        transport.play();
        assert!(transport.is_running());

        tokio::time::sleep(Duration::from_secs(4)).await;

        assert!(!transport.is_running());
        let session = transport.session();
        {
            let session = lock(&session);
            assert!(!session.playback().is_playing());
            assert_eq!(session.playback().playhead(), secs(3.0));
        }

        let log = commands(&transport);
        assert_eq!(
            log[0],
            MediaCommand::Load {
                source_ref: SourceRef::new("/media/a.mp4"),
                at: TimeUs::ZERO
            }
        );
        assert_eq!(log[1], MediaCommand::Play);
        // Crossing into the gap after the clip pauses and hides once.
        assert_eq!(
            &log[log.len() - 2..],
            &[MediaCommand::Pause, MediaCommand::Hide]
        );
        assert_eq!(log.iter().filter(|c| **c == MediaCommand::Play).count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_playhead() {
        let mut transport = make_transport();
        transport.play();
        tokio::time::sleep(Duration::from_millis(500)).await;
        transport.pause();
        assert!(!transport.is_running());

        let session = transport.session();
        let frozen = lock(&session).playback().playhead();
        assert!(frozen > TimeUs::ZERO);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(lock(&session).playback().playhead(), frozen);
        assert_eq!(commands(&transport).last(), Some(&MediaCommand::Pause));
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_twice_returns_to_paused() {
        let mut transport = make_transport();
        transport.toggle_play();
        assert!(transport.is_running());
        tokio::time::sleep(Duration::from_millis(100)).await;
        transport.toggle_play();
        assert!(!transport.is_running());
        assert!(!lock(&transport.session()).playback().is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_loop() {
        let mut transport = make_transport();
        transport.play();
        let session = transport.session();
        drop(transport);

        tokio::time::sleep(Duration::from_millis(200)).await;
        // Still flagged as playing, but nobody is advancing it.
        let playhead = lock(&session).playback().playhead();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(lock(&session).playback().playhead(), playhead);
    }

    #[tokio::test(start_paused = true)]
    async fn sink_io_runs_with_session_unlocked() {
        let mut transport = make_transport();
        let session = transport.session();
        transport.with_sink(|sink| sink.watch = Some(Arc::clone(&session)));

        transport.play();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert!(transport.with_sink(|sink| sink.position_calls) > 1);
        assert!(!transport.with_sink(|sink| sink.saw_session_locked));
    }
}
