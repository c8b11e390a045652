use anyhow::{bail, Context, Result};
use cliptrack_core::config::EditorConfig;
use cliptrack_core::media::MediaSink;
use cliptrack_core::session::EditorSession;
use cliptrack_core::types::{ImportedMedia, SourceRef, TimeUs};
use cliptrack_preview::{MpvSink, Transport};
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

const USAGE: &str = "usage: cliptrack <media.json> [config.json] [--mpv]";

/// Stands in for a renderer: logs every command and fakes a position.
#[derive(Default)]
struct LogSink {
    base: TimeUs,
    playing_since: Option<Instant>,
}

impl MediaSink for LogSink {
    type Error = Infallible;

    fn load(&mut self, source_ref: &SourceRef, at: TimeUs) -> Result<(), Infallible> {
        tracing::info!(source = %source_ref, %at, "load");
        self.base = at;
        self.playing_since = self.playing_since.map(|_| Instant::now());
        Ok(())
    }

    fn seek(&mut self, at: TimeUs) -> Result<(), Infallible> {
        tracing::info!(%at, "seek");
        self.base = at;
        self.playing_since = self.playing_since.map(|_| Instant::now());
        Ok(())
    }

    fn play(&mut self) -> Result<(), Infallible> {
        tracing::info!("play");
        self.playing_since = Some(Instant::now());
        Ok(())
    }

    fn pause(&mut self) -> Result<(), Infallible> {
        tracing::info!("pause");
        if let Some(since) = self.playing_since.take() {
            self.base = self.base + TimeUs::from_duration(since.elapsed());
        }
        Ok(())
    }

    fn hide(&mut self) -> Result<(), Infallible> {
        tracing::info!("hide");
        Ok(())
    }

    fn position(&mut self) -> Result<Option<TimeUs>, Infallible> {
        let drift = self
            .playing_since
            .map(|since| TimeUs::from_duration(since.elapsed()))
            .unwrap_or(TimeUs::ZERO);
        Ok(Some(self.base + drift))
    }
}

struct Args {
    media: PathBuf,
    config: Option<PathBuf>,
    use_mpv: bool,
}

fn parse_args() -> Result<Args> {
    let mut positional = Vec::new();
    let mut use_mpv = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--mpv" => use_mpv = true,
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            _ => positional.push(PathBuf::from(arg)),
        }
    }
    let mut positional = positional.into_iter();
    let Some(media) = positional.next() else {
        bail!("missing media list\n{}", USAGE);
    };
    Ok(Args {
        media,
        config: positional.next(),
        use_mpv,
    })
}

fn load_session(args: &Args) -> Result<EditorSession> {
    let config = match &args.config {
        Some(path) => EditorConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EditorConfig::default(),
    };

    let data = std::fs::read_to_string(&args.media)
        .with_context(|| format!("reading {}", args.media.display()))?;
    let media: Vec<ImportedMedia> =
        serde_json::from_str(&data).context("parsing media list")?;

    let mut session = EditorSession::new(config);
    for item in &media {
        session.import(item);
    }
    tracing::info!(
        clips = session.store().len(),
        duration = %session.timeline_duration(),
        "timeline ready"
    );
    Ok(session)
}

async fn play_through<S: MediaSink + Send + 'static>(
    session: Arc<Mutex<EditorSession>>,
    sink: S,
) {
    let mut transport = Transport::new(session, sink);
    transport.play();
    while transport.is_running() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    transport.stop();
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = parse_args()?;
    let session = Arc::new(Mutex::new(load_session(&args)?));

    if args.use_mpv {
        let mut sink = MpvSink::new();
        sink.start().context("starting mpv")?;
        play_through(Arc::clone(&session), sink).await;
    } else {
        play_through(Arc::clone(&session), LogSink::default()).await;
    }

    let entries = session
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .export_entries();
    println!(
        "{}",
        serde_json::to_string_pretty(&entries).context("serializing export list")?
    );
    Ok(())
}
