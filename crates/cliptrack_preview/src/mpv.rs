use crate::error::{PreviewError, Result};
use cliptrack_core::media::MediaSink;
use cliptrack_core::types::{SourceRef, TimeUs};
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tracing::{debug, info};

const SOCKET_WAIT_ATTEMPTS: u32 = 50;
const SOCKET_WAIT_STEP: Duration = Duration::from_millis(100);
const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// One line read back from the mpv JSON IPC socket.
#[derive(Debug, Deserialize)]
struct IpcReply {
    /// Set on unsolicited event lines, which are skipped.
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl IpcReply {
    fn is_success(&self) -> bool {
        self.error.as_deref() == Some("success")
    }
}

/// Drives an external mpv window over its JSON IPC socket.
pub struct MpvSink {
    process: Option<Child>,
    socket_path: PathBuf,
}

impl Default for MpvSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MpvSink {
    pub fn new() -> Self {
        let socket_path =
            std::env::temp_dir().join(format!("cliptrack-mpv-{}", std::process::id()));
        Self {
            process: None,
            socket_path,
        }
    }

    /// Talk to an mpv that is already listening on `socket_path`.
    pub fn attach(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            process: None,
            socket_path: socket_path.into(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Spawn mpv idle with an IPC server and wait for its socket.
    pub fn start(&mut self) -> Result<()> {
        self.stop();

        let log_path =
            std::env::temp_dir().join(format!("cliptrack-mpv-{}.log", std::process::id()));
        let stderr = match std::fs::File::create(&log_path) {
            Ok(file) => Stdio::from(file),
            Err(_) => Stdio::null(),
        };
        info!(socket = %self.socket_path.display(), log = %log_path.display(), "starting mpv");

        let child = Command::new("mpv")
            .args([
                "--idle=yes",
                "--keep-open=yes",
                "--force-window=yes",
                "--osc=no",
                "--osd-level=0",
                "--title=cliptrack-preview",
                &format!("--input-ipc-server={}", self.socket_path.display()),
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(stderr)
            .spawn()
            .map_err(PreviewError::Spawn)?;
        self.process = Some(child);

        for _ in 0..SOCKET_WAIT_ATTEMPTS {
            if self.socket_path.exists() {
                return Ok(());
            }
            std::thread::sleep(SOCKET_WAIT_STEP);
        }
        Err(PreviewError::SocketTimeout(self.socket_path.clone()))
    }

    pub fn is_running(&self) -> bool {
        self.process.is_some()
    }

    pub fn stop(&mut self) {
        if let Some(mut child) = self.process.take() {
            let _ = child.kill();
            let _ = child.wait();
            debug!("mpv stopped");
        }
        let _ = std::fs::remove_file(&self.socket_path);
    }

    fn send_command(&self, command: Value) -> Result<IpcReply> {
        let mut stream = UnixStream::connect(&self.socket_path)?;
        stream.set_read_timeout(Some(READ_TIMEOUT))?;

        let msg = format!("{}\n", command);
        stream.write_all(msg.as_bytes())?;

        let mut reader = BufReader::new(stream);
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                return Err(PreviewError::Ipc("connection closed".into()));
            }
            let reply: IpcReply = serde_json::from_str(&line)?;
            if reply.event.is_none() {
                return Ok(reply);
            }
        }
    }

    fn expect_success(&self, command: Value) -> Result<()> {
        let reply = self.send_command(command.clone())?;
        if reply.is_success() {
            Ok(())
        } else {
            Err(PreviewError::Ipc(format!(
                "{} failed: {}",
                command,
                reply.error.unwrap_or_default()
            )))
        }
    }

    fn set_paused(&self, paused: bool) -> Result<()> {
        self.expect_success(json!({ "command": ["set_property", "pause", paused] }))
    }
}

impl MediaSink for MpvSink {
    type Error = PreviewError;

    fn load(&mut self, source_ref: &SourceRef, at: TimeUs) -> Result<()> {
        // A seek straight after loadfile races the demuxer, so the start
        // offset goes in as a property first.
        self.expect_success(
            json!({ "command": ["set_property", "start", format!("{}", at.as_seconds())] }),
        )?;
        self.expect_success(json!({ "command": ["loadfile", source_ref.as_str()] }))
    }

    fn seek(&mut self, at: TimeUs) -> Result<()> {
        self.expect_success(json!({ "command": ["seek", at.as_seconds(), "absolute"] }))
    }

    fn play(&mut self) -> Result<()> {
        self.set_paused(false)
    }

    fn pause(&mut self) -> Result<()> {
        self.set_paused(true)
    }

    fn hide(&mut self) -> Result<()> {
        self.set_paused(true)?;
        self.expect_success(json!({ "command": ["stop"] }))
    }

    fn position(&mut self) -> Result<Option<TimeUs>> {
        let reply = self.send_command(json!({ "command": ["get_property", "time-pos"] }))?;
        if !reply.is_success() {
            // "property unavailable" while nothing is loaded.
            return Ok(None);
        }
        Ok(reply
            .data
            .and_then(|d| d.as_f64())
            .map(TimeUs::from_seconds))
    }
}

impl Drop for MpvSink {
    fn drop(&mut self) {
        // An attached mpv is not ours to kill.
        if self.process.is_some() {
            self.stop();
        }
    }
}
