pub mod error;
pub mod mpv;
pub mod transport;

pub use error::{PreviewError, Result};
pub use mpv::MpvSink;
pub use transport::Transport;
