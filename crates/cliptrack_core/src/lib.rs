pub mod collision;
pub mod config;
pub mod drag;
pub mod error;
pub mod media;
pub mod playback;
pub mod scale;
pub mod selection;
pub mod session;
pub mod snapping;
pub mod store;
pub mod types;
