// Player control subsystem: owns the external mpv process, the IPC channel
// to it, and the session lifecycle around both.

pub mod channel;
pub mod launch;
pub mod session;
pub mod shutdown;

pub use channel::ControlChannel;
pub use launch::ProcessHandle;
pub use session::{KeyOutcome, PlaybackSession};

use thiserror::Error;

/// Failures the player subsystem can report to callers. Everything else
/// (channel races, process self-exit, concurrent teardown) is absorbed
/// locally and degrades to "no song playing".
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("stream URL is empty")]
    EmptyUrl,

    #[error("failed to launch player '{binary}': {source}")]
    Launch {
        binary: String,
        #[source]
        source: std::io::Error,
    },
}
