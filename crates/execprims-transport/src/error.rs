use std::path::PathBuf;

/// Errors that can occur while spawning or talking to a helper process.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The helper executable could not be started.
    #[error("failed to spawn helper {program}: {source}")]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    /// Creating the socket pair for the helper channel failed.
    #[error("failed to create helper channel: {0}")]
    Channel(std::io::Error),

    /// Waiting on (or killing) the helper process failed.
    #[error("failed to reap helper process {pid}: {source}")]
    Wait { pid: u32, source: std::io::Error },

    /// An I/O error occurred on the helper stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Helper channels are not available on this platform.
    #[error("helper channels are not supported on this platform")]
    Unsupported,
}

pub type Result<T> = std::result::Result<T, TransportError>;
