use execprims_frame::Tag;

/// Infrastructure errors while running an invocation.
///
/// What happened to the *command* (non-zero exit, failure to start, helper
/// death) is reported through [`Outcome`](crate::Outcome), not here.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// Transport-level error (spawning, reaping, channel setup).
    #[error("transport error: {0}")]
    Transport(#[from] execprims_transport::TransportError),

    /// Frame-level error (I/O, malformed or unknown messages).
    #[error("frame error: {0}")]
    Frame(#[from] execprims_frame::FrameError),

    /// A message arrived that is not allowed at this point of the exchange.
    #[error("unexpected {tag} message {context}")]
    UnexpectedMessage { tag: Tag, context: &'static str },

    /// A text field (program, argument, environment, directory) was not
    /// valid UTF-8.
    #[error("{tag} payload is not valid UTF-8")]
    InvalidText { tag: Tag },

    /// The helper did not finish responding in time.
    #[error("no response from helper within {0:?}")]
    Timeout(std::time::Duration),

    /// No helper executable is configured.
    #[error("no helper configured (set EXECPRIMS_HELPER)")]
    HelperNotConfigured,

    /// Starting or collecting the target process failed inside the helper.
    #[error("target process I/O error: {0}")]
    Target(std::io::Error),

    /// A background invocation task panicked or was cancelled.
    #[cfg(feature = "async")]
    #[error("invocation task failed: {0}")]
    Join(String),
}

pub type Result<T> = std::result::Result<T, ExecError>;
