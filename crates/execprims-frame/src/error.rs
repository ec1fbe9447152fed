use crate::message::Tag;

/// Errors that can occur during frame and message encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A packet arrived with no discriminant byte.
    #[error("empty packet (missing message tag)")]
    EmptyPayload,

    /// The discriminant byte does not name a known message.
    #[error("unknown message tag {0}")]
    UnknownTag(u8),

    /// The payload does not have the shape its tag requires.
    #[error("malformed {tag} message: {reason}")]
    Malformed { tag: Tag, reason: &'static str },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
