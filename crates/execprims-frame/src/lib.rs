//! Length-prefixed framing and the typed message codec for the helper protocol.
//!
//! Every packet on a helper channel is:
//! - A 4-byte big-endian payload length
//! - The payload, whose first byte is a message [`Tag`]
//!
//! No magic, no checksum: the channel is a local, reliable, ordered stream.
//! Callers always get complete packets, never partial reads.

pub mod codec;
pub mod error;
pub mod message;
pub mod reader;
pub mod writer;

pub use codec::{decode_frame, encode_frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE};
pub use error::{FrameError, Result};
pub use message::{Message, Tag};
pub use reader::FrameReader;
pub use writer::FrameWriter;
