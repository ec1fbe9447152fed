//! Typed protocol messages.
//!
//! A frame payload is a one-byte [`Tag`] followed by a tag-specific body.
//! Tag values are part of the wire contract with the helper and never change.

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::codec::{wire_len, HEADER_SIZE};
use crate::error::{FrameError, Result};

/// Message discriminant, the first byte of every payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    /// Executable to run (request).
    Command = 0,
    /// One argument (request).
    Arg = 1,
    /// Whole standard input (request).
    Stdin = 2,
    /// One environment override (request).
    Env = 3,
    /// Working directory (request).
    CurrentDir = 4,
    /// The target could not be started (response).
    Error = 5,
    /// Exit status of the target (response).
    ExitStatus = 6,
    /// Captured standard output (response).
    Stdout = 7,
    /// Captured standard error (response).
    Stderr = 8,
    /// End of transmission, in both directions.
    Eot = 9,
}

impl Tag {
    /// All tags, indexed by their wire value.
    pub const ALL: [Tag; 10] = [
        Tag::Command,
        Tag::Arg,
        Tag::Stdin,
        Tag::Env,
        Tag::CurrentDir,
        Tag::Error,
        Tag::ExitStatus,
        Tag::Stdout,
        Tag::Stderr,
        Tag::Eot,
    ];

    /// Look up a tag by its wire value.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(usize::from(value)).copied()
    }

    /// Human-readable tag name.
    pub fn name(self) -> &'static str {
        match self {
            Tag::Command => "Command",
            Tag::Arg => "Arg",
            Tag::Stdin => "Stdin",
            Tag::Env => "Env",
            Tag::CurrentDir => "CurrentDir",
            Tag::Error => "Error",
            Tag::ExitStatus => "ExitStatus",
            Tag::Stdout => "Stdout",
            Tag::Stderr => "Stderr",
            Tag::Eot => "Eot",
        }
    }

    /// Returns true if the controller may send this tag to the helper.
    pub fn is_request(self) -> bool {
        matches!(
            self,
            Tag::Command | Tag::Arg | Tag::Stdin | Tag::Env | Tag::CurrentDir | Tag::Eot
        )
    }

    /// Returns true if the helper may send this tag to the controller.
    pub fn is_response(self) -> bool {
        matches!(
            self,
            Tag::Error | Tag::ExitStatus | Tag::Stdout | Tag::Stderr | Tag::Eot
        )
    }
}

impl From<Tag> for u8 {
    fn from(tag: Tag) -> u8 {
        tag as u8
    }
}

impl TryFrom<u8> for Tag {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self> {
        Tag::from_u8(value).ok_or(FrameError::UnknownTag(value))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Executable path or name.
    Command(Bytes),
    /// One argument, in order.
    Arg(Bytes),
    /// Entire standard input.
    Stdin(Bytes),
    /// Environment override. On the wire the name is length-prefixed and
    /// the value runs to the end of the payload.
    Env { name: Bytes, value: Bytes },
    /// Working directory for the target.
    CurrentDir(Bytes),
    /// Human-readable reason the target could not be started.
    Error(Bytes),
    /// Exit status of the target.
    ExitStatus(i32),
    /// Captured standard output.
    Stdout(Bytes),
    /// Captured standard error.
    Stderr(Bytes),
    /// End of transmission.
    Eot,
}

impl Message {
    /// Environment override from anything byte-like.
    pub fn env(name: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Message::Env {
            name: name.into(),
            value: value.into(),
        }
    }

    /// The discriminant of this message.
    pub fn tag(&self) -> Tag {
        match self {
            Message::Command(_) => Tag::Command,
            Message::Arg(_) => Tag::Arg,
            Message::Stdin(_) => Tag::Stdin,
            Message::Env { .. } => Tag::Env,
            Message::CurrentDir(_) => Tag::CurrentDir,
            Message::Error(_) => Tag::Error,
            Message::ExitStatus(_) => Tag::ExitStatus,
            Message::Stdout(_) => Tag::Stdout,
            Message::Stderr(_) => Tag::Stderr,
            Message::Eot => Tag::Eot,
        }
    }

    /// Size of the frame payload (tag byte plus body).
    pub fn payload_len(&self) -> usize {
        1 + self.body_len()
    }

    fn body_len(&self) -> usize {
        match self {
            Message::Command(b)
            | Message::Arg(b)
            | Message::Stdin(b)
            | Message::CurrentDir(b)
            | Message::Error(b)
            | Message::Stdout(b)
            | Message::Stderr(b) => b.len(),
            Message::Env { name, value } => 4 + name.len() + value.len(),
            Message::ExitStatus(_) => 4,
            Message::Eot => 0,
        }
    }

    /// Append this message to `dst` as one complete frame.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        let len = wire_len(self.payload_len())?;
        dst.reserve(HEADER_SIZE + self.payload_len());
        dst.put_u32(len);
        dst.put_u8(self.tag().into());
        match self {
            Message::Command(b)
            | Message::Arg(b)
            | Message::Stdin(b)
            | Message::CurrentDir(b)
            | Message::Error(b)
            | Message::Stdout(b)
            | Message::Stderr(b) => dst.put_slice(b),
            Message::Env { name, value } => {
                // Bounded by the total length check above.
                dst.put_u32(name.len() as u32);
                dst.put_slice(name);
                dst.put_slice(value);
            }
            Message::ExitStatus(code) => dst.put_i32(*code),
            Message::Eot => {}
        }
        Ok(())
    }

    /// Decode one frame payload.
    pub fn decode(mut payload: Bytes) -> Result<Self> {
        if payload.is_empty() {
            return Err(FrameError::EmptyPayload);
        }
        let tag = Tag::try_from(payload.get_u8())?;

        let message = match tag {
            Tag::Command => Message::Command(payload),
            Tag::Arg => Message::Arg(payload),
            Tag::Stdin => Message::Stdin(payload),
            Tag::CurrentDir => Message::CurrentDir(payload),
            Tag::Error => Message::Error(payload),
            Tag::Stdout => Message::Stdout(payload),
            Tag::Stderr => Message::Stderr(payload),
            Tag::Env => {
                if payload.len() < 4 {
                    return Err(FrameError::Malformed {
                        tag,
                        reason: "missing name length",
                    });
                }
                let name_len = payload.get_u32() as usize;
                if name_len > payload.len() {
                    return Err(FrameError::Malformed {
                        tag,
                        reason: "name length exceeds payload",
                    });
                }
                let name = payload.split_to(name_len);
                Message::Env {
                    name,
                    value: payload,
                }
            }
            Tag::ExitStatus => {
                if payload.len() != 4 {
                    return Err(FrameError::Malformed {
                        tag,
                        reason: "exit status must be exactly 4 bytes",
                    });
                }
                Message::ExitStatus(payload.get_i32())
            }
            Tag::Eot => {
                if !payload.is_empty() {
                    return Err(FrameError::Malformed {
                        tag,
                        reason: "end of transmission carries no payload",
                    });
                }
                Message::Eot
            }
        };
        Ok(message)
    }
}
