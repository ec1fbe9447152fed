//! Helper process transport.
//!
//! Every invocation talks to a freshly spawned helper process over exactly
//! one bidirectional byte stream:
//! - On Unix the stream is one end of a connected socket pair; the other end
//!   is installed as the helper's stdin and stdout.
//! - The helper's exit code (or `128 + signal`) is the termination code
//!   reported when the channel closes before a complete response.
//!
//! This is the lowest layer of execprims. Everything else builds on top of
//! the [`HelperStream`] type provided here.

pub mod error;
pub mod process;
pub mod traits;

pub use error::{Result, TransportError};
pub use process::{termination_code, HelperConfig, HelperHandle, HelperProcess, HELPER_ENV_VAR};
pub use traits::HelperStream;
