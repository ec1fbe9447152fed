//! Run external commands through a spawned helper process.
//!
//! Each invocation spawns a fresh helper and speaks a small framed binary
//! protocol with it over one bidirectional channel: the request (program,
//! arguments, stdin, environment, working directory) goes out, and the
//! captured exit status, stdout and stderr come back. Invocations chain, so
//! one command's output can feed the next like a shell pipeline.
//!
//! # Crate Structure
//!
//! - [`transport`]: Helper process spawning and the channel stream
//! - [`frame`]: Length-prefixed framing and the protocol message codec
//! - [`exec`]: Commands, runner, outcomes and chaining (behind `exec` feature)

/// Re-export transport types.
pub mod transport {
    pub use execprims_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use execprims_frame::*;
}

/// Re-export exec types (requires `exec` feature).
#[cfg(feature = "exec")]
pub mod exec {
    pub use execprims_exec::*;
}
