//! Run external commands through a helper process.
//!
//! This is the "just works" layer. Describe a [`Command`], hand it to a
//! [`Runner`], and get back an [`Outcome`]: success, non-zero exit with the
//! captured output, a startup failure reported by the helper, or abnormal
//! helper termination. Outcomes chain: a successful stage's stdout becomes
//! the next stage's stdin, and the first failure short-circuits the rest.
//!
//! ```no_run
//! use execprims_exec::{Command, Runner};
//!
//! # fn main() -> execprims_exec::Result<()> {
//! let runner = Runner::from_env()?;
//! let outcome = runner
//!     .run_with_args("echo", ["john"])?
//!     .pipe(&runner, Command::new("tr").args(["a-z", "A-Z"]))?;
//! assert_eq!(outcome.output().map(|o| o.out.as_ref()), Some(&b"JOHN\n"[..]));
//! # Ok(())
//! # }
//! ```
//!
//! Captured output and piped input are held fully in memory; this is not a
//! streaming interface and is unsuited to multi-gigabyte outputs.

pub mod chain;
pub mod command;
pub mod config;
pub mod error;
pub mod launcher;
#[cfg(feature = "async")]
pub mod nonblocking;
pub mod outcome;
pub mod request;
pub mod response;
pub mod runner;
pub mod serve;

#[cfg(all(test, unix))]
mod testing;

pub use chain::Pipeline;
pub use command::{Command, Options};
pub use config::RunnerConfig;
pub use error::{ExecError, Result};
pub use launcher::{Launcher, ProcessLauncher};
#[cfg(feature = "async")]
pub use nonblocking::AsyncRunner;
pub use outcome::{Failure, Outcome, Output};
pub use request::{Request, RequestAssembler};
pub use response::ResponseAggregator;
pub use runner::Runner;
pub use serve::serve;
