use std::borrow::Cow;

use bytes::Bytes;

/// Everything a finished target reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    /// Exit status of the target.
    pub status: i32,
    /// Captured standard output.
    pub out: Bytes,
    /// Captured standard error.
    pub err: Bytes,
}

impl Output {
    /// Standard output decoded as UTF-8, replacing invalid sequences.
    pub fn out_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.out)
    }

    /// Standard error decoded as UTF-8, replacing invalid sequences.
    pub fn err_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.err)
    }
}

/// Why an invocation did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Failure {
    /// The target ran and exited with a non-zero status.
    #[error("command exited with status {}", .0.status)]
    Exit(Output),

    /// The helper could not start the target.
    #[error("command failed to start: {0}")]
    Startup(String),

    /// The channel closed before the helper finished the exchange. Carries
    /// the helper's termination code.
    #[error("helper terminated abnormally with code {0}")]
    Abnormal(i32),
}

impl Failure {
    /// Termination code best describing this failure.
    ///
    /// Startup failures have no code of their own and report 127, the
    /// shell's "command not found" status.
    pub fn code(&self) -> i32 {
        match self {
            Failure::Exit(output) => output.status,
            Failure::Startup(_) => 127,
            Failure::Abnormal(code) => *code,
        }
    }
}

/// Result of one invocation: either the target succeeded or it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(Output),
    Failure(Failure),
}

impl Outcome {
    /// Classify a completed output: status 0 is success, anything else is
    /// [`Failure::Exit`].
    pub fn from_output(output: Output) -> Self {
        if output.status == 0 {
            Outcome::Success(output)
        } else {
            Outcome::Failure(Failure::Exit(output))
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Output of the target, if it ran to completion (success or non-zero
    /// exit).
    pub fn output(&self) -> Option<&Output> {
        match self {
            Outcome::Success(output) | Outcome::Failure(Failure::Exit(output)) => Some(output),
            Outcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(failure) => Some(failure),
        }
    }

    /// Convert into a standard `Result`.
    pub fn into_result(self) -> std::result::Result<Output, Failure> {
        match self {
            Outcome::Success(output) => Ok(output),
            Outcome::Failure(failure) => Err(failure),
        }
    }
}

impl From<Output> for Outcome {
    fn from(output: Output) -> Self {
        Outcome::from_output(output)
    }
}

impl From<Failure> for Outcome {
    fn from(failure: Failure) -> Self {
        Outcome::Failure(failure)
    }
}
