use std::fmt;
use std::io;

use execprims_exec::{ExecError, Failure, Outcome};
use execprims_frame::FrameError;
use execprims_transport::TransportError;

// Completed commands exit with their own status; these cover everything else.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const ABNORMAL_TERMINATION: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const PROTOCOL_ERROR: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;
pub const STARTUP_FAILED: i32 = 127;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Process exit code for a finished invocation.
///
/// A failed command's status is passed through only when the OS can carry
/// it intact; anything else (e.g. 256, which would truncate to 0) exits
/// with [`FAILURE`].
pub fn outcome_code(outcome: &Outcome) -> i32 {
    match outcome {
        Outcome::Success(_) => SUCCESS,
        Outcome::Failure(Failure::Exit(output)) if (1..=255).contains(&output.status) => {
            output.status
        }
        Outcome::Failure(Failure::Exit(_)) => FAILURE,
        Outcome::Failure(Failure::Startup(_)) => STARTUP_FAILED,
        Outcome::Failure(Failure::Abnormal(_)) => ABNORMAL_TERMINATION,
    }
}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Spawn { ref source, .. }
            if source.kind() == io::ErrorKind::PermissionDenied =>
        {
            CliError::new(PERMISSION_DENIED, format!("{context}: {err}"))
        }
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::ConnectionClosed => {
            CliError::new(ABNORMAL_TERMINATION, format!("{context}: {err}"))
        }
        other => CliError::new(PROTOCOL_ERROR, format!("{context}: {other}")),
    }
}

pub fn exec_error(context: &str, err: ExecError) -> CliError {
    match err {
        ExecError::Transport(err) => transport_error(context, err),
        ExecError::Frame(err) => frame_error(context, err),
        ExecError::Target(source) => io_error(context, source),
        ExecError::UnexpectedMessage { .. } | ExecError::InvalidText { .. } => {
            CliError::new(PROTOCOL_ERROR, format!("{context}: {err}"))
        }
        ExecError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        ExecError::HelperNotConfigured => CliError::new(USAGE, format!("{context}: {err}")),
        #[cfg(feature = "async")]
        ExecError::Join(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use execprims_exec::Output;
    use execprims_frame::Tag;

    use super::*;

    #[test]
    fn outcome_codes() {
        assert_eq!(outcome_code(&Outcome::Success(Output::default())), SUCCESS);
        let exit = Output {
            status: 7,
            ..Output::default()
        };
        assert_eq!(outcome_code(&Outcome::from_output(exit)), 7);
        assert_eq!(
            outcome_code(&Outcome::Failure(Failure::Startup("x".into()))),
            STARTUP_FAILED
        );
        assert_eq!(
            outcome_code(&Outcome::Failure(Failure::Abnormal(137))),
            ABNORMAL_TERMINATION
        );
    }

    #[test]
    fn exit_status_outside_byte_range_still_fails() {
        for status in [256, 512, -1, i32::MAX, i32::MIN] {
            let outcome = Outcome::from_output(Output {
                status,
                ..Output::default()
            });
            assert_eq!(outcome_code(&outcome), FAILURE, "status {status}");
        }
        let outcome = Outcome::from_output(Output {
            status: 255,
            ..Output::default()
        });
        assert_eq!(outcome_code(&outcome), 255);
    }

    #[test]
    fn exec_error_codes() {
        assert_eq!(
            exec_error("x", ExecError::Timeout(Duration::from_secs(1))).code,
            TIMEOUT
        );
        assert_eq!(
            exec_error(
                "x",
                ExecError::UnexpectedMessage {
                    tag: Tag::Arg,
                    context: "in a response"
                }
            )
            .code,
            PROTOCOL_ERROR
        );
        assert_eq!(
            exec_error("x", ExecError::Frame(FrameError::UnknownTag(42))).code,
            PROTOCOL_ERROR
        );
        assert_eq!(exec_error("x", ExecError::HelperNotConfigured).code, USAGE);
    }

    #[test]
    fn message_carries_context() {
        let err = exec_error("run failed", ExecError::Timeout(Duration::from_millis(5)));
        assert!(err.to_string().starts_with("run failed: "));
    }
}
