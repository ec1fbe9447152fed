use execprims_frame::Message;
use tracing::debug;

use crate::error::{ExecError, Result};
use crate::outcome::{Failure, Outcome, Output};

/// Folds response messages into an [`Outcome`].
///
/// `ExitStatus`, `Stdout` and `Stderr` overwrite their field in any order
/// and any number of times. `Error` and `Eot` are terminal. A closed channel
/// is terminal too, but it is not a message: report it with
/// [`channel_closed`](Self::channel_closed).
#[derive(Debug, Default)]
pub struct ResponseAggregator {
    output: Output,
    finished: bool,
}

impl ResponseAggregator {
    /// Aggregator over `{status: 0, out: empty, err: empty}`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one message. Returns the outcome once a terminal message
    /// arrives.
    pub fn feed(&mut self, message: Message) -> Result<Option<Outcome>> {
        let tag = message.tag();
        if self.finished {
            return Err(ExecError::UnexpectedMessage {
                tag,
                context: "after end of response",
            });
        }

        match message {
            Message::ExitStatus(code) => self.output.status = code,
            Message::Stdout(out) => self.output.out = out,
            Message::Stderr(err) => self.output.err = err,
            Message::Error(reason) => {
                self.finished = true;
                let reason = String::from_utf8_lossy(&reason).into_owned();
                debug!(%reason, "helper reported startup failure");
                return Ok(Some(Outcome::Failure(Failure::Startup(reason))));
            }
            Message::Eot => {
                self.finished = true;
                let output = std::mem::take(&mut self.output);
                debug!(status = output.status, "response complete");
                return Ok(Some(Outcome::from_output(output)));
            }
            Message::Command(_)
            | Message::Arg(_)
            | Message::Stdin(_)
            | Message::Env { .. }
            | Message::CurrentDir(_) => {
                return Err(ExecError::UnexpectedMessage {
                    tag,
                    context: "in a response",
                })
            }
        }
        Ok(None)
    }

    /// The channel closed before a terminal message. `code` is the helper's
    /// termination code.
    pub fn channel_closed(self, code: i32) -> Outcome {
        debug!(code, "helper channel closed abnormally");
        Outcome::Failure(Failure::Abnormal(code))
    }

    /// Whether a terminal message has been consumed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fields accumulated so far.
    pub fn output(&self) -> &Output {
        &self.output
    }
}
