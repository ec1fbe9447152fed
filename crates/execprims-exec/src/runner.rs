use std::io::ErrorKind;
use std::thread;
use std::time::{Duration, Instant};

use execprims_frame::{FrameError, FrameReader, FrameWriter};
use execprims_transport::{HelperConfig, HelperHandle, HelperStream};
use tracing::{debug, warn};

use crate::command::{Command, Options};
use crate::config::RunnerConfig;
use crate::error::{ExecError, Result};
use crate::launcher::{Launcher, ProcessLauncher};
use crate::outcome::Outcome;
use crate::request::Request;
use crate::response::ResponseAggregator;

/// Runs commands, one fresh helper per invocation.
///
/// A `Runner` holds no per-invocation state, so one instance can serve any
/// number of independent invocations, including concurrently from several
/// threads when its launcher allows.
#[derive(Debug, Clone)]
pub struct Runner<L = ProcessLauncher> {
    launcher: L,
    config: RunnerConfig,
}

/// Interval between exit checks while reaping under a deadline.
const REAP_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Absolute end of an invocation, with the timeout it came from.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    timeout: Duration,
}

impl Deadline {
    fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
            timeout,
        }
    }

    fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }
}

/// How the conversation with a helper ended.
enum Exchange {
    /// A terminal message arrived.
    Finished(Outcome),
    /// The channel closed first.
    Closed(ResponseAggregator),
}

impl Runner<ProcessLauncher> {
    /// Runner spawning the given helper executable.
    pub fn new(helper: HelperConfig) -> Self {
        Self::with_launcher(ProcessLauncher::new(helper))
    }

    /// Runner for the helper named by `EXECPRIMS_HELPER`.
    pub fn from_env() -> Result<Self> {
        Ok(Self::with_launcher(ProcessLauncher::from_env()?))
    }
}

impl<L: Launcher> Runner<L> {
    /// Runner over a custom launcher.
    pub fn with_launcher(launcher: L) -> Self {
        Self {
            launcher,
            config: RunnerConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Run `program` with no arguments and no options.
    pub fn run(&self, program: &str) -> Result<Outcome> {
        self.execute(&Command::new(program))
    }

    /// Run `program` with arguments and no options.
    pub fn run_with_args<I, S>(&self, program: &str, args: I) -> Result<Outcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.execute(&Command::new(program).args(args))
    }

    /// Run `program` with options and no arguments.
    pub fn run_with_options(&self, program: &str, options: Options) -> Result<Outcome> {
        self.execute(&Command::new(program).options(options))
    }

    /// Run `program` with arguments and options.
    pub fn run_with<I, S>(&self, program: &str, args: I, options: Options) -> Result<Outcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.execute(&Command::new(program).args(args).options(options))
    }

    /// Run one invocation end to end.
    ///
    /// Spawns a helper, transmits the whole request, then blocks until the
    /// helper answers with `Error` or `Eot` or its channel closes. Command
    /// failures are reported in the returned [`Outcome`]; `Err` means the
    /// exchange itself broke down (spawn failure, protocol violation,
    /// timeout). On `Err` the helper has been killed and reaped.
    ///
    /// The response timeout, when set, also bounds reaping the helper. A
    /// helper still running once it has passed is killed; if its response
    /// was already complete the outcome stands, otherwise the invocation
    /// times out.
    pub fn execute(&self, command: &Command) -> Result<Outcome> {
        let request = Request::build(command);
        let deadline = self.config.response_timeout.map(Deadline::after);
        let (stream, mut helper) = self.launcher.launch()?;
        debug!(
            program = command.program(),
            args = command.get_args().len(),
            "starting invocation"
        );

        match self.converse(stream, &request, deadline) {
            Ok(Exchange::Finished(outcome)) => {
                match reap(&mut helper, deadline) {
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        debug!("helper outlived its response, stopping it");
                        abort(&mut helper);
                    }
                    Err(err) => warn!(error = %err, "failed to reap helper"),
                }
                Ok(outcome)
            }
            Ok(Exchange::Closed(aggregator)) => match reap(&mut helper, deadline) {
                Ok(Some(code)) => Ok(aggregator.channel_closed(code)),
                Ok(None) => {
                    abort(&mut helper);
                    Err(ExecError::Timeout(
                        self.config.response_timeout.unwrap_or_default(),
                    ))
                }
                Err(err) => {
                    abort(&mut helper);
                    Err(err)
                }
            },
            Err(err) => {
                abort(&mut helper);
                Err(err)
            }
        }
    }

    /// Send the request and aggregate the response. The channel is closed
    /// when this returns.
    fn converse(
        &self,
        stream: HelperStream,
        request: &Request,
        deadline: Option<Deadline>,
    ) -> Result<Exchange> {
        let frame_config = self.config.frame_config();
        let read_half = stream.try_clone()?;
        let mut writer = FrameWriter::with_config(stream, frame_config.clone());
        let mut reader = FrameReader::with_config(read_half, frame_config);

        match request.write_to(&mut writer) {
            Ok(()) => {}
            // The helper may answer and hang up before reading everything.
            Err(ExecError::Frame(err)) if is_closed(&err) => {
                debug!(error = %err, "helper closed channel during transmission");
            }
            Err(err) => return Err(err),
        }

        let mut aggregator = ResponseAggregator::new();

        loop {
            if let Some(deadline) = deadline {
                let remaining = deadline.remaining();
                if remaining.is_zero() {
                    return Err(ExecError::Timeout(deadline.timeout));
                }
                reader.get_ref().set_read_timeout(Some(remaining))?;
            }

            match reader.read_message() {
                Ok(message) => {
                    if let Some(outcome) = aggregator.feed(message)? {
                        return Ok(Exchange::Finished(outcome));
                    }
                }
                Err(err) if is_closed(&err) => return Ok(Exchange::Closed(aggregator)),
                Err(FrameError::Io(err))
                    if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
                {
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn is_closed(err: &FrameError) -> bool {
    match err {
        FrameError::ConnectionClosed => true,
        FrameError::Io(err) => matches!(
            err.kind(),
            ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
        ),
        _ => false,
    }
}

/// Wait for the helper to exit. With a deadline, gives up once it passes
/// and returns `None`.
fn reap<H: HelperHandle>(helper: &mut H, deadline: Option<Deadline>) -> Result<Option<i32>> {
    let Some(deadline) = deadline else {
        return Ok(Some(helper.wait()?));
    };
    loop {
        if let Some(code) = helper.try_wait()? {
            return Ok(Some(code));
        }
        let remaining = deadline.remaining();
        if remaining.is_zero() {
            return Ok(None);
        }
        thread::sleep(remaining.min(REAP_POLL_INTERVAL));
    }
}

fn abort<H: HelperHandle>(helper: &mut H) {
    if let Err(err) = helper.kill().and_then(|()| helper.wait().map(|_| ())) {
        warn!(error = %err, "failed to stop helper");
    }
}
