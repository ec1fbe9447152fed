use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Child, ExitStatus};

use tracing::{debug, warn};

use crate::error::{Result, TransportError};
use crate::traits::HelperStream;

/// Environment variable naming the helper executable.
pub const HELPER_ENV_VAR: &str = "EXECPRIMS_HELPER";

/// How to start the helper executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperConfig {
    /// Path (or bare name resolved through `PATH`) of the helper.
    pub program: PathBuf,
    /// Arguments passed to the helper itself, not to the target command.
    pub args: Vec<OsString>,
    /// Let the helper write diagnostics to our stderr. When false its
    /// stderr is discarded.
    pub inherit_stderr: bool,
}

impl HelperConfig {
    /// Helper at `program` with no extra arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            inherit_stderr: true,
        }
    }

    /// Append an argument for the helper.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Control whether the helper inherits our stderr.
    pub fn inherit_stderr(mut self, inherit: bool) -> Self {
        self.inherit_stderr = inherit;
        self
    }

    /// Read the helper location from `EXECPRIMS_HELPER`.
    ///
    /// Returns `None` when the variable is unset or empty.
    pub fn from_env() -> Option<Self> {
        Self::from_env_value(std::env::var_os(HELPER_ENV_VAR))
    }

    fn from_env_value(value: Option<OsString>) -> Option<Self> {
        value.filter(|v| !v.is_empty()).map(Self::new)
    }
}

/// The process on the far side of a helper channel.
///
/// Only consulted once the channel is finished with: to reap the helper
/// after a proper handshake, to learn its termination code after an abrupt
/// close, or to stop it when the caller gives up waiting.
pub trait HelperHandle {
    /// Block until the helper exits and return its termination code.
    ///
    /// The code is the exit status, or `128 + signal` when the helper was
    /// killed by a signal.
    fn wait(&mut self) -> Result<i32>;

    /// Termination code if the helper has already exited, without blocking.
    fn try_wait(&mut self) -> Result<Option<i32>>;

    /// Forcibly terminate the helper and everything it started. Succeeds if
    /// it already exited.
    fn kill(&mut self) -> Result<()>;
}

/// A spawned helper process.
///
/// On Unix the helper leads its own process group, which the target
/// commands it starts inherit, so [`HelperHandle::kill`] takes them down
/// with it. Dropping an unreaped `HelperProcess` kills and reaps it.
pub struct HelperProcess {
    child: Child,
    program: PathBuf,
    code: Option<i32>,
}

impl HelperProcess {
    /// Spawn the helper and return it with the controller's end of its
    /// channel.
    ///
    /// The helper's stdin and stdout are both the other end of a fresh
    /// socket pair.
    #[cfg(unix)]
    pub fn spawn(config: &HelperConfig) -> Result<(Self, HelperStream)> {
        use std::os::fd::OwnedFd;
        use std::os::unix::net::UnixStream;
        use std::os::unix::process::CommandExt;
        use std::process::{Command, Stdio};

        let (parent_end, child_end) = UnixStream::pair().map_err(TransportError::Channel)?;
        let child_out = child_end.try_clone().map_err(TransportError::Channel)?;

        let mut command = Command::new(&config.program);
        command
            .args(&config.args)
            .stdin(Stdio::from(OwnedFd::from(child_end)))
            .stdout(Stdio::from(OwnedFd::from(child_out)))
            .stderr(if config.inherit_stderr {
                Stdio::inherit()
            } else {
                Stdio::null()
            })
            .process_group(0);

        let spawned = command.spawn();
        // The command owns our copies of the child's end; they must be
        // closed for helper exit to surface as EOF.
        drop(command);

        let child = spawned.map_err(|source| TransportError::Spawn {
            program: config.program.clone(),
            source,
        })?;
        debug!(pid = child.id(), program = ?config.program, "spawned helper process");

        Ok((
            Self {
                child,
                program: config.program.clone(),
                code: None,
            },
            HelperStream::from_unix(parent_end),
        ))
    }

    /// Spawn the helper and return it with the controller's end of its
    /// channel.
    #[cfg(not(unix))]
    pub fn spawn(config: &HelperConfig) -> Result<(Self, HelperStream)> {
        let _ = config;
        Err(TransportError::Unsupported)
    }

    /// OS process id of the helper.
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// The helper executable this process was started from.
    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl HelperHandle for HelperProcess {
    fn wait(&mut self) -> Result<i32> {
        if let Some(code) = self.code {
            return Ok(code);
        }
        let pid = self.child.id();
        let status = self
            .child
            .wait()
            .map_err(|source| TransportError::Wait { pid, source })?;
        let code = termination_code(status);
        debug!(pid, code, "helper process exited");
        self.code = Some(code);
        Ok(code)
    }

    fn try_wait(&mut self) -> Result<Option<i32>> {
        if let Some(code) = self.code {
            return Ok(Some(code));
        }
        let pid = self.child.id();
        let status = self
            .child
            .try_wait()
            .map_err(|source| TransportError::Wait { pid, source })?;
        Ok(status.map(|status| {
            let code = termination_code(status);
            debug!(pid, code, "helper process exited");
            self.code = Some(code);
            code
        }))
    }

    fn kill(&mut self) -> Result<()> {
        if self.code.is_some() {
            return Ok(());
        }
        let pid = self.child.id();
        kill_process_group(pid);
        match self.child.kill() {
            Ok(()) => {
                debug!(pid, "killed helper process");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
            Err(source) => Err(TransportError::Wait { pid, source }),
        }
    }
}

/// SIGKILL the group led by `pid`. The group outlives its leader while a
/// target is still running, so this is sent even if the helper is gone.
#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg takes plain integers and touches no memory of ours.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc == 0 {
        debug!(pgid, "killed helper process group");
    } else {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            warn!(pgid, error = %err, "failed to kill helper process group");
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

impl Drop for HelperProcess {
    fn drop(&mut self) {
        if self.code.is_some() {
            return;
        }
        if let Ok(Some(_)) = self.child.try_wait() {
            return;
        }
        if let Err(err) = self.kill().and_then(|()| self.wait().map(|_| ())) {
            warn!(pid = self.child.id(), error = %err, "failed to reap helper process");
        }
    }
}

impl std::fmt::Debug for HelperProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelperProcess")
            .field("pid", &self.child.id())
            .field("program", &self.program)
            .field("code", &self.code)
            .finish()
    }
}

/// Exit code of a finished process, or `128 + signal` if it was killed.
pub fn termination_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}
