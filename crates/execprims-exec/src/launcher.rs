use execprims_transport::{HelperConfig, HelperHandle, HelperProcess, HelperStream};

use crate::error::{ExecError, Result};

/// Starts one helper per invocation.
///
/// Each launch yields a fresh channel and the handle of the process behind
/// it. Nothing is shared between launches.
pub trait Launcher {
    type Handle: HelperHandle;

    fn launch(&self) -> Result<(HelperStream, Self::Handle)>;
}

/// Launches the helper as an OS child process.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    config: HelperConfig,
}

impl ProcessLauncher {
    pub fn new(config: HelperConfig) -> Self {
        Self { config }
    }

    /// Launcher for the helper named by `EXECPRIMS_HELPER`.
    pub fn from_env() -> Result<Self> {
        HelperConfig::from_env()
            .map(Self::new)
            .ok_or(ExecError::HelperNotConfigured)
    }

    pub fn config(&self) -> &HelperConfig {
        &self.config
    }
}

impl Launcher for ProcessLauncher {
    type Handle = HelperProcess;

    fn launch(&self) -> Result<(HelperStream, HelperProcess)> {
        let (process, stream) = HelperProcess::spawn(&self.config)?;
        Ok((stream, process))
    }
}
