//! In-process helpers for driving a `Runner` without an external binary.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use execprims_frame::{FrameReader, FrameWriter};
use execprims_transport::{HelperHandle, HelperStream, TransportError};

use crate::command::Command;
use crate::error::Result;
use crate::launcher::Launcher;
use crate::request::RequestAssembler;

type Script = dyn Fn(&Command, &mut FrameReader<HelperStream>, &mut FrameWriter<HelperStream>) -> i32
    + Send
    + Sync;

/// Launches a helper thread per invocation. The thread assembles the
/// request, runs the script, then closes its end of the channel. The
/// script's return value is the helper's termination code.
#[derive(Clone)]
pub(crate) struct FakeLauncher {
    script: Arc<Script>,
    launches: Arc<AtomicUsize>,
}

impl FakeLauncher {
    pub(crate) fn new<F>(script: F) -> Self
    where
        F: Fn(&Command, &mut FrameReader<HelperStream>, &mut FrameWriter<HelperStream>) -> i32
            + Send
            + Sync
            + 'static,
    {
        Self {
            script: Arc::new(script),
            launches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of helpers launched so far.
    pub(crate) fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for FakeLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FakeLauncher")
            .field("launches", &self.launches())
            .finish()
    }
}

impl Launcher for FakeLauncher {
    type Handle = ThreadHelper;

    fn launch(&self) -> Result<(HelperStream, ThreadHelper)> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        let (controller, helper) = HelperStream::pair()?;
        let control = helper.try_clone()?;
        let script = Arc::clone(&self.script);

        let join = thread::spawn(move || {
            let Ok(read_half) = helper.try_clone() else {
                return 1;
            };
            let mut reader = FrameReader::new(read_half);
            let mut writer = FrameWriter::new(helper);

            let mut assembler = RequestAssembler::new();
            let command = loop {
                match reader.read_message().map(|m| assembler.feed(m)) {
                    Ok(Ok(Some(command))) => break command,
                    Ok(Ok(None)) => continue,
                    _ => return 1,
                }
            };

            let code = script(&command, &mut reader, &mut writer);
            let _ = writer.get_ref().close();
            code
        });

        Ok((
            controller,
            ThreadHelper {
                join: Some(join),
                control,
                killed: false,
                code: None,
            },
        ))
    }
}

/// Handle on a helper thread. A killed helper counts as exited with
/// SIGKILL at once; its thread is detached rather than joined.
pub(crate) struct ThreadHelper {
    join: Option<JoinHandle<i32>>,
    control: HelperStream,
    killed: bool,
    code: Option<i32>,
}

impl HelperHandle for ThreadHelper {
    fn wait(&mut self) -> execprims_transport::Result<i32> {
        if let Some(code) = self.code {
            return Ok(code);
        }
        let code = match self.join.take() {
            Some(_) if self.killed => 128 + 9,
            Some(join) => join.join().unwrap_or(101),
            None => return Err(TransportError::Unsupported),
        };
        self.code = Some(code);
        Ok(code)
    }

    fn try_wait(&mut self) -> execprims_transport::Result<Option<i32>> {
        let finished = match &self.join {
            Some(join) => self.killed || join.is_finished(),
            None => true,
        };
        if finished {
            self.wait().map(Some)
        } else {
            Ok(None)
        }
    }

    fn kill(&mut self) -> execprims_transport::Result<()> {
        if self.code.is_none() {
            self.killed = true;
            self.control.close()?;
        }
        Ok(())
    }
}

/// A launcher whose helper thread runs the real helper logic.
pub(crate) fn serve_launcher() -> FakeLauncher {
    FakeLauncher::new(|command, _, writer| match crate::serve::respond(command, writer) {
        Ok(()) => 0,
        Err(_) => 1,
    })
}
