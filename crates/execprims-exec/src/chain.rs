use tracing::debug;

use crate::command::Command;
use crate::error::Result;
use crate::launcher::Launcher;
use crate::outcome::{Outcome, Output};
use crate::runner::Runner;

impl<L: Launcher> Runner<L> {
    /// Run `command` as the next stage after `previous`.
    ///
    /// When `previous` succeeded its standard output becomes `command`'s
    /// standard input. The piped value replaces any stdin already set on
    /// `command`. When `previous` failed it is returned unchanged and no
    /// helper is spawned.
    pub fn pipe(&self, previous: Outcome, mut command: Command) -> Result<Outcome> {
        match previous {
            Outcome::Success(output) => {
                if command.replace_stdin(output.out).is_some() {
                    debug!(
                        program = command.program(),
                        "piped output replaces explicit stdin"
                    );
                }
                self.execute(&command)
            }
            failure => {
                debug!(
                    program = command.program(),
                    "previous stage failed, skipping"
                );
                Ok(failure)
            }
        }
    }
}

impl Outcome {
    /// Feed this outcome into `command`. See [`Runner::pipe`].
    pub fn pipe<L: Launcher>(self, runner: &Runner<L>, command: Command) -> Result<Outcome> {
        runner.pipe(self, command)
    }
}

/// A sequence of commands run strictly one after another, each stage
/// reading the previous stage's output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Command>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    pub fn stage(mut self, command: Command) -> Self {
        self.stages.push(command);
        self
    }

    pub fn stages(&self) -> &[Command] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage.
    ///
    /// The first stage keeps its own options, stdin included. Stops at the
    /// first failure and returns it; later stages never start. An empty
    /// pipeline succeeds with empty output.
    pub fn run<L: Launcher>(&self, runner: &Runner<L>) -> Result<Outcome> {
        let mut stages = self.stages.iter();
        let Some(first) = stages.next() else {
            return Ok(Outcome::Success(Output::default()));
        };

        let mut outcome = runner.execute(first)?;
        for stage in stages {
            if !outcome.is_success() {
                break;
            }
            outcome = runner.pipe(outcome, stage.clone())?;
        }
        Ok(outcome)
    }
}

impl FromIterator<Command> for Pipeline {
    fn from_iter<I: IntoIterator<Item = Command>>(iter: I) -> Self {
        Self {
            stages: iter.into_iter().collect(),
        }
    }
}
