//! Tokio wrapper around [`Runner`].
//!
//! Each invocation still blocks a thread for its whole lifetime; the work
//! is moved onto tokio's blocking pool so independent chains can be awaited
//! concurrently.

use std::sync::Arc;

use crate::chain::Pipeline;
use crate::command::Command;
use crate::error::{ExecError, Result};
use crate::launcher::{Launcher, ProcessLauncher};
use crate::outcome::Outcome;
use crate::runner::Runner;

/// Cheaply cloneable async handle on a [`Runner`].
#[derive(Debug)]
pub struct AsyncRunner<L = ProcessLauncher> {
    inner: Arc<Runner<L>>,
}

impl<L> Clone for AsyncRunner<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L> AsyncRunner<L>
where
    L: Launcher + Send + Sync + 'static,
{
    pub fn new(runner: Runner<L>) -> Self {
        Self {
            inner: Arc::new(runner),
        }
    }

    pub fn runner(&self) -> &Runner<L> {
        &self.inner
    }

    /// Run one invocation on the blocking pool.
    pub async fn execute(&self, command: Command) -> Result<Outcome> {
        let runner = Arc::clone(&self.inner);
        join(tokio::task::spawn_blocking(move || runner.execute(&command)).await)
    }

    /// Async form of [`Runner::pipe`]. A failed `previous` returns without
    /// touching the blocking pool.
    pub async fn pipe(&self, previous: Outcome, command: Command) -> Result<Outcome> {
        if !previous.is_success() {
            return Ok(previous);
        }
        let runner = Arc::clone(&self.inner);
        join(tokio::task::spawn_blocking(move || runner.pipe(previous, command)).await)
    }

    /// Run a whole pipeline on one blocking task.
    pub async fn run_pipeline(&self, pipeline: Pipeline) -> Result<Outcome> {
        let runner = Arc::clone(&self.inner);
        join(tokio::task::spawn_blocking(move || pipeline.run(&*runner)).await)
    }
}

fn join(result: std::result::Result<Result<Outcome>, tokio::task::JoinError>) -> Result<Outcome> {
    result.map_err(|err| ExecError::Join(err.to_string()))?
}

#[cfg(all(test, unix))]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::testing::serve_launcher;

    #[tokio::test]
    async fn execute_on_blocking_pool() {
        let runner = AsyncRunner::new(Runner::with_launcher(serve_launcher()));
        let outcome = runner
            .execute(Command::new("echo").arg("john"))
            .await
            .unwrap();
        assert_eq!(outcome.output().unwrap().out, Bytes::from_static(b"john\n"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn independent_chains_run_concurrently() {
        let runner = AsyncRunner::new(Runner::with_launcher(serve_launcher()));

        let left = {
            let runner = runner.clone();
            async move {
                let first = runner.execute(Command::new("echo").arg("left")).await?;
                runner.pipe(first, Command::new("cat")).await
            }
        };
        let right = {
            let runner = runner.clone();
            async move {
                runner
                    .run_pipeline(
                        Pipeline::new()
                            .stage(Command::new("echo").arg("right"))
                            .stage(Command::new("tr").args(["a-z", "A-Z"])),
                    )
                    .await
            }
        };

        let (left, right) = tokio::join!(left, right);
        assert_eq!(
            left.unwrap().output().unwrap().out,
            Bytes::from_static(b"left\n")
        );
        assert_eq!(
            right.unwrap().output().unwrap().out,
            Bytes::from_static(b"RIGHT\n")
        );
        assert_eq!(runner.runner().launcher().launches(), 4);
    }

    #[tokio::test]
    async fn failed_previous_is_returned_without_spawning() {
        let runner = AsyncRunner::new(Runner::with_launcher(serve_launcher()));
        let failed = runner.execute(Command::new("false")).await.unwrap();
        let chained = runner.pipe(failed.clone(), Command::new("cat")).await.unwrap();
        assert_eq!(chained, failed);
        assert_eq!(runner.runner().launcher().launches(), 1);
    }
}
