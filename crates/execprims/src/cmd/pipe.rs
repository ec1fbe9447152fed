use execprims_exec::{Command, Pipeline};
use tracing::debug;

use crate::cmd::{Context, PipeArgs};
use crate::exit::{exec_error, outcome_code, CliError, CliResult, USAGE};
use crate::output::print_outcome;

/// Token separating pipeline stages.
const STAGE_SEPARATOR: &str = "|";

pub fn run(args: PipeArgs, ctx: &Context) -> CliResult<i32> {
    let mut stages = split_stages(&args.stages)?;
    if let Some(input) = args.stdin.resolve()? {
        if let Some(first) = stages.first_mut() {
            *first = first.clone().stdin(input);
        }
    }

    let pipeline: Pipeline = stages.into_iter().collect();
    debug!(stages = pipeline.len(), "running pipeline");

    let runner = ctx.runner()?;
    let outcome = pipeline
        .run(&runner)
        .map_err(|err| exec_error("pipe failed", err))?;

    print_outcome(&outcome, ctx.format);
    Ok(outcome_code(&outcome))
}

fn split_stages(tokens: &[String]) -> CliResult<Vec<Command>> {
    tokens
        .split(|token| token == STAGE_SEPARATOR)
        .enumerate()
        .map(|(index, stage)| match stage.split_first() {
            Some((program, args)) => Ok(Command::new(program.clone()).args(args.iter().cloned())),
            None => Err(CliError::new(
                USAGE,
                format!("pipeline stage {} is empty", index + 1),
            )),
        })
        .collect()
}
