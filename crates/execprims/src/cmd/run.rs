use execprims_exec::{Command, Options};
use tracing::debug;

use crate::cmd::{Context, RunArgs};
use crate::exit::{exec_error, outcome_code, CliError, CliResult, USAGE};
use crate::output::print_outcome;

pub fn run(args: RunArgs, ctx: &Context) -> CliResult<i32> {
    let command = build_command(&args)?;
    let runner = ctx.runner()?;
    debug!(program = command.program(), "running command");

    let outcome = runner
        .execute(&command)
        .map_err(|err| exec_error("run failed", err))?;

    print_outcome(&outcome, ctx.format);
    Ok(outcome_code(&outcome))
}

fn build_command(args: &RunArgs) -> CliResult<Command> {
    let (program, rest) = args
        .command
        .split_first()
        .ok_or_else(|| CliError::new(USAGE, "missing program"))?;

    let mut options = Options::new();
    if let Some(input) = args.stdin.resolve()? {
        options = options.stdin(input);
    }
    if !args.env.is_empty() {
        options = options.envs(args.env.iter().cloned());
    }
    if let Some(dir) = &args.cwd {
        options = options.current_dir(dir.clone());
    }

    Ok(Command::new(program.clone())
        .args(rest.iter().cloned())
        .options(options))
}
