use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use execprims_exec::{Runner, RunnerConfig};
use execprims_transport::HelperConfig;

use crate::exit::{io_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod envinfo;
pub mod helper;
pub mod pipe;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one command through a fresh helper.
    Run(RunArgs),
    /// Run commands as a pipeline: `pipe -- A ARGS '|' B ARGS ...`.
    Pipe(PipeArgs),
    /// Serve one request on stdin/stdout (the helper side of the protocol).
    Helper(HelperArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Print build and environment diagnostics.
    Envinfo(EnvinfoArgs),
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Context {
    pub format: OutputFormat,
    /// Explicit helper executable. Defaults to this binary's `helper`
    /// subcommand.
    pub helper: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl Context {
    pub fn helper_config(&self) -> CliResult<HelperConfig> {
        if let Some(path) = &self.helper {
            return Ok(HelperConfig::new(path));
        }
        let exe = std::env::current_exe()
            .map_err(|err| io_error("cannot locate execprims executable", err))?;
        Ok(HelperConfig::new(exe).arg("helper"))
    }

    pub fn runner(&self) -> CliResult<Runner> {
        let config = RunnerConfig {
            response_timeout: self.timeout,
            ..RunnerConfig::default()
        };
        Ok(Runner::new(self.helper_config()?).with_config(config))
    }
}

pub fn run(command: Command, ctx: &Context) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, ctx),
        Command::Pipe(args) => pipe::run(args, ctx),
        Command::Helper(args) => helper::run(args),
        Command::Version(args) => version::run(args),
        Command::Envinfo(args) => envinfo::run(args, ctx),
    }
}

/// Where a command's standard input comes from.
#[derive(Args, Debug, Default)]
pub struct StdinArgs {
    /// Literal standard input for the (first) command.
    #[arg(long, value_name = "TEXT", conflicts_with = "stdin_file")]
    pub stdin_data: Option<String>,
    /// Read standard input for the (first) command from a file.
    #[arg(long, value_name = "FILE", conflicts_with = "stdin_data")]
    pub stdin_file: Option<PathBuf>,
}

impl StdinArgs {
    pub fn resolve(&self) -> CliResult<Option<Vec<u8>>> {
        if let Some(data) = &self.stdin_data {
            return Ok(Some(data.as_bytes().to_vec()));
        }
        if let Some(path) = &self.stdin_file {
            return fs::read(path)
                .map(Some)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
        }
        Ok(None)
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub stdin: StdinArgs,
    /// Environment override (repeatable).
    #[arg(long = "env", short = 'e', value_name = "NAME=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,
    /// Working directory for the command.
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<String>,
    /// Program and its arguments.
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    pub command: Vec<String>,
}

#[derive(Args, Debug)]
pub struct PipeArgs {
    #[command(flatten)]
    pub stdin: StdinArgs,
    /// Stages separated by a literal `|` argument.
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "STAGES"
    )]
    pub stages: Vec<String>,
}

#[derive(Args, Debug, Default)]
pub struct HelperArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct EnvinfoArgs {}

pub fn parse_env_pair(input: &str) -> Result<(String, String), String> {
    match input.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got `{input}`")),
    }
}

pub fn parse_timeout(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else if let Some(num) = input.strip_suffix('m') {
        (num, "m")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "m" => Ok(Duration::from_secs(value.saturating_mul(60))),
        _ => Ok(Duration::from_secs(value)),
    }
}
