mod cmd;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::cmd::{parse_timeout, Command, Context};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "execprims",
    version,
    about = "Run commands through a helper process"
)]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Helper executable. Defaults to this binary's `helper` subcommand.
    #[arg(long, value_name = "PATH", env = "EXECPRIMS_HELPER", global = true)]
    helper: Option<PathBuf>,

    /// Give up on a command after this long (e.g. 5s, 500ms, 2m).
    #[arg(long, value_name = "DURATION", global = true)]
    timeout: Option<String>,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let result = cli
        .timeout
        .as_deref()
        .map(parse_timeout)
        .transpose()
        .and_then(|timeout| {
            let ctx = Context {
                format: cli.format.unwrap_or_else(OutputFormat::default_for_stdout),
                helper: cli.helper,
                timeout,
            };
            cmd::run(cli.command, &ctx)
        });

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_trailing_command() {
        let cli = Cli::try_parse_from([
            "execprims",
            "run",
            "--env",
            "JOHN=rambo",
            "--cwd",
            "/tmp",
            "--",
            "echo",
            "-n",
            "john",
        ])
        .expect("run args should parse");

        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.command, ["echo", "-n", "john"]);
                assert_eq!(args.env, [("JOHN".to_string(), "rambo".to_string())]);
                assert_eq!(args.cwd.as_deref(), Some("/tmp"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_pipe_stages() {
        let cli = Cli::try_parse_from([
            "execprims", "pipe", "--", "echo", "john", "|", "tr", "a-z", "A-Z",
        ])
        .expect("pipe args should parse");

        match cli.command {
            Command::Pipe(args) => {
                assert_eq!(args.stages, ["echo", "john", "|", "tr", "a-z", "A-Z"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_conflicting_stdin_args() {
        let err = Cli::try_parse_from([
            "execprims",
            "run",
            "--stdin-data",
            "x",
            "--stdin-file",
            "/tmp/x",
            "--",
            "cat",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn rejects_malformed_env_pair() {
        let err = Cli::try_parse_from(["execprims", "run", "--env", "novalue", "--", "env"])
            .expect_err("malformed env should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "execprims",
            "run",
            "--timeout",
            "2s",
            "--format",
            "raw",
            "--helper",
            "/opt/helper",
            "--",
            "true",
        ])
        .expect("global flags should parse");

        assert_eq!(cli.timeout.as_deref(), Some("2s"));
        assert_eq!(cli.format, Some(OutputFormat::Raw));
        assert_eq!(cli.helper, Some(PathBuf::from("/opt/helper")));
    }

    #[test]
    fn parses_helper_subcommand() {
        let cli = Cli::try_parse_from(["execprims", "helper"]).expect("helper should parse");
        assert!(matches!(cli.command, Command::Helper(_)));
    }
}
