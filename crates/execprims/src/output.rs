use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use execprims_exec::{Failure, Outcome};
use serde::Serialize;

use crate::exit::outcome_code;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize, Debug, PartialEq)]
struct OutcomeOutput {
    outcome: &'static str,
    exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    helper_code: Option<i32>,
}

impl OutcomeOutput {
    fn from_outcome(outcome: &Outcome) -> Self {
        let mut out = Self {
            outcome: outcome_name(outcome),
            exit_code: outcome_code(outcome),
            status: None,
            stdout: None,
            stderr: None,
            reason: None,
            helper_code: None,
        };
        if let Some(output) = outcome.output() {
            out.status = Some(output.status);
            out.stdout = Some(payload_preview(&output.out));
            out.stderr = Some(payload_preview(&output.err));
        }
        match outcome {
            Outcome::Failure(Failure::Startup(reason)) => out.reason = Some(reason.clone()),
            Outcome::Failure(Failure::Abnormal(code)) => out.helper_code = Some(*code),
            _ => {}
        }
        out
    }
}

pub fn print_outcome(outcome: &Outcome, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = OutcomeOutput::from_outcome(outcome);
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let out = OutcomeOutput::from_outcome(outcome);
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["OUTCOME", "STATUS", "STDOUT", "STDERR"])
                .add_row(vec![
                    out.outcome.to_string(),
                    out.status
                        .or(out.helper_code)
                        .map_or_else(|| "-".to_string(), |s| s.to_string()),
                    out.stdout.unwrap_or_default(),
                    out.stderr.or(out.reason).unwrap_or_default(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => match outcome {
            Outcome::Success(output) | Outcome::Failure(Failure::Exit(output)) => {
                println!(
                    "outcome={} status={} stdout={}B stderr={}B",
                    outcome_name(outcome),
                    output.status,
                    output.out.len(),
                    output.err.len()
                );
                print_section("stdout", &output.out);
                print_section("stderr", &output.err);
            }
            Outcome::Failure(Failure::Startup(reason)) => {
                println!("outcome=startup reason={reason}");
            }
            Outcome::Failure(Failure::Abnormal(code)) => {
                println!("outcome=abnormal helper_code={code}");
            }
        },
        OutputFormat::Raw => match outcome {
            Outcome::Success(output) | Outcome::Failure(Failure::Exit(output)) => {
                print_raw(&output.out);
                let mut err = std::io::stderr();
                let _ = err.write_all(&output.err);
                let _ = err.flush();
            }
            Outcome::Failure(failure) => eprintln!("{failure}"),
        },
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_section(name: &str, data: &[u8]) {
    if data.is_empty() {
        return;
    }
    println!("--- {name} ---");
    let text = payload_preview(data);
    print!("{text}");
    if !text.ends_with('\n') {
        println!();
    }
}

pub fn outcome_name(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Success(_) => "success",
        Outcome::Failure(Failure::Exit(_)) => "exit",
        Outcome::Failure(Failure::Startup(_)) => "startup",
        Outcome::Failure(Failure::Abnormal(_)) => "abnormal",
    }
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}
