use std::collections::BTreeMap;

use serde::Serialize;

use execprims_transport::HELPER_ENV_VAR;

use crate::cmd::{Context, EnvinfoArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct PlatformInfo {
    os: String,
    arch: String,
}

#[derive(Serialize)]
struct HelperInfo {
    program: String,
    args: Vec<String>,
}

#[derive(Serialize)]
struct EnvInfoOutput {
    version: String,
    target: String,
    rust_version: String,
    git_hash: String,
    platform: PlatformInfo,
    features: Vec<String>,
    helper: Option<HelperInfo>,
    dependencies: BTreeMap<String, String>,
    environment: BTreeMap<String, Option<String>>,
}

pub fn run(_args: EnvinfoArgs, ctx: &Context) -> CliResult<i32> {
    let mut deps = BTreeMap::new();
    deps.insert("bytes".to_string(), "1".to_string());
    deps.insert("clap".to_string(), "4.5".to_string());
    deps.insert("tracing-subscriber".to_string(), "0.3".to_string());

    let mut env = BTreeMap::new();
    env.insert(
        HELPER_ENV_VAR.to_string(),
        std::env::var(HELPER_ENV_VAR).ok(),
    );
    env.insert("PATH".to_string(), std::env::var("PATH").ok());

    // A helper that cannot be resolved is reported as absent, not an error.
    let helper = ctx.helper_config().ok().map(|config| HelperInfo {
        program: config.program.display().to_string(),
        args: config
            .args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect(),
    });

    let output = EnvInfoOutput {
        version: env!("CARGO_PKG_VERSION").to_string(),
        target: target_triple(),
        rust_version: option_env!("RUSTC_VERSION")
            .unwrap_or("unknown")
            .to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        platform: PlatformInfo {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        },
        features: active_features(),
        helper,
        dependencies: deps,
        environment: env,
    };

    print_envinfo(&output, ctx.format);
    Ok(SUCCESS)
}

fn target_triple() -> String {
    if let Some(target) = option_env!("EXECPRIMS_BUILD_TARGET") {
        return target.to_string();
    }

    match (std::env::consts::ARCH, std::env::consts::OS) {
        ("aarch64", "macos") => "aarch64-apple-darwin".to_string(),
        ("x86_64", "macos") => "x86_64-apple-darwin".to_string(),
        ("aarch64", "linux") => "aarch64-unknown-linux-gnu".to_string(),
        ("x86_64", "linux") => "x86_64-unknown-linux-gnu".to_string(),
        ("x86_64", "windows") => "x86_64-pc-windows-msvc".to_string(),
        (arch, os) => format!("{arch}-unknown-{os}"),
    }
}

fn print_envinfo(output: &EnvInfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("execprims environment\n");
            println!("  Version:    {}", output.version);
            println!("  Target:     {}", output.target);
            println!("  Rust:       {}", output.rust_version);
            println!("  Git hash:   {}", output.git_hash);
            println!(
                "  Platform:   {} ({})",
                output.platform.os, output.platform.arch
            );
            println!("  Features:   {}", output.features.join(", "));
            match &output.helper {
                Some(helper) if helper.args.is_empty() => {
                    println!("  Helper:     {}", helper.program)
                }
                Some(helper) => {
                    println!("  Helper:     {} {}", helper.program, helper.args.join(" "))
                }
                None => println!("  Helper:     (unresolved)"),
            }
            println!("\n  Dependencies:");
            for (k, v) in &output.dependencies {
                println!("    {:<12} {}", k, v);
            }
            println!("\n  Environment:");
            for (k, v) in &output.environment {
                println!("    {:<20} {}", k, v.as_deref().unwrap_or("(not set)"));
            }
        }
        OutputFormat::Raw => println!("{}", output.version),
    }
}

fn active_features() -> Vec<String> {
    let mut features = Vec::new();
    if cfg!(feature = "exec") {
        features.push("exec".to_string());
    }
    if cfg!(feature = "async") {
        features.push("async".to_string());
    }
    if cfg!(feature = "cli") {
        features.push("cli".to_string());
    }
    features
}
