//! Run `printf | sort | uniq -c` through a helper, one stage at a time.
//!
//! Run with:
//!   cargo build --features cli
//!   cargo run --example pipeline --features exec -- target/debug/execprims helper
//!
//! With no arguments the helper is taken from `EXECPRIMS_HELPER`.

use execprims::exec::{Command, Outcome, Pipeline, Runner};
use execprims::transport::HelperConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args_os().skip(1);
    let runner = match args.next() {
        Some(program) => Runner::new(args.fold(HelperConfig::new(program), HelperConfig::arg)),
        None => Runner::from_env()?,
    };

    let pipeline = Pipeline::new()
        .stage(Command::new("printf").arg("pear\napple\npear\nfig\n"))
        .stage(Command::new("sort"))
        .stage(Command::new("uniq").arg("-c"));
    eprintln!("Running {} stages", pipeline.len());

    match pipeline.run(&runner)? {
        Outcome::Success(output) => print!("{}", output.out_lossy()),
        Outcome::Failure(failure) => {
            eprintln!("Pipeline failed: {failure}");
            std::process::exit(failure.code().clamp(1, 255));
        }
    }
    Ok(())
}
