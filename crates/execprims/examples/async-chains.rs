//! Run independent chains concurrently on tokio's blocking pool.
//!
//! Run with:
//!   cargo build --features cli
//!   cargo run --example async-chains --features exec,async -- target/debug/execprims helper
//!
//! With no arguments the helper is taken from `EXECPRIMS_HELPER`.

use execprims::exec::{AsyncRunner, Command, Runner};
use execprims::transport::HelperConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args_os().skip(1);
    let runner = match args.next() {
        Some(program) => Runner::new(args.fold(HelperConfig::new(program), HelperConfig::arg)),
        None => Runner::from_env()?,
    };
    let runner = AsyncRunner::new(runner);

    let mut chains = Vec::new();
    for word in ["john", "rambo", "trautman"] {
        let runner = runner.clone();
        chains.push(tokio::spawn(async move {
            let echoed = runner.execute(Command::new("echo").arg(word)).await?;
            runner
                .pipe(echoed, Command::new("tr").args(["a-z", "A-Z"]))
                .await
        }));
    }

    for chain in chains {
        let outcome = chain.await??;
        match outcome.output() {
            Some(output) if outcome.is_success() => print!("{}", output.out_lossy()),
            _ => eprintln!("Chain failed: {outcome:?}"),
        }
    }
    Ok(())
}
