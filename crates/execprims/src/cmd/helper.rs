use std::io;

use execprims_exec::serve;
use execprims_frame::{FrameReader, FrameWriter};

use crate::cmd::HelperArgs;
use crate::exit::{exec_error, CliResult, SUCCESS};

/// Serve one request over stdin/stdout.
///
/// Nothing else may write to stdout here; diagnostics go to stderr.
pub fn run(_args: HelperArgs) -> CliResult<i32> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut reader = FrameReader::new(stdin.lock());
    let mut writer = FrameWriter::new(stdout.lock());

    serve(&mut reader, &mut writer).map_err(|err| exec_error("helper failed", err))?;
    Ok(SUCCESS)
}
