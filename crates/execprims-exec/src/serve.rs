//! Helper side of the protocol.
//!
//! Receives one request, runs the target with `std::process`, and answers
//! with either a single `Error` or `ExitStatus`, `Stdout`, `Stderr`, `Eot`.
//! The `execprims helper` subcommand is a thin wrapper around [`serve`].

use std::io::{Read, Write};
use std::process::{Child, Stdio};
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use execprims_frame::{FrameReader, FrameWriter, Message};
use execprims_transport::termination_code;
use tracing::{debug, warn};

use crate::command::Command;
use crate::error::{ExecError, Result};
use crate::outcome::Output;
use crate::request::RequestAssembler;

/// Serve exactly one invocation.
pub fn serve<R: Read, W: Write>(
    reader: &mut FrameReader<R>,
    writer: &mut FrameWriter<W>,
) -> Result<()> {
    let command = receive(reader)?;
    respond(&command, writer)
}

/// Read messages until the request is complete.
pub fn receive<R: Read>(reader: &mut FrameReader<R>) -> Result<Command> {
    let mut assembler = RequestAssembler::new();
    loop {
        if let Some(command) = assembler.feed(reader.read_message()?)? {
            debug!(program = command.program(), "request received");
            return Ok(command);
        }
    }
}

/// Run `command` and send its response.
///
/// A target that cannot be started is reported to the controller with one
/// `Error` message and is not an `Err` here. Failures after the target has
/// started are returned as [`ExecError::Target`]; the caller should then
/// exit without completing the response.
pub fn respond<W: Write>(command: &Command, writer: &mut FrameWriter<W>) -> Result<()> {
    let child = match spawn_target(command) {
        Ok(child) => child,
        Err(err) => {
            let reason = format!("{}: {err}", command.program());
            debug!(%reason, "target failed to start");
            writer.send(&Message::Error(Bytes::from(reason)))?;
            return Ok(());
        }
    };

    let output =
        collect(child, command.get_options().stdin.clone()).map_err(ExecError::Target)?;
    debug!(status = output.status, "target finished");

    writer.send(&Message::ExitStatus(output.status))?;
    writer.send(&Message::Stdout(output.out))?;
    writer.send(&Message::Stderr(output.err))?;
    writer.send(&Message::Eot)?;
    Ok(())
}

fn spawn_target(command: &Command) -> std::io::Result<Child> {
    let options = command.get_options();
    let mut target = std::process::Command::new(command.program());
    target
        .args(command.get_args())
        .stdin(if options.stdin.is_some() {
            Stdio::piped()
        } else {
            // Never let the target see the helper's own stdin: it is the
            // protocol channel.
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(env) = &options.env {
        target.envs(env);
    }
    if let Some(dir) = &options.current_dir {
        target.current_dir(dir);
    }
    target.spawn()
}

fn collect(mut child: Child, input: Option<Bytes>) -> std::io::Result<Output> {
    // Feed stdin from its own thread so a target that writes a lot before
    // reading cannot deadlock against us.
    let feeder = match (child.stdin.take(), input) {
        (Some(mut pipe), Some(input)) => Some(thread::spawn(move || {
            // The target may exit without reading everything.
            if let Err(err) = pipe.write_all(&input) {
                debug!(error = %err, "target closed stdin early");
            }
        })),
        _ => None,
    };

    let output = child.wait_with_output()?;
    if let Some(feeder) = feeder {
        finish_feeder(feeder);
    }

    Ok(Output {
        status: termination_code(output.status),
        out: Bytes::from(output.stdout),
        err: Bytes::from(output.stderr),
    })
}

/// Join the stdin feeder. Returns false if it panicked; the target's
/// output has been collected either way.
fn finish_feeder(feeder: JoinHandle<()>) -> bool {
    match feeder.join() {
        Ok(()) => true,
        Err(_) => {
            warn!("stdin feeder thread panicked");
            false
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;
    use execprims_frame::decode_frame;

    use super::*;
    use crate::request::Request;

    fn exchange(command: &Command) -> Vec<Message> {
        let mut wire = FrameWriter::new(Cursor::new(Vec::new()));
        Request::build(command).write_to(&mut wire).unwrap();
        let mut reader = FrameReader::new(Cursor::new(wire.into_inner().into_inner()));
        let mut writer = FrameWriter::new(Cursor::new(Vec::new()));

        serve(&mut reader, &mut writer).unwrap();

        let mut out = BytesMut::from(writer.into_inner().into_inner().as_slice());
        let mut messages = Vec::new();
        while let Some(payload) = decode_frame(&mut out, usize::MAX).unwrap() {
            messages.push(Message::decode(payload).unwrap());
        }
        messages
    }

    #[test]
    fn successful_target_sends_fields_then_eot() {
        let messages = exchange(&Command::new("echo").arg("john"));
        assert_eq!(
            messages,
            vec![
                Message::ExitStatus(0),
                Message::Stdout(Bytes::from_static(b"john\n")),
                Message::Stderr(Bytes::new()),
                Message::Eot,
            ]
        );
    }

    #[test]
    fn missing_target_sends_only_error() {
        let messages = exchange(&Command::new("/nonexistent/program"));
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            Message::Error(reason) => {
                assert!(String::from_utf8_lossy(reason).starts_with("/nonexistent/program: "));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn stdin_and_stderr_are_wired() {
        let command = Command::new("sh")
            .args(["-c", "cat; echo oops >&2; exit 4"])
            .stdin("piped");
        let messages = exchange(&command);
        assert_eq!(
            messages,
            vec![
                Message::ExitStatus(4),
                Message::Stdout(Bytes::from_static(b"piped")),
                Message::Stderr(Bytes::from_static(b"oops\n")),
                Message::Eot,
            ]
        );
    }

    #[test]
    fn signal_death_reports_128_plus_signal() {
        let messages = exchange(&Command::new("sh").args(["-c", "kill -9 $$"]));
        assert_eq!(messages[0], Message::ExitStatus(128 + 9));
    }

    #[test]
    fn large_stdin_is_not_deadlocked() {
        let input = vec![b'a'; 1 << 20];
        let messages = exchange(&Command::new("cat").stdin(input.clone()));
        assert_eq!(messages[1], Message::Stdout(Bytes::from(input)));
    }

    #[test]
    fn feeder_panic_is_contained() {
        assert!(finish_feeder(thread::spawn(|| {})));
        let panicking: JoinHandle<()> = thread::spawn(|| panic!("feeder failed"));
        assert!(!finish_feeder(panicking));
    }

    #[test]
    fn truncated_request_is_error() {
        let mut wire = FrameWriter::new(Cursor::new(Vec::new()));
        wire.send(&Message::Command(Bytes::from_static(b"echo")))
            .unwrap();
        let mut reader = FrameReader::new(Cursor::new(wire.into_inner().into_inner()));
        let err = receive(&mut reader).unwrap_err();
        assert!(matches!(
            err,
            ExecError::Frame(execprims_frame::FrameError::ConnectionClosed)
        ));
    }
}
