use std::collections::BTreeMap;
use std::io::Write;

use bytes::Bytes;
use execprims_frame::{FrameWriter, Message, Tag};
use tracing::debug;

use crate::command::{Command, Options};
use crate::error::{ExecError, Result};

/// The complete outgoing message sequence for one invocation.
///
/// Always `Command`, then one `Arg` per argument, then the present options
/// (`Stdin`, `Env`..., `CurrentDir`), then `Eot`. A `Request` is sealed:
/// nothing can be appended after its `Eot`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    messages: Vec<Message>,
}

impl Request {
    /// Build the message sequence for `command`.
    pub fn build(command: &Command) -> Self {
        Self::from_parts(command.program(), command.get_args(), command.get_options())
    }

    /// Build the message sequence from its three parts.
    pub fn from_parts<S: AsRef<str>>(program: &str, args: &[S], options: &Options) -> Self {
        let env_len = options.env.as_ref().map_or(0, BTreeMap::len);
        let mut messages = Vec::with_capacity(args.len() + env_len + 4);

        messages.push(Message::Command(text(program)));
        messages.extend(args.iter().map(|arg| Message::Arg(text(arg.as_ref()))));
        if let Some(stdin) = &options.stdin {
            messages.push(Message::Stdin(stdin.clone()));
        }
        if let Some(env) = &options.env {
            messages.extend(
                env.iter()
                    .map(|(name, value)| Message::env(text(name), text(value))),
            );
        }
        if let Some(dir) = &options.current_dir {
            messages.push(Message::CurrentDir(text(dir)));
        }
        messages.push(Message::Eot);

        Self { messages }
    }

    /// Messages in emission order. The last one is always `Eot`.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Never true: a request holds at least `Command` and `Eot`.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Send every message, in order, without waiting for any reply.
    pub fn write_to<W: Write>(&self, writer: &mut FrameWriter<W>) -> Result<()> {
        for message in &self.messages {
            writer.send(message)?;
        }
        debug!(messages = self.messages.len(), "request transmitted");
        Ok(())
    }
}

fn text(value: &str) -> Bytes {
    Bytes::copy_from_slice(value.as_bytes())
}

/// Folds an incoming request back into a [`Command`].
///
/// The helper-side inverse of [`Request::build`].
#[derive(Debug, Default)]
pub struct RequestAssembler {
    program: Option<String>,
    args: Vec<String>,
    options: Options,
    done: bool,
}

impl RequestAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one message. Returns the finished command once `Eot`
    /// arrives.
    pub fn feed(&mut self, message: Message) -> Result<Option<Command>> {
        let tag = message.tag();
        if self.done {
            return Err(ExecError::UnexpectedMessage {
                tag,
                context: "after end of request",
            });
        }

        match (self.program.is_some(), message) {
            (false, Message::Command(program)) => self.program = Some(utf8(tag, program)?),
            (false, _) => {
                return Err(ExecError::UnexpectedMessage {
                    tag,
                    context: "before command",
                })
            }
            (true, Message::Command(_)) => {
                return Err(ExecError::UnexpectedMessage {
                    tag,
                    context: "after command",
                })
            }
            (true, Message::Arg(arg)) => self.args.push(utf8(tag, arg)?),
            (true, Message::Stdin(input)) => self.options.stdin = Some(input),
            (true, Message::Env { name, value }) => {
                self.options
                    .env
                    .get_or_insert_with(BTreeMap::new)
                    .insert(utf8(tag, name)?, utf8(tag, value)?);
            }
            (true, Message::CurrentDir(dir)) => self.options.current_dir = Some(utf8(tag, dir)?),
            (true, Message::Eot) => {
                self.done = true;
                let command = Command::new(self.program.take().unwrap_or_default())
                    .args(std::mem::take(&mut self.args))
                    .options(std::mem::take(&mut self.options));
                return Ok(Some(command));
            }
            (
                true,
                Message::Error(_) | Message::ExitStatus(_) | Message::Stdout(_) | Message::Stderr(_),
            ) => {
                return Err(ExecError::UnexpectedMessage {
                    tag,
                    context: "in a request",
                })
            }
        }
        Ok(None)
    }
}

fn utf8(tag: Tag, bytes: Bytes) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| ExecError::InvalidText { tag })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;
    use execprims_frame::decode_frame;

    use super::*;

    fn tags(request: &Request) -> Vec<Tag> {
        request.messages().iter().map(Message::tag).collect()
    }

    #[test]
    fn bare_command_is_command_then_eot() {
        let request = Request::build(&Command::new("echo"));
        assert_eq!(
            request.messages(),
            [Message::Command(Bytes::from_static(b"echo")), Message::Eot]
        );
        assert_eq!(request.len(), 2);
        assert!(!request.is_empty());
    }

    #[test]
    fn full_emission_order() {
        let command = Command::new("sh")
            .args(["-c", "echo $JOHN"])
            .stdin("input")
            .env("JOHN", "rambo")
            .env("A", "b")
            .current_dir("/tmp");
        let request = Request::build(&command);

        assert_eq!(
            tags(&request),
            [
                Tag::Command,
                Tag::Arg,
                Tag::Arg,
                Tag::Stdin,
                Tag::Env,
                Tag::Env,
                Tag::CurrentDir,
                Tag::Eot,
            ]
        );
        assert_eq!(
            request.messages()[1..3],
            [
                Message::Arg(Bytes::from_static(b"-c")),
                Message::Arg(Bytes::from_static(b"echo $JOHN")),
            ]
        );
        // Environment is emitted sorted by name.
        assert_eq!(request.messages()[4], Message::env("A", "b"));
        assert_eq!(request.messages()[5], Message::env("JOHN", "rambo"));
    }

    #[test]
    fn absent_options_are_omitted() {
        let options = Options::new().current_dir("/");
        let request = Request::from_parts("ls", &["-l"], &options);
        assert_eq!(tags(&request), [Tag::Command, Tag::Arg, Tag::CurrentDir, Tag::Eot]);
    }

    #[test]
    fn empty_stdin_is_still_sent() {
        let request = Request::build(&Command::new("cat").stdin(""));
        assert_eq!(request.messages()[1], Message::Stdin(Bytes::new()));
    }

    #[test]
    fn write_to_emits_frames_in_order() {
        let request = Request::build(&Command::new("echo").arg("john"));
        let mut writer = FrameWriter::new(Cursor::new(Vec::new()));
        request.write_to(&mut writer).unwrap();

        let mut wire = BytesMut::from(writer.into_inner().into_inner().as_slice());
        let mut decoded = Vec::new();
        while let Some(payload) = decode_frame(&mut wire, usize::MAX).unwrap() {
            decoded.push(Message::decode(payload).unwrap());
        }
        assert_eq!(decoded, request.messages());
    }

    #[test]
    fn assembler_inverts_builder() {
        let command = Command::new("sh")
            .args(["-c", "cat"])
            .stdin("john")
            .env("JOHN", "rambo")
            .current_dir("/tmp");

        let mut assembler = RequestAssembler::new();
        let mut assembled = None;
        for message in Request::build(&command).messages() {
            assembled = assembler.feed(message.clone()).unwrap();
        }
        assert_eq!(assembled, Some(command));
    }

    #[test]
    fn assembler_requires_command_first() {
        let mut assembler = RequestAssembler::new();
        let err = assembler
            .feed(Message::Arg(Bytes::from_static(b"x")))
            .unwrap_err();
        assert!(matches!(
            err,
            ExecError::UnexpectedMessage { tag: Tag::Arg, .. }
        ));
    }

    #[test]
    fn assembler_rejects_second_command() {
        let mut assembler = RequestAssembler::new();
        assembler
            .feed(Message::Command(Bytes::from_static(b"a")))
            .unwrap();
        assert!(assembler
            .feed(Message::Command(Bytes::from_static(b"b")))
            .is_err());
    }

    #[test]
    fn assembler_rejects_response_messages() {
        let mut assembler = RequestAssembler::new();
        assembler
            .feed(Message::Command(Bytes::from_static(b"a")))
            .unwrap();
        let err = assembler.feed(Message::ExitStatus(0)).unwrap_err();
        assert!(matches!(
            err,
            ExecError::UnexpectedMessage {
                tag: Tag::ExitStatus,
                ..
            }
        ));
    }

    #[test]
    fn assembler_rejects_messages_after_eot() {
        let mut assembler = RequestAssembler::new();
        assembler
            .feed(Message::Command(Bytes::from_static(b"a")))
            .unwrap();
        assert!(assembler.feed(Message::Eot).unwrap().is_some());
        assert!(assembler
            .feed(Message::Arg(Bytes::from_static(b"late")))
            .is_err());
    }

    #[test]
    fn assembler_rejects_invalid_utf8() {
        let mut assembler = RequestAssembler::new();
        let err = assembler
            .feed(Message::Command(Bytes::from_static(b"\xff")))
            .unwrap_err();
        assert!(matches!(err, ExecError::InvalidText { tag: Tag::Command }));
    }

    #[test]
    fn assembler_keeps_binary_stdin() {
        let mut assembler = RequestAssembler::new();
        assembler
            .feed(Message::Command(Bytes::from_static(b"cat")))
            .unwrap();
        assembler
            .feed(Message::Stdin(Bytes::from_static(b"\x00\xff")))
            .unwrap();
        let command = assembler.feed(Message::Eot).unwrap().unwrap();
        assert_eq!(
            command.get_options().stdin.as_deref(),
            Some(b"\x00\xff".as_ref())
        );
    }
}
