use std::collections::BTreeMap;

use bytes::Bytes;

/// Per-invocation options. Absent fields are not sent to the helper at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    /// Entire standard input for the target.
    pub stdin: Option<Bytes>,
    /// Environment overrides, added on top of the helper's environment.
    pub env: Option<BTreeMap<String, String>>,
    /// Working directory for the target.
    pub current_dir: Option<String>,
}

impl Options {
    /// Options with every field absent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set standard input.
    pub fn stdin(mut self, input: impl Into<Bytes>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Add one environment override.
    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Add several environment overrides.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let env = self.env.get_or_insert_with(BTreeMap::new);
        for (name, value) in vars {
            env.insert(name.into(), value.into());
        }
        self
    }

    /// Set the working directory.
    pub fn current_dir(mut self, dir: impl Into<String>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }
}

/// One external command: executable, ordered arguments and options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    program: String,
    args: Vec<String>,
    options: Options,
}

impl Command {
    /// Command running `program` with no arguments and no options.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            options: Options::default(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments, in order.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Replace all options.
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Set standard input.
    pub fn stdin(mut self, input: impl Into<Bytes>) -> Self {
        self.options.stdin = Some(input.into());
        self
    }

    /// Add one environment override.
    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options = self.options.env(name, value);
        self
    }

    /// Set the working directory.
    pub fn current_dir(mut self, dir: impl Into<String>) -> Self {
        self.options.current_dir = Some(dir.into());
        self
    }

    /// The executable.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments in the order they reach the target.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Options for this invocation.
    pub fn get_options(&self) -> &Options {
        &self.options
    }

    /// Install piped input, returning any stdin it displaced.
    pub(crate) fn replace_stdin(&mut self, input: Bytes) -> Option<Bytes> {
        self.options.stdin.replace(input)
    }
}
