//! Command execution
//!
//! Commands are built from a program and an ordered list of argument
//! templates. Each template is expanded on its own and handed to the child
//! process directly, without a shell in between.

use crate::error::{ExecutionError, Result};
use crate::runner::{Context, Overrides};
use std::io::Write;
use std::process::{Command as StdCommand, Stdio};

/// One piece of a command line before expansion
#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    /// Expands to exactly one argument
    Arg(String),
    /// Expands, then splits on whitespace into zero or more arguments
    Flags(String),
}

/// A structured external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    program: String,
    parts: Vec<Part>,
    stdin: Option<String>,
    ignore_error: bool,
    quiet: bool,
    overrides: Overrides,
}

impl Cmd {
    /// Start a command; `program` may itself be a template such as `{CC}`
    pub fn new(program: impl Into<String>) -> Self {
        Cmd {
            program: program.into(),
            parts: Vec::new(),
            stdin: None,
            ignore_error: false,
            quiet: false,
            overrides: Overrides::new(),
        }
    }

    /// Append one argument template
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.parts.push(Part::Arg(arg.into()));
        self
    }

    /// Append several argument templates
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parts
            .extend(args.into_iter().map(|a| Part::Arg(a.into())));
        self
    }

    /// Append a whitespace-separated flag string such as `{CFLAGS}`
    pub fn flags(mut self, flags: impl Into<String>) -> Self {
        self.parts.push(Part::Flags(flags.into()));
        self
    }

    /// Feed `input` to the command's standard input
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Tolerate a non-zero exit status
    pub fn ignore_error(mut self) -> Self {
        self.ignore_error = true;
        self
    }

    /// Discard the command's stdout and stderr
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Provide a value for a placeholder, shadowing any setting of that name
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    /// Expand program and arguments into a literal argv
    pub fn expand(&self, ctx: &Context) -> Result<Vec<String>> {
        let mut argv = vec![ctx.expand_with(&self.program, &self.overrides)?];

        for part in &self.parts {
            match part {
                Part::Arg(template) => argv.push(ctx.expand_with(template, &self.overrides)?),
                Part::Flags(template) => {
                    let flags = ctx.expand_with(template, &self.overrides)?;
                    argv.extend(flags.split_whitespace().map(str::to_string));
                }
            }
        }

        Ok(argv)
    }
}

/// Render an argv the way a reader would type it into a shell
pub fn display_command(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| quote_arg(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote_arg(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Execute a command in the given context
///
/// The expanded command line is printed to stdout first. A non-zero exit is
/// an error unless the command was marked with [`Cmd::ignore_error`].
pub fn execute_command(cmd: &Cmd, ctx: &Context) -> Result<()> {
    let argv = cmd.expand(ctx)?;
    let display = display_command(&argv);

    crate::ui::echo_command(&display);

    if ctx.dry_run {
        return Ok(());
    }

    let mut command = StdCommand::new(&argv[0]);
    command.args(&argv[1..]);
    command.current_dir(ctx.config.base_dir());

    if cmd.stdin.is_some() {
        command.stdin(Stdio::piped());
    } else {
        command.stdin(Stdio::inherit());
    }

    if cmd.quiet {
        command.stdout(Stdio::null());
        command.stderr(Stdio::null());
    } else {
        command.stdout(Stdio::inherit());
        command.stderr(Stdio::inherit());
    }

    let spawn_error = |source: std::io::Error| ExecutionError::Spawn {
        command: display.clone(),
        source,
    };

    let status = match command.spawn() {
        Ok(mut child) => {
            let written = match (&cmd.stdin, child.stdin.take()) {
                (Some(input), Some(mut pipe)) => pipe.write_all(input.as_bytes()),
                _ => Ok(()),
            };
            let status = child.wait().map_err(spawn_error)?;

            // the child may exit before reading all of its input
            if let Err(e) = written {
                if cmd.ignore_error {
                    ctx.print_debug(&format!("Ignoring failure to write input: {}", display));
                    return Ok(());
                }
                if status.success() {
                    return Err(spawn_error(e).into());
                }
            }
            status
        }
        // a missing tool behaves like a failing one for ignorable cleanup steps
        Err(_) if cmd.ignore_error => {
            ctx.print_debug(&format!("Ignoring failure to start: {}", display));
            return Ok(());
        }
        Err(e) => return Err(spawn_error(e).into()),
    };

    if !status.success() {
        if cmd.ignore_error {
            ctx.print_debug(&format!(
                "Ignoring exit code {:?}: {}",
                status.code(),
                display
            ));
            return Ok(());
        }
        return Err(ExecutionError::CommandFailed {
            command: display,
            code: status.code(),
        }
        .into());
    }

    Ok(())
}
