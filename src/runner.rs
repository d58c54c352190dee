// ABOUTME: Seam between workflows and the external toolchain process
// ABOUTME: Real subprocess runner, a dry-run runner, and the captured output type

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::process::Command;

/// Captured result of one external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was terminated by a signal
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// Output of a command that exited with `code` and printed nothing.
    pub fn with_status(code: i32) -> Self {
        Self {
            status: Some(code),
            ..Default::default()
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Text to show an operator when the command failed.
    ///
    /// `dotnet` reports most build and EF errors on stdout, so stdout is used
    /// when stderr is empty.
    pub fn error_text(&self) -> String {
        let stderr = String::from_utf8_lossy(&self.stderr);
        if !stderr.trim().is_empty() {
            return stderr.trim_end().to_string();
        }
        String::from_utf8_lossy(&self.stdout).trim_end().to_string()
    }
}

/// Runs a program with arguments and captures its output.
pub trait CommandRunner {
    /// Run to completion. Errors only when the process could not be started;
    /// a non-zero exit is reported through [`CommandOutput::status`].
    fn run(&mut self, program: &str, args: &[OsString]) -> Result<CommandOutput>;
}

/// Executes commands as child processes, blocking until each exits.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&mut self, program: &str, args: &[OsString]) -> Result<CommandOutput> {
        tracing::debug!("Executing: {}", render_command(program, args));
        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("Failed to execute {}", program))?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Prints each command instead of running it and reports success.
#[derive(Debug, Default)]
pub struct DryRunRunner {
    /// Every rendered command line, in order
    pub commands: Vec<String>,
}

impl CommandRunner for DryRunRunner {
    fn run(&mut self, program: &str, args: &[OsString]) -> Result<CommandOutput> {
        let line = render_command(program, args);
        println!("Would run: {}", line);
        self.commands.push(line);
        Ok(CommandOutput::with_status(0))
    }
}

/// Render a command line for display, quoting arguments that contain spaces.
///
/// Display only: non-UTF-8 arguments are shown lossily but passed to the
/// process unchanged.
pub fn render_command(program: &str, args: &[OsString]) -> String {
    std::iter::once(program.to_string())
        .chain(args.iter().map(|arg| arg.to_string_lossy().into_owned()))
        .map(|part| {
            if part.is_empty() || part.contains(char::is_whitespace) {
                format!("\"{}\"", part)
            } else {
                part
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
