//! Command execution for git invocations
//!
//! [`GitCli`] runs the real `git` binary. Everything above it talks to the
//! [`CommandRunner`] trait so the call sequence can be observed in tests.

use std::borrow::Cow;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use tracing::{debug, warn};

use crate::error::ExternalCommandError;

/// Default cap for captured output (256 KiB)
pub const DEFAULT_OUTPUT_LIMIT: usize = 256 * 1024;

/// Bounded in-memory sink for the combined stdout/stderr of one command.
///
/// When the limit is exceeded the oldest text is dropped, so the tail of the
/// output (where git reports conflicts and errors) is always kept.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    buffer: String,
    limit: usize,
    truncated: bool,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_OUTPUT_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            buffer: String::new(),
            limit,
            truncated: false,
        }
    }

    /// Append text, evicting from the front if the limit is exceeded
    pub fn push_str(&mut self, text: &str) {
        self.buffer.push_str(text);

        if self.buffer.len() > self.limit {
            let mut cut = self.buffer.len() - self.limit;
            while !self.buffer.is_char_boundary(cut) {
                cut += 1;
            }
            self.buffer.drain(..cut);
            self.truncated = true;
        }
    }

    /// Everything captured so far
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn into_string(self) -> String {
        self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Whether older output was dropped to stay within the limit
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.push_str(&String::from_utf8_lossy(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Something that can run git with a fixed argument list
pub trait CommandRunner {
    /// Run `git <args>` in `dir` (or the current directory), discarding output
    fn run(&self, args: &[&str], dir: Option<&Path>) -> Result<(), ExternalCommandError>;

    /// Run `git <args>` in `dir`, appending combined stdout/stderr to `sink`
    fn run_captured(
        &self,
        args: &[&str],
        dir: Option<&Path>,
        sink: &mut OutputBuffer,
    ) -> Result<(), ExternalCommandError>;
}

/// Runs the git command-line tool
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
}

impl GitCli {
    /// Use `git` from `PATH`
    pub fn new() -> Self {
        Self::with_program("git")
    }

    /// Use a specific git executable
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, args: &[&str], dir: Option<&Path>) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Printable command line, with URL credentials masked
    fn command_line(&self, args: &[&str]) -> String {
        std::iter::once(Cow::Borrowed(self.program.as_str()))
            .chain(args.iter().map(|arg| redact_userinfo(arg)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Replace the `user:password@` part of a URL argument with `***@`
pub fn redact_userinfo(arg: &str) -> Cow<'_, str> {
    let Some(scheme_end) = arg.find("://") else {
        return Cow::Borrowed(arg);
    };
    let authority_start = scheme_end + 3;
    let authority_end = arg[authority_start..]
        .find('/')
        .map_or(arg.len(), |i| authority_start + i);

    match arg[authority_start..authority_end].rfind('@') {
        Some(at) => Cow::Owned(format!(
            "{}***{}",
            &arg[..authority_start],
            &arg[authority_start + at..]
        )),
        None => Cow::Borrowed(arg),
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for GitCli {
    fn run(&self, args: &[&str], dir: Option<&Path>) -> Result<(), ExternalCommandError> {
        let command = self.command_line(args);
        debug!("Running command: {}", command);

        let status = self
            .command(args, dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|source| ExternalCommandError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !status.success() {
            return Err(ExternalCommandError::Exit {
                command,
                code: status.code(),
                output: None,
            });
        }

        Ok(())
    }

    fn run_captured(
        &self,
        args: &[&str],
        dir: Option<&Path>,
        sink: &mut OutputBuffer,
    ) -> Result<(), ExternalCommandError> {
        let command = self.command_line(args);
        debug!("Running command with captured output: {}", command);

        let mut child = self
            .command(args, dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExternalCommandError::Spawn {
                command: command.clone(),
                source,
            })?;

        // Both pipes feed one channel so lines land in arrival order
        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        let stdout_handle = child.stdout.take().map(|out| drain_lines(out, tx.clone()));
        let stderr_handle = child.stderr.take().map(|err| drain_lines(err, tx.clone()));
        drop(tx);

        for line in rx {
            // Non-UTF-8 bytes (e.g. Latin-1 paths) are decoded lossily
            let _ = sink.write_all(&line);
        }

        for handle in [stdout_handle, stderr_handle].into_iter().flatten() {
            if handle.join().is_err() {
                warn!("Output reader thread panicked for: {}", command);
            }
        }

        let status = child.wait().map_err(|source| ExternalCommandError::Spawn {
            command: command.clone(),
            source,
        })?;

        debug!("Command exited with code: {:?}", status.code());

        if !status.success() {
            return Err(ExternalCommandError::Exit {
                command,
                code: status.code(),
                output: Some(sink.as_str().to_string()),
            });
        }

        Ok(())
    }
}

/// Forward raw lines (newline included) from a pipe until EOF
fn drain_lines<R>(pipe: R, tx: mpsc::Sender<Vec<u8>>) -> thread::JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        loop {
            let mut line = Vec::new();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            }
        }
    })
}
