//! Process runner
//!
//! Runs an external program through `/bin/sh -c`, executing exactly the
//! quoted command line it displays. stdout and stderr share one pipe so the
//! captured output keeps the order the child produced it in. Captured lines
//! stream to the console as they arrive.
//!
//! ```ignore
//! let version = Runner::new("flutter")
//!     .with_title("Flutter version")
//!     .with_arg("--version")
//!     .run(&console, &RunOptions::default())?
//!     .search(r"Flutter (\S+)", 1)?;
//! ```

mod command;
mod result;

use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::console::Console;
use crate::error::{Error, Result};
use crate::format::{InfoTable, InfoValue};
use crate::time::TimeCounter;

pub use command::{CommandSpec, IntoArg};
pub use result::ExecResult;

const SHELL: &str = "/bin/sh";

/// How [`Runner::run`] captures and presents a process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Pipe combined output back into the result; otherwise the child
    /// inherits the terminal and the result's output is empty
    pub capture_output: bool,
    /// Echo the command line and captured lines on the display
    pub display_output: bool,
    /// Write a completion line with the elapsed time on success
    pub notify_completion: bool,
    /// UTF-8 text delivered on the child's stdin, which is then closed
    pub input: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            capture_output: true,
            display_output: true,
            notify_completion: false,
            input: None,
        }
    }
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capture_output(mut self, capture: bool) -> Self {
        self.capture_output = capture;
        self
    }

    pub fn with_display_output(mut self, display: bool) -> Self {
        self.display_output = display;
        self
    }

    pub fn with_notify_completion(mut self, notify: bool) -> Self {
        self.notify_completion = notify;
        self
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    fn input(&self) -> Option<&str> {
        self.input.as_deref().filter(|s| !s.is_empty())
    }
}

/// A command to run plus its presentation details
#[derive(Debug, Clone)]
pub struct Runner {
    spec: CommandSpec,
    info: InfoTable,
    fail_on_error: bool,
}

impl Runner {
    pub fn new(program: impl IntoArg) -> Self {
        Self {
            spec: CommandSpec::new(program),
            info: InfoTable::new(),
            fail_on_error: true,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.spec.set_title(Some(title.into()));
        self
    }

    pub fn with_arg(mut self, arg: impl IntoArg) -> Self {
        self.add_arg(arg);
        self
    }

    pub fn with_args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: IntoArg,
    {
        self.add_args(args);
        self
    }

    pub fn with_info(mut self, name: impl Into<String>, value: impl Into<InfoValue>) -> Self {
        self.add_info(name, value);
        self
    }

    /// Whether [`run_silent`](Self::run_silent) turns a non-zero exit into an error
    pub fn with_fail_on_error(mut self, fail: bool) -> Self {
        self.fail_on_error = fail;
        self
    }

    pub fn add_arg(&mut self, arg: impl IntoArg) {
        self.spec.push_arg(arg.into_arg());
    }

    pub fn add_args<I, A>(&mut self, args: I)
    where
        I: IntoIterator<Item = A>,
        A: IntoArg,
    {
        for arg in args {
            self.add_arg(arg);
        }
    }

    /// Append a single `param=value` argument
    pub fn add_arg_pair_eq(&mut self, param: impl IntoArg, value: impl IntoArg) {
        self.spec
            .push_arg(format!("{}={}", param.into_arg(), value.into_arg()));
    }

    /// Add a row to the info table shown in the run banner
    pub fn add_info(&mut self, name: impl Into<String>, value: impl Into<InfoValue>) {
        self.info.add(name, value);
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    pub fn info(&self) -> &InfoTable {
        &self.info
    }

    pub fn command_line(&self) -> String {
        self.spec.command_line()
    }

    /// Run without any console output, capturing combined output
    pub fn run_silent(&self) -> Result<ExecResult> {
        let command_line = self.spec.command_line();
        ensure_program(self.spec.program())?;
        debug!(command = %command_line, "running silently");

        let (reader, writer) = io::pipe()?;
        let mut command = shell_command(&command_line);
        command
            .stdin(Stdio::null())
            .stdout(writer.try_clone()?)
            .stderr(writer);
        let mut child = self.spawn(&mut command)?;
        // the parent's copies of the write end must close for the reader to see EOF
        drop(command);

        let read = read_lines(reader, |_| {});
        let (output, code) = settle(&mut child, read, None)?;
        debug!(command = %command_line, code, "process exited");

        if code != 0 && self.fail_on_error {
            return Err(self.command_failed(command_line, code));
        }
        Ok(ExecResult::new(output, code, self.spec.clone()))
    }

    /// Run with a banner, streaming captured output to `console`.
    ///
    /// A non-zero exit is always an error.
    pub fn run(&self, console: &Console, options: &RunOptions) -> Result<ExecResult> {
        let counter = TimeCounter::new();
        let command_line = self.spec.command_line();
        self.write_banner(console, &command_line, options);
        ensure_program(self.spec.program())?;
        info!(command = %command_line, "running");

        let (output, code) = if options.capture_output {
            let status = match self.spec.title() {
                Some(title) => format!("{title}..."),
                None => "Running...".to_string(),
            };
            console.start_status(&status);
            let streamed = self.stream(console, &command_line, options);
            console.stop_status();
            streamed?
        } else {
            self.inherit(&command_line, options)?
        };
        debug!(command = %command_line, code, "process exited");

        console.write_empty_line();
        if code != 0 {
            return Err(self.command_failed(command_line, code));
        }
        if options.notify_completion {
            console.write(&format!("■ Completed. Elapsed time {}", counter.elapsed()));
        }
        console.write_empty_line();
        Ok(ExecResult::new(output, code, self.spec.clone()))
    }

    fn write_banner(&self, console: &Console, command_line: &str, options: &RunOptions) {
        console.write_empty_line();
        if let Some(title) = self.spec.title() {
            console.write_section_header(&format!("▸ {title}"));
        }
        if !self.info.is_empty() {
            console.write(&self.info.render());
        }
        console.write_empty_line();

        console.write_with(
            &format!("CMD> {command_line}\n"),
            None,
            options.display_output,
        );
        if let Some(input) = options.input() {
            console.write_with(&format!("INPUT> {input}\n"), None, options.display_output);
        }
    }

    fn stream(
        &self,
        console: &Console,
        command_line: &str,
        options: &RunOptions,
    ) -> Result<(String, i32)> {
        let input = options.input();
        let (reader, writer) = io::pipe()?;
        let mut command = shell_command(command_line);
        command
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(writer.try_clone()?)
            .stderr(writer);
        let mut child = self.spawn(&mut command)?;
        drop(command);

        // stdin is fed from its own thread so a child that writes before it
        // finishes reading cannot fill the output pipe and stall
        let feeder = input.map(|data| feed_stdin(&mut child, data.to_string()));

        let read = read_lines(reader, |line| {
            console.write_with(line, None, options.display_output)
        });
        settle(&mut child, read, feeder)
    }

    fn inherit(&self, command_line: &str, options: &RunOptions) -> Result<(String, i32)> {
        let input = options.input();
        let mut command = shell_command(command_line);
        if input.is_some() {
            command.stdin(Stdio::piped());
        }
        let mut child = self.spawn(&mut command)?;

        if let Some(data) = input {
            if let Some(mut stdin) = child.stdin.take() {
                ignore_broken_pipe(stdin.write_all(data.as_bytes()))?;
            }
        }
        let code = exit_code(child.wait()?);
        Ok((String::new(), code))
    }

    fn spawn(&self, command: &mut Command) -> Result<Child> {
        command.spawn().map_err(|e| Error::SpawnFailed {
            program: self.spec.program().to_string(),
            reason: e.to_string(),
        })
    }

    fn command_failed(&self, command: String, code: i32) -> Error {
        warn!(command = %command, code, "process failed");
        Error::CommandFailed {
            subject: self.spec.subject(),
            command,
            code,
        }
    }
}

fn shell_command(command_line: &str) -> Command {
    let mut command = Command::new(SHELL);
    command.arg("-c").arg(command_line);
    command
}

/// Reject programs that cannot be resolved before the shell gets a chance to
/// report them as exit code 127
fn ensure_program(program: &str) -> Result<()> {
    let found = if program.contains('/') {
        Path::new(program).is_file()
    } else {
        which::which(program).is_ok()
    };
    if found {
        Ok(())
    } else {
        Err(Error::SpawnFailed {
            program: program.to_string(),
            reason: "program not found".to_string(),
        })
    }
}

/// Read `reader` line by line, handing each trimmed line to `on_line`.
///
/// Returns the concatenated raw output with trailing whitespace removed.
fn read_lines(reader: impl Read, mut on_line: impl FnMut(&str)) -> Result<String> {
    let mut reader = BufReader::new(reader);
    let mut output = String::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        on_line(line.trim_end());
        output.push_str(&line);
    }
    output.truncate(output.trim_end().len());
    Ok(output)
}

/// Reap `child` and join the stdin feeder, then report the read outcome.
///
/// The reader is already dropped, so a child still writing gets EPIPE and
/// the wait cannot stall.
fn settle(
    child: &mut Child,
    read: Result<String>,
    feeder: Option<JoinHandle<io::Result<()>>>,
) -> Result<(String, i32)> {
    let status = child.wait();
    let fed = feeder.map_or(Ok(()), join_feeder);
    let output = read?;
    let code = exit_code(status?);
    fed?;
    Ok((output, code))
}

fn feed_stdin(child: &mut Child, data: String) -> JoinHandle<io::Result<()>> {
    let stdin = child.stdin.take();
    thread::spawn(move || match stdin {
        // dropping the handle closes the child's stdin
        Some(mut stdin) => ignore_broken_pipe(stdin.write_all(data.as_bytes())),
        None => Ok(()),
    })
}

fn join_feeder(feeder: JoinHandle<io::Result<()>>) -> Result<()> {
    match feeder.join() {
        Ok(result) => Ok(result?),
        Err(_) => Err(Error::other("stdin writer thread panicked")),
    }
}

/// A child may exit without reading all of its input
fn ignore_broken_pipe(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}
