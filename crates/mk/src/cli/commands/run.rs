//! Run command: execute one external program under the script lifecycle

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::info;

use mk_core::{Console, InfoValue, RunOptions, Runner, Script};

use crate::cli::Cli;
use crate::exit_codes;

/// Run an external program
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Section title shown above the command
    #[arg(short, long)]
    pub title: Option<String>,

    /// Banner annotation; the value is parsed as JSON when possible
    #[arg(short, long = "info", value_name = "KEY=VALUE", value_parser = parse_info)]
    pub info: Vec<(String, InfoValue)>,

    /// No banner or streaming; only the captured output is printed
    #[arg(long)]
    pub silent: bool,

    /// With --silent, report a non-zero exit code instead of failing
    #[arg(long, requires = "silent")]
    pub no_fail: bool,

    /// Let the program write to the terminal directly
    #[arg(long, conflicts_with_all = ["silent", "extract"])]
    pub no_capture: bool,

    /// Capture and log output without displaying it
    #[arg(long)]
    pub hide_output: bool,

    /// Print the elapsed time when the program succeeds
    #[arg(long)]
    pub notify: bool,

    /// Text delivered on the program's standard input
    #[arg(long)]
    pub input: Option<String>,

    /// Regex applied to the captured output; the match is printed
    #[arg(long, value_name = "PATTERN")]
    pub extract: Option<String>,

    /// Capture group printed by --extract
    #[arg(long, default_value_t = 1, requires = "extract")]
    pub group: usize,

    /// Name of the extracted value in failure messages
    #[arg(long, requires = "extract")]
    pub tag: Option<String>,

    /// Program and its arguments
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "PROGRAM"
    )]
    pub command: Vec<String>,
}

/// Parse `KEY=VALUE`, reading the value as JSON when it parses
fn parse_info(raw: &str) -> Result<(String, InfoValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    let value = match serde_json::from_str::<serde_json::Value>(value) {
        Ok(json) => InfoValue::from(json),
        Err(_) => InfoValue::from(value),
    };
    Ok((key.trim().to_string(), value))
}

impl RunCommand {
    /// Execute the run command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<i32> {
        info!(program = %self.command[0], silent = self.silent, "executing run command");
        let config = cli.load_config()?;
        let console = if cli.quiet {
            Console::hidden()
        } else {
            Console::terminal()
        };

        let script = Script::builder(self.script_path())
            .config(&config)
            .console(console)
            .build()
            .context("Unable to start the script lifecycle")?;

        let outcome = self.run_in(&script, cli);
        Ok(match outcome {
            Ok(code) => {
                script.complete(Ok(()));
                code
            }
            Err(e) => script.complete(Err(e)),
        })
    }

    /// Root frame path, named after the program
    fn script_path(&self) -> PathBuf {
        PathBuf::from(&self.command[0])
    }

    fn runner(&self) -> Runner {
        let mut runner = Runner::new(&self.command[0])
            .with_args(&self.command[1..])
            .with_fail_on_error(!self.no_fail);
        if let Some(title) = &self.title {
            runner = runner.with_title(title);
        }
        for (name, value) in &self.info {
            runner.add_info(name, value.clone());
        }
        runner
    }

    fn options(&self) -> RunOptions {
        let mut options = RunOptions::new()
            .with_capture_output(!self.no_capture)
            .with_display_output(!self.hide_output)
            .with_notify_completion(self.notify);
        if let Some(input) = &self.input {
            options = options.with_input(input);
        }
        options
    }

    fn run_in(&self, script: &Script, cli: &Cli) -> anyhow::Result<i32> {
        let runner = self.runner();
        let result = if self.silent {
            runner.run_silent()?
        } else {
            runner.run(script.console(), &self.options())?
        };

        match &self.extract {
            Some(pattern) => {
                let value =
                    result.search_with(pattern, self.group, self.tag.as_deref(), None)?;
                println!("{value}");
            }
            None if self.silent && !cli.quiet && !result.output.is_empty() => {
                println!("{}", result.output);
            }
            None => {}
        }

        Ok(if result.success() {
            exit_codes::SUCCESS
        } else {
            result.code
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> RunCommand {
        let mut argv = vec!["mk", "run"];
        argv.extend_from_slice(args);
        match Cli::parse_from(argv).command {
            crate::cli::Commands::Run(cmd) => cmd,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_info_json_and_text() {
        let (key, value) = parse_info("Groups=[\"a\",\"b\"]").unwrap();
        assert_eq!(key, "Groups");
        assert_eq!(value, InfoValue::list(["a", "b"]));

        let (_, value) = parse_info("Scheme=Runner").unwrap();
        assert_eq!(value, InfoValue::from("Runner"));

        let (_, value) = parse_info("Export=true").unwrap();
        assert_eq!(value, InfoValue::from(true));

        assert!(parse_info("novalue").is_err());
        assert!(parse_info("=x").is_err());
    }

    #[test]
    fn test_trailing_program_arguments() {
        let cmd = parse(&["--title", "Build", "--", "flutter", "build", "ios", "--release"]);
        assert_eq!(cmd.title.as_deref(), Some("Build"));
        assert_eq!(cmd.command, ["flutter", "build", "ios", "--release"]);
        assert_eq!(
            cmd.runner().command_line(),
            "flutter build ios --release"
        );
    }

    #[test]
    fn test_options_from_flags() {
        let cmd = parse(&["--hide-output", "--notify", "--input", "y", "cat"]);
        let options = cmd.options();
        assert!(options.capture_output);
        assert!(!options.display_output);
        assert!(options.notify_completion);
        assert_eq!(options.input.as_deref(), Some("y"));
    }

    #[test]
    fn test_info_rows_reach_runner() {
        let cmd = parse(&["-i", "Target=ios", "-i", "Flavors=[\"dev\",\"prod\"]", "true"]);
        let runner = cmd.runner();
        assert_eq!(runner.info().len(), 2);
        assert_eq!(runner.info().rows()[0].0, "Target");
    }

    #[test]
    fn test_no_fail_requires_silent() {
        let argv = ["mk", "run", "--no-fail", "true"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_silent_run_reports_exit_code() {
        let cmd = parse(&["--silent", "--no-fail", "sh", "-c", "exit 4"]);
        let cli = Cli::parse_from(["mk", "--quiet", "styles"]);
        let script = Script::builder("sh")
            .console(Console::hidden())
            .notifier(mk_core::NoopNotifier)
            .handle_signals(false)
            .intercept_panics(false)
            .build()
            .unwrap();
        assert_eq!(cmd.run_in(&script, &cli).unwrap(), 4);
    }

    #[test]
    fn test_extract_failure_is_error() {
        let cmd = parse(&["--silent", "--extract", "version (\\S+)", "echo", "nothing"]);
        let cli = Cli::parse_from(["mk", "--quiet", "styles"]);
        let script = Script::builder("echo")
            .console(Console::hidden())
            .notifier(mk_core::NoopNotifier)
            .handle_signals(false)
            .intercept_panics(false)
            .build()
            .unwrap();
        let err = cmd.run_in(&script, &cli).unwrap_err();
        assert!(err.to_string().contains("unable to extract a value"));
    }
}
