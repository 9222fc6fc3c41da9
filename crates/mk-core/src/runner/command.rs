//! Command specification and argument stringification

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::fs::{FsPath, PathLike};

/// Conversion of a value into a single command-line argument.
///
/// Text is taken as-is, path-like values render as their native path text,
/// everything else renders through `Display`.
pub trait IntoArg {
    fn into_arg(self) -> String;
}

impl IntoArg for String {
    fn into_arg(self) -> String {
        self
    }
}

impl IntoArg for &str {
    fn into_arg(self) -> String {
        self.to_string()
    }
}

impl IntoArg for &String {
    fn into_arg(self) -> String {
        self.clone()
    }
}

impl IntoArg for Cow<'_, str> {
    fn into_arg(self) -> String {
        self.into_owned()
    }
}

macro_rules! path_into_arg {
    ($($t:ty),*) => {
        $(
            impl IntoArg for $t {
                fn into_arg(self) -> String {
                    self.fspath()
                }
            }
        )*
    };
}

path_into_arg!(&Path, PathBuf, &PathBuf, FsPath, &FsPath);

macro_rules! display_into_arg {
    ($($t:ty),*) => {
        $(
            impl IntoArg for $t {
                fn into_arg(self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

display_into_arg!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f32, f64, bool, char);

/// External program, ordered arguments and an optional display title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    title: Option<String>,
}

impl CommandSpec {
    pub fn new(program: impl IntoArg) -> Self {
        Self {
            program: program.into_arg(),
            args: Vec::new(),
            title: None,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub(crate) fn set_title(&mut self, title: Option<String>) {
        self.title = title;
    }

    pub(crate) fn push_arg(&mut self, arg: String) {
        self.args.push(arg);
    }

    /// Program followed by its arguments
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str))
    }

    /// Every token POSIX-shell quoted, joined by single spaces.
    ///
    /// This exact string is both executed and displayed.
    pub fn command_line(&self) -> String {
        shell_words::join(self.tokens())
    }

    /// Title when present, command line otherwise
    pub fn subject(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| self.command_line())
    }
}
