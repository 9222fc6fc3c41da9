//! Execution stack of nested script invocations

use std::path::{Path, PathBuf};

use crate::fs::{FsPath, PathLike};
use crate::time::TimeCounter;

/// One script invocation: its path, directory and elapsed-time counter
#[derive(Debug, Clone)]
pub struct Frame {
    path: PathBuf,
    directory: PathBuf,
    counter: TimeCounter,
}

impl Frame {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = FsPath::new(path).into_path_buf();
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self {
            path,
            directory,
            counter: TimeCounter::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn counter(&self) -> &TimeCounter {
        &self.counter
    }

    /// Upper-cased file stem
    pub fn name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_uppercase())
            .unwrap_or_else(|| self.path.base_name().to_uppercase())
    }
}

/// LIFO stack of frames; the root frame is never popped
#[derive(Debug, Clone)]
pub struct ExecutionStack {
    frames: Vec<Frame>,
}

impl ExecutionStack {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            frames: vec![Frame::new(root)],
        }
    }

    pub fn current(&self) -> &Frame {
        // frames always holds the root
        &self.frames[self.frames.len() - 1]
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_nested(&self) -> bool {
        self.frames.len() > 1
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// `path` as-is when absolute, otherwise relative to the current frame's directory
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            FsPath::new(path).into_path_buf()
        } else {
            FsPath::new(self.current().directory()).join(path).into_path_buf()
        }
    }

    /// Push a frame for `path`, resolved against the current frame
    pub fn push(&mut self, path: impl AsRef<Path>) -> &Frame {
        let resolved = self.resolve(path);
        self.frames.push(Frame::new(resolved));
        self.current()
    }

    /// Pop the innermost frame; `None` when only the root remains
    pub fn pop(&mut self) -> Option<Frame> {
        if self.is_nested() {
            self.frames.pop()
        } else {
            None
        }
    }

    fn joined_names(&self) -> String {
        self.frames
            .iter()
            .map(Frame::name)
            .collect::<Vec<_>>()
            .join(" >> ")
    }

    /// `[ROOT >> CHILD]`
    pub fn display_path(&self) -> String {
        format!("[{}]", self.joined_names())
    }

    /// `ROOT >> CHILD`; notification centers mangle brackets
    pub fn notification_name(&self) -> String {
        self.joined_names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_name_and_directory() {
        let frame = Frame::new("/work/scripts/build_ios.rs");
        assert_eq!(frame.name(), "BUILD_IOS");
        assert_eq!(frame.directory(), Path::new("/work/scripts"));

        let bare = Frame::new("deploy");
        assert_eq!(bare.name(), "DEPLOY");
        assert_eq!(bare.directory(), Path::new("."));
    }

    #[test]
    fn test_display_names() {
        let mut stack = ExecutionStack::new("/work/release.sh");
        assert_eq!(stack.display_path(), "[RELEASE]");
        stack.push("steps/archive.sh");
        assert_eq!(stack.display_path(), "[RELEASE >> ARCHIVE]");
        assert_eq!(stack.notification_name(), "RELEASE >> ARCHIVE");
    }

    #[test]
    fn test_relative_push_resolves_against_current_frame() {
        let mut stack = ExecutionStack::new("/work/release.sh");
        stack.push("steps/archive.sh");
        assert_eq!(stack.current().path(), Path::new("/work/steps/archive.sh"));
        stack.push("../upload.sh");
        assert_eq!(stack.current().path(), Path::new("/work/upload.sh"));
        stack.push("/abs/other.sh");
        assert_eq!(stack.current().path(), Path::new("/abs/other.sh"));
    }

    #[test]
    fn test_pop_restores_parent_exactly() {
        let mut stack = ExecutionStack::new("/work/release.sh");
        let name = stack.display_path();
        let started = stack.current().counter().started_at();

        stack.push("child.sh");
        assert_eq!(stack.depth(), 2);
        assert!(stack.pop().is_some());

        assert_eq!(stack.display_path(), name);
        assert_eq!(stack.current().counter().started_at(), started);
    }

    #[test]
    fn test_root_is_never_popped() {
        let mut stack = ExecutionStack::new("/work/release.sh");
        assert!(stack.pop().is_none());
        assert_eq!(stack.depth(), 1);
    }
}
