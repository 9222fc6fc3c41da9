//! Filesystem entry capability
//!
//! Everything that accepts "a path" in mk accepts any [`PathLike`] value:
//! standard paths, and [`FsPath`], a normalized path with `~` expanded.

use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Narrow capability shared by every path-representing type
pub trait PathLike {
    /// The native filesystem path
    fn as_native(&self) -> &Path;

    /// Native path rendered as text
    fn fspath(&self) -> String {
        self.as_native().to_string_lossy().into_owned()
    }

    fn exists(&self) -> bool {
        self.as_native().exists()
    }

    fn is_file(&self) -> bool {
        self.as_native().is_file()
    }

    fn is_dir(&self) -> bool {
        self.as_native().is_dir()
    }

    fn is_symlink(&self) -> bool {
        self.as_native().is_symlink()
    }

    fn parent(&self) -> Option<PathBuf> {
        self.as_native().parent().map(Path::to_path_buf)
    }

    /// Final component, empty for the root
    fn base_name(&self) -> String {
        self.as_native()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn extension(&self) -> Option<String> {
        self.as_native()
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
    }
}

impl PathLike for Path {
    fn as_native(&self) -> &Path {
        self
    }
}

impl PathLike for PathBuf {
    fn as_native(&self) -> &Path {
        self.as_path()
    }
}

impl<T: PathLike + ?Sized> PathLike for &T {
    fn as_native(&self) -> &Path {
        (**self).as_native()
    }
}

/// Normalized path value with `~` expanded to the home directory
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FsPath(PathBuf);

impl FsPath {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self(normalize(&expand_home(path.as_ref())))
    }

    /// Join a component; absolute components are appended, not substituted
    pub fn join(&self, component: impl AsRef<Path>) -> Self {
        let component = component.as_ref();
        let relative: PathBuf = component
            .components()
            .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
            .collect();
        Self::new(self.0.join(relative))
    }

    pub fn is_absolute(&self) -> bool {
        self.0.is_absolute()
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl PathLike for FsPath {
    fn as_native(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for FsPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl From<&str> for FsPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for FsPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl fmt::Display for FsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.display())
    }
}

fn expand_home(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => match dirs::home_dir() {
            Some(home) => home.join(components.as_path()),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

/// Lexical normalization: drops `.`, folds `..` where a parent is known
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
