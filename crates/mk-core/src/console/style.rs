//! Semantic console styles

use std::collections::HashMap;
use std::fmt;

use console::Style;

/// Semantic category of a console line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsoleStyle {
    SectionHeader,
    Warning,
    FatalError,
    Success,
}

impl ConsoleStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SectionHeader => "section-header",
            Self::Warning => "warning",
            Self::FatalError => "fatal-error",
            Self::Success => "success",
        }
    }

    pub fn all() -> &'static [ConsoleStyle] {
        &[
            Self::SectionHeader,
            Self::Warning,
            Self::FatalError,
            Self::Success,
        ]
    }
}

impl fmt::Display for ConsoleStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Style table consulted by the console sink
#[derive(Debug, Clone)]
pub struct StyleTable {
    styles: HashMap<ConsoleStyle, Style>,
}

impl StyleTable {
    /// A table with no entries
    pub fn empty() -> Self {
        Self {
            styles: HashMap::new(),
        }
    }

    pub fn get(&self, style: ConsoleStyle) -> Option<&Style> {
        self.styles.get(&style)
    }

    pub fn set(&mut self, style: ConsoleStyle, rendering: Style) {
        self.styles.insert(style, rendering);
    }

    pub fn remove(&mut self, style: ConsoleStyle) -> Option<Style> {
        self.styles.remove(&style)
    }

    /// Entries in a stable order
    pub fn entries(&self) -> impl Iterator<Item = ConsoleStyle> + '_ {
        ConsoleStyle::all()
            .iter()
            .copied()
            .filter(|s| self.styles.contains_key(s))
    }
}

impl Default for StyleTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.set(ConsoleStyle::SectionHeader, Style::new().bold());
        table.set(ConsoleStyle::Success, Style::new().green().bright());
        table.set(ConsoleStyle::Warning, Style::new().yellow().bright());
        table.set(ConsoleStyle::FatalError, Style::new().red().bright());
        table
    }
}
