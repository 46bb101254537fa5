//! Byte ranges inside an expression string and their rendering.
//!
//! Expressions are usually a single line of YAML (`newValue: "resource.data.x"`),
//! but block scalars can span several lines, so diagnostics resolve offsets
//! to a line and column before drawing the caret.

use std::fmt;

/// Half-open byte range `start..end` of the expression text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span containing both `self` and `other`; parent nodes cover
    /// their operands this way.
    pub fn merge(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Line and column of the first byte.
    pub fn location(&self, source: &str) -> Location {
        Location::of(source, self.start)
    }
}

// logos hands out `Range<usize>` spans.
impl From<std::ops::Range<usize>> for Span {
    fn from(range: std::ops::Range<usize>) -> Self {
        Span::new(range.start, range.end)
    }
}

/// One-based line and character column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    /// Resolve a byte offset; offsets past the end land after the last
    /// character.
    pub fn of(source: &str, offset: usize) -> Location {
        let before = &source[..floor_char_boundary(source, offset)];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        Location {
            line,
            column: before[line_start..].chars().count() + 1,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}:{}", self.line, self.column)
    }
}

fn floor_char_boundary(source: &str, offset: usize) -> usize {
    let mut offset = offset.min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// The offending line of `source` with `^~~~` under `span`.
pub(crate) fn render_snippet(source: &str, span: Span) -> String {
    let location = span.location(source);
    let mut result = format!("  --> {location}\n");

    let Some(text) = source.lines().nth(location.line - 1) else {
        return result;
    };
    result.push_str(&format!("   |\n{:3}| {}\n   | ", location.line, text));
    result.push_str(&" ".repeat(location.column - 1));
    result.push('^');

    // Underline only up to the end of this line.
    let covered = source
        .get(span.start..span.end.min(source.len()))
        .map_or(0, |s| s.lines().next().unwrap_or("").chars().count());
    let room = text.chars().count().saturating_sub(location.column);
    result.push_str(&"~".repeat(covered.saturating_sub(1).min(room)));
    result.push('\n');
    result
}
