//! Positions and findings shared by the individual check passes.

/// One-based line and character column in the checked source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub(crate) struct Position {
    pub(crate) line: u32,
    pub(crate) column: u32,
}

impl Position {
    pub(crate) const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Position of the byte at `offset`. Columns count characters, not bytes.
    pub(crate) fn of_offset(source: &str, offset: usize) -> Self {
        let before = source.get(..offset).unwrap_or(source);
        let line = before.matches('\n').count().saturating_add(1);
        let line_start = before.rfind('\n').map_or(0, |newline| newline + 1);
        let column = before
            .get(line_start..)
            .map_or(0, |text| text.chars().count())
            .saturating_add(1);
        Self::new(to_u32(line), to_u32(column))
    }

    /// Byte offset of this position in `source`, clamped to its end.
    pub(crate) fn offset_in(self, source: &str) -> usize {
        let newlines = usize::try_from(self.line.saturating_sub(1)).unwrap_or(usize::MAX);
        let line_start = newlines.checked_sub(1).map_or(0, |last| {
            source
                .match_indices('\n')
                .nth(last)
                .map_or(source.len(), |(newline, _)| newline + 1)
        });
        let chars = usize::try_from(self.column.saturating_sub(1)).unwrap_or(usize::MAX);
        source
            .get(line_start..)
            .and_then(|line| line.char_indices().nth(chars))
            .map_or(source.len(), |(offset, _)| line_start + offset)
    }
}

/// A positioned syntax error as Python's compiler words it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Diagnostic {
    pub(crate) at: Position,
    pub(crate) message: String,
}

impl Diagnostic {
    pub(crate) fn new(at: Position, message: impl Into<String>) -> Self {
        Self {
            at,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_syntax(at: Position) -> Self {
        Self::new(at, INVALID_SYNTAX)
    }
}

pub(crate) const INVALID_SYNTAX: &str = "invalid syntax";

/// Saturating conversion for line and column counters.
pub(crate) fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
