//! Line/column resolution over a source buffer.

use once_cell::unsync::OnceCell;
use std::fmt::{Display, Formatter};

/// 1-based line and column of a byte offset.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A source buffer together with a lazily computed line-break index.
///
/// The lexer and parser both resolve byte offsets to `Position`s for
/// diagnostics; the line-break table is built once on first use and cached.
pub struct Code<'c> {
    pub value: &'c [u8],
    line_breaks: OnceCell<Vec<usize>>,
}

impl<'c> Code<'c> {
    pub fn new(value: &'c [u8]) -> Self {
        Self {
            value,
            line_breaks: OnceCell::new(),
        }
    }

    pub fn as_str(&self) -> &'c str {
        std::str::from_utf8(self.value).expect("source buffer is not valid UTF-8")
    }

    fn line_breaks(&self) -> &Vec<usize> {
        self.line_breaks.get_or_init(|| {
            self.value
                .iter()
                .enumerate()
                .filter_map(|(i, b)| if *b == b'\n' { Some(i) } else { None })
                .collect()
        })
    }

    /// Resolve a byte offset into the buffer to a 1-based line/column pair.
    pub fn position_at(&self, pointer: usize) -> Position {
        let breaks = self.line_breaks();
        let index = match breaks.binary_search(&pointer) {
            Ok(i) | Err(i) => i,
        };
        if index == 0 {
            Position::new(1, pointer + 1)
        } else {
            let line_start = breaks[index - 1] + 1;
            Position::new(index + 1, pointer - line_start + 1)
        }
    }
}

impl<'c> From<&'c str> for Code<'c> {
    fn from(value: &'c str) -> Self {
        Code::new(value.as_bytes())
    }
}
