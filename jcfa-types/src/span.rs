use crate::SourceId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A region of source code, tracked by line and column.
///
/// Lines are 1-based and columns are 0-based, matching what the front end reports. The dummy span
/// (all zeros, no source) is used for synthesized code.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    source_id: Option<SourceId>,
    start_line: u32,
    start_column: u32,
    end_line: u32,
    end_column: u32,
}

impl Span {
    pub fn new(
        source_id: Option<SourceId>,
        start_line: u32,
        start_column: u32,
        end_line: u32,
        end_column: u32,
    ) -> Span {
        Span {
            source_id,
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// A span on a single line of a single source.
    pub fn on_line(source_id: SourceId, line: u32) -> Span {
        Span::new(Some(source_id), line, 0, line, 0)
    }

    pub fn dummy() -> Span {
        Span::default()
    }

    pub fn is_dummy(&self) -> bool {
        self.source_id.is_none() && self.start_line == 0 && self.end_line == 0
    }

    pub fn source_id(&self) -> Option<&SourceId> {
        self.source_id.as_ref()
    }

    pub fn start_line(&self) -> u32 {
        self.start_line
    }

    pub fn start_column(&self) -> u32 {
        self.start_column
    }

    pub fn end_line(&self) -> u32 {
        self.end_line
    }

    pub fn end_column(&self) -> u32 {
        self.end_column
    }

    /// The smallest span covering both `lhs` and `rhs`.
    ///
    /// Joining with a dummy span yields the other span unchanged.
    pub fn join(lhs: &Span, rhs: &Span) -> Span {
        if lhs.is_dummy() {
            return rhs.clone();
        }
        if rhs.is_dummy() {
            return lhs.clone();
        }
        debug_assert_eq!(lhs.source_id, rhs.source_id);
        let (start_line, start_column) =
            std::cmp::min((lhs.start_line, lhs.start_column), (rhs.start_line, rhs.start_column));
        let (end_line, end_column) =
            std::cmp::max((lhs.end_line, lhs.end_column), (rhs.end_line, rhs.end_column));
        Span {
            source_id: lhs.source_id,
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("Span")
            .field("source_id", &self.source_id.map(|id| id.get()))
            .field("start", &(self.start_line, self.start_column))
            .field("end", &(self.end_line, self.end_column))
            .finish()
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dummy() {
            return write!(f, "<synthesized>");
        }
        write!(f, "line {}:{}", self.start_line, self.start_column)
    }
}

pub trait Spanned {
    fn span(&self) -> Span;
}
