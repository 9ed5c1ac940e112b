use serde::{Deserialize, Serialize};
use std::fmt;

/// Source location span.
///
/// All line/column values are 1-based for human-readable error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    /// Create a new span.
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Create a zero-width span at a single position.
    pub fn point(line: u32, col: u32) -> Self {
        Self::new(line, col, line, col)
    }

    /// Merge two spans into one that covers both.
    pub fn merge(self, other: Span) -> Span {
        let (start_line, start_col) = if (self.start_line, self.start_col)
            <= (other.start_line, other.start_col)
        {
            (self.start_line, self.start_col)
        } else {
            (other.start_line, other.start_col)
        };
        let (end_line, end_col) =
            if (self.end_line, self.end_col) >= (other.end_line, other.end_col) {
                (self.end_line, self.end_col)
            } else {
                (other.end_line, other.end_col)
            };
        Span::new(start_line, start_col, end_line, end_col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// Where an error points in the analyzed program.
///
/// Internally raised errors start out as [`SourceContext::NotInSource`] and
/// are back-filled with the calling node's context before reporting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceContext {
    /// A location inside a named source file.
    File { file: String, span: Span },
    /// A location inside an unnamed source (e.g. an inline script).
    Unnamed { span: Span },
    /// No source location — raised from inside the analyzer itself.
    NotInSource,
}

impl SourceContext {
    /// Build a context from an optional file name and a span.
    pub fn at(file: Option<&str>, span: Span) -> Self {
        match file {
            Some(name) => SourceContext::File {
                file: name.to_string(),
                span,
            },
            None => SourceContext::Unnamed { span },
        }
    }

    /// Back-fill: keep this context if it has a location, otherwise take `other`.
    pub fn or_context(self, other: SourceContext) -> SourceContext {
        match self {
            SourceContext::NotInSource => other,
            located => located,
        }
    }

    /// True if this context carries no source location.
    pub fn is_not_in_source(&self) -> bool {
        matches!(self, SourceContext::NotInSource)
    }
}

impl fmt::Display for SourceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceContext::File { file, span } => write!(f, "{}:{}", file, span),
            SourceContext::Unnamed { span } => write!(f, "<input>:{}", span),
            SourceContext::NotInSource => write!(f, "<not in source>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_point() {
        let s = Span::point(1, 5);
        assert_eq!(s.start_line, 1);
        assert_eq!(s.end_col, 5);
    }

    #[test]
    fn test_span_merge() {
        let a = Span::new(1, 5, 1, 10);
        let b = Span::new(2, 3, 2, 8);
        let merged = a.merge(b);
        assert_eq!(merged, Span::new(1, 5, 2, 8));
    }

    #[test]
    fn test_span_merge_same_line() {
        let a = Span::new(1, 5, 1, 10);
        let b = Span::new(1, 3, 1, 8);
        let merged = a.merge(b);
        assert_eq!(merged.start_col, 3);
        assert_eq!(merged.end_col, 10);
    }

    #[test]
    fn test_context_backfill() {
        let raised = SourceContext::NotInSource;
        let call_site = SourceContext::at(Some("script.tly"), Span::point(4, 2));
        assert_eq!(raised.or_context(call_site.clone()), call_site);
    }

    #[test]
    fn test_context_backfill_keeps_located() {
        let located = SourceContext::at(None, Span::point(1, 1));
        let other = SourceContext::at(Some("a.tly"), Span::point(9, 9));
        assert_eq!(located.clone().or_context(other), located);
    }

    #[test]
    fn test_context_display() {
        let ctx = SourceContext::at(Some("main.tly"), Span::new(3, 7, 3, 15));
        assert_eq!(format!("{ctx}"), "main.tly:3:7");
        assert_eq!(format!("{}", SourceContext::NotInSource), "<not in source>");
    }
}
