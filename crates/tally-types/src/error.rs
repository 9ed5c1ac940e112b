use crate::SourceContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Error category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Syntax,
    Symbol,
    Type,
    Cost,
    Feature,
    Internal,
}

/// Numeric error code (E100–E699).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Syntax errors (E100–E199), passed through from the parser ──
    pub const SYNTAX: Self = Self(100);

    // ── Symbol errors (E200–E299) ──
    pub const DUPLICATE_DEFINITION: Self = Self(200);
    pub const SYMBOL_NOT_FOUND: Self = Self(201);
    pub const AMBIGUOUS_IMPORT: Self = Self(202);
    pub const WRONG_SYMBOL_KIND: Self = Self(203);

    // ── Type errors (E300–E399) ──
    pub const TYPE_MISMATCH: Self = Self(300);
    pub const WRONG_ARG_COUNT: Self = Self(301);
    pub const WRONG_TYPE_ARG_COUNT: Self = Self(302);
    pub const CANNOT_INFER_TYPE_PARAMETER: Self = Self(303);
    pub const CANNOT_UNIFY_BRANCHES: Self = Self(304);
    pub const IMMUTABLE_TARGET: Self = Self(305);

    // ── Cost errors (E400–E499) ──
    pub const COST_NOT_EVALUABLE: Self = Self(400);
    pub const COST_NOT_POSITIVE: Self = Self(401);
    pub const COST_OVER_LIMIT: Self = Self(402);
    pub const UNSAFE_COST_CEILING: Self = Self(403);

    // ── Feature-ban errors (E500–E599) ──
    pub const FEATURE_BANNED: Self = Self(500);
    pub const RECURSION_NOT_ALLOWED: Self = Self(501);

    // ── Internal errors (E600–E699) ──
    pub const INTERNAL: Self = Self(600);
    pub const ANNOTATION_OVERWRITE: Self = Self(601);
    pub const ILLEGAL_FINAL_TYPE: Self = Self(602);

    /// Get the category for this error code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            100..=199 => ErrorCategory::Syntax,
            200..=299 => ErrorCategory::Symbol,
            300..=399 => ErrorCategory::Type,
            400..=499 => ErrorCategory::Cost,
            500..=599 => ErrorCategory::Feature,
            _ => ErrorCategory::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax"),
            Self::Symbol => write!(f, "symbol"),
            Self::Type => write!(f, "type"),
            Self::Cost => write!(f, "cost"),
            Self::Feature => write!(f, "feature"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// A structured Tally analysis error.
///
/// The host renders these — it must not parse free-form strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyError {
    /// Error code (e.g., E300).
    pub code: ErrorCode,
    /// Error category (derived from code).
    pub category: ErrorCategory,
    /// Human-readable error message.
    pub message: String,
    /// Where the error points.
    pub context: SourceContext,
    /// True when the error's payload was already an error sentinel.
    /// Such errors are derived noise and are filtered before reporting.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub sentinel: bool,
}

impl TallyError {
    /// Create a new error.
    pub fn new(code: ErrorCode, message: impl Into<String>, context: SourceContext) -> Self {
        Self {
            code,
            category: code.category(),
            message: message.into(),
            context,
            sentinel: false,
        }
    }

    /// Mark this error as derived from an error-sentinel payload.
    pub fn derived_from_sentinel(mut self) -> Self {
        self.sentinel = true;
        self
    }

    /// Back-fill a missing source context with the given one.
    pub fn with_context(mut self, context: SourceContext) -> Self {
        self.context = std::mem::replace(&mut self.context, SourceContext::NotInSource)
            .or_context(context);
        self
    }
}

impl fmt::Display for TallyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}] {}",
            self.context, self.code, self.category, self.message
        )
    }
}

impl std::error::Error for TallyError {}

/// A deduplicated, accumulating set of analysis errors.
///
/// Passes push every recoverable error here and continue with an error
/// sentinel, so a single run surfaces as many independent problems as
/// possible. Errors derived from sentinel payloads are kept but excluded
/// from the final report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorSet {
    errors: Vec<TallyError>,
    #[serde(skip)]
    seen: BTreeSet<(ErrorCode, String, SourceContext)>,
}

impl ErrorSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error, deduplicating on (code, message, context).
    pub fn push(&mut self, error: TallyError) {
        let key = (error.code, error.message.clone(), error.context.clone());
        if self.seen.insert(key) {
            self.errors.push(error);
        }
    }

    /// True if any reportable (non-sentinel-derived) error was recorded.
    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(|e| !e.sentinel)
    }

    /// The reportable errors, with sentinel-derived noise filtered out.
    pub fn report(&self) -> Vec<&TallyError> {
        self.errors.iter().filter(|e| !e.sentinel).collect()
    }

    /// Number of reportable errors.
    pub fn len(&self) -> usize {
        self.errors.iter().filter(|e| !e.sentinel).count()
    }

    /// True if no reportable error was recorded.
    pub fn is_empty(&self) -> bool {
        !self.has_errors()
    }

    /// All recorded errors, including sentinel-derived ones.
    pub fn all(&self) -> &[TallyError] {
        &self.errors
    }

    /// Serialize the reportable errors as a JSON array.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.report()).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Span;

    fn ctx(line: u32) -> SourceContext {
        SourceContext::at(Some("test.tly"), Span::point(line, 1))
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::SYNTAX.category(), ErrorCategory::Syntax);
        assert_eq!(
            ErrorCode::DUPLICATE_DEFINITION.category(),
            ErrorCategory::Symbol
        );
        assert_eq!(ErrorCode::TYPE_MISMATCH.category(), ErrorCategory::Type);
        assert_eq!(ErrorCode::COST_OVER_LIMIT.category(), ErrorCategory::Cost);
        assert_eq!(
            ErrorCode::RECURSION_NOT_ALLOWED.category(),
            ErrorCategory::Feature
        );
        assert_eq!(ErrorCode::INTERNAL.category(), ErrorCategory::Internal);
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(format!("{}", ErrorCode::TYPE_MISMATCH), "E300");
        assert_eq!(format!("{}", ErrorCode::COST_OVER_LIMIT), "E402");
    }

    #[test]
    fn test_error_set_dedup() {
        let mut errs = ErrorSet::new();
        errs.push(TallyError::new(ErrorCode::TYPE_MISMATCH, "mismatch", ctx(1)));
        errs.push(TallyError::new(ErrorCode::TYPE_MISMATCH, "mismatch", ctx(1)));
        errs.push(TallyError::new(ErrorCode::TYPE_MISMATCH, "mismatch", ctx(2)));
        assert_eq!(errs.len(), 2);
    }

    #[test]
    fn test_error_set_filters_sentinel_noise() {
        let mut errs = ErrorSet::new();
        errs.push(
            TallyError::new(ErrorCode::TYPE_MISMATCH, "derived", ctx(1))
                .derived_from_sentinel(),
        );
        assert!(errs.is_empty());
        assert!(errs.report().is_empty());
        assert_eq!(errs.all().len(), 1);

        errs.push(TallyError::new(ErrorCode::SYMBOL_NOT_FOUND, "real", ctx(2)));
        assert!(errs.has_errors());
        assert_eq!(errs.report().len(), 1);
    }

    #[test]
    fn test_context_backfill_on_error() {
        let err = TallyError::new(
            ErrorCode::INTERNAL,
            "invariant violated",
            SourceContext::NotInSource,
        )
        .with_context(ctx(7));
        assert_eq!(err.context, ctx(7));

        // A located context is never overwritten.
        let located = TallyError::new(ErrorCode::TYPE_MISMATCH, "m", ctx(3)).with_context(ctx(9));
        assert_eq!(located.context, ctx(3));
    }

    #[test]
    fn test_error_json_serialization() {
        let mut errs = ErrorSet::new();
        errs.push(TallyError::new(
            ErrorCode::TYPE_MISMATCH,
            "expected I64, found Bool",
            ctx(12),
        ));
        let json = errs.to_json();
        assert!(json.contains("\"code\""));
        assert!(json.contains("\"message\""));
        assert!(json.contains("\"context\""));

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_array());
        assert_eq!(parsed[0]["category"], "type");
    }
}
