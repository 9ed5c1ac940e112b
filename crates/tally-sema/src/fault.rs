//! Internal fault type for per-node error isolation.
//!
//! A [`Fault`] is raised (as an `Err`) while processing a single subtree,
//! caught at that subtree's boundary, converted into a [`TallyError`] with
//! the calling node's source context back-filled, and folded into the shared
//! [`ErrorSet`](tally_types::ErrorSet). Faults never unwind past a pass
//! boundary.

use tally_types::{ErrorCode, SourceContext, TallyError};
use thiserror::Error;

/// A recoverable analysis fault, raised locally and accumulated centrally.
#[derive(Debug, Clone, Error)]
pub enum Fault {
    // ── Symbol faults ──
    #[error("duplicate definition of '{0}'")]
    DuplicateDefinition(String),
    #[error("'{0}' not found")]
    NotFound(String),
    #[error("'{name}' is ambiguous: registered from both '{first}' and '{second}'")]
    AmbiguousImport {
        name: String,
        first: String,
        second: String,
    },
    #[error("'{0}' is not {1}")]
    WrongSymbolKind(String, &'static str),

    // ── Type faults ──
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
    #[error("'{name}' expects {expected} argument(s), got {got}")]
    WrongArgCount {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("'{name}' expects {expected} type argument(s), got {got}")]
    WrongTypeArgCount {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("cannot infer {0}")]
    CannotInfer(String),
    #[error("branches have incompatible types: {0} and {1}")]
    CannotUnify(String, String),
    #[error("cannot assign to immutable '{0}'")]
    ImmutableTarget(String),

    // ── Cost faults ──
    #[error("cost expression is not closed: {0}")]
    UnresolvedCost(String),
    #[error("{0}")]
    CostNotPositive(String),
    #[error("cost bound {bound} exceeds the architecture ceiling {limit}")]
    CostOverLimit { bound: u64, limit: u64 },
    #[error("{0}")]
    UnsafeCostCeiling(String),

    // ── Feature bans ──
    #[error("{0}")]
    FeatureBanned(String),
    #[error("recursion is not allowed: {0}")]
    RecursionNotAllowed(String),

    // ── Internal invariant violations ──
    #[error("internal analysis fault: {0}")]
    Internal(String),
    #[error("analysis output for {0} was assigned twice")]
    AnnotationOverwrite(String),
    #[error("illegal final type for {node}: {ty}")]
    IllegalFinalType { node: String, ty: String },
}

impl Fault {
    /// The error code this fault reports under.
    pub fn code(&self) -> ErrorCode {
        match self {
            Fault::DuplicateDefinition(_) => ErrorCode::DUPLICATE_DEFINITION,
            Fault::NotFound(_) => ErrorCode::SYMBOL_NOT_FOUND,
            Fault::AmbiguousImport { .. } => ErrorCode::AMBIGUOUS_IMPORT,
            Fault::WrongSymbolKind(_, _) => ErrorCode::WRONG_SYMBOL_KIND,
            Fault::TypeMismatch { .. } => ErrorCode::TYPE_MISMATCH,
            Fault::WrongArgCount { .. } => ErrorCode::WRONG_ARG_COUNT,
            Fault::WrongTypeArgCount { .. } => ErrorCode::WRONG_TYPE_ARG_COUNT,
            Fault::CannotInfer(_) => ErrorCode::CANNOT_INFER_TYPE_PARAMETER,
            Fault::CannotUnify(_, _) => ErrorCode::CANNOT_UNIFY_BRANCHES,
            Fault::ImmutableTarget(_) => ErrorCode::IMMUTABLE_TARGET,
            Fault::UnresolvedCost(_) => ErrorCode::COST_NOT_EVALUABLE,
            Fault::CostNotPositive(_) => ErrorCode::COST_NOT_POSITIVE,
            Fault::CostOverLimit { .. } => ErrorCode::COST_OVER_LIMIT,
            Fault::UnsafeCostCeiling(_) => ErrorCode::UNSAFE_COST_CEILING,
            Fault::FeatureBanned(_) => ErrorCode::FEATURE_BANNED,
            Fault::RecursionNotAllowed(_) => ErrorCode::RECURSION_NOT_ALLOWED,
            Fault::Internal(_) => ErrorCode::INTERNAL,
            Fault::AnnotationOverwrite(_) => ErrorCode::ANNOTATION_OVERWRITE,
            Fault::IllegalFinalType { .. } => ErrorCode::ILLEGAL_FINAL_TYPE,
        }
    }

    /// Convert into a context-free error; the catch site back-fills context.
    pub fn raise(self) -> TallyError {
        let code = self.code();
        TallyError::new(code, self.to_string(), SourceContext::NotInSource)
    }

    /// Convert into an error at a known source context.
    pub fn at(self, context: SourceContext) -> TallyError {
        let code = self.code();
        TallyError::new(code, self.to_string(), context)
    }
}
