//! Tally semantic front end.
//!
//! ```text
//! ParsedTree + Prelude + Architecture
//!     → bind_scopes → scan_type_params → bind_members
//!     → propagate_types → check_types
//!     → build_costs (+ order_functions) → evaluate_budget
//!     → Analysis | ErrorSet
//! ```
//!
//! Given a parsed program tree, resolve every name to a symbol, infer and
//! check every expression's type under a generics/substitution model, and
//! compute a provable symbolic upper bound on execution cost, evaluated
//! against the architecture's budget before anything runs. The parser and
//! the runtime evaluator are external collaborators: the evaluator consumes
//! the returned side tables and never re-derives types or costs.

pub mod arch;
pub mod cost;
pub mod fault;
pub mod prelude;
pub mod scope;
pub mod subst;
pub mod symbol;
pub mod tables;
pub mod ty;

mod passes;

pub use arch::Architecture;
pub use cost::{hash_cost, CostEvaluator, CostExpression, MAX_SAFE_COST_LIMIT};
pub use fault::Fault;
pub use passes::evaluate_budget::ENTRY_FUNCTION;
pub use prelude::Prelude;
pub use subst::{infer_bindings, instantiate, SubstitutionChain};
pub use tables::{Annotations, FieldInfo, FunctionSig, Resolution};
pub use ty::Type;

use tally_types::ast::FileNode;
use tally_types::ErrorSet;

/// The fully annotated result of a successful analysis.
///
/// A runtime evaluator reads everything it needs from here: per-node types
/// and costs, call-site resolutions, the callees-first function order, each
/// function's evaluated bound, and the entry function's root bound.
#[derive(Debug)]
pub struct Analysis {
    pub tables: Annotations,
    /// Evaluated bound of the entry function, when one exists.
    pub root_bound: Option<u64>,
}

/// Run the full pipeline over a parsed tree.
///
/// Returns the annotated tables on success, or every error the run could
/// surface — passes record recoverable errors and keep going, so one
/// attempt reports as many independent problems as possible.
pub fn analyze(
    file: &FileNode,
    prelude: &Prelude,
    arch: &Architecture,
) -> Result<Analysis, ErrorSet> {
    let mut sess = match passes::Session::new(file, prelude, arch) {
        Ok(sess) => sess,
        Err(error) => {
            let mut errors = ErrorSet::new();
            errors.push(error);
            return Err(errors);
        }
    };

    passes::bind_scopes::run(&mut sess);
    passes::scan_type_params::run(&mut sess);
    passes::bind_members::run(&mut sess);
    passes::propagate_types::run(&mut sess);
    passes::check_types::run(&mut sess);
    passes::build_costs::run(&mut sess);
    let root_bound = passes::evaluate_budget::run(&mut sess);

    if sess.errors.has_errors() {
        Err(sess.errors)
    } else {
        Ok(Analysis {
            tables: sess.tables,
            root_bound,
        })
    }
}
