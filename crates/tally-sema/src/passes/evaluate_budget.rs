//! Pass 8: budget evaluation and enforcement.
//!
//! Evaluates every non-generic function's closed cost bound against the
//! architecture ceiling. Generic functions keep a symbolic cost and are
//! charged at their call sites after replay; a symbolic cost left on a
//! non-generic function is a cost error. The entry function's bound is the
//! script's root bound.

use std::collections::HashMap;

use crate::cost::CostEvaluator;
use crate::fault::Fault;
use crate::passes::Session;
use tally_types::ast::{Def, NodeId};
use tally_types::Span;

/// Name of the script entry function.
pub const ENTRY_FUNCTION: &str = "main";

pub(crate) fn run(sess: &mut Session<'_>) -> Option<u64> {
    let evaluator = match CostEvaluator::new(sess.arch) {
        Ok(e) => e,
        Err(error) => {
            sess.errors.push(error.with_context(sess.ctx(sess.file.span)));
            return None;
        }
    };

    let mut spans: HashMap<NodeId, (String, Span)> = HashMap::new();
    for def in &sess.file.defs {
        if let Def::Function(f) = def {
            spans.insert(f.id, (f.name.name.clone(), f.span));
        }
    }

    let mut root_bound = None;
    for def in sess.tables.function_order.clone() {
        let Some((name, span)) = spans.get(&def).cloned() else {
            continue;
        };
        let generic = sess
            .tables
            .signature_of(def)
            .is_some_and(|sig| !sig.type_params.is_empty());
        if generic {
            continue;
        }
        let Some(cost) = sess.tables.function_cost(def).cloned() else {
            continue;
        };
        if !cost.can_eval() {
            sess.record(span, Fault::UnresolvedCost(cost.to_string()));
            continue;
        }
        match evaluator.eval(&cost) {
            Err(fault) => sess.record(span, fault),
            Ok(bound) => {
                sess.tables.function_bounds.insert(def, bound);
                if bound > evaluator.limit() {
                    sess.record(
                        span,
                        Fault::CostOverLimit {
                            bound,
                            limit: evaluator.limit(),
                        },
                    );
                } else if name == ENTRY_FUNCTION {
                    root_bound = Some(bound);
                }
            }
        }
    }
    root_bound
}
