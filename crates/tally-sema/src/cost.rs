//! Symbolic cost expressions and their evaluator.
//!
//! A [`CostExpression`] is a provable upper bound on the work needed to
//! evaluate an expression, computed before anything runs. Closed trees fold
//! to a number; trees containing a symbolic leaf (a fin type parameter, or a
//! hash cost bound to a generic parameter) stay composable until a
//! substitution chain replays concrete types into them.
//!
//! Combinator children are kept in a canonical sort order so structurally
//! equal expressions compare equal regardless of construction order.

use std::fmt;

use crate::arch::Architecture;
use crate::fault::Fault;
use crate::ty::{ParamKind, Type};
use tally_types::TallyError;

// ══════════════════════════════════════════════════════════════════════════════
// CostExpression
// ══════════════════════════════════════════════════════════════════════════════

/// A symbolic, always-positive execution cost.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CostExpression {
    /// A closed numeric constant.
    Fin(u64),
    /// The architecture's default per-node cost.
    ConstantFin,
    /// An unresolved cost bound to a fin-kind type parameter.
    FinParameter(String),
    /// The cost of hashing/comparing a value whose type is a generic
    /// parameter, resolved when the parameter is bound.
    ParameterHashCode(String),
    /// The cost of hashing/comparing a value whose type is a generic
    /// instantiation still depending on an outer parameter.
    InstantiationHashCode { terminus: String, parameter: String },
    /// Sequential cost.
    Sum(Vec<CostExpression>),
    /// Repeated cost (per-iteration cost × element count).
    Product(Vec<CostExpression>),
    /// Branch cost — the worse of several alternatives.
    Max(Vec<CostExpression>),
}

impl CostExpression {
    /// Sequential composition. Children are canonically sorted; a single
    /// child collapses to itself and no children collapse to [`ConstantFin`].
    pub fn sum(children: Vec<CostExpression>) -> CostExpression {
        Self::combinator(children, CostExpression::Sum)
    }

    /// Repeated composition.
    pub fn product(children: Vec<CostExpression>) -> CostExpression {
        Self::combinator(children, CostExpression::Product)
    }

    /// Worst-case selection.
    pub fn max(children: Vec<CostExpression>) -> CostExpression {
        Self::combinator(children, CostExpression::Max)
    }

    fn combinator(
        mut children: Vec<CostExpression>,
        build: fn(Vec<CostExpression>) -> CostExpression,
    ) -> CostExpression {
        match children.len() {
            0 => CostExpression::ConstantFin,
            1 => children.remove(0),
            _ => {
                children.sort();
                build(children)
            }
        }
    }

    /// True iff every leaf is closed ([`Fin`](CostExpression::Fin) or
    /// [`ConstantFin`](CostExpression::ConstantFin)). Must be checked before
    /// [`CostEvaluator::eval`] on any tree that might still carry an
    /// unresolved generic placeholder.
    pub fn can_eval(&self) -> bool {
        match self {
            CostExpression::Fin(_) | CostExpression::ConstantFin => true,
            CostExpression::FinParameter(_)
            | CostExpression::ParameterHashCode(_)
            | CostExpression::InstantiationHashCode { .. } => false,
            CostExpression::Sum(cs) | CostExpression::Product(cs) | CostExpression::Max(cs) => {
                cs.iter().all(CostExpression::can_eval)
            }
        }
    }
}

impl fmt::Display for CostExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, name: &str, cs: &[CostExpression]) -> fmt::Result {
            write!(f, "{}(", name)?;
            for (i, c) in cs.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", c)?;
            }
            write!(f, ")")
        }
        match self {
            CostExpression::Fin(n) => write!(f, "{}", n),
            CostExpression::ConstantFin => write!(f, "c"),
            CostExpression::FinParameter(p) => write!(f, "fin {}", p),
            CostExpression::ParameterHashCode(p) => write!(f, "hash({})", p),
            CostExpression::InstantiationHashCode { terminus, parameter } => {
                write!(f, "hash({}<{}>)", terminus, parameter)
            }
            CostExpression::Sum(cs) => join(f, "sum", cs),
            CostExpression::Product(cs) => join(f, "product", cs),
            CostExpression::Max(cs) => join(f, "max", cs),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Hash cost derivation
// ══════════════════════════════════════════════════════════════════════════════

/// The cost of hashing or comparing one value of the given type.
///
/// For a generic instantiation, only the terminus's **first** declared type
/// parameter is inspected: every hashable built-in container is keyed by its
/// first parameter (`Set<E, N>`, `Dictionary<K, V, N>`).
pub fn hash_cost(ty: &Type) -> CostExpression {
    match ty {
        Type::Parameter(p) if p.kind == ParamKind::Standard => {
            CostExpression::ParameterHashCode(p.name.clone())
        }
        Type::Cost(c) => c.clone(),
        Type::Instantiation(inst) => {
            let params = inst.terminus.type_params();
            match params.first() {
                None => CostExpression::ConstantFin,
                Some(first) => {
                    let resolved = inst.chain.replay(&Type::Parameter(first.clone()));
                    match resolved {
                        Type::Parameter(q) if q.kind == ParamKind::Standard => {
                            CostExpression::InstantiationHashCode {
                                terminus: inst.terminus.name().to_string(),
                                parameter: q.name,
                            }
                        }
                        other => hash_cost(&other),
                    }
                }
            }
        }
        // Ground nominal types, functions and the error sentinel hash at the
        // flat per-node cost.
        _ => CostExpression::ConstantFin,
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// CostEvaluator
// ══════════════════════════════════════════════════════════════════════════════

/// Largest `cost_upper_limit` for which a single clamped `Product` step
/// cannot overflow `u64` (operands are clamped to `limit + 1`).
pub const MAX_SAFE_COST_LIMIT: u64 = (u32::MAX as u64) - 1;

/// Folds closed cost trees to a concrete bound, clamping at `limit + 1`
/// instead of overflowing.
///
/// Construction verifies the architecture's ceiling once; evaluation then
/// never needs checked arithmetic beyond the clamp.
#[derive(Debug, Clone)]
pub struct CostEvaluator {
    default_node_cost: u64,
    limit: u64,
}

impl CostEvaluator {
    /// Build an evaluator for the given architecture.
    ///
    /// Runs [`Architecture::validate`]: rejects a ceiling large enough that a
    /// single `Product` could overflow, and any zero cost (default or
    /// overlay — costs are always positive).
    pub fn new(arch: &Architecture) -> Result<CostEvaluator, TallyError> {
        arch.validate().map_err(Fault::raise)?;
        Ok(CostEvaluator {
            default_node_cost: arch.default_node_cost,
            limit: arch.cost_upper_limit,
        })
    }

    /// The enforced ceiling.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Fold a closed cost tree to a concrete bound.
    ///
    /// Evaluating an unresolved symbolic leaf is a hard internal fault, never
    /// a silent default — callers must check [`CostExpression::can_eval`]
    /// first. A result of zero signals an implementation defect.
    pub fn eval(&self, cost: &CostExpression) -> Result<u64, Fault> {
        let bound = self.fold(cost)?;
        if bound == 0 {
            return Err(Fault::CostNotPositive(
                "evaluated cost is not positive".to_string(),
            ));
        }
        Ok(bound)
    }

    fn fold(&self, cost: &CostExpression) -> Result<u64, Fault> {
        match cost {
            CostExpression::Fin(n) => Ok(self.clamp(*n)),
            CostExpression::ConstantFin => Ok(self.clamp(self.default_node_cost)),
            CostExpression::FinParameter(_)
            | CostExpression::ParameterHashCode(_)
            | CostExpression::InstantiationHashCode { .. } => {
                Err(Fault::UnresolvedCost(cost.to_string()))
            }
            CostExpression::Sum(cs) => {
                let mut acc = 0u64;
                for c in cs {
                    acc = self.clamped_add(acc, self.fold(c)?);
                }
                Ok(acc)
            }
            CostExpression::Product(cs) => {
                let mut acc = 1u64;
                for c in cs {
                    acc = self.clamped_mul(acc, self.fold(c)?);
                }
                Ok(acc)
            }
            CostExpression::Max(cs) => {
                let mut acc = 0u64;
                for c in cs {
                    acc = acc.max(self.fold(c)?);
                }
                Ok(acc)
            }
        }
    }

    fn clamp(&self, v: u64) -> u64 {
        if v > self.limit {
            self.limit + 1
        } else {
            v
        }
    }

    /// Clamped addition: operands already exceeding the ceiling poison the
    /// result to `limit + 1`. Operands are ≤ `limit + 1 ≤ u32::MAX`, so the
    /// raw sum cannot overflow `u64`.
    fn clamped_add(&self, a: u64, b: u64) -> u64 {
        if a > self.limit || b > self.limit {
            self.limit + 1
        } else {
            self.clamp(a + b)
        }
    }

    /// Clamped multiplication, same poisoning rule. Operands are ≤ `limit ≤
    /// u32::MAX − 1` in the non-poisoned case, so the raw product fits `u64`.
    fn clamped_mul(&self, a: u64, b: u64) -> u64 {
        if a > self.limit || b > self.limit {
            self.limit + 1
        } else {
            self.clamp(a * b)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_types::ErrorCode;

    fn evaluator(default: u64, limit: u64) -> CostEvaluator {
        CostEvaluator::new(&Architecture::new(default, limit)).unwrap()
    }

    #[test]
    fn test_sum_of_fins_adds() {
        let ev = evaluator(1, 1000);
        let c = CostExpression::sum(vec![CostExpression::Fin(3), CostExpression::Fin(4)]);
        assert_eq!(ev.eval(&c).unwrap(), 7);
    }

    #[test]
    fn test_clamping_law() {
        let ev = evaluator(1, 10);
        // Either operand above the ceiling poisons the result to limit + 1.
        let over = CostExpression::sum(vec![CostExpression::Fin(11), CostExpression::Fin(1)]);
        assert_eq!(ev.eval(&over).unwrap(), 11);
        let sum_over = CostExpression::sum(vec![CostExpression::Fin(6), CostExpression::Fin(6)]);
        assert_eq!(ev.eval(&sum_over).unwrap(), 11);
    }

    #[test]
    fn test_nested_product_cannot_overflow() {
        let ev = evaluator(1, MAX_SAFE_COST_LIMIT);
        let huge = CostExpression::Fin(MAX_SAFE_COST_LIMIT);
        let mut tree = huge.clone();
        for _ in 0..8 {
            tree = CostExpression::product(vec![tree, huge.clone()]);
        }
        assert_eq!(ev.eval(&tree).unwrap(), MAX_SAFE_COST_LIMIT + 1);
    }

    #[test]
    fn test_product_multiplies() {
        let ev = evaluator(1, 1000);
        let c = CostExpression::product(vec![CostExpression::Fin(5), CostExpression::Fin(7)]);
        assert_eq!(ev.eval(&c).unwrap(), 35);
    }

    #[test]
    fn test_max_takes_worst_branch() {
        let ev = evaluator(1, 1000);
        let c = CostExpression::max(vec![
            CostExpression::Fin(5),
            CostExpression::Fin(90),
            CostExpression::Fin(12),
        ]);
        assert_eq!(ev.eval(&c).unwrap(), 90);
    }

    #[test]
    fn test_constant_fin_uses_default_node_cost() {
        let ev = evaluator(3, 1000);
        assert_eq!(ev.eval(&CostExpression::ConstantFin).unwrap(), 3);
    }

    #[test]
    fn test_can_eval_false_with_symbolic_leaf() {
        let c = CostExpression::sum(vec![
            CostExpression::Fin(2),
            CostExpression::FinParameter("N".into()),
        ]);
        assert!(!c.can_eval());
        let closed = CostExpression::sum(vec![CostExpression::Fin(2), CostExpression::Fin(3)]);
        assert!(closed.can_eval());
    }

    #[test]
    fn test_eval_rejects_unresolved_leaf() {
        let ev = evaluator(1, 1000);
        let c = CostExpression::FinParameter("N".into());
        assert!(matches!(ev.eval(&c), Err(Fault::UnresolvedCost(_))));
        let h = CostExpression::ParameterHashCode("T".into());
        assert!(matches!(ev.eval(&h), Err(Fault::UnresolvedCost(_))));
    }

    #[test]
    fn test_canonical_child_order() {
        let a = CostExpression::sum(vec![CostExpression::Fin(1), CostExpression::Fin(2)]);
        let b = CostExpression::sum(vec![CostExpression::Fin(2), CostExpression::Fin(1)]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_singleton_combinator_collapses() {
        let c = CostExpression::max(vec![CostExpression::Fin(9)]);
        assert_eq!(c, CostExpression::Fin(9));
    }

    #[test]
    fn test_unsafe_ceiling_rejected_at_construction() {
        let arch = Architecture::new(1, MAX_SAFE_COST_LIMIT + 1);
        let err = CostEvaluator::new(&arch).unwrap_err();
        assert_eq!(err.code, ErrorCode::UNSAFE_COST_CEILING);
    }

    #[test]
    fn test_zero_default_cost_rejected() {
        let arch = Architecture::new(0, 100);
        let err = CostEvaluator::new(&arch).unwrap_err();
        assert_eq!(err.code, ErrorCode::COST_NOT_POSITIVE);
    }

    #[test]
    fn test_zero_overlay_cost_rejected() {
        let arch = Architecture::new(1, 100).with_overlay("let", 0);
        let err = CostEvaluator::new(&arch).unwrap_err();
        assert_eq!(err.code, ErrorCode::COST_NOT_POSITIVE);
        assert!(err.message.contains("let"));
    }
}
