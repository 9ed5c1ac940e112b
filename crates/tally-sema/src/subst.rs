//! Layered substitution chains for generic types.
//!
//! A [`SubstitutionChain`] maps type parameters to types in ordered layers.
//! Replaying a type resolves each parameter against the *first* layer that
//! binds it and then continues resolution strictly *after* that layer, so a
//! binding's right-hand side can mention a parameter of the same name from an
//! enclosing scope without being captured by its own layer.

use std::rc::Rc;

use crate::cost::{hash_cost, CostExpression};
use crate::fault::Fault;
use crate::ty::{FunctionType, Instantiation, ParamKind, Type, TypeParameter};

/// One layer of bindings. Insertion order is the declaration order of the
/// terminus's type parameters.
type Layer = Vec<(TypeParameter, Type)>;

/// An ordered stack of substitution layers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubstitutionChain {
    layers: Vec<Layer>,
}

impl SubstitutionChain {
    /// The empty chain; replay is the identity.
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// A single-layer chain.
    pub fn of(bindings: Vec<(TypeParameter, Type)>) -> Self {
        Self {
            layers: vec![bindings],
        }
    }

    /// This chain followed by one more layer of bindings.
    pub fn then(&self, bindings: Vec<(TypeParameter, Type)>) -> Self {
        let mut layers = self.layers.clone();
        layers.push(bindings);
        Self { layers }
    }

    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(Vec::is_empty)
    }

    /// Apply every binding RHS through `f`, keeping the layer structure.
    /// Used to push an outer substitution *into* an instantiation's chain
    /// without touching the parameters the chain itself binds.
    pub fn map_bindings(&self, mut f: impl FnMut(&Type) -> Type) -> Self {
        Self {
            layers: self
                .layers
                .iter()
                .map(|layer| {
                    layer
                        .iter()
                        .map(|(p, t)| (p.clone(), f(t)))
                        .collect()
                })
                .collect(),
        }
    }

    /// Resolve a type through the whole chain.
    pub fn replay(&self, ty: &Type) -> Type {
        self.replay_from(0, ty)
    }

    fn replay_from(&self, start: usize, ty: &Type) -> Type {
        match ty {
            Type::Parameter(p) => {
                for (i, layer) in self.layers.iter().enumerate().skip(start) {
                    if let Some((_, bound)) = layer.iter().find(|(q, _)| q == p) {
                        // The RHS was written outside this layer's scope:
                        // resolve it only against later layers.
                        return self.replay_from(i + 1, bound);
                    }
                }
                ty.clone()
            }
            Type::Function(ft) => Type::Function(FunctionType {
                params: ft
                    .params
                    .iter()
                    .map(|p| self.replay_from(start, p))
                    .collect(),
                ret: Box::new(self.replay_from(start, &ft.ret)),
            }),
            Type::Instantiation(inst) => Type::Instantiation(Rc::new(Instantiation {
                terminus: inst.terminus.clone(),
                chain: inst.chain.map_bindings(|t| self.replay_from(start, t)),
            })),
            Type::Cost(c) => Type::Cost(self.replay_cost_from(start, c)),
            _ => ty.clone(),
        }
    }

    /// Resolve the symbolic leaves of a cost expression through the chain.
    pub fn replay_cost(&self, cost: &CostExpression) -> CostExpression {
        self.replay_cost_from(0, cost)
    }

    fn replay_cost_from(&self, start: usize, cost: &CostExpression) -> CostExpression {
        match cost {
            CostExpression::Fin(_) | CostExpression::ConstantFin => cost.clone(),
            CostExpression::FinParameter(name) => {
                let resolved =
                    self.replay_from(start, &Type::Parameter(TypeParameter::fin(name.clone())));
                match resolved {
                    Type::Cost(c) => c,
                    Type::Parameter(q) => CostExpression::FinParameter(q.name),
                    _ => cost.clone(),
                }
            }
            CostExpression::ParameterHashCode(name) => {
                let resolved = self.replay_from(
                    start,
                    &Type::Parameter(TypeParameter::standard(name.clone())),
                );
                hash_cost(&resolved)
            }
            CostExpression::InstantiationHashCode { terminus, parameter } => {
                let resolved = self.replay_from(
                    start,
                    &Type::Parameter(TypeParameter::standard(parameter.clone())),
                );
                match resolved {
                    Type::Parameter(q) if q.kind == ParamKind::Standard => {
                        CostExpression::InstantiationHashCode {
                            terminus: terminus.clone(),
                            parameter: q.name,
                        }
                    }
                    other => hash_cost(&other),
                }
            }
            CostExpression::Sum(cs) => {
                CostExpression::sum(cs.iter().map(|c| self.replay_cost_from(start, c)).collect())
            }
            CostExpression::Product(cs) => CostExpression::product(
                cs.iter().map(|c| self.replay_cost_from(start, c)).collect(),
            ),
            CostExpression::Max(cs) => {
                CostExpression::max(cs.iter().map(|c| self.replay_cost_from(start, c)).collect())
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Instantiation and inference
// ══════════════════════════════════════════════════════════════════════════════

/// Bind a generic terminus's parameters to explicit type arguments.
///
/// Checks arity and that each fin-kind parameter receives a cost (or another
/// fin parameter) and each standard parameter does not.
pub fn instantiate(terminus: Type, args: Vec<Type>) -> Result<Type, Fault> {
    let params = terminus.type_params();
    if params.is_empty() {
        return Err(Fault::WrongTypeArgCount {
            name: terminus.name().to_string(),
            expected: 0,
            got: args.len(),
        });
    }
    let bindings = bind_args(terminus.name(), params, args)?;
    Ok(Type::Instantiation(Rc::new(Instantiation {
        terminus,
        chain: SubstitutionChain::of(bindings),
    })))
}

/// Zip declared parameters with explicit type arguments, checking arity and
/// parameter kinds. Shared by type instantiation and generic function calls.
pub fn bind_args(
    name: &str,
    params: &[TypeParameter],
    args: Vec<Type>,
) -> Result<Vec<(TypeParameter, Type)>, Fault> {
    if params.len() != args.len() {
        return Err(Fault::WrongTypeArgCount {
            name: name.to_string(),
            expected: params.len(),
            got: args.len(),
        });
    }
    let mut bindings = Vec::with_capacity(args.len());
    for (param, arg) in params.iter().zip(args) {
        check_param_kind(param, &arg)?;
        bindings.push((param.clone(), arg));
    }
    Ok(bindings)
}

fn check_param_kind(param: &TypeParameter, arg: &Type) -> Result<(), Fault> {
    if arg.is_error() {
        return Ok(());
    }
    let arg_is_fin = matches!(arg, Type::Cost(_))
        || matches!(arg, Type::Parameter(q) if q.kind == ParamKind::Fin);
    match param.kind {
        ParamKind::Fin if !arg_is_fin => Err(Fault::TypeMismatch {
            expected: format!("a cost bound for fin parameter '{}'", param.name),
            found: arg.to_string(),
        }),
        ParamKind::Standard if arg_is_fin => Err(Fault::TypeMismatch {
            expected: format!("a type for parameter '{}'", param.name),
            found: arg.to_string(),
        }),
        _ => Ok(()),
    }
}

/// Unify a declared (possibly parameterized) type against an actual argument
/// type, accumulating parameter bindings.
///
/// A parameter seen twice must resolve consistently; two closed fin bounds
/// for the same fin parameter widen to the larger one.
pub fn infer_bindings(
    declared: &Type,
    actual: &Type,
    bindings: &mut Vec<(TypeParameter, Type)>,
) -> Result<(), Fault> {
    if actual.is_error() {
        return Ok(());
    }
    match (declared, actual) {
        (Type::Parameter(p), _) => {
            match bindings.iter_mut().find(|(q, _)| q == p) {
                None => bindings.push((p.clone(), actual.clone())),
                Some((_, existing)) => {
                    if actual.assignable_to(existing) {
                        // consistent; keep the wider existing binding
                    } else if existing.assignable_to(actual) {
                        *existing = actual.clone();
                    } else {
                        return Err(Fault::TypeMismatch {
                            expected: existing.to_string(),
                            found: actual.to_string(),
                        });
                    }
                }
            }
            Ok(())
        }
        (Type::Instantiation(d), Type::Instantiation(a)) => {
            if d.terminus != a.terminus {
                return Err(Fault::TypeMismatch {
                    expected: declared.to_string(),
                    found: actual.to_string(),
                });
            }
            for param in d.terminus.type_params() {
                let dp = d.chain.replay(&Type::Parameter(param.clone()));
                let ap = a.chain.replay(&Type::Parameter(param.clone()));
                infer_bindings(&dp, &ap, bindings)?;
            }
            Ok(())
        }
        (Type::Function(d), Type::Function(a)) => {
            if d.params.len() != a.params.len() {
                return Err(Fault::TypeMismatch {
                    expected: declared.to_string(),
                    found: actual.to_string(),
                });
            }
            for (dp, ap) in d.params.iter().zip(a.params.iter()) {
                infer_bindings(dp, ap, bindings)?;
            }
            infer_bindings(&d.ret, &a.ret, bindings)
        }
        _ => {
            if actual.assignable_to(declared) {
                Ok(())
            } else {
                Err(Fault::TypeMismatch {
                    expected: declared.to_string(),
                    found: actual.to_string(),
                })
            }
        }
    }
}
