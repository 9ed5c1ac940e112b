//! The ordered analysis pipeline.
//!
//! Each pass fully completes before the next begins and assumes the
//! invariants its predecessors committed: type propagation requires every
//! definition to have a scope and formal-parameter symbols, cost building
//! requires every node to have a type, budget evaluation requires every
//! function to have a cost. Passes never abort on a user error — they record
//! it, substitute the error sentinel, and continue.

pub(crate) mod bind_members;
pub(crate) mod bind_scopes;
pub(crate) mod build_costs;
pub(crate) mod check_types;
pub(crate) mod evaluate_budget;
pub(crate) mod order_functions;
pub(crate) mod propagate_types;
pub(crate) mod scan_type_params;

use crate::arch::Architecture;
use crate::fault::Fault;
use crate::prelude::Prelude;
use crate::scope::{ScopeArena, ScopeId};
use crate::subst::instantiate;
use crate::tables::Annotations;
use crate::ty::{FunctionType, Type};
use tally_types::ast::{FileNode, SignifierKind, TypeSignifier};
use tally_types::{ErrorSet, SourceContext, Span, TallyError};

/// Shared state threaded through every pass.
pub(crate) struct Session<'a> {
    pub file: &'a FileNode,
    pub prelude: &'a Prelude,
    pub arch: &'a Architecture,
    pub arena: ScopeArena,
    pub tables: Annotations,
    pub errors: ErrorSet,
    pub prelude_scope: ScopeId,
}

impl<'a> Session<'a> {
    pub fn new(
        file: &'a FileNode,
        prelude: &'a Prelude,
        arch: &'a Architecture,
    ) -> Result<Self, TallyError> {
        let mut arena = ScopeArena::new();
        let prelude_scope = prelude.install(&mut arena).map_err(Fault::raise)?;
        let mut tables = Annotations::new();
        prelude.seed(&mut tables).map_err(Fault::raise)?;
        Ok(Self {
            file,
            prelude,
            arch,
            arena,
            tables,
            errors: ErrorSet::new(),
            prelude_scope,
        })
    }

    pub fn ctx(&self, span: Span) -> SourceContext {
        SourceContext::at(self.file.name.as_deref(), span)
    }

    /// Record a recoverable fault at the given source position.
    ///
    /// Faults whose payload already carries the error sentinel are derived
    /// noise from an earlier root cause and are filtered from the report.
    pub fn record(&mut self, span: Span, fault: Fault) {
        let sentinel = payload_is_sentinel(&fault);
        let mut error = fault.raise().with_context(self.ctx(span));
        if sentinel {
            error = error.derived_from_sentinel();
        }
        self.errors.push(error);
    }

    /// Resolve a written type signifier to a semantic type, in `scope`.
    pub fn resolve_signifier(
        &self,
        scope: ScopeId,
        sig: &TypeSignifier,
    ) -> Result<Type, Fault> {
        match &sig.kind {
            SignifierKind::Ground(name) => {
                let symbol = self.arena.fetch(scope, name)?;
                let ty = symbol
                    .terminus_type()
                    .ok_or_else(|| Fault::WrongSymbolKind(name.clone(), "a type"))?;
                if ty.is_raw_generic() {
                    return Err(Fault::WrongTypeArgCount {
                        name: name.clone(),
                        expected: ty.type_params().len(),
                        got: 0,
                    });
                }
                Ok(ty)
            }
            SignifierKind::Parameterized { name, args } => {
                let symbol = self.arena.fetch(scope, name)?;
                let terminus = symbol
                    .terminus_type()
                    .ok_or_else(|| Fault::WrongSymbolKind(name.clone(), "a type"))?;
                if terminus.is_error() {
                    return Ok(Type::Error);
                }
                let args = args
                    .iter()
                    .map(|a| self.resolve_signifier(scope, a))
                    .collect::<Result<Vec<_>, _>>()?;
                instantiate(terminus, args)
            }
            SignifierKind::FunctionType { params, ret } => {
                let params = params
                    .iter()
                    .map(|p| self.resolve_signifier(scope, p))
                    .collect::<Result<Vec<_>, _>>()?;
                let ret = Box::new(self.resolve_signifier(scope, ret)?);
                Ok(Type::Function(FunctionType { params, ret }))
            }
            SignifierKind::NumericLiteral(n) => {
                Ok(Type::Cost(crate::cost::CostExpression::Fin(*n)))
            }
            SignifierKind::Implicit => {
                Err(Fault::CannotInfer("an omitted type in this position".into()))
            }
        }
    }
}

fn payload_is_sentinel(fault: &Fault) -> bool {
    match fault {
        Fault::TypeMismatch { expected, found } => {
            expected.contains("<error>") || found.contains("<error>")
        }
        Fault::CannotUnify(a, b) => a.contains("<error>") || b.contains("<error>"),
        Fault::UnresolvedCost(c) => c.contains("<error>"),
        _ => false,
    }
}
