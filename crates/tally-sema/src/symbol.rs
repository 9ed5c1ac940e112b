//! Resolved symbols.
//!
//! A [`Symbol`] is what a name resolves to once scope binding has run. Each
//! definition symbol carries only its identity (the defining [`NodeId`] or
//! shared declaration); deferred data such as signatures, field lists and
//! cost expressions lives in the side tables, populated by later passes.

use std::rc::Rc;

use crate::cost::CostExpression;
use crate::ty::{ObjectDecl, RecordDecl, SumDecl, Type, TypeParameter};
use tally_types::ast::NodeId;

/// One formal parameter of a built-in function, with the multiplier its
/// argument's cost is scaled by at call sites.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginParam {
    pub ty: Type,
    pub cost_multiplier: CostExpression,
}

impl PluginParam {
    /// A parameter whose argument is charged exactly once.
    pub fn plain(ty: Type) -> Self {
        Self {
            ty,
            cost_multiplier: CostExpression::Fin(1),
        }
    }

    pub fn scaled(ty: Type, cost_multiplier: CostExpression) -> Self {
        Self {
            ty,
            cost_multiplier,
        }
    }
}

/// A built-in function or member, carrying its own execution cost.
///
/// Parameter and return types may mention the owning terminus's type
/// parameters; call sites replay them through the receiver's chain.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginFunction {
    pub name: String,
    pub type_params: Vec<TypeParameter>,
    pub params: Vec<PluginParam>,
    pub ret: Type,
    pub cost: CostExpression,
}

/// What a name resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    /// Error sentinel — stands in for a failed definition so later lookups
    /// do not cascade.
    Error,
    /// A `let` binding.
    Variable {
        def: NodeId,
        ty: Type,
        mutable: bool,
    },
    /// A function formal parameter.
    FormalParam { def: NodeId, ty: Type },
    /// A user-defined function; its signature lives in the side tables.
    Function { def: NodeId, name: String },
    /// A record definition.
    Record(Rc<RecordDecl>),
    /// An object (singleton) definition.
    Object(Rc<ObjectDecl>),
    /// A sum-type definition; members resolve through its member scope.
    Sum(Rc<SumDecl>),
    /// A built-in type terminus.
    Builtin(Type),
    /// A generic type parameter in scope.
    TypeParam(TypeParameter),
    /// A built-in free function.
    Plugin(Rc<PluginFunction>),
}

impl Symbol {
    pub fn is_error(&self) -> bool {
        matches!(self, Symbol::Error)
    }

    /// The terminus type this symbol names, if it names a type.
    pub fn terminus_type(&self) -> Option<Type> {
        match self {
            Symbol::Error => Some(Type::Error),
            Symbol::Record(r) => Some(Type::Record(r.clone())),
            Symbol::Object(o) => Some(Type::Object(o.clone())),
            Symbol::Sum(s) => Some(Type::Sum(s.clone())),
            Symbol::Builtin(t) => Some(t.clone()),
            Symbol::TypeParam(p) => Some(Type::Parameter(p.clone())),
            _ => None,
        }
    }

    /// The defining node of a definition symbol with a member scope.
    pub fn member_scope_owner(&self) -> Option<NodeId> {
        match self {
            Symbol::Sum(s) => Some(s.def),
            Symbol::Record(r) => Some(r.def),
            Symbol::Object(o) => Some(o.def),
            _ => None,
        }
    }
}
