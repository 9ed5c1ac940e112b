//! Side tables for pass outputs.
//!
//! Tree nodes are never mutated; every pass writes its results into
//! [`Annotations`], keyed by [`NodeId`]. Each table is populated exactly once
//! per node — a second write to the same key is an internal fault, which is
//! what makes "assigned later" fields safe without partially initialized
//! nodes.

use std::collections::HashMap;
use std::rc::Rc;

use crate::cost::CostExpression;
use crate::fault::Fault;
use crate::scope::ScopeId;
use crate::subst::SubstitutionChain;
use crate::symbol::PluginFunction;
use crate::ty::{ParamKind, Type, TypeParameter};
use tally_types::ast::NodeId;

/// What a call or reference site resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A user function, with the chain binding its type parameters at this
    /// call site (empty for ground functions).
    Function {
        def: NodeId,
        chain: SubstitutionChain,
    },
    /// A built-in function or member, with its call-site chain.
    Plugin {
        func: Rc<PluginFunction>,
        chain: SubstitutionChain,
    },
    /// A local variable or formal parameter.
    Local(NodeId),
    /// A field of a record, keyed by the record's defining node.
    Field { owner: NodeId, name: String },
    /// A record constructed at this site.
    Constructor {
        def: NodeId,
        chain: SubstitutionChain,
    },
    /// An object (singleton) reference.
    Object(NodeId),
}

/// A committed function signature.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSig {
    pub type_params: Vec<TypeParameter>,
    pub params: Vec<(String, Type)>,
    pub ret: Type,
}

/// A committed record field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    pub ty: Type,
    pub mutable: bool,
}

/// All pass outputs, keyed by node identity.
#[derive(Debug, Default)]
pub struct Annotations {
    types: HashMap<NodeId, Type>,
    costs: HashMap<NodeId, CostExpression>,
    resolutions: HashMap<NodeId, Resolution>,
    scopes: HashMap<NodeId, ScopeId>,
    signatures: HashMap<NodeId, FunctionSig>,
    fields: HashMap<NodeId, Vec<FieldInfo>>,
    /// Cost of calling each function, keyed by its defining node. Symbolic
    /// for generic functions until replayed at a call site.
    function_costs: HashMap<NodeId, CostExpression>,
    /// Functions in callees-first evaluation order.
    pub function_order: Vec<NodeId>,
    /// Evaluated closed bound per non-generic function.
    pub function_bounds: HashMap<NodeId, u64>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    /// The single choke point assigning a node its final type.
    ///
    /// Rejects a raw (uninstantiated) generic terminus, a fin-kind parameter
    /// and a bare cost value: none of these is a legal type for a value.
    /// Standard parameters are legal — inside a generic body an expression's
    /// type may well be `T`. Rejects a second assignment to the same node.
    pub fn set_type(&mut self, node: NodeId, ty: Type) -> Result<(), Fault> {
        match &ty {
            Type::Cost(_) => {
                return Err(Fault::IllegalFinalType {
                    node: node.to_string(),
                    ty: ty.to_string(),
                })
            }
            Type::Parameter(p) if p.kind == ParamKind::Fin => {
                return Err(Fault::IllegalFinalType {
                    node: node.to_string(),
                    ty: ty.to_string(),
                })
            }
            _ if ty.is_raw_generic() => {
                return Err(Fault::IllegalFinalType {
                    node: node.to_string(),
                    ty: ty.to_string(),
                })
            }
            _ => {}
        }
        if self.types.insert(node, ty).is_some() {
            return Err(Fault::AnnotationOverwrite(node.to_string()));
        }
        Ok(())
    }

    /// A node's assigned type; the error sentinel if its subtree failed.
    pub fn type_of(&self, node: NodeId) -> Type {
        self.types.get(&node).cloned().unwrap_or(Type::Error)
    }

    pub fn has_type(&self, node: NodeId) -> bool {
        self.types.contains_key(&node)
    }

    /// Force the error sentinel onto a failed node, overwriting nothing.
    pub fn set_error_type(&mut self, node: NodeId) {
        self.types.entry(node).or_insert(Type::Error);
    }

    pub fn set_cost(&mut self, node: NodeId, cost: CostExpression) -> Result<(), Fault> {
        if self.costs.insert(node, cost).is_some() {
            return Err(Fault::AnnotationOverwrite(node.to_string()));
        }
        Ok(())
    }

    pub fn cost_of(&self, node: NodeId) -> Option<&CostExpression> {
        self.costs.get(&node)
    }

    pub fn set_resolution(&mut self, node: NodeId, res: Resolution) -> Result<(), Fault> {
        if self.resolutions.insert(node, res).is_some() {
            return Err(Fault::AnnotationOverwrite(node.to_string()));
        }
        Ok(())
    }

    pub fn resolution_of(&self, node: NodeId) -> Option<&Resolution> {
        self.resolutions.get(&node)
    }

    pub fn set_scope(&mut self, node: NodeId, scope: ScopeId) -> Result<(), Fault> {
        if self.scopes.insert(node, scope).is_some() {
            return Err(Fault::AnnotationOverwrite(node.to_string()));
        }
        Ok(())
    }

    pub fn scope_of(&self, node: NodeId) -> Option<ScopeId> {
        self.scopes.get(&node).copied()
    }

    pub fn set_signature(&mut self, def: NodeId, sig: FunctionSig) -> Result<(), Fault> {
        if self.signatures.insert(def, sig).is_some() {
            return Err(Fault::AnnotationOverwrite(def.to_string()));
        }
        Ok(())
    }

    pub fn signature_of(&self, def: NodeId) -> Option<&FunctionSig> {
        self.signatures.get(&def)
    }

    pub fn set_fields(&mut self, def: NodeId, fields: Vec<FieldInfo>) -> Result<(), Fault> {
        if self.fields.insert(def, fields).is_some() {
            return Err(Fault::AnnotationOverwrite(def.to_string()));
        }
        Ok(())
    }

    pub fn fields_of(&self, def: NodeId) -> Option<&[FieldInfo]> {
        self.fields.get(&def).map(Vec::as_slice)
    }

    pub fn set_function_cost(&mut self, def: NodeId, cost: CostExpression) -> Result<(), Fault> {
        if self.function_costs.insert(def, cost).is_some() {
            return Err(Fault::AnnotationOverwrite(def.to_string()));
        }
        Ok(())
    }

    pub fn function_cost(&self, def: NodeId) -> Option<&CostExpression> {
        self.function_costs.get(&def)
    }
}
