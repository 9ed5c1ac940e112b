//! Semantic type model for the Tally front end.
//!
//! [`Type`] is the result of checking an expression or declaration. It is
//! distinct from [`tally_types::ast::TypeSignifier`], the syntactic form
//! produced by the parser. Nominal termini (records, objects, sums, built-in
//! basics) are shared via [`Rc`] so two mentions of the same declaration
//! compare equal and clone cheaply; their deferred data (fields, signatures)
//! lives in side tables keyed by the defining node, never on the type itself.

use std::fmt;
use std::rc::Rc;

use crate::cost::CostExpression;
use crate::subst::SubstitutionChain;
use tally_types::ast::NodeId;

// ══════════════════════════════════════════════════════════════════════════════
// Type parameters
// ══════════════════════════════════════════════════════════════════════════════

/// The two kinds of generic placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// An ordinary type placeholder.
    Standard,
    /// A placeholder for a cost/size bound — "this type is parameterized by
    /// how expensive it is".
    Fin,
}

/// A declared type parameter of a generic terminus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParameter {
    pub name: String,
    pub kind: ParamKind,
}

impl TypeParameter {
    pub fn standard(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Standard,
        }
    }

    pub fn fin(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Fin,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Termini
// ══════════════════════════════════════════════════════════════════════════════

/// A built-in (platform) type, generic or not.
#[derive(Debug, PartialEq)]
pub struct BasicType {
    pub name: &'static str,
    pub type_params: Vec<TypeParameter>,
    /// False for unordered containers — iterating them is a banned feature.
    pub iterable: bool,
}

/// A record declaration — user or platform sum member.
#[derive(Debug, PartialEq)]
pub struct RecordDecl {
    pub def: NodeId,
    pub name: String,
    pub type_params: Vec<TypeParameter>,
    pub platform: bool,
    /// The sum type this record is a member of, if any.
    pub owner: Option<Rc<SumDecl>>,
}

/// An object (singleton) declaration.
#[derive(Debug, PartialEq)]
pub struct ObjectDecl {
    pub def: NodeId,
    pub name: String,
    pub platform: bool,
    pub owner: Option<Rc<SumDecl>>,
}

/// A sum-type declaration; members are resolved through its member scope.
#[derive(Debug, PartialEq)]
pub struct SumDecl {
    pub def: NodeId,
    pub name: String,
    pub type_params: Vec<TypeParameter>,
    pub members: Vec<String>,
    pub platform: bool,
}

// ══════════════════════════════════════════════════════════════════════════════
// Type
// ══════════════════════════════════════════════════════════════════════════════

/// A generic terminus plus the substitution chain binding its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Instantiation {
    pub terminus: Type,
    pub chain: SubstitutionChain,
}

/// A semantic type in Tally.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Error sentinel — substituted for a failed subtree so analysis of its
    /// siblings can continue. Compatible with everything.
    Error,
    /// `(T1, T2, ...) -> R`
    Function(FunctionType),
    /// A standard or fin generic placeholder.
    Parameter(TypeParameter),
    /// A built-in type terminus.
    Basic(Rc<BasicType>),
    /// A record terminus.
    Record(Rc<RecordDecl>),
    /// An object (singleton) type.
    Object(Rc<ObjectDecl>),
    /// A sum-type terminus.
    Sum(Rc<SumDecl>),
    /// A generic terminus with its parameters bound.
    Instantiation(Rc<Instantiation>),
    /// A cost/size bound used as a fin type argument. Never a final
    /// expression type.
    Cost(CostExpression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub params: Vec<Type>,
    pub ret: Box<Type>,
}

impl Type {
    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    /// The declared type parameters of a terminus type; empty otherwise.
    pub fn type_params(&self) -> &[TypeParameter] {
        match self {
            Type::Basic(b) => &b.type_params,
            Type::Record(r) => &r.type_params,
            Type::Sum(s) => &s.type_params,
            _ => &[],
        }
    }

    /// The terminus name, for display and hash-cost leaves.
    pub fn name(&self) -> &str {
        match self {
            Type::Basic(b) => b.name,
            Type::Record(r) => &r.name,
            Type::Object(o) => &o.name,
            Type::Sum(s) => &s.name,
            Type::Parameter(p) => &p.name,
            Type::Error => "<error>",
            Type::Function(_) => "<function>",
            Type::Instantiation(inst) => inst.terminus.name(),
            Type::Cost(_) => "<cost>",
        }
    }

    /// True for a generic terminus mentioned without its type arguments —
    /// illegal as the final type of any expression.
    pub fn is_raw_generic(&self) -> bool {
        !self.type_params().is_empty()
    }

    /// Check if a value of this type can be used where `target` is expected.
    ///
    /// Rules:
    /// - the error sentinel is compatible in both directions;
    /// - instantiations of the same terminus compare by replaying each
    ///   terminus parameter through both chains, so chains built by
    ///   different compositions still match;
    /// - a closed fin bound fits any larger closed fin bound;
    /// - an object member of a sum type fits any use of that sum;
    /// - everything else requires structural equality.
    pub fn assignable_to(&self, target: &Type) -> bool {
        if self.is_error() || target.is_error() {
            return true;
        }
        match (self, target) {
            (Type::Object(o), Type::Sum(s)) => {
                o.owner.as_ref().is_some_and(|owner| owner == s)
            }
            (Type::Object(o), Type::Instantiation(b)) => match &b.terminus {
                Type::Sum(s) => o.owner.as_ref().is_some_and(|owner| owner == s),
                _ => false,
            },
            (Type::Instantiation(a), Type::Instantiation(b)) => {
                if a.terminus != b.terminus {
                    return false;
                }
                a.terminus.type_params().iter().all(|p| {
                    let pa = a.chain.replay(&Type::Parameter(p.clone()));
                    let pb = b.chain.replay(&Type::Parameter(p.clone()));
                    pa.assignable_to(&pb)
                })
            }
            (Type::Function(a), Type::Function(b)) => {
                a.params.len() == b.params.len()
                    && a.params
                        .iter()
                        .zip(b.params.iter())
                        .all(|(x, y)| x.assignable_to(y))
                    && a.ret.assignable_to(&b.ret)
            }
            (Type::Cost(CostExpression::Fin(a)), Type::Cost(CostExpression::Fin(b))) => a <= b,
            _ => self == target,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Display
// ══════════════════════════════════════════════════════════════════════════════

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Error => write!(f, "<error>"),
            Type::Parameter(p) => match p.kind {
                ParamKind::Standard => write!(f, "{}", p.name),
                ParamKind::Fin => write!(f, "{} fin", p.name),
            },
            Type::Basic(b) => write!(f, "{}", b.name),
            Type::Record(r) => write!(f, "{}", r.name),
            Type::Object(o) => write!(f, "{}", o.name),
            Type::Sum(s) => write!(f, "{}", s.name),
            Type::Cost(c) => write!(f, "{}", c),
            Type::Function(ft) => {
                write!(f, "(")?;
                for (i, p) in ft.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", ft.ret)
            }
            Type::Instantiation(inst) => {
                write!(f, "{}<", inst.terminus.name())?;
                for (i, p) in inst.terminus.type_params().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", inst.chain.replay(&Type::Parameter(p.clone())))?;
                }
                write!(f, ">")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(name: &'static str) -> Type {
        Type::Basic(Rc::new(BasicType {
            name,
            type_params: vec![],
            iterable: false,
        }))
    }

    #[test]
    fn test_error_assignable_both_ways() {
        let i64 = basic("I64");
        assert!(Type::Error.assignable_to(&i64));
        assert!(i64.assignable_to(&Type::Error));
    }

    #[test]
    fn test_basic_types_compare_by_name() {
        assert!(basic("I64").assignable_to(&basic("I64")));
        assert!(!basic("I64").assignable_to(&basic("Bool")));
    }

    #[test]
    fn test_fin_subsumption() {
        let small = Type::Cost(CostExpression::Fin(3));
        let large = Type::Cost(CostExpression::Fin(10));
        assert!(small.assignable_to(&large));
        assert!(!large.assignable_to(&small));
    }

    #[test]
    fn test_raw_generic_detected() {
        let list = Type::Basic(Rc::new(BasicType {
            name: "List",
            type_params: vec![TypeParameter::standard("E"), TypeParameter::fin("N")],
            iterable: true,
        }));
        assert!(list.is_raw_generic());
        assert!(!basic("Bool").is_raw_generic());
    }

    #[test]
    fn test_function_display() {
        let ft = Type::Function(FunctionType {
            params: vec![basic("I64"), basic("Bool")],
            ret: Box::new(basic("I64")),
        });
        assert_eq!(format!("{}", ft), "(I64, Bool) -> I64");
    }
}
