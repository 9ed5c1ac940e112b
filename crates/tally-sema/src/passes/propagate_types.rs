//! Pass 4: type propagation.
//!
//! Bottom-up inference over every function body. Each expression node gets
//! its type through the single `set_type` choke point; call and construction
//! sites perform generic instantiation (explicit type arguments validated,
//! or inferred from argument types) and record what they resolved to.
//!
//! A failed subtree is substituted with the error sentinel and its error
//! recorded at the failing node's own span; siblings and parents keep going.

use std::rc::Rc;

use crate::fault::Fault;
use crate::passes::Session;
use crate::scope::ScopeId;
use crate::subst::{bind_args, infer_bindings, SubstitutionChain};
use crate::symbol::Symbol;
use crate::tables::Resolution;
use crate::ty::{FunctionType, Instantiation, ParamKind, Type, TypeParameter};
use tally_types::ast::{Block, Def, Expr, ExprKind, NodeId, Stmt};
use tally_types::Span;

pub(crate) fn run(sess: &mut Session<'_>) {
    for def in &sess.file.defs {
        if let Def::Function(d) = def {
            infer_block(sess, &d.body);
        }
    }
}

/// Pick the wider of two types, or fail if neither direction fits.
fn unify(a: &Type, b: &Type) -> Result<Type, Fault> {
    if a.is_error() {
        return Ok(b.clone());
    }
    if b.is_error() {
        return Ok(a.clone());
    }
    if a.assignable_to(b) {
        Ok(b.clone())
    } else if b.assignable_to(a) {
        Ok(a.clone())
    } else {
        Err(Fault::CannotUnify(a.to_string(), b.to_string()))
    }
}

/// Commit an inference result to the type table, degrading to the error
/// sentinel on any fault.
fn commit(sess: &mut Session<'_>, id: NodeId, span: Span, result: Result<Type, Fault>) -> Type {
    match result {
        Ok(ty) => match sess.tables.set_type(id, ty.clone()) {
            Ok(()) => ty,
            Err(f) => {
                sess.record(span, f);
                sess.tables.set_error_type(id);
                Type::Error
            }
        },
        Err(f) => {
            sess.record(span, f);
            sess.tables.set_error_type(id);
            Type::Error
        }
    }
}

fn resolve(sess: &mut Session<'_>, id: NodeId, span: Span, res: Resolution) {
    if let Err(f) = sess.tables.set_resolution(id, res) {
        sess.record(span, f);
    }
}

/// Infer a block's lines and its value: the trailing expression's type, or
/// `Nothing` when the block does not end in an expression.
pub(crate) fn infer_block(sess: &mut Session<'_>, block: &Block) -> Type {
    let Some(scope) = sess.tables.scope_of(block.id) else {
        return Type::Error;
    };
    let mut value = sess.prelude.nothing_ty();
    let last = block.lines.len().checked_sub(1);
    for (i, line) in block.lines.iter().enumerate() {
        let ty = infer_stmt(sess, line, scope);
        if Some(i) == last {
            if let Stmt::Expr(_) = line {
                value = ty;
            }
        }
    }
    commit(sess, block.id, block.span, Ok(value))
}

fn infer_stmt(sess: &mut Session<'_>, stmt: &Stmt, scope: ScopeId) -> Type {
    match stmt {
        Stmt::Let(s) => {
            let inferred = infer_expr(sess, &s.value, scope);
            let ty = match &s.sig {
                None => inferred,
                Some(sig) => match sess.resolve_signifier(scope, sig) {
                    Ok(declared) => declared,
                    Err(f) => {
                        sess.record(sig.span, f);
                        Type::Error
                    }
                },
            };
            let symbol = Symbol::Variable {
                def: s.id,
                ty,
                mutable: s.mutable,
            };
            if let Err(f) = sess.arena.define(scope, &s.name.name, symbol) {
                sess.record(s.span, f);
            }
            sess.prelude.nothing_ty()
        }
        Stmt::Assign(s) => {
            infer_expr(sess, &s.value, scope);
            match s.target.first() {
                None => sess.record(s.span, Fault::Internal("empty assignment target".into())),
                Some(head) => match sess.arena.fetch(scope, &head.name) {
                    Ok(Symbol::Variable { def, .. }) | Ok(Symbol::FormalParam { def, .. }) => {
                        resolve(sess, s.id, s.span, Resolution::Local(def));
                    }
                    Ok(Symbol::Error) => {}
                    Ok(_) => sess.record(
                        head.span,
                        Fault::WrongSymbolKind(head.name.clone(), "an assignable target"),
                    ),
                    Err(f) => sess.record(head.span, f),
                },
            }
            sess.prelude.nothing_ty()
        }
        Stmt::Return(s) => {
            infer_expr(sess, &s.value, scope);
            sess.prelude.nothing_ty()
        }
        Stmt::Expr(e) => infer_expr(sess, e, scope),
    }
}

pub(crate) fn infer_expr(sess: &mut Session<'_>, expr: &Expr, scope: ScopeId) -> Type {
    let result = infer_kind(sess, expr, scope);
    commit(sess, expr.id, expr.span, result)
}

fn infer_kind(sess: &mut Session<'_>, expr: &Expr, scope: ScopeId) -> Result<Type, Fault> {
    match &expr.kind {
        ExprKind::IntLit(_) => Ok(sess.prelude.i64_ty()),
        ExprKind::BoolLit(_) => Ok(sess.prelude.bool_ty()),
        ExprKind::CharLit(_) => Ok(sess.prelude.char_ty()),
        ExprKind::StringLit(s) => Ok(sess.prelude.string_of(s.chars().count() as u64)),
        ExprKind::DecimalLit(s) => {
            let digits = s.chars().filter(char::is_ascii_digit).count() as u64;
            Ok(sess.prelude.decimal_of(digits.max(1)))
        }
        ExprKind::ListLit(items) => {
            let elem = infer_elements(sess, items, scope, "list")?;
            Ok(sess.prelude.list_of(elem, items.len() as u64))
        }
        ExprKind::SetLit(items) => {
            let elem = infer_elements(sess, items, scope, "set")?;
            Ok(sess.prelude.set_of(elem, items.len() as u64))
        }
        ExprKind::DictLit(entries) => {
            if entries.is_empty() {
                return Err(Fault::CannotInfer(
                    "the key and value types of an empty dictionary literal".into(),
                ));
            }
            let mut key = Type::Error;
            let mut value = Type::Error;
            for (k, v) in entries {
                let kt = infer_expr(sess, k, scope);
                let vt = infer_expr(sess, v, scope);
                key = unify(&key, &kt)?;
                value = unify(&value, &vt)?;
            }
            Ok(sess.prelude.dictionary_of(key, value, entries.len() as u64))
        }
        ExprKind::PairLit(a, b) => {
            let at = infer_expr(sess, a, scope);
            let bt = infer_expr(sess, b, scope);
            Ok(sess.prelude.pair_of(at, bt))
        }
        ExprKind::Identifier(name) => infer_identifier(sess, expr, scope, name),
        ExprKind::MemberAccess { object, member } => {
            let obj_ty = infer_expr(sess, object, scope);
            infer_member_access(sess, expr, &obj_ty, &member.name)
        }
        ExprKind::Call {
            callee,
            type_args,
            args,
        } => {
            let arg_tys: Vec<Type> = args.iter().map(|a| infer_expr(sess, a, scope)).collect();
            let explicit = if type_args.is_empty() {
                None
            } else {
                Some(
                    type_args
                        .iter()
                        .map(|t| sess.resolve_signifier(scope, t))
                        .collect::<Result<Vec<_>, _>>()?,
                )
            };
            infer_call(sess, expr, scope, &callee.name, explicit, &arg_tys)
        }
        ExprKind::MethodCall {
            object,
            method,
            args,
        } => {
            let obj_ty = infer_expr(sess, object, scope);
            let arg_tys: Vec<Type> = args.iter().map(|a| infer_expr(sess, a, scope)).collect();
            infer_method_call(sess, expr, &obj_ty, &method.name, &arg_tys)
        }
        ExprKind::If {
            condition,
            then_block,
            else_block,
        } => {
            infer_expr(sess, condition, scope);
            let then_ty = infer_block(sess, then_block);
            match else_block {
                None => Ok(sess.prelude.nothing_ty()),
                Some(e) => {
                    let else_ty = infer_block(sess, e);
                    unify(&then_ty, &else_ty)
                }
            }
        }
        ExprKind::Foreach {
            item,
            iterable,
            body,
        } => {
            let iter_ty = infer_expr(sess, iterable, scope);
            let elem = element_type(&iter_ty)?;
            if let Some(body_scope) = sess.tables.scope_of(body.id) {
                let symbol = Symbol::Variable {
                    def: expr.id,
                    ty: elem,
                    mutable: false,
                };
                if let Err(f) = sess.arena.define(body_scope, &item.name, symbol) {
                    sess.record(item.span, f);
                }
            }
            infer_block(sess, body);
            Ok(sess.prelude.nothing_ty())
        }
    }
}

fn infer_elements(
    sess: &mut Session<'_>,
    items: &[Expr],
    scope: ScopeId,
    literal: &str,
) -> Result<Type, Fault> {
    if items.is_empty() {
        return Err(Fault::CannotInfer(format!(
            "the element type of an empty {literal} literal"
        )));
    }
    let mut elem = Type::Error;
    for item in items {
        let ty = infer_expr(sess, item, scope);
        elem = unify(&elem, &ty)?;
    }
    Ok(elem)
}

/// The element type of an iterable container, or a feature-ban fault for
/// containers without a stable iteration order.
fn element_type(iter_ty: &Type) -> Result<Type, Fault> {
    match iter_ty {
        Type::Error => Ok(Type::Error),
        Type::Instantiation(inst) => match &inst.terminus {
            Type::Basic(b) if b.iterable => {
                let first = b
                    .type_params
                    .iter()
                    .find(|p| p.kind == ParamKind::Standard)
                    .ok_or_else(|| Fault::Internal(format!("'{}' has no element", b.name)))?;
                Ok(inst.chain.replay(&Type::Parameter(first.clone())))
            }
            Type::Basic(b) => Err(Fault::FeatureBanned(format!(
                "iteration over unordered '{}' is not allowed",
                b.name
            ))),
            _ => Err(Fault::TypeMismatch {
                expected: "an iterable container".into(),
                found: iter_ty.to_string(),
            }),
        },
        other => Err(Fault::TypeMismatch {
            expected: "an iterable container".into(),
            found: other.to_string(),
        }),
    }
}

fn infer_identifier(
    sess: &mut Session<'_>,
    expr: &Expr,
    scope: ScopeId,
    name: &str,
) -> Result<Type, Fault> {
    match sess.arena.fetch(scope, name)? {
        Symbol::Error => Ok(Type::Error),
        Symbol::Variable { def, ty, .. } | Symbol::FormalParam { def, ty } => {
            resolve(sess, expr.id, expr.span, Resolution::Local(def));
            Ok(ty)
        }
        Symbol::Object(o) => {
            resolve(sess, expr.id, expr.span, Resolution::Object(o.def));
            Ok(Type::Object(o))
        }
        Symbol::Function { def, name } => {
            let sig = sess
                .tables
                .signature_of(def)
                .cloned()
                .ok_or_else(|| Fault::Internal(format!("missing signature for '{name}'")))?;
            if !sig.type_params.is_empty() {
                return Err(Fault::CannotInfer(format!(
                    "the type arguments of generic function '{name}' used as a value"
                )));
            }
            resolve(
                sess,
                expr.id,
                expr.span,
                Resolution::Function {
                    def,
                    chain: SubstitutionChain::new(),
                },
            );
            Ok(Type::Function(FunctionType {
                params: sig.params.into_iter().map(|(_, t)| t).collect(),
                ret: Box::new(sig.ret),
            }))
        }
        Symbol::Plugin(func) => {
            let ty = Type::Function(FunctionType {
                params: func.params.iter().map(|p| p.ty.clone()).collect(),
                ret: Box::new(func.ret.clone()),
            });
            resolve(
                sess,
                expr.id,
                expr.span,
                Resolution::Plugin {
                    func,
                    chain: SubstitutionChain::new(),
                },
            );
            Ok(ty)
        }
        _ => Err(Fault::WrongSymbolKind(name.to_string(), "a value")),
    }
}

fn infer_member_access(
    sess: &mut Session<'_>,
    expr: &Expr,
    obj_ty: &Type,
    member: &str,
) -> Result<Type, Fault> {
    let (def, chain) = match obj_ty {
        Type::Error => return Ok(Type::Error),
        Type::Record(r) => (r.def, SubstitutionChain::new()),
        Type::Object(o) => (o.def, SubstitutionChain::new()),
        Type::Instantiation(inst) => match &inst.terminus {
            Type::Record(r) => (r.def, inst.chain.clone()),
            _ => return Err(Fault::NotFound(format!("{obj_ty}.{member}"))),
        },
        _ => return Err(Fault::NotFound(format!("{obj_ty}.{member}"))),
    };
    let fields = sess
        .tables
        .fields_of(def)
        .ok_or_else(|| Fault::NotFound(format!("{obj_ty}.{member}")))?;
    let field = fields
        .iter()
        .find(|f| f.name == member)
        .ok_or_else(|| Fault::NotFound(format!("{obj_ty}.{member}")))?;
    let ty = chain.replay(&field.ty);
    resolve(
        sess,
        expr.id,
        expr.span,
        Resolution::Field {
            owner: def,
            name: member.to_string(),
        },
    );
    Ok(ty)
}

/// Bind a callable's type parameters at a call site and verify its
/// arguments, returning the chain to replay results through.
fn resolve_call_chain(
    name: &str,
    type_params: &[TypeParameter],
    declared: &[Type],
    explicit: Option<Vec<Type>>,
    arg_tys: &[Type],
) -> Result<SubstitutionChain, Fault> {
    if declared.len() != arg_tys.len() {
        return Err(Fault::WrongArgCount {
            name: name.to_string(),
            expected: declared.len(),
            got: arg_tys.len(),
        });
    }
    let chain = match (type_params.is_empty(), explicit) {
        (true, None) => SubstitutionChain::new(),
        (true, Some(args)) => {
            return Err(Fault::WrongTypeArgCount {
                name: name.to_string(),
                expected: 0,
                got: args.len(),
            });
        }
        (false, Some(args)) => SubstitutionChain::of(bind_args(name, type_params, args)?),
        (false, None) => {
            let mut bindings = Vec::new();
            for (d, a) in declared.iter().zip(arg_tys) {
                infer_bindings(d, a, &mut bindings)?;
            }
            // Re-order into declaration order; every parameter must have
            // been pinned down by some argument.
            let mut ordered = Vec::with_capacity(type_params.len());
            for p in type_params {
                let bound = bindings
                    .iter()
                    .find(|(q, _)| q == p)
                    .map(|(_, t)| t.clone())
                    .ok_or_else(|| {
                        Fault::CannotInfer(format!("type parameter '{}' of '{name}'", p.name))
                    })?;
                ordered.push((p.clone(), bound));
            }
            SubstitutionChain::of(ordered)
        }
    };
    for (d, a) in declared.iter().zip(arg_tys) {
        let expected = chain.replay(d);
        if !a.assignable_to(&expected) {
            return Err(Fault::TypeMismatch {
                expected: expected.to_string(),
                found: a.to_string(),
            });
        }
    }
    Ok(chain)
}

fn infer_call(
    sess: &mut Session<'_>,
    expr: &Expr,
    scope: ScopeId,
    name: &str,
    explicit: Option<Vec<Type>>,
    arg_tys: &[Type],
) -> Result<Type, Fault> {
    match sess.arena.fetch(scope, name)? {
        Symbol::Error => Ok(Type::Error),
        Symbol::Function { def, name } => {
            let sig = sess
                .tables
                .signature_of(def)
                .cloned()
                .ok_or_else(|| Fault::Internal(format!("missing signature for '{name}'")))?;
            let declared: Vec<Type> = sig.params.iter().map(|(_, t)| t.clone()).collect();
            let chain =
                resolve_call_chain(&name, &sig.type_params, &declared, explicit, arg_tys)?;
            let ret = chain.replay(&sig.ret);
            resolve(sess, expr.id, expr.span, Resolution::Function { def, chain });
            Ok(ret)
        }
        Symbol::Plugin(func) => {
            let declared: Vec<Type> = func.params.iter().map(|p| p.ty.clone()).collect();
            let chain =
                resolve_call_chain(&func.name, &func.type_params, &declared, explicit, arg_tys)?;
            let ret = chain.replay(&func.ret);
            resolve(sess, expr.id, expr.span, Resolution::Plugin { func, chain });
            Ok(ret)
        }
        Symbol::Record(r) => {
            let fields = sess
                .tables
                .fields_of(r.def)
                .ok_or_else(|| Fault::Internal(format!("missing fields for '{}'", r.name)))?;
            let declared: Vec<Type> = fields.iter().map(|f| f.ty.clone()).collect();
            let chain = resolve_call_chain(&r.name, &r.type_params, &declared, explicit, arg_tys)?;
            let ty = match &r.owner {
                // Constructing a sum member yields the sum itself.
                Some(sum) if sum.type_params.is_empty() => Type::Sum(sum.clone()),
                Some(sum) => Type::Instantiation(Rc::new(Instantiation {
                    terminus: Type::Sum(sum.clone()),
                    chain: chain.clone(),
                })),
                None if r.type_params.is_empty() => Type::Record(r.clone()),
                None => Type::Instantiation(Rc::new(Instantiation {
                    terminus: Type::Record(r.clone()),
                    chain: chain.clone(),
                })),
            };
            resolve(
                sess,
                expr.id,
                expr.span,
                Resolution::Constructor { def: r.def, chain },
            );
            Ok(ty)
        }
        Symbol::Variable { def, ty, .. } | Symbol::FormalParam { def, ty } => match ty {
            Type::Error => Ok(Type::Error),
            Type::Function(ft) => {
                let chain = resolve_call_chain(name, &[], &ft.params, explicit, arg_tys)?;
                debug_assert!(chain.is_empty());
                resolve(sess, expr.id, expr.span, Resolution::Local(def));
                Ok(*ft.ret)
            }
            _ => Err(Fault::WrongSymbolKind(name.to_string(), "callable")),
        },
        _ => Err(Fault::WrongSymbolKind(name.to_string(), "callable")),
    }
}

fn infer_method_call(
    sess: &mut Session<'_>,
    expr: &Expr,
    obj_ty: &Type,
    method: &str,
    arg_tys: &[Type],
) -> Result<Type, Fault> {
    if obj_ty.is_error() {
        return Ok(Type::Error);
    }
    // Built-in members hang off basic termini; everything else only has the
    // universal members.
    let (builtin, chain) = match obj_ty {
        Type::Basic(b) => (sess.prelude.member(b.name, method), SubstitutionChain::new()),
        Type::Instantiation(inst) => match &inst.terminus {
            Type::Basic(b) => (sess.prelude.member(b.name, method), inst.chain.clone()),
            _ => (None, SubstitutionChain::new()),
        },
        _ => (None, SubstitutionChain::new()),
    };
    let (func, chain) = match builtin {
        Some(f) => (f, chain),
        None => match sess.prelude.universal_member(method, obj_ty) {
            Some(f) => (f, SubstitutionChain::new()),
            None => return Err(Fault::NotFound(format!("{obj_ty}.{method}"))),
        },
    };
    let declared: Vec<Type> = func.params.iter().map(|p| chain.replay(&p.ty)).collect();
    if declared.len() != arg_tys.len() {
        return Err(Fault::WrongArgCount {
            name: method.to_string(),
            expected: declared.len(),
            got: arg_tys.len(),
        });
    }
    for (d, a) in declared.iter().zip(arg_tys) {
        if !a.assignable_to(d) {
            return Err(Fault::TypeMismatch {
                expected: d.to_string(),
                found: a.to_string(),
            });
        }
    }
    let ret = chain.replay(&func.ret);
    resolve(sess, expr.id, expr.span, Resolution::Plugin { func, chain });
    Ok(ret)
}
