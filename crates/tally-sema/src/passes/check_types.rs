//! Pass 5: type verification.
//!
//! Re-derives expected-vs-actual types at every binding, assignment, return
//! and branch point, using the types pass 4 committed, and enforces declared
//! mutability of assignment targets. Propagation and verification are split
//! so a failed inference (already error-typed) never suppresses checks on
//! its siblings, and so every mismatch is reported exactly once per node.

use crate::fault::Fault;
use crate::passes::Session;
use crate::scope::ScopeId;
use crate::symbol::Symbol;
use crate::ty::Type;
use tally_types::ast::{AssignStmt, Block, Def, Expr, ExprKind, FunctionDef, Stmt};

pub(crate) fn run(sess: &mut Session<'_>) {
    for def in &sess.file.defs {
        if let Def::Function(d) = def {
            check_function(sess, d);
        }
    }
}

fn check_function(sess: &mut Session<'_>, d: &FunctionDef) {
    let Some(ret) = sess.tables.signature_of(d.id).map(|s| s.ret.clone()) else {
        return;
    };
    check_block(sess, &d.body, &ret);

    let nothing = sess.prelude.nothing_ty();
    if ret == nothing || ret.is_error() {
        return;
    }
    // A function with no explicit returns must produce its value as the
    // body's trailing expression.
    if !has_return(&d.body) {
        let body_ty = sess.tables.type_of(d.body.id);
        if !body_ty.assignable_to(&ret) {
            sess.record(
                d.body.span,
                Fault::TypeMismatch {
                    expected: ret.to_string(),
                    found: body_ty.to_string(),
                },
            );
        }
    }
}

fn has_return(block: &Block) -> bool {
    block.lines.iter().any(|line| match line {
        Stmt::Return(_) => true,
        Stmt::Let(s) => expr_has_return(&s.value),
        Stmt::Assign(s) => expr_has_return(&s.value),
        Stmt::Expr(e) => expr_has_return(e),
    })
}

fn expr_has_return(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::If {
            then_block,
            else_block,
            ..
        } => {
            has_return(then_block) || else_block.as_ref().is_some_and(has_return)
        }
        ExprKind::Foreach { body, .. } => has_return(body),
        _ => false,
    }
}

fn check_block(sess: &mut Session<'_>, block: &Block, ret: &Type) {
    let Some(scope) = sess.tables.scope_of(block.id) else {
        return;
    };
    for line in &block.lines {
        match line {
            Stmt::Let(s) => {
                check_expr(sess, &s.value, ret);
                if let Some(sig) = &s.sig {
                    if let Ok(declared) = sess.resolve_signifier(scope, sig) {
                        let actual = sess.tables.type_of(s.value.id);
                        if !actual.assignable_to(&declared) {
                            sess.record(
                                s.value.span,
                                Fault::TypeMismatch {
                                    expected: declared.to_string(),
                                    found: actual.to_string(),
                                },
                            );
                        }
                    }
                }
            }
            Stmt::Assign(s) => {
                check_expr(sess, &s.value, ret);
                check_assign(sess, s, scope);
            }
            Stmt::Return(s) => {
                check_expr(sess, &s.value, ret);
                let actual = sess.tables.type_of(s.value.id);
                if !actual.assignable_to(ret) {
                    sess.record(
                        s.value.span,
                        Fault::TypeMismatch {
                            expected: ret.to_string(),
                            found: actual.to_string(),
                        },
                    );
                }
            }
            Stmt::Expr(e) => check_expr(sess, e, ret),
        }
    }
}

/// Verify an assignment target's mutability and its type against the
/// assigned value, walking field paths through record types.
fn check_assign(sess: &mut Session<'_>, s: &AssignStmt, scope: ScopeId) {
    let Some(head) = s.target.first() else {
        return;
    };
    let symbol = match sess.arena.fetch(scope, &head.name) {
        Ok(sym) => sym,
        // Resolution failures were reported by the propagation pass.
        Err(_) => return,
    };
    let (mut target_ty, head_mutable) = match symbol {
        Symbol::Error => return,
        Symbol::Variable { ty, mutable, .. } => (ty, mutable),
        Symbol::FormalParam { ty, .. } => (ty, false),
        _ => return,
    };
    if s.target.len() == 1 {
        if !head_mutable {
            sess.record(head.span, Fault::ImmutableTarget(head.name.clone()));
            return;
        }
    } else {
        for (i, segment) in s.target[1..].iter().enumerate() {
            let is_last = i == s.target.len() - 2;
            match field_of(sess, &target_ty, &segment.name) {
                Err(f) => {
                    sess.record(segment.span, f);
                    return;
                }
                Ok((ty, mutable)) => {
                    if is_last && !mutable {
                        sess.record(segment.span, Fault::ImmutableTarget(segment.name.clone()));
                        return;
                    }
                    target_ty = ty;
                }
            }
        }
    }
    let actual = sess.tables.type_of(s.value.id);
    if !actual.assignable_to(&target_ty) {
        sess.record(
            s.value.span,
            Fault::TypeMismatch {
                expected: target_ty.to_string(),
                found: actual.to_string(),
            },
        );
    }
}

fn field_of(sess: &Session<'_>, ty: &Type, name: &str) -> Result<(Type, bool), Fault> {
    let (def, chain) = match ty {
        Type::Error => return Ok((Type::Error, true)),
        Type::Record(r) => (r.def, None),
        Type::Object(o) => (o.def, None),
        Type::Instantiation(inst) => match &inst.terminus {
            Type::Record(r) => (r.def, Some(&inst.chain)),
            _ => return Err(Fault::NotFound(format!("{ty}.{name}"))),
        },
        _ => return Err(Fault::NotFound(format!("{ty}.{name}"))),
    };
    let fields = sess
        .tables
        .fields_of(def)
        .ok_or_else(|| Fault::NotFound(format!("{ty}.{name}")))?;
    let field = fields
        .iter()
        .find(|f| f.name == name)
        .ok_or_else(|| Fault::NotFound(format!("{ty}.{name}")))?;
    let field_ty = match chain {
        Some(chain) => chain.replay(&field.ty),
        None => field.ty.clone(),
    };
    Ok((field_ty, field.mutable))
}

/// Walk nested expressions for branch-point checks: every `if` condition
/// must be boolean, in any position.
fn check_expr(sess: &mut Session<'_>, expr: &Expr, ret: &Type) {
    match &expr.kind {
        ExprKind::IntLit(_)
        | ExprKind::BoolLit(_)
        | ExprKind::CharLit(_)
        | ExprKind::StringLit(_)
        | ExprKind::DecimalLit(_)
        | ExprKind::Identifier(_) => {}
        ExprKind::ListLit(items) | ExprKind::SetLit(items) => {
            for item in items {
                check_expr(sess, item, ret);
            }
        }
        ExprKind::DictLit(entries) => {
            for (k, v) in entries {
                check_expr(sess, k, ret);
                check_expr(sess, v, ret);
            }
        }
        ExprKind::PairLit(a, b) => {
            check_expr(sess, a, ret);
            check_expr(sess, b, ret);
        }
        ExprKind::MemberAccess { object, .. } => check_expr(sess, object, ret),
        ExprKind::Call { args, .. } => {
            for arg in args {
                check_expr(sess, arg, ret);
            }
        }
        ExprKind::MethodCall { object, args, .. } => {
            check_expr(sess, object, ret);
            for arg in args {
                check_expr(sess, arg, ret);
            }
        }
        ExprKind::If {
            condition,
            then_block,
            else_block,
        } => {
            check_expr(sess, condition, ret);
            let cond_ty = sess.tables.type_of(condition.id);
            let bool_ty = sess.prelude.bool_ty();
            if !cond_ty.assignable_to(&bool_ty) {
                sess.record(
                    condition.span,
                    Fault::TypeMismatch {
                        expected: bool_ty.to_string(),
                        found: cond_ty.to_string(),
                    },
                );
            }
            check_block(sess, then_block, ret);
            if let Some(e) = else_block {
                check_block(sess, e, ret);
            }
        }
        ExprKind::Foreach {
            iterable, body, ..
        } => {
            check_expr(sess, iterable, ret);
            check_block(sess, body, ret);
        }
    }
}
