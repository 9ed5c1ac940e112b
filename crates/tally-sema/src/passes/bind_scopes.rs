//! Pass 1: scope creation and definition binding.
//!
//! Creates a scope for every scope-introducing node (file, function, block,
//! record/object/sum definitions), defines each top-level declaration's
//! symbol in its enclosing scope, and wires up member scopes for sum types.
//! Duplicate names are reported here.

use std::rc::Rc;

use crate::passes::Session;
use crate::scope::ScopeId;
use crate::symbol::Symbol;
use crate::ty::{ObjectDecl, RecordDecl, SumDecl, TypeParameter};
use tally_types::ast::{Block, Def, Expr, ExprKind, Stmt, SumDef, SumMember, TypeParamDecl};

pub(crate) fn run(sess: &mut Session<'_>) {
    let root = sess.arena.alloc(sess.prelude_scope);
    if let Err(f) = sess.tables.set_scope(sess.file.id, root) {
        sess.record(sess.file.span, f);
    }

    for def in &sess.file.defs {
        let symbol = match def {
            Def::Function(d) => Symbol::Function {
                def: d.id,
                name: d.name.name.clone(),
            },
            Def::Record(d) => Symbol::Record(Rc::new(RecordDecl {
                def: d.id,
                name: d.name.name.clone(),
                type_params: to_params(&d.type_params),
                platform: false,
                owner: None,
            })),
            Def::Object(d) => Symbol::Object(Rc::new(ObjectDecl {
                def: d.id,
                name: d.name.name.clone(),
                platform: false,
                owner: None,
            })),
            Def::Sum(d) => Symbol::Sum(Rc::new(SumDecl {
                def: d.id,
                name: d.name.name.clone(),
                type_params: to_params(&d.type_params),
                members: d.members.iter().map(|m| m.name().to_string()).collect(),
                platform: false,
            })),
        };
        if let Err(f) = sess.arena.define(root, def.name(), symbol.clone()) {
            sess.record(def.span(), f);
        }

        let def_scope = sess.arena.alloc(root);
        if let Err(f) = sess.tables.set_scope(def.id(), def_scope) {
            sess.record(def.span(), f);
        }
        match def {
            Def::Function(d) => bind_block(sess, &d.body, def_scope),
            Def::Record(_) | Def::Object(_) => {}
            Def::Sum(d) => {
                if let Symbol::Sum(decl) = symbol {
                    bind_sum_members(sess, d, &decl, def_scope);
                }
            }
        }
    }
}

pub(crate) fn to_params(decls: &[TypeParamDecl]) -> Vec<TypeParameter> {
    decls
        .iter()
        .map(|p| {
            if p.fin {
                TypeParameter::fin(p.name.name.clone())
            } else {
                TypeParameter::standard(p.name.name.clone())
            }
        })
        .collect()
}

/// Define the sum's members in a dedicated member scope so dotted paths
/// (`Shape.Circle`) resolve into it. Member records share the sum's type
/// parameters.
fn bind_sum_members(sess: &mut Session<'_>, d: &SumDef, decl: &Rc<SumDecl>, sum_scope: ScopeId) {
    let member_scope = sess.arena.alloc(sum_scope);
    sess.arena.set_member_scope(d.id, member_scope);
    for member in &d.members {
        let symbol = match member {
            SumMember::Record(r) => Symbol::Record(Rc::new(RecordDecl {
                def: r.id,
                name: r.name.name.clone(),
                type_params: decl.type_params.clone(),
                platform: false,
                owner: Some(decl.clone()),
            })),
            SumMember::Object(o) => Symbol::Object(Rc::new(ObjectDecl {
                def: o.id,
                name: o.name.name.clone(),
                platform: false,
                owner: Some(decl.clone()),
            })),
        };
        if let Err(f) = sess.arena.define(member_scope, member.name(), symbol) {
            sess.record(d.span, f);
        }
        let scope = sess.arena.alloc(sum_scope);
        if let Err(f) = sess.tables.set_scope(member.id(), scope) {
            sess.record(d.span, f);
        }
    }
}

fn bind_block(sess: &mut Session<'_>, block: &Block, parent: ScopeId) {
    let scope = sess.arena.alloc(parent);
    if let Err(f) = sess.tables.set_scope(block.id, scope) {
        sess.record(block.span, f);
    }
    for line in &block.lines {
        match line {
            Stmt::Let(s) => bind_expr(sess, &s.value, scope),
            Stmt::Assign(s) => bind_expr(sess, &s.value, scope),
            Stmt::Return(s) => bind_expr(sess, &s.value, scope),
            Stmt::Expr(e) => bind_expr(sess, e, scope),
        }
    }
}

fn bind_expr(sess: &mut Session<'_>, expr: &Expr, scope: ScopeId) {
    match &expr.kind {
        ExprKind::IntLit(_)
        | ExprKind::BoolLit(_)
        | ExprKind::CharLit(_)
        | ExprKind::StringLit(_)
        | ExprKind::DecimalLit(_)
        | ExprKind::Identifier(_) => {}
        ExprKind::ListLit(items) | ExprKind::SetLit(items) => {
            for item in items {
                bind_expr(sess, item, scope);
            }
        }
        ExprKind::DictLit(entries) => {
            for (k, v) in entries {
                bind_expr(sess, k, scope);
                bind_expr(sess, v, scope);
            }
        }
        ExprKind::PairLit(a, b) => {
            bind_expr(sess, a, scope);
            bind_expr(sess, b, scope);
        }
        ExprKind::MemberAccess { object, .. } => bind_expr(sess, object, scope),
        ExprKind::Call { args, .. } => {
            for arg in args {
                bind_expr(sess, arg, scope);
            }
        }
        ExprKind::MethodCall { object, args, .. } => {
            bind_expr(sess, object, scope);
            for arg in args {
                bind_expr(sess, arg, scope);
            }
        }
        ExprKind::If {
            condition,
            then_block,
            else_block,
        } => {
            bind_expr(sess, condition, scope);
            bind_block(sess, then_block, scope);
            if let Some(e) = else_block {
                bind_block(sess, e, scope);
            }
        }
        ExprKind::Foreach {
            iterable, body, ..
        } => {
            bind_expr(sess, iterable, scope);
            bind_block(sess, body, scope);
        }
    }
}
