//! Pass 3: field and formal-parameter binding.
//!
//! With every type-parameter symbol in place, written signifiers can now be
//! resolved: record and object fields are committed to the field tables, and
//! each function's formal parameters are defined in its scope and its
//! signature committed. A signifier that fails to resolve contributes an
//! error-typed entry so later passes keep going.

use crate::passes::bind_scopes::to_params;
use crate::passes::Session;
use crate::scope::ScopeId;
use crate::symbol::Symbol;
use crate::tables::{FieldInfo, FunctionSig};
use crate::ty::Type;
use tally_types::ast::{Def, FieldDecl, FunctionDef, NodeId, SumMember};

pub(crate) fn run(sess: &mut Session<'_>) {
    for def in &sess.file.defs {
        match def {
            Def::Record(d) => bind_fields(sess, d.id, &d.fields),
            Def::Object(d) => bind_fields(sess, d.id, &d.fields),
            Def::Sum(d) => {
                for member in &d.members {
                    match member {
                        SumMember::Record(r) => bind_fields(sess, r.id, &r.fields),
                        SumMember::Object(o) => bind_fields(sess, o.id, &o.fields),
                    }
                }
            }
            Def::Function(d) => bind_function(sess, d),
        }
    }
}

fn bind_fields(sess: &mut Session<'_>, def: NodeId, decls: &[FieldDecl]) {
    let Some(scope) = sess.tables.scope_of(def) else {
        return;
    };
    let mut fields = Vec::with_capacity(decls.len());
    for decl in decls {
        let ty = resolve_or_error(sess, scope, decl);
        if fields
            .iter()
            .any(|f: &FieldInfo| f.name == decl.name.name)
        {
            sess.record(
                decl.span,
                crate::fault::Fault::DuplicateDefinition(decl.name.name.clone()),
            );
            continue;
        }
        fields.push(FieldInfo {
            name: decl.name.name.clone(),
            ty,
            mutable: decl.mutable,
        });
    }
    if let Err(f) = sess.tables.set_fields(def, fields) {
        sess.record(sess.file.span, f);
    }
}

fn resolve_or_error(sess: &mut Session<'_>, scope: ScopeId, decl: &FieldDecl) -> Type {
    match sess.resolve_signifier(scope, &decl.sig) {
        Ok(ty) => ty,
        Err(f) => {
            sess.record(decl.span, f);
            Type::Error
        }
    }
}

fn bind_function(sess: &mut Session<'_>, d: &FunctionDef) {
    let Some(scope) = sess.tables.scope_of(d.id) else {
        return;
    };
    let mut params = Vec::with_capacity(d.params.len());
    for param in &d.params {
        let ty = match sess.resolve_signifier(scope, &param.sig) {
            Ok(ty) => ty,
            Err(f) => {
                sess.record(param.span, f);
                Type::Error
            }
        };
        if let Err(f) = sess.arena.define(
            scope,
            &param.name.name,
            Symbol::FormalParam {
                def: param.id,
                ty: ty.clone(),
            },
        ) {
            sess.record(param.span, f);
        }
        params.push((param.name.name.clone(), ty));
    }
    let ret = match sess.resolve_signifier(scope, &d.return_sig) {
        Ok(ty) => ty,
        Err(f) => {
            sess.record(d.return_sig.span, f);
            Type::Error
        }
    };
    let sig = FunctionSig {
        type_params: to_params(&d.type_params),
        params,
        ret,
    };
    if let Err(f) = sess.tables.set_signature(d.id, sig) {
        sess.record(d.span, f);
    }
}
