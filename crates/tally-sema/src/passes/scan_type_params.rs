//! Pass 2: type-parameter binding.
//!
//! Defines each generic declaration's type parameters as symbols in its
//! scope, rejecting duplicates within a declaration and parameters that
//! shadow a name visible from an enclosing scope.

use crate::fault::Fault;
use crate::passes::Session;
use crate::symbol::Symbol;
use crate::ty::TypeParameter;
use tally_types::ast::{Def, NodeId, TypeParamDecl};

pub(crate) fn run(sess: &mut Session<'_>) {
    for def in &sess.file.defs {
        match def {
            Def::Function(d) => scan(sess, d.id, &d.type_params),
            Def::Record(d) => scan(sess, d.id, &d.type_params),
            Def::Sum(d) => scan(sess, d.id, &d.type_params),
            Def::Object(_) => {}
        }
    }
}

fn scan(sess: &mut Session<'_>, def: NodeId, decls: &[TypeParamDecl]) {
    let Some(scope) = sess.tables.scope_of(def) else {
        return;
    };
    let enclosing = sess.arena.parent(scope);
    for decl in decls {
        let name = &decl.name.name;
        // A parameter may not shadow anything visible from outside the
        // declaration, including another declaration's parameters.
        if sess.arena.exists(enclosing, name) {
            sess.record(decl.span, Fault::DuplicateDefinition(name.clone()));
            continue;
        }
        let param = if decl.fin {
            TypeParameter::fin(name.clone())
        } else {
            TypeParameter::standard(name.clone())
        };
        if let Err(f) = sess.arena.define(scope, name, Symbol::TypeParam(param)) {
            sess.record(decl.span, f);
        }
    }
}
