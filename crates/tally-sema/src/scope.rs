//! Scope arena for lexical name resolution.
//!
//! Scopes live in a flat arena addressed by [`ScopeId`]; each scope holds a
//! parent id and an append-only name table. Index 0 is the **null scope**,
//! the terminal parent: every lookup and every define against it fails, so a
//! symbol with no real enclosing scope still has a total, crash-free parent.

use std::collections::HashMap;

use crate::fault::Fault;
use crate::symbol::Symbol;
use tally_types::ast::NodeId;

/// Index of a scope in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

/// The always-failing terminal parent scope.
pub const NULL_SCOPE: ScopeId = ScopeId(0);

#[derive(Debug, Default)]
struct Scope {
    parent: ScopeId,
    bindings: HashMap<String, Symbol>,
    /// For import-aggregation scopes: which origin registered each name.
    origins: HashMap<String, String>,
    /// Names registered from two different origins, with both origins kept
    /// for the diagnostic.
    ambiguous: HashMap<String, (String, String)>,
}

impl Default for ScopeId {
    fn default() -> Self {
        NULL_SCOPE
    }
}

/// Arena of all scopes created during analysis.
#[derive(Debug)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
    /// Member scope of each definition that has one (sum types, records,
    /// objects), for dotted-path resolution.
    member_scopes: HashMap<NodeId, ScopeId>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
            member_scopes: HashMap::new(),
        }
    }

    /// Allocate a fresh child scope.
    pub fn alloc(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent,
            ..Scope::default()
        });
        id
    }

    pub fn parent(&self, scope: ScopeId) -> ScopeId {
        self.scopes[scope.0 as usize].parent
    }

    /// Attach a member scope to a definition node for dotted-path lookups.
    pub fn set_member_scope(&mut self, def: NodeId, scope: ScopeId) {
        self.member_scopes.insert(def, scope);
    }

    pub fn member_scope(&self, def: NodeId) -> Option<ScopeId> {
        self.member_scopes.get(&def).copied()
    }

    /// Define `name` in `scope`. Fails on the null scope and on a name
    /// already defined **in this scope** (shadowing an outer scope is fine).
    pub fn define(&mut self, scope: ScopeId, name: &str, symbol: Symbol) -> Result<(), Fault> {
        if scope == NULL_SCOPE {
            return Err(Fault::Internal(format!(
                "cannot define '{name}' in the null scope"
            )));
        }
        let s = &mut self.scopes[scope.0 as usize];
        if s.bindings.contains_key(name) {
            return Err(Fault::DuplicateDefinition(name.to_string()));
        }
        s.bindings.insert(name.to_string(), symbol);
        Ok(())
    }

    /// Register `name` into an aggregation scope, remembering its origin.
    ///
    /// The same name arriving again from the *same* origin is idempotent;
    /// arriving from a different origin marks the name ambiguous, and any
    /// later fetch of it reports the conflict instead of picking a winner.
    pub fn define_imported(
        &mut self,
        scope: ScopeId,
        name: &str,
        symbol: Symbol,
        origin: &str,
    ) -> Result<(), Fault> {
        if scope == NULL_SCOPE {
            return Err(Fault::Internal(format!(
                "cannot define '{name}' in the null scope"
            )));
        }
        let s = &mut self.scopes[scope.0 as usize];
        match s.origins.get(name) {
            None => {
                s.origins.insert(name.to_string(), origin.to_string());
                s.bindings.insert(name.to_string(), symbol);
                Ok(())
            }
            Some(first) if first == origin => Ok(()),
            Some(first) => {
                s.ambiguous
                    .insert(name.to_string(), (first.clone(), origin.to_string()));
                s.bindings.insert(name.to_string(), Symbol::Error);
                Ok(())
            }
        }
    }

    /// Is `name` visible from `scope` (walking parents)?
    pub fn exists(&self, scope: ScopeId, name: &str) -> bool {
        let mut cur = scope;
        while cur != NULL_SCOPE {
            if self.exists_here(cur, name) {
                return true;
            }
            cur = self.parent(cur);
        }
        false
    }

    /// Is `name` defined in `scope` itself?
    pub fn exists_here(&self, scope: ScopeId, name: &str) -> bool {
        scope != NULL_SCOPE && self.scopes[scope.0 as usize].bindings.contains_key(name)
    }

    /// Resolve a possibly dotted path from `scope`.
    ///
    /// The head segment is looked up with parent delegation; each further
    /// segment walks into the member scope of the symbol resolved so far.
    pub fn fetch(&self, scope: ScopeId, path: &str) -> Result<Symbol, Fault> {
        let mut segments = path.split('.');
        let head = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Fault::NotFound(path.to_string()))?;
        let mut symbol = self.fetch_walk(scope, head)?;
        for segment in segments {
            let owner = symbol
                .member_scope_owner()
                .ok_or_else(|| Fault::WrongSymbolKind(path.to_string(), "a namespace"))?;
            let members = self
                .member_scope(owner)
                .ok_or_else(|| Fault::NotFound(path.to_string()))?;
            symbol = self.fetch_here(members, segment)?;
        }
        Ok(symbol)
    }

    /// Resolve a single (undotted) name in `scope` itself.
    pub fn fetch_here(&self, scope: ScopeId, name: &str) -> Result<Symbol, Fault> {
        if scope == NULL_SCOPE {
            return Err(Fault::NotFound(name.to_string()));
        }
        let s = &self.scopes[scope.0 as usize];
        if let Some((first, second)) = s.ambiguous.get(name) {
            return Err(Fault::AmbiguousImport {
                name: name.to_string(),
                first: first.clone(),
                second: second.clone(),
            });
        }
        s.bindings
            .get(name)
            .cloned()
            .ok_or_else(|| Fault::NotFound(name.to_string()))
    }

    fn fetch_walk(&self, scope: ScopeId, name: &str) -> Result<Symbol, Fault> {
        let mut cur = scope;
        while cur != NULL_SCOPE {
            match self.fetch_here(cur, name) {
                Err(Fault::NotFound(_)) => cur = self.parent(cur),
                other => return other,
            }
        }
        Err(Fault::NotFound(name.to_string()))
    }
}

impl Default for ScopeArena {
    fn default() -> Self {
        Self::new()
    }
}
