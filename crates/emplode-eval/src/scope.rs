//! Symbol arena and scope operations.
//!
//! Every named symbol lives in one [`SymbolTable`] and is addressed by
//! [`SymbolId`]. Scopes are symbols whose kind carries a name table; the
//! owner link from an entry back to its scope is a plain id, so the tree has
//! no reference cycles. The table starts with a single root scope.

use emplode_types::{
    EmplodeError, EvalResult, Function, LinkedFns, LinkedVar, ObjectHandle, ScopeData, Symbol,
    SymbolId, SymbolKind,
};
use std::ops::{Index, IndexMut};

/// Name of the outermost scope.
pub const ROOT_SCOPE: &str = "root";

/// Arena owning every named symbol, organised as a tree of scopes.
#[derive(Debug)]
pub struct SymbolTable {
    slots: Vec<Option<Symbol>>,
    free: Vec<SymbolId>,
    root: SymbolId,
}

impl SymbolTable {
    /// Create a table holding only the root scope.
    pub fn new() -> Self {
        let root = Symbol::new(
            ROOT_SCOPE,
            "Outer-most, global scope.",
            SymbolKind::Scope(ScopeData::default()),
        );
        Self {
            slots: vec![Some(root)],
            free: Vec::new(),
            root: SymbolId::new(0),
        }
    }

    pub fn root(&self) -> SymbolId {
        self.root
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: SymbolId) -> Option<&mut Symbol> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Number of live symbols, the root included.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn alloc(&mut self, symbol: Symbol) -> SymbolId {
        if let Some(id) = self.free.pop() {
            self.slots[id.index()] = Some(symbol);
            return id;
        }
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Some(symbol));
        SymbolId::new(index)
    }

    fn scope_data(&self, scope: SymbolId) -> EvalResult<&ScopeData> {
        let sym = &self[scope];
        sym.as_scope()
            .ok_or_else(|| EmplodeError::type_mismatch(sym.name(), "scope", sym.kind().describe()))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Declaration
    // ══════════════════════════════════════════════════════════════════════

    /// Declare a new entry of the given kind in `scope`.
    ///
    /// Every declaration funnels through here. Redeclaring a name in the same
    /// scope is a fatal configuration error.
    pub fn add(
        &mut self,
        scope: SymbolId,
        name: &str,
        desc: &str,
        kind: SymbolKind,
    ) -> EvalResult<SymbolId> {
        let data = self.scope_data(scope)?;
        if data.contains(name) {
            return Err(EmplodeError::DuplicateSymbol {
                scope: self[scope].name().to_string(),
                name: name.to_string(),
            });
        }
        let mut symbol = Symbol::new(name, desc, kind);
        symbol.set_scope(Some(scope));
        let id = self.alloc(symbol);
        if let Some(data) = self[scope].as_scope_mut() {
            data.insert(name, id);
        }
        tracing::debug!(name, scope = self[scope].name(), "declared symbol");
        Ok(id)
    }

    /// Like [`SymbolTable::add`], but the entry is skipped when writing.
    pub fn add_builtin(
        &mut self,
        scope: SymbolId,
        name: &str,
        desc: &str,
        kind: SymbolKind,
    ) -> EvalResult<SymbolId> {
        let id = self.add(scope, name, desc, kind)?;
        self[id].set_builtin(true);
        Ok(id)
    }

    fn add_maybe_builtin(
        &mut self,
        scope: SymbolId,
        name: &str,
        desc: &str,
        kind: SymbolKind,
        is_builtin: bool,
    ) -> EvalResult<SymbolId> {
        if is_builtin {
            self.add_builtin(scope, name, desc, kind)
        } else {
            self.add(scope, name, desc, kind)
        }
    }

    /// Add a numeric variable, initialised to zero.
    pub fn add_value_var(&mut self, scope: SymbolId, name: &str, desc: &str) -> EvalResult<SymbolId> {
        self.add(scope, name, desc, SymbolKind::Number(0.0))
    }

    /// Add a string variable, initialised empty.
    pub fn add_string_var(&mut self, scope: SymbolId, name: &str, desc: &str) -> EvalResult<SymbolId> {
        self.add(scope, name, desc, SymbolKind::String(String::new()))
    }

    /// Add a variable backed by a host cell; the host sees every assignment.
    pub fn link_var(
        &mut self,
        scope: SymbolId,
        name: &str,
        var: LinkedVar,
        desc: &str,
        is_builtin: bool,
    ) -> EvalResult<SymbolId> {
        self.add_maybe_builtin(scope, name, desc, SymbolKind::Linked(var), is_builtin)
    }

    /// Add a variable whose reads and writes go through host closures.
    pub fn link_fns(
        &mut self,
        scope: SymbolId,
        name: &str,
        fns: LinkedFns,
        desc: &str,
        is_builtin: bool,
    ) -> EvalResult<SymbolId> {
        self.add_maybe_builtin(scope, name, desc, SymbolKind::LinkedFns(fns), is_builtin)
    }

    /// Add a nested scope.
    pub fn add_scope(&mut self, scope: SymbolId, name: &str, desc: &str) -> EvalResult<SymbolId> {
        self.add_scope_with_object(scope, name, desc, ObjectHandle::Absent)
    }

    /// Add a nested scope wrapping a host object.
    pub fn add_scope_with_object(
        &mut self,
        scope: SymbolId,
        name: &str,
        desc: &str,
        object: ObjectHandle,
    ) -> EvalResult<SymbolId> {
        self.add(scope, name, desc, SymbolKind::Scope(ScopeData::new(object)))
    }

    /// Add a user-visible function.
    pub fn add_function(
        &mut self,
        scope: SymbolId,
        name: &str,
        function: Function,
        desc: &str,
    ) -> EvalResult<SymbolId> {
        self.add(scope, name, desc, SymbolKind::Function(function))
    }

    /// Add a function that is a standard part of the language.
    pub fn add_builtin_function(
        &mut self,
        scope: SymbolId,
        name: &str,
        function: Function,
        desc: &str,
    ) -> EvalResult<SymbolId> {
        self.add_builtin(scope, name, desc, SymbolKind::Function(function))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Lookup
    // ══════════════════════════════════════════════════════════════════════

    /// Entry declared directly in `scope`.
    pub fn get_symbol(&self, scope: SymbolId, name: &str) -> Option<SymbolId> {
        self.get(scope)?.as_scope()?.get(name)
    }

    /// Resolve `name` starting at `scope`, walking outward through parents
    /// when `scan_scopes` is set. A miss is `None`, never an error.
    pub fn lookup(&self, scope: SymbolId, name: &str, scan_scopes: bool) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let sym = self.get(id)?;
            if let Some(found) = sym.as_scope().and_then(|data| data.get(name)) {
                return Some(found);
            }
            if !scan_scopes {
                return None;
            }
            current = sym.scope();
        }
        None
    }

    /// [`SymbolTable::lookup`] with scanning, reporting a miss as
    /// [`EmplodeError::UnknownSymbol`] for front ends.
    pub fn resolve(&self, scope: SymbolId, name: &str) -> EvalResult<SymbolId> {
        self.lookup(scope, name, true)
            .ok_or_else(|| EmplodeError::UnknownSymbol(name.to_string()))
    }

    /// Entries of `scope` in name order.
    pub fn entries(&self, scope: SymbolId) -> Vec<(String, SymbolId)> {
        self.get(scope)
            .and_then(Symbol::as_scope)
            .map(|data| data.entries().map(|(n, id)| (n.to_string(), id)).collect())
            .unwrap_or_default()
    }

    /// Whether `scope` has anything worth writing out.
    pub fn has_body(&self, scope: SymbolId) -> bool {
        self.get(scope)
            .and_then(Symbol::as_scope)
            .is_some_and(|data| data.entries().any(|(_, id)| !self[id].is_builtin()))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Cloning & release
    // ══════════════════════════════════════════════════════════════════════

    /// Deep copy of a symbol. Scope contents are cloned recursively; a host
    /// object is shared by reference and never owned by the copy. The copy
    /// belongs to no scope.
    pub fn deep_clone(&mut self, id: SymbolId) -> SymbolId {
        let copy = self[id].clone_detached();
        let children = self.entries(id);
        let new_id = self.alloc(copy);
        for (name, child) in children {
            let child_copy = self.deep_clone(child);
            self[child_copy].set_scope(Some(new_id));
            if let Some(data) = self[new_id].as_scope_mut() {
                data.insert(&name, child_copy);
            }
        }
        new_id
    }

    /// Deep copy `source` into `scope` under the source's own name.
    pub fn clone_into(&mut self, source: SymbolId, scope: SymbolId) -> EvalResult<SymbolId> {
        let name = self[source].name().to_string();
        if self.scope_data(scope)?.contains(&name) {
            return Err(EmplodeError::DuplicateSymbol {
                scope: self[scope].name().to_string(),
                name,
            });
        }
        let copy = self.deep_clone(source);
        self[copy].set_scope(Some(scope));
        if let Some(data) = self[scope].as_scope_mut() {
            data.insert(&name, copy);
        }
        Ok(copy)
    }

    /// Destroy a symbol, unlinking it from its scope. A scope releases its
    /// host object (if owned) first, then every entry, recursively.
    pub fn remove(&mut self, id: SymbolId) {
        if id == self.root {
            return;
        }
        let Some(sym) = self.get(id) else { return };
        if let Some(owner) = sym.scope() {
            let name = sym.name().to_string();
            if let Some(data) = self.get_mut(owner).and_then(Symbol::as_scope_mut) {
                data.remove(&name);
            }
        }
        self.release(id);
    }

    fn release(&mut self, id: SymbolId) {
        let Some(mut sym) = self.slots.get_mut(id.index()).and_then(Option::take) else {
            return;
        };
        tracing::debug!(name = sym.name(), "releasing symbol");
        self.free.push(id);
        if let Some(data) = sym.as_scope_mut() {
            for child in data.take_contents() {
                self.release(child);
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Snapshot
    // ══════════════════════════════════════════════════════════════════════

    /// Current values of every non-builtin variable under `scope`, nested
    /// scopes as nested objects. Functions are omitted.
    pub fn snapshot(&self, scope: SymbolId) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (name, id) in self.entries(scope) {
            let sym = &self[id];
            if sym.is_builtin() {
                continue;
            }
            if sym.is_scope() {
                map.insert(name, self.snapshot(id));
            } else if let Ok(value) = sym.to_value() {
                if let Ok(json) = serde_json::to_value(value) {
                    map.insert(name, json);
                }
            }
        }
        serde_json::Value::Object(map)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<SymbolId> for SymbolTable {
    type Output = Symbol;

    fn index(&self, id: SymbolId) -> &Symbol {
        match self.get(id) {
            Some(sym) => sym,
            None => panic!("stale symbol id {id:?}"),
        }
    }
}

impl IndexMut<SymbolId> for SymbolTable {
    fn index_mut(&mut self, id: SymbolId) -> &mut Symbol {
        match self.get_mut(id) {
            Some(sym) => sym,
            None => panic!("stale symbol id {id:?}"),
        }
    }
}
