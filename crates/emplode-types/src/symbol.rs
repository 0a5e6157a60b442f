//! Symbols: every nameable, typed, possibly callable script entity.
//!
//! Symbol kinds form a closed set. Capability predicates (`is_numeric`,
//! `has_string_return`, ...) are derived from the kind rather than overridden
//! per kind. Named symbols live in a symbol arena and refer to their owning
//! scope by [`SymbolId`]; temporaries live outside the arena and are owned by
//! whoever holds them.

use crate::error::{EmplodeError, EvalResult};
use crate::value::{format_number, Value, ValueKind};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

// ══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ══════════════════════════════════════════════════════════════════════════════

/// Index of a symbol in its arena.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct SymbolId(u32);

impl SymbolId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        SymbolId(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolId({})", self.0)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Host objects
// ══════════════════════════════════════════════════════════════════════════════

/// A host-language object exposed to scripts through a scope.
pub trait HostObject: Any {
    /// Script-visible type name, printed when the owning scope is written.
    fn type_name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

/// Host object attached to a scope.
#[derive(Clone, Default)]
pub enum ObjectHandle {
    #[default]
    Absent,
    /// Released when the scope is released.
    Owned(Rc<dyn HostObject>),
    /// Kept alive by someone else; the scope never releases it.
    Borrowed(Weak<dyn HostObject>),
}

impl ObjectHandle {
    /// Live reference to the object, if any.
    pub fn get(&self) -> Option<Rc<dyn HostObject>> {
        match self {
            Self::Absent => None,
            Self::Owned(obj) => Some(Rc::clone(obj)),
            Self::Borrowed(weak) => weak.upgrade(),
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }

    /// Same object, never owned. Used when a scope is cloned.
    pub fn to_borrowed(&self) -> Self {
        match self {
            Self::Absent => Self::Absent,
            Self::Owned(obj) => Self::Borrowed(Rc::downgrade(obj)),
            Self::Borrowed(weak) => Self::Borrowed(weak.clone()),
        }
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "Absent"),
            Self::Owned(obj) => write!(f, "Owned({})", obj.type_name()),
            Self::Borrowed(weak) => match weak.upgrade() {
                Some(obj) => write!(f, "Borrowed({})", obj.type_name()),
                None => write!(f, "Borrowed(<dropped>)"),
            },
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Symbol kinds
// ══════════════════════════════════════════════════════════════════════════════

/// A variable whose storage is a host-owned cell.
#[derive(Debug, Clone)]
pub enum LinkedVar {
    Number(Rc<Cell<f64>>),
    Integer(Rc<Cell<i64>>),
    Bool(Rc<Cell<bool>>),
    String(Rc<RefCell<String>>),
}

/// A variable read and written through host closures.
#[derive(Clone)]
pub enum LinkedFns {
    Number {
        get: Rc<dyn Fn() -> f64>,
        set: Rc<dyn Fn(f64)>,
    },
    String {
        get: Rc<dyn Fn() -> String>,
        set: Rc<dyn Fn(&str)>,
    },
}

impl fmt::Debug for LinkedFns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number { .. } => write!(f, "LinkedFns::Number"),
            Self::String { .. } => write!(f, "LinkedFns::String"),
        }
    }
}

/// What a function hands back from a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    Number,
    String,
    Void,
}

/// Native body of a script-callable function. Arguments are borrowed: a
/// callee can read named arguments but never mutate them.
pub type FunctionBody = Rc<dyn Fn(&[&Symbol]) -> EvalResult<Option<Value>>>;

/// A host function callable from scripts.
#[derive(Clone)]
pub struct Function {
    body: FunctionBody,
    returns: ReturnKind,
    arity: Option<usize>,
}

impl Function {
    /// Wrap a raw body. Arity is unchecked until [`Function::with_arity`].
    pub fn new(
        returns: ReturnKind,
        body: impl Fn(&[&Symbol]) -> EvalResult<Option<Value>> + 'static,
    ) -> Self {
        Self {
            body: Rc::new(body),
            returns,
            arity: None,
        }
    }

    /// A function over numbers returning a number.
    pub fn numeric(arity: usize, body: impl Fn(&[f64]) -> f64 + 'static) -> Self {
        Self::new(ReturnKind::Number, move |args| {
            let nums = args
                .iter()
                .map(|a| a.as_double())
                .collect::<EvalResult<Vec<_>>>()?;
            Ok(Some(Value::Number(body(&nums))))
        })
        .with_arity(arity)
    }

    /// A function over strings returning a string.
    pub fn text(arity: usize, body: impl Fn(&[String]) -> String + 'static) -> Self {
        Self::new(ReturnKind::String, move |args| {
            let strs = args
                .iter()
                .map(|a| a.as_string())
                .collect::<EvalResult<Vec<_>>>()?;
            Ok(Some(Value::String(body(&strs))))
        })
        .with_arity(arity)
    }

    /// A function run for its side effects only.
    pub fn action(arity: usize, body: impl Fn(&[&Symbol]) -> EvalResult<()> + 'static) -> Self {
        Self::new(ReturnKind::Void, move |args| {
            body(args)?;
            Ok(None)
        })
        .with_arity(arity)
    }

    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }

    pub fn returns(&self) -> ReturnKind {
        self.returns
    }

    pub fn arity(&self) -> Option<usize> {
        self.arity
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("returns", &self.returns)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Name table and host attachment of a scope symbol.
///
/// Entries are kept in name order, which is also the order they are written
/// out in.
#[derive(Debug, Default)]
pub struct ScopeData {
    entries: BTreeMap<String, SymbolId>,
    object: ObjectHandle,
}

impl ScopeData {
    pub fn new(object: ObjectHandle) -> Self {
        Self {
            entries: BTreeMap::new(),
            object,
        }
    }

    /// Local lookup only.
    pub fn get(&self, name: &str) -> Option<SymbolId> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Insert a new entry. Returns `false` (and leaves the table unchanged)
    /// if the name is taken.
    pub fn insert(&mut self, name: &str, id: SymbolId) -> bool {
        if self.entries.contains_key(name) {
            return false;
        }
        self.entries.insert(name.to_string(), id);
        true
    }

    /// Unlink an entry by name, returning its id.
    pub fn remove(&mut self, name: &str) -> Option<SymbolId> {
        self.entries.remove(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, SymbolId)> + '_ {
        self.entries.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn object(&self) -> &ObjectHandle {
        &self.object
    }

    /// Drop the host object (if owned) and hand back the entries for release.
    pub fn take_contents(&mut self) -> Vec<SymbolId> {
        self.object = ObjectHandle::Absent;
        std::mem::take(&mut self.entries).into_values().collect()
    }
}

/// The closed set of symbol kinds.
#[derive(Debug)]
pub enum SymbolKind {
    /// Raw numeric variable (also the kind of numeric temporaries).
    Number(f64),
    /// Raw string variable (also the kind of string temporaries).
    String(String),
    Linked(LinkedVar),
    LinkedFns(LinkedFns),
    Function(Function),
    Scope(ScopeData),
}

impl SymbolKind {
    /// Short description used in error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Number(_)
            | Self::Linked(LinkedVar::Number(_) | LinkedVar::Integer(_) | LinkedVar::Bool(_))
            | Self::LinkedFns(LinkedFns::Number { .. }) => "number",
            Self::String(_)
            | Self::Linked(LinkedVar::String(_))
            | Self::LinkedFns(LinkedFns::String { .. }) => "string",
            Self::Function(_) => "function",
            Self::Scope(_) => "scope",
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Symbol
// ══════════════════════════════════════════════════════════════════════════════

/// A nameable, typed, possibly callable entity.
#[derive(Debug)]
pub struct Symbol {
    name: String,
    desc: String,
    /// Owning scope; never owns it back.
    scope: Option<SymbolId>,
    builtin: bool,
    temporary: bool,
    kind: SymbolKind,
}

impl Symbol {
    /// A named, non-temporary symbol.
    pub fn new(name: impl Into<String>, desc: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            desc: desc.into(),
            scope: None,
            builtin: false,
            temporary: false,
            kind,
        }
    }

    /// An unnamed temporary holding `value`.
    pub fn temporary(value: impl Into<Value>) -> Self {
        let kind = match value.into() {
            Value::Number(n) => SymbolKind::Number(n),
            Value::String(s) => SymbolKind::String(s),
        };
        Self {
            name: String::new(),
            desc: String::new(),
            scope: None,
            builtin: false,
            temporary: true,
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn kind(&self) -> &SymbolKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut SymbolKind {
        &mut self.kind
    }

    /// Owning scope, if any.
    pub fn scope(&self) -> Option<SymbolId> {
        self.scope
    }

    pub fn set_scope(&mut self, scope: Option<SymbolId>) {
        self.scope = scope;
    }

    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    pub fn set_builtin(&mut self, builtin: bool) -> &mut Self {
        self.builtin = builtin;
        self
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    pub fn set_temporary(&mut self, temporary: bool) {
        self.temporary = temporary;
    }

    // ── Capabilities ─────────────────────────────────────────────────────

    pub fn is_numeric(&self) -> bool {
        self.kind.describe() == "number"
    }

    pub fn is_string(&self) -> bool {
        self.kind.describe() == "string"
    }

    pub fn has_numeric_return(&self) -> bool {
        matches!(&self.kind, SymbolKind::Function(f) if f.returns == ReturnKind::Number)
    }

    pub fn has_string_return(&self) -> bool {
        matches!(&self.kind, SymbolKind::Function(f) if f.returns == ReturnKind::String)
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, SymbolKind::Function(_))
    }

    pub fn is_scope(&self) -> bool {
        matches!(self.kind, SymbolKind::Scope(_))
    }

    /// Declared in script storage rather than linked to host storage.
    pub fn is_local(&self) -> bool {
        matches!(
            self.kind,
            SymbolKind::Number(_) | SymbolKind::String(_) | SymbolKind::Scope(_)
        )
    }

    /// The native kind this symbol's value is stored as, if it has one.
    pub fn value_kind(&self) -> Option<ValueKind> {
        if self.is_numeric() {
            Some(ValueKind::Number)
        } else if self.is_string() {
            Some(ValueKind::String)
        } else {
            None
        }
    }

    /// Script-visible type name used in declarations.
    pub fn type_name(&self) -> String {
        match &self.kind {
            SymbolKind::Scope(data) => data
                .object
                .get()
                .map_or_else(|| "Struct".to_string(), |obj| obj.type_name().to_string()),
            SymbolKind::Function(_) => "Function".to_string(),
            _ if self.is_string() => "String".to_string(),
            _ => "Value".to_string(),
        }
    }

    pub fn as_scope(&self) -> Option<&ScopeData> {
        match &self.kind {
            SymbolKind::Scope(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_scope_mut(&mut self) -> Option<&mut ScopeData> {
        match &mut self.kind {
            SymbolKind::Scope(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match &self.kind {
            SymbolKind::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Host object behind a scope symbol.
    pub fn object(&self) -> Option<Rc<dyn HostObject>> {
        self.as_scope().and_then(|data| data.object.get())
    }

    // ── Coercion ─────────────────────────────────────────────────────────

    pub fn as_double(&self) -> EvalResult<f64> {
        let found = self.kind.describe();
        let num = match &self.kind {
            SymbolKind::Number(n) => Some(*n),
            SymbolKind::Linked(LinkedVar::Number(cell)) => Some(cell.get()),
            SymbolKind::Linked(LinkedVar::Integer(cell)) => Some(cell.get() as f64),
            SymbolKind::Linked(LinkedVar::Bool(cell)) => Some(if cell.get() { 1.0 } else { 0.0 }),
            SymbolKind::LinkedFns(LinkedFns::Number { get, .. }) => Some(get()),
            SymbolKind::String(s) => s.trim().parse().ok(),
            SymbolKind::Linked(LinkedVar::String(cell)) => cell.borrow().trim().parse().ok(),
            SymbolKind::LinkedFns(LinkedFns::String { get, .. }) => get().trim().parse().ok(),
            SymbolKind::Function(_) | SymbolKind::Scope(_) => None,
        };
        num.ok_or_else(|| EmplodeError::type_mismatch(&self.name, "number", found))
    }

    pub fn as_string(&self) -> EvalResult<String> {
        if self.is_numeric() {
            return self.as_double().map(format_number);
        }
        match &self.kind {
            SymbolKind::String(s) => Ok(s.clone()),
            SymbolKind::Linked(LinkedVar::String(cell)) => Ok(cell.borrow().clone()),
            SymbolKind::LinkedFns(LinkedFns::String { get, .. }) => Ok(get()),
            _ => Err(EmplodeError::type_mismatch(
                &self.name,
                "string",
                self.kind.describe(),
            )),
        }
    }

    /// Coerce to whichever native kind is requested.
    pub fn as_kind(&self, kind: ValueKind) -> EvalResult<Value> {
        match kind {
            ValueKind::Number => self.as_double().map(Value::Number),
            ValueKind::String => self.as_string().map(Value::String),
        }
    }

    /// Current value in the symbol's own native kind.
    pub fn to_value(&self) -> EvalResult<Value> {
        match self.value_kind() {
            Some(kind) => self.as_kind(kind),
            None => Err(EmplodeError::type_mismatch(
                &self.name,
                "value",
                self.kind.describe(),
            )),
        }
    }

    // ── Mutation & calls ─────────────────────────────────────────────────

    /// Overwrite this symbol's value from another symbol's.
    pub fn copy_value(&mut self, other: &Symbol) -> EvalResult<()> {
        let value = other.to_value()?;
        self.set_value(value)
    }

    /// Overwrite this symbol's value, coercing to its storage kind.
    pub fn set_value(&mut self, value: Value) -> EvalResult<()> {
        let mismatch =
            |name: &str, expected| EmplodeError::type_mismatch(name, expected, value.kind().name());
        match &mut self.kind {
            SymbolKind::Number(n) => {
                *n = value.to_number().ok_or_else(|| mismatch(&self.name, "number"))?;
            }
            SymbolKind::String(s) => *s = value.to_text(),
            SymbolKind::Linked(LinkedVar::Number(cell)) => {
                cell.set(value.to_number().ok_or_else(|| mismatch(&self.name, "number"))?);
            }
            SymbolKind::Linked(LinkedVar::Integer(cell)) => {
                let n = value.to_number().ok_or_else(|| mismatch(&self.name, "number"))?;
                cell.set(n as i64);
            }
            SymbolKind::Linked(LinkedVar::Bool(cell)) => {
                cell.set(value.to_bool().ok_or_else(|| mismatch(&self.name, "number"))?);
            }
            SymbolKind::Linked(LinkedVar::String(cell)) => *cell.borrow_mut() = value.to_text(),
            SymbolKind::LinkedFns(LinkedFns::Number { set, .. }) => {
                set(value.to_number().ok_or_else(|| mismatch(&self.name, "number"))?);
            }
            SymbolKind::LinkedFns(LinkedFns::String { set, .. }) => set(&value.to_text()),
            SymbolKind::Function(_) | SymbolKind::Scope(_) => {
                return Err(EmplodeError::NotAssignable(self.name.clone()));
            }
        }
        Ok(())
    }

    /// Invoke as a function. The result, if any, is a fresh temporary.
    pub fn call(&self, args: &[&Symbol]) -> EvalResult<Option<Symbol>> {
        let SymbolKind::Function(fun) = &self.kind else {
            return Err(EmplodeError::NotCallable(self.name.clone()));
        };
        if let Some(expected) = fun.arity {
            if expected != args.len() {
                return Err(EmplodeError::ArityMismatch {
                    name: self.name.clone(),
                    expected,
                    found: args.len(),
                });
            }
        }
        let result = (fun.body)(args)?;
        Ok(result.map(Symbol::temporary))
    }

    /// Copy everything except scope contents. A cloned scope starts empty and
    /// only borrows the original's host object; the arena fills in the
    /// entries.
    pub fn clone_detached(&self) -> Symbol {
        let kind = match &self.kind {
            SymbolKind::Number(n) => SymbolKind::Number(*n),
            SymbolKind::String(s) => SymbolKind::String(s.clone()),
            SymbolKind::Linked(link) => SymbolKind::Linked(link.clone()),
            SymbolKind::LinkedFns(fns) => SymbolKind::LinkedFns(fns.clone()),
            SymbolKind::Function(f) => SymbolKind::Function(f.clone()),
            SymbolKind::Scope(data) => SymbolKind::Scope(ScopeData::new(data.object.to_borrowed())),
        };
        Symbol {
            name: self.name.clone(),
            desc: self.desc.clone(),
            scope: None,
            builtin: self.builtin,
            temporary: self.temporary,
            kind,
        }
    }
}
