//! Operator overload tables.
//!
//! Each operator token maps to a set of overloads keyed by the native kinds
//! of its operands. An overload is a host closure over native types
//! (`f64`, `String`, `bool`); registration erases it to a closure over
//! [`Value`]. The overload set is bound to an AST node when the node is
//! built and resolved against the actual operands at evaluation time, so the
//! same `+` node adds two numbers or concatenates two strings.

use emplode_types::{EmplodeError, EvalResult, Symbol, Value, ValueKind};
use rustc_hash::FxHashMap;
use std::fmt;
use std::rc::Rc;

// ══════════════════════════════════════════════════════════════════════════════
// Native types
// ══════════════════════════════════════════════════════════════════════════════

/// A Rust type an operator closure can take or return.
pub trait Native: Sized + 'static {
    /// Kind operands are coerced to before the closure sees them.
    const KIND: ValueKind;

    fn from_value(value: Value) -> Self;

    fn into_value(self) -> Value;
}

impl Native for f64 {
    const KIND: ValueKind = ValueKind::Number;

    fn from_value(value: Value) -> Self {
        value.to_number().unwrap_or(f64::NAN)
    }

    fn into_value(self) -> Value {
        Value::Number(self)
    }
}

impl Native for String {
    const KIND: ValueKind = ValueKind::String;

    fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) => s,
            other => other.to_text(),
        }
    }

    fn into_value(self) -> Value {
        Value::String(self)
    }
}

/// Booleans travel as numbers: `1` and `0`.
impl Native for bool {
    const KIND: ValueKind = ValueKind::Number;

    fn from_value(value: Value) -> Self {
        value.is_truthy()
    }

    fn into_value(self) -> Value {
        Value::from(self)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Overload sets
// ══════════════════════════════════════════════════════════════════════════════

type UnaryFn = Rc<dyn Fn(Value) -> Value>;
type BinaryFn = Rc<dyn Fn(Value, Value) -> Value>;

#[derive(Clone)]
struct UnaryOverload {
    arg: ValueKind,
    returns: ValueKind,
    fun: UnaryFn,
}

#[derive(Clone)]
struct BinaryOverload {
    args: (ValueKind, ValueKind),
    returns: ValueKind,
    fun: BinaryFn,
}

/// Every overload of one prefix operator.
#[derive(Clone)]
pub struct UnaryOverloads {
    token: String,
    overloads: Vec<UnaryOverload>,
}

impl UnaryOverloads {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            overloads: Vec::new(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Add (or replace) the overload for argument type `A`.
    pub fn with<R: Native, A: Native>(mut self, fun: impl Fn(A) -> R + 'static) -> Self {
        self.insert(fun);
        self
    }

    fn insert<R: Native, A: Native>(&mut self, fun: impl Fn(A) -> R + 'static) {
        self.overloads.retain(|o| o.arg != A::KIND);
        self.overloads.push(UnaryOverload {
            arg: A::KIND,
            returns: R::KIND,
            fun: Rc::new(move |a| fun(A::from_value(a)).into_value()),
        });
    }

    fn select(&self, input: &Symbol) -> Option<&UnaryOverload> {
        let kind = input.value_kind();
        self.overloads
            .iter()
            .find(|o| Some(o.arg) == kind)
            .or_else(|| self.overloads.iter().find(|o| input.as_kind(o.arg).is_ok()))
    }

    /// Result kind for an operand of the given kind, if an overload applies.
    pub fn result_kind(&self, operand: Option<ValueKind>) -> Option<ValueKind> {
        self.overloads
            .iter()
            .find(|o| Some(o.arg) == operand)
            .or_else(|| self.overloads.first())
            .map(|o| o.returns)
    }

    /// Coerce `input`, run the matching overload, and wrap the result as a
    /// new temporary.
    pub fn apply(&self, input: &Symbol) -> EvalResult<Symbol> {
        let overload = self
            .select(input)
            .ok_or_else(|| EmplodeError::UnknownOperator {
                token: self.token.clone(),
                operands: describe(input),
            })?;
        let arg = input.as_kind(overload.arg)?;
        Ok(Symbol::temporary((overload.fun)(arg)))
    }
}

impl fmt::Debug for UnaryOverloads {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<_> = self.overloads.iter().map(|o| o.arg).collect();
        f.debug_struct("UnaryOverloads")
            .field("token", &self.token)
            .field("args", &args)
            .finish()
    }
}

/// Every overload of one infix operator.
#[derive(Clone)]
pub struct BinaryOverloads {
    token: String,
    overloads: Vec<BinaryOverload>,
}

impl BinaryOverloads {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            overloads: Vec::new(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Add (or replace) the overload for argument types `(A, B)`.
    pub fn with<R: Native, A: Native, B: Native>(
        mut self,
        fun: impl Fn(A, B) -> R + 'static,
    ) -> Self {
        self.insert(fun);
        self
    }

    fn insert<R: Native, A: Native, B: Native>(&mut self, fun: impl Fn(A, B) -> R + 'static) {
        let args = (A::KIND, B::KIND);
        self.overloads.retain(|o| o.args != args);
        self.overloads.push(BinaryOverload {
            args,
            returns: R::KIND,
            fun: Rc::new(move |a, b| fun(A::from_value(a), B::from_value(b)).into_value()),
        });
    }

    /// Exact operand kinds first; then string overloads when either operand
    /// is a string; then anything both operands coerce to.
    fn select(&self, lhs: &Symbol, rhs: &Symbol) -> Option<&BinaryOverload> {
        let kinds = (lhs.value_kind(), rhs.value_kind());
        let exact = |o: &&BinaryOverload| (Some(o.args.0), Some(o.args.1)) == kinds;
        let any_string = lhs.is_string() || rhs.is_string();
        self.overloads
            .iter()
            .find(exact)
            .or_else(|| {
                any_string
                    .then(|| {
                        self.overloads
                            .iter()
                            .find(|o| o.args == (ValueKind::String, ValueKind::String))
                    })
                    .flatten()
            })
            .or_else(|| {
                self.overloads
                    .iter()
                    .find(|o| lhs.as_kind(o.args.0).is_ok() && rhs.as_kind(o.args.1).is_ok())
            })
    }

    /// Result kind for operands of the given kinds, if an overload applies.
    pub fn result_kind(
        &self,
        lhs: Option<ValueKind>,
        rhs: Option<ValueKind>,
    ) -> Option<ValueKind> {
        let any_string = lhs == Some(ValueKind::String) || rhs == Some(ValueKind::String);
        self.overloads
            .iter()
            .find(|o| (Some(o.args.0), Some(o.args.1)) == (lhs, rhs))
            .or_else(|| {
                self.overloads.iter().find(|o| {
                    any_string && o.args == (ValueKind::String, ValueKind::String)
                })
            })
            .or_else(|| self.overloads.first())
            .map(|o| o.returns)
    }

    /// Coerce both operands, run the matching overload, and wrap the result
    /// as a new temporary.
    pub fn apply(&self, lhs: &Symbol, rhs: &Symbol) -> EvalResult<Symbol> {
        let overload = self
            .select(lhs, rhs)
            .ok_or_else(|| EmplodeError::UnknownOperator {
                token: self.token.clone(),
                operands: format!("{} and {}", describe(lhs), describe(rhs)),
            })?;
        let a = lhs.as_kind(overload.args.0)?;
        let b = rhs.as_kind(overload.args.1)?;
        Ok(Symbol::temporary((overload.fun)(a, b)))
    }
}

impl fmt::Debug for BinaryOverloads {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<_> = self.overloads.iter().map(|o| o.args).collect();
        f.debug_struct("BinaryOverloads")
            .field("token", &self.token)
            .field("args", &args)
            .finish()
    }
}

fn describe(sym: &Symbol) -> String {
    sym.kind().describe().to_string()
}

// ══════════════════════════════════════════════════════════════════════════════
// Operator table
// ══════════════════════════════════════════════════════════════════════════════

/// Token -> overload set, for prefix and infix operators.
#[derive(Debug, Clone, Default)]
pub struct OperatorTable {
    unary: FxHashMap<String, Rc<UnaryOverloads>>,
    binary: FxHashMap<String, Rc<BinaryOverloads>>,
}

impl OperatorTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard operators: arithmetic, comparison and logic over numbers,
    /// concatenation and comparison over strings.
    pub fn standard() -> Self {
        let mut ops = Self::new();

        ops.add_unary("-", |a: f64| -a);
        ops.add_unary("!", |a: bool| !a);

        ops.add_binary("+", |a: f64, b: f64| a + b);
        ops.add_binary("-", |a: f64, b: f64| a - b);
        ops.add_binary("*", |a: f64, b: f64| a * b);
        ops.add_binary("/", |a: f64, b: f64| a / b);
        ops.add_binary("%", |a: f64, b: f64| a % b);
        ops.add_binary("**", |a: f64, b: f64| a.powf(b));

        ops.add_binary("==", |a: f64, b: f64| a == b);
        ops.add_binary("!=", |a: f64, b: f64| a != b);
        ops.add_binary("<", |a: f64, b: f64| a < b);
        ops.add_binary(">", |a: f64, b: f64| a > b);
        ops.add_binary("<=", |a: f64, b: f64| a <= b);
        ops.add_binary(">=", |a: f64, b: f64| a >= b);

        ops.add_binary("&&", |a: bool, b: bool| a && b);
        ops.add_binary("||", |a: bool, b: bool| a || b);

        ops.add_binary("+", |a: String, b: String| a + &b);
        ops.add_binary("==", |a: String, b: String| a == b);
        ops.add_binary("!=", |a: String, b: String| a != b);
        ops.add_binary("<", |a: String, b: String| a < b);
        ops.add_binary(">", |a: String, b: String| a > b);
        ops.add_binary("<=", |a: String, b: String| a <= b);
        ops.add_binary(">=", |a: String, b: String| a >= b);

        ops
    }

    /// Register a prefix overload; replaces one with the same argument type.
    pub fn add_unary<R: Native, A: Native>(
        &mut self,
        token: &str,
        fun: impl Fn(A) -> R + 'static,
    ) -> &mut Self {
        let entry = self
            .unary
            .entry(token.to_string())
            .or_insert_with(|| Rc::new(UnaryOverloads::new(token)));
        Rc::make_mut(entry).insert(fun);
        self
    }

    /// Register an infix overload; replaces one with the same argument types.
    pub fn add_binary<R: Native, A: Native, B: Native>(
        &mut self,
        token: &str,
        fun: impl Fn(A, B) -> R + 'static,
    ) -> &mut Self {
        let entry = self
            .binary
            .entry(token.to_string())
            .or_insert_with(|| Rc::new(BinaryOverloads::new(token)));
        Rc::make_mut(entry).insert(fun);
        self
    }

    /// Overloads of a prefix operator, for binding to a node.
    pub fn unary(&self, token: &str) -> EvalResult<Rc<UnaryOverloads>> {
        self.unary
            .get(token)
            .cloned()
            .ok_or_else(|| EmplodeError::UnknownOperator {
                token: token.to_string(),
                operands: "one operand".to_string(),
            })
    }

    /// Overloads of an infix operator, for binding to a node.
    pub fn binary(&self, token: &str) -> EvalResult<Rc<BinaryOverloads>> {
        self.binary
            .get(token)
            .cloned()
            .ok_or_else(|| EmplodeError::UnknownOperator {
                token: token.to_string(),
                operands: "two operands".to_string(),
            })
    }

    pub fn has_unary(&self, token: &str) -> bool {
        self.unary.contains_key(token)
    }

    pub fn has_binary(&self, token: &str) -> bool {
        self.binary.contains_key(token)
    }
}
