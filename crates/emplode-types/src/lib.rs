//! Shared types for Emplode.
//!
//! This crate defines the value model, the symbol model (every nameable,
//! typed or callable script entity), and the error types used by the
//! evaluator and by host code that registers symbols.

mod error;
mod symbol;
mod value;

pub use error::{Diagnostic, EmplodeError, ErrorCategory, ErrorCode, EvalResult};
pub use symbol::{
    Function, FunctionBody, HostObject, LinkedFns, LinkedVar, ObjectHandle, ReturnKind,
    ScopeData, Symbol, SymbolId, SymbolKind,
};
pub use value::{format_number, to_literal, Value, ValueKind};
