//! Emplode evaluation engine.
//!
//! A program is an [`Ast`] whose leaves point at symbols in a
//! [`SymbolTable`]. The [`Evaluator`] walks it bottom-up; every node yields
//! either a borrowed persistent symbol or an owned temporary (see
//! [`Processed`]). Event nodes hand their unevaluated action to the host
//! instead of running it. [`Writer`] turns scopes and trees back into source.

pub mod ast;
pub mod event;
pub mod evaluator;
pub mod operators;
pub mod scope;
pub mod write;

pub use ast::{Ast, LeafSymbol, Node, NodeId, NodeKind};
pub use event::{event_setup, EventSetup, EventSetupFn};
pub use evaluator::{Evaluator, Processed, SymbolRef};
pub use operators::{BinaryOverloads, Native, OperatorTable, UnaryOverloads};
pub use scope::{SymbolTable, ROOT_SCOPE};
pub use write::{WriteConfig, Writer};

pub use emplode_types::{
    Diagnostic, EmplodeError, ErrorCategory, ErrorCode, EvalResult, Function, HostObject,
    LinkedFns, LinkedVar, ObjectHandle, ReturnKind, ScopeData, Symbol, SymbolId, SymbolKind,
    Value, ValueKind,
};
