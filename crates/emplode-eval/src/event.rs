//! Deferred actions.
//!
//! An `@Name(args) action` node does not run its action. Processing it
//! evaluates the arguments and hands them, with the still-unevaluated action
//! node, to a host-supplied setup closure. The host keeps what it needs and
//! fires the action later with [`crate::Evaluator::process`].

use crate::ast::{Ast, NodeId};
use crate::evaluator::Processed;
use crate::scope::SymbolTable;
use emplode_types::{EmplodeError, EvalResult, Symbol};
use std::rc::Rc;

/// Host callback run once each time an event node is processed.
pub type EventSetupFn = Rc<dyn Fn(EventSetup<'_>) -> EvalResult<()>>;

/// Everything an event node hands to its host.
pub struct EventSetup<'a> {
    /// Event name, without the `@`.
    pub name: &'a str,
    /// Root of the action subtree; not evaluated yet.
    pub action: NodeId,
    /// Evaluated arguments, in order. Temporaries now belong to the host.
    pub args: Vec<Processed>,
    pub ast: &'a Ast,
    pub symbols: &'a SymbolTable,
}

impl EventSetup<'_> {
    pub fn num_args(&self) -> usize {
        self.args.len()
    }

    /// Resolve argument `index` to its symbol.
    pub fn arg(&self, index: usize) -> EvalResult<&Symbol> {
        let arg = self.args.get(index).ok_or_else(|| EmplodeError::ArityMismatch {
            name: format!("@{}", self.name),
            expected: index + 1,
            found: self.args.len(),
        })?;
        arg.resolve(self.ast, self.symbols)
    }

    /// Argument `index` coerced to a number.
    pub fn arg_as_double(&self, index: usize) -> EvalResult<f64> {
        self.arg(index)?.as_double()
    }

    /// Argument `index` coerced to a string.
    pub fn arg_as_string(&self, index: usize) -> EvalResult<String> {
        self.arg(index)?.as_string()
    }
}

/// Setup closure from any host function.
pub fn event_setup(fun: impl Fn(EventSetup<'_>) -> EvalResult<()> + 'static) -> EventSetupFn {
    Rc::new(fun)
}
