//! Tree-walking evaluation.
//!
//! [`Evaluator::process`] walks a node bottom-up and returns a
//! [`Processed`] result. A result either borrows a persistent symbol (a
//! declared entity or a leaf's literal) or owns a fresh temporary. Owned
//! temporaries are released by dropping them, so a consumer that is done
//! with an input simply lets it go out of scope; forwarding a result moves
//! it on.

use crate::ast::{Ast, LeafSymbol, NodeId, NodeKind};
use crate::event::EventSetup;
use crate::scope::SymbolTable;
use emplode_types::{EmplodeError, EvalResult, Symbol, SymbolId, Value};
use std::rc::Rc;

/// Where a borrowed result lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolRef {
    /// A declared symbol in the symbol table.
    Table(SymbolId),
    /// The literal owned by a leaf node.
    Leaf(NodeId),
}

/// Result of processing a node.
#[derive(Debug)]
pub enum Processed {
    /// Persistent; the holder must not release it.
    Borrowed(SymbolRef),
    /// A temporary the holder owns.
    Owned(Symbol),
}

impl Processed {
    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Owned(_))
    }

    /// The declared symbol this result refers to, if any.
    pub fn symbol_id(&self) -> Option<SymbolId> {
        match self {
            Self::Borrowed(SymbolRef::Table(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn resolve<'a>(&'a self, ast: &'a Ast, symbols: &'a SymbolTable) -> EvalResult<&'a Symbol> {
        match self {
            Self::Owned(sym) => Ok(sym),
            Self::Borrowed(SymbolRef::Table(id)) => symbols
                .get(*id)
                .ok_or_else(|| EmplodeError::MalformedNode(format!("stale symbol {id:?}"))),
            Self::Borrowed(SymbolRef::Leaf(node)) => ast
                .leaf_symbol(*node, symbols)
                .ok_or_else(|| EmplodeError::MalformedNode(format!("{node:?} is not a leaf"))),
        }
    }

    /// Current value, in the symbol's own native kind.
    pub fn value(&self, ast: &Ast, symbols: &SymbolTable) -> EvalResult<Value> {
        self.resolve(ast, symbols)?.to_value()
    }
}

/// Walks ASTs against a symbol table.
pub struct Evaluator<'s> {
    symbols: &'s mut SymbolTable,
}

impl<'s> Evaluator<'s> {
    pub fn new(symbols: &'s mut SymbolTable) -> Self {
        Self { symbols }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &*self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut *self.symbols
    }

    /// Run a whole program from its root. Any result is discarded.
    pub fn run(&mut self, ast: &Ast, root: NodeId) -> EvalResult<()> {
        self.process(ast, root)?;
        Ok(())
    }

    /// Resolve a result to its symbol.
    pub fn resolve<'a>(&'a self, ast: &'a Ast, result: &'a Processed) -> EvalResult<&'a Symbol> {
        result.resolve(ast, &*self.symbols)
    }

    /// Process one node. Blocks and events yield `None`; so does a call to a
    /// function without a return value.
    #[tracing::instrument(level = "trace", skip(self, ast), fields(kind = ?ast.node(id).kind()))]
    pub fn process(&mut self, ast: &Ast, id: NodeId) -> EvalResult<Option<Processed>> {
        ast.check_arity(id)?;
        let node = ast.node(id);
        let children = node.children();
        match node.kind() {
            NodeKind::Leaf(LeafSymbol::Named(sym)) => {
                Ok(Some(Processed::Borrowed(SymbolRef::Table(*sym))))
            }
            NodeKind::Leaf(LeafSymbol::Literal(_)) => {
                Ok(Some(Processed::Borrowed(SymbolRef::Leaf(id))))
            }
            NodeKind::Block { .. } => {
                for &child in children {
                    // A statement's value is dropped here; only its effects matter.
                    self.process(ast, child)?;
                }
                Ok(None)
            }
            NodeKind::Unary(ops) => {
                let input = self.process_value(ast, children[0])?;
                let output = ops.apply(self.resolve(ast, &input)?)?;
                Ok(Some(Processed::Owned(output)))
            }
            NodeKind::Binary(ops) => {
                let lhs = self.process_value(ast, children[0])?;
                let rhs = self.process_value(ast, children[1])?;
                let output = ops.apply(self.resolve(ast, &lhs)?, self.resolve(ast, &rhs)?)?;
                Ok(Some(Processed::Owned(output)))
            }
            NodeKind::Assign => self.process_assign(ast, children[0], children[1]).map(Some),
            NodeKind::Call => self.process_call(ast, children[0], &children[1..]),
            NodeKind::Event(setup) => {
                let setup = Rc::clone(setup);
                let args = self.process_args(ast, &children[1..])?;
                tracing::debug!(event = node.name(), args = args.len(), "setting up event");
                setup(EventSetup {
                    name: node.name(),
                    action: children[0],
                    args,
                    ast,
                    symbols: &*self.symbols,
                })?;
                Ok(None)
            }
        }
    }

    /// Process a node that must produce a result.
    fn process_value(&mut self, ast: &Ast, id: NodeId) -> EvalResult<Processed> {
        self.process(ast, id)?.ok_or_else(|| {
            EmplodeError::MalformedNode(format!("{} used as a value", ast.describe(id)))
        })
    }

    fn process_args(&mut self, ast: &Ast, args: &[NodeId]) -> EvalResult<Vec<Processed>> {
        args.iter().map(|&arg| self.process_value(ast, arg)).collect()
    }

    fn process_assign(&mut self, ast: &Ast, lhs: NodeId, rhs: NodeId) -> EvalResult<Processed> {
        let target = self.process_value(ast, lhs)?;
        let Some(target_id) = target.symbol_id() else {
            let name = self
                .resolve(ast, &target)
                .map(|sym| sym.name().to_string())
                .unwrap_or_default();
            return Err(EmplodeError::NotAssignable(name));
        };
        let source = self.process_value(ast, rhs)?;
        let value = source.value(ast, &*self.symbols)?;
        drop(source);
        self.symbols
            .get_mut(target_id)
            .ok_or_else(|| EmplodeError::MalformedNode(format!("stale symbol {target_id:?}")))?
            .set_value(value)?;
        Ok(target)
    }

    fn process_call(
        &mut self,
        ast: &Ast,
        callee: NodeId,
        args: &[NodeId],
    ) -> EvalResult<Option<Processed>> {
        let function = self.process_value(ast, callee)?;
        let args = self.process_args(ast, args)?;
        let arg_symbols = args
            .iter()
            .map(|arg| self.resolve(ast, arg))
            .collect::<EvalResult<Vec<_>>>()?;
        let result = self.resolve(ast, &function)?.call(&arg_symbols)?;
        Ok(result.map(Processed::Owned))
    }
}
