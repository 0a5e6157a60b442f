//! AST nodes for Emplode.
//!
//! Nodes live in an [`Ast`] arena and are addressed by [`NodeId`]. Every
//! internal node owns an ordered list of children; the parent link is a
//! plain id. Dropping the arena drops every subtree and every literal symbol
//! a leaf owns. Named symbols are only referenced by id and are never
//! released by the tree.

use crate::event::EventSetupFn;
use crate::operators::{BinaryOverloads, OperatorTable, UnaryOverloads};
use crate::scope::SymbolTable;
use emplode_types::{EmplodeError, EvalResult, Symbol, SymbolId, ValueKind};
use std::fmt;
use std::rc::Rc;

/// Index of a node in its [`Ast`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        NodeId(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// The symbol wrapped by a leaf.
#[derive(Debug)]
pub enum LeafSymbol {
    /// A declared entity in the symbol table; never released by the leaf.
    Named(SymbolId),
    /// A literal the leaf took ownership of when it was attached.
    Literal(Symbol),
}

/// What a node does when processed.
pub enum NodeKind {
    Leaf(LeafSymbol),
    /// Statement list evaluated in `scope`.
    Block { scope: SymbolId },
    Unary(Rc<UnaryOverloads>),
    Binary(Rc<BinaryOverloads>),
    /// Children: lvalue, value.
    Assign,
    /// Children: callee, then arguments.
    Call,
    /// Children: action, then arguments.
    Event(EventSetupFn),
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(leaf) => f.debug_tuple("Leaf").field(leaf).finish(),
            Self::Block { scope } => f.debug_struct("Block").field("scope", scope).finish(),
            Self::Unary(ops) => f.debug_tuple("Unary").field(&ops.token()).finish(),
            Self::Binary(ops) => f.debug_tuple("Binary").field(&ops.token()).finish(),
            Self::Assign => write!(f, "Assign"),
            Self::Call => write!(f, "Call"),
            Self::Event(_) => write!(f, "Event"),
        }
    }
}

/// One AST node.
#[derive(Debug)]
pub struct Node {
    /// Operator token or event name; empty for other kinds.
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    pub fn is_internal(&self) -> bool {
        !self.is_leaf()
    }
}

/// Arena of AST nodes.
#[derive(Debug, Default)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn num_children(&self, id: NodeId) -> usize {
        self.node(id).children.len()
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.node(id).children.get(index).copied()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Scope of the nearest enclosing block, this node included.
    pub fn scope_of(&self, id: NodeId) -> Option<SymbolId> {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id);
            if let NodeKind::Block { scope } = node.kind {
                return Some(scope);
            }
            current = node.parent;
        }
        None
    }

    /// The symbol a leaf wraps; `None` for internal nodes.
    pub fn leaf_symbol<'a>(&'a self, id: NodeId, symbols: &'a SymbolTable) -> Option<&'a Symbol> {
        match &self.node(id).kind {
            NodeKind::Leaf(LeafSymbol::Named(sym)) => symbols.get(*sym),
            NodeKind::Leaf(LeafSymbol::Literal(sym)) => Some(sym),
            _ => None,
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Construction
    // ══════════════════════════════════════════════════════════════════════

    fn push(&mut self, name: String, kind: NodeKind, children: Vec<NodeId>) -> NodeId {
        let id = NodeId::new(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        for child in &children {
            self.nodes[child.index()].parent = Some(id);
        }
        self.nodes.push(Node {
            name,
            parent: None,
            children,
            kind,
        });
        id
    }

    /// Leaf referring to a declared symbol.
    pub fn named(&mut self, symbol: SymbolId) -> NodeId {
        self.push(String::new(), NodeKind::Leaf(LeafSymbol::Named(symbol)), Vec::new())
    }

    /// Leaf that takes ownership of a symbol, typically a fresh temporary.
    /// From here on the symbol is no longer temporary: processing the leaf
    /// hands out a borrow, never the symbol itself.
    pub fn literal(&mut self, mut symbol: Symbol) -> NodeId {
        symbol.set_temporary(false);
        self.push(String::new(), NodeKind::Leaf(LeafSymbol::Literal(symbol)), Vec::new())
    }

    /// Block of statements evaluated in `scope`.
    pub fn block(&mut self, scope: SymbolId, statements: Vec<NodeId>) -> NodeId {
        self.push(String::new(), NodeKind::Block { scope }, statements)
    }

    /// Append a child to an internal node.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    /// Prefix operator with an explicit overload set.
    pub fn unary(&mut self, ops: Rc<UnaryOverloads>, operand: NodeId) -> NodeId {
        let name = ops.token().to_string();
        self.push(name, NodeKind::Unary(ops), vec![operand])
    }

    /// Infix operator with an explicit overload set.
    pub fn binary(&mut self, ops: Rc<BinaryOverloads>, lhs: NodeId, rhs: NodeId) -> NodeId {
        let name = ops.token().to_string();
        self.push(name, NodeKind::Binary(ops), vec![lhs, rhs])
    }

    /// Prefix operator looked up by token.
    pub fn unary_op(&mut self, table: &OperatorTable, token: &str, operand: NodeId) -> EvalResult<NodeId> {
        Ok(self.unary(table.unary(token)?, operand))
    }

    /// Infix operator looked up by token.
    pub fn binary_op(
        &mut self,
        table: &OperatorTable,
        token: &str,
        lhs: NodeId,
        rhs: NodeId,
    ) -> EvalResult<NodeId> {
        Ok(self.binary(table.binary(token)?, lhs, rhs))
    }

    pub fn assign(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.push(String::new(), NodeKind::Assign, vec![lhs, rhs])
    }

    pub fn call(&mut self, callee: NodeId, args: Vec<NodeId>) -> NodeId {
        let mut children = Vec::with_capacity(args.len() + 1);
        children.push(callee);
        children.extend(args);
        self.push(String::new(), NodeKind::Call, children)
    }

    /// `@name(args) action`. The action is handed to `setup` unevaluated.
    pub fn event(
        &mut self,
        name: &str,
        action: NodeId,
        args: Vec<NodeId>,
        setup: EventSetupFn,
    ) -> NodeId {
        let mut children = Vec::with_capacity(args.len() + 1);
        children.push(action);
        children.extend(args);
        self.push(name.to_string(), NodeKind::Event(setup), children)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Static queries
    // ══════════════════════════════════════════════════════════════════════

    /// Native kind the node produces, if it can be known without running it.
    pub fn value_kind(&self, id: NodeId, symbols: &SymbolTable) -> Option<ValueKind> {
        let node = self.node(id);
        match &node.kind {
            NodeKind::Leaf(_) => self.leaf_symbol(id, symbols)?.value_kind(),
            NodeKind::Block { .. } | NodeKind::Event(_) => None,
            NodeKind::Unary(ops) => {
                let operand = self.value_kind(*node.children.first()?, symbols);
                ops.result_kind(operand)
            }
            NodeKind::Binary(ops) => {
                let lhs = self.value_kind(*node.children.first()?, symbols);
                let rhs = self.value_kind(*node.children.get(1)?, symbols);
                ops.result_kind(lhs, rhs)
            }
            NodeKind::Assign => self.value_kind(*node.children.first()?, symbols),
            NodeKind::Call => {
                let callee = self.leaf_symbol(*node.children.first()?, symbols)?;
                if callee.has_numeric_return() {
                    Some(ValueKind::Number)
                } else if callee.has_string_return() {
                    Some(ValueKind::String)
                } else {
                    None
                }
            }
        }
    }

    pub fn is_numeric(&self, id: NodeId, symbols: &SymbolTable) -> bool {
        self.value_kind(id, symbols) == Some(ValueKind::Number)
    }

    pub fn is_string(&self, id: NodeId, symbols: &SymbolTable) -> bool {
        self.value_kind(id, symbols) == Some(ValueKind::String)
    }

    /// Whether processing yields a result at all (blocks and events don't).
    pub fn has_value(&self, id: NodeId) -> bool {
        !matches!(self.node(id).kind, NodeKind::Block { .. } | NodeKind::Event(_))
    }

    pub fn has_numeric_return(&self, id: NodeId, symbols: &SymbolTable) -> bool {
        self.returns_symbol(id, symbols)
            .is_some_and(Symbol::has_numeric_return)
    }

    pub fn has_string_return(&self, id: NodeId, symbols: &SymbolTable) -> bool {
        self.returns_symbol(id, symbols)
            .is_some_and(Symbol::has_string_return)
    }

    /// The function symbol behind a leaf or an assignment to one.
    fn returns_symbol<'a>(&'a self, id: NodeId, symbols: &'a SymbolTable) -> Option<&'a Symbol> {
        let node = self.node(id);
        match node.kind {
            NodeKind::Leaf(_) => self.leaf_symbol(id, symbols),
            NodeKind::Assign => self.returns_symbol(*node.children.first()?, symbols),
            _ => None,
        }
    }

    /// Check the child count a node kind requires.
    pub fn check_arity(&self, id: NodeId) -> EvalResult<()> {
        let node = self.node(id);
        let found = node.children.len();
        let (expected, exact) = match node.kind {
            NodeKind::Leaf(_) => (0, true),
            NodeKind::Unary(_) => (1, true),
            NodeKind::Binary(_) | NodeKind::Assign => (2, true),
            NodeKind::Call | NodeKind::Event(_) => (1, false),
            NodeKind::Block { .. } => return Ok(()),
        };
        let ok = if exact { found == expected } else { found >= expected };
        if ok {
            Ok(())
        } else {
            Err(EmplodeError::ArityMismatch {
                name: self.describe(id),
                expected,
                found,
            })
        }
    }

    /// Short label for error messages.
    pub fn describe(&self, id: NodeId) -> String {
        let node = self.node(id);
        match &node.kind {
            NodeKind::Leaf(_) => "leaf".to_string(),
            NodeKind::Block { .. } => "block".to_string(),
            NodeKind::Unary(_) | NodeKind::Binary(_) => format!("operator {}", node.name),
            NodeKind::Assign => "assignment".to_string(),
            NodeKind::Call => "call".to_string(),
            NodeKind::Event(_) => format!("event @{}", node.name),
        }
    }
}
