//! Source output: scopes as declarations, ASTs as statements.
//!
//! Output is meant to be read back by the front end. Builtin entries and
//! host functions are never written; nested operator expressions are
//! parenthesised so the text re-parses with the same evaluation order.

use crate::ast::{Ast, LeafSymbol, NodeId, NodeKind};
use crate::scope::SymbolTable;
use emplode_types::{SymbolId, SymbolKind};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

/// Layout of written source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteConfig {
    /// Column at which `// description` comments start.
    pub comment_offset: usize,
    /// One level of indentation.
    pub indent: String,
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self {
            comment_offset: 32,
            indent: "  ".to_string(),
        }
    }
}

/// Writes symbols and AST nodes as source text.
pub struct Writer<'a> {
    symbols: &'a SymbolTable,
    config: &'a WriteConfig,
}

impl<'a> Writer<'a> {
    pub fn new(symbols: &'a SymbolTable, config: &'a WriteConfig) -> Self {
        Self { symbols, config }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Symbols
    // ══════════════════════════════════════════════════════════════════════

    /// Declaration text for one symbol.
    pub fn write_symbol(&self, out: &mut impl Write, id: SymbolId, prefix: &str) -> fmt::Result {
        let sym = &self.symbols[id];
        if sym.is_builtin() {
            return Ok(());
        }

        let mut line = prefix.to_string();
        if sym.is_local() {
            line.push_str(&sym.type_name());
            line.push(' ');
        }
        line.push_str(sym.name());

        match sym.kind() {
            SymbolKind::Function(_) => Ok(()),
            SymbolKind::Scope(_) => {
                let has_body = self.symbols.has_body(id);
                line.push_str(if has_body { " { " } else { ";" });
                out.write_str(&line)?;
                self.write_desc(out, sym.desc(), line.len())?;
                if has_body {
                    self.write_contents(out, id, &format!("{prefix}{}", self.config.indent))?;
                    writeln!(out, "{prefix}}}")?;
                }
                Ok(())
            }
            _ => {
                let value = sym.to_value().map_err(|_| fmt::Error)?;
                line.push_str(" = ");
                line.push_str(&value.to_literal());
                line.push(';');
                out.write_str(&line)?;
                self.write_desc(out, sym.desc(), line.len())
            }
        }
    }

    /// Every non-builtin entry of a scope, in name order.
    pub fn write_contents(&self, out: &mut impl Write, scope: SymbolId, prefix: &str) -> fmt::Result {
        for (_, id) in self.symbols.entries(scope) {
            self.write_symbol(out, id, prefix)?;
        }
        Ok(())
    }

    /// Pad to the comment column and finish the line.
    fn write_desc(&self, out: &mut impl Write, desc: &str, line_len: usize) -> fmt::Result {
        if !desc.is_empty() {
            let pad = self.config.comment_offset.saturating_sub(line_len).max(1);
            write!(out, "{:pad$}// {desc}", "")?;
        }
        out.write_char('\n')
    }

    /// A scope's contents as a string.
    pub fn scope_source(&self, scope: SymbolId) -> String {
        let mut out = String::new();
        // Writing to a String only fails if a value cannot be formatted.
        if self.write_contents(&mut out, scope, "").is_err() {
            tracing::warn!(scope = self.symbols[scope].name(), "scope output truncated");
        }
        out
    }

    // ══════════════════════════════════════════════════════════════════════
    // AST
    // ══════════════════════════════════════════════════════════════════════

    /// Source text of one node. Blocks are written with braces, statements
    /// one per line and indented one level past `offset`.
    pub fn write_node(
        &self,
        out: &mut impl Write,
        ast: &Ast,
        id: NodeId,
        offset: &str,
    ) -> fmt::Result {
        let node = ast.node(id);
        let children = node.children();
        match node.kind() {
            NodeKind::Leaf(LeafSymbol::Named(sym)) => {
                out.write_str(&self.qualified_name(ast, id, *sym))
            }
            NodeKind::Leaf(LeafSymbol::Literal(sym)) => {
                if sym.name().is_empty() {
                    let value = sym.to_value().map_err(|_| fmt::Error)?;
                    out.write_str(&value.to_literal())
                } else {
                    out.write_str(sym.name())
                }
            }
            NodeKind::Block { .. } => {
                out.write_str("{\n")?;
                self.write_statements(out, ast, id, &format!("{offset}{}", self.config.indent))?;
                write!(out, "{offset}}}")
            }
            NodeKind::Unary(_) => {
                out.write_str(node.name())?;
                self.write_operand(out, ast, children[0], offset)
            }
            NodeKind::Binary(_) => {
                self.write_operand(out, ast, children[0], offset)?;
                write!(out, " {} ", node.name())?;
                self.write_operand(out, ast, children[1], offset)
            }
            NodeKind::Assign => {
                self.write_node(out, ast, children[0], offset)?;
                out.write_str(" = ")?;
                self.write_node(out, ast, children[1], offset)
            }
            NodeKind::Call => {
                self.write_node(out, ast, children[0], offset)?;
                self.write_args(out, ast, &children[1..], offset)
            }
            NodeKind::Event(_) => {
                write!(out, "@{}", node.name())?;
                self.write_args(out, ast, &children[1..], offset)?;
                out.write_char(' ')?;
                self.write_node(out, ast, children[0], offset)
            }
        }
    }

    /// The statements of a block, each on its own line at `offset`.
    pub fn write_statements(
        &self,
        out: &mut impl Write,
        ast: &Ast,
        block: NodeId,
        offset: &str,
    ) -> fmt::Result {
        for &child in ast.node(block).children() {
            out.write_str(offset)?;
            self.write_node(out, ast, child, offset)?;
            if matches!(ast.node(child).kind(), NodeKind::Block { .. }) {
                out.write_char('\n')?;
            } else {
                out.write_str(";\n")?;
            }
        }
        Ok(())
    }

    /// A declared symbol's name as seen from the block around `leaf`: the
    /// shortest dotted path whose first segment scope-scanning resolves to
    /// the same entry.
    fn qualified_name(&self, ast: &Ast, leaf: NodeId, target: SymbolId) -> String {
        let mut path = vec![self.symbols[target].name()];
        if let Some(from) = ast.scope_of(leaf) {
            let mut head = target;
            while self.symbols.lookup(from, self.symbols[head].name(), true) != Some(head) {
                match self.symbols[head].scope() {
                    Some(owner) if owner != self.symbols.root() => {
                        head = owner;
                        path.push(self.symbols[owner].name());
                    }
                    _ => break,
                }
            }
        }
        path.reverse();
        path.join(".")
    }

    fn write_operand(&self, out: &mut impl Write, ast: &Ast, id: NodeId, offset: &str) -> fmt::Result {
        if matches!(ast.node(id).kind(), NodeKind::Binary(_) | NodeKind::Assign) {
            out.write_char('(')?;
            self.write_node(out, ast, id, offset)?;
            out.write_char(')')
        } else {
            self.write_node(out, ast, id, offset)
        }
    }

    fn write_args(&self, out: &mut impl Write, ast: &Ast, args: &[NodeId], offset: &str) -> fmt::Result {
        out.write_char('(')?;
        for (i, &arg) in args.iter().enumerate() {
            if i > 0 {
                out.write_str(", ")?;
            }
            self.write_node(out, ast, arg, offset)?;
        }
        out.write_char(')')
    }

    /// A whole program: the root block's statements without braces.
    pub fn program_source(&self, ast: &Ast, root: NodeId) -> String {
        let mut out = String::new();
        let written = if matches!(ast.node(root).kind(), NodeKind::Block { .. }) {
            self.write_statements(&mut out, ast, root, "")
        } else {
            self.write_node(&mut out, ast, root, "")
        };
        if written.is_err() {
            tracing::warn!(?root, "program output truncated");
        }
        out
    }
}
