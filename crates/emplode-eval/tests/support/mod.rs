//! Minimal Emplode front end for integration tests.
//!
//! Just enough of the language to drive the evaluator from source text:
//! `Value`/`String`/`Struct` declarations (with trailing `// description`
//! comments), expression statements, calls, dotted names, nested blocks and
//! `@Event(args) action` statements.

#![allow(dead_code)]

use emplode_eval::{
    Ast, EmplodeError, EventSetupFn, Evaluator, NodeId, OperatorTable, Symbol, SymbolId,
    SymbolTable,
};
use std::collections::HashMap;

pub type Events = HashMap<String, EventSetupFn>;

// ══════════════════════════════════════════════════════════════════════════════
// Lexer
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Number(f64),
    Text(String),
    Punct(&'static str),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    line: usize,
}

const PUNCTS: &[&str] = &[
    "==", "!=", "<=", ">=", "&&", "||", "**", "+", "-", "*", "/", "%", "<", ">", "!", "=", "(",
    ")", "{", "}", ";", ",", ".", "@",
];

fn lex(source: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            line += 1;
            i += 1;
        } else if c.is_whitespace() {
            i += 1;
        } else if c == '/' && chars.get(i + 1) == Some(&'/') {
            let start = i + 2;
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            tokens.push(Token {
                tok: Tok::Comment(text.trim().to_string()),
                line,
            });
        } else if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                i += 1;
                if i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
                    i += 1;
                }
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            let text: String = chars[start..i].iter().collect();
            let value = text
                .parse::<f64>()
                .map_err(|_| format!("line {line}: bad number '{text}'"))?;
            tokens.push(Token {
                tok: Tok::Number(value),
                line,
            });
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token {
                tok: Tok::Ident(chars[start..i].iter().collect()),
                line,
            });
        } else if c == '"' {
            i += 1;
            let mut text = String::new();
            loop {
                match chars.get(i) {
                    None => return Err(format!("line {line}: unterminated string")),
                    Some('"') => break,
                    Some('\\') => {
                        let escaped = match chars.get(i + 1) {
                            Some('n') => '\n',
                            Some('t') => '\t',
                            Some('r') => '\r',
                            Some('0') => '\0',
                            Some(&other) => other,
                            None => return Err(format!("line {line}: unterminated string")),
                        };
                        text.push(escaped);
                        i += 2;
                    }
                    Some(&other) => {
                        text.push(other);
                        i += 1;
                    }
                }
            }
            i += 1;
            tokens.push(Token {
                tok: Tok::Text(text),
                line,
            });
        } else {
            let rest: String = chars[i..chars.len().min(i + 2)].iter().collect();
            let punct = PUNCTS
                .iter()
                .find(|p| rest.starts_with(**p))
                .ok_or_else(|| format!("line {line}: unexpected character '{c}'"))?;
            i += punct.chars().count();
            tokens.push(Token {
                tok: Tok::Punct(*punct),
                line,
            });
        }
    }
    Ok(tokens)
}

// ══════════════════════════════════════════════════════════════════════════════
// Parser
// ══════════════════════════════════════════════════════════════════════════════

const BINARY_LEVELS: &[&[&str]] = &[
    &["||"],
    &["&&"],
    &["==", "!="],
    &["<", ">", "<=", ">="],
    &["+", "-"],
    &["*", "/", "%"],
];

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    last_line: usize,
    symbols: &'a mut SymbolTable,
    ops: &'a OperatorTable,
    events: &'a Events,
    ast: Ast,
}

fn host_error(err: EmplodeError) -> String {
    err.to_diagnostic().to_string()
}

impl<'a> Parser<'a> {
    fn skip_comments(&mut self) {
        while matches!(self.tokens.get(self.pos), Some(Token { tok: Tok::Comment(_), .. })) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<&Tok> {
        self.skip_comments();
        self.tokens.get(self.pos).map(|t| &t.tok)
    }

    fn advance(&mut self) -> Option<Tok> {
        self.skip_comments();
        let token = self.tokens.get(self.pos)?.clone();
        self.pos += 1;
        self.last_line = token.line;
        Some(token.tok)
    }

    fn is_punct(&mut self, punct: &str) -> bool {
        matches!(self.peek(), Some(Tok::Punct(p)) if *p == punct)
    }

    fn eat(&mut self, punct: &str) -> bool {
        let found = self.is_punct(punct);
        if found {
            self.last_line = self.tokens[self.pos].line;
            self.pos += 1;
        }
        found
    }

    fn expect(&mut self, punct: &str) -> Result<(), String> {
        if self.eat(punct) {
            return Ok(());
        }
        let found = self.peek().cloned();
        Err(format!("line {}: expected '{punct}', found {found:?}", self.last_line))
    }

    fn ident(&mut self) -> Result<String, String> {
        match self.advance() {
            Some(Tok::Ident(name)) => Ok(name),
            other => Err(format!("line {}: expected a name, found {other:?}", self.last_line)),
        }
    }

    /// A `// comment` on the line just consumed, if there is one.
    fn trailing_comment(&mut self) -> String {
        match self.tokens.get(self.pos) {
            Some(Token {
                tok: Tok::Comment(text),
                line,
            }) if *line == self.last_line => {
                let text = text.clone();
                self.pos += 1;
                text
            }
            _ => String::new(),
        }
    }

    fn statements(&mut self, scope: SymbolId, braced: bool) -> Result<Vec<NodeId>, String> {
        let mut statements = Vec::new();
        loop {
            if braced && self.eat("}") {
                return Ok(statements);
            }
            if self.peek().is_none() {
                return if braced {
                    Err("missing '}'".to_string())
                } else {
                    Ok(statements)
                };
            }
            if let Some(statement) = self.statement(scope)? {
                statements.push(statement);
            }
        }
    }

    fn statement(&mut self, scope: SymbolId) -> Result<Option<NodeId>, String> {
        if self.eat(";") {
            return Ok(None);
        }
        if self.eat("{") {
            let body = self.statements(scope, true)?;
            return Ok(Some(self.ast.block(scope, body)));
        }
        if self.eat("@") {
            return self.event(scope).map(Some);
        }
        if let Some(Tok::Ident(word)) = self.peek() {
            match word.as_str() {
                "Value" | "String" => {
                    let ty = word.clone();
                    self.advance();
                    return self.variable(scope, &ty);
                }
                "Struct" => {
                    self.advance();
                    return self.structure(scope);
                }
                _ => {}
            }
        }
        let expr = self.expression(scope)?;
        self.expect(";")?;
        Ok(Some(expr))
    }

    fn variable(&mut self, scope: SymbolId, ty: &str) -> Result<Option<NodeId>, String> {
        let name = self.ident()?;
        let init = if self.eat("=") {
            Some(self.expression(scope)?)
        } else {
            None
        };
        self.expect(";")?;
        let desc = self.trailing_comment();
        let var = if ty == "Value" {
            self.symbols.add_value_var(scope, &name, &desc)
        } else {
            self.symbols.add_string_var(scope, &name, &desc)
        }
        .map_err(host_error)?;

        Ok(init.map(|value| {
            let target = self.ast.named(var);
            self.ast.assign(target, value)
        }))
    }

    fn structure(&mut self, scope: SymbolId) -> Result<Option<NodeId>, String> {
        let name = self.ident()?;
        if self.eat(";") {
            let desc = self.trailing_comment();
            self.symbols
                .add_scope(scope, &name, &desc)
                .map_err(host_error)?;
            return Ok(None);
        }
        self.expect("{")?;
        let desc = self.trailing_comment();
        let inner = self
            .symbols
            .add_scope(scope, &name, &desc)
            .map_err(host_error)?;
        let body = self.statements(inner, true)?;
        Ok(Some(self.ast.block(inner, body)))
    }

    fn event(&mut self, scope: SymbolId) -> Result<NodeId, String> {
        let name = self.ident()?;
        let setup = self
            .events
            .get(&name)
            .cloned()
            .ok_or_else(|| format!("unknown event '@{name}'"))?;
        self.expect("(")?;
        let args = self.arguments(scope)?;
        let action = self
            .statement(scope)?
            .ok_or_else(|| format!("event '@{name}' has no action"))?;
        Ok(self.ast.event(&name, action, args, setup))
    }

    /// Comma-separated expressions up to the closing `)`.
    fn arguments(&mut self, scope: SymbolId) -> Result<Vec<NodeId>, String> {
        let mut args = Vec::new();
        if self.eat(")") {
            return Ok(args);
        }
        loop {
            args.push(self.expression(scope)?);
            if self.eat(")") {
                return Ok(args);
            }
            self.expect(",")?;
        }
    }

    fn expression(&mut self, scope: SymbolId) -> Result<NodeId, String> {
        let lhs = self.binary(scope, 0)?;
        if self.eat("=") {
            let rhs = self.expression(scope)?;
            return Ok(self.ast.assign(lhs, rhs));
        }
        Ok(lhs)
    }

    fn binary(&mut self, scope: SymbolId, level: usize) -> Result<NodeId, String> {
        let Some(tokens) = BINARY_LEVELS.get(level) else {
            return self.power(scope);
        };
        let mut lhs = self.binary(scope, level + 1)?;
        loop {
            let token = match self.peek() {
                Some(Tok::Punct(p)) if tokens.contains(p) => *p,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.binary(scope, level + 1)?;
            lhs = self
                .ast
                .binary_op(self.ops, token, lhs, rhs)
                .map_err(host_error)?;
        }
    }

    fn power(&mut self, scope: SymbolId) -> Result<NodeId, String> {
        let base = self.unary(scope)?;
        if self.eat("**") {
            let exponent = self.power(scope)?;
            return self
                .ast
                .binary_op(self.ops, "**", base, exponent)
                .map_err(host_error);
        }
        Ok(base)
    }

    fn unary(&mut self, scope: SymbolId) -> Result<NodeId, String> {
        for token in ["-", "!"] {
            if self.eat(token) {
                let operand = self.unary(scope)?;
                return self
                    .ast
                    .unary_op(self.ops, token, operand)
                    .map_err(host_error);
            }
        }
        let mut node = self.primary(scope)?;
        while self.eat("(") {
            let args = self.arguments(scope)?;
            node = self.ast.call(node, args);
        }
        Ok(node)
    }

    fn primary(&mut self, scope: SymbolId) -> Result<NodeId, String> {
        match self.advance() {
            Some(Tok::Number(value)) => Ok(self.ast.literal(Symbol::temporary(value))),
            Some(Tok::Text(text)) => Ok(self.ast.literal(Symbol::temporary(text))),
            Some(Tok::Punct("(")) => {
                let inner = self.expression(scope)?;
                self.expect(")")?;
                Ok(inner)
            }
            Some(Tok::Ident(name)) => {
                let mut id = self
                    .symbols
                    .lookup(scope, &name, true)
                    .ok_or_else(|| host_error(EmplodeError::UnknownSymbol(name.clone())))?;
                while self.eat(".") {
                    let member = self.ident()?;
                    id = self
                        .symbols
                        .lookup(id, &member, false)
                        .ok_or_else(|| host_error(EmplodeError::UnknownSymbol(member.clone())))?;
                }
                Ok(self.ast.named(id))
            }
            other => Err(format!(
                "line {}: expected an expression, found {other:?}",
                self.last_line
            )),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Entry points
// ══════════════════════════════════════════════════════════════════════════════

/// Parse a program into the root scope of `symbols`. Declarations are made
/// as they are read; initialisers become assignment statements.
pub fn parse(
    source: &str,
    symbols: &mut SymbolTable,
    ops: &OperatorTable,
    events: &Events,
) -> Result<(Ast, NodeId), String> {
    let root_scope = symbols.root();
    let mut parser = Parser {
        tokens: lex(source)?,
        pos: 0,
        last_line: 1,
        symbols,
        ops,
        events,
        ast: Ast::new(),
    };
    let statements = parser.statements(root_scope, false)?;
    let root = parser.ast.block(root_scope, statements);
    Ok((parser.ast, root))
}

/// Parse with the standard operators and no events, then run.
pub fn load(source: &str, symbols: &mut SymbolTable) -> (Ast, NodeId) {
    let ops = OperatorTable::standard();
    let (ast, root) = parse(source, symbols, &ops, &Events::new())
        .unwrap_or_else(|err| panic!("parse failed: {err}"));
    Evaluator::new(symbols)
        .run(&ast, root)
        .unwrap_or_else(|err| panic!("run failed: {err}"));
    (ast, root)
}
