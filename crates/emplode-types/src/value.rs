//! Native values carried by Emplode symbols.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The native representation a value is stored in or coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Number,
    String,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::String => "string",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A plain script value: the payload of a temporary, a literal, or the
/// current contents of a variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    String(String),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Number(_) => ValueKind::Number,
            Self::String(_) => ValueKind::String,
        }
    }

    /// Numeric view. Strings convert only if their whole text parses.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(s) => s.trim().parse().ok(),
        }
    }

    /// String view. Numbers always convert.
    pub fn to_text(&self) -> String {
        match self {
            Self::Number(n) => format_number(*n),
            Self::String(s) => s.clone(),
        }
    }

    /// Source-level literal: numbers as written, strings quoted and escaped.
    /// Infinities and NaN have no literal form and are written as the
    /// division that produces them.
    pub fn to_literal(&self) -> String {
        match self {
            Self::Number(n) if n.is_nan() => "(0 / 0)".to_string(),
            Self::Number(n) if n.is_infinite() => {
                if n.is_sign_positive() { "(1 / 0)" } else { "(-1 / 0)" }.to_string()
            }
            Self::Number(n) => format_number(*n),
            Self::String(s) => to_literal(s),
        }
    }

    /// Boolean view for host flags. Text must read as `true`, `false` or a
    /// number; any non-zero number is `true`.
    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Self::Number(n) => Some(*n != 0.0),
            Self::String(s) => match s.trim() {
                "true" => Some(true),
                "false" => Some(false),
                _ => self.to_number().map(|n| n != 0.0),
            },
        }
    }

    /// Script truthiness: non-zero numbers and non-empty strings.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Number(n) => *n != 0.0,
            Self::String(s) => !s.is_empty(),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Number(if b { 1.0 } else { 0.0 })
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// Format a number the way scripts print it: integral values without a
/// trailing `.0`.
pub fn format_number(n: f64) -> String {
    format!("{n}")
}

/// Quote and escape a string so the front end reads back the same text.
pub fn to_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}
