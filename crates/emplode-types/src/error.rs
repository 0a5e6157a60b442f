use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Type,
    Scope,
    Structure,
    Host,
}

/// Numeric error code (E200–E799).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Type errors (E200–E299) ──
    pub const TYPE_MISMATCH: Self = Self(201);
    pub const NOT_CALLABLE: Self = Self(202);
    pub const ARITY_MISMATCH: Self = Self(203);
    pub const UNKNOWN_OPERATOR: Self = Self(204);

    // ── Scope errors (E500–E599) ──
    pub const DUPLICATE_SYMBOL: Self = Self(500);
    pub const UNKNOWN_SYMBOL: Self = Self(501);
    pub const NOT_ASSIGNABLE: Self = Self(502);

    // ── Structure errors (E600–E699) ──
    pub const MALFORMED_NODE: Self = Self(600);

    // ── Host errors (E700–E799) ──
    pub const HOST_FAILURE: Self = Self(700);

    /// Get the category for this error code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            200..=299 => ErrorCategory::Type,
            500..=599 => ErrorCategory::Scope,
            600..=699 => ErrorCategory::Structure,
            _ => ErrorCategory::Host,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type => write!(f, "type"),
            Self::Scope => write!(f, "scope"),
            Self::Structure => write!(f, "structure"),
            Self::Host => write!(f, "host"),
        }
    }
}

/// Errors raised while declaring symbols or processing an AST.
///
/// Everything except [`EmplodeError::UnknownSymbol`] is a structural defect
/// in the tree or in host registration: it aborts the current evaluation and
/// has no partial-result path.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmplodeError {
    /// A name was declared twice in the same scope.
    #[error("'{name}' is already declared in scope '{scope}'")]
    DuplicateSymbol { scope: String, name: String },

    /// A name could not be resolved from the given scope.
    #[error("unknown identifier '{0}'")]
    UnknownSymbol(String),

    /// A symbol's storage cannot represent the requested native type.
    #[error("type mismatch: cannot use {found} '{name}' as {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// `Call` on something that is not a function.
    #[error("'{0}' is not a function")]
    NotCallable(String),

    /// Wrong number of arguments or children.
    #[error("'{name}' expects {expected} argument(s), got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    /// The left side of an assignment is not persistent storage.
    #[error("cannot assign to '{0}'")]
    NotAssignable(String),

    /// No overload of an operator matches the operand kinds.
    #[error("operator '{token}' is not defined for {operands}")]
    UnknownOperator { token: String, operands: String },

    /// The node does not have the shape its kind requires.
    #[error("malformed node: {0}")]
    MalformedNode(String),

    /// A host closure (function body, setter, event setup) failed.
    #[error("host error: {0}")]
    Host(String),
}

impl EmplodeError {
    pub fn type_mismatch(name: &str, expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch {
            name: name.to_string(),
            expected,
            found,
        }
    }

    /// Error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::DuplicateSymbol { .. } => ErrorCode::DUPLICATE_SYMBOL,
            Self::UnknownSymbol(_) => ErrorCode::UNKNOWN_SYMBOL,
            Self::TypeMismatch { .. } => ErrorCode::TYPE_MISMATCH,
            Self::NotCallable(_) => ErrorCode::NOT_CALLABLE,
            Self::ArityMismatch { .. } => ErrorCode::ARITY_MISMATCH,
            Self::NotAssignable(_) => ErrorCode::NOT_ASSIGNABLE,
            Self::UnknownOperator { .. } => ErrorCode::UNKNOWN_OPERATOR,
            Self::MalformedNode(_) => ErrorCode::MALFORMED_NODE,
            Self::Host(_) => ErrorCode::HOST_FAILURE,
        }
    }

    /// Only unknown identifiers are user-correctable; everything else is a
    /// defect in the tree or in host registration.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::UnknownSymbol(_))
    }

    /// Structured form for host tooling.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let code = self.code();
        Diagnostic {
            code,
            category: code.category(),
            message: self.to_string(),
        }
    }
}

/// A structured, serializable error report.
///
/// Hosts render these; they must not parse the free-form message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub category: ErrorCategory,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.code, self.category, self.message)
    }
}

/// Result alias for declaration and evaluation operations.
pub type EvalResult<T> = std::result::Result<T, EmplodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::TYPE_MISMATCH.category(), ErrorCategory::Type);
        assert_eq!(ErrorCode::UNKNOWN_OPERATOR.category(), ErrorCategory::Type);
        assert_eq!(ErrorCode::DUPLICATE_SYMBOL.category(), ErrorCategory::Scope);
        assert_eq!(ErrorCode::MALFORMED_NODE.category(), ErrorCategory::Structure);
        assert_eq!(ErrorCode::HOST_FAILURE.category(), ErrorCategory::Host);
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(format!("{}", ErrorCode::TYPE_MISMATCH), "E201");
        assert_eq!(format!("{}", ErrorCode::DUPLICATE_SYMBOL), "E500");
    }

    #[test]
    fn test_only_unknown_symbol_is_recoverable() {
        assert!(EmplodeError::UnknownSymbol("x".into()).is_recoverable());
        assert!(!EmplodeError::NotCallable("x".into()).is_recoverable());
        assert!(!EmplodeError::DuplicateSymbol {
            scope: "root".into(),
            name: "x".into()
        }
        .is_recoverable());
    }

    #[test]
    fn test_error_messages() {
        let err = EmplodeError::type_mismatch("greeting", "number", "string");
        assert_eq!(
            err.to_string(),
            "type mismatch: cannot use string 'greeting' as number"
        );
        let err = EmplodeError::ArityMismatch {
            name: "max".into(),
            expected: 2,
            found: 3,
        };
        assert_eq!(err.to_string(), "'max' expects 2 argument(s), got 3");
    }

    #[test]
    fn test_diagnostic_json_serialization() {
        let diag = EmplodeError::DuplicateSymbol {
            scope: "main".into(),
            name: "rate".into(),
        }
        .to_diagnostic();
        assert_eq!(diag.code, ErrorCode::DUPLICATE_SYMBOL);
        assert_eq!(diag.category, ErrorCategory::Scope);

        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("\"code\":500"));
        assert!(json.contains("\"category\":\"scope\""));
        assert!(json.contains("already declared"));

        let back: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(back, diag);
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = EmplodeError::NotCallable("rate".into()).to_diagnostic();
        assert_eq!(diag.to_string(), "E202 [type] 'rate' is not a function");
    }
}
