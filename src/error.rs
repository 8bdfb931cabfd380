use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::ast::{BinaryOp, Type};
use crate::scanner::token::{Position, Span};

// ============= Compile-time errors (with miette diagnostics) =============

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanErrorKind {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated block comment")]
    UnterminatedComment,
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("expected {expected}, found {found}")]
    Expected { expected: String, found: String },
    #[error("unknown statement starting with {found}")]
    UnknownStatement { found: String },
    #[error("nesting exceeds the limit of {limit} levels")]
    NestingTooDeep { limit: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemanticErrorKind {
    #[error("use of undeclared variable '{0}'")]
    UndeclaredVariable(String),
    #[error("variable '{0}' already declared in this scope")]
    DuplicateDeclaration(String),
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: Type, found: Type },
    #[error("condition must be of type bool, found {0}")]
    ConditionNotBoolean(Type),
    #[error("operator '{operator}' cannot be applied to operands of type {operand}")]
    InvalidOperator { operator: BinaryOp, operand: Type },
}

#[derive(Error, Debug, Diagnostic)]
pub enum CompileError {
    #[error("{position} -> scan error: {kind}")]
    #[diagnostic(code(carp::scan))]
    Scan {
        kind: ScanErrorKind,
        position: Position,
        #[label("here")]
        span: SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("{position} -> parse error: {kind}")]
    #[diagnostic(code(carp::parse))]
    Parse {
        kind: ParseErrorKind,
        position: Position,
        #[label("here")]
        span: SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("{position} -> semantic error: {kind}")]
    #[diagnostic(code(carp::semantic))]
    Semantic {
        kind: SemanticErrorKind,
        position: Position,
        #[label("here")]
        span: SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },
}

impl CompileError {
    pub fn scan(kind: ScanErrorKind, position: Position, span: Span) -> Self {
        Self::Scan {
            kind,
            position,
            span: span.into(),
            src: miette::NamedSource::new("input", String::new()),
        }
    }

    pub fn parse(kind: ParseErrorKind, position: Position, span: Span) -> Self {
        Self::Parse {
            kind,
            position,
            span: span.into(),
            src: miette::NamedSource::new("input", String::new()),
        }
    }

    pub fn semantic(kind: SemanticErrorKind, position: Position, span: Span) -> Self {
        Self::Semantic {
            kind,
            position,
            span: span.into(),
            src: miette::NamedSource::new("input", String::new()),
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Self::Scan { position, .. }
            | Self::Parse { position, .. }
            | Self::Semantic { position, .. } => *position,
        }
    }

    pub fn scan_kind(&self) -> Option<&ScanErrorKind> {
        match self {
            Self::Scan { kind, .. } => Some(kind),
            _ => None,
        }
    }

    pub fn parse_kind(&self) -> Option<&ParseErrorKind> {
        match self {
            Self::Parse { kind, .. } => Some(kind),
            _ => None,
        }
    }

    pub fn semantic_kind(&self) -> Option<&SemanticErrorKind> {
        match self {
            Self::Semantic { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// Attach source code for fancy miette diagnostics
    pub fn with_source_code(self, name: impl Into<String>, source: impl Into<String>) -> Self {
        let src = miette::NamedSource::new(name.into(), source.into());
        match self {
            Self::Scan {
                kind,
                position,
                span,
                ..
            } => Self::Scan {
                kind,
                position,
                span,
                src,
            },
            Self::Parse {
                kind,
                position,
                span,
                ..
            } => Self::Parse {
                kind,
                position,
                span,
                src,
            },
            Self::Semantic {
                kind,
                position,
                span,
                ..
            } => Self::Semantic {
                kind,
                position,
                span,
                src,
            },
        }
    }
}

// ============= Runtime errors (simple, no miette) =============

#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A fault the type system cannot rule out, such as division by zero.
    #[error("{position} -> runtime error: {message}")]
    Error { message: String, position: Position },

    /// The evaluator met a tree the checker should have rejected.
    #[error("{position} -> internal error: {message}")]
    Internal { message: String, position: Position },
}

impl RuntimeError {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        Self::Error {
            message: message.into(),
            position,
        }
    }

    pub fn internal(message: impl Into<String>, position: Position) -> Self {
        Self::Internal {
            message: message.into(),
            position,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    pub fn position(&self) -> Position {
        match self {
            Self::Error { position, .. } | Self::Internal { position, .. } => *position,
        }
    }
}

// ============= Tests =============

#[cfg(test)]
mod tests {
    use super::*;

    fn at(line: usize, column: usize) -> Position {
        Position::new(line, column)
    }

    #[test]
    fn compile_error_implements_diagnostic() {
        let err = CompileError::scan(ScanErrorKind::UnterminatedString, at(1, 1), Span::new(0, 1));
        let diag: &dyn Diagnostic = &err;
        assert_eq!(
            diag.code().map(|c| c.to_string()),
            Some("carp::scan".to_string())
        );
    }

    #[test]
    fn compile_error_with_source() {
        let kind = ParseErrorKind::Expected {
            expected: "';'".to_string(),
            found: "end of input".to_string(),
        };
        let err = CompileError::parse(kind, at(1, 10), Span::new(9, 0))
            .with_source_code("test.carp", "int x = 1");
        assert!(matches!(err, CompileError::Parse { .. }));
        assert_eq!(err.position(), at(1, 10));
    }

    #[test]
    fn display_is_line_column_arrow_message() {
        let err = CompileError::semantic(
            SemanticErrorKind::UndeclaredVariable("y".to_string()),
            at(3, 7),
            Span::new(20, 1),
        );
        assert_eq!(
            err.to_string(),
            "3:7 -> semantic error: use of undeclared variable 'y'"
        );
    }

    #[test]
    fn type_mismatch_message_names_both_types() {
        let kind = SemanticErrorKind::TypeMismatch {
            expected: Type::Int,
            found: Type::String,
        };
        assert_eq!(
            kind.to_string(),
            "type mismatch: expected int, found string"
        );
    }

    #[test]
    fn kind_accessors_match_variant() {
        let err = CompileError::scan(
            ScanErrorKind::UnexpectedCharacter('@'),
            at(1, 9),
            Span::new(8, 1),
        );
        assert_eq!(
            err.scan_kind(),
            Some(&ScanErrorKind::UnexpectedCharacter('@'))
        );
        assert!(err.parse_kind().is_none());
        assert!(err.semantic_kind().is_none());
    }

    #[test]
    fn runtime_error_kinds() {
        let err = RuntimeError::new("division by zero", at(2, 5));
        assert!(!err.is_internal());
        assert_eq!(err.to_string(), "2:5 -> runtime error: division by zero");

        let err = RuntimeError::internal("unbound variable 'x'", at(1, 1));
        assert!(err.is_internal());
        assert_eq!(err.position(), at(1, 1));
    }
}
