pub mod printer;

use serde::Serialize;

use crate::scanner::token::{Position, Span};

/// Top-level program: the ordered statements of one source file.
#[derive(Debug, Clone, Serialize)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

/// Declared type of a variable, and the static type of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Type {
    Int,
    String,
    Bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Stmt {
    VarDecl(VarDeclStmt),
    Assign(AssignStmt),
    If(IfStmt),
    While(WhileStmt),
    Block(BlockStmt),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Self::VarDecl(s) => s.span,
            Self::Assign(s) => s.span,
            Self::If(s) => s.span,
            Self::While(s) => s.span,
            Self::Block(s) => s.span,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Self::VarDecl(s) => s.position,
            Self::Assign(s) => s.position,
            Self::If(s) => s.position,
            Self::While(s) => s.position,
            Self::Block(s) => s.position,
        }
    }
}

/// `type name = initializer ;`
#[derive(Debug, Clone, Serialize)]
pub struct VarDeclStmt {
    pub ty: Type,
    pub name: String,
    pub initializer: Expr,
    pub span: Span,
    pub position: Position,
}

/// `name = value ;`
#[derive(Debug, Clone, Serialize)]
pub struct AssignStmt {
    pub name: String,
    pub value: Expr,
    pub span: Span,
    pub position: Position,
}

#[derive(Debug, Clone, Serialize)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: Box<Stmt>,
    pub else_branch: Option<Box<Stmt>>,
    pub span: Span,
    pub position: Position,
}

#[derive(Debug, Clone, Serialize)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Box<Stmt>,
    pub span: Span,
    pub position: Position,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockStmt {
    pub statements: Vec<Stmt>,
    pub span: Span,
    pub position: Position,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Expr {
    Number(NumberExpr),
    String(StringExpr),
    Bool(BoolExpr),
    Identifier(IdentifierExpr),
    Binary(BinaryExpr),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Self::Number(e) => e.span,
            Self::String(e) => e.span,
            Self::Bool(e) => e.span,
            Self::Identifier(e) => e.span,
            Self::Binary(e) => e.span,
        }
    }

    /// Position of the leftmost token of the expression.
    pub fn position(&self) -> Position {
        match self {
            Self::Number(e) => e.position,
            Self::String(e) => e.position,
            Self::Bool(e) => e.position,
            Self::Identifier(e) => e.position,
            Self::Binary(e) => e.position,
        }
    }
}

/// Integer literal, kept as source text until evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct NumberExpr {
    pub text: String,
    pub span: Span,
    pub position: Position,
}

#[derive(Debug, Clone, Serialize)]
pub struct StringExpr {
    pub value: String,
    pub span: Span,
    pub position: Position,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoolExpr {
    pub value: bool,
    pub span: Span,
    pub position: Position,
}

#[derive(Debug, Clone, Serialize)]
pub struct IdentifierExpr {
    pub name: String,
    pub span: Span,
    pub position: Position,
}

#[derive(Debug, Clone, Serialize)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub operator: BinaryOp,
    pub right: Box<Expr>,
    pub span: Span,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum BinaryOp {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessEqual,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = ">=")]
    GreaterEqual,
}

impl BinaryOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide
        )
    }

    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            Self::Less | Self::LessEqual | Self::Greater | Self::GreaterEqual
        )
    }

    pub fn is_equality(self) -> bool {
        matches!(self, Self::Equal | Self::NotEqual)
    }
}
