pub mod scope;

use crate::ast::*;
use crate::error::{CompileError, SemanticErrorKind};
use scope::ScopeStack;

/// Single-pass scope and type checker. Fails on the first violation.
pub struct Checker {
    scopes: ScopeStack,
}

impl Default for Checker {
    fn default() -> Self {
        Self::new()
    }
}

impl Checker {
    pub fn new() -> Self {
        Self {
            scopes: ScopeStack::new(),
        }
    }

    pub fn check(&mut self, program: &Program) -> Result<(), CompileError> {
        self.scoped(|checker| {
            program
                .statements
                .iter()
                .try_for_each(|stmt| checker.check_stmt(stmt))
        })?;
        tracing::debug!(statements = program.statements.len(), "semantic check passed");
        Ok(())
    }

    /// Number of scopes currently open. Zero outside of `check`.
    pub fn scope_depth(&self) -> usize {
        self.scopes.depth()
    }

    /// Run `f` inside a fresh scope, popping it whether or not `f` fails.
    fn scoped<F>(&mut self, f: F) -> Result<(), CompileError>
    where
        F: FnOnce(&mut Self) -> Result<(), CompileError>,
    {
        self.scopes.push();
        let result = f(self);
        self.scopes.pop();
        result
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::VarDecl(v) => {
                let found = self.check_expr(&v.initializer)?;
                if found != v.ty {
                    return Err(CompileError::semantic(
                        SemanticErrorKind::TypeMismatch {
                            expected: v.ty,
                            found,
                        },
                        v.initializer.position(),
                        v.initializer.span(),
                    ));
                }
                if !self.scopes.declare(&v.name, v.ty) {
                    return Err(CompileError::semantic(
                        SemanticErrorKind::DuplicateDeclaration(v.name.clone()),
                        v.position,
                        v.span,
                    ));
                }
                Ok(())
            }
            Stmt::Assign(a) => {
                let Some(expected) = self.scopes.lookup(&a.name) else {
                    return Err(CompileError::semantic(
                        SemanticErrorKind::UndeclaredVariable(a.name.clone()),
                        a.position,
                        a.span,
                    ));
                };
                let found = self.check_expr(&a.value)?;
                if found != expected {
                    return Err(CompileError::semantic(
                        SemanticErrorKind::TypeMismatch { expected, found },
                        a.value.position(),
                        a.value.span(),
                    ));
                }
                Ok(())
            }
            Stmt::Block(b) => self.scoped(|checker| {
                b.statements
                    .iter()
                    .try_for_each(|stmt| checker.check_stmt(stmt))
            }),
            Stmt::If(i) => {
                self.check_condition(&i.condition)?;
                self.check_stmt(&i.then_branch)?;
                if let Some(ref else_branch) = i.else_branch {
                    self.check_stmt(else_branch)?;
                }
                Ok(())
            }
            Stmt::While(w) => {
                self.check_condition(&w.condition)?;
                self.check_stmt(&w.body)
            }
        }
    }

    fn check_condition(&mut self, condition: &Expr) -> Result<(), CompileError> {
        match self.check_expr(condition)? {
            Type::Bool => Ok(()),
            other => Err(CompileError::semantic(
                SemanticErrorKind::ConditionNotBoolean(other),
                condition.position(),
                condition.span(),
            )),
        }
    }

    fn check_expr(&mut self, expr: &Expr) -> Result<Type, CompileError> {
        match expr {
            Expr::Number(_) => Ok(Type::Int),
            Expr::String(_) => Ok(Type::String),
            Expr::Bool(_) => Ok(Type::Bool),
            Expr::Identifier(i) => self.scopes.lookup(&i.name).ok_or_else(|| {
                CompileError::semantic(
                    SemanticErrorKind::UndeclaredVariable(i.name.clone()),
                    i.position,
                    i.span,
                )
            }),
            Expr::Binary(b) => self.check_binary(b),
        }
    }

    fn check_binary(&mut self, b: &BinaryExpr) -> Result<Type, CompileError> {
        let left = self.check_expr(&b.left)?;
        let right = self.check_expr(&b.right)?;

        if left != right {
            return Err(CompileError::semantic(
                SemanticErrorKind::TypeMismatch {
                    expected: left,
                    found: right,
                },
                b.right.position(),
                b.right.span(),
            ));
        }

        if b.operator.is_equality() {
            return Ok(Type::Bool);
        }
        if left != Type::Int {
            return Err(CompileError::semantic(
                SemanticErrorKind::InvalidOperator {
                    operator: b.operator,
                    operand: left,
                },
                b.position,
                b.span,
            ));
        }
        if b.operator.is_ordering() {
            Ok(Type::Bool)
        } else {
            Ok(Type::Int)
        }
    }
}
