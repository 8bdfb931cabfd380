pub mod environment;
pub mod value;

use crate::ast::*;
use crate::error::RuntimeError;
use crate::interpreter::environment::Environment;
use crate::interpreter::value::Value;

/// Tree-walking evaluator over a single flat environment. Expects a program
/// that has passed the checker; violations surface as internal errors.
#[derive(Default)]
pub struct Interpreter {
    environment: Environment,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interpret(&mut self, program: &Program) -> Result<(), RuntimeError> {
        for stmt in &program.statements {
            self.execute_stmt(stmt)?;
        }
        tracing::debug!(bindings = self.environment.len(), "evaluation finished");
        Ok(())
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> Result<(), RuntimeError> {
        match stmt {
            Stmt::VarDecl(v) => {
                let value = self.evaluate_expr(&v.initializer)?;
                tracing::trace!(name = %v.name, %value, "define");
                self.environment.define(v.name.clone(), value);
                Ok(())
            }
            Stmt::Assign(a) => {
                let value = self.evaluate_expr(&a.value)?;
                tracing::trace!(name = %a.name, %value, "assign");
                if self.environment.assign(&a.name, value) {
                    Ok(())
                } else {
                    Err(RuntimeError::internal(
                        format!("assignment to variable '{}' with no value", a.name),
                        a.position,
                    ))
                }
            }
            Stmt::Block(b) => b
                .statements
                .iter()
                .try_for_each(|stmt| self.execute_stmt(stmt)),
            Stmt::If(i) => {
                if self.evaluate_condition(&i.condition)? {
                    self.execute_stmt(&i.then_branch)
                } else if let Some(ref else_branch) = i.else_branch {
                    self.execute_stmt(else_branch)
                } else {
                    Ok(())
                }
            }
            Stmt::While(w) => {
                while self.evaluate_condition(&w.condition)? {
                    self.execute_stmt(&w.body)?;
                }
                Ok(())
            }
        }
    }

    fn evaluate_condition(&mut self, condition: &Expr) -> Result<bool, RuntimeError> {
        let value = self.evaluate_expr(condition)?;
        value.is_truthy().ok_or_else(|| {
            RuntimeError::internal(
                format!("condition evaluated to a {}", value.type_name()),
                condition.position(),
            )
        })
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Number(n) => n.text.parse::<i64>().map(Value::Int).map_err(|_| {
                RuntimeError::new(
                    format!("integer literal '{}' is out of range", n.text),
                    n.position,
                )
            }),
            Expr::String(s) => Ok(Value::Str(s.value.clone())),
            Expr::Bool(b) => Ok(Value::from_bool(b.value)),
            Expr::Identifier(i) => self.environment.get(&i.name).cloned().ok_or_else(|| {
                RuntimeError::internal(
                    format!("variable '{}' has no value", i.name),
                    i.position,
                )
            }),
            Expr::Binary(b) => self.evaluate_binary(b),
        }
    }

    fn evaluate_binary(&mut self, b: &BinaryExpr) -> Result<Value, RuntimeError> {
        let left = self.evaluate_expr(&b.left)?;
        let right = self.evaluate_expr(&b.right)?;

        match b.operator {
            BinaryOp::Add => checked_arithmetic(&left, &right, i64::checked_add, b),
            BinaryOp::Subtract => checked_arithmetic(&left, &right, i64::checked_sub, b),
            BinaryOp::Multiply => checked_arithmetic(&left, &right, i64::checked_mul, b),
            BinaryOp::Divide => {
                if right.as_int() == Some(0) {
                    return Err(RuntimeError::new("division by zero", b.right.position()));
                }
                checked_arithmetic(&left, &right, i64::checked_div, b)
            }
            BinaryOp::Less => int_cmp(&left, &right, |a, c| a < c, b),
            BinaryOp::LessEqual => int_cmp(&left, &right, |a, c| a <= c, b),
            BinaryOp::Greater => int_cmp(&left, &right, |a, c| a > c, b),
            BinaryOp::GreaterEqual => int_cmp(&left, &right, |a, c| a >= c, b),
            BinaryOp::Equal => equality(&left, &right, b).map(Value::from_bool),
            BinaryOp::NotEqual => equality(&left, &right, b).map(|eq| Value::from_bool(!eq)),
        }
    }
}

fn int_operands(left: &Value, right: &Value, b: &BinaryExpr) -> Result<(i64, i64), RuntimeError> {
    match (left, right) {
        (Value::Int(a), Value::Int(c)) => Ok((*a, *c)),
        _ => Err(RuntimeError::internal(
            format!(
                "operator '{}' applied to {} and {}",
                b.operator,
                left.type_name(),
                right.type_name()
            ),
            b.position,
        )),
    }
}

fn checked_arithmetic(
    left: &Value,
    right: &Value,
    op: fn(i64, i64) -> Option<i64>,
    b: &BinaryExpr,
) -> Result<Value, RuntimeError> {
    let (a, c) = int_operands(left, right, b)?;
    op(a, c).map(Value::Int).ok_or_else(|| {
        RuntimeError::new(
            format!("integer overflow in '{}'", b.operator),
            b.position,
        )
    })
}

fn int_cmp(
    left: &Value,
    right: &Value,
    op: fn(i64, i64) -> bool,
    b: &BinaryExpr,
) -> Result<Value, RuntimeError> {
    let (a, c) = int_operands(left, right, b)?;
    Ok(Value::from_bool(op(a, c)))
}

fn equality(left: &Value, right: &Value, b: &BinaryExpr) -> Result<bool, RuntimeError> {
    match (left, right) {
        (Value::Int(a), Value::Int(c)) => Ok(a == c),
        (Value::Str(a), Value::Str(c)) => Ok(a == c),
        _ => Err(RuntimeError::internal(
            format!(
                "operator '{}' applied to {} and {}",
                b.operator,
                left.type_name(),
                right.type_name()
            ),
            b.position,
        )),
    }
}
