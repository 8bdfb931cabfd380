use crate::ast::*;

pub fn to_sexp(program: &Program) -> String {
    let mut buf = String::new();
    for stmt in &program.statements {
        sexp_stmt(&mut buf, stmt);
        buf.push('\n');
    }
    buf
}

pub fn to_json(program: &Program) -> String {
    serde_json::to_string_pretty(program).expect("AST should be serializable")
}

fn sexp_stmt(buf: &mut String, stmt: &Stmt) {
    match stmt {
        Stmt::VarDecl(v) => {
            buf.push('(');
            buf.push_str(&v.ty.to_string());
            buf.push(' ');
            buf.push_str(&v.name);
            buf.push(' ');
            sexp_expr(buf, &v.initializer);
            buf.push(')');
        }
        Stmt::Assign(a) => {
            buf.push_str("(= ");
            buf.push_str(&a.name);
            buf.push(' ');
            sexp_expr(buf, &a.value);
            buf.push(')');
        }
        Stmt::Block(b) => {
            buf.push_str("(block");
            for stmt in &b.statements {
                buf.push(' ');
                sexp_stmt(buf, stmt);
            }
            buf.push(')');
        }
        Stmt::If(i) => {
            buf.push_str("(if ");
            sexp_expr(buf, &i.condition);
            buf.push(' ');
            sexp_stmt(buf, &i.then_branch);
            if let Some(ref else_branch) = i.else_branch {
                buf.push(' ');
                sexp_stmt(buf, else_branch);
            }
            buf.push(')');
        }
        Stmt::While(w) => {
            buf.push_str("(while ");
            sexp_expr(buf, &w.condition);
            buf.push(' ');
            sexp_stmt(buf, &w.body);
            buf.push(')');
        }
    }
}

fn sexp_expr(buf: &mut String, expr: &Expr) {
    match expr {
        Expr::Binary(b) => {
            buf.push('(');
            buf.push_str(&b.operator.to_string());
            buf.push(' ');
            sexp_expr(buf, &b.left);
            buf.push(' ');
            sexp_expr(buf, &b.right);
            buf.push(')');
        }
        Expr::Number(n) => buf.push_str(&n.text),
        Expr::String(s) => {
            buf.push('"');
            buf.push_str(&s.value);
            buf.push('"');
        }
        Expr::Bool(b) => buf.push_str(if b.value { "true" } else { "false" }),
        Expr::Identifier(i) => buf.push_str(&i.name),
    }
}
