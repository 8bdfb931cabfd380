use crate::ast::*;
use crate::error::{CompileError, ParseErrorKind};
use crate::scanner::token::{Span, Token, TokenKind};

/// Limit on nested statements, parentheses and unary minus combined.
pub const MAX_NESTING: usize = 64;

/// Limit on the depth of a single expression tree, including left-associated
/// operator chains.
pub const MAX_EXPR_DEPTH: usize = 512;

/// Recursive-descent parser with one token of lookahead. Stops at the first
/// malformed construct.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    /// Open statements, parentheses and unary operators.
    nesting: usize,
    /// Tree depth of the expression most recently returned by a level method.
    expr_depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            nesting: 0,
            expr_depth: 0,
        }
    }

    pub fn parse(mut self) -> Result<Program, CompileError> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            statements.push(self.statement()?);
        }
        tracing::debug!(count = statements.len(), "parsed top-level statements");
        Ok(Program { statements })
    }

    fn statement(&mut self) -> Result<Stmt, CompileError> {
        self.enter()?;
        let result = self.statement_inner();
        self.nesting -= 1;
        result
    }

    fn statement_inner(&mut self) -> Result<Stmt, CompileError> {
        let kind = self.peek().kind;
        match kind {
            _ if kind.is_type_keyword() => self.var_declaration(),
            TokenKind::Identifier => self.assignment(),
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::LeftBrace => self.block_statement(),
            _ => {
                let token = self.peek();
                Err(CompileError::parse(
                    ParseErrorKind::UnknownStatement {
                        found: token.describe(),
                    },
                    token.position,
                    token.span,
                ))
            }
        }
    }

    fn var_declaration(&mut self) -> Result<Stmt, CompileError> {
        let start = self.peek().clone();
        self.advance(); // consume the type keyword
        let ty = match start.kind {
            TokenKind::IntType => Type::Int,
            TokenKind::StringType => Type::String,
            TokenKind::BoolType => Type::Bool,
            _ => unreachable!("only called on type keywords"),
        };
        let name = self.expect_identifier("variable name")?;
        self.expect(TokenKind::Equal, "'=' after variable name")?;
        let initializer = self.expression()?;
        self.expect(TokenKind::Semicolon, "';' after variable declaration")?;
        Ok(Stmt::VarDecl(VarDeclStmt {
            ty,
            name,
            initializer,
            span: self.span_from(start.span),
            position: start.position,
        }))
    }

    fn assignment(&mut self) -> Result<Stmt, CompileError> {
        let start = self.peek().clone();
        self.advance(); // consume the target name
        self.expect(TokenKind::Equal, "'=' after assignment target")?;
        let value = self.expression()?;
        self.expect(TokenKind::Semicolon, "';' after assignment")?;
        Ok(Stmt::Assign(AssignStmt {
            name: start.lexeme,
            value,
            span: self.span_from(start.span),
            position: start.position,
        }))
    }

    fn if_statement(&mut self) -> Result<Stmt, CompileError> {
        let start = self.advance().clone(); // consume 'if'
        self.expect(TokenKind::LeftParen, "'(' after 'if'")?;
        let condition = self.expression()?;
        self.expect(TokenKind::RightParen, "')' after if condition")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_token(TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If(IfStmt {
            condition,
            then_branch,
            else_branch,
            span: self.span_from(start.span),
            position: start.position,
        }))
    }

    fn while_statement(&mut self) -> Result<Stmt, CompileError> {
        let start = self.advance().clone(); // consume 'while'
        self.expect(TokenKind::LeftParen, "'(' after 'while'")?;
        let condition = self.expression()?;
        self.expect(TokenKind::RightParen, "')' after while condition")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While(WhileStmt {
            condition,
            body,
            span: self.span_from(start.span),
            position: start.position,
        }))
    }

    fn block_statement(&mut self) -> Result<Stmt, CompileError> {
        let start = self.advance().clone(); // consume '{'
        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.statement()?);
        }
        self.expect(TokenKind::RightBrace, "'}' after block")?;
        Ok(Stmt::Block(BlockStmt {
            statements,
            span: self.span_from(start.span),
            position: start.position,
        }))
    }

    fn expression(&mut self) -> Result<Expr, CompileError> {
        self.equality()
    }

    fn equality(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.comparison()?;
        let mut depth = self.expr_depth;
        while let Some(op) = self.match_binary_op(&[TokenKind::EqualEqual, TokenKind::BangEqual]) {
            let right = self.comparison()?;
            depth = self.fold_depth(depth)?;
            expr = binary(expr, op, right);
        }
        self.expr_depth = depth;
        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.term()?;
        let mut depth = self.expr_depth;
        while let Some(op) = self.match_binary_op(&[
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
        ]) {
            let right = self.term()?;
            depth = self.fold_depth(depth)?;
            expr = binary(expr, op, right);
        }
        self.expr_depth = depth;
        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.factor()?;
        let mut depth = self.expr_depth;
        while let Some(op) = self.match_binary_op(&[TokenKind::Plus, TokenKind::Minus]) {
            let right = self.factor()?;
            depth = self.fold_depth(depth)?;
            expr = binary(expr, op, right);
        }
        self.expr_depth = depth;
        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.unary()?;
        let mut depth = self.expr_depth;
        while let Some(op) = self.match_binary_op(&[TokenKind::Star, TokenKind::Slash]) {
            let right = self.unary()?;
            depth = self.fold_depth(depth)?;
            expr = binary(expr, op, right);
        }
        self.expr_depth = depth;
        Ok(expr)
    }

    /// `-operand` is rewritten to `0 - operand`.
    fn unary(&mut self) -> Result<Expr, CompileError> {
        if self.check(TokenKind::Minus) {
            self.enter()?;
            let minus = self.advance().clone();
            let operand = self.unary();
            self.nesting -= 1;
            let operand = operand?;
            self.expr_depth = self.fold_depth(self.expr_depth)?;
            let zero = Expr::Number(NumberExpr {
                text: "0".to_string(),
                span: minus.span,
                position: minus.position,
            });
            return Ok(binary(zero, BinaryOp::Subtract, operand));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, CompileError> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number => {
                self.advance();
                self.expr_depth = 1;
                Ok(Expr::Number(NumberExpr {
                    text: token.lexeme,
                    span: token.span,
                    position: token.position,
                }))
            }
            TokenKind::String => {
                self.advance();
                self.expr_depth = 1;
                Ok(Expr::String(StringExpr {
                    value: token.lexeme,
                    span: token.span,
                    position: token.position,
                }))
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                self.expr_depth = 1;
                Ok(Expr::Bool(BoolExpr {
                    value: token.kind == TokenKind::True,
                    span: token.span,
                    position: token.position,
                }))
            }
            TokenKind::Identifier => {
                self.advance();
                self.expr_depth = 1;
                Ok(Expr::Identifier(IdentifierExpr {
                    name: token.lexeme,
                    span: token.span,
                    position: token.position,
                }))
            }
            TokenKind::LeftParen => {
                self.enter()?;
                self.advance();
                let expr = self.expression();
                self.nesting -= 1;
                let expr = expr?;
                self.expect(TokenKind::RightParen, "')' after expression")?;
                Ok(expr)
            }
            _ => Err(self.error_at_current("expression")),
        }
    }

    // --- Helper methods ---

    /// Open one nesting level; the caller closes it with `self.nesting -= 1`.
    fn enter(&mut self) -> Result<(), CompileError> {
        if self.nesting >= MAX_NESTING {
            return Err(self.too_deep(MAX_NESTING));
        }
        self.nesting += 1;
        Ok(())
    }

    /// Depth of a node built over operands of at most `depth`, bounded by
    /// `MAX_EXPR_DEPTH`.
    fn fold_depth(&self, depth: usize) -> Result<usize, CompileError> {
        let depth = depth.max(self.expr_depth) + 1;
        if depth > MAX_EXPR_DEPTH {
            return Err(self.too_deep(MAX_EXPR_DEPTH));
        }
        Ok(depth)
    }

    fn too_deep(&self, limit: usize) -> CompileError {
        let token = self.previous();
        tracing::debug!(limit, position = %token.position, "nesting limit reached");
        CompileError::parse(
            ParseErrorKind::NestingTooDeep { limit },
            token.position,
            token.span,
        )
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
            &self.tokens[self.current - 1]
        } else {
            &self.tokens[self.current]
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_binary_op(&mut self, kinds: &[TokenKind]) -> Option<BinaryOp> {
        for &kind in kinds {
            if self.check(kind) {
                self.advance();
                return Some(token_to_binary_op(kind));
            }
        }
        None
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<&Token, CompileError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_at_current(message))
        }
    }

    fn expect_identifier(&mut self, context: &str) -> Result<String, CompileError> {
        if self.check(TokenKind::Identifier) {
            Ok(self.advance().lexeme.clone())
        } else {
            Err(self.error_at_current(context))
        }
    }

    fn error_at_current(&self, expected: &str) -> CompileError {
        let token = self.peek();
        CompileError::parse(
            ParseErrorKind::Expected {
                expected: expected.to_string(),
                found: token.describe(),
            },
            token.position,
            Span::new(token.span.offset, token.span.len.max(1)),
        )
    }

    fn previous_span(&self) -> Span {
        self.previous().span
    }

    fn span_from(&self, start: Span) -> Span {
        start.to(self.previous_span())
    }
}

fn binary(left: Expr, operator: BinaryOp, right: Expr) -> Expr {
    let span = left.span().to(right.span());
    let position = left.position();
    Expr::Binary(BinaryExpr {
        left: Box::new(left),
        operator,
        right: Box::new(right),
        span,
        position,
    })
}

fn token_to_binary_op(kind: TokenKind) -> BinaryOp {
    match kind {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Subtract,
        TokenKind::Star => BinaryOp::Multiply,
        TokenKind::Slash => BinaryOp::Divide,
        TokenKind::EqualEqual => BinaryOp::Equal,
        TokenKind::BangEqual => BinaryOp::NotEqual,
        TokenKind::Less => BinaryOp::Less,
        TokenKind::LessEqual => BinaryOp::LessEqual,
        TokenKind::Greater => BinaryOp::Greater,
        TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
        _ => unreachable!("only called with matched operator tokens"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner;
    use crate::scanner::token::Position;
    use rstest::rstest;

    fn parse_ok(source: &str) -> Program {
        let tokens = scanner::scan(source).expect("scan should succeed");
        Parser::new(tokens).parse().expect("parse should succeed")
    }

    fn parse_err(source: &str) -> CompileError {
        let tokens = scanner::scan(source).expect("scan should succeed");
        Parser::new(tokens)
            .parse()
            .expect_err("parse should fail")
    }

    fn parse_sexp(source: &str) -> String {
        let program = parse_ok(source);
        crate::ast::printer::to_sexp(&program).trim().to_string()
    }

    #[test]
    fn empty_program() {
        assert!(parse_ok("").statements.is_empty());
        assert!(parse_ok("// only a comment").statements.is_empty());
    }

    #[rstest]
    #[case("int x = 1 + 2 * 3;", "(int x (+ 1 (* 2 3)))")]
    #[case("int x = (1 + 2) * 3;", "(int x (* (+ 1 2) 3))")]
    #[case("int x = 1 - 2 - 3;", "(int x (- (- 1 2) 3))")]
    #[case("int x = 8 / 4 / 2;", "(int x (/ (/ 8 4) 2))")]
    #[case("bool b = 1 + 1 < 3;", "(bool b (< (+ 1 1) 3))")]
    #[case("bool b = 1 < 2 == 3 > 4;", "(bool b (== (< 1 2) (> 3 4)))")]
    #[case("bool b = 1 == 1 != false;", "(bool b (!= (== 1 1) false))")]
    #[case("int x = -y * 2;", "(int x (* (- 0 y) 2))")]
    #[case("int x = --5;", "(int x (- 0 (- 0 5)))")]
    #[case("int x = 2 - -1;", "(int x (- 2 (- 0 1)))")]
    fn expression_precedence(#[case] source: &str, #[case] expected: &str) {
        assert_eq!(parse_sexp(source), expected);
    }

    #[test]
    fn var_declarations_of_each_type() {
        assert_eq!(
            parse_sexp("int a = 1; string s = \"hi\"; bool b = true;"),
            "(int a 1)\n(string s \"hi\")\n(bool b true)"
        );
    }

    #[test]
    fn assignment() {
        assert_eq!(parse_sexp("x = x + 1;"), "(= x (+ x 1))");
    }

    #[test]
    fn if_else() {
        assert_eq!(
            parse_sexp("if (x == 1) y = 1; else y = 2;"),
            "(if (== x 1) (= y 1) (= y 2))"
        );
    }

    #[test]
    fn dangling_else_binds_to_nearest_if() {
        assert_eq!(
            parse_sexp("if (a) if (b) x = 1; else x = 2;"),
            "(if a (if b (= x 1) (= x 2)))"
        );
    }

    #[test]
    fn while_loop_with_block() {
        assert_eq!(
            parse_sexp("while (x != 0) { x = x - 1; }"),
            "(while (!= x 0) (block (= x (- x 1))))"
        );
    }

    #[test]
    fn nested_blocks() {
        assert_eq!(
            parse_sexp("{ int x = 1; { int x = 2; } }"),
            "(block (int x 1) (block (int x 2)))"
        );
    }

    #[test]
    fn binary_position_is_leftmost_token() {
        let program = parse_ok("int x =\n  a + b;");
        let Stmt::VarDecl(decl) = &program.statements[0] else {
            panic!("expected var declaration");
        };
        assert_eq!(decl.position, Position::new(1, 1));
        assert_eq!(decl.initializer.position(), Position::new(2, 3));
        assert_eq!(decl.initializer.span(), Span::new(10, 5));
    }

    #[test]
    fn statement_positions() {
        let program = parse_ok("int x = 1;\n  while (x < 3) x = x + 1;");
        assert_eq!(program.statements[0].position(), Position::new(1, 1));
        assert_eq!(program.statements[1].position(), Position::new(2, 3));
    }

    #[rstest]
    #[case("int x = 1", "';' after variable declaration", Position::new(1, 10))]
    #[case("int = 1;", "variable name", Position::new(1, 5))]
    #[case("int x 1;", "'=' after variable name", Position::new(1, 7))]
    #[case("x 1;", "'=' after assignment target", Position::new(1, 3))]
    #[case("int x = ;", "expression", Position::new(1, 9))]
    #[case("int x = (1 + 2;", "')' after expression", Position::new(1, 15))]
    #[case("if x == 1) x = 2;", "'(' after 'if'", Position::new(1, 4))]
    #[case("while (true x = 1;", "')' after while condition", Position::new(1, 13))]
    #[case("{ int x = 1;", "'}' after block", Position::new(1, 13))]
    fn syntax_errors(
        #[case] source: &str,
        #[case] expected: &str,
        #[case] position: Position,
    ) {
        let err = parse_err(source);
        match err.parse_kind() {
            Some(ParseErrorKind::Expected { expected: e, .. }) => assert_eq!(e, expected),
            other => panic!("unexpected error kind: {other:?}"),
        }
        assert_eq!(err.position(), position);
    }

    #[rstest]
    #[case("; int x = 1;", "';'")]
    #[case("else x = 1;", "'else'")]
    #[case("42;", "'42'")]
    #[case("int x = 1; }", "'}'")]
    fn unknown_statements(#[case] source: &str, #[case] found: &str) {
        let err = parse_err(source);
        assert_eq!(
            err.parse_kind(),
            Some(&ParseErrorKind::UnknownStatement {
                found: found.to_string()
            })
        );
    }

    #[test]
    fn error_message_mentions_found_token() {
        let err = parse_err("int x = 1\nint y = 2;");
        assert_eq!(
            err.to_string(),
            "2:1 -> parse error: expected ';' after variable declaration, found 'int'"
        );
    }

    #[test]
    fn brackets_are_not_expressions() {
        let err = parse_err("int x = [1];");
        assert!(matches!(
            err.parse_kind(),
            Some(ParseErrorKind::Expected { .. })
        ));
    }

    fn nesting_error(source: &str) -> ParseErrorKind {
        parse_err(source)
            .parse_kind()
            .cloned()
            .expect("parse error")
    }

    #[rstest]
    #[case("int x = ".to_string() + &"(".repeat(10_000) + "1" + &")".repeat(10_000) + ";")]
    #[case("int x = ".to_string() + &"-".repeat(10_000) + "1;")]
    #[case("{".repeat(10_000) + &"}".repeat(10_000))]
    #[case("if (true) ".repeat(10_000) + "x = 1;")]
    fn deep_nesting_is_a_parse_error(#[case] source: String) {
        assert_eq!(
            nesting_error(&source),
            ParseErrorKind::NestingTooDeep { limit: MAX_NESTING }
        );
    }

    #[test]
    fn long_operator_chain_is_a_parse_error() {
        let source = "int x = 1".to_string() + &" + 1".repeat(MAX_EXPR_DEPTH + 1) + ";";
        assert_eq!(
            nesting_error(&source),
            ParseErrorKind::NestingTooDeep {
                limit: MAX_EXPR_DEPTH
            }
        );
    }

    #[test]
    fn chain_depth_carries_through_parentheses() {
        // the group and the chain after it each stay under the limit
        let chain = " + 1".repeat(MAX_EXPR_DEPTH / 2 + 1);
        let source = format!("int x = (1{chain}){chain};");
        assert_eq!(
            nesting_error(&source),
            ParseErrorKind::NestingTooDeep {
                limit: MAX_EXPR_DEPTH
            }
        );
    }

    #[test]
    fn nesting_below_limits_parses() {
        let depth = MAX_NESTING - 2;
        let source = format!(
            "int x = {}1{}; int y = 1{};",
            "(".repeat(depth),
            ")".repeat(depth),
            " + 1".repeat(MAX_EXPR_DEPTH - 1)
        );
        assert_eq!(parse_ok(&source).statements.len(), 2);
        let nested = "{ ".repeat(depth) + &"}".repeat(depth);
        assert_eq!(parse_ok(&nested).statements.len(), 1);
    }
}
