use carp::CompileError;
use carp::checker::Checker;
use carp::error::{ParseErrorKind, ScanErrorKind, SemanticErrorKind};
use carp::parser::Parser;
use carp::scanner;

/// Run the front end and return the first error of whichever stage fails.
fn compile_error(source: &str) -> CompileError {
    let result = scanner::scan(source)
        .and_then(|tokens| Parser::new(tokens).parse())
        .and_then(|program| Checker::new().check(&program));
    result.expect_err("compilation should fail")
}

#[test]
fn missing_semicolon_reports_single_error_at_closing_brace() {
    let err = compile_error(include_str!("../fixtures/error_missing_semicolon.carp"));
    assert!(matches!(
        err.parse_kind(),
        Some(ParseErrorKind::Expected { .. })
    ));
    assert_eq!(
        err.to_string(),
        "4:1 -> parse error: expected ';' after assignment, found '}'"
    );
}

#[test]
fn unterminated_string_stops_scanning() {
    let err = compile_error(include_str!("../fixtures/error_unterminated_string.carp"));
    assert_eq!(err.scan_kind(), Some(&ScanErrorKind::UnterminatedString));
    assert_eq!(
        err.to_string(),
        "1:12 -> scan error: unterminated string literal"
    );
}

#[test]
fn redeclaration_in_block_reported_at_second_declaration() {
    let err = compile_error(include_str!("../fixtures/error_redeclared.carp"));
    assert_eq!(
        err.semantic_kind(),
        Some(&SemanticErrorKind::DuplicateDeclaration("count".to_string()))
    );
    assert_eq!(
        err.to_string(),
        "4:5 -> semantic error: variable 'count' already declared in this scope"
    );
}

#[test]
fn unterminated_block_comment() {
    let err = compile_error("int x = 1;\n/* trailing\n");
    assert_eq!(err.scan_kind(), Some(&ScanErrorKind::UnterminatedComment));
    assert_eq!(err.position().line, 2);
}

#[test]
fn scan_error_precedes_later_syntax_errors() {
    // the scanner fails before the parser ever sees the bad statement
    let err = compile_error("int = ; x = !y;");
    assert_eq!(err.scan_kind(), Some(&ScanErrorKind::UnexpectedCharacter('!')));
}

#[test]
fn tokens_still_available_when_parse_fails() {
    let tokens = scanner::scan("int x = ;").expect("scan should succeed");
    assert_eq!(tokens.len(), 5);
    let err = Parser::new(tokens.clone())
        .parse()
        .expect_err("parse should fail");
    assert_eq!(err.position(), tokens[3].position);
}

#[test]
fn diagnostic_renders_with_source() {
    let source = "int x = \"a\";";
    let err = compile_error(source).with_source_code("demo.carp", source);
    let rendered = format!("{:?}", miette::Report::new(err));
    assert!(rendered.contains("type mismatch"), "{rendered}");
}

#[test]
fn deeply_nested_parentheses_are_rejected() {
    let depth = 10_000;
    let source = format!("int x = {}1{};", "(".repeat(depth), ")".repeat(depth));
    let err = compile_error(&source);
    assert!(matches!(
        err.parse_kind(),
        Some(ParseErrorKind::NestingTooDeep { .. })
    ));
    assert!(err.to_string().contains("nesting exceeds the limit"));
}
