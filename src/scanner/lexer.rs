use winnow::combinator::alt;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::stream::{LocatingSlice, Location};
use winnow::token::{any, take_till, take_until, take_while};

use crate::error::{CompileError, ScanErrorKind};
use crate::scanner::token::{LineIndex, Span, Token, TokenKind, keyword_kind};

type Input<'a> = LocatingSlice<&'a str>;

/// Kind and stored text of one lexeme, before its position is attached.
type Lexeme = (TokenKind, String);

fn cut() -> ErrMode<ContextError> {
    ErrMode::Cut(ContextError::new())
}

/// Skip whitespace and comments. On an unterminated block comment, returns the
/// offset of its opening `/*`.
fn whitespace_and_comments(input: &mut Input<'_>) -> Result<(), usize> {
    loop {
        let before = input.current_token_start();
        let _ = take_while::<_, _, ContextError>(0.., |c: char| {
            c == ' ' || c == '\t' || c == '\r' || c == '\n'
        })
        .void()
        .parse_next(input);

        if input.starts_with("//") {
            let _ = take_till::<_, _, ContextError>(0.., '\n')
                .void()
                .parse_next(input);
        } else if input.starts_with("/*") {
            let start = input.current_token_start();
            let closed: Result<(), ContextError> =
                ("/*", take_until(0.., "*/"), "*/").void().parse_next(input);
            if closed.is_err() {
                return Err(start);
            }
        } else if input.current_token_start() == before {
            break;
        }
    }
    Ok(())
}

fn string_literal(input: &mut Input<'_>) -> ModalResult<Lexeme> {
    '"'.parse_next(input)?;
    let mut s = String::new();
    loop {
        let c = any
            .parse_next(input)
            .map_err(|_: ErrMode<ContextError>| cut())?;
        match c {
            '"' => break,
            '\n' => return Err(cut()),
            '\\' => {
                let esc = any
                    .parse_next(input)
                    .map_err(|_: ErrMode<ContextError>| cut())?;
                match esc {
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    '\\' => s.push('\\'),
                    '"' => s.push('"'),
                    '\n' => return Err(cut()),
                    other => {
                        s.push('\\');
                        s.push(other);
                    }
                }
            }
            other => s.push(other),
        }
    }
    Ok((TokenKind::String, s))
}

fn number_literal(input: &mut Input<'_>) -> ModalResult<Lexeme> {
    let digits: &str = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    Ok((TokenKind::Number, digits.to_string()))
}

fn identifier_or_keyword(input: &mut Input<'_>) -> ModalResult<Lexeme> {
    let first: char = any
        .verify(|c: &char| c.is_ascii_alphabetic() || *c == '_')
        .parse_next(input)?;
    let rest: &str =
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_').parse_next(input)?;
    let mut lexeme = String::with_capacity(1 + rest.len());
    lexeme.push(first);
    lexeme.push_str(rest);
    let kind = keyword_kind(&lexeme).unwrap_or(TokenKind::Identifier);
    Ok((kind, lexeme))
}

fn two_char_token(input: &mut Input<'_>) -> ModalResult<Lexeme> {
    let (kind, lexeme) = alt((
        "!=".value((TokenKind::BangEqual, "!=")),
        "==".value((TokenKind::EqualEqual, "==")),
        ">=".value((TokenKind::GreaterEqual, ">=")),
        "<=".value((TokenKind::LessEqual, "<=")),
    ))
    .parse_next(input)?;
    Ok((kind, lexeme.to_string()))
}

fn single_char_token(input: &mut Input<'_>) -> ModalResult<Lexeme> {
    let c = any
        .verify(|c: &char| "(){}[],;-+/*=<>".contains(*c))
        .parse_next(input)?;
    let kind = match c {
        '(' => TokenKind::LeftParen,
        ')' => TokenKind::RightParen,
        '{' => TokenKind::LeftBrace,
        '}' => TokenKind::RightBrace,
        '[' => TokenKind::LeftBracket,
        ']' => TokenKind::RightBracket,
        ',' => TokenKind::Comma,
        ';' => TokenKind::Semicolon,
        '-' => TokenKind::Minus,
        '+' => TokenKind::Plus,
        '/' => TokenKind::Slash,
        '*' => TokenKind::Star,
        '=' => TokenKind::Equal,
        '<' => TokenKind::Less,
        '>' => TokenKind::Greater,
        _ => unreachable!("verify guarantees valid char"),
    };
    Ok((kind, c.to_string()))
}

fn scan_token(input: &mut Input<'_>) -> ModalResult<Lexeme> {
    alt((
        string_literal,
        number_literal,
        identifier_or_keyword,
        two_char_token,
        single_char_token,
    ))
    .parse_next(input)
}

/// Scan all tokens from source, stopping at the first lexical error.
pub fn scan_all(source: &str) -> Result<Vec<Token>, CompileError> {
    let lines = LineIndex::new(source);
    let mut input = LocatingSlice::new(source);
    let mut tokens = Vec::new();

    loop {
        if let Err(offset) = whitespace_and_comments(&mut input) {
            return Err(CompileError::scan(
                ScanErrorKind::UnterminatedComment,
                lines.position(offset),
                Span::new(offset, 2),
            ));
        }
        if input.is_empty() {
            break;
        }
        let start = input.current_token_start();
        match scan_token(&mut input) {
            Ok((kind, lexeme)) => {
                let end = input.current_token_start();
                let span = Span::new(start, end - start);
                tokens.push(Token::new(kind, lexeme, span, lines.position(start)));
            }
            Err(_) => {
                let c = source[start..].chars().next().unwrap_or('\0');
                let (kind, len) = if c == '"' {
                    let rest = &source[start..];
                    let len = rest.find('\n').unwrap_or(rest.len());
                    (ScanErrorKind::UnterminatedString, len)
                } else {
                    (ScanErrorKind::UnexpectedCharacter(c), c.len_utf8())
                };
                return Err(CompileError::scan(
                    kind,
                    lines.position(start),
                    Span::new(start, len),
                ));
            }
        }
    }

    let eof_offset = source.len();
    tokens.push(Token::new(
        TokenKind::Eof,
        "",
        Span::new(eof_offset, 0),
        lines.position(eof_offset),
    ));
    tracing::debug!(count = tokens.len(), "scanned tokens");
    Ok(tokens)
}
