use crate::diagnostics::{Diagnostic, Position, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifiers and keywords; keywords are recognised by the parser.
    Identifier,
    Number,
    String,
    LBrace,
    RBrace,
    LParen,
    RParen,
    Comma,
    Colon,
    /// `:=`
    Assign,
    /// `=:`
    StackAssign,
    /// `->`
    Arrow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Source text; for string literals the unescaped content.
    pub text: String,
    pub span: Span,
}

struct Cursor<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Cursor<'a> {
    fn new(content: &'a str) -> Self {
        Self {
            chars: content.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Position of the most recently consumed character on the current line.
    fn last_position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column.saturating_sub(1).max(1),
        }
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '$'
}

fn is_identifier_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$' || ch == '.'
}

/// Splits `content` into tokens. Lexing continues past errors so that the
/// parser can still report on the rest of the input.
pub fn lex(content: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut cursor = Cursor::new(content);
    let mut tokens = Vec::new();
    let mut diagnostics = Vec::new();

    while let Some(ch) = cursor.peek() {
        let start = cursor.position();
        if ch.is_whitespace() {
            cursor.bump();
            continue;
        }
        if ch == '/' && cursor.peek_second() == Some('/') {
            while let Some(next) = cursor.peek() {
                if next == '\n' {
                    break;
                }
                cursor.bump();
            }
            continue;
        }
        if ch == '/' && cursor.peek_second() == Some('*') {
            cursor.bump();
            cursor.bump();
            let mut closed = false;
            while let Some(next) = cursor.bump() {
                if next == '*' && cursor.peek() == Some('/') {
                    cursor.bump();
                    closed = true;
                    break;
                }
            }
            if !closed {
                diagnostics.push(Diagnostic::error(
                    "E1003",
                    "unterminated block comment",
                    Span::new(start, cursor.last_position()),
                ));
            }
            continue;
        }

        let simple = match ch {
            '{' => Some(TokenKind::LBrace),
            '}' => Some(TokenKind::RBrace),
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            ',' => Some(TokenKind::Comma),
            _ => None,
        };
        if let Some(kind) = simple {
            cursor.bump();
            tokens.push(Token {
                kind,
                text: ch.to_string(),
                span: Span::new(start, start),
            });
            continue;
        }

        match ch {
            ':' => {
                cursor.bump();
                let (kind, text) = if cursor.peek() == Some('=') {
                    cursor.bump();
                    (TokenKind::Assign, ":=")
                } else {
                    (TokenKind::Colon, ":")
                };
                tokens.push(Token {
                    kind,
                    text: text.to_string(),
                    span: Span::new(start, cursor.last_position()),
                });
            }
            '=' if cursor.peek_second() == Some(':') => {
                cursor.bump();
                cursor.bump();
                tokens.push(Token {
                    kind: TokenKind::StackAssign,
                    text: "=:".to_string(),
                    span: Span::new(start, cursor.last_position()),
                });
            }
            '-' if cursor.peek_second() == Some('>') => {
                cursor.bump();
                cursor.bump();
                tokens.push(Token {
                    kind: TokenKind::Arrow,
                    text: "->".to_string(),
                    span: Span::new(start, cursor.last_position()),
                });
            }
            '"' => {
                cursor.bump();
                let text = lex_string_body(&mut cursor, start, &mut diagnostics);
                tokens.push(Token {
                    kind: TokenKind::String,
                    text,
                    span: Span::new(start, cursor.last_position()),
                });
            }
            c if c.is_ascii_digit() => {
                let mut text = String::new();
                if c == '0' && matches!(cursor.peek_second(), Some('x') | Some('X')) {
                    text.push(cursor.bump().unwrap_or('0'));
                    text.push(cursor.bump().unwrap_or('x'));
                    while let Some(d) = cursor.peek() {
                        if !d.is_ascii_hexdigit() {
                            break;
                        }
                        text.push(d);
                        cursor.bump();
                    }
                    if text.len() == 2 {
                        diagnostics.push(Diagnostic::error(
                            "E1005",
                            "hex number literal without digits",
                            Span::new(start, cursor.last_position()),
                        ));
                    }
                } else {
                    while let Some(d) = cursor.peek() {
                        if !d.is_ascii_digit() {
                            break;
                        }
                        text.push(d);
                        cursor.bump();
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::Number,
                    text,
                    span: Span::new(start, cursor.last_position()),
                });
            }
            c if is_identifier_start(c) => {
                let mut text = String::new();
                while let Some(d) = cursor.peek() {
                    if !is_identifier_continue(d) {
                        break;
                    }
                    text.push(d);
                    cursor.bump();
                }
                tokens.push(Token {
                    kind: TokenKind::Identifier,
                    text,
                    span: Span::new(start, cursor.last_position()),
                });
            }
            other => {
                cursor.bump();
                diagnostics.push(Diagnostic::error(
                    "E1002",
                    format!("unexpected character `{other}`"),
                    Span::new(start, start),
                ));
            }
        }
    }

    (tokens, diagnostics)
}

fn lex_string_body(
    cursor: &mut Cursor<'_>,
    start: Position,
    diagnostics: &mut Vec<Diagnostic>,
) -> String {
    let mut text = String::new();
    loop {
        let escape_start = cursor.position();
        match cursor.bump() {
            None | Some('\n') => {
                diagnostics.push(Diagnostic::error(
                    "E1001",
                    "unterminated string literal",
                    Span::new(start, cursor.last_position()),
                ));
                return text;
            }
            Some('"') => return text,
            Some('\\') => match cursor.bump() {
                Some('\\') => text.push('\\'),
                Some('"') => text.push('"'),
                Some('\'') => text.push('\''),
                Some('n') => text.push('\n'),
                Some('t') => text.push('\t'),
                Some('r') => text.push('\r'),
                Some('x') => {
                    let hi = cursor.bump().and_then(|c| c.to_digit(16));
                    let lo = cursor.bump().and_then(|c| c.to_digit(16));
                    match (hi, lo) {
                        (Some(hi), Some(lo)) => text.push(char::from((hi * 16 + lo) as u8)),
                        _ => diagnostics.push(Diagnostic::error(
                            "E1004",
                            "invalid `\\x` escape, expected two hex digits",
                            Span::new(escape_start, cursor.last_position()),
                        )),
                    }
                }
                other => {
                    let shown = other.map(String::from).unwrap_or_default();
                    diagnostics.push(Diagnostic::error(
                        "E1004",
                        format!("invalid escape sequence `\\{shown}`"),
                        Span::new(escape_start, cursor.last_position()),
                    ));
                }
            },
            Some(ch) => text.push(ch),
        }
    }
}
