//! Lexical analysis for Faber source text.
//!
//! The scanner performs a single linear pass, producing positioned tokens,
//! a side list of comments and a list of diagnostics. Unknown characters are
//! reported and skipped so a single stray byte does not abort tokenization;
//! the scanner never fails hard.
//!
//! `<` and `>` are always emitted as single tokens; the parser reassembles
//! adjacent pairs into shift operators where the grammar calls for them.
//! This keeps nested generic annotations like `tabula<textus, lista<numerus>>`
//! unambiguous without lexer feedback.

mod token;

pub use self::token::{Comment, Token, TokenKind, KEYWORDS};

use unescape::unescape;

use crate::diagnostics::{Diagnostic, ErrorCode, Position};

/// Result of tokenizing one source text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LexedSource {
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct Lexer {
    chars: Vec<char>,
    index: usize,
    line: usize,
    column: usize,
    offset: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            index: 0,
            line: 0,
            column: 0,
            offset: 0,
        }
    }

    pub fn tokenize(mut self) -> LexedSource {
        let mut out = LexedSource::default();

        while let Some(c) = self.peek() {
            let position = self.position();

            match c {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                '/' if self.peek_at(1) == Some('/') => {
                    let comment = self.scan_line_comment(position);
                    out.comments.push(comment);
                }
                '/' if self.peek_at(1) == Some('*') => {
                    let comment = self.scan_block_comment(position);
                    out.comments.push(comment);
                }
                '"' => match self.scan_string(position) {
                    Ok(token) => out.tokens.push(token),
                    Err(diagnostic) => out.diagnostics.push(diagnostic),
                },
                '`' => match self.scan_template(position) {
                    Ok(token) => out.tokens.push(token),
                    Err(diagnostic) => out.diagnostics.push(diagnostic),
                },
                c if c.is_ascii_digit() => {
                    out.tokens.push(self.scan_number(position));
                }
                c if c.is_ascii_alphabetic() || c == '_' => {
                    out.tokens.push(self.scan_word(position));
                }
                _ => match self.scan_operator(position) {
                    Ok(token) => out.tokens.push(token),
                    Err(diagnostic) => {
                        self.advance();
                        out.diagnostics.push(diagnostic);
                    }
                },
            }
        }

        out.tokens
            .push(Token::new(TokenKind::Eof, "", self.position()));
        out
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column, self.offset)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek_at(&self, lookahead: usize) -> Option<char> {
        self.chars.get(self.index + lookahead).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.get(self.index).copied()?;
        self.index += 1;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn scan_line_comment(&mut self, position: Position) -> Comment {
        self.advance();
        self.advance();
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            text.push(c);
            self.advance();
        }

        Comment {
            text: text.trim().to_string(),
            position,
            end_line: position.line,
        }
    }

    fn scan_block_comment(&mut self, position: Position) -> Comment {
        self.advance();
        self.advance();
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == '*' && self.peek_at(1) == Some('/') {
                self.advance();
                self.advance();
                break;
            }
            text.push(c);
            self.advance();
        }

        Comment {
            text: text.trim().to_string(),
            position,
            end_line: self.line,
        }
    }

    fn scan_string(&mut self, position: Position) -> Result<Token, Diagnostic> {
        self.advance();
        let mut raw = String::new();

        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(Diagnostic::error(
                        ErrorCode::Syntax,
                        "unterminated string literal",
                        position,
                    ));
                }
                Some('\\') => {
                    raw.push('\\');
                    self.advance();
                    if let Some(escaped) = self.advance() {
                        raw.push(escaped);
                    }
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    raw.push(c);
                    self.advance();
                }
            }
        }

        let text = unescape(&raw).unwrap_or(raw);
        Ok(Token::new(TokenKind::Str, text, position))
    }

    /// Template strings keep their raw inner text; interpolation splitting
    /// happens in the parser, which sub-lexes each `${...}` region.
    fn scan_template(&mut self, position: Position) -> Result<Token, Diagnostic> {
        self.advance();
        let mut raw = String::new();

        loop {
            match self.peek() {
                None => {
                    return Err(Diagnostic::error(
                        ErrorCode::Syntax,
                        "unterminated template string",
                        position,
                    ));
                }
                Some('\\') => {
                    raw.push('\\');
                    self.advance();
                    if let Some(escaped) = self.advance() {
                        raw.push(escaped);
                    }
                }
                Some('`') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    raw.push(c);
                    self.advance();
                }
            }
        }

        Ok(Token::new(TokenKind::TemplateStr, raw, position))
    }

    fn scan_number(&mut self, position: Position) -> Token {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() && c != '_' {
                break;
            }
            if c != '_' {
                text.push(c);
            }
            self.advance();
        }

        // a single dot followed by a digit continues the literal as a float;
        // `1..5` stays an integer followed by a range operator
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            text.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if !c.is_ascii_digit() {
                    break;
                }
                text.push(c);
                self.advance();
            }
            return Token::new(TokenKind::Float, text, position);
        }

        if self.peek() == Some('M') {
            self.advance();
            return Token::new(TokenKind::BigInt, text, position);
        }

        Token::new(TokenKind::Integer, text, position)
    }

    fn scan_word(&mut self, position: Position) -> Token {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            text.push(c);
            self.advance();
        }

        match KEYWORDS.get(text.as_str()) {
            Some(kind) => Token::new(*kind, text, position),
            None => Token::new(TokenKind::Identifier, text, position),
        }
    }

    fn scan_operator(&mut self, position: Position) -> Result<Token, Diagnostic> {
        let c = self.peek().unwrap_or_default();
        let next = self.peek_at(1);

        let (kind, length) = match (c, next) {
            ('?', Some('?')) => (TokenKind::QuestionQuestion, 2),
            ('?', Some('.')) => (TokenKind::QuestionDot, 2),
            ('?', _) => (TokenKind::Question, 1),
            ('!', Some('=')) => (TokenKind::NotEq, 2),
            ('!', Some('.')) => (TokenKind::BangDot, 2),
            ('!', _) => (TokenKind::Bang, 1),
            ('=', Some('=')) => (TokenKind::EqEq, 2),
            ('=', Some('>')) => (TokenKind::FatArrow, 2),
            ('=', _) => (TokenKind::Assign, 1),
            ('-', Some('>')) => (TokenKind::Arrow, 2),
            ('-', _) => (TokenKind::Minus, 1),
            ('.', Some('.')) if self.peek_at(2) == Some('=') => (TokenKind::DotDotEq, 3),
            ('.', Some('.')) => (TokenKind::DotDot, 2),
            ('.', _) => (TokenKind::Dot, 1),
            ('<', Some('=')) => (TokenKind::Le, 2),
            ('<', _) => (TokenKind::Lt, 1),
            ('>', Some('=')) => (TokenKind::Ge, 2),
            ('>', _) => (TokenKind::Gt, 1),
            ('&', Some('&')) => (TokenKind::AndAnd, 2),
            ('|', Some('|')) => (TokenKind::OrOr, 2),
            ('|', _) => (TokenKind::Pipe, 1),
            ('+', _) => (TokenKind::Plus, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('%', _) => (TokenKind::Percent, 1),
            (',', _) => (TokenKind::Comma, 1),
            (':', _) => (TokenKind::Colon, 1),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            ('{', _) => (TokenKind::LBrace, 1),
            ('}', _) => (TokenKind::RBrace, 1),
            ('[', _) => (TokenKind::LBracket, 1),
            (']', _) => (TokenKind::RBracket, 1),
            _ => {
                return Err(Diagnostic::error(
                    ErrorCode::Syntax,
                    format!("unexpected character '{c}'"),
                    position,
                ));
            }
        };

        let mut text = String::new();
        for _ in 0..length {
            if let Some(consumed) = self.advance() {
                text.push(consumed);
            }
        }

        Ok(Token::new(kind, text, position))
    }
}

/// Convenience wrapper over [`Lexer::tokenize`].
pub fn tokenize(source: &str) -> LexedSource {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords_beat_identifiers() {
        assert_eq!(
            kinds("varia fixum functio salve"),
            vec![
                TokenKind::Varia,
                TokenKind::Fixum,
                TokenKind::Functio,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let lexed = tokenize("42 3.14 9M");
        assert_eq!(lexed.tokens[0].kind, TokenKind::Integer);
        assert_eq!(lexed.tokens[1].kind, TokenKind::Float);
        assert_eq!(lexed.tokens[1].text, "3.14");
        assert_eq!(lexed.tokens[2].kind, TokenKind::BigInt);
        assert_eq!(lexed.tokens[2].text, "9");
    }

    #[test]
    fn test_range_does_not_eat_float_dot() {
        assert_eq!(
            kinds("1..5"),
            vec![
                TokenKind::Integer,
                TokenKind::DotDot,
                TokenKind::Integer,
                TokenKind::Eof,
            ]
        );
        assert_eq!(
            kinds("1..=5"),
            vec![
                TokenKind::Integer,
                TokenKind::DotDotEq,
                TokenKind::Integer,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_unescaping() {
        let lexed = tokenize(r#""ave\nmunde""#);
        assert_eq!(lexed.tokens[0].kind, TokenKind::Str);
        assert_eq!(lexed.tokens[0].text, "ave\nmunde");
    }

    #[test]
    fn test_template_keeps_raw_interpolation() {
        let lexed = tokenize("`ave ${nomen}`");
        assert_eq!(lexed.tokens[0].kind, TokenKind::TemplateStr);
        assert_eq!(lexed.tokens[0].text, "ave ${nomen}");
    }

    #[test]
    fn test_optional_chain_operators() {
        assert_eq!(
            kinds("a?.b !. ??"),
            vec![
                TokenKind::Identifier,
                TokenKind::QuestionDot,
                TokenKind::Identifier,
                TokenKind::BangDot,
                TokenKind::QuestionQuestion,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_positions_track_lines() {
        let lexed = tokenize("varia\n  x");
        assert_eq!(lexed.tokens[0].position.line, 0);
        assert_eq!(lexed.tokens[1].position.line, 1);
        assert_eq!(lexed.tokens[1].position.column, 2);
    }

    #[test]
    fn test_comments_are_collected() {
        let lexed = tokenize("// salutatio\nvaria x = 1");
        assert_eq!(lexed.comments.len(), 1);
        assert_eq!(lexed.comments[0].text, "salutatio");
        assert!(lexed.diagnostics.is_empty());
    }

    #[test]
    fn test_unknown_character_reported_not_fatal() {
        let lexed = tokenize("varia @ x");
        assert_eq!(lexed.diagnostics.len(), 1);
        assert_eq!(lexed.tokens.last().unwrap().kind, TokenKind::Eof);
    }
}
