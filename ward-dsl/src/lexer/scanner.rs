//! Scanner implementation.

use super::token::*;
use std::iter::Peekable;
use std::str::CharIndices;
use ward_core::{MAX_IDENTIFIER_LEN, MAX_STRING_LEN};

/// Scans ward scripting-language source into a token stream.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
    /// True until a non-comment token has been produced on the current line.
    line_start: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
            line_start: true,
        }
    }

    /// Tokenize the entire source into a vector of tokens, terminated by
    /// a single trailing [`TokenKind::Eof`].
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            #[cfg(feature = "trace-lexer")]
            {
                if matches!(token.kind, TokenKind::Illegal(_)) {
                    tracing::debug!(line = token.span.line, column = token.span.column, "illegal token");
                } else {
                    tracing::trace!(line = token.span.line, column = token.span.column, kind = ?token.kind, "token");
                }
            }
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start_line = self.line;
        let start_col = self.column;
        let was_line_start = self.line_start;

        let kind = match self.peek_char() {
            None => TokenKind::Eof,
            Some('.') => {
                self.advance();
                TokenKind::Dot
            }
            Some(',') => {
                self.advance();
                TokenKind::Comma
            }
            Some('=') => {
                self.advance();
                TokenKind::Eq
            }
            Some('{') => {
                self.advance();
                TokenKind::LBrace
            }
            Some('}') => {
                self.advance();
                TokenKind::RBrace
            }
            Some('[') => {
                self.advance();
                if self.peek_char() == Some(']') {
                    self.advance();
                    TokenKind::EmptyList
                } else {
                    TokenKind::Illegal("[".to_string())
                }
            }
            Some('-') => {
                self.advance();
                if self.peek_char() == Some('>') {
                    self.advance();
                    TokenKind::Arrow
                } else {
                    TokenKind::Illegal("-".to_string())
                }
            }
            Some('*') => self.scan_star(),
            Some('/') => self.scan_slash(was_line_start),
            Some('"') => self.scan_string(),
            Some(c) if c.is_ascii_alphabetic() => self.scan_identifier_or_keyword(),
            Some(c) => {
                self.advance();
                TokenKind::Illegal(c.to_string())
            }
        };

        if !matches!(kind, TokenKind::Comment(_)) {
            self.line_start = false;
        }

        Token {
            kind,
            span: Span {
                line: start_line,
                column: start_col,
            },
        }
    }

    /// `***`, matched only as three consecutive asterisks.
    fn scan_star(&mut self) -> TokenKind {
        self.advance();
        if self.peek_char() == Some('*') {
            self.advance();
            if self.peek_char() == Some('*') {
                self.advance();
                return TokenKind::Terminator;
            }
        }
        TokenKind::Illegal("*".to_string())
    }

    /// `//` introduces a comment only when it is the first token seen on
    /// the line; the rest of the line becomes the comment body, which
    /// must itself satisfy the string character class.
    fn scan_slash(&mut self, was_line_start: bool) -> TokenKind {
        self.advance();
        if self.peek_char() != Some('/') || !was_line_start {
            return TokenKind::Illegal("/".to_string());
        }
        self.advance();
        // Skip a single space separating `//` from the body, as in `// text`.
        if self.peek_char() == Some(' ') {
            self.advance();
        }
        let start = self.byte_pos();
        while let Some(c) = self.peek_char() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
        let body = &self.source[start..self.byte_pos()];
        if is_valid_string_body(body) {
            TokenKind::Comment(body.to_string())
        } else {
            TokenKind::Illegal(body.to_string())
        }
    }

    fn scan_string(&mut self) -> TokenKind {
        self.advance(); // opening quote
        let start = self.byte_pos();
        loop {
            match self.peek_char() {
                None => return TokenKind::Illegal("unterminated string".to_string()),
                Some('"') => break,
                Some(_) => {
                    self.advance();
                }
            }
        }
        let body = &self.source[start..self.byte_pos()];
        self.advance(); // closing quote
        if body.len() > MAX_STRING_LEN || !is_valid_string_body(body) {
            TokenKind::Illegal(body.to_string())
        } else {
            TokenKind::StringLit(body.to_string())
        }
    }

    fn scan_identifier_or_keyword(&mut self) -> TokenKind {
        let start = self.byte_pos();
        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let ident = &self.source[start..self.byte_pos()];
        if ident.len() > MAX_IDENTIFIER_LEN {
            return TokenKind::Illegal(ident.to_string());
        }
        keyword(ident).unwrap_or_else(|| TokenKind::Identifier(ident.to_string()))
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '\n' => {
                    self.advance();
                    self.line += 1;
                    self.column = 1;
                    self.line_start = true;
                }
                _ => break,
            }
        }
    }

    fn byte_pos(&mut self) -> usize {
        match self.chars.peek() {
            Some((i, _)) => *i,
            None => self.source.len(),
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn advance(&mut self) -> Option<char> {
        if let Some((_, c)) = self.chars.next() {
            self.column += 1;
            Some(c)
        } else {
            None
        }
    }
}

fn is_valid_string_body(s: &str) -> bool {
    s.bytes().all(|b| {
        b.is_ascii_alphanumeric()
            || b == b'_'
            || b == b' '
            || b == b','
            || b == b';'
            || b == b'.'
            || b == b'?'
            || b == b'!'
            || b == b'-'
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokenizes_auth_prelude() {
        let k = kinds(r#"as principal admin password "admin" do"#);
        assert_eq!(
            k,
            vec![
                TokenKind::As,
                TokenKind::Principal,
                TokenKind::Identifier("admin".into()),
                TokenKind::Password,
                TokenKind::StringLit("admin".into()),
                TokenKind::Do,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn terminator_requires_exactly_three_stars() {
        assert_eq!(kinds("***"), vec![TokenKind::Terminator, TokenKind::Eof]);
        assert!(matches!(kinds("**").as_slice(), [TokenKind::Illegal(_), TokenKind::Eof]));
    }

    #[test]
    fn empty_list_is_one_token() {
        assert_eq!(kinds("[]"), vec![TokenKind::EmptyList, TokenKind::Eof]);
    }

    #[test]
    fn bare_bracket_is_illegal() {
        assert!(matches!(kinds("[").as_slice(), [TokenKind::Illegal(_), TokenKind::Eof]));
    }

    #[test]
    fn comment_only_recognized_at_line_start() {
        let k = kinds("// hello there\n");
        assert_eq!(k, vec![TokenKind::Comment("hello there".into()), TokenKind::Eof]);
    }

    #[test]
    fn slash_after_other_tokens_is_illegal() {
        let k = kinds("x //y");
        assert!(matches!(k.as_slice(), [TokenKind::Identifier(_), TokenKind::Illegal(_), ..]));
    }

    #[test]
    fn identifier_over_max_length_is_illegal() {
        let long = "a".repeat(MAX_IDENTIFIER_LEN + 1);
        assert!(matches!(kinds(&long).as_slice(), [TokenKind::Illegal(_), TokenKind::Eof]));
    }

    #[test]
    fn string_rejects_disallowed_characters() {
        let k = kinds("\"a@b\"");
        assert!(matches!(k.as_slice(), [TokenKind::Illegal(_), TokenKind::Eof]));
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(kinds("RETURN"), vec![TokenKind::Return, TokenKind::Eof]);
        assert_eq!(kinds("ReturN"), vec![TokenKind::Return, TokenKind::Eof]);
    }
}
