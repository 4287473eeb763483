//! Lexer token types for the ward scripting language.

/// Token kinds recognized by the scanner.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    Return,
    Exit,
    As,
    Principal,
    Password,
    Do,
    Set,
    Create,
    Change,
    Local,
    Append,
    To,
    With,
    Foreach,
    In,
    ReplaceWith,
    Delegation,
    Delegate,
    Read,
    Write,
    Default,
    Delegator,
    Delete,
    All,

    // Punctuation
    Dot,
    Comma,
    Eq,
    LBrace,
    RBrace,
    EmptyList,
    Arrow,
    Terminator,

    // Literals
    Identifier(String),
    StringLit(String),
    Comment(String),

    // Special
    Eof,
    Illegal(String),
}

/// Source location of a token, used for parse-error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Default for Span {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Match a full identifier lexeme against the fixed keyword set
/// (case-insensitive). Returns `None` for plain identifiers.
pub fn keyword(ident: &str) -> Option<TokenKind> {
    Some(match ident.to_ascii_lowercase().as_str() {
        "return" => TokenKind::Return,
        "exit" => TokenKind::Exit,
        "as" => TokenKind::As,
        "principal" => TokenKind::Principal,
        "password" => TokenKind::Password,
        "do" => TokenKind::Do,
        "set" => TokenKind::Set,
        "create" => TokenKind::Create,
        "change" => TokenKind::Change,
        "local" => TokenKind::Local,
        "append" => TokenKind::Append,
        "to" => TokenKind::To,
        "with" => TokenKind::With,
        "foreach" => TokenKind::Foreach,
        "in" => TokenKind::In,
        "replacewith" => TokenKind::ReplaceWith,
        "delegation" => TokenKind::Delegation,
        "delegate" => TokenKind::Delegate,
        "read" => TokenKind::Read,
        "write" => TokenKind::Write,
        "default" => TokenKind::Default,
        "delegator" => TokenKind::Delegator,
        "delete" => TokenKind::Delete,
        "all" => TokenKind::All,
        _ => return None,
    })
}
