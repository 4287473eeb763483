//! Recursive-descent parser for the ward scripting language.

use std::collections::HashSet;

use super::ast::*;
use crate::lexer::{Lexer, Span, Token, TokenKind};
use thiserror::Error;

/// A parse failure. Any single parse error fails the whole program
/// - there is no partial/recovering parse.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("parse error at line {line}, column {column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

/// Parse `source` into a [`Program`]. The sole public entry point into
/// this module: hand the network layer a "give the core a program
/// string, get back an AST or an error" contract.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    let tokens = Lexer::new(source).tokenize();
    Parser::new(tokens).parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut cmds = Vec::new();
        let mut seen_first_real = false;

        loop {
            if self.check(&TokenKind::Terminator) {
                self.advance();
                return Ok(Program { cmds });
            }
            if self.check(&TokenKind::Eof) {
                return Err(self.error("unexpected end of program, expected ***"));
            }
            if let TokenKind::Illegal(lex) = &self.current().kind {
                return Err(self.error(&format!("illegal token: {:?}", lex)));
            }

            let cmd = self.parse_cmd()?;

            if !seen_first_real && !matches!(cmd, Cmd::Comment(_)) {
                seen_first_real = true;
                if !matches!(cmd, Cmd::Auth { .. }) {
                    return Err(self.error("program must begin with 'as principal... do'"));
                }
            }

            cmds.push(cmd);
        }
    }

    fn parse_cmd(&mut self) -> Result<Cmd, ParseError> {
        match self.current().kind.clone() {
            TokenKind::Comment(text) => {
                self.advance();
                Ok(Cmd::Comment(text))
            }
            TokenKind::As => self.parse_auth(),
            TokenKind::Set => {
                if self.peek_is(1, &TokenKind::Delegation) {
                    self.parse_set_delegation()
                } else {
                    self.parse_set()
                }
            }
            TokenKind::Create => self.parse_create_principal(),
            TokenKind::Change => self.parse_change_password(),
            TokenKind::Append => self.parse_append(),
            TokenKind::Local => self.parse_local(),
            TokenKind::Foreach => self.parse_foreach(),
            TokenKind::Delete => self.parse_delete_delegation(),
            TokenKind::Default => self.parse_default_delegator(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Exit => {
                self.advance();
                Ok(Cmd::Exit)
            }
            _ => Err(self.error("expected a command")),
        }
    }

    fn parse_auth(&mut self) -> Result<Cmd, ParseError> {
        self.expect(TokenKind::As)?;
        self.expect(TokenKind::Principal)?;
        let principal = self.expect_identifier()?;
        self.expect(TokenKind::Password)?;
        let password = self.expect_string()?;
        self.expect(TokenKind::Do)?;
        Ok(Cmd::Auth { principal, password })
    }

    fn parse_set(&mut self) -> Result<Cmd, ParseError> {
        self.expect(TokenKind::Set)?;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::Eq)?;
        let expr = self.parse_expr()?;
        Ok(Cmd::Set { name, expr })
    }

    fn parse_create_principal(&mut self) -> Result<Cmd, ParseError> {
        self.expect(TokenKind::Create)?;
        self.expect(TokenKind::Principal)?;
        let name = self.expect_identifier()?;
        let password = self.expect_string()?;
        Ok(Cmd::CreatePrincipal { name, password })
    }

    fn parse_change_password(&mut self) -> Result<Cmd, ParseError> {
        self.expect(TokenKind::Change)?;
        self.expect(TokenKind::Password)?;
        let name = self.expect_identifier()?;
        let password = self.expect_string()?;
        Ok(Cmd::ChangePassword { name, password })
    }

    fn parse_append(&mut self) -> Result<Cmd, ParseError> {
        self.expect(TokenKind::Append)?;
        self.expect(TokenKind::To)?;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::With)?;
        let expr = self.parse_expr()?;
        Ok(Cmd::Append { name, expr })
    }

    fn parse_local(&mut self) -> Result<Cmd, ParseError> {
        self.expect(TokenKind::Local)?;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::Eq)?;
        let expr = self.parse_expr()?;
        Ok(Cmd::Local { name, expr })
    }

    fn parse_foreach(&mut self) -> Result<Cmd, ParseError> {
        self.expect(TokenKind::Foreach)?;
        let bind = self.expect_identifier()?;
        self.expect(TokenKind::In)?;
        let source = self.expect_identifier()?;
        self.expect(TokenKind::ReplaceWith)?;
        let expr = self.parse_expr()?;
        Ok(Cmd::Foreach { bind, source, expr })
    }

    fn parse_set_delegation(&mut self) -> Result<Cmd, ParseError> {
        self.expect(TokenKind::Set)?;
        self.expect(TokenKind::Delegation)?;
        let var = self.parse_delegation_var()?;
        let issuer = self.expect_identifier()?;
        let right = self.parse_delegation_right()?;
        self.expect(TokenKind::Arrow)?;
        let target = self.expect_identifier()?;
        Ok(Cmd::SetDelegation { var, issuer, right, target })
    }

    fn parse_delete_delegation(&mut self) -> Result<Cmd, ParseError> {
        self.expect(TokenKind::Delete)?;
        self.expect(TokenKind::Delegation)?;
        let var = self.parse_delegation_var()?;
        let issuer = self.expect_identifier()?;
        let right = self.parse_delegation_right()?;
        self.expect(TokenKind::Arrow)?;
        let target = self.expect_identifier()?;
        Ok(Cmd::DeleteDelegation { var, issuer, right, target })
    }

    fn parse_delegation_var(&mut self) -> Result<DelegationVar, ParseError> {
        if self.check(&TokenKind::All) {
            self.advance();
            Ok(DelegationVar::All)
        } else {
            Ok(DelegationVar::Named(self.expect_identifier()?))
        }
    }

    fn parse_delegation_right(&mut self) -> Result<DelegationRight, ParseError> {
        let right = match &self.current().kind {
            TokenKind::All => {
                self.advance();
                return Ok(DelegationRight::All);
            }
            TokenKind::Read => ward_core::Right::Read,
            TokenKind::Write => ward_core::Right::Write,
            TokenKind::Append => ward_core::Right::Append,
            TokenKind::Delegate => ward_core::Right::Delegate,
            _ => return Err(self.error("expected a right (read, write, append, delegate or all)")),
        };
        self.advance();
        Ok(DelegationRight::Named(right))
    }

    fn parse_default_delegator(&mut self) -> Result<Cmd, ParseError> {
        self.expect(TokenKind::Default)?;
        self.expect(TokenKind::Delegator)?;
        self.expect(TokenKind::Eq)?;
        let name = self.expect_identifier()?;
        Ok(Cmd::DefaultDelegator { name })
    }

    fn parse_return(&mut self) -> Result<Cmd, ParseError> {
        self.expect(TokenKind::Return)?;
        let expr = self.parse_expr()?;
        Ok(Cmd::Return(expr))
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        match &self.current().kind {
            TokenKind::EmptyList => {
                self.advance();
                Ok(Expr::EmptyList)
            }
            TokenKind::LBrace => self.parse_record(),
            _ => Ok(Expr::Value(self.parse_value_expr()?)),
        }
    }

    fn parse_record(&mut self) -> Result<Expr, ParseError> {
        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        let mut seen = HashSet::new();

        while !self.check(&TokenKind::RBrace) {
            let key = self.expect_identifier()?;
            if !seen.insert(key.clone()) {
                return Err(self.error(&format!("duplicate field {:?} in record literal", key)));
            }
            self.expect(TokenKind::Eq)?;
            let value = self.parse_value_expr()?;
            fields.push((key, value));
            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Expr::Record(fields))
    }

    /// Parses `"string"` | `x` | `x.f`. The lookahead to decide between
    /// a bare identifier and a field access is implemented via a single
    /// token of pushback, not an extra peek method: the next
    /// token is always consumed, and put back if it turns out not to
    /// start a field access.
    fn parse_value_expr(&mut self) -> Result<ValueExpr, ParseError> {
        match self.current().kind.clone() {
            TokenKind::StringLit(s) => {
                self.advance();
                Ok(ValueExpr::StringLit(s))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                self.advance();
                let is_dot = matches!(self.tokens[self.pos - 1].kind, TokenKind::Dot);
                if is_dot {
                    let field = self.expect_identifier()?;
                    Ok(ValueExpr::FieldAccess(name, field))
                } else {
                    self.pushback();
                    Ok(ValueExpr::Ident(name))
                }
            }
            _ => Err(self.error("expected a string literal or identifier")),
        }
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    /// Puts back the single most-recently consumed token.
    fn pushback(&mut self) {
        if self.pos > 0 {
            self.pos -= 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    fn peek_is(&self, offset: usize, kind: &TokenKind) -> bool {
        match self.tokens.get(self.pos + offset) {
            Some(t) => std::mem::discriminant(&t.kind) == std::mem::discriminant(kind),
            None => false,
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.check(&kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!("expected {:?}", kind)))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match self.current().kind.clone() {
            TokenKind::Identifier(s) => {
                self.advance();
                Ok(s)
            }
            _ => Err(self.error("expected identifier")),
        }
    }

    fn expect_string(&mut self) -> Result<String, ParseError> {
        match self.current().kind.clone() {
            TokenKind::StringLit(s) => {
                self.advance();
                Ok(s)
            }
            _ => Err(self.error("expected string literal")),
        }
    }

    fn error(&self, msg: &str) -> ParseError {
        let span: Span = self.current().span;
        ParseError {
            message: msg.to_string(),
            line: span.line,
            column: span.column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_program() {
        let prg = parse("as principal admin password \"admin\" do\nexit\n***").unwrap();
        assert_eq!(
            prg.cmds,
            vec![
                Cmd::Auth { principal: "admin".into(), password: "admin".into() },
                Cmd::Exit,
            ]
        );
    }

    #[test]
    fn rejects_program_not_starting_with_auth() {
        let err = parse("exit\n***").unwrap_err();
        assert!(err.message.contains("as principal"));
    }

    #[test]
    fn rejects_missing_terminator() {
        assert!(parse("as principal admin password \"admin\" do\nexit\n").is_err());
    }

    #[test]
    fn parses_field_access_vs_bare_identifier() {
        let prg = parse(
            "as principal admin password \"admin\" do\nreturn x\nreturn x.f\n***",
        )
        .unwrap();
        assert_eq!(prg.cmds[1], Cmd::Return(Expr::Value(ValueExpr::Ident("x".into()))));
        assert_eq!(
            prg.cmds[2],
            Cmd::Return(Expr::Value(ValueExpr::FieldAccess("x".into(), "f".into())))
        );
    }

    #[test]
    fn rejects_duplicate_record_fields() {
        let err = parse(
            "as principal admin password \"admin\" do\nset x = { a = \"1\", a = \"2\" }\n***",
        )
        .unwrap_err();
        assert!(err.message.contains("duplicate"));
    }

    #[test]
    fn parses_delegation_all_forms() {
        let prg = parse(
            "as principal admin password \"admin\" do\nset delegation all admin read -> alice\nset delegation x admin all -> alice\n***",
        )
        .unwrap();
        assert_eq!(
            prg.cmds[1],
            Cmd::SetDelegation {
                var: DelegationVar::All,
                issuer: "admin".into(),
                right: DelegationRight::Named(ward_core::Right::Read),
                target: "alice".into(),
            }
        );
        assert_eq!(
            prg.cmds[2],
            Cmd::SetDelegation {
                var: DelegationVar::Named("x".into()),
                issuer: "admin".into(),
                right: DelegationRight::All,
                target: "alice".into(),
            }
        );
    }

    #[test]
    fn comment_is_a_noop_command() {
        let prg = parse(
            "as principal admin password \"admin\" do\n// hi\nexit\n***",
        )
        .unwrap();
        assert_eq!(prg.cmds[1], Cmd::Comment("hi".into()));
    }
}
