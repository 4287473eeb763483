//! Renders a parsed [`Program`] back to concrete ward syntax.
//!
//! Not used on the wire - the server only ever sees the client's own
//! source text. This exists for the trace binary and for tests that
//! want to assert a parse/print round trip reads back the same AST.

use crate::parser::{Cmd, DelegationRight, DelegationVar, Expr, Program, ValueExpr};
use std::fmt::Write as _;
use ward_core::Right;

pub fn print_program(program: &Program) -> String {
    let mut out = String::new();
    for cmd in &program.cmds {
        print_cmd(&mut out, cmd);
        out.push('\n');
    }
    out.push_str("***\n");
    out
}

fn print_cmd(out: &mut String, cmd: &Cmd) {
    match cmd {
        Cmd::Auth { principal, password } => {
            let _ = write!(out, "as principal {} password {:?} do", principal, password);
        }
        Cmd::Set { name, expr } => {
            let _ = write!(out, "set {} = ", name);
            print_expr(out, expr);
        }
        Cmd::CreatePrincipal { name, password } => {
            let _ = write!(out, "create principal {} {:?}", name, password);
        }
        Cmd::ChangePassword { name, password } => {
            let _ = write!(out, "change password {} {:?}", name, password);
        }
        Cmd::Append { name, expr } => {
            let _ = write!(out, "append to {} with ", name);
            print_expr(out, expr);
        }
        Cmd::Local { name, expr } => {
            let _ = write!(out, "local {} = ", name);
            print_expr(out, expr);
        }
        Cmd::Foreach { bind, source, expr } => {
            let _ = write!(out, "foreach {} in {} replacewith ", bind, source);
            print_expr(out, expr);
        }
        Cmd::SetDelegation { var, issuer, right, target } => {
            out.push_str("set delegation ");
            print_delegation_var(out, var);
            let _ = write!(out, " {} ", issuer);
            print_delegation_right(out, right);
            let _ = write!(out, " -> {}", target);
        }
        Cmd::DeleteDelegation { var, issuer, right, target } => {
            out.push_str("delete delegation ");
            print_delegation_var(out, var);
            let _ = write!(out, " {} ", issuer);
            print_delegation_right(out, right);
            let _ = write!(out, " -> {}", target);
        }
        Cmd::DefaultDelegator { name } => {
            let _ = write!(out, "default delegator = {}", name);
        }
        Cmd::Return(expr) => {
            out.push_str("return ");
            print_expr(out, expr);
        }
        Cmd::Exit => out.push_str("exit"),
        Cmd::Comment(text) => {
            let _ = write!(out, "// {}", text);
        }
    }
}

fn print_delegation_var(out: &mut String, var: &DelegationVar) {
    match var {
        DelegationVar::All => out.push_str("all"),
        DelegationVar::Named(name) => out.push_str(name),
    }
}

fn print_delegation_right(out: &mut String, right: &DelegationRight) {
    match right {
        DelegationRight::All => out.push_str("all"),
        DelegationRight::Named(Right::Read) => out.push_str("read"),
        DelegationRight::Named(Right::Write) => out.push_str("write"),
        DelegationRight::Named(Right::Append) => out.push_str("append"),
        DelegationRight::Named(Right::Delegate) => out.push_str("delegate"),
    }
}

fn print_expr(out: &mut String, expr: &Expr) {
    match expr {
        Expr::EmptyList => out.push_str("[]"),
        Expr::Record(fields) => {
            out.push('{');
            for (i, (name, value)) in fields.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{} = ", name);
                print_value_expr(out, value);
            }
            out.push('}');
        }
        Expr::Value(v) => print_value_expr(out, v),
    }
}

fn print_value_expr(out: &mut String, value: &ValueExpr) {
    match value {
        ValueExpr::StringLit(s) => {
            let _ = write!(out, "{:?}", s);
        }
        ValueExpr::Ident(name) => out.push_str(name),
        ValueExpr::FieldAccess(name, field) => {
            let _ = write!(out, "{}.{}", name, field);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn round_trips_through_parse_and_print() {
        let src = "as principal admin password \"admin\" do\nset x = { a = \"1\" }\nreturn x.a\nexit\n***\n";
        let program = parse(src).unwrap();
        let printed = print_program(&program);
        let reparsed = parse(&printed).unwrap();
        assert_eq!(program, reparsed);
    }
}
