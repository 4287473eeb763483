//! Abstract syntax tree types for the ward scripting language.

use serde::{Deserialize, Serialize};

/// A parsed program: an ordered list of commands, terminated by `***`
/// in the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub cmds: Vec<Cmd>,
}

/// A single command form. The set is closed; the evaluator
/// matches it exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cmd {
    /// `as principal P password "pw" do`
    Auth { principal: String, password: String },
    /// `set x = E`
    Set { name: String, expr: Expr },
    /// `create principal P "pw"`
    CreatePrincipal { name: String, password: String },
    /// `change password P "pw"`
    ChangePassword { name: String, password: String },
    /// `append to x with E`
    Append { name: String, expr: Expr },
    /// `local x = E`
    Local { name: String, expr: Expr },
    /// `foreach y in x replacewith E`
    Foreach { bind: String, source: String, expr: Expr },
    /// `set delegation x q <right> -> p`
    SetDelegation {
        var: DelegationVar,
        issuer: String,
        right: DelegationRight,
        target: String,
    },
    /// `delete delegation x q <right> -> p`
    DeleteDelegation {
        var: DelegationVar,
        issuer: String,
        right: DelegationRight,
        target: String,
    },
    /// `default delegator = p`
    DefaultDelegator { name: String },
    /// `return E`
    Return(Expr),
    /// `exit`
    Exit,
    /// `// text`
    Comment(String),
}

/// The variable a delegation command targets: either a specific global
/// or the `all` form covering every variable on which the issuer holds
/// DELEGATE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DelegationVar {
    Named(String),
    All,
}

/// The right a delegation command grants or revokes: either a specific
/// right or the `all` form covering every right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelegationRight {
    Named(ward_core::Right),
    All,
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// `[]`
    EmptyList,
    /// `{ f1 = V, f2 = V, ... }`
    Record(Vec<(String, ValueExpr)>),
    /// A bare value expression.
    Value(ValueExpr),
}

/// A value expression: a string literal, a bare identifier reference,
/// or a field access on a record-valued identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueExpr {
    StringLit(String),
    Ident(String),
    FieldAccess(String, String),
}
