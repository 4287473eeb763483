//! Lexer, recursive-descent parser and pretty-printer for the ward
//! scripting language.
//!
//! A ward program is a sequence of commands terminated by a line
//! containing exactly `***`. [`parser::parse`] is the sole entry point:
//! it tokenizes with [`lexer::Lexer`] and builds a [`parser::Program`],
//! or fails with a single [`parser::ParseError`] - there is no partial
//! or recovering parse.

pub mod lexer;
pub mod parser;
pub mod pretty_printer;

pub use parser::{parse, Cmd, DelegationRight, DelegationVar, Expr, ParseError, Program, ValueExpr};
