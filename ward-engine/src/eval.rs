//! The evaluator: command dispatch, expression evaluation, and
//! the commit/rollback boundary around a whole program.

use std::mem;

use serde::Serialize;
use ward_core::{BoundedString, Identifier, PrincipalName, Record, Right, RightSet, Value, VarName};
use ward_dsl::{Cmd, DelegationRight, DelegationVar, Expr, Program, ValueExpr};

use crate::access;
use crate::db::{Database, LocalsMap};

/// One line of the JSON-lines reply.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
}

impl CommandResult {
    fn simple(status: &'static str) -> Self {
        Self { status, output: None }
    }
}

/// The result of running one whole program against the database.
pub struct ProgramOutcome {
    pub results: Vec<CommandResult>,
    pub should_exit: bool,
}

/// A terminal, program-ending outcome. Not a Rust error in the
/// `std::error::Error` sense - a successfully computed wire status that
/// happens to short-circuit the rest of the program and trigger
/// rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Denied,
    Failed,
}

impl Terminal {
    fn into_result(self) -> CommandResult {
        match self {
            Terminal::Denied => CommandResult::simple("DENIED"),
            Terminal::Failed => CommandResult::simple("FAILED"),
        }
    }
}

/// Parses and evaluates `source` against `db`, the single entry point
/// the network layer calls.
#[tracing::instrument(skip(db, source))]
pub fn run_program(db: &mut Database, source: &str) -> ProgramOutcome {
    let program = match ward_dsl::parse(source) {
        Ok(p) => p,
        Err(err) => {
            tracing::info!(%err, "program failed to parse");
            return ProgramOutcome { results: vec![CommandResult::simple("FAILED")], should_exit: false };
        }
    };

    let snapshot = db.snapshot();
    let mut evaluator = Evaluator::new();
    match evaluator.run(db, &program) {
        Ok(outcome) => outcome,
        Err(terminal) => {
            db.restore(snapshot);
            ProgramOutcome { results: vec![terminal.into_result()], should_exit: false }
        }
    }
}

struct Evaluator {
    principal: Option<PrincipalName>,
    locals: LocalsMap,
    results: Vec<CommandResult>,
}

impl Evaluator {
    fn new() -> Self {
        Self { principal: None, locals: LocalsMap::new(), results: Vec::new() }
    }

    fn run(&mut self, db: &mut Database, program: &Program) -> Result<ProgramOutcome, Terminal> {
        for cmd in &program.cmds {
            let Some(principal) = self.principal.clone() else {
                match cmd {
                    Cmd::Comment(_) => continue,
                    Cmd::Auth { principal, password } => {
                        self.authenticate(db, principal, password)?;
                        continue;
                    }
                    _ => return Err(Terminal::Failed),
                }
            };

            match cmd {
                Cmd::Comment(_) => {}
                Cmd::Auth { .. } => return Err(Terminal::Failed),
                Cmd::Set { name, expr } => {
                    let r = self.do_set(db, &principal, name, expr)?;
                    self.results.push(r);
                }
                Cmd::Local { name, expr } => {
                    let r = self.do_local(db, &principal, name, expr)?;
                    self.results.push(r);
                }
                Cmd::Append { name, expr } => {
                    let r = self.do_append(db, &principal, name, expr)?;
                    self.results.push(r);
                }
                Cmd::Foreach { bind, source, expr } => {
                    let r = self.do_foreach(db, &principal, bind, source, expr)?;
                    self.results.push(r);
                }
                Cmd::CreatePrincipal { name, password } => {
                    let r = self.do_create_principal(db, &principal, name, password)?;
                    self.results.push(r);
                }
                Cmd::ChangePassword { name, password } => {
                    let r = self.do_change_password(db, &principal, name, password)?;
                    self.results.push(r);
                }
                Cmd::SetDelegation { var, issuer, right, target } => {
                    let r = self.do_set_delegation(db, &principal, var, issuer, right, target)?;
                    self.results.push(r);
                }
                Cmd::DeleteDelegation { var, issuer, right, target } => {
                    let r = self.do_delete_delegation(db, &principal, var, issuer, right, target)?;
                    self.results.push(r);
                }
                Cmd::DefaultDelegator { name } => {
                    let r = self.do_default_delegator(db, &principal, name)?;
                    self.results.push(r);
                }
                Cmd::Return(expr) => {
                    let value = self.eval_expr(db, &principal, expr)?;
                    self.results.push(CommandResult { status: "RETURNING", output: Some(value.render()) });
                    return Ok(ProgramOutcome { results: mem::take(&mut self.results), should_exit: false });
                }
                Cmd::Exit => {
                    if !principal.is_admin() {
                        return Err(Terminal::Denied);
                    }
                    self.results.push(CommandResult::simple("EXITING"));
                    return Ok(ProgramOutcome { results: mem::take(&mut self.results), should_exit: true });
                }
            }
        }

        // Ran out of commands before return/exit.
        Err(Terminal::Failed)
    }

    fn authenticate(&mut self, db: &Database, principal: &str, password: &str) -> Result<(), Terminal> {
        let name = PrincipalName::new(principal).map_err(|_| Terminal::Failed)?;
        if !db.authenticate(&name, password) {
            return Err(Terminal::Denied);
        }
        tracing::info!(principal = %name, "authenticated");
        self.principal = Some(name);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    fn do_set(&mut self, db: &mut Database, principal: &PrincipalName, name: &str, expr: &Expr) -> Result<CommandResult, Terminal> {
        let ident = ident(name);
        let value = self.eval_expr(db, principal, expr)?;

        if self.locals.contains_key(&ident) {
            self.locals.insert(ident, value);
        } else if db.variables.contains_key(&ident) {
            if !access::may(db, &self.locals, principal, &ident, Right::Write) {
                return Err(Terminal::Denied);
            }
            db.variables.insert(ident, value);
        } else {
            db.variables.insert(ident.clone(), value);
            let entry = db.delegations.entry(principal.clone()).or_default();
            for right in RightSet::ALL_RIGHTS.iter_rights() {
                entry.push(crate::db::Delegation { issuer: principal.clone(), variable: ident.clone(), right });
            }
        }
        Ok(CommandResult::simple("SET"))
    }

    fn do_local(&mut self, db: &mut Database, principal: &PrincipalName, name: &str, expr: &Expr) -> Result<CommandResult, Terminal> {
        let ident = ident(name);
        // A local may shadow an existing global (that is the point of
        // locals); it may not re-declare an already-bound local in this
        // program.
        if self.locals.contains_key(&ident) {
            return Err(Terminal::Failed);
        }
        let value = self.eval_expr(db, principal, expr)?;
        self.locals.insert(ident, value);
        Ok(CommandResult::simple("LOCAL"))
    }

    fn do_append(&mut self, db: &mut Database, principal: &PrincipalName, name: &str, expr: &Expr) -> Result<CommandResult, Terminal> {
        let ident = ident(name);

        if let Some(current) = self.locals.get(&ident).cloned() {
            let base = as_list(current)?;
            let addition = self.eval_expr(db, principal, expr)?;
            self.locals.insert(ident, Value::List(extend_list(base, addition)?));
            return Ok(CommandResult::simple("APPEND"));
        }

        let current = db.variables.get(&ident).cloned().ok_or(Terminal::Failed)?;
        let base = as_list(current)?;
        if !access::may_any(db, &self.locals, principal, &ident, RightSet::WRITE | RightSet::APPEND) {
            return Err(Terminal::Denied);
        }
        let addition = self.eval_expr(db, principal, expr)?;
        db.variables.insert(ident, Value::List(extend_list(base, addition)?));
        Ok(CommandResult::simple("APPEND"))
    }

    fn do_foreach(
        &mut self,
        db: &mut Database,
        principal: &PrincipalName,
        bind: &str,
        source: &str,
        expr: &Expr,
    ) -> Result<CommandResult, Terminal> {
        let bind_ident = ident(bind);
        let source_ident = ident(source);
        if self.locals.contains_key(&bind_ident) || db.variables.contains_key(&bind_ident) {
            return Err(Terminal::Failed);
        }

        let is_local_source = self.locals.contains_key(&source_ident);
        let items = if is_local_source {
            as_list(self.locals.get(&source_ident).cloned().unwrap())?
        } else {
            let current = db.variables.get(&source_ident).cloned().ok_or(Terminal::Failed)?;
            if !access::may(db, &self.locals, principal, &source_ident, Right::Read)
                || !access::may(db, &self.locals, principal, &source_ident, Right::Write)
            {
                return Err(Terminal::Denied);
            }
            as_list(current)?
        };

        let mut replaced = Vec::with_capacity(items.len());
        for elem in items {
            self.locals.insert(bind_ident.clone(), elem.into_value());
            let evaluated = self.eval_expr(db, principal, expr);
            self.locals.remove(&bind_ident);
            let value = evaluated?;
            replaced.push(value.try_into().map_err(|_| Terminal::Failed)?);
        }

        if is_local_source {
            self.locals.insert(source_ident, Value::List(replaced));
        } else {
            db.variables.insert(source_ident, Value::List(replaced));
        }
        Ok(CommandResult::simple("FOREACH"))
    }

    fn do_create_principal(
        &mut self,
        db: &mut Database,
        principal: &PrincipalName,
        name: &str,
        password: &str,
    ) -> Result<CommandResult, Terminal> {
        if !principal.is_admin() {
            return Err(Terminal::Denied);
        }
        let p_name = PrincipalName::new(name).map_err(|_| Terminal::Failed)?;
        if db.principal_exists(&p_name) {
            return Err(Terminal::Failed);
        }
        db.insert_principal(p_name.clone(), password);
        access::propagate_default_delegator(db, &p_name);
        Ok(CommandResult::simple("CREATE_PRINCIPAL"))
    }

    fn do_change_password(
        &mut self,
        db: &mut Database,
        principal: &PrincipalName,
        name: &str,
        password: &str,
    ) -> Result<CommandResult, Terminal> {
        let p_name = PrincipalName::new(name).map_err(|_| Terminal::Failed)?;
        if !db.principals.contains_key(&p_name) {
            return Err(Terminal::Failed);
        }
        if !(principal.is_admin() || principal == &p_name) {
            return Err(Terminal::Denied);
        }
        db.set_password(&p_name, password);
        Ok(CommandResult::simple("CHANGE_PASSWORD"))
    }

    fn do_set_delegation(
        &mut self,
        db: &mut Database,
        principal: &PrincipalName,
        var: &DelegationVar,
        issuer: &str,
        right: &DelegationRight,
        target: &str,
    ) -> Result<CommandResult, Terminal> {
        let issuer = PrincipalName::new(issuer).map_err(|_| Terminal::Failed)?;
        let target = PrincipalName::new(target).map_err(|_| Terminal::Failed)?;
        for variable in self.resolve_delegation_vars(db, var, &issuer)? {
            for right in resolve_delegation_rights(right) {
                access::set_delegation_one(db, principal, &self.locals, &variable, &issuer, right, &target)?;
            }
        }
        Ok(CommandResult::simple("SET_DELEGATION"))
    }

    fn do_delete_delegation(
        &mut self,
        db: &mut Database,
        principal: &PrincipalName,
        var: &DelegationVar,
        issuer: &str,
        right: &DelegationRight,
        target: &str,
    ) -> Result<CommandResult, Terminal> {
        let issuer = PrincipalName::new(issuer).map_err(|_| Terminal::Failed)?;
        let target = PrincipalName::new(target).map_err(|_| Terminal::Failed)?;
        for variable in self.resolve_delegation_vars(db, var, &issuer)? {
            for right in resolve_delegation_rights(right) {
                access::delete_delegation_one(db, principal, &self.locals, &variable, &issuer, right, &target)?;
            }
        }
        Ok(CommandResult::simple("DELETE_DELEGATION"))
    }

    fn resolve_delegation_vars(&self, db: &Database, var: &DelegationVar, issuer: &PrincipalName) -> Result<Vec<VarName>, Terminal> {
        match var {
            DelegationVar::Named(name) => Ok(vec![ident(name)]),
            DelegationVar::All => Ok(access::variables_issuer_may_delegate(db, issuer)),
        }
    }

    fn do_default_delegator(&mut self, db: &mut Database, principal: &PrincipalName, name: &str) -> Result<CommandResult, Terminal> {
        if !principal.is_admin() {
            return Err(Terminal::Denied);
        }
        let p_name = PrincipalName::new(name).map_err(|_| Terminal::Failed)?;
        if !db.principal_exists(&p_name) {
            return Err(Terminal::Failed);
        }
        db.default_delegator = p_name;
        Ok(CommandResult::simple("DEFAULT_DELEGATOR"))
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn eval_expr(&mut self, db: &Database, principal: &PrincipalName, expr: &Expr) -> Result<Value, Terminal> {
        match expr {
            Expr::EmptyList => Ok(Value::List(Vec::new())),
            Expr::Record(fields) => {
                let mut record: Record = Record::new();
                for (name, value_expr) in fields {
                    let value = self.eval_value_expr(db, principal, value_expr)?;
                    let Value::Str(s) = value else {
                        return Err(Terminal::Failed);
                    };
                    record.insert(ident(name), s);
                }
                Ok(Value::Record(record))
            }
            Expr::Value(v) => self.eval_value_expr(db, principal, v),
        }
    }

    fn eval_value_expr(&mut self, db: &Database, principal: &PrincipalName, expr: &ValueExpr) -> Result<Value, Terminal> {
        match expr {
            ValueExpr::StringLit(s) => Ok(Value::Str(BoundedString::new(s.clone()).expect("lexer validated string literal"))),
            ValueExpr::Ident(name) => self.resolve_read(db, principal, name),
            ValueExpr::FieldAccess(name, field) => {
                let value = self.resolve_read(db, principal, name)?;
                let Value::Record(fields) = value else {
                    return Err(Terminal::Failed);
                };
                fields.get(&ident(field)).cloned().map(Value::Str).ok_or(Terminal::Failed)
            }
        }
    }

    /// Resolves a bare name for reading.
    /// Locals are checked first and bypass the access engine entirely;
    /// falling through to the global namespace, a missing name is
    /// FAILED before READ is even attempted.
    fn resolve_read(&self, db: &Database, principal: &PrincipalName, name: &str) -> Result<Value, Terminal> {
        let ident = ident(name);
        if let Some(value) = self.locals.get(&ident) {
            return Ok(value.clone());
        }
        match db.variables.get(&ident) {
            None => Err(Terminal::Failed),
            Some(value) => {
                if access::may(db, &self.locals, principal, &ident, Right::Read) {
                    Ok(value.clone())
                } else {
                    Err(Terminal::Denied)
                }
            }
        }
    }
}

fn resolve_delegation_rights(right: &DelegationRight) -> Vec<Right> {
    match right {
        DelegationRight::Named(r) => vec![*r],
        DelegationRight::All => RightSet::ALL_RIGHTS.iter_rights().collect(),
    }
}

fn as_list(value: Value) -> Result<Vec<ward_core::ListElement>, Terminal> {
    match value {
        Value::List(items) => Ok(items),
        _ => Err(Terminal::Failed),
    }
}

fn extend_list(mut base: Vec<ward_core::ListElement>, addition: Value) -> Result<Vec<ward_core::ListElement>, Terminal> {
    match addition {
        Value::List(items) => base.extend(items),
        other => base.push(other.try_into().map_err(|_| Terminal::Failed)?),
    }
    Ok(base)
}

/// Identifiers on the AST are already lexer-validated; this conversion
/// can only fail on a lexer/core validation-rule mismatch, which would
/// itself be a bug worth crashing loudly on during development.
fn ident(name: &str) -> Identifier {
    Identifier::new(name).expect("lexer guarantees a valid identifier")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::new("admin")
    }

    fn prog(src: &str) -> ProgramOutcome {
        run_program(&mut db(), src)
    }

    #[test]
    fn auth_failure_is_sole_denied_record() {
        let out = prog("as principal admin password \"wrong\" do\nexit\n***");
        assert_eq!(out.results.len(), 1);
        assert_eq!(out.results[0].status, "DENIED");
    }

    #[test]
    fn create_set_return_scenario() {
        let out = prog(
            "as principal admin password \"admin\" do\ncreate principal alice \"pw\"\nset x = \"hello\"\nreturn x\n***",
        );
        let statuses: Vec<_> = out.results.iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec!["CREATE_PRINCIPAL", "SET", "RETURNING"]);
        assert_eq!(out.results[2].output, Some(serde_json::json!("hello")));
    }

    #[test]
    fn unauthorized_read_is_denied_and_atomic() {
        let mut database = db();
        let setup = run_program(&mut database, "as principal admin password \"admin\" do\ncreate principal alice \"pw\"\nset x = \"secret\"\nexit\n***");
        assert_eq!(setup.results.last().unwrap().status, "EXITING");
        let snapshot_before = database.variables.len();

        let out = run_program(&mut database, "as principal alice password \"pw\" do\nreturn x\n***");
        assert_eq!(out.results[0].status, "DENIED");
        assert_eq!(database.variables.len(), snapshot_before);
    }

    #[test]
    fn delegation_then_read_succeeds() {
        let mut database = db();
        run_program(&mut database, "as principal admin password \"admin\" do\ncreate principal alice \"pw\"\nset x = \"secret\"\nset delegation x admin read -> alice\nexit\n***");
        let out = run_program(&mut database, "as principal alice password \"pw\" do\nreturn x\n***");
        assert_eq!(out.results[0].status, "RETURNING");
        assert_eq!(out.results[0].output, Some(serde_json::json!("secret")));
    }

    #[test]
    fn exit_sets_should_exit_flag() {
        let out = prog("as principal admin password \"admin\" do\nexit\n***");
        assert!(out.should_exit);
        assert_eq!(out.results[0].status, "EXITING");
    }

    #[test]
    fn program_without_terminator_command_fails() {
        let out = prog("as principal admin password \"admin\" do\nset x = \"a\"\n***");
        assert_eq!(out.results.last().unwrap().status, "FAILED");
    }

    #[test]
    fn foreach_failure_midway_leaves_list_unchanged() {
        let mut database = db();
        run_program(
            &mut database,
            "as principal admin password \"admin\" do\nset x = []\nappend to x with \"a\"\nexit\n***",
        );
        let before = database.variables.get(&Identifier::new("x").unwrap()).cloned();
        let out = run_program(
            &mut database,
            "as principal admin password \"admin\" do\nforeach y in x replacewith missing.f\n***",
        );
        assert_eq!(out.results.last().unwrap().status, "FAILED");
        assert_eq!(database.variables.get(&Identifier::new("x").unwrap()).cloned(), before);
    }

    #[test]
    fn local_shadows_global_for_remainder_of_program() {
        let mut database = db();
        run_program(&mut database, "as principal admin password \"admin\" do\nset x = \"outer\"\nexit\n***");
        let out = run_program(
            &mut database,
            "as principal admin password \"admin\" do\nlocal x = \"inner\"\nreturn x\n***",
        );
        assert_eq!(out.results.last().unwrap().output, Some(serde_json::json!("inner")));
        assert_eq!(
            database.variables.get(&Identifier::new("x").unwrap()),
            Some(&Value::Str(BoundedString::new("outer").unwrap()))
        );
    }
}
