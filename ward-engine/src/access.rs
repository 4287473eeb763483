//! The access-control engine: `may`, `may_any`, and the
//! delegation grant/revoke operations.
//!
//! Implemented as free functions over `&Database`/`&mut Database`
//! rather than a trait, since the access model has exactly one
//! implementation and the command set that drives it is closed,
//! reserving trait objects for places where more than one backend
//! genuinely exists.

use std::collections::HashMap;

use ward_core::{PrincipalName, Right, RightSet, VarName};

use crate::db::{Database, Delegation, LocalsMap};
use crate::eval::Terminal;

/// `may(principal, variable, right)`.
///
/// Locals bypass access control entirely: if `variable` currently names
/// a local in the running program, access is granted regardless of
/// which principal is asking.
pub fn may(db: &Database, locals: &LocalsMap, principal: &PrincipalName, variable: &VarName, right: Right) -> bool {
    if principal.is_admin() {
        return true;
    }
    if locals.contains_key(variable) {
        return true;
    }
    [principal.clone(), PrincipalName::anyone()].iter().any(|holder| {
        db.delegations
            .get(holder)
            .is_some_and(|list| list.iter().any(|d| &d.variable == variable && d.right == right))
    })
}

/// `may` evaluated with no local scope, for queries that are
/// inherently about a global variable and an arbitrary principal (not
/// the currently executing program) - default-delegator propagation
/// and the `set delegation all...` variable-set expansion.
pub fn may_global(db: &Database, principal: &PrincipalName, variable: &VarName, right: Right) -> bool {
    may(db, &HashMap::new(), principal, variable, right)
}

/// True if `principal` holds any right in `rights` on `variable`.
pub fn may_any(db: &Database, locals: &LocalsMap, principal: &PrincipalName, variable: &VarName, rights: RightSet) -> bool {
    rights.iter_rights().any(|r| may(db, locals, principal, variable, r))
}

/// Every global variable on which `issuer` currently holds DELEGATE -
/// the expansion set for `set/delete delegation all <issuer> ... -> p`.
pub fn variables_issuer_may_delegate(db: &Database, issuer: &PrincipalName) -> Vec<VarName> {
    db.variables
        .keys()
        .filter(|v| may_global(db, issuer, v, Right::Delegate))
        .cloned()
        .collect()
}

fn principal_or_anyone_exists(db: &Database, name: &PrincipalName) -> bool {
    db.principal_exists(name)
}

/// Grants a single `(variable, issuer, right, target)` delegation.
/// Called once per `(variable, right)` pair by the evaluator when
/// either side of the command used the `all` form.
pub fn set_delegation_one(
    db: &mut Database,
    current: &PrincipalName,
    locals: &LocalsMap,
    variable: &VarName,
    issuer: &PrincipalName,
    right: Right,
    target: &PrincipalName,
) -> Result<(), Terminal> {
    if target.is_admin() {
        return Ok(());
    }
    if !principal_or_anyone_exists(db, issuer)
        || !principal_or_anyone_exists(db, target)
        || !db.variables.contains_key(variable)
    {
        return Err(Terminal::Failed);
    }
    if !(current.is_admin() || current == issuer || may(db, locals, current, variable, Right::Delegate)) {
        return Err(Terminal::Denied);
    }

    let entry = db.delegations.entry(target.clone()).or_default();
    let assertion = Delegation { issuer: issuer.clone(), variable: variable.clone(), right };
    if !entry.contains(&assertion) {
        entry.push(assertion);
    }
    Ok(())
}

/// Revokes a single `(variable, issuer, right, target)` delegation.
/// Idempotent: absence of the tuple is still success.
pub fn delete_delegation_one(
    db: &mut Database,
    current: &PrincipalName,
    locals: &LocalsMap,
    variable: &VarName,
    issuer: &PrincipalName,
    right: Right,
    target: &PrincipalName,
) -> Result<(), Terminal> {
    if !principal_or_anyone_exists(db, issuer)
        || !principal_or_anyone_exists(db, target)
        || !db.variables.contains_key(variable)
    {
        return Err(Terminal::Failed);
    }
    if !(current.is_admin() || current == target || may(db, locals, current, variable, Right::Delegate)) {
        return Err(Terminal::Denied);
    }

    if let Some(list) = db.delegations.get_mut(target) {
        list.retain(|d| !(&d.issuer == issuer && &d.variable == variable && d.right == right));
    }
    Ok(())
}

/// Mirrors the current default delegator's rights onto a newly created
/// principal.
pub fn propagate_default_delegator(db: &mut Database, new_principal: &PrincipalName) {
    let delegator = db.default_delegator.clone();
    let mut grants = Vec::new();
    for variable in db.variables.keys().cloned().collect::<Vec<_>>() {
        for right in RightSet::ALL_RIGHTS.iter_rights() {
            if may_global(db, &delegator, &variable, right) {
                grants.push(Delegation { issuer: delegator.clone(), variable: variable.clone(), right });
            }
        }
    }
    if grants.is_empty() {
        return;
    }
    let entry = db.delegations.entry(new_principal.clone()).or_default();
    for g in grants {
        if !entry.contains(&g) {
            entry.push(g);
        }
    }
}
