//! Property-based tests for the access-control and delegation invariants.

use proptest::prelude::*;
use std::collections::HashMap;

use ward_core::{BoundedString, Identifier, PrincipalName, Right, RightSet, Value};
use ward_engine::access::{delete_delegation_one, may, may_any, propagate_default_delegator, set_delegation_one};
use ward_engine::db::Database;
use ward_engine::run_program;

fn arb_identifier() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,8}".prop_filter("not reserved", |s| s != "admin" && s != "anyone")
}

proptest! {
    /// Admin universality: `may(admin, x, r)` is always true.
    #[test]
    fn admin_universality(var in arb_identifier(), right in 0u8..4) {
        let db = Database::new("admin");
        let locals = HashMap::new();
        let var = Identifier::new(var).unwrap();
        let right = [Right::Read, Right::Write, Right::Append, Right::Delegate][right as usize];
        prop_assert!(may(&db, &locals, &PrincipalName::admin(), &var, right));
    }

    /// Idempotent delete: deleting an absent delegation twice is a no-op both times.
    #[test]
    fn idempotent_delete(var in arb_identifier(), target in arb_identifier()) {
        let var_ident = Identifier::new(&var).unwrap();
        let target_name = PrincipalName::new(&target).unwrap();
        let mut db = Database::new("admin");
        db.variables.insert(var_ident.clone(), Value::Str(BoundedString::new("v").unwrap()));
        db.insert_principal(target_name.clone(), "pw");
        let locals = HashMap::new();
        let admin = PrincipalName::admin();

        let before = db.clone();
        delete_delegation_one(&mut db, &admin, &locals, &var_ident, &admin, Right::Read, &target_name).unwrap();
        let after_first = db.clone();
        delete_delegation_one(&mut db, &admin, &locals, &var_ident, &admin, Right::Read, &target_name).unwrap();
        prop_assert_eq!(after_first.delegations, db.delegations.clone());
        prop_assert_eq!(before.delegations, db.delegations);
    }

    /// Delegation round trip: set-then-delete restores the pre-state.
    #[test]
    fn delegation_round_trip(var in arb_identifier(), target in arb_identifier(), right in 0u8..4) {
        let var_ident = Identifier::new(&var).unwrap();
        let target_name = PrincipalName::new(&target).unwrap();
        let right = [Right::Read, Right::Write, Right::Append, Right::Delegate][right as usize];
        let mut db = Database::new("admin");
        db.variables.insert(var_ident.clone(), Value::Str(BoundedString::new("v").unwrap()));
        db.insert_principal(target_name.clone(), "pw");
        let locals = HashMap::new();
        let admin = PrincipalName::admin();

        let before = db.delegations.clone();
        set_delegation_one(&mut db, &admin, &locals, &var_ident, &admin, right, &target_name).unwrap();
        delete_delegation_one(&mut db, &admin, &locals, &var_ident, &admin, right, &target_name).unwrap();
        prop_assert_eq!(before, db.delegations);
    }

    /// Default-delegator propagation: a fresh principal inherits every
    /// right the default delegator held at creation time.
    #[test]
    fn default_delegator_propagation(var in arb_identifier(), new_principal in arb_identifier()) {
        let var_ident = Identifier::new(&var).unwrap();
        let new_name = PrincipalName::new(&new_principal).unwrap();
        let mut db = Database::new("admin");
        db.variables.insert(var_ident.clone(), Value::Str(BoundedString::new("v").unwrap()));
        db.default_delegator = PrincipalName::admin();

        propagate_default_delegator(&mut db, &new_name);
        let locals = HashMap::new();
        for right in RightSet::ALL_RIGHTS.iter_rights() {
            prop_assert!(may(&db, &locals, &new_name, &var_ident, right));
        }
    }

    /// Atomicity: any program ending DENIED/FAILED leaves the database
    /// byte-for-byte (field-for-field) unchanged.
    #[test]
    fn atomicity_on_denied_or_failed(bad_password in "[a-z]{1,8}") {
        let mut db = Database::new("admin");
        let before = db.clone();
        let out = run_program(&mut db, &format!("as principal admin password \"{}\" do\nexit\n***", bad_password));
        if bad_password != "admin" {
            prop_assert_eq!(out.results.last().unwrap().status, "DENIED");
            prop_assert_eq!(before.principals.len(), db.principals.len());
            prop_assert_eq!(before.variables.len(), db.variables.len());
        }
    }
}

#[test]
fn list_elements_never_nest_after_append_sequence() {
    let mut db = Database::new("admin");
    run_program(
        &mut db,
        "as principal admin password \"admin\" do\nset x = []\nappend to x with \"a\"\nappend to x with { f = \"b\" }\nexit\n***",
    );
    let var = Identifier::new("x").unwrap();
    match db.variables.get(&var).unwrap() {
        Value::List(items) => assert_eq!(items.len(), 2),
        other => panic!("expected a list, got {:?}", other),
    }
}

#[test]
fn may_any_is_satisfied_by_either_right() {
    let mut db = Database::new("admin");
    let var = Identifier::new("x").unwrap();
    db.variables.insert(var.clone(), Value::Str(BoundedString::new("v").unwrap()));
    let alice = PrincipalName::new("alice").unwrap();
    db.insert_principal(alice.clone(), "pw");
    let locals = HashMap::new();
    set_delegation_one(&mut db, &PrincipalName::admin(), &locals, &var, &PrincipalName::admin(), Right::Append, &alice).unwrap();
    assert!(may_any(&db, &locals, &alice, &var, RightSet::WRITE | RightSet::APPEND));
    assert!(!may(&db, &locals, &alice, &var, Right::Write));
}
