//! The in-memory database: principals, delegations, global variables.
//!
//! A `HashMap`-of-entities storage idiom, collapsed from
//! `Arc<RwLock<..>>` per-entity maps to a single owned struct since
//! `ward-server` already serializes all access behind one
//! `tokio::sync::Mutex<Database>`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ward_core::{Principal, PrincipalName, Redacted, Right, Value, VarName};

/// Locals live only for the lifetime of the executing program and are
/// never checked against the access engine.
pub type LocalsMap = HashMap<VarName, Value>;

/// A stored delegation assertion `(issuer, variable, right)`. The
/// target is the key under which this assertion is stored in
/// [`Database::delegations`], not a field here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub issuer: PrincipalName,
    pub variable: VarName,
    pub right: Right,
}

/// The persistent in-memory state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub principals: HashMap<PrincipalName, Principal>,
    pub delegations: HashMap<PrincipalName, Vec<Delegation>>,
    pub variables: HashMap<VarName, Value>,
    pub default_delegator: PrincipalName,
}

impl Database {
    /// Seeds `admin` with the externally supplied password and sets the
    /// default delegator to `anyone`.
    pub fn new(admin_password: impl Into<String>) -> Self {
        let admin = PrincipalName::admin();
        let mut principals = HashMap::new();
        principals.insert(admin.clone(), Principal::new(admin, admin_password));
        Self {
            principals,
            delegations: HashMap::new(),
            variables: HashMap::new(),
            default_delegator: PrincipalName::anyone(),
        }
    }

    /// `anyone` can never authenticate; everyone else needs a
    /// matching password.
    #[tracing::instrument(skip(self, password), level = "debug")]
    pub fn authenticate(&self, name: &PrincipalName, password: &str) -> bool {
        if name.is_anyone() {
            return false;
        }
        self.principals.get(name).is_some_and(|p| p.check_password(password))
    }

    pub fn principal_exists(&self, name: &PrincipalName) -> bool {
        name.is_anyone() || self.principals.contains_key(name)
    }

    #[tracing::instrument(skip(self, password), level = "debug")]
    pub fn insert_principal(&mut self, name: PrincipalName, password: impl Into<String>) {
        self.principals.insert(name.clone(), Principal::new(name, password));
    }

    #[tracing::instrument(skip(self, password), level = "debug")]
    pub fn set_password(&mut self, name: &PrincipalName, password: impl Into<String>) {
        if let Some(p) = self.principals.get_mut(name) {
            p.password = Redacted::new(password);
        }
    }

    /// Deep copy taken at program start. All fields are `Clone`,
    /// so this is a derive rather than hand-rolled journal machinery.
    pub fn snapshot(&self) -> Database {
        self.clone()
    }

    /// Atomically replaces live state with a prior snapshot.
    pub fn restore(&mut self, snapshot: Database) {
        *self = snapshot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_is_seeded_and_authenticates() {
        let db = Database::new("s3cret");
        assert!(db.authenticate(&PrincipalName::admin(), "s3cret"));
        assert!(!db.authenticate(&PrincipalName::admin(), "wrong"));
    }

    #[test]
    fn anyone_never_authenticates() {
        let db = Database::new("s3cret");
        assert!(!db.authenticate(&PrincipalName::anyone(), ""));
    }

    #[test]
    fn snapshot_and_restore_round_trip() {
        let mut db = Database::new("s3cret");
        let snap = db.snapshot();
        db.insert_principal(PrincipalName::new("alice").unwrap(), "pw");
        assert!(db.principals.len() > snap.principals.len());
        db.restore(snap);
        assert_eq!(db.principals.len(), 1);
    }
}
