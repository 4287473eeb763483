//! Principal entity and password redaction.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::PrincipalName;

/// A password, wrapped so its value never leaks through `{:?}`
/// formatting into logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Redacted(String);

impl Redacted {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Redacted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// A named actor that may authenticate and hold rights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub name: PrincipalName,
    pub password: Redacted,
}

impl Principal {
    pub fn new(name: PrincipalName, password: impl Into<String>) -> Self {
        Self {
            name,
            password: Redacted::new(password),
        }
    }

    pub fn check_password(&self, candidate: &str) -> bool {
        self.password.expose() == candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_prints_the_password() {
        let p = Principal::new(PrincipalName::new("alice").unwrap(), "hunter2");
        let rendered = format!("{:?}", p);
        assert!(!rendered.contains("hunter2"));
    }
}
