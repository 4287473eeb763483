//! Identifier newtype and the two reserved principal names.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ValueError;

/// Maximum length, in bytes, of an identifier.
pub const MAX_IDENTIFIER_LEN: usize = 255;

/// A validated identifier: a letter followed by letters, digits or
/// underscores, at most [`MAX_IDENTIFIER_LEN`] bytes long.
///
/// Used for principal names, variable names, field names and record
/// field names alike - the lexer does not distinguish between them at
/// the token level, so neither does this type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Validate and wrap `s` as an identifier.
    pub fn new(s: impl Into<String>) -> Result<Self, ValueError> {
        let s = s.into();
        if !is_valid_identifier(&s) {
            return Err(ValueError::InvalidIdentifier(s));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::borrow::Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

fn is_valid_identifier(s: &str) -> bool {
    if s.is_empty() || s.len() > MAX_IDENTIFIER_LEN {
        return false;
    }
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The reserved superuser principal. Holds every right unconditionally.
pub const ADMIN: &str = "admin";

/// The reserved universal pseudo-principal. Cannot authenticate, but can
/// hold delegations and act as the default delegator.
pub const ANYONE: &str = "anyone";

/// A principal name - an [`Identifier`] that is additionally aware of
/// the two reserved names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalName(Identifier);

impl PrincipalName {
    pub fn new(s: impl Into<String>) -> Result<Self, ValueError> {
        Ok(Self(Identifier::new(s)?))
    }

    pub fn admin() -> Self {
        Self(Identifier::new(ADMIN).expect("admin is a valid identifier"))
    }

    pub fn anyone() -> Self {
        Self(Identifier::new(ANYONE).expect("anyone is a valid identifier"))
    }

    pub fn is_admin(&self) -> bool {
        self.0.as_str() == ADMIN
    }

    pub fn is_anyone(&self) -> bool {
        self.0.as_str() == ANYONE
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for PrincipalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::borrow::Borrow<str> for PrincipalName {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

/// A global or local variable name. Distinct type alias from
/// [`PrincipalName`] so the two namespaces can never be confused at
/// compile time, even though both wrap an [`Identifier`].
pub type VarName = Identifier;
