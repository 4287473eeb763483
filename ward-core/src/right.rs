//! The four-right access matrix.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single right a principal may hold on a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Right {
    Read,
    Write,
    Append,
    Delegate,
}

impl Right {
    pub fn as_str(&self) -> &'static str {
        match self {
            Right::Read => "read",
            Right::Write => "write",
            Right::Append => "append",
            Right::Delegate => "delegate",
        }
    }

}

impl fmt::Display for Right {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// A set of [`Right`]s, used by `may_any` and by "grant all rights"
    /// delegation forms (`set delegation ... all`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct RightSet: u8 {
        const READ = 0b0001;
        const WRITE = 0b0010;
        const APPEND = 0b0100;
        const DELEGATE = 0b1000;
    }
}

impl RightSet {
    pub const ALL_RIGHTS: RightSet = RightSet::READ
        .union(RightSet::WRITE)
        .union(RightSet::APPEND)
        .union(RightSet::DELEGATE);

    pub fn single(r: Right) -> Self {
        match r {
            Right::Read => RightSet::READ,
            Right::Write => RightSet::WRITE,
            Right::Append => RightSet::APPEND,
            Right::Delegate => RightSet::DELEGATE,
        }
    }

    pub fn contains_right(&self, r: Right) -> bool {
        self.contains(Self::single(r))
    }

    pub fn iter_rights(&self) -> impl Iterator<Item = Right> + '_ {
        [Right::Read, Right::Write, Right::Append, Right::Delegate]
            .into_iter()
            .filter(move |r| self.contains_right(*r))
    }
}

impl From<Right> for RightSet {
    fn from(r: Right) -> Self {
        RightSet::single(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_rights_contains_every_variant() {
        for r in [Right::Read, Right::Write, Right::Append, Right::Delegate] {
            assert!(RightSet::ALL_RIGHTS.contains_right(r));
        }
    }

    #[test]
    fn single_round_trips() {
        let s = RightSet::single(Right::Append);
        assert!(s.contains_right(Right::Append));
        assert!(!s.contains_right(Right::Write));
    }
}
