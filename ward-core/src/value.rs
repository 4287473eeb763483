//! The value algebra: string, record, list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Identifier, ValueError};

/// Maximum length, in bytes, of a string literal.
pub const MAX_STRING_LEN: usize = 65534;

/// A string value satisfying the DSL's printable-string character class.
///
/// Validated once at construction so that every later consumer (the
/// evaluator, the JSON renderer) can treat the contents as trusted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoundedString(String);

impl BoundedString {
    pub fn new(s: impl Into<String>) -> Result<Self, ValueError> {
        let s = s.into();
        if !is_valid_string(&s) {
            return Err(ValueError::InvalidString(s));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

fn is_valid_string(s: &str) -> bool {
    if s.len() > MAX_STRING_LEN {
        return false;
    }
    s.bytes().all(|b| {
        b.is_ascii_alphanumeric()
            || b == b'_'
            || b == b' '
            || b == b','
            || b == b';'
            || b == b'.'
            || b == b'?'
            || b == b'!'
            || b == b'-'
    })
}

/// A record: a finite mapping from field name to string. Keys are
/// unique (enforced by the `BTreeMap`); iteration order is not a
/// semantic property of the language even though `BTreeMap` happens to
/// produce one deterministically.
pub type Record = BTreeMap<Identifier, BoundedString>;

/// An element of a [`Value::List`]. Lists may not nest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListElement {
    Str(BoundedString),
    Record(Record),
}

/// The tagged union of the three value kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Str(BoundedString),
    Record(Record),
    List(Vec<ListElement>),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Record(_) => "record",
            Value::List(_) => "list",
        }
    }

    /// Render this value into the structural JSON used for the
    /// `RETURNING` record's `output` field.
    pub fn render(&self) -> serde_json::Value {
        match self {
            Value::Str(s) => serde_json::Value::String(s.as_str().to_string()),
            Value::Record(fields) => {
                let map = fields
                    .iter()
                    .map(|(k, v)| (k.as_str().to_string(), serde_json::Value::String(v.as_str().to_string())))
                    .collect();
                serde_json::Value::Object(map)
            }
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(ListElement::render).collect())
            }
        }
    }
}

impl ListElement {
    pub fn render(&self) -> serde_json::Value {
        match self {
            ListElement::Str(s) => serde_json::Value::String(s.as_str().to_string()),
            ListElement::Record(fields) => {
                let map = fields
                    .iter()
                    .map(|(k, v)| (k.as_str().to_string(), serde_json::Value::String(v.as_str().to_string())))
                    .collect();
                serde_json::Value::Object(map)
            }
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            ListElement::Str(s) => Value::Str(s),
            ListElement::Record(r) => Value::Record(r),
        }
    }
}

impl TryFrom<Value> for ListElement {
    type Error = ValueError;

    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Str(s) => Ok(ListElement::Str(s)),
            Value::Record(r) => Ok(ListElement::Record(r)),
            Value::List(_) => Err(ValueError::NestedList),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unprintable_characters() {
        assert!(BoundedString::new("hi\tthere").is_err());
    }

    #[test]
    fn accepts_allowed_punctuation() {
        assert!(BoundedString::new("Hello, world! Are you ok? - yes.").is_ok());
    }

    #[test]
    fn list_cannot_absorb_a_list_element() {
        let nested = Value::List(vec![]);
        assert_eq!(ListElement::try_from(nested), Err(ValueError::NestedList));
    }

    #[test]
    fn render_string() {
        let v = Value::Str(BoundedString::new("hello").unwrap());
        assert_eq!(v.render(), serde_json::json!("hello"));
    }

    #[test]
    fn render_record() {
        let mut fields = Record::new();
        fields.insert(Identifier::new("name").unwrap(), BoundedString::new("ok").unwrap());
        let v = Value::Record(fields);
        assert_eq!(v.render(), serde_json::json!({"name": "ok"}));
    }
}
