//! Form payload fixtures.
//!
//! A fixture file is a JSON object of named payload sets, each a flat
//! mapping of logical field name to a string or number:
//!
//! ```json
//! {
//!   "valid":   { "email": "pat@example.com", "numberOfProviders": 5 },
//!   "invalid": { "email": "not-an-email", "phone": "abc123" }
//! }
//! ```
//!
//! Payloads are transient: scenarios derive variants from them (`without`,
//! `with`) and hand them to the form agent; nothing is written back.

use crate::result::{DemoflowError, DemoflowResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Older payload keys still accepted for a field, as (field, legacy key)
pub const LEGACY_KEYS: &[(&str, &str)] = &[("clinicSoftware", "emr"), ("heardAboutUs", "howHeard")];

/// A single payload value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    /// Text value
    Text(String),
    /// Numeric value
    Number(serde_json::Number),
    /// Boolean value
    Bool(bool),
}

impl std::fmt::Display for PayloadValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for PayloadValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<u64> for PayloadValue {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

/// Mapping of logical field name to value. `null` entries count as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(BTreeMap<String, Option<PayloadValue>>);

impl Payload {
    /// Empty payload
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy with `key` set
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<PayloadValue>) -> Self {
        self.0.insert(key.to_string(), Some(value.into()));
        self
    }

    /// Copy with `key` and its legacy alias removed
    #[must_use]
    pub fn without(mut self, key: &str) -> Self {
        self.0.remove(key);
        for (field, legacy) in LEGACY_KEYS {
            if *field == key {
                self.0.remove(*legacy);
            }
        }
        self
    }

    /// Value stored under exactly `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PayloadValue> {
        self.0.get(key).and_then(Option::as_ref)
    }

    /// Value for a logical field, falling back to its legacy key
    #[must_use]
    pub fn value_for(&self, field: &str) -> Option<&PayloadValue> {
        self.get(field).or_else(|| {
            LEGACY_KEYS
                .iter()
                .find(|(f, _)| *f == field)
                .and_then(|(_, legacy)| self.get(legacy))
        })
    }

    /// Number of keys with a defined value
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.values().filter(|v| v.is_some()).count()
    }

    /// Whether no key has a defined value
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Into<String>, V: Into<PayloadValue>> FromIterator<(K, V)> for Payload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), Some(v.into())))
                .collect(),
        )
    }
}

/// Named payload sets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixtureSet(BTreeMap<String, Payload>);

impl FixtureSet {
    /// Payload sets every run needs
    pub const REQUIRED: [&'static str; 2] = ["valid", "invalid"];

    /// Parse and check the required sets are present
    pub fn from_json(json: &str) -> DemoflowResult<Self> {
        let set: Self = serde_json::from_str(json).map_err(|e| DemoflowError::Fixture {
            message: format!("malformed fixture JSON: {e}"),
        })?;
        for name in Self::REQUIRED {
            if !set.0.contains_key(name) {
                return Err(DemoflowError::Fixture {
                    message: format!("missing payload set '{name}'"),
                });
            }
        }
        Ok(set)
    }

    /// Load a fixture file
    pub fn load(path: &Path) -> DemoflowResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| DemoflowError::Fixture {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::from_json(&json)
    }

    /// Named payload
    pub fn payload(&self, name: &str) -> DemoflowResult<&Payload> {
        self.0.get(name).ok_or_else(|| DemoflowError::Fixture {
            message: format!("no payload set named '{name}'"),
        })
    }

    /// The `valid` payload
    pub fn valid(&self) -> DemoflowResult<&Payload> {
        self.payload("valid")
    }

    /// The `invalid` payload
    pub fn invalid(&self) -> DemoflowResult<&Payload> {
        self.payload("invalid")
    }

    /// Set names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Built-in payloads matching `fixtures/testData.json`
    #[must_use]
    pub fn builtin() -> Self {
        let valid = Payload::new()
            .with("clinicName", "Demoflow Test Clinic")
            .with("numberOfProviders", 5_u64)
            .with("fullName", "Pat Tester")
            .with("email", "pat.tester@example.com")
            .with("phone", "(555) 123-4567")
            .with("clinicSoftware", "OSCAR Pro")
            .with("heardAboutUs", "Google");
        let invalid = Payload::new()
            .with("email", "invalid-email")
            .with("phone", "abc123")
            .with("fullName", "x".repeat(300).as_str());
        Self(BTreeMap::from([
            ("valid".to_string(), valid),
            ("invalid".to_string(), invalid),
        ]))
    }
}
