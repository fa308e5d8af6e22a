//! Deterministic cache keys for GraphQL operations.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{ErrorKind, GraphqlError, GraphqlResult};

/// Discriminator appended to keys of paginated (infinite) queries.
pub const INFINITE_DISCRIMINATOR: &str = "infinite";

/// Cache identity of an operation: `(operation name, variables, discriminator?)`.
///
/// Two keys are equal iff every element is deeply equal. Variables are held as
/// JSON, so keys built from equal inputs compare equal regardless of the
/// variables' Rust type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryKey {
    operation_name: String,
    variables: Value,
    discriminator: Option<String>,
}

impl QueryKey {
    /// Operation name element (empty for anonymous operations).
    #[must_use]
    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    /// Normalized variables element; always a JSON value, `{}` when absent.
    #[must_use]
    pub const fn variables(&self) -> &Value {
        &self.variables
    }

    /// Discriminator element, if any.
    #[must_use]
    pub fn discriminator(&self) -> Option<&str> {
        self.discriminator.as_deref()
    }

    /// Returns `true` for keys of paginated queries.
    #[must_use]
    pub fn is_infinite(&self) -> bool {
        self.discriminator() == Some(INFINITE_DISCRIMINATOR)
    }
}

impl Hash for QueryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.operation_name.hash(state);
        hash_value(&self.variables, state);
        self.discriminator.hash(state);
    }
}

// Object entries are hashed in key order so the hash agrees with `Eq`
// whichever map representation serde_json was built with.
fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Null => 0_u8.hash(state),
        Value::Bool(b) => {
            1_u8.hash(state);
            b.hash(state);
        }
        Value::Number(n) => {
            2_u8.hash(state);
            n.to_string().hash(state);
        }
        Value::String(s) => {
            3_u8.hash(state);
            s.hash(state);
        }
        Value::Array(items) => {
            4_u8.hash(state);
            items.len().hash(state);
            for item in items {
                hash_value(item, state);
            }
        }
        Value::Object(map) => {
            5_u8.hash(state);
            map.len().hash(state);
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            for (key, item) in entries {
                key.hash(state);
                hash_value(item, state);
            }
        }
    }
}

impl Serialize for QueryKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.discriminator.is_some() { 3 } else { 2 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.operation_name)?;
        seq.serialize_element(&self.variables)?;
        if let Some(discriminator) = &self.discriminator {
            seq.serialize_element(discriminator)?;
        }
        seq.end()
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Build the cache key for an operation.
///
/// Absent variables (and variables serializing to `null`) become `{}`, so a
/// caller passing no variables and one passing an empty object share a key.
pub fn build_key<V>(
    operation_name: &str,
    variables: Option<&V>,
    discriminator: Option<&str>,
) -> GraphqlResult<QueryKey>
where
    V: Serialize + ?Sized,
{
    let variables = normalize_variables(variables)?;
    Ok(QueryKey {
        operation_name: operation_name.to_string(),
        variables,
        discriminator: discriminator.map(str::to_string),
    })
}

/// Serialize variables to JSON, mapping absent or `null` to `{}`.
pub(crate) fn normalize_variables<V>(variables: Option<&V>) -> GraphqlResult<Value>
where
    V: Serialize + ?Sized,
{
    let value = match variables {
        Some(variables) => serde_json::to_value(variables)
            .map_err(|err| GraphqlError::new(ErrorKind::InvalidVariables, err.to_string()))?,
        None => Value::Null,
    };
    Ok(if value.is_null() {
        Value::Object(Map::new())
    } else {
        value
    })
}
