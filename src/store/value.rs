//! Values, records and statement parameters exchanged with the store.
//!
//! A [`Record`] is one result row: a mapping from field name to [`Value`].
//! [`Params`] carries the named inputs of a statement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{StoreError, StoreResult};

/// A single property or result value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    String(String),
    Timestamp(DateTime<Utc>),
    List(Vec<Value>),
    Record(Record),
}

impl Value {
    /// Name of the variant, used in type-mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::String(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

// ─── Record ─────────────────────────────────────────────────────

/// One result row returned by a statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn require(&self, field: &str) -> StoreResult<&Value> {
        self.fields
            .get(field)
            .ok_or_else(|| StoreError::MissingField(field.to_string()))
    }

    pub fn get_str(&self, field: &str) -> StoreResult<&str> {
        match self.require(field)? {
            Value::String(s) => Ok(s),
            other => Err(mismatch(field, "string", other)),
        }
    }

    pub fn get_bool(&self, field: &str) -> StoreResult<bool> {
        match self.require(field)? {
            Value::Bool(b) => Ok(*b),
            other => Err(mismatch(field, "bool", other)),
        }
    }

    pub fn get_int(&self, field: &str) -> StoreResult<i64> {
        match self.require(field)? {
            Value::Integer(n) => Ok(*n),
            other => Err(mismatch(field, "integer", other)),
        }
    }

    pub fn get_timestamp(&self, field: &str) -> StoreResult<DateTime<Utc>> {
        match self.require(field)? {
            Value::Timestamp(ts) => Ok(*ts),
            other => Err(mismatch(field, "timestamp", other)),
        }
    }

    pub fn get_record(&self, field: &str) -> StoreResult<&Record> {
        match self.require(field)? {
            Value::Record(r) => Ok(r),
            other => Err(mismatch(field, "record", other)),
        }
    }

    /// A string field that may be absent or null.
    pub fn get_opt_str(&self, field: &str) -> StoreResult<Option<&str>> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(mismatch(field, "string", other)),
        }
    }
}

// ─── Params ─────────────────────────────────────────────────────

/// Named statement parameters.
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: BTreeMap<&'static str, Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, value: impl Into<Value>) -> Self {
        self.values.insert(name, value.into());
        self
    }

    pub fn get(&self, name: &'static str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn str(&self, name: &'static str) -> StoreResult<&str> {
        match self.values.get(name) {
            None | Some(Value::Null) => Err(StoreError::MissingParameter(name)),
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(mismatch(name, "string", other)),
        }
    }

    /// Absent and null both mean "not provided".
    pub fn opt_str(&self, name: &'static str) -> StoreResult<Option<&str>> {
        match self.values.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(mismatch(name, "string", other)),
        }
    }

    pub fn timestamp(&self, name: &'static str) -> StoreResult<DateTime<Utc>> {
        match self.values.get(name) {
            None | Some(Value::Null) => Err(StoreError::MissingParameter(name)),
            Some(Value::Timestamp(ts)) => Ok(*ts),
            Some(other) => Err(mismatch(name, "timestamp", other)),
        }
    }

    pub fn str_list(&self, name: &'static str) -> StoreResult<Vec<&str>> {
        match self.values.get(name) {
            None | Some(Value::Null) => Err(StoreError::MissingParameter(name)),
            Some(Value::List(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.as_str()),
                    other => Err(mismatch(name, "string", other)),
                })
                .collect(),
            Some(other) => Err(mismatch(name, "list", other)),
        }
    }
}

fn mismatch(field: &str, expected: &'static str, found: &Value) -> StoreError {
    StoreError::TypeMismatch {
        field: field.to_string(),
        expected,
        found: found.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_typed_getters() {
        let now = Utc::now();
        let record = Record::new()
            .with("username", "alice")
            .with("created", true)
            .with("hop", 2i64)
            .with("created_at", now);

        assert_eq!(record.get_str("username").unwrap(), "alice");
        assert!(record.get_bool("created").unwrap());
        assert_eq!(record.get_int("hop").unwrap(), 2);
        assert_eq!(record.get_timestamp("created_at").unwrap(), now);
    }

    #[test]
    fn test_record_missing_and_mismatched_fields() {
        let record = Record::new().with("hop", 1i64);
        assert!(matches!(
            record.get_str("name"),
            Err(StoreError::MissingField(ref f)) if f == "name"
        ));
        assert!(matches!(
            record.get_str("hop"),
            Err(StoreError::TypeMismatch { expected: "string", found: "integer", .. })
        ));
    }

    #[test]
    fn test_null_reads_as_absent_optional() {
        let record = Record::new().with("via", Value::Null);
        assert_eq!(record.get_opt_str("via").unwrap(), None);
        assert_eq!(record.get_opt_str("nope").unwrap(), None);
    }

    #[test]
    fn test_params_optional_and_required() {
        let params = Params::new()
            .with("username", "bob")
            .with("bio", None::<String>)
            .with("usernames", vec!["a", "b"]);

        assert_eq!(params.str("username").unwrap(), "bob");
        assert_eq!(params.opt_str("bio").unwrap(), None);
        assert!(matches!(
            params.str("bio"),
            Err(StoreError::MissingParameter("bio"))
        ));
        assert_eq!(params.str_list("usernames").unwrap(), vec!["a", "b"]);
    }
}
