//! Command Output Model
//!
//! The success value of a command: whatever JSON the shell serialized for the
//! last top-level result, or a timed-out marker.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Successful outcome of `exec`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Decoded result value (`null` when the command produced nothing)
    pub value: Value,
    /// Set when a safe timeout elapsed before the shell answered
    pub timeout: bool,
}

impl CommandOutput {
    /// Output carrying a decoded value
    pub fn new(value: Value) -> Self {
        Self {
            value,
            timeout: false,
        }
    }

    /// Marker returned by a safe timeout
    pub fn timed_out() -> Self {
        Self {
            value: Value::Null,
            timeout: true,
        }
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// Whether the value is an array
    pub fn is_array(&self) -> bool {
        self.value.is_array()
    }

    /// Index into an object value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.value.get(key)
    }

    /// The value as a list: arrays as-is, `null` empty, anything else a
    /// single element
    pub fn into_array(self) -> Vec<Value> {
        match self.value {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        }
    }

    /// Deserialize the value into a concrete type
    pub fn parse<T: serde::de::DeserializeOwned>(&self) -> crate::error::Result<T> {
        Ok(serde_json::from_value(self.value.clone())?)
    }
}

impl From<Value> for CommandOutput {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
