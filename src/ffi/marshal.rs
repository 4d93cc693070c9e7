//! Argument marshalling
//!
//! Converts Rust values into shell literal syntax for proxy calls.

use serde_json::Value;
use std::fmt;

/// A value passed to an imported member
#[derive(Debug, Clone, PartialEq)]
pub enum ShellArg {
    /// Absent argument, sent as `$null`
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    BigInt(i128),
    Float(f64),
    Str(String),
    /// Structured data, rehydrated on the shell side through `In`
    Json(Value),
    /// Callbacks cannot cross the boundary; encodes as nothing
    Callback,
}

impl ShellArg {
    /// Shell literal for this argument
    pub fn encode(&self) -> String {
        match self {
            ShellArg::Undefined | ShellArg::Null => "$null".to_string(),
            ShellArg::Bool(true) => "$True".to_string(),
            ShellArg::Bool(false) => "$False".to_string(),
            ShellArg::Int(n) => n.to_string(),
            ShellArg::BigInt(n) => n.to_string(),
            ShellArg::Float(x) => encode_float(*x),
            ShellArg::Str(s) => quote(s),
            ShellArg::Json(value) => encode_json(value),
            ShellArg::Callback => String::new(),
        }
    }
}

impl fmt::Display for ShellArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Single-quoted literal; embedded quotes are doubled
pub fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn encode_float(x: f64) -> String {
    if x.is_nan() {
        "[double]::NaN".to_string()
    } else if x.is_infinite() {
        if x > 0.0 {
            "[double]::PositiveInfinity".to_string()
        } else {
            "[double]::NegativeInfinity".to_string()
        }
    } else {
        x.to_string()
    }
}

fn encode_json(value: &Value) -> String {
    match value {
        Value::Null => "$null".to_string(),
        Value::Bool(b) => ShellArg::Bool(*b).encode(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(_) | Value::Object(_) => format!("(In {})", quote(&value.to_string())),
    }
}

/// Encode a whole argument list
pub fn encode_args(args: &[ShellArg]) -> String {
    args.iter().map(ShellArg::encode).collect::<Vec<_>>().join(", ")
}

impl From<bool> for ShellArg {
    fn from(b: bool) -> Self {
        ShellArg::Bool(b)
    }
}

macro_rules! int_arg {
    ($($t:ty),*) => {
        $(impl From<$t> for ShellArg {
            fn from(n: $t) -> Self {
                ShellArg::Int(n as i64)
            }
        })*
    };
}

int_arg!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for ShellArg {
    fn from(n: u64) -> Self {
        match i64::try_from(n) {
            Ok(n) => ShellArg::Int(n),
            Err(_) => ShellArg::BigInt(n as i128),
        }
    }
}

impl From<i128> for ShellArg {
    fn from(n: i128) -> Self {
        ShellArg::BigInt(n)
    }
}

impl From<f32> for ShellArg {
    fn from(x: f32) -> Self {
        ShellArg::Float(x as f64)
    }
}

impl From<f64> for ShellArg {
    fn from(x: f64) -> Self {
        ShellArg::Float(x)
    }
}

impl From<&str> for ShellArg {
    fn from(s: &str) -> Self {
        ShellArg::Str(s.to_string())
    }
}

impl From<String> for ShellArg {
    fn from(s: String) -> Self {
        ShellArg::Str(s)
    }
}

impl From<Value> for ShellArg {
    fn from(value: Value) -> Self {
        ShellArg::Json(value)
    }
}

impl<T: Into<ShellArg>> From<Option<T>> for ShellArg {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ShellArg::Null)
    }
}
