//! Result/Error Classifier
//!
//! Turns a completed frame into either a success value or a typed
//! [`ErrorRecord`]. Error codes are looked up in an [`ErrorTypeTable`] that
//! callers can extend; unknown codes fall back to the generic class.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use super::codec::{extract_blocks, ErrorPayload};

/// Name of the class used when a code is not registered
pub const GENERIC_ERROR_CLASS: &str = "ErrorRecord";

const GENERIC_TEMPLATE: &str = "The statement '$term' caused an exception! ( $code )";

const COMMAND_NOT_FOUND_TEMPLATE: &str =
    "The term '$term' is not recognized as the name of a cmdlet, function, script file, or operable program.";

/// A registered error class: a name and a message template
///
/// Templates may reference `$term` and `$code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorClass {
    pub name: String,
    pub template: String,
}

impl ErrorClass {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }

    /// The fallback class
    pub fn generic() -> Self {
        Self::new(GENERIC_ERROR_CLASS, GENERIC_TEMPLATE)
    }

    fn render(&self, term: &str, code: &str) -> String {
        self.template.replace("$term", term).replace("$code", code)
    }
}

/// Code -> class lookup used by the classifier
#[derive(Debug, Clone)]
pub struct ErrorTypeTable {
    classes: HashMap<String, ErrorClass>,
}

impl ErrorTypeTable {
    /// A table holding only the built-in classes
    pub fn new() -> Self {
        let mut table = Self::empty();
        table.register(ErrorClass::new(
            "CommandNotFoundException",
            COMMAND_NOT_FOUND_TEMPLATE,
        ));
        table
    }

    /// A table without any registered class
    pub fn empty() -> Self {
        Self {
            classes: HashMap::new(),
        }
    }

    /// Register a class under its own name; replaces an existing one
    pub fn register(&mut self, class: ErrorClass) {
        self.classes.insert(class.name.to_lowercase(), class);
    }

    /// Number of registered classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Find the class for an error code
    ///
    /// Matching is case-insensitive. Qualified ids such as
    /// `ParameterBindingFailed,Microsoft.PowerShell.Commands.GetItemCommand`
    /// also match on their leading segment.
    pub fn lookup(&self, code: &str) -> ErrorClass {
        let key = code.trim().to_lowercase();
        if let Some(class) = self.classes.get(&key) {
            return class.clone();
        }

        key.split(',')
            .next()
            .and_then(|head| self.classes.get(head.trim()))
            .cloned()
            .unwrap_or_else(ErrorClass::generic)
    }

    /// Build a typed record from a raw payload
    pub fn record(&self, payload: &ErrorPayload) -> ErrorRecord {
        let code = payload.code.clone().unwrap_or_default();
        let term = payload.term.clone().unwrap_or_default();
        let class = self.lookup(&code);
        let message = class.render(&term, &code);

        ErrorRecord {
            line: payload.line.unwrap_or(0),
            pos: payload.pos.unwrap_or(0),
            code,
            term,
            class: class.name,
            message,
        }
    }
}

impl Default for ErrorTypeTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Structured error surfaced by the shell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Script line number
    pub line: i64,
    /// Column offset in the line
    pub pos: i64,
    /// Fully qualified error id
    pub code: String,
    /// Invocation name that raised the error
    pub term: String,
    /// Name of the class the code resolved to
    pub class: String,
    /// Rendered message
    pub message: String,
}

impl ErrorRecord {
    /// Whether the record resolved to the named class
    pub fn is(&self, class: &str) -> bool {
        self.class.eq_ignore_ascii_case(class)
    }

    /// Whether the code was not registered
    pub fn is_generic(&self) -> bool {
        self.is(GENERIC_ERROR_CLASS)
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (at <execution>:{}:{})",
            self.message, self.line, self.pos
        )
    }
}

impl std::error::Error for ErrorRecord {}

/// Classify a completed frame
///
/// A parsed error block always takes precedence. Without one, the last
/// parsed result block is the value, or `null` if there is none.
pub fn classify(frame: &str, table: &ErrorTypeTable) -> std::result::Result<Value, ErrorRecord> {
    let blocks = extract_blocks(frame);
    if let Some(payload) = blocks.error {
        return Err(table.record(&payload));
    }
    Ok(blocks.result.unwrap_or(Value::Null))
}
