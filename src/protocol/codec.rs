//! Marker Protocol Codec
//!
//! Finds the delimiter-wrapped JSON blocks inside a completed frame. Frames
//! can contain echoed input or diagnostics that happen to look like a block,
//! so candidates are tried from the last one backwards and the first one that
//! parses wins.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ERROR_MARKER_CLOSE, ERROR_MARKER_OPEN, RESULT_MARKER};

/// Raw error record as written by the bootstrap's `Out-Error`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorPayload {
    /// Fully qualified error id
    pub code: Option<String>,
    /// Invocation name that raised the error
    pub term: Option<String>,
    /// Script line number
    pub line: Option<i64>,
    /// Column offset in the line
    pub pos: Option<i64>,
}

/// Blocks decoded from one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Blocks {
    /// Last well-formed result block
    pub result: Option<Value>,
    /// Last well-formed error block
    pub error: Option<ErrorPayload>,
}

/// Encode a value as a result block, the way the bootstrap does
pub fn encode_result(value: &Value) -> String {
    format!("{RESULT_MARKER}{value}{RESULT_MARKER}")
}

/// Encode an error payload as an error block, the way the bootstrap does
pub fn encode_error(payload: &ErrorPayload) -> String {
    let json = serde_json::json!({
        "code": payload.code,
        "term": payload.term,
        "line": payload.line,
        "pos": payload.pos,
    });
    format!("{ERROR_MARKER_OPEN}{json}{ERROR_MARKER_CLOSE}")
}

/// Decode the last well-formed result and error blocks of a frame
pub fn extract_blocks(frame: &str) -> Blocks {
    Blocks {
        result: last_parsed(frame, RESULT_MARKER, RESULT_MARKER),
        error: last_parsed(frame, ERROR_MARKER_OPEN, ERROR_MARKER_CLOSE),
    }
}

/// Walk closing delimiters from the end of the frame, pairing each with the
/// nearest opener before it, so a stray earlier opener never pairs with a
/// later block.
fn last_parsed<T: serde::de::DeserializeOwned>(frame: &str, open: &str, close: &str) -> Option<T> {
    let mut end = frame.len();
    while let Some(close_at) = frame[..end].rfind(close) {
        if let Some(open_at) = frame[..close_at].rfind(open) {
            let body = &frame[open_at + open.len()..close_at];
            let cleaned: String = body.chars().filter(|c| *c != '\r' && *c != '\n').collect();
            if let Ok(parsed) = serde_json::from_str(&cleaned) {
                return Some(parsed);
            }
        }
        end = close_at;
    }
    None
}
