//! Decoding log lines.
//!
//! A line looks like:
//!
//! ```json
//! {"key":"%...","value":{"previous":null,"author":"@...","sequence":1,"timestamp":1.5,"content":{}},"timestamp":2}
//! ```
//!
//! Only shape is checked.  Signatures, hashes, and sequence ordering are trusted as given.
use serde_json::{Map, Value};

use crate::MalformedRecord;

/// One decoded log record.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub key: String,
    pub sequence: i64,
    pub author: String,
    pub content: Value,
    /// When the author claims to have written the message.
    pub timestamp_asserted: f64,
    /// When the message was received by whoever exported the log, if they recorded it.
    pub timestamp_received: Option<f64>,
    /// Key of the author's previous message; `None` for the first message of a feed.
    pub previous: Option<String>,
}

impl Message {
    /// Whether this is the first message of its author's feed.
    pub fn is_chain_start(&self) -> bool {
        self.previous.is_none()
    }

    /// The `type` of the content, if the content is an object which has one.
    pub fn content_type(&self) -> Option<&str> {
        self.content.get("type").and_then(Value::as_str)
    }
}

/// Get a field which must be present and not null.
fn required<'a>(
    obj: &'a Map<String, Value>,
    name: &str,
    path: &'static str,
) -> Result<&'a Value, MalformedRecord> {
    match obj.get(name) {
        None | Some(Value::Null) => Err(MalformedRecord::MissingField(path)),
        Some(v) => Ok(v),
    }
}

/// Get a field which may be absent or null.
fn optional<'a>(obj: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    obj.get(name).filter(|v| !v.is_null())
}

fn as_string(v: &Value, path: &'static str) -> Result<String, MalformedRecord> {
    v.as_str()
        .map(str::to_string)
        .ok_or(MalformedRecord::WrongType {
            field: path,
            expected: "a string",
        })
}

fn as_number(v: &Value, path: &'static str) -> Result<f64, MalformedRecord> {
    v.as_f64().ok_or(MalformedRecord::WrongType {
        field: path,
        expected: "a number",
    })
}

/// Decode one line of the log.
pub fn decode(line: &str) -> Result<Message, MalformedRecord> {
    let record: Value = serde_json::from_str(line)?;
    let record = record.as_object().ok_or(MalformedRecord::NotAnObject)?;

    let key = as_string(required(record, "key", "key")?, "key")?;
    let value = required(record, "value", "value")?
        .as_object()
        .ok_or(MalformedRecord::WrongType {
            field: "value",
            expected: "an object",
        })?;

    let author = as_string(required(value, "author", "value.author")?, "value.author")?;
    let sequence = required(value, "sequence", "value.sequence")?
        .as_i64()
        .filter(|s| *s >= 1)
        .ok_or(MalformedRecord::WrongType {
            field: "value.sequence",
            expected: "a positive integer",
        })?;
    let content = required(value, "content", "value.content")?.clone();
    let timestamp_asserted = as_number(
        required(value, "timestamp", "value.timestamp")?,
        "value.timestamp",
    )?;

    let timestamp_received = optional(record, "timestamp")
        .map(|v| as_number(v, "timestamp"))
        .transpose()?;
    let previous = optional(value, "previous")
        .map(|v| as_string(v, "value.previous"))
        .transpose()?;

    Ok(Message {
        key,
        sequence,
        author,
        content,
        timestamp_asserted,
        timestamp_received,
        previous,
    })
}

/// Decode one line of the log given as raw bytes, which must be UTF-8.
pub fn decode_bytes(line: &[u8]) -> Result<Message, MalformedRecord> {
    let line = std::str::from_utf8(line).map_err(|_| MalformedRecord::NotUtf8)?;
    decode(line)
}
