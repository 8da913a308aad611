//! Turning messages into `msgs` rows.
use feedidx_datastore::{MessageRow, Store};
use serde_json::Value;

use crate::Message;

/// The stored text form of message content: compact JSON with object keys sorted.
///
/// Numbers are written back exactly as they appeared in the log.
pub fn canonical_content(content: &Value) -> String {
    content.to_string()
}

/// Milliseconds since the Unix epoch, the unit the log uses for its timestamps.
pub fn now_millis() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

/// Build the row for a message.
///
/// Records which don't say when they were received get `received_at()` instead, so that every row says when it
/// entered some index.
pub fn message_row(message: &Message, received_at: impl FnOnce() -> f64) -> MessageRow {
    MessageRow {
        key: message.key.clone(),
        sequence: message.sequence,
        author: message.author.clone(),
        content: canonical_content(&message.content),
        timestamp_received: Some(message.timestamp_received.unwrap_or_else(received_at)),
        timestamp_asserted: message.timestamp_asserted,
    }
}

/// Upsert a message, replacing any earlier row with the same key.
pub fn write_message<S: Store + ?Sized>(
    store: &mut S,
    message: &Message,
) -> feedidx_datastore::Result<()> {
    store.upsert_message(&message_row(message, now_millis))
}
