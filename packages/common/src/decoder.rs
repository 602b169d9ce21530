//! Extracts the logical document id from each message's serialized payload.
//!
//! Payloads are JSON objects describing a document mutation; the id lives at
//! `after._id`. Each message decodes independently, so one malformed payload
//! never prevents the others from resolving.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::attempt::Message;

/// Maximum number of characters of a payload kept in a [`DecodeFailure`].
pub const PAYLOAD_SNIPPET_CHARS: usize = 100;

/// message id -> document id
pub type DocumentIdMap = HashMap<String, String>;

/// A message whose payload could not yield a document id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecodeFailure {
    /// Message id.
    pub id: String,
    pub error: String,
    pub payload_snippet: String,
}

/// Result of decoding a batch of messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeReport {
    pub document_ids: DocumentIdMap,
    pub failures: Vec<DecodeFailure>,
}

/// Decode every message with a non-empty payload.
///
/// Messages without a payload appear in neither output.
pub fn decode_documents(messages: &[Message]) -> DecodeReport {
    let mut report = DecodeReport::default();

    for message in messages {
        let Some(payload) = message.payload.as_deref().filter(|p| !p.is_empty()) else {
            continue;
        };

        match extract_document_id(payload) {
            Ok(document_id) => {
                report
                    .document_ids
                    .insert(message.id.clone(), document_id);
            }
            Err(error) => {
                debug!(message_id = %message.id, %error, "Failed to decode message payload");
                report.failures.push(DecodeFailure {
                    id: message.id.clone(),
                    error,
                    payload_snippet: snippet(payload),
                });
            }
        }
    }

    report
}

fn extract_document_id(payload: &str) -> Result<String, String> {
    let value: Value =
        serde_json::from_str(payload).map_err(|e| format!("Invalid payload JSON: {e}"))?;

    value
        .get("after")
        .and_then(|after| after.get("_id"))
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| "Payload has no after._id".to_string())
}

fn snippet(payload: &str) -> String {
    payload.chars().take(PAYLOAD_SNIPPET_CHARS).collect()
}
