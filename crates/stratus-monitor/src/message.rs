//! Boundary validation of inbound display messages.
//!
//! Producers send arbitrary JSON documents. Rather than letting untyped
//! shapes leak through the monitor, each document is classified exactly
//! once, here, into the kinds the display knows how to present, with a raw
//! fallback for everything else.

use serde::Deserialize;
use serde_json::Value;
use stratus_comms::Document;

/// A validated inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorMessage {
    /// Free text destined for the display, either a bare JSON string or a
    /// `{"text": ...}` document.
    Text(String),
    /// A sensing sample document.
    Sample(SampleMessage),
    /// Any other document, carried through untouched.
    Raw(Document),
}

/// The sample shape produced by the sensing daemons.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SampleMessage {
    /// Recording timestamp, ISO 8601.
    pub rec: String,
    /// Optional device tag.
    #[serde(default)]
    pub tag: Option<String>,
    /// Named sensor values.
    pub val: serde_json::Map<String, Value>,
}

impl MonitorMessage {
    /// Classifies a decoded document into a display message kind.
    #[must_use]
    pub fn from_document(document: Document) -> Self {
        if let Value::String(text) = document {
            return Self::Text(text);
        }
        if let Value::Object(map) = &document {
            if map.len() == 1
                && let Some(Value::String(text)) = map.get("text")
            {
                return Self::Text(text.clone());
            }
            if map.contains_key("rec")
                && map.contains_key("val")
                && let Ok(sample) = serde_json::from_value::<SampleMessage>(document.clone())
            {
                return Self::Sample(sample);
            }
        }
        Self::Raw(document)
    }

    /// One display line summarising the message.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Sample(sample) => match &sample.tag {
                Some(tag) => format!("{} {} ({} values)", sample.rec, tag, sample.val.len()),
                None => format!("{} ({} values)", sample.rec, sample.val.len()),
            },
            Self::Raw(document) => serde_json::to_string(document).unwrap_or_default(),
        }
    }
}
