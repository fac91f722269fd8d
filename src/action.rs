//! # Actions: the events submitted to the engine.
//!
//! An [`Action`] is a small, immutable record of *what happened*. Its `type`
//! (stored in [`Action::kind`]) is the dispatch key renderers may filter on.
//!
//! Actions serialize with the conventional field names:
//! ```text
//! { "type": "File.append", "payload": {...}, "error": false, "meta": {...} }
//! ```
//!
//! ## Example
//! ```rust
//! use actionvisor::Action;
//! use serde_json::json;
//!
//! let action = Action::new("File.append")
//!     .with_payload(json!({ "fileName": "out.log", "content": "hello" }))
//!     .with_meta("push", json!(true));
//!
//! assert_eq!(action.kind, "File.append");
//! assert_eq!(action.meta_value("push"), Some(&json!(true)));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A discrete event submitted to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Dispatch key (`type` on the wire).
    #[serde(rename = "type")]
    pub kind: String,

    /// Arbitrary payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    /// Marks the action as describing a failure.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,

    /// Free-form metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

impl Action {
    /// Creates an action of the given type with no payload or metadata.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: None,
            error: false,
            meta: None,
        }
    }

    /// Attaches a payload.
    #[inline]
    pub fn with_payload(mut self, payload: impl Into<Value>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Marks the action as an error action.
    #[inline]
    pub fn as_error(mut self) -> Self {
        self.error = true;
        self
    }

    /// Adds a metadata entry, creating the map if needed.
    #[inline]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Returns a metadata value by key.
    pub fn meta_value(&self, key: &str) -> Option<&Value> {
        self.meta.as_ref().and_then(|m| m.get(key))
    }
}
