//! Field-level codec between application documents and store-safe documents.
//!
//! The backing store only understands the JSON primitive set: null, booleans, numbers, strings
//! and arrays/objects made of those. Any field holding something else (dates, object ids, binary
//! data, decimals, non-finite doubles, ...) is replaced on the way in by a tagged string:
//!
//! ```text
//! {"$bson": {"$date": {"$numberLong": "1700000000000"}}}
//! ```
//!
//! The body is the value's canonical Extended JSON, so it decodes back to the exact BSON value.
//!
//! # Signature detection
//!
//! On the way out, a string field is decoded when it matches the signature
//! `^\{".+":\s.+\}`: an opening brace, a quoted marker, a colon, whitespace and a value. This is
//! a best-effort heuristic. A plain string that happens to look like `{"a": 1}` is decoded as a
//! sub-document in [`SignatureMode::Heuristic`]. [`SignatureMode::Tagged`] narrows decoding to
//! strings whose single key is the reserved [`TYPE_MARKER`].

use std::sync::LazyLock;

use bson::{Bson, Document};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::error::{AdapterError, AdapterResult};

/// Reserved key wrapping encoded values.
pub const TYPE_MARKER: &str = "$bson";

static SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\{".+":\s.+\}"#).expect("signature pattern is valid")
});

/// How aggressively string fields are recognized as encoded values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureMode {
    /// Any string matching the signature is decoded; foreign JSON objects become sub-documents.
    #[default]
    Heuristic,
    /// Only strings wrapped in the reserved [`TYPE_MARKER`] are decoded.
    Tagged,
}

/// Returns `true` if `value` survives a round-trip through the store's JSON primitive set.
pub fn is_native(value: &Bson) -> bool {
    match value {
        Bson::Null | Bson::Boolean(_) | Bson::Int32(_) | Bson::Int64(_) | Bson::String(_) => true,
        Bson::Double(number) => number.is_finite(),
        Bson::Array(items) => items.iter().all(is_native),
        Bson::Document(document) => document.values().all(is_native),
        _ => false,
    }
}

/// Serializes and unserializes documents field by field.
#[derive(Debug, Clone, Copy, Default)]
pub struct Codec {
    mode: SignatureMode,
}

impl Codec {
    /// Creates a codec using the given signature mode.
    pub fn new(mode: SignatureMode) -> Self {
        Self { mode }
    }

    /// Returns the signature mode of this codec.
    pub fn mode(&self) -> SignatureMode {
        self.mode
    }

    /// Converts a document into its store-safe form.
    ///
    /// Native fields are copied unchanged, every other field is replaced by its tagged encoding.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Serialization`] if a value cannot be rendered as Extended JSON.
    pub fn serialize(&self, document: &Document) -> AdapterResult<Document> {
        document
            .iter()
            .map(|(field, value)| Ok((field.clone(), self.encode_field(value)?)))
            .collect()
    }

    /// Like [`Codec::serialize`], for a value that is expected to be a document.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::UnsupportedDocument`] if `value` is not a document.
    pub fn serialize_value(&self, value: &Bson) -> AdapterResult<Document> {
        match value {
            Bson::Document(document) => self.serialize(document),
            other => Err(unsupported(other)),
        }
    }

    /// Restores a document from its store-safe form.
    pub fn unserialize(&self, document: &Document) -> Document {
        document
            .iter()
            .map(|(field, value)| (field.clone(), self.decode_field(value)))
            .collect()
    }

    /// Like [`Codec::unserialize`], for a value that is expected to be a document.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::UnsupportedDocument`] if `value` is not a document.
    pub fn unserialize_value(&self, value: &Bson) -> AdapterResult<Document> {
        match value {
            Bson::Document(document) => Ok(self.unserialize(document)),
            other => Err(unsupported(other)),
        }
    }

    /// Encodes a single field value.
    pub fn encode_field(&self, value: &Bson) -> AdapterResult<Bson> {
        if is_native(value) {
            return Ok(value.clone());
        }

        let body = serde_json::to_string(&value.clone().into_canonical_extjson())?;

        Ok(Bson::String(format!("{{\"{TYPE_MARKER}\": {body}}}")))
    }

    /// Decodes a single field value, passing it through when it carries no signature.
    pub fn decode_field(&self, value: &Bson) -> Bson {
        match value {
            Bson::String(text) if self.has_signature(text) => {
                self.decode_signed(text).unwrap_or_else(|| value.clone())
            }
            _ => value.clone(),
        }
    }

    /// Returns `true` if `text` looks like an encoded value.
    pub fn has_signature(&self, text: &str) -> bool {
        SIGNATURE.is_match(text)
    }

    fn decode_signed(&self, text: &str) -> Option<Bson> {
        let Value::Object(mut object) = serde_json::from_str::<Value>(text).ok()? else {
            return None;
        };

        if object.len() == 1 {
            if let Some(body) = object.remove(TYPE_MARKER) {
                return Bson::try_from(body).ok();
            }
        }

        match self.mode {
            SignatureMode::Tagged => None,
            SignatureMode::Heuristic => {
                trace!(value = text, "decoding untagged string with an object signature");
                Bson::try_from(Value::Object(object)).ok()
            }
        }
    }
}

fn unsupported(value: &Bson) -> AdapterError {
    AdapterError::UnsupportedDocument(format!(
        "{:?} is currently unsupported, expected a document",
        value.element_type()
    ))
}
