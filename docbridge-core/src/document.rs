//! Document keys and key resolution.
//!
//! Documents are plain [`bson::Document`] values. The reserved [`KEY_FIELD`] holds the key that
//! uniquely identifies a document within its collection. Operations that address a single
//! document accept a [`KeyRef`], which names the key explicitly, borrows it from another
//! document, or reads it from the document being written.

use bson::{Bson, Document};

use crate::error::{AdapterError, AdapterResult};

/// Name of the reserved field holding a document's key.
pub const KEY_FIELD: &str = "_key";

/// Where the key of a single-document operation comes from.
///
/// String-like values and BSON values convert into [`KeyRef::Value`], documents convert into
/// [`KeyRef::Document`].
///
/// # Example
///
/// ```ignore
/// collection.write("k1", doc! { "v": 1 }).await?;
/// collection.write(KeyRef::Inline, doc! { "_key": "k1", "v": 2 }).await?;
/// assert!(collection.contains(doc! { "_key": "k1" }).await?);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum KeyRef {
    /// Use the `_key` field of the document being written.
    Inline,
    /// An explicit key. Must be a string to resolve.
    Value(Bson),
    /// Use the `_key` field of another document.
    Document(Document),
}

impl KeyRef {
    /// Resolves the effective key.
    ///
    /// `document` is the document being written, if any; it is only consulted for
    /// [`KeyRef::Inline`].
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidKey`] if no key can be found or the key is not a string.
    pub fn resolve(&self, document: Option<&Document>) -> AdapterResult<String> {
        match self {
            KeyRef::Value(Bson::String(key)) => Ok(key.clone()),
            KeyRef::Value(other) => Err(AdapterError::InvalidKey(format!(
                "Document \"{KEY_FIELD}\" must be a string, not {:?}",
                other.element_type()
            ))),
            KeyRef::Document(source) => document_key(source),
            KeyRef::Inline => match document {
                Some(document) => document_key(document),
                None => Err(AdapterError::InvalidKey(
                    "No key given and no document to read it from".to_string(),
                )),
            },
        }
    }
}

/// Reads the `_key` field of a document.
///
/// # Errors
///
/// Returns [`AdapterError::InvalidKey`] if the field is missing or is not a string.
pub fn document_key(document: &Document) -> AdapterResult<String> {
    match document.get(KEY_FIELD) {
        Some(Bson::String(key)) => Ok(key.clone()),
        Some(other) => Err(AdapterError::InvalidKey(format!(
            "Document \"{KEY_FIELD}\" must be a string, not {:?}",
            other.element_type()
        ))),
        None => Err(AdapterError::InvalidKey(format!(
            "Document has no \"{KEY_FIELD}\" field"
        ))),
    }
}

impl From<&str> for KeyRef {
    fn from(key: &str) -> Self {
        KeyRef::Value(Bson::String(key.to_string()))
    }
}

impl From<String> for KeyRef {
    fn from(key: String) -> Self {
        KeyRef::Value(Bson::String(key))
    }
}

impl From<&String> for KeyRef {
    fn from(key: &String) -> Self {
        KeyRef::Value(Bson::String(key.clone()))
    }
}

impl From<Bson> for KeyRef {
    fn from(key: Bson) -> Self {
        match key {
            Bson::Document(document) => KeyRef::Document(document),
            other => KeyRef::Value(other),
        }
    }
}

impl From<Document> for KeyRef {
    fn from(document: Document) -> Self {
        KeyRef::Document(document)
    }
}

impl From<&Document> for KeyRef {
    fn from(document: &Document) -> Self {
        KeyRef::Document(document.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn explicit_string_key_wins_over_document() {
        let document = doc! { "_key": "inner" };
        let key = KeyRef::from("outer").resolve(Some(&document)).unwrap();

        assert_eq!(key, "outer");
    }

    #[test]
    fn key_is_borrowed_from_another_document() {
        let key = KeyRef::from(doc! { "_key": "k1", "other": 1 })
            .resolve(None)
            .unwrap();

        assert_eq!(key, "k1");
    }

    #[test]
    fn inline_key_reads_the_written_document() {
        let document = doc! { "_key": "k2" };

        assert_eq!(KeyRef::Inline.resolve(Some(&document)).unwrap(), "k2");
        assert!(matches!(
            KeyRef::Inline.resolve(None),
            Err(AdapterError::InvalidKey(_))
        ));
    }

    #[test]
    fn non_string_keys_are_rejected() {
        assert!(matches!(
            KeyRef::from(Bson::Int32(5)).resolve(None),
            Err(AdapterError::InvalidKey(_))
        ));
        assert!(matches!(
            document_key(&doc! { "_key": 5 }),
            Err(AdapterError::InvalidKey(_))
        ));
        assert!(matches!(
            document_key(&doc! { "name": "no key" }),
            Err(AdapterError::InvalidKey(_))
        ));
    }
}
