//! Response coercion
//!
//! Converts the raw response text into the representation selected by
//! `responseType`. Only runs once a request has completed successfully.

use std::fmt;
use std::rc::Rc;

use crate::codec::binary_string_to_bytes;
use crate::document::{self, Document, DocumentFactory};
use crate::error::CoerceError;

/// Response types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResponseType {
    #[default]
    Text,
    ArrayBuffer,
    Blob,
    Document,
    Json,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Text => "",
            ResponseType::ArrayBuffer => "arraybuffer",
            ResponseType::Blob => "blob",
            ResponseType::Document => "document",
            ResponseType::Json => "json",
        }
    }

    /// Binary payloads need the single-byte text workaround on Level 1
    pub fn is_binary(&self) -> bool {
        matches!(self, ResponseType::ArrayBuffer | ResponseType::Blob)
    }
}

/// Unrecognized names fall back to `Text`
impl From<&str> for ResponseType {
    fn from(s: &str) -> Self {
        match s {
            "arraybuffer" => ResponseType::ArrayBuffer,
            "blob" => ResponseType::Blob,
            "document" => ResponseType::Document,
            "json" => ResponseType::Json,
            _ => ResponseType::Text,
        }
    }
}

/// Coerced response value
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Text(String),
    Json(serde_json::Value),
    Document(Document),
    Bytes(Vec<u8>),
}

impl ResponseBody {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ResponseBody::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            ResponseBody::Document(doc) => Some(doc),
            _ => None,
        }
    }
}

/// Outcome of the coercion performed at completion
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResponseSlot {
    /// Not completed, not successful, or not simulated
    #[default]
    Unset,
    Ready(ResponseBody),
    /// Coercion failed; `load` still fired and the response stays unset
    CoercionFailed(CoerceError),
}

impl ResponseSlot {
    pub fn body(&self) -> Option<&ResponseBody> {
        match self {
            ResponseSlot::Ready(body) => Some(body),
            _ => None,
        }
    }
}

/// Text to typed response converter
#[derive(Clone)]
pub struct ResponseCoercer {
    documents: Option<Rc<dyn DocumentFactory>>,
}

impl ResponseCoercer {
    /// Coercer using the built-in document factory, if compiled in
    pub fn new() -> Self {
        Self {
            documents: document::default_factory(),
        }
    }

    /// Coercer with an explicit document factory (`None` disables documents)
    pub fn with_documents(documents: Option<Rc<dyn DocumentFactory>>) -> Self {
        Self { documents }
    }

    pub fn has_documents(&self) -> bool {
        self.documents.is_some()
    }

    pub fn coerce(&self, text: &str, response_type: ResponseType) -> Result<ResponseBody, CoerceError> {
        match response_type {
            ResponseType::Json => Ok(ResponseBody::Json(serde_json::from_str(text)?)),
            ResponseType::Document => Ok(self.document(text)),
            ResponseType::ArrayBuffer | ResponseType::Blob => {
                Ok(ResponseBody::Bytes(binary_string_to_bytes(text)))
            }
            ResponseType::Text => Ok(ResponseBody::Text(text.to_string())),
        }
    }

    fn document(&self, text: &str) -> ResponseBody {
        self.documents
            .as_ref()
            .and_then(|factory| factory.create(text))
            .map(ResponseBody::Document)
            .unwrap_or_else(|| ResponseBody::Text(text.to_string()))
    }
}

impl Default for ResponseCoercer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ResponseCoercer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCoercer")
            .field("documents", &self.has_documents())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MarkupNode;
    use serde_json::json;

    struct FixedDocuments;

    impl DocumentFactory for FixedDocuments {
        fn create(&self, markup: &str) -> Option<Document> {
            Some(Document {
                children: vec![MarkupNode::Text(markup.to_uppercase())],
            })
        }
    }

    #[test]
    fn test_response_type_names() {
        assert_eq!(ResponseType::from("json"), ResponseType::Json);
        assert_eq!(ResponseType::from("arraybuffer"), ResponseType::ArrayBuffer);
        assert_eq!(ResponseType::from(""), ResponseType::Text);
        assert_eq!(ResponseType::from("moz-chunked-text"), ResponseType::Text);
        assert!(ResponseType::Blob.is_binary());
        assert!(!ResponseType::Document.is_binary());
    }

    #[test]
    fn test_coerce_text() {
        let coercer = ResponseCoercer::with_documents(None);
        let body = coercer.coerce("plain", ResponseType::Text).unwrap();
        assert_eq!(body.as_text(), Some("plain"));
    }

    #[test]
    fn test_coerce_json() {
        let coercer = ResponseCoercer::with_documents(None);
        let body = coercer
            .coerce(r#"{"name": "fos", "ids": [1, 2]}"#, ResponseType::Json)
            .unwrap();
        assert_eq!(body.as_json(), Some(&json!({"name": "fos", "ids": [1, 2]})));
    }

    #[test]
    fn test_coerce_json_malformed() {
        let coercer = ResponseCoercer::with_documents(None);
        let err = coercer.coerce("{not json", ResponseType::Json).unwrap_err();
        assert!(matches!(err, CoerceError::Json(_)));
    }

    #[test]
    fn test_coerce_binary() {
        let coercer = ResponseCoercer::with_documents(None);
        for ty in [ResponseType::ArrayBuffer, ResponseType::Blob] {
            let body = coercer.coerce("AB\u{F7FF}", ty).unwrap();
            assert_eq!(body.as_bytes(), Some(&[0x41, 0x42, 0xFF][..]));
        }
    }

    #[test]
    fn test_coerce_document_without_factory() {
        let coercer = ResponseCoercer::with_documents(None);
        let body = coercer.coerce("<b>x</b>", ResponseType::Document).unwrap();
        assert_eq!(body, ResponseBody::Text("<b>x</b>".into()));
    }

    #[test]
    fn test_coerce_document_with_factory() {
        let coercer = ResponseCoercer::with_documents(Some(Rc::new(FixedDocuments)));
        let body = coercer.coerce("<b>x</b>", ResponseType::Document).unwrap();
        assert_eq!(body.as_document().unwrap().text_content(), "<B>X</B>");
    }

    #[test]
    fn test_slot_body() {
        assert!(ResponseSlot::Unset.body().is_none());
        let failed = ResponseSlot::CoercionFailed(CoerceError::Json("eof".into()));
        assert!(failed.body().is_none());
        let ready = ResponseSlot::Ready(ResponseBody::Text("a".into()));
        assert_eq!(ready.body(), Some(&ResponseBody::Text("a".into())));
    }
}
