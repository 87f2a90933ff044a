//! Proxy Configuration

use serde::{Deserialize, Serialize};

use crate::transport::Method;

/// MIME override that makes text transports pass bytes through unchanged
pub const BINARY_MIME_TYPE: &str = "text/plain; charset=x-user-defined";

/// Proxy configuration options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Methods accepted by `open()`
    pub allowed_methods: Vec<Method>,

    /// MIME type forced on Level 1 transports for binary responses
    pub binary_mime_type: String,

    /// Build documents for `document` responses (falls back to text when off)
    pub parse_documents: bool,
}

impl ProxyConfig {
    pub fn allows(&self, method: Method) -> bool {
        self.allowed_methods.contains(&method)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            allowed_methods: vec![Method::Get, Method::Post],
            binary_mime_type: BINARY_MIME_TYPE.to_string(),
            parse_documents: true,
        }
    }
}
