//! Native Transport Boundary
//!
//! The request object supplied by the host. The proxy owns exactly one
//! transport and drives it through this trait; everything else (sockets,
//! TLS, caching) lives on the host side.
//!
//! Methods take `&self`: native handles are host objects with interior
//! mutability, and they may deliver notifications synchronously from
//! inside `open`, `send` or `abort`.

use std::fmt;
use std::rc::Rc;

use crate::coerce::{ResponseBody, ResponseType};
use crate::document::Document;
use crate::error::TransportError;
use crate::event::EventKind;

/// XMLHttpRequest ready states
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum ReadyState {
    /// Client has been created, open() not called yet
    #[default]
    Unsent = 0,
    /// open() has been called
    Opened = 1,
    /// send() has been called, headers received
    HeadersReceived = 2,
    /// Downloading, responseText holds partial data
    Loading = 3,
    /// Operation complete
    Done = 4,
}

impl ReadyState {
    /// Numeric value as exposed by `readyState`
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Map a native readyState integer
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ReadyState::Unsent),
            1 => Some(ReadyState::Opened),
            2 => Some(ReadyState::HeadersReceived),
            3 => Some(ReadyState::Loading),
            4 => Some(ReadyState::Done),
            _ => None,
        }
    }
}

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
        }
    }

    /// Parse an exact, upper-case method token
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            "DELETE" => Some(Method::Delete),
            "HEAD" => Some(Method::Head),
            "OPTIONS" => Some(Method::Options),
            "PATCH" => Some(Method::Patch),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body handed to the native `send`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Text(String),
    Bytes(Vec<u8>),
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_string())
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        RequestBody::Bytes(bytes)
    }
}

/// Notification delivered by the native transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeEvent {
    pub kind: EventKind,
    /// Bytes received so far
    pub loaded: u64,
    /// Total bytes, when the length is known
    pub total: Option<u64>,
}

impl NativeEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            loaded: 0,
            total: None,
        }
    }

    pub fn progress(kind: EventKind, loaded: u64, total: Option<u64>) -> Self {
        Self { kind, loaded, total }
    }
}

/// Callback registered on the native side
pub type NativeCallback = Rc<dyn Fn(&NativeEvent)>;

/// Native event registration
///
/// Level 1 transports only need to deliver `readystatechange`; Level 2
/// transports deliver every [`EventKind`] they support.
pub trait NativeEventTarget {
    fn add_event_listener(&self, kind: EventKind, callback: NativeCallback);

    /// Remove a callback by identity (`Rc::ptr_eq`)
    fn remove_event_listener(&self, kind: EventKind, callback: &NativeCallback);
}

/// Host request object
pub trait NativeTransport: NativeEventTarget {
    /// Opaque upload target exposed through `upload`
    type Upload: Clone;

    /// Completion callback slot (`onload`) is present
    fn has_onload(&self) -> bool {
        false
    }

    /// `responseType` is a real, settable property
    fn has_response_type(&self) -> bool {
        false
    }

    /// `withCredentials` is supported
    fn has_with_credentials(&self) -> bool {
        false
    }

    fn open(
        &self,
        method: Method,
        url: &str,
        async_flag: bool,
        user: &str,
        password: &str,
    ) -> Result<(), TransportError>;

    fn send(&self, body: Option<RequestBody>) -> Result<(), TransportError>;

    fn abort(&self);

    fn ready_state(&self) -> ReadyState;

    fn status(&self) -> u16;

    fn status_text(&self) -> String;

    fn response_text(&self) -> String;

    fn override_mime_type(&self, mime: &str) -> Result<(), TransportError>;

    fn set_request_header(&self, name: &str, value: &str) -> Result<(), TransportError>;

    fn get_response_header(&self, name: &str) -> Option<String>;

    fn get_all_response_headers(&self) -> String;

    /// Parsed XML response, if the host builds one
    fn response_xml(&self) -> Option<Document> {
        None
    }

    /// Typed response produced by a Level 2 transport
    fn response(&self) -> Option<ResponseBody> {
        None
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::Text
    }

    fn set_response_type(&self, _response_type: ResponseType) {}

    fn with_credentials(&self) -> bool {
        false
    }

    fn set_with_credentials(&self, _with_credentials: bool) {}

    fn upload(&self) -> Option<Self::Upload> {
        None
    }

    fn set_upload(&self, _upload: Option<Self::Upload>) {}
}
