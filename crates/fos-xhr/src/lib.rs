//! fOS XHR Proxy
//!
//! One XMLHttpRequest Level 2 style interface over native transports that
//! may only implement Level 1. On Level 1 hosts the proxy simulates
//! `loadstart`, `progress`, `load` and `loadend` from readystatechange and
//! coerces the text response into the requested `responseType`.
//!
//! ```ignore
//! let proxy = XhrProxy::new(transport);
//! proxy.set_response_type(ResponseType::Json);
//! proxy.on(EventKind::Load, Listener::new(|xhr, _| {
//!     println!("{:?}", xhr.response());
//! }));
//! proxy.open("GET", "https://example.com/data.json")?;
//! proxy.send(None)?;
//! ```

mod capability;
pub mod codec;
mod coerce;
mod config;
mod document;
mod error;
mod event;
mod proxy;
pub mod simulator;
mod transport;

pub use capability::CapabilityLevel;
pub use coerce::{ResponseBody, ResponseCoercer, ResponseSlot, ResponseType};
pub use config::{BINARY_MIME_TYPE, ProxyConfig};
#[cfg(feature = "html")]
pub use document::Html5everDocuments;
pub use document::{Document, DocumentFactory, MarkupNode};
pub use error::{CoerceError, TransportError, XhrError};
pub use event::{EventHub, EventKind, Forward, Listener, XhrEvent};
pub use proxy::{OpenOptions, ProxyBuilder, XhrProxy};
pub use transport::{
    Method, NativeCallback, NativeEvent, NativeEventTarget, NativeTransport, ReadyState, RequestBody,
};
