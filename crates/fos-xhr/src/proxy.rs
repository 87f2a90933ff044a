//! XHR Proxy
//!
//! Uniform XMLHttpRequest Level 2 object over a native transport of either
//! capability level. The proxy holds the transport; on Level 1 hosts it
//! also keeps the properties the transport lacks and simulates the Level 2
//! event sequence from readystatechange notifications.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::capability::{CapabilityLevel, NativeBinding};
use crate::coerce::{ResponseBody, ResponseCoercer, ResponseSlot, ResponseType};
use crate::config::ProxyConfig;
use crate::document::{self, Document, DocumentFactory};
use crate::error::{CoerceError, XhrError};
use crate::event::{EventHub, EventKind, Forward, Listener, XhrEvent};
use crate::simulator::{self, is_success};
use crate::transport::{Method, NativeCallback, NativeEvent, NativeTransport, ReadyState, RequestBody};

/// Optional `open()` arguments
#[derive(Debug, Clone, Copy)]
pub struct OpenOptions<'a> {
    pub async_flag: bool,
    pub user: &'a str,
    pub password: &'a str,
}

impl Default for OpenOptions<'_> {
    fn default() -> Self {
        Self {
            async_flag: true,
            user: "",
            password: "",
        }
    }
}

/// Properties a Level 1 transport does not carry itself
struct Shadow<U> {
    response_type: ResponseType,
    with_credentials: bool,
    upload: Option<U>,
    response: ResponseSlot,
}

impl<U> Default for Shadow<U> {
    fn default() -> Self {
        Self {
            response_type: ResponseType::Text,
            with_credentials: false,
            upload: None,
            response: ResponseSlot::Unset,
        }
    }
}

struct ProxyInner<T: NativeTransport> {
    transport: T,
    level: CapabilityLevel,
    config: ProxyConfig,
    coercer: ResponseCoercer,
    last_url: RefCell<String>,
    last_state: Cell<ReadyState>,
    hub: RefCell<EventHub<XhrProxy<T>>>,
    shadow: RefCell<Shadow<T::Upload>>,
    simulator: RefCell<Option<NativeCallback>>,
    /// Self handle held by `get` until `loadend`
    pending: RefCell<Option<XhrProxy<T>>>,
}

/// Request proxy handle
///
/// Clones share the same request. Dropping the last handle drops the
/// native transport with it.
pub struct XhrProxy<T: NativeTransport> {
    inner: Rc<ProxyInner<T>>,
}

impl<T: NativeTransport + 'static> XhrProxy<T> {
    /// Wrap a freshly created transport with the default configuration
    pub fn new(transport: T) -> Self {
        Self::with_parts(transport, ProxyConfig::default(), ResponseCoercer::new())
    }

    /// Start a builder for a non-default configuration
    pub fn builder(transport: T) -> ProxyBuilder<T> {
        ProxyBuilder::new(transport)
    }

    fn with_parts(transport: T, config: ProxyConfig, coercer: ResponseCoercer) -> Self {
        let level = CapabilityLevel::probe(&transport);
        Self {
            inner: Rc::new(ProxyInner {
                transport,
                level,
                config,
                coercer,
                last_url: RefCell::new(String::new()),
                last_state: Cell::new(ReadyState::Unsent),
                hub: RefCell::new(EventHub::new()),
                shadow: RefCell::new(Shadow::default()),
                simulator: RefCell::new(None),
                pending: RefCell::new(None),
            }),
        }
    }

    /// GET `url` and report the outcome once `load` fires.
    ///
    /// The request keeps itself alive until `loadend`, so the returned
    /// handle may be dropped. Level 1 hosts only fire `load` on success,
    /// so there the callback never sees an error. `url` must be absolute.
    pub fn get<F>(transport: T, url: &str, callback: F) -> Result<Self, XhrError>
    where
        F: Fn(Result<String, XhrError>, &Self) + 'static,
    {
        validate_url(url)?;
        let is_file = simulator::is_file_url(url);
        let proxy = Self::new(transport);
        *proxy.inner.pending.borrow_mut() = Some(proxy.clone());

        proxy.on(
            EventKind::Load,
            Listener::new(move |proxy: &Self, _| {
                let status = proxy.status();
                if is_success(status, is_file) {
                    callback(Ok(proxy.response_text()), proxy);
                } else {
                    callback(Err(XhrError::Status(status)), proxy);
                }
            }),
        );
        proxy.on(
            EventKind::LoadEnd,
            Listener::new(|proxy: &Self, _| proxy.release()),
        );
        if let Err(err) = proxy.open("GET", url).and_then(|()| proxy.send(None)) {
            proxy.release();
            return Err(err);
        }
        Ok(proxy)
    }

    /// Drop the self handle taken by `get`
    fn release(&self) {
        let pending = self.inner.pending.borrow_mut().take();
        if pending.is_some() {
            tracing::trace!("Releasing request {}", self.inner.last_url.borrow());
        }
    }

    /// 1 or 2
    pub fn level(&self) -> u8 {
        self.binding().level().as_number()
    }

    pub fn capability(&self) -> CapabilityLevel {
        self.inner.level
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.inner.config
    }

    /// The wrapped native transport
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    fn binding(&self) -> &'static dyn NativeBinding {
        self.inner.level.binding()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Open the request with default options.
    ///
    /// `url` must be absolute; relative references are rejected with
    /// `XhrError::InvalidUrl` since the proxy has no document base.
    pub fn open(&self, method: &str, url: &str) -> Result<(), XhrError> {
        self.open_with(method, url, OpenOptions::default())
    }

    /// Open the request with explicit async flag and credentials
    pub fn open_with(&self, method: &str, url: &str, options: OpenOptions<'_>) -> Result<(), XhrError> {
        self.expect_state("open", ReadyState::Unsent)?;
        let method = Method::parse(method)
            .filter(|m| self.inner.config.allows(*m))
            .ok_or_else(|| XhrError::UnsupportedMethod(method.to_string()))?;
        validate_url(url)?;

        *self.inner.last_url.borrow_mut() = url.to_string();
        self.inner.last_state.set(ReadyState::Unsent);
        self.attach_simulator();

        tracing::debug!("XHR open {} {} (level {})", method, url, self.level());
        if let Err(err) = self.inner.transport.open(
            method,
            url,
            options.async_flag,
            options.user,
            options.password,
        ) {
            self.detach_simulator();
            return Err(err.into());
        }
        Ok(())
    }

    /// Send the request
    pub fn send(&self, body: Option<RequestBody>) -> Result<(), XhrError> {
        self.expect_state("send", ReadyState::Opened)?;

        if self.binding().needs_binary_override() && self.response_type().is_binary() {
            tracing::debug!("Binary response on level 1 transport, overriding MIME type");
            self.inner
                .transport
                .override_mime_type(&self.inner.config.binary_mime_type)?;
        }

        tracing::debug!("XHR send {}", self.inner.last_url.borrow());
        self.inner.transport.send(body)?;
        Ok(())
    }

    /// Pending native notifications are still processed after abort
    pub fn abort(&self) {
        tracing::debug!("XHR abort {}", self.inner.last_url.borrow());
        self.inner.transport.abort();
    }

    fn expect_state(&self, operation: &'static str, expected: ReadyState) -> Result<(), XhrError> {
        let found = self.inner.transport.ready_state();
        if found != expected {
            return Err(XhrError::InvalidState {
                operation,
                expected,
                found,
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Headers
    // ------------------------------------------------------------------

    /// Get all response headers as raw `name: value` lines
    pub fn get_all_response_headers(&self) -> String {
        self.inner.transport.get_all_response_headers()
    }

    /// Get a response header
    pub fn get_response_header(&self, name: &str) -> Option<String> {
        self.inner.transport.get_response_header(name)
    }

    /// Set a request header
    pub fn set_request_header(&self, name: &str, value: &str) -> Result<(), XhrError> {
        Ok(self.inner.transport.set_request_header(name, value)?)
    }

    /// Override the response MIME type
    pub fn override_mime_type(&self, mime: &str) -> Result<(), XhrError> {
        Ok(self.inner.transport.override_mime_type(mime)?)
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    pub fn ready_state(&self) -> ReadyState {
        self.inner.transport.ready_state()
    }

    /// Typed response; on Level 1 this is the value coerced at completion
    pub fn response(&self) -> Option<ResponseBody> {
        match self.inner.level {
            CapabilityLevel::Level1 => self.inner.shadow.borrow().response.body().cloned(),
            CapabilityLevel::Level2 => self.inner.transport.response(),
        }
    }

    /// Response together with the coercion outcome
    pub fn response_slot(&self) -> ResponseSlot {
        match self.inner.level {
            CapabilityLevel::Level1 => self.inner.shadow.borrow().response.clone(),
            CapabilityLevel::Level2 => self
                .inner
                .transport
                .response()
                .map(ResponseSlot::Ready)
                .unwrap_or_default(),
        }
    }

    pub fn response_text(&self) -> String {
        self.inner.transport.response_text()
    }

    pub fn response_type(&self) -> ResponseType {
        match self.inner.level {
            CapabilityLevel::Level1 => self.inner.shadow.borrow().response_type,
            CapabilityLevel::Level2 => self.inner.transport.response_type(),
        }
    }

    /// Must be set before the request completes
    pub fn set_response_type(&self, response_type: ResponseType) {
        match self.inner.level {
            CapabilityLevel::Level1 => self.inner.shadow.borrow_mut().response_type = response_type,
            CapabilityLevel::Level2 => self.inner.transport.set_response_type(response_type),
        }
    }

    pub fn response_xml(&self) -> Option<Document> {
        self.inner.transport.response_xml()
    }

    pub fn status(&self) -> u16 {
        self.inner.transport.status()
    }

    pub fn status_text(&self) -> String {
        self.inner.transport.status_text()
    }

    pub fn upload(&self) -> Option<T::Upload> {
        match self.inner.level {
            CapabilityLevel::Level1 => self.inner.shadow.borrow().upload.clone(),
            CapabilityLevel::Level2 => self.inner.transport.upload(),
        }
    }

    pub fn set_upload(&self, upload: Option<T::Upload>) {
        match self.inner.level {
            CapabilityLevel::Level1 => self.inner.shadow.borrow_mut().upload = upload,
            CapabilityLevel::Level2 => self.inner.transport.set_upload(upload),
        }
    }

    pub fn with_credentials(&self) -> bool {
        match self.inner.level {
            CapabilityLevel::Level1 => self.inner.shadow.borrow().with_credentials,
            CapabilityLevel::Level2 => self.inner.transport.with_credentials(),
        }
    }

    pub fn set_with_credentials(&self, with_credentials: bool) {
        match self.inner.level {
            CapabilityLevel::Level1 => self.inner.shadow.borrow_mut().with_credentials = with_credentials,
            CapabilityLevel::Level2 => self.inner.transport.set_with_credentials(with_credentials),
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn add_event_listener(&self, kind: EventKind, listener: Listener<Self>) -> &Self {
        let forward = self
            .binding()
            .native_target(&self.inner.transport)
            .map(|target| Forward {
                target,
                callback: self.bridge(kind, &listener),
            });
        self.inner.hub.borrow_mut().add(forward, kind, listener);
        self
    }

    pub fn remove_event_listener(&self, kind: EventKind, listener: &Listener<Self>) -> &Self {
        let target = self.binding().native_target(&self.inner.transport);
        self.inner.hub.borrow_mut().remove(target, kind, listener);
        self
    }

    pub fn clear_event_listener(&self) -> &Self {
        let target = self.binding().native_target(&self.inner.transport);
        self.inner.hub.borrow_mut().clear(target);
        self
    }

    pub fn on(&self, kind: EventKind, listener: Listener<Self>) -> &Self {
        self.add_event_listener(kind, listener)
    }

    pub fn off(&self, kind: EventKind, listener: &Listener<Self>) -> &Self {
        self.remove_event_listener(kind, listener)
    }

    /// `on` with an event name such as `"loadend"`
    pub fn on_named(&self, kind: &str, listener: Listener<Self>) -> Result<&Self, XhrError> {
        Ok(self.add_event_listener(kind.parse()?, listener))
    }

    /// `off` with an event name
    pub fn off_named(&self, kind: &str, listener: &Listener<Self>) -> Result<&Self, XhrError> {
        Ok(self.remove_event_listener(kind.parse()?, listener))
    }

    pub fn has_listeners(&self, kind: EventKind) -> bool {
        self.inner.hub.borrow().has(kind)
    }

    /// Native callback delivering `kind` to `listener` through this proxy
    fn bridge(&self, kind: EventKind, listener: &Listener<Self>) -> NativeCallback {
        let weak = Rc::downgrade(&self.inner);
        let listener = listener.clone();
        Rc::new(move |event: &NativeEvent| {
            if let Some(inner) = weak.upgrade() {
                listener.call(&XhrProxy { inner }, &XhrEvent::new(kind, event.clone()));
            }
        })
    }

    // ------------------------------------------------------------------
    // Simulation
    // ------------------------------------------------------------------

    fn attach_simulator(&self) {
        let weak = Rc::downgrade(&self.inner);
        let callback: NativeCallback = Rc::new(move |event: &NativeEvent| {
            if let Some(inner) = weak.upgrade() {
                XhrProxy { inner }.handle_event(event);
            }
        });
        let attached = self.binding().attach_simulator(&self.inner.transport, callback);
        *self.inner.simulator.borrow_mut() = attached;
    }

    fn detach_simulator(&self) {
        let simulator = self.inner.simulator.borrow_mut().take();
        if let Some(simulator) = simulator {
            self.binding().detach_simulator(&self.inner.transport, &simulator);
        }
    }

    /// Simulate Level 2 events for one readystatechange notification
    pub fn handle_event(&self, event: &NativeEvent) {
        let current = self.inner.transport.ready_state();
        let status = self.inner.transport.status();
        let last = self.inner.last_state.get();

        let step = simulator::step(last, current, status, self.is_file_request());
        self.inner.last_state.set(step.observed);

        for kind in step.events {
            if kind == EventKind::Load {
                self.store_response();
            }
            self.fire(kind, event);
        }
        if step.complete {
            self.detach_simulator();
        }
    }

    /// Coerce the response; parse failures leave it unset
    fn store_response(&self) {
        let text = self.inner.transport.response_text();
        let slot = match self.inner.coercer.coerce(&text, self.response_type()) {
            Ok(body) => ResponseSlot::Ready(body),
            Err(err) => {
                tracing::debug!("Response coercion failed, response left unset: {}", err);
                ResponseSlot::CoercionFailed(err)
            }
        };
        self.inner.shadow.borrow_mut().response = slot;
    }

    /// Listeners run in order with no isolation; a panic stops the rest
    fn fire(&self, kind: EventKind, source: &NativeEvent) {
        let listeners = self.inner.hub.borrow().get(kind);
        if listeners.is_empty() {
            return;
        }
        tracing::trace!("Simulated {} for {} listener(s)", kind, listeners.len());
        let event = XhrEvent::new(kind, source.clone());
        for listener in listeners {
            listener.call(self, &event);
        }
    }

    fn is_file_request(&self) -> bool {
        simulator::is_file_url(&self.inner.last_url.borrow())
    }

    /// Re-run classification and coercion without touching any state.
    ///
    /// Returns empty text until the request completed successfully.
    pub fn convert(&self) -> Result<ResponseBody, CoerceError> {
        let transport = &self.inner.transport;
        if transport.ready_state() == ReadyState::Done
            && is_success(transport.status(), self.is_file_request())
        {
            return self
                .inner
                .coercer
                .coerce(&transport.response_text(), self.response_type());
        }
        Ok(ResponseBody::Text(String::new()))
    }
}

impl<T: NativeTransport> Clone for XhrProxy<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: NativeTransport> fmt::Debug for XhrProxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XhrProxy")
            .field("level", &self.inner.level)
            .field("url", &self.inner.last_url.borrow())
            .field("last_state", &self.inner.last_state.get())
            .finish()
    }
}

fn validate_url(url: &str) -> Result<(), XhrError> {
    url::Url::parse(url)
        .map(|_| ())
        .map_err(|err| XhrError::InvalidUrl(format!("{url}: {err}")))
}

/// Proxy builder
pub struct ProxyBuilder<T> {
    transport: T,
    config: ProxyConfig,
    documents: Option<Rc<dyn DocumentFactory>>,
}

impl<T: NativeTransport + 'static> ProxyBuilder<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            config: ProxyConfig::default(),
            documents: None,
        }
    }

    pub fn config(mut self, config: ProxyConfig) -> Self {
        self.config = config;
        self
    }

    pub fn allow_method(mut self, method: Method) -> Self {
        if !self.config.allows(method) {
            self.config.allowed_methods.push(method);
        }
        self
    }

    pub fn binary_mime_type(mut self, mime: &str) -> Self {
        self.config.binary_mime_type = mime.to_string();
        self
    }

    pub fn parse_documents(mut self, enabled: bool) -> Self {
        self.config.parse_documents = enabled;
        self
    }

    /// Replace the built-in document construction
    pub fn document_factory(mut self, factory: impl DocumentFactory + 'static) -> Self {
        self.documents = Some(Rc::new(factory));
        self
    }

    pub fn build(self) -> XhrProxy<T> {
        let documents = if self.config.parse_documents {
            self.documents.or_else(document::default_factory)
        } else {
            None
        };
        XhrProxy::with_parts(
            self.transport,
            self.config,
            ResponseCoercer::with_documents(documents),
        )
    }
}
