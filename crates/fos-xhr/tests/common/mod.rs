//! Scripted in-memory transport for integration tests.
//!
//! Clones share state, so a test keeps one clone as the "host" side and
//! hands the other to the proxy. Notifications are delivered synchronously,
//! as a browser XHR does from inside `open()`.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use fos_xhr::{
    EventKind, Method, NativeCallback, NativeEvent, NativeEventTarget, NativeTransport, ReadyState,
    RequestBody, ResponseBody, ResponseType, TransportError,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Default)]
struct MockState {
    level2: bool,
    ready_state: ReadyState,
    status: u16,
    status_text: String,
    response_text: String,
    response_type: ResponseType,
    with_credentials: bool,
    upload: Option<&'static str>,
    request_headers: Vec<(String, String)>,
    response_headers: BTreeMap<String, String>,
    listeners: Vec<(EventKind, NativeCallback)>,
    /// Native calls in order: "open GET url", "override text/plain", "send", ...
    calls: Vec<String>,
    sent_body: Option<RequestBody>,
}

#[derive(Clone)]
pub struct MockTransport {
    state: Rc<RefCell<MockState>>,
}

impl MockTransport {
    pub fn level1() -> Self {
        Self {
            state: Rc::new(RefCell::new(MockState::default())),
        }
    }

    pub fn level2() -> Self {
        let mock = Self::level1();
        mock.state.borrow_mut().level2 = true;
        mock
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub fn sent_body(&self) -> Option<RequestBody> {
        self.state.borrow().sent_body.clone()
    }

    pub fn request_headers(&self) -> Vec<(String, String)> {
        self.state.borrow().request_headers.clone()
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.state
            .borrow()
            .listeners
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    /// Live handles on the shared state, this one included
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.state)
    }

    pub fn set_response_header(&self, name: &str, value: &str) {
        self.state
            .borrow_mut()
            .response_headers
            .insert(name.to_string(), value.to_string());
    }

    /// Move to `state` and deliver what the native object would
    pub fn advance(&self, state: ReadyState) {
        let level2 = {
            let mut s = self.state.borrow_mut();
            s.ready_state = state;
            s.level2
        };
        self.dispatch(NativeEvent::new(EventKind::ReadyStateChange));
        if level2 {
            match state {
                ReadyState::Loading => self.dispatch(NativeEvent::new(EventKind::Progress)),
                ReadyState::Done => {
                    self.dispatch(NativeEvent::new(EventKind::Load));
                    self.dispatch(NativeEvent::new(EventKind::LoadEnd));
                }
                _ => {}
            }
        }
    }

    /// Headers, one body chunk, done
    pub fn respond(&self, status: u16, text: &str) {
        self.set_status(status);
        self.advance(ReadyState::HeadersReceived);
        self.state.borrow_mut().response_text = text.to_string();
        self.advance(ReadyState::Loading);
        self.finish(status, text);
    }

    /// Complete with the given status and body
    pub fn finish(&self, status: u16, text: &str) {
        self.set_status(status);
        self.state.borrow_mut().response_text = text.to_string();
        self.advance(ReadyState::Done);
    }

    fn set_status(&self, status: u16) {
        let mut s = self.state.borrow_mut();
        s.status = status;
        s.status_text = reason(status).to_string();
    }

    /// Network failure as a Level 2 object reports it
    pub fn fail(&self, kind: EventKind) {
        {
            let mut s = self.state.borrow_mut();
            s.status = 0;
            s.ready_state = ReadyState::Done;
        }
        self.dispatch(NativeEvent::new(EventKind::ReadyStateChange));
        if self.state.borrow().level2 {
            self.dispatch(NativeEvent::new(kind));
            self.dispatch(NativeEvent::new(EventKind::LoadEnd));
        }
    }

    pub fn dispatch(&self, event: NativeEvent) {
        let callbacks: Vec<NativeCallback> = self
            .state
            .borrow()
            .listeners
            .iter()
            .filter(|(kind, _)| *kind == event.kind)
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(&event);
        }
    }

    fn record(&self, call: String) {
        self.state.borrow_mut().calls.push(call);
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "",
    }
}

impl NativeEventTarget for MockTransport {
    fn add_event_listener(&self, kind: EventKind, callback: NativeCallback) {
        self.state.borrow_mut().listeners.push((kind, callback));
    }

    fn remove_event_listener(&self, kind: EventKind, callback: &NativeCallback) {
        let mut s = self.state.borrow_mut();
        if let Some(index) = s
            .listeners
            .iter()
            .position(|(k, c)| *k == kind && Rc::ptr_eq(c, callback))
        {
            s.listeners.remove(index);
        }
    }
}

impl NativeTransport for MockTransport {
    type Upload = &'static str;

    fn has_onload(&self) -> bool {
        self.state.borrow().level2
    }

    fn has_response_type(&self) -> bool {
        self.state.borrow().level2
    }

    fn has_with_credentials(&self) -> bool {
        self.state.borrow().level2
    }

    fn open(
        &self,
        method: Method,
        url: &str,
        _async_flag: bool,
        _user: &str,
        _password: &str,
    ) -> Result<(), TransportError> {
        self.record(format!("open {method} {url}"));
        self.advance(ReadyState::Opened);
        Ok(())
    }

    fn send(&self, body: Option<RequestBody>) -> Result<(), TransportError> {
        self.record("send".to_string());
        self.state.borrow_mut().sent_body = body;
        if self.state.borrow().level2 {
            self.dispatch(NativeEvent::new(EventKind::LoadStart));
        }
        Ok(())
    }

    fn abort(&self) {
        self.record("abort".to_string());
        let in_flight = matches!(
            self.state.borrow().ready_state,
            ReadyState::Opened | ReadyState::HeadersReceived | ReadyState::Loading
        );
        if in_flight {
            self.state.borrow_mut().status = 0;
            self.advance(ReadyState::Done);
        }
    }

    fn ready_state(&self) -> ReadyState {
        self.state.borrow().ready_state
    }

    fn status(&self) -> u16 {
        self.state.borrow().status
    }

    fn status_text(&self) -> String {
        self.state.borrow().status_text.clone()
    }

    fn response_text(&self) -> String {
        self.state.borrow().response_text.clone()
    }

    fn override_mime_type(&self, mime: &str) -> Result<(), TransportError> {
        if self.state.borrow().ready_state >= ReadyState::Loading {
            return Err(TransportError::new("InvalidStateError"));
        }
        self.record(format!("override {mime}"));
        Ok(())
    }

    fn set_request_header(&self, name: &str, value: &str) -> Result<(), TransportError> {
        if self.state.borrow().ready_state != ReadyState::Opened {
            return Err(TransportError::new("InvalidStateError"));
        }
        self.state
            .borrow_mut()
            .request_headers
            .push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn get_response_header(&self, name: &str) -> Option<String> {
        let s = self.state.borrow();
        s.response_headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }

    fn get_all_response_headers(&self) -> String {
        self.state
            .borrow()
            .response_headers
            .iter()
            .map(|(name, value)| format!("{name}: {value}\r\n"))
            .collect()
    }

    fn response(&self) -> Option<ResponseBody> {
        let s = self.state.borrow();
        (s.level2 && s.ready_state == ReadyState::Done)
            .then(|| ResponseBody::Text(s.response_text.clone()))
    }

    fn response_type(&self) -> ResponseType {
        self.state.borrow().response_type
    }

    fn set_response_type(&self, response_type: ResponseType) {
        self.state.borrow_mut().response_type = response_type;
    }

    fn with_credentials(&self) -> bool {
        self.state.borrow().with_credentials
    }

    fn set_with_credentials(&self, with_credentials: bool) {
        self.state.borrow_mut().with_credentials = with_credentials;
    }

    fn upload(&self) -> Option<Self::Upload> {
        self.state.borrow().upload
    }

    fn set_upload(&self, upload: Option<Self::Upload>) {
        self.state.borrow_mut().upload = upload;
    }
}

/// Records event names (and optionally ready states) seen by listeners
#[derive(Clone, Default)]
pub struct EventLog {
    entries: Rc<RefCell<Vec<String>>>,
}

impl EventLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.borrow().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries.borrow().iter().filter(|e| *e == entry).count()
    }
}
