//! Event Hub
//!
//! Per-request listener registry. On Level 2 hosts registrations are also
//! forwarded to the native transport, which then delivers events itself;
//! on Level 1 hosts the registry is plain bookkeeping and the state
//! simulator fires listeners by hand.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::error::XhrError;
use crate::transport::{NativeCallback, NativeEvent, NativeEventTarget};

/// XHR event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    LoadStart,
    Load,
    LoadEnd,
    Progress,
    ReadyStateChange,
    Error,
    Timeout,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::LoadStart,
        EventKind::Load,
        EventKind::LoadEnd,
        EventKind::Progress,
        EventKind::ReadyStateChange,
        EventKind::Error,
        EventKind::Timeout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::LoadStart => "loadstart",
            EventKind::Load => "load",
            EventKind::LoadEnd => "loadend",
            EventKind::Progress => "progress",
            EventKind::ReadyStateChange => "readystatechange",
            EventKind::Error => "error",
            EventKind::Timeout => "timeout",
        }
    }
}

impl FromStr for EventKind {
    type Err = XhrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| XhrError::UnknownEvent(s.to_string()))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event handed to listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XhrEvent {
    /// Type being dispatched
    pub kind: EventKind,
    /// Native notification that triggered the dispatch. When simulating,
    /// this is the `readystatechange` that caused e.g. `load`.
    pub source: NativeEvent,
}

impl XhrEvent {
    pub fn new(kind: EventKind, source: NativeEvent) -> Self {
        Self { kind, source }
    }
}

/// Listener callback; `R` is the receiver passed as the first argument
pub struct Listener<R>(Rc<dyn Fn(&R, &XhrEvent)>);

impl<R> Listener<R> {
    pub fn new(callback: impl Fn(&R, &XhrEvent) + 'static) -> Self {
        Self(Rc::new(callback))
    }

    pub fn call(&self, receiver: &R, event: &XhrEvent) {
        (self.0)(receiver, event)
    }
}

impl<R> Clone for Listener<R> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

/// Listeners compare by identity
impl<R> PartialEq for Listener<R> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<R> fmt::Debug for Listener<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", Rc::as_ptr(&self.0))
    }
}

/// Native registration to perform alongside a local one
pub struct Forward<'a> {
    pub target: &'a dyn NativeEventTarget,
    /// Bridged callback handed to the native side
    pub callback: NativeCallback,
}

struct Registration<R> {
    listener: Listener<R>,
    native: Option<NativeCallback>,
}

/// Typed listener registry
pub struct EventHub<R> {
    registry: HashMap<EventKind, Vec<Registration<R>>>,
}

impl<R> EventHub<R> {
    pub fn new() -> Self {
        Self {
            registry: HashMap::new(),
        }
    }

    /// Register `listener` under `kind`. Duplicates are kept.
    pub fn add(&mut self, forward: Option<Forward<'_>>, kind: EventKind, listener: Listener<R>) {
        let native = forward.map(|forward| {
            forward.target.add_event_listener(kind, Rc::clone(&forward.callback));
            forward.callback
        });
        self.registry
            .entry(kind)
            .or_default()
            .push(Registration { listener, native });
    }

    /// Remove the first registration of `listener` under `kind`
    pub fn remove(
        &mut self,
        target: Option<&dyn NativeEventTarget>,
        kind: EventKind,
        listener: &Listener<R>,
    ) {
        let Some(registrations) = self.registry.get_mut(&kind) else {
            return;
        };
        let Some(index) = registrations.iter().position(|r| &r.listener == listener) else {
            return;
        };
        let registration = registrations.remove(index);
        if registrations.is_empty() {
            self.registry.remove(&kind);
        }
        if let (Some(target), Some(native)) = (target, registration.native) {
            target.remove_event_listener(kind, &native);
        }
    }

    /// Remove every registration
    pub fn clear(&mut self, target: Option<&dyn NativeEventTarget>) {
        for (kind, registrations) in self.registry.drain() {
            let Some(target) = target else { continue };
            for native in registrations.into_iter().filter_map(|r| r.native) {
                target.remove_event_listener(kind, &native);
            }
        }
    }

    pub fn has(&self, kind: EventKind) -> bool {
        self.registry.get(&kind).is_some_and(|r| !r.is_empty())
    }

    /// Snapshot of the listeners for `kind`, in registration order
    pub fn get(&self, kind: EventKind) -> Vec<Listener<R>> {
        self.registry
            .get(&kind)
            .map(|r| r.iter().map(|r| r.listener.clone()).collect())
            .unwrap_or_default()
    }

    /// Total number of registrations
    pub fn len(&self) -> usize {
        self.registry.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R> Default for EventHub<R> {
    fn default() -> Self {
        Self::new()
    }
}
