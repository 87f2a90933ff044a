//! Capability detection
//!
//! Decides once, at proxy construction, whether the native transport
//! implements the Level 2 surface, and picks the matching binding.

use crate::event::EventKind;
use crate::transport::{NativeCallback, NativeEventTarget, NativeTransport};

/// Native XHR capability level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityLevel {
    /// readystatechange only; richer events are simulated
    Level1,
    /// onload, responseType and withCredentials are native
    Level2,
}

impl CapabilityLevel {
    /// Inspect a freshly created transport
    pub fn probe<T: NativeTransport>(transport: &T) -> Self {
        let level = if transport.has_onload()
            && transport.has_response_type()
            && transport.has_with_credentials()
        {
            CapabilityLevel::Level2
        } else {
            CapabilityLevel::Level1
        };
        tracing::debug!("Native XHR capability: {:?}", level);
        level
    }

    pub fn as_number(self) -> u8 {
        match self {
            CapabilityLevel::Level1 => 1,
            CapabilityLevel::Level2 => 2,
        }
    }

    pub(crate) fn binding(self) -> &'static dyn NativeBinding {
        match self {
            CapabilityLevel::Level1 => &PolledBinding,
            CapabilityLevel::Level2 => &ForwardingBinding,
        }
    }
}

/// How the proxy couples itself to native event delivery
pub(crate) trait NativeBinding {
    fn level(&self) -> CapabilityLevel;

    /// Target that listener registrations are forwarded to, if any
    fn native_target<'a>(&self, target: &'a dyn NativeEventTarget) -> Option<&'a dyn NativeEventTarget>;

    /// Hook the state simulator into readystatechange delivery.
    /// Returns the callback that was registered.
    fn attach_simulator(
        &self,
        target: &dyn NativeEventTarget,
        simulator: NativeCallback,
    ) -> Option<NativeCallback>;

    fn detach_simulator(&self, target: &dyn NativeEventTarget, simulator: &NativeCallback);

    /// Binary responses must be received as x-user-defined text
    fn needs_binary_override(&self) -> bool;
}

/// Level 1: drive events from readystatechange
pub(crate) struct PolledBinding;

impl NativeBinding for PolledBinding {
    fn level(&self) -> CapabilityLevel {
        CapabilityLevel::Level1
    }

    fn native_target<'a>(&self, _target: &'a dyn NativeEventTarget) -> Option<&'a dyn NativeEventTarget> {
        None
    }

    fn attach_simulator(
        &self,
        target: &dyn NativeEventTarget,
        simulator: NativeCallback,
    ) -> Option<NativeCallback> {
        target.add_event_listener(EventKind::ReadyStateChange, simulator.clone());
        Some(simulator)
    }

    fn detach_simulator(&self, target: &dyn NativeEventTarget, simulator: &NativeCallback) {
        target.remove_event_listener(EventKind::ReadyStateChange, simulator);
    }

    fn needs_binary_override(&self) -> bool {
        true
    }
}

/// Level 2: hand registrations to the native transport
pub(crate) struct ForwardingBinding;

impl NativeBinding for ForwardingBinding {
    fn level(&self) -> CapabilityLevel {
        CapabilityLevel::Level2
    }

    fn native_target<'a>(&self, target: &'a dyn NativeEventTarget) -> Option<&'a dyn NativeEventTarget> {
        Some(target)
    }

    fn attach_simulator(
        &self,
        _target: &dyn NativeEventTarget,
        _simulator: NativeCallback,
    ) -> Option<NativeCallback> {
        None
    }

    fn detach_simulator(&self, _target: &dyn NativeEventTarget, _simulator: &NativeCallback) {}

    fn needs_binary_override(&self) -> bool {
        false
    }
}
