//! Level 2 event simulation
//!
//! Pure transition logic: given the last observed ready state and the
//! current native state, decide which events a Level 2 transport would
//! have emitted. Delivery lives in the proxy.

use crate::event::EventKind;
use crate::transport::ReadyState;

/// Success classification shared by completion handling, `convert()` and `get()`.
///
/// `file:` responses often carry status 0, which counts as success for
/// file URLs only.
pub fn is_success(status: u16, is_file: bool) -> bool {
    let ok = (200..300).contains(&status);
    if is_file { status == 0 || ok } else { ok }
}

/// Whether `url` uses the local-file scheme
pub fn is_file_url(url: &str) -> bool {
    url::Url::parse(url).is_ok_and(|parsed| parsed.scheme() == "file")
}

/// Result of one simulation step
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Step {
    /// Events to fire, in order
    pub events: Vec<EventKind>,
    /// New value for the last observed state
    pub observed: ReadyState,
    /// Request finished successfully; coerce before `load`
    pub success: bool,
    /// Lifecycle complete; detach the simulator
    pub complete: bool,
}

impl Step {
    pub fn fires(&self, kind: EventKind) -> bool {
        self.events.contains(&kind)
    }
}

/// Events for one readystatechange notification
pub fn step(last: ReadyState, current: ReadyState, status: u16, is_file: bool) -> Step {
    let mut step = Step {
        observed: current,
        ..Step::default()
    };

    if last != current {
        step.events.push(EventKind::ReadyStateChange);
    }

    match current {
        ReadyState::Unsent => {}
        ReadyState::Opened => step.events.push(EventKind::LoadStart),
        ReadyState::HeadersReceived | ReadyState::Loading => step.events.push(EventKind::Progress),
        ReadyState::Done => {
            step.success = is_success(status, is_file);
            if step.success {
                step.events.push(EventKind::Load);
            }
            step.events.push(EventKind::LoadEnd);
            step.complete = true;
        }
    }

    step
}
