//! Per-request lifecycle as a statum state machine
//!
//! ```text
//! Validating ──► Blocked         (validation reported an error)
//!      │
//!      ├──────► EmitImmediate    (immediate flag set)
//!      │
//!      └──────► Scheduled ──► fired | superseded   (handled by the timer slot)
//! ```

use statum::{machine, state};
use tracing::debug;

#[state]
#[derive(Debug, Clone)]
pub enum RequestState {
    Validating,    // Working copy touched, waiting for the verdict
    Blocked,       // Validation failed, nothing happens
    EmitImmediate, // Emit synchronously
    Scheduled,     // Emit once the debounce delay elapses
}

/// One call to `request_update`, tracked from validation to its outcome
#[machine]
pub struct UpdateRequest<S: RequestState> {
    field: String,
    immediate: bool,
}

impl<S: RequestState> UpdateRequest<S> {
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn is_immediate(&self) -> bool {
        self.immediate
    }
}

/// Where a validated request ends up
pub enum Resolution {
    Blocked(UpdateRequest<Blocked>),
    Immediate(UpdateRequest<EmitImmediate>),
    Deferred(UpdateRequest<Scheduled>),
}

impl UpdateRequest<Validating> {
    pub fn create(field: &str, immediate: bool) -> Self {
        Self::new(field.to_string(), immediate)
    }

    /// Picks the next state from the validator's verdict
    pub fn resolve(self, has_error: bool) -> Resolution {
        if has_error {
            debug!("Update for {} blocked by validation", self.field);
            Resolution::Blocked(self.transition())
        } else if self.immediate {
            Resolution::Immediate(self.transition())
        } else {
            Resolution::Deferred(self.transition())
        }
    }
}
