//! Output side of the controller: the `input` event and its listeners

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Event emitted when an update is accepted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputEvent<V> {
    /// Name of the field that produced the value
    pub field: String,
    /// The accepted value
    pub value: V,
    /// Whether the event bypassed the debounce delay
    pub immediate: bool,
    pub emitted_at: DateTime<Utc>,
}

impl<V> InputEvent<V> {
    pub fn new(field: impl Into<String>, value: V, immediate: bool) -> Self {
        Self {
            field: field.into(),
            value,
            immediate,
            emitted_at: Utc::now(),
        }
    }
}

/// Receiver of accepted input events
///
/// Implemented for tokio channel senders and for plain closures.
pub trait InputListener<V>: Send + Sync {
    fn on_input(&self, event: InputEvent<V>);
}

impl<V, F> InputListener<V> for F
where
    F: Fn(InputEvent<V>) + Send + Sync,
{
    fn on_input(&self, event: InputEvent<V>) {
        self(event)
    }
}

impl<V: Send> InputListener<V> for mpsc::UnboundedSender<InputEvent<V>> {
    fn on_input(&self, event: InputEvent<V>) {
        let field = event.field.clone();
        match self.send(event) {
            Ok(_) => debug!("Input event delivered for field {}", field),
            Err(_) => warn!("Input listener for field {} is closed", field),
        }
    }
}

impl<V: Send> InputListener<V> for mpsc::Sender<InputEvent<V>> {
    fn on_input(&self, event: InputEvent<V>) {
        let field = event.field.clone();
        match self.try_send(event) {
            Ok(_) => debug!("Input event delivered for field {}", field),
            Err(e) => warn!("Failed to deliver input event for field {}: {}", field, e),
        }
    }
}
