//! Debounced input controller
//!
//! Holds the working copy of a field and turns update requests into `input`
//! events. A request cancels whatever emission is pending, validates the new
//! value, and then either emits right away, waits for the debounce delay, or
//! does nothing at all when validation fails.

use super::error::InputError;
use super::listener::{InputEvent, InputListener};
use super::request::{Resolution, UpdateRequest};
use super::timer::TimerSlot;
use super::validation::{NoValidation, Validator};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Quiet period before a non-immediate update is emitted
pub const DEFAULT_DELAY_MS: u64 = 400;

/// Which timer slot a controller schedules on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerScope {
    /// Each controller owns its slot. Controllers never cancel each other.
    #[default]
    Instance,
    /// All controllers share the process-wide slot, so a request on any of
    /// them cancels the pending emission of every other one.
    Shared,
}

/// Timing settings for a controller
#[derive(Debug, Clone)]
pub struct DebounceSettings {
    pub delay: Duration,
    pub timer_scope: TimerScope,
}

impl Default for DebounceSettings {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            timer_scope: TimerScope::Instance,
        }
    }
}

/// Debounces updates of a single field and emits accepted values
///
/// # Examples
///
/// ```rust
/// use debounced_input::input::{DebounceSettings, DebouncedInputController, NoValidation};
/// use tokio::sync::mpsc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let (tx, mut rx) = mpsc::unbounded_channel();
/// let mut name = DebouncedInputController::new(
///     "name",
///     String::new(),
///     NoValidation,
///     tx,
///     DebounceSettings::default(),
/// );
///
/// name.request_update("Ada".to_string(), true)?;
/// assert_eq!(rx.recv().await.map(|e| e.value), Some("Ada".to_string()));
/// # Ok(())
/// # }
/// ```
pub struct DebouncedInputController<V, Val = NoValidation> {
    field: String,
    working_copy: V,
    validator: Val,
    listener: Arc<dyn InputListener<V>>,
    timer: TimerSlot,
    delay: Duration,
    owns_timer: bool,
}

impl<V, Val> DebouncedInputController<V, Val>
where
    V: Clone + Debug + Send + 'static,
    Val: Validator<V>,
{
    /// Creates a controller whose working copy starts as `value`
    ///
    /// No validation happens here; the field stays untouched until the first
    /// update request. The slot is picked from `settings.timer_scope`.
    pub fn new(
        field: impl Into<String>,
        value: V,
        validator: Val,
        listener: impl InputListener<V> + 'static,
        settings: DebounceSettings,
    ) -> Self {
        let timer = match settings.timer_scope {
            TimerScope::Instance => TimerSlot::new(),
            TimerScope::Shared => TimerSlot::global(),
        };
        Self::with_timer(field, value, validator, listener, settings, timer)
    }

    /// Creates a controller that schedules on the given slot
    ///
    /// Controllers built from clones of the same [`TimerSlot`] supersede each
    /// other's pending emissions. `settings.timer_scope` only decides whether
    /// dropping the controller cancels what is pending on `timer`: an
    /// `Instance` controller treats the slot as its own, a `Shared` one leaves
    /// it alone.
    pub fn with_timer(
        field: impl Into<String>,
        value: V,
        validator: Val,
        listener: impl InputListener<V> + 'static,
        settings: DebounceSettings,
        timer: TimerSlot,
    ) -> Self {
        let field = field.into();
        debug!("Initializing input controller for {} with {:?}", field, value);

        Self {
            field,
            working_copy: value,
            validator,
            listener: Arc::new(listener),
            timer,
            delay: settings.delay,
            owns_timer: settings.timer_scope == TimerScope::Instance,
        }
    }

    /// Requests that `candidate` be propagated to the listener
    ///
    /// Any pending emission on this controller's slot is cancelled first. The
    /// candidate becomes the working copy and is validated. On a validation
    /// error the call returns without emitting or scheduling anything. Otherwise
    /// the candidate is emitted synchronously when `immediate` is set, or after
    /// the debounce delay.
    ///
    /// # Errors
    ///
    /// [`InputError::NoRuntime`] if `immediate` is not set and no tokio runtime
    /// is running. The check happens before anything else, so on error the
    /// pending emission, the working copy and the validator are all unchanged.
    /// Validation failures are not errors.
    pub fn request_update(&mut self, candidate: V, immediate: bool) -> Result<(), InputError> {
        if !immediate && tokio::runtime::Handle::try_current().is_err() {
            return Err(InputError::NoRuntime);
        }

        self.timer.cancel();

        self.working_copy = candidate;
        self.validator.touch(&self.working_copy);

        let request = UpdateRequest::create(&self.field, immediate);
        match request.resolve(self.validator.has_error()) {
            Resolution::Blocked(_) => Ok(()),
            Resolution::Immediate(request) => {
                info!("Emitting {:?} for {}", self.working_copy, request.field());
                self.listener.on_input(InputEvent::new(
                    request.field(),
                    self.working_copy.clone(),
                    true,
                ));
                Ok(())
            }
            Resolution::Deferred(request) => {
                let listener = Arc::clone(&self.listener);
                let field = request.field().to_string();
                let value = self.working_copy.clone();

                self.timer.schedule(self.delay, move || {
                    info!("Emitting {:?} for {}", value, field);
                    listener.on_input(InputEvent::new(field, value, false));
                })
            }
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn working_copy(&self) -> &V {
        &self.working_copy
    }

    pub fn validator(&self) -> &Val {
        &self.validator
    }

    pub fn validator_mut(&mut self) -> &mut Val {
        &mut self.validator
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether the controller's slot has an emission waiting
    ///
    /// For a shared slot this reports the slot, which may hold another
    /// controller's emission.
    pub fn is_pending(&self) -> bool {
        self.timer.is_pending()
    }

    /// Resolves once the controller's slot has nothing pending
    ///
    /// For a shared slot this also waits for other controllers' emissions.
    pub async fn settled(&self) {
        self.timer.settled().await
    }

    pub fn timer(&self) -> &TimerSlot {
        &self.timer
    }
}

impl<V, Val> Drop for DebouncedInputController<V, Val> {
    fn drop(&mut self) {
        if self.owns_timer && self.timer.cancel() {
            debug!("Dropped pending emission for {}", self.field);
        }
    }
}
