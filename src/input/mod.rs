//! Debounced input subsystem
//!
//! Turns a stream of edits to a single field into a small number of `input`
//! events:
//!
//! 1. [`controller`] - Working copy, update requests and emission
//! 2. [`validation`] - Touch/has-error validation of the working copy
//! 3. [`timer`] - Cancellable deferred-task slot for the debounce delay
//! 4. [`listener`] - Event type and listener implementations
//!
//! # Flow
//!
//! ```text
//! request_update ──► cancel pending ──► touch ──┬─► error ──► (nothing)
//!                                               ├─► immediate ──► listener
//!                                               └─► TimerSlot ──400ms──► listener
//! ```

pub mod controller;
pub mod error;
pub mod listener;
pub mod request;
pub mod timer;
pub mod validation;

pub use controller::{DebounceSettings, DebouncedInputController, TimerScope, DEFAULT_DELAY_MS};
pub use error::InputError;
pub use listener::{InputEvent, InputListener};
pub use timer::TimerSlot;
pub use validation::{
    Decimal, FieldValidation, Integer, MaxLength, MinLength, NoValidation, Predicate, Required,
    Rule, Validator,
};
