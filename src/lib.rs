//! Debounced, validation-gated input updates
//!
//! A [`input::DebouncedInputController`] keeps a working copy of a field and
//! forwards edits to a listener once the user stops typing for the configured
//! delay (400ms by default), or right away on request. Edits that fail
//! validation are dropped silently.

pub mod config;
pub mod input;
