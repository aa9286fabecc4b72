//! Field validation for the working copy
//!
//! The controller only needs two questions answered: "touch this value" and
//! "is there an error right now". [`FieldValidation`] answers them with a rule
//! list and dirty tracking, so a field that was never touched never reports an
//! error.

use std::fmt;
use tracing::debug;

/// Validation capability injected into a controller
pub trait Validator<V>: Send {
    /// Marks the field as touched and evaluates `value`
    fn touch(&mut self, value: &V);

    /// True when the field has been touched and the last evaluation failed
    fn has_error(&self) -> bool;

    /// Clears the touched state
    fn reset(&mut self) {}
}

/// Validator with no rules. Never reports an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoValidation;

impl<V> Validator<V> for NoValidation {
    fn touch(&mut self, _value: &V) {}

    fn has_error(&self) -> bool {
        false
    }
}

/// A single validation rule
pub trait Rule<V>: Send + Sync {
    /// Short rule name used in logs and error listings
    fn name(&self) -> &str;

    fn check(&self, value: &V) -> bool;
}

/// Rule backed by a closure
pub struct Predicate<F> {
    name: String,
    check: F,
}

impl<F> Predicate<F> {
    pub fn new(name: impl Into<String>, check: F) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

impl<V, F> Rule<V> for Predicate<F>
where
    F: Fn(&V) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, value: &V) -> bool {
        (self.check)(value)
    }
}

/// Rule-based validation state of one field
pub struct FieldValidation<V> {
    rules: Vec<Box<dyn Rule<V>>>,
    dirty: bool,
    failing: Vec<String>,
}

impl<V> Default for FieldValidation<V> {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            dirty: false,
            failing: Vec::new(),
        }
    }
}

impl<V> fmt::Debug for FieldValidation<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldValidation")
            .field("rules", &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>())
            .field("dirty", &self.dirty)
            .field("failing", &self.failing)
            .finish()
    }
}

impl<V> FieldValidation<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style rule registration
    pub fn with_rule(mut self, rule: impl Rule<V> + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn push_rule(&mut self, rule: Box<dyn Rule<V>>) {
        self.rules.push(rule);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// True if the last evaluated value broke at least one rule
    pub fn is_invalid(&self) -> bool {
        !self.failing.is_empty()
    }

    /// Names of the rules that failed on the last evaluation
    pub fn failing_rules(&self) -> &[String] {
        &self.failing
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl<V> Validator<V> for FieldValidation<V>
where
    V: Send,
{
    fn touch(&mut self, value: &V) {
        self.dirty = true;
        self.failing = self
            .rules
            .iter()
            .filter(|rule| !rule.check(value))
            .map(|rule| rule.name().to_string())
            .collect();

        if !self.failing.is_empty() {
            debug!("Validation failed: {:?}", self.failing);
        }
    }

    fn has_error(&self) -> bool {
        self.dirty && self.is_invalid()
    }

    fn reset(&mut self) {
        self.dirty = false;
    }
}

// Built-in string rules. Everything except `Required` accepts empty input.

fn is_empty(value: &str) -> bool {
    value.trim().is_empty()
}

/// Value must contain something other than whitespace
#[derive(Debug, Clone, Copy, Default)]
pub struct Required;

impl<V: AsRef<str>> Rule<V> for Required {
    fn name(&self) -> &str {
        "required"
    }

    fn check(&self, value: &V) -> bool {
        !is_empty(value.as_ref())
    }
}

/// Minimum number of characters
#[derive(Debug, Clone, Copy)]
pub struct MinLength(pub usize);

impl<V: AsRef<str>> Rule<V> for MinLength {
    fn name(&self) -> &str {
        "min_length"
    }

    fn check(&self, value: &V) -> bool {
        let value = value.as_ref();
        value.is_empty() || value.chars().count() >= self.0
    }
}

/// Maximum number of characters
#[derive(Debug, Clone, Copy)]
pub struct MaxLength(pub usize);

impl<V: AsRef<str>> Rule<V> for MaxLength {
    fn name(&self) -> &str {
        "max_length"
    }

    fn check(&self, value: &V) -> bool {
        value.as_ref().chars().count() <= self.0
    }
}

/// Optionally signed whole number
#[derive(Debug, Clone, Copy, Default)]
pub struct Integer;

impl<V: AsRef<str>> Rule<V> for Integer {
    fn name(&self) -> &str {
        "integer"
    }

    fn check(&self, value: &V) -> bool {
        let value = value.as_ref();
        if value.is_empty() {
            return true;
        }
        let digits = value.strip_prefix(['-', '+']).unwrap_or(value);
        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
    }
}

/// Optionally signed decimal number, e.g. `-12.5` or `.5`
///
/// `places` caps the number of fraction digits when set.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decimal {
    pub places: Option<usize>,
}

impl<V: AsRef<str>> Rule<V> for Decimal {
    fn name(&self) -> &str {
        "decimal"
    }

    fn check(&self, value: &V) -> bool {
        let value = value.as_ref();
        if value.is_empty() {
            return true;
        }
        let unsigned = value.strip_prefix(['-', '+']).unwrap_or(value);
        let (whole, fraction) = match unsigned.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (unsigned, None),
        };

        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(whole) {
            return false;
        }
        match fraction {
            None => !whole.is_empty(),
            Some(fraction) => {
                !fraction.is_empty()
                    && all_digits(fraction)
                    && self.places.map_or(true, |places| fraction.len() <= places)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check<R: Rule<String>>(rule: R, value: &str) -> bool {
        rule.check(&value.to_string())
    }

    #[test]
    fn untouched_field_never_has_error() {
        let validation: FieldValidation<String> = FieldValidation::new().with_rule(Required);
        assert!(!validation.has_error());
        assert!(!validation.is_dirty());
    }

    #[test]
    fn touch_evaluates_rules() {
        let mut validation = FieldValidation::new()
            .with_rule(Required)
            .with_rule(MaxLength(3));

        validation.touch(&"".to_string());
        assert!(validation.has_error());
        assert_eq!(validation.failing_rules(), ["required"]);

        validation.touch(&"abcd".to_string());
        assert_eq!(validation.failing_rules(), ["max_length"]);

        validation.touch(&"abc".to_string());
        assert!(!validation.has_error());
    }

    #[test]
    fn reset_hides_error_until_next_touch() {
        let mut validation = FieldValidation::new().with_rule(Required);
        validation.touch(&String::new());
        assert!(validation.has_error());

        Validator::<String>::reset(&mut validation);
        assert!(!validation.has_error());
        assert!(validation.is_invalid());
    }

    #[test]
    fn empty_rule_set_is_always_valid() {
        let mut validation: FieldValidation<String> = FieldValidation::new();
        validation.touch(&String::new());
        assert!(!validation.has_error());

        let mut none = NoValidation;
        Validator::<String>::touch(&mut none, &String::new());
        assert!(!Validator::<String>::has_error(&none));
    }

    #[test]
    fn predicate_rule() {
        let mut validation: FieldValidation<u32> =
            FieldValidation::new().with_rule(Predicate::new("even", |v: &u32| v % 2 == 0));
        validation.touch(&3);
        assert!(validation.has_error());
        validation.touch(&4);
        assert!(!validation.has_error());
    }

    #[test]
    fn required_rejects_blank() {
        assert!(!check(Required, ""));
        assert!(!check(Required, "   "));
        assert!(check(Required, " x "));
    }

    #[test]
    fn length_rules_count_chars() {
        assert!(check(MinLength(2), ""));
        assert!(!check(MinLength(2), "a"));
        assert!(check(MinLength(2), "äö"));
        assert!(check(MaxLength(2), "äö"));
        assert!(!check(MaxLength(2), "äöü"));
    }

    #[test]
    fn integer_rule() {
        assert!(check(Integer, ""));
        assert!(check(Integer, "42"));
        assert!(check(Integer, "-7"));
        assert!(!check(Integer, "-"));
        assert!(!check(Integer, "4.2"));
        assert!(!check(Integer, "1e3"));
    }

    #[test]
    fn decimal_rule() {
        let any = Decimal::default();
        assert!(check(any, ""));
        assert!(check(any, "12"));
        assert!(check(any, "-12.50"));
        assert!(check(any, ".5"));
        assert!(!check(any, "."));
        assert!(!check(any, "1."));
        assert!(!check(any, "NaN"));
        assert!(!check(any, "1,5"));

        let two = Decimal { places: Some(2) };
        assert!(check(two, "1.25"));
        assert!(!check(two, "1.255"));
    }
}
