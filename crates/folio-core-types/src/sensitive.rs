//! Redacting wrapper for personal data that must stay out of logs

use std::fmt;

/// Value that prints as `***REDACTED***` in `Debug` and `Display`
///
/// Save contexts carry the author's network address; wrapping it keeps the
/// address out of any `?ctx` field recorded by tracing.
///
/// ```
/// use folio_core_types::Sensitive;
///
/// let addr = Sensitive::new("203.0.113.9".to_string());
/// assert_eq!(format!("{addr:?}"), "***REDACTED***");
/// assert_eq!(addr.expose(), "203.0.113.9");
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Borrow the wrapped value. Only call this where the raw value is
    /// actually written somewhere (never in a log statement).
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***REDACTED***")
    }
}

impl<T> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***REDACTED***")
    }
}

impl<T> From<T> for Sensitive<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}
