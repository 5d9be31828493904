//! Process-wide error formatting.
//!
//! The registry starts out empty and is append-only: formatters are consulted
//! in registration order and are never removed. The library itself introduces
//! no error type; factory and body errors pass through the cache and lock map
//! verbatim, and this module only concerns itself with rendering them for
//! logs.

use std::error::Error;
use std::sync::RwLock;

use once_cell::sync::Lazy;

/// A formatter inspects an error and renders it, or declines with `None`.
pub type ErrorFormatter = fn(&(dyn Error + 'static)) -> Option<String>;

static FORMATTERS: Lazy<RwLock<Vec<ErrorFormatter>>> = Lazy::new(|| RwLock::new(Vec::new()));

/// Registers a formatter behind all previously registered ones.
pub fn register_error_formatter(formatter: ErrorFormatter) {
    FORMATTERS.write().unwrap().push(formatter);
}

/// Renders `error` through the first registered formatter that accepts it.
///
/// Falls back to the `Display` chain of the error and its sources.
pub fn format_error(error: &(dyn Error + 'static)) -> String {
    for formatter in FORMATTERS.read().unwrap().iter() {
        if let Some(formatted) = formatter(error) {
            return formatted;
        }
    }

    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
