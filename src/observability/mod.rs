//! Observability for bindsl
//!
//! Structured JSON logging on stderr, lifecycle scopes and typed events.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on compilation or selection
//! 3. No async or background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use bindsl::observability::{log_event_with_fields, Event, Logger, ObservationScope};
//!
//! Logger::info("CONFIG_LOADED", &[("indexes", "3")]);
//! log_event_with_fields(Event::IndexFilterNone, &[("namespace", "test")]);
//!
//! let scope = ObservationScope::new("DSL_COMPILE");
//! scope.complete();
//! ```

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::{ObservationScope, Timer};

#[cfg(test)]
pub use logger::capture_log;

/// Log an event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log an event with fields at its own severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
