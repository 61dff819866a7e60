//! Observable events
//!
//! Parse and compile lifecycles are logged through
//! [`ObservationScope`](super::ObservationScope) as
//! `DSL_PARSE_*` / `DSL_COMPILE_*`; the one-shot events are listed here.

use std::fmt;

use super::logger::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Index configuration file loaded and validated
    ConfigLoaded,

    // Index selection
    /// A secondary-index filter was chosen
    IndexFilterSelected,
    /// No leaf qualified for any index
    IndexFilterNone,
    /// An index hint matched nothing usable
    IndexHintFallback,

    // CLI
    /// One request of a batch failed
    RequestRejected,
    /// All batch requests processed
    BatchComplete,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::IndexFilterSelected => "INDEX_FILTER_SELECTED",
            Event::IndexFilterNone => "INDEX_FILTER_NONE",
            Event::IndexHintFallback => "INDEX_HINT_FALLBACK",
            Event::RequestRejected => "REQUEST_REJECTED",
            Event::BatchComplete => "BATCH_COMPLETE",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::IndexFilterSelected | Event::IndexFilterNone => Severity::Trace,
            Event::ConfigLoaded | Event::BatchComplete => Severity::Info,
            Event::IndexHintFallback | Event::RequestRejected => Severity::Warn,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_screaming_snake() {
        let events = [
            Event::ConfigLoaded,
            Event::IndexFilterSelected,
            Event::IndexFilterNone,
            Event::IndexHintFallback,
            Event::RequestRejected,
            Event::BatchComplete,
        ];
        for event in events {
            let name = event.as_str();
            assert!(name
                .chars()
                .all(|c| c.is_ascii_uppercase() || c == '_'));
            assert_eq!(event.to_string(), name);
        }
    }

    #[test]
    fn test_fallback_is_a_warning() {
        assert_eq!(Event::IndexHintFallback.severity(), Severity::Warn);
        assert_eq!(Event::IndexFilterSelected.severity(), Severity::Trace);
    }
}
