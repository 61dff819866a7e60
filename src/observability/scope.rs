//! ObservationScope for begin/complete/failed logging
//!
//! - `{name}_BEGIN` on creation (TRACE)
//! - `{name}_COMPLETE` on `complete()` (TRACE)
//! - `{name}_FAILED` on `fail()` (WARN)
//! - `{name}_INCOMPLETE` when dropped without either (WARN)
//!
//! Completion and failure lines carry `elapsed_ms`.

use std::cell::Cell;
use std::time::Instant;

use super::logger::Logger;

/// A scope that logs the lifecycle of one operation
///
/// ```ignore
/// let scope = ObservationScope::with_fields("DSL_COMPILE", &[("expression", source)]);
/// match compile() {
///     Ok(expr) => scope.complete(),
///     Err(e) => scope.fail(&e.to_string()),
/// }
/// ```
pub struct ObservationScope<'a> {
    name: &'a str,
    completed: Cell<bool>,
    fields: Vec<(&'a str, String)>,
    timer: Timer,
}

impl<'a> ObservationScope<'a> {
    pub fn new(name: &'a str) -> Self {
        Self::with_fields(name, &[])
    }

    /// Fields are repeated on every line the scope logs
    pub fn with_fields(name: &'a str, fields: &[(&'a str, &str)]) -> Self {
        Logger::trace(&format!("{}_BEGIN", name), fields);

        Self {
            name,
            completed: Cell::new(false),
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            timer: Timer::new(),
        }
    }

    fn fields_with<'b>(
        &'b self,
        elapsed: &'b str,
        extra: &[(&'b str, &'b str)],
    ) -> Vec<(&'b str, &'b str)> {
        let mut fields: Vec<(&str, &str)> =
            self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        fields.push(("elapsed_ms", elapsed));
        fields.extend(extra.iter().copied());
        fields
    }

    /// Logs `{name}_COMPLETE` at TRACE level
    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    pub fn complete_with_fields(self, extra_fields: &[(&str, &str)]) {
        self.completed.set(true);
        let elapsed = self.timer.elapsed_ms();
        Logger::trace(
            &format!("{}_COMPLETE", self.name),
            &self.fields_with(&elapsed, extra_fields),
        );
    }

    /// Logs `{name}_FAILED` at WARN level
    pub fn fail(self, reason: &str) {
        self.completed.set(true);
        let elapsed = self.timer.elapsed_ms();
        Logger::warn(
            &format!("{}_FAILED", self.name),
            &self.fields_with(&elapsed, &[("reason", reason)]),
        );
    }

    pub fn is_completed(&self) -> bool {
        self.completed.get()
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if !self.completed.get() {
            let event = format!("{}_INCOMPLETE", self.name);
            Logger::warn(&event, &[("reason", "scope dropped without completion")]);
        }
    }
}

/// A simple duration timer for logging elapsed time
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed milliseconds as a string
    pub fn elapsed_ms(&self) -> String {
        self.start.elapsed().as_millis().to_string()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_complete() {
        let scope = ObservationScope::with_fields("DSL_PARSE", &[("expression", "$.a > 1")]);
        assert!(!scope.is_completed());
        scope.complete();
    }

    #[test]
    fn test_scope_fail() {
        let scope = ObservationScope::new("DSL_COMPILE");
        scope.fail("DSL_TYPE_MISMATCH: Cannot compare STRING to FLOAT");
    }

    #[test]
    fn test_scope_drop_without_complete() {
        let scope = ObservationScope::new("DSL_COMPILE");
        drop(scope);
    }

    #[test]
    fn test_fields_carry_elapsed() {
        let scope = ObservationScope::with_fields("DSL_PARSE", &[("expression", "x")]);
        let fields = scope.fields_with("3", &[("nodes", "1")]);
        assert_eq!(
            fields,
            vec![("expression", "x"), ("elapsed_ms", "3"), ("nodes", "1")]
        );
        scope.complete();
    }

    #[test]
    fn test_timer() {
        let timer = Timer::new();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let ms: u64 = timer.elapsed_ms().parse().unwrap();
        assert!(ms >= 5);
    }
}
