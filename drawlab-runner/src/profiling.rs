//! Timing scopes for expensive calls.
//!
//! ```
//! use drawlab_runner::profiling::TimedScope;
//!
//! let scope = TimedScope::new("exact_probabilities");
//! // work...
//! println!("Time passed: {:.0} ms", scope.elapsed_ms());
//! // a debug event with the duration is emitted on drop
//! ```

use std::time::{Duration, Instant};

use tracing::debug;

/// Measures wall time from construction; logs it on drop.
#[derive(Debug)]
pub struct TimedScope {
    name: &'static str,
    start: Instant,
}

impl TimedScope {
    #[inline]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    /// Get elapsed time without dropping the scope.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for TimedScope {
    fn drop(&mut self) {
        debug!(scope = self.name, elapsed_ms = self.elapsed_ms(), "timed scope finished");
    }
}

/// Run a closure and return its result along with its duration.
pub fn timed<F, R>(name: &'static str, f: F) -> (R, Duration)
where
    F: FnOnce() -> R,
{
    let scope = TimedScope::new(name);
    let result = f();
    (result, scope.elapsed())
}
