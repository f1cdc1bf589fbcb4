//! Stage timing for the canonicalization pipeline.
//!
//! [`PhaseTimer`] adds the time between its creation and its drop to a
//! `Duration` slot, so a stage is measured even when it returns early.

use std::time::{Duration, Instant};

use serde::Serialize;

/// RAII timer that adds its elapsed time to `slot` on drop.
///
/// ```rust,ignore
/// let mut timings = StageTimings::default();
/// {
///     let _timer = PhaseTimer::new(&mut timings.merge);
///     // ... merge ...
/// }
/// ```
pub struct PhaseTimer<'a> {
    start: Instant,
    slot: &'a mut Duration,
}

impl<'a> PhaseTimer<'a> {
    pub fn new(slot: &'a mut Duration) -> Self {
        Self {
            start: Instant::now(),
            slot,
        }
    }
}

impl Drop for PhaseTimer<'_> {
    fn drop(&mut self) {
        *self.slot += self.start.elapsed();
    }
}

/// Wall-clock time spent in each pipeline stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageTimings {
    pub aggregate: Duration,
    pub canonicalize: Duration,
    pub merge: Duration,
    pub oracle: Duration,
    pub graph: Duration,
}

impl StageTimings {
    pub fn total(&self) -> Duration {
        self.aggregate + self.canonicalize + self.merge + self.oracle + self.graph
    }

    /// `(stage, milliseconds)` pairs, in pipeline order.
    pub fn as_millis(&self) -> [(&'static str, f64); 5] {
        let ms = |d: Duration| d.as_secs_f64() * 1000.0;
        [
            ("aggregate", ms(self.aggregate)),
            ("canonicalize", ms(self.canonicalize)),
            ("merge", ms(self.merge)),
            ("oracle", ms(self.oracle)),
            ("graph", ms(self.graph)),
        ]
    }
}
