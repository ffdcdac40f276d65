use std::time::{Duration, Instant};

/// Holds back the latest value until it has been left alone for `delay`.
///
/// Scheduling again replaces the pending value and restarts the delay, so a
/// burst of edits comes out as one.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn schedule(&mut self, now: Instant, value: T) {
        self.pending = Some((now + self.delay, value));
    }

    /// Take the pending value if its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        if self.deadline()? > now {
            return None;
        }
        self.cancel()
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, value)| value)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(due, _)| *due)
    }
}

/// Monotonic tag for render requests. Only a result carrying the latest
/// generation may reach the display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderGenerations {
    latest: u64,
}

impl RenderGenerations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new render, superseding every earlier one.
    pub fn advance(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    pub fn latest(&self) -> u64 {
        self.latest
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.latest
    }
}
