use std::time::{Duration, Instant};

/// Single recurring deadline, polled by whoever owns the event loop.
///
/// Holds no callbacks and knows nothing about playback; the key lets the
/// owner tell whether the armed timer still matches what it wants.
#[derive(Debug, Clone, Default)]
pub struct Ticker {
    armed: Option<Armed>,
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    key: u64,
    interval: Duration,
    next_due: Instant,
}

impl Ticker {
    pub fn arm(&mut self, key: u64, interval: Duration, now: Instant) {
        self.armed = Some(Armed {
            key,
            interval,
            next_due: now + interval,
        });
    }

    pub fn cancel(&mut self) {
        self.armed = None;
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn key(&self) -> Option<u64> {
        self.armed.map(|a| a.key)
    }

    #[cfg(test)]
    pub fn interval(&self) -> Option<Duration> {
        self.armed.map(|a| a.interval)
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.armed.map(|a| a.next_due)
    }

    /// Fires at most once per call. The next deadline is measured from
    /// `now`, so a stalled loop does not produce a burst of ticks.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.armed.as_mut() {
            Some(armed) if now >= armed.next_due => {
                armed.next_due = now + armed.interval;
                true
            }
            _ => false,
        }
    }
}
