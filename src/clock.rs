// Clock - time source for pacing and timeouts
//
// Wireless write pacing and the join procedure's per-attempt timeout both read
// time through this trait so tests can drive them with a manual clock.

use std::time::{Duration, Instant};

pub trait Clock {
    /// Monotonic time since the clock's origin
    fn now(&self) -> Duration;

    /// Block the caller. Only the startup join procedure is allowed to call this.
    fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation backed by `Instant` and `thread::sleep`
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<K: Clock + ?Sized> Clock for &K {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

impl<K: Clock + ?Sized> Clock for std::rc::Rc<K> {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}
