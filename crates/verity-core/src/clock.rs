// crates/verity-core/src/clock.rs
//
// Time source abstraction. Decay weights and trend horizons depend on "now";
// engines read it through a `Clock` so tests and offline evaluation can pin it.

use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A deterministic clock.
///
/// Time only advances when you tell it to.
#[derive(Debug)]
pub struct FixedClock {
    current: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            current: RwLock::new(at),
        }
    }

    /// Advance time by the given duration.
    pub fn advance(&self, by: Duration) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }

    /// Set the time to a specific instant.
    pub fn set(&self, at: DateTime<Utc>) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = at;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.read().unwrap_or_else(|e| e.into_inner())
    }
}
