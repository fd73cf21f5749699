//! Identity collaborators: uid generation and the creation-time clock.
//!
//! Both are injected into the store so tests can pin them down.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, TimeZone, Utc};

/// Source of globally unique object identifiers.
pub trait UidGenerator: Send + Sync {
    fn next_uid(&self) -> String;
}

/// 122-bit random identifiers from the OS CSPRNG (UUID v4).
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomUids;

impl UidGenerator for RandomUids {
    fn next_uid(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Source of creation timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that advances one second per reading, starting at `start`.
#[derive(Debug)]
pub struct SteppingClock {
    start: i64,
    ticks: AtomicU64,
}

impl SteppingClock {
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            start: start.timestamp(),
            ticks: AtomicU64::new(0),
        }
    }
}

impl Default for SteppingClock {
    fn default() -> Self {
        Self::starting_at(DateTime::<Utc>::default())
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) as i64;
        Utc.timestamp_opt(self.start + tick, 0)
            .single()
            .unwrap_or_default()
    }
}
