//! Change sequence numbers: a totally ordered, per-partition logical
//! clock used to stamp every write and to detect write-write races at
//! commit time (spec §4.4, §5).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// A change sequence number: wall-clock milliseconds plus a logical
/// counter that breaks ties within the same millisecond, plus the
/// replica identifier that produced it. Ordering is lexicographic on
/// `(millis, counter)` — `replica_id` never participates in ordering,
/// it only disambiguates which node authored the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Csn {
    pub millis: u64,
    pub counter: u64,
    pub replica_id: u32,
}

impl std::fmt::Display for Csn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:06}#{:x}", self.millis, self.counter, self.replica_id)
    }
}

/// Issues monotonically increasing [`Csn`]s for one replica. Not
/// `Clone`; share behind an `Arc` (spec §5 concurrency model).
#[derive(Debug)]
pub struct CsnGenerator {
    replica_id: u32,
    last_millis: AtomicU64,
    counter: AtomicU64,
}

impl CsnGenerator {
    pub fn new(replica_id: u32) -> Self {
        Self {
            replica_id,
            last_millis: AtomicU64::new(0),
            counter: AtomicU64::new(0),
        }
    }

    pub fn next(&self) -> Csn {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let prev = self.last_millis.swap(now, Ordering::SeqCst);
        let counter = if prev == now {
            self.counter.fetch_add(1, Ordering::SeqCst) + 1
        } else {
            self.counter.store(0, Ordering::SeqCst);
            0
        };
        Csn {
            millis: now,
            counter,
            replica_id: self.replica_id,
        }
    }
}
