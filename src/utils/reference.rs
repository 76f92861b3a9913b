//! Internal reference numbers, e.g. `A0000000577`.
//!
//! The numeric part is the wall clock in milliseconds modulo 10^10. The generator keeps the
//! last value it issued and bumps past it, so calls landing in the same millisecond still get
//! distinct numbers within one process. Across processes the store's unique constraint decides.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

pub const DEFAULT_REFERENCE_PREFIX: &str = "A";
const REFERENCE_MODULUS: u64 = 10_000_000_000;
const REFERENCE_DIGITS: usize = 10;

#[derive(Debug)]
pub struct ReferenceGenerator {
    prefix: String,
    last: AtomicU64,
}

impl ReferenceGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            last: AtomicU64::new(u64::MAX),
        }
    }

    pub fn next_reference(&self) -> String {
        let now_ms = Utc::now().timestamp_millis().max(0) as u64;
        self.format(self.next_sequence(now_ms))
    }

    fn next_sequence(&self, now_ms: u64) -> u64 {
        let candidate = now_ms % REFERENCE_MODULUS;
        let mut issued = candidate;
        // fetch_update only errs when the closure returns None, which it never does
        let _ = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                let clock_ahead = last == u64::MAX
                    || candidate > last
                    || last - candidate > REFERENCE_MODULUS / 2;
                issued = if clock_ahead {
                    candidate
                } else {
                    (last + 1) % REFERENCE_MODULUS
                };
                Some(issued)
            });
        issued
    }

    fn format(&self, sequence: u64) -> String {
        format!("{}{:0width$}", self.prefix, sequence, width = REFERENCE_DIGITS)
    }
}

impl Default for ReferenceGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE_PREFIX)
    }
}
