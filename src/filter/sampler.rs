// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::SystemTime;

use crate::filter::Filter;
use crate::filter::FilterResult;
use crate::record::Level;
use crate::record::Metadata;
use crate::record::Record;

const COUNTERS_PER_LEVEL: usize = 4096;

/// A filter that bounds the volume of repeated messages.
///
/// Within each `tick` window, the first `first` records with the same level and message pass;
/// after that only every `thereafter`-th one does. A `thereafter` of zero drops all of them.
///
/// Counters are kept in a fixed table indexed by level and message hash, so distinct messages
/// may occasionally share a counter. The window is measured on record time.
///
/// Records at terminal levels are never sampled.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use levelog::filter::Sampler;
///
/// // first 100 per second, then every 100th
/// let sampler = Sampler::new(Duration::from_secs(1), 100, 100);
/// ```
pub struct Sampler {
    tick: i64,
    first: u64,
    thereafter: u64,
    counters: Box<[Counter]>,
    dropped: AtomicU64,
}

impl Default for Sampler {
    fn default() -> Self {
        Sampler::new(Duration::from_secs(1), 100, 100)
    }
}

impl fmt::Debug for Sampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sampler")
            .field("tick", &Duration::from_nanos(self.tick as u64))
            .field("first", &self.first)
            .field("thereafter", &self.thereafter)
            .field("dropped", &self.dropped())
            .finish()
    }
}

impl Sampler {
    /// Create a new sampler.
    pub fn new(tick: Duration, first: u64, thereafter: u64) -> Self {
        let counters = (0..Level::ALL.len() * COUNTERS_PER_LEVEL)
            .map(|_| Counter::default())
            .collect();

        Self {
            tick: i64::try_from(tick.as_nanos()).unwrap_or(i64::MAX),
            first,
            thereafter,
            counters,
            dropped: AtomicU64::new(0),
        }
    }

    /// The number of records dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Decide whether a record with `level` and `message` observed at `now` passes.
    pub fn sample(&self, level: Level, message: &str, now: SystemTime) -> bool {
        if level.is_terminal() {
            return true;
        }

        let slot = fnv32a(message) as usize % COUNTERS_PER_LEVEL;
        let counter = &self.counters[level.index() * COUNTERS_PER_LEVEL + slot];
        let n = counter.inc_check_reset(unix_nanos(now), self.tick);

        let passed = n <= self.first
            || (self.thereafter != 0 && (n - self.first) % self.thereafter == 0);
        if !passed {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        passed
    }
}

impl Filter for Sampler {
    fn enabled(&self, _: &Metadata) -> FilterResult {
        FilterResult::Neutral
    }

    fn matches(&self, record: &Record) -> FilterResult {
        if self.sample(record.level(), record.payload(), record.time()) {
            FilterResult::Neutral
        } else {
            FilterResult::Reject
        }
    }
}

#[derive(Debug, Default)]
struct Counter {
    reset_at: AtomicI64,
    count: AtomicU64,
}

impl Counter {
    fn inc_check_reset(&self, now: i64, tick: i64) -> u64 {
        let reset_at = self.reset_at.load(Ordering::Acquire);
        if reset_at > now {
            return self.count.fetch_add(1, Ordering::AcqRel) + 1;
        }

        self.count.store(1, Ordering::Release);
        let next_reset_at = now.saturating_add(tick);
        if self
            .reset_at
            .compare_exchange(reset_at, next_reset_at, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // another thread has reset the window and the counter, count on top of it
            return self.count.fetch_add(1, Ordering::AcqRel) + 1;
        }
        1
    }
}

fn unix_nanos(now: SystemTime) -> i64 {
    now.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

fn fnv32a(s: &str) -> u32 {
    const OFFSET32: u32 = 2166136261;
    const PRIME32: u32 = 16777619;

    s.bytes().fold(OFFSET32, |hash, b| (hash ^ b as u32).wrapping_mul(PRIME32))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn passed(sampler: &Sampler, level: Level, message: &str, n: usize, now: SystemTime) -> usize {
        (0..n)
            .filter(|_| sampler.sample(level, message, now))
            .count()
    }

    #[test]
    fn test_first_then_every_hundredth() {
        let now = SystemTime::now();

        let sampler = Sampler::default();
        assert_eq!(passed(&sampler, Level::Info, "storm", 250, now), 101);
        assert_eq!(sampler.dropped(), 149);

        let sampler = Sampler::default();
        assert_eq!(passed(&sampler, Level::Info, "storm", 300, now), 102);
    }

    #[test]
    fn test_window_reset() {
        let sampler = Sampler::new(Duration::from_secs(1), 2, 3);
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);

        // 1, 2 pass, 3 and 4 dropped, 5 passes
        let decisions = (0..5)
            .map(|_| sampler.sample(Level::Warn, "disk full", start))
            .collect::<Vec<_>>();
        assert_eq!(decisions, vec![true, true, false, false, true]);

        // still within the window
        let later = start + Duration::from_millis(999);
        assert!(!sampler.sample(Level::Warn, "disk full", later));

        // the window has elapsed
        let next = start + Duration::from_secs(1);
        assert!(sampler.sample(Level::Warn, "disk full", next));
        assert!(sampler.sample(Level::Warn, "disk full", next));
        assert!(!sampler.sample(Level::Warn, "disk full", next));
    }

    #[test]
    fn test_levels_are_counted_separately() {
        let now = SystemTime::now();
        let sampler = Sampler::new(Duration::from_secs(1), 1, 0);

        assert!(sampler.sample(Level::Info, "retry", now));
        assert!(!sampler.sample(Level::Info, "retry", now));
        assert!(sampler.sample(Level::Error, "retry", now));
        assert!(!sampler.sample(Level::Error, "retry", now));
    }

    #[test]
    fn test_terminal_levels_are_never_sampled() {
        let now = SystemTime::now();
        let sampler = Sampler::new(Duration::from_secs(1), 1, 0);

        assert_eq!(passed(&sampler, Level::Panic, "boom", 10, now), 10);
        assert_eq!(passed(&sampler, Level::Fatal, "boom", 10, now), 10);
        assert_eq!(sampler.dropped(), 0);
    }

    #[test]
    fn test_concurrent_counting() {
        let now = SystemTime::now();
        let sampler = Arc::new(Sampler::default());
        // open the window first so that the threads only increment
        assert!(sampler.sample(Level::Info, "busy", now));

        let handles = (0..8)
            .map(|_| {
                let sampler = sampler.clone();
                thread::spawn(move || passed(&sampler, Level::Info, "busy", 100, now))
            })
            .collect::<Vec<_>>();
        let total = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .sum::<usize>();

        // 801 records: 1..=100, 200, 300, ..., 800
        assert_eq!(total + 1, 107);
    }
}
