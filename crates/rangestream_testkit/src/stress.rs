//! Stress helpers for concurrent stream access.
//!
//! These run many threads against one backend and report what happened.

use rangestream_core::Backend;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {name} ===");
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Operations per thread.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Size of each event in bytes.
    pub event_size: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 1_000,
            threads: 4,
            event_size: 64,
        }
    }
}

/// Event payload written by thread `thread` as its `seq`-th append.
///
/// The first 16 bytes identify the writer and sequence; the rest is padding
/// up to `size`.
pub fn tagged_event(thread: usize, seq: usize, size: usize) -> Vec<u8> {
    let mut event = Vec::with_capacity(size.max(16));
    event.extend_from_slice(&(thread as u64).to_be_bytes());
    event.extend_from_slice(&(seq as u64).to_be_bytes());
    event.resize(size.max(16), 0xAB);
    event
}

/// Decodes the `(thread, seq)` tag written by [`tagged_event`].
pub fn event_tag(event: &[u8]) -> Option<(usize, usize)> {
    let thread = u64::from_be_bytes(event.get(..8)?.try_into().ok()?);
    let seq = u64::from_be_bytes(event.get(8..16)?.try_into().ok()?);
    Some((thread as usize, seq as usize))
}

/// Appends from `config.threads` threads to the stream `name` at once.
///
/// Every thread gets its own handle. Returns after all threads finish.
pub fn stress_concurrent_adds(
    backend: Arc<dyn Backend>,
    name: &str,
    config: &StressConfig,
) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(config.threads));

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let backend = Arc::clone(&backend);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let barrier = Arc::clone(&barrier);
            let name = name.to_string();
            let ops = config.operations;
            let size = config.event_size;

            thread::spawn(move || {
                let Ok(stream) = backend.get_stream(&name) else {
                    failed.fetch_add(ops, Ordering::Relaxed);
                    barrier.wait();
                    return;
                };
                barrier.wait();
                for seq in 0..ops {
                    match stream.add(tagged_event(t, seq, size)) {
                        Ok(()) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Runs adds, full reads and prefix deletes on one stream from many threads.
///
/// Readers check that every read returns whole events in per-writer order;
/// a read that sees a torn or reordered stream counts as a failure. A
/// delete refused because the stream is empty counts as a success.
pub fn stress_mixed_operations(
    backend: Arc<dyn Backend>,
    name: &str,
    config: &StressConfig,
) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let backend = Arc::clone(&backend);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let name = name.to_string();
            let ops = config.operations;
            let size = config.event_size;

            thread::spawn(move || {
                let Ok(stream) = backend.get_stream(&name) else {
                    failed.fetch_add(ops, Ordering::Relaxed);
                    return;
                };
                for seq in 0..ops {
                    let ok = match seq % 3 {
                        0 => stream.add(tagged_event(t, seq, size)).is_ok(),
                        1 => stream
                            .read_to_vec(0, -1)
                            .map(|events| is_per_writer_ordered(&events))
                            .unwrap_or(false),
                        // An empty stream rejects [0, 1)
                        _ => match stream.del(0, 1) {
                            Ok(_) => true,
                            Err(err) => err.is_validation(),
                        },
                    };
                    if ok {
                        successful.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Whether each writer's events appear in increasing sequence order.
pub fn is_per_writer_ordered(events: &[Vec<u8>]) -> bool {
    let mut last = std::collections::HashMap::new();
    for event in events {
        let Some((thread, seq)) = event_tag(event) else {
            return false;
        };
        if let Some(prev) = last.insert(thread, seq) {
            if prev >= seq {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        let event = tagged_event(3, 41, 32);
        assert_eq!(event.len(), 32);
        assert_eq!(event_tag(&event), Some((3, 41)));
        assert_eq!(event_tag(b"short"), None);
    }

    #[test]
    fn per_writer_order_detects_reordering() {
        let ordered = vec![tagged_event(0, 0, 16), tagged_event(1, 0, 16), tagged_event(0, 1, 16)];
        assert!(is_per_writer_ordered(&ordered));
        let reordered = vec![tagged_event(0, 1, 16), tagged_event(0, 0, 16)];
        assert!(!is_per_writer_ordered(&reordered));
    }
}
