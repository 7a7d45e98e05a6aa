//! Aggregate encode/decode timings and correction counts.
//!
//! The monitor is shared between the encoder, decoder and simulator, so
//! its counters live behind a mutex. Each record call holds the lock for a
//! handful of additions only.

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::model::{DecodeStatistics, ProtectionMetadata};

#[derive(Debug, Clone, Default)]
struct Counters {
    encodes: u64,
    encode_time_ms: f64,
    overhead_sum: f64,

    decodes: u64,
    decode_time_ms: f64,
    max_decode_time_ms: f64,
    decodes_within_target: u64,
    failed_decodes: u64,
    tier1_corrections: u64,
    tier2_corrections: u64,
    fast_path_segments: u64,
    full_decode_segments: u64,

    simulations: u64,
    simulations_preserved: u64,
}

/// Snapshot of everything the monitor has seen
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSummary {
    pub uptime: Duration,
    pub encodes: u64,
    pub average_encode_ms: f64,
    pub average_overhead_ratio: f64,
    pub decodes: u64,
    pub average_decode_ms: f64,
    pub max_decode_ms: f64,
    /// Fraction of decodes that met their latency target
    pub within_target_rate: f64,
    pub failed_decodes: u64,
    pub tier1_corrections: u64,
    pub tier2_corrections: u64,
    pub fast_path_segments: u64,
    pub full_decode_segments: u64,
    pub simulations: u64,
    /// Fraction of simulated transmissions that preserved the narrative
    pub preservation_rate: f64,
}

/// Thread-safe accumulator for codec timings
pub struct PerformanceMonitor {
    started: Instant,
    counters: Mutex<Counters>,
}

impl PerformanceMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            counters: Mutex::new(Counters::default()),
        }
    }

    pub fn record_encode(&self, metadata: &ProtectionMetadata) {
        let mut counters = self.counters.lock();
        counters.encodes += 1;
        counters.encode_time_ms += metadata.encoding_time_ms;
        counters.overhead_sum += metadata.overhead_ratio;
    }

    pub fn record_decode(&self, stats: &DecodeStatistics) {
        let mut counters = self.counters.lock();
        counters.decodes += 1;
        counters.decode_time_ms += stats.decode_time_ms;
        counters.max_decode_time_ms = counters.max_decode_time_ms.max(stats.decode_time_ms);
        if stats.meets_performance_target {
            counters.decodes_within_target += 1;
        }
        if !stats.recovery_successful {
            counters.failed_decodes += 1;
        }
        counters.tier1_corrections += stats.tier1_corrections as u64;
        counters.tier2_corrections += stats.tier2_corrections as u64;
        counters.fast_path_segments += stats.segments_fast_path as u64;
        counters.full_decode_segments += stats.segments_full_decode as u64;
    }

    pub fn record_simulation(&self, preserved: bool) {
        let mut counters = self.counters.lock();
        counters.simulations += 1;
        if preserved {
            counters.simulations_preserved += 1;
        }
    }

    pub fn summary(&self) -> PerformanceSummary {
        let counters = self.counters.lock().clone();
        PerformanceSummary {
            uptime: self.started.elapsed(),
            encodes: counters.encodes,
            average_encode_ms: ratio(counters.encode_time_ms, counters.encodes),
            average_overhead_ratio: ratio(counters.overhead_sum, counters.encodes),
            decodes: counters.decodes,
            average_decode_ms: ratio(counters.decode_time_ms, counters.decodes),
            max_decode_ms: counters.max_decode_time_ms,
            within_target_rate: ratio(counters.decodes_within_target as f64, counters.decodes),
            failed_decodes: counters.failed_decodes,
            tier1_corrections: counters.tier1_corrections,
            tier2_corrections: counters.tier2_corrections,
            fast_path_segments: counters.fast_path_segments,
            full_decode_segments: counters.full_decode_segments,
            simulations: counters.simulations,
            preservation_rate: ratio(
                counters.simulations_preserved as f64,
                counters.simulations,
            ),
        }
    }

    /// Clear every counter; uptime keeps running
    pub fn reset(&self) {
        *self.counters.lock() = Counters::default();
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns 0.0 when nothing has been counted
fn ratio(total: f64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

impl fmt::Display for PerformanceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Encode ===")?;
        writeln!(f, "Messages: {}", self.encodes)?;
        writeln!(f, "Average time: {:.3} ms", self.average_encode_ms)?;
        writeln!(f, "Average overhead: {:.3}x", self.average_overhead_ratio)?;
        writeln!(f, "=== Decode ===")?;
        writeln!(f, "Decodes: {} ({} failed)", self.decodes, self.failed_decodes)?;
        writeln!(
            f,
            "Average time: {:.3} ms (max {:.3} ms)",
            self.average_decode_ms, self.max_decode_ms
        )?;
        writeln!(f, "Within target: {:.1}%", self.within_target_rate * 100.0)?;
        writeln!(
            f,
            "Corrections: tier-1 {} bytes, tier-2 {} units",
            self.tier1_corrections, self.tier2_corrections
        )?;
        writeln!(
            f,
            "Segments: {} fast path, {} full decode",
            self.fast_path_segments, self.full_decode_segments
        )?;
        writeln!(f, "=== Simulation ===")?;
        write!(
            f,
            "Trials: {} ({:.1}% preserved)",
            self.simulations,
            self.preservation_rate * 100.0
        )
    }
}
