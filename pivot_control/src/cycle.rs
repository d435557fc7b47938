//! Fixed-cadence host loop driving `PositionSubsystem::step()`.
//!
//! Sleeps to absolute `Instant` deadlines so pacing does not drift with tick
//! duration. A tick that runs past its slot is counted as an overrun and
//! logged; the slots it consumed are skipped rather than replayed back to
//! back.
//!
//! The loop ends when the shared running flag is cleared (Ctrl-C handler) or
//! when the optional cycle budget is exhausted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use pivot_common::rotation::CycleConfig;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last tick duration [ns].
    pub last_cycle_ns: i64,
    /// Minimum tick duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum tick duration [ns].
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Ticks that ran past their slot.
    pub overruns: u64,
    /// Slots dropped after overruns.
    pub skipped_slots: u64,
    /// Maximum wake-up latency [ns] (actual wake − deadline).
    pub max_latency_ns: i64,
}

impl CycleStats {
    /// Create a new zeroed stats instance.
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            skipped_slots: 0,
            max_latency_ns: 0,
        }
    }

    /// Record a tick duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns += duration_ns;
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average tick time [ns] (0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Drift-free periodic driver.
#[derive(Debug)]
pub struct CycleRunner {
    period: Duration,
    max_cycles: Option<u64>,
    running: Arc<AtomicBool>,
    stats: CycleStats,
}

impl CycleRunner {
    /// Runner ticking every `config.cycle_time_us`.
    pub fn new(config: &CycleConfig) -> Self {
        Self {
            period: config.period(),
            max_cycles: None,
            running: Arc::new(AtomicBool::new(true)),
            stats: CycleStats::new(),
        }
    }

    /// Stop after `max_cycles` ticks.
    pub fn with_max_cycles(mut self, max_cycles: u64) -> Self {
        self.max_cycles = Some(max_cycles);
        self
    }

    /// Flag observed before every tick; clear it to end [`run`](Self::run).
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Nominal tick period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Statistics gathered so far.
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// Call `tick(cycle_index)` once per period until stopped.
    pub fn run<F>(&mut self, mut tick: F) -> &CycleStats
    where
        F: FnMut(u64),
    {
        let budget_ns = self.period.as_nanos() as i64;
        info!(
            period_us = self.period.as_micros() as u64,
            max_cycles = ?self.max_cycles,
            "cycle loop started"
        );

        let mut deadline = Instant::now();
        let mut index: u64 = 0;

        while self.running.load(Ordering::Acquire) {
            if self.max_cycles.is_some_and(|max| index >= max) {
                break;
            }

            let start = Instant::now();
            let latency_ns = start.saturating_duration_since(deadline).as_nanos() as i64;

            tick(index);

            let duration_ns = start.elapsed().as_nanos() as i64;
            self.stats.record(duration_ns, latency_ns);
            index += 1;

            deadline += self.period;
            let now = Instant::now();
            if now > deadline {
                self.stats.overruns += 1;
                let behind = now.duration_since(deadline);
                let skipped = (behind.as_nanos() / self.period.as_nanos().max(1)) as u32;
                warn!(
                    cycle = index - 1,
                    duration_ns,
                    budget_ns,
                    skipped,
                    "cycle overrun"
                );
                if skipped > 0 {
                    self.stats.skipped_slots += u64::from(skipped);
                    deadline += self.period * skipped;
                }
                // Next deadline is still in the past (partial slot); take it now.
                continue;
            }

            std::thread::sleep(deadline - now);
        }

        info!(
            cycles = self.stats.cycle_count,
            overruns = self.stats.overruns,
            avg_ns = self.stats.avg_cycle_ns(),
            max_ns = self.stats.max_cycle_ns,
            "cycle loop stopped"
        );
        debug!(stats = ?self.stats, "cycle statistics");
        &self.stats
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
