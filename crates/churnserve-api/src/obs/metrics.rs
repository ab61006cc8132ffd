//! Metrics registry for the scoring service.
//!
//! Counter and histogram are plain atomics, so writers never wait on each other
//! or on `render`. Histogram buckets are fixed in microseconds to avoid
//! floating point accumulation; they are rendered in seconds.
//! There are no per-customer labels; the only label set is the fixed
//! three-value `outcome`.

use std::fmt::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

pub const REQUESTS_TOTAL: &str = "inference_requests_total";
pub const LATENCY_SECONDS: &str = "inference_latency_seconds";
pub const OUTCOMES_TOTAL: &str = "inference_outcomes_total";
pub const DRAINING: &str = "churnserve_draining";

#[derive(Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    /// Increment by 1.
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    fn render(&self, name: &str, help: &str, out: &mut String) {
        let _ = writeln!(out, "# HELP {name} {help}");
        let _ = writeln!(out, "# TYPE {name} counter");
        let _ = writeln!(out, "{name} {}", self.get());
    }
}

// Fixed Buckets in Microseconds (µs)
// 100us, 500us, 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const BUCKETS_MICROS: [u64; 14] = [
    100, 500, 1_000, 5_000, 10_000, 25_000, 50_000, 100_000, 250_000, 500_000, 1_000_000,
    2_500_000, 5_000_000, 10_000_000,
];

pub struct Histogram {
    count: AtomicU64,
    sum_micros: AtomicU64,
    buckets: [AtomicU64; BUCKETS_MICROS.len()],
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            count: AtomicU64::new(0),
            sum_micros: AtomicU64::new(0),
            buckets: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }
}

impl Histogram {
    /// Observe a duration and increment cumulative buckets.
    pub fn observe(&self, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);

        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_micros.fetch_add(micros, Ordering::Relaxed);

        // Cumulative: every bucket at or above the value.
        for (i, &b) in BUCKETS_MICROS.iter().enumerate() {
            if micros <= b {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    fn render(&self, name: &str, help: &str, out: &mut String) {
        let _ = writeln!(out, "# HELP {name} {help}");
        let _ = writeln!(out, "# TYPE {name} histogram");
        // Load count first: a concurrent observe may make a bucket exceed it,
        // never the other way round for +Inf.
        let count = self.count();
        let sum = self.sum_micros.load(Ordering::Relaxed);
        for (i, &le) in BUCKETS_MICROS.iter().enumerate() {
            let n = self.buckets[i].load(Ordering::Relaxed).min(count);
            let _ = writeln!(out, "{name}_bucket{{le=\"{}\"}} {n}", micros_as_secs(le));
        }
        let _ = writeln!(out, "{name}_bucket{{le=\"+Inf\"}} {count}");
        let _ = writeln!(out, "{name}_sum {}", micros_as_secs(sum));
        let _ = writeln!(out, "{name}_count {count}");
    }
}

fn micros_as_secs(us: u64) -> f64 {
    us as f64 / 1_000_000.0
}

/// Terminal state of one `/predict` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Rejected,
    Failed,
}

impl Outcome {
    const ALL: [Outcome; 3] = [Outcome::Ok, Outcome::Rejected, Outcome::Failed];

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Ok => "ok",
            Outcome::Rejected => "rejected",
            Outcome::Failed => "failed",
        }
    }

    fn idx(self) -> usize {
        self as usize
    }
}

#[derive(Default)]
pub struct ServiceMetrics {
    requests: Counter,
    latency: Histogram,
    outcomes: [Counter; 3],
    draining: AtomicBool,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one scoring request that passed validation.
    pub fn increment_request_count(&self) {
        self.requests.inc();
    }

    /// Record one scoring+persistence span.
    pub fn observe_latency(&self, duration: Duration) {
        self.latency.observe(duration);
    }

    pub fn record_outcome(&self, outcome: Outcome) {
        self.outcomes[outcome.idx()].inc();
    }

    pub fn request_count(&self) -> u64 {
        self.requests.get()
    }

    pub fn latency_count(&self) -> u64 {
        self.latency.count()
    }

    pub fn outcome_count(&self, outcome: Outcome) -> u64 {
        self.outcomes[outcome.idx()].get()
    }

    /// Mark draining state.
    pub fn set_draining(&self) {
        self.draining.store(true, Ordering::Relaxed);
    }
    /// Return whether draining is active.
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Relaxed)
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.requests
            .render(REQUESTS_TOTAL, "Total inference requests", &mut out);
        self.latency
            .render(LATENCY_SECONDS, "Inference latency", &mut out);

        let _ = writeln!(out, "# HELP {OUTCOMES_TOTAL} Inference requests by outcome");
        let _ = writeln!(out, "# TYPE {OUTCOMES_TOTAL} counter");
        for o in Outcome::ALL {
            let _ = writeln!(
                out,
                "{OUTCOMES_TOTAL}{{outcome=\"{}\"}} {}",
                o.as_str(),
                self.outcome_count(o)
            );
        }

        let _ = writeln!(
            out,
            "# TYPE {DRAINING} gauge\n{DRAINING} {}",
            u8::from(self.is_draining())
        );
        out
    }
}
