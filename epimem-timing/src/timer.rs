use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic clock used for every interval computation in a session.
///
/// Timestamps are nanoseconds since the timer was created. Wall-clock time
/// never goes through this trait.
pub trait Timer: Clone + Send + Sync {
    fn now(&self) -> u64;
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }
    fn record_tick(&mut self, d: Duration);
    fn tick_stats(&self) -> TickStats;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickStats {
    pub samples: usize,
    pub average_tick_ns: f64,
    pub jitter_ns: f64,
    pub min_tick_ns: f64,
    pub max_tick_ns: f64,
}

impl TickStats {
    fn from_samples(samples: &[Duration]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let times: Vec<f64> = samples.iter().map(|d| d.as_nanos() as f64).collect();
        let n = times.len() as f64;
        let avg = times.iter().sum::<f64>() / n;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / n;
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        TickStats {
            samples: times.len(),
            average_tick_ns: avg,
            jitter_ns: var.sqrt(),
            min_tick_ns: min,
            max_tick_ns: max,
        }
    }
}

fn push_sample(samples: &mut Vec<Duration>, max_samples: usize, d: Duration) {
    if samples.len() >= max_samples {
        samples.remove(0);
    }
    samples.push(d);
}

#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    pub start: Instant,
    pub tick_times: Vec<Duration>,
    pub max_samples: usize,
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            tick_times: Vec::with_capacity(1000),
            max_samples: 1000,
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for HighPrecisionTimer {
    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
    fn record_tick(&mut self, d: Duration) {
        push_sample(&mut self.tick_times, self.max_samples, d);
    }
    fn tick_stats(&self) -> TickStats {
        TickStats::from_samples(&self.tick_times)
    }
}

/// Clock that only moves when told to. Clones share the same time source.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    now_ns: Arc<AtomicU64>,
    tick_times: Vec<Duration>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        self.now_ns.fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Timer for ManualTimer {
    fn now(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }
    fn record_tick(&mut self, d: Duration) {
        push_sample(&mut self.tick_times, 1000, d);
    }
    fn tick_stats(&self) -> TickStats {
        TickStats::from_samples(&self.tick_times)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clones_share_time() {
        let timer = ManualTimer::new();
        let handle = timer.clone();
        let t0 = timer.now();
        handle.advance_ms(1_500);
        assert_eq!(timer.elapsed(t0), Duration::from_millis(1_500));
    }

    #[test]
    fn elapsed_never_goes_negative() {
        let timer = ManualTimer::new();
        timer.advance_ms(10);
        assert_eq!(timer.elapsed(u64::MAX), Duration::ZERO);
    }

    #[test]
    fn high_precision_is_monotonic() {
        let timer = HighPrecisionTimer::new();
        let a = timer.now();
        let b = timer.now();
        assert!(b >= a);
    }

    #[test]
    fn tick_stats_report_jitter() {
        let mut timer = ManualTimer::new();
        assert_eq!(timer.tick_stats().samples, 0);
        timer.record_tick(Duration::from_millis(40));
        timer.record_tick(Duration::from_millis(60));
        let stats = timer.tick_stats();
        assert_eq!(stats.samples, 2);
        assert_eq!(stats.average_tick_ns, 50_000_000.0);
        assert_eq!(stats.jitter_ns, 10_000_000.0);
        assert_eq!(stats.min_tick_ns, 40_000_000.0);
        assert_eq!(stats.max_tick_ns, 60_000_000.0);
    }

    #[test]
    fn sample_window_is_bounded() {
        let mut timer = HighPrecisionTimer::new();
        timer.max_samples = 3;
        for ms in 1..=5 {
            timer.record_tick(Duration::from_millis(ms));
        }
        assert_eq!(timer.tick_times.len(), 3);
        assert_eq!(timer.tick_times[0], Duration::from_millis(3));
    }
}
