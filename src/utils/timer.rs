//! Wall-clock measurement for model calls and run phases
//!
//! Built on `tokio::time::Instant`, so measurements follow a paused test
//! clock the same way timeouts and batch delays do.

use std::fmt::Write as _;
use std::time::Duration;
use tokio::time::Instant;

/// Latency of one labelled operation
#[derive(Debug)]
pub struct Timer {
    label: String,
    started: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Whole milliseconds, saturating at `u64::MAX`
    pub fn elapsed_ms(&self) -> u64 {
        millis(self.elapsed())
    }

    /// Log the elapsed time at debug level and return it
    pub fn stop(self) -> Duration {
        let elapsed = self.elapsed();
        tracing::debug!("{} took {}ms", self.label, elapsed.as_millis());
        elapsed
    }
}

/// Durations of consecutive run phases
#[derive(Debug)]
pub struct Stopwatch {
    started: Instant,
    last: Instant,
    phases: Vec<(String, Duration)>,
}

impl Stopwatch {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            last: now,
            phases: Vec::new(),
        }
    }

    /// Close the current phase under `label` and return its duration
    pub fn lap(&mut self, label: impl Into<String>) -> Duration {
        let now = Instant::now();
        let phase = now.saturating_duration_since(self.last);
        self.last = now;
        self.phases.push((label.into(), phase));
        phase
    }

    pub fn total(&self) -> Duration {
        self.started.elapsed()
    }

    /// One `label: Nms` line per phase, then the total
    pub fn format(&self) -> String {
        let mut out = String::new();
        for (label, phase) in &self.phases {
            let _ = writeln!(out, "  {label}: {}ms", millis(*phase));
        }
        let _ = write!(out, "  total: {}ms", millis(self.total()));
        out
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn test_timer_follows_paused_clock() {
        let timer = Timer::start("m1");
        sleep(Duration::from_millis(250)).await;
        assert_eq!(timer.elapsed_ms(), 250);
        assert_eq!(timer.stop(), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopwatch_phases() {
        let mut sw = Stopwatch::new();
        sleep(Duration::from_millis(10)).await;
        assert_eq!(sw.lap("synthesis"), Duration::from_millis(10));
        sleep(Duration::from_millis(30)).await;
        assert_eq!(sw.lap("execution"), Duration::from_millis(30));

        assert_eq!(
            sw.format(),
            "  synthesis: 10ms\n  execution: 30ms\n  total: 40ms"
        );
    }
}
