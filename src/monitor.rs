//! I/O governor: token-bucket read pacing plus an adaptive iowait brake.
//!
//! The analyzer is meant to run on busy database hosts, so every uncached
//! page read is throttled twice. A token-bucket [`IoRateLimiter`] caps the
//! steady read rate, and an [`IoWaitBrake`] samples host-wide CPU iowait
//! before each read, pausing the whole parse (and releasing its file
//! descriptor through [`PauseHooks`]) while the disk is saturated.
//!
//! The brake reads its CPU counters through the [`CpuTimesSource`] trait so
//! tests can script pressure scenarios without touching `/proc`.

use std::fs;
use std::io;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::UsageError;

/// Default CPU iowait percentage above which reads pause.
pub const DEFAULT_IO_WAIT_THRESHOLD: f64 = 50.0;

/// Default maximum page reads per second.
pub const DEFAULT_IO_OPS_LIMIT: f64 = 200.0;

const SAMPLE_WINDOW: Duration = Duration::from_millis(100);
const PAUSE_POLL_INTERVAL: Duration = Duration::from_secs(5);
const PAUSE_TIMEOUT: Duration = Duration::from_secs(60);

/// Cumulative CPU jiffies summed across all CPUs, in `/proc/stat` order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
    pub guest_nice: u64,
}

impl CpuTimes {
    /// Sum of all ten counters.
    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
            + self.guest
            + self.guest_nice
    }
}

/// Source of aggregate CPU counters for the iowait brake.
pub trait CpuTimesSource: Send + Sync {
    fn sample(&self) -> io::Result<CpuTimes>;
}

/// Reads the aggregate `cpu` line from `/proc/stat`.
pub struct ProcStat;

impl CpuTimesSource for ProcStat {
    fn sample(&self) -> io::Result<CpuTimes> {
        let stat = fs::read_to_string("/proc/stat")?;
        stat.lines()
            .find(|line| line.starts_with("cpu "))
            .and_then(parse_cpu_line)
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidData, "no aggregate cpu line in /proc/stat")
            })
    }
}

/// Parse a `/proc/stat` aggregate cpu line into counters.
///
/// Older kernels report fewer than ten fields; missing trailing fields read
/// as zero.
fn parse_cpu_line(line: &str) -> Option<CpuTimes> {
    let mut fields = line.split_whitespace();
    if fields.next() != Some("cpu") {
        return None;
    }
    let mut values = [0u64; 10];
    for (i, value) in values.iter_mut().enumerate() {
        match fields.next() {
            Some(f) => *value = f.parse().ok()?,
            // user..idle are always present
            None if i < 4 => return None,
            None => break,
        }
    }
    Some(CpuTimes {
        user: values[0],
        nice: values[1],
        system: values[2],
        idle: values[3],
        iowait: values[4],
        irq: values[5],
        softirq: values[6],
        steal: values[7],
        guest: values[8],
        guest_nice: values[9],
    })
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token-bucket limiter on page-read operations.
///
/// The bucket starts full (allowing an initial burst of up to `max_ops`
/// reads), refills continuously at `max_ops` tokens per second, and sleeps
/// callers that find it empty. The refill sleep happens outside the lock so
/// concurrent waiters queue instead of serializing behind each other's sleep.
pub struct IoRateLimiter {
    bucket: Mutex<Bucket>,
    max_tokens: f64,
    refill_per_sec: f64,
}

impl IoRateLimiter {
    pub fn new(max_ops_per_second: f64) -> Self {
        let max = max_ops_per_second.max(f64::MIN_POSITIVE);
        IoRateLimiter {
            bucket: Mutex::new(Bucket {
                tokens: max,
                last_refill: Instant::now(),
            }),
            max_tokens: max,
            refill_per_sec: max,
        }
    }

    /// Block until one read operation is allowed.
    pub fn wait(&self) {
        let sleep_for = {
            let mut bucket = match self.bucket.lock() {
                Ok(b) => b,
                Err(poisoned) => poisoned.into_inner(),
            };

            let now = Instant::now();
            let elapsed = now.duration_since(bucket.last_refill);
            bucket.last_refill = now;

            bucket.tokens =
                (bucket.tokens + elapsed.as_secs_f64() * self.refill_per_sec).min(self.max_tokens);

            if bucket.tokens >= 1.0 {
                bucket.tokens -= 1.0;
                return;
            }

            Duration::from_secs_f64((1.0 - bucket.tokens) / self.refill_per_sec)
        };

        std::thread::sleep(sleep_for);

        let mut bucket = match self.bucket.lock() {
            Ok(b) => b,
            Err(poisoned) => poisoned.into_inner(),
        };
        bucket.last_refill = Instant::now();
        bucket.tokens = 0.0;
    }
}

/// Callbacks invoked around an adaptive pause.
///
/// The brake knows nothing about files; the parser hands it something that
/// can drop and reacquire whatever kernel resources it holds.
pub trait PauseHooks {
    /// Called once when iowait crosses the threshold, before the wait loop.
    fn on_pause(&mut self);
    /// Called once when iowait recovers; errors abort the parse.
    fn on_resume(&mut self) -> io::Result<()>;
}

/// Adaptive brake that pauses reads while host CPU iowait is high.
pub struct IoWaitBrake {
    threshold_pct: f64,
    sample_window: Duration,
    poll_interval: Duration,
    timeout: Duration,
    source: Box<dyn CpuTimesSource>,
}

impl IoWaitBrake {
    pub fn new(threshold_pct: f64) -> Self {
        Self::with_source(threshold_pct, Box::new(ProcStat))
    }

    pub fn with_source(threshold_pct: f64, source: Box<dyn CpuTimesSource>) -> Self {
        IoWaitBrake {
            threshold_pct,
            sample_window: SAMPLE_WINDOW,
            poll_interval: PAUSE_POLL_INTERVAL,
            timeout: PAUSE_TIMEOUT,
            source,
        }
    }

    /// Override the iowait sampling window (default 100 ms).
    pub fn sample_window(mut self, window: Duration) -> Self {
        self.sample_window = window;
        self
    }

    /// Override the pause re-check interval (default 5 s).
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Override the pause deadline (default 60 s).
    pub fn pause_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Gate one read: proceed while iowait is at or below the threshold,
    /// otherwise pause through `hooks` until it recovers or the deadline
    /// passes.
    ///
    /// A failing CPU sampler is a warning, not an error: the brake steps
    /// aside rather than wedging the parse on a broken `/proc/stat`.
    pub fn check(&self, hooks: &mut dyn PauseHooks) -> Result<(), UsageError> {
        let mut pct = match self.iowait_pct() {
            Ok(pct) => pct,
            Err(e) => {
                eprintln!("Warning: failed to sample I/O wait: {}", e);
                return Ok(());
            }
        };

        if pct <= self.threshold_pct {
            return Ok(());
        }

        eprintln!(
            "High I/O wait detected ({:.2}% > {:.2}%), pausing reads",
            pct, self.threshold_pct
        );
        hooks.on_pause();

        let deadline = Instant::now() + self.timeout;
        loop {
            if Instant::now() >= deadline {
                return Err(UsageError::IoPressureTimeout(pct));
            }
            std::thread::sleep(self.poll_interval);

            pct = match self.iowait_pct() {
                Ok(pct) => pct,
                Err(e) => {
                    eprintln!("Warning: failed to sample I/O wait during pause: {}", e);
                    continue;
                }
            };
            if pct <= self.threshold_pct {
                eprintln!("I/O wait dropped to {:.2}%, resuming", pct);
                hooks.on_resume()?;
                return Ok(());
            }
        }
    }

    /// Percentage of CPU time spent in iowait over one sampling window.
    fn iowait_pct(&self) -> io::Result<f64> {
        let before = self.source.sample()?;
        std::thread::sleep(self.sample_window);
        let after = self.source.sample()?;

        let delta_total = after.total().saturating_sub(before.total());
        if delta_total == 0 {
            return Ok(0.0);
        }
        let delta_iowait = after.iowait.saturating_sub(before.iowait);
        Ok(delta_iowait as f64 / delta_total as f64 * 100.0)
    }
}
