//! Rate-limited, human-readable run statistics.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use log::info;

use crate::error::Error;
use crate::testcase::Verdict;

/// Minimum interval between two non-forced prints.
const PRINT_INTERVAL: Duration = Duration::from_secs(10);

/// Running totals for one coordinator lifetime, plus the bookkeeping needed
/// to print a rate-limited, human-formatted summary line.
pub struct StatsAggregator {
    total_execs: u64,
    corpus_size: usize,
    corpus_bytes: u64,
    aggregate_coverage: usize,
    last_coverage_snapshot: usize,
    crashes: u64,
    timeouts: u64,
    cr3_changes: u64,
    connected_clients: u64,
    start_time: Instant,
    first_client_time: Option<Instant>,
    last_print_time: Option<Instant>,
    last_coverage_time: Option<Instant>,
    log_file: Option<File>,
}

impl StatsAggregator {
    /// Creates a fresh aggregator. `log_path` is opened (appended to) lazily
    /// on the first print if non-empty.
    #[must_use]
    pub fn new() -> Self {
        Self {
            total_execs: 0,
            corpus_size: 0,
            corpus_bytes: 0,
            aggregate_coverage: 0,
            last_coverage_snapshot: 0,
            crashes: 0,
            timeouts: 0,
            cr3_changes: 0,
            connected_clients: 0,
            start_time: Instant::now(),
            first_client_time: None,
            last_print_time: None,
            last_coverage_time: None,
            log_file: None,
        }
    }

    /// Opens `log_path` for appending, so future prints are mirrored to it.
    pub fn open_log(&mut self, log_path: &Path) -> Result<(), Error> {
        if log_path.as_os_str().is_empty() {
            return Ok(());
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;
        self.log_file = Some(file);
        Ok(())
    }

    /// Records a new client connecting; starts the rate clock on the first
    /// call.
    pub fn new_client(&mut self) {
        self.connected_clients += 1;
        if self.first_client_time.is_none() {
            self.first_client_time = Some(Instant::now());
        }
    }

    /// Records a client disconnecting.
    pub fn disconnect(&mut self) {
        self.connected_clients = self.connected_clients.saturating_sub(1);
    }

    /// Records one verdict received from a worker, updating the matching
    /// bucket and, if `coverage_grew`, the last-coverage timestamp.
    pub fn record_verdict(&mut self, verdict: &Verdict, aggregate_coverage_size: usize, coverage_grew: bool) {
        self.total_execs += 1;
        match verdict {
            Verdict::Ok => {}
            Verdict::Crash(_) => self.crashes += 1,
            Verdict::Cr3Change => self.cr3_changes += 1,
            Verdict::Timedout => self.timeouts += 1,
        }
        self.aggregate_coverage = aggregate_coverage_size;
        if coverage_grew {
            self.last_coverage_time = Some(Instant::now());
        }
    }

    /// Records the corpus's current size and byte total.
    pub fn record_corpus(&mut self, size: usize, bytes: u64) {
        self.corpus_size = size;
        self.corpus_bytes = bytes;
        self.last_coverage_snapshot = self.aggregate_coverage;
    }

    /// Total executions recorded so far.
    #[must_use]
    pub fn total_execs(&self) -> u64 {
        self.total_execs
    }

    /// Prints a single summary line iff `force` or at least [`PRINT_INTERVAL`]
    /// has elapsed since the previous print. Rates are computed against the
    /// first client's connect time, not coordinator startup, so idle startup
    /// doesn't dilute execs/sec.
    pub fn print(&mut self, force: bool) {
        let now = Instant::now();
        let due = match self.last_print_time {
            None => true,
            Some(last) => now.duration_since(last) >= PRINT_INTERVAL,
        };
        if !force && !due {
            return;
        }
        self.last_print_time = Some(now);

        let elapsed = self
            .first_client_time
            .map(|t| now.duration_since(t).as_secs_f64())
            .unwrap_or(0.0);
        let execs_per_sec = if elapsed > 0.0 {
            self.total_execs as f64 / elapsed
        } else {
            0.0
        };

        let line = format!(
            "uptime: {}s | clients: {} | execs: {} ({:.1}/s) | corpus: {} ({} bytes) \
             | coverage: {} | crashes: {} | timeouts: {} | cr3: {}",
            self.start_time.elapsed().as_secs(),
            self.connected_clients,
            self.total_execs,
            execs_per_sec,
            self.corpus_size,
            self.corpus_bytes,
            self.aggregate_coverage,
            self.crashes,
            self.timeouts,
            self.cr3_changes,
        );

        println!("{line}");
        info!("{line}");
        if let Some(file) = self.log_file.as_mut() {
            let _ = writeln!(file, "{line}");
        }
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}
