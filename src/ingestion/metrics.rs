use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use super::unified::IngestionOutcome;

/// Running counters for an [`super::Ingestor`].
///
/// Counters accumulate across batches; batches may overlap, so nothing is reset per run.
/// Callers can snapshot them at any time.
pub struct IngestionMetrics {
    batches_started: AtomicU64,
    batches_finished: AtomicU64,
    last_batch_ns: AtomicU64,

    files_received: AtomicU64,
    archives_synthesized: AtomicU64,

    loaded: AtomicU64,
    empty: AtomicU64,
    too_large: AtomicU64,
    unsupported: AtomicU64,
    parse_errors: AtomicU64,
    features_loaded: AtomicU64,

    active_decodes: AtomicUsize,
    max_active_decodes: AtomicUsize,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self {
            batches_started: AtomicU64::new(0),
            batches_finished: AtomicU64::new(0),
            last_batch_ns: AtomicU64::new(0),
            files_received: AtomicU64::new(0),
            archives_synthesized: AtomicU64::new(0),
            loaded: AtomicU64::new(0),
            empty: AtomicU64::new(0),
            too_large: AtomicU64::new(0),
            unsupported: AtomicU64::new(0),
            parse_errors: AtomicU64::new(0),
            features_loaded: AtomicU64::new(0),
            active_decodes: AtomicUsize::new(0),
            max_active_decodes: AtomicUsize::new(0),
        }
    }

    pub(crate) fn on_batch_start(&self, files: usize) {
        let _ = self.batches_started.fetch_add(1, Ordering::SeqCst);
        let _ = self.files_received.fetch_add(files as u64, Ordering::SeqCst);
    }

    pub(crate) fn on_batch_end(&self, elapsed: Duration) {
        let _ = self.batches_finished.fetch_add(1, Ordering::SeqCst);
        self.last_batch_ns
            .store(elapsed.as_nanos().min(u64::MAX as u128) as u64, Ordering::SeqCst);
    }

    pub(crate) fn on_archive_synthesized(&self) {
        let _ = self.archives_synthesized.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn on_decode_start(&self) {
        let now = self.active_decodes.fetch_add(1, Ordering::SeqCst) + 1;
        update_max_usize(&self.max_active_decodes, now);
    }

    pub(crate) fn on_decode_end(&self) {
        let _ = self.active_decodes.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn on_outcome(&self, outcome: &IngestionOutcome) {
        let counter = match outcome {
            IngestionOutcome::Loaded(layer) => {
                let _ = self
                    .features_loaded
                    .fetch_add(layer.feature_count() as u64, Ordering::SeqCst);
                &self.loaded
            }
            IngestionOutcome::Empty { .. } => &self.empty,
            IngestionOutcome::TooLarge { .. } => &self.too_large,
            IngestionOutcome::Unsupported { .. } => &self.unsupported,
            IngestionOutcome::ParseError { .. } => &self.parse_errors,
        };
        let _ = counter.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> IngestionMetricsSnapshot {
        let last_ns = self.last_batch_ns.load(Ordering::SeqCst);
        let last_batch_elapsed = if last_ns > 0 {
            Some(Duration::from_nanos(last_ns))
        } else {
            None
        };

        IngestionMetricsSnapshot {
            batches_started: self.batches_started.load(Ordering::SeqCst),
            batches_finished: self.batches_finished.load(Ordering::SeqCst),
            last_batch_elapsed,
            files_received: self.files_received.load(Ordering::SeqCst),
            archives_synthesized: self.archives_synthesized.load(Ordering::SeqCst),
            loaded: self.loaded.load(Ordering::SeqCst),
            empty: self.empty.load(Ordering::SeqCst),
            too_large: self.too_large.load(Ordering::SeqCst),
            unsupported: self.unsupported.load(Ordering::SeqCst),
            parse_errors: self.parse_errors.load(Ordering::SeqCst),
            features_loaded: self.features_loaded.load(Ordering::SeqCst),
            max_active_decodes: self.max_active_decodes.load(Ordering::SeqCst),
        }
    }
}

impl Default for IngestionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IngestionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IngestionMetrics").field(&self.snapshot()).finish()
    }
}

fn update_max_usize(dst: &AtomicUsize, now: usize) {
    loop {
        let cur = dst.load(Ordering::SeqCst);
        if now <= cur {
            break;
        }
        if dst
            .compare_exchange(cur, now, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            break;
        }
    }
}

/// Immutable snapshot of [`IngestionMetrics`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IngestionMetricsSnapshot {
    pub batches_started: u64,
    pub batches_finished: u64,
    pub last_batch_elapsed: Option<Duration>,
    pub files_received: u64,
    pub archives_synthesized: u64,
    pub loaded: u64,
    pub empty: u64,
    pub too_large: u64,
    pub unsupported: u64,
    pub parse_errors: u64,
    pub features_loaded: u64,
    pub max_active_decodes: usize,
}

impl IngestionMetricsSnapshot {
    /// Outcomes emitted so far, all kinds together.
    pub fn outcomes(&self) -> u64 {
        self.loaded + self.empty + self.too_large + self.unsupported + self.parse_errors
    }
}

impl fmt::Display for IngestionMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "batches={}/{}, files={}, archives={}, loaded={}, empty={}, too_large={}, unsupported={}, parse_errors={}, features={}, max_active_decodes={}, last_batch={:?}",
            self.batches_finished,
            self.batches_started,
            self.files_received,
            self.archives_synthesized,
            self.loaded,
            self.empty,
            self.too_large,
            self.unsupported,
            self.parse_errors,
            self.features_loaded,
            self.max_active_decodes,
            self.last_batch_elapsed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;

    #[test]
    fn outcomes_are_counted_by_kind() {
        let m = IngestionMetrics::new();
        m.on_batch_start(3);
        m.on_outcome(&IngestionOutcome::Unsupported {
            file_name: "a.xyz".to_string(),
        });
        m.on_outcome(&IngestionOutcome::ParseError {
            file_name: "b.csv".to_string(),
            error: DecodeError::other("bad"),
        });
        m.on_outcome(&IngestionOutcome::Empty {
            file_name: "c.kml".to_string(),
        });
        m.on_batch_end(Duration::from_millis(5));

        let s = m.snapshot();
        assert_eq!(s.files_received, 3);
        assert_eq!((s.unsupported, s.parse_errors, s.empty, s.loaded), (1, 1, 1, 0));
        assert_eq!(s.outcomes(), 3);
        assert_eq!(s.last_batch_elapsed, Some(Duration::from_millis(5)));
        assert!(s.to_string().contains("parse_errors=1"));
    }

    #[test]
    fn max_active_decodes_tracks_peak() {
        let m = IngestionMetrics::new();
        m.on_decode_start();
        m.on_decode_start();
        m.on_decode_end();
        m.on_decode_start();
        m.on_decode_end();
        m.on_decode_end();
        assert_eq!(m.snapshot().max_active_decodes, 2);
    }
}
