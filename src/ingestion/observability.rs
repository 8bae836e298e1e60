use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::types::FormatKey;

use super::unified::{IngestionOutcome, LoadedLayer};

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestionSeverity {
    /// Informational event (a layer was loaded).
    Info,
    /// Warning-level event (file skipped: empty, unsupported or too large).
    Warning,
    /// Error-level event (a recognized file failed to decode).
    Error,
    /// Critical error (the file could not even be read, or its archive could not be built).
    Critical,
}

impl IngestionSeverity {
    /// Severity of an outcome.
    pub fn of(outcome: &IngestionOutcome) -> Self {
        match outcome {
            IngestionOutcome::Loaded(_) => Self::Info,
            IngestionOutcome::Empty { .. }
            | IngestionOutcome::Unsupported { .. }
            | IngestionOutcome::TooLarge { .. } => Self::Warning,
            IngestionOutcome::ParseError { error, .. } => match error {
                DecodeError::Io(_) | DecodeError::Archive(_) | DecodeError::Task(_) => Self::Critical,
                _ => Self::Error,
            },
        }
    }
}

/// Context about one logical file of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionContext {
    /// Process-wide batch number.
    pub batch_id: u64,
    /// Position of the file in the working set.
    pub index: usize,
    /// File name (the synthesized archive name for shapefile groups).
    pub file_name: String,
    /// Resolved format.
    pub format: FormatKey,
}

/// Observer interface for ingestion outcomes.
///
/// One callback per outcome kind, invoked in emission order. Implementors can record
/// metrics, show notifications, or trigger alerts.
pub trait IngestionObserver: Send + Sync {
    /// A layer was loaded.
    fn on_loaded(&self, _ctx: &IngestionContext, _layer: &LoadedLayer) {}

    /// The file decoded to zero features.
    fn on_empty(&self, _ctx: &IngestionContext) {}

    /// The file exceeded the size limit and was never decoded.
    fn on_too_large(&self, _ctx: &IngestionContext, _size: u64, _limit: u64) {}

    /// No decoder handles the file's extension.
    fn on_unsupported(&self, _ctx: &IngestionContext) {}

    /// Decoding failed.
    fn on_parse_error(&self, _ctx: &IngestionContext, _error: &DecodeError) {}

    /// Called after the per-kind callback when the outcome meets the alert threshold.
    fn on_alert(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _outcome: &IngestionOutcome) {}
}

/// Route `outcome` to the matching callback, then to `on_alert` if it is severe enough.
pub(crate) fn notify(
    observer: &dyn IngestionObserver,
    ctx: &IngestionContext,
    outcome: &IngestionOutcome,
    alert_at_or_above: IngestionSeverity,
) {
    match outcome {
        IngestionOutcome::Loaded(layer) => observer.on_loaded(ctx, layer),
        IngestionOutcome::Empty { .. } => observer.on_empty(ctx),
        IngestionOutcome::TooLarge { size, limit, .. } => observer.on_too_large(ctx, *size, *limit),
        IngestionOutcome::Unsupported { .. } => observer.on_unsupported(ctx),
        IngestionOutcome::ParseError { error, .. } => observer.on_parse_error(ctx, error),
    }
    let severity = IngestionSeverity::of(outcome);
    if severity >= alert_at_or_above {
        observer.on_alert(ctx, severity, outcome);
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_loaded(&self, ctx: &IngestionContext, layer: &LoadedLayer) {
        for o in &self.observers {
            o.on_loaded(ctx, layer);
        }
    }

    fn on_empty(&self, ctx: &IngestionContext) {
        for o in &self.observers {
            o.on_empty(ctx);
        }
    }

    fn on_too_large(&self, ctx: &IngestionContext, size: u64, limit: u64) {
        for o in &self.observers {
            o.on_too_large(ctx, size, limit);
        }
    }

    fn on_unsupported(&self, ctx: &IngestionContext) {
        for o in &self.observers {
            o.on_unsupported(ctx);
        }
    }

    fn on_parse_error(&self, ctx: &IngestionContext, error: &DecodeError) {
        for o in &self.observers {
            o.on_parse_error(ctx, error);
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, outcome: &IngestionOutcome) {
        for o in &self.observers {
            o.on_alert(ctx, severity, outcome);
        }
    }
}

/// Logs ingestion events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl IngestionObserver for StdErrObserver {
    fn on_loaded(&self, ctx: &IngestionContext, layer: &LoadedLayer) {
        eprintln!(
            "[ingest][loaded] format={} file={} features={}",
            ctx.format,
            ctx.file_name,
            layer.feature_count()
        );
    }

    fn on_empty(&self, ctx: &IngestionContext) {
        eprintln!("[ingest][empty] format={} file={}", ctx.format, ctx.file_name);
    }

    fn on_too_large(&self, ctx: &IngestionContext, size: u64, limit: u64) {
        eprintln!(
            "[ingest][too_large] format={} file={} size={size} limit={limit}",
            ctx.format, ctx.file_name
        );
    }

    fn on_unsupported(&self, ctx: &IngestionContext) {
        eprintln!("[ingest][unsupported] file={}", ctx.file_name);
    }

    fn on_parse_error(&self, ctx: &IngestionContext, error: &DecodeError) {
        eprintln!(
            "[ingest][parse_error] format={} file={} err={}",
            ctx.format, ctx.file_name, error
        );
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, outcome: &IngestionOutcome) {
        eprintln!(
            "[ALERT][ingest][{:?}] kind={} file={}",
            severity,
            outcome.kind(),
            ctx.file_name
        );
    }
}

/// Forwards ingestion events to `tracing`.
///
/// Loaded and skipped files are logged at `info`/`warn`, decode failures at `error`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl IngestionObserver for TracingObserver {
    fn on_loaded(&self, ctx: &IngestionContext, layer: &LoadedLayer) {
        tracing::info!(
            batch = ctx.batch_id,
            file = %ctx.file_name,
            format = %ctx.format,
            features = layer.feature_count(),
            "Layer loaded"
        );
    }

    fn on_empty(&self, ctx: &IngestionContext) {
        tracing::warn!(batch = ctx.batch_id, file = %ctx.file_name, format = %ctx.format, "File has no features");
    }

    fn on_too_large(&self, ctx: &IngestionContext, size: u64, limit: u64) {
        tracing::warn!(batch = ctx.batch_id, file = %ctx.file_name, size, limit, "File exceeds size limit");
    }

    fn on_unsupported(&self, ctx: &IngestionContext) {
        tracing::warn!(batch = ctx.batch_id, file = %ctx.file_name, "Unsupported file type");
    }

    fn on_parse_error(&self, ctx: &IngestionContext, error: &DecodeError) {
        tracing::error!(
            batch = ctx.batch_id,
            file = %ctx.file_name,
            format = %ctx.format,
            error = %error,
            "Failed to parse file"
        );
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, outcome: &IngestionOutcome) {
        tracing::error!(
            batch = ctx.batch_id,
            file = %ctx.file_name,
            severity = ?severity,
            kind = %outcome.kind(),
            "Ingestion alert"
        );
    }
}

/// Appends ingestion events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl IngestionObserver for FileObserver {
    fn on_loaded(&self, ctx: &IngestionContext, layer: &LoadedLayer) {
        self.append_line(&format!(
            "{} loaded format={} file={} features={}",
            unix_ts(),
            ctx.format,
            ctx.file_name,
            layer.feature_count()
        ));
    }

    fn on_empty(&self, ctx: &IngestionContext) {
        self.append_line(&format!("{} empty format={} file={}", unix_ts(), ctx.format, ctx.file_name));
    }

    fn on_too_large(&self, ctx: &IngestionContext, size: u64, limit: u64) {
        self.append_line(&format!(
            "{} too_large format={} file={} size={size} limit={limit}",
            unix_ts(),
            ctx.format,
            ctx.file_name
        ));
    }

    fn on_unsupported(&self, ctx: &IngestionContext) {
        self.append_line(&format!("{} unsupported file={}", unix_ts(), ctx.file_name));
    }

    fn on_parse_error(&self, ctx: &IngestionContext, error: &DecodeError) {
        self.append_line(&format!(
            "{} parse_error format={} file={} err={}",
            unix_ts(),
            ctx.format,
            ctx.file_name,
            error
        ));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, outcome: &IngestionOutcome) {
        self.append_line(&format!(
            "{} ALERT severity={:?} kind={} file={}",
            unix_ts(),
            severity,
            outcome.kind(),
            ctx.file_name
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
