//! Unified ingestion entrypoint.
//!
//! Most callers build an [`Ingestor`] once and hand it batches of [`RawFile`]s. For each
//! batch it:
//!
//! - packs shapefile components (`.shp/.shx/.dbf/.prj`) into one `{base}.zip` per base name
//! - resolves every remaining file to a [`FormatKey`] through the dispatch table
//! - decodes on the blocking pool, up to [`IngestionOptions::max_concurrency`] files at once
//! - emits exactly one [`IngestionOutcome`] per logical file, in working-set order
//!
//! Per-file problems never fail the call. Only archive synthesis under
//! [`ArchiveFailurePolicy::AbortBatch`] does.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use geo::Rect;
use geojson::{Feature, FeatureCollection};
use tokio_util::sync::CancellationToken;

use crate::error::{ArchiveSynthesisError, DecodeError, DecodeResult, IngestionError, IngestionResult};
use crate::layer::{GeoLayer, LayerSink, Style};
use crate::types::{FormatKey, Payload, PayloadKind, RawFile};

use super::classify::{classify, BaseNameRule};
use super::dispatch::{Decoder, DispatchTable, ParserOptions, SharedDecoder};
use super::metrics::{IngestionMetrics, IngestionMetricsSnapshot};
use super::observability::{notify, IngestionContext, IngestionObserver, IngestionSeverity};
use super::options::{ArchiveFailurePolicy, IngestionOptions, IngestionSettings};
use super::shapefile_group::{exclude_shapefile_parts, group_with, synthesize_archives_with_cancel};

static NEXT_BATCH_ID: AtomicU64 = AtomicU64::new(1);

/// Stream of outcomes in working-set order.
pub type OutcomeStream = BoxStream<'static, IngestionOutcome>;

/// Tag of an [`IngestionOutcome`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Loaded,
    Empty,
    TooLarge,
    Unsupported,
    ParseError,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loaded => "loaded",
            Self::Empty => "empty",
            Self::TooLarge => "too_large",
            Self::Unsupported => "unsupported",
            Self::ParseError => "parse_error",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successfully loaded layer and where it came from.
#[derive(Debug, Clone)]
pub struct LoadedLayer {
    file_name: String,
    format: FormatKey,
    bounds: Option<Rect<f64>>,
    layer: GeoLayer,
}

impl LoadedLayer {
    fn new(file_name: String, format: FormatKey, layer: GeoLayer) -> Self {
        Self {
            file_name,
            format,
            bounds: layer.bounds(),
            layer,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn format(&self) -> &FormatKey {
        &self.format
    }

    /// Bounds of the layer at load time, for fitting the map view.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.bounds
    }

    pub fn feature_count(&self) -> usize {
        self.layer.layer_count()
    }

    pub fn layer(&self) -> &GeoLayer {
        &self.layer
    }

    pub fn into_layer(self) -> GeoLayer {
        self.layer
    }
}

/// Result of ingesting one logical file.
#[derive(Debug)]
pub enum IngestionOutcome {
    /// Decoded into a non-empty layer.
    Loaded(LoadedLayer),
    /// Decoded successfully but yielded no features.
    Empty { file_name: String },
    /// Larger than the configured limit; never decoded.
    TooLarge { file_name: String, size: u64, limit: u64 },
    /// No decoder handles the extension.
    Unsupported { file_name: String },
    /// Recognized format, malformed content (or the payload could not be read).
    ParseError { file_name: String, error: DecodeError },
}

impl IngestionOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Loaded(_) => OutcomeKind::Loaded,
            Self::Empty { .. } => OutcomeKind::Empty,
            Self::TooLarge { .. } => OutcomeKind::TooLarge,
            Self::Unsupported { .. } => OutcomeKind::Unsupported,
            Self::ParseError { .. } => OutcomeKind::ParseError,
        }
    }

    pub fn file_name(&self) -> &str {
        match self {
            Self::Loaded(layer) => layer.file_name(),
            Self::Empty { file_name }
            | Self::TooLarge { file_name, .. }
            | Self::Unsupported { file_name }
            | Self::ParseError { file_name, .. } => file_name,
        }
    }

    pub fn loaded(&self) -> Option<&LoadedLayer> {
        match self {
            Self::Loaded(layer) => Some(layer),
            _ => None,
        }
    }

    pub fn severity(&self) -> IngestionSeverity {
        IngestionSeverity::of(self)
    }
}

/// Ingestion pipeline with an immutable dispatch table.
///
/// Cheap to clone; clones share the table, options and metrics.
///
/// ```no_run
/// use geofile_ingest::ingestion::{Ingestor, OutcomeKind};
/// use geofile_ingest::types::RawFile;
///
/// # async fn run() -> Result<(), geofile_ingest::IngestionError> {
/// let ingestor = Ingestor::builder().size_limit_bytes(50 * 1024 * 1024).build();
/// let files = vec![
///     RawFile::from_path("parcels.geojson").await?,
///     RawFile::from_path("roads.shp").await?,
///     RawFile::from_path("roads.dbf").await?,
/// ];
/// for outcome in ingestor.ingest(files).await? {
///     if outcome.kind() != OutcomeKind::Loaded {
///         eprintln!("{}: {}", outcome.file_name(), outcome.kind());
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Ingestor {
    inner: Arc<Inner>,
}

struct Inner {
    options: IngestionOptions,
    table: DispatchTable,
    metrics: IngestionMetrics,
}

enum WorkItem {
    File(RawFile),
    FailedArchive {
        archive_name: String,
        error: ArchiveSynthesisError,
    },
}

struct Processed {
    ctx: IngestionContext,
    outcome: IngestionOutcome,
}

impl fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ingestor")
            .field("options", &self.inner.options)
            .field("table", &self.inner.table)
            .finish()
    }
}

impl Default for Ingestor {
    fn default() -> Self {
        Self::new(IngestionOptions::default())
    }
}

impl Ingestor {
    /// Build the dispatch table from the defaults plus `options.decoder_overrides`.
    pub fn new(options: IngestionOptions) -> Self {
        let mut table = DispatchTable::with_defaults();
        for (key, decoder) in &options.decoder_overrides {
            table.register(key.clone(), Arc::clone(decoder));
        }
        Self {
            inner: Arc::new(Inner {
                options,
                table,
                metrics: IngestionMetrics::new(),
            }),
        }
    }

    pub fn builder() -> IngestorBuilder {
        IngestorBuilder::default()
    }

    pub fn options(&self) -> &IngestionOptions {
        &self.inner.options
    }

    pub fn dispatch_table(&self) -> &DispatchTable {
        &self.inner.table
    }

    /// `accept` attribute for a file picker.
    pub fn accept_attribute(&self) -> String {
        self.inner.options.accept_attribute()
    }

    pub fn metrics(&self) -> IngestionMetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Ingest a batch and collect every outcome.
    pub async fn ingest(&self, files: Vec<RawFile>) -> IngestionResult<Vec<IngestionOutcome>> {
        self.ingest_with_cancel(files, CancellationToken::new()).await
    }

    /// Like [`Self::ingest`], stopping early once `cancel` fires. Outcomes collected before
    /// cancellation are returned.
    pub async fn ingest_with_cancel(
        &self,
        files: Vec<RawFile>,
        cancel: CancellationToken,
    ) -> IngestionResult<Vec<IngestionOutcome>> {
        let outcomes: Vec<IngestionOutcome> = self.ingest_stream_with_cancel(files, cancel).await?.collect().await;
        Ok(outcomes)
    }

    /// Read the files at `paths` and ingest them.
    pub async fn ingest_paths<P: AsRef<Path>>(
        &self,
        paths: impl IntoIterator<Item = P>,
    ) -> IngestionResult<Vec<IngestionOutcome>> {
        let mut files = Vec::new();
        for path in paths {
            files.push(RawFile::from_path(path).await?);
        }
        self.ingest(files).await
    }

    /// Ingest a batch, yielding outcomes as they complete (still in working-set order).
    ///
    /// Archive synthesis happens before the stream is returned, so an
    /// [`ArchiveFailurePolicy::AbortBatch`] failure surfaces here.
    pub async fn ingest_stream(&self, files: Vec<RawFile>) -> IngestionResult<OutcomeStream> {
        self.ingest_stream_with_cancel(files, CancellationToken::new()).await
    }

    /// Streaming variant honoring `cancel`: once it fires no further file or shapefile group
    /// is started and no further outcome is yielded.
    ///
    /// The batch counts as finished in [`Self::metrics`] when the returned stream is exhausted
    /// or dropped.
    pub async fn ingest_stream_with_cancel(
        &self,
        files: Vec<RawFile>,
        cancel: CancellationToken,
    ) -> IngestionResult<OutcomeStream> {
        let batch_id = NEXT_BATCH_ID.fetch_add(1, Ordering::Relaxed);
        let batch = BatchScope::start(Arc::clone(&self.inner), files.len());

        if files.is_empty() || cancel.is_cancelled() {
            return Ok(stream::empty().boxed());
        }

        let Some(items) = self.inner.working_set(batch_id, files, &cancel).await? else {
            tracing::debug!(batch = batch_id, "Batch cancelled while packing shapefiles");
            return Ok(stream::empty().boxed());
        };
        tracing::debug!(batch = batch_id, files = items.len(), "Dispatching batch");

        let worker = Arc::clone(&self.inner);
        let token = cancel.clone();
        let limit = self.inner.options.max_concurrency.max(1);

        let outcomes = stream::iter(items.into_iter().enumerate())
            .map(move |(index, item)| Arc::clone(&worker).process(batch_id, index, item, token.clone()))
            .buffered(limit)
            .take_until(cancel.cancelled_owned())
            .take_while(|processed| future::ready(processed.is_some()))
            .filter_map(future::ready)
            .map(move |processed| {
                batch.report(&processed);
                processed.outcome
            });
        Ok(outcomes.boxed())
    }
}

/// One-shot helper: build an [`Ingestor`] from `options` and ingest `files`.
pub async fn ingest(files: Vec<RawFile>, options: IngestionOptions) -> IngestionResult<Vec<IngestionOutcome>> {
    Ingestor::new(options).ingest(files).await
}

impl Inner {
    /// Non-shapefile files followed by one entry per shapefile group. `None` when `cancel`
    /// fired during synthesis.
    async fn working_set(
        &self,
        batch_id: u64,
        files: Vec<RawFile>,
        cancel: &CancellationToken,
    ) -> IngestionResult<Option<Vec<WorkItem>>> {
        let groups = group_with(&files, self.options.base_name_rule);
        let mut items: Vec<WorkItem> = exclude_shapefile_parts(&files)
            .into_iter()
            .map(WorkItem::File)
            .collect();
        if groups.is_empty() {
            return Ok(Some(items));
        }

        tracing::debug!(batch = batch_id, groups = groups.len(), "Packing shapefile components");
        let Some(archives) = synthesize_archives_with_cancel(groups, cancel).await else {
            return Ok(None);
        };
        for archive in archives {
            match archive.result {
                Ok(file) => {
                    self.metrics.on_archive_synthesized();
                    items.push(WorkItem::File(file));
                }
                Err(source) => match self.options.archive_failure_policy {
                    ArchiveFailurePolicy::AbortBatch => {
                        tracing::error!(batch = batch_id, archive = %archive.archive_name, error = %source, "Shapefile archive failed, aborting batch");
                        return Err(IngestionError::ArchiveSynthesis {
                            archive: archive.archive_name,
                            source,
                        });
                    }
                    ArchiveFailurePolicy::PerGroup => {
                        tracing::warn!(batch = batch_id, archive = %archive.archive_name, error = %source, "Shapefile archive failed");
                        items.push(WorkItem::FailedArchive {
                            archive_name: archive.archive_name,
                            error: source,
                        });
                    }
                },
            }
        }
        Ok(Some(items))
    }

    async fn process(
        self: Arc<Self>,
        batch_id: u64,
        index: usize,
        item: WorkItem,
        cancel: CancellationToken,
    ) -> Option<Processed> {
        if cancel.is_cancelled() {
            return None;
        }
        let file = match item {
            WorkItem::File(file) => file,
            WorkItem::FailedArchive { archive_name, error } => {
                return Some(Processed {
                    ctx: IngestionContext {
                        batch_id,
                        index,
                        file_name: archive_name.clone(),
                        format: FormatKey::ShapefileArchive,
                    },
                    outcome: IngestionOutcome::ParseError {
                        file_name: archive_name,
                        error: DecodeError::Archive(error),
                    },
                });
            }
        };
        let ctx = IngestionContext {
            batch_id,
            index,
            file_name: file.name().to_owned(),
            format: self.table.resolve(file.name()),
        };
        let outcome = self.outcome_for(&ctx, file, &cancel).await?;
        Some(Processed { ctx, outcome })
    }

    async fn outcome_for(
        &self,
        ctx: &IngestionContext,
        file: RawFile,
        cancel: &CancellationToken,
    ) -> Option<IngestionOutcome> {
        let file_name = ctx.file_name.clone();
        if ctx.format == FormatKey::Unknown {
            return Some(IngestionOutcome::Unsupported { file_name });
        }
        if let Some(limit) = self.options.size_limit_bytes {
            if file.size() > limit {
                return Some(IngestionOutcome::TooLarge {
                    file_name,
                    size: file.size(),
                    limit,
                });
            }
        }
        let Some(decoder) = self.table.get(&ctx.format).cloned() else {
            return Some(IngestionOutcome::Unsupported { file_name });
        };

        let bytes = match file.read_bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(file = %file_name, error = %e, "Failed to read payload");
                return Some(IngestionOutcome::ParseError {
                    file_name,
                    error: DecodeError::Io(e),
                });
            }
        };
        if cancel.is_cancelled() {
            return None;
        }

        tracing::debug!(batch = ctx.batch_id, file = %file_name, format = %ctx.format, "Decoding");
        let parser_options = self.options.parser_options_for(&ctx.format);
        let decoded = {
            let _active = ActiveDecode::start(&self.metrics);
            tokio::task::spawn_blocking(move || decode_payload(decoder.as_ref(), &bytes, &parser_options)).await
        };
        let collection = match decoded {
            Ok(Ok(collection)) => collection,
            Ok(Err(error)) => {
                tracing::warn!(file = %file_name, format = %ctx.format, error = %error, "Decode failed");
                return Some(IngestionOutcome::ParseError { file_name, error });
            }
            Err(join) => {
                tracing::warn!(file = %file_name, error = %join, "Decode task failed");
                return Some(IngestionOutcome::ParseError {
                    file_name,
                    error: DecodeError::Task(join.to_string()),
                });
            }
        };

        let mut layer = self.options.layer_template.clone().unwrap_or_default();
        layer.add_features(collection);
        if layer.layer_count() == 0 {
            return Some(IngestionOutcome::Empty { file_name });
        }

        let offset = i32::try_from(ctx.index).unwrap_or(i32::MAX);
        layer.attach_metadata(
            format!("{}-{}", ctx.batch_id, ctx.index),
            &file_name,
            self.options.base_z_index.saturating_add(offset),
            self.options.style.clone(),
            self.options.on_click.clone(),
        );
        Some(IngestionOutcome::Loaded(LoadedLayer::new(file_name, ctx.format.clone(), layer)))
    }

    fn report(&self, processed: &Processed) {
        self.metrics.on_outcome(&processed.outcome);
        if let Some(observer) = self.options.observer.as_ref() {
            notify(
                observer.as_ref(),
                &processed.ctx,
                &processed.outcome,
                self.options.alert_at_or_above,
            );
        }
    }
}

/// Owned by the outcome stream; records the batch end when the stream is dropped.
struct BatchScope {
    inner: Arc<Inner>,
    started: Instant,
}

impl BatchScope {
    fn start(inner: Arc<Inner>, files: usize) -> Self {
        inner.metrics.on_batch_start(files);
        Self {
            inner,
            started: Instant::now(),
        }
    }

    fn report(&self, processed: &Processed) {
        self.inner.report(processed);
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        self.inner.metrics.on_batch_end(self.started.elapsed());
    }
}

/// Decrements the active-decode gauge even when the awaiting future is dropped.
struct ActiveDecode<'a>(&'a IngestionMetrics);

impl<'a> ActiveDecode<'a> {
    fn start(metrics: &'a IngestionMetrics) -> Self {
        metrics.on_decode_start();
        Self(metrics)
    }
}

impl Drop for ActiveDecode<'_> {
    fn drop(&mut self) {
        self.0.on_decode_end();
    }
}

fn decode_payload(decoder: &dyn Decoder, bytes: &[u8], options: &ParserOptions) -> DecodeResult<FeatureCollection> {
    let payload = match decoder.payload_kind() {
        PayloadKind::Text => {
            let text = std::str::from_utf8(bytes)?;
            Payload::Text(text.strip_prefix('\u{feff}').unwrap_or(text))
        }
        PayloadKind::Binary => Payload::Bytes(bytes),
    };
    decoder.decode(payload, options)
}

/// Builder for [`Ingestor`].
#[derive(Debug, Default)]
pub struct IngestorBuilder {
    options: IngestionOptions,
}

impl IngestorBuilder {
    /// Replace every option at once.
    pub fn options(mut self, options: IngestionOptions) -> Self {
        self.options = options;
        self
    }

    /// Apply serializable settings on top of the current options.
    pub fn settings(mut self, settings: IngestionSettings) -> Self {
        settings.apply_to(&mut self.options);
        self
    }

    pub fn size_limit_bytes(mut self, limit: u64) -> Self {
        self.options.size_limit_bytes = Some(limit);
        self
    }

    pub fn parser_options(mut self, key: FormatKey, options: ParserOptions) -> Self {
        self.options.parser_options.insert(key, options);
        self
    }

    pub fn formats<S: Into<String>>(mut self, formats: impl IntoIterator<Item = S>) -> Self {
        self.options.formats = formats.into_iter().map(Into::into).collect();
        self
    }

    /// Register (or replace) the decoder for `key`.
    pub fn decoder(self, key: FormatKey, decoder: impl Decoder + 'static) -> Self {
        self.shared_decoder(key, Arc::new(decoder))
    }

    pub fn shared_decoder(mut self, key: FormatKey, decoder: SharedDecoder) -> Self {
        self.options.decoder_overrides.insert(key, decoder);
        self
    }

    /// Register a decoder by file extension. Built-in extensions replace the built-in
    /// decoder; any other extension becomes a [`FormatKey::Custom`]. Shapefile component
    /// extensions are ignored, since those files only ever reach the `.zip` decoder.
    pub fn decoder_for_extension(self, extension: &str, decoder: impl Decoder + 'static) -> Self {
        let ext = extension.trim().trim_start_matches('.').to_ascii_lowercase();
        let key = match classify(&format!("file.{ext}")) {
            FormatKey::Unknown => FormatKey::Custom(ext),
            key => key,
        };
        self.decoder(key, decoder)
    }

    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.options.max_concurrency = n.max(1);
        self
    }

    pub fn archive_failure_policy(mut self, policy: ArchiveFailurePolicy) -> Self {
        self.options.archive_failure_policy = policy;
        self
    }

    pub fn base_name_rule(mut self, rule: BaseNameRule) -> Self {
        self.options.base_name_rule = rule;
        self
    }

    pub fn base_z_index(mut self, z: i32) -> Self {
        self.options.base_z_index = z;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn IngestionObserver>) -> Self {
        self.options.observer = Some(observer);
        self
    }

    pub fn alert_at_or_above(mut self, severity: IngestionSeverity) -> Self {
        self.options.alert_at_or_above = severity;
        self
    }

    pub fn style(mut self, style: impl Fn(&Feature) -> Style + Send + Sync + 'static) -> Self {
        self.options.style = Some(Arc::new(style));
        self
    }

    pub fn on_click(mut self, on_click: impl Fn(&Feature) + Send + Sync + 'static) -> Self {
        self.options.on_click = Some(Arc::new(on_click));
        self
    }

    pub fn layer_template(mut self, layer: GeoLayer) -> Self {
        self.options.layer_template = Some(layer);
        self
    }

    pub fn build(self) -> Ingestor {
        Ingestor::new(self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geojson(name: &str, body: &str) -> RawFile {
        RawFile::from_bytes(name, body.as_bytes().to_vec())
    }

    const POINT: &str = r#"{"type":"Feature","geometry":{"type":"Point","coordinates":[1,2]},"properties":{}}"#;

    #[tokio::test]
    async fn loaded_layer_carries_presentation_metadata() {
        let ingestor = Ingestor::builder().base_z_index(400).build();
        let outcomes = ingestor
            .ingest(vec![geojson("x.bin", "?"), geojson("a.geojson", POINT)])
            .await
            .unwrap();

        let loaded = outcomes[1].loaded().unwrap();
        let layer = loaded.layer();
        let id = layer.id().unwrap();
        assert!(id.ends_with("-1"), "{id}");
        assert_eq!(layer.z_index(), 401);
        assert_eq!(layer.name(), Some("a.geojson"));
        assert_eq!(
            layer.features()[0].id,
            Some(geojson::feature::Id::String(format!("{id}/0")))
        );
        assert_eq!(loaded.format(), &FormatKey::GeoJson);
        assert!(loaded.bounds().is_some());
    }

    #[tokio::test]
    async fn batch_ids_differ_between_calls() {
        let ingestor = Ingestor::default();
        let a = ingestor.ingest(vec![geojson("a.geojson", POINT)]).await.unwrap();
        let b = ingestor.ingest(vec![geojson("a.geojson", POINT)]).await.unwrap();
        assert_ne!(a[0].loaded().unwrap().layer().id(), b[0].loaded().unwrap().layer().id());
    }

    #[tokio::test]
    async fn invalid_utf8_is_a_parse_error() {
        let file = RawFile::from_bytes("a.geojson", vec![0xff, 0xfe, 0x00]);
        let outcomes = Ingestor::default().ingest(vec![file]).await.unwrap();
        assert!(matches!(
            &outcomes[0],
            IngestionOutcome::ParseError { error: DecodeError::InvalidUtf8(_), .. }
        ));
        assert_eq!(outcomes[0].severity(), IngestionSeverity::Error);
    }

    #[tokio::test]
    async fn byte_order_mark_is_ignored_for_text_formats() {
        let body = format!("\u{feff}{POINT}");
        let outcomes = Ingestor::default().ingest(vec![geojson("bom.geojson", &body)]).await.unwrap();
        assert_eq!(outcomes[0].kind(), OutcomeKind::Loaded);
    }

    #[tokio::test]
    async fn unreadable_path_is_a_critical_parse_error() {
        let file = RawFile::with_path("gone.geojson", 10, "/definitely/not/here/gone.geojson");
        let outcomes = Ingestor::default().ingest(vec![file]).await.unwrap();
        assert!(matches!(&outcomes[0], IngestionOutcome::ParseError { error: DecodeError::Io(_), .. }));
        assert_eq!(outcomes[0].severity(), IngestionSeverity::Critical);
    }

    #[tokio::test]
    async fn metrics_count_outcomes() {
        let ingestor = Ingestor::default();
        ingestor
            .ingest(vec![geojson("a.geojson", POINT), geojson("b.xyz", "")])
            .await
            .unwrap();
        let m = ingestor.metrics();
        assert_eq!(m.batches_finished, 1);
        assert_eq!((m.loaded, m.unsupported), (1, 1));
        assert_eq!(m.features_loaded, 1);
    }

    #[test]
    fn extension_override_keys() {
        fn noop(_: Payload<'_>, _: &ParserOptions) -> DecodeResult<FeatureCollection> {
            Err(DecodeError::other("noop"))
        }
        let ingestor = Ingestor::builder()
            .decoder_for_extension(".XYZ", noop)
            .decoder_for_extension("csv", noop)
            .decoder_for_extension("shp", noop)
            .build();
        assert!(ingestor.dispatch_table().contains(&FormatKey::Custom("xyz".to_string())));
        assert!(!ingestor.dispatch_table().contains(&FormatKey::Custom("csv".to_string())));
        assert_eq!(ingestor.dispatch_table().resolve("p.xyz"), FormatKey::Custom("xyz".to_string()));
        assert!(!ingestor.dispatch_table().contains(&FormatKey::Custom("shp".to_string())));
    }

    #[tokio::test]
    async fn streamed_batch_finishes_when_the_stream_is_done() {
        let ingestor = Ingestor::default();

        let stream = ingestor.ingest_stream(vec![geojson("a.geojson", POINT)]).await.unwrap();
        assert_eq!(ingestor.metrics().batches_finished, 0);
        let outcomes: Vec<IngestionOutcome> = stream.collect().await;
        assert_eq!(outcomes.len(), 1);

        let m = ingestor.metrics();
        assert_eq!((m.batches_started, m.batches_finished), (1, 1));
        assert!(m.last_batch_elapsed.is_some());
    }

    #[tokio::test]
    async fn dropped_stream_still_finishes_the_batch() {
        let ingestor = Ingestor::default();
        let stream = ingestor
            .ingest_stream(vec![geojson("a.geojson", POINT), geojson("b.geojson", POINT)])
            .await
            .unwrap();
        drop(stream);
        assert_eq!(ingestor.metrics().batches_finished, 1);
        assert_eq!(ingestor.metrics().outcomes(), 0);
    }
}
