//! Ingestion pipeline and its building blocks.
//!
//! Most callers should use [`Ingestor`] (from [`unified`]) which:
//!
//! - classifies files by extension ([`classify`])
//! - packs loose shapefile components into archives ([`shapefile_group`])
//! - decodes through the [`DispatchTable`] ([`dispatch`])
//! - reports one [`IngestionOutcome`] per file to an optional [`IngestionObserver`]
//!
//! Configuration lives in [`options`], running counters in [`metrics`].

pub mod classify;
pub mod dispatch;
pub mod metrics;
pub mod observability;
pub mod options;
pub mod shapefile_group;
pub mod unified;

pub use classify::{
    accept_attribute, base_name, base_name_with, classify, file_extension, is_shapefile_part, BaseNameRule,
    DEFAULT_ACCEPTED_FORMATS, SHAPEFILE_PART_EXTENSIONS,
};
pub use dispatch::{BinaryDecoder, Decoder, DispatchTable, ParserOptions, SharedDecoder};
pub use metrics::{IngestionMetrics, IngestionMetricsSnapshot};
pub use observability::{
    CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionSeverity, StdErrObserver,
    TracingObserver,
};
pub use options::{ArchiveFailurePolicy, IngestionOptions, IngestionSettings, DEFAULT_MAX_CONCURRENCY};
pub use shapefile_group::{
    exclude_shapefile_parts, group, group_with, synthesize_archive, synthesize_archives,
    synthesize_archives_with_cancel, ShapefileGroups, SynthesizedArchive,
};
pub use unified::{ingest, IngestionOutcome, Ingestor, IngestorBuilder, LoadedLayer, OutcomeKind, OutcomeStream};
