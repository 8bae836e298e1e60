//! Configuration for the ingestion pipeline.
//!
//! [`IngestionOptions`] is the in-process form: it carries callbacks, observers and decoder
//! overrides that cannot come from a file. [`IngestionSettings`] is the serializable subset a
//! host can load from JSON and apply on top of the defaults.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, IngestionResult};
use crate::layer::{ClickFn, GeoLayer, StyleFn};
use crate::types::FormatKey;

use super::classify::{accept_attribute, BaseNameRule, DEFAULT_ACCEPTED_FORMATS};
use super::dispatch::{ParserOptions, SharedDecoder};
use super::observability::{IngestionObserver, IngestionSeverity};

/// Number of files decoded at once when nothing else is configured.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// What happens when a shapefile group cannot be packed into an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFailurePolicy {
    /// Emit a `ParseError` for `{base}.zip` and keep going.
    #[default]
    PerGroup,
    /// Fail the whole call before any file is decoded.
    AbortBatch,
}

/// Options controlling a pipeline run.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct IngestionOptions {
    /// Files strictly larger than this are reported as `TooLarge`. `None` means no limit.
    pub size_limit_bytes: Option<u64>,
    /// Per-format parser options, e.g. the CSV delimiter.
    pub parser_options: HashMap<FormatKey, ParserOptions>,
    /// Extensions offered by a file picker. Does not affect dispatch.
    pub formats: Vec<String>,
    /// Decoders that replace or extend the built-in table.
    pub decoder_overrides: HashMap<FormatKey, SharedDecoder>,
    /// Upper bound on files decoded at once (at least 1).
    pub max_concurrency: usize,
    /// Shapefile archive failure handling.
    pub archive_failure_policy: ArchiveFailurePolicy,
    /// Shapefile grouping rule.
    pub base_name_rule: BaseNameRule,
    /// Z-index of the first loaded layer; later files stack above.
    pub base_z_index: i32,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
    /// Style lookup attached to loaded layers. `None` keeps the layer's own.
    pub style: Option<StyleFn>,
    /// Click callback attached to loaded layers.
    pub on_click: Option<ClickFn>,
    /// Layer every file's features are appended into (cloned per file) instead of a fresh one.
    pub layer_template: Option<GeoLayer>,
}

impl fmt::Debug for IngestionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut overrides: Vec<&FormatKey> = self.decoder_overrides.keys().collect();
        overrides.sort();
        f.debug_struct("IngestionOptions")
            .field("size_limit_bytes", &self.size_limit_bytes)
            .field("parser_options", &self.parser_options)
            .field("formats", &self.formats)
            .field("decoder_overrides", &overrides)
            .field("max_concurrency", &self.max_concurrency)
            .field("archive_failure_policy", &self.archive_failure_policy)
            .field("base_name_rule", &self.base_name_rule)
            .field("base_z_index", &self.base_z_index)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .field("style_set", &self.style.is_some())
            .field("on_click_set", &self.on_click.is_some())
            .field("layer_template", &self.layer_template)
            .finish()
    }
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            size_limit_bytes: None,
            parser_options: HashMap::new(),
            formats: DEFAULT_ACCEPTED_FORMATS.iter().map(|s| (*s).to_owned()).collect(),
            decoder_overrides: HashMap::new(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            archive_failure_policy: ArchiveFailurePolicy::default(),
            base_name_rule: BaseNameRule::default(),
            base_z_index: 0,
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
            style: None,
            on_click: None,
            layer_template: None,
        }
    }
}

impl IngestionOptions {
    /// Defaults with `settings` applied on top.
    pub fn from_settings(settings: IngestionSettings) -> Self {
        let mut options = Self::default();
        settings.apply_to(&mut options);
        options
    }

    /// `accept` attribute for a file input built from [`Self::formats`].
    pub fn accept_attribute(&self) -> String {
        accept_attribute(&self.formats)
    }

    /// Parser options for `key`, empty when none are configured.
    pub fn parser_options_for(&self, key: &FormatKey) -> ParserOptions {
        self.parser_options.get(key).cloned().unwrap_or_default()
    }
}

/// Serializable subset of [`IngestionOptions`].
///
/// Every field is optional; unset fields keep the default. The camelCase names used by
/// browser hosts are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestionSettings {
    #[serde(alias = "sizeLimitBytes", skip_serializing_if = "Option::is_none")]
    pub size_limit_bytes: Option<u64>,
    #[serde(alias = "parserOptionsByFormat", alias = "parserOptions")]
    pub parser_options: HashMap<FormatKey, ParserOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formats: Option<Vec<String>>,
    #[serde(alias = "maxConcurrency", skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
    #[serde(alias = "archiveFailurePolicy", skip_serializing_if = "Option::is_none")]
    pub archive_failure_policy: Option<ArchiveFailurePolicy>,
    #[serde(alias = "baseNameRule", skip_serializing_if = "Option::is_none")]
    pub base_name_rule: Option<BaseNameRule>,
    #[serde(alias = "baseZIndex", skip_serializing_if = "Option::is_none")]
    pub base_z_index: Option<i32>,
    #[serde(alias = "alertAtOrAbove", skip_serializing_if = "Option::is_none")]
    pub alert_at_or_above: Option<IngestionSeverity>,
}

impl IngestionSettings {
    /// Parse settings from JSON text.
    pub fn from_json_str(text: &str) -> IngestionResult<Self> {
        let settings: Self = serde_json::from_str(text).map_err(|e| IngestionError::InvalidSettings {
            message: e.to_string(),
        })?;
        if settings.max_concurrency == Some(0) {
            return Err(IngestionError::InvalidSettings {
                message: "max_concurrency must be at least 1".to_string(),
            });
        }
        Ok(settings)
    }

    /// Overwrite the fields of `options` that are set here.
    ///
    /// Parser options are merged per format; a format listed here replaces the existing entry.
    pub fn apply_to(self, options: &mut IngestionOptions) {
        if self.size_limit_bytes.is_some() {
            options.size_limit_bytes = self.size_limit_bytes;
        }
        options.parser_options.extend(self.parser_options);
        if let Some(formats) = self.formats {
            options.formats = formats;
        }
        if let Some(n) = self.max_concurrency {
            options.max_concurrency = n;
        }
        if let Some(policy) = self.archive_failure_policy {
            options.archive_failure_policy = policy;
        }
        if let Some(rule) = self.base_name_rule {
            options.base_name_rule = rule;
        }
        if let Some(z) = self.base_z_index {
            options.base_z_index = z;
        }
        if let Some(severity) = self.alert_at_or_above {
            options.alert_at_or_above = severity;
        }
    }
}
