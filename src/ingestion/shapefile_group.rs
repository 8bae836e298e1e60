//! Grouping of multi-part shapefile inputs into single zip archives.
//!
//! A shapefile arrives as up to four sibling files (`.shp`, `.shx`, `.dbf`, `.prj`). They are
//! bucketed by base name and each bucket is packed into one `{base}.zip` that the shapefile
//! decoder consumes.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use tokio_util::sync::CancellationToken;
use zip::ZipWriter;

use crate::error::ArchiveSynthesisError;
use crate::types::RawFile;

use super::classify::{base_name_with, is_shapefile_part, BaseNameRule};

/// Shapefile components bucketed by base name, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapefileGroups {
    groups: Vec<(String, Vec<RawFile>)>,
}

impl ShapefileGroups {
    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no shapefile part was seen.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Components for a base name, in encounter order.
    pub fn get(&self, base: &str) -> Option<&[RawFile]> {
        self.groups
            .iter()
            .find(|(name, _)| name == base)
            .map(|(_, files)| files.as_slice())
    }

    /// Iterate `(base name, components)` in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[RawFile])> {
        self.groups.iter().map(|(name, files)| (name.as_str(), files.as_slice()))
    }

    /// Base names in first-seen order.
    pub fn base_names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(name, _)| name.as_str())
    }

    fn push(&mut self, base: String, file: RawFile) {
        match self.groups.iter_mut().find(|(name, _)| *name == base) {
            Some((_, files)) => files.push(file),
            None => self.groups.push((base, vec![file])),
        }
    }
}

impl IntoIterator for ShapefileGroups {
    type Item = (String, Vec<RawFile>);
    type IntoIter = std::vec::IntoIter<(String, Vec<RawFile>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

/// Result of packing one group.
#[derive(Debug)]
pub struct SynthesizedArchive {
    /// Base name of the group.
    pub base_name: String,
    /// Name the archive would carry (`{base}.zip`), also set when synthesis failed.
    pub archive_name: String,
    /// The archive, or why it could not be built.
    pub result: Result<RawFile, ArchiveSynthesisError>,
}

/// Bucket shapefile parts by base name (first-dot rule).
pub fn group(files: &[RawFile]) -> ShapefileGroups {
    group_with(files, BaseNameRule::FirstDot)
}

/// Bucket shapefile parts by base name under `rule`.
///
/// Files that are not shapefile parts are ignored; see [`exclude_shapefile_parts`].
pub fn group_with(files: &[RawFile], rule: BaseNameRule) -> ShapefileGroups {
    let mut groups = ShapefileGroups::default();
    for file in files.iter().filter(|f| is_shapefile_part(f.name())) {
        groups.push(base_name_with(file.name(), rule), file.clone());
    }
    groups
}

/// The batch without its shapefile parts, original order preserved.
pub fn exclude_shapefile_parts(files: &[RawFile]) -> Vec<RawFile> {
    files
        .iter()
        .filter(|f| !is_shapefile_part(f.name()))
        .cloned()
        .collect()
}

/// Name of the archive synthesized for a base name.
pub fn archive_name(base: &str) -> String {
    format!("{base}.zip")
}

/// Pack one group into an in-memory zip archive named `{base}.zip`.
///
/// Every component is stored under its own file name. Sufficiency (e.g. a missing `.shp`) is
/// left to the decoder. A component whose name repeats an earlier one in the same group is
/// skipped.
pub fn synthesize_archive(base: &str, parts: &[RawFile]) -> Result<RawFile, ArchiveSynthesisError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut written: Vec<&str> = Vec::with_capacity(parts.len());
    for part in parts {
        if written.contains(&part.name()) {
            tracing::warn!(archive = %archive_name(base), entry = %part.name(), "Duplicate shapefile component skipped");
            continue;
        }
        let bytes = part.read_bytes_blocking()?;
        zip.start_file(part.name(), options)?;
        zip.write_all(&bytes)?;
        written.push(part.name());
    }

    let finished = zip.finish()?;
    Ok(RawFile::from_bytes(archive_name(base), finished.into_inner()))
}

/// Pack every group, in group order, on the blocking pool.
///
/// One entry is returned per group; a failing group does not stop the others.
pub async fn synthesize_archives(groups: ShapefileGroups) -> Vec<SynthesizedArchive> {
    synthesize_archives_with_cancel(groups, &CancellationToken::new())
        .await
        .unwrap_or_default()
}

/// Like [`synthesize_archives`], giving up once `cancel` fires.
///
/// Returns `None` when cancelled. No group is started after that point and the group being
/// packed is abandoned to finish on the blocking pool.
pub async fn synthesize_archives_with_cancel(
    groups: ShapefileGroups,
    cancel: &CancellationToken,
) -> Option<Vec<SynthesizedArchive>> {
    let mut out = Vec::with_capacity(groups.len());
    for (base, parts) in groups {
        if cancel.is_cancelled() {
            return None;
        }
        let archive_name = archive_name(&base);
        let task_base = base.clone();
        let task = tokio::task::spawn_blocking(move || synthesize_archive(&task_base, &parts));
        let joined = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(archive = %archive_name, "Archive synthesis cancelled");
                return None;
            }
            joined = task => joined,
        };
        let result = match joined {
            Ok(result) => result,
            Err(e) => Err(ArchiveSynthesisError::Join(e.to_string())),
        };
        out.push(SynthesizedArchive {
            base_name: base,
            archive_name,
            result,
        });
    }
    Some(out)
}
