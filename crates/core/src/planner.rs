use crate::extract::{ExtractError, KeyExtractor};
use crate::timestamp::TimestampKey;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_EXTENSION: &str = "jpg";

#[derive(Debug, Clone)]
pub struct PlanOptions {
    /// Extension given to every target, without the dot. Originals are not
    /// inspected, so a PNG in the batch still ends up with this extension.
    pub extension: String,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenameEntry {
    pub original_path: PathBuf,
    pub target_path: PathBuf,
    pub key: TimestampKey,
    pub resolved_name: String,
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PlanStats {
    pub planned: usize,
    pub unchanged: usize,
    pub unknown_date: usize,
    pub suffixed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenamePlan {
    pub extension: String,
    pub entries: Vec<RenameEntry>,
    pub stats: PlanStats,
}

impl RenamePlan {
    pub fn changed_entries(&self) -> impl Iterator<Item = &RenameEntry> {
        self.entries.iter().filter(|entry| entry.changed)
    }
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("拡張子が不正です: {0:?}")]
    InvalidExtension(String),
    #[error("親ディレクトリを取得できませんでした: {}", .0.display())]
    NoParent(PathBuf),
    #[error("リネーム先が重複しています: {}", .0.display())]
    DuplicateTarget(PathBuf),
}

/// Orders `files` by their timestamp key and assigns each a unique
/// `<key>[-n].<ext>` name in its own directory.
///
/// Files whose key could not be read are given the sentinel key, sort first,
/// and keep their current name. Nothing on disk is touched here; the
/// extractor is the only thing that may do I/O.
pub fn build_plan<E>(
    files: &[PathBuf],
    extractor: &E,
    options: &PlanOptions,
) -> Result<RenamePlan, PlanError>
where
    E: KeyExtractor + ?Sized,
{
    let extension = normalize_extension(&options.extension)?;

    let mut keyed = Vec::with_capacity(files.len());
    for file in files {
        let key = match extractor.extract(file) {
            Ok(key) => key,
            Err(ExtractError::MetadataUnavailable { .. }) => {
                debug!("撮影日時なし、日付不明として扱います: {}", file.display());
                TimestampKey::sentinel()
            }
            Err(err) => return Err(err.into()),
        };
        debug!("{} -> {}", file.display(), key);
        let rank = existing_rank(&key, file);
        keyed.push((key, rank, file.clone()));
    }

    // Stable: among equal keys, files already named after the key keep their
    // slot and the rest follow in input order.
    keyed.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

    let resolved = resolve_duplicates(keyed.iter().map(|(key, _, _)| key));

    let mut stats = PlanStats::default();
    let mut planned_paths = HashSet::<PathBuf>::with_capacity(keyed.len());
    let mut untouched_paths = HashSet::<PathBuf>::new();
    let mut entries = Vec::with_capacity(keyed.len());

    for ((key, _, original_path), (resolved_name, suffix)) in keyed.into_iter().zip(resolved) {
        let target_path = if key.is_sentinel() {
            stats.unknown_date += 1;
            original_path.clone()
        } else {
            target_for(&original_path, &resolved_name, &extension)?
        };
        let changed = target_path != original_path;

        // The same path listed twice with no date is left alone twice.
        let repeated_no_op = !changed && untouched_paths.contains(&target_path);
        if !planned_paths.insert(target_path.clone()) && !repeated_no_op {
            return Err(PlanError::DuplicateTarget(target_path));
        }
        if !changed {
            untouched_paths.insert(target_path.clone());
            stats.unchanged += 1;
        }
        if changed && suffix > 0 {
            stats.suffixed += 1;
        }
        stats.planned += 1;

        entries.push(RenameEntry {
            original_path,
            target_path,
            key,
            resolved_name,
            changed,
        });
    }

    info!(
        "リネーム計画: {}件 (変更なし {}件, 日付不明 {}件)",
        stats.planned, stats.unchanged, stats.unknown_date
    );

    Ok(RenamePlan {
        extension,
        entries,
        stats,
    })
}

/// Tags repeats of a key with `-1`, `-2`, ... in the order they appear.
/// Expects the keys already sorted so that repeats are adjacent.
fn resolve_duplicates<'a, I>(keys: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a TimestampKey>,
{
    let mut previous: Option<&TimestampKey> = None;
    let mut suffix = 0usize;
    let mut resolved = Vec::new();

    for key in keys {
        if previous == Some(key) {
            suffix += 1;
            resolved.push((format!("{}-{}", key, suffix), suffix));
        } else {
            suffix = 0;
            resolved.push((key.to_string(), 0));
        }
        previous = Some(key);
    }

    resolved
}

/// Position a file already named `<key>` or `<key>-n` takes among the files
/// sharing `key`. Anything else sorts after them.
fn existing_rank(key: &TimestampKey, path: &Path) -> usize {
    if key.is_sentinel() {
        return usize::MAX;
    }
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(TimestampKey::parse)
        .and_then(|existing| {
            let (base, suffix) = existing.split_suffix();
            (base == key.as_str()).then_some(suffix)
        })
        .unwrap_or(usize::MAX)
}

fn target_for(
    original_path: &Path,
    resolved_name: &str,
    extension: &str,
) -> Result<PathBuf, PlanError> {
    let parent = original_path
        .parent()
        .ok_or_else(|| PlanError::NoParent(original_path.to_path_buf()))?;
    Ok(parent.join(format!("{}.{}", resolved_name, extension)))
}

fn normalize_extension(value: &str) -> Result<String, PlanError> {
    let trimmed = value.trim().trim_start_matches('.');
    if trimmed.is_empty() || trimmed.contains(['/', '\\', '.']) {
        return Err(PlanError::InvalidExtension(value.to_string()));
    }
    Ok(trimmed.to_string())
}
