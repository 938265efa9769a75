use crate::planner::{RenameEntry, RenamePlan};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameOperation {
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    pub applied: Vec<RenameOperation>,
    pub unchanged: usize,
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("重複した元ファイルが含まれています: {}", .0.display())]
    DuplicateOriginal(PathBuf),
    #[error("重複したリネーム先が含まれています: {}", .0.display())]
    DuplicateTarget(PathBuf),
    #[error("元ファイルと別のフォルダへのリネームは適用できません: {}", .0.display())]
    TargetOutsideDirectory(PathBuf),
    #[error(
        "リネームに失敗しました: {} -> {} (適用済み {}件, 未適用 {}件)",
        .from.display(),
        .to.display(),
        .applied.len(),
        .remaining
    )]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        applied: Vec<RenameOperation>,
        remaining: usize,
        #[source]
        source: io::Error,
    },
}

/// Renames every changed entry of `plan`, in plan order.
///
/// The plan is checked up front and nothing moves if it is inconsistent.
/// An existing target is never overwritten. The first failing rename stops
/// the run; renames already done stay done and are listed in the error.
pub fn apply_plan(plan: &RenamePlan) -> Result<ApplyResult, ApplyError> {
    let candidates: Vec<&RenameEntry> = plan.changed_entries().collect();
    let unchanged = plan.entries.len() - candidates.len();
    if candidates.is_empty() {
        return Ok(ApplyResult {
            applied: Vec::new(),
            unchanged,
        });
    }

    validate_apply_candidates(&candidates)?;

    let mut applied = Vec::<RenameOperation>::with_capacity(candidates.len());
    for (index, entry) in candidates.iter().enumerate() {
        if let Err(source) = rename_no_clobber(&entry.original_path, &entry.target_path) {
            let remaining = candidates.len() - index;
            warn!(
                "リネームに失敗しました: {} -> {}: {}",
                entry.original_path.display(),
                entry.target_path.display(),
                source
            );
            return Err(ApplyError::RenameFailed {
                from: entry.original_path.clone(),
                to: entry.target_path.clone(),
                applied,
                remaining,
                source,
            });
        }
        applied.push(RenameOperation {
            from: entry.original_path.clone(),
            to: entry.target_path.clone(),
        });
    }

    info!("適用完了: {}件 (変更なし {}件)", applied.len(), unchanged);
    Ok(ApplyResult { applied, unchanged })
}

fn validate_apply_candidates(candidates: &[&RenameEntry]) -> Result<(), ApplyError> {
    let mut seen_original_paths = HashSet::<&Path>::new();
    let mut seen_target_paths = HashSet::<&Path>::new();

    for candidate in candidates {
        if !seen_original_paths.insert(candidate.original_path.as_path()) {
            return Err(ApplyError::DuplicateOriginal(candidate.original_path.clone()));
        }
        if !seen_target_paths.insert(candidate.target_path.as_path()) {
            return Err(ApplyError::DuplicateTarget(candidate.target_path.clone()));
        }
        if candidate.target_path.parent() != candidate.original_path.parent() {
            return Err(ApplyError::TargetOutsideDirectory(
                candidate.target_path.clone(),
            ));
        }
    }

    Ok(())
}

fn rename_no_clobber(from: &Path, to: &Path) -> io::Result<()> {
    if to.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("リネーム先が既に存在します: {}", to.display()),
        ));
    }
    fs::rename(from, to)
}
