use log::debug;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("入力パスが指定されていません")]
    Empty,
    #[error("存在するフォルダまたはファイルを指定してください: {}", .0.display())]
    InvalidInput(PathBuf),
    #[error("フォルダ走査に失敗しました: {}", .root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SourceOptions {
    pub include_hidden: bool,
}

/// Turns command-line inputs into the list of files to plan.
///
/// A single directory is walked recursively in file-name order, a single
/// file stands for itself, and several inputs are taken as an explicit list
/// of files. Every input must exist before anything is planned.
pub fn collect_sources(
    inputs: &[PathBuf],
    options: &SourceOptions,
) -> Result<Vec<PathBuf>, SourceError> {
    match inputs {
        [] => Err(SourceError::Empty),
        [single] if single.is_dir() => walk_files(single, options),
        [single] => {
            ensure_file(single)?;
            Ok(vec![single.clone()])
        }
        many => {
            for path in many {
                ensure_file(path)?;
            }
            Ok(many.to_vec())
        }
    }
}

fn ensure_file(path: &Path) -> Result<(), SourceError> {
    if path.as_os_str().is_empty() || !path.is_file() {
        return Err(SourceError::InvalidInput(path.to_path_buf()));
    }
    Ok(())
}

fn walk_files(root: &Path, options: &SourceOptions) -> Result<Vec<PathBuf>, SourceError> {
    let mut out = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| SourceError::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if is_hidden(path) && !options.include_hidden {
            debug!("隠しファイルをスキップ: {}", path.display());
            continue;
        }
        out.push(path.to_path_buf());
    }
    Ok(out)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}
