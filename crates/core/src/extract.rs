use crate::timestamp::TimestampKey;
use chrono::{DateTime, Local, NaiveDateTime};
use exif::{In, Reader, Tag, Value};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The file exists but has no capture time to read. Planning swaps in
    /// the sentinel key.
    #[error("撮影日時を取得できませんでした: {}", .path.display())]
    MetadataUnavailable { path: PathBuf },
    #[error("ファイルを読めませんでした: {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ExtractError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn unavailable(path: &Path) -> Self {
        Self::MetadataUnavailable {
            path: path.to_path_buf(),
        }
    }
}

pub trait KeyExtractor {
    fn extract(&self, path: &Path) -> Result<TimestampKey, ExtractError>;
}

impl<F> KeyExtractor for F
where
    F: Fn(&Path) -> Result<TimestampKey, ExtractError>,
{
    fn extract(&self, path: &Path) -> Result<TimestampKey, ExtractError> {
        self(path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeySource {
    #[default]
    Exif,
    Modified,
    ExifOrModified,
}

impl KeyExtractor for KeySource {
    fn extract(&self, path: &Path) -> Result<TimestampKey, ExtractError> {
        match self {
            KeySource::Exif => exif_key(path),
            KeySource::Modified => modified_key(path),
            KeySource::ExifOrModified => match exif_key(path) {
                Err(ExtractError::MetadataUnavailable { .. }) => modified_key(path),
                other => other,
            },
        }
    }
}

pub fn exif_key(path: &Path) -> Result<TimestampKey, ExtractError> {
    read_capture_time(path).map(|dt| TimestampKey::from_datetime(&dt))
}

pub fn modified_key(path: &Path) -> Result<TimestampKey, ExtractError> {
    let modified = fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|err| ExtractError::io(path, err))?;
    let local: DateTime<Local> = DateTime::from(modified);
    Ok(TimestampKey::from_datetime(&local.naive_local()))
}

pub fn read_capture_time(path: &Path) -> Result<NaiveDateTime, ExtractError> {
    let file = File::open(path).map_err(|err| ExtractError::io(path, err))?;
    let mut buf = BufReader::new(file);
    let exif = match Reader::new().read_from_container(&mut buf) {
        Ok(exif) => exif,
        Err(exif::Error::Io(err)) => return Err(ExtractError::io(path, err)),
        Err(_) => return Err(ExtractError::unavailable(path)),
    };

    let raw = exif
        .get_field(Tag::DateTimeOriginal, In::PRIMARY)
        .and_then(|field| match &field.value {
            Value::Ascii(values) => values.first(),
            _ => None,
        })
        .and_then(|bytes| std::str::from_utf8(bytes).ok())
        .ok_or_else(|| ExtractError::unavailable(path))?;

    parse_exif_datetime(raw).ok_or_else(|| ExtractError::unavailable(path))
}

fn parse_exif_datetime(input: &str) -> Option<NaiveDateTime> {
    let normalized = input.trim().trim_end_matches('\0');
    ["%Y:%m:%d %H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(normalized, fmt).ok())
}
