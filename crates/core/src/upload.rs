use crate::blog::{resolve_local_path, ListEntry, TagError};
use crate::config::AppConfig;
use image::ImageFormat;
use log::{info, warn};
use s3::creds::error::CredentialsError;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("バケット名が設定されていません")]
    MissingBucket,
    #[error("アップロード用の認証情報 (access_key / secret_key) が設定されていません")]
    MissingCredentials,
    #[error(transparent)]
    Tag(#[from] TagError),
    #[error("アップロード元を読めませんでした: {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("認証情報が不正です")]
    Credentials(#[source] CredentialsError),
    #[error("バケットに接続できませんでした: {bucket}")]
    Connect {
        bucket: String,
        #[source]
        source: S3Error,
    },
    #[error("アップロードに失敗しました: {name}")]
    Store {
        name: String,
        #[source]
        source: S3Error,
    },
}

/// Where uploads go and who signs them.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub bucket: String,
    pub base_url: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
}

impl StoreSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            bucket: config.bucket.clone(),
            base_url: config.base_url.clone(),
            region: config.region.clone(),
            access_key: config.access_key.clone(),
            secret_key: config.secret_key.clone(),
        }
    }
}

pub trait ObjectStore {
    /// Stores `body` under `name`, readable by anyone, and returns the size
    /// the store reports for the object afterwards.
    fn put_public(&self, name: &str, body: &[u8], content_type: &str) -> Result<u64, UploadError>;
}

/// Bucket addressed path-style under `base_url`, the same layout the
/// generated links use.
pub struct S3Store {
    bucket: Bucket,
}

impl S3Store {
    pub fn connect(settings: &StoreSettings) -> Result<Self, UploadError> {
        if settings.bucket.is_empty() {
            return Err(UploadError::MissingBucket);
        }
        if settings.access_key.is_empty() || settings.secret_key.is_empty() {
            return Err(UploadError::MissingCredentials);
        }

        let credentials = Credentials::new(
            Some(settings.access_key.as_str()),
            Some(settings.secret_key.as_str()),
            None,
            None,
            None,
        )
        .map_err(UploadError::Credentials)?;
        let region = Region::Custom {
            region: settings.region.clone(),
            endpoint: settings.base_url.trim_end_matches('/').to_string(),
        };
        let mut bucket = Bucket::new(&settings.bucket, region, credentials)
            .map_err(|source| UploadError::Connect {
                bucket: settings.bucket.clone(),
                source,
            })?
            .with_path_style();
        bucket.add_header("x-amz-acl", "public-read");
        bucket.add_header("x-amz-storage-class", "REDUCED_REDUNDANCY");

        Ok(Self { bucket })
    }
}

impl ObjectStore for S3Store {
    fn put_public(&self, name: &str, body: &[u8], content_type: &str) -> Result<u64, UploadError> {
        let store_err = |source| UploadError::Store {
            name: name.to_string(),
            source,
        };
        self.bucket
            .put_object_with_content_type(name, body, content_type)
            .map_err(store_err)?;
        let (head, _) = self.bucket.head_object(name).map_err(store_err)?;
        Ok(head
            .content_length
            .and_then(|len| u64::try_from(len).ok())
            .unwrap_or(0))
    }
}

/// Uploads one file under its bare file name.
///
/// Returns that name, or an empty string when the stored object does not
/// have the local file's size; an empty name renders as no link.
pub fn upload_file<S>(store: &S, path: &Path) -> Result<String, UploadError>
where
    S: ObjectStore + ?Sized,
{
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| TagError::BadName(path.display().to_string()))?;
    let body = fs::read(path).map_err(|source| UploadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let content_type = ImageFormat::from_path(path)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream");

    let stored = store.put_public(&name, &body, content_type)?;
    if stored != body.len() as u64 {
        warn!(
            "アップロード後のサイズが一致しません: {} (ローカル {} / 保存 {})",
            name,
            body.len(),
            stored
        );
        return Ok(String::new());
    }

    info!("アップロード完了: {}", name);
    Ok(name)
}

/// Uploads every listed image from its month folder under `local_dir`.
/// Captions carry over; an entry whose upload came up short loses its name.
pub fn upload_list<S>(
    store: &S,
    entries: &[ListEntry],
    local_dir: &Path,
) -> Result<Vec<ListEntry>, UploadError>
where
    S: ObjectStore + ?Sized,
{
    if local_dir.as_os_str().is_empty() {
        return Err(TagError::MissingLocalDir.into());
    }

    entries
        .iter()
        .map(|entry| {
            let path = resolve_local_path(local_dir, &entry.name)?;
            Ok(ListEntry {
                name: upload_file(store, &path)?,
                caption: entry.caption.clone(),
            })
        })
        .collect()
}
