use log::debug;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://s3.amazonaws.com";

const LANDSCAPE_WIDTH: u32 = 320;
const PORTRAIT_WIDTH: u32 = 240;

#[derive(Debug, Error)]
pub enum TagError {
    #[error("日付形式のファイル名ではありません: {0}")]
    BadName(String),
    #[error("画像サイズが0です: {}", .0.display())]
    EmptyImage(PathBuf),
    #[error("画像サイズを読めませんでした: {}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("ローカル画像フォルダが設定されていません")]
    MissingLocalDir,
    #[error("バケット名が設定されていません")]
    MissingBucket,
}

#[derive(Debug, Clone)]
pub struct TagOptions {
    pub local_dir: PathBuf,
    pub bucket: String,
    pub base_url: String,
}

/// One line of an image list: a bare file name and an optional caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub name: String,
    pub caption: String,
}

/// Reads an image list. Blank lines and `#` comments are skipped; a tab
/// separates the file name from its caption.
pub fn parse_list(body: &str) -> Vec<ListEntry> {
    body.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .map(|line| {
            let (name, caption) = line.split_once('\t').unwrap_or((line, ""));
            ListEntry {
                name: name.trim().to_string(),
                caption: caption.trim().to_string(),
            }
        })
        .collect()
}

/// Photos live in one folder per month: `2014-03-09 10.11.12.jpg` is found
/// under `<local_dir>/201403/`.
pub fn resolve_local_path(local_dir: &Path, name: &str) -> Result<PathBuf, TagError> {
    let mut fields = name.split('-');
    let (Some(year), Some(month)) = (fields.next(), fields.next()) else {
        return Err(TagError::BadName(name.to_string()));
    };
    if year.is_empty() || month.is_empty() {
        return Err(TagError::BadName(name.to_string()));
    }
    Ok(local_dir.join(format!("{}{}", year, month)).join(name))
}

/// Width and height to show an image at in a post. Portrait shots get a
/// narrower column; height keeps the aspect ratio and rounds up.
pub fn display_shape(width: u32, height: u32) -> Option<(u32, u32)> {
    if width == 0 || height == 0 {
        return None;
    }
    let target = if width < height {
        PORTRAIT_WIDTH
    } else {
        LANDSCAPE_WIDTH
    };
    let scaled = (u64::from(height) * u64::from(target)).div_ceil(u64::from(width));
    Some((target, u32::try_from(scaled).unwrap_or(u32::MAX)))
}

pub fn image_link(base_url: &str, bucket: &str, name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    format!("{}/{}/{}", base_url.trim_end_matches('/'), bucket, name).replace(' ', "+")
}

pub fn image_tag(link: &str, width: u32, height: u32) -> String {
    if link.is_empty() {
        return String::new();
    }
    format!(
        r#"<a href="{0}" imageanchor="1" style="margin-left: 1em; margin-right: 1em;"><img border="0" height="{2}" src="{0}" width="{1}" /></a>"#,
        link, width, height
    )
}

pub fn caption_tag(caption: &str) -> String {
    if caption.is_empty() {
        return String::new();
    }
    format!(
        r#"<td class="tr-caption" style="text-align: center;">{}</td>"#,
        caption
    )
}

/// Centers an image tag, in a caption table when there is a caption cell.
pub fn wrap_image(image_tag: &str, caption_tag: &str) -> String {
    if caption_tag.is_empty() {
        format!(
            r#"<div class="separator" style="clear: both; text-align: center;">{}</div>"#,
            image_tag
        )
    } else {
        format!(
            r#"<table align="center" cellpadding="0" cellspacing="0" class="tr-caption-container" style="margin-left: auto; margin-right: auto; text-align: center;"><tbody><tr><td style="text-align: center;">{}</td></tr><tr>{}</tr></tbody></table>"#,
            image_tag, caption_tag
        )
    }
}

pub fn render_entry(entry: &ListEntry, options: &TagOptions) -> Result<String, TagError> {
    if options.local_dir.as_os_str().is_empty() {
        return Err(TagError::MissingLocalDir);
    }
    if options.bucket.is_empty() {
        return Err(TagError::MissingBucket);
    }
    // A failed upload leaves no name behind, and no link to show.
    if entry.name.is_empty() {
        return Ok(String::new());
    }

    let path = resolve_local_path(&options.local_dir, &entry.name)?;
    let (width, height) = image::image_dimensions(&path).map_err(|source| TagError::Image {
        path: path.clone(),
        source,
    })?;
    let (show_w, show_h) =
        display_shape(width, height).ok_or_else(|| TagError::EmptyImage(path.clone()))?;
    debug!(
        "{}: {}x{} -> {}x{}",
        path.display(),
        width,
        height,
        show_w,
        show_h
    );

    let link = image_link(&options.base_url, &options.bucket, &entry.name);
    let tag = image_tag(&link, show_w, show_h);
    Ok(wrap_image(&tag, &caption_tag(&entry.caption)))
}

pub fn render_tags(entries: &[ListEntry], options: &TagOptions) -> Result<Vec<String>, TagError> {
    entries
        .iter()
        .map(|entry| render_entry(entry, options))
        .collect()
}
