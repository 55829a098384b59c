//! Uploaded media on disk
//!
//! Files live at `<media_root>/<campaign_id>/<uuid><ext>` and are served
//! under `/media/<campaign_id>/<uuid><ext>`.

use aura_common::uuid_utils;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::models::NewMedia;
use crate::validation::MAX_FILE_SIZE;

/// URL prefix under which media files are served
pub const MEDIA_URL_PREFIX: &str = "/media";

const MAX_EXTENSION_CHARS: usize = 10;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File too large: {file_name} exceeds {limit} bytes")]
    TooLarge { file_name: String, limit: u64 },

    #[error("Media storage IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Media root directory handle
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Open a new file for an upload under the campaign directory
    pub async fn begin_upload(&self, campaign_id: &str, file_name: Option<&str>) -> Result<PendingUpload, StorageError> {
        let dir = self.root.join(campaign_id);
        fs::create_dir_all(&dir).await?;

        let stored_name = format!("{}{}", uuid_utils::generate_id(), extension_of(file_name));
        let path = dir.join(&stored_name);
        let file = fs::File::create(&path).await?;

        Ok(PendingUpload {
            file: Some(file),
            path,
            url: format!("{}/{}/{}", MEDIA_URL_PREFIX, campaign_id, stored_name),
            original_name: file_name.unwrap_or("upload").to_string(),
            size: 0,
        })
    }

    /// Remove files by URL, ignoring missing files and other errors
    pub async fn delete_files<I, S>(&self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for url in urls {
            let url = url.as_ref();
            let Some(path) = self.path_for_url(url) else {
                tracing::warn!(url = %url, "Refusing to delete media outside media root");
                continue;
            };
            match fs::remove_file(&path).await {
                Ok(()) => tracing::debug!(path = %path.display(), "Deleted media file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to delete media file"),
            }
        }
    }

    /// Map a `/media/...` (or bare relative) URL to a path inside the root
    pub fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        let relative = url
            .strip_prefix(MEDIA_URL_PREFIX)
            .map(|rest| rest.trim_start_matches('/'))
            .unwrap_or(url);
        let relative = Path::new(relative);

        let safe = !relative.as_os_str().is_empty()
            && relative.components().all(|c| matches!(c, Component::Normal(_)));
        safe.then(|| self.root.join(relative))
    }
}

/// A file being streamed to disk
///
/// Call [`PendingUpload::finish`] on success or [`PendingUpload::abort`] to
/// remove the partial file.
pub struct PendingUpload {
    file: Option<fs::File>,
    path: PathBuf,
    url: String,
    original_name: String,
    size: u64,
}

impl PendingUpload {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Append a chunk, enforcing the per-file size limit
    ///
    /// The partial file is removed when the limit is exceeded.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        self.size += chunk.len() as u64;
        if self.size > MAX_FILE_SIZE {
            let file_name = self.original_name.clone();
            self.abort().await;
            return Err(StorageError::TooLarge {
                file_name,
                limit: MAX_FILE_SIZE,
            });
        }

        if let Some(file) = self.file.as_mut() {
            file.write_all(chunk).await?;
        }
        Ok(())
    }

    /// Flush and describe the stored file
    pub async fn finish(mut self, content_type: Option<&str>) -> Result<NewMedia, StorageError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
        }

        tracing::debug!(url = %self.url, size_bytes = self.size, "Stored upload");

        Ok(NewMedia {
            url: self.url.clone(),
            media_type: media_type_for(content_type).to_string(),
            width: None,
            height: None,
            size_bytes: Some(self.size as i64),
        })
    }

    /// Drop the partial file
    pub async fn abort(&mut self) {
        self.file.take();
        if let Err(e) = fs::remove_file(&self.path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove partial upload");
            }
        }
    }
}

/// `video` for video/* content types, otherwise `image`
pub fn media_type_for(content_type: Option<&str>) -> &'static str {
    match content_type.and_then(|ct| ct.split('/').next()) {
        Some(top) if top.trim().eq_ignore_ascii_case("video") => "video",
        _ => "image",
    }
}

/// Lower-cased `.ext` of the client file name, or empty when unusable
fn extension_of(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.chars().count() <= MAX_EXTENSION_CHARS
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}
