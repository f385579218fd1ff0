//! Media Rehoster
//!
//! Turns a provider-hosted (often ephemeral) result into a durable local
//! artifact: download or decode the media, write it under a
//! modality-specific directory with a collision-free name, and hand back a
//! stable public reference.
//!
//! Failure policy: `rehost` never surfaces an error. When the fetch or
//! decode fails the original reference is returned unchanged so the task
//! still completes with a (possibly ephemeral) link instead of being lost.

use std::path::PathBuf;
use std::time::Duration;

use base64::Engine;

use crate::adapters::MediaSource;
use crate::error::BrokerError;
use crate::types::provider::Modality;
use crate::utils::media::{extension_for_bytes, extension_for_content_type, extension_from_url};

/// Deadline for large asset retrieval
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(120);

/// Downloads remote media into durable local storage
#[derive(Debug, Clone)]
pub struct MediaRehoster {
    root: PathBuf,
    public_base: String,
    http: reqwest::Client,
}

impl MediaRehoster {
    /// Create a rehoster writing under `root` and serving files at
    /// `{public_base}/{images|videos}/{file}`
    pub fn new(
        root: impl Into<PathBuf>,
        public_base: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        let public_base = public_base.into().trim_end_matches('/').to_string();
        Self {
            root: root.into(),
            public_base,
            http,
        }
    }

    /// Rehost a media source, returning a durable local reference.
    ///
    /// On any failure this logs and returns the original reference
    /// unchanged; it never propagates an error to the caller.
    pub async fn rehost(&self, source: &MediaSource, modality: Modality) -> String {
        match self.try_rehost(source, modality).await {
            Ok(local) => local,
            Err(err) => {
                tracing::warn!(
                    %modality,
                    error = %err,
                    "rehosting failed, keeping the original reference"
                );
                source.as_reference()
            }
        }
    }

    async fn try_rehost(
        &self,
        source: &MediaSource,
        modality: Modality,
    ) -> Result<String, BrokerError> {
        let (bytes, extension) = match source {
            MediaSource::Inline { data, mime } => self.decode_inline(data, mime.as_deref())?,
            MediaSource::Url(url) => self.fetch_remote(url).await?,
        };
        let extension = extension.unwrap_or_else(|| modality.default_extension().to_string());

        let dir = self.root.join(modality.storage_dir());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| BrokerError::StorageError(format!("creating {}: {e}", dir.display())))?;

        let file_name = format!("{}{extension}", uuid::Uuid::new_v4().simple());
        let path = dir.join(&file_name);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| BrokerError::StorageError(format!("writing {}: {e}", path.display())))?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "rehosted media asset");
        Ok(format!(
            "{}/{}/{file_name}",
            self.public_base,
            modality.storage_dir()
        ))
    }

    /// Decode an inline payload; accepts both raw base64 and full data URLs
    fn decode_inline(
        &self,
        data: &str,
        declared_mime: Option<&str>,
    ) -> Result<(Vec<u8>, Option<String>), BrokerError> {
        let (payload, mime_from_url) = split_data_url(data);
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| BrokerError::InvalidInput(format!("invalid base64 payload: {e}")))?;

        let extension = declared_mime
            .or(mime_from_url)
            .and_then(extension_for_content_type)
            .map(String::from)
            .or_else(|| extension_for_bytes(&bytes));
        Ok((bytes, extension))
    }

    /// Fetch a remote asset with a bounded timeout
    async fn fetch_remote(&self, url: &str) -> Result<(Vec<u8>, Option<String>), BrokerError> {
        let response = self
            .http
            .get(url)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| BrokerError::HttpError(format!("fetching {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BrokerError::HttpError(format!(
                "fetching {url}: status {status}"
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BrokerError::HttpError(format!("reading {url}: {e}")))?
            .to_vec();

        let extension = content_type
            .as_deref()
            .and_then(extension_for_content_type)
            .map(String::from)
            .or_else(|| extension_from_url(url));
        Ok((bytes, extension))
    }
}

/// Split a data URL into its base64 payload and mime type; raw base64
/// passes through untouched
fn split_data_url(data: &str) -> (&str, Option<&str>) {
    if let Some(rest) = data.strip_prefix("data:")
        && let Some((header, payload)) = rest.split_once(',')
    {
        let mime = header.split(';').next().filter(|m| !m.is_empty());
        return (payload, mime);
    }
    (data, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent PNG
    const PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn rehoster(root: &std::path::Path) -> MediaRehoster {
        MediaRehoster::new(root, "http://localhost:9000/media", reqwest::Client::new())
    }

    #[tokio::test]
    async fn test_inline_payload_is_written_with_inferred_extension() {
        let dir = tempfile::tempdir().unwrap();
        let source = MediaSource::Inline {
            data: PNG_B64.to_string(),
            mime: None,
        };

        let reference = rehoster(dir.path()).rehost(&source, Modality::Image).await;
        assert!(reference.starts_with("http://localhost:9000/media/images/"));
        assert!(reference.ends_with(".png"));

        let file_name = reference.rsplit('/').next().unwrap();
        let written = std::fs::read(dir.path().join("images").join(file_name)).unwrap();
        assert_eq!(&written[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_data_url_payload_uses_declared_mime() {
        let dir = tempfile::tempdir().unwrap();
        let source = MediaSource::Inline {
            data: format!("data:image/webp;base64,{PNG_B64}"),
            mime: None,
        };

        let reference = rehoster(dir.path()).rehost(&source, Modality::Image).await;
        assert!(reference.ends_with(".webp"));
    }

    #[tokio::test]
    async fn test_invalid_base64_degrades_to_original_reference() {
        let dir = tempfile::tempdir().unwrap();
        let source = MediaSource::Inline {
            data: "!!! not base64 !!!".to_string(),
            mime: Some("image/png".to_string()),
        };

        let reference = rehoster(dir.path()).rehost(&source, Modality::Image).await;
        assert_eq!(reference, source.as_reference());
    }

    #[test]
    fn test_split_data_url() {
        let (payload, mime) = split_data_url("data:image/png;base64,AAAA");
        assert_eq!(payload, "AAAA");
        assert_eq!(mime, Some("image/png"));

        let (payload, mime) = split_data_url("AAAA");
        assert_eq!(payload, "AAAA");
        assert_eq!(mime, None);
    }
}
