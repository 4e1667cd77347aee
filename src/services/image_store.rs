use crate::errors::ServiceError;
use http::HeaderMap;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Path prefix uploaded files are served under
pub const UPLOADS_PREFIX: &str = "/uploads/";

/// Upload accepted from a multipart request, not yet written to disk
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    /// Rejects non-`image/*` content types and empty bodies
    pub fn validate(&self) -> Result<(), ServiceError> {
        let is_image = self
            .content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(false);
        if !is_image {
            return Err(ServiceError::ValidationError(format!(
                "Only image files are allowed ({})",
                self.file_name.as_deref().unwrap_or("unnamed file")
            )));
        }
        if self.bytes.is_empty() {
            return Err(ServiceError::ValidationError(
                "Empty file provided".to_string(),
            ));
        }
        Ok(())
    }
}

/// Local-disk store for product images.
///
/// Files are written flat into `root` as `{uuid}{.ext}` and referenced by
/// absolute URLs built from the request's public base URL.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the uploads directory when missing
    pub async fn ensure_root(&self) -> Result<(), ServiceError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Writes one image and returns its public URL
    pub async fn save(&self, upload: &UploadedImage, base_url: &str) -> Result<String, ServiceError> {
        upload.validate()?;

        let file_name = match upload.file_name.as_deref().and_then(extension_of) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };

        self.ensure_root().await?;
        tokio::fs::write(self.root.join(&file_name), &upload.bytes).await?;
        debug!(file = %file_name, size = upload.bytes.len(), "Stored uploaded image");

        Ok(format!(
            "{}{}{}",
            base_url.trim_end_matches('/'),
            UPLOADS_PREFIX,
            file_name
        ))
    }

    /// Writes every upload, returning URLs in submission order.
    ///
    /// All or nothing: files written before a failing upload are removed.
    pub async fn save_all(
        &self,
        uploads: &[UploadedImage],
        base_url: &str,
    ) -> Result<Vec<String>, ServiceError> {
        let mut urls = Vec::with_capacity(uploads.len());
        for upload in uploads {
            match self.save(upload, base_url).await {
                Ok(url) => urls.push(url),
                Err(e) => {
                    self.delete_all(&urls).await;
                    return Err(e);
                }
            }
        }
        if !urls.is_empty() {
            info!("{} image(s) uploaded", urls.len());
        }
        Ok(urls)
    }

    /// Maps a stored image reference back to a file under the uploads root.
    ///
    /// Accepts `http(s)://host/uploads/<file>` and `/uploads/<file>`; any
    /// other reference, or one that would leave the root, yields `None`.
    pub fn resolve(&self, url: &str) -> Option<PathBuf> {
        let relative = if url.starts_with("http://") || url.starts_with("https://") {
            url.split_once(UPLOADS_PREFIX).map(|(_, rest)| rest)?
        } else {
            url.strip_prefix(UPLOADS_PREFIX)?
        };

        let mut components = Path::new(relative).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Some(self.root.join(name)),
            _ => None,
        }
    }

    /// Best-effort removal of a stored image; never fails the caller
    pub async fn delete(&self, url: &str) -> bool {
        let Some(path) = self.resolve(url) else {
            debug!(url, "Image reference is not a local upload, skipping delete");
            return false;
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(path = %path.display(), "Deleted image");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Image already gone");
                false
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to delete image");
                false
            }
        }
    }

    pub async fn delete_all(&self, urls: &[String]) {
        for url in urls.iter().filter(|u| !u.is_empty()) {
            self.delete(url).await;
        }
    }
}

fn extension_of(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > 10 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Public base URL of the current request, honouring reverse-proxy headers
pub fn public_base_url(headers: &HeaderMap, port: u16) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(',').next().unwrap_or(v).trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let scheme = header("x-forwarded-proto").unwrap_or_else(|| "http".to_string());
    let host = header("x-forwarded-host")
        .or_else(|| header("host"))
        .unwrap_or_else(|| format!("localhost:{}", port));

    format!("{}://{}", scheme, host)
}
