//! Image uploads.
//!
//! Clients send images inline as `data:<mime>;base64,<payload>` URIs. The
//! [`MediaHost`] seam stores them and hands back a public URL; the previous
//! image is destroyed by a public id derived from that URL, so any host whose
//! URLs end in `<folder>/<id>.<ext>` fits.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use spin_sdk::http::Response;
use tracing::info;
use uuid::Uuid;

use crate::config::{media_key, MAX_IMAGE_BYTES};
use crate::core::db::KvStore;
use crate::core::errors::ApiError;

#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn from_data_uri(uri: &str) -> Result<Self, ApiError> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| ApiError::bad_request("Image must be a data URI"))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| ApiError::bad_request("Malformed image data URI"))?;
        let mime = meta
            .strip_suffix(";base64")
            .ok_or_else(|| ApiError::bad_request("Image data must be base64 encoded"))?;
        if image_extension(mime).is_none() {
            return Err(ApiError::bad_request("Only PNG, JPEG, GIF or WebP images are accepted"));
        }

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|_| ApiError::bad_request("Invalid base64 image data"))?;
        if bytes.is_empty() {
            return Err(ApiError::bad_request("Image is empty"));
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ApiError::bad_request("Image too large (max 5 MiB)"));
        }

        Ok(Self { mime: mime.to_string(), bytes })
    }

    pub fn extension(&self) -> &'static str {
        image_extension(&self.mime).unwrap_or("bin")
    }
}

/// Raster formats accepted for upload. Anything that can carry script,
/// such as SVG, is refused.
fn image_extension(mime: &str) -> Option<&'static str> {
    match mime.to_ascii_lowercase().as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

pub trait MediaHost {
    /// Stores the image and returns its public URL.
    fn upload(&self, folder: &str, image: &ImageUpload) -> anyhow::Result<String>;
    fn destroy(&self, public_id: &str) -> anyhow::Result<()>;
}

/// `<folder>/<id>` from the last two path segments of an image URL, minus
/// the file extension.
pub fn extract_public_id(image_url: &str) -> Option<String> {
    let path = image_url.split(['?', '#']).next()?;
    let mut segments = path.rsplit('/').filter(|s| !s.is_empty());
    let file = segments.next()?;
    let folder = segments.next()?;
    let stem = match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file,
    };
    Some(format!("{}/{}", folder, stem))
}

/// Destroys the image behind `image_url`, if it names one. Failures are
/// logged and swallowed: a stale image is not worth failing the request.
pub fn destroy_by_url(media: &dyn MediaHost, image_url: &str) {
    if image_url.is_empty() {
        return;
    }
    if let Some(public_id) = extract_public_id(image_url) {
        if let Err(e) = media.destroy(&public_id) {
            tracing::warn!(%public_id, error = %e, "failed to destroy image");
        }
    }
}

/// Keeps image bytes in the document store under `media:<folder>/<id>`.
pub struct KvMediaHost<'a> {
    store: &'a dyn KvStore,
    base_url: String,
}

impl<'a> KvMediaHost<'a> {
    pub fn new(store: &'a dyn KvStore, base_url: impl Into<String>) -> Self {
        Self { store, base_url: base_url.into() }
    }
}

impl MediaHost for KvMediaHost<'_> {
    fn upload(&self, folder: &str, image: &ImageUpload) -> anyhow::Result<String> {
        let public_id = format!("{}/{}", folder, Uuid::new_v4());
        self.store.set(&media_key(&public_id), &image.bytes)?;
        info!(%public_id, size = image.bytes.len(), "stored image");
        Ok(format!("{}/media/{}.{}", self.base_url, public_id, image.extension()))
    }

    fn destroy(&self, public_id: &str) -> anyhow::Result<()> {
        self.store.delete(&media_key(public_id))
    }
}

/// Serves `GET /media/<folder>/<file>` out of the store.
pub fn serve_media(store: &dyn KvStore, folder: &str, file: &str) -> anyhow::Result<Response> {
    let public_id = extract_public_id(&format!("{}/{}", folder, file))
        .ok_or_else(|| ApiError::not_found("Image not found"))?;
    let bytes = store
        .get(&media_key(&public_id))?
        .ok_or_else(|| ApiError::not_found("Image not found"))?;
    let mime = mime_guess::from_path(file).first_or_octet_stream();

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", mime.as_ref())
        .header("X-Content-Type-Options", "nosniff")
        .body(bytes)
        .build())
}
