use anyhow::Context;
use bytes::Bytes;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::storage::StorageClient;

/// Image payload taken from a multipart request.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub body: Bytes,
}

pub(crate) fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Basename of a client supplied filename with anything outside
/// `[A-Za-z0-9._-]` replaced by `_`.
fn sanitize_file_name(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

impl ImageUpload {
    /// `<uuid>_<filename>`, unique per call.
    pub fn stored_name(&self) -> String {
        let file_name = self
            .file_name
            .as_deref()
            .and_then(sanitize_file_name)
            .unwrap_or_else(|| match ext_from_mime(&self.content_type) {
                Some(ext) => format!("image.{ext}"),
                None => "image".to_string(),
            });
        format!("{}_{}", Uuid::new_v4(), file_name)
    }
}

pub async fn store_image(
    storage: &dyn StorageClient,
    image: ImageUpload,
) -> anyhow::Result<String> {
    let name = image.stored_name();
    let reference = storage
        .put_object(&name, image.body, &image.content_type)
        .await
        .with_context(|| format!("store image {name}"))?;
    debug!(%reference, "image stored");
    Ok(reference)
}

/// Removes a stored image. Failures are logged and otherwise ignored.
pub async fn discard_image(storage: &dyn StorageClient, reference: &str) {
    if let Err(e) = storage.delete_object(reference).await {
        warn!(error = ?e, %reference, "failed to delete stored image");
    }
}
