//! File encoding: uploaded bytes → base64 payload + preview handle.
//!
//! The inference API accepts images as raw base64 strings embedded in the
//! JSON request body — no data-URL envelope, no headers. The preview handle
//! is deliberately *independent* of that payload: it is a named temp file
//! holding the original bytes, so a UI can display the untouched upload
//! while the encoded copy travels to the model.
//!
//! ## Resource discipline
//!
//! Each [`PreviewHandle`] owns one temp file, deleted on drop. Replacing or
//! clearing an upload slot drops the old [`EncodedFile`] wholesale, so
//! repeated uploads in a long session cannot accumulate orphaned files.
//! This is the one lifecycle rule in the crate worth stating explicitly.

use crate::error::GradeError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// A locally resolvable reference to the original uploaded bytes.
///
/// The wrapped temp file lives exactly as long as the handle; dropping it
/// releases the file. `path()` is what a UI hands to an image viewer.
#[derive(Debug)]
pub struct PreviewHandle {
    file: NamedTempFile,
}

impl PreviewHandle {
    /// Path to the original bytes, valid until the handle is dropped.
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// An uploaded file, encoded and ready to attach to a request.
#[derive(Debug)]
pub struct EncodedFile {
    /// Base64 of the raw bytes, standard alphabet, no envelope.
    pub data: String,
    /// Declared or inferred MIME type, e.g. `image/jpeg`.
    pub mime_type: String,
    /// Preview handle backed by the original bytes.
    pub preview: PreviewHandle,
    /// File name as the user supplied it.
    pub original_name: String,
}

/// Read and encode a user-selected file.
///
/// `declared_mime` is the MIME type reported by the picker, if any; when
/// absent it is inferred from the file extension. The single suspension
/// point is the file read.
pub async fn encode_file(
    path: impl AsRef<Path>,
    declared_mime: Option<&str>,
) -> Result<EncodedFile, GradeError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|e| GradeError::Encoding {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    let mime_type = declared_mime
        .map(str::to_string)
        .unwrap_or_else(|| mime_from_extension(path));

    let original_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    encode_bytes(&bytes, mime_type, original_name).map_err(|detail| GradeError::Encoding {
        path: path.to_path_buf(),
        detail,
    })
}

/// Encode in-memory bytes, materialising the preview handle.
///
/// Split out from [`encode_file`] so callers that receive bytes directly
/// (a drag-drop event, a test) skip the filesystem round trip.
pub fn encode_bytes(
    bytes: &[u8],
    mime_type: String,
    original_name: String,
) -> Result<EncodedFile, String> {
    let mut file = NamedTempFile::new().map_err(|e| format!("preview file: {e}"))?;
    file.write_all(bytes)
        .map_err(|e| format!("preview write: {e}"))?;

    let data = STANDARD.encode(bytes);
    debug!(
        "Encoded '{}' ({}) → {} bytes base64",
        original_name,
        mime_type,
        data.len()
    );

    Ok(EncodedFile {
        data,
        mime_type,
        preview: PreviewHandle { file },
        original_name,
    })
}

/// Infer a MIME type from the file extension.
///
/// Covers the upload types the grading flow accepts; anything else falls
/// back to `application/octet-stream` and lets the endpoint decide.
pub fn mime_from_extension(path: &Path) -> String {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
    .to_string()
}
