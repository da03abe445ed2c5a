use crate::core::error::UploadError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::path::Path;

/// 15 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 15 * 1024 * 1024;

/// A reference video accepted for a run.
#[derive(Clone, PartialEq, Eq)]
pub struct VideoUpload {
    file_name: String,
    mime_type: String,
    bytes: Vec<u8>,
}

impl std::fmt::Debug for VideoUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoUpload")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Rejects anything that is not `video/*` or is over the size limit.
pub fn check_upload(mime_type: &str, size: u64) -> Result<(), UploadError> {
    if !mime_type.to_ascii_lowercase().starts_with("video/") {
        return Err(UploadError::NotAVideo(mime_type.to_string()));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge {
            size,
            limit: MAX_UPLOAD_BYTES,
        });
    }
    Ok(())
}

pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "mp4" | "m4v" => Some("video/mp4"),
        "mov" => Some("video/quicktime"),
        "webm" => Some("video/webm"),
        "mkv" => Some("video/x-matroska"),
        "avi" => Some("video/x-msvideo"),
        "mpeg" | "mpg" => Some("video/mpeg"),
        "3gp" => Some("video/3gpp"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "txt" => Some("text/plain"),
        _ => None,
    }
}

impl VideoUpload {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Self, UploadError> {
        let mime_type = mime_type.into();
        check_upload(&mime_type, bytes.len() as u64)?;
        Ok(Self {
            file_name: file_name.into(),
            mime_type,
            bytes,
        })
    }

    /// Loads a video from disk. The size limit is checked against file
    /// metadata before the payload is read.
    pub async fn from_path(path: &Path) -> Result<Self, UploadError> {
        let mime_type = mime_for_path(path).unwrap_or("application/octet-stream");
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| UploadError::Unreadable(e.to_string()))?;
        check_upload(mime_type, meta.len())?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| UploadError::Unreadable(e.to_string()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::new(file_name, mime_type, bytes)
    }

    /// Builds an upload without validation, for exercising the checks
    /// downstream.
    #[cfg(test)]
    pub(crate) fn unchecked(file_name: &str, mime_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            bytes,
        }
    }

    /// Re-runs the media-type and size checks on this payload.
    pub fn check(&self) -> Result<(), UploadError> {
        check_upload(&self.mime_type, self.size())
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }
}
