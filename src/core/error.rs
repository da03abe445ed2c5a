use thiserror::Error;

/// Reasons a video payload is refused before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("No reference video uploaded. Upload a video first.")]
    Missing,
    #[error("Invalid file format '{0}'. Please upload a video.")]
    NotAVideo(String),
    #[error("Video is too large ({size} bytes, max {limit} bytes).")]
    TooLarge { size: u64, limit: u64 },
    #[error("Failed to read the video file: {0}")]
    Unreadable(String),
}

/// Everything that can end a storyboard run, plus the per-scene image failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StudioError {
    #[error(transparent)]
    InvalidUpload(#[from] UploadError),

    /// Network or client-side failure on the text-generation call.
    #[error("Generation request failed: {0}")]
    Transport(String),

    /// The service answered with a reserved error-prefixed payload.
    #[error("{0}")]
    ServiceReported(String),

    #[error("no scenes detected")]
    NoScenesDetected,

    /// A newer run started before this one finished; its results were dropped.
    #[error("run {0} was superseded by a newer run")]
    Superseded(u64),

    #[error("Image generation failed for scene {}: {reason}", .index + 1)]
    ImageGeneration { index: usize, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_failure_names_scene_from_one() {
        let err = StudioError::ImageGeneration { index: 1, reason: "boom".to_string() };
        assert_eq!(err.to_string(), "Image generation failed for scene 2: boom");
        assert_eq!(StudioError::NoScenesDetected.to_string(), "no scenes detected");
    }

    #[test]
    fn test_upload_error_passes_message_through() {
        let err: StudioError = UploadError::Missing.into();
        assert_eq!(err.to_string(), UploadError::Missing.to_string());
    }
}
