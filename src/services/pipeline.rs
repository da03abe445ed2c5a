use crate::core::error::StudioError;
use crate::core::storyboard::{CharacterProfile, ImageState, SceneOutcome};
use crate::core::style::{AspectRatio, VisualStyle};
use crate::services::generation::{ImageGenerator, ImageRequest};
use crate::services::prompt::build_scene_image_prompt;
use futures_util::StreamExt;
use log::{debug, info, warn};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

/// Receives per-scene progress while images are generated.
pub trait SceneProgress: Send + Sync {
    fn scenes_ready(&self, _count: usize) {}
    fn scene_resolved(&self, _index: usize, _state: ImageState) {}
    fn images_finished(&self) {}
}

pub struct NoProgress;

impl SceneProgress for NoProgress {}

/// Everything one image request needs besides the scene text.
#[derive(Debug, Clone, Copy)]
pub struct SceneLook<'a> {
    pub profile: &'a CharacterProfile,
    pub style: &'a VisualStyle,
    pub aspect_ratio: AspectRatio,
}

pub struct ScenePipeline {
    images: Arc<dyn ImageGenerator>,
    concurrency: usize,
    timeout: Duration,
}

impl ScenePipeline {
    pub fn new(images: Arc<dyn ImageGenerator>, concurrency: usize, timeout: Duration) -> Self {
        Self {
            images,
            concurrency: concurrency.max(1),
            timeout,
        }
    }

    /// Requests the image for one scene. Never fails: every error becomes
    /// `SceneOutcome::Failed`.
    pub async fn render_scene(&self, index: usize, text: &str, look: SceneLook<'_>) -> SceneOutcome {
        let request = ImageRequest {
            prompt: build_scene_image_prompt(text, look.profile, look.style),
            aspect_ratio: look.aspect_ratio,
        };

        let reason = match tokio::time::timeout(self.timeout, self.images.generate_image(&request)).await {
            Ok(Ok(Some(image))) => return SceneOutcome::Loaded(image),
            Ok(Ok(None)) => "no image in response".to_string(),
            Ok(Err(e)) => format!("{:#}", e),
            Err(_) => format!("timed out after {:?}", self.timeout),
        };
        warn!("{}", StudioError::ImageGeneration { index, reason: reason.clone() });
        SceneOutcome::Failed(reason)
    }

    /// Generates an image for every scene text and hands each outcome to
    /// `apply` together with its scene index. With a concurrency of 1 the
    /// requests run strictly in index order; otherwise outcomes may arrive
    /// out of order but always carry their own index.
    ///
    /// When `apply` breaks, no further requests are issued and the ones in
    /// flight are dropped.
    pub async fn run<F>(
        &self,
        texts: &[String],
        look: SceneLook<'_>,
        progress: &dyn SceneProgress,
        mut apply: F,
    ) where
        F: FnMut(usize, SceneOutcome) -> ControlFlow<()>,
    {
        info!(
            "Generating {} scene images ({} style, {}, concurrency {})",
            texts.len(),
            look.style.name,
            look.aspect_ratio.as_str(),
            self.concurrency
        );

        let mut outcomes = futures_util::stream::iter(texts.iter().enumerate())
            .map(|(i, text)| async move { (i, self.render_scene(i, text, look).await) })
            .buffer_unordered(self.concurrency);

        while let Some((i, outcome)) = outcomes.next().await {
            let state = match &outcome {
                SceneOutcome::Loaded(_) => ImageState::Loaded,
                SceneOutcome::Failed(_) => ImageState::Failed,
            };
            if apply(i, outcome).is_break() {
                debug!("Scene image generation stopped after scene {}", i + 1);
                break;
            }
            progress.scene_resolved(i, state);
        }
        progress.images_finished();
    }
}
