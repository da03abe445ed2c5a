use crate::core::config::{Config, GenerationConfig, StoryboardSettings};
use crate::core::error::{StudioError, UploadError};
use crate::core::storyboard::{ImageState, RunId, RunSnapshot, RunState, SceneOutcome, Storyboard};
use crate::core::style::{AspectRatio, VisualStyle};
use crate::core::upload::VideoUpload;
use crate::services::clipboard::{Clipboard, CopyTarget, CopyTracker};
use crate::services::generation::{
    service_error_message, Generators, ImageGenerator, InlineMedia, TextGenerator, TextRequest,
};
use crate::services::parser::parse_response;
use crate::services::pipeline::{SceneLook, ScenePipeline, SceneProgress};
use crate::services::prompt::{build_storyboard_prompt, clamp_scene_count};
use log::{debug, error, info, warn};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// User choices for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub scene_count: u32,
    pub style: &'static VisualStyle,
    pub aspect_ratio: AspectRatio,
}

impl RunOptions {
    pub fn new(scene_count: u32, style: &'static VisualStyle, aspect_ratio: AspectRatio) -> Self {
        Self {
            scene_count: clamp_scene_count(scene_count),
            style,
            aspect_ratio,
        }
    }

    pub fn from_settings(settings: &StoryboardSettings) -> Self {
        Self::new(settings.scene_count(), settings.visual_style(), settings.aspect_ratio)
    }
}

#[derive(Debug, Default)]
struct Session {
    run_id: RunId,
    state: RunState,
    error_message: Option<String>,
    storyboard: Storyboard,
    copies: CopyTracker,
}

impl Session {
    fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            run_id: self.run_id,
            state: self.state,
            error_message: self.error_message.clone(),
            storyboard: self.storyboard.clone(),
        }
    }
}

/// Drives one storyboard run at a time: prompt, text generation, parsing,
/// then per-scene images. Results of a run that has been replaced by a newer
/// one are discarded.
pub struct StoryboardWorkflow {
    generation: GenerationConfig,
    text: Arc<dyn TextGenerator>,
    pipeline: ScenePipeline,
    timeout: Duration,
    session: Mutex<Session>,
    last_run: AtomicU64,
}

impl StoryboardWorkflow {
    pub fn new(config: &Config, generators: Generators) -> Self {
        Self::with_parts(
            config.generation.generation_config(),
            generators.text,
            generators.image,
            config.generation.image_concurrency,
            config.generation.request_timeout(),
        )
    }

    pub fn with_parts(
        generation: GenerationConfig,
        text: Arc<dyn TextGenerator>,
        images: Arc<dyn ImageGenerator>,
        image_concurrency: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            generation,
            text,
            pipeline: ScenePipeline::new(images, image_concurrency, timeout),
            timeout,
            session: Mutex::new(Session::default()),
            last_run: AtomicU64::new(0),
        }
    }

    fn with_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut session)
    }

    /// Runs `f` only if `run_id` is still the active run.
    fn with_active_session<R>(&self, run_id: RunId, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        self.with_session(|session| {
            if session.run_id == run_id {
                Some(f(session))
            } else {
                debug!("Discarding result of superseded run {}", run_id);
                None
            }
        })
    }

    pub fn snapshot(&self) -> RunSnapshot {
        self.with_session(|s| s.snapshot())
    }

    pub fn state(&self) -> RunState {
        self.with_session(|s| s.state)
    }

    /// Copies part of the current storyboard. Returns false when the target
    /// has nothing to copy.
    pub fn copy(&self, target: CopyTarget, clipboard: &dyn Clipboard) -> bool {
        self.with_session(|session| match target.text(&session.storyboard) {
            Some(text) => {
                session.copies.copy(clipboard, &target.id(), &text);
                true
            }
            None => false,
        })
    }

    pub fn is_copied(&self, target: CopyTarget) -> bool {
        self.with_session(|s| s.copies.is_copied(&target.id()))
    }

    fn begin(&self) -> RunId {
        let run_id = self.last_run.fetch_add(1, Ordering::SeqCst) + 1;
        self.with_session(|session| {
            *session = Session {
                run_id,
                state: RunState::Running,
                ..Default::default()
            };
        });
        run_id
    }

    fn fail(&self, run_id: RunId, err: StudioError) -> StudioError {
        let committed = self.with_active_session(run_id, |session| {
            session.state = RunState::Failed;
            session.error_message = Some(err.to_string());
            session.storyboard = Storyboard::default();
        });
        if committed.is_some() {
            error!("Run {} failed: {}", run_id, err);
            err
        } else {
            StudioError::Superseded(run_id)
        }
    }

    async fn request_storyboard_text(&self, upload: &VideoUpload, scene_count: u32) -> Result<String, StudioError> {
        let request = TextRequest {
            prompt: build_storyboard_prompt(scene_count),
            system_instruction: self.generation.system_instruction.clone(),
            temperature: self.generation.temperature,
            model: self.generation.model_id.clone(),
            attachment: Some(InlineMedia {
                mime_type: upload.mime_type().to_string(),
                data_base64: upload.to_base64(),
            }),
        };
        debug!(
            "Text request: {} prompt chars, {} attachment bytes",
            request.prompt.len(),
            upload.size()
        );

        let response = match tokio::time::timeout(self.timeout, self.text.generate_text(&request)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(StudioError::Transport(format!("{:#}", e))),
            Err(_) => {
                return Err(StudioError::Transport(format!(
                    "no response after {:?}",
                    self.timeout
                )))
            }
        };

        match service_error_message(&response) {
            Some(message) => Err(StudioError::ServiceReported(message.to_string())),
            None => Ok(response),
        }
    }

    /// Runs the whole pipeline for `upload`. Without a valid upload nothing
    /// is requested and the run state is left untouched.
    ///
    /// Image failures only mark their scene; the run still succeeds. The
    /// returned snapshot is the final state of this run.
    pub async fn run(
        &self,
        upload: Option<&VideoUpload>,
        options: &RunOptions,
        progress: &dyn SceneProgress,
    ) -> Result<RunSnapshot, StudioError> {
        let checked = match upload {
            Some(u) if !u.is_empty() => u.check().map(|_| u),
            _ => Err(UploadError::Missing),
        };
        let upload = match checked {
            Ok(u) => u,
            Err(e) => {
                let err = StudioError::from(e);
                self.with_session(|s| s.error_message = Some(err.to_string()));
                return Err(err);
            }
        };

        let run_id = self.begin();
        let scene_count = clamp_scene_count(options.scene_count);
        info!(
            "Run {}: requesting {} scenes for {} ({})",
            run_id,
            scene_count,
            upload.file_name(),
            upload.mime_type()
        );

        let response = match self.request_storyboard_text(upload, scene_count).await {
            Ok(text) => text,
            Err(e) => return Err(self.fail(run_id, e)),
        };

        let parsed = match parse_response(&response) {
            Ok(parsed) => parsed,
            Err(e) => return Err(self.fail(run_id, e)),
        };
        info!("Run {}: parsed {} scenes", run_id, parsed.scenes.len());

        let texts = parsed.scenes.clone();
        let profile = parsed.character_profile.clone();
        let storyboard = parsed.into_storyboard();

        self.with_active_session(run_id, |session| session.storyboard = storyboard)
            .ok_or(StudioError::Superseded(run_id))?;
        progress.scenes_ready(texts.len());

        let look = SceneLook {
            profile: &profile,
            style: options.style,
            aspect_ratio: options.aspect_ratio,
        };
        self.pipeline
            .run(&texts, look, progress, |index, outcome: SceneOutcome| {
                match self.with_active_session(run_id, |session| {
                    if !session.storyboard.scenes.apply(index, outcome) {
                        debug!("Scene {} already resolved in run {}", index, run_id);
                    }
                }) {
                    Some(()) => ControlFlow::Continue(()),
                    None => ControlFlow::Break(()),
                }
            })
            .await;

        self.with_active_session(run_id, |session| {
            if !session.storyboard.scenes.all_resolved() {
                warn!("Run {} finished with unresolved scenes", run_id);
            }
            session.state = RunState::Succeeded;
            session.snapshot()
        })
        .map(|snapshot| {
            info!(
                "Run {} complete: {} of {} images loaded",
                run_id,
                snapshot.storyboard.scenes.count(ImageState::Loaded),
                snapshot.storyboard.scenes.len()
            );
            snapshot
        })
        .ok_or(StudioError::Superseded(run_id))
    }
}
