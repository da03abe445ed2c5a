use serde::{Deserialize, Serialize};

pub const FALLBACK_CHARACTER_PROFILE: &str = "A cinematic subject";
pub const FALLBACK_TITLE: &str = "Untitled";
pub const FALLBACK_TAGS: &str = "#shorts #viral";

/// Identifies one orchestration invocation. Ids only grow.
pub type RunId = u64;

#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq, Eq)]
pub struct StoryBlueprint {
    pub hook: String,
    pub pacing: String,
    pub mood: String,
    pub expansion: String,
}

/// The master identity repeated into every image request.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct CharacterProfile(String);

impl CharacterProfile {
    /// Blank descriptions collapse to the fallback so the profile is never empty.
    pub fn new(description: &str) -> Self {
        let trimmed = description.trim();
        if trimmed.is_empty() {
            Self::fallback()
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn fallback() -> Self {
        Self(FALLBACK_CHARACTER_PROFILE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct YoutubeMetadata {
    pub title: String,
    pub description: String,
    pub tags: String,
}

impl YoutubeMetadata {
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags.split_whitespace().collect()
    }

    /// Title, description and tags separated by blank lines.
    pub fn combined(&self) -> String {
        format!("{}\n\n{}\n\n{}", self.title, self.description, self.tags)
    }
}

/// A generated image payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageHandle {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImageHandle {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "png",
        }
    }

    /// File name offered for download, 1-based like the scene labels.
    pub fn file_name(&self, scene_index: usize) -> String {
        format!("scene-{}.{}", scene_index + 1, self.extension())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageState {
    Pending,
    Loaded,
    Failed,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Scene {
    pub index: usize,
    pub text: String,
    #[serde(skip)]
    pub image: Option<ImageHandle>,
    pub image_state: ImageState,
}

impl Scene {
    pub fn pending(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            image: None,
            image_state: ImageState::Pending,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.image_state != ImageState::Pending
    }
}

/// What happened to one scene's image request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SceneOutcome {
    Loaded(ImageHandle),
    Failed(String),
}

/// Scenes addressed by index. Each slot accepts exactly one outcome.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct SceneBoard {
    scenes: Vec<Scene>,
}

impl SceneBoard {
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let scenes = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| Scene::pending(i, text))
            .collect();
        Self { scenes }
    }

    /// Records the outcome for `index`. Returns false if the index is unknown
    /// or the scene already left `Pending`.
    pub fn apply(&mut self, index: usize, outcome: SceneOutcome) -> bool {
        let Some(scene) = self.scenes.get_mut(index) else {
            return false;
        };
        if scene.is_resolved() {
            return false;
        }
        match outcome {
            SceneOutcome::Loaded(image) => {
                scene.image = Some(image);
                scene.image_state = ImageState::Loaded;
            }
            SceneOutcome::Failed(_) => {
                scene.image_state = ImageState::Failed;
            }
        }
        true
    }

    pub fn all_resolved(&self) -> bool {
        self.scenes.iter().all(Scene::is_resolved)
    }

    pub fn count(&self, state: ImageState) -> usize {
        self.scenes.iter().filter(|s| s.image_state == state).count()
    }

    pub fn get(&self, index: usize) -> Option<&Scene> {
        self.scenes.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Scene> {
        self.scenes.iter()
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Everything derived from one generation response.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Storyboard {
    pub blueprint: Option<StoryBlueprint>,
    pub character_profile: Option<CharacterProfile>,
    pub scenes: SceneBoard,
    pub metadata: Option<YoutubeMetadata>,
}

impl Storyboard {
    pub fn is_empty(&self) -> bool {
        self.blueprint.is_none()
            && self.character_profile.is_none()
            && self.scenes.is_empty()
            && self.metadata.is_none()
    }
}

/// Read-only view of the current run for presentation.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSnapshot {
    pub run_id: RunId,
    pub state: RunState,
    pub error_message: Option<String>,
    pub storyboard: Storyboard,
}
