use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::core::style::{find_style, AspectRatio, VisualStyle};
use crate::services::prompt::{clamp_scene_count, DEFAULT_SYSTEM_INSTRUCTION};

pub const CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_output")]
    pub output_folder: String,

    #[serde(default)]
    pub unattended: bool,

    #[serde(default)]
    pub generation: GenerationSettings,

    #[serde(default)]
    pub storyboard: StoryboardSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenerationSettings {
    #[serde(default = "default_provider")]
    pub provider: String, // only "gemini" for now
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_image_concurrency")]
    pub image_concurrency: usize,
    pub gemini: Option<GeminiConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StoryboardSettings {
    #[serde(default = "default_scene_count")]
    pub scene_count: u32,
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
}

/// The per-run parameters for the text-generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub system_instruction: String,
    pub temperature: f32,
    pub model_id: String,
}

impl GenerationConfig {
    pub fn new(system_instruction: &str, temperature: f32, model_id: &str) -> Self {
        let temperature = if temperature.is_finite() {
            temperature.clamp(0.0, 2.0)
        } else {
            default_temperature()
        };
        Self {
            system_instruction: system_instruction.to_string(),
            temperature,
            model_id: model_id.to_string(),
        }
    }
}

fn default_output() -> String {
    "output".to_string()
}
fn default_provider() -> String {
    "gemini".to_string()
}
fn default_system_instruction() -> String {
    DEFAULT_SYSTEM_INSTRUCTION.to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_model() -> String {
    "gemini-3-flash-preview".to_string()
}
fn default_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}
fn default_request_timeout() -> u64 {
    180
}
fn default_image_concurrency() -> usize {
    1
}
fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_scene_count() -> u32 {
    5
}
fn default_style() -> String {
    "realistic".to_string()
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            system_instruction: default_system_instruction(),
            temperature: default_temperature(),
            model: default_model(),
            image_model: default_image_model(),
            request_timeout_seconds: default_request_timeout(),
            image_concurrency: default_image_concurrency(),
            gemini: None,
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_gemini_base_url(),
        }
    }
}

impl Default for StoryboardSettings {
    fn default() -> Self {
        Self {
            scene_count: default_scene_count(),
            style: default_style(),
            aspect_ratio: AspectRatio::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_folder: default_output(),
            unattended: false,
            generation: GenerationSettings::default(),
            storyboard: StoryboardSettings::default(),
        }
    }
}

impl GenerationSettings {
    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig::new(&self.system_instruction, self.temperature, &self.model)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds.max(1))
    }
}

impl StoryboardSettings {
    /// Unknown style ids fall back to the first catalog entry.
    pub fn visual_style(&self) -> &'static VisualStyle {
        find_style(&self.style).unwrap_or_else(crate::core::style::default_style)
    }

    pub fn scene_count(&self) -> u32 {
        clamp_scene_count(self.scene_count)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("{} not found. Please create one.", path.display());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(Path::new(CONFIG_FILE))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.output_folder)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.yml");
        fs::write(&path, "generation:\n  gemini:\n    api_key: abc\n")?;

        let config = Config::load_from(&path)?;
        assert_eq!(config.output_folder, "output");
        assert_eq!(config.generation.provider, "gemini");
        assert_eq!(config.generation.model, "gemini-3-flash-preview");
        assert_eq!(config.generation.image_concurrency, 1);
        let gemini = config.generation.gemini.as_ref().unwrap();
        assert_eq!(gemini.api_key, "abc");
        assert!(gemini.base_url.starts_with("https://generativelanguage"));
        assert_eq!(config.storyboard.scene_count, 5);
        assert_eq!(config.storyboard.visual_style().id, "realistic");
        assert_eq!(config.storyboard.aspect_ratio, AspectRatio::Wide);
        Ok(())
    }

    #[test]
    fn test_storyboard_settings_parse_and_clamp() -> Result<()> {
        let yaml = "storyboard:\n  scene_count: 40\n  style: clay\n  aspect_ratio: \"9:16\"\n";
        let config: Config = serde_yaml_ng::from_str(yaml)?;
        assert_eq!(config.storyboard.scene_count(), 20);
        assert_eq!(config.storyboard.visual_style().name, "Claymation");
        assert_eq!(config.storyboard.aspect_ratio, AspectRatio::Vertical);
        Ok(())
    }

    #[test]
    fn test_generation_config_clamps_temperature() {
        assert_eq!(GenerationConfig::new("sys", 3.5, "m").temperature, 2.0);
        assert_eq!(GenerationConfig::new("sys", -1.0, "m").temperature, 0.0);
        assert_eq!(GenerationConfig::new("sys", f32::NAN, "m").temperature, 0.7);
    }

    #[test]
    fn test_save_round_trips_choices() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.yml");

        let mut config = Config::default();
        config.storyboard.style = "neon".to_string();
        config.storyboard.aspect_ratio = AspectRatio::Vertical;
        config.save_to(&path)?;

        let loaded = Config::load_from(&path)?;
        assert_eq!(loaded.storyboard.style, "neon");
        assert_eq!(loaded.storyboard.aspect_ratio, AspectRatio::Vertical);
        Ok(())
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = Config::load_from(Path::new("/definitely/not/here.yml")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
