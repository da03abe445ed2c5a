use crate::core::config::Config;
use crate::core::storyboard::ImageHandle;
use crate::core::style::AspectRatio;
use crate::services::gemini::GeminiClient;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// Text answers starting with this carry a service-side failure.
pub const ERROR_PREFIX: &str = "Error:";

/// Binary attachment sent inline with a text request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineMedia {
    pub mime_type: String,
    pub data_base64: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub prompt: String,
    pub system_instruction: String,
    pub temperature: f32,
    pub model: String,
    pub attachment: Option<InlineMedia>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
}

#[async_trait]
pub trait TextGenerator: Send + Sync + Debug {
    /// `Err` means the request never completed. Failures the service reports
    /// come back as `Ok` text starting with [`ERROR_PREFIX`].
    async fn generate_text(&self, request: &TextRequest) -> Result<String>;
}

#[async_trait]
pub trait ImageGenerator: Send + Sync + Debug {
    /// `Ok(None)` when the service answered without an image.
    async fn generate_image(&self, request: &ImageRequest) -> Result<Option<ImageHandle>>;
}

/// Splits a reserved error answer into its message.
pub fn service_error_message(response: &str) -> Option<&str> {
    let trimmed = response.trim_start();
    let head = trimmed.get(..ERROR_PREFIX.len())?;
    if head.eq_ignore_ascii_case(ERROR_PREFIX) {
        Some(trimmed[ERROR_PREFIX.len()..].trim())
    } else {
        None
    }
}

pub struct Generators {
    pub text: Arc<dyn TextGenerator>,
    pub image: Arc<dyn ImageGenerator>,
}

pub fn create_generators(config: &Config) -> Result<Generators> {
    match config.generation.provider.as_str() {
        "gemini" => {
            let cfg = config
                .generation
                .gemini
                .as_ref()
                .context("Gemini config missing")?;
            if cfg.api_key.trim().is_empty() {
                return Err(anyhow!("Gemini API key is empty"));
            }
            let client = Arc::new(GeminiClient::new(
                &cfg.api_key,
                &cfg.base_url,
                &config.generation.image_model,
            ));
            Ok(Generators {
                text: client.clone(),
                image: client,
            })
        }
        _ => Err(anyhow!(
            "Unknown generation provider: {}",
            config.generation.provider
        )),
    }
}
