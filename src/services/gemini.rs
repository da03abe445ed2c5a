use crate::core::storyboard::ImageHandle;
use crate::services::generation::{
    ImageGenerator, ImageRequest, InlineMedia, TextGenerator, TextRequest, ERROR_PREFIX,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::{debug, warn};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

const OVERLOADED_MESSAGE: &str = "The AI engine encountered a complex request and timed out. Try a smaller video file or request fewer scenes.";
const API_KEY_HEADER: &str = "x-goog-api-key";
const EMPTY_RESPONSE_MESSAGE: &str = "Empty response from AI engine.";

#[derive(Debug)]
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    image_model: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: &str, base_url: &str, image_model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            image_model: image_model.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    // The key travels in a header, and errors drop their URL, so it never
    // ends up in a message.
    async fn post(&self, model: &str, body: &GeminiRequest) -> Result<(StatusCode, String)> {
        let resp = self
            .client
            .post(self.endpoint(model))
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("Failed to reach Gemini model {}", model))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Failed to read Gemini response body")?;
        Ok((status, text))
    }
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Default)]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiBlob>,
}

#[derive(Serialize)]
struct GeminiBlob {
    mime_type: String,
    data: String,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<GeminiImageConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiImageConfig {
    aspect_ratio: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
    #[serde(rename = "inlineData", alias = "inline_data")]
    inline_data: Option<GeminiBlobResponse>,
}

#[derive(Deserialize)]
struct GeminiBlobResponse {
    #[serde(rename = "mimeType", alias = "mime_type")]
    mime_type: Option<String>,
    data: String,
}

#[derive(Deserialize, Debug)]
struct GeminiError {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

fn user_content(parts: Vec<GeminiPart>) -> Vec<GeminiContent> {
    vec![GeminiContent {
        role: "user".to_string(),
        parts,
    }]
}

fn text_part(text: &str) -> GeminiPart {
    GeminiPart {
        text: Some(text.to_string()),
        ..Default::default()
    }
}

fn media_part(media: &InlineMedia) -> GeminiPart {
    GeminiPart {
        inline_data: Some(GeminiBlob {
            mime_type: media.mime_type.clone(),
            data: media.data_base64.clone(),
        }),
        ..Default::default()
    }
}

fn build_text_request(request: &TextRequest) -> GeminiRequest {
    let mut parts = vec![text_part(&request.prompt)];
    if let Some(media) = &request.attachment {
        parts.push(media_part(media));
    }
    GeminiRequest {
        contents: user_content(parts),
        system_instruction: Some(GeminiSystemInstruction {
            parts: vec![text_part(&request.system_instruction)],
        }),
        generation_config: Some(GeminiGenerationConfig {
            temperature: Some(request.temperature),
            ..Default::default()
        }),
    }
}

fn build_image_request(request: &ImageRequest) -> GeminiRequest {
    GeminiRequest {
        contents: user_content(vec![text_part(&request.prompt)]),
        system_instruction: None,
        generation_config: Some(GeminiGenerationConfig {
            response_modalities: Some(vec!["IMAGE".to_string()]),
            image_config: Some(GeminiImageConfig {
                aspect_ratio: request.aspect_ratio.as_str().to_string(),
            }),
            ..Default::default()
        }),
    }
}

/// Turns a failed exchange into the reserved error text.
fn service_error_text(status: StatusCode, error: Option<&GeminiError>) -> String {
    let internal = status == StatusCode::INTERNAL_SERVER_ERROR
        || error.is_some_and(|e| e.code == Some(500) || e.status.as_deref() == Some("INTERNAL"));
    if internal {
        return format!("{} {}", ERROR_PREFIX, OVERLOADED_MESSAGE);
    }
    let message = error
        .map(|e| e.message.as_str())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Gemini API returned status {}", status));
    format!("{} {}", ERROR_PREFIX, message)
}

/// Interprets a text-generation answer. Service failures become error text.
fn interpret_text_response(status: StatusCode, body: &str) -> String {
    let parsed: Option<GeminiResponse> = serde_json::from_str(body).ok();

    if !status.is_success() {
        return service_error_text(status, parsed.as_ref().and_then(|r| r.error.as_ref()));
    }
    let Some(result) = parsed else {
        return format!("{} Failed to parse Gemini response", ERROR_PREFIX);
    };
    if let Some(err) = &result.error {
        return service_error_text(status, Some(err));
    }

    let Some(first) = result.candidates.as_ref().and_then(|c| c.first()) else {
        return format!("{} {}", ERROR_PREFIX, EMPTY_RESPONSE_MESSAGE);
    };
    let text: String = first
        .content
        .iter()
        .flat_map(|c| c.parts.iter())
        .filter_map(|p| p.text.as_deref())
        .collect();

    if text.trim().is_empty() {
        let reason = first.finish_reason.as_deref().unwrap_or("UNKNOWN");
        debug!("Gemini returned no text. Finish reason: {}", reason);
        return format!("{} {}", ERROR_PREFIX, EMPTY_RESPONSE_MESSAGE);
    }
    text
}

/// Pulls the first inline image out of an image-generation answer.
fn extract_image(status: StatusCode, body: &str) -> Result<Option<ImageHandle>> {
    if !status.is_success() {
        return Err(anyhow!("Gemini image API error ({}): {}", status, body));
    }
    let result: GeminiResponse = serde_json::from_str(body)
        .map_err(|e| anyhow!("Failed to parse Gemini image response: {}", e))?;
    if let Some(err) = result.error {
        return Err(anyhow!("Gemini image API returned error: {}", err.message));
    }

    let blob = result
        .candidates
        .iter()
        .flatten()
        .take(1)
        .flat_map(|c| c.content.iter())
        .flat_map(|c| c.parts.iter())
        .find_map(|p| p.inline_data.as_ref());

    match blob {
        Some(blob) => {
            let bytes = BASE64
                .decode(blob.data.trim())
                .context("Gemini image base64 decode failed")?;
            let mime = blob.mime_type.as_deref().unwrap_or("image/png");
            Ok(Some(ImageHandle::new(bytes, mime)))
        }
        None => Ok(None),
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate_text(&self, request: &TextRequest) -> Result<String> {
        let body = build_text_request(request);
        let (status, text) = self.post(&request.model, &body).await?;
        if !status.is_success() {
            warn!("Gemini text request failed with status {}", status);
        }
        Ok(interpret_text_response(status, &text))
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate_image(&self, request: &ImageRequest) -> Result<Option<ImageHandle>> {
        let body = build_image_request(request);
        let (status, text) = self.post(&self.image_model, &body).await?;
        extract_image(status, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::style::AspectRatio;

    #[test]
    fn test_text_request_shape() {
        let request = TextRequest {
            prompt: "LOOK".to_string(),
            system_instruction: "SYS".to_string(),
            temperature: 0.5,
            model: "m".to_string(),
            attachment: Some(InlineMedia {
                mime_type: "video/mp4".to_string(),
                data_base64: "AAAA".to_string(),
            }),
        };
        let json = serde_json::to_value(build_text_request(&request)).unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "LOOK");
        assert_eq!(json["contents"][0]["parts"][1]["inline_data"]["mime_type"], "video/mp4");
        assert_eq!(json["contents"][0]["parts"][1]["inline_data"]["data"], "AAAA");
        assert!(json["contents"][0]["parts"][1].get("text").is_none());
        assert_eq!(json["system_instruction"]["parts"][0]["text"], "SYS");
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
    }

    #[test]
    fn test_image_request_shape() {
        let request = ImageRequest {
            prompt: "draw".to_string(),
            aspect_ratio: AspectRatio::Vertical,
        };
        let json = serde_json::to_value(build_image_request(&request)).unwrap();

        assert!(json.get("system_instruction").is_none());
        assert_eq!(json["generationConfig"]["imageConfig"]["aspectRatio"], "9:16");
        assert_eq!(json["generationConfig"]["responseModalities"][0], "IMAGE");
        assert!(json["generationConfig"].get("temperature").is_none());
    }

    #[test]
    fn test_text_response_success_joins_parts() {
        let json = r#"{
            "candidates": [
                {
                    "content": {
                        "parts": [ { "text": "[SCENE 1]\n" }, { "text": "A fox." } ],
                        "role": "model"
                    },
                    "finishReason": "STOP",
                    "index": 0
                }
            ]
        }"#;
        assert_eq!(interpret_text_response(StatusCode::OK, json), "[SCENE 1]\nA fox.");
    }

    #[test]
    fn test_text_response_safety_block_is_empty_error() {
        let json = r#"{ "candidates": [ { "finishReason": "SAFETY", "index": 0 } ] }"#;
        assert_eq!(
            interpret_text_response(StatusCode::OK, json),
            "Error: Empty response from AI engine."
        );
    }

    #[test]
    fn test_text_response_service_error_message() {
        let json = r#"{ "error": { "code": 429, "message": "quota exceeded", "status": "RESOURCE_EXHAUSTED" } }"#;
        assert_eq!(
            interpret_text_response(StatusCode::TOO_MANY_REQUESTS, json),
            "Error: quota exceeded"
        );
    }

    #[test]
    fn test_text_response_internal_error_is_rewritten() {
        let json = r#"{ "error": { "code": 500, "message": "boom", "status": "INTERNAL" } }"#;
        let text = interpret_text_response(StatusCode::INTERNAL_SERVER_ERROR, json);
        assert!(text.starts_with("Error: The AI engine encountered a complex request"));

        let text = interpret_text_response(StatusCode::BAD_GATEWAY, "<html>");
        assert_eq!(text, "Error: Gemini API returned status 502 Bad Gateway");
    }

    #[test]
    fn test_endpoint_has_no_key() {
        let client = GeminiClient::new("SECRET_KEY_123", "https://example.test/v1beta/", "img");
        assert_eq!(
            client.endpoint("m"),
            "https://example.test/v1beta/models/m:generateContent"
        );
    }

    #[tokio::test]
    async fn test_connect_failure_does_not_leak_key() {
        let client = GeminiClient::new("SECRET_KEY_123", "http://127.0.0.1:9", "img");
        let request = TextRequest {
            prompt: "LOOK".to_string(),
            system_instruction: "SYS".to_string(),
            temperature: 0.7,
            model: "m".to_string(),
            attachment: None,
        };

        let err = client.generate_text(&request).await.unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("Failed to reach Gemini model m"), "{}", message);
        assert!(!message.contains("SECRET_KEY_123"), "{}", message);

        let image = ImageRequest {
            prompt: "draw".to_string(),
            aspect_ratio: AspectRatio::Wide,
        };
        let err = client.generate_image(&image).await.unwrap_err();
        assert!(!format!("{:#}", err).contains("SECRET_KEY_123"));
    }

    #[test]
    fn test_extract_image() {
        let json = r#"{
            "candidates": [
                {
                    "content": {
                        "parts": [
                            { "text": "Here you go" },
                            { "inlineData": { "mimeType": "image/png", "data": "aGk=" } }
                        ]
                    }
                }
            ]
        }"#;
        let image = extract_image(StatusCode::OK, json).unwrap().unwrap();
        assert_eq!(image.bytes, b"hi");
        assert_eq!(image.mime_type, "image/png");
    }

    #[test]
    fn test_extract_image_without_candidate() {
        let json = r#"{ "candidates": [ { "content": { "parts": [ { "text": "no" } ] } } ] }"#;
        assert!(extract_image(StatusCode::OK, json).unwrap().is_none());
        assert!(extract_image(StatusCode::OK, "{}").unwrap().is_none());
        assert!(extract_image(StatusCode::FORBIDDEN, "denied").is_err());
        assert!(extract_image(StatusCode::OK, "not json").is_err());
    }
}
