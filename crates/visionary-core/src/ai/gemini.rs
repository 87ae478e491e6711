use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{GenerationError, ImageGenerator, PromptAssistant};
use crate::model::GenerationSettings;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-3-flash-preview";

const PROMPT_ENGINEER_INSTRUCTION: &str = "You are a professional prompt engineer for AI image generators. \
Expand the user's short prompt into a rich, detailed, and highly descriptive prompt that includes \
lighting, texture, composition, and mood. Keep it under 100 words.";

const FALLBACK_MIME_TYPE: &str = "image/png";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<TextPart>,
}

impl Content {
    fn text(text: String) -> Self {
        Self {
            parts: vec![TextPart { text }],
        }
    }
}

#[derive(Serialize)]
struct TextPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    image_config: ImageConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: String,
}

#[derive(Deserialize, Default)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, alias = "inline_data")]
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default, alias = "mime_type")]
    mime_type: Option<String>,
    data: String,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[ResponsePart] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default()
    }

    /// First inline image of the first candidate, as a data URI
    fn image_data_uri(&self) -> Option<String> {
        self.first_parts()
            .iter()
            .filter_map(|part| part.inline_data.as_ref())
            .find(|inline| !inline.data.is_empty())
            .map(|inline| {
                let mime = inline.mime_type.as_deref().unwrap_or(FALLBACK_MIME_TYPE);
                format!("data:{};base64,{}", mime, inline.data)
            })
    }

    fn text(&self) -> String {
        self.first_parts()
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect::<String>()
    }
}

/// Prompt text sent to the image model, with the settings folded in
pub fn compose_image_prompt(prompt: &str, settings: &GenerationSettings) -> String {
    format!(
        "{}. Style: {}. Negative prompt: {}. Guidance scale: {}. Seed: {}",
        prompt,
        settings.style.as_str(),
        settings.negative_prompt,
        settings.guidance_scale,
        settings.seed
    )
}

fn image_request(prompt: &str, settings: &GenerationSettings) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::text(compose_image_prompt(prompt, settings))],
        system_instruction: None,
        generation_config: Some(GenerationConfig {
            image_config: ImageConfig {
                aspect_ratio: settings.aspect_ratio.as_str().to_string(),
            },
        }),
    }
}

fn assist_request(prompt: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::text(format!("Improve this prompt: {}", prompt))],
        system_instruction: Some(Content::text(PROMPT_ENGINEER_INSTRUCTION.to_string())),
        generation_config: None,
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    api_base: String,
    text_model: String,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim().trim_end_matches('/').to_string();
        self
    }

    pub fn with_text_model(mut self, model: &str) -> Self {
        self.text_model = model.to_string();
        self
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{}", trimmed)
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GenerationError> {
        let url = self.endpoint_for_model(model);
        tracing::debug!(%url, "sending generateContent request");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }

    pub async fn generate_image(
        &self,
        prompt: &str,
        settings: &GenerationSettings,
    ) -> Result<String, GenerationError> {
        let request = image_request(prompt, settings);
        let result = self
            .generate_content(&settings.model_id, &request)
            .await
            .and_then(|response| response.image_data_uri().ok_or(GenerationError::NoImageData));

        if let Err(e) = &result {
            tracing::error!(error = %e, model = %settings.model_id, "image generation failed");
        }
        result
    }

    pub async fn improve_prompt(&self, prompt: &str) -> String {
        let request = assist_request(prompt);
        match self.generate_content(&self.text_model, &request).await {
            Ok(response) => {
                let improved = response.text().trim().to_string();
                if improved.is_empty() {
                    prompt.to_string()
                } else {
                    improved
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "prompt assist failed, keeping original prompt");
                prompt.to_string()
            }
        }
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate_image(
        &self,
        prompt: &str,
        settings: &GenerationSettings,
    ) -> Result<String, GenerationError> {
        GeminiClient::generate_image(self, prompt, settings).await
    }
}

#[async_trait]
impl PromptAssistant for GeminiClient {
    async fn improve_prompt(&self, prompt: &str) -> String {
        GeminiClient::improve_prompt(self, prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AspectRatio, ImageStyle};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // Nothing listens on port 1, so requests fail at connect time
    const UNREACHABLE: &str = "http://127.0.0.1:1";

    fn parse(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_compose_image_prompt() {
        let settings = GenerationSettings {
            style: ImageStyle::Anime,
            negative_prompt: "blurry".to_string(),
            guidance_scale: 7.5,
            seed: 99,
            ..GenerationSettings::default()
        };
        assert_eq!(
            compose_image_prompt("a red fox in snow", &settings),
            "a red fox in snow. Style: Anime. Negative prompt: blurry. Guidance scale: 7.5. Seed: 99"
        );
    }

    #[test]
    fn test_image_request_shape() {
        let settings = GenerationSettings {
            aspect_ratio: AspectRatio::Landscape,
            ..GenerationSettings::default()
        };
        let body = serde_json::to_value(image_request("fox", &settings)).unwrap();

        assert_eq!(body["generationConfig"]["imageConfig"]["aspectRatio"], "16:9");
        assert!(body["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("fox. Style: Photorealistic"));
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_assist_request_shape() {
        let body = serde_json::to_value(assist_request("cat")).unwrap();

        assert_eq!(body["contents"][0]["parts"][0]["text"], "Improve this prompt: cat");
        assert!(body["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("under 100 words"));
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn test_endpoint_for_model() {
        let client = GeminiClient::new("k").with_api_base("http://localhost:8080/v1beta/");
        assert_eq!(
            client.endpoint_for_model("gemini-2.5-flash-image"),
            "http://localhost:8080/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
        assert_eq!(
            client.endpoint_for_model("models/custom"),
            "http://localhost:8080/v1beta/models/custom:generateContent"
        );
    }

    #[test]
    fn test_extracts_first_inline_image() {
        let response = parse(serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "Here is your image" },
                        { "inlineData": { "mimeType": "image/jpeg", "data": "AAAA" } },
                        { "inlineData": { "mimeType": "image/png", "data": "BBBB" } }
                    ]
                }
            }]
        }));
        assert_eq!(
            response.image_data_uri().as_deref(),
            Some("data:image/jpeg;base64,AAAA")
        );
    }

    #[test]
    fn test_image_without_mime_type_defaults_to_png() {
        let response = parse(serde_json::json!({
            "candidates": [{ "content": { "parts": [ { "inline_data": { "data": "CCCC" } } ] } }]
        }));
        assert_eq!(
            response.image_data_uri().as_deref(),
            Some("data:image/png;base64,CCCC")
        );
    }

    #[test]
    fn test_no_image_part() {
        let text_only = parse(serde_json::json!({
            "candidates": [{ "content": { "parts": [ { "text": "I can't draw that" } ] } }]
        }));
        assert!(text_only.image_data_uri().is_none());

        let empty = parse(serde_json::json!({ "candidates": [] }));
        assert!(empty.image_data_uri().is_none());

        let blocked = parse(serde_json::json!({ "promptFeedback": { "blockReason": "SAFETY" } }));
        assert!(blocked.image_data_uri().is_none());
    }

    #[test]
    fn test_text_joins_parts() {
        let response = parse(serde_json::json!({
            "candidates": [{ "content": { "parts": [ { "text": "  A fluffy " }, { "text": "cat.  " } ] } }]
        }));
        assert_eq!(response.text().trim(), "A fluffy cat.");
    }

    #[test]
    fn test_skips_inline_parts_without_data() {
        let response = parse(serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "inlineData": { "mimeType": "image/png", "data": "" } },
                        { "inlineData": { "mimeType": "image/webp", "data": "DDDD" } }
                    ]
                }
            }]
        }));
        assert_eq!(
            response.image_data_uri().as_deref(),
            Some("data:image/webp;base64,DDDD")
        );
    }

    fn mock_client(server: &MockServer) -> GeminiClient {
        GeminiClient::new("test-key").with_api_base(&format!("{}/v1beta", server.uri()))
    }

    async fn mount_generate(server: &MockServer, model: &str, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(format!("/v1beta/models/{model}:generateContent")))
            .and(query_param("key", "test-key"))
            .respond_with(response)
            .expect(1)
            .mount(server)
            .await;
    }

    async fn sent_body(server: &MockServer) -> serde_json::Value {
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        serde_json::from_slice(&requests[0].body).unwrap()
    }

    fn text_response(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "content": { "parts": [ { "text": text } ] } }]
        }))
    }

    #[tokio::test]
    async fn test_generate_image_returns_data_uri() {
        let server = MockServer::start().await;
        let settings = GenerationSettings {
            aspect_ratio: AspectRatio::Portrait,
            seed: 42,
            ..GenerationSettings::default()
        };
        mount_generate(
            &server,
            &settings.model_id,
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "parts": [ { "inlineData": { "mimeType": "image/png", "data": "iVBOR" } } ] }
                }]
            })),
        )
        .await;

        let url = mock_client(&server)
            .generate_image("a red fox in snow", &settings)
            .await
            .unwrap();
        assert_eq!(url, "data:image/png;base64,iVBOR");

        let body = sent_body(&server).await;
        assert_eq!(body["generationConfig"]["imageConfig"]["aspectRatio"], "9:16");
        assert!(body["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .ends_with("Seed: 42"));
    }

    #[tokio::test]
    async fn test_generate_image_maps_error_status() {
        let server = MockServer::start().await;
        let settings = GenerationSettings::default();
        mount_generate(
            &server,
            &settings.model_id,
            ResponseTemplate::new(429).set_body_string("quota"),
        )
        .await;

        let err = mock_client(&server)
            .generate_image("a red fox in snow", &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Api { status: 429, .. }));
        assert_eq!(err.to_string(), "Gemini API error 429: quota");
    }

    #[tokio::test]
    async fn test_generate_image_without_image_part() {
        let server = MockServer::start().await;
        let settings = GenerationSettings::default();
        mount_generate(&server, &settings.model_id, text_response("I can't draw that")).await;

        let err = mock_client(&server)
            .generate_image("a red fox in snow", &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::NoImageData));
        assert_eq!(err.to_string(), "No image data returned from Gemini");
    }

    #[tokio::test]
    async fn test_improve_prompt_returns_trimmed_text() {
        let server = MockServer::start().await;
        mount_generate(
            &server,
            DEFAULT_TEXT_MODEL,
            text_response("  A fluffy ginger cat asleep in warm window light.\n"),
        )
        .await;

        let improved = mock_client(&server).improve_prompt("cat").await;
        assert_eq!(improved, "A fluffy ginger cat asleep in warm window light.");

        let body = sent_body(&server).await;
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Improve this prompt: cat");
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            PROMPT_ENGINEER_INSTRUCTION
        );
        assert!(body.get("generationConfig").is_none());
    }

    #[tokio::test]
    async fn test_improve_prompt_keeps_original_on_blank_text() {
        let server = MockServer::start().await;
        mount_generate(&server, DEFAULT_TEXT_MODEL, text_response("   \n ")).await;

        assert_eq!(mock_client(&server).improve_prompt("cat").await, "cat");
    }

    #[tokio::test]
    async fn test_improve_prompt_keeps_original_on_error_status() {
        let server = MockServer::start().await;
        mount_generate(
            &server,
            DEFAULT_TEXT_MODEL,
            ResponseTemplate::new(500).set_body_string("internal"),
        )
        .await;

        assert_eq!(mock_client(&server).improve_prompt("cat").await, "cat");
    }

    #[tokio::test]
    async fn test_improve_prompt_returns_original_on_failure() {
        let client = GeminiClient::new("test-key").with_api_base(UNREACHABLE);
        assert_eq!(client.improve_prompt("cat").await, "cat");
    }

    #[tokio::test]
    async fn test_generate_image_propagates_transport_error() {
        let client = GeminiClient::new("test-key").with_api_base(UNREACHABLE);
        let result = client
            .generate_image("a red fox in snow", &GenerationSettings::default())
            .await;
        assert!(matches!(result, Err(GenerationError::Http(_))));
    }
}
