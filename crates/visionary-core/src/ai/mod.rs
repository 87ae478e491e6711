pub mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;

use crate::model::GenerationSettings;

/// Errors produced while generating an image
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Transport failure, passed through as reported by the HTTP client
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("Gemini API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("No image data returned from Gemini")]
    NoImageData,

    #[error("Gemini API key not configured (set GEMINI_API_KEY)")]
    MissingApiKey,
}

/// Turns a prompt and settings into an image payload (a `data:` URI)
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(
        &self,
        prompt: &str,
        settings: &GenerationSettings,
    ) -> Result<String, GenerationError>;
}

/// Rewrites a short prompt into a more descriptive one.
///
/// Best effort: implementations return the input unchanged on any failure.
#[async_trait]
pub trait PromptAssistant: Send + Sync {
    async fn improve_prompt(&self, prompt: &str) -> String;
}
