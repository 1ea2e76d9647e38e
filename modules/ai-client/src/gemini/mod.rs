mod client;
pub(crate) mod types;

use anyhow::{anyhow, Result};

use client::GeminiClient;
use types::{Content, GenerateRequest};

// =============================================================================
// Gemini Agent
// =============================================================================

#[derive(Clone)]
pub struct Gemini {
    api_key: String,
    model: String,
    base_url: Option<String>,
}

impl Gemini {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
        }
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow!("GEMINI_API_KEY environment variable not set"))?;
        Ok(Self::new(api_key, model))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> GeminiClient {
        let client = GeminiClient::new(&self.api_key);
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }

    // =========================================================================
    // Convenience methods
    // =========================================================================

    /// One-shot completion with a system instruction. Returns the first
    /// candidate's text.
    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<String> {
        let request = GenerateRequest::new()
            .system(system)
            .content(Content::user(user))
            .temperature(0.0);

        let response = self.client().generate(&self.model, &request).await?;

        response
            .text()
            .ok_or_else(|| anyhow!("No response from Gemini"))
    }

    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest::new()
            .content(Content::user(prompt))
            .temperature(0.0);

        let response = self.client().generate(&self.model, &request).await?;

        response
            .text()
            .ok_or_else(|| anyhow!("No response from Gemini"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_new() {
        let ai = Gemini::new("test-key", "gemini-flash-latest");
        assert_eq!(ai.model, "gemini-flash-latest");
        assert_eq!(ai.api_key, "test-key");
    }

    #[test]
    fn test_gemini_with_base_url() {
        let ai = Gemini::new("test-key", "gemini-flash-latest")
            .with_base_url("https://custom.api.com");
        assert_eq!(ai.base_url, Some("https://custom.api.com".to_string()));
    }

    #[test]
    fn test_request_serialization() {
        let request = GenerateRequest::new()
            .system("You extract events.")
            .content(Content::user("hello"))
            .temperature(0.0);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "You extract events.");
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["generationConfig"]["temperature"], 0.0);
    }

    #[test]
    fn test_response_text() {
        let response: types::GenerateResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "{\"events\": []}"}], "role": "model"}, "finishReason": "STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("{\"events\": []}"));
    }
}
