//! Google Gemini `generateContent` provider.
//!
//! The API key is sent in the `x-goog-api-key` header rather than the query
//! string so it never appears in request URLs or reqwest error messages.

use crate::error::ProviderError;
use crate::llm::{Provider, api_error, build_provider_client_with_timeout, sanitize_api_error};
use crate::media::EncodedImagePart;
use reqwest::Client;
use std::future::Future;
use std::pin::Pin;

mod types;
use types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, InlineData, Part,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiProvider {
    api_key: Option<String>,
    base_url: String,
    temperature: f64,
    max_output_tokens: u32,
    client: Client,
}

impl GeminiProvider {
    pub fn new(
        api_key: Option<&str>,
        base_url: Option<&str>,
        temperature: f64,
        max_output_tokens: u32,
        timeout_secs: u64,
    ) -> Self {
        Self {
            api_key: api_key.map(str::to_string).filter(|k| !k.trim().is_empty()),
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            temperature,
            max_output_tokens,
            client: build_provider_client_with_timeout(timeout_secs),
        }
    }

    fn model_path(model: &str) -> String {
        if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        }
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredential { provider: "Gemini" })
    }

    fn build_request<'a>(
        &self,
        prompt: &'a str,
        image: &'a EncodedImagePart,
    ) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text { text: prompt },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: &image.mime_type,
                            data: &image.data,
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }

    fn extract_text(result: GenerateContentResponse) -> anyhow::Result<String> {
        if let Some(err) = result.error {
            anyhow::bail!("Gemini API error: {}", sanitize_api_error(&err.message));
        }

        if let Some(reason) = result.prompt_feedback.and_then(|f| f.block_reason) {
            anyhow::bail!("Gemini blocked the request: {reason}");
        }

        let Some(candidate) = result.candidates.into_iter().next() else {
            anyhow::bail!("No response from Gemini");
        };

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = candidate.finish_reason.as_deref().unwrap_or("unknown");
            anyhow::bail!("Gemini returned no text (finish reason: {reason})");
        }

        Ok(text)
    }

    async fn call_api(
        &self,
        prompt: &str,
        image: &EncodedImagePart,
        model: &str,
    ) -> anyhow::Result<String> {
        let api_key = self.api_key()?;
        let url = format!(
            "{}/v1beta/{}:generateContent",
            self.base_url,
            Self::model_path(model)
        );
        let request = self.build_request(prompt, image);

        tracing::debug!(
            model,
            mime_type = image.mime_type.as_str(),
            image_base64_len = image.data.len(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error("Gemini", response).await);
        }

        let result: GenerateContentResponse = response.json().await?;
        if let Some(version) = result.model_version.as_deref() {
            tracing::debug!(model_version = version, "Gemini response received");
        }
        Self::extract_text(result)
    }
}

impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        image: &'a EncodedImagePart,
        model: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(async move { self.call_api(prompt, image, model).await })
    }

    fn warmup(&self) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move {
            // Any response, even 404, means the TLS connection is pooled.
            self.client.get(&self.base_url).send().await?;
            Ok(())
        })
    }
}
