//! Language-model capabilities: caption writing and prompt moderation.
//!
//! Both capabilities speak to a Gemini-style `:generateContent` endpoint
//! through one client. Without an API key the service runs deterministic
//! stand-ins instead, so it stays usable offline.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Timeout for a single model call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const CAPTION_TEMPERATURE: f32 = 0.3;
const CAPTION_MAX_TOKENS: u32 = 50;
const MODERATION_TEMPERATURE: f32 = 0.1;
const MODERATION_MAX_TOKENS: u32 = 1;

const MODERATION_INSTRUCTION: &str = "You are a strict content moderator. Decide whether the \
    given idea contains hate speech, violence, sexual content, self-harm, medical advice, or \
    other inappropriate content. Reply with exactly 'yes' if it does, or 'no' if it is clean. \
    No prefixes, explanations, or any other text.";

fn caption_instruction(max_words: usize) -> String {
    format!(
        "You are a witty meme caption writer with a taste for modern internet humor. Given an \
         idea, reply with one short, funny, relatable caption for it. Do not repeat the idea \
         verbatim, do not exceed {max_words} words, and do not add prefixes, hashtags, quotes, \
         or explanations. Reply with the caption text only."
    )
}

/// Errors from the language-model capabilities.
#[derive(thiserror::Error, Debug)]
pub enum GenerateError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Unrecognized moderation verdict: {0:?}")]
    Verdict(String),
}

/// Moderation outcome for a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Rejected,
}

/// Writes a meme caption for a prompt.
#[async_trait]
pub trait CaptionWriter: Send + Sync {
    async fn write_caption(&self, prompt: &str) -> Result<String, GenerateError>;
}

/// Reviews a prompt before any generation work happens.
#[async_trait]
pub trait PromptModerator: Send + Sync {
    async fn review(&self, prompt: &str) -> Result<Verdict, GenerateError>;
}

/// Client for a Gemini-style `generateContent` endpoint. Implements both
/// capabilities with per-call instructions and sampling settings.
pub struct GeminiClient {
    client: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
    max_words: usize,
}

impl GeminiClient {
    pub fn new(
        api_base: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        max_words: usize,
    ) -> Result<Self, GenerateError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.into(),
            model: model.into(),
            api_key: api_key.into(),
            max_words,
        })
    }

    async fn generate(
        &self,
        instruction: &str,
        prompt: &str,
        temperature: f32,
        max_output_tokens: u32,
    ) -> Result<String, GenerateError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base, self.model, self.api_key
        );
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            system_instruction: Content {
                parts: vec![Part { text: instruction }],
            },
            generation_config: GenerationConfig {
                temperature,
                max_output_tokens,
            },
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(GenerateError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl CaptionWriter for GeminiClient {
    async fn write_caption(&self, prompt: &str) -> Result<String, GenerateError> {
        let instruction = caption_instruction(self.max_words);
        let caption = self
            .generate(&instruction, prompt, CAPTION_TEMPERATURE, CAPTION_MAX_TOKENS)
            .await?;
        tracing::debug!(caption, "caption generated");
        Ok(caption)
    }
}

#[async_trait]
impl PromptModerator for GeminiClient {
    async fn review(&self, prompt: &str) -> Result<Verdict, GenerateError> {
        let answer = self
            .generate(
                MODERATION_INSTRUCTION,
                prompt,
                MODERATION_TEMPERATURE,
                MODERATION_MAX_TOKENS,
            )
            .await?;
        // The protocol is strict: "yes" means the prompt is inappropriate.
        match answer.to_lowercase().as_str() {
            "yes" => Ok(Verdict::Rejected),
            "no" => Ok(Verdict::Allowed),
            other => Err(GenerateError::Verdict(other.to_string())),
        }
    }
}

/// Keyless caption fallback: the prompt itself, clipped to the word limit.
pub struct EchoCaptioner {
    max_words: usize,
}

impl EchoCaptioner {
    pub fn new(max_words: usize) -> Self {
        Self { max_words }
    }
}

#[async_trait]
impl CaptionWriter for EchoCaptioner {
    async fn write_caption(&self, prompt: &str) -> Result<String, GenerateError> {
        let words: Vec<&str> = prompt.split_whitespace().take(self.max_words).collect();
        Ok(words.join(" "))
    }
}

/// Keyless moderation fallback: lets every prompt through.
pub struct AllowAll;

#[async_trait]
impl PromptModerator for AllowAll {
    async fn review(&self, _prompt: &str) -> Result<Verdict, GenerateError> {
        Ok(Verdict::Allowed)
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "systemInstruction")]
    system_instruction: Content<'a>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}
