//! Google Gemini API client implementation for chat functionality.
//!
//! This module provides integration with Google's Gemini models through the
//! Generative Language API. Authorization and invalid-request failures are
//! mapped to non-retryable errors; rate limiting and server errors are mapped
//! to retryable provider errors so the resilience layer can back off and try
//! again.
//!
//! # Example
//! ```no_run
//! use advisor::backends::google::Google;
//! use advisor::chat::{ChatMessage, ChatProvider};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = Google::new(
//!         "your-api-key",
//!         None,       // Use default model
//!         Some(1000), // Max tokens
//!         Some(0.7),  // Temperature
//!         None,       // Default timeout
//!         None,       // No system prompt
//!         None,       // Default top_p
//!         None,       // Default top_k
//!     );
//!
//!     let messages = vec![ChatMessage::user().content("Hello!").build()];
//!     let response = client.chat(&messages).await.unwrap();
//!     println!("{}", response);
//! }
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::chat::{ChatMessage, ChatProvider, ChatRole};
use crate::error::AdvisorError;

/// Default model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";

/// Client for interacting with Google's Gemini API.
///
/// This struct holds the configuration and state needed to make requests to
/// the Gemini API. It implements the [`ChatProvider`] trait.
pub struct Google {
    /// API key for authentication with Google's API
    pub api_key: String,
    /// Model identifier (e.g. "gemini-2.0-flash-exp")
    pub model: String,
    /// Maximum number of tokens to generate in responses
    pub max_tokens: Option<u32>,
    /// Sampling temperature between 0.0 and 1.0
    pub temperature: Option<f32>,
    /// Optional system prompt to set context
    pub system: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: Option<u64>,
    /// Top-p sampling parameter
    pub top_p: Option<f32>,
    /// Top-k sampling parameter
    pub top_k: Option<u32>,
    /// HTTP client for making API requests
    client: Client,
}

/// Request body for chat completions
#[derive(Serialize)]
struct GoogleChatRequest<'a> {
    /// List of conversation messages
    contents: Vec<GoogleChatContent<'a>>,
    /// Optional generation parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GoogleGenerationConfig>,
}

/// Individual message in a chat conversation
#[derive(Serialize)]
struct GoogleChatContent<'a> {
    /// Role of the message sender ("user" or "model")
    role: &'a str,
    /// Content parts of the message
    parts: Vec<GoogleContentPart<'a>>,
}

/// Text content within a chat message
#[derive(Serialize)]
struct GoogleContentPart<'a> {
    /// The actual text content
    text: &'a str,
}

/// Configuration parameters for text generation
#[derive(Serialize)]
struct GoogleGenerationConfig {
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Top-p sampling parameter
    #[serde(skip_serializing_if = "Option::is_none", rename = "topP")]
    top_p: Option<f32>,
    /// Top-k sampling parameter
    #[serde(skip_serializing_if = "Option::is_none", rename = "topK")]
    top_k: Option<u32>,
}

/// Response from the chat completion API
#[derive(Deserialize)]
struct GoogleChatResponse {
    /// Generated completion candidates
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
}

/// Individual completion candidate
#[derive(Deserialize)]
struct GoogleCandidate {
    /// Content of the candidate response
    content: GoogleResponseContent,
}

/// Content block within a response
#[derive(Deserialize)]
struct GoogleResponseContent {
    /// Parts making up the content
    #[serde(default)]
    parts: Vec<GoogleResponsePart>,
}

/// Individual part of response content
#[derive(Deserialize)]
struct GoogleResponsePart {
    /// Text content of this part
    #[serde(default)]
    text: String,
}

impl Google {
    /// Creates a new Google Gemini client with the specified configuration.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Google API key for authentication
    /// * `model` - Model identifier (defaults to "gemini-2.0-flash-exp")
    /// * `max_tokens` - Maximum tokens in response
    /// * `temperature` - Sampling temperature between 0.0 and 1.0
    /// * `timeout_seconds` - Request timeout in seconds
    /// * `system` - System prompt to set context
    /// * `top_p` - Top-p sampling parameter
    /// * `top_k` - Top-k sampling parameter
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api_key: impl Into<String>,
        model: Option<String>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
        timeout_seconds: Option<u64>,
        system: Option<String>,
        top_p: Option<f32>,
        top_k: Option<u32>,
    ) -> Self {
        let mut builder = Client::builder();
        if let Some(sec) = timeout_seconds {
            builder = builder.timeout(std::time::Duration::from_secs(sec));
        }
        Self {
            api_key: api_key.into(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens,
            temperature,
            system,
            timeout_seconds,
            top_p,
            top_k,
            client: builder.build().expect("Failed to build reqwest Client"),
        }
    }
}

fn status_to_error(status: reqwest::StatusCode, body: String) -> AdvisorError {
    match status.as_u16() {
        401 | 403 => AdvisorError::AuthError(format!("HTTP {}: {}", status, body)),
        400 | 404 => AdvisorError::InvalidRequest(format!("HTTP {}: {}", status, body)),
        _ => AdvisorError::ProviderError(format!("HTTP {}: {}", status, body)),
    }
}

#[async_trait]
impl ChatProvider for Google {
    /// Sends a chat request to Google's Gemini API.
    ///
    /// # Arguments
    ///
    /// * `messages` - Slice of chat messages representing the conversation
    ///
    /// # Returns
    ///
    /// The model's response text or an error
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, AdvisorError> {
        if self.api_key.is_empty() {
            return Err(AdvisorError::AuthError("Missing Google API key".to_string()));
        }

        // Gemini has no dedicated system role; system context goes first as
        // a user turn, matching the API's recommended shape.
        let chat_contents: Vec<GoogleChatContent> = self
            .system
            .iter()
            .map(|s| GoogleChatContent {
                role: "user",
                parts: vec![GoogleContentPart { text: s }],
            })
            .chain(messages.iter().map(|msg| GoogleChatContent {
                role: match msg.role {
                    ChatRole::User | ChatRole::System => "user",
                    ChatRole::Assistant => "model",
                },
                parts: vec![GoogleContentPart { text: &msg.content }],
            }))
            .collect();

        // Omit generation_config entirely when empty to avoid validation errors
        let generation_config = if self.max_tokens.is_none()
            && self.temperature.is_none()
            && self.top_p.is_none()
            && self.top_k.is_none()
        {
            None
        } else {
            Some(GoogleGenerationConfig {
                max_output_tokens: self.max_tokens,
                temperature: self.temperature,
                top_p: self.top_p,
                top_k: self.top_k,
            })
        };

        let req_body = GoogleChatRequest {
            contents: chat_contents,
            generation_config,
        };

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent?key={key}",
            model = self.model,
            key = self.api_key
        );

        log::debug!("sending generateContent request to model {}", self.model);

        let mut request = self.client.post(&url).json(&req_body);

        if let Some(timeout) = self.timeout_seconds {
            request = request.timeout(std::time::Duration::from_secs(timeout));
        }

        let resp = request.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, body));
        }

        let json_resp: GoogleChatResponse = resp.json().await?;
        let first_candidate = json_resp.candidates.into_iter().next().ok_or_else(|| {
            AdvisorError::ProviderError("No candidates returned by Google".to_string())
        })?;

        let response_text = first_candidate
            .content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect::<Vec<_>>()
            .join("");

        if response_text.trim().is_empty() {
            return Err(AdvisorError::EmptyResponse(
                "Candidate carried no text".to_string(),
            ));
        }

        Ok(response_text)
    }
}
