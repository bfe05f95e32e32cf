//! Builder module for configuring and instantiating chat-model providers.
//!
//! Credentials and generation parameters are passed explicitly through the
//! builder rather than read from (or written to) the process environment, so
//! the scope of an API key is always visible at the construction site.

use crate::{chat::ChatProvider, error::AdvisorError};

/// Supported chat-model backend providers.
#[derive(Debug, Clone)]
pub enum LLMBackend {
    /// Google Gemini API provider
    Google,
}

impl std::str::FromStr for LLMBackend {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google" | "gemini" => Ok(LLMBackend::Google),
            _ => Err(AdvisorError::InvalidRequest(format!(
                "Unknown LLM backend: {}",
                s
            ))),
        }
    }
}

/// Builder for configuring and instantiating chat-model providers.
///
/// Provides a fluent interface for setting various configuration options
/// like model selection, API keys, generation parameters, etc.
#[derive(Clone, Debug, Default)]
pub struct LLMBuilder {
    /// Selected backend provider
    backend: Option<LLMBackend>,
    /// API key for authentication with the provider
    api_key: Option<String>,
    /// Model identifier/name to use
    model: Option<String>,
    /// Maximum tokens to generate in responses
    max_tokens: Option<u32>,
    /// Temperature parameter for controlling response randomness (0.0-1.0)
    temperature: Option<f32>,
    /// System prompt/context to guide model behavior
    system: Option<String>,
    /// Request timeout duration in seconds
    timeout_seconds: Option<u64>,
    /// Top-p (nucleus) sampling parameter
    top_p: Option<f32>,
    /// Top-k sampling parameter
    top_k: Option<u32>,
}

impl LLMBuilder {
    /// Creates a new empty builder instance with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the backend provider to use.
    pub fn backend(mut self, backend: LLMBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Sets the API key for authentication.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the model identifier to use.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the maximum number of tokens to generate.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the temperature for controlling response randomness (0.0-1.0).
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the system prompt/context.
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Sets the request timeout in seconds.
    pub fn timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = Some(timeout_seconds);
        self
    }

    /// Sets the top-p (nucleus) sampling parameter.
    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Sets the top-k sampling parameter.
    pub fn top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Builds and returns a configured chat provider instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the selected backend is not enabled or the API key
    /// is missing.
    pub fn build(self) -> Result<Box<dyn ChatProvider>, AdvisorError> {
        let backend = self.backend.unwrap_or(LLMBackend::Google);

        #[allow(unreachable_patterns)]
        match backend {
            LLMBackend::Google => {
                #[cfg(feature = "google")]
                {
                    let api_key = self.api_key.ok_or_else(|| {
                        AdvisorError::InvalidRequest(
                            "No API key provided for Google backend".to_string(),
                        )
                    })?;
                    Ok(Box::new(crate::backends::google::Google::new(
                        api_key,
                        self.model,
                        self.max_tokens,
                        self.temperature,
                        self.timeout_seconds,
                        self.system,
                        self.top_p,
                        self.top_k,
                    )) as Box<dyn ChatProvider>)
                }
                #[cfg(not(feature = "google"))]
                {
                    Err(AdvisorError::InvalidRequest(
                        "Google backend requires the \"google\" feature".to_string(),
                    ))
                }
            }
        }
    }
}
