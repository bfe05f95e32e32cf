//! Agent abstraction: a role description, an instruction list and a chat
//! provider, executed under a retry policy.
//!
//! An agent is the unit the report pipelines work with. `run` goes through
//! [`ResilientCaller`](crate::resilient::ResilientCaller) and returns a
//! `Result`; `run_or_report` is the never-throwing surface that substitutes a
//! diagnostic string when every attempt has failed, so a degraded answer can
//! still be rendered.

mod builder;

pub use builder::AgentBuilder;

use crate::chat::{ChatMessage, ChatProvider};
use crate::error::AdvisorError;
use crate::resilient::{ResilientCaller, RetryPolicy};

/// Auxiliary capability advertised to the model in the system prompt.
///
/// Tool execution itself is delegated to the hosting environment; the agent
/// only declares what the model may ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentTool {
    /// The model may request web searches for additional information
    WebSearch,
}

impl AgentTool {
    fn prompt_hint(&self) -> &'static str {
        match self {
            AgentTool::WebSearch => {
                "If necessary, search the web for additional information."
            }
        }
    }
}

/// A configured wrapper around a chat model: role description, instructions,
/// optional tools and the retry policy its calls run under.
pub struct Agent {
    pub(crate) description: String,
    pub(crate) instructions: Vec<String>,
    pub(crate) markdown: bool,
    pub(crate) tools: Vec<AgentTool>,
    pub(crate) provider: Box<dyn ChatProvider>,
    pub(crate) caller: ResilientCaller,
}

impl Agent {
    /// Starts building an agent with the given role description.
    pub fn builder(description: impl Into<String>) -> AgentBuilder {
        AgentBuilder::new(description)
    }

    /// Returns the agent's role description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the retry policy the agent's calls run under.
    pub fn policy(&self) -> &RetryPolicy {
        self.caller.policy()
    }

    /// Renders the system prompt: the role description followed by the
    /// numbered instructions, the tool hints and the markdown directive.
    pub fn system_prompt(&self) -> String {
        let mut prompt = self.description.clone();
        if !self.instructions.is_empty() {
            prompt.push_str("\n\nInstructions:\n");
            for (i, instruction) in self.instructions.iter().enumerate() {
                prompt.push_str(&format!("{}. {}\n", i + 1, instruction));
            }
        }
        for tool in &self.tools {
            prompt.push('\n');
            prompt.push_str(tool.prompt_hint());
        }
        if self.markdown {
            prompt.push_str("\nRespond in markdown.");
        }
        prompt
    }

    /// Sends the prompt to the model under the agent's retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`AdvisorError::RetryExceeded`] when the attempt budget runs
    /// out, or the original error for non-retryable failures (auth, invalid
    /// request).
    pub async fn run(&self, prompt: &str) -> Result<String, AdvisorError> {
        let messages = [
            ChatMessage::system().content(self.system_prompt()).build(),
            ChatMessage::user().content(prompt).build(),
        ];
        self.caller.call(|| self.provider.chat(&messages)).await
    }

    /// Like [`Agent::run`], but never fails: on a terminal error the
    /// human-readable diagnostic `"Model response unavailable: {error}"` is
    /// returned instead, so the caller can render a degraded result.
    pub async fn run_or_report(&self, prompt: &str) -> String {
        match self.run(prompt).await {
            Ok(text) => text,
            Err(e) => {
                log::error!("agent call failed terminally: {}", e);
                format!("Model response unavailable: {}", e)
            }
        }
    }
}
