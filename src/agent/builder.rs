//! Builder pattern for configuring and instantiating agents.

use super::{Agent, AgentTool};
use crate::builder::LLMBuilder;
use crate::chat::ChatProvider;
use crate::error::AdvisorError;
use crate::resilient::{ResilientCaller, RetryPolicy};

/// Builder for [`Agent`] instances.
///
/// The model can be supplied either as a configured [`LLMBuilder`] (the usual
/// path) or as an already-built provider via [`AgentBuilder::provider`]
/// (which is how tests inject stubs).
pub struct AgentBuilder {
    description: String,
    instructions: Vec<String>,
    markdown: bool,
    tools: Vec<AgentTool>,
    policy: RetryPolicy,
    llm: Option<LLMBuilder>,
    provider: Option<Box<dyn ChatProvider>>,
}

impl AgentBuilder {
    /// Creates a builder with the given role description.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            instructions: Vec::new(),
            markdown: false,
            tools: Vec::new(),
            policy: RetryPolicy::for_model_calls(),
            llm: None,
            provider: None,
        }
    }

    /// Appends one instruction line.
    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instructions.push(instruction.into());
        self
    }

    /// Appends several instruction lines at once.
    pub fn instructions<I, S>(mut self, instructions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instructions
            .extend(instructions.into_iter().map(Into::into));
        self
    }

    /// Enables or disables the markdown directive in the system prompt.
    pub fn markdown(mut self, markdown: bool) -> Self {
        self.markdown = markdown;
        self
    }

    /// Advertises a tool to the model.
    pub fn tool(mut self, tool: AgentTool) -> Self {
        self.tools.push(tool);
        self
    }

    /// Sets the retry policy for the agent's calls.
    pub fn policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Supplies a configured [`LLMBuilder`] the agent's provider is built from.
    pub fn llm(mut self, llm: LLMBuilder) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Supplies an already-built chat provider, bypassing the LLM builder.
    pub fn provider(mut self, provider: Box<dyn ChatProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Builds the agent.
    ///
    /// # Errors
    ///
    /// Returns an error if neither a provider nor an LLM builder was supplied,
    /// or if building the provider fails.
    pub fn build(self) -> Result<Agent, AdvisorError> {
        let provider = match (self.provider, self.llm) {
            (Some(provider), _) => provider,
            (None, Some(llm)) => llm.build()?,
            (None, None) => {
                return Err(AdvisorError::InvalidRequest(
                    "Agent requires a provider or an LLM builder".to_string(),
                ))
            }
        };
        Ok(Agent {
            description: self.description,
            instructions: self.instructions,
            markdown: self.markdown,
            tools: self.tools,
            provider,
            caller: ResilientCaller::new(self.policy),
        })
    }
}
