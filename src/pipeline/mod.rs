//! Sequential pipeline of named agent steps with per-step fallbacks.
//!
//! Each step renders a prompt template against the outputs accumulated so
//! far (`{{step_id}}` placeholders), runs one agent, and records whether the
//! genuine model output or the step's fallback text was stored. A failing
//! step degrades instead of aborting, so a partial report is always produced
//! and the failure is attributable to the step that caused it.

use std::collections::HashMap;

use crate::agent::Agent;
use crate::error::AdvisorError;
use crate::resilient::PacingWindow;

/// Stores the agents a pipeline's steps refer to, identified by a key.
#[derive(Default)]
pub struct AgentRegistry {
    agents: HashMap<String, Agent>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: HashMap::new(),
        }
    }

    /// Inserts an agent under an identifier, e.g. "market_analyst"
    pub fn insert(&mut self, id: impl Into<String>, agent: Agent) {
        self.agents.insert(id.into(), agent);
    }

    /// Retrieves an agent by its identifier
    pub fn get(&self, id: &str) -> Option<&Agent> {
        self.agents.get(id)
    }
}

/// Outcome of one pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// The agent produced a genuine output
    Completed,
    /// The step's fallback was substituted; carries the failure reason
    Degraded(String),
}

/// Records which step ran and how it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    /// Step identifier
    pub id: String,
    /// Completed or degraded
    pub status: StepStatus,
}

/// Result of a full pipeline execution: every step's output (genuine or
/// fallback) plus the per-step records.
#[derive(Debug, Clone, Default)]
pub struct PipelineRun {
    /// Step outputs keyed by step id, including seeded values
    pub outputs: HashMap<String, String>,
    /// One record per executed step, in execution order
    pub records: Vec<StepRecord>,
}

impl PipelineRun {
    /// Returns the output stored under the given id, if any.
    pub fn output(&self, id: &str) -> Option<&str> {
        self.outputs.get(id).map(String::as_str)
    }

    /// True when the step ran and its fallback was substituted.
    pub fn is_degraded(&self, id: &str) -> bool {
        self.records
            .iter()
            .any(|r| r.id == id && matches!(r.status, StepStatus::Degraded(_)))
    }
}

/// A single named step: which agent to run, the prompt template, and the
/// fallback text substituted when the agent's retry budget is exhausted.
#[derive(Debug, Clone)]
pub struct PipelineStep {
    /// Unique identifier for this step; its output is stored under this key
    pub id: String,
    /// Registry key of the agent executing this step
    pub agent_id: String,
    /// Prompt template with {{step_id}} placeholders
    pub template: String,
    /// Text substituted for the output when the step fails
    pub fallback: String,
    /// Optional randomized pause before the step runs
    pub pause: Option<PacingWindow>,
}

/// Builder pattern for constructing PipelineStep instances
pub struct PipelineStepBuilder {
    id: String,
    agent_id: String,
    template: String,
    fallback: Option<String>,
    pause: Option<PacingWindow>,
}

impl PipelineStepBuilder {
    /// Creates a new PipelineStepBuilder
    ///
    /// # Arguments
    /// * `id` - Unique identifier for the step
    /// * `agent_id` - Registry key of the agent to run
    /// * `template` - Prompt template with {{step_id}} placeholders
    pub fn new(
        id: impl Into<String>,
        agent_id: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            template: template.into(),
            fallback: None,
            pause: None,
        }
    }

    /// Sets the fallback text substituted when the step fails
    pub fn fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    /// Sets a randomized pause executed before the step runs
    pub fn pause(mut self, window: PacingWindow) -> Self {
        self.pause = Some(window);
        self
    }

    /// Builds and returns a PipelineStep instance
    pub fn build(self) -> PipelineStep {
        let fallback = self
            .fallback
            .unwrap_or_else(|| format!("Step '{}' unavailable", self.id));
        PipelineStep {
            id: self.id,
            agent_id: self.agent_id,
            template: self.template,
            fallback,
            pause: self.pause,
        }
    }
}

/// Executes an ordered list of steps against registered agents.
pub struct AgentPipeline<'a> {
    registry: &'a AgentRegistry,
    steps: Vec<PipelineStep>,
    outputs: HashMap<String, String>,
}

impl<'a> AgentPipeline<'a> {
    /// Creates a new pipeline over the given registry.
    pub fn new(registry: &'a AgentRegistry) -> Self {
        Self {
            registry,
            steps: Vec::new(),
            outputs: HashMap::new(),
        }
    }

    /// Injects a precomputed output under an id, available to later
    /// templates without running an agent.
    pub fn seed(mut self, id: impl Into<String>, value: impl Into<String>) -> Self {
        self.outputs.insert(id.into(), value.into());
        self
    }

    /// Adds a step to the pipeline.
    pub fn step(mut self, step: PipelineStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Executes all steps strictly in order.
    ///
    /// A step whose agent call fails terminally stores its fallback text and
    /// is recorded as degraded; execution continues with the next step. The
    /// only error this method returns is a step referring to an agent id
    /// missing from the registry, which is a construction mistake rather
    /// than a runtime failure.
    pub async fn run(mut self) -> Result<PipelineRun, AdvisorError> {
        let mut records = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            let agent = self.registry.get(&step.agent_id).ok_or_else(|| {
                AdvisorError::InvalidRequest(format!(
                    "No agent with id '{}' found in registry",
                    step.agent_id
                ))
            })?;

            let prompt = render_template(&step.template, &self.outputs);

            if let Some(window) = &step.pause {
                window.pause().await;
            }

            match agent.run(&prompt).await {
                Ok(text) => {
                    self.outputs.insert(step.id.clone(), text);
                    records.push(StepRecord {
                        id: step.id.clone(),
                        status: StepStatus::Completed,
                    });
                }
                Err(e) => {
                    log::warn!("step '{}' degraded: {}", step.id, e);
                    self.outputs.insert(step.id.clone(), step.fallback.clone());
                    records.push(StepRecord {
                        id: step.id.clone(),
                        status: StepStatus::Degraded(e.to_string()),
                    });
                }
            }
        }

        Ok(PipelineRun {
            outputs: self.outputs,
            records,
        })
    }
}

/// Replaces `{{key}}` placeholders in the template with stored outputs.
pub(crate) fn render_template(input: &str, vars: &HashMap<String, String>) -> String {
    let mut result = input.to_string();
    for (k, v) in vars {
        let pattern = format!("{{{{{k}}}}}");
        result = result.replace(&pattern, v);
    }
    result
}
