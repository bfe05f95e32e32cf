//! Health-plan pipeline: meal plan, workout plan, combined strategy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentTool};
use crate::builder::LLMBuilder;
use crate::error::AdvisorError;
use crate::pipeline::{AgentPipeline, AgentRegistry, PipelineStepBuilder, StepRecord};

/// How active the user is day to day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityLevel {
    Low,
    Moderate,
    High,
}

/// Diet style the meal plan should follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DietaryPreference {
    Keto,
    Vegetarian,
    LowCarb,
    Balanced,
}

/// What the workout plan should optimize for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitnessGoal {
    WeightLoss,
    MuscleGain,
    Endurance,
    Flexibility,
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityLevel::Low => write!(f, "Low"),
            ActivityLevel::Moderate => write!(f, "Moderate"),
            ActivityLevel::High => write!(f, "High"),
        }
    }
}

impl fmt::Display for DietaryPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DietaryPreference::Keto => write!(f, "Keto"),
            DietaryPreference::Vegetarian => write!(f, "Vegetarian"),
            DietaryPreference::LowCarb => write!(f, "Low Carb"),
            DietaryPreference::Balanced => write!(f, "Balanced"),
        }
    }
}

impl fmt::Display for FitnessGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitnessGoal::WeightLoss => write!(f, "Weight Loss"),
            FitnessGoal::MuscleGain => write!(f, "Muscle Gain"),
            FitnessGoal::Endurance => write!(f, "Endurance"),
            FitnessGoal::Flexibility => write!(f, "Flexibility"),
        }
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .to_lowercase()
}

impl FromStr for ActivityLevel {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "low" => Ok(ActivityLevel::Low),
            "moderate" => Ok(ActivityLevel::Moderate),
            "high" => Ok(ActivityLevel::High),
            _ => Err(AdvisorError::InvalidRequest(format!(
                "Unknown activity level: {}",
                s
            ))),
        }
    }
}

impl FromStr for DietaryPreference {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "keto" => Ok(DietaryPreference::Keto),
            "vegetarian" => Ok(DietaryPreference::Vegetarian),
            "lowcarb" => Ok(DietaryPreference::LowCarb),
            "balanced" => Ok(DietaryPreference::Balanced),
            _ => Err(AdvisorError::InvalidRequest(format!(
                "Unknown dietary preference: {}",
                s
            ))),
        }
    }
}

impl FromStr for FitnessGoal {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "weightloss" => Ok(FitnessGoal::WeightLoss),
            "musclegain" => Ok(FitnessGoal::MuscleGain),
            "endurance" => Ok(FitnessGoal::Endurance),
            "flexibility" => Ok(FitnessGoal::Flexibility),
            _ => Err(AdvisorError::InvalidRequest(format!(
                "Unknown fitness goal: {}",
                s
            ))),
        }
    }
}

/// Everything the form collects about the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthProfile {
    pub name: String,
    pub age: u32,
    pub weight_kg: u32,
    pub height_cm: u32,
    pub activity_level: ActivityLevel,
    pub dietary_preference: DietaryPreference,
    pub fitness_goal: FitnessGoal,
}

impl HealthProfile {
    /// Checks the numeric fields against the form's bounds: age 10-100,
    /// weight 30-200 kg, height 100-250 cm.
    pub fn validate(&self) -> Result<(), AdvisorError> {
        if !(10..=100).contains(&self.age) {
            return Err(AdvisorError::InvalidRequest(format!(
                "age must be between 10 and 100, got {}",
                self.age
            )));
        }
        if !(30..=200).contains(&self.weight_kg) {
            return Err(AdvisorError::InvalidRequest(format!(
                "weight must be between 30 and 200 kg, got {}",
                self.weight_kg
            )));
        }
        if !(100..=250).contains(&self.height_cm) {
            return Err(AdvisorError::InvalidRequest(format!(
                "height must be between 100 and 250 cm, got {}",
                self.height_cm
            )));
        }
        Ok(())
    }
}

/// A finished health plan: the combined markdown plus per-step records.
#[derive(Debug, Clone)]
pub struct HealthPlan {
    /// Combined strategy rendered by the team lead
    pub markdown: String,
    /// Outcome of each pipeline step, in execution order
    pub steps: Vec<StepRecord>,
}

/// Runs the meal-plan, workout-plan and combined-strategy steps.
pub struct HealthPlanner {
    agents: AgentRegistry,
}

fn dietary_planner(llm: &LLMBuilder) -> Result<Agent, AdvisorError> {
    Agent::builder("Creates personalized dietary plans based on user input.")
        .instructions([
            "Generate a diet plan with breakfast, lunch, dinner, and snacks.",
            "Consider dietary preferences like Keto, Vegetarian, or Low Carb.",
            "Ensure proper hydration and electrolyte balance.",
            "Provide nutritional breakdown including macronutrients and vitamins.",
            "Suggest meal preparation tips for easy implementation.",
        ])
        .tool(AgentTool::WebSearch)
        .markdown(true)
        .llm(llm.clone())
        .build()
}

fn fitness_trainer(llm: &LLMBuilder) -> Result<Agent, AdvisorError> {
    Agent::builder("Generates customized workout routines based on fitness goals.")
        .instructions([
            "Create a workout plan including warm-ups, main exercises, and cool-downs.",
            "Adjust workouts based on fitness level: Beginner, Intermediate, Advanced.",
            "Consider weight loss, muscle gain, endurance, or flexibility goals.",
            "Provide safety tips and injury prevention advice.",
            "Suggest progress tracking methods for motivation.",
        ])
        .tool(AgentTool::WebSearch)
        .markdown(true)
        .llm(llm.clone())
        .build()
}

fn team_lead(llm: &LLMBuilder) -> Result<Agent, AdvisorError> {
    Agent::builder("Combines diet and workout plans into a holistic health strategy.")
        .instructions([
            "Merge personalized diet and fitness plans for a comprehensive approach, use tables if possible.",
            "Ensure alignment between diet and exercise for optimal results.",
            "Suggest lifestyle tips for motivation and consistency.",
            "Provide guidance on tracking progress and adjusting plans over time.",
        ])
        .markdown(true)
        .llm(llm.clone())
        .build()
}

impl HealthPlanner {
    /// Builds the standard three agents from one configured model.
    pub fn new(llm: LLMBuilder) -> Result<Self, AdvisorError> {
        let mut agents = AgentRegistry::new();
        agents.insert("dietary_planner", dietary_planner(&llm)?);
        agents.insert("fitness_trainer", fitness_trainer(&llm)?);
        agents.insert("team_lead", team_lead(&llm)?);
        Ok(Self { agents })
    }

    /// Builds a planner from preconstructed agents. Tests use this to inject
    /// stub providers.
    pub fn with_agents(dietary_planner: Agent, fitness_trainer: Agent, team_lead: Agent) -> Self {
        let mut agents = AgentRegistry::new();
        agents.insert("dietary_planner", dietary_planner);
        agents.insert("fitness_trainer", fitness_trainer);
        agents.insert("team_lead", team_lead);
        Self { agents }
    }

    /// Generates the full plan: meal plan, workout plan, then the combined
    /// strategy that greets the user and integrates both.
    ///
    /// # Errors
    ///
    /// Only profile validation fails this method; upstream call failures
    /// degrade the affected step and are reported in
    /// [`HealthPlan::steps`].
    pub async fn full_plan(&self, profile: &HealthProfile) -> Result<HealthPlan, AdvisorError> {
        profile.validate()?;

        let meal_prompt = format!(
            "Create a personalized meal plan for a {}-year-old person, weighing {}kg, \
             {}cm tall, with an activity level of '{}', following a '{}' diet, \
             aiming to achieve '{}'.",
            profile.age,
            profile.weight_kg,
            profile.height_cm,
            profile.activity_level,
            profile.dietary_preference,
            profile.fitness_goal
        );

        let workout_prompt = format!(
            "Generate a workout plan for a {}-year-old person, weighing {}kg, \
             {}cm tall, with an activity level of '{}', aiming to achieve '{}'. \
             Include warm-ups, exercises, and cool-downs.",
            profile.age,
            profile.weight_kg,
            profile.height_cm,
            profile.activity_level,
            profile.fitness_goal
        );

        let summary_prompt = format!(
            "Greet the customer, {}\n\n\
             User Information: {} years old, {}kg, {}cm, activity level: {}.\n\n\
             Fitness Goal: {}\n\n\
             Meal Plan:\n{{{{meal_plan}}}}\n\n\
             Workout Plan:\n{{{{workout_plan}}}}\n\n\
             Provide a holistic health strategy integrating both plans.",
            profile.name,
            profile.age,
            profile.weight_kg,
            profile.height_cm,
            profile.activity_level,
            profile.fitness_goal
        );

        let run = AgentPipeline::new(&self.agents)
            .step(
                PipelineStepBuilder::new("meal_plan", "dietary_planner", meal_prompt)
                    .fallback("Meal plan unavailable")
                    .build(),
            )
            .step(
                PipelineStepBuilder::new("workout_plan", "fitness_trainer", workout_prompt)
                    .fallback("Workout plan unavailable")
                    .build(),
            )
            .step(
                PipelineStepBuilder::new("summary", "team_lead", summary_prompt)
                    .fallback("Health plan generation failed")
                    .build(),
            )
            .run()
            .await?;

        Ok(HealthPlan {
            markdown: run.output("summary").unwrap_or_default().to_string(),
            steps: run.records,
        })
    }
}
