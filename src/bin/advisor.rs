use advisor::builder::{LLMBackend, LLMBuilder};
use advisor::market::{parse_symbols, yahoo::YahooFinance, Throttled};
use advisor::pipeline::StepStatus;
use advisor::reports::health::{HealthPlanner, HealthProfile};
use advisor::reports::invest::InvestmentStrategist;
use advisor::secret_store::SecretStore;
use clap::{Parser, Subcommand};
use colored::*;
use spinners::{Spinner, Spinners};

/// Command line interface for generating health plans and investment reports
#[derive(Parser)]
#[clap(name = "advisor", about = "LLM-backed health and investment reports")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a personalized health and fitness plan
    Health {
        /// Your name, used to address you in the plan
        #[arg(long)]
        name: String,

        /// Age in years (10-100)
        #[arg(long)]
        age: u32,

        /// Weight in kilograms (30-200)
        #[arg(long)]
        weight: u32,

        /// Height in centimeters (100-250)
        #[arg(long)]
        height: u32,

        /// Activity level: low, moderate or high
        #[arg(long, default_value = "moderate")]
        activity: String,

        /// Dietary preference: keto, vegetarian, low-carb or balanced
        #[arg(long, default_value = "balanced")]
        diet: String,

        /// Fitness goal: weight-loss, muscle-gain, endurance or flexibility
        #[arg(long, default_value = "endurance")]
        goal: String,

        /// Google API key (falls back to the secret store, then GOOGLE_API_KEY)
        #[arg(long)]
        api_key: Option<String>,

        /// Model name to use
        #[arg(long)]
        model: Option<String>,
    },

    /// Generate a stock investment report
    Invest {
        /// Comma-separated stock symbols, e.g. "AAPL, TSLA, GOOG"
        #[arg(long)]
        symbols: String,

        /// Google API key (falls back to the secret store, then GOOGLE_API_KEY)
        #[arg(long)]
        api_key: Option<String>,

        /// Model name to use
        #[arg(long)]
        model: Option<String>,
    },

    /// Store a secret, e.g. advisor set GOOGLE_API_KEY <value>
    Set { key: String, value: String },

    /// Print a stored secret
    Get { key: String },

    /// Delete a stored secret
    Delete { key: String },
}

/// Resolves the Google API key: explicit flag, then the secret store, then
/// the GOOGLE_API_KEY environment variable. The key is only ever passed
/// forward as a parameter; the environment is read, never written.
fn resolve_api_key(flag: Option<String>) -> Option<String> {
    flag.or_else(|| {
        SecretStore::new()
            .ok()
            .and_then(|store| store.get("GOOGLE_API_KEY").cloned())
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
    })
}

fn build_llm(api_key: Option<String>, model: Option<String>) -> Result<LLMBuilder, String> {
    let api_key = resolve_api_key(api_key).ok_or(
        "No Google API key found. Pass --api-key, run 'advisor set GOOGLE_API_KEY <value>', \
         or export GOOGLE_API_KEY.",
    )?;
    let mut llm = LLMBuilder::new()
        .backend(LLMBackend::Google)
        .api_key(api_key);
    if let Some(model) = model {
        llm = llm.model(model);
    }
    Ok(llm)
}

fn print_step_summary(steps: &[advisor::pipeline::StepRecord]) {
    for record in steps {
        match &record.status {
            StepStatus::Completed => {
                println!("{} {}", "✓".bright_green(), record.id);
            }
            StepStatus::Degraded(reason) => {
                println!(
                    "{} {} {}",
                    "!".bright_yellow(),
                    record.id,
                    format!("({})", reason).bright_black()
                );
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    advisor::init_logging();
    let args = CliArgs::parse();

    match args.command {
        Command::Set { key, value } => {
            let mut store = SecretStore::new()?;
            store.set(&key, &value)?;
            println!("{} Secret '{}' has been set.", "✓".bright_green(), key);
        }
        Command::Get { key } => {
            let store = SecretStore::new()?;
            match store.get(&key) {
                Some(value) => println!("{}: {}", key, value),
                None => println!("{} Secret '{}' not found", "!".bright_yellow(), key),
            }
        }
        Command::Delete { key } => {
            let mut store = SecretStore::new()?;
            store.delete(&key)?;
            println!("{} Secret '{}' has been deleted.", "✓".bright_green(), key);
        }
        Command::Health {
            name,
            age,
            weight,
            height,
            activity,
            diet,
            goal,
            api_key,
            model,
        } => {
            let profile = HealthProfile {
                name,
                age,
                weight_kg: weight,
                height_cm: height,
                activity_level: activity.parse()?,
                dietary_preference: diet.parse()?,
                fitness_goal: goal.parse()?,
            };
            let planner = HealthPlanner::new(build_llm(api_key, model)?)?;

            let mut sp = Spinner::new(
                Spinners::Dots12,
                "Designing your health blueprint...".bright_magenta().to_string(),
            );
            let plan = planner.full_plan(&profile).await;
            sp.stop();
            print!("\r\x1B[K");

            let plan = plan?;
            println!("{}", "Your Personalized Health & Fitness Plan".bright_cyan());
            println!("{}", "─".repeat(50).bright_black());
            println!("{}", plan.markdown);
            println!("{}", "─".repeat(50).bright_black());
            print_step_summary(&plan.steps);
        }
        Command::Invest {
            symbols,
            api_key,
            model,
        } => {
            let symbols = parse_symbols(&symbols);
            let data = Box::new(Throttled::new(YahooFinance::new()));
            let strategist = InvestmentStrategist::new(build_llm(api_key, model)?, data)?;

            let mut sp = Spinner::new(
                Spinners::Dots12,
                "Generating investment report...".bright_magenta().to_string(),
            );
            let report = strategist.full_report(&symbols).await;
            sp.stop();
            print!("\r\x1B[K");

            let report = report?;
            println!("{}", "Investment Report".bright_cyan());
            println!("{}", "─".repeat(50).bright_black());
            println!("{}", report.markdown);
            println!("{}", "─".repeat(50).bright_black());

            println!("{}", "6-Month Performance".bright_cyan());
            for history in &report.histories {
                if let Some(change) = report.performance.get(&history.symbol) {
                    println!(
                        "  {:<8} {:>8.2}%  ({} sessions)",
                        history.symbol.bright_green(),
                        change * 100.0,
                        history.points.len()
                    );
                }
            }
            println!("{}", "─".repeat(50).bright_black());
            print_step_summary(&report.steps);
        }
    }

    Ok(())
}
