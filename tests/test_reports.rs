use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use advisor::agent::Agent;
use advisor::async_trait;
use advisor::chat::{ChatMessage, ChatProvider};
use advisor::error::AdvisorError;
use advisor::market::{
    CompanyProfile, HistoryRange, MarketDataProvider, NewsHeadline, PriceHistory, PricePoint,
    Throttled,
};
use advisor::reports::health::{
    ActivityLevel, DietaryPreference, FitnessGoal, HealthPlanner, HealthProfile,
};
use advisor::reports::invest::{InvestmentStrategist, NO_DATA_PLACEHOLDER};
use advisor::resilient::{PacingWindow, RetryPolicy};
use chrono::NaiveDate;

/// Chat stub that echoes the user prompt back, tagged with the agent's name,
/// so prompt construction and output feed-forward are observable.
struct EchoChat {
    tag: &'static str,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ChatProvider for EchoChat {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, AdvisorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let user = messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(format!("[{}] {}", self.tag, user))
    }
}

/// Chat stub that always fails with a retryable error.
struct FailingChat {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ChatProvider for FailingChat {
    async fn chat(&self, _messages: &[ChatMessage]) -> Result<String, AdvisorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AdvisorError::ProviderError("model overloaded".to_string()))
    }
}

fn echo_agent(tag: &'static str, calls: Arc<AtomicUsize>) -> Agent {
    Agent::builder(format!("{} description", tag))
        .policy(RetryPolicy::no_delays(3))
        .provider(Box::new(EchoChat { tag, calls }))
        .build()
        .unwrap()
}

fn failing_agent(calls: Arc<AtomicUsize>) -> Agent {
    Agent::builder("always failing")
        .policy(RetryPolicy::no_delays(3))
        .provider(Box::new(FailingChat { calls }))
        .build()
        .unwrap()
}

fn fixed_history(symbol: &str, closes: &[f64]) -> PriceHistory {
    PriceHistory {
        symbol: symbol.to_string(),
        points: closes
            .iter()
            .enumerate()
            .map(|(i, c)| PricePoint {
                date: NaiveDate::from_ymd_opt(2025, 2, 3)
                    .unwrap()
                    .checked_add_days(chrono::Days::new(i as u64))
                    .unwrap(),
                close: *c,
            })
            .collect(),
    }
}

/// Market stub serving fixed 6-month series for known symbols and failing
/// for unknown ones.
struct StubMarket {
    histories: HashMap<String, PriceHistory>,
    calls: Arc<AtomicUsize>,
}

impl StubMarket {
    fn with_fixed_series(calls: Arc<AtomicUsize>) -> Self {
        let mut histories = HashMap::new();
        histories.insert(
            "AAPL".to_string(),
            fixed_history("AAPL", &[100.0, 110.0, 121.0]),
        );
        histories.insert(
            "TSLA".to_string(),
            fixed_history("TSLA", &[200.0, 180.0, 198.0]),
        );
        Self { histories, calls }
    }
}

#[async_trait]
impl MarketDataProvider for StubMarket {
    async fn price_history(
        &self,
        symbol: &str,
        range: HistoryRange,
    ) -> Result<PriceHistory, AdvisorError> {
        assert_eq!(range, HistoryRange::SixMonths);
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.histories
            .get(symbol)
            .cloned()
            .ok_or_else(|| AdvisorError::EmptyResponse(format!("no data for {}", symbol)))
    }

    async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile, AdvisorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CompanyProfile {
            name: format!("{} Inc.", symbol),
            sector: "Technology".to_string(),
            market_cap: "1.0T".to_string(),
            summary: "Makes things.".to_string(),
        })
    }

    async fn company_news(&self, symbol: &str) -> Result<Vec<NewsHeadline>, AdvisorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![NewsHeadline {
            title: format!("{} ships a new product", symbol),
            publisher: Some("Newswire".to_string()),
            link: None,
        }])
    }
}

/// Market stub whose every call fails.
struct DownMarket {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl MarketDataProvider for DownMarket {
    async fn price_history(
        &self,
        _symbol: &str,
        _range: HistoryRange,
    ) -> Result<PriceHistory, AdvisorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AdvisorError::HttpError("connection refused".to_string()))
    }

    async fn company_profile(&self, _symbol: &str) -> Result<CompanyProfile, AdvisorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AdvisorError::HttpError("connection refused".to_string()))
    }

    async fn company_news(&self, _symbol: &str) -> Result<Vec<NewsHeadline>, AdvisorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AdvisorError::HttpError("connection refused".to_string()))
    }
}

fn no_pause() -> PacingWindow {
    PacingWindow::new(Duration::ZERO, Duration::ZERO)
}

fn strategist_with(
    chat_calls: Arc<AtomicUsize>,
    data: Box<dyn MarketDataProvider>,
) -> InvestmentStrategist {
    InvestmentStrategist::with_agents(
        echo_agent("analyst", chat_calls.clone()),
        echo_agent("researcher", chat_calls.clone()),
        echo_agent("strategist", chat_calls.clone()),
        echo_agent("lead", chat_calls),
        data,
    )
    .symbol_pause(no_pause())
}

#[tokio::test]
async fn pipeline_renders_placeholders_and_records_degradation() {
    use advisor::pipeline::{AgentPipeline, AgentRegistry, PipelineStepBuilder};

    let chat_calls = Arc::new(AtomicUsize::new(0));
    let failing_calls = Arc::new(AtomicUsize::new(0));
    let mut registry = AgentRegistry::new();
    registry.insert("writer", echo_agent("writer", chat_calls.clone()));
    registry.insert("broken", failing_agent(failing_calls));

    let run = AgentPipeline::new(&registry)
        .seed("topic", "index funds")
        .step(
            PipelineStepBuilder::new("draft", "broken", "Write about {{topic}}.")
                .fallback("Draft unavailable")
                .build(),
        )
        .step(
            PipelineStepBuilder::new("polish", "writer", "Polish this draft:\n{{draft}}")
                .fallback("Polish unavailable")
                .build(),
        )
        .run()
        .await
        .unwrap();

    assert!(run.is_degraded("draft"));
    assert!(!run.is_degraded("polish"));
    assert_eq!(run.output("draft"), Some("Draft unavailable"));
    // The fallback flowed into the next step's prompt.
    assert_eq!(
        run.output("polish"),
        Some("[writer] Polish this draft:\nDraft unavailable")
    );
}

#[tokio::test]
async fn pipeline_rejects_unknown_agent_ids() {
    use advisor::pipeline::{AgentPipeline, AgentRegistry, PipelineStepBuilder};

    let registry = AgentRegistry::new();
    let err = AgentPipeline::new(&registry)
        .step(PipelineStepBuilder::new("draft", "missing", "hello").build())
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, AdvisorError::InvalidRequest(_)));
}

#[tokio::test]
async fn empty_symbol_list_is_rejected_without_outbound_calls() {
    let chat_calls = Arc::new(AtomicUsize::new(0));
    let market_calls = Arc::new(AtomicUsize::new(0));
    let strategist = strategist_with(
        chat_calls.clone(),
        Box::new(StubMarket::with_fixed_series(market_calls.clone())),
    );

    for symbols in [vec![], vec!["  ".to_string(), "\t".to_string()]] {
        let err = strategist.full_report(&symbols).await.unwrap_err();
        match err {
            AdvisorError::InvalidRequest(msg) => {
                assert!(msg.contains("no valid stock symbols"))
            }
            other => panic!("expected InvalidRequest, got {:?}", other),
        }
    }

    assert_eq!(chat_calls.load(Ordering::SeqCst), 0);
    assert_eq!(market_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn aggregation_keys_only_symbols_with_usable_histories() {
    let chat_calls = Arc::new(AtomicUsize::new(0));
    let market_calls = Arc::new(AtomicUsize::new(0));
    let strategist = strategist_with(
        chat_calls,
        Box::new(StubMarket::with_fixed_series(market_calls)),
    );

    let symbols = vec![
        "AAPL".to_string(),
        "TSLA".to_string(),
        "MSFT".to_string(), // the stub has no data for this one
    ];
    let (performance, histories) = strategist.compare_stocks(&symbols).await;

    assert_eq!(performance.len(), 2);
    // AAPL: +10% then +10%
    assert!((performance["AAPL"] - 0.20).abs() < 1e-12);
    // TSLA: -10% then +10%
    assert!((performance["TSLA"] - 0.0).abs() < 1e-12);
    assert!(!performance.contains_key("MSFT"));

    let fetched: Vec<&str> = histories.iter().map(|h| h.symbol.as_str()).collect();
    assert_eq!(fetched, vec!["AAPL", "TSLA"]);
}

#[tokio::test]
async fn full_report_feeds_outputs_forward() {
    let chat_calls = Arc::new(AtomicUsize::new(0));
    let market_calls = Arc::new(AtomicUsize::new(0));
    let strategist = strategist_with(
        chat_calls,
        Box::new(StubMarket::with_fixed_series(market_calls)),
    );

    let symbols = vec!["aapl".to_string(), " tsla ".to_string()];
    let report = strategist.full_report(&symbols).await.unwrap();

    // Symbols were normalized before use.
    assert!(report.performance.contains_key("AAPL"));
    assert!(report.performance.contains_key("TSLA"));
    assert_eq!(report.histories.len(), 2);

    // Every step completed and the final report embeds the earlier outputs.
    assert!(report
        .steps
        .iter()
        .all(|r| r.status == advisor::pipeline::StepStatus::Completed));
    assert!(report.markdown.starts_with("[lead]"));
    assert!(report.markdown.contains("[analyst]"));
    assert!(report.markdown.contains("[strategist]"));
    assert!(report.markdown.contains("AAPL Inc."));
    assert!(report.markdown.contains("AAPL ships a new product"));
}

#[tokio::test]
async fn degraded_company_step_substitutes_its_fallback_and_continues() {
    let market_calls = Arc::new(AtomicUsize::new(0));
    let failing_calls = Arc::new(AtomicUsize::new(0));
    let chat_calls = Arc::new(AtomicUsize::new(0));

    let strategist = InvestmentStrategist::with_agents(
        echo_agent("analyst", chat_calls.clone()),
        failing_agent(failing_calls.clone()),
        echo_agent("strategist", chat_calls.clone()),
        echo_agent("lead", chat_calls),
        Box::new(StubMarket::with_fixed_series(market_calls)),
    )
    .symbol_pause(no_pause());

    let symbols = vec!["AAPL".to_string()];
    let report = strategist.full_report(&symbols).await.unwrap();

    // The researcher burned its whole retry budget.
    assert_eq!(failing_calls.load(Ordering::SeqCst), 3);

    let degraded: Vec<&str> = report
        .steps
        .iter()
        .filter(|r| matches!(r.status, advisor::pipeline::StepStatus::Degraded(_)))
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(degraded, vec!["company_analysis_AAPL"]);

    // The fallback text flowed into the later steps instead of aborting.
    assert!(report.markdown.contains("Analysis unavailable for AAPL"));
}

#[tokio::test]
async fn all_histories_failing_seeds_the_no_data_placeholder() {
    let market_calls = Arc::new(AtomicUsize::new(0));
    let analyst_calls = Arc::new(AtomicUsize::new(0));
    let chat_calls = Arc::new(AtomicUsize::new(0));

    let strategist = InvestmentStrategist::with_agents(
        echo_agent("analyst", analyst_calls.clone()),
        echo_agent("researcher", chat_calls.clone()),
        echo_agent("strategist", chat_calls.clone()),
        echo_agent("lead", chat_calls),
        Box::new(DownMarket {
            calls: market_calls,
        }),
    )
    .symbol_pause(no_pause());

    let report = strategist
        .full_report(&["AAPL".to_string()])
        .await
        .unwrap();

    assert!(report.performance.is_empty());
    assert!(report.histories.is_empty());
    // The market analyst was never consulted; the placeholder went straight
    // into the downstream prompts.
    assert_eq!(analyst_calls.load(Ordering::SeqCst), 0);
    assert!(report.markdown.contains(NO_DATA_PLACEHOLDER));
}

#[tokio::test]
async fn health_plan_embeds_profile_and_prior_steps() {
    let chat_calls = Arc::new(AtomicUsize::new(0));
    let planner = HealthPlanner::with_agents(
        echo_agent("dietary", chat_calls.clone()),
        echo_agent("trainer", chat_calls.clone()),
        echo_agent("lead", chat_calls.clone()),
    );

    let profile = HealthProfile {
        name: "Ada".to_string(),
        age: 25,
        weight_kg: 70,
        height_cm: 170,
        activity_level: ActivityLevel::Moderate,
        dietary_preference: DietaryPreference::Keto,
        fitness_goal: FitnessGoal::MuscleGain,
    };

    let plan = planner.full_plan(&profile).await.unwrap();

    // Three steps, one model call each.
    assert_eq!(plan.steps.len(), 3);
    assert_eq!(chat_calls.load(Ordering::SeqCst), 3);

    assert!(plan.markdown.starts_with("[lead]"));
    assert!(plan.markdown.contains("Greet the customer, Ada"));
    assert!(plan.markdown.contains("Muscle Gain"));
    // The summary prompt embedded the earlier step outputs.
    assert!(plan.markdown.contains("[dietary]"));
    assert!(plan.markdown.contains("[trainer]"));
    assert!(plan.markdown.contains("'Keto' diet"));
}

#[tokio::test]
async fn out_of_range_profile_is_rejected_before_any_call() {
    let chat_calls = Arc::new(AtomicUsize::new(0));
    let planner = HealthPlanner::with_agents(
        echo_agent("dietary", chat_calls.clone()),
        echo_agent("trainer", chat_calls.clone()),
        echo_agent("lead", chat_calls.clone()),
    );

    let profile = HealthProfile {
        name: "Ada".to_string(),
        age: 102,
        weight_kg: 70,
        height_cm: 170,
        activity_level: ActivityLevel::Low,
        dietary_preference: DietaryPreference::Balanced,
        fitness_goal: FitnessGoal::Endurance,
    };

    let err = planner.full_plan(&profile).await.unwrap_err();
    assert!(matches!(err, AdvisorError::InvalidRequest(_)));
    assert_eq!(chat_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn throttled_wrapper_retries_transient_failures() {
    struct FlakyMarket {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl MarketDataProvider for FlakyMarket {
        async fn price_history(
            &self,
            symbol: &str,
            _range: HistoryRange,
        ) -> Result<PriceHistory, AdvisorError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(AdvisorError::ProviderError("throttled".to_string()))
            } else {
                Ok(fixed_history(symbol, &[10.0, 11.0]))
            }
        }

        async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile, AdvisorError> {
            Ok(CompanyProfile::placeholder(symbol))
        }

        async fn company_news(&self, _symbol: &str) -> Result<Vec<NewsHeadline>, AdvisorError> {
            Ok(Vec::new())
        }
    }

    let calls = Arc::new(AtomicUsize::new(0));
    let provider = Throttled::with_policy(
        FlakyMarket {
            calls: calls.clone(),
        },
        RetryPolicy::no_delays(3),
    );

    let history = provider
        .price_history("AAPL", HistoryRange::SixMonths)
        .await
        .unwrap();
    assert_eq!(history.symbol, "AAPL");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}
