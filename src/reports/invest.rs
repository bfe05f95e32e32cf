//! Investment-report pipeline: performance aggregation, market analysis,
//! per-symbol company analysis, recommendations, final report.

use std::collections::HashMap;
use std::time::Duration;

use crate::agent::Agent;
use crate::builder::LLMBuilder;
use crate::error::AdvisorError;
use crate::market::{HistoryRange, MarketDataProvider, PriceHistory};
use crate::pipeline::{AgentPipeline, AgentRegistry, PipelineStepBuilder, StepRecord};
use crate::resilient::PacingWindow;

/// Placeholder substituted for the market analysis when no symbol yielded a
/// usable price history. No model call is made in that case.
pub const NO_DATA_PLACEHOLDER: &str = "No valid stock data found.";

/// A finished investment report.
#[derive(Debug, Clone)]
pub struct InvestmentReport {
    /// Final ranked report rendered by the team lead
    pub markdown: String,
    /// Summed six-month percentage change per symbol; symbols whose history
    /// fetch failed or came back empty are absent
    pub performance: HashMap<String, f64>,
    /// The fetched closing-price series, the chart feed for the caller
    pub histories: Vec<PriceHistory>,
    /// Outcome of each pipeline step, in execution order
    pub steps: Vec<StepRecord>,
}

/// Runs the market-analysis, company-analysis, recommendation and final
/// report steps over a market data provider.
pub struct InvestmentStrategist {
    agents: AgentRegistry,
    data: Box<dyn MarketDataProvider>,
    symbol_pause: PacingWindow,
}

fn market_analyst(llm: &LLMBuilder) -> Result<Agent, AdvisorError> {
    Agent::builder("Analyzes and compares stock performance over time.")
        .instructions([
            "Retrieve and compare stock performance from Yahoo Finance.",
            "Calculate percentage change over a 6-month period.",
            "Rank stocks based on their relative performance.",
        ])
        .markdown(true)
        .llm(llm.clone())
        .build()
}

fn company_researcher(llm: &LLMBuilder) -> Result<Agent, AdvisorError> {
    Agent::builder("Fetches company profiles, financials, and latest news.")
        .instructions([
            "Retrieve company information from Yahoo Finance.",
            "Summarize latest company news relevant to investors.",
            "Provide sector, market cap, and business overview.",
        ])
        .markdown(true)
        .llm(llm.clone())
        .build()
}

fn stock_strategist(llm: &LLMBuilder) -> Result<Agent, AdvisorError> {
    Agent::builder("Provides investment insights and recommends top stocks.")
        .instructions([
            "Analyze stock performance trends and company fundamentals.",
            "Evaluate risk-reward potential and industry trends.",
            "Provide top stock recommendations for investors.",
        ])
        .markdown(true)
        .llm(llm.clone())
        .build()
}

fn team_lead(llm: &LLMBuilder) -> Result<Agent, AdvisorError> {
    Agent::builder("Aggregates stock analysis, company research, and investment strategy.")
        .instructions([
            "Compile stock performance, company analysis, and recommendations.",
            "Ensure all insights are structured in an investor-friendly report.",
            "Rank the top stocks based on combined analysis.",
        ])
        .markdown(true)
        .llm(llm.clone())
        .build()
}

impl InvestmentStrategist {
    /// Builds the standard four agents from one configured model.
    pub fn new(
        llm: LLMBuilder,
        data: Box<dyn MarketDataProvider>,
    ) -> Result<Self, AdvisorError> {
        let mut agents = AgentRegistry::new();
        agents.insert("market_analyst", market_analyst(&llm)?);
        agents.insert("company_researcher", company_researcher(&llm)?);
        agents.insert("stock_strategist", stock_strategist(&llm)?);
        agents.insert("team_lead", team_lead(&llm)?);
        Ok(Self {
            agents,
            data,
            symbol_pause: default_symbol_pause(),
        })
    }

    /// Builds a strategist from preconstructed agents. Tests use this to
    /// inject stub providers.
    pub fn with_agents(
        market_analyst: Agent,
        company_researcher: Agent,
        stock_strategist: Agent,
        team_lead: Agent,
        data: Box<dyn MarketDataProvider>,
    ) -> Self {
        let mut agents = AgentRegistry::new();
        agents.insert("market_analyst", market_analyst);
        agents.insert("company_researcher", company_researcher);
        agents.insert("stock_strategist", stock_strategist);
        agents.insert("team_lead", team_lead);
        Self {
            agents,
            data,
            symbol_pause: default_symbol_pause(),
        }
    }

    /// Overrides the randomized pause between consecutive company analyses
    /// (default 1-2 seconds).
    pub fn symbol_pause(mut self, window: PacingWindow) -> Self {
        self.symbol_pause = window;
        self
    }

    /// Fetches six-month histories and aggregates the summed percentage
    /// change per symbol. Symbols whose fetch fails or returns no candles
    /// are skipped; the successfully fetched series are returned alongside
    /// for charting.
    pub async fn compare_stocks(
        &self,
        symbols: &[String],
    ) -> (HashMap<String, f64>, Vec<PriceHistory>) {
        let mut performance = HashMap::new();
        let mut histories = Vec::new();

        for symbol in symbols {
            match self
                .data
                .price_history(symbol, HistoryRange::SixMonths)
                .await
            {
                Ok(history) if !history.is_empty() => {
                    performance.insert(symbol.clone(), history.summed_percent_change());
                    histories.push(history);
                }
                Ok(_) => {
                    log::warn!("no candles for {}, skipping", symbol);
                }
                Err(e) => {
                    log::warn!("history fetch failed for {}: {}", symbol, e);
                }
            }
        }

        (performance, histories)
    }

    /// Generates the full report for a list of symbols.
    ///
    /// # Errors
    ///
    /// Returns [`AdvisorError::InvalidRequest`] when the symbol list is empty
    /// or contains only whitespace; no outbound call is made in that case.
    /// Upstream call failures degrade the affected step and are reported in
    /// [`InvestmentReport::steps`].
    pub async fn full_report(&self, symbols: &[String]) -> Result<InvestmentReport, AdvisorError> {
        let symbols: Vec<String> = symbols
            .iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if symbols.is_empty() {
            return Err(AdvisorError::InvalidRequest(
                "no valid stock symbols provided".to_string(),
            ));
        }

        let (performance, histories) = self.compare_stocks(&symbols).await;

        let mut pipeline = AgentPipeline::new(&self.agents);

        if performance.is_empty() {
            pipeline = pipeline.seed("market_analysis", NO_DATA_PLACEHOLDER);
        } else {
            let perf_text = format_performance(&symbols, &performance);
            pipeline = pipeline.step(
                PipelineStepBuilder::new(
                    "market_analysis",
                    "market_analyst",
                    format!("Compare these stock performances: {}", perf_text),
                )
                .fallback("Market analysis unavailable")
                .build(),
            );
        }

        for symbol in &symbols {
            let prompt = self.company_prompt(symbol).await;
            pipeline = pipeline.step(
                PipelineStepBuilder::new(
                    company_step_id(symbol),
                    "company_researcher",
                    prompt,
                )
                .fallback(format!("Analysis unavailable for {}", symbol))
                .pause(self.symbol_pause)
                .build(),
            );
        }

        let company_refs = symbols
            .iter()
            .map(|s| format!("{}:\n{{{{{}}}}}", s, company_step_id(s)))
            .collect::<Vec<_>>()
            .join("\n\n");

        pipeline = pipeline.step(
            PipelineStepBuilder::new(
                "recommendations",
                "stock_strategist",
                format!(
                    "Based on the market analysis: {{{{market_analysis}}}}, \
                     and company news:\n{}\n\
                     Which stocks would you recommend for investment?",
                    company_refs
                ),
            )
            .fallback("Recommendations unavailable")
            .build(),
        );

        pipeline = pipeline.step(
            PipelineStepBuilder::new(
                "final_report",
                "team_lead",
                format!(
                    "Market Analysis:\n{{{{market_analysis}}}}\n\n\
                     Company Analyses:\n{}\n\n\
                     Stock Recommendations:\n{{{{recommendations}}}}\n\n\
                     Provide a final ranked list of stocks with detailed reasoning.",
                    company_refs
                ),
            )
            .fallback("Report generation failed")
            .build(),
        );

        let run = pipeline.run().await?;

        Ok(InvestmentReport {
            markdown: run.output("final_report").unwrap_or_default().to_string(),
            performance,
            histories,
            steps: run.records,
        })
    }

    /// Builds the company-analysis prompt for one symbol: profile (placeholder
    /// on failure) plus up to five news headlines (none on failure).
    async fn company_prompt(&self, symbol: &str) -> String {
        let profile = match self.data.company_profile(symbol).await {
            Ok(profile) => profile,
            Err(e) => {
                log::warn!("profile fetch failed for {}: {}", symbol, e);
                crate::market::CompanyProfile::placeholder(symbol)
            }
        };

        let news = match self.data.company_news(symbol).await {
            Ok(news) => news,
            Err(e) => {
                log::warn!("news fetch failed for {}: {}", symbol, e);
                Vec::new()
            }
        };
        let news_text = news
            .iter()
            .take(5)
            .map(|n| format!("- {}", n.title))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Provide an analysis for {} in the {} sector.\n\
             Market Cap: {}\n\
             Summary: {}\n\
             Latest News:\n{}",
            profile.name, profile.sector, profile.market_cap, profile.summary, news_text
        )
    }
}

fn default_symbol_pause() -> PacingWindow {
    PacingWindow::new(Duration::from_secs(1), Duration::from_secs(2))
}

fn company_step_id(symbol: &str) -> String {
    format!("company_analysis_{}", symbol)
}

/// Formats the performance map in the input symbol order, e.g.
/// `{AAPL: 0.1234, TSLA: -0.0567}`.
fn format_performance(symbols: &[String], performance: &HashMap<String, f64>) -> String {
    let entries = symbols
        .iter()
        .filter_map(|s| performance.get(s).map(|v| format!("{}: {:.4}", s, v)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{}}}", entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn performance_formatting_follows_input_order() {
        let mut performance = HashMap::new();
        performance.insert("TSLA".to_string(), -0.0567);
        performance.insert("AAPL".to_string(), 0.1234);
        let symbols = vec!["AAPL".to_string(), "TSLA".to_string(), "GOOG".to_string()];
        assert_eq!(
            format_performance(&symbols, &performance),
            "{AAPL: 0.1234, TSLA: -0.0567}"
        );
    }

    #[test]
    fn company_step_ids_embed_the_symbol() {
        assert_eq!(company_step_id("AAPL"), "company_analysis_AAPL");
    }
}
