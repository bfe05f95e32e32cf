//! Yahoo Finance client for price history, company profiles and news.
//!
//! Talks to the public chart (`v8/finance/chart`), quote-summary
//! (`v10/finance/quoteSummary`) and search (`v1/finance/search`) endpoints.
//! A payload without candles or profile data maps to
//! [`AdvisorError::EmptyResponse`] so the throttled wrapper retries it.

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;

use super::{
    CompanyProfile, HistoryRange, MarketDataProvider, NewsHeadline, PriceHistory, PricePoint,
};
use crate::error::AdvisorError;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

// Yahoo rejects requests without a browser-looking user agent.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

/// Client for the Yahoo Finance public endpoints.
pub struct YahooFinance {
    base_url: String,
    client: Client,
}

impl Default for YahooFinance {
    fn default() -> Self {
        Self::new()
    }
}

impl YahooFinance {
    /// Creates a client against the public Yahoo Finance host.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Creates a client against an alternate host.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to build reqwest Client"),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, AdvisorError> {
        log::debug!("fetching {}", url);
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => AdvisorError::AuthError(format!("HTTP {}: {}", status, body)),
                400 | 404 => AdvisorError::InvalidRequest(format!("HTTP {}: {}", status, body)),
                _ => AdvisorError::ProviderError(format!("HTTP {}: {}", status, body)),
            });
        }
        Ok(resp.json().await?)
    }
}

#[derive(Deserialize)]
struct ChartEnvelope {
    chart: ChartPayload,
}

#[derive(Deserialize)]
struct ChartPayload {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Deserialize)]
struct QuoteSummaryEnvelope {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryPayload,
}

#[derive(Deserialize)]
struct QuoteSummaryPayload {
    #[serde(default)]
    result: Option<Vec<QuoteSummaryResult>>,
}

#[derive(Deserialize)]
struct QuoteSummaryResult {
    #[serde(rename = "assetProfile", default)]
    asset_profile: Option<AssetProfile>,
    #[serde(default)]
    price: Option<PriceBlock>,
}

#[derive(Deserialize)]
struct AssetProfile {
    #[serde(default)]
    sector: Option<String>,
    #[serde(rename = "longBusinessSummary", default)]
    long_business_summary: Option<String>,
}

#[derive(Deserialize)]
struct PriceBlock {
    #[serde(rename = "longName", default)]
    long_name: Option<String>,
    #[serde(rename = "marketCap", default)]
    market_cap: Option<FormattedValue>,
}

#[derive(Deserialize)]
struct FormattedValue {
    #[serde(default)]
    fmt: Option<String>,
}

#[derive(Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    news: Vec<SearchNewsItem>,
}

#[derive(Deserialize)]
struct SearchNewsItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    publisher: Option<String>,
    #[serde(default)]
    link: Option<String>,
}

#[async_trait]
impl MarketDataProvider for YahooFinance {
    async fn price_history(
        &self,
        symbol: &str,
        range: HistoryRange,
    ) -> Result<PriceHistory, AdvisorError> {
        let url = format!(
            "{}/v8/finance/chart/{}?range={}&interval=1d",
            self.base_url,
            symbol,
            range.as_str()
        );
        let envelope: ChartEnvelope = self.get_json(&url).await?;

        if let Some(err) = envelope.chart.error {
            return Err(AdvisorError::ProviderError(err.to_string()));
        }

        let result = envelope
            .chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or_else(|| {
                AdvisorError::EmptyResponse(format!("no chart data for {}", symbol))
            })?;

        let closes = result
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default();

        let points: Vec<PricePoint> = result
            .timestamp
            .iter()
            .zip(closes)
            .filter_map(|(ts, close)| {
                let close = close?;
                let date = DateTime::from_timestamp(*ts, 0)?.date_naive();
                Some(PricePoint { date, close })
            })
            .collect();

        if points.is_empty() {
            return Err(AdvisorError::EmptyResponse(format!(
                "empty candle set for {}",
                symbol
            )));
        }

        Ok(PriceHistory {
            symbol: symbol.to_string(),
            points,
        })
    }

    async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile, AdvisorError> {
        let url = format!(
            "{}/v10/finance/quoteSummary/{}?modules=assetProfile,price",
            self.base_url, symbol
        );
        let envelope: QuoteSummaryEnvelope = self.get_json(&url).await?;

        let result = envelope
            .quote_summary
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or_else(|| {
                AdvisorError::EmptyResponse(format!("no profile data for {}", symbol))
            })?;

        let defaults = CompanyProfile::placeholder(symbol);
        let asset = result.asset_profile;
        let price = result.price;

        Ok(CompanyProfile {
            name: price
                .as_ref()
                .and_then(|p| p.long_name.clone())
                .unwrap_or(defaults.name),
            sector: asset
                .as_ref()
                .and_then(|a| a.sector.clone())
                .unwrap_or(defaults.sector),
            market_cap: price
                .as_ref()
                .and_then(|p| p.market_cap.as_ref())
                .and_then(|m| m.fmt.clone())
                .unwrap_or(defaults.market_cap),
            summary: asset
                .as_ref()
                .and_then(|a| a.long_business_summary.clone())
                .unwrap_or(defaults.summary),
        })
    }

    async fn company_news(&self, symbol: &str) -> Result<Vec<NewsHeadline>, AdvisorError> {
        let url = format!(
            "{}/v1/finance/search?q={}&newsCount=5",
            self.base_url, symbol
        );
        let envelope: SearchEnvelope = self.get_json(&url).await?;

        Ok(envelope
            .news
            .into_iter()
            .filter(|n| !n.title.is_empty())
            .map(|n| NewsHeadline {
                title: n.title,
                publisher: n.publisher,
                link: n.link,
            })
            .collect())
    }
}
