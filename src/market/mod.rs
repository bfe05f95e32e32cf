//! Market data layer: the provider trait, its wire types, and the throttled
//! wrapper that interposes the market-data retry policy.

mod throttled;
pub mod yahoo;

pub use throttled::Throttled;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AdvisorError;

/// Time span of a price-history request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryRange {
    /// One month of daily candles
    OneMonth,
    /// Six months of daily candles; the span investment reports are built on
    #[default]
    SixMonths,
    /// One year of daily candles
    OneYear,
}

impl HistoryRange {
    /// Range token as the data provider expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryRange::OneMonth => "1mo",
            HistoryRange::SixMonths => "6mo",
            HistoryRange::OneYear => "1y",
        }
    }
}

/// One daily closing price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Trading day
    pub date: NaiveDate,
    /// Closing price in the listing currency
    pub close: f64,
}

/// Closing-price series for one symbol. This is also the chart feed handed
/// back to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    /// Ticker symbol the series belongs to
    pub symbol: String,
    /// Daily points in ascending date order
    pub points: Vec<PricePoint>,
}

impl PriceHistory {
    /// True when the series carries no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sum of day-over-day percentage changes across the series.
    pub fn summed_percent_change(&self) -> f64 {
        self.points
            .windows(2)
            .filter(|w| w[0].close != 0.0)
            .map(|w| (w[1].close - w[0].close) / w[0].close)
            .sum()
    }
}

/// Company metadata folded into the research prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    /// Long company name
    pub name: String,
    /// Business sector
    pub sector: String,
    /// Market capitalization, already formatted for display
    pub market_cap: String,
    /// Business summary
    pub summary: String,
}

impl CompanyProfile {
    /// Placeholder used when the profile fetch fails, so the analysis prompt
    /// can still be built.
    pub fn placeholder(symbol: &str) -> Self {
        Self {
            name: symbol.to_string(),
            sector: "Unknown Sector".to_string(),
            market_cap: "N/A".to_string(),
            summary: "No description available".to_string(),
        }
    }
}

/// A single news item attached to a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsHeadline {
    /// Headline text
    pub title: String,
    /// Publishing outlet, when reported
    pub publisher: Option<String>,
    /// Link to the article, when reported
    pub link: Option<String>,
}

/// Trait for services that supply price history, company metadata and news.
#[async_trait]
pub trait MarketDataProvider: Sync + Send {
    /// Fetches the closing-price series for one symbol.
    ///
    /// An answer without any candles is reported as
    /// [`AdvisorError::EmptyResponse`] so the retry layer counts it as a
    /// failed attempt.
    async fn price_history(
        &self,
        symbol: &str,
        range: HistoryRange,
    ) -> Result<PriceHistory, AdvisorError>;

    /// Fetches name, sector, market cap and business summary for one symbol.
    async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile, AdvisorError>;

    /// Fetches recent news headlines for one symbol.
    async fn company_news(&self, symbol: &str) -> Result<Vec<NewsHeadline>, AdvisorError>;
}

/// Normalizes a comma-separated symbol list: trims whitespace, uppercases,
/// drops empty entries.
pub fn parse_symbols(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(closes: &[f64]) -> PriceHistory {
        PriceHistory {
            symbol: "TEST".to_string(),
            points: closes
                .iter()
                .enumerate()
                .map(|(i, c)| PricePoint {
                    date: NaiveDate::from_ymd_opt(2025, 1, 1)
                        .unwrap()
                        .checked_add_days(chrono::Days::new(i as u64))
                        .unwrap(),
                    close: *c,
                })
                .collect(),
        }
    }

    #[test]
    fn parse_symbols_trims_uppercases_and_drops_empties() {
        assert_eq!(
            parse_symbols(" aapl, TSLA ,, goog ,  "),
            vec!["AAPL", "TSLA", "GOOG"]
        );
        assert!(parse_symbols("  , ,").is_empty());
        assert!(parse_symbols("").is_empty());
    }

    #[test]
    fn summed_percent_change_adds_daily_returns() {
        let h = history(&[100.0, 110.0, 99.0]);
        // +10% then -10%
        assert!((h.summed_percent_change() - (0.10 - 0.10)).abs() < 1e-12);

        let up = history(&[50.0, 75.0]);
        assert!((up.summed_percent_change() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn summed_percent_change_on_short_series_is_zero() {
        assert_eq!(history(&[]).summed_percent_change(), 0.0);
        assert_eq!(history(&[42.0]).summed_percent_change(), 0.0);
    }

    #[test]
    fn placeholder_profile_matches_defaults() {
        let p = CompanyProfile::placeholder("AAPL");
        assert_eq!(p.name, "AAPL");
        assert_eq!(p.sector, "Unknown Sector");
        assert_eq!(p.market_cap, "N/A");
        assert_eq!(p.summary, "No description available");
    }
}
