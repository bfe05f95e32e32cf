use async_trait::async_trait;

use super::{CompanyProfile, HistoryRange, MarketDataProvider, NewsHeadline, PriceHistory};
use crate::error::AdvisorError;
use crate::resilient::{ResilientCaller, RetryPolicy};

/// Wraps any market data provider with the market-data retry policy:
/// randomized pre-call pacing and linear backoff between attempts.
///
/// The wrapped calls still return `Result`; callers decide which placeholder
/// to substitute on a terminal error (empty performance entry, placeholder
/// profile, no headlines).
pub struct Throttled<P> {
    inner: P,
    caller: ResilientCaller,
}

impl<P> Throttled<P> {
    /// Wraps `inner` with [`RetryPolicy::for_market_data`].
    pub fn new(inner: P) -> Self {
        Self::with_policy(inner, RetryPolicy::for_market_data())
    }

    /// Wraps `inner` with an explicit policy.
    pub fn with_policy(inner: P, policy: RetryPolicy) -> Self {
        Self {
            inner,
            caller: ResilientCaller::new(policy),
        }
    }

    /// Returns the wrapped provider.
    pub fn into_inner(self) -> P {
        self.inner
    }
}

#[async_trait]
impl<P: MarketDataProvider> MarketDataProvider for Throttled<P> {
    async fn price_history(
        &self,
        symbol: &str,
        range: HistoryRange,
    ) -> Result<PriceHistory, AdvisorError> {
        self.caller
            .call(|| self.inner.price_history(symbol, range))
            .await
    }

    async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile, AdvisorError> {
        self.caller
            .call(|| self.inner.company_profile(symbol))
            .await
    }

    async fn company_news(&self, symbol: &str) -> Result<Vec<NewsHeadline>, AdvisorError> {
        self.caller.call(|| self.inner.company_news(symbol)).await
    }
}
