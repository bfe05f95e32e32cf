//! Advisor builds LLM-backed health and investment reports that survive
//! flaky upstream services.
//!
//! # Overview
//! Two report pipelines (a diet/fitness plan and a stock investment report)
//! collect user input, feed templated prompts through Gemini-backed agents,
//! and aggregate market data from Yahoo Finance. Every outbound call runs
//! under a resilience layer: randomized pre-call pacing, bounded retries
//! with backoff, and a guaranteed fallback value on exhaustion, so a
//! transient upstream hiccup degrades one section of a report instead of
//! failing the interaction.
//!
//! # Architecture
//! The crate is organized into modules that handle different aspects of
//! report generation:
//!
//! - [`resilient`] — pacing, retry and backoff policies around any call
//! - [`chat`] / [`backends`] / [`builder`] — the model-calling path
//! - [`agent`] — role + instructions + provider, run under a retry policy
//! - [`pipeline`] — sequential named steps with per-step fallbacks
//! - [`market`] — price history, company profiles and news
//! - [`reports`] — the two report pipelines

// Re-export for convenience
pub use async_trait::async_trait;

/// Backend implementations for supported chat-model providers
pub mod backends;

/// Builder pattern for configuring and instantiating chat-model providers
pub mod builder;

/// Chat messages and the provider trait
pub mod chat;

/// Error types and handling
pub mod error;

/// Pacing, retry and backoff policies for outbound calls
pub mod resilient;

/// Agents: role descriptions plus a provider, run under a retry policy
pub mod agent;

/// Sequential agent pipelines with per-step fallbacks
pub mod pipeline;

/// Market data providers and wire types
pub mod market;

/// Health-plan and investment-report generators
pub mod reports;

/// Secret store for API keys and other sensitive information
pub mod secret_store;

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
/// This is a no-op if the feature is not enabled.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::try_init();
    }
}
