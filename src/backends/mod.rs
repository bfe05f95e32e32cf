//! Backend implementations for supported chat-model providers.

#[cfg(feature = "google")]
pub mod google;
