//! Report generators: the health-plan and investment-report pipelines.
//!
//! Both are explicit sequences of named agent steps. Every step carries its
//! own fallback, so a transient upstream failure degrades one section of the
//! report instead of aborting the whole run.

pub mod health;
pub mod invest;
