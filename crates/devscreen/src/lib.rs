//! Developmental-screening review pipeline.
//!
//! A family submits answers against an age-gated question bank, an external scorer
//! produces a risk estimate, payment settlement unlocks clinical review, and exactly
//! one review may complete a screening. Review insertions are fanned out to families
//! through scope-checked, de-duplicated notifications.

pub mod config;
pub mod error;
pub mod notifications;
pub mod questions;
pub mod screening;
pub mod storage;
pub mod telemetry;
pub mod validation;
pub mod wallet;
