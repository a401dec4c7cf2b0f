//! Analytics helpers: correlation, trend forecasting, regional aggregation,
//! and the report runner that composes them.
//!
//! Every helper is a pure function over caller-supplied input. None of them
//! cache or log; the runner is where they are composed.

pub mod aggregator;
pub mod correlation;
pub mod hexgrid;
pub mod insights;
pub mod runner;
pub mod towers;
pub mod trend;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("insufficient data: need {needed} points, have {have}")]
    InsufficientData { needed: usize, have: usize },
    #[error("forecast horizon of {horizon} steps runs past the last representable date")]
    HorizonOutOfRange { horizon: usize },
}
