//! Scoring Weights Registry and Scoring Engine.

pub mod engine;
pub mod weights;

pub use engine::{score_one, ScoringEngine};
