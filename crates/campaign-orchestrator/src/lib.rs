//! Phase Service Contract: wires the Deterministic Domain
//! Generator + Offset/Resume Manager and the Scoring Engine into runnable,
//! pausable `PhaseService` implementations driven by the generic Phase
//! Execution State Machine (`campaign-executor`).
//!
//! This crate is the orchestration core's top-level assembly point — it has
//! no REST façade or concrete database driver of its own (those are out of
//! scope here), but the `run_demo` binary below exercises the full
//! generation → analysis pipeline against the in-memory store to prove the
//! wiring end to end.

pub mod analysis_phase;
pub mod error;
pub mod generation_phase;
pub mod service;

pub use analysis_phase::AnalysisPhaseService;
pub use error::{Error, Result};
pub use generation_phase::DomainGenerationPhaseService;
pub use service::PhaseService;
