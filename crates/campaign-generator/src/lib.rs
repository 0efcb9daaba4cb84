//! Deterministic Domain Generator and Offset/Resume Manager
//!: the batched, restart-stable domain-name emitter and the
//! global config-hash-keyed offset state that guarantees at-most-once
//! emission across campaigns and restarts.

pub mod generator;
pub mod resume;

pub use generator::{
    build_generated_domains, config_hash, generate_batch, normalise, total_combinations, GeneratorError,
};
pub use resume::{persist_batch_with_global_offset, prepare_resume};
