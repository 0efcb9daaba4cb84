//! Store Contract: the persistence seam every other crate
//! programs against, plus the Read-Path Selector , Campaign
//! Aggregates , an in-memory reference implementation for tests and
//! the demo binary, and a `PostgreSQL` implementation for production.

pub mod aggregates;
pub mod contract;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod readpath;
pub mod types;

pub use aggregates::{AggregateQuerySource, CampaignAggregates};
pub use contract::{CampaignStore, ScoringProfileStore, Transaction, Transactor};
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresCampaignStore;
pub use readpath::{decide as decide_read_path, record_error_fallback, ReadPathDecision};
pub use types::{
    DomainScoreUpdate, FailureContext, FailureDetails, FunnelAggregate, HttpKeywordResultFilter,
    HttpKeywordResultRow, MetricsAggregate, UpdateAnalysisResultsOutcome,
};
