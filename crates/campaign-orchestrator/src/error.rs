use thiserror::Error;

/// Top-level error aggregating every crate-local error type this crate
/// wires together, mirroring `dashflow-postgres-checkpointer::Error`
/// aggregating `tokio_postgres::Error`/`bincode::Error`/`serde_json::Error`
/// via `#[from]`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Core(#[from] campaign_core::Error),

    #[error(transparent)]
    Store(#[from] campaign_store::StoreError),

    #[error("unknown phase: {0}")]
    UnknownPhase(String),

    #[error("no configuration recorded for campaign {campaign_id} / {phase:?}; call Configure first")]
    NotConfigured {
        campaign_id: campaign_core::CampaignId,
        phase: campaign_core::PhaseKind,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
