use thiserror::Error;

/// Errors surfaced by the Store Contract.
///
/// Folds into `campaign_core::Error` at the crate boundary, following
/// `dashflow-postgres-checkpointer::PostgresError`'s fold into
/// `dashflow::Error::Checkpoint`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("campaign phase not found for {campaign_id} / {phase:?}")]
    PhaseNotFound {
        campaign_id: campaign_core::CampaignId,
        phase: campaign_core::PhaseKind,
    },

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("query timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("transaction does not support rollback target: {0}")]
    TransactionMisuse(String),
}

impl From<StoreError> for campaign_core::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::PhaseNotFound { campaign_id, phase } => {
                campaign_core::Error::PhaseExecutionMissing { campaign_id, phase }
            }
            StoreError::Postgres(e) => campaign_core::Error::TransientDbError(e.to_string()),
            StoreError::Timeout(d) => {
                campaign_core::Error::TransientDbError(format!("timed out after {:?}", d))
            }
            other => campaign_core::Error::StorageUnavailable(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_not_found_maps_to_core_phase_execution_missing() {
        let err = StoreError::PhaseNotFound {
            campaign_id: campaign_core::CampaignId::new(),
            phase: campaign_core::PhaseKind::Analysis,
        };
        let core_err: campaign_core::Error = err.into();
        assert!(matches!(
            core_err,
            campaign_core::Error::PhaseExecutionMissing { .. }
        ));
    }
}
