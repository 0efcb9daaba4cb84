use thiserror::Error;

/// Error taxonomy shared across the orchestration core.
///
/// Every crate-local error type converts into this one via `#[from]` at the
/// crate boundary, mirroring how `dashflow-postgres-checkpointer::PostgresError`
/// folds into `dashflow::Error::Checkpoint`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("configuration invalid: {0}")]
    ConfigurationInvalid(String),

    #[error("phase execution missing for campaign {campaign_id} / {phase:?}")]
    PhaseExecutionMissing {
        campaign_id: crate::ids::CampaignId,
        phase: crate::ids::PhaseKind,
    },

    #[error("phase is not running")]
    PhaseNotRunning,

    #[error("phase is not paused")]
    PhaseNotPaused,

    #[error("phase is already running for campaign {campaign_id} / {phase:?}")]
    PhaseAlreadyRunning {
        campaign_id: crate::ids::CampaignId,
        phase: crate::ids::PhaseKind,
    },

    #[error("phase does not support pause")]
    PhasePauseUnsupported,

    #[error("phase does not support resume")]
    PhaseResumeUnsupported,

    #[error("timed out waiting for phase to pause")]
    PhasePauseTimeout,

    #[error("timed out waiting for phase to resume")]
    PhaseResumeTimeout,

    #[error("E_ANALYSIS_MISSING_FEATURES: no feature vectors available for campaign {campaign_id}")]
    MissingFeatures { campaign_id: crate::ids::CampaignId },

    #[error("offset exceeds total combinations")]
    OffsetExhausted,

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("transient database error: {0}")]
    TransientDbError(String),
}

impl Error {
    /// The stable user-visible error code, where one is defined.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Error::MissingFeatures { .. } => Some("E_ANALYSIS_MISSING_FEATURES"),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
