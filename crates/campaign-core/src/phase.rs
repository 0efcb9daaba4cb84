use crate::ids::{CampaignId, CorrelationId, PhaseKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a `CampaignPhaseExecution`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    NotStarted,
    Configured,
    InProgress,
    Paused,
    Completed,
    Failed,
}

impl PhaseStatus {
    /// Terminal states are absorbing.
    pub fn is_terminal(self) -> bool {
        matches!(self, PhaseStatus::Completed | PhaseStatus::Failed)
    }
}

/// The persisted record for a campaign's execution of one phase.
///
/// In-process-only concurrency primitives (the progress channel, cancellation
/// token, pause barrier, and control channel) are NOT part of this record —
/// they live on `campaign_executor::PhaseRuntime`, since they cannot be
/// serialised to the store. This mirrors the split in `dashflow` between a
/// persisted `Checkpoint<S>` and the in-memory executor state that drives it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignPhaseExecution {
    pub campaign_id: CampaignId,
    pub phase: PhaseKind,
    pub status: PhaseStatus,
    pub items_total: u64,
    pub items_processed: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub correlation_id: Option<CorrelationId>,
}

impl CampaignPhaseExecution {
    pub fn new(campaign_id: CampaignId, phase: PhaseKind) -> Self {
        Self {
            campaign_id,
            phase,
            status: PhaseStatus::NotStarted,
            items_total: 0,
            items_processed: 0,
            started_at: None,
            completed_at: None,
            last_error: None,
            correlation_id: None,
        }
    }

    /// progress-pct ∈ [0,100].
    pub fn progress_pct(&self) -> f64 {
        if self.items_total == 0 {
            return 0.0;
        }
        let pct = (self.items_processed as f64 / self.items_total as f64) * 100.0;
        pct.clamp(0.0, 100.0)
    }
}

/// Wire message emitted on the phase's progress stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseProgress {
    pub campaign_id: CampaignId,
    pub phase: PhaseKind,
    pub status: PhaseStatus,
    pub progress_pct: f64,
    pub items_total: u64,
    pub items_processed: u64,
    pub message: Option<String>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl PhaseProgress {
    pub fn from_execution(exec: &CampaignPhaseExecution, message: Option<String>) -> Self {
        Self {
            campaign_id: exec.campaign_id,
            phase: exec.phase,
            status: exec.status,
            progress_pct: exec.progress_pct(),
            items_total: exec.items_total,
            items_processed: exec.items_processed,
            message,
            error: exec.last_error.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// Capability advertisement for a phase implementation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PhaseCapabilities {
    pub can_pause: bool,
    pub can_resume: bool,
    pub can_stop: bool,
    pub can_restart: bool,
}
