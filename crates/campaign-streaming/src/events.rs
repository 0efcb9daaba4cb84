use campaign_core::{CampaignId, CorrelationId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// The closed SSE wire taxonomy. Every variant carries at least
/// `{event, campaignId, timestamp}`; correlation-id is carried by the
/// rescore-flow variants.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SseEvent {
    AnalysisReuseEnrichment {
        #[serde(rename = "campaignId")]
        campaign_id: CampaignId,
        timestamp: DateTime<Utc>,
        #[serde(rename = "correlationId")]
        correlation_id: CorrelationId,
    },
    AnalysisFailed {
        #[serde(rename = "campaignId")]
        campaign_id: CampaignId,
        timestamp: DateTime<Utc>,
        #[serde(rename = "errorCode")]
        error_code: String,
        message: String,
    },
    AnalysisReadSwitch {
        #[serde(rename = "campaignId")]
        campaign_id: CampaignId,
        timestamp: DateTime<Utc>,
        adopted: bool,
        coverage: f64,
        threshold: f64,
        reason: String,
    },
    RescoreProgress {
        #[serde(rename = "campaignId")]
        campaign_id: CampaignId,
        timestamp: DateTime<Utc>,
        #[serde(rename = "correlationId")]
        correlation_id: CorrelationId,
        processed: u64,
        total: u64,
        percentage: f64,
    },
    RescoreCompleted {
        #[serde(rename = "campaignId")]
        campaign_id: CampaignId,
        timestamp: DateTime<Utc>,
        #[serde(rename = "correlationId")]
        correlation_id: CorrelationId,
        result: RescoreResult,
        error: Option<String>,
    },
    DomainScored {
        #[serde(rename = "campaignId")]
        campaign_id: CampaignId,
        timestamp: DateTime<Utc>,
        #[serde(rename = "correlationId")]
        correlation_id: CorrelationId,
        sample: Vec<ScoredDomainSample>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RescoreResult {
    Success,
    Failed,
}

/// A single domain in a `domain_scored` sample.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredDomainSample {
    pub domain_name: String,
    pub score: f64,
    pub components: Option<serde_json::Value>,
    pub structural: Option<serde_json::Value>,
}

impl SseEvent {
    pub fn campaign_id(&self) -> CampaignId {
        match self {
            SseEvent::AnalysisReuseEnrichment { campaign_id, .. }
            | SseEvent::AnalysisFailed { campaign_id, .. }
            | SseEvent::AnalysisReadSwitch { campaign_id, .. }
            | SseEvent::RescoreProgress { campaign_id, .. }
            | SseEvent::RescoreCompleted { campaign_id, .. }
            | SseEvent::DomainScored { campaign_id, .. } => *campaign_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialises_with_event_tag_and_camel_case_campaign_id() {
        let event = SseEvent::AnalysisFailed {
            campaign_id: CampaignId::new(),
            timestamp: Utc::now(),
            error_code: "E_ANALYSIS_MISSING_FEATURES".to_string(),
            message: "no feature vectors".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "analysis_failed");
        assert!(json.get("campaignId").is_some());
        assert_eq!(json["errorCode"], "E_ANALYSIS_MISSING_FEATURES");
    }
}
