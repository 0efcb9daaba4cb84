use crate::ids::CampaignId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pattern shape for the deterministic domain generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorPattern {
    Prefix,
    Suffix,
    Both,
}

impl GeneratorPattern {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "prefix" => Some(GeneratorPattern::Prefix),
            "suffix" => Some(GeneratorPattern::Suffix),
            "both" => Some(GeneratorPattern::Both),
            _ => None,
        }
    }
}

/// Raw, caller-supplied generator configuration, prior to normalisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfigInput {
    pub pattern: String,
    pub prefix_length: u32,
    pub suffix_length: u32,
    pub character_set: String,
    pub constant_string: String,
    pub tld: String,
}

/// Normalised generator configuration.
///
/// `pattern` is canonicalised; for `Prefix` suffix_length is forced to 0 and
/// vice-versa; `Both` requires both lengths > 0, checked at validation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub pattern: GeneratorPattern,
    pub prefix_length: u32,
    pub suffix_length: u32,
    pub character_set: String,
    pub constant_string: String,
    pub tld: String,
}

/// (campaign-id, phase-kind)-scoped execution of the domain generation phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainGenerationExecution {
    pub campaign_id: CampaignId,
    pub config_hash: String,
    pub normalised_params: serde_json::Value,
    pub offset_start: u64,
    pub effective_start: u64,
    pub effective_total: u64,
}

/// A single emitted domain name.
///
/// Invariant: (campaign_id, domain_name) unique; offset_index monotonically
/// increasing within a campaign batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedDomain {
    pub id: uuid::Uuid,
    pub campaign_id: CampaignId,
    pub domain_name: String,
    pub offset_index: u64,
    pub generated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Global (config-hash keyed) offset state.
///
/// Invariant: any two campaigns sharing a config_hash observe a total order
/// on emissions by offset; last_offset is the highest offset successfully
/// persisted under that hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainGenerationConfigState {
    pub config_hash: String,
    pub last_offset: u64,
    pub normalised_params_json: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}
