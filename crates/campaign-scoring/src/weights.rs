use campaign_core::scoring::{default_weights, NormalisedWeights, ScoringProfile, WEIGHT_KEYS};
use campaign_core::CampaignId;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WeightsError {
    #[error("configuration invalid: weight map is empty")]
    EmptyMap,

    #[error("configuration invalid: unknown weight key {0:?}")]
    UnknownKey(String),

    #[error("configuration invalid: weight {key} = {value} is out of range [0,1]")]
    OutOfRange { key: String, value: f64 },

    #[error("configuration invalid: weights sum to zero, cannot normalise")]
    ZeroSum,
}

impl From<WeightsError> for campaign_core::Error {
    fn from(err: WeightsError) -> Self {
        campaign_core::Error::ConfigurationInvalid(err.to_string())
    }
}

/// Validate and normalise a caller-supplied weight map.
///
/// Rejects empty maps and unknown keys; backfills missing keys from
/// defaults; normalises so Σw = 1 (an all-zero map is an error, since it
/// cannot be normalised).
pub fn validate(input: &HashMap<String, f64>) -> Result<NormalisedWeights, WeightsError> {
    if input.is_empty() {
        return Err(WeightsError::EmptyMap);
    }

    for (key, value) in input {
        if !WEIGHT_KEYS.contains(&key.as_str()) {
            return Err(WeightsError::UnknownKey(key.clone()));
        }
        if !(0.0..=1.0).contains(value) {
            return Err(WeightsError::OutOfRange {
                key: key.clone(),
                value: *value,
            });
        }
    }

    let defaults = default_weights();
    let mut merged: HashMap<String, f64> = defaults.clone();
    for key in WEIGHT_KEYS {
        if let Some(value) = input.get(*key) {
            merged.insert((*key).to_string(), *value);
        }
    }

    let sum: f64 = merged.values().sum();
    if sum <= 0.0 {
        return Err(WeightsError::ZeroSum);
    }

    for value in merged.values_mut() {
        *value /= sum;
    }

    Ok(NormalisedWeights::from_validated(merged))
}

/// Load a campaign's scoring profile, falling back to normalised defaults
/// and a nil parked-penalty when no profile row exists.
pub async fn load_for_campaign(
    store: &dyn campaign_store::ScoringProfileStore,
    campaign_id: CampaignId,
) -> campaign_core::Result<ScoringProfile> {
    match store.get_scoring_profile(campaign_id).await? {
        Some(mut profile) => {
            profile.parked_penalty_factor = profile.parked_penalty_factor.clamp(0.0, 1.0);
            Ok(profile)
        }
        None => Ok(ScoringProfile::defaults()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_map_is_rejected() {
        assert!(matches!(validate(&HashMap::new()), Err(WeightsError::EmptyMap)));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let mut map = HashMap::new();
        map.insert("bogus_weight".to_string(), 0.5);
        assert!(matches!(validate(&map), Err(WeightsError::UnknownKey(_))));
    }

    #[test]
    fn out_of_range_value_is_rejected() {
        let mut map = HashMap::new();
        map.insert("keyword_density_weight".to_string(), 1.5);
        assert!(matches!(validate(&map), Err(WeightsError::OutOfRange { .. })));
    }

    #[test]
    fn missing_keys_are_backfilled_and_result_sums_to_one() {
        let mut map = HashMap::new();
        map.insert("keyword_density_weight".to_string(), 0.5);
        let result = validate(&map).unwrap();
        let sum: f64 = result.as_map().values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn fully_specified_weights_normalise_to_same_ratios() {
        let mut map = HashMap::new();
        map.insert("keyword_density_weight".to_string(), 0.3);
        map.insert("unique_keyword_coverage_weight".to_string(), 0.3);
        map.insert("non_parked_weight".to_string(), 0.1);
        map.insert("content_length_quality_weight".to_string(), 0.1);
        map.insert("title_keyword_weight".to_string(), 0.1);
        map.insert("freshness_weight".to_string(), 0.1);
        map.insert("tf_lite_weight".to_string(), 0.0);
        let result = validate(&map).unwrap();
        let sum: f64 = result.as_map().values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!((result.get("keyword_density_weight") - 0.3).abs() < 1e-9);
    }
}
