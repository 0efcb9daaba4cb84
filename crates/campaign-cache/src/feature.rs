use crate::ttl::TtlCache;
use campaign_core::{CampaignId, feature::FeatureVector};
use campaign_observability::metrics_registry;
use std::collections::HashMap;
use std::time::Duration;

/// Per-campaign map of domain name → feature vector, amortising repeated
/// reads during a single scoring run.
pub type FeatureMap = HashMap<String, FeatureVector>;

const FEATURE_CACHE_TTL: Duration = Duration::from_secs(30);

pub struct FeatureCache {
    inner: TtlCache<CampaignId, FeatureMap>,
}

impl FeatureCache {
    pub fn new() -> Self {
        Self {
            inner: TtlCache::new(FEATURE_CACHE_TTL),
        }
    }

    pub fn get(&self, campaign_id: CampaignId) -> Option<FeatureMap> {
        let result = self.inner.get(&campaign_id);
        let metrics = metrics_registry();
        if result.is_some() {
            metrics.analysis_feature_cache_hits_total.with_label_values(&[]).inc();
        } else {
            metrics.analysis_feature_cache_misses_total.with_label_values(&[]).inc();
        }
        result
    }

    pub fn put(&self, campaign_id: CampaignId, data: FeatureMap) {
        self.inner.put(campaign_id, data);
    }

    pub fn invalidate(&self, campaign_id: CampaignId) {
        self.inner.invalidate(&campaign_id);
        metrics_registry()
            .analysis_feature_cache_invalidations_total
            .with_label_values(&[])
            .inc();
    }
}

impl Default for FeatureCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_fetches_then_invalidate_then_fetch_is_miss() {
        let cache = FeatureCache::new();
        let campaign_id = CampaignId::new();

        // miss
        assert!(cache.get(campaign_id).is_none());
        cache.put(campaign_id, FeatureMap::new());
        // hit
        assert!(cache.get(campaign_id).is_some());

        cache.invalidate(campaign_id);
        // miss again regardless of freshness
        assert!(cache.get(campaign_id).is_none());
    }
}
