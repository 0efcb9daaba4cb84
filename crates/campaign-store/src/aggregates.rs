use crate::error::{Result, StoreError};
use crate::types::{FunnelAggregate, MetricsAggregate};
use async_trait::async_trait;
use campaign_cache::TtlCache;
use campaign_config::AggregateThresholds;
use campaign_core::CampaignId;
use campaign_observability::metrics_registry;
use std::time::Duration;

const AGGREGATE_QUERY_TIMEOUT: Duration = Duration::from_secs(2);
const AGGREGATE_CACHE_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Endpoint {
    Funnel,
    Metrics,
}

impl Endpoint {
    fn as_str(self) -> &'static str {
        match self {
            Endpoint::Funnel => "funnel",
            Endpoint::Metrics => "metrics",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey(CampaignId, Endpoint);

#[derive(Clone)]
enum CacheValue {
    Funnel(FunnelAggregate),
    Metrics(MetricsAggregate),
}

/// Raw-query seam a concrete store backend implements for the two
/// read-only aggregate queries. Kept separate from
/// `CampaignStore` since aggregates are read-only and independently cached.
#[async_trait]
pub trait AggregateQuerySource: Send + Sync {
    async fn query_funnel(
        &self,
        campaign_id: CampaignId,
        thresholds: &AggregateThresholds,
    ) -> Result<FunnelAggregate>;

    async fn query_metrics(
        &self,
        campaign_id: CampaignId,
        thresholds: &AggregateThresholds,
    ) -> Result<MetricsAggregate>;
}

/// TTL-cached facade over `AggregateQuerySource`. Funnel and Metrics queries
/// share an identical caching shape (TTL 30 s per (campaign, endpoint)), so
/// one `TtlCache` is generalised over a `CacheKey` enum rather than
/// duplicating the cache for each query.
pub struct CampaignAggregates<S: AggregateQuerySource> {
    source: S,
    thresholds: AggregateThresholds,
    cache: TtlCache<CacheKey, CacheValue>,
}

impl<S: AggregateQuerySource> CampaignAggregates<S> {
    pub fn new(source: S, thresholds: AggregateThresholds) -> Self {
        Self {
            source,
            thresholds,
            cache: TtlCache::new(AGGREGATE_CACHE_TTL),
        }
    }

    pub async fn funnel(&self, campaign_id: CampaignId) -> Result<FunnelAggregate> {
        let key = CacheKey(campaign_id, Endpoint::Funnel);
        if let Some(CacheValue::Funnel(v)) = self.cache.get(&key) {
            record_cache_result(Endpoint::Funnel, "hit");
            return Ok(v);
        }
        record_cache_result(Endpoint::Funnel, "miss");

        let timer = std::time::Instant::now();
        let result = tokio::time::timeout(
            AGGREGATE_QUERY_TIMEOUT,
            self.source.query_funnel(campaign_id, &self.thresholds),
        )
        .await
        .map_err(|_| StoreError::Timeout(AGGREGATE_QUERY_TIMEOUT))??;
        metrics_registry()
            .campaign_aggregation_latency_seconds
            .with_label_values(&[Endpoint::Funnel.as_str()])
            .observe(timer.elapsed().as_secs_f64());

        self.cache.put(key, CacheValue::Funnel(result));
        Ok(result)
    }

    pub async fn metrics(&self, campaign_id: CampaignId) -> Result<MetricsAggregate> {
        let key = CacheKey(campaign_id, Endpoint::Metrics);
        if let Some(CacheValue::Metrics(v)) = self.cache.get(&key) {
            record_cache_result(Endpoint::Metrics, "hit");
            return Ok(v);
        }
        record_cache_result(Endpoint::Metrics, "miss");

        let timer = std::time::Instant::now();
        let result = tokio::time::timeout(
            AGGREGATE_QUERY_TIMEOUT,
            self.source.query_metrics(campaign_id, &self.thresholds),
        )
        .await
        .map_err(|_| StoreError::Timeout(AGGREGATE_QUERY_TIMEOUT))??;
        metrics_registry()
            .campaign_aggregation_latency_seconds
            .with_label_values(&[Endpoint::Metrics.as_str()])
            .observe(timer.elapsed().as_secs_f64());

        self.cache.put(key, CacheValue::Metrics(result));
        Ok(result)
    }

    /// Exposed per the "cache invalidation hooks ... per endpoint and
    /// per campaign".
    pub fn invalidate_funnel(&self, campaign_id: CampaignId) {
        self.cache.invalidate(&CacheKey(campaign_id, Endpoint::Funnel));
    }

    pub fn invalidate_metrics(&self, campaign_id: CampaignId) {
        self.cache
            .invalidate(&CacheKey(campaign_id, Endpoint::Metrics));
    }

    pub fn invalidate_campaign(&self, campaign_id: CampaignId) {
        self.invalidate_funnel(campaign_id);
        self.invalidate_metrics(campaign_id);
    }
}

fn record_cache_result(endpoint: Endpoint, result: &str) {
    metrics_registry()
        .campaign_aggregation_cache_hits_total
        .with_label_values(&[endpoint.as_str(), result])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct CountingSource {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl AggregateQuerySource for CountingSource {
        async fn query_funnel(
            &self,
            _campaign_id: CampaignId,
            _thresholds: &AggregateThresholds,
        ) -> Result<FunnelAggregate> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FunnelAggregate {
                generated: 10,
                ..Default::default()
            })
        }

        async fn query_metrics(
            &self,
            _campaign_id: CampaignId,
            _thresholds: &AggregateThresholds,
        ) -> Result<MetricsAggregate> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(MetricsAggregate::default())
        }
    }

    #[tokio::test]
    async fn second_funnel_call_within_ttl_is_served_from_cache() {
        let calls = Arc::new(AtomicU32::new(0));
        let aggregates = CampaignAggregates::new(
            CountingSource {
                calls: calls.clone(),
            },
            AggregateThresholds::default(),
        );
        let campaign_id = CampaignId::new();

        let first = aggregates.funnel(campaign_id).await.unwrap();
        let second = aggregates.funnel(campaign_id).await.unwrap();

        assert_eq!(first.generated, second.generated);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_a_fresh_query() {
        let calls = Arc::new(AtomicU32::new(0));
        let aggregates = CampaignAggregates::new(
            CountingSource {
                calls: calls.clone(),
            },
            AggregateThresholds::default(),
        );
        let campaign_id = CampaignId::new();

        aggregates.funnel(campaign_id).await.unwrap();
        aggregates.invalidate_funnel(campaign_id);
        aggregates.funnel(campaign_id).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
