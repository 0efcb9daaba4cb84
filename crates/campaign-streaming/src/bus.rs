use crate::events::SseEvent;
use campaign_core::CampaignId;
use dashmap::DashMap;
use tokio::sync::broadcast;

const BUS_CAPACITY: usize = 256;

/// In-process publish/subscribe bus for SSE events, keyed by campaign.
///
/// This is best-effort: a subscriber that is not attached when
/// an event is published simply misses it, and a full receiver queue drops
/// its oldest entries per `tokio::sync::broadcast` semantics. It does not
/// itself serve HTTP — an external REST façade adapts `subscribe` into a
/// wire SSE stream, which is out of this core's scope.
pub struct SseBus {
    channels: DashMap<CampaignId, broadcast::Sender<SseEvent>>,
}

impl SseBus {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    pub fn subscribe(&self, campaign_id: CampaignId) -> broadcast::Receiver<SseEvent> {
        self.channels
            .entry(campaign_id)
            .or_insert_with(|| broadcast::channel(BUS_CAPACITY).0)
            .subscribe()
    }

    /// Publish an event. Errors (no subscribers) are swallowed with a debug
    /// log — the bus is best-effort.
    pub fn publish(&self, event: SseEvent) {
        let campaign_id = event.campaign_id();
        let sender = self
            .channels
            .entry(campaign_id)
            .or_insert_with(|| broadcast::channel(BUS_CAPACITY).0);
        if sender.send(event).is_err() {
            tracing::debug!(%campaign_id, "sse publish had no active subscribers");
        }
    }

    /// Drop the channel for a campaign once its executions are forgotten.
    pub fn forget(&self, campaign_id: CampaignId) {
        self.channels.remove(&campaign_id);
    }
}

impl Default for SseBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_core::CorrelationId;
    use chrono::Utc;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = SseBus::new();
        let campaign_id = CampaignId::new();
        let mut rx = bus.subscribe(campaign_id);
        bus.publish(SseEvent::AnalysisReuseEnrichment {
            campaign_id,
            timestamp: Utc::now(),
            correlation_id: CorrelationId::new(),
        });
        let received = rx.recv().await.unwrap();
        assert_eq!(received.campaign_id(), campaign_id);
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = SseBus::new();
        bus.publish(SseEvent::AnalysisReuseEnrichment {
            campaign_id: CampaignId::new(),
            timestamp: Utc::now(),
            correlation_id: CorrelationId::new(),
        });
    }
}
