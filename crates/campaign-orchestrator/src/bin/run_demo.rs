//! Exercises the full generation → analysis pipeline end to end against the
//! in-memory store, proving out the wiring in `campaign-orchestrator`
//! without a live Postgres instance.

use campaign_config::{FeatureFlags, OrchestratorConfig};
use campaign_core::feature::FeatureVector;
use campaign_core::{CampaignId, CorrelationId};
use campaign_executor::{ControlDispatcher, InboundCommand, PhaseExecutor};
use campaign_orchestrator::{AnalysisPhaseService, DomainGenerationPhaseService, PhaseService};
use campaign_store::{CampaignStore, HttpKeywordResultRow, InMemoryStore};
use campaign_streaming::SseBus;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

fn seed_features(store: &InMemoryStore, campaign_id: CampaignId, domain_names: &[String]) {
    let now = chrono::Utc::now();
    let rows = domain_names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let vector = FeatureVector {
                kw_unique: (idx % 5) as f64,
                kw_hits_total: (idx % 20) as f64,
                content_bytes: 10_000.0 + (idx as f64 * 137.0),
                title_has_keyword: idx % 3 == 0,
                kw_top3: if idx % 4 == 0 {
                    vec!["widget".to_string()]
                } else {
                    Vec::new()
                },
                is_parked: idx % 7 == 0,
                parked_confidence: if idx % 7 == 0 { Some(0.4) } else { None },
                last_fetched_at: Some(now),
                ..FeatureVector::default()
            };
            HttpKeywordResultRow {
                domain_name: name.clone(),
                feature_vector: Some(vector),
            }
        })
        .collect();
    store.seed_feature_rows(campaign_id, rows);
}

#[tokio::main]
async fn main() {
    let _ = campaign_observability::init_tracing();

    let config = OrchestratorConfig::from_env();
    let store = Arc::new(InMemoryStore::new());
    let transactor = store.clone();
    let executor = Arc::new(PhaseExecutor::new(store.clone()));
    let dispatcher = Arc::new(ControlDispatcher::new(executor.clone()));
    let sse_bus = Arc::new(SseBus::new());
    let feature_cache = Arc::new(campaign_cache::FeatureCache::new());

    let campaign_id = CampaignId::new();
    let mut sse_rx = sse_bus.subscribe(campaign_id);
    tokio::spawn(async move {
        while let Ok(event) = sse_rx.recv().await {
            tracing::info!(?event, "sse");
        }
    });

    // --- Domain generation phase ---
    let generation = DomainGenerationPhaseService::new(store.clone(), transactor, executor.clone(), dispatcher.clone());

    generation
        .configure(
            campaign_id,
            serde_json::json!({
                "pattern": "prefix",
                "prefix_length": 2,
                "suffix_length": 0,
                "character_set": "abc",
                "constant_string": "shop",
                "tld": "com",
                "offset_start": 0,
                "requested_total": 9,
            }),
        )
        .await
        .expect("configure domain generation");

    let correlation_id = CorrelationId::new();
    let mut progress_rx = generation
        .execute(campaign_id, correlation_id)
        .await
        .expect("execute domain generation");

    // Attach a control channel and pause/resume mid-run for demonstration
    //.
    let (cmd_tx, cmd_rx) = mpsc::channel(8);
    generation.attach_control_channel(campaign_id, cmd_rx);

    let (ack_tx, ack_rx) = oneshot::channel();
    let _ = cmd_tx
        .send(InboundCommand {
            signal: campaign_executor::ControlSignal::Pause,
            ack: Some(ack_tx),
        })
        .await;
    let _ = ack_rx.await;

    let (ack_tx, ack_rx) = oneshot::channel();
    let _ = cmd_tx
        .send(InboundCommand {
            signal: campaign_executor::ControlSignal::Resume,
            ack: Some(ack_tx),
        })
        .await;
    let _ = ack_rx.await;

    while let Some(progress) = progress_rx.recv().await {
        tracing::info!(
            status = ?progress.status,
            processed = progress.items_processed,
            total = progress.items_total,
            "domain generation progress"
        );
    }

    let generated = store
        .count_generated_domains_by_campaign(campaign_id)
        .await
        .expect("count generated domains");
    tracing::info!(generated, "domain generation phase complete");

    // --- Analysis/scoring phase ---
    let domain_names: Vec<String> = (0..generated).map(|i| format!("domain-{i}.com")).collect();
    seed_features(&store, campaign_id, &domain_names);

    let analysis = AnalysisPhaseService::new(
        store.clone(),
        store.clone(),
        feature_cache,
        sse_bus,
        FeatureFlags::from_env(),
        config.rescore_progress_interval,
        executor,
        dispatcher,
    );

    analysis
        .configure(campaign_id, serde_json::json!({}))
        .await
        .expect("configure analysis");

    let mut analysis_rx = analysis
        .execute(campaign_id, CorrelationId::new())
        .await
        .expect("execute analysis");

    while let Some(progress) = analysis_rx.recv().await {
        tracing::info!(
            status = ?progress.status,
            processed = progress.items_processed,
            total = progress.items_total,
            "analysis progress"
        );
    }

    for name in domain_names.iter().take(5) {
        if let Some((relevance, domain)) = store.get_score(campaign_id, name) {
            tracing::info!(domain = %name, relevance, domain_score = domain, "scored");
        }
    }
}
