/// Schema DDL, applied idempotently (`CREATE TABLE IF NOT EXISTS`) on
/// connect, mirroring `dashflow-postgres-checkpointer`'s
/// `initialize_schema`. The `analysis_ready_features` view
/// is a thin wrapper distinguishing "has a non-null feature vector" so the
/// Read-Path Selector can count it the same way regardless of whether the
/// feature table or the legacy JSON column backs it.
pub const SCHEMA_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS campaign_phase_executions (
    campaign_id UUID NOT NULL,
    phase TEXT NOT NULL,
    status TEXT NOT NULL,
    items_total BIGINT NOT NULL DEFAULT 0,
    items_processed BIGINT NOT NULL DEFAULT 0,
    started_at TIMESTAMPTZ,
    completed_at TIMESTAMPTZ,
    last_error TEXT,
    last_error_details JSONB,
    correlation_id UUID,
    config JSONB,
    PRIMARY KEY (campaign_id, phase)
);

CREATE TABLE IF NOT EXISTS generated_domains (
    id UUID PRIMARY KEY,
    campaign_id UUID NOT NULL,
    domain_name TEXT NOT NULL,
    offset_index BIGINT NOT NULL,
    generated_at TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    UNIQUE (campaign_id, domain_name)
);

CREATE INDEX IF NOT EXISTS generated_domains_campaign_idx
    ON generated_domains (campaign_id);

CREATE TABLE IF NOT EXISTS domain_generation_phase_config_state (
    config_hash TEXT PRIMARY KEY,
    last_offset BIGINT NOT NULL,
    normalised_params_json JSONB NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS scoring_profiles (
    campaign_id UUID PRIMARY KEY,
    weights JSONB NOT NULL,
    parked_penalty_factor DOUBLE PRECISION NOT NULL
);

CREATE TABLE IF NOT EXISTS http_keyword_results (
    campaign_id UUID NOT NULL,
    domain_name TEXT NOT NULL,
    dns_status TEXT,
    feature_vector JSONB,
    relevance_score DOUBLE PRECISION,
    domain_score DOUBLE PRECISION,
    content_richness_score DOUBLE PRECISION,
    lead_status TEXT,
    stuffing_penalty DOUBLE PRECISION NOT NULL DEFAULT 0,
    repetition_index DOUBLE PRECISION NOT NULL DEFAULT 0,
    anchor_share DOUBLE PRECISION NOT NULL DEFAULT 0,
    microcrawl_gain_ratio DOUBLE PRECISION,
    PRIMARY KEY (campaign_id, domain_name)
);

CREATE INDEX IF NOT EXISTS http_keyword_results_campaign_idx
    ON http_keyword_results (campaign_id);

CREATE OR REPLACE VIEW analysis_ready_features AS
    SELECT campaign_id, domain_name, feature_vector
    FROM http_keyword_results
    WHERE feature_vector IS NOT NULL;
"#;
