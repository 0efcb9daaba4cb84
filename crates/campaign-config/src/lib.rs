//! Centralises the environment-flag surface named in the Phase Service
//! Contract (closed set, see module docs below) so no other crate reads
//! `std::env::var` directly.

use std::env;

fn flag_enabled(name: &str) -> bool {
    match env::var(name) {
        Ok(v) => v == "1" || v.eq_ignore_ascii_case("true"),
        Err(_) => false,
    }
}

fn positive_int(name: &str, default: u32) -> u32 {
    match env::var(name) {
        Ok(v) => match v.parse::<u32>() {
            Ok(n) if n > 0 => n,
            _ => {
                tracing::warn!(var = name, value = %v, "ignoring non-positive or unparsable env override, using default");
                default
            }
        },
        Err(_) => default,
    }
}

/// Behavior-affecting environment flags (closed set).
#[derive(Debug, Clone, Copy)]
pub struct FeatureFlags {
    pub enable_tf_lite: bool,
    pub enable_sse_structural_details: bool,
    pub enable_sse_full_components: bool,
    pub enable_advanced_lang_detect: bool,
}

impl FeatureFlags {
    pub fn from_env() -> Self {
        Self {
            enable_tf_lite: flag_enabled("ENABLE_TF_LITE"),
            enable_sse_structural_details: flag_enabled("ENABLE_SSE_STRUCTURAL_DETAILS"),
            enable_sse_full_components: flag_enabled("ENABLE_SSE_FULL_COMPONENTS"),
            enable_advanced_lang_detect: flag_enabled("ENABLE_ADVANCED_LANG_DETECT"),
        }
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_tf_lite: false,
            enable_sse_structural_details: false,
            enable_sse_full_components: false,
            enable_advanced_lang_detect: false,
        }
    }
}

/// The three numeric thresholds used by Campaign Aggregates. These are
/// configuration, not hard-coded constants, so deployments can tune them
/// without a rebuild.
///
/// Defaults are the midpoint of the plausible range documented in
/// `DESIGN.md`; operators should override them per-deployment.
#[derive(Debug, Clone, Copy)]
pub struct AggregateThresholds {
    pub high_potential_score: f64,
    pub repetition_index: f64,
    pub anchor_share: f64,
}

impl AggregateThresholds {
    pub fn from_env() -> Self {
        Self {
            high_potential_score: env_f64("CAMPAIGN_HIGH_POTENTIAL_SCORE", 0.6),
            repetition_index: env_f64("CAMPAIGN_REPETITION_THRESHOLD", 0.35),
            anchor_share: env_f64("CAMPAIGN_ANCHOR_SHARE_THRESHOLD", 0.5),
        }
    }
}

impl Default for AggregateThresholds {
    fn default() -> Self {
        Self {
            high_potential_score: 0.6,
            repetition_index: 0.35,
            anchor_share: 0.5,
        }
    }
}

fn env_f64(name: &str, default: f64) -> f64 {
    match env::var(name) {
        Ok(v) => v.parse().unwrap_or_else(|_| {
            tracing::warn!(var = name, value = %v, "ignoring unparsable float override, using default");
            default
        }),
        Err(_) => default,
    }
}

/// Read-path coverage threshold, configurable with a documented default.
#[derive(Debug, Clone, Copy)]
pub struct ReadPathConfig {
    pub coverage_threshold: f64,
    pub small_sample_cutoff: u64,
}

impl ReadPathConfig {
    pub fn from_env() -> Self {
        Self {
            coverage_threshold: env_f64("CAMPAIGN_READPATH_COVERAGE_THRESHOLD", 0.75),
            small_sample_cutoff: 5,
        }
    }
}

impl Default for ReadPathConfig {
    fn default() -> Self {
        Self {
            coverage_threshold: 0.75,
            small_sample_cutoff: 5,
        }
    }
}

/// Top-level configuration bundle handed to the orchestrator at startup.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    pub rescore_progress_interval: u32,
    pub feature_flags: FeatureFlags,
    pub aggregate_thresholds: AggregateThresholds,
    pub read_path: ReadPathConfig,
    pub feature_cache_ttl_secs: u64,
}

impl OrchestratorConfig {
    pub fn from_env() -> Self {
        Self {
            rescore_progress_interval: positive_int("RESCORE_PROGRESS_INTERVAL", 500),
            feature_flags: FeatureFlags::from_env(),
            aggregate_thresholds: AggregateThresholds::from_env(),
            read_path: ReadPathConfig::from_env(),
            feature_cache_ttl_secs: 30,
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            rescore_progress_interval: 500,
            feature_flags: FeatureFlags::default(),
            aggregate_thresholds: AggregateThresholds::default(),
            read_path: ReadPathConfig::default(),
            feature_cache_ttl_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = OrchestratorConfig::default();
        assert_eq!(cfg.rescore_progress_interval, 500);
        assert_eq!(cfg.feature_cache_ttl_secs, 30);
        assert_eq!(cfg.read_path.coverage_threshold, 0.75);
        assert_eq!(cfg.read_path.small_sample_cutoff, 5);
    }

    #[test]
    fn positive_int_rejects_zero_and_negative() {
        assert_eq!(positive_int("__CAMPAIGN_CONFIG_TEST_UNSET__", 500), 500);
    }
}
