//! Deterministic Domain Generator: normalisation of raw
//! generator input, the combinatorial-space size for a normalised config,
//! and pure batch emission over that space.

use campaign_core::generation::{GeneratedDomain, GeneratorConfig, GeneratorConfigInput, GeneratorPattern};
use campaign_core::CampaignId;
use chrono::Utc;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GeneratorError {
    #[error("configuration invalid: unknown generator pattern {0:?}")]
    UnknownPattern(String),

    #[error("configuration invalid: pattern 'both' requires prefix_length > 0 and suffix_length > 0")]
    BothRequiresBothLengths,

    #[error("configuration invalid: character_set must not be empty")]
    EmptyCharacterSet,
}

impl From<GeneratorError> for campaign_core::Error {
    fn from(err: GeneratorError) -> Self {
        campaign_core::Error::ConfigurationInvalid(err.to_string())
    }
}

/// Normalise raw generator input: the pattern is
/// lowercased to its canonical kind; for `Prefix` the suffix length is
/// forced to 0 and vice-versa; `Both` requires both lengths > 0.
pub fn normalise(input: &GeneratorConfigInput) -> Result<GeneratorConfig, GeneratorError> {
    let pattern = GeneratorPattern::parse(&input.pattern)
        .ok_or_else(|| GeneratorError::UnknownPattern(input.pattern.clone()))?;

    if input.character_set.is_empty() {
        return Err(GeneratorError::EmptyCharacterSet);
    }

    let (prefix_length, suffix_length) = match pattern {
        GeneratorPattern::Prefix => (input.prefix_length, 0),
        GeneratorPattern::Suffix => (0, input.suffix_length),
        GeneratorPattern::Both => {
            if input.prefix_length == 0 || input.suffix_length == 0 {
                return Err(GeneratorError::BothRequiresBothLengths);
            }
            (input.prefix_length, input.suffix_length)
        }
    };

    Ok(GeneratorConfig {
        pattern,
        prefix_length,
        suffix_length,
        character_set: input.character_set.clone(),
        constant_string: input.constant_string.clone(),
        tld: input.tld.clone(),
    })
}

/// Stable SHA-256 of the normalised config, used as the global offset
/// state's key.
pub fn config_hash(config: &GeneratorConfig) -> String {
    let json = serde_json::to_vec(config).expect("GeneratorConfig always serialises");
    let mut hasher = Sha256::new();
    hasher.update(&json);
    format!("{:x}", hasher.finalize())
}

fn charset_chars(config: &GeneratorConfig) -> Vec<char> {
    config.character_set.chars().collect()
}

/// Size of the total combinatorial space a normalised config can emit
///. Saturates at `u64::MAX` rather than overflowing for
/// pathologically large character sets/lengths.
pub fn total_combinations(config: &GeneratorConfig) -> u64 {
    let chars = charset_chars(config);
    let n = chars.len() as u64;
    if n == 0 {
        return 0;
    }
    let prefix_space = n.checked_pow(config.prefix_length).unwrap_or(u64::MAX);
    match config.pattern {
        GeneratorPattern::Prefix => prefix_space,
        GeneratorPattern::Suffix => n.checked_pow(config.suffix_length).unwrap_or(u64::MAX),
        GeneratorPattern::Both => {
            let suffix_space = n.checked_pow(config.suffix_length).unwrap_or(u64::MAX);
            prefix_space.saturating_mul(suffix_space)
        }
    }
}

/// Renders `index` as a fixed-`length` base-N numeral over `chars`, treating
/// `index` as a mixed-radix counter. This is what makes `generateBatch`
/// bit-exact and restart-stable: the same `(index, length, chars)` always
/// yields the same string.
fn combination_at(index: u64, length: u32, chars: &[char]) -> String {
    if length == 0 {
        return String::new();
    }
    let n = chars.len() as u64;
    let mut digits = vec![0u64; length as usize];
    let mut remainder = index;
    for slot in digits.iter_mut().rev() {
        *slot = remainder % n;
        remainder /= n;
    }
    digits.into_iter().map(|d| chars[d as usize]).collect()
}

fn domain_at(config: &GeneratorConfig, chars: &[char], index: u64) -> String {
    let label = match config.pattern {
        GeneratorPattern::Prefix => {
            format!("{}{}", combination_at(index, config.prefix_length, chars), config.constant_string)
        }
        GeneratorPattern::Suffix => {
            format!("{}{}", config.constant_string, combination_at(index, config.suffix_length, chars))
        }
        GeneratorPattern::Both => {
            let suffix_space = (chars.len() as u64).checked_pow(config.suffix_length).unwrap_or(1);
            let prefix_idx = index / suffix_space.max(1);
            let suffix_idx = index % suffix_space.max(1);
            format!(
                "{}{}{}",
                combination_at(prefix_idx, config.prefix_length, chars),
                config.constant_string,
                combination_at(suffix_idx, config.suffix_length, chars)
            )
        }
    };
    format!("{}.{}", label, config.tld)
}

/// Batched emission (`generate_batch(offset, count) -> (domains,
/// nextOffset)`): names at indices `[offset, min(offset+count,
/// totalCombinations))`, and the offset to resume from next.
pub fn generate_batch(config: &GeneratorConfig, offset: u64, count: u64) -> (Vec<String>, u64) {
    let total = total_combinations(config);
    let chars = charset_chars(config);
    if offset >= total || chars.is_empty() || count == 0 {
        return (Vec::new(), offset);
    }
    let end = offset.saturating_add(count).min(total);
    let domains = (offset..end).map(|i| domain_at(config, &chars, i)).collect();
    (domains, end)
}

/// Wraps a batch of generated names into persistable `GeneratedDomain` rows,
/// offset-indexed starting at `base_offset`.
pub fn build_generated_domains(
    campaign_id: CampaignId,
    domain_names: &[String],
    base_offset: u64,
) -> Vec<GeneratedDomain> {
    let now = Utc::now();
    domain_names
        .iter()
        .enumerate()
        .map(|(i, name)| GeneratedDomain {
            id: uuid::Uuid::new_v4(),
            campaign_id,
            domain_name: name.clone(),
            offset_index: base_offset + i as u64,
            generated_at: now,
            created_at: now,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(pattern: &str) -> GeneratorConfigInput {
        GeneratorConfigInput {
            pattern: pattern.to_string(),
            prefix_length: 2,
            suffix_length: 2,
            character_set: "ab".to_string(),
            constant_string: "shop".to_string(),
            tld: "com".to_string(),
        }
    }

    #[test]
    fn prefix_pattern_forces_suffix_length_zero() {
        let config = normalise(&input("Prefix")).unwrap();
        assert_eq!(config.pattern, GeneratorPattern::Prefix);
        assert_eq!(config.suffix_length, 0);
        assert_eq!(config.prefix_length, 2);
    }

    #[test]
    fn both_requires_both_lengths_positive() {
        let mut raw = input("both");
        raw.suffix_length = 0;
        assert!(matches!(normalise(&raw), Err(GeneratorError::BothRequiresBothLengths)));
    }

    #[test]
    fn unknown_pattern_is_rejected() {
        assert!(matches!(normalise(&input("diagonal")), Err(GeneratorError::UnknownPattern(_))));
    }

    #[test]
    fn total_combinations_for_prefix_is_charset_pow_length() {
        let config = normalise(&input("prefix")).unwrap();
        assert_eq!(total_combinations(&config), 4); // "ab" ^ 2
    }

    #[test]
    fn total_combinations_for_both_multiplies_the_two_spaces() {
        let config = normalise(&input("both")).unwrap();
        assert_eq!(total_combinations(&config), 16); // 4 * 4
    }

    #[test]
    fn generate_batch_is_total_and_bijective_over_the_full_space() {
        let config = normalise(&input("both")).unwrap();
        let total = total_combinations(&config);
        let (domains, next) = generate_batch(&config, 0, total);
        assert_eq!(next, total);
        assert_eq!(domains.len(), total as usize);
        let unique: std::collections::HashSet<_> = domains.iter().collect();
        assert_eq!(unique.len(), domains.len());
    }

    #[test]
    fn generate_batch_past_total_returns_empty_and_unchanged_offset() {
        let config = normalise(&input("prefix")).unwrap();
        let total = total_combinations(&config);
        let (domains, next) = generate_batch(&config, total, 5);
        assert!(domains.is_empty());
        assert_eq!(next, total);
    }

    #[test]
    fn resuming_a_batch_midway_continues_the_same_ordering() {
        let config = normalise(&input("suffix")).unwrap();
        let total = total_combinations(&config);
        let (whole, _) = generate_batch(&config, 0, total);
        let (first_half, mid) = generate_batch(&config, 0, total / 2);
        let (second_half, end) = generate_batch(&config, mid, total - mid);
        assert_eq!(end, total);
        let mut resumed = first_half;
        resumed.extend(second_half);
        assert_eq!(resumed, whole);
    }

    #[test]
    fn config_hash_is_stable_for_equal_configs() {
        let a = normalise(&input("both")).unwrap();
        let b = normalise(&input("both")).unwrap();
        assert_eq!(config_hash(&a), config_hash(&b));
    }

    #[test]
    fn build_generated_domains_offsets_are_monotonically_increasing() {
        let campaign_id = CampaignId::new();
        let names = vec!["a.com".to_string(), "b.com".to_string()];
        let rows = build_generated_domains(campaign_id, &names, 10);
        assert_eq!(rows[0].offset_index, 10);
        assert_eq!(rows[1].offset_index, 11);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn batches_never_duplicate_or_skip_within_the_space(
            prefix_len in 1u32..3,
            suffix_len in 1u32..3,
            batch in 1u64..10,
        ) {
            let config = normalise(&GeneratorConfigInput {
                pattern: "both".to_string(),
                prefix_length: prefix_len,
                suffix_length: suffix_len,
                character_set: "abc".to_string(),
                constant_string: "x".to_string(),
                tld: "com".to_string(),
            }).unwrap();
            let total = total_combinations(&config);

            let mut seen = std::collections::HashSet::new();
            let mut offset = 0u64;
            while offset < total {
                let (domains, next) = generate_batch(&config, offset, batch);
                prop_assert!(next > offset);
                for d in &domains {
                    prop_assert!(seen.insert(d.clone()), "duplicate domain emitted: {d}");
                }
                offset = next;
            }
            prop_assert_eq!(seen.len() as u64, total);
        }
    }
}
