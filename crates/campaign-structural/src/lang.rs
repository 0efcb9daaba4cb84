use std::collections::HashMap;
use std::sync::OnceLock;

/// Text sample cap in bytes.
pub const SAMPLE_CAP_BYTES: usize = 8_192;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LanguageSignal {
    pub primary_lang: &'static str,
    pub confidence: f64,
}

struct LetterStats {
    total_letters: usize,
    ascii_letters: usize,
}

fn letter_stats(sample: &str) -> LetterStats {
    let mut total = 0usize;
    let mut ascii = 0usize;
    for ch in sample.chars() {
        if ch.is_alphabetic() {
            total += 1;
            if ch.is_ascii_alphabetic() {
                ascii += 1;
            }
        }
    }
    LetterStats {
        total_letters: total,
        ascii_letters: ascii,
    }
}

/// A tiny, hand-built table of trigram frequency weight per language. Not a
/// production language model — a deterministic, cheap scorer sufficient to
/// distinguish {en, es, fr, de} on common function-word trigrams.
fn trigram_table() -> &'static HashMap<&'static str, &'static [(&'static str, u32)]> {
    static TABLE: OnceLock<HashMap<&'static str, &'static [(&'static str, u32)]>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut m: HashMap<&'static str, &'static [(&'static str, u32)]> = HashMap::new();
        m.insert(
            "en",
            &[
                ("the", 10), ("and", 6), ("ing", 6), ("ion", 4), ("ent", 4), (" th", 5),
            ],
        );
        m.insert(
            "es",
            &[
                ("que", 8), ("ión", 5), ("aci", 4), ("los", 5), ("com", 4), ("con", 4),
            ],
        );
        m.insert(
            "fr",
            &[
                ("les", 7), ("ent", 5), ("que", 6), ("ait", 4), ("our", 4), ("eux", 3),
            ],
        );
        m.insert(
            "de",
            &[
                ("sch", 7), ("ich", 6), ("und", 6), ("ein", 5), ("der", 6), ("cht", 4),
            ],
        );
        m
    })
}

fn score_language(sample_lower: &str, lang: &str) -> u32 {
    let Some(entries) = trigram_table().get(lang) else {
        return 0;
    };
    entries
        .iter()
        .map(|(gram, weight)| sample_lower.matches(gram).count() as u32 * weight)
        .sum()
}

/// A layered decision:
/// 1. Basic ASCII heuristic when `totalLetters >= 40 && asciiRatio >= 0.85`.
/// 2. Trigram/quad-gram table when `sample.len() > 60 && totalLetters >= 60`,
///    with a soft bias toward English and confidence-gated acceptance.
/// 3. Optional advanced detection (feature-flagged) blends confidence with
///    the ASCII ratio and may override the chosen language.
pub fn detect_language(sample: &str, enable_advanced: bool) -> LanguageSignal {
    let truncated: String = sample.chars().take(SAMPLE_CAP_BYTES).collect();
    let stats = letter_stats(&truncated);

    if stats.total_letters == 0 {
        return LanguageSignal {
            primary_lang: "und",
            confidence: 0.0,
        };
    }

    let ascii_ratio = stats.ascii_letters as f64 / stats.total_letters as f64;

    let mut signal = if stats.total_letters >= 40 && ascii_ratio >= 0.85 {
        LanguageSignal {
            primary_lang: "en",
            confidence: ascii_ratio,
        }
    } else {
        LanguageSignal {
            primary_lang: "und",
            confidence: 0.0,
        }
    };

    if truncated.len() > 60 && stats.total_letters >= 60 {
        let lower = truncated.to_lowercase();
        let scores: Vec<(&str, u32)> = ["en", "es", "fr", "de"]
            .iter()
            .map(|lang| (*lang, score_language(&lower, lang)))
            .collect();

        let en_score = scores.iter().find(|(l, _)| *l == "en").map(|(_, s)| *s).unwrap_or(0);
        let (best_lang, best_score) = scores
            .iter()
            .copied()
            .max_by_key(|(_, s)| *s)
            .unwrap_or(("und", 0));

        let mut chosen_lang = best_lang;
        if best_lang != "en" && ascii_ratio >= 0.85 && en_score + 2 >= best_score {
            chosen_lang = "en";
        }

        let total_score: u32 = scores.iter().map(|(_, s)| *s).sum::<u32>().max(1);
        let chosen_score = if chosen_lang == best_lang {
            best_score
        } else {
            en_score
        };
        let lang_confidence = chosen_score as f64 / total_score as f64;

        let accept = if chosen_lang == "en" {
            lang_confidence >= 0.40
        } else {
            lang_confidence >= 0.50
        };

        if accept {
            signal = LanguageSignal {
                primary_lang: lang_to_static(chosen_lang),
                confidence: lang_confidence,
            };
        }
    }

    if enable_advanced && truncated.chars().count() >= 40 {
        // Stand-in probabilistic detector: reuse the trigram pass's best
        // guess (computed above when eligible) as the "detector" output;
        // when the sample was too short for the trigram pass, fall back to
        // the ASCII heuristic's own guess.
        let detector_confidence = signal.confidence.max(ascii_ratio * 0.5);
        signal.confidence = (ascii_ratio + detector_confidence) / 2.0;
    }

    signal
}

fn lang_to_static(lang: &str) -> &'static str {
    match lang {
        "en" => "en",
        "es" => "es",
        "fr" => "fr",
        "de" => "de",
        _ => "und",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sample_is_undetermined() {
        let signal = detect_language("", false);
        assert_eq!(signal.primary_lang, "und");
        assert_eq!(signal.confidence, 0.0);
    }

    #[test]
    fn short_ascii_sample_below_threshold_stays_undetermined() {
        let signal = detect_language("hi there", false);
        assert_eq!(signal.primary_lang, "und");
    }

    #[test]
    fn long_ascii_sample_without_trigram_matches_is_english() {
        let sample = "z".repeat(50);
        let signal = detect_language(&sample, false);
        assert_eq!(signal.primary_lang, "en");
    }

    #[test]
    fn german_heavy_sample_is_detected_via_trigrams() {
        let sample = "Die Entwicklung und das Verständnis der deutschen Sprache ist eine Herausforderung und ein schönes Ding, das schöne Licht scheint.".repeat(2);
        let signal = detect_language(&sample, false);
        assert_eq!(signal.primary_lang, "de");
    }
}
