//! Parses HTML into the structural signals scoring depends on: heading
//! counts, internal/external link ratio, and a primary-language guess.

pub mod lang;
pub mod links;

use lang::{detect_language, SAMPLE_CAP_BYTES};
use links::{classify, LinkClass};
use scraper::{Html, Node};
use url::Url;

const SKIP_TAGS: &[&str] = &["script", "style", "noscript", "head", "meta", "title"];

#[derive(Debug, Clone)]
pub struct StructuralSignals {
    pub h1_count: u32,
    pub link_internal_count: u32,
    pub link_external_count: u32,
    pub link_internal_ratio: f64,
    pub primary_lang: String,
    pub lang_confidence: f64,
}

pub struct ExtractOptions {
    pub enable_advanced_lang_detect: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            enable_advanced_lang_detect: false,
        }
    }
}

/// A single walk of the parsed DOM, accumulating heading counts, link
/// classifications, and a text sample for language detection.
pub fn extract(html: &str, final_url: &Url, options: &ExtractOptions) -> StructuralSignals {
    let document = Html::parse_document(html);

    let mut h1_count: u32 = 0;
    let mut link_internal_count: u32 = 0;
    let mut link_external_count: u32 = 0;
    let mut sample = String::new();

    for node_ref in document.tree.root().descendants() {
        match node_ref.value() {
            Node::Element(element) => {
                let tag = element.name();
                if tag.eq_ignore_ascii_case("h1") {
                    h1_count += 1;
                } else if tag.eq_ignore_ascii_case("a") {
                    if let Some(href) = element.attr("href") {
                        match classify(href, final_url) {
                            LinkClass::Internal => link_internal_count += 1,
                            LinkClass::External => link_external_count += 1,
                            LinkClass::Ignored => {}
                        }
                    }
                }
            }
            Node::Text(text) => {
                if sample.len() >= SAMPLE_CAP_BYTES {
                    continue;
                }
                let under_skip_subtree = node_ref.ancestors().any(|ancestor| {
                    matches!(
                        ancestor.value(),
                        Node::Element(el) if SKIP_TAGS.iter().any(|t| el.name().eq_ignore_ascii_case(t))
                    )
                });
                if !under_skip_subtree {
                    sample.push_str(text);
                    sample.push(' ');
                    if sample.len() > SAMPLE_CAP_BYTES {
                        sample.truncate(SAMPLE_CAP_BYTES);
                    }
                }
            }
            _ => {}
        }
    }

    let link_internal_ratio = if link_internal_count + link_external_count > 0 {
        link_internal_count as f64 / (link_internal_count + link_external_count) as f64
    } else {
        0.0
    };

    let lang_signal = detect_language(&sample, options.enable_advanced_lang_detect);

    StructuralSignals {
        h1_count,
        link_internal_count,
        link_external_count,
        link_internal_ratio,
        primary_lang: lang_signal.primary_lang.to_string(),
        lang_confidence: lang_signal.confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_h1_and_classifies_links() {
        let html = r#"
            <html><head><title>ignored text here</title></head>
            <body>
                <h1>Heading One</h1>
                <h1>Heading Two</h1>
                <a href="/internal">in</a>
                <a href="https://other.com/x">out</a>
                <a href="#top">frag</a>
                <script>var x = "ignore me";</script>
            </body></html>
        "#;
        let url = Url::parse("https://example.com/page").unwrap();
        let signals = extract(html, &url, &ExtractOptions::default());
        assert_eq!(signals.h1_count, 2);
        assert_eq!(signals.link_internal_count, 1);
        assert_eq!(signals.link_external_count, 1);
        assert!((signals.link_internal_ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn no_links_gives_zero_ratio_not_nan() {
        let html = "<html><body><p>no links here</p></body></html>";
        let url = Url::parse("https://example.com/page").unwrap();
        let signals = extract(html, &url, &ExtractOptions::default());
        assert_eq!(signals.link_internal_ratio, 0.0);
    }

    #[test]
    fn script_and_style_text_excluded_from_sample() {
        // A script body alone, long enough to trip the ascii heuristic if
        // mistakenly counted, must not flip primary_lang away from "und".
        let html = "<html><body><script>aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa</script></body></html>";
        let url = Url::parse("https://example.com/page").unwrap();
        let signals = extract(html, &url, &ExtractOptions::default());
        assert_eq!(signals.primary_lang, "und");
    }
}
