use url::Url;

/// Classification of an `<a href>`: internal if same host,
/// root-relative, or protocol-relative with the same host; external
/// otherwise. Fragment-only and `javascript:`/`mailto:`/`tel:` links are
/// ignored entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkClass {
    Internal,
    External,
    Ignored,
}

pub fn classify(href: &str, page_url: &Url) -> LinkClass {
    let trimmed = href.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return LinkClass::Ignored;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("javascript:") || lower.starts_with("mailto:") || lower.starts_with("tel:")
    {
        return LinkClass::Ignored;
    }

    // Root-relative ("/path") or protocol-relative ("//host/path") hrefs
    // resolve against the page's own scheme/host.
    if let Some(rest) = trimmed.strip_prefix("//") {
        let host_part = rest.split(['/', '?', '#']).next().unwrap_or("");
        return if Some(host_part) == page_url.host_str() {
            LinkClass::Internal
        } else {
            LinkClass::External
        };
    }
    if trimmed.starts_with('/') {
        return LinkClass::Internal;
    }

    match Url::parse(trimmed) {
        Ok(absolute) => {
            if absolute.host_str() == page_url.host_str() {
                LinkClass::Internal
            } else {
                LinkClass::External
            }
        }
        Err(_) => match page_url.join(trimmed) {
            Ok(resolved) => {
                if resolved.host_str() == page_url.host_str() {
                    LinkClass::Internal
                } else {
                    LinkClass::External
                }
            }
            Err(_) => LinkClass::Ignored,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://example.com/articles/one").unwrap()
    }

    #[test]
    fn root_relative_is_internal() {
        assert_eq!(classify("/about", &page()), LinkClass::Internal);
    }

    #[test]
    fn same_host_absolute_is_internal() {
        assert_eq!(
            classify("https://example.com/contact", &page()),
            LinkClass::Internal
        );
    }

    #[test]
    fn different_host_is_external() {
        assert_eq!(classify("https://other.com/x", &page()), LinkClass::External);
    }

    #[test]
    fn protocol_relative_same_host_is_internal() {
        assert_eq!(classify("//example.com/x", &page()), LinkClass::Internal);
    }

    #[test]
    fn protocol_relative_other_host_is_external() {
        assert_eq!(classify("//other.com/x", &page()), LinkClass::External);
    }

    #[test]
    fn fragment_only_is_ignored() {
        assert_eq!(classify("#section", &page()), LinkClass::Ignored);
    }

    #[test]
    fn mailto_and_javascript_are_ignored() {
        assert_eq!(classify("mailto:a@example.com", &page()), LinkClass::Ignored);
        assert_eq!(classify("javascript:void(0)", &page()), LinkClass::Ignored);
        assert_eq!(classify("tel:+15555550100", &page()), LinkClass::Ignored);
    }

    #[test]
    fn relative_path_resolves_against_page_url() {
        assert_eq!(classify("two", &page()), LinkClass::Internal);
    }
}
