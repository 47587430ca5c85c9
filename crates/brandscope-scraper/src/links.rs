//! Internal link mapping for storefront pages.
//!
//! Walks every `<a href>` on a page, keeps same-origin links, deduplicates by
//! absolute URL and assigns each link to exactly one [`LinkCategory`] using an
//! ordered rule table. The first matching rule wins, so a product page living
//! under an "about" path is still a product.

use std::collections::HashSet;
use std::sync::LazyLock;

use reqwest::Url;
use scraper::{Html, Selector};

use crate::error::ScrapeError;
use crate::types::{CategorizedLinks, LinkCategory, LinkRecord};

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid anchor selector"));

/// One row of the classification cascade.
///
/// `keywords` are matched against the lowercase path, query and anchor text;
/// `text_phrases` only against the anchor text.
#[derive(Debug)]
pub struct CategoryRule {
    pub category: LinkCategory,
    pub keywords: &'static [&'static str],
    pub text_phrases: &'static [&'static str],
}

/// Classification precedence. Order is significant.
pub const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        category: LinkCategory::Products,
        keywords: &["product", "products"],
        text_phrases: &[],
    },
    CategoryRule {
        category: LinkCategory::About,
        keywords: &["about", "contact", "support", "help"],
        text_phrases: &["about us", "our story", "contact us"],
    },
    CategoryRule {
        category: LinkCategory::Legal,
        keywords: &["legal", "terms", "privacy"],
        text_phrases: &[],
    },
    CategoryRule {
        category: LinkCategory::Collections,
        keywords: &["collection", "collections"],
        text_phrases: &[],
    },
    CategoryRule {
        category: LinkCategory::Blog,
        keywords: &["blog", "news"],
        text_phrases: &[],
    },
    CategoryRule {
        category: LinkCategory::Account,
        keywords: &["account", "login", "signup"],
        text_phrases: &["sign up"],
    },
];

impl CategoryRule {
    fn matches(&self, path: &str, query: &str, text: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| path.contains(k) || query.contains(k) || text.contains(k))
            || self.text_phrases.iter().any(|p| text.contains(p))
    }
}

/// Assigns a category from lowercase path, query and anchor text.
#[must_use]
pub fn classify(path: &str, query: &str, text: &str) -> LinkCategory {
    CATEGORY_RULES
        .iter()
        .find(|rule| rule.matches(path, query, text))
        .map_or(LinkCategory::Other, |rule| rule.category)
}

/// Parses `page_url` and returns its origin as a base for link resolution.
///
/// # Errors
///
/// Returns [`ScrapeError::InvalidUrl`] when `page_url` is not an absolute
/// hierarchical URL.
pub fn page_origin(page_url: &str) -> Result<Url, ScrapeError> {
    let parsed = Url::parse(page_url).map_err(|e| ScrapeError::InvalidUrl {
        url: page_url.to_owned(),
        reason: e.to_string(),
    })?;
    if !parsed.origin().is_tuple() {
        return Err(ScrapeError::InvalidUrl {
            url: page_url.to_owned(),
            reason: "URL has no scheme/host origin".to_owned(),
        });
    }
    let origin = parsed.origin().ascii_serialization();
    Url::parse(&origin).map_err(|e| ScrapeError::InvalidUrl {
        url: page_url.to_owned(),
        reason: e.to_string(),
    })
}

/// Builds the categorized internal-link map for a rendered page.
///
/// Malformed hrefs and cross-origin links are skipped; the first occurrence
/// of each absolute URL wins. Buckets are sorted by path (stable, so ties keep
/// document order) which makes repeated runs over the same HTML identical.
#[must_use]
pub fn map_internal_links(html: &str, origin: &Url) -> CategorizedLinks {
    let document = Html::parse_document(html);
    let mut seen: HashSet<String> = HashSet::new();
    let mut links = CategorizedLinks::default();

    for anchor in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = anchor.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty() {
            continue;
        }

        let resolved = match origin.join(href) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!(href, error = %e, "skipping unparseable link");
                continue;
            }
        };

        if resolved.origin() != origin.origin() {
            continue;
        }

        let absolute_url = resolved.to_string();
        if !seen.insert(absolute_url.clone()) {
            continue;
        }

        let text = anchor
            .text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let path = resolved.path().to_lowercase();
        let query = resolved.query().unwrap_or_default().to_lowercase();

        let category = classify(&path, &query, &text);
        links.bucket_mut(category).push(LinkRecord {
            absolute_url,
            path: resolved.path().to_owned(),
        });
    }

    for category in LinkCategory::ALL {
        links.bucket_mut(category).sort_by(|a, b| a.path.cmp(&b.path));
    }

    tracing::debug!(
        origin = %origin,
        total = links.len(),
        "mapped internal links"
    );

    links
}
