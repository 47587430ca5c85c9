//! In-memory document helpers shared by page backends that hold HTML text.

use scraper::{Html, Selector};

/// Removes every element matching any selector and re-serializes the document.
///
/// Invalid selectors are skipped with a warning. Returns the new HTML and the
/// number of elements removed.
pub(crate) fn remove_matching(html: &str, selectors: &[&str]) -> (String, usize) {
    let mut document = Html::parse_document(html);

    let mut ids = Vec::new();
    for raw in selectors {
        let selector = match Selector::parse(raw) {
            Ok(selector) => selector,
            Err(e) => {
                tracing::warn!(selector = *raw, error = %e, "skipping invalid selector");
                continue;
            }
        };
        ids.extend(document.select(&selector).map(|el| el.id()));
    }

    let mut removed = 0usize;
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            // a node nested in an already-removed subtree still detaches cleanly
            node.detach();
            removed += 1;
        }
    }

    (document.html(), removed)
}

/// Outer HTML of `<body>`, or the whole document when there is none.
pub(crate) fn body_of(html: &str) -> String {
    let document = Html::parse_document(html);
    let selector = Selector::parse("body").expect("valid body selector");
    document
        .select(&selector)
        .next()
        .map_or_else(|| document.html(), |body| body.html())
}
