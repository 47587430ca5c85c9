//! Font-family ranking from a page's inline styles and `<style>` blocks.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;

static FONT_FAMILY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)font-family\s*:\s*([^;}]+)"#).expect("valid font-family regex")
});

static STYLED_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[style]").expect("valid style attribute selector"));

static STYLE_BLOCK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("style").expect("valid style element selector"));

/// Maximum number of families reported.
pub const MAX_FONTS: usize = 10;

const CSS_KEYWORDS: &[&str] = &["inherit", "initial", "unset", "revert", "revert-layer"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FontUsage {
    pub family: String,
    pub count: usize,
}

/// Counts the primary family of every `font-family` declaration, most used
/// first (ties by name).
#[must_use]
pub fn rank_fonts(html: &str) -> Vec<FontUsage> {
    let document = Html::parse_document(html);
    let mut counts: HashMap<String, usize> = HashMap::new();

    let inline = document
        .select(&STYLED_SELECTOR)
        .filter_map(|el| el.value().attr("style"))
        .map(str::to_owned);
    let blocks = document
        .select(&STYLE_BLOCK_SELECTOR)
        .map(|el| el.text().collect::<String>());

    for css in inline.chain(blocks) {
        for caps in FONT_FAMILY_RE.captures_iter(&css) {
            if let Some(family) = primary_family(&caps[1]) {
                *counts.entry(family).or_default() += 1;
            }
        }
    }

    let mut ranked: Vec<FontUsage> = counts
        .into_iter()
        .map(|(family, count)| FontUsage { family, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.family.cmp(&b.family)));
    ranked.truncate(MAX_FONTS);
    ranked
}

fn primary_family(declaration: &str) -> Option<String> {
    let first = declaration.split(',').next()?;
    let family = first
        .replace("!important", "")
        .trim()
        .trim_matches(['"', '\''])
        .trim()
        .to_owned();
    if family.is_empty()
        || family.starts_with("var(")
        || CSS_KEYWORDS.contains(&family.to_ascii_lowercase().as_str())
    {
        return None;
    }
    Some(family)
}
