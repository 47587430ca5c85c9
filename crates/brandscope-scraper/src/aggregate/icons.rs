//! Keyword catalog mapping benefit copy to an email icon name.

/// Icon used when no catalog entry matches.
pub const DEFAULT_ICON: &str = "star";

/// `(icon, keywords)` rows, checked in order; first row with a keyword
/// contained in the lowercase benefit text wins.
pub const ICON_CATALOG: &[(&str, &[&str])] = &[
    ("truck", &["shipping", "delivery", "deliver", "ship "]),
    ("refresh", &["return", "exchange", "refund"]),
    ("shield", &["guarantee", "warranty", "secure", "safe", "protect"]),
    ("leaf", &["natural", "organic", "plant", "vegan", "eco", "sustainab"]),
    ("heart", &["health", "wellness", "care", "love"]),
    ("clock", &["fast", "quick", "same-day", "24/7"]),
    ("dollar", &["price", "afford", "save", "discount", "value"]),
    ("gift", &["gift", "reward", "bonus", "free"]),
    ("users", &["community", "support", "customer", "team"]),
    ("award", &["quality", "award", "premium", "certified", "craft"]),
];

/// Picks an icon for a benefit from its title and description.
#[must_use]
pub fn match_icon(title: &str, description: &str) -> &'static str {
    let text = format!("{title} {description} ").to_lowercase();
    ICON_CATALOG
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map_or(DEFAULT_ICON, |(icon, _)| icon)
}
