//! Brand brief aggregation: concurrent branch fan-out over one scraped page.
//!
//! Every field of [`AggregatedBrandResult`] is always populated. A branch
//! that fails contributes a sentinel instead of a value, and the sentinel
//! wording records why ([`FallbackReason`]).

mod branches;
pub mod fonts;
pub mod icons;
mod orchestrator;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::images::AlbumImage;

pub use fonts::FontUsage;
pub use orchestrator::{scrape_brand_brief, BrandBriefServices, BriefSettings};

/// Why a field carries a sentinel instead of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    Error,
    AccessRestricted,
}

impl FallbackReason {
    #[must_use]
    pub fn sentinel(self) -> &'static str {
        match self {
            FallbackReason::Error => "Not available due to an error",
            FallbackReason::AccessRestricted => "Not available due to access restrictions",
        }
    }
}

/// A field value, or the sentinel text that replaced it. Serializes as the
/// bare value or the bare string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue<T> {
    Available(T),
    Unavailable(String),
}

impl<T> FieldValue<T> {
    #[must_use]
    pub fn unavailable(reason: FallbackReason) -> Self {
        FieldValue::Unavailable(reason.sentinel().to_owned())
    }

    #[must_use]
    pub fn as_available(&self) -> Option<&T> {
        match self {
            FieldValue::Available(value) => Some(value),
            FieldValue::Unavailable(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandNarrative {
    pub brand_name: String,
    pub brand_summary: String,
    pub tone_of_voice: String,
    pub target_audience: String,
    pub value_proposition: String,
}

impl BrandNarrative {
    /// Every narrative field set to the sentinel for `reason`.
    #[must_use]
    pub fn unavailable(reason: FallbackReason) -> Self {
        let text = reason.sentinel().to_owned();
        Self {
            brand_name: text.clone(),
            brand_summary: text.clone(),
            tone_of_voice: text.clone(),
            target_audience: text.clone(),
            value_proposition: text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Benefit {
    pub title: String,
    pub description: String,
    pub icon: String,
}

/// Merged output of one brand-brief run. Fields appear in branch order:
/// narrative, benefits, deliverability snippet, template imagery, fonts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedBrandResult {
    pub url: String,
    pub scraped_at: DateTime<Utc>,
    #[serde(flatten)]
    pub narrative: BrandNarrative,
    pub benefits: FieldValue<Vec<Benefit>>,
    pub deliverability_snippet: String,
    pub template_images: FieldValue<Vec<AlbumImage>>,
    pub font_usage: FieldValue<Vec<FontUsage>>,
    /// Branches that fell back to a sentinel, in branch order.
    pub failed_branches: Vec<String>,
}

impl AggregatedBrandResult {
    /// The all-sentinel result used when the page itself could not be scraped.
    #[must_use]
    pub fn unavailable(url: &str, reason: FallbackReason) -> Self {
        Self {
            url: url.to_owned(),
            scraped_at: Utc::now(),
            narrative: BrandNarrative::unavailable(reason),
            benefits: FieldValue::unavailable(reason),
            deliverability_snippet: reason.sentinel().to_owned(),
            template_images: FieldValue::unavailable(reason),
            font_usage: FieldValue::unavailable(reason),
            failed_branches: branches::BRANCH_NAMES.iter().map(|b| (*b).to_owned()).collect(),
        }
    }
}
