//! The individual brand-brief branches.
//!
//! Each branch is an owned `'static` future so the orchestrator can run it
//! as its own task; a branch only reports `Err` and never substitutes its
//! own fallback.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use super::fonts::{rank_fonts, FontUsage};
use super::icons::match_icon;
use super::{Benefit, BrandNarrative};
use crate::completion::{parse_completion_json, CompletionRequest, CompletionService, PromptImage};
use crate::error::ScrapeError;
use crate::images::{AlbumImage, ImageLookup};

pub(crate) const NARRATIVE: &str = "narrative";
pub(crate) const BENEFITS: &str = "benefits";
pub(crate) const DELIVERABILITY_SNIPPET: &str = "deliverabilitySnippet";
pub(crate) const TEMPLATE_IMAGES: &str = "templateImages";
pub(crate) const FONT_USAGE: &str = "fontUsage";

/// Merge order of the fan-out.
pub(crate) const BRANCH_NAMES: [&str; 5] = [
    NARRATIVE,
    BENEFITS,
    DELIVERABILITY_SNIPPET,
    TEMPLATE_IMAGES,
    FONT_USAGE,
];

pub(crate) const NARRATIVE_SCHEMA_NAME: &str = "brand_narrative";
pub(crate) const BENEFITS_SCHEMA_NAME: &str = "brand_benefits";
pub(crate) const SNIPPET_SCHEMA_NAME: &str = "deliverability_snippet";

pub(crate) const MAX_BENEFITS: usize = 4;
pub(crate) const MAX_TEMPLATE_IMAGES: usize = 6;

/// Page text beyond this many characters is not sent to the completion
/// service.
const MAX_PROMPT_TEXT_CHARS: usize = 20_000;

/// What the branches share: the scraped page, read-only.
#[derive(Debug)]
pub(crate) struct ScrapedPage {
    pub url: String,
    pub html: String,
    pub text: String,
    pub screenshot: Option<Vec<u8>>,
}

fn clipped(text: &str) -> &str {
    match text.char_indices().nth(MAX_PROMPT_TEXT_CHARS) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

fn string_schema(fields: &[&str]) -> Value {
    let properties: serde_json::Map<String, Value> = fields
        .iter()
        .map(|f| ((*f).to_owned(), json!({ "type": "string" })))
        .collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": fields,
        "additionalProperties": false
    })
}

pub(crate) async fn narrative(
    completion: Arc<dyn CompletionService>,
    page: Arc<ScrapedPage>,
) -> Result<BrandNarrative, ScrapeError> {
    let prompt = format!(
        "Read the storefront below ({url}) and describe the brand.\n\
         Return brandName, a two or three sentence brandSummary, the toneOfVoice, \
         the targetAudience and the core valueProposition. Base every answer on the \
         page; do not invent facts.\n\nPAGE TEXT:\n{text}",
        url = page.url,
        text = clipped(&page.text),
    );
    let mut request = CompletionRequest::new(prompt).with_schema(
        NARRATIVE_SCHEMA_NAME,
        string_schema(&[
            "brandName",
            "brandSummary",
            "toneOfVoice",
            "targetAudience",
            "valueProposition",
        ]),
    );
    if let Some(png) = &page.screenshot {
        request = request.with_image(PromptImage {
            media_type: "image/png".to_owned(),
            bytes: png.clone(),
        });
    }

    let raw = completion.complete(request).await?.into_text()?;
    let narrative: BrandNarrative = parse_completion_json(&raw, NARRATIVE_SCHEMA_NAME)?;
    if narrative.brand_name.trim().is_empty() {
        return Err(ScrapeError::MalformedCompletion {
            context: NARRATIVE_SCHEMA_NAME.to_owned(),
            reason: "empty brandName".to_owned(),
            raw,
        });
    }
    Ok(narrative)
}

#[derive(Debug, Deserialize)]
struct RawBenefits {
    #[serde(default)]
    benefits: Vec<RawBenefit>,
}

#[derive(Debug, Deserialize)]
struct RawBenefit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

pub(crate) async fn benefits(
    completion: Arc<dyn CompletionService>,
    page: Arc<ScrapedPage>,
) -> Result<Vec<Benefit>, ScrapeError> {
    let prompt = format!(
        "From the storefront text below, list up to {MAX_BENEFITS} customer benefits the \
         brand promises (for example shipping, returns, materials, guarantees). Give each \
         a short title (max 5 words) and a one sentence description taken from the page.\
         \n\nPAGE TEXT:\n{text}",
        text = clipped(&page.text),
    );
    let schema = json!({
        "type": "object",
        "properties": {
            "benefits": {
                "type": "array",
                "items": string_schema(&["title", "description"])
            }
        },
        "required": ["benefits"],
        "additionalProperties": false
    });
    let request = CompletionRequest::new(prompt).with_schema(BENEFITS_SCHEMA_NAME, schema);

    let raw = completion.complete(request).await?.into_text()?;
    let parsed: RawBenefits = parse_completion_json(&raw, BENEFITS_SCHEMA_NAME)?;

    let benefits: Vec<Benefit> = parsed
        .benefits
        .into_iter()
        .filter(|b| !b.title.trim().is_empty())
        .take(MAX_BENEFITS)
        .map(|b| {
            let icon = match_icon(&b.title, &b.description).to_owned();
            Benefit {
                title: b.title.trim().to_owned(),
                description: b.description.trim().to_owned(),
                icon,
            }
        })
        .collect();

    if benefits.is_empty() {
        return Err(ScrapeError::MalformedCompletion {
            context: BENEFITS_SCHEMA_NAME.to_owned(),
            reason: "no usable benefits".to_owned(),
            raw,
        });
    }
    Ok(benefits)
}

#[derive(Debug, Deserialize)]
struct RawSnippet {
    #[serde(default)]
    snippet: String,
}

pub(crate) async fn deliverability_snippet(
    completion: Arc<dyn CompletionService>,
    page: Arc<ScrapedPage>,
) -> Result<String, ScrapeError> {
    let prompt = format!(
        "Write one plain-text email preheader (at most 90 characters) for this brand. \
         Avoid spam trigger words, ALL CAPS, and excessive punctuation.\
         \n\nPAGE TEXT:\n{text}",
        text = clipped(&page.text),
    );
    let request = CompletionRequest::new(prompt)
        .with_schema(SNIPPET_SCHEMA_NAME, string_schema(&["snippet"]));

    let raw = completion.complete(request).await?.into_text()?;
    let parsed: RawSnippet = parse_completion_json(&raw, SNIPPET_SCHEMA_NAME)?;
    let snippet = parsed.snippet.trim();
    if snippet.is_empty() {
        return Err(ScrapeError::MalformedCompletion {
            context: SNIPPET_SCHEMA_NAME.to_owned(),
            reason: "empty snippet".to_owned(),
            raw,
        });
    }
    Ok(snippet.to_owned())
}

/// Album images for email templates: landscape first, at most
/// [`MAX_TEMPLATE_IMAGES`].
pub(crate) async fn template_images(
    images: Option<Arc<dyn ImageLookup>>,
    album_id: Option<String>,
) -> Result<Vec<AlbumImage>, ScrapeError> {
    let Some(images) = images else {
        return Err(ScrapeError::NotConfigured("image lookup service"));
    };
    let Some(album_id) = album_id else {
        return Err(ScrapeError::NotConfigured("image album id"));
    };

    let mut listed = images.list_album_images(&album_id).await?;
    // stable: album order is kept within each orientation
    listed.sort_by_key(|image| !image.is_landscape());
    listed.truncate(MAX_TEMPLATE_IMAGES);
    Ok(listed)
}

pub(crate) fn font_usage(page: &ScrapedPage) -> Vec<FontUsage> {
    rank_fonts(&page.html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clipping_respects_char_boundaries() {
        let text = "é".repeat(MAX_PROMPT_TEXT_CHARS + 10);
        assert_eq!(clipped(&text).chars().count(), MAX_PROMPT_TEXT_CHARS);
        assert_eq!(clipped("short"), "short");
    }

    #[test]
    fn string_schema_requires_every_field() {
        let schema = string_schema(&["a", "b"]);
        assert_eq!(schema["required"], json!(["a", "b"]));
        assert_eq!(schema["properties"]["b"]["type"], "string");
    }
}
