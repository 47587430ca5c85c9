//! Best-seller discovery: link map → completion-picked URL → product list.
//!
//! Every failure below the entry points degrades to a [`BestSellerResolution`]
//! with no URL (or no products). Nothing here returns an error to the caller.

use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::completion::{parse_completion_json, CompletionRequest, CompletionService};
use crate::error::ScrapeError;
use crate::links::{map_internal_links, page_origin};
use crate::page::{goto_with_retry, NavigationPolicy, Page};
use crate::products::extract_products;
use crate::types::{BestSellerResolution, CategorizedLinks, KeyPageUrls};

pub(crate) const KEY_PAGES_SCHEMA_NAME: &str = "key_page_urls";

fn key_pages_schema() -> Value {
    let url = json!({ "type": ["string", "null"] });
    json!({
        "type": "object",
        "properties": {
            "bestSellersUrl": url,
            "contactUrl": url,
            "faqUrl": url
        },
        "required": ["bestSellersUrl", "contactUrl", "faqUrl"],
        "additionalProperties": false
    })
}

fn key_pages_prompt(links_json: &str) -> String {
    format!(
        "You are given every internal link of an online store, grouped by category, as JSON.\n\
         Pick the single URL most likely to list the store's best-selling products \
         (for example \"best sellers\", \"bestsellers\", \"top rated\", \"most popular\", \
         or the main shop-all collection when nothing better exists). Also pick the \
         contact page and the FAQ page.\n\
         Only use URLs that appear in the list. Use null for anything you cannot \
         identify with confidence.\n\n\
         LINKS:\n{links_json}"
    )
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawKeyPages {
    #[serde(default)]
    best_sellers_url: Option<Value>,
    #[serde(default)]
    contact_url: Option<Value>,
    #[serde(default)]
    faq_url: Option<Value>,
}

/// Resolves a candidate against the store origin. Non-strings, empty strings,
/// unparseable values and URLs on another origin are treated as absent.
fn resolve_candidate(candidate: Option<&Value>, origin: &Url) -> Option<String> {
    let raw = candidate?.as_str()?.trim();
    if raw.is_empty() {
        return None;
    }
    let resolved = match origin.join(raw) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!(candidate = raw, error = %e, "ignoring unparseable key page URL");
            return None;
        }
    };
    if resolved.origin() != origin.origin() {
        tracing::debug!(candidate = raw, origin = %origin, "ignoring off-origin key page URL");
        return None;
    }
    Some(resolved.to_string())
}

/// Parses the key-page completion payload.
///
/// # Errors
///
/// Returns [`ScrapeError::MalformedCompletion`] when the payload is not a
/// JSON object.
pub fn parse_key_pages(raw: &str, origin: &Url) -> Result<KeyPageUrls, ScrapeError> {
    let parsed: RawKeyPages = parse_completion_json(raw, KEY_PAGES_SCHEMA_NAME)?;
    Ok(KeyPageUrls {
        best_sellers_url: resolve_candidate(parsed.best_sellers_url.as_ref(), origin),
        contact_url: resolve_candidate(parsed.contact_url.as_ref(), origin),
        faq_url: resolve_candidate(parsed.faq_url.as_ref(), origin),
    })
}

/// Asks the completion service to pick the best-sellers, contact and FAQ
/// pages from the full link map.
///
/// # Errors
///
/// Returns completion transport failures and malformed payloads.
pub async fn resolve_key_pages(
    completion: &dyn CompletionService,
    links: &CategorizedLinks,
    origin: &Url,
) -> Result<KeyPageUrls, ScrapeError> {
    let links_json = serde_json::to_string_pretty(links)
        .map_err(|e| ScrapeError::Completion(format!("could not serialize link map: {e}")))?;
    let request = CompletionRequest::new(key_pages_prompt(&links_json))
        .with_schema(KEY_PAGES_SCHEMA_NAME, key_pages_schema());
    let raw = completion.complete(request).await?.into_text()?;
    parse_key_pages(&raw, origin)
}

/// Runs best-seller discovery on the page as it is currently loaded.
///
/// The internal-link map is always returned. A missing or unparseable
/// best-sellers answer yields `best_sellers_url: None`; a failure while
/// extracting products keeps the URL and returns no products.
pub async fn extract_best_sellers<P>(
    page: &mut P,
    completion: &dyn CompletionService,
    policy: &NavigationPolicy,
) -> BestSellerResolution
where
    P: Page + ?Sized,
{
    let (origin, links) = match map_current_page(page).await {
        Ok(mapped) => mapped,
        Err(e) => {
            tracing::warn!(error = %e, "could not map links on current page");
            return BestSellerResolution::unresolved(CategorizedLinks::default());
        }
    };

    let key_pages = match resolve_key_pages(completion, &links, &origin).await {
        Ok(key_pages) => key_pages,
        Err(e) => {
            tracing::warn!(origin = %origin, error = %e, "best sellers page could not be resolved");
            return BestSellerResolution::unresolved(links);
        }
    };

    let Some(best_sellers_url) = key_pages.best_sellers_url else {
        tracing::info!(origin = %origin, "no best sellers page identified");
        return BestSellerResolution {
            contact_url: key_pages.contact_url,
            faq_url: key_pages.faq_url,
            ..BestSellerResolution::unresolved(links)
        };
    };

    let products = match extract_products(page, completion, &best_sellers_url, policy).await {
        Ok(products) => products,
        Err(e) => {
            tracing::warn!(url = %best_sellers_url, error = %e, "product extraction failed");
            Vec::new()
        }
    };

    tracing::info!(
        url = %best_sellers_url,
        products = products.len(),
        links = links.len(),
        "best sellers resolved"
    );

    BestSellerResolution {
        best_sellers_url: Some(best_sellers_url),
        contact_url: key_pages.contact_url,
        faq_url: key_pages.faq_url,
        products,
        internal_links: links,
    }
}

/// Navigates to `url` first, then runs [`extract_best_sellers`].
///
/// A navigation failure (after the policy's retries) degrades to the
/// unresolved result with an empty link map.
pub async fn extract_best_sellers_at<P>(
    page: &mut P,
    url: &str,
    completion: &dyn CompletionService,
    policy: &NavigationPolicy,
) -> BestSellerResolution
where
    P: Page + ?Sized,
{
    if let Err(e) = goto_with_retry(page, url, policy).await {
        tracing::warn!(url, error = %e, "navigation to storefront failed");
        return BestSellerResolution::unresolved(CategorizedLinks::default());
    }
    extract_best_sellers(page, completion, policy).await
}

async fn map_current_page<P>(page: &P) -> Result<(Url, CategorizedLinks), ScrapeError>
where
    P: Page + ?Sized,
{
    let url = page.url().await?;
    let origin = page_origin(&url)?;
    let html = page.content().await?;
    let links = map_internal_links(&html, &origin);
    Ok((origin, links))
}
