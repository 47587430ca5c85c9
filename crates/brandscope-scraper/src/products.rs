//! Product-list extraction from a best-sellers page.
//!
//! The page is cleaned of navigation chrome, flattened with
//! [`html_to_text`], and handed to the completion service with an array
//! schema. Whatever comes back is treated as untrusted: each record is
//! validated and normalized here before it reaches a caller.

use serde_json::{json, Value};

use crate::completion::{parse_completion_json, CompletionRequest, CompletionService};
use crate::error::ScrapeError;
use crate::normalize::html_to_text;
use crate::page::{goto_with_retry, NavigationPolicy, Page, ResourceKind};
use crate::types::{ProductRecord, MAX_PRODUCTS, NOT_AVAILABLE};

pub(crate) const PRODUCTS_SCHEMA_NAME: &str = "best_seller_products";

/// Elements stripped before the body is flattened.
const NOISE_SELECTORS: &[&str] = &[
    "header", "footer", "nav", "script", "style", "meta", "link", "noscript",
];

fn products_schema() -> Value {
    json!({
        "type": "array",
        "maxItems": MAX_PRODUCTS,
        "items": {
            "type": "object",
            "properties": {
                "productName": { "type": "string" },
                "productURL": { "type": "string" },
                "productPrice": { "type": "string" },
                "productImgUrl": { "type": "string" }
            },
            "required": ["productName", "productURL", "productPrice", "productImgUrl"],
            "additionalProperties": false
        }
    })
}

fn products_prompt(page_text: &str) -> String {
    format!(
        "Below is the text of an online store's best sellers page. Links appear as \
         [text](url) and images as ![alt](src).\n\n\
         List up to {MAX_PRODUCTS} products that are genuinely shown on the page. If fewer \
         than {MAX_PRODUCTS} real products are present, return only those; never invent \
         entries to reach {MAX_PRODUCTS}.\n\
         For each product give productName, productURL, productPrice and productImgUrl. \
         Copy product and image URLs exactly as they appear, including any query \
         parameters. Use an empty string for a price or image that is not shown.\n\n\
         PAGE TEXT:\n{page_text}"
    )
}

/// Navigates `page` to `url` and extracts up to [`MAX_PRODUCTS`] validated
/// product records.
///
/// # Errors
///
/// Returns the first navigation, page, completion or top-level parsing
/// failure. Individual bad records are dropped, not reported.
pub async fn extract_products<P>(
    page: &mut P,
    completion: &dyn CompletionService,
    url: &str,
    policy: &NavigationPolicy,
) -> Result<Vec<ProductRecord>, ScrapeError>
where
    P: Page + ?Sized,
{
    page.block_resources(&[ResourceKind::Font, ResourceKind::Stylesheet])
        .await?;
    goto_with_retry(page, url, policy).await?;
    page.scroll_to_bottom().await?;
    tokio::time::sleep(policy.scroll_pause).await;

    let removed = page.remove_elements(NOISE_SELECTORS).await?;
    let body = page.body_html().await?;
    let text = html_to_text(&body);
    tracing::debug!(url, removed, chars = text.len(), "best sellers page normalized");

    let request = CompletionRequest::new(products_prompt(&text))
        .with_schema(PRODUCTS_SCHEMA_NAME, products_schema());
    let raw = completion.complete(request).await?.into_text()?;

    parse_product_payload(&raw)
}

/// Parses a completion payload into validated product records.
///
/// # Errors
///
/// Returns [`ScrapeError::MalformedCompletion`] when the payload is not JSON
/// or its top-level value is not an array.
pub fn parse_product_payload(raw: &str) -> Result<Vec<ProductRecord>, ScrapeError> {
    let value: Value = parse_completion_json(raw, PRODUCTS_SCHEMA_NAME)?;
    let Value::Array(items) = value else {
        return Err(ScrapeError::MalformedCompletion {
            context: PRODUCTS_SCHEMA_NAME.to_owned(),
            reason: "expected a JSON array of products".to_owned(),
            raw: raw.to_owned(),
        });
    };

    let total = items.len();
    let mut products: Vec<ProductRecord> = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let record = validate_product(item);
            if record.is_none() {
                tracing::warn!(index, item = %item, "dropping product record missing name or URL");
            }
            record
        })
        .collect();
    products.truncate(MAX_PRODUCTS);

    tracing::debug!(total, kept = products.len(), "product payload validated");
    Ok(products)
}

/// Applies the product field policy to one raw record.
///
/// Name and URL are required. Price and image fall back to `"N/A"`, and a
/// protocol-relative image URL is given an `https:` scheme.
#[must_use]
pub fn validate_product(item: &Value) -> Option<ProductRecord> {
    let product_name = field_text(item, "productName")?;
    let product_url = field_text(item, "productURL")?;
    let product_price = field_text(item, "productPrice").unwrap_or_else(|| NOT_AVAILABLE.to_owned());
    let product_img_url = field_text(item, "productImgUrl")
        .map_or_else(|| NOT_AVAILABLE.to_owned(), |img| repair_protocol_relative(&img));

    Some(ProductRecord {
        product_name,
        product_url,
        product_price,
        product_img_url,
    })
}

/// Non-empty trimmed text of a string or numeric field.
fn field_text(item: &Value, key: &str) -> Option<String> {
    let text = match item.get(key)? {
        Value::String(s) => s.trim().to_owned(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn repair_protocol_relative(url: &str) -> String {
    if url.starts_with("//") {
        format!("https:{url}")
    } else {
        url.to_owned()
    }
}
