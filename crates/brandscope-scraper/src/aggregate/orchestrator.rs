use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::branches::{self, ScrapedPage};
use super::{AggregatedBrandResult, BrandNarrative, FallbackReason, FieldValue};
use crate::completion::{CompletionService, OpenAiCompletionClient};
use crate::error::ScrapeError;
use crate::images::{AlbumClient, ImageLookup};
use crate::normalize::html_to_text;
use crate::page::{goto_with_retry, NavigationPolicy, Page};

/// Collaborators the brand-brief branches call out to.
#[derive(Clone)]
pub struct BrandBriefServices {
    pub completion: Arc<dyn CompletionService>,
    pub images: Option<Arc<dyn ImageLookup>>,
    pub album_id: Option<String>,
}

impl BrandBriefServices {
    /// Builds the OpenAI-compatible completion client and, when an image
    /// host is configured, the album client.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if either HTTP client cannot be built.
    pub fn from_app_config(config: &brandscope_core::AppConfig) -> Result<Self, ScrapeError> {
        let completion = OpenAiCompletionClient::new(
            &config.completion_base_url,
            &config.completion_api_key,
            &config.completion_model,
            config.completion_timeout_secs,
        )?;
        let images = AlbumClient::from_app_config(config)?
            .map(|client| Arc::new(client) as Arc<dyn ImageLookup>);
        Ok(Self {
            completion: Arc::new(completion),
            images,
            album_id: config.image_album_id.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BriefSettings {
    pub navigation: NavigationPolicy,
    /// Wait after the reload that follows an access denial.
    pub access_denied_settle: Duration,
}

impl BriefSettings {
    #[must_use]
    pub fn from_app_config(config: &brandscope_core::AppConfig) -> Self {
        Self {
            navigation: NavigationPolicy::from_app_config(config),
            access_denied_settle: Duration::from_millis(config.access_denied_settle_ms),
        }
    }
}

/// Builds the brand brief for `url`.
///
/// Never fails. If loading or reading the page is denied (403), the page is
/// reloaded, the settle delay is awaited and the whole scrape is attempted
/// exactly once more; if that also fails every field carries the
/// access-restricted sentinel. Any other page failure yields the error
/// sentinel set. Individual branch failures only affect their own field.
pub async fn scrape_brand_brief<P>(
    page: &mut P,
    url: &str,
    services: &BrandBriefServices,
    settings: &BriefSettings,
) -> AggregatedBrandResult
where
    P: Page + ?Sized,
{
    let err = match attempt(page, url, services, settings).await {
        Ok(result) => return result,
        Err(err) => err,
    };

    if !err.is_access_denied() {
        tracing::warn!(url, error = %err, "brand brief scrape failed");
        return AggregatedBrandResult::unavailable(url, FallbackReason::Error);
    }

    tracing::warn!(
        url,
        error = %err,
        settle_ms = settings.access_denied_settle.as_millis(),
        "access denied, reloading once before retrying"
    );
    if let Err(e) = page.reload().await {
        tracing::warn!(url, error = %e, "reload after access denial failed");
    }
    tokio::time::sleep(settings.access_denied_settle).await;

    match attempt(page, url, services, settings).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(url, error = %e, "retry after access denial failed");
            AggregatedBrandResult::unavailable(url, FallbackReason::AccessRestricted)
        }
    }
}

/// `START → NAVIGATED → SCRAPING → MERGED`. Only navigation and page reads
/// can fail here; the fan-out always merges.
async fn attempt<P>(
    page: &mut P,
    url: &str,
    services: &BrandBriefServices,
    settings: &BriefSettings,
) -> Result<AggregatedBrandResult, ScrapeError>
where
    P: Page + ?Sized,
{
    goto_with_retry(page, url, &settings.navigation).await?;
    let scraped = scrape_page(page).await?;
    Ok(fan_out(url, Arc::new(scraped), services).await)
}

async fn scrape_page<P>(page: &P) -> Result<ScrapedPage, ScrapeError>
where
    P: Page + ?Sized,
{
    let url = page.url().await?;
    let html = page.content().await?;
    let body = page.body_html().await?;
    let text = html_to_text(&body);
    let screenshot = match page.screenshot().await {
        Ok(png) => png,
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "screenshot unavailable");
            None
        }
    };
    Ok(ScrapedPage {
        url,
        html,
        text,
        screenshot,
    })
}

struct Settled<T> {
    value: T,
    failed: Option<&'static str>,
}

/// Runs one branch as its own task and substitutes `fallback` on error or
/// panic.
async fn settle<T, F>(branch: &'static str, task: F, fallback: T) -> Settled<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T, ScrapeError>> + Send + 'static,
{
    match tokio::spawn(task).await {
        Ok(Ok(value)) => Settled {
            value,
            failed: None,
        },
        Ok(Err(e)) => {
            tracing::warn!(branch, error = %e, "branch failed, using fallback");
            Settled {
                value: fallback,
                failed: Some(branch),
            }
        }
        Err(e) => {
            tracing::warn!(branch, error = %e, "branch task aborted, using fallback");
            Settled {
                value: fallback,
                failed: Some(branch),
            }
        }
    }
}

async fn fan_out(
    url: &str,
    page: Arc<ScrapedPage>,
    services: &BrandBriefServices,
) -> AggregatedBrandResult {
    let reason = FallbackReason::Error;
    let completion = &services.completion;

    let (narrative, benefits, snippet, images, fonts) = tokio::join!(
        settle(
            branches::NARRATIVE,
            branches::narrative(Arc::clone(completion), Arc::clone(&page)),
            BrandNarrative::unavailable(reason),
        ),
        settle(
            branches::BENEFITS,
            {
                let task = branches::benefits(Arc::clone(completion), Arc::clone(&page));
                async move { task.await.map(FieldValue::Available) }
            },
            FieldValue::unavailable(reason),
        ),
        settle(
            branches::DELIVERABILITY_SNIPPET,
            branches::deliverability_snippet(Arc::clone(completion), Arc::clone(&page)),
            reason.sentinel().to_owned(),
        ),
        settle(
            branches::TEMPLATE_IMAGES,
            {
                let task =
                    branches::template_images(services.images.clone(), services.album_id.clone());
                async move { task.await.map(FieldValue::Available) }
            },
            FieldValue::unavailable(reason),
        ),
        settle(
            branches::FONT_USAGE,
            {
                let page = Arc::clone(&page);
                async move {
                    Ok::<_, ScrapeError>(FieldValue::Available(branches::font_usage(&page)))
                }
            },
            FieldValue::unavailable(reason),
        ),
    );

    let failed_branches: Vec<String> = [
        narrative.failed,
        benefits.failed,
        snippet.failed,
        images.failed,
        fonts.failed,
    ]
    .into_iter()
    .flatten()
    .map(str::to_owned)
    .collect();

    tracing::info!(
        url,
        final_url = %page.url,
        failed = failed_branches.len(),
        "brand brief merged"
    );

    AggregatedBrandResult {
        url: url.to_owned(),
        scraped_at: Utc::now(),
        narrative: narrative.value,
        benefits: benefits.value,
        deliverability_snippet: snippet.value,
        template_images: images.value,
        font_usage: fonts.value,
        failed_branches,
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
