//! Image-lookup collaborator used for template imagery.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ScrapeError;
use crate::rate_limit::retry_with_backoff;

/// One image hosted in an album.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumImage {
    pub name: String,
    pub direct_link: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub description: Option<String>,
}

impl AlbumImage {
    #[must_use]
    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

#[async_trait]
pub trait ImageLookup: Send + Sync {
    async fn list_album_images(&self, album_id: &str) -> Result<Vec<AlbumImage>, ScrapeError>;
}

#[derive(Debug, Deserialize)]
struct AlbumPage {
    #[serde(default)]
    data: Vec<AlbumImage>,
}

/// HTTP client for a paged album endpoint:
/// `GET {base}/album/{id}/images?page=N` returning `{ "data": [...] }`.
///
/// Pages are requested from 0 until an empty page comes back. Each page
/// request is retried on 429 and transport failures.
pub struct AlbumClient {
    client: Client,
    base_url: String,
    client_id: Option<String>,
    max_pages: usize,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl AlbumClient {
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        base_url: &str,
        client_id: Option<String>,
        timeout_secs: u64,
        max_pages: usize,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            client_id,
            max_pages,
            max_retries,
            backoff_base_ms,
        })
    }

    /// Builds the client from config, or `None` when no image host is
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the HTTP client cannot be built.
    pub fn from_app_config(config: &brandscope_core::AppConfig) -> Result<Option<Self>, ScrapeError> {
        let Some(base_url) = config.image_api_base_url.as_deref() else {
            return Ok(None);
        };
        Self::new(
            base_url,
            config.image_api_client_id.clone(),
            config.request_timeout_secs,
            config.image_max_pages,
            config.image_max_retries,
            config.image_backoff_base_ms,
        )
        .map(Some)
    }

    fn page_url(&self, album_id: &str, page: usize) -> String {
        format!("{}/album/{album_id}/images?page={page}", self.base_url)
    }

    async fn fetch_page(&self, album_id: &str, page: usize) -> Result<Vec<AlbumImage>, ScrapeError> {
        let url = self.page_url(album_id, page);
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            async move {
                let mut request = self.client.get(&url);
                if let Some(client_id) = &self.client_id {
                    request = request.header(
                        reqwest::header::AUTHORIZATION,
                        format!("Client-ID {client_id}"),
                    );
                }
                let response = request.send().await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(1);
                    return Err(ScrapeError::RateLimited {
                        service: "image-lookup".to_owned(),
                        retry_after_secs,
                    });
                }
                if !status.is_success() {
                    return Err(ScrapeError::UnexpectedStatus {
                        status: status.as_u16(),
                        url,
                    });
                }

                let page: AlbumPage = response.json().await?;
                Ok(page.data)
            }
        })
        .await
    }
}

#[async_trait]
impl ImageLookup for AlbumClient {
    async fn list_album_images(&self, album_id: &str) -> Result<Vec<AlbumImage>, ScrapeError> {
        let mut images = Vec::new();
        let mut page = 0usize;
        loop {
            if page >= self.max_pages {
                return Err(ScrapeError::PaginationLimit {
                    album_id: album_id.to_owned(),
                    max_pages: self.max_pages,
                });
            }
            let batch = self.fetch_page(album_id, page).await?;
            if batch.is_empty() {
                break;
            }
            images.extend(batch);
            page += 1;
        }
        tracing::debug!(album_id, pages = page, images = images.len(), "album listed");
        Ok(images)
    }
}
