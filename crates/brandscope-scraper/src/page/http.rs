//! reqwest-backed [`Page`] that works on server-rendered storefront HTML.
//!
//! There is no script engine: the document is the HTML returned by the
//! server, DOM mutations are applied to that text, and sub-resources are never
//! fetched (so resource blocking is trivially honoured).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};

use super::dom::{body_of, remove_matching};
use super::{GotoOptions, Page, ResourceKind};
use crate::error::ScrapeError;

const BLANK_URL: &str = "about:blank";
const BLANK_HTML: &str = "<html><head></head><body></body></html>";

/// A cookie forwarded with every navigation, e.g. from a `/scrape` request.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct PageCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: Option<String>,
}

pub struct HttpPage {
    client: Client,
    cookie_header: Option<String>,
    current_url: String,
    html: String,
    last_options: GotoOptions,
    blocked: Vec<ResourceKind>,
}

impl HttpPage {
    /// Creates a blank page.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the HTTP client cannot be constructed.
    pub fn new(user_agent: &str, cookies: &[PageCookie]) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            cookie_header: cookie_header(cookies),
            current_url: BLANK_URL.to_owned(),
            html: BLANK_HTML.to_owned(),
            last_options: GotoOptions::default(),
            blocked: Vec::new(),
        })
    }

    /// Resource kinds this page was asked to block.
    #[must_use]
    pub fn blocked_resources(&self) -> &[ResourceKind] {
        &self.blocked
    }

    async fn fetch(&self, url: &str, options: GotoOptions) -> Result<(String, String), ScrapeError> {
        let mut request = self
            .client
            .get(url)
            .timeout(options.timeout)
            .header(header::ACCEPT, "text/html,application/xhtml+xml")
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9");
        if let Some(cookies) = &self.cookie_header {
            request = request.header(header::COOKIE, cookies);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ScrapeError::NavigationTimeout {
                    url: url.to_owned(),
                    attempts: 1,
                }
            } else {
                ScrapeError::Http(e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(ScrapeError::AccessDenied {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(ScrapeError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let final_url = response.url().to_string();
        let body = response.text().await?;
        Ok((final_url, body))
    }
}

/// Serializes cookies into a single `Cookie` header value.
fn cookie_header(cookies: &[PageCookie]) -> Option<String> {
    let pairs: Vec<String> = cookies
        .iter()
        .filter(|c| !c.name.is_empty())
        .map(|c| format!("{}={}", c.name, c.value))
        .collect();
    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

#[async_trait]
impl Page for HttpPage {
    async fn url(&self) -> Result<String, ScrapeError> {
        Ok(self.current_url.clone())
    }

    async fn content(&self) -> Result<String, ScrapeError> {
        Ok(self.html.clone())
    }

    async fn body_html(&self) -> Result<String, ScrapeError> {
        Ok(body_of(&self.html))
    }

    async fn goto(&mut self, url: &str, options: GotoOptions) -> Result<(), ScrapeError> {
        let (final_url, html) = self.fetch(url, options).await?;
        tracing::debug!(url, final_url = %final_url, bytes = html.len(), "page loaded");
        self.current_url = final_url;
        self.html = html;
        self.last_options = options;
        Ok(())
    }

    async fn reload(&mut self) -> Result<(), ScrapeError> {
        if self.current_url == BLANK_URL {
            self.html = BLANK_HTML.to_owned();
            return Ok(());
        }
        let url = self.current_url.clone();
        let (final_url, html) = self.fetch(&url, self.last_options).await?;
        self.current_url = final_url;
        self.html = html;
        Ok(())
    }

    async fn block_resources(&mut self, kinds: &[ResourceKind]) -> Result<(), ScrapeError> {
        for kind in kinds {
            if !self.blocked.contains(kind) {
                self.blocked.push(*kind);
            }
        }
        Ok(())
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), ScrapeError> {
        Ok(())
    }

    async fn remove_elements(&mut self, selectors: &[&str]) -> Result<usize, ScrapeError> {
        let (html, removed) = remove_matching(&self.html, selectors);
        self.html = html;
        Ok(removed)
    }

    async fn screenshot(&self) -> Result<Option<Vec<u8>>, ScrapeError> {
        Ok(None)
    }
}
