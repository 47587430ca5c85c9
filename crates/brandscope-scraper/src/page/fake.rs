//! Scriptable in-memory [`Page`] for pipeline tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use super::dom::{body_of, remove_matching};
use super::{GotoOptions, Page, ResourceKind};
use crate::error::ScrapeError;

const BLANK: &str = "<html><head></head><body></body></html>";

pub(crate) struct FakePage {
    current_url: String,
    html: String,
    routes: HashMap<String, String>,
    goto_failures: VecDeque<ScrapeError>,
    body_failures: Mutex<VecDeque<ScrapeError>>,
    goto_calls: u32,
    reload_calls: u32,
    blocked: Vec<ResourceKind>,
    scrolled: bool,
    screenshot: Option<Vec<u8>>,
}

impl FakePage {
    /// A page already showing `html` at `url`.
    pub(crate) fn new(url: &str, html: &str) -> Self {
        let mut routes = HashMap::new();
        routes.insert(url.to_owned(), html.to_owned());
        Self {
            current_url: url.to_owned(),
            html: html.to_owned(),
            routes,
            goto_failures: VecDeque::new(),
            body_failures: Mutex::new(VecDeque::new()),
            goto_calls: 0,
            reload_calls: 0,
            blocked: Vec::new(),
            scrolled: false,
            screenshot: None,
        }
    }

    pub(crate) fn with_route(mut self, url: &str, html: &str) -> Self {
        self.routes.insert(url.to_owned(), html.to_owned());
        self
    }

    pub(crate) fn with_screenshot(mut self, png: Vec<u8>) -> Self {
        self.screenshot = Some(png);
        self
    }

    pub(crate) fn fail_next_gotos(&mut self, errors: Vec<ScrapeError>) {
        self.goto_failures.extend(errors);
    }

    pub(crate) fn fail_next_body_reads(&mut self, errors: Vec<ScrapeError>) {
        self.body_failures
            .lock()
            .expect("fake page lock")
            .extend(errors);
    }

    pub(crate) fn goto_calls(&self) -> u32 {
        self.goto_calls
    }

    pub(crate) fn reload_calls(&self) -> u32 {
        self.reload_calls
    }

    pub(crate) fn blocked(&self) -> &[ResourceKind] {
        &self.blocked
    }

    pub(crate) fn scrolled(&self) -> bool {
        self.scrolled
    }
}

#[async_trait]
impl Page for FakePage {
    async fn url(&self) -> Result<String, ScrapeError> {
        Ok(self.current_url.clone())
    }

    async fn content(&self) -> Result<String, ScrapeError> {
        Ok(self.html.clone())
    }

    async fn body_html(&self) -> Result<String, ScrapeError> {
        if let Some(err) = self
            .body_failures
            .lock()
            .expect("fake page lock")
            .pop_front()
        {
            return Err(err);
        }
        Ok(body_of(&self.html))
    }

    async fn goto(&mut self, url: &str, _options: GotoOptions) -> Result<(), ScrapeError> {
        self.goto_calls += 1;
        if let Some(err) = self.goto_failures.pop_front() {
            return Err(err);
        }
        self.current_url = url.to_owned();
        self.html = self
            .routes
            .get(url)
            .cloned()
            .unwrap_or_else(|| BLANK.to_owned());
        Ok(())
    }

    async fn reload(&mut self) -> Result<(), ScrapeError> {
        self.reload_calls += 1;
        self.html = self
            .routes
            .get(&self.current_url)
            .cloned()
            .unwrap_or_else(|| BLANK.to_owned());
        Ok(())
    }

    async fn block_resources(&mut self, kinds: &[ResourceKind]) -> Result<(), ScrapeError> {
        self.blocked.extend_from_slice(kinds);
        Ok(())
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), ScrapeError> {
        self.scrolled = true;
        Ok(())
    }

    async fn remove_elements(&mut self, selectors: &[&str]) -> Result<usize, ScrapeError> {
        let (html, removed) = remove_matching(&self.html, selectors);
        self.html = html;
        Ok(removed)
    }

    async fn screenshot(&self) -> Result<Option<Vec<u8>>, ScrapeError> {
        Ok(self.screenshot.clone())
    }
}
