use serde::{Deserialize, Serialize};

use crate::error::ScrapeError;
use crate::normalize::html_to_text;
use crate::page::{goto_with_retry, NavigationPolicy, Page};

/// Raw document plus its normalized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub html: String,
    pub text: String,
}

/// Loads `url` and captures the document.
///
/// # Errors
///
/// Returns the navigation error once the policy's attempts are spent, or
/// any error reading the loaded document.
pub async fn scrape_html<P>(
    page: &mut P,
    url: &str,
    policy: &NavigationPolicy,
) -> Result<PageSnapshot, ScrapeError>
where
    P: Page + ?Sized,
{
    goto_with_retry(page, url, policy).await?;
    let html = page.content().await?;
    let text = html_to_text(&page.body_html().await?);
    Ok(PageSnapshot {
        url: page.url().await?,
        html,
        text,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::page::fake::FakePage;

    fn policy() -> NavigationPolicy {
        NavigationPolicy {
            timeout: Duration::from_secs(1),
            max_attempts: 1,
            retry_delay: Duration::ZERO,
            scroll_pause: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn captures_document_and_text() {
        let html = "<html><head><title>Acme</title></head><body><h1>Hello</h1><script>x()</script></body></html>";
        let mut page = FakePage::new("about:blank", "").with_route("https://acme.test/", html);

        let snapshot = scrape_html(&mut page, "https://acme.test/", &policy())
            .await
            .unwrap();

        assert_eq!(snapshot.url, "https://acme.test/");
        assert!(snapshot.html.contains("<title>Acme</title>"));
        assert!(snapshot.text.contains("Hello"));
        assert!(!snapshot.text.contains("x()"));
    }

    #[tokio::test]
    async fn navigation_failure_is_returned() {
        let mut page = FakePage::new("about:blank", "");
        page.fail_next_gotos(vec![ScrapeError::AccessDenied {
            url: "https://acme.test/".to_owned(),
            status: 403,
        }]);

        let err = scrape_html(&mut page, "https://acme.test/", &policy())
            .await
            .unwrap_err();

        assert!(err.is_access_denied());
    }
}
