use async_trait::async_trait;

use super::*;
use crate::aggregate::branches::{
    BENEFITS_SCHEMA_NAME, DELIVERABILITY_SNIPPET, MAX_TEMPLATE_IMAGES, NARRATIVE_SCHEMA_NAME,
    SNIPPET_SCHEMA_NAME, TEMPLATE_IMAGES,
};
use crate::completion::fake::ScriptedCompletion;
use crate::images::AlbumImage;
use crate::page::fake::FakePage;

const URL: &str = "https://x.com/";

const HOME: &str = r#"<html><head><style>body { font-family: "Inter", sans-serif; }</style></head>
<body>
  <header><a href="/account">Account</a></header>
  <main>
    <h1>Acme Outdoor</h1>
    <p style="font-family: Georgia">Gear for long days outside.</p>
    <a href="/collections/best-sellers">Best Sellers</a>
  </main>
</body></html>"#;

const NARRATIVE_JSON: &str = r#"{"brandName":"Acme Outdoor","brandSummary":"Outdoor gear.","toneOfVoice":"Warm","targetAudience":"Hikers","valueProposition":"Durable kit"}"#;
const BENEFITS_JSON: &str = r#"{"benefits":[
    {"title":"Free shipping","description":"On orders over $50"},
    {"title":"Lifetime warranty","description":"We repair anything"},
    {"title":"","description":"dropped"},
    {"title":"Bold colours","description":"Stand out"},
    {"title":"Organic cotton","description":"Soft"},
    {"title":"Fifth","description":"over the cap"}
]}"#;
const SNIPPET_JSON: &str = r#"{"snippet":"New trail-ready gear is here"}"#;

struct StaticAlbum(Vec<AlbumImage>);

#[async_trait]
impl ImageLookup for StaticAlbum {
    async fn list_album_images(&self, _album_id: &str) -> Result<Vec<AlbumImage>, ScrapeError> {
        Ok(self.0.clone())
    }
}

fn image(name: &str, width: u32, height: u32) -> AlbumImage {
    AlbumImage {
        name: name.to_owned(),
        direct_link: format!("https://img.example.com/{name}"),
        width,
        height,
        description: None,
    }
}

fn album() -> Arc<dyn ImageLookup> {
    let mut images = vec![image("portrait-0.jpg", 600, 900)];
    images.extend((1..=7).map(|i| image(&format!("landscape-{i}.jpg"), 1200, 600)));
    Arc::new(StaticAlbum(images))
}

fn settings() -> BriefSettings {
    BriefSettings {
        navigation: NavigationPolicy {
            timeout: Duration::from_secs(1),
            max_attempts: 1,
            retry_delay: Duration::ZERO,
            scroll_pause: Duration::ZERO,
        },
        access_denied_settle: Duration::ZERO,
    }
}

fn full_completion() -> ScriptedCompletion {
    ScriptedCompletion::new()
        .reply(NARRATIVE_SCHEMA_NAME, NARRATIVE_JSON)
        .reply(BENEFITS_SCHEMA_NAME, BENEFITS_JSON)
        .reply(SNIPPET_SCHEMA_NAME, SNIPPET_JSON)
}

fn services(completion: &Arc<ScriptedCompletion>) -> BrandBriefServices {
    BrandBriefServices {
        completion: Arc::clone(completion) as Arc<dyn CompletionService>,
        images: Some(album()),
        album_id: Some("album-1".to_owned()),
    }
}

fn denied() -> ScrapeError {
    ScrapeError::AccessDenied {
        url: URL.to_owned(),
        status: 403,
    }
}

fn assert_narrative_is(result: &AggregatedBrandResult, sentinel: &str) {
    let n = &result.narrative;
    for field in [
        &n.brand_name,
        &n.brand_summary,
        &n.tone_of_voice,
        &n.target_audience,
        &n.value_proposition,
    ] {
        assert_eq!(field, sentinel);
    }
}

#[tokio::test]
async fn all_branches_fulfilled() {
    let completion = Arc::new(full_completion());
    let mut page = FakePage::new(URL, HOME);

    let result = scrape_brand_brief(&mut page, URL, &services(&completion), &settings()).await;

    assert!(result.failed_branches.is_empty(), "{:?}", result.failed_branches);
    assert_eq!(result.url, URL);
    assert_eq!(result.narrative.brand_name, "Acme Outdoor");
    assert_eq!(result.deliverability_snippet, "New trail-ready gear is here");

    let benefits = result.benefits.as_available().unwrap();
    let icons: Vec<&str> = benefits.iter().map(|b| b.icon.as_str()).collect();
    assert_eq!(icons, vec!["truck", "shield", "star", "leaf"]);

    let images = result.template_images.as_available().unwrap();
    assert_eq!(images.len(), MAX_TEMPLATE_IMAGES);
    assert!(images.iter().all(AlbumImage::is_landscape));
    assert_eq!(images[0].name, "landscape-1.jpg");

    let fonts = result.font_usage.as_available().unwrap();
    let families: Vec<&str> = fonts.iter().map(|f| f.family.as_str()).collect();
    assert_eq!(families, vec!["Georgia", "Inter"]);
}

#[tokio::test]
async fn branches_read_the_cleaned_page_text() {
    let completion = Arc::new(full_completion());
    let mut page = FakePage::new(URL, HOME);

    let _ = scrape_brand_brief(&mut page, URL, &services(&completion), &settings()).await;

    let requests = completion.requests();
    assert_eq!(requests.len(), 3);
    for request in &requests {
        assert!(request.prompt.contains("Gear for long days outside."));
        assert!(request.prompt.contains("[Best Sellers](/collections/best-sellers)"));
        assert!(!request.prompt.contains("font-family"));
    }
}

#[tokio::test]
async fn screenshot_is_attached_to_narrative_prompt() {
    let completion = Arc::new(full_completion());
    let mut page = FakePage::new(URL, HOME).with_screenshot(vec![0x89, b'P', b'N', b'G']);

    let _ = scrape_brand_brief(&mut page, URL, &services(&completion), &settings()).await;

    for request in completion.requests() {
        let is_narrative = request
            .schema
            .as_ref()
            .is_some_and(|(name, _)| name == NARRATIVE_SCHEMA_NAME);
        assert_eq!(request.images.len(), usize::from(is_narrative));
    }
}

#[tokio::test]
async fn rejected_snippet_branch_only_affects_its_field() {
    let completion = Arc::new(
        ScriptedCompletion::new()
            .reply(NARRATIVE_SCHEMA_NAME, NARRATIVE_JSON)
            .reply(BENEFITS_SCHEMA_NAME, BENEFITS_JSON)
            .reply_err(
                SNIPPET_SCHEMA_NAME,
                ScrapeError::Completion("upstream exploded".to_owned()),
            ),
    );
    let mut page = FakePage::new(URL, HOME);

    let result = scrape_brand_brief(&mut page, URL, &services(&completion), &settings()).await;

    assert_eq!(result.deliverability_snippet, FallbackReason::Error.sentinel());
    assert_eq!(result.failed_branches, vec![DELIVERABILITY_SNIPPET.to_owned()]);
    assert_eq!(result.narrative.brand_name, "Acme Outdoor");
    assert!(result.benefits.as_available().is_some());
    assert!(result.template_images.as_available().is_some());
    assert!(result.font_usage.as_available().is_some());
}

#[tokio::test]
async fn completion_reporting_failure_uses_fallback() {
    let completion = Arc::new(
        ScriptedCompletion::new()
            .reply_failed(NARRATIVE_SCHEMA_NAME, "content filtered")
            .reply(BENEFITS_SCHEMA_NAME, "```json\nnot json\n```")
            .reply(SNIPPET_SCHEMA_NAME, SNIPPET_JSON),
    );
    let mut page = FakePage::new(URL, HOME);

    let result = scrape_brand_brief(&mut page, URL, &services(&completion), &settings()).await;

    assert_narrative_is(&result, FallbackReason::Error.sentinel());
    assert_eq!(
        result.benefits,
        FieldValue::Unavailable(FallbackReason::Error.sentinel().to_owned())
    );
    assert_eq!(result.failed_branches, vec!["narrative", "benefits"]);
    assert_eq!(result.deliverability_snippet, "New trail-ready gear is here");
}

#[tokio::test]
async fn missing_image_service_fails_only_imagery() {
    let completion = Arc::new(full_completion());
    let mut page = FakePage::new(URL, HOME);
    let services = BrandBriefServices {
        images: None,
        ..services(&completion)
    };

    let result = scrape_brand_brief(&mut page, URL, &services, &settings()).await;

    assert_eq!(result.failed_branches, vec![TEMPLATE_IMAGES.to_owned()]);
    assert!(result.template_images.as_available().is_none());
}

#[tokio::test]
async fn access_denied_then_success_recovers_once() {
    let completion = Arc::new(full_completion());
    let mut page = FakePage::new(URL, HOME);
    page.fail_next_gotos(vec![denied()]);

    let result = scrape_brand_brief(&mut page, URL, &services(&completion), &settings()).await;

    assert_eq!(page.reload_calls(), 1);
    assert_eq!(page.goto_calls(), 2);
    assert_eq!(result.narrative.brand_name, "Acme Outdoor");
    assert!(result.failed_branches.is_empty());
}

#[tokio::test]
async fn repeated_access_denial_yields_access_restricted_sentinels() {
    let completion = Arc::new(full_completion());
    let mut page = FakePage::new(URL, HOME);
    page.fail_next_gotos(vec![denied(), denied(), denied()]);

    let result = scrape_brand_brief(&mut page, URL, &services(&completion), &settings()).await;

    assert_eq!(page.reload_calls(), 1);
    assert_eq!(page.goto_calls(), 2);
    assert_narrative_is(&result, FallbackReason::AccessRestricted.sentinel());
    assert_ne!(
        result.narrative.brand_name,
        FallbackReason::Error.sentinel()
    );
    assert_eq!(
        result.deliverability_snippet,
        FallbackReason::AccessRestricted.sentinel()
    );
    assert_eq!(result.failed_branches.len(), 5);
    assert!(completion.requests().is_empty());
}

#[tokio::test]
async fn forbidden_message_while_reading_page_triggers_recovery() {
    let completion = Arc::new(full_completion());
    let mut page = FakePage::new(URL, HOME);
    page.fail_next_body_reads(vec![ScrapeError::Navigation {
        url: URL.to_owned(),
        reason: "page responded with status 403".to_owned(),
    }]);

    let result = scrape_brand_brief(&mut page, URL, &services(&completion), &settings()).await;

    assert_eq!(page.reload_calls(), 1);
    assert_eq!(result.narrative.brand_name, "Acme Outdoor");
}

#[tokio::test]
async fn other_failures_use_error_sentinels_without_retry() {
    let completion = Arc::new(full_completion());
    let mut page = FakePage::new(URL, HOME);
    page.fail_next_gotos(vec![ScrapeError::NavigationTimeout {
        url: URL.to_owned(),
        attempts: 1,
    }]);

    let result = scrape_brand_brief(&mut page, URL, &services(&completion), &settings()).await;

    assert_eq!(page.reload_calls(), 0);
    assert_narrative_is(&result, FallbackReason::Error.sentinel());
    assert_eq!(result.url, URL);
}

#[tokio::test]
async fn timeout_on_url_containing_403_is_not_treated_as_denial() {
    let url = "https://shop403.example.com/";
    let completion = Arc::new(full_completion());
    let mut page = FakePage::new(url, HOME);
    page.fail_next_gotos(vec![
        ScrapeError::NavigationTimeout {
            url: url.to_owned(),
            attempts: 1,
        },
        ScrapeError::NavigationTimeout {
            url: url.to_owned(),
            attempts: 1,
        },
    ]);

    let result = scrape_brand_brief(&mut page, url, &services(&completion), &settings()).await;

    assert_eq!(page.reload_calls(), 0);
    assert_eq!(page.goto_calls(), 1);
    assert_narrative_is(&result, FallbackReason::Error.sentinel());
}
