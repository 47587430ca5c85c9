//! End-to-end best-seller discovery over a mock storefront and a mock
//! completion endpoint. No real network traffic is made.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use brandscope_scraper::{
    extract_best_sellers_at, HttpPage, NavigationPolicy, OpenAiCompletionClient,
};

fn policy() -> NavigationPolicy {
    NavigationPolicy {
        timeout: Duration::from_secs(5),
        max_attempts: 2,
        retry_delay: Duration::ZERO,
        scroll_pause: Duration::ZERO,
    }
}

fn chat_reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

fn home_html(origin: &str) -> String {
    format!(
        r#"<html><body>
        <nav>
          <a href="/collections/best-sellers">Best Sellers</a>
          <a href="/pages/about-us">Our Story</a>
          <a href="{origin}/policies/privacy-policy">Privacy</a>
          <a href="https://social.example.com/acme">Follow us</a>
        </nav>
        <main><a href="/products/mug">Mug</a></main>
        </body></html>"#
    )
}

const BEST_SELLERS_HTML: &str = r#"<html><head><link rel="stylesheet" href="/theme.css"></head>
<body>
  <header>Free shipping over $50</header>
  <main>
    <div class="grid">
      <a href="/products/mug"><img src="//cdn.acme.test/mug.jpg?v=3" alt="Mug"> Mug</a> <span>$12</span>
      <a href="/products/tee"><img data-src="/tee.jpg" alt="Tee"> Tee</a>
    </div>
  </main>
  <footer>Acme</footer>
</body></html>"#;

async fn storefront(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(home_html(&server.uri()), "text/html"),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/collections/best-sellers"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(BEST_SELLERS_HTML, "text/html"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn storefront_to_validated_products() {
    let shop = MockServer::start().await;
    storefront(&shop).await;

    let ai = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("key_page_urls"))
        .respond_with(chat_reply(
            r#"```json
{"bestSellersUrl":"/collections/best-sellers","contactUrl":null,"faqUrl":null}
```"#,
        ))
        .mount(&ai)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("best_seller_products"))
        .respond_with(chat_reply(
            &json!({
                "items": [
                    {"productName": "Mug", "productURL": "/products/mug", "productPrice": "$12", "productImgUrl": "//cdn.acme.test/mug.jpg?v=3"},
                    {"productName": "Tee", "productURL": "/products/tee", "productPrice": "", "productImgUrl": "/tee.jpg"},
                    {"productName": "", "productURL": "/products/ghost", "productPrice": "", "productImgUrl": ""}
                ]
            })
            .to_string(),
        ))
        .mount(&ai)
        .await;

    let completion = OpenAiCompletionClient::new(&ai.uri(), "sk-test", "test-model", 5).unwrap();
    let mut page = HttpPage::new("brandscope-test/0.1", &[]).unwrap();

    let resolution = extract_best_sellers_at(
        &mut page,
        &format!("{}/", shop.uri()),
        &completion,
        &policy(),
    )
    .await;

    assert_eq!(
        resolution.best_sellers_url,
        Some(format!("{}/collections/best-sellers", shop.uri()))
    );
    assert_eq!(resolution.products.len(), 2);
    assert_eq!(resolution.products[0].product_img_url, "https://cdn.acme.test/mug.jpg?v=3");
    assert_eq!(resolution.products[1].product_price, "N/A");

    let links = &resolution.internal_links;
    assert_eq!(links.collections.len(), 1);
    assert_eq!(links.about.len(), 1);
    assert_eq!(links.legal.len(), 1);
    assert_eq!(links.products.len(), 1);
    assert_eq!(links.len(), 4);

    // the product prompt saw the lazy image and no header/footer chrome
    let requests = ai.received_requests().await.unwrap();
    let product_prompt = requests
        .iter()
        .map(|r| String::from_utf8_lossy(&r.body).into_owned())
        .find(|body| body.contains("best_seller_products"))
        .unwrap();
    assert!(product_prompt.contains("![Tee](/tee.jpg)"));
    assert!(!product_prompt.contains("Free shipping over $50"));
}

#[tokio::test]
async fn no_best_sellers_page_is_a_normal_outcome() {
    let shop = MockServer::start().await;
    storefront(&shop).await;

    let ai = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(chat_reply(r#"{"bestSellersUrl":null,"contactUrl":null,"faqUrl":null}"#))
        .mount(&ai)
        .await;

    let completion = OpenAiCompletionClient::new(&ai.uri(), "sk-test", "test-model", 5).unwrap();
    let mut page = HttpPage::new("brandscope-test/0.1", &[]).unwrap();

    let resolution = extract_best_sellers_at(
        &mut page,
        &format!("{}/", shop.uri()),
        &completion,
        &policy(),
    )
    .await;

    assert!(resolution.best_sellers_url.is_none());
    assert!(resolution.products.is_empty());
    assert_eq!(resolution.internal_links.len(), 4);
    assert_eq!(ai.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn blocked_storefront_degrades_to_unresolved() {
    let shop = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&shop)
        .await;
    let ai = MockServer::start().await;

    let completion = OpenAiCompletionClient::new(&ai.uri(), "sk-test", "test-model", 5).unwrap();
    let mut page = HttpPage::new("brandscope-test/0.1", &[]).unwrap();

    let resolution = extract_best_sellers_at(
        &mut page,
        &format!("{}/", shop.uri()),
        &completion,
        &policy(),
    )
    .await;

    assert!(resolution.best_sellers_url.is_none());
    assert!(resolution.internal_links.is_empty());
    assert!(ai.received_requests().await.unwrap().is_empty());
}
