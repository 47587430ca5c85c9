use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use brandscope_scraper::{
    extract_best_sellers_at, page_origin, scrape_brand_brief, scrape_html, HttpPage, PageCookie,
    ScrapeError,
};
use serde::Deserialize;
use serde_json::Value;

use super::{ApiError, ApiResponse, AppState};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct ScrapeRequest {
    method: String,
    url: String,
    #[serde(default)]
    cookies: Vec<PageCookie>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScrapeMethod {
    Html,
    BrandBrief,
    BestSellers,
}

impl ScrapeMethod {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "scrape_html" => Some(Self::Html),
            "scrape_brand_brief" => Some(Self::BrandBrief),
            "extractBestSellers" => Some(Self::BestSellers),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Html => "scrape_html",
            Self::BrandBrief => "scrape_brand_brief",
            Self::BestSellers => "extractBestSellers",
        }
    }
}

/// `POST /scrape`: runs one scrape method against a fresh page.
///
/// Brand briefs and best-seller discovery degrade inside their pipelines,
/// so only `scrape_html` can surface a page failure here.
pub(super) async fn scrape(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let RequestId(req_id) = req_id;

    let Json(request) =
        payload.map_err(|e| ApiError::new(req_id.clone(), "bad_request", e.body_text()))?;

    let Some(method) = ScrapeMethod::parse(&request.method) else {
        return Err(ApiError::new(
            req_id,
            "unsupported_method",
            format!("unsupported method: {}", request.method),
        ));
    };

    if let Err(e) = page_origin(&request.url) {
        return Err(ApiError::new(req_id, "validation_error", e.to_string()));
    }

    tracing::info!(
        request_id = %req_id,
        method = method.as_str(),
        url = %request.url,
        cookies = request.cookies.len(),
        "scrape requested"
    );

    let mut page = HttpPage::new(&state.user_agent, &request.cookies)
        .map_err(|e| internal_error(&req_id, &e))?;
    let url = request.url.as_str();

    let data = match method {
        ScrapeMethod::Html => {
            let snapshot = scrape_html(&mut page, url, &state.settings.navigation)
                .await
                .map_err(|e| internal_error(&req_id, &e))?;
            serde_json::to_value(snapshot)
        }
        ScrapeMethod::BrandBrief => serde_json::to_value(
            scrape_brand_brief(&mut page, url, &state.services, &state.settings).await,
        ),
        ScrapeMethod::BestSellers => serde_json::to_value(
            extract_best_sellers_at(
                &mut page,
                url,
                state.services.completion.as_ref(),
                &state.settings.navigation,
            )
            .await,
        ),
    }
    .map_err(|e| {
        tracing::error!(request_id = %req_id, error = %e, "failed to serialize scrape result");
        ApiError::new(req_id.clone(), "internal_error", "failed to serialize result")
    })?;

    Ok(Json(ApiResponse::new(req_id, data)))
}

fn internal_error(req_id: &str, error: &ScrapeError) -> ApiError {
    tracing::error!(request_id = %req_id, error = %error, "scrape failed");
    ApiError::new(req_id, "internal_error", error.to_string())
}

#[cfg(test)]
mod tests {
    use super::ScrapeMethod;

    #[test]
    fn method_names_round_trip() {
        for name in ["scrape_html", "scrape_brand_brief", "extractBestSellers"] {
            let method = ScrapeMethod::parse(name).expect("known method");
            assert_eq!(method.as_str(), name);
        }
    }

    #[test]
    fn method_names_are_case_sensitive() {
        assert!(ScrapeMethod::parse("extractbestsellers").is_none());
        assert!(ScrapeMethod::parse("SCRAPE_HTML").is_none());
        assert!(ScrapeMethod::parse("").is_none());
    }
}
