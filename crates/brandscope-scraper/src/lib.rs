pub mod aggregate;
pub mod best_sellers;
pub mod completion;
pub mod error;
pub mod images;
pub mod links;
pub mod normalize;
pub mod page;
pub mod products;
mod rate_limit;
pub mod snapshot;
pub mod types;

pub use aggregate::{
    scrape_brand_brief, AggregatedBrandResult, BrandBriefServices, BriefSettings, FallbackReason,
};
pub use best_sellers::{extract_best_sellers, extract_best_sellers_at};
pub use completion::{CompletionService, OpenAiCompletionClient};
pub use error::ScrapeError;
pub use images::{AlbumClient, AlbumImage, ImageLookup};
pub use links::{map_internal_links, page_origin};
pub use normalize::html_to_text;
pub use page::{goto_with_retry, HttpPage, NavigationPolicy, Page, PageCookie};
pub use snapshot::{scrape_html, PageSnapshot};
pub use types::{BestSellerResolution, CategorizedLinks, LinkCategory, LinkRecord, ProductRecord};
