//! Data shapes produced by the link-mapping and best-seller pipeline.
//!
//! JSON field names follow the camelCase wire format the HTTP surface
//! returns (`absoluteUrl`, `bestSellersUrl`, `productImgUrl`, ...).

use serde::{Deserialize, Serialize};

/// Placeholder used for optional product fields the page did not expose.
pub const NOT_AVAILABLE: &str = "N/A";

/// Maximum number of products the extractor returns for one page.
pub const MAX_PRODUCTS: usize = 9;

/// A same-origin link discovered on a storefront page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    pub absolute_url: String,
    pub path: String,
}

/// Semantic bucket a link is assigned to. Every internal link lands in
/// exactly one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkCategory {
    About,
    Legal,
    Collections,
    Products,
    Blog,
    Account,
    Other,
}

impl LinkCategory {
    pub const ALL: [LinkCategory; 7] = [
        LinkCategory::About,
        LinkCategory::Legal,
        LinkCategory::Collections,
        LinkCategory::Products,
        LinkCategory::Blog,
        LinkCategory::Account,
        LinkCategory::Other,
    ];
}

impl std::fmt::Display for LinkCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LinkCategory::About => "about",
            LinkCategory::Legal => "legal",
            LinkCategory::Collections => "collections",
            LinkCategory::Products => "products",
            LinkCategory::Blog => "blog",
            LinkCategory::Account => "account",
            LinkCategory::Other => "other",
        };
        f.write_str(name)
    }
}

/// Internal links of one page, partitioned by [`LinkCategory`].
///
/// Every bucket is always present (possibly empty) and sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorizedLinks {
    pub about: Vec<LinkRecord>,
    pub legal: Vec<LinkRecord>,
    pub collections: Vec<LinkRecord>,
    pub products: Vec<LinkRecord>,
    pub blog: Vec<LinkRecord>,
    pub account: Vec<LinkRecord>,
    pub other: Vec<LinkRecord>,
}

impl CategorizedLinks {
    #[must_use]
    pub fn bucket(&self, category: LinkCategory) -> &[LinkRecord] {
        match category {
            LinkCategory::About => &self.about,
            LinkCategory::Legal => &self.legal,
            LinkCategory::Collections => &self.collections,
            LinkCategory::Products => &self.products,
            LinkCategory::Blog => &self.blog,
            LinkCategory::Account => &self.account,
            LinkCategory::Other => &self.other,
        }
    }

    pub(crate) fn bucket_mut(&mut self, category: LinkCategory) -> &mut Vec<LinkRecord> {
        match category {
            LinkCategory::About => &mut self.about,
            LinkCategory::Legal => &mut self.legal,
            LinkCategory::Collections => &mut self.collections,
            LinkCategory::Products => &mut self.products,
            LinkCategory::Blog => &mut self.blog,
            LinkCategory::Account => &mut self.account,
            LinkCategory::Other => &mut self.other,
        }
    }

    /// Total number of links across all buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        LinkCategory::ALL
            .iter()
            .map(|c| self.bucket(*c).len())
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One product listing extracted from a best-sellers page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub product_name: String,
    #[serde(rename = "productURL")]
    pub product_url: String,
    pub product_price: String,
    pub product_img_url: String,
}

/// Key pages the completion service picked out of the link map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPageUrls {
    pub best_sellers_url: Option<String>,
    pub contact_url: Option<String>,
    pub faq_url: Option<String>,
}

/// Terminal artifact of best-seller resolution.
///
/// `best_sellers_url == None` is an expected outcome meaning no page could
/// be identified with confidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestSellerResolution {
    pub best_sellers_url: Option<String>,
    pub contact_url: Option<String>,
    pub faq_url: Option<String>,
    pub products: Vec<ProductRecord>,
    pub internal_links: CategorizedLinks,
}

impl BestSellerResolution {
    #[must_use]
    pub fn unresolved(internal_links: CategorizedLinks) -> Self {
        Self {
            best_sellers_url: None,
            contact_url: None,
            faq_url: None,
            products: Vec::new(),
            internal_links,
        }
    }
}
