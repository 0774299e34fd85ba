// Listing sources and the ingestion runner that drives them.

pub mod hh;
pub mod runner;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::listing::ListingDetail;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub text: String,
    pub area: String,
    pub per_page: u32,
    pub page: u32,
    /// Only listings published within this many days.
    pub period_days: i64,
}

/// One page of search results. Items stay as raw JSON so that one
/// malformed listing costs only itself.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub found: u64,
    pub pages: u32,
    pub items: Vec<serde_json::Value>,
}

/// A paginated job-listing API with a per-id detail endpoint.
#[async_trait]
pub trait ListingSource: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, AppError>;

    async fn detail(&self, id: i64) -> Result<ListingDetail, AppError>;
}
