use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde_json::Value;

use crate::collectors::{ListingSource, SearchPage, SearchRequest};
use crate::error::AppError;
use crate::models::listing::ListingDetail;
use crate::profile::SearchPlan;

/// Client for the hh.ru vacancies API. One connection pool is reused for
/// every call of a run.
pub struct HhClient {
    client: reqwest::Client,
    base_url: String,
}

impl HhClient {
    pub fn new(plan: &SearchPlan) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .user_agent(&plan.user_agent)
            .timeout(Duration::from_secs(plan.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: plan.api_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ListingSource for HhClient {
    fn name(&self) -> &str {
        "hh.ru"
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchPage, AppError> {
        let params = [
            ("text", request.text.clone()),
            ("area", request.area.clone()),
            ("per_page", request.per_page.to_string()),
            ("page", request.page.to_string()),
            ("period", request.period_days.to_string()),
            ("order_by", "publication_time".to_string()),
        ];

        let resp = self
            .client
            .get(format!("{}/vacancies", self.base_url))
            .query(&params)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::Source("429 Too Many Requests".to_string()));
        }

        if !resp.status().is_success() {
            return Err(AppError::Source(format!(
                "search for '{}' returned {}",
                request.text,
                resp.status()
            )));
        }

        let data: Value = resp.json().await?;
        parse_search_page(&data)
    }

    async fn detail(&self, id: i64) -> Result<ListingDetail, AppError> {
        let resp = self
            .client
            .get(format!("{}/vacancies/{id}", self.base_url))
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AppError::Source(format!(
                "detail for {id} returned {}",
                resp.status()
            )));
        }

        Ok(resp.json::<ListingDetail>().await?)
    }
}

/// Pull paging info and raw items out of a search response.
fn parse_search_page(data: &Value) -> Result<SearchPage, AppError> {
    let items = data
        .get("items")
        .and_then(|v| v.as_array())
        .ok_or_else(|| AppError::Source("Missing 'items' in response".to_string()))?;

    let found = data.get("found").and_then(|v| v.as_u64()).unwrap_or(0);
    let pages = data
        .get("pages")
        .and_then(|v| v.as_u64())
        .map_or(1, |p| u32::try_from(p).unwrap_or(u32::MAX));

    Ok(SearchPage {
        found,
        pages,
        items: items.clone(),
    })
}
