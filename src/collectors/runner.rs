use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::classify::WorkFormat;
use crate::collectors::{ListingSource, SearchRequest};
use crate::models::listing::ListingSummary;
use crate::models::vacancy::{ClassifiedListing, ColumnLimits};
use crate::pipeline::{self, Outcome, SkipReason};
use crate::profile::{Profile, SearchScope};
use crate::error::StoreError;
use crate::store::ListingStore;

/// What happened to every item the source returned during one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectStats {
    pub found: usize,
    pub malformed: usize,
    /// Seen earlier in the same run, under another keyword or scope.
    pub repeated: usize,
    pub stale: usize,
    pub experience: usize,
    /// Title or description hit one of the profile's exclusion terms.
    pub excluded: usize,
    pub rejected_by_location: usize,
    pub accepted: usize,
    pub search_errors: usize,
    pub detail_errors: usize,
}

impl CollectStats {
    fn skipped(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::Stale => self.stale += 1,
            SkipReason::Experience => self.experience += 1,
            SkipReason::Excluded => self.excluded += 1,
        }
    }
}

#[derive(Debug, Default)]
pub struct Collected {
    pub stats: CollectStats,
    pub listings: Vec<ClassifiedListing>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub new: usize,
    pub duplicate: usize,
    pub errors: usize,
    /// Left unattempted after the store connection failed.
    pub unsaved: usize,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub stats: CollectStats,
    pub save: SaveReport,
    pub listings: Vec<ClassifiedListing>,
}

impl RunReport {
    pub fn new(collected: Collected, save: SaveReport) -> Self {
        Self {
            stats: collected.stats,
            save,
            listings: collected.listings,
        }
    }

    /// Accepted listings per category, largest first.
    pub fn by_category(&self) -> Vec<(String, usize)> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for listing in &self.listings {
            *counts.entry(listing.category.as_str()).or_default() += 1;
        }
        let mut out: Vec<(String, usize)> =
            counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        out.sort_by(|a, b| b.1.cmp(&a.1));
        out
    }

    pub fn by_format(&self) -> Vec<(WorkFormat, usize)> {
        [
            WorkFormat::Remote,
            WorkFormat::Hybrid,
            WorkFormat::Office,
            WorkFormat::Unknown,
        ]
        .into_iter()
        .map(|f| (f, self.listings.iter().filter(|l| l.work_format == f).count()))
        .filter(|(_, n)| *n > 0)
        .collect()
    }

    /// Highest scored first; ties keep collection order.
    pub fn top(&self, n: usize) -> Vec<&ClassifiedListing> {
        let mut ranked: Vec<&ClassifiedListing> = self.listings.iter().collect();
        ranked.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));
        ranked.truncate(n);
        ranked
    }
}

/// Walk every scope, keyword and page, classifying what comes back.
/// Source failures cost only the call that failed.
pub async fn collect(
    source: &dyn ListingSource,
    profile: &Profile,
    now: DateTime<Utc>,
) -> Collected {
    let plan = &profile.search;
    let mut collected = Collected::default();
    let mut seen = HashSet::new();

    for scope in &plan.scopes {
        tracing::info!(
            "Searching {} in scope '{}' (area {})",
            source.name(),
            scope.label,
            scope.area
        );

        for keyword in &plan.keywords {
            let text = match &scope.query_suffix {
                Some(suffix) => format!("{keyword} {suffix}"),
                None => keyword.clone(),
            };

            let mut page = 0;
            let mut last_page = 1;
            while page < last_page {
                let request = SearchRequest {
                    text: text.clone(),
                    area: scope.area.clone(),
                    per_page: scope.per_page,
                    page,
                    period_days: scope.max_age_days,
                };

                let result = match source.search(&request).await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Search '{text}' page {page} failed: {e}");
                        collected.stats.search_errors += 1;
                        tokio::time::sleep(Duration::from_millis(plan.page_delay_ms)).await;
                        break;
                    }
                };

                if page == 0 {
                    tracing::debug!(query = %text, found = result.found, pages = result.pages, "search results");
                }
                last_page = result.pages.min(plan.page_cap);

                for raw in result.items {
                    process_item(source, profile, scope, raw, now, &mut seen, &mut collected)
                        .await;
                }

                page += 1;
                tokio::time::sleep(Duration::from_millis(plan.page_delay_ms)).await;
            }
        }
    }

    let stats = &collected.stats;
    tracing::info!(
        "Collection finished: {} found, {} accepted, {} rejected by location, {} stale, {} experience, {} excluded, {} repeated, {} malformed",
        stats.found,
        stats.accepted,
        stats.rejected_by_location,
        stats.stale,
        stats.experience,
        stats.excluded,
        stats.repeated,
        stats.malformed
    );
    collected
}

async fn process_item(
    source: &dyn ListingSource,
    profile: &Profile,
    scope: &SearchScope,
    raw: serde_json::Value,
    now: DateTime<Utc>,
    seen: &mut HashSet<i64>,
    collected: &mut Collected,
) {
    let stats = &mut collected.stats;
    stats.found += 1;

    let summary: ListingSummary = match serde_json::from_value(raw) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("Skipping malformed listing: {e}");
            stats.malformed += 1;
            return;
        }
    };

    if !seen.insert(summary.id) {
        stats.repeated += 1;
        return;
    }

    if let Err(reason) = pipeline::screen(&summary, now, scope.max_age_days, &profile.search) {
        tracing::debug!(hh_id = summary.id, ?reason, "filtered");
        stats.skipped(reason);
        return;
    }

    let detail = if pipeline::needs_detail(profile, &summary) {
        let fetched = match source.detail(summary.id).await {
            Ok(d) => Some(d),
            Err(e) => {
                tracing::warn!(hh_id = summary.id, "Detail fetch failed, using snippet: {e}");
                stats.detail_errors += 1;
                None
            }
        };
        tokio::time::sleep(Duration::from_millis(profile.search.detail_delay_ms)).await;
        fetched
    } else {
        None
    };

    if let Some(d) = &detail
        && let Err(reason) = pipeline::screen_detail(&profile.search, d)
    {
        stats.skipped(reason);
        return;
    }

    match pipeline::classify(profile, &summary, detail.as_ref()) {
        Outcome::Accepted(listing) => {
            tracing::debug!(
                hh_id = listing.hh_id,
                category = %listing.category,
                score = listing.relevance_score,
                "accepted"
            );
            stats.accepted += 1;
            collected.listings.push(listing);
        }
        Outcome::RejectedByLocation { .. } => stats.rejected_by_location += 1,
    }
}

/// Open the store and save the batch. Nothing is opened for an empty batch,
/// and a store that cannot be opened leaves every listing counted as unsaved
/// so the run summary still gets printed.
pub async fn persist<S, F, Fut>(
    open: F,
    listings: &[ClassifiedListing],
    limits: &ColumnLimits,
) -> SaveReport
where
    S: ListingStore,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<S, StoreError>>,
{
    if listings.is_empty() {
        return SaveReport::default();
    }

    match open().await {
        Ok(mut store) => save_batch(&mut store, listings, limits).await,
        Err(e) => {
            tracing::error!(
                "Failed to open store, {} listings not saved: {e}",
                listings.len()
            );
            SaveReport {
                unsaved: listings.len(),
                ..Default::default()
            }
        }
    }
}

/// Write every listing through the store. Per-record failures are counted
/// and skipped; a connection failure abandons the rest of the batch.
pub async fn save_batch(
    store: &mut dyn ListingStore,
    listings: &[ClassifiedListing],
    limits: &ColumnLimits,
) -> SaveReport {
    let mut report = SaveReport::default();

    for (i, listing) in listings.iter().enumerate() {
        let row = listing.for_storage(limits);
        match store.insert_if_absent(&row).await {
            Ok(true) => report.new += 1,
            Ok(false) => report.duplicate += 1,
            Err(e) if e.is_connection() => {
                report.errors += 1;
                report.unsaved = listings.len() - i - 1;
                tracing::error!(
                    "Store connection failed at {}, {} listings not saved: {e}",
                    listing.hh_id,
                    report.unsaved
                );
                break;
            }
            Err(e) => {
                report.errors += 1;
                tracing::warn!("Failed to save {}: {e}", listing.hh_id);
            }
        }
    }

    tracing::info!(
        "Saved batch: {} new, {} duplicate, {} errors",
        report.new,
        report.duplicate,
        report.errors
    );
    report
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::collectors::SearchPage;
    use crate::error::{AppError, StoreError};
    use crate::models::listing::ListingDetail;
    use crate::store::memory::MemoryStore;

    #[derive(Default)]
    struct FakeSource {
        /// Items served per (query text, page).
        pages: HashMap<(String, u32), Vec<serde_json::Value>>,
        total_pages: u32,
        failing_queries: HashSet<String>,
        details: HashMap<i64, ListingDetail>,
        requests: Mutex<Vec<SearchRequest>>,
        detail_calls: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl ListingSource for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        async fn search(&self, request: &SearchRequest) -> Result<SearchPage, AppError> {
            self.requests.lock().unwrap().push(request.clone());
            if self.failing_queries.contains(&request.text) {
                return Err(AppError::Source("503 Service Unavailable".to_string()));
            }
            let items = self
                .pages
                .get(&(request.text.clone(), request.page))
                .cloned()
                .unwrap_or_default();
            Ok(SearchPage {
                found: items.len() as u64,
                pages: self.total_pages,
                items,
            })
        }

        async fn detail(&self, id: i64) -> Result<ListingDetail, AppError> {
            self.detail_calls.lock().unwrap().push(id);
            self.details
                .get(&id)
                .cloned()
                .ok_or_else(|| AppError::Source(format!("detail for {id} returned 404")))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 3, 12, 0, 0).unwrap()
    }

    fn profile(keywords: &[&str]) -> Profile {
        let mut profile = Profile::builtin().unwrap();
        profile.search.keywords = keywords.iter().map(|k| k.to_string()).collect();
        profile.search.scopes.truncate(1);
        profile.search.detail_delay_ms = 0;
        profile.search.page_delay_ms = 0;
        profile
    }

    fn item(id: i64, requirement: &str) -> serde_json::Value {
        json!({
            "id": id.to_string(),
            "name": "Аналитик",
            "area": { "id": "95", "name": "Тюмень" },
            "schedule": { "id": "fullDay" },
            "experience": { "id": "noExperience" },
            "employer": { "name": "ООО Ромашка" },
            "published_at": "2024-05-02T10:00:00+0300",
            "snippet": { "requirement": requirement }
        })
    }

    fn detail(id: i64, description: &str) -> ListingDetail {
        let mut raw = item(id, "");
        raw["description"] = json!(description);
        raw["key_skills"] = json!([{ "name": "Airflow" }]);
        serde_json::from_value(raw).unwrap()
    }

    #[tokio::test]
    async fn pagination_stops_at_page_cap() {
        let profile = profile(&["python"]);
        let source = FakeSource {
            total_pages: 5,
            ..Default::default()
        };
        collect(&source, &profile, now()).await;

        let pages: Vec<u32> = source.requests.lock().unwrap().iter().map(|r| r.page).collect();
        assert_eq!(pages, [0, 1]);
    }

    #[tokio::test]
    async fn pagination_stops_at_last_reported_page() {
        let profile = profile(&["python"]);
        let source = FakeSource {
            total_pages: 1,
            ..Default::default()
        };
        collect(&source, &profile, now()).await;
        assert_eq!(source.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn scope_parameters_reach_the_source() {
        let mut profile = profile(&["sql"]);
        profile.search.scopes = Profile::builtin().unwrap().search.scopes;
        let source = FakeSource {
            total_pages: 1,
            ..Default::default()
        };
        collect(&source, &profile, now()).await;

        let requests = source.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!((requests[0].text.as_str(), requests[0].area.as_str()), ("sql", "95"));
        assert_eq!(requests[0].period_days, 10);
        assert_eq!(
            (requests[1].text.as_str(), requests[1].area.as_str()),
            ("sql !Тюмень", "113")
        );
        assert_eq!(requests[1].per_page, 30);
    }

    #[tokio::test]
    async fn failed_search_skips_only_that_query() {
        let profile = profile(&["python", "sql"]);
        let mut source = FakeSource {
            total_pages: 1,
            ..Default::default()
        };
        source.failing_queries.insert("python".to_string());
        source
            .pages
            .insert(("sql".to_string(), 0), vec![item(1, "SQL отчеты, удаленно")]);
        source.details.insert(1, detail(1, "<p>SQL и Airflow</p>"));

        let collected = collect(&source, &profile, now()).await;
        assert_eq!(collected.stats.search_errors, 1);
        assert_eq!(collected.stats.accepted, 1);
        assert_eq!(collected.listings[0].hh_id, 1);
    }

    #[tokio::test]
    async fn repeated_and_malformed_items_are_skipped() {
        let profile = profile(&["python", "sql"]);
        let mut source = FakeSource {
            total_pages: 1,
            ..Default::default()
        };
        source
            .pages
            .insert(("python".to_string(), 0), vec![item(1, "Python"), json!({ "id": "x" })]);
        source.pages.insert(("sql".to_string(), 0), vec![item(1, "Python")]);
        source.details.insert(1, detail(1, "Python и Airflow"));

        let collected = collect(&source, &profile, now()).await;
        assert_eq!(collected.stats.found, 3);
        assert_eq!(collected.stats.malformed, 1);
        assert_eq!(collected.stats.repeated, 1);
        assert_eq!(collected.listings.len(), 1);
        assert_eq!(*source.detail_calls.lock().unwrap(), [1]);
    }

    #[tokio::test]
    async fn filters_run_before_detail_fetch() {
        let profile = profile(&["python"]);
        let mut stale = item(1, "Python");
        stale["published_at"] = json!("2024-04-01T10:00:00+0300");
        let mut senior = item(2, "Python");
        senior["experience"] = json!({ "id": "moreThan6" });
        let mut office_elsewhere = item(3, "Python в офисе");
        office_elsewhere["area"] = json!({ "id": "1", "name": "Москва" });

        let mut source = FakeSource {
            total_pages: 1,
            ..Default::default()
        };
        source
            .pages
            .insert(("python".to_string(), 0), vec![stale, senior, office_elsewhere]);

        let collected = collect(&source, &profile, now()).await;
        assert_eq!(collected.stats.stale, 1);
        assert_eq!(collected.stats.experience, 1);
        assert_eq!(collected.stats.rejected_by_location, 1);
        assert!(collected.listings.is_empty());
        assert_eq!(*source.detail_calls.lock().unwrap(), [3]);
    }

    #[tokio::test]
    async fn failed_detail_falls_back_to_snippet() {
        let profile = profile(&["python"]);
        let mut source = FakeSource {
            total_pages: 1,
            ..Default::default()
        };
        source.pages.insert(
            ("python".to_string(), 0),
            vec![item(9, "Python и <b>SQL</b> для отчетов")],
        );

        let collected = collect(&source, &profile, now()).await;
        assert_eq!(collected.stats.detail_errors, 1);
        let listing = &collected.listings[0];
        assert_eq!(listing.description, "Python и SQL для отчетов");
        assert_eq!(listing.skills, "python, sql");
        assert_eq!(listing.work_format, WorkFormat::Office);
    }

    #[tokio::test]
    async fn failed_searches_still_wait_between_requests() {
        let mut profile = profile(&["python", "sql", "excel"]);
        profile.search.page_delay_ms = 40;
        let mut source = FakeSource {
            total_pages: 1,
            ..Default::default()
        };
        for query in ["python", "sql", "excel"] {
            source.failing_queries.insert(query.to_string());
        }

        let started = std::time::Instant::now();
        let collected = collect(&source, &profile, now()).await;
        assert_eq!(collected.stats.search_errors, 3);
        assert!(started.elapsed() >= Duration::from_millis(120));
    }

    #[tokio::test]
    async fn excluded_titles_and_descriptions_are_counted() {
        let profile = profile(&["python"]);
        let mut lead = item(1, "Python");
        lead["name"] = json!("Ведущий аналитик данных");

        let mut source = FakeSource {
            total_pages: 1,
            ..Default::default()
        };
        source
            .pages
            .insert(("python".to_string(), 0), vec![lead, item(2, "Python"), item(3, "Python")]);
        source
            .details
            .insert(2, detail(2, "<p>Опыт работы более 5 лет, управление командой</p>"));
        source.details.insert(3, detail(3, "<p>Python и Airflow</p>"));

        let collected = collect(&source, &profile, now()).await;
        assert_eq!(collected.stats.excluded, 2);
        assert_eq!(collected.stats.accepted, 1);
        assert_eq!(collected.listings[0].hh_id, 3);
        // The title check runs before any detail fetch.
        assert_eq!(*source.detail_calls.lock().unwrap(), [2, 3]);
    }

    fn classified(hh_id: i64, category: &str, score: i32) -> ClassifiedListing {
        ClassifiedListing {
            hh_id,
            name: format!("Вакансия {hh_id}"),
            company: "ООО Ромашка".to_string(),
            salary_from: None,
            salary_to: None,
            url: format!("https://hh.ru/vacancy/{hh_id}"),
            skills: "не указаны".to_string(),
            description: String::new(),
            work_format: WorkFormat::Remote,
            city: "Тюмень".to_string(),
            category: category.to_string(),
            relevance_score: score,
        }
    }

    #[tokio::test]
    async fn save_batch_counts_new_duplicate_and_errors() {
        let limits = Profile::builtin().unwrap().limits.columns;
        let mut store =
            MemoryStore::default().fail_on(3, StoreError::Record("value too long".to_string()));
        let batch = [
            classified(1, "bi", 5),
            classified(2, "bi", 5),
            classified(1, "bi", 5),
            classified(3, "bi", 5),
        ];

        let report = save_batch(&mut store, &batch, &limits).await;
        assert_eq!(
            report,
            SaveReport {
                new: 2,
                duplicate: 1,
                errors: 1,
                unsaved: 0
            }
        );

        // A second run over the same listings writes nothing new.
        let again = save_batch(&mut store, &batch[..2], &limits).await;
        assert_eq!((again.new, again.duplicate), (0, 2));
    }

    #[tokio::test]
    async fn connection_failure_abandons_rest_of_batch() {
        let limits = Profile::builtin().unwrap().limits.columns;
        let mut store =
            MemoryStore::default().fail_on(2, StoreError::Connection("reset by peer".to_string()));
        let batch = [
            classified(1, "bi", 5),
            classified(2, "bi", 5),
            classified(3, "bi", 5),
            classified(4, "bi", 5),
        ];

        let report = save_batch(&mut store, &batch, &limits).await;
        assert_eq!((report.new, report.errors, report.unsaved), (1, 1, 2));
        assert_eq!(store.attempts, [1, 2]);
    }

    #[tokio::test]
    async fn store_that_cannot_open_leaves_batch_unsaved() {
        let limits = Profile::builtin().unwrap().limits.columns;
        let batch = [classified(1, "bi", 5), classified(2, "bi", 5)];

        let report = persist(
            || async { Err::<MemoryStore, _>(StoreError::Connection("pool timed out".to_string())) },
            &batch,
            &limits,
        )
        .await;
        assert_eq!(
            report,
            SaveReport {
                unsaved: 2,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn empty_batch_never_opens_the_store() {
        let limits = Profile::builtin().unwrap().limits.columns;
        let mut opened = false;
        let report = persist(
            || {
                opened = true;
                async { Ok::<_, StoreError>(MemoryStore::default()) }
            },
            &[],
            &limits,
        )
        .await;
        assert_eq!(report, SaveReport::default());
        assert!(!opened);
    }

    #[tokio::test]
    async fn opened_store_saves_the_batch() {
        let limits = Profile::builtin().unwrap().limits.columns;
        let batch = [classified(1, "bi", 5), classified(1, "bi", 5)];
        let report = persist(|| async { Ok::<_, StoreError>(MemoryStore::default()) }, &batch, &limits).await;
        assert_eq!((report.new, report.duplicate, report.unsaved), (1, 1, 0));
    }

    #[test]
    fn report_breakdowns_and_top_listings() {
        let mut listings = vec![
            classified(1, "bi", 4),
            classified(2, "excel", 9),
            classified(3, "bi", 7),
        ];
        listings[1].work_format = WorkFormat::Office;
        let report = RunReport::new(
            Collected {
                stats: CollectStats::default(),
                listings,
            },
            SaveReport::default(),
        );

        assert_eq!(
            report.by_category(),
            [("bi".to_string(), 2), ("excel".to_string(), 1)]
        );
        assert_eq!(
            report.by_format(),
            [(WorkFormat::Remote, 2), (WorkFormat::Office, 1)]
        );
        let top: Vec<i64> = report.top(2).iter().map(|l| l.hh_id).collect();
        assert_eq!(top, [2, 3]);
    }
}
