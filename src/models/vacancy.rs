use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};

use crate::classify::WorkFormat;
use crate::error::AppError;
use crate::sanitize;

/// The pipeline's output record, one per accepted listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedListing {
    pub hh_id: i64,
    pub name: String,
    pub company: String,
    pub salary_from: Option<i64>,
    pub salary_to: Option<i64>,
    pub url: String,
    pub skills: String,
    pub description: String,
    pub work_format: WorkFormat,
    pub city: String,
    pub category: String,
    pub relevance_score: i32,
}

/// Per-column character caps enforced right before insert.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnLimits {
    pub name: usize,
    pub company: usize,
    pub url: usize,
    pub skills: usize,
    pub description: usize,
    pub category: usize,
    pub city: usize,
}

impl ClassifiedListing {
    /// Copy with every text column passed through the storage sanitizer
    /// and capped to its column limit.
    pub fn for_storage(&self, limits: &ColumnLimits) -> ClassifiedListing {
        let hh_id = self.hh_id;
        let clean = |column: &str, value: &str, max: usize| {
            let out = sanitize::clean_for_storage(value, max);
            if out.is_lossy() {
                tracing::warn!(hh_id, column, "dropped unstorable characters");
            }
            out.into_text()
        };

        ClassifiedListing {
            hh_id,
            name: clean("name", &self.name, limits.name),
            company: clean("company", &self.company, limits.company),
            salary_from: self.salary_from,
            salary_to: self.salary_to,
            url: sanitize::truncate_chars(&self.url, limits.url).to_string(),
            skills: clean("skills", &self.skills, limits.skills),
            description: clean("description", &self.description, limits.description),
            work_format: self.work_format,
            city: clean("city", &self.city, limits.city),
            category: sanitize::clean_for_storage(&self.category, limits.category)
                .into_text(),
            relevance_score: self.relevance_score,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct Vacancy {
    pub hh_id: i64,
    pub name: String,
    pub company: String,
    pub salary_from: Option<i64>,
    pub salary_to: Option<i64>,
    pub url: String,
    pub skills: String,
    pub description: String,
    pub category: String,
    pub relevance_score: i32,
    pub work_format: String,
    pub city: String,
    pub created_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct VacancyFilters {
    pub days: i32,
    pub category: Option<String>,
    pub work_format: Option<WorkFormat>,
    pub min_salary: Option<i64>,
    pub limit: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub struct CategoryStat {
    pub category: String,
    pub count: i64,
    pub avg_salary: Option<f64>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct CountStat {
    pub label: String,
    pub count: i64,
}

impl Vacancy {
    /// Insert unless a row with this hh_id exists. Returns whether a row
    /// was written.
    pub async fn insert_if_absent(
        conn: &mut PgConnection,
        listing: &ClassifiedListing,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "INSERT INTO vacancies (hh_id, name, company, salary_from, salary_to, url, skills, description, category, relevance_score, work_format, city) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) ON CONFLICT (hh_id) DO NOTHING RETURNING hh_id",
        )
        .bind(listing.hh_id)
        .bind(&listing.name)
        .bind(&listing.company)
        .bind(listing.salary_from)
        .bind(listing.salary_to)
        .bind(&listing.url)
        .bind(&listing.skills)
        .bind(&listing.description)
        .bind(&listing.category)
        .bind(listing.relevance_score)
        .bind(listing.work_format.as_str())
        .bind(&listing.city)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.is_some())
    }

    /// Most relevant first, newest first among equals.
    pub async fn list(pool: &PgPool, filters: &VacancyFilters) -> Result<Vec<Vacancy>, AppError> {
        let vacancies = sqlx::query_as::<_, Vacancy>(
            "SELECT * FROM vacancies WHERE created_date >= NOW() - make_interval(days => $1) AND ($2::text IS NULL OR category = $2) AND ($3::text IS NULL OR work_format = $3) AND ($4::bigint IS NULL OR salary_from >= $4 OR salary_to >= $4) ORDER BY relevance_score DESC, created_date DESC LIMIT $5",
        )
        .bind(filters.days)
        .bind(&filters.category)
        .bind(filters.work_format.map(|f| f.as_str()))
        .bind(filters.min_salary)
        .bind(filters.limit)
        .fetch_all(pool)
        .await?;
        Ok(vacancies)
    }

    pub async fn get(pool: &PgPool, hh_id: i64) -> Result<Vacancy, AppError> {
        sqlx::query_as::<_, Vacancy>("SELECT * FROM vacancies WHERE hh_id = $1")
            .bind(hh_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Vacancy {hh_id} not found")))
    }

    pub async fn category_stats(pool: &PgPool, days: i32) -> Result<Vec<CategoryStat>, AppError> {
        let stats = sqlx::query_as::<_, CategoryStat>(
            "SELECT category, COUNT(*) AS count, AVG(COALESCE(salary_from, salary_to))::float8 AS avg_salary FROM vacancies WHERE created_date >= NOW() - make_interval(days => $1) GROUP BY category ORDER BY count DESC",
        )
        .bind(days)
        .fetch_all(pool)
        .await?;
        Ok(stats)
    }

    pub async fn format_stats(pool: &PgPool, days: i32) -> Result<Vec<CountStat>, AppError> {
        let stats = sqlx::query_as::<_, CountStat>(
            "SELECT work_format AS label, COUNT(*) AS count FROM vacancies WHERE created_date >= NOW() - make_interval(days => $1) GROUP BY work_format ORDER BY count DESC",
        )
        .bind(days)
        .fetch_all(pool)
        .await?;
        Ok(stats)
    }

    pub async fn city_stats(
        pool: &PgPool,
        days: i32,
        limit: i64,
    ) -> Result<Vec<CountStat>, AppError> {
        let stats = sqlx::query_as::<_, CountStat>(
            "SELECT city AS label, COUNT(*) AS count FROM vacancies WHERE created_date >= NOW() - make_interval(days => $1) GROUP BY city ORDER BY count DESC LIMIT $2",
        )
        .bind(days)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(stats)
    }
}
