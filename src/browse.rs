//! Console presentation: stored-vacancy browsing and the run summary.

use sqlx::PgPool;

use crate::collectors::runner::RunReport;
use crate::config::{BrowseArgs, clamp_days};
use crate::models::vacancy::{Vacancy, VacancyFilters};
use crate::sanitize::truncate_chars;

pub async fn browse(pool: &PgPool, args: BrowseArgs) -> anyhow::Result<()> {
    let filters = VacancyFilters {
        days: clamp_days(args.days),
        category: args.category,
        work_format: args.format,
        min_salary: args.min_salary,
        limit: args.limit.max(1),
    };
    let vacancies = Vacancy::list(pool, &filters).await?;

    if vacancies.is_empty() {
        println!("No vacancies in the last {} days.", filters.days);
        return Ok(());
    }

    println!(
        "{:<10} {:>5} {:<18} {:<8} {:<34} {:<20} {:>16}",
        "ID", "SCORE", "CATEGORY", "FORMAT", "TITLE", "COMPANY", "SALARY"
    );
    println!("{}", "-".repeat(117));
    for v in &vacancies {
        println!(
            "{:<10} {:>5} {:<18} {:<8} {:<34} {:<20} {:>16}",
            v.hh_id,
            v.relevance_score,
            cell(&v.category, 18),
            v.work_format,
            cell(&v.name, 34),
            cell(&v.company, 20),
            format_salary(v.salary_from, v.salary_to)
        );
    }
    println!("\n{} vacancies", vacancies.len());
    Ok(())
}

pub async fn stats(pool: &PgPool, days: i32) -> anyhow::Result<()> {
    let days = clamp_days(days);
    let categories = Vacancy::category_stats(pool, days).await?;
    let formats = Vacancy::format_stats(pool, days).await?;
    let cities = Vacancy::city_stats(pool, days, 10).await?;

    println!("Last {days} days\n");
    println!("{:<20} {:>6} {:>12}", "CATEGORY", "COUNT", "AVG SALARY");
    println!("{}", "-".repeat(40));
    for c in &categories {
        let avg = c
            .avg_salary
            .map_or_else(|| "-".to_string(), |a| format!("{}", a.round() as i64));
        println!("{:<20} {:>6} {:>12}", cell(&c.category, 20), c.count, avg);
    }

    println!("\n{:<20} {:>6}", "FORMAT", "COUNT");
    println!("{}", "-".repeat(27));
    for f in &formats {
        println!("{:<20} {:>6}", f.label, f.count);
    }

    println!("\n{:<20} {:>6}", "CITY", "COUNT");
    println!("{}", "-".repeat(27));
    for c in &cities {
        println!("{:<20} {:>6}", cell(&c.label, 20), c.count);
    }
    Ok(())
}

pub async fn show(pool: &PgPool, hh_id: i64) -> anyhow::Result<()> {
    let v = Vacancy::get(pool, hh_id).await?;
    println!("Vacancy #{}", v.hh_id);
    println!("Title: {}", v.name);
    println!("Company: {}", v.company);
    println!("City: {}", v.city);
    println!("Format: {}", v.work_format);
    println!("Category: {}", v.category);
    println!("Score: {}", v.relevance_score);
    println!("Salary: {}", format_salary(v.salary_from, v.salary_to));
    println!("Skills: {}", v.skills);
    println!("URL: {}", v.url);
    println!("Collected: {}", v.created_date.format("%Y-%m-%d %H:%M"));
    if !v.description.is_empty() {
        println!("\n{}", v.description);
    }
    Ok(())
}

pub async fn open(pool: &PgPool, hh_id: i64) -> anyhow::Result<()> {
    let v = Vacancy::get(pool, hh_id).await?;
    open::that(&v.url)?;
    println!("Opened {}", v.url);
    Ok(())
}

pub fn print_run_summary(report: &RunReport) {
    let s = &report.stats;
    println!("Run summary");
    println!("{}", "-".repeat(40));
    println!("{:<28} {:>8}", "Listings seen", s.found);
    println!("{:<28} {:>8}", "Accepted", s.accepted);
    println!("{:<28} {:>8}", "Rejected by location", s.rejected_by_location);
    println!("{:<28} {:>8}", "Too old", s.stale);
    println!("{:<28} {:>8}", "Experience filtered", s.experience);
    println!("{:<28} {:>8}", "Excluded by title or text", s.excluded);
    println!("{:<28} {:>8}", "Repeated in this run", s.repeated);
    println!("{:<28} {:>8}", "Malformed", s.malformed);
    println!("{:<28} {:>8}", "Failed searches", s.search_errors);
    println!("{:<28} {:>8}", "Failed detail fetches", s.detail_errors);
    println!();
    println!("{:<28} {:>8}", "New", report.save.new);
    println!("{:<28} {:>8}", "Already stored", report.save.duplicate);
    println!("{:<28} {:>8}", "Save errors", report.save.errors);
    if report.save.unsaved > 0 {
        println!("{:<28} {:>8}", "Not saved (store unavailable)", report.save.unsaved);
    }

    if report.listings.is_empty() {
        return;
    }

    println!("\nBy category");
    for (category, count) in report.by_category() {
        println!("  {:<24} {:>6}", category, count);
    }
    println!("\nBy work format");
    for (format, count) in report.by_format() {
        println!("  {:<24} {:>6}", format, count);
    }

    println!("\nTop listings");
    println!(
        "  {:>5} {:<18} {:<8} {:<40} {:>16}",
        "SCORE", "CATEGORY", "FORMAT", "TITLE", "SALARY"
    );
    for l in report.top(10) {
        println!(
            "  {:>5} {:<18} {:<8} {:<40} {:>16}",
            l.relevance_score,
            cell(&l.category, 18),
            l.work_format,
            cell(&l.name, 40),
            format_salary(l.salary_from, l.salary_to)
        );
    }
}

fn format_salary(from: Option<i64>, to: Option<i64>) -> String {
    match (from, to) {
        (Some(from), Some(to)) if from == to => from.to_string(),
        (Some(from), Some(to)) => format!("{from}-{to}"),
        (Some(from), None) => format!("{from}+"),
        (None, Some(to)) => format!("<{to}"),
        (None, None) => "-".to_string(),
    }
}

/// Fit text into a table column, marking cuts with "...".
fn cell(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        format!("{}...", truncate_chars(s, width.saturating_sub(3)))
    }
}
