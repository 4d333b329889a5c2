//! HTML parser for listing and detail pages
//!
//! This module handles parsing HTML content to extract:
//! - The total result-page count from the pagination indicator
//! - Detail links from a results page
//! - The fields of a job record from a detail page

use crate::storage::{Field, JobRecord};
use crate::url::canonicalize_identifier;
use crate::{FetchError, FetchResult};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Pagination indicator; its aria-label reads "Page 1 of N"
pub const PAGINATION_SELECTOR: &str = r#"section[aria-label^="Page 1 of"]"#;

/// Anchor wrapping each search result
pub const DETAIL_LINK_SELECTOR: &str = r#"a[data-testid="job-search-job-detail-link"]"#;

/// Path segment every detail URL carries
pub const DETAIL_PATH_MARKER: &str = "/job-detail/";

const TITLE_SELECTOR: &str = r#"[data-cy="jobTitle"]"#;
const COMPANY_SELECTOR: &str = r#"[data-cy="companyNameLink"]"#;
const LOCATION_SELECTOR: &str = r#"[data-cy="location"]"#;
const DESCRIPTION_SELECTOR: &str = "#jobDescription";
const JOB_TYPES_SELECTOR: &str = r#"[data-cy="locationDetails"] span"#;
const SKILLS_SELECTOR: &str = r#"div[data-cy="skillsList"] span"#;
const SALARY_SELECTOR: &str = r#"[data-cy="payDetails"] span"#;
const PUBLISH_DATE_SELECTOR: &str = r#"meta[property="og:publish_date"]"#;
const POSTED_DATE_SELECTOR: &str = r#"[data-cy="postedDate"]"#;

/// Parses the total from a pagination label such as "Page 1 of 12"
///
/// Returns `None` if the label has no positive number after "of".
pub fn parse_total_pages(label: &str) -> Option<u32> {
    let mut words = label.split_whitespace();
    words.find(|w| w.eq_ignore_ascii_case("of"))?;

    let digits: String = words
        .next()?
        .chars()
        .filter(|c| *c != ',')
        .take_while(|c| c.is_ascii_digit())
        .collect();

    digits.parse::<u32>().ok().filter(|n| *n >= 1)
}

/// Finds the pagination indicator in a results page and parses its total
///
/// # Returns
///
/// * `Some(n)` - The indicator was present and readable
/// * `None` - No indicator, or its label did not parse
pub fn find_total_pages(html: &str) -> Option<u32> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(PAGINATION_SELECTOR).ok()?;

    document
        .select(&selector)
        .next()
        .and_then(|section| section.value().attr("aria-label"))
        .and_then(parse_total_pages)
}

/// Extracts canonical detail identifiers from a results page
///
/// The page must contain the detail-link markup; a page without it is
/// reported as `FetchError::MissingMarkup` so the caller can skip it.
/// Hrefs that are not detail links or fail to canonicalize are dropped.
///
/// # Arguments
///
/// * `html` - The results page
/// * `page_url` - The URL the page was loaded from, for resolving relative hrefs
pub fn extract_detail_links(html: &str, page_url: &Url) -> FetchResult<Vec<String>> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(DETAIL_LINK_SELECTOR).map_err(|_| FetchError::MissingMarkup {
        url: page_url.to_string(),
        selector: DETAIL_LINK_SELECTOR.to_string(),
    })?;

    let anchors: Vec<ElementRef> = document.select(&selector).collect();
    if anchors.is_empty() {
        return Err(FetchError::MissingMarkup {
            url: page_url.to_string(),
            selector: DETAIL_LINK_SELECTOR.to_string(),
        });
    }

    let mut links = Vec::new();
    for anchor in anchors {
        let href = match anchor.value().attr("href") {
            Some(href) if href.contains(DETAIL_PATH_MARKER) => href,
            _ => continue,
        };

        match canonicalize_identifier(href, page_url) {
            Ok(identifier) => links.push(identifier),
            Err(e) => tracing::debug!("Dropping detail link {}: {}", href, e),
        }
    }

    Ok(links)
}

/// Builds a job record from a detail page
///
/// Missing elements become `Field::NotAvailable` or empty lists; this never
/// fails on markup alone.
pub fn parse_job_detail(html: &str, url: &str) -> JobRecord {
    let document = Html::parse_document(html);
    let mut record = JobRecord::new(url);

    record.title = Field::from_text(select_text(&document, TITLE_SELECTOR));
    record.company = Field::from_text(select_text(&document, COMPANY_SELECTOR));
    record.location = Field::from_text(select_text(&document, LOCATION_SELECTOR));
    record.salary = Field::from_text(select_text(&document, SALARY_SELECTOR));
    record.description = Field::from_text(select_raw_text(&document, DESCRIPTION_SELECTOR));
    record.posted_date = Field::from_text(select_attr(&document, PUBLISH_DATE_SELECTOR, "content"));
    record.updated_date = Field::from_text(
        select_text(&document, POSTED_DATE_SELECTOR).and_then(|t| parse_updated_date(&t)),
    );
    record.job_types = select_all_text(&document, JOB_TYPES_SELECTOR);
    record.skills = select_all_text(&document, SKILLS_SELECTOR);

    record
}

/// Pulls "X" out of a header like "Posted 3 days ago | Updated X"
fn parse_updated_date(text: &str) -> Option<String> {
    let (_, updated) = text.split_once('|')?;
    let updated = updated.trim();
    let updated = updated.strip_prefix("Updated ").unwrap_or(updated).trim();
    Some(updated.to_string())
}

/// Text of an element with each text node trimmed and blanks dropped
fn element_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn select_text(document: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    document.select(&selector).next().map(element_text)
}

/// Text of the first match exactly as it appears, whitespace included
fn select_raw_text(document: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    document
        .select(&selector)
        .next()
        .map(|e| e.text().collect::<String>())
}

fn select_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|e| e.value().attr(attr))
        .map(str::to_string)
}

fn select_all_text(document: &Html, css: &str) -> Vec<String> {
    match Selector::parse(css) {
        Ok(selector) => document
            .select(&selector)
            .map(element_text)
            .filter(|t| !t.is_empty())
            .collect(),
        Err(_) => Vec::new(),
    }
}
