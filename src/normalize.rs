//! Per-cell normalizers applied by the pipeline.
//!
//! - [`clean_html`] flattens a post's cooked HTML into one line of plain text.
//! - [`format_date`] turns a Discourse ISO-8601 timestamp into `YYYY-MM-DD HH:MM`.
//!
//! Both work on a single value and know nothing about tables; the pipeline
//! decides which column they are applied to.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use scraper::Html;

use crate::error::{NutshellError, Result};

/// Elements whose text is never rendered.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "template"];

/// Output layout for normalized timestamps.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Remove HTML markup and return the visible text.
///
/// Text inside `script`, `style` and `template` is skipped. Every other
/// text node is trimmed, empty nodes are dropped and the rest are
/// joined with a single space, so `<p>Hi <b>there</b></p>` becomes
/// `Hi there`. A missing value yields an empty string. The parser is
/// lenient: broken markup still produces whatever text it can recover.
///
/// # Examples
/// ```
/// use discuss_nutshell::normalize::clean_html;
///
/// assert_eq!(clean_html(Some("<p>Hi <b>there</b></p>")), "Hi there");
/// assert_eq!(clean_html(None), "");
/// ```
pub fn clean_html(html: Option<&str>) -> String {
    let Some(html) = html else {
        return String::new();
    };

    let fragment = Html::parse_fragment(html);
    fragment
        .root_element()
        .descendants()
        .filter(|node| {
            !node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|element| HIDDEN_ELEMENTS.contains(&element.name()))
            })
        })
        .filter_map(|node| node.value().as_text().map(|text| text.trim()))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Convert an ISO-8601 timestamp into `YYYY-MM-DD HH:MM`.
///
/// A trailing `Z` is read as `+00:00`. The result is rendered in the
/// timestamp's own offset and carries no timezone marker. Timestamps
/// without an offset are accepted as-is.
///
/// # Errors
/// [`NutshellError::InvalidTimestamp`] when the value cannot be parsed.
///
/// # Examples
/// ```
/// use discuss_nutshell::normalize::format_date;
///
/// assert_eq!(format_date("2025-11-22T18:11:23.522Z").unwrap(), "2025-11-22 18:11");
/// ```
pub fn format_date(iso_date: &str) -> Result<String> {
    let trimmed = iso_date.trim();
    let normalized = match trimmed
        .strip_suffix('Z')
        .or_else(|| trimmed.strip_suffix('z'))
    {
        Some(stem) => format!("{stem}+00:00"),
        None => trimmed.to_string(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(dt.format(DATE_FORMAT).to_string());
    }
    // Offsets without a colon (`+0000`) or without seconds (`10:30+02:00`).
    for layout in [
        "%Y-%m-%dT%H:%M:%S%.f%z",
        "%Y-%m-%d %H:%M:%S%.f%z",
        "%Y-%m-%dT%H:%M%:z",
        "%Y-%m-%dT%H:%M%z",
    ] {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, layout) {
            return Ok(dt.format(DATE_FORMAT).to_string());
        }
    }
    for layout in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, layout) {
            return Ok(naive.format(DATE_FORMAT).to_string());
        }
    }
    if let Ok(day) = NaiveDate::parse_from_str(&normalized, "%Y-%m-%d") {
        if let Some(midnight) = day.and_hms_opt(0, 0, 0) {
            return Ok(midnight.format(DATE_FORMAT).to_string());
        }
    }

    Err(NutshellError::invalid_timestamp(iso_date))
}
