//! HTML extraction for listing and article pages
//!
//! This module turns raw HTML into:
//! - The set of article URLs linked from the listing page
//! - A structured article record from an article page
//!
//! Nothing here performs I/O. Missing page elements degrade the result and
//! are reported as [`ExtractionWarning`]s; only an empty document is a
//! hard failure.

use crate::url::{classify_url, resolve_link};
use crate::ExtractionError;
use chrono::NaiveDateTime;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use std::fmt;
use url::Url;

/// Anchors on the listing page that point at articles
pub const TEASER_LINK_SELECTOR: &str = ".teaser__link";

const HEADLINE_SELECTOR: &str = ".seitenkopf__headline--text";
const SUB_HEADLINE_SELECTOR: &str = ".seitenkopf__topline";
const BODY_SELECTOR: &str = "div.article__body";
const FALLBACK_PARAGRAPH_SELECTOR: &str = "p.textabsatz";
const METADATA_SELECTOR: &str = ".metatextline";

/// Stored when the page has no headline element
pub const HEADLINE_PLACEHOLDER: &str = "No headline found";

/// Stored when neither body template yields any paragraph text
pub const CONTENT_PLACEHOLDER: &str = "No content found";

/// Separator between paragraphs in the stored content
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Day.month.year hour:minute, as printed after "Stand:"
const UPDATED_AT_PATTERN: &str = "%d.%m.%Y %H:%M";

/// Structured fields extracted from one article page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleExtract {
    pub url: String,
    pub headline: String,
    pub sub_headline: String,
    pub content: String,
    /// "Last updated" time printed on the page, in the site's local time
    pub updated_at: Option<NaiveDateTime>,
}

/// Non-fatal problems found while extracting an article
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionWarning {
    /// No headline element; the placeholder was stored
    MissingHeadline,
    /// No paragraph text under either body template; the placeholder was stored
    MissingContent,
    /// No metadata line to read the update time from
    MissingTimestamp,
    /// The metadata line did not match the expected date pattern
    UnparsableTimestamp(String),
}

impl fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingHeadline => write!(f, "no headline found"),
            Self::MissingContent => write!(f, "no content found"),
            Self::MissingTimestamp => write!(f, "no update timestamp found"),
            Self::UnparsableTimestamp(raw) => write!(f, "cannot parse update timestamp '{}'", raw),
        }
    }
}

/// An extracted article together with everything that was degraded
#[derive(Debug, Clone)]
pub struct Extraction {
    pub article: ArticleExtract,
    pub warnings: Vec<ExtractionWarning>,
}

/// Extracts the deduplicated set of article URLs from a listing page
///
/// Teaser hrefs are resolved against `base_url`; links that leave the site
/// are dropped. Malformed or empty HTML yields an empty set.
///
/// # Arguments
///
/// * `html` - The listing page HTML
/// * `base_url` - The URL the listing page was fetched from
///
/// # Returns
///
/// Absolute article URLs in sorted order
pub fn extract_links(html: &str, base_url: &Url) -> BTreeSet<String> {
    let document = Html::parse_document(html);
    let Some(selector) = parse_selector(TEASER_LINK_SELECTOR) else {
        return BTreeSet::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .filter(|url| classify_url(url, base_url).should_crawl())
        .map(String::from)
        .collect()
}

/// Extracts headline, sub-headline, body and update time from an article page
///
/// | Element | When missing |
/// |---------|--------------|
/// | headline | [`HEADLINE_PLACEHOLDER`] plus a warning |
/// | sub-headline | empty string |
/// | body paragraphs | fallback template, then [`CONTENT_PLACEHOLDER`] plus a warning |
/// | update time | `None` plus a warning |
///
/// # Errors
///
/// Returns [`ExtractionError::EmptyDocument`] if `html` contains nothing but
/// whitespace.
pub fn extract_article(html: &str, url: &str) -> Result<Extraction, ExtractionError> {
    if html.trim().is_empty() {
        return Err(ExtractionError::EmptyDocument {
            url: url.to_string(),
        });
    }

    let document = Html::parse_document(html);
    let mut warnings = Vec::new();

    let headline = match select_text(&document, HEADLINE_SELECTOR) {
        Some(text) => text,
        None => {
            warnings.push(ExtractionWarning::MissingHeadline);
            HEADLINE_PLACEHOLDER.to_string()
        }
    };

    let sub_headline = select_text(&document, SUB_HEADLINE_SELECTOR).unwrap_or_default();

    let paragraphs = body_paragraphs(&document);
    let content = if paragraphs.is_empty() {
        warnings.push(ExtractionWarning::MissingContent);
        CONTENT_PLACEHOLDER.to_string()
    } else {
        paragraphs.join(PARAGRAPH_SEPARATOR)
    };

    let updated_at = match first_match(&document, METADATA_SELECTOR) {
        Some(element) => {
            let raw = element_text(&element);
            match parse_updated_at(&raw) {
                Some(timestamp) => Some(timestamp),
                None => {
                    warnings.push(ExtractionWarning::UnparsableTimestamp(raw));
                    None
                }
            }
        }
        None => {
            warnings.push(ExtractionWarning::MissingTimestamp);
            None
        }
    };

    Ok(Extraction {
        article: ArticleExtract {
            url: url.to_string(),
            headline,
            sub_headline,
            content,
            updated_at,
        },
        warnings,
    })
}

/// Parses a metadata line such as `Stand: 01.03.2024 09:30 Uhr`
pub fn parse_updated_at(raw: &str) -> Option<NaiveDateTime> {
    let cleaned = raw.replace("Stand:", "").replace("Uhr", "");
    NaiveDateTime::parse_from_str(cleaned.trim(), UPDATED_AT_PATTERN).ok()
}

/// Paragraph texts from the primary body container, or the fallback template
///
/// The primary container wins whenever it exists, even if it holds no
/// paragraphs. Paragraphs without text are skipped.
fn body_paragraphs(document: &Html) -> Vec<String> {
    let paragraphs: Vec<ElementRef<'_>> = match first_match(document, BODY_SELECTOR) {
        Some(body) => match parse_selector("p") {
            Some(p) => body.select(&p).collect(),
            None => Vec::new(),
        },
        None => match parse_selector(FALLBACK_PARAGRAPH_SELECTOR) {
            Some(fallback) => document.select(&fallback).collect(),
            None => Vec::new(),
        },
    };

    paragraphs
        .iter()
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect()
}

fn parse_selector(selector: &str) -> Option<Selector> {
    Selector::parse(selector).ok()
}

fn first_match<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = parse_selector(selector)?;
    document.select(&selector).next()
}

/// Text of the first matching element, None if absent or blank
fn select_text(document: &Html, selector: &str) -> Option<String> {
    first_match(document, selector)
        .map(|element| element_text(&element))
        .filter(|text| !text.is_empty())
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
