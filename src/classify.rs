// src/classify.rs
//! Article relevance classifier: structural validation, an exclusion pass,
//! an inclusion pass, and normalization into the stored article shape.
//! Pure and order-preserving; at most [`MAX_ARTICLES`] results per batch.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Accepted articles kept per batch, in input order.
pub const MAX_ARTICLES: usize = 10;

pub const PLACEHOLDER_DESCRIPTION: &str = "No description available.";
pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/300x200?text=Government+News";

/// Disqualifying fragments (entertainment, sports, celebrity, lifestyle).
/// A hit here rejects the candidate even when inclusion keywords match.
const EXCLUDE_KEYWORDS: &[&str] = &[
    "celebrity",
    "actor",
    "actress",
    "singer",
    "artist",
    "movie",
    "film",
    "concert",
    "album",
    "song",
    "music",
    "entertainment",
    "showbiz",
    "drama",
    "series",
    "tv show",
    "basketball",
    "football",
    "soccer",
    "volleyball",
    "boxing",
    "sports",
    "athlete",
    "game",
    "match",
    "tournament",
    "championship",
    "league",
    "player",
    "coach",
    "fashion",
    "beauty",
    "lifestyle",
    "gossip",
    "romance",
    "dating",
    "wedding",
    "social media",
    "instagram",
    "tiktok",
    "facebook post",
    "viral video",
];

/// Qualifying fragments: agencies, weather/disaster, politics and
/// administration, safety and preparedness. At least one must match;
/// candidates matching neither list are rejected (default-deny).
const INCLUDE_KEYWORDS: &[&str] = &[
    // Government agencies
    "dost",
    "pagasa",
    "ndrrmc",
    "phivolcs",
    "denr",
    "dilg",
    "doh",
    "dpwh",
    // Weather and disasters
    "typhoon",
    "storm",
    "flood",
    "earthquake",
    "tsunami",
    "landslide",
    "drought",
    "weather",
    "climate",
    "disaster",
    "calamity",
    "emergency",
    "evacuation",
    "rainfall",
    "temperature",
    "wind",
    "cyclone",
    "monsoon",
    "el niño",
    "la niña",
    // Politics and government
    "president",
    "senate",
    "congress",
    "government",
    "politics",
    "policy",
    "law",
    "mayor",
    "governor",
    "barangay",
    "lgu",
    "national",
    "local government",
    "budget",
    "infrastructure",
    "public",
    "citizen",
    "community",
    "province",
    "manila",
    "cebu",
    "davao",
    "region",
    "municipality",
    "city hall",
    // Safety and preparedness
    "safety",
    "preparedness",
    "warning",
    "alert",
    "advisory",
    "bulletin",
    "rescue",
    "relief",
    "assistance",
    "aid",
    "response",
    "recovery",
];

/// Raw article record from the upstream news source, pre-filtering.
/// Unknown upstream fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Candidate {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<Vec<String>>,
    #[serde(rename = "pubDate")]
    pub pub_date: Option<String>,
}

/// Attribution label derived from text/domain matching, priority-ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NewsSource {
    #[serde(rename = "PAGASA")]
    Pagasa,
    #[serde(rename = "DOST")]
    Dost,
    #[serde(rename = "NDRRMC")]
    Ndrrmc,
    Government,
}

impl fmt::Display for NewsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pagasa => "PAGASA",
            Self::Dost => "DOST",
            Self::Ndrrmc => "NDRRMC",
            Self::Government => "Government",
        };
        f.write_str(s)
    }
}

/// Normalized, filtered article ready for storage and display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedArticle {
    pub title: String,
    pub description: String,
    pub image: String,
    pub source: NewsSource,
    pub published_at: String,
    pub url: String,
    pub category: String,
}

/// Reduce a raw candidate batch to at most [`MAX_ARTICLES`] accepted
/// records, preserving input order. `fetched_at` supplies the fallback
/// `publishedAt` so the pass stays deterministic for a given run.
pub fn classify(candidates: &[Candidate], fetched_at: DateTime<Utc>) -> Vec<AcceptedArticle> {
    let fallback_ts = fetched_at.to_rfc3339_opts(SecondsFormat::Millis, true);

    let mut accepted = Vec::with_capacity(MAX_ARTICLES);
    for candidate in candidates {
        if accepted.len() == MAX_ARTICLES {
            break;
        }
        if !passes_structural(candidate) {
            debug!(target: "classify", title = ?candidate.title, "rejected: structural");
            continue;
        }
        let haystack = searchable_text(candidate);
        if let Some(kw) = first_hit(&haystack, EXCLUDE_KEYWORDS) {
            debug!(target: "classify", title = ?candidate.title, keyword = kw, "rejected: excluded topic");
            continue;
        }
        match first_hit(&haystack, INCLUDE_KEYWORDS) {
            Some(kw) => {
                debug!(target: "classify", title = ?candidate.title, keyword = kw, "accepted");
                accepted.push(normalize(candidate, &fallback_ts));
            }
            None => {
                debug!(target: "classify", title = ?candidate.title, "rejected: not relevant");
            }
        }
    }
    accepted
}

/// Title and an HTTP(S) link are mandatory.
fn passes_structural(candidate: &Candidate) -> bool {
    let title_ok = candidate
        .title
        .as_deref()
        .is_some_and(|t| !t.trim().is_empty());
    let link_ok = candidate
        .link
        .as_deref()
        .is_some_and(|l| l.starts_with("http://") || l.starts_with("https://"));
    title_ok && link_ok
}

/// Lowercase concatenation of title + description + content, the haystack
/// for both keyword passes.
fn searchable_text(candidate: &Candidate) -> String {
    format!(
        "{} {} {}",
        candidate.title.as_deref().unwrap_or_default(),
        candidate.description.as_deref().unwrap_or_default(),
        candidate.content.as_deref().unwrap_or_default()
    )
    .to_lowercase()
}

fn first_hit<'a>(haystack: &str, keywords: &[&'a str]) -> Option<&'a str> {
    keywords.iter().copied().find(|kw| haystack.contains(kw))
}

/// Derive the attribution label. Fixed priority order: pagasa, then dost,
/// then ndrrmc, defaulting to Government; first match wins,
/// case-insensitive, on text or link domain.
fn detect_source(candidate: &Candidate) -> NewsSource {
    let link = candidate.link.as_deref().unwrap_or_default().to_lowercase();
    let text = format!(
        "{} {} {}",
        candidate.title.as_deref().unwrap_or_default().to_lowercase(),
        candidate
            .description
            .as_deref()
            .unwrap_or_default()
            .to_lowercase(),
        link
    );

    if text.contains("pagasa") || link.contains("pagasa.dost.gov.ph") {
        NewsSource::Pagasa
    } else if text.contains("dost") || link.contains("dost.gov.ph") {
        NewsSource::Dost
    } else if text.contains("ndrrmc") || link.contains("ndrrmc.gov.ph") {
        NewsSource::Ndrrmc
    } else {
        NewsSource::Government
    }
}

/// Field rules: trimmed title, description falling back to content and
/// then a fixed placeholder, placeholder image, verbatim url, first
/// category or "Government".
fn normalize(candidate: &Candidate, fallback_ts: &str) -> AcceptedArticle {
    let description = candidate
        .description
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| {
            candidate
                .content
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
        .unwrap_or(PLACEHOLDER_DESCRIPTION)
        .to_string();

    AcceptedArticle {
        title: candidate.title.as_deref().unwrap_or_default().trim().to_string(),
        description,
        image: candidate
            .image_url
            .clone()
            .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
        source: detect_source(candidate),
        published_at: candidate
            .pub_date
            .clone()
            .unwrap_or_else(|| fallback_ts.to_string()),
        url: candidate.link.clone().unwrap_or_default(),
        category: candidate
            .category
            .as_ref()
            .and_then(|c| c.first().cloned())
            .unwrap_or_else(|| "Government".to_string()),
    }
}
