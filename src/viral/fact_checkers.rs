use chrono::Utc;

use super::types::{FactCheck, NormalizedRating};
use crate::error::{Error, Result};

/// A fact-checking organisation whose ratings are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactChecker {
    pub id: &'static str,
    pub name: &'static str,
    pub domain: &'static str,
    pub search_url: &'static str,
    pub country: &'static str,
    pub credibility_score: u8,
}

static FACT_CHECKERS: &[FactChecker] = &[
    FactChecker {
        id: "snopes",
        name: "Snopes",
        domain: "snopes.com",
        search_url: "https://www.snopes.com/?s=",
        country: "US",
        credibility_score: 90,
    },
    FactChecker {
        id: "politifact",
        name: "PolitiFact",
        domain: "politifact.com",
        search_url: "https://www.politifact.com/search/?q=",
        country: "US",
        credibility_score: 92,
    },
    FactChecker {
        id: "factcheck_org",
        name: "FactCheck.org",
        domain: "factcheck.org",
        search_url: "https://www.factcheck.org/search/?q=",
        country: "US",
        credibility_score: 92,
    },
    FactChecker {
        id: "afp",
        name: "AFP Fact Check",
        domain: "factcheck.afp.com",
        search_url: "https://factcheck.afp.com/search?keys=",
        country: "International",
        credibility_score: 90,
    },
    FactChecker {
        id: "reuters",
        name: "Reuters Fact Check",
        domain: "reuters.com/fact-check",
        search_url: "https://www.reuters.com/site-search/?query=",
        country: "International",
        credibility_score: 93,
    },
    FactChecker {
        id: "fullfact",
        name: "Full Fact",
        domain: "fullfact.org",
        search_url: "https://fullfact.org/search/?q=",
        country: "UK",
        credibility_score: 88,
    },
    FactChecker {
        id: "altnews",
        name: "Alt News",
        domain: "altnews.in",
        search_url: "https://www.altnews.in/?s=",
        country: "IN",
        credibility_score: 85,
    },
    FactChecker {
        id: "boom",
        name: "BOOM",
        domain: "boomlive.in",
        search_url: "https://www.boomlive.in/search?search_text=",
        country: "IN",
        credibility_score: 85,
    },
];

pub fn fact_checkers() -> &'static [FactChecker] {
    FACT_CHECKERS
}

/// Registry entry for `id`, matched case-insensitively.
pub fn fact_checker(id: &str) -> Option<&'static FactChecker> {
    let id = id.trim();
    FACT_CHECKERS.iter().find(|checker| checker.id.eq_ignore_ascii_case(id))
}

/// Maps an organisation's own rating label onto the shared scale.
///
/// More specific labels are tested first, so "mostly false" never reads as
/// "false" and "untrue" never reads as "true".
pub fn normalize_rating(rating: &str) -> NormalizedRating {
    let rating = rating.trim().to_lowercase().replace(['-', '_'], " ");
    let has = |needles: &[&str]| needles.iter().any(|needle| rating.contains(needle));

    if has(&["pants on fire"]) {
        NormalizedRating::PantsOnFire
    } else if has(&["mostly false"]) {
        NormalizedRating::MostlyFalse
    } else if has(&["mostly true", "mostly correct"]) {
        NormalizedRating::MostlyTrue
    } else if has(&["half true", "mixture", "mixed", "partly", "partially", "missing context"]) {
        NormalizedRating::HalfTrue
    } else if has(&["misleading", "exaggerat"]) {
        NormalizedRating::MostlyFalse
    } else if has(&["false", "fake", "untrue", "not true", "incorrect", "hoax", "fabricated"]) {
        NormalizedRating::False
    } else if has(&["true", "correct", "accurate"]) {
        NormalizedRating::True
    } else {
        NormalizedRating::Unrated
    }
}

/// Builds a fact-check from a registered organisation's rating.
pub fn new_fact_check(source_id: &str, url: &str, rating: &str, summary: &str) -> Result<FactCheck> {
    let checker =
        fact_checker(source_id).ok_or_else(|| Error::UnknownFactChecker(source_id.to_string()))?;

    Ok(FactCheck {
        source: checker.id.to_string(),
        url: url.trim().to_string(),
        rating: rating.trim().to_string(),
        normalized_rating: normalize_rating(rating),
        summary: summary.trim().to_string(),
        checked_at: Utc::now(),
    })
}
