use once_cell::sync::Lazy;
use std::collections::BTreeSet;

use super::types::KeywordFilterResult;
use crate::patterns::{matched_labels, phrases, Pattern};

/// Score at or above which the keyword layer passes.
pub const KEYWORD_PASS_THRESHOLD: u8 = 50;

const CLICKBAIT_WEIGHT: u32 = 30;
const SENSATIONAL_WEIGHT: u32 = 15;
const QUALITY_WEIGHT: u32 = 10;
const QUALITY_BONUS_CAP: u32 = 30;

/// Headline-only clickbait constructions.
static CLICKBAIT_PATTERNS: Lazy<Vec<Pattern>> = Lazy::new(|| {
    vec![
        Pattern::regex("you won't believe", r"you won'?t believe"),
        Pattern::regex("you'll never guess", r"you('ll| will) never guess"),
        Pattern::regex("what happens next", r"what happen(s|ed) next"),
        Pattern::regex("this is why", r"\bthis is why\b"),
        Pattern::regex("here's why", r"\bhere'?s (why|what|how)\b"),
        Pattern::regex("numbered list", r"\b\d+\s+(reasons|things|ways|secrets|tricks|facts)\b"),
        Pattern::phrase("doctors hate"),
        Pattern::phrase("one weird trick"),
        Pattern::regex("blow your mind", r"blow your mind|mind-?blowing"),
        Pattern::phrase("jaw-dropping"),
        Pattern::phrase("shocking"),
        Pattern::regex("must see", r"\bmust[- ](see|watch|read)\b"),
        Pattern::phrase("gone wrong"),
        Pattern::phrase("you need to know"),
        Pattern::phrase("goes viral"),
    ]
});

/// Single emotive words; a hit in the headline counts twice.
pub(crate) static SENSATIONAL_WORDS: Lazy<Vec<Pattern>> = Lazy::new(|| {
    phrases(&[
        "shocking",
        "bombshell",
        "scandal",
        "outrage",
        "outrageous",
        "explosive",
        "devastating",
        "horrifying",
        "terrifying",
        "slams",
        "destroys",
        "chaos",
        "catastrophic",
        "unbelievable",
        "insane",
        "stunning",
        "furious",
        "meltdown",
        "apocalyptic",
        "hysteria",
    ])
});

/// Sourcing and attribution language that signals careful reporting.
pub(crate) static QUALITY_INDICATORS: Lazy<Vec<Pattern>> = Lazy::new(|| {
    phrases(&[
        "according to",
        "research shows",
        "study finds",
        "studies show",
        "data shows",
        "data from",
        "published in",
        "peer-reviewed",
        "official statement",
        "confirmed by",
        "spokesperson",
        "survey of",
        "analysis of",
    ])
});

/// Rule-based clickbait/sensationalism/quality scan of an article's text.
///
/// Pure and deterministic. Any field may be empty.
pub fn analyze_text(title: &str, description: &str, content: &str) -> KeywordFilterResult {
    let title_text = title.to_lowercase();
    let full_text = format!("{} {} {}", title, description, content).to_lowercase();

    let mut flagged_keywords = BTreeSet::new();

    let mut clickbait_matches = 0u32;
    for pattern in CLICKBAIT_PATTERNS.iter() {
        if let Some(found) = pattern.find(&title_text) {
            clickbait_matches += 1;
            flagged_keywords.insert(found);
        }
    }
    let clickbait_score = (clickbait_matches * CLICKBAIT_WEIGHT).min(100);

    let mut sensational_matches = 0u32;
    for pattern in SENSATIONAL_WORDS.iter() {
        if pattern.is_match(&title_text) {
            sensational_matches += 2;
            flagged_keywords.insert(pattern.label.to_string());
        } else if pattern.is_match(&full_text) {
            sensational_matches += 1;
            flagged_keywords.insert(pattern.label.to_string());
        }
    }
    let sensationalism_score = (sensational_matches * SENSATIONAL_WEIGHT).min(100);

    let quality_indicators: Vec<String> = matched_labels(&QUALITY_INDICATORS, &full_text)
        .into_iter()
        .map(str::to_string)
        .collect();
    let quality_bonus = (quality_indicators.len() as u32 * QUALITY_WEIGHT).min(QUALITY_BONUS_CAP);

    let penalty = (clickbait_score + sensationalism_score) as f64 / 2.0;
    let score = (100.0 - penalty + quality_bonus as f64).round().clamp(0.0, 100.0) as u8;

    KeywordFilterResult {
        passed: score >= KEYWORD_PASS_THRESHOLD,
        score,
        flagged_keywords,
        clickbait_score: clickbait_score as u8,
        sensationalism_score: sensationalism_score as u8,
        quality_indicators,
    }
}
