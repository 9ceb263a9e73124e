use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{Claim, ClaimType, ClaimVerification};
use crate::util::enclosing_sentence;

// Patterns that need capitalised names stay case-sensitive and opt into
// case-insensitivity only for their verb/unit part.

static STATISTIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b\d+(?:[.,]\d+)*\s*(?:%|(?i:percent|per cent|million|billion|crore|lakh|thousand)\b)",
    )
    .expect("valid statistic pattern")
});

static QUOTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"["“]([^"“”]{10,300})["”](?:,?\s*(?i:said|says|stated|claimed|according to)\s+[A-Z][\w'-]*(?:\s+[A-Z][\w'-]*)*)?"#,
    )
    .expect("valid quote pattern")
});

static EVENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?i:happened|occurred|took place|broke out)\s+(?i:in|at|near|on)\s+(?:the\s+)?[A-Z][\w'-]*(?:\s+[A-Z][\w'-]*)*",
    )
    .expect("valid event pattern")
});

static DATE_CLAIM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?i:on|since|by|until|in)\s+(?:(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2}(?:st|nd|rd|th)?(?:,\s*\d{4})?|(?:19|20)\d{2}\b)",
    )
    .expect("valid date pattern")
});

fn unverified(text: &str, claim_type: ClaimType) -> Claim {
    Claim {
        text: text.trim().to_string(),
        claim_type,
        verification: ClaimVerification::default(),
    }
}

/// Candidate factual claims in `text`: every statistic, then every quote,
/// then every event, each in order of appearance.
///
/// Statistic and event claims carry their whole sentence; quotes carry the
/// quoted text plus any attribution. Overlapping hits are kept.
pub fn extract_claims(text: &str) -> Vec<Claim> {
    let mut claims = Vec::new();

    for m in STATISTIC_RE.find_iter(text) {
        claims.push(unverified(
            enclosing_sentence(text, m.start(), m.end()),
            ClaimType::Statistic,
        ));
    }
    for m in QUOTE_RE.find_iter(text) {
        claims.push(unverified(m.as_str(), ClaimType::Quote));
    }
    for m in EVENT_RE.find_iter(text) {
        claims.push(unverified(
            enclosing_sentence(text, m.start(), m.end()),
            ClaimType::Event,
        ));
    }

    claims
}

/// Dated assertions ("on March 3, 2024", "since 2019").
///
/// Not part of `extract_claims`: stories only track statistic, quote and
/// event claims.
pub fn extract_date_claims(text: &str) -> Vec<Claim> {
    DATE_CLAIM_RE
        .find_iter(text)
        .map(|m| unverified(enclosing_sentence(text, m.start(), m.end()), ClaimType::Factual))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viral::types::VerificationStatus;

    const SAMPLE: &str = "Turnout reached 64 percent in the capital. \
        \"The count was fair and open,\" said Maria Lopez. \
        Clashes broke out in New Delhi after the announcement.";

    #[test]
    fn test_claims_come_out_in_pattern_order() {
        let claims = extract_claims(SAMPLE);
        let kinds: Vec<ClaimType> = claims.iter().map(|c| c.claim_type).collect();
        assert_eq!(kinds, vec![ClaimType::Statistic, ClaimType::Quote, ClaimType::Event]);

        assert_eq!(claims[0].text, "Turnout reached 64 percent in the capital");
        assert_eq!(claims[1].text, "\"The count was fair and open,\" said Maria Lopez");
        assert_eq!(claims[2].text, "Clashes broke out in New Delhi after the announcement");
        assert!(claims
            .iter()
            .all(|c| c.verification.status == VerificationStatus::Unverified));
    }

    #[test]
    fn test_statistic_units() {
        for text in [
            "Prices rose 4.5% last year.",
            "The plan costs 3 billion dollars.",
            "About 2 crore people voted.",
            "Losses hit 1,200 thousand rupees.",
        ] {
            let claims = extract_claims(text);
            assert_eq!(claims.len(), 1, "{}", text);
            assert_eq!(claims[0].claim_type, ClaimType::Statistic);
        }
        assert!(extract_claims("There were 12 apples on the table.").is_empty());
    }

    #[test]
    fn test_event_needs_a_capitalised_place() {
        assert_eq!(extract_claims("A fire broke out in Mumbai overnight.").len(), 1);
        assert!(extract_claims("A fire broke out in the kitchen.").is_empty());
    }

    #[test]
    fn test_decimal_points_do_not_split_claims() {
        let claims = extract_claims("Officials cut 2.5 million jobs while wages rose 4 percent.");
        assert_eq!(claims.len(), 2);
        for claim in &claims {
            assert_eq!(claim.text, "Officials cut 2.5 million jobs while wages rose 4 percent");
        }
    }

    #[test]
    fn test_initialisms_do_not_split_claims() {
        let claims = extract_claims("The U.S. economy grew 3 percent last year. Exports slowed.");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].text, "The U.S. economy grew 3 percent last year");
    }

    #[test]
    fn test_repeated_statistics_are_not_deduplicated() {
        let claims = extract_claims("Support fell 5 percent, then 7 percent.");
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].text, claims[1].text);
    }

    #[test]
    fn test_date_claims_are_kept_separate() {
        let text = "The bridge has been closed since 2019. It reopens on March 3, 2027.";
        assert!(extract_claims(text).is_empty());

        let dated = extract_date_claims(text);
        assert_eq!(dated.len(), 2);
        assert_eq!(dated[1].text, "It reopens on March 3, 2027");
    }

    #[test]
    fn test_empty_text() {
        assert!(extract_claims("").is_empty());
        assert!(extract_date_claims("").is_empty());
    }
}
