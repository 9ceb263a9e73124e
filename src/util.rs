use chrono::{DateTime, SecondsFormat, Utc};
use unicode_segmentation::UnicodeSegmentation;

/// Formats a timestamp the way every text column stores it, so lexical order is time order.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Truncates to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Lower-cased words longer than three characters, in order of appearance.
pub fn significant_words(text: &str) -> Vec<String> {
    text.unicode_words()
        .map(|word| word.to_lowercase())
        .filter(|word| word.chars().count() > 3)
        .collect()
}

/// Words that end in a period without ending the sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "st", "jr", "sr", "vs", "gov", "sen", "rep", "gen",
];

/// Whether the char `c` at byte `idx` of `text` ends a sentence.
///
/// A period only counts when whitespace or the end of the text follows it and
/// it does not close an initial, an initialism ("U.S.") or a known abbreviation.
fn is_sentence_break(text: &str, idx: usize, c: char) -> bool {
    match c {
        '!' | '?' | '\n' => true,
        '.' => {
            let followed_by_space = text[idx + 1..].chars().next().map_or(true, char::is_whitespace);
            if !followed_by_space {
                return false;
            }
            let word = text[..idx]
                .rsplit(char::is_whitespace)
                .next()
                .unwrap_or_default()
                .trim_start_matches(|c: char| !c.is_alphanumeric());
            let mut chars = word.chars();
            let is_initial = matches!((chars.next(), chars.next()), (Some(first), None) if first.is_uppercase());
            !(is_initial || word.contains('.') || ABBREVIATIONS.contains(&word.to_lowercase().as_str()))
        }
        _ => false,
    }
}

/// The sentence of `text` containing the byte range `start..end`.
pub fn enclosing_sentence(text: &str, start: usize, end: usize) -> &str {
    let sentence_start = text[..start]
        .char_indices()
        .rev()
        .find(|&(idx, c)| is_sentence_break(text, idx, c))
        .map_or(0, |(idx, c)| idx + c.len_utf8());
    let sentence_end = text[end..]
        .char_indices()
        .find(|&(idx, c)| is_sentence_break(text, end + idx, c))
        .map_or(text.len(), |(idx, _)| end + idx);
    text[sentence_start..sentence_end].trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_round_trip() {
        let ts = parse_timestamp("2026-10-18T09:30:00+02:00").unwrap();
        assert_eq!(format_timestamp(&ts), "2026-10-18T07:30:00Z");
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo world", 5), "héllo");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn test_significant_words() {
        assert_eq!(
            significant_words("The GDP grew 4.5 percent in India"),
            vec!["grew".to_string(), "percent".to_string(), "india".to_string()]
        );
    }

    #[test]
    fn test_enclosing_sentence() {
        let text = "First line. Unemployment fell to 3 percent last month. Third.";
        let start = text.find("3 percent").unwrap();
        let end = start + "3 percent".len();
        assert_eq!(
            enclosing_sentence(text, start, end),
            "Unemployment fell to 3 percent last month"
        );
    }

    #[test]
    fn test_sentence_breaks_skip_decimals_and_abbreviations() {
        let text = "Dr. Rao said output rose 2.5 percent in the U.S. last quarter. Prices fell.";
        let start = text.find("2.5").unwrap();
        assert_eq!(
            enclosing_sentence(text, start, start + 3),
            "Dr. Rao said output rose 2.5 percent in the U.S. last quarter"
        );

        let start = text.find("fell").unwrap();
        assert_eq!(enclosing_sentence(text, start, start + 4), "Prices fell");
    }
}
