use once_cell::sync::Lazy;

use super::types::{MisinformationAnalysis, MisinformationType};
use crate::patterns::{phrases, Pattern};

/// Risk above which a story's verification status is downgraded.
pub const RISK_DOWNGRADE_THRESHOLD: u32 = 50;

/// One family of misinformation cues.
struct CueFamily {
    category: &'static str,
    weight: u32,
    cues: Vec<Pattern>,
}

static FABRICATED: Lazy<CueFamily> = Lazy::new(|| CueFamily {
    category: "fabricated",
    weight: 30,
    cues: phrases(&[
        "anonymous sources claim",
        "leaked document",
        "secret memo",
        "they don't want you to know",
        "mainstream media won't",
        "cover-up",
        "insiders reveal",
        "100% proof",
        "hidden truth",
        "what they're not telling you",
    ]),
});

static OUT_OF_CONTEXT: Lazy<CueFamily> = Lazy::new(|| CueFamily {
    category: "out_of_context",
    weight: 20,
    cues: phrases(&[
        "old video",
        "old photo",
        "resurfaced",
        "from years ago",
        "unrelated footage",
        "recycled",
        "taken out of context",
        "file photo",
    ]),
});

static CLICKBAIT: Lazy<CueFamily> = Lazy::new(|| CueFamily {
    category: "clickbait",
    weight: 15,
    cues: phrases(&[
        "you won't believe",
        "shocking",
        "what happens next",
        "will blow your mind",
        "doctors hate",
        "one weird trick",
        "goes viral",
        "must see",
    ]),
});

static EMOTIONAL: Lazy<CueFamily> = Lazy::new(|| CueFamily {
    category: "emotional",
    weight: 10,
    cues: phrases(&[
        "outrageous",
        "terrifying",
        "disgusting",
        "share before it's deleted",
        "share this",
        "wake up",
        "heartbreaking",
        "furious",
    ]),
});

/// Scans a headline and optional body for misinformation cues.
///
/// Every matched cue adds a `"category: cue"` flag and its family's weight to
/// the risk score, which is not capped. The type follows the first family that
/// matched in priority order fabricated, out of context, clickbait.
pub fn detect_misinformation(title: &str, content: Option<&str>) -> MisinformationAnalysis {
    let text = match content {
        Some(content) if !content.is_empty() => format!("{} {}", title, content),
        _ => title.to_string(),
    };

    let mut analysis = MisinformationAnalysis::default();
    let mut matched_categories = Vec::new();

    for family in [&*FABRICATED, &*OUT_OF_CONTEXT, &*CLICKBAIT, &*EMOTIONAL] {
        for cue in &family.cues {
            if cue.is_match(&text) {
                analysis.flags.push(format!("{}: {}", family.category, cue.label));
                analysis.risk_score += family.weight;
                if !matched_categories.contains(&family.category) {
                    matched_categories.push(family.category);
                }
            }
        }
    }

    analysis.misinformation_type = if matched_categories.contains(&FABRICATED.category) {
        MisinformationType::Fabricated
    } else if matched_categories.contains(&OUT_OF_CONTEXT.category) {
        MisinformationType::OutOfContext
    } else if matched_categories.contains(&CLICKBAIT.category) {
        MisinformationType::MisleadingHeadline
    } else {
        MisinformationType::None
    };

    analysis
}
