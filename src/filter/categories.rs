use once_cell::sync::Lazy;

use crate::patterns::{phrases, Pattern};

/// A topic bucket assigned by keyword scan of an article's headline and description.
#[derive(Debug, Clone)]
pub struct Category {
    pub name: &'static str,
    keywords: Vec<Pattern>,
}

impl Category {
    pub fn new(name: &'static str, keywords: &[&'static str]) -> Self {
        Self {
            name,
            keywords: phrases(keywords),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|keyword| keyword.is_match(text))
    }
}

static BUILT_IN_CATEGORIES: Lazy<Vec<Category>> = Lazy::new(|| {
    vec![
        Category::new(
            "Politics",
            &["election", "parliament", "senate", "congress", "minister", "president", "vote", "campaign", "policy"],
        ),
        Category::new(
            "Technology",
            &["technology", "software", "artificial intelligence", "ai", "startup", "smartphone", "cyber", "internet", "chip"],
        ),
        Category::new(
            "Business",
            &["market", "stocks", "economy", "inflation", "earnings", "company", "trade", "bank", "investors"],
        ),
        Category::new(
            "Health",
            &["health", "hospital", "vaccine", "disease", "virus", "medical", "patients", "outbreak"],
        ),
        Category::new(
            "Science",
            &["science", "scientists", "research", "climate", "space", "nasa", "study", "species"],
        ),
        Category::new(
            "Sports",
            &["match", "tournament", "league", "football", "cricket", "olympic", "championship", "coach"],
        ),
        Category::new(
            "Entertainment",
            &["film", "movie", "music", "celebrity", "album", "box office", "actor", "streaming"],
        ),
        Category::new(
            "World",
            &["united nations", "war", "border", "refugees", "embassy", "ceasefire", "summit", "foreign"],
        ),
    ]
});

/// Built-in categories filtered to `active`; an empty list keeps all of them.
pub fn active_categories(active: &[String]) -> Vec<Category> {
    BUILT_IN_CATEGORIES
        .iter()
        .filter(|category| {
            active.is_empty() || active.iter().any(|name| name.eq_ignore_ascii_case(category.name))
        })
        .cloned()
        .collect()
}

/// Names of every category whose keyword list hits the title or description.
pub fn categorize(title: &str, description: &str, categories: &[Category]) -> Vec<String> {
    let text = format!("{} {}", title, description);
    categories
        .iter()
        .filter(|category| category.matches(&text))
        .map(|category| category.name.to_string())
        .collect()
}
