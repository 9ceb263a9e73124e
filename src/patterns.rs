use regex::Regex;

/// A named, pre-compiled, case-insensitive text rule.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub label: &'static str,
    regex: Regex,
}

impl Pattern {
    /// Literal phrase, anchored on word boundaries where the phrase starts or ends with a word character.
    pub fn phrase(phrase: &'static str) -> Self {
        let starts_word = phrase.chars().next().map_or(false, is_word_char);
        let ends_word = phrase.chars().last().map_or(false, is_word_char);
        let source = format!(
            "(?i){}{}{}",
            if starts_word { r"\b" } else { "" },
            regex::escape(phrase),
            if ends_word { r"\b" } else { "" }
        );
        Self::compile(phrase, &source)
    }

    /// Raw regular expression; matched case-insensitively.
    pub fn regex(label: &'static str, source: &str) -> Self {
        Self::compile(label, &format!("(?i){}", source))
    }

    fn compile(label: &'static str, source: &str) -> Self {
        // Rule tables are static; a pattern that fails to compile is a programming error.
        let regex = Regex::new(source)
            .unwrap_or_else(|e| panic!("invalid pattern '{}': {}", label, e));
        Self { label, regex }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Number of non-overlapping matches.
    pub fn count(&self, text: &str) -> usize {
        self.regex.find_iter(text).count()
    }

    /// The first matched text, lower-cased.
    pub fn find(&self, text: &str) -> Option<String> {
        self.regex.find(text).map(|m| m.as_str().to_lowercase())
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub fn phrases(list: &[&'static str]) -> Vec<Pattern> {
    list.iter().map(|p| Pattern::phrase(p)).collect()
}

/// Labels of every pattern in `table` found in `text`, in table order.
pub fn matched_labels(table: &[Pattern], text: &str) -> Vec<&'static str> {
    table
        .iter()
        .filter(|pattern| pattern.is_match(text))
        .map(|pattern| pattern.label)
        .collect()
}
