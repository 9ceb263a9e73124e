use super::common::JSON_ONLY;
use crate::util::truncate_chars;

/// Characters of article body sent to the model.
pub const JUDGMENT_CONTENT_LIMIT: usize = 1500;

/// Prompt asking for a structured quality/bias/credibility judgment of one article.
///
/// `schema` is the JSON schema of the expected response object.
pub fn content_judgment_prompt(
    title: &str,
    source_name: &str,
    description: &str,
    content: &str,
    schema: &str,
) -> String {
    format!(
        r#"You are reviewing a news article for a curation service.
~~~
Title: {title}
Source: {source}
Description: {description}
Content: {content}
~~~

Score the article:
- qualityScore (0-100): depth, clarity, sourcing and professionalism of the writing.
- biasScore (-100 to 100): political lean, -100 strongly left, 0 neutral, 100 strongly right.
- credibilityScore (0-100): how trustworthy the factual claims appear given their sourcing.
- sentiment: one of "positive", "neutral", "negative".
- isOpinion: true if the piece is commentary, an editorial or an opinion column.
- isFactual: true if the piece mainly reports verifiable facts.

The response must match this JSON schema:
{schema}
{json_only}"#,
        title = title,
        source = source_name,
        description = description,
        content = truncate_chars(content, JUDGMENT_CONTENT_LIMIT),
        schema = schema,
        json_only = JSON_ONLY
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_is_truncated() {
        let content = "x".repeat(JUDGMENT_CONTENT_LIMIT + 500);
        let prompt = content_judgment_prompt("Title", "Reuters", "", &content, "{}");
        assert!(prompt.contains(&"x".repeat(JUDGMENT_CONTENT_LIMIT)));
        assert!(!prompt.contains(&"x".repeat(JUDGMENT_CONTENT_LIMIT + 1)));
        assert!(prompt.contains("Source: Reuters"));
    }
}
