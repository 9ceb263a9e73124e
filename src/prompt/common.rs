/// Closing instruction for prompts whose answer is parsed as JSON.
pub const JSON_ONLY: &str = r#"
Respond with a single JSON object and nothing else:
- no Markdown code fences,
- no commentary before or after the object,
- every field present, using the exact field names shown.
"#;
