use chrono::Local;

/// Appended to every prompt that expects machine-readable output.
pub const JSON_ONLY: &str = r#"
Output rules:
1. Respond with a single JSON object and nothing else.
2. Do not wrap the JSON in Markdown code fences.
3. Do not add commentary before or after the JSON.
4. Use double quotes for every key and string value.
"#;

/// Utility function to get the current date in a human-readable format
pub fn current_date() -> String {
    let today = Local::now();
    format!(
        "{} {}, {}",
        today.format("%B"),
        today.format("%-d"),
        today.format("%Y")
    )
}
