use serde_json::{Map, Value};

use super::types::{Analysis, MAX_RELEVANCE, MIN_RELEVANCE};
use crate::error::{Error, Result};

const REQUIRED_KEYS: [&str; 4] = [
    "category",
    "key_insights",
    "risks_opportunities",
    "relevance_score",
];

/// Remove Markdown code fences (```json ... ``` or ``` ... ```) around a response.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        text = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest);
        if let Some(body) = text.trim_end().strip_suffix("```") {
            text = body;
        }
    }

    text.trim().trim_matches('`').trim()
}

/// Parse raw completion text into a validated [`Analysis`].
pub fn parse_analysis(raw: &str, categories: &[String], default_category: &str) -> Result<Analysis> {
    let cleaned = strip_code_fences(raw);
    let value: Value = serde_json::from_str(cleaned).map_err(|e| {
        Error::Parse(format!(
            "{}. Raw content: {}",
            e,
            cleaned.chars().take(500).collect::<String>()
        ))
    })?;

    validate_analysis(&value, categories, default_category)
}

/// Convert an untyped document into an [`Analysis`].
///
/// Missing keys and a non-numeric score reject the document. An unknown
/// category is replaced by `default_category` instead.
pub fn validate_analysis(
    value: &Value,
    categories: &[String],
    default_category: &str,
) -> Result<Analysis> {
    let object = value
        .as_object()
        .ok_or_else(|| Error::Validation(format!("expected a JSON object, got {}", type_name(value))))?;

    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|key| !object.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(Error::Validation(format!(
            "missing required keys: {}",
            missing.join(", ")
        )));
    }

    let category = resolve_category(
        object["category"].as_str().unwrap_or_default(),
        categories,
        default_category,
    );
    let key_insights = string_list(&object["key_insights"], "key_insights")?;

    let risks_opportunities = object["risks_opportunities"].as_object().ok_or_else(|| {
        Error::Validation(format!(
            "risks_opportunities must be an object, got {}",
            type_name(&object["risks_opportunities"])
        ))
    })?;
    let risks = optional_list(risks_opportunities, "risks")?;
    let opportunities = optional_list(risks_opportunities, "opportunities")?;

    let relevance_score = relevance_score(&object["relevance_score"])?;

    Ok(Analysis {
        category,
        key_insights,
        risks,
        opportunities,
        relevance_score,
    })
}

/// Map a model-provided label onto the configured category set.
///
/// Matching ignores case and surrounding whitespace and returns the configured
/// spelling; anything else becomes `default_category`.
pub fn resolve_category(candidate: &str, categories: &[String], default_category: &str) -> String {
    let candidate = candidate.trim();
    categories
        .iter()
        .find(|category| category.as_str() == candidate)
        .or_else(|| {
            categories
                .iter()
                .find(|category| category.eq_ignore_ascii_case(candidate))
        })
        .cloned()
        .unwrap_or_else(|| default_category.to_string())
}

fn relevance_score(value: &Value) -> Result<u8> {
    let score = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|score| score.is_finite())
    .ok_or_else(|| Error::Validation(format!("relevance_score is not numeric: {}", value)))?;

    Ok(score
        .round()
        .clamp(f64::from(MIN_RELEVANCE), f64::from(MAX_RELEVANCE)) as u8)
}

fn optional_list(object: &Map<String, Value>, key: &str) -> Result<Vec<String>> {
    object
        .get(key)
        .map(|value| string_list(value, key))
        .transpose()
        .map(Option::unwrap_or_default)
}

/// Accept an array of strings, a lone string, or null.
fn string_list(value: &Value, key: &str) -> Result<Vec<String>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(text) => Ok(non_empty(text).into_iter().collect()),
        Value::Array(items) => Ok(items
            .iter()
            .filter_map(|item| match item {
                Value::String(text) => non_empty(text),
                Value::Number(number) => Some(number.to_string()),
                _ => None,
            })
            .collect()),
        other => Err(Error::Validation(format!(
            "{} must be a list of strings, got {}",
            key,
            type_name(other)
        ))),
    }
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::{DEFAULT_CATEGORIES, DEFAULT_CATEGORY};
    use serde_json::json;

    fn categories() -> Vec<String> {
        DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
    }

    fn document(category: &str, score: Value) -> Value {
        json!({
            "category": category,
            "key_insights": ["Premiums rising", "Reinsurance capacity shrinking"],
            "risks_opportunities": {
                "risks": ["Coastal exposure"],
                "opportunities": ["Parametric cover"]
            },
            "relevance_score": score
        })
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  \n```JSON {\"a\": 1}```  \n"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("`{\"a\": 1}`"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_fenced_response() {
        let raw = format!("```json\n{}\n```", document("InsureTech", json!(7)));
        let analysis = parse_analysis(&raw, &categories(), DEFAULT_CATEGORY).unwrap();

        assert_eq!(analysis.category, "InsureTech");
        assert_eq!(analysis.key_insights.len(), 2);
        assert_eq!(analysis.risks, vec!["Coastal exposure".to_string()]);
        assert_eq!(analysis.opportunities, vec!["Parametric cover".to_string()]);
        assert_eq!(analysis.relevance_score, 7);
    }

    #[test]
    fn test_invalid_json_is_parse_failure() {
        let result = parse_analysis("```json\n{\"category\": \n```", &categories(), DEFAULT_CATEGORY);
        assert!(matches!(result, Err(Error::Parse(_))));

        let result = parse_analysis("I could not analyze this article.", &categories(), DEFAULT_CATEGORY);
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn test_score_is_clamped() {
        let cases = [
            (json!(-3), 1),
            (json!(0), 1),
            (json!(1), 1),
            (json!(5), 5),
            (json!(10), 10),
            (json!(11), 10),
            (json!(250), 10),
            (json!(7.6), 8),
            (json!("4"), 4),
        ];
        for (input, expected) in cases {
            let analysis =
                validate_analysis(&document("Policies", input.clone()), &categories(), DEFAULT_CATEGORY)
                    .unwrap();
            assert_eq!(analysis.relevance_score, expected, "input {}", input);
        }
    }

    #[test]
    fn test_non_numeric_score_is_rejected() {
        for input in [json!("very relevant"), json!(null), json!([7]), json!(true)] {
            let result = validate_analysis(&document("Policies", input), &categories(), DEFAULT_CATEGORY);
            assert!(matches!(result, Err(Error::Validation(_))));
        }
    }

    #[test]
    fn test_unknown_category_is_replaced() {
        let analysis =
            validate_analysis(&document("Crypto", json!(6)), &categories(), DEFAULT_CATEGORY).unwrap();
        assert_eq!(analysis.category, DEFAULT_CATEGORY);

        let analysis =
            validate_analysis(&document("Market Trends", json!(6)), &categories(), DEFAULT_CATEGORY)
                .unwrap();
        assert_eq!(analysis.category, "Market Trends");

        let analysis =
            validate_analysis(&document(" natural disasters ", json!(6)), &categories(), DEFAULT_CATEGORY)
                .unwrap();
        assert_eq!(analysis.category, "Natural Disasters");
    }

    #[test]
    fn test_non_string_category_is_replaced() {
        let mut value = document("Policies", json!(3));
        value["category"] = json!(42);
        let analysis = validate_analysis(&value, &categories(), DEFAULT_CATEGORY).unwrap();
        assert_eq!(analysis.category, DEFAULT_CATEGORY);
    }

    #[test]
    fn test_missing_keys_are_rejected() {
        for key in REQUIRED_KEYS {
            let mut value = document("Policies", json!(3));
            value.as_object_mut().unwrap().remove(key);
            let result = validate_analysis(&value, &categories(), DEFAULT_CATEGORY);
            match result {
                Err(Error::Validation(message)) => assert!(message.contains(key)),
                other => panic!("expected validation failure for {}, got {:?}", key, other),
            }
        }
    }

    #[test]
    fn test_wrong_shapes_are_rejected() {
        let mut value = document("Policies", json!(3));
        value["risks_opportunities"] = json!(["not", "an", "object"]);
        assert!(matches!(
            validate_analysis(&value, &categories(), DEFAULT_CATEGORY),
            Err(Error::Validation(_))
        ));

        let mut value = document("Policies", json!(3));
        value["key_insights"] = json!({"one": "two"});
        assert!(matches!(
            validate_analysis(&value, &categories(), DEFAULT_CATEGORY),
            Err(Error::Validation(_))
        ));

        assert!(matches!(
            validate_analysis(&json!([1, 2]), &categories(), DEFAULT_CATEGORY),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_lenient_lists() {
        let value = json!({
            "category": "Policies",
            "key_insights": "Single insight",
            "risks_opportunities": {"risks": ["", "  Flood  ", 3]},
            "relevance_score": 2
        });
        let analysis = validate_analysis(&value, &categories(), DEFAULT_CATEGORY).unwrap();
        assert_eq!(analysis.key_insights, vec!["Single insight".to_string()]);
        assert_eq!(analysis.risks, vec!["Flood".to_string(), "3".to_string()]);
        assert!(analysis.opportunities.is_empty());
    }
}
