use crate::prompt::common::{current_date, JSON_ONLY};
use crate::rss::RawArticle;

pub const ANALYST_SYSTEM_PROMPT: &str = "You are an expert insurance and climate risk analyst. \
Analyze the article and provide structured insights. \
Always answer with strict JSON that matches the requested structure exactly.";

/// Instruction template for one article.
///
/// Requests exactly four fields: `category`, `key_insights`,
/// `risks_opportunities` (`risks`, `opportunities`) and `relevance_score`.
pub fn article_analysis_prompt(article: &RawArticle, categories: &[String]) -> String {
    format!(
        r#"Analyze this article and provide insights relevant to insurance and climate risk:
Title: {title}
Content: {summary}
Source: {source}

Today's date: {date}

Provide a JSON response with the following structure:
{{
    "category": "one of: {categories}",
    "key_insights": ["2-3 key insights for insurance industry"],
    "risks_opportunities": {{
        "risks": ["1-2 potential risks"],
        "opportunities": ["1-2 potential opportunities"]
    }},
    "relevance_score": number between 1-10
}}
{json_only}"#,
        title = article.title,
        summary = article.summary,
        source = article.source_name,
        date = current_date(),
        categories = categories.join(", "),
        json_only = JSON_ONLY
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_article_and_categories() {
        let article = RawArticle {
            title: "Hail losses climb".to_string(),
            summary: "Insured hail losses hit a record.".to_string(),
            url: "https://example.com/hail".to_string(),
            source_name: "Insurance Journal".to_string(),
            publish_date: String::new(),
            category_hints: Vec::new(),
        };
        let categories = vec!["Climate Risk".to_string(), "InsureTech".to_string()];

        let prompt = article_analysis_prompt(&article, &categories);
        assert!(prompt.contains("Title: Hail losses climb"));
        assert!(prompt.contains("Content: Insured hail losses hit a record."));
        assert!(prompt.contains("Source: Insurance Journal"));
        assert!(prompt.contains("one of: Climate Risk, InsureTech"));
        for key in ["\"category\"", "\"key_insights\"", "\"risks_opportunities\"", "\"relevance_score\""] {
            assert!(prompt.contains(key), "missing {}", key);
        }
    }
}
