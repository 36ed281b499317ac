//! Language-model analysis of normalized articles.
//!
//! The model is asked for a fixed JSON shape, but nothing enforces it, so its
//! output is parsed into an untyped document first and then validated into
//! [`Analysis`].

mod analyzer;
mod parsing;
mod types;

pub use self::analyzer::ArticleAnalyzer;
pub use self::parsing::{parse_analysis, resolve_category, strip_code_fences, validate_analysis};
pub use self::types::*;
