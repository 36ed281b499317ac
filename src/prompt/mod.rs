mod analysis;
mod common;

pub use analysis::{article_analysis_prompt, ANALYST_SYSTEM_PROMPT};
pub use common::*;
