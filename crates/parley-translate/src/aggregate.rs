use std::sync::LazyLock;

use parley_query::{AggregationSpec, AggregationStage};
use regex::Regex;
use tracing::debug;

use crate::error::TranslateError;
use crate::literal;

static GROUP_BY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bgroup(?:ed)?\s+(?:\w+\s+)?by\s+([a-z_][\w.]*)").unwrap()
});
static COUNT_BY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bcount\s+(?:\w+\s+)?by\s+([a-z_][\w.]*)").unwrap()
});
static AVERAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:average|avg)\s+(?:of\s+)?(?:the\s+)?([a-z_][\w.]*)").unwrap()
});
static SUM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bsum\s+(?:of\s+)?(?:the\s+)?([a-z_][\w.]*)").unwrap()
});

/// Build an aggregation from a request.
///
/// Recognises one of "group by F", "count by F", "average F" and "sum F"
/// (first match wins), otherwise accepts a literal JSON pipeline.
pub fn synthesize(text: &str) -> Result<AggregationSpec, TranslateError> {
    let patterns: [(&Regex, fn(String) -> AggregationStage); 4] = [
        (&GROUP_BY, AggregationStage::GroupBy),
        (&COUNT_BY, AggregationStage::GroupBy),
        (&AVERAGE, AggregationStage::AverageOf),
        (&SUM, AggregationStage::SumOf),
    ];

    for (pattern, stage) in patterns {
        if let Some(caps) = pattern.captures(text) {
            let spec = AggregationSpec::single(stage(caps[1].to_string()));
            debug!(?spec, "recognised aggregation phrase");
            return Ok(spec);
        }
    }

    match literal::parse_pipeline(text) {
        Some(stages) if !stages.is_empty() => {
            Ok(AggregationSpec::single(AggregationStage::RawPipeline(stages)))
        }
        _ => Err(TranslateError::UnrecognizedAggregation(text.trim().to_string())),
    }
}
