use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::report::{AuditReport, Issue, IssueCategory, Recommendation};
use crate::error::AuditError;

const FENCE: &str = "```";

/// Byte offset of the first fence that opens a line. Backticks inside a
/// JSON string never qualify because JSON strings cannot span lines.
fn opening_fence(text: &str) -> Option<usize> {
    text.match_indices(FENCE).map(|(i, _)| i).find(|&i| {
        let line_start = text[..i].rfind('\n').map_or(0, |n| n + 1);
        text[line_start..i].chars().all(|c| c == ' ' || c == '\t')
    })
}

/// Remove a markdown code fence (with optional language tag) wrapping the
/// model output. Only a fence at the start of a line opens a block, and the
/// block runs to the last fence in the text; anything else is returned
/// trimmed and untouched. Applying it twice gives the same result as
/// applying it once.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(open) = opening_fence(trimmed) else {
        return trimmed;
    };

    let after_open = &trimmed[open + FENCE.len()..];
    let tag_len = after_open
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(after_open.len());
    let body = &after_open[tag_len..];

    let body = match body.rfind(FENCE) {
        Some(close) => &body[..close],
        None => body,
    };
    body.trim()
}

#[derive(Debug, Default, Deserialize)]
struct WireReport {
    #[serde(default, deserialize_with = "deserialize_score")]
    score: Option<i64>,
    #[serde(default)]
    issues: Vec<WireIssue>,
    #[serde(default)]
    recommendations: Vec<WireRecommendation>,
}

#[derive(Debug, Deserialize)]
struct WireIssue {
    #[serde(rename = "type")]
    kind: String,
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireRecommendation {
    Text(String),
    Object { recommendation: String },
}

impl From<WireRecommendation> for Recommendation {
    fn from(value: WireRecommendation) -> Self {
        match value {
            WireRecommendation::Text(text) | WireRecommendation::Object { recommendation: text } => {
                Recommendation::new(text)
            }
        }
    }
}

fn deserialize_score<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Number>::deserialize(deserializer)?;
    let Some(number) = value else {
        return Ok(None);
    };
    if let Some(int) = number.as_i64() {
        return Ok(Some(int));
    }
    match number.as_f64() {
        Some(float) if float.is_finite() => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
            let rounded = float.round().clamp(i64::MIN as f64, i64::MAX as f64) as i64;
            Ok(Some(rounded))
        }
        _ => Err(serde::de::Error::custom("score is not a representable number")),
    }
}

/// Turn raw model text into an [`AuditReport`].
///
/// Fences are stripped first. The remainder must be a JSON object whose
/// present fields have the expected types; anything else is a
/// [`AuditError::MalformedResponse`]. When the model supplies no
/// recommendations, one is derived per issue from its category.
pub fn parse_report(raw: &str) -> Result<AuditReport, AuditError> {
    let body = strip_code_fences(raw);
    if body.is_empty() {
        return Err(AuditError::MalformedResponse("empty response".into()));
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| AuditError::MalformedResponse(format!("invalid JSON: {e}")))?;
    if !value.is_object() {
        return Err(AuditError::MalformedResponse(
            "expected a JSON object at the top level".into(),
        ));
    }

    let wire: WireReport = serde_json::from_value(value)
        .map_err(|e| AuditError::MalformedResponse(format!("unexpected shape: {e}")))?;

    let issues: Vec<Issue> = wire
        .issues
        .into_iter()
        .map(|i| Issue {
            kind: i.kind,
            description: i.description,
        })
        .collect();

    let mut recommendations: Vec<Recommendation> = wire
        .recommendations
        .into_iter()
        .map(Recommendation::from)
        .filter(|r| !r.recommendation.trim().is_empty())
        .collect();

    if recommendations.is_empty() {
        recommendations = issues
            .iter()
            .map(|issue| IssueCategory::from_tag(&issue.kind).recommend(&issue.description))
            .collect();
    }

    Ok(AuditReport {
        score: wire.score,
        issues,
        recommendations,
    })
}
