use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The normalized review returned to callers.
///
/// Only ever built from a successfully parsed model response; see
/// [`super::parse::parse_report`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Raw model score. Not guaranteed to be in `0..=100`; use
    /// [`AuditReport::display_score`] for presentation.
    pub score: Option<i64>,
    pub issues: Vec<Issue>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub recommendation: String,
}

impl Recommendation {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            recommendation: text.into(),
        }
    }
}

impl Issue {
    #[must_use]
    pub fn category(&self) -> IssueCategory {
        IssueCategory::from_tag(&self.kind)
    }
}

impl AuditReport {
    /// Score clamped to `0..=100`; an absent score displays as 0.
    #[must_use]
    pub fn display_score(&self) -> u8 {
        self.score.map_or(0, clamp_score)
    }

    #[must_use]
    pub fn band(&self) -> ScoreBand {
        ScoreBand::for_score(self.score)
    }

    /// Issues and recommendations side by side, padded to the longer list.
    #[must_use]
    pub fn paired(&self) -> Vec<(Option<&Issue>, Option<&Recommendation>)> {
        let rows = self.issues.len().max(self.recommendations.len());
        (0..rows)
            .map(|i| (self.issues.get(i), self.recommendations.get(i)))
            .collect()
    }
}

#[must_use]
pub fn clamp_score(score: i64) -> u8 {
    // Lossless: the value is clamped into u8 range first.
    u8::try_from(score.clamp(0, 100)).unwrap_or(0)
}

/// Three-way colour classification of a score, plus a neutral band for
/// reports that carry no score at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ScoreBand {
    Positive,
    Warning,
    Negative,
    Unscored,
}

impl ScoreBand {
    #[must_use]
    pub fn for_score(score: Option<i64>) -> Self {
        match score {
            None => Self::Unscored,
            Some(s) if s >= 80 => Self::Positive,
            Some(s) if s >= 50 => Self::Warning,
            Some(_) => Self::Negative,
        }
    }
}

/// Closed set of issue categories the evaluator is asked to use.
///
/// Unknown tags map to [`IssueCategory::Other`], which carries the fallback
/// icon and advice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(ascii_case_insensitive)]
pub enum IssueCategory {
    #[strum(serialize = "Typography")]
    Typography,
    #[strum(serialize = "Element Alignment")]
    ElementAlignment,
    #[strum(serialize = "Color Scheme", serialize = "Colour Scheme")]
    ColorScheme,
    #[strum(serialize = "Whitespace Usage")]
    WhitespaceUsage,
    #[strum(serialize = "Image Quality")]
    ImageQuality,
    #[strum(serialize = "Other")]
    Other,
}

impl IssueCategory {
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        Self::from_str(tag.trim()).unwrap_or(Self::Other)
    }

    /// Terminal glyph shown next to the issue.
    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            Self::Typography => "Aa",
            Self::ElementAlignment => "⇹",
            Self::ColorScheme => "◐",
            Self::WhitespaceUsage => "⬚",
            Self::ImageQuality | Self::Other => "⚠",
        }
    }

    fn advice(self) -> &'static str {
        match self {
            Self::Typography => {
                "Consider using a more legible font with better contrast against the background."
            }
            Self::ElementAlignment => {
                "Improve alignment of elements using a grid system or flexbox."
            }
            Self::ColorScheme => {
                "Adjust color combinations to improve accessibility and visual harmony."
            }
            Self::WhitespaceUsage => {
                "Increase whitespace between elements to improve readability."
            }
            Self::ImageQuality => "Use higher resolution images for better visual quality.",
            Self::Other => "Improve this aspect of your design:",
        }
    }

    /// Derive a recommendation for an issue of this category.
    #[must_use]
    pub fn recommend(self, description: &str) -> Recommendation {
        let description = description.trim();
        if description.is_empty() {
            return Recommendation::new(self.advice());
        }
        Recommendation::new(format!("{} {description}", self.advice()))
    }
}
