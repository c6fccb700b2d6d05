//! The fixed evaluation prompt sent alongside every image.

/// Version-pinned instruction template for the design evaluator.
///
/// Process-wide constant. Bump `version` whenever `text` changes so logged
/// audits can be tied back to the wording that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditPrompt {
    pub version: &'static str,
    pub text: &'static str,
}

pub const AUDIT_PROMPT: AuditPrompt = AuditPrompt {
    version: "design-eval/2",
    text: PROMPT_TEXT,
};

const PROMPT_TEXT: &str = r#"# Role: Design Quality Evaluator

You review a single image of a visual or UI design (an app screen, a web page
screenshot, a poster, a mock-up) against established graphic-design, UI/UX and
accessibility standards (including WCAG contrast guidance).

## How to evaluate
1. Inspect hierarchy, typography, alignment, colour, whitespace and image quality.
2. Score the design from 0 to 100, where 100 is production-ready with no
   noticeable problems.
3. List the most important issues only. Prefer a few actionable findings over
   an exhaustive list.
4. For each issue give one concrete, respectful recommendation.

## Issue categories
Use one of these values for "type" whenever it fits:
- "Typography"
- "Element Alignment"
- "Color Scheme"
- "Whitespace Usage"
- "Image Quality"
Any other short category name is allowed when none of these apply.

## Output format
Reply with a single JSON object and nothing else, using 2-space indentation:

{
  "score": 72,
  "issues": [
    {"type": "Image Quality", "description": "Hero photo is pixelated at full width."},
    {"type": "Whitespace Usage", "description": "Cards are packed too tightly, creating clutter."}
  ],
  "recommendations": [
    "Export the hero image at 2x resolution and serve a responsive size.",
    "Increase the gap between cards to at least 24px."
  ]
}

Rules:
- "score" is an integer between 0 and 100.
- "issues" and "recommendations" are arrays; use [] when there is nothing to report.
- Do not add commentary before or after the JSON."#;

impl AuditPrompt {
    #[must_use]
    pub fn current() -> &'static Self {
        &AUDIT_PROMPT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_every_known_category() {
        for tag in [
            "Typography",
            "Element Alignment",
            "Color Scheme",
            "Whitespace Usage",
            "Image Quality",
        ] {
            assert!(AUDIT_PROMPT.text.contains(tag), "prompt missing {tag}");
        }
    }

    #[test]
    fn prompt_requests_the_report_shape() {
        let text = AuditPrompt::current().text;
        assert!(text.contains("\"score\""));
        assert!(text.contains("\"issues\""));
        assert!(text.contains("\"recommendations\""));
        assert!(text.contains("JSON"));
    }

    #[test]
    fn example_in_prompt_is_itself_a_valid_report() {
        let text = AUDIT_PROMPT.text;
        let start = text.find("{\n  \"score\"").unwrap();
        let end = start + text[start..].find("\n}").unwrap() + 2;
        let report = crate::audit::parse::parse_report(&text[start..end]).unwrap();
        assert_eq!(report.score, Some(72));
        assert_eq!(report.issues.len(), 2);
        assert_eq!(report.recommendations.len(), 2);
    }
}
