use super::style;
use crate::audit::AuditReport;
use std::fmt::Write;

/// Render a report for the terminal: score line, issue count, then each
/// issue next to the recommendation at the same position.
pub fn render(report: &AuditReport) -> String {
    let mut out = String::new();
    let band = report.band();

    let score = match report.score {
        Some(_) => format!("{}/100", report.display_score()),
        None => "not scored".to_string(),
    };
    let _ = writeln!(
        out,
        "{} {}  {}",
        style::header("Design score:"),
        style::band(band, score),
        style::dim(format!("({band})"))
    );

    let count = report.issues.len();
    let noun = if count == 1 { "issue" } else { "issues" };
    let _ = writeln!(out, "{}", style::dim(format!("{count} {noun} found")));

    if report.issues.is_empty() && report.recommendations.is_empty() {
        let _ = writeln!(out, "\n  {}", style::success("✓ Nothing to fix"));
        return out;
    }

    for (issue, recommendation) in report.paired() {
        out.push('\n');
        match issue {
            Some(issue) => {
                let _ = writeln!(
                    out,
                    "  {} {}",
                    style::accent(issue.category().icon()),
                    style::header(&issue.kind)
                );
                let _ = writeln!(out, "    {}", issue.description);
            }
            None => {
                let _ = writeln!(out, "  {}", style::accent("•"));
            }
        }
        if let Some(recommendation) = recommendation {
            let _ = writeln!(out, "    {} {}", style::dim("→"), recommendation.recommendation);
        }
    }

    out
}
