//! The design audit pipeline: a fixed evaluation prompt, the call to the
//! model, and the strict gate that turns model text into a report.

pub mod orchestrator;
pub mod parse;
pub mod prompt;
pub mod report;

pub use orchestrator::Auditor;
pub use parse::{parse_report, strip_code_fences};
pub use prompt::{AUDIT_PROMPT, AuditPrompt};
pub use report::{AuditReport, Issue, IssueCategory, Recommendation, ScoreBand};
