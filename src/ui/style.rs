use crate::audit::ScoreBand;
use console::style;
use std::fmt::Display;

/// Green bold: success checkmarks, confirmations
pub fn success<D: Display>(text: D) -> String {
    style(text).green().bold().to_string()
}

/// White bold: section headers, titles
pub fn header<D: Display>(text: D) -> String {
    style(text).white().bold().to_string()
}

/// Dim: subtitles, secondary text, decorative lines
pub fn dim<D: Display>(text: D) -> String {
    style(text).dim().to_string()
}

/// Red bold: failures
pub fn error<D: Display>(text: D) -> String {
    style(text).red().bold().to_string()
}

/// Cyan bold: issue glyphs, bullet points
pub fn accent<D: Display>(text: D) -> String {
    style(text).cyan().bold().to_string()
}

/// Cyan underlined: URLs, links
pub fn url<D: Display>(text: D) -> String {
    style(text).cyan().underlined().to_string()
}

/// Score colour: green, yellow or red by band; dim when unscored.
pub fn band<D: Display>(band: ScoreBand, text: D) -> String {
    let styled = style(text).bold();
    match band {
        ScoreBand::Positive => styled.green(),
        ScoreBand::Warning => styled.yellow(),
        ScoreBand::Negative => styled.red(),
        ScoreBand::Unscored => styled.dim(),
    }
    .to_string()
}
