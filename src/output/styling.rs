use std::fmt::Display;

use console::{style, StyledObject};

use super::reporter::JobStatus;

/// `(STATUS)` tag coloured by outcome.
pub fn status_tag(status: JobStatus) -> StyledObject<String> {
    let tag = style(format!("({status})"));
    match status {
        JobStatus::Created | JobStatus::Started => tag.bright().green(),
        JobStatus::Updated | JobStatus::Running => tag.bright().yellow(),
        JobStatus::Removed => tag.cyan(),
        JobStatus::NotFound => tag.bright().red(),
    }
}

pub fn warning_label() -> StyledObject<&'static str> {
    style("warning:").bright().yellow()
}

pub fn muted(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn tool_name() -> StyledObject<&'static str> {
    style("🔧 cit").magenta().bold()
}

// Spinner messages
pub fn waiting(message: &str) -> StyledObject<String> {
    style(message.to_string()).bright().yellow()
}

pub fn succeeded(message: &str) -> StyledObject<String> {
    style(format!("{message} ✓")).bright().green()
}

pub fn failed(message: &str) -> StyledObject<String> {
    style(format!("{message} ✗")).bright().red()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_tag_text_is_unchanged_by_styling() {
        let tag = status_tag(JobStatus::NotFound).force_styling(false);
        assert_eq!(tag.to_string(), "(NOT FOUND)");
    }

    #[test]
    fn test_spinner_marks() {
        assert_eq!(
            succeeded("Jenkins 2.440").force_styling(false).to_string(),
            "Jenkins 2.440 ✓"
        );
        assert_eq!(
            failed("Jenkins unreachable").force_styling(false).to_string(),
            "Jenkins unreachable ✗"
        );
    }
}
