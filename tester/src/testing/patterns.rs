//! Ordered pattern lists
//!
//! A pattern list is matched left to right against the text. Each regex must
//! match exactly where the previous one stopped, unless it follows
//! [`PatternItem::Any`], which lets it float forward. Text left over after a
//! final anchored regex is a mismatch.

use regex::Regex;

use super::assertions::AssertionResult;

#[derive(Debug, Clone)]
pub enum PatternItem {
    Regex(Regex),
    /// Any run of text, including none
    Any,
}

impl PatternItem {
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(PatternItem::Regex)
    }

    /// Regex matching `text` literally
    pub fn literal(text: &str) -> Self {
        // An escaped literal is always a valid pattern
        match Regex::new(&regex::escape(text)) {
            Ok(regex) => PatternItem::Regex(regex),
            Err(_) => PatternItem::Any,
        }
    }
}

/// Match `patterns` in order against `actual`
pub fn assert_pattern_list(patterns: &[PatternItem], actual: &str, message: Option<&str>) -> AssertionResult {
    let mut rest = actual;
    let mut anchored = true;

    for (index, pattern) in patterns.iter().enumerate() {
        let regex = match pattern {
            PatternItem::Any => {
                anchored = false;
                continue;
            }
            PatternItem::Regex(regex) => regex,
        };

        let found = regex.find(rest).filter(|m| !anchored || m.start() == 0);
        let Some(found) = found else {
            let consumed = actual.len() - rest.len();
            return AssertionResult::failure(
                with_message(message, format!("Expected /{}/", regex.as_str())),
                Some(format!(
                    "to match {}\nafter {index} patterns with {consumed} characters",
                    describe_rest(rest)
                )),
            );
        };

        rest = &rest[found.end()..];
        anchored = true;
    }

    if anchored && !rest.is_empty() {
        return AssertionResult::failure(
            with_message(message, "Expected end of text".to_string()),
            Some(format!("but {rest:?} remains")),
        );
    }

    AssertionResult::success(with_message(message, format!("matched {} patterns", patterns.len())))
}

fn with_message(message: Option<&str>, text: String) -> String {
    match message {
        Some(message) if !message.is_empty() => format!("{message}\n{text}"),
        _ => text,
    }
}

/// Multi-line remainders are listed one line per row
fn describe_rest(rest: &str) -> String {
    if rest.trim_end_matches('\n').contains('\n') {
        rest.split_inclusive('\n')
            .map(|line| format!("  {line:?}"))
            .collect::<Vec<_>>()
            .join("+\n")
    } else {
        format!("{rest:?}")
    }
}
