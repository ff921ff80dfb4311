//! Expected output of a child stream or an error message

use regex::Regex;

#[derive(Debug, Clone)]
pub enum Expected {
    /// Exact line list, terminators stripped
    Lines(Vec<String>),
    /// Regex that must match somewhere in the text
    Matches(Regex),
}

impl Expected {
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Expected::Lines(lines.into_iter().map(Into::into).collect())
    }

    /// No output at all
    pub fn empty() -> Self {
        Expected::Lines(Vec::new())
    }

    pub fn matches(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Expected::Matches)
    }

    /// Compare `actual` against the expectation, describing any mismatch
    pub fn check(&self, actual: &str) -> Result<(), String> {
        match self {
            Expected::Lines(expected) => {
                let actual_lines: Vec<&str> = actual.lines().collect();
                if actual_lines == *expected {
                    Ok(())
                } else {
                    Err(format!("Expected lines {expected:?}\nActual lines {actual_lines:?}"))
                }
            }
            Expected::Matches(regex) => {
                if regex.is_match(actual) {
                    Ok(())
                } else {
                    Err(format!("Expected /{}/ to match {actual:?}", regex.as_str()))
                }
            }
        }
    }

    /// Compare `actual` as one block of text; line lists are joined with `\n`
    pub fn check_text(&self, actual: &str) -> Result<(), String> {
        match self {
            Expected::Lines(expected) => {
                let expected = expected.join("\n");
                if actual == expected {
                    Ok(())
                } else {
                    Err(format!("Expected {expected:?}\nActual {actual:?}"))
                }
            }
            Expected::Matches(_) => self.check(actual),
        }
    }
}
