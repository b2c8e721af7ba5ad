use serde::{Deserialize, Serialize};

/// Trimmed text between the first `open` marker and the `close` marker that
/// follows it. Empty when either marker is missing.
pub fn extract_between(text: &str, open: &str, close: &str) -> String {
    let Some(start) = text.find(open).map(|i| i + open.len()) else {
        return String::new();
    };
    match text[start..].find(close) {
        Some(len) => text[start..start + len].trim().to_string(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionRationale {
    pub decision: String,
    pub rationale: String,
}

impl DecisionRationale {
    pub fn parse(text: &str) -> Self {
        Self {
            decision: extract_between(text, "<decision>", "</decision>"),
            rationale: extract_between(text, "<rationale>", "</rationale>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_both_markers() {
        let parsed = DecisionRationale::parse("<decision>A</decision><rationale>B</rationale>");
        assert_eq!(parsed.decision, "A");
        assert_eq!(parsed.rationale, "B");
    }

    #[test]
    fn test_trims_and_ignores_surrounding_text() {
        let text = "Here is my review.\n<decision>\n  Approve  \n</decision>\n\
                    <rationale> Valid license, no violations. </rationale>\nThanks.";
        let parsed = DecisionRationale::parse(text);
        assert_eq!(parsed.decision, "Approve");
        assert_eq!(parsed.rationale, "Valid license, no violations.");
    }

    #[test]
    fn test_missing_rationale_is_empty() {
        let parsed = DecisionRationale::parse("<decision>Decline</decision>");
        assert_eq!(parsed.decision, "Decline");
        assert_eq!(parsed.rationale, "");
    }

    #[test]
    fn test_unclosed_marker_is_empty() {
        assert_eq!(extract_between("<decision>Approve", "<decision>", "</decision>"), "");
    }

    #[test]
    fn test_close_before_open_is_empty() {
        let text = "</decision> noise <decision>Refer";
        assert_eq!(extract_between(text, "<decision>", "</decision>"), "");
    }
}
