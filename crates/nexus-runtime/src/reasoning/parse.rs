//! Shared helpers for parsing LLM responses.
//!
//! The reasoning components all read loosely structured markdown:
//! labeled fields (`**Confidence:** 0.8`), section blocks under a
//! heading, numbered lists, and bullet lists. Parsers here are
//! permissive: a malformed response never errors, it just yields
//! nothing and lets the caller fall back.

use regex::Regex;

/// Extract the value of a labeled field, e.g. `**Confidence:** 0.8` or
/// `Confidence: 0.8`. Case-insensitive; surrounding `*` markers are
/// tolerated and stripped.
pub(crate) fn labeled_field(text: &str, label: &str) -> Option<String> {
    let pattern = format!(r"(?i)\*{{0,2}}{}\s*:\*{{0,2}}\s*([^\n]+)", regex::escape(label));
    let re = Regex::new(&pattern).expect("valid field regex");
    re.captures(text).map(|caps| {
        caps.get(1)
            .map_or("", |m| m.as_str())
            .trim()
            .trim_matches('*')
            .trim()
            .to_string()
    })
}

/// Extract the body of a section introduced by a heading line, running
/// until the next `##` heading, the next `**Label:**` line, or the end
/// of text.
pub(crate) fn section(text: &str, heading: &str) -> Option<String> {
    let pattern = format!(
        r"(?is){}\s*:?\*{{0,2}}\s*\n(.*?)(?:\n##|\n\*\*|\z)",
        regex::escape(heading)
    );
    let re = Regex::new(&pattern).expect("valid section regex");
    re.captures(text).map(|caps| {
        caps.get(1)
            .map_or("", |m| m.as_str())
            .trim()
            .to_string()
    })
}

/// Items of a numbered list (`1. item`).
pub(crate) fn numbered_items(text: &str) -> Vec<String> {
    let re = Regex::new(r"(?m)^\s*\d+\.\s*(.+)$").expect("valid list regex");
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
        .filter(|item| !item.is_empty())
        .collect()
}

/// Items of a bullet list (`- item` or `* item`).
pub(crate) fn bulleted_items(text: &str) -> Vec<String> {
    let re = Regex::new(r"(?m)^\s*[-*]\s+(.+)$").expect("valid bullet regex");
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
        .filter(|item| !item.is_empty())
        .collect()
}

/// Parse a float out of a field value, tolerating trailing prose.
pub(crate) fn leading_f64(value: &str) -> Option<f64> {
    let re = Regex::new(r"([\d]+(?:\.[\d]+)?)").expect("valid number regex");
    re.captures(value)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Parse an integer out of a field value, tolerating trailing prose.
pub(crate) fn leading_u32(value: &str) -> Option<u32> {
    let re = Regex::new(r"(\d+)").expect("valid integer regex");
    re.captures(value)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labeled_field_with_and_without_bold() {
        let text = "**Complexity Level:** MEDIUM\nConfidence: 0.85\n";
        assert_eq!(labeled_field(text, "Complexity Level").unwrap(), "MEDIUM");
        assert_eq!(labeled_field(text, "Confidence").unwrap(), "0.85");
        assert!(labeled_field(text, "Missing").is_none());
    }

    #[test]
    fn test_section_bounded_by_next_heading() {
        let text = "## Completeness Assessment\nNOT COMPLETE, needs latency data\n## Confidence Score\n0.4\n";
        let body = section(text, "## Completeness Assessment").unwrap();
        assert_eq!(body, "NOT COMPLETE, needs latency data");
    }

    #[test]
    fn test_section_runs_to_end() {
        let text = "## Missing Aspects\n- latency\n- cost";
        let body = section(text, "## Missing Aspects").unwrap();
        assert!(body.contains("latency"));
        assert!(body.contains("cost"));
    }

    #[test]
    fn test_numbered_and_bulleted_items() {
        let text = "1. first thing\n2. second thing\n- bullet a\n* bullet b\n";
        assert_eq!(numbered_items(text), vec!["first thing", "second thing"]);
        assert_eq!(bulleted_items(text), vec!["bullet a", "bullet b"]);
    }

    #[test]
    fn test_numeric_extraction() {
        assert_eq!(leading_f64("0.85 (fairly sure)"), Some(0.85));
        assert_eq!(leading_u32("3 iterations"), Some(3));
        assert_eq!(leading_f64("no number"), None);
    }
}
