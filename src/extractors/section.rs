// src/extractors/section.rs

// --- Imports ---
use crate::utils::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;

// --- Regex Patterns (Lazy Static) ---
// A new line whose first non-blank run is a 2-30 character label followed by a colon.
// Disclosure documents have no other structural markup, so this is what ends a section.
static SECTION_BOUNDARY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n\s*[\x{4e00}-\x{9fa5}A-Za-z0-9]{2,30}\s*[：:]")
        .expect("Failed to compile SECTION_BOUNDARY_RE")
});

/// Locates the `label: body` span of a disclosure document.
///
/// The `regex` crate has no look-ahead, so slicing is two searches: the label
/// regex finds where the body starts, and the first [`SECTION_BOUNDARY_RE`]
/// match after that point is where it ends.
#[derive(Debug, Clone)]
pub struct SectionSlicer {
    label: String,
    label_re: Regex,
}

impl SectionSlicer {
    pub fn new(label: &str) -> Result<Self, ExtractError> {
        let pattern = format!(r"{}\s*[：:]\s*", regex::escape(label));
        let label_re = Regex::new(&pattern).map_err(|source| ExtractError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        })?;
        Ok(Self {
            label: label.to_string(),
            label_re,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the trimmed section body, or `""` when the label is not present.
    pub fn slice<'t>(&self, text: &'t str) -> &'t str {
        let Some(label_match) = self.label_re.find(text) else {
            tracing::trace!("Section label '{}' not found", self.label);
            return "";
        };

        let body_start = label_match.end();
        let body_end = SECTION_BOUNDARY_RE
            .find_at(text, body_start)
            .map(|boundary| boundary.start())
            .unwrap_or(text.len());

        let body = text[body_start..body_end].trim();
        tracing::trace!("Section '{}' spans {} bytes", self.label, body.len());
        body
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    fn extract_section<'t>(text: &'t str, label: &str) -> Result<&'t str, ExtractError> {
        Ok(SectionSlicer::new(label)?.slice(text))
    }

    const DISCLOSURE: &str = "
标的证券：本期发行的证券为可交换为发行人所持中国长江电力股份
有限公司股票（股票代码：600900.SH，股票简称：长江电力）的可交换公司债
券。
换股期限：本期可交换公司债券换股期限自可交换公司债券发行结束
之日满 12 个月后的第一个交易日起至可交换债券到期日止，即 2023 年 6 月 2
日至 2027 年 6 月 1 日止。
";

    #[test]
    fn test_section_stops_at_next_label_line() {
        let body = extract_section("AB: 123\nCD: 456", "AB").unwrap();
        assert_eq!(body, "123");
        let body = extract_section("AB: 123\nCD: 456", "CD").unwrap();
        assert_eq!(body, "456");
    }

    #[test]
    fn test_single_character_label_is_not_a_boundary() {
        let body = extract_section("A: 123\nB: 456", "A").unwrap();
        assert_eq!(body, "123\nB: 456");
    }

    #[test]
    fn test_multiline_chinese_section() {
        let body = extract_section(DISCLOSURE, "标的证券").unwrap();
        assert!(body.starts_with("本期发行的证券"), "Unexpected body start: {}", body);
        assert!(body.contains("600900.SH"));
        assert!(body.ends_with("券。"));
        assert!(!body.contains("换股期限"), "Section leaked into next label: {}", body);
    }

    #[test]
    fn test_inline_colon_does_not_end_section() {
        // "股票代码：" sits mid-line, so it is part of the body rather than a new section.
        let body = extract_section(DISCLOSURE, "标的证券").unwrap();
        assert!(body.contains("股票简称：长江电力"));
    }

    #[test]
    fn test_last_section_runs_to_end_of_text() {
        let body = extract_section(DISCLOSURE, "换股期限").unwrap();
        assert!(body.ends_with("2027 年 6 月 1 日止。"));
    }

    #[test]
    fn test_ascii_and_full_width_colons() {
        assert_eq!(extract_section("发行人 ： 长江电力", "发行人").unwrap(), "长江电力");
        assert_eq!(extract_section("发行人:长江电力", "发行人").unwrap(), "长江电力");
    }

    #[test]
    fn test_missing_label_yields_empty_body() {
        assert_eq!(extract_section(DISCLOSURE, "债券评级").unwrap(), "");
    }

    #[test]
    fn test_label_is_matched_literally() {
        let text = "Rate (%): 3.5\nTerm: 5Y";
        assert_eq!(extract_section(text, "Rate (%)").unwrap(), "3.5");
    }

    #[test]
    fn test_overlong_label_line_is_not_a_boundary() {
        let long_label = "x".repeat(31);
        let text = format!("AB: first\n{}: second", long_label);
        let body = extract_section(&text, "AB").unwrap();
        assert!(body.ends_with("second"));
    }
}
