// src/extractors/custom.rs

// --- Imports ---
use crate::extractors::rules::FieldValue;
use crate::extractors::section::SectionSlicer;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

// --- Constants ---
/// Field label of the exchangeable bond's underlying security.
pub const UNDERLYING_SECURITY_FIELD: &str = "标的证券";
/// Field label of the share exchange period.
pub const EXCHANGE_PERIOD_FIELD: &str = "换股期限";

// --- Regex Patterns (Lazy Static) ---
static SECURITY_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d{6}\.(?:SH|SZ)\b").expect("Failed to compile SECURITY_CODE_RE")
});

// 2023年6月2日 / 2023 年 6 月 2 号 / ２０２３年６月２日
static CN_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<y>\d{4})\s*年\s*(?P<m>\d{1,2})\s*月\s*(?P<d>\d{1,2})(?:\s*[日号])?")
        .expect("Failed to compile CN_DATE_RE")
});

// Digit adjacency is checked by hand in `find_iso_dates`.
static ISO_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}").expect("Failed to compile ISO_DATE_RE")
});

// Same digit class as the date patterns (Unicode decimal digits).
static DECIMAL_DIGIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d$").expect("Failed to compile DECIMAL_DIGIT_RE")
});

/// Hand-written extraction strategies for fields a regex list cannot express.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomExtractor {
    /// `600900.SH` style code from the field's own section.
    UnderlyingSecurity,
    /// Start/end dates from the field's section, or from the whole text when
    /// the section is missing.
    ExchangePeriod,
    /// Sentinel used on a field with no strategy; always absent.
    Unrecognized,
}

impl CustomExtractor {
    /// Field name to strategy table.
    pub fn for_field(field: &str) -> Option<Self> {
        match field {
            UNDERLYING_SECURITY_FIELD => Some(Self::UnderlyingSecurity),
            EXCHANGE_PERIOD_FIELD => Some(Self::ExchangePeriod),
            _ => None,
        }
    }

    pub fn extract(&self, text: &str, section: &SectionSlicer) -> FieldValue {
        let body = section.slice(text);
        match self {
            Self::UnderlyingSecurity => {
                if body.is_empty() {
                    return FieldValue::Absent;
                }
                extract_security_code(body).map_or(FieldValue::Absent, FieldValue::text)
            }
            Self::ExchangePeriod => {
                let body = if body.is_empty() {
                    tracing::debug!(
                        "Section '{}' not found, scanning whole document for dates",
                        section.label()
                    );
                    text
                } else {
                    body
                };
                FieldValue::Dates(extract_date_range(body))
            }
            Self::Unrecognized => FieldValue::Absent,
        }
    }
}

/// First word-bounded six digit code with a `.SH` or `.SZ` suffix.
pub fn extract_security_code(body: &str) -> Option<&str> {
    SECURITY_CODE_RE.find(body).map(|m| m.as_str())
}

fn is_decimal_digit(c: char) -> bool {
    let mut buf = [0u8; 4];
    DECIMAL_DIGIT_RE.is_match(c.encode_utf8(&mut buf))
}

/// Numeric value of a Unicode decimal digit (`6`, `６`, `٦`, ...).
///
/// Every decimal digit script is a contiguous run of ten code points from
/// zero to nine, so the value is the distance to the start of the run.
fn digit_value(c: char) -> Option<u32> {
    if let Some(value) = c.to_digit(10) {
        return Some(value);
    }
    if !is_decimal_digit(c) {
        return None;
    }
    let mut zero = c as u32;
    while let Some(prev) = zero.checked_sub(1).and_then(char::from_u32) {
        if !is_decimal_digit(prev) {
            break;
        }
        zero -= 1;
    }
    Some((c as u32 - zero) % 10)
}

fn parse_digits(digits: &str) -> u32 {
    digits
        .chars()
        .filter_map(digit_value)
        .fold(0, |acc, d| acc * 10 + d)
}

/// Rewrites every `YYYY年M月D日` date in `text` as an ASCII `YYYY-MM-DD`.
pub fn normalize_cn_dates(text: &str) -> String {
    CN_DATE_RE
        .replace_all(text, |caps: &Captures| {
            let year = parse_digits(&caps["y"]);
            let month = parse_digits(&caps["m"]);
            let day = parse_digits(&caps["d"]);
            format!("{}-{:02}-{:02}", year, month, day)
        })
        .into_owned()
}

/// All `YYYY-MM-DD` dates in `text` that are not glued to other digits.
pub fn find_iso_dates(text: &str) -> Vec<String> {
    let mut dates = Vec::new();
    let mut pos = 0;

    while let Some(m) = ISO_DATE_RE.find_at(text, pos) {
        let digit_before = text[..m.start()].chars().next_back().is_some_and(is_decimal_digit);
        let digit_after = text[m.end()..].chars().next().is_some_and(is_decimal_digit);

        if digit_before || digit_after {
            // Retry from the next character inside the rejected match.
            pos = m.start() + m.as_str().chars().next().map_or(1, char::len_utf8);
            continue;
        }

        dates.push(m.as_str().to_string());
        pos = m.end();
    }

    dates
}

/// Normalizes Chinese dates, then returns the first two ISO dates as a
/// `[start, end]` range, or whatever fewer dates were found.
pub fn extract_date_range(body: &str) -> Vec<String> {
    let normalized = normalize_cn_dates(body);
    let mut dates = find_iso_dates(&normalized);
    if dates.len() > 2 {
        tracing::trace!("Found {} dates, keeping the first two", dates.len());
        dates.truncate(2);
    }
    dates
}
