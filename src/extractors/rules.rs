// src/extractors/rules.rs

// --- Imports ---
use crate::extractors::custom::CustomExtractor;
use crate::extractors::pattern::{apply_patterns, FieldPattern};
use crate::extractors::section::SectionSlicer;
use crate::utils::error::ExtractError;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// --- Constants ---
/// Spec value that hands a field to its [`CustomExtractor`].
pub const CUSTOM_SENTINEL: &str = "*自定义*";

// --- Data Structures ---

/// One field's extraction spec as written in a rule file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawSpec {
    One(String),
    Many(Vec<String>),
}

impl RawSpec {
    pub fn is_custom(&self) -> bool {
        matches!(self, RawSpec::One(s) if s == CUSTOM_SENTINEL)
    }

    fn pattern_strings(&self) -> Vec<&str> {
        match self {
            RawSpec::One(p) => vec![p.as_str()],
            RawSpec::Many(ps) => ps.iter().map(String::as_str).collect(),
        }
    }
}

/// Field name to spec mapping that keeps declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    fields: Vec<(String, RawSpec)>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a field. A replaced field keeps its original position.
    pub fn with(mut self, field: &str, spec: RawSpec) -> Self {
        self.insert(field.to_string(), spec);
        self
    }

    pub fn custom(self, field: &str) -> Self {
        self.with(field, RawSpec::One(CUSTOM_SENTINEL.to_string()))
    }

    pub fn pattern(self, field: &str, pattern: &str) -> Self {
        self.with(field, RawSpec::One(pattern.to_string()))
    }

    pub fn patterns(self, field: &str, patterns: &[&str]) -> Self {
        self.with(
            field,
            RawSpec::Many(patterns.iter().map(|p| p.to_string()).collect()),
        )
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &RawSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn insert(&mut self, field: String, spec: RawSpec) {
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = spec,
            None => self.fields.push((field, spec)),
        }
    }
}

// serde_json maps do not keep key order without extra features, so walk the map by hand.
impl<'de> Deserialize<'de> for RuleSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RuleSetVisitor;

        impl<'de> Visitor<'de> for RuleSetVisitor {
            type Value = RuleSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping field names to a pattern, a list of patterns or the custom sentinel")
            }

            fn visit_map<A>(self, mut map: A) -> Result<RuleSet, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut rule_set = RuleSet::new();
                while let Some((field, spec)) = map.next_entry::<String, RawSpec>()? {
                    rule_set.insert(field, spec);
                }
                Ok(rule_set)
            }
        }

        deserializer.deserialize_map(RuleSetVisitor)
    }
}

/// Parses a JSON array of rule-set objects.
pub fn parse_rule_sets(json: &str) -> Result<Vec<RuleSet>, ExtractError> {
    Ok(serde_json::from_str(json)?)
}

/// Extracted value of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    /// Exchange period dates: `[start, end]`, or fewer when the text has fewer.
    Dates(Vec<String>),
    /// Nothing matched. Serialized as `null`.
    Absent,
}

impl FieldValue {
    pub fn text(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    /// True when extraction produced something: text, or at least one date.
    pub fn is_found(&self) -> bool {
        match self {
            FieldValue::Text(_) => true,
            FieldValue::Dates(dates) => !dates.is_empty(),
            FieldValue::Absent => false,
        }
    }
}

/// Values for one rule-set, in the rule-set's field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    fields: Vec<(String, FieldValue)>,
}

impl ExtractionResult {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for ExtractionResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Knobs for turning raw rule-sets into compiled ones.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Reject the custom sentinel on fields that have no custom extractor
    /// instead of resolving them to absent.
    pub strict_custom_fields: bool,
}

/// How a compiled field produces its value.
#[derive(Debug, Clone)]
pub enum FieldSpec {
    Custom(CustomExtractor),
    Patterns(Vec<FieldPattern>),
}

#[derive(Debug, Clone)]
pub struct CompiledField {
    name: String,
    section: SectionSlicer,
    spec: FieldSpec,
}

impl CompiledField {
    fn compile(name: &str, raw: &RawSpec, options: &ExtractOptions) -> Result<Self, ExtractError> {
        let spec = if raw.is_custom() {
            match CustomExtractor::for_field(name) {
                Some(extractor) => FieldSpec::Custom(extractor),
                None if options.strict_custom_fields => {
                    return Err(ExtractError::UnknownCustomField(name.to_string()));
                }
                None => {
                    tracing::warn!("No custom extractor for field '{}', it will always be empty", name);
                    FieldSpec::Custom(CustomExtractor::Unrecognized)
                }
            }
        } else {
            let patterns = raw
                .pattern_strings()
                .into_iter()
                .map(FieldPattern::new)
                .collect::<Result<Vec<_>, _>>()?;
            FieldSpec::Patterns(patterns)
        };

        Ok(Self {
            name: name.to_string(),
            section: SectionSlicer::new(name)?,
            spec,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Labeled section first, whole text second. Custom extractors own their fallback.
    pub fn evaluate(&self, text: &str) -> FieldValue {
        match &self.spec {
            FieldSpec::Custom(extractor) => extractor.extract(text, &self.section),
            FieldSpec::Patterns(patterns) => {
                let body = self.section.slice(text);
                let from_section = if body.is_empty() {
                    None
                } else {
                    apply_patterns(body, patterns)
                };

                from_section
                    .or_else(|| {
                        tracing::trace!("Field '{}' not found in its section, searching whole text", self.name);
                        apply_patterns(text, patterns)
                    })
                    .map_or(FieldValue::Absent, FieldValue::text)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompiledRuleSet {
    fields: Vec<CompiledField>,
}

impl CompiledRuleSet {
    pub fn compile(rule_set: &RuleSet, options: &ExtractOptions) -> Result<Self, ExtractError> {
        let fields = rule_set
            .fields()
            .map(|(name, raw)| CompiledField::compile(name, raw, options))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { fields })
    }

    pub fn evaluate(&self, text: &str) -> ExtractionResult {
        let fields = self
            .fields
            .iter()
            .map(|field| (field.name().to_string(), field.evaluate(text)))
            .collect();
        ExtractionResult { fields }
    }
}

pub fn compile_rule_sets(
    rule_sets: &[RuleSet],
    options: &ExtractOptions,
) -> Result<Vec<CompiledRuleSet>, ExtractError> {
    rule_sets
        .iter()
        .map(|rule_set| CompiledRuleSet::compile(rule_set, options))
        .collect()
}

/// Evaluates every rule-set against `text`, one result per rule-set in input order.
///
/// Fails only when a pattern does not compile.
pub fn reg_search(text: &str, rule_sets: &[RuleSet]) -> Result<Vec<ExtractionResult>, ExtractError> {
    reg_search_with(text, rule_sets, &ExtractOptions::default())
}

pub fn reg_search_with(
    text: &str,
    rule_sets: &[RuleSet],
    options: &ExtractOptions,
) -> Result<Vec<ExtractionResult>, ExtractError> {
    let compiled = compile_rule_sets(rule_sets, options)?;
    tracing::debug!("Compiled {} rule-sets", compiled.len());

    Ok(compiled.iter().map(|rule_set| rule_set.evaluate(text)).collect())
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    const DISCLOSURE: &str = "
标的证券：本期发行的证券为可交换为发行人所持中国长江电力股份
有限公司股票（股票代码：600900.SH，股票简称：长江电力）的可交换公司债
券。
换股期限：本期可交换公司债券换股期限自可交换公司债券发行结束
之日满 12 个月后的第一个交易日起至可交换债券到期日止，即 2023 年 6 月 2
日至 2027 年 6 月 1 日止。
";

    fn dates(a: &str, b: &str) -> FieldValue {
        FieldValue::Dates(vec![a.to_string(), b.to_string()])
    }

    #[test]
    fn test_custom_rule_set_end_to_end() {
        let rules = parse_rule_sets(r#"[{"标的证券": "*自定义*", "换股期限": "*自定义*"}]"#).unwrap();
        let results = reg_search(DISCLOSURE, &rules).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].get("标的证券"), Some(&FieldValue::text("600900.SH")));
        assert_eq!(results[0].get("换股期限"), Some(&dates("2023-06-02", "2027-06-01")));

        let json = serde_json::to_string(&results).unwrap();
        assert_eq!(
            json,
            r#"[{"标的证券":"600900.SH","换股期限":["2023-06-02","2027-06-01"]}]"#
        );
    }

    #[test]
    fn test_one_result_per_rule_set_in_order() {
        let rules = vec![
            RuleSet::new().pattern("first", r"(\d{6})"),
            RuleSet::new(),
            RuleSet::new().custom("换股期限"),
        ];
        let results = reg_search(DISCLOSURE, &rules).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].get("first"), Some(&FieldValue::text("600900")));
        assert!(results[1].is_empty());
        assert_eq!(results[2].get("换股期限"), Some(&dates("2023-06-02", "2027-06-01")));
    }

    #[test]
    fn test_field_order_follows_declaration() {
        let rules = parse_rule_sets(r#"[{"换股期限": "*自定义*", "代码": "(\\d{6})", "标的证券": "*自定义*"}]"#).unwrap();
        let results = reg_search(DISCLOSURE, &rules).unwrap();
        let names: Vec<&str> = results[0].field_names().collect();
        assert_eq!(names, vec!["换股期限", "代码", "标的证券"]);

        let json = serde_json::to_string(&results[0]).unwrap();
        assert!(json.starts_with(r#"{"换股期限":"#), "Order lost in {}", json);
    }

    #[test]
    fn test_section_match_preferred_over_whole_text() {
        let text = "说明：代码 000001.SZ\n标的证券：代码 600900.SH";
        let rules = vec![RuleSet::new().pattern("标的证券", r"\d{6}\.S[HZ]")];
        let results = reg_search(text, &rules).unwrap();
        assert_eq!(results[0].get("标的证券"), Some(&FieldValue::text("600900.SH")));
    }

    #[test]
    fn test_pattern_falls_back_to_whole_text() {
        let text = "发行人：长江电力\n利率说明：票面利率为1.50%";
        let rules = vec![RuleSet::new().patterns("发行人", &[r"利率为(\d+\.\d+)%"])];
        let results = reg_search(text, &rules).unwrap();
        assert_eq!(results[0].get("发行人"), Some(&FieldValue::text("1.50")));
    }

    #[test]
    fn test_pattern_without_any_match_is_absent() {
        let rules = vec![RuleSet::new().pattern("债券评级", r"AAA|AA\+")];
        let results = reg_search(DISCLOSURE, &rules).unwrap();
        assert_eq!(results[0].get("债券评级"), Some(&FieldValue::Absent));
        assert_eq!(serde_json::to_string(&results[0]).unwrap(), r#"{"债券评级":null}"#);
    }

    #[test]
    fn test_sentinel_never_consults_patterns() {
        // 标的证券 has no section here, so the custom extractor yields absent
        // even though the code appears elsewhere in the text.
        let text = "股票代码：600900.SH";
        let rules = vec![RuleSet::new().custom("标的证券")];
        let results = reg_search(text, &rules).unwrap();
        assert_eq!(results[0].get("标的证券"), Some(&FieldValue::Absent));
    }

    #[test]
    fn test_exchange_period_scans_whole_text_without_section() {
        let text = "本期债券自2024年1月5日起至2029年1月4日止可以换股。";
        let rules = vec![RuleSet::new().custom("换股期限")];
        let results = reg_search(text, &rules).unwrap();
        assert_eq!(results[0].get("换股期限"), Some(&dates("2024-01-05", "2029-01-04")));
    }

    #[test]
    fn test_unknown_custom_field_is_absent_unless_strict() {
        let rules = vec![RuleSet::new().custom("换股价格")];
        let results = reg_search(DISCLOSURE, &rules).unwrap();
        assert_eq!(results[0].get("换股价格"), Some(&FieldValue::Absent));

        let strict = ExtractOptions { strict_custom_fields: true };
        let err = reg_search_with(DISCLOSURE, &rules, &strict).unwrap_err();
        assert!(matches!(err, ExtractError::UnknownCustomField(ref f) if f == "换股价格"));
    }

    #[test]
    fn test_invalid_pattern_propagates() {
        let rules = vec![RuleSet::new().patterns("x", &[r"ok", r"([unclosed"])];
        let err = reg_search(DISCLOSURE, &rules).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidPattern { .. }));
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let rules = parse_rule_sets(r#"[{"标的证券": "*自定义*"}, {"换股期限": "*自定义*", "x": ["(\\d+)"]}]"#).unwrap();
        let first = reg_search(DISCLOSURE, &rules).unwrap();
        let second = reg_search(DISCLOSURE, &rules).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rule_file_shapes() {
        let rules = parse_rule_sets(r#"[{"a": "x", "b": ["y", "z"], "c": "*自定义*"}]"#).unwrap();
        let specs: Vec<(&str, &RawSpec)> = rules[0].fields().collect();
        assert_eq!(specs[0], ("a", &RawSpec::One("x".to_string())));
        assert_eq!(specs[1], ("b", &RawSpec::Many(vec!["y".to_string(), "z".to_string()])));
        assert!(specs[2].1.is_custom());

        assert!(parse_rule_sets(r#"[{"a": 1}]"#).is_err());
        assert!(parse_rule_sets(r#"{"a": "x"}"#).is_err());
    }

    #[test]
    fn test_duplicate_field_keeps_first_position_last_value() {
        let rules = parse_rule_sets(r#"[{"a": "x", "b": "y", "a": "z"}]"#).unwrap();
        let specs: Vec<(&str, &RawSpec)> = rules[0].fields().collect();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0], ("a", &RawSpec::One("z".to_string())));
    }
}
