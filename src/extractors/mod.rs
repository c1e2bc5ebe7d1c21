// src/extractors/mod.rs
pub mod custom;
pub mod pattern;
pub mod rules;
pub mod section;

// Re-export key extraction types for convenience
pub use rules::{
    compile_rule_sets,
    parse_rule_sets,
    reg_search,
    reg_search_with,
    CompiledRuleSet,
    ExtractOptions,
    ExtractionResult,
    FieldValue,
    RawSpec,
    RuleSet,
    CUSTOM_SENTINEL,
};
pub use custom::CustomExtractor;
pub use pattern::{CapturePolicy, FieldPattern};
pub use section::SectionSlicer;
