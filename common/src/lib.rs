//! Packaging QA Common Library
//!
//! CLIとエンジンで共有される型と照合ロジック（ファイルアクセスなし）

pub mod types;
pub mod error;
pub mod text;
pub mod synonyms;
pub mod scorer;
pub mod table;
pub mod context;
pub mod matcher;
pub mod rules;
pub mod requirements;
pub mod faces;
pub mod expected;
pub mod validation;
pub mod ocr;
pub mod parser;
pub mod report;

pub use types::{
    LoadedTable, RawRow, Requirement, RequirementSource, RequirementStatus, RequirementType,
    TableMeta, TableOrigin,
};
pub use error::{Error, Result};
pub use text::{best_upc, extract_number, normalize_text, UpcMatch};
pub use synonyms::SynonymTable;
pub use scorer::{
    compare_field, find_snippet, similarity_score, summarize_status, FieldComparison, FieldStatus,
    FieldsSummary, TextMatcher,
};
pub use table::{normalize_master_table, NormalizedTable};
pub use context::{build_master_context, MasterContext};
pub use matcher::{find_master_row, select_design_row, DesignMatch};
pub use rules::{select_rule_by_category, Rule, RuleBook};
pub use requirements::{dedupe_requirements, split_cell_text};
pub use faces::{FaceLayout, PackagingSuggestion};
pub use expected::{assemble_expected, ExpectedBundle};
pub use validation::{evaluate_global_requirements, normalize_global_validation, GlobalValidation, OverallStatus};
pub use ocr::OcrOutput;
pub use parser::{extract_json, parse_ai_response};
pub use report::{validate_design, ValidationPolicy, ValidationReport, Verdict};
