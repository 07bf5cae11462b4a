//! 期待内容の組み立てとデザイン検証の実行
//!
//! テーブルはリクエストごとに `TableSource` から読み込む（キャッシュしない）。
//! ルール・同義語・検証方針は起動時に一度読み込み、以降は不変。

use crate::config::Config;
use crate::error::{QaError, Result};
use crate::loader::{FileTableSource, TableKind, TableSource};
use packaging_qa_common::report::FieldResult;
use packaging_qa_common::{
    assemble_expected, parse_ai_response, validate_design, ExpectedBundle, GlobalValidation,
    LoadedTable, OcrOutput, RuleBook, SynonymTable, TextMatcher, ValidationPolicy,
    ValidationReport, Verdict,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// ルールファイルを読み込む（無ければ空）
pub fn load_rules(path: &Path) -> Result<Vec<packaging_qa_common::Rule>> {
    if !path.is_file() {
        tracing::warn!(file = %path.display(), "rule file not found, continuing without rules");
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(RuleBook::parse_rules(&content)?)
}

/// 構造ルール・内容ルールを読み込む
pub fn load_rule_book(config: &Config) -> Result<RuleBook> {
    Ok(RuleBook::new(
        load_rules(&config.structure_rules_path())?,
        load_rules(&config.content_rules_path())?,
    ))
}

/// 組み込み同義語に設定ファイルの同義語を足す
pub fn load_synonyms(path: Option<&Path>) -> Result<SynonymTable> {
    let mut table = SynonymTable::default();
    if let Some(path) = path {
        if !path.is_file() {
            return Err(QaError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let extra = SynonymTable::from_json(&content)?;
        tracing::debug!(entries = extra.len(), "custom synonyms merged");
        table.merge(&extra);
    }
    Ok(table)
}

/// バッチ検証の1件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub model_key: String,
    /// AI/OCR出力ファイル（相対パスは項目リストのディレクトリ基準）
    pub ai_file: PathBuf,
}

/// バッチ検証の結果1件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub model_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub overall: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_validation: Option<GlobalValidation>,
}

impl BatchResult {
    fn error(model_key: &str, file: Option<String>, overall: Verdict, message: String) -> Self {
        Self {
            model_key: model_key.to_string(),
            file,
            overall,
            message: Some(message),
            fields: Vec::new(),
            global_validation: None,
        }
    }

    fn from_report(file: String, report: ValidationReport) -> Self {
        if report.overall == Verdict::OcrError {
            return Self::error(&report.model_key, Some(file), Verdict::OcrError, report.summary);
        }
        Self {
            model_key: report.model_key,
            file: Some(file),
            overall: report.overall,
            message: None,
            fields: report.fields,
            global_validation: report.global_validation,
        }
    }
}

/// バッチ項目リスト（JSON配列）を読み込み、相対パスを解決する
pub fn read_batch_items(path: &Path) -> Result<Vec<BatchItem>> {
    if !path.is_file() {
        return Err(QaError::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    let mut items: Vec<BatchItem> = serde_json::from_str(&content)?;

    // JSONファイルの親ディレクトリを基準に相対パスを解決
    let base_dir = path.parent().unwrap_or(Path::new("."));
    for item in &mut items {
        if item.ai_file.is_relative() {
            item.ai_file = base_dir.join(&item.ai_file);
        }
    }
    Ok(items)
}

/// AI/OCR出力ファイルを読み込んで正規化する
pub fn read_ai_output(path: &Path) -> Result<OcrOutput> {
    if !path.is_file() {
        return Err(QaError::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(parse_ai_response(&content)?)
}

/// 検証エンジン
pub struct QaEngine {
    master: Box<dyn TableSource>,
    design: Box<dyn TableSource>,
    rules: RuleBook,
    matcher: TextMatcher,
    policy: ValidationPolicy,
}

impl QaEngine {
    pub fn new(
        master: Box<dyn TableSource>,
        design: Box<dyn TableSource>,
        rules: RuleBook,
        matcher: TextMatcher,
        policy: ValidationPolicy,
    ) -> Self {
        Self {
            master,
            design,
            rules,
            matcher,
            policy,
        }
    }

    /// 設定からファイルベースのエンジンを作る
    pub fn from_config(config: &Config) -> Result<Self> {
        let synonyms = load_synonyms(config.synonyms_path().as_deref())?;
        Ok(Self::new(
            Box::new(FileTableSource::from_config(config, TableKind::Master)),
            Box::new(FileTableSource::from_config(config, TableKind::Design)),
            load_rule_book(config)?,
            TextMatcher::new(synonyms),
            ValidationPolicy {
                externally_validated: config.externally_validated.clone(),
            },
        ))
    }

    pub fn rules(&self) -> &RuleBook {
        &self.rules
    }

    pub fn matcher(&self) -> &TextMatcher {
        &self.matcher
    }

    /// マスタ表・デザイン情報表を読み込む
    pub fn load_tables(&self) -> Result<(LoadedTable, LoadedTable)> {
        Ok((self.master.load()?, self.design.load()?))
    }

    /// モデルの期待内容
    pub fn expected(&self, model_key: &str) -> Result<ExpectedBundle> {
        let (master, design) = self.load_tables()?;
        Ok(assemble_expected(model_key, &master, &design, &self.rules)?)
    }

    /// 正規化済みのAI/OCR出力でデザインを検証する
    pub fn validate(&self, model_key: &str, ocr: &OcrOutput) -> Result<ValidationReport> {
        let expected = self.expected(model_key)?;
        Ok(validate_design(&self.matcher, &self.policy, &expected, ocr))
    }

    /// AI/OCR出力ファイルでデザインを検証する
    pub fn validate_file(&self, model_key: &str, ai_file: &Path) -> Result<ValidationReport> {
        let expected = self.expected(model_key)?;
        let ocr = read_ai_output(ai_file)?;
        Ok(validate_design(&self.matcher, &self.policy, &expected, &ocr))
    }

    /// 複数デザインを並列に検証する（入力順を保持）
    ///
    /// テーブルは一度だけ読み込み、全項目で共有する。
    /// 項目ごとの失敗は `ERROR` / `OCR_ERROR` の結果として返す。
    pub fn validate_batch(&self, items: &[BatchItem]) -> Result<Vec<BatchResult>> {
        let (master, design) = self.load_tables()?;
        tracing::info!(items = items.len(), "batch validation started");

        let results = items
            .par_iter()
            .map(|item| self.validate_item(item, &master, &design))
            .collect();
        Ok(results)
    }

    fn validate_item(&self, item: &BatchItem, master: &LoadedTable, design: &LoadedTable) -> BatchResult {
        let file = item.ai_file.display().to_string();

        let expected = match assemble_expected(&item.model_key, master, design, &self.rules) {
            Ok(expected) => expected,
            Err(e) => {
                tracing::warn!(model = %item.model_key, error = %e, "expected bundle unavailable");
                return BatchResult::error(&item.model_key, None, Verdict::Error, e.to_string());
            }
        };

        let ocr = match read_ai_output(&item.ai_file) {
            Ok(ocr) => ocr,
            Err(e) => {
                tracing::warn!(model = %item.model_key, file = %file, error = %e, "AI output unreadable");
                return BatchResult::error(&item.model_key, Some(file), Verdict::Error, e.to_string());
            }
        };

        let report = validate_design(&self.matcher, &self.policy, &expected, &ocr);
        BatchResult::from_report(file, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_rules_missing_file() {
        let rules = load_rules(Path::new("/nonexistent/rules.json")).unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn test_load_rules_invalid_shape() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"{"Categoria": "Serie"}"#).unwrap();
        let err = load_rules(&path).unwrap_err();
        assert_eq!(err.code(), "PARSE");
    }

    #[test]
    fn test_load_synonyms_merges_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("synonyms.json");
        std::fs::write(&path, r#"{"rojo": ["red", "roja"]}"#).unwrap();

        let table = load_synonyms(Some(&path)).unwrap();
        assert_eq!(table.canonical("red"), "rojo");
        assert_eq!(table.canonical("blanco"), "white");

        assert!(matches!(
            load_synonyms(Some(&dir.path().join("missing.json"))),
            Err(QaError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_from_config_loads_rules_and_synonyms() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("content_rules.json"),
            r#"[{"Categoria": "Serie"}, {"Categoria": "Cortina"}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("synonyms.json"), r#"{"rojo": ["red"]}"#).unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            synonyms: Some(PathBuf::from("synonyms.json")),
            ..Config::default()
        };

        let engine = QaEngine::from_config(&config).unwrap();
        assert!(engine.rules().structure.is_empty());
        assert_eq!(engine.rules().content.len(), 2);
        assert_eq!(
            engine.matcher().synonyms().len(),
            SynonymTable::default().len() + 1
        );
    }

    #[test]
    fn test_read_batch_items_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("items.json");
        std::fs::write(
            &path,
            r#"[{"modelKey": "X01", "aiFile": "ai/x01.json"}, {"modelKey": "X02", "aiFile": "/abs/x02.json"}]"#,
        )
        .unwrap();

        let items = read_batch_items(&path).unwrap();
        assert_eq!(items[0].ai_file, dir.path().join("ai/x01.json"));
        assert_eq!(items[1].ai_file, PathBuf::from("/abs/x02.json"));
    }
}
