//! 期待テキストと検出テキストの照合
//!
//! トークン集合の一致率（同義語畳み込み後）で類似度を出し、
//! フィールド単位で OK / WARN / DIFF / MISSING / SKIP を判定する。

use crate::synonyms::SynonymTable;
use crate::text::{extract_number, normalize_text, tokenize};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 部分一致とみなす類似度（スニペット検索の閾値を兼ねる）
pub const PARTIAL_THRESHOLD: f64 = 0.45;
/// 一致とみなす類似度
pub const MATCH_THRESHOLD: f64 = 0.75;
/// 数値がこの差以内なら「近い」
const NUMERIC_TOLERANCE: u32 = 5;

lazy_static::lazy_static! {
    static ref DEFAULT_MATCHER: TextMatcher = TextMatcher::default();
}

/// フィールド判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldStatus {
    Ok,
    Warn,
    Diff,
    Missing,
    Skip,
}

impl std::fmt::Display for FieldStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldStatus::Ok => write!(f, "OK"),
            FieldStatus::Warn => write!(f, "WARN"),
            FieldStatus::Diff => write!(f, "DIFF"),
            FieldStatus::Missing => write!(f, "MISSING"),
            FieldStatus::Skip => write!(f, "SKIP"),
        }
    }
}

/// フィールド群のまとめ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldsSummary {
    Ok,
    Warn,
    Fail,
}

/// 1フィールドの比較結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldComparison {
    pub label: String,
    pub estado: FieldStatus,
    pub esperado: String,
    pub detectado: String,
    pub detalle: String,
}

impl FieldComparison {
    fn new(label: &str, estado: FieldStatus, esperado: &str, detectado: &str, detalle: &str) -> Self {
        Self {
            label: label.to_string(),
            estado,
            esperado: esperado.to_string(),
            detectado: detectado.to_string(),
            detalle: detalle.to_string(),
        }
    }
}

/// スニペット検索の結果
#[derive(Debug, Clone, PartialEq)]
pub struct Snippet {
    pub score: f64,
    pub text: String,
}

/// 同義語テーブルを保持する照合器
#[derive(Debug, Clone, Default)]
pub struct TextMatcher {
    synonyms: SynonymTable,
}

impl TextMatcher {
    pub fn new(synonyms: SynonymTable) -> Self {
        Self { synonyms }
    }

    pub fn synonyms(&self) -> &SynonymTable {
        &self.synonyms
    }

    fn canonical_tokens(&self, text: &str) -> Vec<String> {
        self.synonyms.apply(&tokenize(text))
    }

    /// 期待トークンのうち検出側に含まれる割合（0.0〜1.0）
    ///
    /// 検出側は集合として扱うため、同じトークンの重複は二重に数えない。
    pub fn similarity(&self, expected: &str, found: &str) -> f64 {
        let expected_tokens = self.canonical_tokens(expected);
        if expected_tokens.is_empty() {
            return 0.0;
        }
        let found_set: HashSet<String> = self.canonical_tokens(found).into_iter().collect();
        let hits = expected_tokens.iter().filter(|t| found_set.contains(*t)).count();
        hits as f64 / expected_tokens.len() as f64
    }

    /// テキストを行ごとに走査し、最も近い行を返す（閾値未満はNone）
    pub fn find_snippet(&self, expected: &str, text: &str) -> Option<Snippet> {
        let mut best = Snippet {
            score: 0.0,
            text: String::new(),
        };

        for line in text.split('\n').map(str::trim).filter(|l| !l.is_empty()) {
            let score = self.similarity(expected, line);
            if score > best.score {
                best = Snippet {
                    score,
                    text: line.to_string(),
                };
            }
        }

        if best.score >= PARTIAL_THRESHOLD {
            Some(best)
        } else {
            None
        }
    }

    /// 期待値と検出値を比較する
    ///
    /// # Arguments
    /// * `label` - 表示用ラベル
    /// * `expected` - 期待値（空ならSKIP）
    /// * `found` - AIが抽出した値（空なら `search_text` から行を探す）
    /// * `search_text` - OCR全文
    pub fn compare_field(
        &self,
        label: &str,
        expected: &str,
        found: &str,
        search_text: &str,
    ) -> FieldComparison {
        let mut detected = found.to_string();
        if detected.is_empty() && !search_text.is_empty() {
            if let Some(snippet) = self.find_snippet(expected, search_text) {
                detected = snippet.text;
            }
        }

        if normalize_text(expected).is_empty() {
            return FieldComparison::new(label, FieldStatus::Skip, expected, &detected, "Sin valor esperado");
        }
        if normalize_text(&detected).is_empty() {
            return FieldComparison::new(
                label,
                FieldStatus::Missing,
                expected,
                &detected,
                "No se detectó en el arte",
            );
        }

        if let (Some(exp), Some(det)) = (extract_number(expected), extract_number(&detected)) {
            let diff = exp.abs_diff(det);
            if diff == 0 {
                return FieldComparison::new(label, FieldStatus::Ok, expected, &detected, "Coincide numérico");
            }
            if diff <= NUMERIC_TOLERANCE {
                return FieldComparison::new(label, FieldStatus::Warn, expected, &detected, "Muy cercano");
            }
        }

        let score = self.similarity(expected, &detected);
        if score >= MATCH_THRESHOLD {
            FieldComparison::new(label, FieldStatus::Ok, expected, &detected, "Coincide semánticamente")
        } else if score >= PARTIAL_THRESHOLD {
            FieldComparison::new(label, FieldStatus::Warn, expected, &detected, "Coincidencia parcial")
        } else {
            FieldComparison::new(label, FieldStatus::Diff, expected, &detected, "Texto distinto")
        }
    }
}

/// 組み込み同義語の照合器
pub fn default_matcher() -> &'static TextMatcher {
    &DEFAULT_MATCHER
}

/// 組み込み同義語での類似度
pub fn similarity_score(expected: &str, found: &str) -> f64 {
    DEFAULT_MATCHER.similarity(expected, found)
}

/// 組み込み同義語でのスニペット検索
pub fn find_snippet(expected: &str, text: &str) -> Option<Snippet> {
    DEFAULT_MATCHER.find_snippet(expected, text)
}

/// 組み込み同義語でのフィールド比較
pub fn compare_field(label: &str, expected: &str, found: &str, search_text: &str) -> FieldComparison {
    DEFAULT_MATCHER.compare_field(label, expected, found, search_text)
}

/// フィールド判定をまとめる（DIFF/MISSINGがあればFAIL、WARN/SKIPがあればWARN）
pub fn summarize_status<'a>(fields: impl IntoIterator<Item = &'a FieldComparison>) -> FieldsSummary {
    let mut has_warn = false;
    for field in fields {
        match field.estado {
            FieldStatus::Diff | FieldStatus::Missing => return FieldsSummary::Fail,
            FieldStatus::Warn | FieldStatus::Skip => has_warn = true,
            FieldStatus::Ok => {}
        }
    }
    if has_warn {
        FieldsSummary::Warn
    } else {
        FieldsSummary::Ok
    }
}
