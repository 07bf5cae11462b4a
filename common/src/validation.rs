//! 全体検証（GlobalValidation）
//!
//! AIが返す検証構造は欠落・形崩れがあり得るため、ここで一つの形に揃える。
//! AI側に要件リストが無ければ、期待要件とOCR全文からローカルに判定する。

use crate::requirements::infer_req_type;
use crate::scorer::{default_matcher, TextMatcher};
use crate::types::{cell_text, Requirement, RequirementSource, RequirementStatus, RequirementType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 総合判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    Approved,
    Rejected,
    Warning,
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverallStatus::Approved => write!(f, "APPROVED"),
            OverallStatus::Rejected => write!(f, "REJECTED"),
            OverallStatus::Warning => write!(f, "WARNING"),
        }
    }
}

/// 要件ごとの判定と総合判定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalValidation {
    pub requirements: Vec<Requirement>,
    pub overall_status: OverallStatus,
    pub missing: Vec<String>,
}

impl GlobalValidation {
    /// 判定済みの要件から missing と総合判定を計算する
    pub fn from_requirements(requirements: Vec<Requirement>) -> Self {
        let mut validation = Self {
            requirements,
            overall_status: OverallStatus::Approved,
            missing: Vec::new(),
        };
        validation.recompute();
        validation
    }

    /// 非ビジュアルでOK以外の要件が一つでもあればREJECTED
    pub fn recompute(&mut self) {
        self.missing = self
            .requirements
            .iter()
            .filter(|r| r.is_missing())
            .map(|r| r.requirement.clone())
            .collect();
        self.overall_status = if self.missing.is_empty() {
            OverallStatus::Approved
        } else {
            OverallStatus::Rejected
        };
    }

    pub fn is_approved(&self) -> bool {
        self.overall_status == OverallStatus::Approved
    }
}

/// 照合器を指定して期待要件をOCR全文と突き合わせる
pub fn evaluate_with(matcher: &TextMatcher, requirements: &[Requirement], ocr_text: &str) -> GlobalValidation {
    let evaluated = requirements
        .iter()
        .filter_map(|req| {
            let text = req.requirement.trim();
            if text.is_empty() {
                return None;
            }
            if req.kind.is_visual() {
                return Some(Requirement {
                    requirement: text.to_string(),
                    status: Some(RequirementStatus::VisualCheck),
                    found_text: Some(Vec::new()),
                    ..req.clone()
                });
            }
            let snippet = matcher.find_snippet(text, ocr_text);
            let (status, found) = match snippet {
                Some(s) => (RequirementStatus::Ok, vec![s.text]),
                None => (RequirementStatus::Missing, Vec::new()),
            };
            Some(Requirement {
                requirement: text.to_string(),
                status: Some(status),
                found_text: Some(found),
                ..req.clone()
            })
        })
        .collect();

    GlobalValidation::from_requirements(evaluated)
}

/// 組み込み同義語で期待要件をOCR全文と突き合わせる
pub fn evaluate_global_requirements(requirements: &[Requirement], ocr_text: &str) -> GlobalValidation {
    evaluate_with(default_matcher(), requirements, ocr_text)
}

/// foundText を文字列リストに揃える
fn coerce_found_text(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(cell_text)
            .filter(|t| !t.is_empty())
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            let text = cell_text(other);
            if text.is_empty() {
                Vec::new()
            } else {
                vec![text]
            }
        }
    }
}

/// AIが返した要件1件を解釈する（要件テキストが空ならNone）
fn parse_ai_requirement(item: &Value) -> Option<Requirement> {
    let text = item
        .get("requirement")
        .map(cell_text)
        .unwrap_or_default()
        .trim()
        .to_string();
    if text.is_empty() {
        return None;
    }

    let kind = infer_req_type(&text);
    let status = if kind == RequirementType::Visual {
        RequirementStatus::VisualCheck
    } else {
        item.get("status")
            .and_then(Value::as_str)
            .map(RequirementStatus::parse)
            .unwrap_or(RequirementStatus::Missing)
    };

    Some(Requirement {
        requirement: text,
        kind,
        source: item
            .get("source")
            .and_then(Value::as_str)
            .and_then(RequirementSource::parse),
        status: Some(status),
        found_text: Some(coerce_found_text(item.get("foundText"))),
    })
}

/// AIの検証構造を正規化する（要件リストが無ければローカル判定）
///
/// AIが付けた type は信用せず、キーワードで種類を判定し直す。
/// missing と overallStatus は常に再計算する。
pub fn normalize_with(
    matcher: &TextMatcher,
    ai_global: Option<&Value>,
    expected_requirements: &[Requirement],
    ocr_text: &str,
) -> GlobalValidation {
    let ai_items = ai_global
        .and_then(|g| g.get("requirements"))
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty());

    match ai_items {
        Some(items) => {
            let requirements: Vec<Requirement> = items.iter().filter_map(parse_ai_requirement).collect();
            tracing::debug!(count = requirements.len(), "using AI-provided global validation");
            GlobalValidation::from_requirements(requirements)
        }
        None => {
            tracing::debug!("AI global validation absent, evaluating requirements locally");
            evaluate_with(matcher, expected_requirements, ocr_text)
        }
    }
}

/// 組み込み同義語で正規化する
pub fn normalize_global_validation(
    ai_global: Option<&Value>,
    expected_requirements: &[Requirement],
    ocr_text: &str,
) -> GlobalValidation {
    normalize_with(default_matcher(), ai_global, expected_requirements, ocr_text)
}
