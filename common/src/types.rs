//! 共有型定義
//!
//! CLIとエンジンで共有される型:
//! - RawRow: 表計算ソースから読み込んだ生の行
//! - LoadedTable / TableMeta: ローダーの出力
//! - Requirement: 設計に含めるべき要件（テキスト/ビジュアル）

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 列名 → スカラー値（列の挿入順を保持）
pub type RawRow = serde_json::Map<String, Value>;

/// セル値を文字列化する（空セルは空文字）
///
/// 文字列はそのまま、数値は整数表記を優先する。
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(f) = n.as_f64() {
                format_number(f)
            } else {
                n.to_string()
            }
        }
        other => other.to_string(),
    }
}

/// 行から列の値を文字列で取得（存在しなければ空文字）
pub fn row_text(row: &RawRow, key: &str) -> String {
    row.get(key).map(cell_text).unwrap_or_default()
}

/// 複数の候補列から最初の空でない値を取得
pub fn first_row_text(row: &RawRow, keys: &[&str]) -> String {
    keys.iter()
        .map(|k| row_text(row, k))
        .find(|v| !v.is_empty())
        .unwrap_or_default()
}

/// 数値を表記用に整形（整数なら小数点なし）
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// テーブルの取得元
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TableOrigin {
    /// アップロードされたファイル
    Upload,
    /// キャッシュ済みJSONスナップショット
    Snapshot,
    /// 同梱のシード表計算ファイル
    SeedXlsx,
    /// メモリ上のフィクスチャ
    Memory,
    /// 見つからない
    #[default]
    Empty,
}

impl std::fmt::Display for TableOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableOrigin::Upload => write!(f, "upload"),
            TableOrigin::Snapshot => write!(f, "snapshot"),
            TableOrigin::SeedXlsx => write!(f, "seed-xlsx"),
            TableOrigin::Memory => write!(f, "memory"),
            TableOrigin::Empty => write!(f, "empty"),
        }
    }
}

/// テーブルのメタ情報
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableMeta {
    pub source: TableOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
    /// ファイル更新日時（RFC3339）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    /// スナップショット作成日時（RFC3339）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imported_at: Option<String>,
}

impl TableMeta {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// ローダーが返すテーブル
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadedTable {
    pub rows: Vec<RawRow>,
    pub meta: TableMeta,
}

impl LoadedTable {
    /// 取得元なしの空テーブル
    pub fn empty() -> Self {
        Self::default()
    }

    /// メモリ上の行からテーブルを作る（テスト・フィクスチャ用）
    pub fn from_rows(rows: Vec<RawRow>) -> Self {
        Self {
            rows,
            meta: TableMeta {
                source: TableOrigin::Memory,
                ..Default::default()
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// 要件の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequirementType {
    Text,
    Visual,
}

impl RequirementType {
    pub fn is_visual(&self) -> bool {
        matches!(self, RequirementType::Visual)
    }
}

/// 要件の出所
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementSource {
    Structure,
    Content,
    Master,
}

impl RequirementSource {
    /// 外部入力の文字列から解釈（不明ならNone）
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "structure" => Some(RequirementSource::Structure),
            "content" => Some(RequirementSource::Content),
            "master" => Some(RequirementSource::Master),
            _ => None,
        }
    }
}

/// 要件の判定状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequirementStatus {
    Ok,
    Missing,
    VisualCheck,
}

impl RequirementStatus {
    /// 外部入力の状態文字列を解釈（OK/VISUAL_CHECK以外は未検出扱い）
    pub fn parse(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "OK" => RequirementStatus::Ok,
            "VISUAL_CHECK" => RequirementStatus::VisualCheck,
            _ => RequirementStatus::Missing,
        }
    }
}

/// 設計が含むべき要件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub requirement: String,
    #[serde(rename = "type")]
    pub kind: RequirementType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<RequirementSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RequirementStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub found_text: Option<Vec<String>>,
}

impl Requirement {
    pub fn new(requirement: impl Into<String>, kind: RequirementType, source: RequirementSource) -> Self {
        Self {
            requirement: requirement.into(),
            kind,
            source: Some(source),
            status: None,
            found_text: None,
        }
    }

    pub fn text(requirement: impl Into<String>, source: RequirementSource) -> Self {
        Self::new(requirement, RequirementType::Text, source)
    }

    /// 判定済み（非ビジュアルでOK以外）を未検出とみなす
    pub fn is_missing(&self) -> bool {
        !self.kind.is_visual() && self.status != Some(RequirementStatus::Ok)
    }
}
