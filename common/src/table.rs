//! 表計算データの正規化
//!
//! 表計算の途中に見出し行が埋まっていることがあるため、
//! キーワードの出現数で見出し行を推定する。
//!
//! ## 処理フロー
//! 1. 各行のセルにキーワードが含まれる数を数える
//! 2. 最高スコア（2以上、同点は先勝ち）の行を見出しとみなす
//! 3. 見出しをsnake_caseに変換し、以降の行を付け替える
//! 4. 全セル空の行を除去
//!
//! 推定はあくまでヒューリスティックであり、誤検出はエラーにしない。

use crate::types::{cell_text, RawRow};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// 見出し行の判定に使うキーワード
pub const HEADER_KEYWORDS: &[&str] = &[
    "sku",
    "model",
    "item",
    "description",
    "bulb",
    "color",
    "wire",
    "pack",
];

/// 見出し行とみなす最低スコア
pub const MIN_HEADER_SCORE: usize = 2;

lazy_static::lazy_static! {
    static ref NON_WORD_RE: Regex = Regex::new(r"[^A-Za-z0-9_]+").unwrap();
    static ref SPACES_RE: Regex = Regex::new(r"\s+").unwrap();
}

/// 見出し行の推定結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderDetection {
    /// 見出し行のインデックス（見つからなければNone）
    pub header_index: Option<usize>,
    /// 見出し行でキーワードを含んだセル数
    pub confidence: usize,
}

/// 正規化済みテーブル
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTable {
    pub header_row: Option<usize>,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// 列順（先頭行のキー順）
fn ordered_keys(raw_rows: &[RawRow]) -> Vec<String> {
    raw_rows
        .first()
        .map(|r| r.keys().cloned().collect())
        .unwrap_or_default()
}

fn cell(row: &RawRow, key: &str) -> String {
    row.get(key).map(cell_text).unwrap_or_default()
}

fn has_header_keyword(value: &str) -> bool {
    let v = value.to_lowercase();
    HEADER_KEYWORDS.iter().any(|k| v.contains(k))
}

/// 見出し名をsnake_caseのキーに変換
///
/// 空の見出しは `col_<n>`（1始まり）になる。
pub fn normalize_header_name(name: &str, idx: usize) -> String {
    let clean = name.trim();
    if clean.is_empty() {
        return format!("col_{}", idx + 1);
    }
    let lowered = clean.to_lowercase();
    let spaced = NON_WORD_RE.replace_all(&lowered, " ");
    let key = SPACES_RE.replace_all(spaced.trim(), "_").to_string();
    if key.is_empty() {
        format!("col_{}", idx + 1)
    } else {
        key
    }
}

/// 見出し行を推定する
pub fn detect_header_row(raw_rows: &[RawRow]) -> HeaderDetection {
    let keys = ordered_keys(raw_rows);
    let mut detection = HeaderDetection {
        header_index: None,
        confidence: 0,
    };

    for (idx, row) in raw_rows.iter().enumerate() {
        let score = keys
            .iter()
            .filter(|k| has_header_keyword(&cell(row, k)))
            .count();
        if score > detection.confidence && score >= MIN_HEADER_SCORE {
            detection = HeaderDetection {
                header_index: Some(idx),
                confidence: score,
            };
        }
    }

    detection
}

/// 重複したキーに連番を付けて一意にする
fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    headers
        .into_iter()
        .map(|h| {
            if seen.insert(h.clone()) {
                return h;
            }
            let mut n = 2;
            loop {
                let candidate = format!("{}_{}", h, n);
                if seen.insert(candidate.clone()) {
                    return candidate;
                }
                n += 1;
            }
        })
        .collect()
}

/// マスタ表を正規化する
///
/// # Arguments
/// * `raw_rows` - 表計算から読み込んだ生の行
///
/// # Returns
/// 見出し行・見出しキー・付け替え後の行。全行のキー集合は `headers` と一致する。
pub fn normalize_master_table(raw_rows: &[RawRow]) -> NormalizedTable {
    if raw_rows.is_empty() {
        return NormalizedTable::default();
    }

    let keys = ordered_keys(raw_rows);
    let detection = detect_header_row(raw_rows);

    let headers: Vec<String> = match detection.header_index {
        Some(idx) => keys
            .iter()
            .enumerate()
            .map(|(i, k)| normalize_header_name(&cell(&raw_rows[idx], k), i))
            .collect(),
        None => keys
            .iter()
            .enumerate()
            .map(|(i, k)| normalize_header_name(k, i))
            .collect(),
    };
    let headers = unique_headers(headers);

    let data_rows = match detection.header_index {
        Some(idx) => &raw_rows[idx + 1..],
        None => raw_rows,
    };

    let rows: Vec<RawRow> = data_rows
        .iter()
        .map(|row| {
            keys.iter()
                .zip(headers.iter())
                .map(|(k, h)| {
                    let value = row.get(k).cloned().unwrap_or(Value::String(String::new()));
                    (h.clone(), value)
                })
                .collect::<RawRow>()
        })
        .filter(|row| row.values().any(|v| !cell_text(v).trim().is_empty()))
        .collect();

    match detection.header_index {
        Some(idx) => tracing::debug!(
            header_row = idx,
            confidence = detection.confidence,
            rows = rows.len(),
            "header row detected"
        ),
        None => tracing::debug!(rows = rows.len(), "no header row detected, using column keys"),
    }

    NormalizedTable {
        header_row: detection.header_index,
        headers,
        rows,
    }
}
