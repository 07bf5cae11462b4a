//! 表計算ファイルの読み込みとJSONスナップショット
//!
//! 1行目を見出しとして各行を「列名 → 値」に変換する。
//! 見出しの欠落・重複はキーを補って一意にする（`__EMPTY`, `name_1` …）。

use crate::error::{QaError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use packaging_qa_common::{LoadedTable, RawRow, TableMeta, TableOrigin};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// 対応する表計算ファイルの拡張子
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls", "xlsm", "ods"];

/// シート名にこの語を含むシートを優先する
pub const PREFERRED_SHEET_HINT: &str = "master";

pub fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .map(|e| {
            let ext = e.to_string_lossy().to_lowercase();
            SPREADSHEET_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// セル値をJSON値に変換（整数値の浮動小数は整数にする）
fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::String(String::new()),
        Data::String(s) => Value::String(s.clone()),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                Value::from(*f as i64)
            } else {
                Value::from(*f)
            }
        }
        Data::Bool(b) => Value::Bool(*b),
        other => Value::String(other.to_string()),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::String(s) => s.trim().is_empty(),
        Value::Null => true,
        _ => false,
    }
}

/// 見出し行から一意な列キーを作る
///
/// 空の見出しは `__EMPTY`, `__EMPTY_1` …、重複は `name_1`, `name_2` … になる。
pub fn sheet_headers(cells: &[Data]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut headers = Vec::with_capacity(cells.len());

    for cell in cells {
        let text = match cell {
            Data::Empty | Data::Error(_) => String::new(),
            other => other.to_string(),
        };
        let base = if text.trim().is_empty() {
            "__EMPTY".to_string()
        } else {
            text
        };

        let mut key = base.clone();
        let mut n = 1;
        while used.contains(&key) {
            key = format!("{}_{}", base, n);
            n += 1;
        }
        used.insert(key.clone());
        headers.push(key);
    }

    headers
}

/// 表計算ファイルの1シートを行の配列として読み込む
///
/// # Arguments
/// * `path` - 表計算ファイル
///
/// # Returns
/// (行, 使用したシート名)
pub fn read_sheet_rows(path: &Path) -> Result<(Vec<RawRow>, String)> {
    if !path.exists() {
        return Err(QaError::FileNotFound(path.display().to_string()));
    }

    let mut workbook = open_workbook_auto(path)?;
    let names = workbook.sheet_names();
    let sheet_name = names
        .iter()
        .find(|n| n.to_lowercase().contains(PREFERRED_SHEET_HINT))
        .or_else(|| names.first())
        .cloned()
        .ok_or_else(|| QaError::InvalidTable(format!("シートがありません: {}", path.display())))?;

    let range = workbook.worksheet_range(&sheet_name)?;
    let mut iter = range.rows();
    let Some(header_cells) = iter.next() else {
        return Ok((Vec::new(), sheet_name));
    };
    let headers = sheet_headers(header_cells);

    let rows: Vec<RawRow> = iter
        .map(|cells| {
            headers
                .iter()
                .enumerate()
                .map(|(i, h)| {
                    let value = cells.get(i).map(cell_value).unwrap_or(Value::String(String::new()));
                    (h.clone(), value)
                })
                .collect::<RawRow>()
        })
        .filter(|row| !row.values().all(is_blank))
        .collect();

    tracing::debug!(
        file = %path.display(),
        sheet = %sheet_name,
        rows = rows.len(),
        "spreadsheet loaded"
    );

    Ok((rows, sheet_name))
}

/// 表計算ファイルを読み込んでテーブルにする
pub fn read_spreadsheet(path: &Path, source: TableOrigin) -> Result<LoadedTable> {
    let (rows, sheet_name) = read_sheet_rows(path)?;
    Ok(LoadedTable {
        rows,
        meta: TableMeta {
            source,
            file: Some(path.display().to_string()),
            sheet_name: Some(sheet_name),
            ..Default::default()
        },
    })
}

/// JSONファイルを読み込む（`{rows, meta}` または行の配列）
pub fn read_json_table(path: &Path) -> Result<LoadedTable> {
    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;

    match value {
        Value::Array(_) => {
            let rows: Vec<RawRow> = serde_json::from_value(value)?;
            Ok(LoadedTable {
                rows,
                meta: TableMeta::default(),
            })
        }
        Value::Object(_) => Ok(serde_json::from_value(value)?),
        _ => Err(QaError::InvalidTable(format!(
            "行の配列または {{rows, meta}} が必要です: {}",
            path.display()
        ))),
    }
}

/// 表計算ファイルをJSONスナップショットとして保存する
///
/// # Returns
/// 保存したテーブル（取り込み日時つき）
pub fn import_snapshot(spreadsheet: &Path, snapshot: &Path) -> Result<LoadedTable> {
    let mut table = read_spreadsheet(spreadsheet, TableOrigin::Snapshot)?;
    table.meta.imported_at = Some(chrono::Utc::now().to_rfc3339());

    if let Some(parent) = snapshot.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(&table)?;
    std::fs::write(snapshot, content)?;

    tracing::info!(
        source = %spreadsheet.display(),
        snapshot = %snapshot.display(),
        rows = table.len(),
        "snapshot written"
    );
    Ok(table)
}
