//! マスタ行・デザイン情報行の照合
//!
//! - マスタ行: モデルキーの完全一致（ID系の列を優先）
//! - デザイン情報行: カテゴリ・電球数・技術の重み付きスコア

use crate::context::{parse_number_like, MasterContext};
use crate::types::{cell_text, first_row_text, RawRow};
use regex::Regex;
use serde::Serialize;

lazy_static::lazy_static! {
    static ref MODEL_COLUMN_RE: Regex = Regex::new(r"(?i)(sku|model|item)").unwrap();
}

const CATEGORY_WEIGHT: i32 = 3;
const LIGHTS_WEIGHT: i32 = 2;
const TECH_WEIGHT: i32 = 2;

fn matches_key(value: &serde_json::Value, key: &str) -> bool {
    cell_text(value).trim().to_lowercase() == key
}

/// モデルキーに一致するマスタ行を探す
///
/// 1. 列名に sku/model/item を含む列で完全一致（大文字小文字・前後空白を無視）
/// 2. 見つからなければ全列で完全一致
pub fn find_master_row<'a>(rows: &'a [RawRow], model_key: &str) -> Option<&'a RawRow> {
    let key = model_key.trim().to_lowercase();
    if key.is_empty() {
        return None;
    }

    let model_columns: Vec<&String> = rows
        .first()
        .map(|r| r.keys().filter(|k| MODEL_COLUMN_RE.is_match(k)).collect())
        .unwrap_or_default();

    rows.iter()
        .find(|r| {
            model_columns
                .iter()
                .any(|col| r.get(col.as_str()).map(|v| matches_key(v, &key)).unwrap_or(false))
        })
        .or_else(|| rows.iter().find(|r| r.values().any(|v| matches_key(v, &key))))
}

/// デザイン情報行の選択結果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignMatch {
    pub row: Option<RawRow>,
    pub score: i32,
    pub matched_by: Vec<String>,
}

impl DesignMatch {
    fn fallback(row: Option<RawRow>) -> Self {
        Self {
            row,
            score: 0,
            matched_by: vec!["fallback".to_string()],
        }
    }
}

/// コンテキストに最も合うデザイン情報行を選ぶ
///
/// カテゴリ +3、電球数一致 +2、技術一致 +2。同点は先に出た行が勝つ。
/// 行が無い場合も失敗せず、`matched_by = ["fallback"]` を返す。
pub fn select_design_row(design_rows: &[RawRow], ctx: &MasterContext) -> DesignMatch {
    if design_rows.is_empty() {
        tracing::debug!("design-info table is empty");
        return DesignMatch::fallback(None);
    }

    let target_category = if ctx.description.is_empty() {
        ctx.packaging.to_lowercase()
    } else {
        ctx.description.to_lowercase()
    };
    let target_lights = parse_number_like(&ctx.bulb_count);
    let target_tech = ctx.bulb_tech.to_lowercase();

    let mut best: Option<(&RawRow, i32, Vec<String>)> = None;
    let mut best_score = -1;

    for row in design_rows {
        let mut score = 0;
        let mut matched_by = Vec::new();

        let row_category = first_row_text(row, &["Categoria", "Category"]).to_lowercase();
        if !row_category.is_empty()
            && !target_category.is_empty()
            && target_category.contains(&row_category)
        {
            score += CATEGORY_WEIGHT;
            matched_by.push("categoría".to_string());
        }

        let row_lights = parse_number_like(&first_row_text(row, &["N. luces"]));
        if let (Some(row_lights), Some(target)) = (row_lights, target_lights) {
            if row_lights != 0.0 && target != 0.0 && row_lights == target {
                score += LIGHTS_WEIGHT;
                matched_by.push("número de luces".to_string());
            }
        }

        let row_tech = first_row_text(row, &["Tecnología", "Technology"]).to_lowercase();
        if !row_tech.is_empty() && !target_tech.is_empty() && row_tech.contains(&target_tech) {
            score += TECH_WEIGHT;
            matched_by.push("tecnología".to_string());
        }

        if score > best_score {
            best_score = score;
            best = Some((row, score, matched_by));
        }
    }

    match best {
        Some((row, score, matched_by)) => DesignMatch {
            row: Some(row.clone()),
            score,
            matched_by,
        },
        None => {
            tracing::debug!("no design-info row scored, falling back to the first row");
            DesignMatch::fallback(design_rows.first().cloned())
        }
    }
}
