//! マスタ行から製品コンテキストを組み立てる
//!
//! 列名のキーワードヒントで値を拾うため、表ごとに列名が揺れていても動く。
//! ヒットしない項目は空文字になる（失敗しない）。

use crate::types::{cell_text, format_number, RawRow};
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static::lazy_static! {
    static ref NUMBER_LIKE_RE: Regex = Regex::new(r"(\d+(\.\d+)?)").unwrap();
}

/// 製品の正規化属性
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MasterContext {
    pub model: String,
    pub description: String,
    pub packaging: String,
    pub packaging_finish: String,
    pub bulb_tech: String,
    /// 数値が取れた場合は数値表記に揃える
    pub bulb_count: String,
    pub bulb_color: String,
    pub wire_color: String,
    pub power_supply: String,
    pub total_length: String,
    pub lighted_length: String,
    pub lead_in: String,
    pub lead_out: String,
    pub end_connector: String,
    pub functions: String,
    pub accessories: String,
    pub claims: String,
    pub brand: String,
    pub vendor: String,
    pub origin: String,
    pub upc: String,
    pub category: String,
}

impl MasterContext {
    /// 電球数（数値として解釈できる場合）
    pub fn bulb_count_number(&self) -> Option<f64> {
        parse_number_like(&self.bulb_count)
    }
}

/// 列名にヒントを含む最初の空でない値を返す
///
/// ヒントの優先順ではなく、行の列順で最初にヒットした列が採用される。
pub fn pick_value(row: &RawRow, hints: &[&str]) -> String {
    for (key, value) in row {
        let text = cell_text(value);
        if text.trim().is_empty() {
            continue;
        }
        let key = key.to_lowercase();
        if hints.iter().any(|h| key.contains(h)) {
            return text;
        }
    }
    String::new()
}

/// 数値らしき文字列から最初の数値を取り出す（カンマ・空白は除去）
pub fn parse_number_like(value: &str) -> Option<f64> {
    let compact: String = value.chars().filter(|c| *c != ',' && *c != ' ').collect();
    NUMBER_LIKE_RE
        .captures(&compact)
        .and_then(|cap| cap[1].parse::<f64>().ok())
}

/// マスタ行からコンテキストを作る
pub fn build_master_context(row: &RawRow) -> MasterContext {
    let mut ctx = MasterContext {
        model: pick_value(row, &["sku", "model", "item"]),
        description: pick_value(
            row,
            &["description", "desc", "goods", "item_description", "descripcion"],
        ),
        packaging: pick_value(row, &["packaging", "empaque"]),
        packaging_finish: pick_value(row, &["packaging_finish", "finish"]),
        bulb_tech: pick_value(row, &["bulb_tech", "technology", "tech"]),
        bulb_count: pick_value(
            row,
            &["#_of_bulbs", "of_bulbs", "bulb_count", "bulbcount", "bulbs", "lights", "luces"],
        ),
        bulb_color: pick_value(row, &["color_bulb", "bulb_color", "color"]),
        wire_color: pick_value(row, &["wire_color", "wire"]),
        power_supply: pick_value(row, &["power", "power_supply", "voltage"]),
        total_length: pick_value(row, &["total_length", "length"]),
        lighted_length: pick_value(row, &["lighted_length"]),
        lead_in: pick_value(row, &["lead_in"]),
        lead_out: pick_value(row, &["lead_out"]),
        end_connector: pick_value(row, &["end_connector", "connector"]),
        functions: pick_value(row, &["functions", "function"]),
        accessories: pick_value(row, &["accs", "accessories", "extras"]),
        claims: pick_value(row, &["claims", "claim"]),
        brand: pick_value(row, &["marca", "brand"]),
        vendor: pick_value(row, &["vendor", "supplier"]),
        origin: pick_value(row, &["origen", "country", "pais"]),
        upc: pick_value(row, &["upc", "barcode"]),
        category: pick_value(row, &["categoria", "category"]),
    };

    if let Some(count) = parse_number_like(&ctx.bulb_count).filter(|n| *n != 0.0) {
        ctx.bulb_count = format_number(count);
    }

    ctx
}
