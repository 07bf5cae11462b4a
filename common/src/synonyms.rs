//! 同義語テーブル
//!
//! スペイン語/英語の表記ゆれを正規形に畳み込む。
//! 組み込みプリセットにJSONで追加定義をマージできる。

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// 正規形 → 異表記のリスト（定義順に照合）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynonymTable {
    entries: Vec<(String, Vec<String>)>,
}

impl Default for SynonymTable {
    fn default() -> Self {
        Self::bilingual_preset()
    }
}

impl SynonymTable {
    /// 空のテーブル
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// 包装テキスト用の組み込みプリセット
    pub fn bilingual_preset() -> Self {
        let mut table = Self::empty();

        table.insert("incan", &["incandescente", "incandescent", "incan"]);
        table.insert("led", &["leds", "light emitting diode"]);
        table.insert(
            "calida",
            &["calida", "warm", "clear", "transparente", "luz calida", "warm white"],
        );
        table.insert("white", &["blanco", "white", "fria", "cool white"]);
        table.insert("green", &["verde", "green"]);
        table.insert("multi", &["multicolor", "multi", "multi color"]);
        table.insert("cable", &["wire", "cable"]);

        table
    }

    /// JSONオブジェクト `{"正規形": ["異表記", ...]}` から読み込み
    pub fn from_json(json: &str) -> Result<Self> {
        let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
        let mut table = Self::empty();
        for (canonical, variants) in map {
            let variants: Vec<String> = match variants {
                serde_json::Value::Array(items) => items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect(),
                serde_json::Value::String(s) => vec![s.trim().to_lowercase()],
                _ => Vec::new(),
            };
            table.push_variants(canonical.trim().to_lowercase(), variants);
        }
        Ok(table)
    }

    fn insert(&mut self, canonical: &str, variants: &[&str]) {
        self.push_variants(
            canonical.to_string(),
            variants.iter().map(|v| v.to_string()).collect(),
        );
    }

    fn push_variants(&mut self, canonical: String, variants: Vec<String>) {
        if canonical.is_empty() {
            return;
        }
        if let Some((_, existing)) = self.entries.iter_mut().find(|(c, _)| *c == canonical) {
            for v in variants {
                if !existing.contains(&v) {
                    existing.push(v);
                }
            }
        } else {
            self.entries.push((canonical, variants));
        }
    }

    /// 設定をマージ（既存の正規形には異表記を追加、新しい正規形は末尾に追加）
    pub fn merge(&mut self, other: &SynonymTable) {
        for (canonical, variants) in &other.entries {
            self.push_variants(canonical.clone(), variants.clone());
        }
    }

    /// トークンを正規形に変換（該当なしはそのまま）
    pub fn canonical<'a>(&'a self, token: &'a str) -> &'a str {
        for (canonical, variants) in &self.entries {
            if canonical == token || variants.iter().any(|v| v == token) {
                return canonical.as_str();
            }
        }
        token
    }

    /// トークン列に同義語変換を適用
    pub fn apply(&self, tokens: &[String]) -> Vec<String> {
        tokens.iter().map(|t| self.canonical(t).to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
