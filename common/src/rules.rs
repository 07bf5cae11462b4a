//! 構造ルール・内容ルール
//!
//! カテゴリ単位のフラットなレコード配列（静的JSON）を保持し、
//! 製品コンテキストに合うルールを選ぶ。

use crate::context::MasterContext;
use crate::error::{Error, Result};
use crate::types::{first_row_text, RawRow};
use serde::{Deserialize, Serialize};

/// 1カテゴリ分のルール（列名 → セル）
pub type Rule = RawRow;

/// 構造ルールと内容ルールの組
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleBook {
    pub structure: Vec<Rule>,
    pub content: Vec<Rule>,
}

impl RuleBook {
    pub fn new(structure: Vec<Rule>, content: Vec<Rule>) -> Self {
        Self { structure, content }
    }

    /// JSON配列文字列からルール一覧を読み込む
    pub fn parse_rules(json: &str) -> Result<Vec<Rule>> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        match value {
            serde_json::Value::Array(items) => Ok(items
                .into_iter()
                .filter_map(|item| match item {
                    serde_json::Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect()),
            _ => Err(Error::Parse("rules must be a JSON array".into())),
        }
    }
}

/// ルールのカテゴリ名
pub fn rule_category(rule: &Rule) -> Option<String> {
    let category = first_row_text(rule, &["Categoria", "categoria", "category"]);
    if category.is_empty() {
        None
    } else {
        Some(category)
    }
}

/// カテゴリ・説明文に含まれるカテゴリ名のルールを選ぶ
///
/// 一致しなければ先頭のルールを返す（緩いフォールバック）。
/// カテゴリ名が空のルールは常に一致する。
pub fn select_rule_by_category<'a>(rules: &'a [Rule], ctx: &MasterContext) -> Option<&'a Rule> {
    if rules.is_empty() {
        return None;
    }
    let target = format!("{} {}", ctx.category, ctx.description).to_lowercase();

    let hit = rules.iter().find(|r| {
        let category = first_row_text(r, &["Categoria", "categoria"]).to_lowercase();
        target.contains(&category)
    });

    if hit.is_none() {
        tracing::debug!(lookup = %target, "no rule category matched, using first rule");
    }
    hit.or_else(|| rules.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> Vec<Rule> {
        RuleBook::parse_rules(
            r#"[
                {"Categoria": "Serie", "Descripción": "Serie de luces"},
                {"Categoria": "Cortina", "Descripción": "Cortina de luces"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_rules_skips_non_objects() {
        let parsed = RuleBook::parse_rules(r#"[{"Categoria": "A"}, 3, "x"]"#).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(RuleBook::parse_rules(r#"{"Categoria": "A"}"#).is_err());
    }

    #[test]
    fn test_select_rule_by_category() {
        let ctx = MasterContext {
            category: "Cortina".to_string(),
            ..Default::default()
        };
        let rules = rules();
        let rule = select_rule_by_category(&rules, &ctx).unwrap();
        assert_eq!(rule_category(rule).as_deref(), Some("Cortina"));
    }

    #[test]
    fn test_select_rule_by_description() {
        let ctx = MasterContext {
            description: "Mini serie 50 luces".to_string(),
            ..Default::default()
        };
        let rules = rules();
        let rule = select_rule_by_category(&rules, &ctx).unwrap();
        assert_eq!(rule_category(rule).as_deref(), Some("Serie"));
    }

    #[test]
    fn test_select_rule_fallback_first() {
        let ctx = MasterContext {
            category: "Reno".to_string(),
            ..Default::default()
        };
        let rules = rules();
        let rule = select_rule_by_category(&rules, &ctx).unwrap();
        assert_eq!(rule_category(rule).as_deref(), Some("Serie"));
        assert!(select_rule_by_category(&[], &ctx).is_none());
    }
}
