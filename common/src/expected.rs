//! モデルごとの期待内容（ExpectedBundle）の組み立て
//!
//! 読み込み済みのマスタ表・デザイン情報表・ルールから、
//! デザインが満たすべき要件と面ごとのテキストを作る。
//! ファイルアクセスは行わない（テーブルは呼び出し側が渡す）。

use crate::context::{build_master_context, MasterContext};
use crate::error::{Error, Result};
use crate::faces::{build_checklist, build_faces, build_summary, suggest_packaging, FaceLayout, PackagingSuggestion};
use crate::matcher::{find_master_row, select_design_row};
use crate::requirements::{
    build_master_requirements, dedupe_requirements, extract_content_requirements,
    extract_structure_requirements,
};
use crate::rules::{rule_category, select_rule_by_category, RuleBook};
use crate::table::normalize_master_table;
use crate::types::{LoadedTable, RawRow, Requirement, TableMeta};
use serde::{Deserialize, Serialize};

/// 正規化の情報
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizationInfo {
    pub header_row: Option<usize>,
}

/// 使用したテーブルのメタ情報
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundleMeta {
    pub master: TableMeta,
    pub design: TableMeta,
    pub normalization: NormalizationInfo,
}

/// 主要フィールドの期待値
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpectedFields {
    pub item_description: String,
    pub upc: String,
    pub wire_color: String,
    pub power_supply: String,
}

/// 選ばれたルールのカテゴリ
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesUsed {
    pub structure_category: Option<String>,
    pub content_category: Option<String>,
}

/// モデル1件分の期待内容
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedBundle {
    pub model_key: String,
    pub meta: BundleMeta,
    pub master_row: RawRow,
    pub design_row: Option<RawRow>,
    pub master_context: MasterContext,
    pub packaging_suggestion: PackagingSuggestion,
    pub expected_fields: ExpectedFields,
    pub resumen_modelo: String,
    pub caras: FaceLayout,
    pub checklist: Vec<String>,
    pub global_requirements: Vec<Requirement>,
    pub rules_used: RulesUsed,
    pub notas_extras: Vec<String>,
}

/// 期待内容を組み立てる
///
/// # Arguments
/// * `model_key` - 検索するモデル（SKU等）
/// * `master` - マスタ表（生の行）
/// * `design` - デザイン情報表（生の行）
/// * `rules` - 構造ルール・内容ルール
///
/// # Returns
/// マスタ表が空なら `Error::NoMaster`、該当行が無ければ `Error::NotFound`
pub fn assemble_expected(
    model_key: &str,
    master: &LoadedTable,
    design: &LoadedTable,
    rules: &RuleBook,
) -> Result<ExpectedBundle> {
    if master.is_empty() {
        return Err(Error::NoMaster);
    }

    let normalized = normalize_master_table(&master.rows);
    let master_row = find_master_row(&normalized.rows, model_key)
        .cloned()
        .ok_or_else(|| Error::NotFound(model_key.to_string()))?;

    let ctx = build_master_context(&master_row);
    let design_match = select_design_row(&design.rows, &ctx);
    let design_row = design_match.row.as_ref();

    let caras = build_faces(design_row, &ctx);
    let checklist = build_checklist(&caras, &ctx);
    let packaging_suggestion = suggest_packaging(&ctx, design_row);
    let resumen_modelo = build_summary(&ctx);

    let structure_rule = select_rule_by_category(&rules.structure, &ctx);
    let content_rule = select_rule_by_category(&rules.content, &ctx);

    let mut requirements = build_master_requirements(&ctx);
    requirements.extend(extract_content_requirements(content_rule, &ctx));
    requirements.extend(extract_structure_requirements(structure_rule));
    let global_requirements = dedupe_requirements(requirements);

    let expected_fields = ExpectedFields {
        item_description: if ctx.description.is_empty() {
            ctx.model.clone()
        } else {
            ctx.description.clone()
        },
        upc: ctx.upc.clone(),
        wire_color: ctx.wire_color.clone(),
        power_supply: ctx.power_supply.clone(),
    };

    let notas_extras = if design_match.row.is_none() || design_match.matched_by.is_empty() {
        Vec::new()
    } else {
        vec![format!(
            "Coincidencia diseño-info por {}",
            design_match.matched_by.join(", ")
        )]
    };

    tracing::debug!(
        model = model_key,
        requirements = global_requirements.len(),
        design_score = design_match.score,
        "expected bundle assembled"
    );

    Ok(ExpectedBundle {
        model_key: model_key.to_string(),
        meta: BundleMeta {
            master: master.meta.clone(),
            design: design.meta.clone(),
            normalization: NormalizationInfo {
                header_row: normalized.header_row,
            },
        },
        master_row,
        design_row: design_match.row.clone(),
        master_context: ctx,
        packaging_suggestion,
        expected_fields,
        resumen_modelo,
        caras,
        checklist,
        global_requirements,
        rules_used: RulesUsed {
            structure_category: structure_rule.and_then(rule_category),
            content_category: content_rule.and_then(rule_category),
        },
        notas_extras,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RequirementSource, RequirementType};
    use serde_json::json;

    fn table(value: serde_json::Value) -> LoadedTable {
        LoadedTable::from_rows(serde_json::from_value(value).unwrap())
    }

    fn rules() -> RuleBook {
        RuleBook::new(
            RuleBook::parse_rules(r#"[{"Categoria": "Lámpara", "Cara 1": "Logo marca"}]"#).unwrap(),
            RuleBook::parse_rules(
                r#"[{"Categoria": "Lámpara", "Claims": "Ahorra energía; 100 luces", "Diagrama": "Conexión"}]"#,
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_assemble_expected_x01() {
        let master = table(json!([
            {"sku": "X01", "description": "Lámpara LED", "bulbCount": "50", "bulbColor": "blanco"}
        ]));
        let bundle = assemble_expected("X01", &master, &LoadedTable::empty(), &RuleBook::default()).unwrap();

        assert_eq!(bundle.expected_fields.item_description, "Lámpara LED");
        assert!(bundle.global_requirements.iter().any(|r| {
            r.kind == RequirementType::Text
                && r.requirement.contains("50")
                && r.requirement.contains("blanco")
        }));
        assert!(bundle.design_row.is_none());
        assert!(bundle.notas_extras.is_empty());
    }

    #[test]
    fn test_design_note_requires_selected_row() {
        let master = table(json!([
            {"sku": "X01", "description": "Lámpara LED", "bulbCount": "50"}
        ]));
        let bundle = assemble_expected("X01", &master, &LoadedTable::empty(), &RuleBook::default()).unwrap();
        assert!(bundle.design_row.is_none());
        assert!(bundle.notas_extras.iter().all(|n| !n.starts_with("Coincidencia")));

        // 一致項目の無い行は選ばれても注記しない
        let design = table(json!([{"Categoria": "Cortina", "N. luces": "300"}]));
        let bundle = assemble_expected("X01", &master, &design, &RuleBook::default()).unwrap();
        assert!(bundle.design_row.is_some());
        assert!(bundle.notas_extras.is_empty());

        let design = table(json!([{"Categoria": "Lámpara", "N. luces": "300"}]));
        let bundle = assemble_expected("X01", &master, &design, &RuleBook::default()).unwrap();
        assert_eq!(bundle.notas_extras, vec!["Coincidencia diseño-info por categoría"]);
    }

    #[test]
    fn test_assemble_expected_with_rules_and_design() {
        let master = table(json!([
            {"sku": "X01", "description": "Lámpara LED", "bulbCount": "50", "bulbColor": "blanco"}
        ]));
        let design = table(json!([
            {"Categoria": "Cortina", "N. luces": "50"},
            {"Categoria": "Lámpara", "N. luces": "50", "Frente": "Foto producto"}
        ]));
        let bundle = assemble_expected("x01", &master, &design, &rules()).unwrap();

        let texts: Vec<&str> = bundle
            .global_requirements
            .iter()
            .map(|r| r.requirement.as_str())
            .collect();
        assert_eq!(
            texts,
            vec![
                "Descripción: Lámpara LED",
                "50 luces color blanco",
                "Ahorra energía",
                "Conexión",
                "Logo marca"
            ]
        );
        assert_eq!(bundle.global_requirements[3].kind, RequirementType::Visual);
        assert_eq!(
            bundle.global_requirements[4].source,
            Some(RequirementSource::Structure)
        );
        assert_eq!(bundle.rules_used.content_category.as_deref(), Some("Lámpara"));
        assert_eq!(
            bundle.notas_extras,
            vec!["Coincidencia diseño-info por categoría, número de luces"]
        );
        assert!(bundle.caras.frente.contains(&"Foto producto".to_string()));
    }

    #[test]
    fn test_assemble_expected_errors() {
        let empty = assemble_expected("X01", &LoadedTable::empty(), &LoadedTable::empty(), &RuleBook::default());
        assert_eq!(empty.unwrap_err().code(), "NO_MASTER");

        let master = table(json!([{"sku": "X01", "description": "Lámpara"}]));
        let missing = assemble_expected("X99", &master, &LoadedTable::empty(), &RuleBook::default());
        assert_eq!(missing.unwrap_err().code(), "NOT_FOUND");
    }

    #[test]
    fn test_item_description_falls_back_to_model() {
        let master = table(json!([{"sku": "X05", "upc": "750100000001"}]));
        let bundle = assemble_expected("X05", &master, &LoadedTable::empty(), &RuleBook::default()).unwrap();
        assert_eq!(bundle.expected_fields.item_description, "X05");
        assert_eq!(bundle.expected_fields.upc, "750100000001");
    }

    #[test]
    fn test_bundle_serializes_camel_case() {
        let master = table(json!([{"sku": "X01", "description": "Lámpara LED"}]));
        let bundle = assemble_expected("X01", &master, &LoadedTable::empty(), &RuleBook::default()).unwrap();
        let value = serde_json::to_value(&bundle).unwrap();
        assert!(value.get("globalRequirements").is_some());
        assert!(value.get("expectedFields").unwrap().get("itemDescription").is_some());
        assert_eq!(value["meta"]["master"]["source"], json!("memory"));
    }
}
