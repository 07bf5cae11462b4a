//! 要件リストの組み立て
//!
//! マスタ由来・内容ルール由来・構造ルール由来の要件を集め、
//! 種類（TEXT/VISUAL）を判定し、大文字小文字を無視して重複を除く。

use crate::context::MasterContext;
use crate::rules::Rule;
use crate::text::fold_accents;
use crate::types::{cell_text, Requirement, RequirementSource, RequirementType};
use regex::Regex;
use std::collections::HashMap;

/// 内容ルールから要件を取り出す列
pub const CONTENT_FIELDS: &[&str] = &[
    "Descripción",
    "Caracteristicas",
    "Caracteristicas:",
    "Claims",
    "Diagrama",
    "Tabla informativa / Gráfico",
    "Tabla informativa/ Gráfico",
];

lazy_static::lazy_static! {
    static ref PLACEHOLDER_RE: Regex = Regex::new(r"(?i)^n/?a$|no aplica|tbd").unwrap();
    static ref NA_CELL_RE: Regex = Regex::new(r"(?i)^n/?a$").unwrap();
    static ref VISUAL_RE: Regex =
        Regex::new(r"logo|logotipo|foto|imagen|icono|sello|diagrama|grafico").unwrap();
    static ref BULB_MENTION_RE: Regex = Regex::new(r"(?i)(\d+)\s*(luces|lights)").unwrap();
    static ref STRUCTURE_FACE_RE: Regex = Regex::new(r"(?i)cara\s|\bface\b").unwrap();
    static ref STRUCTURE_PANEL_RE: Regex = Regex::new(r"(?i)frente|lateral|vuelta|tapa|base").unwrap();
}

/// カンマの直後が「空白1つ以下 + 数字」なら小数・桁区切りとみなす
fn comma_precedes_number(rest: &[char]) -> bool {
    match rest {
        [d, ..] if d.is_ascii_digit() => true,
        [s, d, ..] if s.is_whitespace() && d.is_ascii_digit() => true,
        _ => false,
    }
}

/// セルのテキストを要件単位に分割する
///
/// 改行・セミコロンの連続、または数字が続かないカンマで区切る。
/// `1,5 m` や `3, 000` のような数値中のカンマでは分割しない。
pub fn split_cell_text(text: &str) -> Vec<String> {
    let raw = text.trim();
    if raw.is_empty() || NA_CELL_RE.is_match(raw) {
        return Vec::new();
    }

    let chars: Vec<char> = raw.chars().collect();
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\n' || c == ';' {
            parts.push(std::mem::take(&mut current));
            while i < chars.len() && (chars[i] == '\n' || chars[i] == ';') {
                i += 1;
            }
            continue;
        }
        if c == ',' && !comma_precedes_number(&chars[i + 1..]) {
            parts.push(std::mem::take(&mut current));
            i += 1;
            continue;
        }
        current.push(c);
        i += 1;
    }
    parts.push(current);

    parts
        .into_iter()
        .map(|p| p.replace('\r', "").trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// 空・プレースホルダ（N/A, no aplica, TBD）を除いた要件テキスト
pub fn clean_requirement(value: &str) -> Option<String> {
    let v = value.trim();
    if v.is_empty() || PLACEHOLDER_RE.is_match(v) {
        return None;
    }
    Some(v.to_string())
}

/// ビジュアル要素（ロゴ・写真・アイコン等）を指すテキストか
pub fn is_visual_text(text: &str) -> bool {
    VISUAL_RE.is_match(&fold_accents(text))
}

/// テキストから要件の種類を推定
pub fn infer_req_type(text: &str) -> RequirementType {
    if is_visual_text(text) {
        RequirementType::Visual
    } else {
        RequirementType::Text
    }
}

/// 製品の電球数と食い違う「n luces/lights」を含む要件か
///
/// 電球数が数値で分かっている場合のみ判定する。
pub fn is_irrelevant(text: &str, ctx: &MasterContext) -> bool {
    let Some(bulb_count) = ctx.bulb_count_number() else {
        return false;
    };
    BULB_MENTION_RE
        .captures(text)
        .and_then(|cap| cap[1].parse::<f64>().ok())
        .map(|n| n != bulb_count)
        .unwrap_or(false)
}

/// 大文字小文字を無視して重複を除く（最短の表記を残し、初出順を保つ）
pub fn dedupe_requirements(list: Vec<Requirement>) -> Vec<Requirement> {
    let mut order: Vec<Requirement> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for req in list {
        let Some(clean) = clean_requirement(&req.requirement) else {
            continue;
        };
        let key = clean.to_lowercase();
        match index.get(&key) {
            Some(&pos) => {
                if req.requirement.chars().count() < order[pos].requirement.chars().count() {
                    order[pos] = Requirement {
                        requirement: clean,
                        ..req
                    };
                }
            }
            None => {
                index.insert(key, order.len());
                order.push(Requirement {
                    requirement: clean,
                    ..req
                });
            }
        }
    }

    order
}

/// 構造ルールの面（cara/frente/lateral…）列から要件を取り出す
pub fn extract_structure_requirements(rule: Option<&Rule>) -> Vec<Requirement> {
    let Some(rule) = rule else {
        return Vec::new();
    };

    let mut reqs = Vec::new();
    for (key, value) in rule {
        if !STRUCTURE_FACE_RE.is_match(key) && !STRUCTURE_PANEL_RE.is_match(key) {
            continue;
        }
        for txt in split_cell_text(&cell_text(value)) {
            if let Some(clean) = clean_requirement(&txt) {
                let kind = infer_req_type(&clean);
                reqs.push(Requirement::new(clean, kind, RequirementSource::Structure));
            }
        }
    }
    reqs
}

/// 内容ルールの指定列から要件を取り出す
///
/// 電球数が食い違う要件は無関係として除外する。
pub fn extract_content_requirements(rule: Option<&Rule>, ctx: &MasterContext) -> Vec<Requirement> {
    let Some(rule) = rule else {
        return Vec::new();
    };

    let mut reqs = Vec::new();
    for field in CONTENT_FIELDS {
        let Some(value) = rule.get(*field) else {
            continue;
        };
        let is_diagram = field.to_lowercase().contains("diagrama");
        for txt in split_cell_text(&cell_text(value)) {
            let Some(clean) = clean_requirement(&txt) else {
                continue;
            };
            if is_irrelevant(&clean, ctx) {
                tracing::debug!(requirement = %clean, "dropping requirement with mismatched bulb count");
                continue;
            }
            let kind = if is_diagram {
                RequirementType::Visual
            } else {
                infer_req_type(&clean)
            };
            reqs.push(Requirement::new(clean, kind, RequirementSource::Content));
        }
    }
    reqs
}

/// マスタ属性から要件を作る（すべてTEXT）
pub fn build_master_requirements(ctx: &MasterContext) -> Vec<Requirement> {
    let mut fields = Vec::new();

    if !ctx.description.is_empty() {
        fields.push(format!("Descripción: {}", ctx.description));
    }
    match (ctx.bulb_count.is_empty(), ctx.bulb_color.is_empty()) {
        (false, false) => fields.push(format!("{} luces color {}", ctx.bulb_count, ctx.bulb_color)),
        (false, true) => fields.push(format!("{} luces", ctx.bulb_count)),
        (true, false) => fields.push(format!("Color de luz: {}", ctx.bulb_color)),
        (true, true) => {}
    }
    if !ctx.wire_color.is_empty() {
        fields.push(format!("Color de cable: {}", ctx.wire_color));
    }
    if !ctx.power_supply.is_empty() {
        fields.push(format!("Alimentación: {}", ctx.power_supply));
    }
    if !ctx.upc.is_empty() {
        fields.push(format!("UPC: {}", ctx.upc));
    }

    fields
        .into_iter()
        .map(|f| Requirement::text(f, RequirementSource::Master))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(value: serde_json::Value) -> Rule {
        serde_json::from_value(value).unwrap()
    }

    // =============================================
    // split_cell_text テスト
    // =============================================

    #[test]
    fn test_split_basic_separators() {
        assert_eq!(
            split_cell_text("Logo marca\nDescripción; UPC,Hecho en China"),
            vec!["Logo marca", "Descripción", "UPC", "Hecho en China"]
        );
    }

    #[test]
    fn test_split_keeps_decimal_commas() {
        assert_eq!(
            split_cell_text("Cable de 1,5 m, cable verde; 3,000 luces"),
            vec!["Cable de 1,5 m", "cable verde", "3,000 luces"]
        );
        assert_eq!(split_cell_text("Incluye: 2, 3 pilas"), vec!["Incluye: 2, 3 pilas"]);
    }

    #[test]
    fn test_split_comma_with_two_spaces_before_digit() {
        // 空白が2つ以上なら数値扱いしない
        assert_eq!(split_cell_text("pilas,  3 piezas"), vec!["pilas", "3 piezas"]);
    }

    #[test]
    fn test_split_trailing_and_repeated_separators() {
        assert_eq!(split_cell_text("a;;\n;b;"), vec!["a", "b"]);
        assert_eq!(split_cell_text("uno,\r\ndos"), vec!["uno", "dos"]);
        assert_eq!(split_cell_text(",,,"), Vec::<String>::new());
    }

    #[test]
    fn test_split_placeholder_cell() {
        assert!(split_cell_text("N/A").is_empty());
        assert!(split_cell_text(" na ").is_empty());
        assert!(split_cell_text("").is_empty());
    }

    // =============================================
    // clean / type テスト
    // =============================================

    #[test]
    fn test_clean_requirement() {
        assert_eq!(clean_requirement("  UPC  ").as_deref(), Some("UPC"));
        assert_eq!(clean_requirement("n/a"), None);
        assert_eq!(clean_requirement("No aplica para este modelo"), None);
        assert_eq!(clean_requirement("TBD"), None);
        assert_eq!(clean_requirement(""), None);
    }

    #[test]
    fn test_infer_req_type() {
        assert_eq!(infer_req_type("Logo FSC"), RequirementType::Visual);
        assert_eq!(infer_req_type("Gráfico de consumo"), RequirementType::Visual);
        assert_eq!(infer_req_type("ÍCONO de reciclaje"), RequirementType::Visual);
        assert_eq!(infer_req_type("Foto del producto"), RequirementType::Visual);
        assert_eq!(infer_req_type("Hecho en China"), RequirementType::Text);
    }

    // =============================================
    // dedupe テスト
    // =============================================

    #[test]
    fn test_dedupe_requirements() {
        let list = vec![
            Requirement::text("Logo FSC", RequirementSource::Content),
            Requirement::text("logo fsc ", RequirementSource::Structure),
        ];
        let deduped = dedupe_requirements(list);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].requirement, "Logo FSC");
        assert_eq!(deduped[0].source, Some(RequirementSource::Content));
    }

    #[test]
    fn test_dedupe_keeps_first_seen_order() {
        let list = vec![
            Requirement::text("B", RequirementSource::Master),
            Requirement::text("A", RequirementSource::Master),
            Requirement::text("  b", RequirementSource::Content),
            Requirement::text("N/A", RequirementSource::Content),
        ];
        let deduped = dedupe_requirements(list);
        let texts: Vec<&str> = deduped.iter().map(|r| r.requirement.as_str()).collect();
        assert_eq!(texts, vec!["B", "A"]);
    }

    // =============================================
    // 抽出テスト
    // =============================================

    #[test]
    fn test_is_irrelevant() {
        let ctx = MasterContext {
            bulb_count: "50".to_string(),
            ..Default::default()
        };
        assert!(is_irrelevant("Serie de 100 luces", &ctx));
        assert!(!is_irrelevant("Serie de 50 luces", &ctx));
        assert!(!is_irrelevant("Cable verde de 5 m", &ctx));
        assert!(!is_irrelevant("100 lights", &MasterContext::default()));
    }

    #[test]
    fn test_extract_content_requirements() {
        let r = rule(json!({
            "Categoria": "Serie",
            "Descripción": "Serie de luces; 100 luces; 50 luces",
            "Claims": "Ahorra energía, N/A",
            "Diagrama": "Conexión en serie",
            "Otro": "ignorado"
        }));
        let ctx = MasterContext {
            bulb_count: "50".to_string(),
            ..Default::default()
        };
        let reqs = extract_content_requirements(Some(&r), &ctx);
        let texts: Vec<&str> = reqs.iter().map(|r| r.requirement.as_str()).collect();

        assert_eq!(texts, vec!["Serie de luces", "50 luces", "Ahorra energía", "Conexión en serie"]);
        assert_eq!(reqs[3].kind, RequirementType::Visual);
        assert!(reqs.iter().all(|r| r.source == Some(RequirementSource::Content)));
    }

    #[test]
    fn test_extract_structure_requirements() {
        let r = rule(json!({
            "Categoria": "Serie",
            "Cara 1": "Logo marca, Descripción",
            "Frente": "Foto producto",
            "Notas": "no usar"
        }));
        let reqs = extract_structure_requirements(Some(&r));
        let texts: Vec<&str> = reqs.iter().map(|r| r.requirement.as_str()).collect();

        assert_eq!(texts, vec!["Logo marca", "Descripción", "Foto producto"]);
        assert_eq!(reqs[0].kind, RequirementType::Visual);
        assert_eq!(reqs[1].kind, RequirementType::Text);
        assert!(extract_structure_requirements(None).is_empty());
    }

    #[test]
    fn test_build_master_requirements() {
        let ctx = MasterContext {
            description: "Lámpara LED".to_string(),
            bulb_count: "50".to_string(),
            bulb_color: "blanco".to_string(),
            wire_color: "verde".to_string(),
            upc: "0123456789012".to_string(),
            ..Default::default()
        };
        let reqs = build_master_requirements(&ctx);
        let texts: Vec<&str> = reqs.iter().map(|r| r.requirement.as_str()).collect();

        assert_eq!(
            texts,
            vec![
                "Descripción: Lámpara LED",
                "50 luces color blanco",
                "Color de cable: verde",
                "UPC: 0123456789012"
            ]
        );
        assert!(reqs.iter().all(|r| r.kind == RequirementType::Text));
    }

    #[test]
    fn test_build_master_requirements_partial_bulb_data() {
        let only_color = MasterContext {
            bulb_color: "multicolor".to_string(),
            ..Default::default()
        };
        assert_eq!(build_master_requirements(&only_color)[0].requirement, "Color de luz: multicolor");
        assert!(build_master_requirements(&MasterContext::default()).is_empty());
    }
}
