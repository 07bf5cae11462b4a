//! 面ごとの期待テキスト・チェックリスト・パッケージ提案
//!
//! デザイン情報行の列名から面を推定し、マスタの技術情報を補う。

use crate::context::{parse_number_like, MasterContext};
use crate::requirements::split_cell_text;
use crate::types::{cell_text, first_row_text, format_number, RawRow};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 面の数（既定値）
pub const DEFAULT_FACE_COUNT: u32 = 6;

lazy_static::lazy_static! {
    static ref FRONT_RE: Regex = Regex::new(r"frente|front|cara\s*1").unwrap();
    static ref SIDE_RE: Regex = Regex::new(r"lateral|cara\s*2").unwrap();
    static ref THIRD_RE: Regex = Regex::new(r"cara\s*3").unwrap();
    static ref BACK_RE: Regex = Regex::new(r"vuelta|back|reverso").unwrap();
    static ref TOP_RE: Regex = Regex::new(r"tapa|top").unwrap();
    static ref BOTTOM_RE: Regex = Regex::new(r"base|bottom").unwrap();

    static ref TEMPLATES: Vec<PackagingTemplate> = vec![
        PackagingTemplate::new(r"full\s*color|caja|box", "Caja full color", "/templates/caja-fullcolor.ai"),
        PackagingTemplate::new(r"cintillo|fajilla|strip", "Cintillo/Fajilla", "/templates/cintillo.ai"),
        PackagingTemplate::new(r"clamshell|blister", "Blister/Clamshell", "/templates/clamshell.ai"),
        PackagingTemplate::new(r"carrete|reel", "Carrete", "/templates/carrete.ai"),
    ];
}

/// 面の識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceKey {
    Frente,
    Cara2,
    Cara3,
    Cara4,
    Tapa,
    Base,
}

impl FaceKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaceKey::Frente => "frente",
            FaceKey::Cara2 => "cara2",
            FaceKey::Cara3 => "cara3",
            FaceKey::Cara4 => "cara4",
            FaceKey::Tapa => "tapa",
            FaceKey::Base => "base",
        }
    }
}

/// 面ごとの期待テキスト
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceLayout {
    pub frente: Vec<String>,
    pub cara2: Vec<String>,
    pub cara3: Vec<String>,
    pub cara4: Vec<String>,
    pub tapa: Vec<String>,
    pub base: Vec<String>,
}

impl FaceLayout {
    pub fn face_mut(&mut self, key: FaceKey) -> &mut Vec<String> {
        match key {
            FaceKey::Frente => &mut self.frente,
            FaceKey::Cara2 => &mut self.cara2,
            FaceKey::Cara3 => &mut self.cara3,
            FaceKey::Cara4 => &mut self.cara4,
            FaceKey::Tapa => &mut self.tapa,
            FaceKey::Base => &mut self.base,
        }
    }

    /// 面を決まった順で列挙
    pub fn iter(&self) -> impl Iterator<Item = (FaceKey, &Vec<String>)> {
        [
            (FaceKey::Frente, &self.frente),
            (FaceKey::Cara2, &self.cara2),
            (FaceKey::Cara3, &self.cara3),
            (FaceKey::Cara4, &self.cara4),
            (FaceKey::Tapa, &self.tapa),
            (FaceKey::Base, &self.base),
        ]
        .into_iter()
    }

    fn dedupe_faces(&mut self) {
        for key in [
            FaceKey::Frente,
            FaceKey::Cara2,
            FaceKey::Cara3,
            FaceKey::Cara4,
            FaceKey::Tapa,
            FaceKey::Base,
        ] {
            let face = self.face_mut(key);
            let mut seen = HashSet::new();
            let cleaned: Vec<String> = face
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty() && seen.insert(t.clone()))
                .collect();
            *face = cleaned;
        }
    }
}

/// 列名から面を推定する
pub fn guess_face_key(header: &str) -> Option<FaceKey> {
    let h = header.to_lowercase();
    if FRONT_RE.is_match(&h) {
        Some(FaceKey::Frente)
    } else if SIDE_RE.is_match(&h) {
        Some(FaceKey::Cara2)
    } else if THIRD_RE.is_match(&h) {
        Some(FaceKey::Cara3)
    } else if BACK_RE.is_match(&h) {
        Some(FaceKey::Cara4)
    } else if TOP_RE.is_match(&h) {
        Some(FaceKey::Tapa)
    } else if BOTTOM_RE.is_match(&h) {
        Some(FaceKey::Base)
    } else {
        None
    }
}

/// マスタの技術情報を箇条書きにする
pub fn tech_bullets(ctx: &MasterContext) -> Vec<String> {
    let mut bullets = Vec::new();

    let mut pieces = Vec::new();
    if !ctx.bulb_count.is_empty() {
        pieces.push(format!("{} luces", ctx.bulb_count));
    }
    if !ctx.bulb_tech.is_empty() {
        pieces.push(ctx.bulb_tech.to_uppercase());
    }
    if !pieces.is_empty() {
        bullets.push(pieces.join(" • "));
    }

    let labeled = [
        ("Color de luz", &ctx.bulb_color),
        ("Cable", &ctx.wire_color),
        ("Alimentación", &ctx.power_supply),
        ("Conector", &ctx.end_connector),
        ("Funciones", &ctx.functions),
        ("Claims destacados", &ctx.claims),
        ("Incluye", &ctx.accessories),
    ];
    for (label, value) in labeled {
        if !value.is_empty() {
            bullets.push(format!("{}: {}", label, value));
        }
    }

    bullets
}

/// デザイン情報行とコンテキストから面ごとのテキストを組み立てる
pub fn build_faces(design_row: Option<&RawRow>, ctx: &MasterContext) -> FaceLayout {
    let mut faces = FaceLayout::default();

    if let Some(row) = design_row {
        for (header, value) in row {
            if let Some(key) = guess_face_key(header) {
                faces.face_mut(key).extend(split_cell_text(&cell_text(value)));
            }
        }
    }

    let tech = tech_bullets(ctx);
    if !tech.is_empty() {
        let front_tech: Vec<String> = tech.iter().take(2).cloned().collect();
        faces.frente.splice(0..0, front_tech);
        faces.cara2.extend(tech.iter().cloned());
        faces.cara3.extend(tech.iter().take(3).cloned());
        faces.cara4.extend(tech.iter().skip(tech.len().saturating_sub(3)).cloned());
    }

    if !ctx.description.is_empty() {
        faces.frente.insert(0, ctx.description.clone());
    }
    if !ctx.brand.is_empty() {
        faces.tapa.insert(0, format!("Marca: {}", ctx.brand));
    }
    if !ctx.model.is_empty() {
        faces.tapa.push(format!("Modelo: {}", ctx.model));
    }
    if !ctx.origin.is_empty() {
        faces.base.push(format!("Origen: {}", ctx.origin));
    }
    if !ctx.vendor.is_empty() {
        faces.base.push(format!("Proveedor: {}", ctx.vendor));
    }

    faces.dedupe_faces();
    faces
}

/// 面ごと（先頭3件）と製品属性の確認項目
pub fn build_checklist(faces: &FaceLayout, ctx: &MasterContext) -> Vec<String> {
    let mut list: Vec<String> = faces
        .iter()
        .map(|(key, texts)| {
            let head: Vec<&str> = texts.iter().take(3).map(String::as_str).collect();
            let body = if head.is_empty() {
                "Sin definir".to_string()
            } else {
                head.join(" | ")
            };
            format!("{}: {}", key.as_str(), body)
        })
        .collect();

    if !ctx.bulb_count.is_empty() {
        list.push(format!(
            "Confirma número de luces ({}) visible en frente y laterales.",
            ctx.bulb_count
        ));
    }
    if !ctx.bulb_color.is_empty() {
        list.push(format!("Verifica color de luz ({}).", ctx.bulb_color));
    }
    if !ctx.wire_color.is_empty() {
        list.push(format!("Color de cable ({}) indicado en algún lateral.", ctx.wire_color));
    }
    if !ctx.power_supply.is_empty() {
        list.push(format!(
            "Datos eléctricos / alimentación ({}) en cara informativa.",
            ctx.power_supply
        ));
    }
    list.push("Cara base debe incluir UPC y bloque NOM/advertencias.".to_string());
    list
}

/// 製品の一文要約
pub fn build_summary(ctx: &MasterContext) -> String {
    let mut parts = Vec::new();
    if !ctx.description.is_empty() {
        parts.push(ctx.description.clone());
    }

    let mut tech = Vec::new();
    if !ctx.bulb_count.is_empty() {
        tech.push(format!("{} luces", ctx.bulb_count));
    }
    if !ctx.bulb_tech.is_empty() {
        tech.push(ctx.bulb_tech.to_uppercase());
    }
    if !ctx.bulb_color.is_empty() {
        tech.push(format!("color {}", ctx.bulb_color));
    }
    if !ctx.wire_color.is_empty() {
        tech.push(format!("cable {}", ctx.wire_color));
    }
    if !tech.is_empty() {
        parts.push(tech.join(", "));
    }

    if !ctx.functions.is_empty() {
        parts.push(format!("Funciones: {}", ctx.functions));
    }
    if !ctx.accessories.is_empty() {
        parts.push(format!("Incluye: {}", ctx.accessories));
    }
    parts.join(". ")
}

/// パッケージのテンプレート
#[derive(Debug, Clone)]
pub struct PackagingTemplate {
    pattern: Regex,
    pub name: &'static str,
    pub file: &'static str,
}

impl PackagingTemplate {
    fn new(pattern: &str, name: &'static str, file: &'static str) -> Self {
        Self {
            pattern: Regex::new(pattern).unwrap(),
            name,
            file,
        }
    }

    pub fn matches(&self, packaging: &str) -> bool {
        self.pattern.is_match(packaging)
    }
}

/// パッケージ提案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagingSuggestion {
    #[serde(rename = "type")]
    pub kind: String,
    pub faces: u32,
    pub template_file: String,
    pub notes: Vec<String>,
}

/// 包装形態からテンプレート・面数・注意書きを提案する
pub fn suggest_packaging(ctx: &MasterContext, design_row: Option<&RawRow>) -> PackagingSuggestion {
    let packaging = if ctx.packaging.is_empty() {
        design_row
            .map(|r| first_row_text(r, &["Empaque"]))
            .unwrap_or_default()
    } else {
        ctx.packaging.clone()
    }
    .to_lowercase();

    let face_count = design_row
        .map(|r| first_row_text(r, &["No. Caras"]))
        .and_then(|v| parse_number_like(&v))
        .filter(|n| *n > 0.0);

    let template = TEMPLATES
        .iter()
        .find(|t| t.matches(&packaging))
        .unwrap_or(&TEMPLATES[0]);

    let mut notes = Vec::new();
    if let Some(n) = face_count {
        notes.push(format!("Plantilla pensada para {} caras.", format_number(n)));
    }
    if !ctx.upc.is_empty() {
        notes.push(format!("Ubicar UPC ({}) en base o lateral según dieline.", ctx.upc));
    }
    if !ctx.description.is_empty() {
        notes.push(format!("Usar descripción: {}", ctx.description));
    }

    PackagingSuggestion {
        kind: template.name.to_string(),
        faces: face_count.map(|n| n as u32).unwrap_or(DEFAULT_FACE_COUNT),
        template_file: template.file.to_string(),
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> MasterContext {
        MasterContext {
            model: "X01".to_string(),
            description: "Serie 100 luces".to_string(),
            bulb_count: "100".to_string(),
            bulb_tech: "led".to_string(),
            bulb_color: "blanco".to_string(),
            wire_color: "verde".to_string(),
            brand: "Navi".to_string(),
            origin: "China".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_guess_face_key() {
        assert_eq!(guess_face_key("Frente"), Some(FaceKey::Frente));
        assert_eq!(guess_face_key("Cara 1"), Some(FaceKey::Frente));
        assert_eq!(guess_face_key("Lateral izq"), Some(FaceKey::Cara2));
        assert_eq!(guess_face_key("cara3"), Some(FaceKey::Cara3));
        assert_eq!(guess_face_key("Reverso"), Some(FaceKey::Cara4));
        assert_eq!(guess_face_key("Tapa"), Some(FaceKey::Tapa));
        assert_eq!(guess_face_key("Bottom"), Some(FaceKey::Base));
        assert_eq!(guess_face_key("Categoria"), None);
    }

    #[test]
    fn test_tech_bullets() {
        let bullets = tech_bullets(&ctx());
        assert_eq!(
            bullets,
            vec!["100 luces • LED", "Color de luz: blanco", "Cable: verde"]
        );
        assert!(tech_bullets(&MasterContext::default()).is_empty());
    }

    #[test]
    fn test_build_faces() {
        let row: RawRow = serde_json::from_value(json!({
            "Categoria": "Serie",
            "Frente": "Logo marca; Foto producto",
            "Base": "UPC, NOM"
        }))
        .unwrap();
        let faces = build_faces(Some(&row), &ctx());

        assert_eq!(
            faces.frente,
            vec![
                "Serie 100 luces",
                "100 luces • LED",
                "Color de luz: blanco",
                "Logo marca",
                "Foto producto"
            ]
        );
        assert_eq!(faces.cara2.len(), 3);
        assert_eq!(faces.tapa, vec!["Marca: Navi", "Modelo: X01"]);
        assert_eq!(faces.base, vec!["UPC", "NOM", "Origen: China"]);
    }

    #[test]
    fn test_build_faces_dedupes_per_face() {
        let row: RawRow = serde_json::from_value(json!({
            "Frente": "Serie 100 luces",
        }))
        .unwrap();
        let faces = build_faces(Some(&row), &ctx());
        let count = faces.frente.iter().filter(|t| *t == "Serie 100 luces").count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_build_checklist() {
        let faces = build_faces(None, &MasterContext::default());
        let list = build_checklist(&faces, &MasterContext::default());
        assert_eq!(list.len(), 7);
        assert_eq!(list[0], "frente: Sin definir");
        assert_eq!(list[6], "Cara base debe incluir UPC y bloque NOM/advertencias.");
    }

    #[test]
    fn test_build_summary() {
        assert_eq!(
            build_summary(&ctx()),
            "Serie 100 luces. 100 luces, LED, color blanco, cable verde"
        );
        assert_eq!(build_summary(&MasterContext::default()), "");
    }

    #[test]
    fn test_suggest_packaging() {
        let mut c = ctx();
        c.packaging = "Blister PET".to_string();
        let row: RawRow = serde_json::from_value(json!({"No. Caras": "4"})).unwrap();
        let s = suggest_packaging(&c, Some(&row));

        assert_eq!(s.kind, "Blister/Clamshell");
        assert_eq!(s.template_file, "/templates/clamshell.ai");
        assert_eq!(s.faces, 4);
        assert_eq!(s.notes[0], "Plantilla pensada para 4 caras.");
    }

    #[test]
    fn test_suggest_packaging_defaults() {
        let s = suggest_packaging(&MasterContext::default(), None);
        assert_eq!(s.kind, "Caja full color");
        assert_eq!(s.faces, DEFAULT_FACE_COUNT);
        assert!(s.notes.is_empty());
    }

    #[test]
    fn test_suggest_packaging_from_design_row() {
        let row: RawRow = serde_json::from_value(json!({"Empaque": "Carrete"})).unwrap();
        let s = suggest_packaging(&MasterContext::default(), Some(&row));
        assert_eq!(s.kind, "Carrete");
    }
}
