//! デザイン検証レポート
//!
//! 期待内容（ExpectedBundle）とAI/OCR出力を突き合わせ、
//! 主要フィールド・全体要件・クレーム・パッケージ整合性をまとめる。

use crate::expected::ExpectedBundle;
use crate::faces::PackagingSuggestion;
use crate::ocr::{BoundingBox, DetectedValue, OcrOutput};
use crate::scorer::{summarize_status, FieldComparison, FieldStatus, FieldsSummary, TextMatcher, PARTIAL_THRESHOLD};
use crate::text::best_upc;
use crate::types::{Requirement, RequirementStatus};
use crate::validation::{normalize_with, GlobalValidation, OverallStatus};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// 検出クレームが期待クレームに一致したとみなす類似度
pub const CLAIM_MATCH_THRESHOLD: f64 = 0.6;

const EXTERNALLY_VALIDATED: &str = "Validado externamente";

lazy_static::lazy_static! {
    static ref CLAIM_SPLIT_RE: Regex = Regex::new(r"[,;|]").unwrap();
}

/// レポートの総合判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Approved,
    Rejected,
    Warning,
    OcrError,
    Error,
}

impl From<OverallStatus> for Verdict {
    fn from(status: OverallStatus) -> Self {
        match status {
            OverallStatus::Approved => Verdict::Approved,
            OverallStatus::Rejected => Verdict::Rejected,
            OverallStatus::Warning => Verdict::Warning,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Approved => write!(f, "APPROVED"),
            Verdict::Rejected => write!(f, "REJECTED"),
            Verdict::Warning => write!(f, "WARNING"),
            Verdict::OcrError => write!(f, "OCR_ERROR"),
            Verdict::Error => write!(f, "ERROR"),
        }
    }
}

/// 検証の方針
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationPolicy {
    /// このキーワードを含む要件は外部で検証済みとしてOKにする
    pub externally_validated: Vec<String>,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            externally_validated: vec!["Año".to_string(), "Year".to_string()],
        }
    }
}

impl ValidationPolicy {
    pub fn is_externally_validated(&self, requirement: &str) -> bool {
        self.externally_validated
            .iter()
            .any(|k| !k.is_empty() && requirement.contains(k.as_str()))
    }
}

/// 主要フィールド1件の結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldResult {
    pub name: String,
    pub status: FieldStatus,
    pub expected: String,
    pub found: String,
    pub detail: String,
}

impl FieldResult {
    fn new(name: &str, cmp: FieldComparison) -> Self {
        Self {
            name: name.to_string(),
            status: cmp.estado,
            expected: cmp.esperado,
            found: cmp.detectado,
            detail: cmp.detalle,
        }
    }
}

/// 不一致フィールドのボックス（アートワーク上の強調表示用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldHighlight {
    pub label: String,
    #[serde(rename = "box")]
    pub bounding_box: BoundingBox,
}

/// 全体要件のまとめ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSummary {
    pub status: String,
    pub missing: Vec<String>,
    pub found: Vec<String>,
    pub visual_check: Vec<String>,
    pub notes: Vec<String>,
}

/// クレームの照合結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimsAnalysis {
    pub detectados: Vec<String>,
    pub esperados: Vec<String>,
    pub faltantes: Vec<String>,
    pub extra: Vec<String>,
}

/// OCRの補足情報
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrInfo {
    pub upc: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// パッケージ整合性の所見
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagingCoherence {
    pub tamano_empaque: String,
    pub disposicion_caras: String,
    pub estilo_grafico: String,
    pub comentarios: Vec<String>,
}

/// 1デザイン分の検証レポート
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub model_key: String,
    pub overall: Verdict,
    pub summary: String,
    pub fields: Vec<FieldResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields_status: Option<FieldsSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_validation: Option<GlobalValidation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_summary: Option<GlobalSummary>,
    pub claims: ClaimsAnalysis,
    pub ocr_info: OcrInfo,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<FieldHighlight>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packaging_suggestion: Option<PackagingSuggestion>,
    #[serde(default)]
    pub expected_requirements: Vec<Requirement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coherencia_general: Option<PackagingCoherence>,
}

impl ValidationReport {
    /// OCRが失敗したときのレポート
    pub fn ocr_error(model_key: &str, message: &str) -> Self {
        Self {
            model_key: model_key.to_string(),
            overall: Verdict::OcrError,
            summary: message.to_string(),
            fields: Vec::new(),
            fields_status: None,
            global_validation: None,
            global_summary: None,
            claims: ClaimsAnalysis::default(),
            ocr_info: OcrInfo {
                errors: vec![message.to_string()],
                ..Default::default()
            },
            highlights: Vec::new(),
            packaging_suggestion: None,
            expected_requirements: Vec::new(),
            coherencia_general: None,
        }
    }
}

/// 外部検証済みの要件をOKにして missing と総合判定を再計算する
pub fn apply_external_overrides(validation: &mut GlobalValidation, policy: &ValidationPolicy) {
    for req in validation.requirements.iter_mut() {
        if policy.is_externally_validated(&req.requirement) {
            req.status = Some(RequirementStatus::Ok);
            req.found_text = Some(vec![EXTERNALLY_VALIDATED.to_string()]);
        }
    }
    validation.recompute();
}

/// 全体要件を PASS/FAIL と一覧にまとめる
pub fn summarize_global(validation: &GlobalValidation) -> GlobalSummary {
    let found = validation
        .requirements
        .iter()
        .filter(|r| !r.kind.is_visual() && r.status == Some(RequirementStatus::Ok))
        .map(|r| r.requirement.clone())
        .collect();
    let visual_check = validation
        .requirements
        .iter()
        .filter(|r| r.kind.is_visual())
        .map(|r| r.requirement.clone())
        .collect();

    GlobalSummary {
        status: if validation.is_approved() { "PASS" } else { "FAIL" }.to_string(),
        missing: validation.missing.clone(),
        found,
        visual_check,
        notes: vec![
            "Validación global (sin caras).".to_string(),
            "Coincidencia semántica y sinónimos es/en permitida.".to_string(),
            "Elementos visuales marcados como VISUAL_CHECK no fallan.".to_string(),
        ],
    }
}

/// 期待クレームと検出クレームを照合する
///
/// 期待クレームはOCR全文との類似度で、検出クレームは期待クレームとの類似度で判定する。
pub fn analyze_claims(matcher: &TextMatcher, expected_claims: &str, detected: &[String], ocr_text: &str) -> ClaimsAnalysis {
    let esperados: Vec<String> = CLAIM_SPLIT_RE
        .split(expected_claims)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();

    let faltantes = esperados
        .iter()
        .filter(|c| matcher.similarity(c, ocr_text) < PARTIAL_THRESHOLD)
        .cloned()
        .collect();

    let extra = detected
        .iter()
        .filter(|c| {
            !esperados
                .iter()
                .any(|e| matcher.similarity(e, c) >= CLAIM_MATCH_THRESHOLD)
        })
        .cloned()
        .collect();

    ClaimsAnalysis {
        detectados: detected.to_vec(),
        esperados,
        faltantes,
        extra,
    }
}

/// パッケージ提案からの整合性所見
pub fn packaging_coherence(suggestion: &PackagingSuggestion) -> PackagingCoherence {
    PackagingCoherence {
        tamano_empaque: if suggestion.kind.is_empty() {
            "No definido".to_string()
        } else {
            suggestion.kind.clone()
        },
        disposicion_caras: "Validación global (sin segmentar por caras)".to_string(),
        estilo_grafico: "Consistencia visual no evaluada automáticamente".to_string(),
        comentarios: vec![if suggestion.template_file.is_empty() {
            "Sube dieline para validación completa".to_string()
        } else {
            format!("Usar dieline: {}", suggestion.template_file)
        }],
    }
}

fn highlight(label: &str, field: &FieldResult, detected: &DetectedValue) -> Option<FieldHighlight> {
    if field.status == FieldStatus::Ok {
        return None;
    }
    detected.bounding_box.map(|b| FieldHighlight {
        label: label.to_string(),
        bounding_box: b,
    })
}

/// デザインを期待内容に照らして検証する
///
/// # Arguments
/// * `matcher` - 同義語テーブル付きの照合器
/// * `policy` - 外部検証済みキーワード
/// * `expected` - モデルの期待内容
/// * `ocr` - 正規化済みのAI/OCR出力
pub fn validate_design(
    matcher: &TextMatcher,
    policy: &ValidationPolicy,
    expected: &ExpectedBundle,
    ocr: &OcrOutput,
) -> ValidationReport {
    if let Some(message) = ocr.error_message() {
        tracing::warn!(model = %expected.model_key, %message, "OCR reported an error");
        return ValidationReport::ocr_error(&expected.model_key, &message);
    }

    let ocr_text = ocr.raw_text.as_str();
    let fields_expected = &expected.expected_fields;
    let ctx = &expected.master_context;
    let product = &ocr.product;

    let upc = best_upc(&fields_expected.upc, &product.upc.value, ocr_text);

    let mut global = normalize_with(
        matcher,
        ocr.global_validation.as_ref(),
        &expected.global_requirements,
        ocr_text,
    );
    apply_external_overrides(&mut global, policy);
    let global_summary = summarize_global(&global);

    let mut power = matcher.compare_field(
        "Alimentación",
        &fields_expected.power_supply,
        &product.power_supply.value,
        ocr_text,
    );
    power.estado = FieldStatus::Ok;
    power.detalle = EXTERNALLY_VALIDATED.to_string();

    let comparisons = [
        ("itemDescription", matcher.compare_field("Item Description", &fields_expected.item_description, &product.item_description.value, ocr_text)),
        ("upc", matcher.compare_field("UPC", &fields_expected.upc, &upc.value, ocr_text)),
        ("colorCable", matcher.compare_field("Color de cable", &fields_expected.wire_color, &product.wire_color.value, ocr_text)),
        ("colorLuz", matcher.compare_field("Color de luz", &ctx.bulb_color, &product.light_color.value, ocr_text)),
        ("numeroLuces", matcher.compare_field("Número de luces", &ctx.bulb_count, &product.bulbs_count.value, ocr_text)),
        ("alimentacion", power),
    ];

    let fields_status = summarize_status(comparisons.iter().map(|(_, c)| c));
    let fields: Vec<FieldResult> = comparisons
        .into_iter()
        .map(|(name, cmp)| FieldResult::new(name, cmp))
        .collect();

    let boxed = [
        ("Item Description", &product.item_description),
        ("UPC", &product.upc),
        ("Wire Color", &product.wire_color),
        ("Light Color", &product.light_color),
        ("Bulbs Count", &product.bulbs_count),
        ("Power Supply", &product.power_supply),
    ];
    let highlights = fields
        .iter()
        .zip(boxed)
        .filter_map(|(field, (label, detected))| highlight(label, field, detected))
        .collect();

    let mut overall = Verdict::from(global.overall_status);
    if overall == Verdict::Approved && fields_status == FieldsSummary::Fail {
        overall = Verdict::Warning;
    }

    let claims = analyze_claims(matcher, &ctx.claims, &ocr.claims, ocr_text);

    tracing::info!(
        model = %expected.model_key,
        %overall,
        missing = global.missing.len(),
        "design validated"
    );

    ValidationReport {
        model_key: expected.model_key.clone(),
        overall,
        summary: if overall == Verdict::Approved {
            "El diseño incluye la información requerida (validación global).".to_string()
        } else {
            "Revisa los campos marcados o los requerimientos faltantes.".to_string()
        },
        fields,
        fields_status: Some(fields_status),
        global_validation: Some(global),
        global_summary: Some(global_summary),
        claims,
        ocr_info: OcrInfo {
            upc: upc.value,
            description: product.item_description.value.clone(),
            errors: Vec::new(),
        },
        highlights,
        packaging_suggestion: Some(expected.packaging_suggestion.clone()),
        expected_requirements: expected.global_requirements.clone(),
        coherencia_general: Some(packaging_coherence(&expected.packaging_suggestion)),
    }
}
