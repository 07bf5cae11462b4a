//! AI/OCR出力の正規化
//!
//! 外部のAI/OCRが返すJSONは形が安定しないため、ここで一度だけ解釈する。
//! どんな入力でも失敗せず、欠けた項目は空になる。

use crate::types::cell_text;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// 正規化座標のボックス `[ymin, xmin, ymax, xmax]`（0〜1000）
pub type BoundingBox = [f64; 4];

fn parse_box(value: Option<&Value>) -> Option<BoundingBox> {
    let items = value?.as_array()?;
    if items.len() != 4 {
        return None;
    }
    let mut out = [0.0; 4];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = item.as_f64()?;
    }
    Some(out)
}

/// 製品フィールド1件（値とボックス）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectedValue {
    pub value: String,
    #[serde(rename = "box", skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

impl DetectedValue {
    /// 素の値、または `{value, box}` を解釈
    fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Object(map)) => Self {
                value: map.get("value").map(cell_text).unwrap_or_default(),
                bounding_box: parse_box(map.get("box")),
            },
            Some(other) => Self {
                value: cell_text(other),
                bounding_box: None,
            },
            None => Self::default(),
        }
    }

    fn or_fallback(self, fallbacks: &[Option<&Value>]) -> Self {
        if !self.value.is_empty() {
            return self;
        }
        let value = fallbacks
            .iter()
            .flatten()
            .map(|v| cell_text(v))
            .find(|v| !v.is_empty())
            .unwrap_or_default();
        Self {
            value,
            bounding_box: self.bounding_box,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }
}

/// AIが抽出した製品情報
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectedProduct {
    pub item_description: DetectedValue,
    pub bulbs_count: DetectedValue,
    pub light_color: DetectedValue,
    pub wire_color: DetectedValue,
    pub power_supply: DetectedValue,
    pub upc: DetectedValue,
}

/// AIが読み取った面1つ分のテキスト
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectedFace {
    pub texts: Vec<String>,
    #[serde(rename = "box", skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

impl DetectedFace {
    /// 配列・改行区切り文字列・`{texts, box}` を解釈
    fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Array(items)) => Self {
                texts: items.iter().map(cell_text).collect(),
                bounding_box: None,
            },
            Some(Value::String(s)) => Self {
                texts: s
                    .split('\n')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect(),
                bounding_box: None,
            },
            Some(Value::Object(map)) => Self {
                texts: map
                    .get("texts")
                    .and_then(Value::as_array)
                    .map(|items| items.iter().map(cell_text).collect())
                    .unwrap_or_default(),
                bounding_box: parse_box(map.get("box")),
            },
            _ => Self::default(),
        }
    }
}

/// 面ごとの読み取り結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectedFaces {
    pub frente: DetectedFace,
    pub cara2: DetectedFace,
    pub cara3: DetectedFace,
    pub cara4: DetectedFace,
    pub tapa: DetectedFace,
    pub base: DetectedFace,
}

/// 正規化済みのAI/OCR出力
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OcrOutput {
    pub raw_text: String,
    pub product: DetectedProduct,
    pub faces: DetectedFaces,
    pub claims: Vec<String>,
    /// AIの全体検証（無ければ validation/contentValidation から導出）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_validation: Option<Value>,
    /// OCR側のエラー
    pub error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// 最初に見つかった空でない値（null・空文字・偽値はスキップ）
fn first_present<'a>(candidates: &[Option<&'a Value>]) -> Option<&'a Value> {
    candidates.iter().flatten().copied().find(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Bool(b) => *b,
        _ => true,
    })
}

fn found_text_list(value: Option<&Value>) -> Value {
    match value {
        Some(Value::Array(items)) => Value::Array(items.clone()),
        Some(Value::Null) | None => json!([]),
        Some(other) if cell_text(other).is_empty() => json!([]),
        Some(other) => json!([other]),
    }
}

/// `validation.details[]`（構造）と `contentValidation.details{}`（内容）から全体検証を組み立てる
fn derive_global_validation(root: &Map<String, Value>) -> Option<Value> {
    let mut requirements = Vec::new();

    if let Some(details) = root
        .get("validation")
        .and_then(|v| v.get("details"))
        .and_then(Value::as_array)
    {
        for d in details {
            let text = d.get("requirement").map(cell_text).unwrap_or_default();
            if text.is_empty() {
                continue;
            }
            requirements.push(json!({
                "requirement": text,
                "type": d.get("type").and_then(Value::as_str).unwrap_or("TEXT"),
                "status": d.get("status").and_then(Value::as_str).unwrap_or("MISSING"),
                "foundText": found_text_list(d.get("foundText")),
                "source": "structure",
            }));
        }
    }

    if let Some(details) = root
        .get("contentValidation")
        .and_then(|v| v.get("details"))
        .and_then(Value::as_object)
    {
        for (key, v) in details {
            if v.is_null() {
                continue;
            }
            let default_type = if key.to_lowercase().contains("diagrama") {
                "VISUAL"
            } else {
                "TEXT"
            };
            requirements.push(json!({
                "requirement": key,
                "type": v.get("type").and_then(Value::as_str).unwrap_or(default_type),
                "status": v.get("status").and_then(Value::as_str).unwrap_or("MISSING"),
                "foundText": found_text_list(v.get("foundText")),
                "source": "content",
            }));
        }
    }

    if requirements.is_empty() {
        None
    } else {
        Some(json!({ "requirements": requirements }))
    }
}

impl OcrOutput {
    /// 任意のJSONから正規化する（失敗しない）
    pub fn from_value(raw: &Value) -> Self {
        let empty = Map::new();
        let root = raw.as_object().unwrap_or(&empty);
        let product = root.get("product").and_then(Value::as_object).unwrap_or(&empty);
        let faces = root.get("faces").and_then(Value::as_object).unwrap_or(&empty);

        let field = |key: &str| DetectedValue::from_value(product.get(key));

        let detected_product = DetectedProduct {
            item_description: field("itemDescription").or_fallback(&[root.get("productName")]),
            bulbs_count: field("bulbsCount").or_fallback(&[product.get("bulbCount"), root.get("bulbCount")]),
            light_color: field("lightColor").or_fallback(&[product.get("bulbColor"), root.get("bulbColor")]),
            wire_color: field("wireColor").or_fallback(&[root.get("wireColor")]),
            power_supply: field("powerSupply").or_fallback(&[root.get("powerSupply")]),
            upc: field("upc").or_fallback(&[root.get("upc")]),
        };

        let face = |keys: &[Option<&Value>]| DetectedFace::from_value(first_present(keys));
        let detected_faces = DetectedFaces {
            frente: face(&[faces.get("frente"), root.get("front")]),
            cara2: face(&[faces.get("cara2"), faces.get("lateral1"), root.get("side1")]),
            cara3: face(&[faces.get("cara3"), faces.get("lateral2"), root.get("side2")]),
            cara4: face(&[faces.get("cara4"), faces.get("back"), root.get("back")]),
            tapa: face(&[faces.get("tapa"), faces.get("top"), root.get("top")]),
            base: face(&[faces.get("base"), faces.get("bottom"), root.get("bottom")]),
        };

        let claims = root
            .get("claims")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|c| match c {
                        Value::Object(map) => map.get("text").map(cell_text).unwrap_or_default(),
                        other => cell_text(other),
                    })
                    .filter(|c| !c.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let raw_text = first_present(&[root.get("rawText"), root.get("ocrText"), root.get("text")])
            .map(cell_text)
            .unwrap_or_default();

        let global_validation = first_present(&[root.get("globalValidation")])
            .filter(|v| v.is_object())
            .cloned()
            .or_else(|| derive_global_validation(root));

        let error = root.get("error").map(is_truthy).unwrap_or(false);
        let message = root
            .get("message")
            .map(cell_text)
            .filter(|m| !m.is_empty());

        Self {
            raw_text,
            product: detected_product,
            faces: detected_faces,
            claims,
            global_validation,
            error,
            message,
        }
    }

    /// OCRエラーの内容（エラーでなければNone）
    pub fn error_message(&self) -> Option<String> {
        if !self.error {
            return None;
        }
        Some(self.message.clone().unwrap_or_else(|| "OCR_ERROR".to_string()))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_plain_and_boxed_values() {
        let raw = json!({
            "product": {
                "itemDescription": {"value": "Serie LED", "box": [10, 20, 30, 40]},
                "bulbsCount": 100,
                "wireColor": "verde"
            },
            "rawText": "Serie LED\n100 luces"
        });
        let ocr = OcrOutput::from_value(&raw);

        assert_eq!(ocr.product.item_description.value, "Serie LED");
        assert_eq!(ocr.product.item_description.bounding_box, Some([10.0, 20.0, 30.0, 40.0]));
        assert_eq!(ocr.product.bulbs_count.value, "100");
        assert_eq!(ocr.product.wire_color.value, "verde");
        assert_eq!(ocr.raw_text, "Serie LED\n100 luces");
        assert!(!ocr.error);
    }

    #[test]
    fn test_product_aliases_and_root_fallbacks() {
        let raw = json!({
            "product": {"bulbCount": "50", "bulbColor": "blanco"},
            "productName": "Cortina",
            "upc": "750123456789",
            "text": "texto"
        });
        let ocr = OcrOutput::from_value(&raw);

        assert_eq!(ocr.product.bulbs_count.value, "50");
        assert_eq!(ocr.product.light_color.value, "blanco");
        assert_eq!(ocr.product.item_description.value, "Cortina");
        assert_eq!(ocr.product.upc.value, "750123456789");
        assert_eq!(ocr.raw_text, "texto");
    }

    #[test]
    fn test_faces_shapes() {
        let raw = json!({
            "faces": {
                "frente": ["Logo", "Serie"],
                "lateral1": "uno\n\n dos ",
                "tapa": {"texts": ["Marca"], "box": [0, 0, 1, 1]}
            },
            "back": ["Reverso"]
        });
        let ocr = OcrOutput::from_value(&raw);

        assert_eq!(ocr.faces.frente.texts, vec!["Logo", "Serie"]);
        assert_eq!(ocr.faces.cara2.texts, vec!["uno", "dos"]);
        assert_eq!(ocr.faces.cara4.texts, vec!["Reverso"]);
        assert_eq!(ocr.faces.tapa.bounding_box, Some([0.0, 0.0, 1.0, 1.0]));
        assert!(ocr.faces.base.texts.is_empty());
    }

    #[test]
    fn test_claims_strings_and_objects() {
        let raw = json!({"claims": ["Ahorra energía", {"text": "Uso interior", "box": [1, 2, 3, 4]}, {"box": []}]});
        let ocr = OcrOutput::from_value(&raw);
        assert_eq!(ocr.claims, vec!["Ahorra energía", "Uso interior"]);
    }

    #[test]
    fn test_global_validation_passthrough() {
        let raw = json!({"globalValidation": {"requirements": [{"requirement": "UPC", "status": "OK"}]}});
        let ocr = OcrOutput::from_value(&raw);
        assert_eq!(
            ocr.global_validation.unwrap()["requirements"][0]["requirement"],
            json!("UPC")
        );
    }

    #[test]
    fn test_global_validation_derived() {
        let raw = json!({
            "validation": {"details": [
                {"requirement": "Logo marca", "status": "OK", "foundText": "Navi"},
                {"status": "OK"}
            ]},
            "contentValidation": {"details": {
                "Diagrama de conexión": {"status": "OK"},
                "Hecho en China": {"foundText": ["Hecho en China"]},
                "Ignorado": null
            }}
        });
        let ocr = OcrOutput::from_value(&raw);
        let gv = ocr.global_validation.unwrap();
        let reqs = gv["requirements"].as_array().unwrap();

        assert_eq!(reqs.len(), 3);
        assert_eq!(reqs[0]["foundText"], json!(["Navi"]));
        assert_eq!(reqs[0]["source"], json!("structure"));
        assert_eq!(reqs[1]["type"], json!("VISUAL"));
        assert_eq!(reqs[2]["status"], json!("MISSING"));
    }

    #[test]
    fn test_error_payload() {
        let ocr = OcrOutput::from_value(&json!({"error": true, "message": "timeout"}));
        assert_eq!(ocr.error_message().as_deref(), Some("timeout"));

        let ocr = OcrOutput::from_value(&json!({"error": true}));
        assert_eq!(ocr.error_message().as_deref(), Some("OCR_ERROR"));
    }

    #[test]
    fn test_garbage_input() {
        let ocr = OcrOutput::from_value(&json!("not an object"));
        assert_eq!(ocr, OcrOutput::default());
        let ocr = OcrOutput::from_value(&json!({"product": 5, "faces": [], "claims": "x"}));
        assert!(ocr.claims.is_empty());
        assert!(ocr.product.upc.is_empty());
    }
}
