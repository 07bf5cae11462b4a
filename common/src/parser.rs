//! AIレスポンスパーサー
//!
//! AI/OCRの応答テキストからJSON部分を抽出し、OcrOutputに正規化する

use crate::error::{Error, Result};
use crate::ocr::OcrOutput;

/// AIレスポンスからJSON部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 生の {...} オブジェクト
/// 3. エラー
///
/// # Arguments
/// * `response` - AIレスポンス文字列
///
/// # Returns
/// * `Ok(&str)` - 抽出されたJSON文字列
/// * `Err` - JSONが見つからない場合
///
/// # Examples
/// ```
/// use packaging_qa_common::extract_json;
///
/// let response = "結果: {\"rawText\": \"Serie LED\"}";
/// let json = extract_json(response).unwrap();
/// assert!(json.starts_with('{'));
/// ```
pub fn extract_json(response: &str) -> Result<&str> {
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7;
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if end >= start {
                return Ok(&response[start..=end]);
            }
        }
    }

    Err(Error::Parse("JSONが見つかりません".into()))
}

/// AIレスポンスをパースして正規化する
///
/// # Arguments
/// * `response` - AI/OCRの応答（JSONそのもの、または説明文付き）
///
/// # Returns
/// * `Ok(OcrOutput)` - 正規化済みの出力
/// * `Err` - JSONが見つからないかパース失敗
pub fn parse_ai_response(response: &str) -> Result<OcrOutput> {
    let json_str = extract_json(response)?;
    let value: serde_json::Value = serde_json::from_str(json_str.trim())
        .map_err(|e| Error::Parse(format!("AI応答 JSONパースエラー: {}", e)))?;
    Ok(OcrOutput::from_value(&value))
}

#[cfg(test)]
mod tests {
    use super::*;

    // =============================================
    // extract_json テスト
    // =============================================

    #[test]
    fn test_extract_json_with_block() {
        let response = r#"Resultado del análisis:
```json
{"rawText": "Serie LED", "claims": []}
```
Fin."#;
        let json = extract_json(response).unwrap();
        assert!(json.starts_with('{'));
        assert!(json.contains("Serie LED"));
    }

    #[test]
    fn test_extract_json_raw_object() {
        let response = "  {\"product\": {\"upc\": \"0123\"}}  ";
        assert_eq!(extract_json(response).unwrap(), "{\"product\": {\"upc\": \"0123\"}}");
    }

    #[test]
    fn test_extract_json_not_found() {
        let err = extract_json("sin json").unwrap_err();
        assert_eq!(err.code(), "PARSE");
    }

    // =============================================
    // parse_ai_response テスト
    // =============================================

    #[test]
    fn test_parse_ai_response() {
        let response = r#"```json
{"product": {"itemDescription": {"value": "Serie"}}, "ocrText": "Serie\nUPC"}
```"#;
        let ocr = parse_ai_response(response).unwrap();
        assert_eq!(ocr.product.item_description.value, "Serie");
        assert_eq!(ocr.raw_text, "Serie\nUPC");
    }

    #[test]
    fn test_parse_ai_response_invalid_json() {
        let err = parse_ai_response("{not json}").unwrap_err();
        assert!(err.to_string().contains("AI応答"));
    }
}
