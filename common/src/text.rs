//! テキスト正規化と数値・UPC抽出
//!
//! OCRテキストと期待テキストを比較可能な形に揃える。
//! スペイン語・英語の包装テキストを前提とする。

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static::lazy_static! {
    static ref NON_ALNUM_RE: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
    static ref NUMBER_RE: Regex = Regex::new(r"\d{1,4}").unwrap();
    static ref UPC_RE: Regex = Regex::new(r"\d{11,14}").unwrap();
}

fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}

/// 小文字化してアクセント記号を除去（句読点は残す）
pub fn fold_accents(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// 比較用に正規化
///
/// 小文字化 → NFD分解 → 結合文字除去 → 英数字以外を空白に → trim
pub fn normalize_text(text: &str) -> String {
    let folded = fold_accents(text);
    NON_ALNUM_RE.replace_all(&folded, " ").trim().to_string()
}

/// 正規化してトークンに分割
pub fn tokenize(text: &str) -> Vec<String> {
    normalize_text(text)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// 最初の1〜4桁の数字を取得（0は数値なしとみなす）
pub fn extract_number(text: &str) -> Option<u32> {
    NUMBER_RE
        .find(text)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|n| *n != 0)
}

/// 11〜14桁の数字列（UPC候補）を抽出
pub fn find_upc_candidates(text: &str) -> Vec<String> {
    UPC_RE.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// UPC選択の結果
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct UpcMatch {
    pub value: String,
    pub source: &'static str,
}

/// 期待UPC・OCR UPC・テキストから最もそれらしいUPCを選ぶ
///
/// 優先順位:
/// 1. 期待UPCの先頭4文字で始まる候補
/// 2. 12桁以上の候補
/// 3. 最初の候補
///
/// # Arguments
/// * `expected_upc` - マスタ上のUPC
/// * `ocr_upc` - AIが抽出したUPC
/// * `text_pool` - OCR全文
pub fn best_upc(expected_upc: &str, ocr_upc: &str, text_pool: &str) -> UpcMatch {
    let expected_upc = expected_upc.trim();
    let ocr_upc = ocr_upc.trim();

    let all_text = [ocr_upc, text_pool]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

    let mut candidates: Vec<String> = Vec::new();
    if !ocr_upc.is_empty() {
        candidates.push(ocr_upc.to_string());
    }
    candidates.extend(find_upc_candidates(&all_text));
    if !expected_upc.is_empty() {
        candidates.push(expected_upc.to_string());
    }

    let mut unique: Vec<String> = Vec::new();
    for c in candidates {
        if !unique.contains(&c) {
            unique.push(c);
        }
    }

    if unique.is_empty() {
        return UpcMatch {
            value: String::new(),
            source: "none",
        };
    }

    let prefix: String = expected_upc.chars().take(4).collect();
    let best = unique
        .iter()
        .find(|c| !prefix.is_empty() && c.starts_with(&prefix))
        .or_else(|| unique.iter().find(|c| c.chars().count() >= 12))
        .unwrap_or(&unique[0]);

    UpcMatch {
        value: best.clone(),
        source: "detected",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("Lámpara  LED!"), "lampara led");
        assert_eq!(normalize_text("  Señal—Cálida "), "senal calida");
        assert_eq!(normalize_text("120V / 60Hz"), "120v 60hz");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_fold_accents_keeps_punctuation() {
        assert_eq!(fold_accents("Gráfico: Ícono"), "grafico: icono");
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("100 Luces, LED"), vec!["100", "luces", "led"]);
        assert!(tokenize("  --  ").is_empty());
    }

    #[test]
    fn test_extract_number() {
        assert_eq!(extract_number("50 luces"), Some(50));
        assert_eq!(extract_number("Serie de 100"), Some(100));
        assert_eq!(extract_number("0123456789012"), Some(123));
        assert_eq!(extract_number("sin numero"), None);
        assert_eq!(extract_number("0 luces"), None);
    }

    #[test]
    fn test_find_upc_candidates() {
        let found = find_upc_candidates("UPC 012345678901 y 98765");
        assert_eq!(found, vec!["012345678901"]);
    }

    #[test]
    fn test_best_upc_detected_in_text() {
        let result = best_upc("0123456789012", "", "see code 0123456789012 on box");
        assert_eq!(result.value, "0123456789012");
        assert_eq!(result.source, "detected");
    }

    #[test]
    fn test_best_upc_prefers_expected_prefix() {
        let result = best_upc("7501234567890", "", "lote 99999999999 codigo 7501234567891");
        assert_eq!(result.value, "7501234567891");
    }

    #[test]
    fn test_best_upc_prefers_long_candidate() {
        let result = best_upc("", "", "11111111111 222222222222");
        assert_eq!(result.value, "222222222222");
    }

    #[test]
    fn test_best_upc_none() {
        let result = best_upc("", "", "no code here");
        assert_eq!(result.value, "");
        assert_eq!(result.source, "none");
    }

    #[test]
    fn test_best_upc_ocr_value_first() {
        let result = best_upc("", "12345", "");
        assert_eq!(result.value, "12345");
    }
}
