//! バッチ検証結果のExcel出力
//!
//! シート「結果」: 1デザイン1行の判定一覧
//! シート「フィールド」: 主要フィールドごとの比較

use crate::engine::BatchResult;
use crate::error::Result;
use packaging_qa_common::{FieldStatus, Verdict};
use rust_xlsxwriter::*;
use std::path::Path;

const SUMMARY_HEADERS: &[(&str, f64)] = &[
    ("モデル", 14.0),
    ("判定", 12.0),
    ("ファイル", 40.0),
    ("不足要件", 60.0),
    ("メッセージ", 40.0),
];

const FIELD_HEADERS: &[(&str, f64)] = &[
    ("モデル", 14.0),
    ("フィールド", 16.0),
    ("状態", 8.0),
    ("期待値", 36.0),
    ("検出値", 36.0),
    ("詳細", 36.0),
];

fn verdict_color(verdict: Verdict) -> Color {
    match verdict {
        Verdict::Approved => Color::RGB(0xC6EFCE),
        Verdict::Warning => Color::RGB(0xFFEB9C),
        Verdict::Rejected | Verdict::OcrError | Verdict::Error => Color::RGB(0xFFC7CE),
    }
}

fn status_color(status: FieldStatus) -> Color {
    match status {
        FieldStatus::Ok => Color::RGB(0xC6EFCE),
        FieldStatus::Warn => Color::RGB(0xFFEB9C),
        FieldStatus::Diff | FieldStatus::Missing => Color::RGB(0xFFC7CE),
        FieldStatus::Skip => Color::RGB(0xEEEEEE),
    }
}

fn write_headers(sheet: &mut Worksheet, headers: &[(&str, f64)], format: &Format) -> Result<()> {
    for (col, (title, width)) in headers.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *title, format)?;
        sheet.set_column_width(col, *width)?;
    }
    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

/// バッチ結果をワークブックに組み立てる
pub fn build_batch_workbook(results: &[BatchResult]) -> Result<Workbook> {
    let mut workbook = Workbook::new();

    let header_format = Format::new()
        .set_bold()
        .set_font_size(10.0)
        .set_font_color(Color::RGB(0x333333))
        .set_background_color(Color::RGB(0xF5F5F5))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Hair)
        .set_border_color(Color::RGB(0xAAAAAA));

    let value_format = Format::new()
        .set_font_size(10.0)
        .set_align(FormatAlign::Left)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap()
        .set_border(FormatBorder::Hair)
        .set_border_color(Color::RGB(0xCCCCCC));

    let summary = workbook.add_worksheet();
    summary.set_name("結果")?;
    write_headers(summary, SUMMARY_HEADERS, &header_format)?;

    for (i, result) in results.iter().enumerate() {
        let row = (i + 1) as u32;
        let verdict_format = value_format
            .clone()
            .set_bold()
            .set_background_color(verdict_color(result.overall));
        let missing = result
            .global_validation
            .as_ref()
            .map(|g| g.missing.join("\n"))
            .unwrap_or_default();

        summary.write_string_with_format(row, 0, &result.model_key, &value_format)?;
        summary.write_string_with_format(row, 1, result.overall.to_string(), &verdict_format)?;
        summary.write_string_with_format(row, 2, result.file.as_deref().unwrap_or(""), &value_format)?;
        summary.write_string_with_format(row, 3, &missing, &value_format)?;
        summary.write_string_with_format(row, 4, result.message.as_deref().unwrap_or(""), &value_format)?;
    }

    let fields = workbook.add_worksheet();
    fields.set_name("フィールド")?;
    write_headers(fields, FIELD_HEADERS, &header_format)?;

    let mut row = 1u32;
    for result in results {
        for field in &result.fields {
            let status_format = value_format
                .clone()
                .set_align(FormatAlign::Center)
                .set_background_color(status_color(field.status));

            fields.write_string_with_format(row, 0, &result.model_key, &value_format)?;
            fields.write_string_with_format(row, 1, &field.name, &value_format)?;
            fields.write_string_with_format(row, 2, field.status.to_string(), &status_format)?;
            fields.write_string_with_format(row, 3, &field.expected, &value_format)?;
            fields.write_string_with_format(row, 4, &field.found, &value_format)?;
            fields.write_string_with_format(row, 5, &field.detail, &value_format)?;
            row += 1;
        }
    }

    Ok(workbook)
}

/// バッチ結果をxlsxファイルに保存する
pub fn write_batch_xlsx(results: &[BatchResult], output_path: &Path) -> Result<()> {
    let mut workbook = build_batch_workbook(results)?;
    workbook.save(output_path)?;
    tracing::info!(file = %output_path.display(), rows = results.len(), "batch workbook written");
    Ok(())
}
