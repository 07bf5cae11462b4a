use thiserror::Error;

#[derive(Error, Debug)]
pub enum QaError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("表計算ファイル読み込みエラー: {0}")]
    Spreadsheet(String),

    #[error("表計算ファイル書き込みエラー: {0}")]
    ExcelGeneration(String),

    #[error("テーブルが不正: {0}")]
    InvalidTable(String),

    #[error(transparent)]
    Common(#[from] packaging_qa_common::Error),
}

impl QaError {
    /// 境界（CLI出力・バッチ結果）で使うエラーコード
    pub fn code(&self) -> &'static str {
        match self {
            QaError::Common(e) => e.code(),
            QaError::Config(_) => "CONFIG",
            QaError::FileNotFound(_) => "FILE_NOT_FOUND",
            QaError::JsonParse(_) => "JSON",
            QaError::Io(_) => "IO",
            QaError::Spreadsheet(_) => "SPREADSHEET",
            QaError::ExcelGeneration(_) => "EXCEL",
            QaError::InvalidTable(_) => "INVALID_TABLE",
        }
    }

    /// 終了コード（見つからない系は2、それ以外は1）
    pub fn exit_code(&self) -> i32 {
        match self {
            QaError::Common(e) if e.is_not_found() => 2,
            QaError::FileNotFound(_) => 2,
            _ => 1,
        }
    }
}

impl From<calamine::Error> for QaError {
    fn from(e: calamine::Error) -> Self {
        QaError::Spreadsheet(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for QaError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        QaError::ExcelGeneration(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, QaError>;
