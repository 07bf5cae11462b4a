//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("No master table loaded. Upload a master table first")]
    NoMaster,

    #[error("No data found for model {0}")]
    NotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl Error {
    /// 境界（HTTP/CLI）で使うエラーコード
    pub fn code(&self) -> &'static str {
        match self {
            Error::NoMaster => "NO_MASTER",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Json(_) => "JSON",
            Error::Parse(_) => "PARSE",
        }
    }

    /// 利用者に「見つからない」として返すべきエラーか
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NoMaster | Error::NotFound(_))
    }
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
