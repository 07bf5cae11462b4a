//! packaging-qa
//!
//! 表計算ファイルの読み込み、ルール・同義語の設定、検証エンジン、CLI

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod loader;

pub use engine::{BatchItem, BatchResult, QaEngine};
pub use error::{QaError, Result};
