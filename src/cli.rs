use crate::loader::TableKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "packqa")]
#[command(about = "包装デザインQA: 期待テキストの組み立てとAI/OCR結果の検証", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// データディレクトリ（設定ファイルより優先）
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// モデルの期待内容（要件・面構成・チェックリスト）をJSONで出力
    Expected {
        /// モデルキー（SKU・モデル名など）
        #[arg(required = true)]
        model: String,

        /// 出力JSONファイル（デフォルト: 標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// AI/OCR出力でデザインを検証
    Validate {
        /// モデルキー
        #[arg(required = true)]
        model: String,

        /// AI/OCR出力ファイル（JSONまたはコードブロック付きテキスト）
        #[arg(long = "ai", required = true)]
        ai_file: PathBuf,

        /// 出力JSONファイル（デフォルト: 標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 複数デザインを一括検証
    Batch {
        /// 項目リストJSON（[{"modelKey", "aiFile"}, ...]）
        #[arg(required = true)]
        items: PathBuf,

        /// 出力JSONファイル（デフォルト: 標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 結果一覧のExcelファイルも出力
        #[arg(long)]
        xlsx: Option<PathBuf>,
    },

    /// 表計算ファイルをスナップショットとして取り込む
    Import {
        /// テーブルの種類
        #[arg(value_enum)]
        kind: TableKind,

        /// 表計算ファイル
        #[arg(required = true)]
        file: PathBuf,
    },

    /// 使用中のテーブルの出所を表示
    Tables,

    /// 設定を管理
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,

        /// データディレクトリを設定
        #[arg(long)]
        set_data_dir: Option<PathBuf>,
    },
}
