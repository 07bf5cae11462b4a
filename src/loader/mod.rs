//! テーブルの読み込み
//!
//! 解決順（最初に見つかったものを使う）:
//! 1. アップロードディレクトリ内で名前がパターンに一致する最新ファイル
//! 2. データディレクトリのJSONスナップショット
//! 3. 同梱のシード表計算ファイル
//! 4. 空テーブル（`source = "empty"`）
//!
//! テーブルが無いことはエラーにしない。存在するが読めないファイルはエラー。

pub mod xlsx;

use crate::config::Config;
use crate::error::Result;
use packaging_qa_common::{LoadedTable, TableMeta, TableOrigin};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

pub use xlsx::{import_snapshot, read_json_table, read_sheet_rows, read_spreadsheet};

lazy_static::lazy_static! {
    static ref MASTER_UPLOAD_RE: Regex = Regex::new(r"(?i)master").unwrap();
    static ref DESIGN_UPLOAD_RE: Regex = Regex::new(r"(?i)informacio").unwrap();
}

/// テーブルの読み込み口
pub trait TableSource: Send + Sync {
    fn load(&self) -> Result<LoadedTable>;
}

/// テーブルの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TableKind {
    /// マスタ表（Master Season）
    Master,
    /// デザイン情報表
    Design,
}

impl TableKind {
    /// アップロードファイル名のパターン
    pub fn upload_pattern(&self) -> &'static Regex {
        match self {
            TableKind::Master => &MASTER_UPLOAD_RE,
            TableKind::Design => &DESIGN_UPLOAD_RE,
        }
    }

    pub fn snapshot_file(&self) -> &'static str {
        match self {
            TableKind::Master => "master-season.json",
            TableKind::Design => "design-info.json",
        }
    }

    pub fn seed_file(&self) -> &'static str {
        match self {
            TableKind::Master => "expected/master-season.xlsx",
            TableKind::Design => "expected/diseno-informacion.xlsx",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TableKind::Master => "master",
            TableKind::Design => "design",
        }
    }
}

/// ファイル配置の指定
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub kind: TableKind,
    pub uploads_dir: PathBuf,
    pub snapshot: PathBuf,
    pub seed: PathBuf,
}

impl TableSpec {
    pub fn from_config(config: &Config, kind: TableKind) -> Self {
        Self {
            kind,
            uploads_dir: config.uploads_dir(),
            snapshot: config.data_dir.join(kind.snapshot_file()),
            seed: config.data_dir.join(kind.seed_file()),
        }
    }
}

fn is_table_file(path: &Path) -> bool {
    let is_json = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    is_json || xlsx::is_spreadsheet(path)
}

fn to_rfc3339(time: SystemTime) -> String {
    chrono::DateTime::<chrono::Utc>::from(time).to_rfc3339()
}

/// アップロードディレクトリ内で名前がパターンに一致する最新ファイル
pub fn latest_upload(dir: &Path, pattern: &Regex) -> Option<(PathBuf, SystemTime)> {
    if !dir.is_dir() {
        return None;
    }

    WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| pattern.is_match(&e.file_name().to_string_lossy()))
        .filter(|e| is_table_file(e.path()))
        .filter_map(|e| {
            let modified = e.metadata().ok()?.modified().ok()?;
            Some((e.into_path(), modified))
        })
        .max_by_key(|(_, modified)| *modified)
}

/// ファイルから読み込むテーブル
#[derive(Debug, Clone)]
pub struct FileTableSource {
    spec: TableSpec,
}

impl FileTableSource {
    pub fn new(spec: TableSpec) -> Self {
        Self { spec }
    }

    pub fn from_config(config: &Config, kind: TableKind) -> Self {
        Self::new(TableSpec::from_config(config, kind))
    }

    pub fn spec(&self) -> &TableSpec {
        &self.spec
    }

    fn load_upload(&self, path: &Path, modified: SystemTime) -> Result<LoadedTable> {
        let mut table = if xlsx::is_spreadsheet(path) {
            read_spreadsheet(path, TableOrigin::Upload)?
        } else {
            read_json_table(path)?
        };
        table.meta.source = TableOrigin::Upload;
        table.meta.file = Some(path.display().to_string());
        table.meta.modified = Some(to_rfc3339(modified));
        Ok(table)
    }

    fn load_snapshot(&self) -> Result<Option<LoadedTable>> {
        if !self.spec.snapshot.is_file() {
            return Ok(None);
        }
        let mut table = read_json_table(&self.spec.snapshot)?;
        if table.is_empty() {
            return Ok(None);
        }
        table.meta.source = TableOrigin::Snapshot;
        table.meta.file = Some(self.spec.snapshot.display().to_string());
        Ok(Some(table))
    }
}

impl TableSource for FileTableSource {
    fn load(&self) -> Result<LoadedTable> {
        let kind = self.spec.kind.label();

        if let Some((path, modified)) = latest_upload(&self.spec.uploads_dir, self.spec.kind.upload_pattern()) {
            tracing::debug!(table = kind, file = %path.display(), "using uploaded table");
            return self.load_upload(&path, modified);
        }

        if let Some(table) = self.load_snapshot()? {
            tracing::debug!(table = kind, rows = table.len(), "using snapshot");
            return Ok(table);
        }

        if self.spec.seed.is_file() {
            tracing::debug!(table = kind, file = %self.spec.seed.display(), "using seed spreadsheet");
            return read_spreadsheet(&self.spec.seed, TableOrigin::SeedXlsx);
        }

        tracing::warn!(table = kind, "no table found, continuing with an empty table");
        Ok(LoadedTable {
            rows: Vec::new(),
            meta: TableMeta::empty(),
        })
    }
}

/// メモリ上のテーブル（テスト・埋め込み用）
#[derive(Debug, Clone, Default)]
pub struct MemoryTableSource {
    table: LoadedTable,
}

impl MemoryTableSource {
    pub fn new(table: LoadedTable) -> Self {
        Self { table }
    }
}

impl TableSource for MemoryTableSource {
    fn load(&self) -> Result<LoadedTable> {
        Ok(self.table.clone())
    }
}
