use crate::error::{QaError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// データディレクトリを上書きする環境変数
pub const DATA_DIR_ENV: &str = "PACKQA_DATA_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// スナップショット・シードファイル・ルールを置くディレクトリ
    pub data_dir: PathBuf,
    /// アップロードされた表計算ファイルのディレクトリ（未指定なら data_dir/uploads）
    pub uploads_dir: Option<PathBuf>,
    /// 構造ルールJSON（相対パスは data_dir 基準）
    pub structure_rules: PathBuf,
    /// 内容ルールJSON（相対パスは data_dir 基準）
    pub content_rules: PathBuf,
    /// 追加の同義語JSON
    pub synonyms: Option<PathBuf>,
    /// 外部で検証済みとしてOKにする要件キーワード
    pub externally_validated: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            uploads_dir: None,
            structure_rules: PathBuf::from("structure_rules.json"),
            content_rules: PathBuf::from("content_rules.json"),
            synonyms: None,
            externally_validated: vec!["Año".into(), "Year".into()],
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let mut config = Self::load_from(&config_path)?;
        config.apply_env();
        Ok(config)
    }

    /// 指定パスから読み込む（無ければ既定値）
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| QaError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("packaging-qa").join("config.json"))
    }

    fn apply_env(&mut self) {
        // 環境変数を優先
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                self.data_dir = PathBuf::from(dir);
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// 設定ファイルのデータディレクトリだけを書き換える
    ///
    /// 環境変数やコマンドラインの上書きは保存しない。
    pub fn set_data_dir(path: &Path, dir: PathBuf) -> Result<Self> {
        let mut stored = Self::load_from(path)?;
        stored.data_dir = dir;
        stored.save_to(path)?;
        Ok(stored)
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.uploads_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("uploads"))
    }

    /// data_dir 基準でパスを解決
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }

    pub fn structure_rules_path(&self) -> PathBuf {
        self.resolve(&self.structure_rules)
    }

    pub fn content_rules_path(&self) -> PathBuf {
        self.resolve(&self.content_rules)
    }

    pub fn synonyms_path(&self) -> Option<PathBuf> {
        self.synonyms.as_deref().map(|p| self.resolve(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.externally_validated, vec!["Año", "Year"]);
    }

    #[test]
    fn test_load_from_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"data_dir": "/srv/qa", "synonyms": "syn.json"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/qa"));
        assert_eq!(config.uploads_dir(), PathBuf::from("/srv/qa/uploads"));
        assert_eq!(config.synonyms_path(), Some(PathBuf::from("/srv/qa/syn.json")));
        assert_eq!(
            config.structure_rules_path(),
            PathBuf::from("/srv/qa/structure_rules.json")
        );
    }

    #[test]
    fn test_set_data_dir_keeps_stored_settings_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("qa").join("config.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"data_dir": "/old", "synonyms": "syn.json"}"#).unwrap();

        // 実行時の上書きは保存対象にならない
        std::env::set_var(DATA_DIR_ENV, "/from-env");
        let mut runtime = Config::load_from(&path).unwrap();
        runtime.apply_env();
        assert_eq!(runtime.data_dir, PathBuf::from("/from-env"));

        let saved = Config::set_data_dir(&path, PathBuf::from("/srv/qa")).unwrap();
        assert_eq!(saved.data_dir, PathBuf::from("/srv/qa"));

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.data_dir, PathBuf::from("/srv/qa"));
        assert_eq!(reloaded.synonyms, Some(PathBuf::from("syn.json")));
        assert_eq!(reloaded.externally_validated, vec!["Año", "Year"]);
        std::env::remove_var(DATA_DIR_ENV);
    }

    #[test]
    fn test_resolve_absolute_path() {
        let config = Config::default();
        assert_eq!(
            config.resolve(Path::new("/etc/rules.json")),
            PathBuf::from("/etc/rules.json")
        );
    }
}
