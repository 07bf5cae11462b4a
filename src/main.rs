use clap::Parser;
use packaging_qa::{cli, config, engine, error, export, loader};
use cli::{Cli, Commands};
use config::Config;
use engine::QaEngine;
use error::Result;
use loader::{FileTableSource, TableKind, TableSource};
use serde::Serialize;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// JSONを書き出す（出力先が無ければ標準出力）
fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            eprintln!("✔ 結果を保存: {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    match cli.command {
        Commands::Expected { model, output } => {
            let engine = QaEngine::from_config(&config)?;
            let bundle = engine.expected(&model)?;
            write_json(&bundle, output.as_deref())?;
        }

        Commands::Validate { model, ai_file, output } => {
            let engine = QaEngine::from_config(&config)?;
            let report = engine.validate_file(&model, &ai_file)?;
            eprintln!("判定: {}", report.overall);
            write_json(&report, output.as_deref())?;
        }

        Commands::Batch { items, output, xlsx } => {
            let engine = QaEngine::from_config(&config)?;
            let items = engine::read_batch_items(&items)?;
            eprintln!("📦 {}件を検証中...", items.len());

            let results = engine.validate_batch(&items)?;
            write_json(&results, output.as_deref())?;

            if let Some(xlsx_path) = xlsx {
                export::write_batch_xlsx(&results, &xlsx_path)?;
                eprintln!("✔ Excelを保存: {}", xlsx_path.display());
            }
        }

        Commands::Import { kind, file } => {
            let snapshot = config.data_dir.join(kind.snapshot_file());
            let table = loader::import_snapshot(&file, &snapshot)?;
            println!(
                "✔ {} を取り込みました: {}行 → {}",
                kind.label(),
                table.len(),
                snapshot.display()
            );
        }

        Commands::Tables => {
            for kind in [TableKind::Master, TableKind::Design] {
                let source = FileTableSource::from_config(&config, kind);
                let table = source.load()?;
                let meta = serde_json::to_string(&table.meta)?;
                println!("{}: {}行 {}", kind.label(), table.len(), meta);
                println!("  スナップショット: {}", source.spec().snapshot.display());
            }

            let engine = QaEngine::from_config(&config)?;
            println!(
                "ルール: 構造 {}件 / 内容 {}件, 同義語: {}件",
                engine.rules().structure.len(),
                engine.rules().content.len(),
                engine.matcher().synonyms().len()
            );
        }

        Commands::Config { show, set_data_dir } => {
            if let Some(dir) = set_data_dir {
                let stored = Config::set_data_dir(&Config::config_path()?, dir)?;
                config.data_dir = stored.data_dir;
                println!("✔ データディレクトリを設定しました");
            }

            if show {
                println!("設定ファイル: {}", Config::config_path()?.display());
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("❌ [{}] {}", e.code(), e);
        std::process::exit(e.exit_code());
    }
}
