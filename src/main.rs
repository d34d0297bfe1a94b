mod cli;
mod config;
mod error;
mod folder;
mod launcher;
mod logging;
mod store;
mod ui;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Parser;

use cli::{Cli, Command};
use config::Config;
use launcher::FileManager;
use logging::{init_logging, Verbosity};
use store::{FolderStore, OpenOutcome};
use ui::{render_table, run_picker};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(Verbosity::from_flags(cli.quiet, cli.verbose));

    let config = Config::load().context("读取配置失败")?;
    let file = cli.file.clone().unwrap_or_else(|| config.folders_file());
    let opener = FileManager::new(config.launcher.program.clone());
    tracing::debug!(file = %file.display(), launcher = opener.program(), "starting");

    match cli.command {
        Some(Command::Init) => {
            FolderStore::create(&file)?;
            println!("✓ 已创建文件夹列表：{}", file.display());
        }

        Some(Command::List { filter, sort }) => {
            let mut store = FolderStore::load(&file)?;
            if let Some(filter) = filter {
                store.set_filter(&filter);
            }
            let items = store.sorted(sort.unwrap_or(config.picker.sort));
            println!("共 {} 个文件夹，匹配 {} 个\n", store.folders().len(), items.len());
            if items.is_empty() {
                println!("没有匹配的文件夹。");
            } else {
                print!("{}", render_table(items));
            }
        }

        Some(Command::Add { path, key }) => {
            let mut store = FolderStore::load(&file)?;
            let key = store.add(&path, key)?;
            store.save(&file)?;
            println!("✓ 已添加 [{}] {}", key, path.trim());
        }

        Some(Command::Remove { key }) => {
            let mut store = FolderStore::load(&file)?;
            let removed = store.remove(key)?;
            store.save(&file)?;
            println!("✓ 已删除 [{}] {}", removed.access_key, removed.path);
        }

        Some(Command::Open { key, filter }) => {
            let mut store = FolderStore::load(&file)?;
            if let Some(filter) = filter {
                store.set_filter(&filter);
            }
            match store.open_with(key, &opener, Local::now())? {
                OpenOutcome::Opened(folder) => {
                    store.save(&file)?;
                    println!("✓ 已打开 {}", folder.path);
                }
                OpenOutcome::NoSuchKey => bail!("快捷键 '{}' 没有对应的文件夹", key),
                OpenOutcome::MissingDirectory(path) => bail!("文件夹不存在：{}", path),
            }
        }

        Some(Command::Path { key, filter }) => {
            let mut store = FolderStore::load(&file)?;
            if let Some(filter) = filter {
                store.set_filter(&filter);
            }
            let folder = store
                .folder_by_key(key)
                .with_context(|| format!("快捷键 '{}' 没有对应的文件夹", key))?;
            println!("{}", folder.path);
        }

        Some(Command::FreeKey) => {
            let store = FolderStore::load(&file)?;
            match store.free_key() {
                Some(key) => println!("{}", key),
                None => bail!(error::FleetError::NoFreeKey),
            }
        }

        None => {
            let mut store = FolderStore::load(&file)?;
            run_picker(&mut store, &file, &opener, &config.picker)?;
        }
    }

    Ok(())
}
