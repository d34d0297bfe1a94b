use anyhow::Result;
use chrono::Local;
use crossterm::{
    cursor::MoveTo,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType},
};
use inquire::{Confirm, InquireError, Select, Text};
use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::Path;

use crate::config::PickerConfig;
use crate::error::FleetError;
use crate::folder::FleetFolder;
use crate::launcher::Opener;
use crate::store::{FolderStore, OpenOutcome};

const FILTER_SYMBOLS: &[char] = &['.', ',', '\\', '/'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Open(char),
    FilterPush(char),
    FilterPop,
    FilterClear,
    Add,
    Remove,
    Quit,
    Ignore,
}

impl KeyInput {
    pub fn from_key(code: KeyCode, modifiers: KeyModifiers, filter_empty: bool) -> Self {
        let ctrl_or_alt = modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT);
        match code {
            KeyCode::Char('c') | KeyCode::Char('q') if modifiers.contains(KeyModifiers::CONTROL) => {
                Self::Quit
            }
            _ if ctrl_or_alt => Self::Ignore,
            KeyCode::Esc if filter_empty => Self::Quit,
            KeyCode::Esc => Self::FilterClear,
            KeyCode::Backspace => Self::FilterPop,
            KeyCode::Char('+') => Self::Add,
            KeyCode::Char('-') => Self::Remove,
            KeyCode::Char(c) if c.is_ascii_lowercase() => Self::Open(c),
            KeyCode::Char(c) if c.is_ascii_uppercase() || c.is_ascii_digit() => {
                Self::FilterPush(c)
            }
            KeyCode::Char(c) if FILTER_SYMBOLS.contains(&c) => Self::FilterPush(c),
            _ => Self::Ignore,
        }
    }
}

/// Blank input means "allocate one"; anything longer than one character is refused.
pub fn parse_key(input: &str) -> crate::error::Result<Option<char>> {
    let input = input.trim();
    let mut chars = input.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Ok(None),
        (Some(c), None) => Ok(Some(c)),
        (Some(_), Some(_)) => Err(FleetError::KeyTooLong(input.to_string())),
    }
}

pub fn render_table<'a>(folders: impl IntoIterator<Item = &'a FleetFolder>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  {:<3} {:<50} {:>6}  {}", "键", "路径", "次数", "最近打开");
    for f in folders {
        let _ = writeln!(
            out,
            "  {:<3} {:<50} {:>6}  {}",
            f.access_key,
            f.path,
            f.usage_count,
            f.last_accessed_display()
        );
    }
    out
}

fn render(store: &FolderStore, config: &PickerConfig, status: Option<&str>) -> Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;

    let items = store.sorted(config.sort);
    if items.is_empty() {
        println!("  （没有匹配的文件夹）");
    } else {
        print!("{}", render_table(items));
    }
    println!();
    println!("过滤：{}", store.filter());
    println!("[a-z] 打开  ·  大写/数字 过滤  ·  ⌫ 删除字符  ·  [+] 添加  ·  [-] 删除  ·  [Esc] 清空/退出");
    if let Some(msg) = status {
        println!("{}", msg);
    }
    stdout.flush()?;
    Ok(())
}

fn read_input(filter_empty: bool) -> Result<KeyInput> {
    enable_raw_mode()?;
    let result = (|| -> Result<KeyInput> {
        loop {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match KeyInput::from_key(key.code, key.modifiers, filter_empty) {
                    KeyInput::Ignore => {}
                    input => return Ok(input),
                }
            }
        }
    })();
    let _ = disable_raw_mode();
    result
}

pub fn run_picker(
    store: &mut FolderStore,
    file: &Path,
    opener: &dyn Opener,
    config: &PickerConfig,
) -> Result<()> {
    let mut status: Option<String> = None;

    loop {
        render(store, config, status.as_deref())?;
        status = None;

        match read_input(store.filter().is_empty())? {
            KeyInput::Open(key) => match store.open_with(key, opener, Local::now()) {
                Ok(OpenOutcome::Opened(folder)) => {
                    store.save(file)?;
                    if config.exit_on_open {
                        println!("✓ 已打开 {}", folder.path);
                        break;
                    }
                    status = Some(format!("✓ 已打开 {}", folder.path));
                }
                Ok(OpenOutcome::NoSuchKey) => {
                    status = Some(format!("快捷键 '{}' 没有对应的文件夹", key));
                }
                Ok(OpenOutcome::MissingDirectory(path)) => {
                    status = Some(format!("⚠ 文件夹不存在：{}", path));
                }
                Err(e) => {
                    tracing::error!(error = %e, key = %key, "failed to open folder");
                    status = Some(format!("✗ {}", e));
                }
            },
            KeyInput::FilterPush(c) => {
                let mut filter = store.filter().to_string();
                filter.push(c);
                store.set_filter(&filter);
            }
            KeyInput::FilterPop => {
                let mut filter = store.filter().to_string();
                filter.pop();
                store.set_filter(&filter);
            }
            KeyInput::FilterClear => store.set_filter(""),
            KeyInput::Add => {
                status = prompt_add(store)?;
                store.save(file)?;
            }
            KeyInput::Remove => {
                status = prompt_remove(store)?;
                store.save(file)?;
            }
            KeyInput::Quit => break,
            KeyInput::Ignore => {}
        }
    }

    store.save(file)?;
    Ok(())
}

fn prompt_add(store: &mut FolderStore) -> Result<Option<String>> {
    println!();
    let path = match Text::new("文件夹路径：").prompt() {
        Ok(p) => p,
        Err(InquireError::OperationCanceled) | Err(InquireError::OperationInterrupted) => {
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let default_key = store.free_key().map(String::from).unwrap_or_default();
    let key = match Text::new("快捷键：")
        .with_initial_value(&default_key)
        .with_help_message("留空则自动分配第一个空闲字母")
        .prompt()
    {
        Ok(k) => match parse_key(&k) {
            Ok(key) => key,
            Err(e) => return Ok(Some(format!("✗ {}", e))),
        },
        Err(InquireError::OperationCanceled) | Err(InquireError::OperationInterrupted) => {
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Some(match store.add(&path, key) {
        Ok(key) if Path::new(path.trim()).is_dir() => format!("✓ 已添加 [{}] {}", key, path.trim()),
        Ok(key) => format!("✓ 已添加 [{}] {}（⚠ 路径暂不存在）", key, path.trim()),
        Err(e) => format!("✗ {}", e),
    }))
}

fn prompt_remove(store: &mut FolderStore) -> Result<Option<String>> {
    let items: Vec<FleetFolder> = store.filtered().cloned().collect();
    if items.is_empty() {
        return Ok(Some("没有可删除的文件夹".to_string()));
    }

    println!();
    let selected = match Select::new("选择要删除的文件夹：", items)
        .with_help_message("输入关键字过滤  ·  ↑↓ 移动  ·  Enter 确认  ·  Esc 取消")
        .prompt()
    {
        Ok(item) => item,
        Err(InquireError::OperationCanceled) | Err(InquireError::OperationInterrupted) => {
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let confirm = match Confirm::new(&format!("确认删除 [{}] {}？", selected.access_key, selected.path))
        .with_default(false)
        .prompt()
    {
        Ok(v) => v,
        Err(InquireError::OperationCanceled) | Err(InquireError::OperationInterrupted) => false,
        Err(e) => return Err(e.into()),
    };

    if !confirm {
        return Ok(None);
    }

    let removed = store.remove_folder(&selected)?;
    Ok(Some(format!("✓ 已删除 [{}] {}", removed.access_key, removed.path)))
}
