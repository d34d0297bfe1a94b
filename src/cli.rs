use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::store::SortOrder;

#[derive(Parser)]
#[command(name = "ff", version, about = "用单个按键快速打开常用文件夹")]
pub struct Cli {
    /// 文件夹列表文件（默认读取配置）
    #[arg(long, global = true)]
    pub file: Option<PathBuf>,

    /// 输出更多日志（可重复）
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// 只输出错误
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// 创建空的文件夹列表
    Init,
    /// 列出文件夹
    List {
        /// 按路径过滤（不区分大小写）
        #[arg(long)]
        filter: Option<String>,
        /// 排序方式
        #[arg(long, value_enum)]
        sort: Option<SortOrder>,
    },
    /// 添加文件夹
    Add {
        path: String,
        /// 指定快捷键（默认分配第一个空闲字母）
        #[arg(long)]
        key: Option<char>,
    },
    /// 删除快捷键对应的文件夹
    Remove { key: char },
    /// 打开快捷键对应的文件夹
    Open {
        key: char,
        /// 先按路径过滤再查找快捷键
        #[arg(long)]
        filter: Option<String>,
    },
    /// 输出快捷键对应的路径（便于 `cd "$(ff path d)"`）
    Path {
        key: char,
        #[arg(long)]
        filter: Option<String>,
    },
    /// 显示下一个空闲快捷键
    FreeKey,
}
