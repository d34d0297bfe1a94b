use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FleetError {
    #[error("文件夹列表不存在：{0}（可先执行 `ff init` 创建）")]
    MissingFile(PathBuf),

    #[error("文件夹列表已存在：{0}")]
    AlreadyExists(PathBuf),

    #[error("{path} 第 {line} 行解析失败：{source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("序列化失败：{0}")]
    Serialize(#[from] serde_json::Error),

    #[error("快捷键 '{0}' 已被占用")]
    KeyInUse(char),

    #[error("快捷键必须是 a-z 字母：'{0}'")]
    InvalidKey(char),

    #[error("快捷键只能是单个字母：'{0}'")]
    KeyTooLong(String),

    #[error("没有找到快捷键 '{0}' 对应的文件夹")]
    UnknownKey(char),

    #[error("26 个字母快捷键已全部占用")]
    NoFreeKey,

    #[error("路径无效：{0}")]
    InvalidPath(String),

    #[error("无法启动 {program}：{source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("配置加载失败：{0}")]
    Config(Box<figment::Error>),

    #[error("配置无效：{0}")]
    ConfigValidation(String),

    #[error("IO 错误：{0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for FleetError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, FleetError>;
