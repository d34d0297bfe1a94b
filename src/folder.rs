use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FleetFolder {
    pub access_key: char,
    #[serde(rename = "Url")]
    pub path: String,
    pub usage_count: u32,
    pub last_accessed: DateTime<Local>,
}

impl FleetFolder {
    pub fn new(access_key: char, path: impl Into<String>) -> Self {
        Self {
            access_key,
            path: path.into(),
            usage_count: 0,
            last_accessed: Local::now(),
        }
    }

    /// Records one successful open at `now`.
    pub fn touch(&mut self, now: DateTime<Local>) {
        self.usage_count = self.usage_count.saturating_add(1);
        self.last_accessed = now;
    }

    pub fn has_key(&self, key: char) -> bool {
        self.access_key.eq_ignore_ascii_case(&key)
    }

    /// Case-insensitive substring match on the path. Empty filters match everything.
    pub fn matches(&self, filter: &str) -> bool {
        filter.is_empty() || self.path.to_lowercase().contains(&filter.to_lowercase())
    }

    pub fn last_accessed_display(&self) -> String {
        self.last_accessed.format("%-d/%-m/%Y %-H:%-M:%-S").to_string()
    }
}

impl fmt::Display for FleetFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]  {}", self.access_key, self.path)
    }
}
