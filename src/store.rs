use chrono::{DateTime, Local};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{FleetError, Result};
use crate::folder::FleetFolder;
use crate::launcher::Opener;

const KEYS: std::ops::RangeInclusive<char> = 'a'..='z';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    File,
    Usage,
    Recent,
    Key,
}

#[derive(Debug, PartialEq)]
pub enum OpenOutcome {
    Opened(FleetFolder),
    NoSuchKey,
    MissingDirectory(String),
}

#[derive(Debug, Default)]
pub struct FolderStore {
    folders: Vec<FleetFolder>,
    filter: String,
    filtered: Vec<usize>,
}

impl FolderStore {
    pub fn from_folders(folders: Vec<FleetFolder>) -> Self {
        let mut store = Self {
            folders,
            ..Self::default()
        };
        store.refilter();
        store
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FleetError::MissingFile(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let mut folders = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let folder: FleetFolder =
                serde_json::from_str(line).map_err(|source| FleetError::Parse {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    source,
                })?;
            folders.push(folder);
        }

        tracing::debug!(path = %path.display(), count = folders.len(), "loaded folder list");
        Ok(Self::from_folders(folders))
    }

    pub fn create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Err(FleetError::AlreadyExists(path.to_path_buf()));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let store = Self::default();
        store.save(path)?;
        Ok(store)
    }

    /// Moves the current file to `<path>~`, writes a fresh one, then drops the backup.
    /// A crash in between leaves only the backup behind.
    pub fn save(&self, path: &Path) -> Result<()> {
        let backup = backup_path(path);
        if path.exists() {
            fs::rename(path, &backup)?;
        }

        let mut writer = BufWriter::new(fs::File::create(path)?);
        for folder in &self.folders {
            serde_json::to_writer(&mut writer, folder)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        if backup.exists() {
            fs::remove_file(&backup)?;
        }

        tracing::debug!(path = %path.display(), count = self.folders.len(), "saved folder list");
        Ok(())
    }

    pub fn folders(&self) -> &[FleetFolder] {
        &self.folders
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: &str) {
        self.filter = filter.to_string();
        self.refilter();
    }

    fn refilter(&mut self) {
        self.filtered = self
            .folders
            .iter()
            .enumerate()
            .filter(|(_, f)| f.matches(&self.filter))
            .map(|(i, _)| i)
            .collect();
    }

    pub fn filtered(&self) -> impl Iterator<Item = &FleetFolder> {
        self.filtered.iter().map(|&i| &self.folders[i])
    }

    pub fn sorted(&self, order: SortOrder) -> Vec<&FleetFolder> {
        let mut items: Vec<&FleetFolder> = self.filtered().collect();
        match order {
            SortOrder::File => {}
            SortOrder::Usage => items.sort_by(|a, b| {
                b.usage_count
                    .cmp(&a.usage_count)
                    .then_with(|| a.path.cmp(&b.path))
            }),
            SortOrder::Recent => items.sort_by(|a, b| b.last_accessed.cmp(&a.last_accessed)),
            SortOrder::Key => items.sort_by_key(|f| f.access_key.to_ascii_lowercase()),
        }
        items
    }

    fn position_in_view(&self, key: char) -> Option<usize> {
        let mut hits = self
            .filtered
            .iter()
            .copied()
            .filter(|&i| self.folders[i].has_key(key));
        let first = hits.next()?;
        if hits.next().is_some() {
            tracing::warn!(key = %key, "several folders share this key, using the first");
        }
        Some(first)
    }

    pub fn folder_by_key(&self, key: char) -> Option<&FleetFolder> {
        self.position_in_view(key).map(|i| &self.folders[i])
    }

    pub fn key_in_use(&self, key: char) -> bool {
        self.folders.iter().any(|f| f.has_key(key))
    }

    pub fn free_key(&self) -> Option<char> {
        KEYS.into_iter().find(|&k| !self.key_in_use(k))
    }

    pub fn add(&mut self, path: &str, key: Option<char>) -> Result<char> {
        let path = validate_path(path)?;

        let key = match key {
            Some(k) if !k.is_ascii_alphabetic() => return Err(FleetError::InvalidKey(k)),
            Some(k) if self.key_in_use(k) => return Err(FleetError::KeyInUse(k)),
            Some(k) => k.to_ascii_lowercase(),
            None => self.free_key().ok_or(FleetError::NoFreeKey)?,
        };

        if !Path::new(&path).is_dir() {
            tracing::warn!(path = %path, "folder does not exist yet");
        }

        self.folders.push(FleetFolder::new(key, path));
        self.refilter();
        Ok(key)
    }

    pub fn remove(&mut self, key: char) -> Result<FleetFolder> {
        let idx = self
            .folders
            .iter()
            .position(|f| f.has_key(key))
            .ok_or(FleetError::UnknownKey(key))?;
        let removed = self.folders.remove(idx);
        self.refilter();
        Ok(removed)
    }

    /// Removes exactly this record, even when other records share its key.
    pub fn remove_folder(&mut self, folder: &FleetFolder) -> Result<FleetFolder> {
        let idx = self
            .folders
            .iter()
            .position(|f| f == folder)
            .ok_or(FleetError::UnknownKey(folder.access_key))?;
        let removed = self.folders.remove(idx);
        self.refilter();
        Ok(removed)
    }

    /// Opens the folder bound to `key` in the filtered view. The record is only
    /// touched when the launch itself succeeds.
    pub fn open_with(
        &mut self,
        key: char,
        opener: &dyn Opener,
        now: DateTime<Local>,
    ) -> Result<OpenOutcome> {
        let Some(idx) = self.position_in_view(key) else {
            return Ok(OpenOutcome::NoSuchKey);
        };

        let path = PathBuf::from(&self.folders[idx].path);
        if !path.is_dir() {
            return Ok(OpenOutcome::MissingDirectory(self.folders[idx].path.clone()));
        }

        opener.open(&path)?;

        let folder = &mut self.folders[idx];
        folder.touch(now);
        tracing::info!(key = %folder.access_key, path = %folder.path, count = folder.usage_count, "opened folder");
        Ok(OpenOutcome::Opened(folder.clone()))
    }
}

pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push("~");
    PathBuf::from(name)
}

pub fn validate_path(path: &str) -> Result<String> {
    let path = path.trim();
    if path.chars().count() <= 3 {
        return Err(FleetError::InvalidPath(format!("'{}' 太短", path)));
    }
    if let Some(c) = path
        .chars()
        .find(|&c| matches!(c, '"' | '<' | '>' | '|') || (c as u32) < 0x20)
    {
        return Err(FleetError::InvalidPath(format!(
            "'{}' 包含非法字符 {:?}",
            path, c
        )));
    }
    Ok(path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::cell::RefCell;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingOpener {
        opened: RefCell<Vec<PathBuf>>,
        fail: bool,
    }

    impl Opener for RecordingOpener {
        fn open(&self, path: &Path) -> Result<()> {
            if self.fail {
                return Err(FleetError::Launch {
                    program: "fake".to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
                });
            }
            self.opened.borrow_mut().push(path.to_path_buf());
            Ok(())
        }
    }

    fn folder(key: char, path: &str, count: u32) -> FleetFolder {
        FleetFolder {
            access_key: key,
            path: path.to_string(),
            usage_count: count,
            last_accessed: Local.with_ymd_and_hms(2011, 3, 14, 15, 9, 26).single().unwrap(),
        }
    }

    fn sample() -> FolderStore {
        FolderStore::from_folders(vec![
            folder('a', r"C:\Projects\Alpha", 3),
            folder('b', "/home/me/Documents", 10),
            folder('c', "/srv/PROJECTS/beta", 0),
        ])
    }

    #[test]
    fn save_then_load_preserves_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("folders.json");
        let store = sample();
        store.save(&path).unwrap();

        let loaded = FolderStore::load(&path).unwrap();
        assert_eq!(loaded.folders(), store.folders());
        assert_eq!(loaded.filtered().count(), 3);
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn save_overwrites_and_drops_backup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("folders.json");
        sample().save(&path).unwrap();

        let mut store = FolderStore::load(&path).unwrap();
        store.remove('b').unwrap();
        store.save(&path).unwrap();

        let reloaded = FolderStore::load(&path).unwrap();
        assert_eq!(reloaded.folders().len(), 2);
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let err = FolderStore::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, FleetError::MissingFile(_)));
    }

    #[test]
    fn load_skips_blank_lines_and_reports_bad_ones() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("folders.json");
        let line = serde_json::to_string(&folder('a', "/tmp/x", 1)).unwrap();
        fs::write(&path, format!("\n{line}\n   \n")).unwrap();
        assert_eq!(FolderStore::load(&path).unwrap().folders().len(), 1);

        fs::write(&path, format!("{line}\nnot json\n")).unwrap();
        match FolderStore::load(&path).unwrap_err() {
            FleetError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn load_reads_pascal_case_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("folders.json");
        fs::write(
            &path,
            r#"{"AccessKey":"D","Url":"C:\\Users\\me","UsageCount":4,"LastAccessed":"2012-01-05T14:22:31+00:00"}"#,
        )
        .unwrap();
        let store = FolderStore::load(&path).unwrap();
        let f = store.folder_by_key('d').unwrap();
        assert_eq!(f.path, r"C:\Users\me");
        assert_eq!(f.usage_count, 4);
    }

    #[test]
    fn create_refuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("folders.json");
        FolderStore::create(&path).unwrap();
        assert!(FolderStore::load(&path).unwrap().folders().is_empty());
        assert!(matches!(
            FolderStore::create(&path).unwrap_err(),
            FleetError::AlreadyExists(_)
        ));
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let mut store = sample();
        store.set_filter("projects");
        let keys: Vec<char> = store.filtered().map(|f| f.access_key).collect();
        assert_eq!(keys, vec!['a', 'c']);

        store.set_filter("DOC");
        let keys: Vec<char> = store.filtered().map(|f| f.access_key).collect();
        assert_eq!(keys, vec!['b']);

        store.set_filter("");
        assert_eq!(store.filtered().count(), 3);
    }

    #[test]
    fn key_lookup_only_sees_filtered_view() {
        let mut store = sample();
        assert!(store.folder_by_key('B').is_some());
        store.set_filter("projects");
        assert!(store.folder_by_key('b').is_none());
        assert!(store.folder_by_key('c').is_some());
    }

    #[test]
    fn duplicate_keys_resolve_to_first() {
        let store = FolderStore::from_folders(vec![
            folder('a', "/first", 0),
            folder('A', "/second", 0),
        ]);
        assert_eq!(store.folder_by_key('a').unwrap().path, "/first");
    }

    #[test]
    fn free_key_is_first_unused_letter() {
        let store = sample();
        assert_eq!(store.free_key(), Some('d'));

        let store = FolderStore::from_folders(vec![folder('B', "/x", 0)]);
        assert_eq!(store.free_key(), Some('a'));

        assert_eq!(FolderStore::default().free_key(), Some('a'));
    }

    #[test]
    fn free_key_none_when_alphabet_used() {
        let folders = ('a'..='z').map(|k| folder(k, "/tmp/x", 0)).collect();
        let mut store = FolderStore::from_folders(folders);
        assert_eq!(store.free_key(), None);
        assert!(matches!(
            store.add("/tmp/more", None).unwrap_err(),
            FleetError::NoFreeKey
        ));
    }

    #[test]
    fn add_allocates_or_checks_keys() {
        let mut store = sample();
        assert_eq!(store.add("/var/log", None).unwrap(), 'd');
        assert_eq!(store.add("/var/tmp", Some('Z')).unwrap(), 'z');
        assert!(matches!(
            store.add("/var/www", Some('a')).unwrap_err(),
            FleetError::KeyInUse('a')
        ));
        assert!(matches!(
            store.add("/var/www", Some('1')).unwrap_err(),
            FleetError::InvalidKey('1')
        ));
        assert_eq!(store.folders().len(), 5);
    }

    #[test]
    fn add_respects_current_filter() {
        let mut store = sample();
        store.set_filter("var");
        assert_eq!(store.filtered().count(), 0);
        store.add("/var/log", None).unwrap();
        assert_eq!(store.filtered().count(), 1);
    }

    #[test]
    fn validate_path_rules() {
        assert!(validate_path("/ab").is_err());
        assert!(validate_path("  /abc  ").is_ok());
        assert_eq!(validate_path(" /abc ").unwrap(), "/abc");
        assert!(validate_path("/tmp/a|b").is_err());
        assert!(validate_path("/tmp/a\u{7}b").is_err());
        assert!(validate_path(r"C:\Program Files").is_ok());
    }

    #[test]
    fn remove_unknown_key_fails() {
        let mut store = sample();
        assert!(matches!(
            store.remove('x').unwrap_err(),
            FleetError::UnknownKey('x')
        ));
        assert_eq!(store.remove('A').unwrap().path, r"C:\Projects\Alpha");
        assert_eq!(store.folders().len(), 2);
    }

    #[test]
    fn open_touches_record_once() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().to_string_lossy().to_string();
        let mut store = FolderStore::from_folders(vec![folder('a', &target, 2)]);
        let opener = RecordingOpener::default();
        let now = Local.with_ymd_and_hms(2020, 6, 1, 12, 0, 0).single().unwrap();

        match store.open_with('A', &opener, now).unwrap() {
            OpenOutcome::Opened(f) => {
                assert_eq!(f.usage_count, 3);
                assert_eq!(f.last_accessed, now);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(store.folders()[0].usage_count, 3);
        assert_eq!(opener.opened.borrow().len(), 1);
    }

    #[test]
    fn failed_or_skipped_opens_change_nothing() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().to_string_lossy().to_string();
        let missing = dir.path().join("gone").to_string_lossy().to_string();
        let mut store =
            FolderStore::from_folders(vec![folder('a', &target, 2), folder('b', &missing, 5)]);
        let before = store.folders().to_vec();
        let now = Local::now();

        let failing = RecordingOpener {
            fail: true,
            ..Default::default()
        };
        assert!(store.open_with('a', &failing, now).is_err());

        let opener = RecordingOpener::default();
        assert_eq!(
            store.open_with('b', &opener, now).unwrap(),
            OpenOutcome::MissingDirectory(missing)
        );
        assert_eq!(
            store.open_with('q', &opener, now).unwrap(),
            OpenOutcome::NoSuchKey
        );

        assert_eq!(store.folders(), &before[..]);
        assert!(opener.opened.borrow().is_empty());
    }

    #[test]
    fn sorting_orders() {
        let store = sample();
        let by_usage: Vec<char> = store
            .sorted(SortOrder::Usage)
            .iter()
            .map(|f| f.access_key)
            .collect();
        assert_eq!(by_usage, vec!['b', 'a', 'c']);

        let by_file: Vec<char> = store
            .sorted(SortOrder::File)
            .iter()
            .map(|f| f.access_key)
            .collect();
        assert_eq!(by_file, vec!['a', 'b', 'c']);
    }

    #[test]
    fn usage_ties_break_on_path() {
        let store = FolderStore::from_folders(vec![
            folder('a', "/zeta", 4),
            folder('b', "/alpha", 4),
            folder('c', "/mid", 9),
        ]);
        let keys: Vec<char> = store
            .sorted(SortOrder::Usage)
            .iter()
            .map(|f| f.access_key)
            .collect();
        assert_eq!(keys, vec!['c', 'b', 'a']);
    }

    #[test]
    fn recent_sorts_newest_first() {
        let mut old = folder('a', "/old", 0);
        let mut newest = folder('b', "/newest", 0);
        let mut middle = folder('c', "/middle", 0);
        old.last_accessed = Local.with_ymd_and_hms(2010, 10, 1, 8, 0, 0).single().unwrap();
        newest.last_accessed = Local.with_ymd_and_hms(2012, 1, 5, 8, 0, 0).single().unwrap();
        middle.last_accessed = Local.with_ymd_and_hms(2011, 6, 15, 8, 0, 0).single().unwrap();
        let store = FolderStore::from_folders(vec![old, newest, middle]);

        let keys: Vec<char> = store
            .sorted(SortOrder::Recent)
            .iter()
            .map(|f| f.access_key)
            .collect();
        assert_eq!(keys, vec!['b', 'c', 'a']);
    }

    #[test]
    fn key_sort_ignores_case() {
        let store = FolderStore::from_folders(vec![
            folder('d', "/four", 0),
            folder('B', "/two", 0),
            folder('c', "/three", 0),
            folder('A', "/one", 0),
        ]);
        let keys: Vec<char> = store
            .sorted(SortOrder::Key)
            .iter()
            .map(|f| f.access_key)
            .collect();
        assert_eq!(keys, vec!['A', 'B', 'c', 'd']);
    }

    #[test]
    fn remove_folder_takes_the_selected_duplicate() {
        let mut store = FolderStore::from_folders(vec![
            folder('a', "/first/one", 0),
            folder('a', "/second/two", 0),
        ]);
        store.set_filter("second");
        let selected = store.filtered().next().unwrap().clone();

        let removed = store.remove_folder(&selected).unwrap();
        assert_eq!(removed.path, "/second/two");
        assert_eq!(store.folders().len(), 1);
        assert_eq!(store.folders()[0].path, "/first/one");
        assert_eq!(store.filtered().count(), 0);

        assert!(matches!(
            store.remove_folder(&selected).unwrap_err(),
            FleetError::UnknownKey('a')
        ));
    }
}
