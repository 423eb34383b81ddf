//! Markdown checklist backend.
//!
//! A directory of `*.md` notes; each file is one list named after its stem.
//!
//! ```text
//! # Groceries
//! - [ ] milk        ← active
//! - [x] bread       ← completed
//! some prose        ← preserved untouched
//! ```
//!
//! Every mutation rewrites the file with the `.tmp` + rename pattern.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use cartsync_core::{fsutil, ListRef};

use crate::error::RemoteError;
use crate::service::ListService;

const SERVICE: &str = "checklist";

/// A parsed checklist line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Entry<'a> {
    pub checked: bool,
    pub text: &'a str,
}

/// Parse `- [ ] text` / `* [x] text`, allowing leading indentation.
pub(crate) fn parse_line(line: &str) -> Option<Entry<'_>> {
    let rest = line.trim_start();
    let rest = rest
        .strip_prefix("- ")
        .or_else(|| rest.strip_prefix("* "))?;
    let (checked, text) = if let Some(text) = rest.strip_prefix("[ ]") {
        (false, text)
    } else if let Some(text) = rest
        .strip_prefix("[x]")
        .or_else(|| rest.strip_prefix("[X]"))
    {
        (true, text)
    } else {
        return None;
    };
    let text = match text.strip_prefix(' ') {
        Some(text) => text,
        None if text.is_empty() => text,
        None => return None,
    };
    Some(Entry { checked, text })
}

pub struct ChecklistService {
    dir: PathBuf,
}

impl ChecklistService {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn list_path(&self, list: &ListRef) -> PathBuf {
        self.dir.join(format!("{}.md", list.id))
    }

    fn read_lines(&self, list: &ListRef) -> Result<Vec<String>, RemoteError> {
        let path = self.list_path(list);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(RemoteError::unavailable(
                    SERVICE,
                    format!("list file {} does not exist", path.display()),
                ));
            }
            Err(err) => {
                return Err(RemoteError::unavailable(
                    SERVICE,
                    format!("read {}: {err}", path.display()),
                ));
            }
        };
        Ok(contents
            .lines()
            .map(|line| line.trim_end_matches('\r').to_string())
            .collect())
    }

    fn write_lines(&self, list: &ListRef, lines: &[String]) -> Result<(), RemoteError> {
        let path = self.list_path(list);
        let mut contents = lines.join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }
        fsutil::write_atomic(&path, contents.as_bytes(), false).map_err(|err| {
            RemoteError::unavailable(SERVICE, format!("write {}: {err}", path.display()))
        })
    }
}

impl ListService for ChecklistService {
    fn service_name(&self) -> &str {
        SERVICE
    }

    fn authenticate(&mut self) -> Result<(), RemoteError> {
        if self.dir.is_dir() {
            Ok(())
        } else {
            Err(RemoteError::unavailable(
                SERVICE,
                format!("checklist directory {} does not exist", self.dir.display()),
            ))
        }
    }

    fn available_lists(&mut self) -> Result<Vec<ListRef>, RemoteError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|err| {
            RemoteError::unavailable(SERVICE, format!("read {}: {err}", self.dir.display()))
        })?;
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| {
                p.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("md"))
                    .unwrap_or(false)
            })
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        names.sort();
        Ok(names
            .into_iter()
            .map(|name| ListRef::new(name.clone(), name))
            .collect())
    }

    fn active_items(&mut self, list: &ListRef) -> Result<Vec<String>, RemoteError> {
        let lines = self.read_lines(list)?;
        Ok(lines
            .iter()
            .filter_map(|line| parse_line(line))
            .filter(|entry| !entry.checked)
            .map(|entry| entry.text.to_string())
            .collect())
    }

    fn add_item(&mut self, list: &ListRef, name: &str) -> Result<(), RemoteError> {
        if name.contains(['\n', '\r']) {
            return Err(RemoteError::rejected(
                SERVICE,
                name,
                "checklist entries cannot span lines",
            ));
        }
        if name.trim().is_empty() {
            return Err(RemoteError::rejected(SERVICE, name, "blank item name"));
        }
        let mut lines = self.read_lines(list)?;
        lines.push(format!("- [ ] {name}"));
        self.write_lines(list, &lines)?;
        tracing::debug!("checklist {}: added '{}'", list.name, name);
        Ok(())
    }

    fn remove_item(&mut self, list: &ListRef, name: &str) -> Result<(), RemoteError> {
        let lines = self.read_lines(list)?;
        let before = lines.len();
        let kept: Vec<String> = lines
            .into_iter()
            .filter(|line| {
                !matches!(parse_line(line), Some(Entry { checked: false, text }) if text == name)
            })
            .collect();
        if kept.len() == before {
            tracing::debug!("checklist {}: '{}' already absent", list.name, name);
            return Ok(());
        }
        self.write_lines(list, &kept)?;
        tracing::debug!("checklist {}: removed '{}'", list.name, name);
        Ok(())
    }

    fn purge_completed(&mut self, list: &ListRef) -> Result<usize, RemoteError> {
        let lines = self.read_lines(list)?;
        let before = lines.len();
        let kept: Vec<String> = lines
            .into_iter()
            .filter(|line| !matches!(parse_line(line), Some(Entry { checked: true, .. })))
            .collect();
        let purged = before - kept.len();
        if purged > 0 {
            self.write_lines(list, &kept)?;
        }
        Ok(purged)
    }
}
