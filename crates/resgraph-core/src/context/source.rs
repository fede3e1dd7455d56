use crate::error::{Error, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Read-only view of source files split into lines, loaded on first use.
#[derive(Debug, Default)]
pub struct SourceCache {
    files: RefCell<HashMap<String, Rc<Vec<String>>>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register in-memory source text for `path`, replacing any cached copy.
    pub fn insert(&self, path: impl Into<String>, text: &str) {
        self.files
            .borrow_mut()
            .insert(path.into(), Rc::new(split_lines(text)));
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.borrow().contains_key(path)
    }

    fn file(&self, path: &str) -> Result<Rc<Vec<String>>> {
        if let Some(lines) = self.files.borrow().get(path) {
            return Ok(Rc::clone(lines));
        }
        let text = std::fs::read_to_string(Path::new(path)).map_err(|source| Error::SourceRead {
            path: PathBuf::from(path),
            source,
        })?;
        let lines = Rc::new(split_lines(&text));
        self.files
            .borrow_mut()
            .insert(path.to_string(), Rc::clone(&lines));
        Ok(lines)
    }

    /// Lines `start..=end` (1-based) as `(line_no, text)`, clamped to the
    /// file length.
    pub fn lines(&self, path: &str, start: usize, end: usize) -> Result<Vec<(usize, String)>> {
        let file = self.file(path)?;
        let first = start.max(1);
        let last = end.min(file.len());
        if first > last {
            return Ok(Vec::new());
        }
        Ok((first..=last)
            .map(|line_no| (line_no, file[line_no - 1].clone()))
            .collect())
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(|l| l.trim_end_matches('\r').to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_from_memory() {
        let cache = SourceCache::new();
        cache.insert("/a.tf", "one\ntwo\r\nthree\nfour\n");
        let lines = cache.lines("/a.tf", 2, 3).unwrap();
        assert_eq!(lines, vec![(2, "two".to_string()), (3, "three".to_string())]);
    }

    #[test]
    fn test_lines_clamped() {
        let cache = SourceCache::new();
        cache.insert("/a.tf", "one\ntwo");
        assert_eq!(cache.lines("/a.tf", 0, 10).unwrap().len(), 2);
        assert!(cache.lines("/a.tf", 5, 10).unwrap().is_empty());
    }

    #[test]
    fn test_lines_from_disk_are_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.tf");
        std::fs::write(&path, "a\nb\nc\n").unwrap();
        let path = path.to_string_lossy().to_string();

        let cache = SourceCache::new();
        assert_eq!(cache.lines(&path, 3, 3).unwrap(), vec![(3, "c".to_string())]);
        assert!(cache.contains(&path));
    }

    #[test]
    fn test_missing_file() {
        let cache = SourceCache::new();
        let err = cache.lines("/does/not/exist.tf", 1, 2).unwrap_err();
        assert!(matches!(err, Error::SourceRead { .. }));
    }
}
