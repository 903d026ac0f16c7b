//! Reading the append-only beats log and locating beats directories.

use std::path::{Path, PathBuf};

use bt_core::{Beat, Project};
use config::BeatsConfig;
use errors::BeatLogError;
use tracing::{debug, instrument};
use walkdir::WalkDir;

pub const BEATS_DIR_NAME: &str = ".beats";
pub const BEATS_FILE_NAME: &str = "beats.jsonl";

/// Directories never descended into during project discovery.
const SKIPPED_DIRS: &[&str] = &["node_modules", ".git", "vendor"];

/// Where a beats log and its cache live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeatsPaths {
    dir: PathBuf,
    log_file: String,
    cache_file: String
}

impl BeatsPaths {
    /// Default file names inside `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            log_file: BEATS_FILE_NAME.to_string(),
            cache_file: bt_core::CACHE_FILE_NAME.to_string()
        }
    }

    pub fn from_config(dir: impl Into<PathBuf>, config: &BeatsConfig) -> Self {
        Self {
            dir: dir.into(),
            log_file: config.log_file.clone(),
            cache_file: config.cache_file.clone()
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join(&self.log_file)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.dir.join(&self.cache_file)
    }
}

/// Parsed beats plus the raw bytes they were parsed from.
#[derive(Debug, Clone, Default)]
pub struct LogSnapshot {
    pub beats: Vec<Beat>,
    /// Empty when the log file does not exist
    pub bytes: Vec<u8>,
    pub exists: bool
}

impl LogSnapshot {
    /// Truncated hash of the bytes read; empty for a missing log.
    pub fn source_hash(&self) -> String {
        if self.exists {
            utils::compute_source_hash_bytes(&self.bytes)
        } else {
            String::new()
        }
    }
}

/// Read the raw log. A missing file is an empty snapshot.
pub fn read_log(paths: &BeatsPaths) -> Result<LogSnapshot, BeatLogError> {
    let path = paths.log_path();
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(LogSnapshot::default());
        }
        Err(source) => return Err(BeatLogError::Io { path, source })
    };

    let beats = parse_beats(&bytes);
    Ok(LogSnapshot {
        beats,
        bytes,
        exists: true
    })
}

/// Parse JSONL bytes, skipping blank and malformed lines. Newest first.
pub fn parse_beats(bytes: &[u8]) -> Vec<Beat> {
    let mut beats = Vec::new();
    for (line_no, line) in bytes.split(|b| *b == b'\n').enumerate() {
        let line = line.trim_ascii();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_slice::<Beat>(line) {
            Ok(beat) => beats.push(beat),
            Err(e) => debug!(line = line_no + 1, error = %e, "Skipping malformed beat line")
        }
    }
    sort_newest_first(&mut beats);
    beats
}

/// Load every beat in the log, newest first.
pub fn load_beats(paths: &BeatsPaths) -> Result<Vec<Beat>, BeatLogError> {
    Ok(read_log(paths)?.beats)
}

pub fn sort_newest_first(beats: &mut [Beat]) {
    beats.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Walk up from `start` to the nearest ancestor holding a `dir_name`
/// directory and return that directory.
pub fn find_beats_dir(start: &Path, dir_name: &str) -> Result<PathBuf, BeatLogError> {
    let absolute = std::path::absolute(start).map_err(|source| BeatLogError::Io {
        path: start.to_path_buf(),
        source
    })?;

    absolute
        .ancestors()
        .map(|ancestor| ancestor.join(dir_name))
        .find(|candidate| candidate.is_dir())
        .ok_or_else(|| BeatLogError::BeatsDirNotFound {
            start: start.to_path_buf()
        })
}

/// Every beats directory under `root`, largest first.
#[instrument(skip(config), fields(root = %root.display()))]
pub fn discover_projects(root: &Path, config: &BeatsConfig) -> Result<Vec<Project>, BeatLogError> {
    let root = std::path::absolute(root).map_err(|source| BeatLogError::Io {
        path: root.to_path_buf(),
        source
    })?;

    let mut projects = Vec::new();
    let mut walker = WalkDir::new(&root).into_iter();

    while let Some(entry) = walker.next() {
        let Ok(entry) = entry else {
            continue;
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if SKIPPED_DIRS.contains(&name.as_ref()) {
            walker.skip_current_dir();
            continue;
        }
        if name != config.dir_name.as_str() {
            continue;
        }

        let path = entry.path().to_path_buf();
        let project_name = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "root".to_string());

        match load_beats(&BeatsPaths::from_config(&path, config)) {
            Ok(beats) => projects.push(Project {
                name: project_name,
                path,
                beat_count: beats.len()
            }),
            Err(e) => debug!(error = %e, "Skipping unreadable project")
        }
        walker.skip_current_dir();
    }

    projects.sort_by(|a, b| b.beat_count.cmp(&a.beat_count));
    Ok(projects)
}

/// Case-insensitive substring match over content, impetus label and id.
pub fn matches_query(beat: &Beat, query: &str) -> bool {
    let query = query.to_lowercase();
    query.is_empty()
        || beat.content.to_lowercase().contains(&query)
        || beat.impetus.label.to_lowercase().contains(&query)
        || beat.id.to_lowercase().contains(&query)
}

pub fn search_beats<'a>(beats: &'a [Beat], query: &str) -> Vec<&'a Beat> {
    beats.iter().filter(|b| matches_query(b, query)).collect()
}

pub fn find_beat<'a>(beats: &'a [Beat], id: &str) -> Option<&'a Beat> {
    beats.iter().find(|b| b.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const LOG: &str = r#"{"id":"old","created_at":"2024-01-01T00:00:00Z","impetus":{"label":"Web"},"content":"older note"}
not json at all

{"id":"new","created_at":"2025-06-01T00:00:00Z","impetus":{"label":"Coaching"},"content":"Newer NOTE"}
{"id":"broken","created_at":
"#;

    fn write_log(dir: &Path, contents: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(BEATS_FILE_NAME), contents).unwrap();
    }

    #[test]
    fn test_load_skips_bad_lines_and_sorts_newest_first() {
        let tmp = TempDir::new().unwrap();
        write_log(tmp.path(), LOG);

        let beats = load_beats(&BeatsPaths::new(tmp.path())).unwrap();
        let ids: Vec<_> = beats.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[test]
    fn test_missing_log_is_empty() {
        let tmp = TempDir::new().unwrap();
        let snapshot = read_log(&BeatsPaths::new(tmp.path())).unwrap();
        assert!(snapshot.beats.is_empty());
        assert!(!snapshot.exists);
        assert_eq!(snapshot.source_hash(), "");
    }

    #[test]
    fn test_snapshot_hash_covers_raw_bytes() {
        let tmp = TempDir::new().unwrap();
        write_log(tmp.path(), LOG);
        let snapshot = read_log(&BeatsPaths::new(tmp.path())).unwrap();
        assert_eq!(
            snapshot.source_hash(),
            utils::compute_source_hash_bytes(LOG.as_bytes())
        );
    }

    #[test]
    fn test_find_beats_dir_walks_up() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(".beats")).unwrap();
        let nested = tmp.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();

        let found = find_beats_dir(&nested, BEATS_DIR_NAME).unwrap();
        assert!(found.ends_with(".beats"));
        assert!(found.starts_with(std::path::absolute(tmp.path()).unwrap()));
    }

    #[test]
    fn test_find_beats_dir_not_found() {
        let tmp = TempDir::new().unwrap();
        let result = find_beats_dir(tmp.path(), ".definitely-not-here");
        assert!(matches!(result, Err(BeatLogError::BeatsDirNotFound { .. })));
    }

    #[test]
    fn test_discover_projects_skips_vendor_dirs() {
        let tmp = TempDir::new().unwrap();
        write_log(&tmp.path().join("alpha/.beats"), LOG);
        write_log(
            &tmp.path().join("beta/.beats"),
            r#"{"id":"x","created_at":"2025-01-01T00:00:00Z","content":"x"}"#
        );
        write_log(&tmp.path().join("node_modules/pkg/.beats"), LOG);

        let projects = discover_projects(tmp.path(), &BeatsConfig::default()).unwrap();
        let names: Vec<_> = projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert_eq!(projects[0].beat_count, 2);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let beats = parse_beats(LOG.as_bytes());
        assert_eq!(search_beats(&beats, "note").len(), 2);
        assert_eq!(search_beats(&beats, "coaching").len(), 1);
        assert_eq!(search_beats(&beats, "OLD")[0].id, "old");
        assert_eq!(search_beats(&beats, "").len(), 2);
        assert!(find_beat(&beats, "new").is_some());
        assert!(find_beat(&beats, "missing").is_none());
    }
}
