//! Cache persistence and validity.
//!
//! A cache is valid for a log only when its version equals
//! [`CACHE_VERSION`] and its `source_hash` equals the truncated SHA-256 of
//! the current log bytes. Writes go to a temporary file in the same
//! directory which is then renamed over the cache, so readers never see a
//! partial file.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

use bt_core::{CACHE_VERSION, Cache};
use errors::CacheError;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::loader::BeatsPaths;

/// Load the cache. A missing file is `Ok(None)`; an undecodable file is a
/// [`CacheError::Decode`].
pub fn load_cache(paths: &BeatsPaths) -> Result<Option<Cache>, CacheError> {
    let path = paths.cache_path();
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(CacheError::Io { path, source })
    };

    serde_json::from_reader(BufReader::new(file))
        .map(Some)
        .map_err(|e| CacheError::Decode {
            path,
            reason: e.to_string()
        })
}

/// Atomically replace the cache with `cache`, pretty-printed with two-space
/// indentation.
pub fn save_cache(paths: &BeatsPaths, cache: &Cache) -> Result<(), CacheError> {
    let dir = paths.dir();
    let path = paths.cache_path();

    let tmp = NamedTempFile::new_in(dir).map_err(|source| CacheError::Io {
        path: dir.to_path_buf(),
        source
    })?;

    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer_pretty(&mut writer, cache).map_err(|e| CacheError::Encode {
            reason: e.to_string()
        })?;
        writer.write_all(b"\n").map_err(|source| CacheError::Io {
            path: tmp.path().to_path_buf(),
            source
        })?;
        writer.flush().map_err(|source| CacheError::Io {
            path: tmp.path().to_path_buf(),
            source
        })?;
    }

    tmp.persist(&path).map_err(|e| CacheError::Persist {
        path: path.clone(),
        reason: e.error.to_string()
    })?;

    debug!(path = %path.display(), "Cache saved");
    Ok(())
}

/// First 16 hex characters of SHA-256 over the raw log bytes; empty when
/// the log does not exist.
pub fn compute_source_hash(paths: &BeatsPaths) -> Result<String, CacheError> {
    let path = paths.log_path();
    match std::fs::read(&path) {
        Ok(bytes) => Ok(utils::compute_source_hash_bytes(&bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(source) => Err(CacheError::Io { path, source })
    }
}

/// Version and source hash both match. Any error while hashing the log
/// makes the cache invalid.
pub fn is_valid(cache: &Cache, paths: &BeatsPaths) -> bool {
    match compute_source_hash(paths) {
        Ok(hash) => matches_source(cache, &hash),
        Err(_) => false
    }
}

/// Version and hash check against an already computed source hash.
pub fn matches_source(cache: &Cache, source_hash: &str) -> bool {
    cache.version == CACHE_VERSION && cache.source_hash == source_hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn paths_with_log(contents: &str) -> (TempDir, BeatsPaths) {
        let tmp = TempDir::new().unwrap();
        let paths = BeatsPaths::new(tmp.path());
        fs::write(paths.log_path(), contents).unwrap();
        (tmp, paths)
    }

    #[test]
    fn test_missing_cache_is_none() {
        let tmp = TempDir::new().unwrap();
        assert!(load_cache(&BeatsPaths::new(tmp.path())).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_cache_is_decode_error() {
        let (_tmp, paths) = paths_with_log("");
        fs::write(paths.cache_path(), "{ not json").unwrap();
        assert!(matches!(
            load_cache(&paths),
            Err(CacheError::Decode { .. })
        ));
    }

    #[test]
    fn test_source_hash_of_missing_log_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(compute_source_hash(&BeatsPaths::new(tmp.path())).unwrap(), "");
    }

    #[test]
    fn test_validity_tracks_version_and_hash() {
        let (_tmp, paths) = paths_with_log("{\"id\":\"a\"}\n");
        let hash = compute_source_hash(&paths).unwrap();
        assert_eq!(hash.len(), 16);

        let mut cache = Cache::new(hash);
        assert!(is_valid(&cache, &paths));

        cache.version = "0.1.0".to_string();
        assert!(!is_valid(&cache, &paths));
        cache.version = CACHE_VERSION.to_string();

        fs::write(paths.log_path(), "{\"id\":\"a\"}\n{\"id\":\"b\"}\n").unwrap();
        assert!(!is_valid(&cache, &paths));
    }

    #[test]
    fn test_matches_source_checks_version_and_hash() {
        let mut cache = Cache::new("abc");
        assert!(matches_source(&cache, "abc"));
        assert!(!matches_source(&cache, "abd"));
        cache.version = "0.1.0".to_string();
        assert!(!matches_source(&cache, "abc"));
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let (tmp, paths) = paths_with_log("");
        save_cache(&paths, &Cache::new("")).unwrap();
        let names: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2, "unexpected files: {names:?}");

        let text = fs::read_to_string(paths.cache_path()).unwrap();
        assert!(text.contains("\n  \"version\": \"0.2.0\""));
    }
}
