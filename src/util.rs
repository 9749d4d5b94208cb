use memmap2::Mmap;
use std::collections::BTreeSet;
use std::path::Path;
use walkdir::WalkDir;

use crate::error::{Result, SearchError};

/// Memory-map a file for read-only access.
///
/// # Safety
/// The mapping is read-only. Callers must not concurrently truncate or replace
/// the underlying file while the `Mmap` is live.
pub fn mmap_file(path: &Path) -> Result<Mmap> {
    let file = std::fs::File::open(path).map_err(|source| SearchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    // SAFETY: We only read from this mapping; digit files are not modified during a run.
    unsafe {
        Mmap::map(&file).map_err(|source| SearchError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Collect the numbers of all files directly under `dir` that `parse` recognises.
pub fn numbered_files(dir: &Path, parse: impl Fn(&str) -> Option<u64>) -> Result<BTreeSet<u64>> {
    let mut found = BTreeSet::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| SearchError::Io {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(n) = entry.file_name().to_str().and_then(&parse) {
            found.insert(n);
        }
    }

    Ok(found)
}

/// Length of the run `first, first+1, ...` present in `numbers`.
pub fn consecutive_from(numbers: &BTreeSet<u64>, first: u64) -> u64 {
    let mut count = 0;
    while numbers.contains(&(first + count)) {
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_files_and_gaps() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["n-1", "n-2", "n-4", "other.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("n-3")).unwrap();

        let found = numbered_files(dir.path(), |name| name.strip_prefix("n-")?.parse().ok()).unwrap();
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec![1, 2, 4]);
    }

    #[test]
    fn test_consecutive_from() {
        let numbers: BTreeSet<u64> = [1, 2, 3, 5].into_iter().collect();
        assert_eq!(consecutive_from(&numbers, 1), 3);
        assert_eq!(consecutive_from(&numbers, 4), 0);
    }

    #[test]
    fn test_mmap_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = mmap_file(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, SearchError::Io { .. }));
    }
}
