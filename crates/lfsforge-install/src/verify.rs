//! Default install-verification predicate:
//! "confirm new files exist under the target root with recent mtime".

use camino::Utf8Path;
use std::time::SystemTime;

const BACKUP_DIR_NAME: &str = ".backup";

/// True if at least one regular file under `target_root` (excluding
/// `.backup`) has an mtime at or after `since`.
pub fn has_recent_files(target_root: &Utf8Path, since: SystemTime) -> std::io::Result<bool> {
    Ok(walk(target_root.as_std_path(), since)?)
}

fn walk(dir: &std::path::Path, since: SystemTime) -> std::io::Result<bool> {
    if !dir.is_dir() {
        return Ok(false);
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name() == BACKUP_DIR_NAME {
            continue;
        }
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if walk(&path, since)? {
                return Ok(true);
            }
        } else if file_type.is_file() {
            let mtime = entry.metadata()?.modified()?;
            if mtime >= since {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_a_freshly_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let since = SystemTime::now();
        std::thread::sleep(std::time::Duration::from_millis(10));
        std::fs::write(root.join("fresh.txt").as_std_path(), b"x").unwrap();
        assert!(has_recent_files(root, since).unwrap());
    }

    #[test]
    fn empty_root_has_no_recent_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        assert!(!has_recent_files(root, SystemTime::now()).unwrap());
    }

    #[test]
    fn ignores_files_under_the_backup_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let since = SystemTime::now();
        std::thread::sleep(std::time::Duration::from_millis(10));
        std::fs::create_dir_all(root.join(".backup").as_std_path()).unwrap();
        std::fs::write(root.join(".backup/old.txt").as_std_path(), b"x").unwrap();
        assert!(!has_recent_files(root, since).unwrap());
    }
}
