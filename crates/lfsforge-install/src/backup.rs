//! Pre-image snapshot and rollback for a target root. The snapshot is a directory-level copy, taken and
//! restored while excluding the `.backup` directory itself.

use camino::Utf8Path;

const BACKUP_DIR_NAME: &str = ".backup";

/// Copies everything under `target_root` (except `.backup`) into
/// `backup_dir`.
pub fn snapshot(target_root: &Utf8Path, backup_dir: &Utf8Path) -> std::io::Result<()> {
    std::fs::create_dir_all(backup_dir.as_std_path())?;
    copy_tree(target_root.as_std_path(), backup_dir.as_std_path())
}

/// Restores `target_root` from `backup_dir`: clears every entry under
/// `target_root` except `.backup`, then copies the snapshot back in.
pub fn restore(target_root: &Utf8Path, backup_dir: &Utf8Path) -> std::io::Result<()> {
    clear_except_backup(target_root.as_std_path())?;
    copy_tree(backup_dir.as_std_path(), target_root.as_std_path())
}

fn copy_tree(src: &std::path::Path, dst: &std::path::Path) -> std::io::Result<()> {
    if !src.is_dir() {
        return Ok(());
    }
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let name = entry.file_name();
        if name == BACKUP_DIR_NAME {
            continue;
        }
        let src_path = entry.path();
        let dst_path = dst.join(&name);
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_tree(&src_path, &dst_path)?;
        } else if file_type.is_symlink() {
            let link_target = std::fs::read_link(&src_path)?;
            let _ = std::fs::remove_file(&dst_path);
            #[cfg(unix)]
            std::os::unix::fs::symlink(&link_target, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

fn clear_except_backup(target_root: &std::path::Path) -> std::io::Result<()> {
    if !target_root.is_dir() {
        return Ok(());
    }
    for entry in std::fs::read_dir(target_root)? {
        let entry = entry?;
        if entry.file_name() == BACKUP_DIR_NAME {
            continue;
        }
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            std::fs::remove_dir_all(&path)?;
        } else {
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}
