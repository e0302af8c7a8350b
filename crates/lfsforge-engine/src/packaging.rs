//! The stripped/packaged pipeline edges: ELF stripping over a built
//! destdir and archiving it into the packages directory with a
//! content-hash sidecar.

use std::io::Read;
use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use lfsforge_config::ArchiveType;
use lfsforge_core::InstallError;
use lfsforge_fslayout::FsLayout;
use lfsforge_utils::checksum::{digest_file, ChecksumAlgo};

/// Walk `destdir` and run `strip --strip-unneeded` over every ELF file
/// found. A single file's strip failure is logged and skipped rather
/// than aborting the whole walk.
pub fn strip_destdir(destdir: &Utf8Path) -> std::io::Result<usize> {
    let mut stripped = 0;
    for path in walk_files(destdir.as_std_path())? {
        if is_elf(&path).unwrap_or(false) {
            match Command::new("strip").arg("--strip-unneeded").arg(&path).status() {
                Ok(status) if status.success() => stripped += 1,
                Ok(status) => tracing::warn!(?path, ?status, "strip exited non-zero; leaving binary as-is"),
                Err(e) => tracing::warn!(?path, %e, "failed to spawn strip; leaving binary as-is"),
            }
        }
    }
    Ok(stripped)
}

fn is_elf(path: &std::path::Path) -> std::io::Result<bool> {
    let mut file = std::fs::File::open(path)?;
    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(&magic == b"\x7fELF"),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

fn walk_files(dir: &std::path::Path) -> std::io::Result<Vec<std::path::PathBuf>> {
    let mut files = Vec::new();
    if !dir.is_dir() {
        return Ok(files);
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            files.extend(walk_files(&path)?);
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

/// Outcome of [`package_destdir`]: the archive path and its sha256.
pub struct PackagedArtifact {
    pub path: Utf8PathBuf,
    pub sha256: String,
}

/// Archive `destdir`'s contents into `<packages>/<name>-<version>.<ext>`
/// and write the `.sha256`
/// sidecar.
pub fn package_destdir(
    layout: &FsLayout,
    name: &str,
    version: &str,
    destdir: &Utf8Path,
    archive_type: ArchiveType,
) -> Result<PackagedArtifact, InstallError> {
    let artifact = layout.package_artifact(name, version, archive_type.extension());
    if let Some(parent) = artifact.parent() {
        std::fs::create_dir_all(parent.as_std_path())?;
    }

    write_archive(destdir, &artifact, archive_type).map_err(|e| InstallError::PackageFailed {
        package: name.to_string(),
        reason: e.to_string(),
    })?;

    let sha256 = digest_file(artifact.as_std_path(), ChecksumAlgo::Sha256).map_err(|e| {
        InstallError::PackageFailed {
            package: name.to_string(),
            reason: format!("failed to hash packaged artifact: {e}"),
        }
    })?;

    let sidecar = layout.package_checksum_sidecar(&artifact);
    let basename = artifact.file_name().unwrap_or("artifact");
    std::fs::write(sidecar.as_std_path(), format!("{sha256}  {basename}\n"))?;

    Ok(PackagedArtifact {
        path: artifact,
        sha256,
    })
}

fn write_archive(
    destdir: &Utf8Path,
    artifact: &Utf8Path,
    archive_type: ArchiveType,
) -> anyhow::Result<()> {
    let file = std::fs::File::create(artifact.as_std_path())?;
    match archive_type {
        ArchiveType::TarXz => {
            let encoder = xz2::write::XzEncoder::new(file, 6);
            let mut builder = tar::Builder::new(encoder);
            builder.append_dir_all(".", destdir.as_std_path())?;
            builder.into_inner()?.finish()?;
        }
        ArchiveType::TarGz => {
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);
            builder.append_dir_all(".", destdir.as_std_path())?;
            builder.into_inner()?.finish()?;
        }
        ArchiveType::TarBz2 => {
            let encoder = bzip2::write::BzEncoder::new(file, bzip2::Compression::default());
            let mut builder = tar::Builder::new(encoder);
            builder.append_dir_all(".", destdir.as_std_path())?;
            builder.into_inner()?.finish()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lfsforge_config::Config;

    #[test]
    fn packages_destdir_and_writes_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let layout = FsLayout::new(Config {
            root: root.join(".lfsforge"),
            ..Config::default()
        });
        layout.ensure().unwrap();

        let destdir = root.join("destdir");
        std::fs::create_dir_all(destdir.join("usr/bin").as_std_path()).unwrap();
        std::fs::write(destdir.join("usr/bin/hello").as_std_path(), b"not elf").unwrap();

        let artifact = package_destdir(&layout, "hello", "1.0", &destdir, ArchiveType::TarGz).unwrap();
        assert!(artifact.path.as_std_path().exists());
        assert_eq!(artifact.sha256.len(), 64);

        let sidecar = layout.package_checksum_sidecar(&artifact.path);
        let contents = std::fs::read_to_string(sidecar.as_std_path()).unwrap();
        assert!(contents.starts_with(&artifact.sha256));
    }

    #[test]
    fn non_elf_file_is_left_alone_by_strip() {
        let dir = tempfile::tempdir().unwrap();
        let destdir = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        std::fs::write(destdir.join("notes.txt").as_std_path(), b"plain text").unwrap();
        let stripped = strip_destdir(&destdir).unwrap();
        assert_eq!(stripped, 0);
    }
}
