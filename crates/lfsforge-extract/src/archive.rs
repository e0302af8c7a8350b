use std::fs::File;
use std::io::Read;

use camino::Utf8Path;
use lfsforge_core::ExtractError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveKind {
    TarGz,
    TarXz,
    TarBz2,
    Zip,
    /// A plain single-file gzip, not a tar.
    GzFile,
}

/// Extract `archive` into `dest`. Archive family is
/// detected primarily by content-sniffing magic bytes, falling back to
/// the file extension.
pub fn extract(archive: &Utf8Path, dest: &Utf8Path) -> Result<(), ExtractError> {
    std::fs::create_dir_all(dest.as_std_path())?;
    let kind = detect_kind(archive)?;

    let outcome = match kind {
        ArchiveKind::TarGz => {
            let file = File::open(archive.as_std_path())?;
            extract_tar(flate2::read::GzDecoder::new(file), dest)
        }
        ArchiveKind::TarXz => {
            let file = File::open(archive.as_std_path())?;
            extract_tar(xz2::read::XzDecoder::new(file), dest)
        }
        ArchiveKind::TarBz2 => {
            let file = File::open(archive.as_std_path())?;
            extract_tar(bzip2::read::BzDecoder::new(file), dest)
        }
        ArchiveKind::Zip => extract_zip(archive, dest),
        ArchiveKind::GzFile => extract_bare_gzip(archive, dest),
    };

    outcome.map_err(|reason| ExtractError::ExtractFailed {
        archive: archive.to_string(),
        reason: reason.to_string(),
    })
}

fn extract_tar<R: Read>(reader: R, dest: &Utf8Path) -> anyhow::Result<()> {
    let mut archive = tar::Archive::new(reader);
    archive.unpack(dest.as_std_path())?;
    Ok(())
}

fn extract_zip(path: &Utf8Path, dest: &Utf8Path) -> anyhow::Result<()> {
    let file = File::open(path.as_std_path())?;
    let mut zip = zip::ZipArchive::new(file)?;
    zip.extract(dest.as_std_path())?;
    Ok(())
}

/// `gcc.tar.gz` -> skip (handled by `extract_tar`); a bare `foo.gz`
/// extracts to `foo`.
fn extract_bare_gzip(path: &Utf8Path, dest: &Utf8Path) -> anyhow::Result<()> {
    let file = File::open(path.as_std_path())?;
    let mut decoder = flate2::read::GzDecoder::new(file);
    let out_name = path.file_stem().unwrap_or("output");
    let out_path = dest.join(out_name);
    let mut out = File::create(out_path.as_std_path())?;
    std::io::copy(&mut decoder, &mut out)?;
    Ok(())
}

fn detect_kind(path: &Utf8Path) -> Result<ArchiveKind, ExtractError> {
    let sniffed = infer::get_from_path(path.as_std_path())
        .map_err(|e| ExtractError::ExtractFailed {
            archive: path.to_string(),
            reason: e.to_string(),
        })?
        .map(|k| k.mime_type());

    match sniffed {
        Some("application/gzip") => resolve_gzip_kind(path),
        Some("application/x-xz") => Ok(ArchiveKind::TarXz),
        Some("application/x-bzip2") => Ok(ArchiveKind::TarBz2),
        Some("application/zip") => Ok(ArchiveKind::Zip),
        _ => detect_kind_by_extension(path),
    }
}

/// Distinguishes `tar.gz` from a bare single-file `.gz` by peeking at
/// the decompressed stream for the POSIX tar `ustar` magic at its fixed
/// offset, since both share the same gzip magic bytes.
fn resolve_gzip_kind(path: &Utf8Path) -> Result<ArchiveKind, ExtractError> {
    let file = File::open(path.as_std_path())?;
    let mut decoder = flate2::read::GzDecoder::new(file);
    let mut header = [0u8; 512];
    let mut read = 0;
    while read < header.len() {
        match decoder.read(&mut header[read..]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(_) => break,
        }
    }
    if read >= 262 && &header[257..262] == b"ustar" {
        Ok(ArchiveKind::TarGz)
    } else {
        Ok(ArchiveKind::GzFile)
    }
}

fn detect_kind_by_extension(path: &Utf8Path) -> Result<ArchiveKind, ExtractError> {
    let name = path.as_str().to_ascii_lowercase();
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Ok(ArchiveKind::TarGz)
    } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
        Ok(ArchiveKind::TarXz)
    } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
        Ok(ArchiveKind::TarBz2)
    } else if name.ends_with(".zip") {
        Ok(ArchiveKind::Zip)
    } else if name.ends_with(".gz") {
        Ok(ArchiveKind::GzFile)
    } else {
        Err(ExtractError::ExtractFailed {
            archive: path.to_string(),
            reason: "unrecognized archive type".to_string(),
        })
    }
}
