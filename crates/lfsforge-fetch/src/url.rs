use std::thread;

use camino::Utf8Path;
use lfsforge_core::FetchError;
use lfsforge_fslayout::FsLayout;
use lfsforge_utils::backoff::ExponentialBackoff;
use lfsforge_utils::checksum::verify_file;

const RETRIES_PER_MIRROR: u32 = 3;

/// Outcome of a successful `fetch_url`.
#[derive(Debug, Clone)]
pub struct UrlOutcome {
    pub path: camino::Utf8PathBuf,
    pub verified_sha256: Option<String>,
}

/// Fetch `url` (falling back through `mirrors` in order) into
/// `dest_dir/filename`, verifying `expected_sum` if given.
pub fn fetch_url(
    client: &reqwest::blocking::Client,
    url: &str,
    dest_dir: &Utf8Path,
    filename: &str,
    expected_sum: Option<&str>,
    mirrors: &[String],
    layout: &FsLayout,
) -> Result<UrlOutcome, FetchError> {
    std::fs::create_dir_all(dest_dir.as_std_path())?;
    let dest = dest_dir.join(filename);

    if dest.as_std_path().exists() {
        match expected_sum {
            None => {
                return Ok(UrlOutcome {
                    path: dest,
                    verified_sha256: None,
                });
            }
            Some(sum) => match verify_file(dest.as_std_path(), sum) {
                Ok(true) => {
                    return Ok(UrlOutcome {
                        path: dest,
                        verified_sha256: Some(sum.to_string()),
                    });
                }
                Ok(false) => {
                    let _ = layout.corrupted_quarantine(&dest);
                }
                Err(_) => return Err(FetchError::UnsupportedChecksum(sum.to_string())),
            },
        }
    }

    let backoff = ExponentialBackoff::default_5s();
    let mut last_error = String::new();

    for candidate in std::iter::once(url).chain(mirrors.iter().map(String::as_str)) {
        match download_with_retries(client, candidate, &dest, &backoff) {
            Ok(()) => match expected_sum {
                None => {
                    return Ok(UrlOutcome {
                        path: dest,
                        verified_sha256: None,
                    });
                }
                Some(sum) => match verify_file(dest.as_std_path(), sum) {
                    Ok(true) => {
                        return Ok(UrlOutcome {
                            path: dest,
                            verified_sha256: Some(sum.to_string()),
                        });
                    }
                    Ok(false) => {
                        let actual = lfsforge_utils::checksum::infer_algo(sum)
                            .and_then(|algo| {
                                lfsforge_utils::checksum::digest_file(dest.as_std_path(), algo).ok()
                            })
                            .unwrap_or_else(|| "unknown".to_string());
                        let _ = layout.corrupted_quarantine(&dest);
                        last_error =
                            format!("checksum mismatch for {candidate}: expected {sum}, got {actual}");
                        continue;
                    }
                    Err(_) => return Err(FetchError::UnsupportedChecksum(sum.to_string())),
                },
            },
            Err(e) => {
                last_error = e;
                continue;
            }
        }
    }

    Err(FetchError::AllMirrorsFailed {
        url: url.to_string(),
        last_error,
    })
}

fn download_with_retries(
    client: &reqwest::blocking::Client,
    url: &str,
    dest: &camino::Utf8PathBuf,
    backoff: &ExponentialBackoff,
) -> Result<(), String> {
    let mut last_error = String::new();
    for attempt in 0..RETRIES_PER_MIRROR {
        match download_once(client, url, dest) {
            Ok(()) => return Ok(()),
            Err(e) => {
                last_error = e;
                let _ = std::fs::remove_file(dest.as_std_path());
                if attempt + 1 < RETRIES_PER_MIRROR {
                    thread::sleep(backoff.delay_for(attempt));
                }
            }
        }
    }
    Err(last_error)
}

fn download_once(
    client: &reqwest::blocking::Client,
    url: &str,
    dest: &camino::Utf8PathBuf,
) -> Result<(), String> {
    let mut response = client
        .get(url)
        .send()
        .map_err(|e| format!("request to {url} failed: {e}"))?
        .error_for_status()
        .map_err(|e| format!("{url} returned an error status: {e}"))?;

    let mut file = std::fs::File::create(dest.as_std_path())
        .map_err(|e| format!("failed to create {dest}: {e}"))?;
    response
        .copy_to(&mut file)
        .map_err(|e| format!("failed to write response body for {url}: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lfsforge_config::Config;

    fn layout_in(dir: &std::path::Path) -> FsLayout {
        let root = camino::Utf8PathBuf::from_path_buf(dir.to_path_buf()).unwrap();
        FsLayout::new(Config {
            root,
            ..Config::default()
        })
    }

    #[test]
    fn existing_file_with_no_checksum_counts_as_success() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout_in(dir.path());
        let dest_dir = layout.sources("gcc");
        std::fs::create_dir_all(dest_dir.as_std_path()).unwrap();
        std::fs::write(dest_dir.join("gcc.tar.xz").as_std_path(), b"cached").unwrap();

        let client = reqwest::blocking::Client::new();
        let outcome = fetch_url(
            &client,
            "https://example.org/gcc.tar.xz",
            &dest_dir,
            "gcc.tar.xz",
            None,
            &[],
            &layout,
        )
        .unwrap();
        assert!(outcome.verified_sha256.is_none());
    }

    #[test]
    fn existing_file_with_matching_checksum_skips_redownload() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout_in(dir.path());
        let dest_dir = layout.sources("gcc");
        std::fs::create_dir_all(dest_dir.as_std_path()).unwrap();
        let content = b"cached-content";
        std::fs::write(dest_dir.join("gcc.tar.xz").as_std_path(), content).unwrap();
        let sum = lfsforge_utils::checksum::digest_file(
            dest_dir.join("gcc.tar.xz").as_std_path(),
            lfsforge_utils::checksum::ChecksumAlgo::Sha256,
        )
        .unwrap();

        let client = reqwest::blocking::Client::new();
        let outcome = fetch_url(
            &client,
            "https://example.org/gcc.tar.xz",
            &dest_dir,
            "gcc.tar.xz",
            Some(&sum),
            &[],
            &layout,
        )
        .unwrap();
        assert_eq!(outcome.verified_sha256, Some(sum));
    }

    #[test]
    fn existing_file_with_mismatched_checksum_is_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout_in(dir.path());
        let dest_dir = layout.sources("gcc");
        std::fs::create_dir_all(dest_dir.as_std_path()).unwrap();
        std::fs::write(dest_dir.join("gcc.tar.xz").as_std_path(), b"stale").unwrap();

        let client = reqwest::blocking::Client::new();
        let wrong_sum = "a".repeat(64);
        // No network reachable in tests, so re-download fails; the
        // important assertion is that the stale file was quarantined
        // rather than left in the cache.
        let _ = fetch_url(
            &client,
            "https://example.invalid/gcc.tar.xz",
            &dest_dir,
            "gcc.tar.xz",
            Some(&wrong_sum),
            &[],
            &layout,
        );
        assert!(!dest_dir.join("gcc.tar.xz").as_std_path().exists());
        assert!(layout.config().corrupted_dir().as_std_path().is_dir());
    }

    #[test]
    fn unsupported_checksum_format_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let layout = layout_in(dir.path());
        let dest_dir = layout.sources("gcc");
        std::fs::create_dir_all(dest_dir.as_std_path()).unwrap();
        std::fs::write(dest_dir.join("gcc.tar.xz").as_std_path(), b"cached").unwrap();

        let client = reqwest::blocking::Client::new();
        let err = fetch_url(
            &client,
            "https://example.org/gcc.tar.xz",
            &dest_dir,
            "gcc.tar.xz",
            Some("not-a-real-checksum"),
            &[],
            &layout,
        )
        .unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedChecksum(_)));
    }
}
