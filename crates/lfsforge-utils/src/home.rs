//! Resolution of the lfsforge root directory (`LFSFORGE_HOME`, default
//! `.lfsforge` under the current directory), using a thread-local
//! test-override to avoid process-global env races across parallel tests.

use camino::Utf8PathBuf;
use std::cell::RefCell;

thread_local! {
    static THREAD_HOME: RefCell<Option<Utf8PathBuf>> = const { RefCell::new(None) };
}

/// The root directory lfsforge materializes `sources/`, `build/`,
/// `packages/`, `state/`, and `logs/` under.
pub fn lfsforge_home() -> Utf8PathBuf {
    if let Some(tl) = THREAD_HOME.with(|tl| tl.borrow().clone()) {
        return tl;
    }
    if let Ok(p) = std::env::var("LFSFORGE_HOME") {
        return Utf8PathBuf::from(p);
    }
    Utf8PathBuf::from(".lfsforge")
}

/// Override the home directory for the current thread only. Test-only.
#[cfg(any(test, feature = "test-utils"))]
pub fn set_thread_home_for_tests(path: Utf8PathBuf) {
    THREAD_HOME.with(|tl| *tl.borrow_mut() = Some(path));
}

/// Create an isolated temp directory and install it as this thread's home.
#[cfg(any(test, feature = "test-utils"))]
pub fn with_isolated_home() -> tempfile::TempDir {
    let td = tempfile::TempDir::new().expect("failed to create temp dir");
    let p = Utf8PathBuf::from_path_buf(td.path().to_path_buf()).unwrap();
    set_thread_home_for_tests(p);
    td
}

pub fn ensure_dir_all(path: &Utf8PathBuf) -> std::io::Result<()> {
    if !path.as_std_path().exists() {
        std::fs::create_dir_all(path.as_std_path())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_override_takes_precedence() {
        let guard = with_isolated_home();
        let expected = Utf8PathBuf::from_path_buf(guard.path().to_path_buf()).unwrap();
        assert_eq!(lfsforge_home(), expected);
    }
}
