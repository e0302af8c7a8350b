use std::process::Command;

use camino::Utf8Path;
use lfsforge_core::FetchError;

/// Outcome of a successful `fetch_git`: the short commit id checked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOutcome {
    pub commit: String,
}

/// Clone or update `repo` into `dest_dir`.
pub fn fetch_git(
    repo: &str,
    dest_dir: &Utf8Path,
    git_ref: Option<&str>,
    depth: Option<u32>,
    submodules: bool,
) -> Result<GitOutcome, FetchError> {
    if dest_dir.join(".git").as_std_path().is_dir() {
        update_existing(repo, dest_dir, git_ref, submodules)?;
    } else {
        clone_fresh(repo, dest_dir, git_ref, depth, submodules)?;
    }
    short_commit(dest_dir, repo)
}

fn update_existing(
    repo: &str,
    dest_dir: &Utf8Path,
    git_ref: Option<&str>,
    submodules: bool,
) -> Result<(), FetchError> {
    run_git(dest_dir, repo, &["fetch", "--prune", "origin"])?;

    if let Some(r) = git_ref {
        // `checkout -B` creates the branch/ref locally if it doesn't
        // already exist, then we fast-forward it against the fetched ref.
        run_git(dest_dir, repo, &["checkout", "-B", r, &format!("origin/{r}")])
            .or_else(|_| run_git(dest_dir, repo, &["checkout", r]))?;
        run_git(dest_dir, repo, &["merge", "--ff-only", &format!("origin/{r}")])
            .or_else(|_| Ok(()))?;
    } else {
        run_git(dest_dir, repo, &["merge", "--ff-only", "@{u}"])?;
    }

    if submodules {
        run_git(
            dest_dir,
            repo,
            &["submodule", "update", "--init", "--recursive"],
        )?;
    }
    Ok(())
}

fn clone_fresh(
    repo: &str,
    dest_dir: &Utf8Path,
    git_ref: Option<&str>,
    depth: Option<u32>,
    submodules: bool,
) -> Result<(), FetchError> {
    if let Some(parent) = dest_dir.parent() {
        std::fs::create_dir_all(parent.as_std_path())?;
    }

    let mut args: Vec<String> = vec!["clone".to_string()];
    if let Some(d) = depth.filter(|d| *d > 0) {
        args.push("--depth".to_string());
        args.push(d.to_string());
        if let Some(r) = git_ref {
            args.push("--branch".to_string());
            args.push(r.to_string());
        }
    }
    args.push(repo.to_string());
    args.push(dest_dir.as_str().to_string());

    let args_ref: Vec<&str> = args.iter().map(String::as_str).collect();
    run_git_in(None, repo, &args_ref)?;

    if depth.filter(|d| *d > 0).is_none() {
        if let Some(r) = git_ref {
            run_git(dest_dir, repo, &["checkout", r])?;
        }
    }

    if submodules {
        run_git(
            dest_dir,
            repo,
            &["submodule", "update", "--init", "--recursive"],
        )?;
    }
    Ok(())
}

fn short_commit(dest_dir: &Utf8Path, repo: &str) -> Result<GitOutcome, FetchError> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .current_dir(dest_dir.as_std_path())
        .output()
        .map_err(|e| FetchError::GitFetchFailed {
            repo: repo.to_string(),
            reason: e.to_string(),
        })?;
    if !output.status.success() {
        return Err(FetchError::GitFetchFailed {
            repo: repo.to_string(),
            reason: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(GitOutcome {
        commit: String::from_utf8_lossy(&output.stdout).trim().to_string(),
    })
}

fn run_git(dir: &Utf8Path, repo: &str, args: &[&str]) -> Result<(), FetchError> {
    run_git_in(Some(dir), repo, args)
}

fn run_git_in(dir: Option<&Utf8Path>, repo: &str, args: &[&str]) -> Result<(), FetchError> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(dir) = dir {
        cmd.current_dir(dir.as_std_path());
    }
    let output = cmd.output().map_err(|e| FetchError::GitFetchFailed {
        repo: repo.to_string(),
        reason: e.to_string(),
    })?;
    if !output.status.success() {
        return Err(FetchError::GitFetchFailed {
            repo: repo.to_string(),
            reason: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_bare_repo(dir: &std::path::Path) {
        Command::new("git")
            .args(["init", "-q"])
            .current_dir(dir)
            .status()
            .unwrap();
        std::fs::write(dir.join("README"), "hello").unwrap();
        Command::new("git")
            .args(["-c", "user.email=t@t.t", "-c", "user.name=t"])
            .args(["add", "."])
            .current_dir(dir)
            .status()
            .unwrap();
        Command::new("git")
            .args(["-c", "user.email=t@t.t", "-c", "user.name=t"])
            .args(["commit", "-q", "-m", "init"])
            .current_dir(dir)
            .status()
            .unwrap();
    }

    #[test]
    fn clone_fresh_checks_out_head_and_reports_short_commit() {
        let upstream = tempfile::tempdir().unwrap();
        init_bare_repo(upstream.path());

        let dest = tempfile::tempdir().unwrap();
        let dest_dir = dest.path().join("checkout");
        let dest_dir = Utf8Path::from_path(&dest_dir).unwrap();

        let outcome = fetch_git(
            upstream.path().to_str().unwrap(),
            dest_dir,
            None,
            None,
            false,
        )
        .unwrap();
        assert_eq!(outcome.commit.len(), 7);
        assert!(dest_dir.join("README").as_std_path().exists());
    }

    #[test]
    fn update_existing_checkout_is_idempotent() {
        let upstream = tempfile::tempdir().unwrap();
        init_bare_repo(upstream.path());

        let dest = tempfile::tempdir().unwrap();
        let dest_dir = dest.path().join("checkout");
        let dest_dir = Utf8Path::from_path(&dest_dir).unwrap();

        fetch_git(upstream.path().to_str().unwrap(), dest_dir, None, None, false).unwrap();
        let second = fetch_git(upstream.path().to_str().unwrap(), dest_dir, None, None, false);
        assert!(second.is_ok());
    }
}
