//! Version-control remote lookup.
//!
//! `remote_url` reports the target repository's remote so templates can fill
//! `repo_url`. The lookup is strictly optional: any failure degrades to
//! `None` and is only logged.
//!
//! The config file under `.git` is read first (with `rust-ini`), which needs
//! no subprocess. Only when that yields nothing for a real repository is the
//! `git` binary asked, with a hard timeout.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use ini::Ini;
use log::debug;

use crate::defaults::GIT_REMOTE_TIMEOUT;
use crate::error::{Error, Result};

const ORIGIN_REMOTE: &str = "origin";

/// Remote URL of the repository at `repo`, preferring `origin`.
pub fn remote_url(repo: &Path) -> Option<String> {
    let git_dir = git_dir(repo)?;
    match remote_from_config(&git_dir) {
        Ok(Some(url)) => return Some(url),
        Ok(None) => debug!("No remote configured in {}", git_dir.display()),
        Err(e) => debug!("{}", e),
    }
    match remote_from_command(repo, GIT_REMOTE_TIMEOUT) {
        Ok(url) => url,
        Err(e) => {
            debug!("{}", e);
            None
        }
    }
}

/// Locate the directory holding the repository's config, following the
/// `gitdir:` indirection used by worktrees and submodules.
fn git_dir(repo: &Path) -> Option<PathBuf> {
    let dot_git = repo.join(".git");
    if dot_git.is_dir() {
        return Some(dot_git);
    }
    let pointer = fs::read_to_string(&dot_git).ok()?;
    let target = pointer.lines().find_map(|l| l.strip_prefix("gitdir:"))?.trim();
    let dir = repo.join(target);

    // Worktrees keep their config in the main repository.
    match fs::read_to_string(dir.join("commondir")) {
        Ok(common) => Some(dir.join(common.trim())),
        Err(_) => Some(dir),
    }
}

fn remote_from_config(git_dir: &Path) -> Result<Option<String>> {
    let path = git_dir.join("config");
    let config = Ini::load_from_file_noescape(&path).map_err(|e| Error::Git {
        message: format!("cannot read {}: {}", path.display(), e),
    })?;

    // Remote names are quoted in the section header; compare without quotes.
    let remotes: Vec<(String, &str)> = config
        .iter()
        .filter_map(|(name, props)| {
            let remote = name?.strip_prefix("remote ")?.trim().trim_matches('"');
            Some((remote.to_string(), props.get("url")?))
        })
        .collect();

    let origin = remotes.iter().find(|(name, _)| name == ORIGIN_REMOTE);
    Ok(origin
        .or_else(|| remotes.first())
        .map(|(_, url)| url.to_string()))
}

fn remote_from_command(repo: &Path, timeout: Duration) -> Result<Option<String>> {
    let git_error = |message: String| Error::Git { message };

    let mut child = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(["config", "--get", "remote.origin.url"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| git_error(format!("failed to run git: {}", e)))?;

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(git_error(format!(
                "git did not answer within {}ms",
                timeout.as_millis()
            )));
        }
        thread::sleep(Duration::from_millis(10));
    };

    if !status.success() {
        return Ok(None);
    }
    let mut stdout = String::new();
    if let Some(mut out) = child.stdout.take() {
        out.read_to_string(&mut stdout)?;
    }
    let url = stdout.trim();
    Ok((!url.is_empty()).then(|| url.to_string()))
}
