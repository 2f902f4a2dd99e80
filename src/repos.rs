//! Keep local clones of the configured repositories on their branch.
//!
//! Repositories are handled one after another. A missing clone is created; an existing one
//! is fetched and fast-forwarded. Divergent history stops the run with an error instead of
//! being merged or skipped.

use serde::Deserialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, info_span, warn};

use crate::error::{LocError, Result};

/// One `[[repo]]` entry of `repos.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RepoSpec {
    pub name: String,
    pub url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Local checkout, relative to the project root
    pub path: PathBuf,
}

fn default_branch() -> String {
    "main".to_string()
}

/// What happened to one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoOutcome {
    Cloned,
    UpToDate,
    FastForwarded { from: String, to: String },
    /// Local commits not on the remote; left as is
    Ahead,
    /// Dry run: the action that would have been taken
    Planned(String),
}

/// Version-control operations the runner needs.
pub trait Vcs {
    fn clone_branch(&self, url: &str, branch: &str, dest: &Path) -> Result<()>;
    fn fetch(&self, repo: &Path, branch: &str) -> Result<()>;
    fn checkout(&self, repo: &Path, branch: &str) -> Result<()>;
    /// Commit id of `rev`
    fn rev_parse(&self, repo: &Path, rev: &str) -> Result<String>;
    /// True when `ancestor` is reachable from `descendant`
    fn is_ancestor(&self, repo: &Path, ancestor: &str, descendant: &str) -> Result<bool>;
    fn fast_forward(&self, repo: &Path, branch: &str) -> Result<()>;
}

pub struct RepoRunner<V: Vcs> {
    vcs: V,
    dry_run: bool,
}

impl<V: Vcs> RepoRunner<V> {
    pub fn new(vcs: V, dry_run: bool) -> Self {
        Self { vcs, dry_run }
    }

    /// Sync every repository in order, stopping at the first failure.
    pub fn sync_all(&self, repos: &[RepoSpec]) -> Result<Vec<(String, RepoOutcome)>> {
        let mut outcomes = Vec::with_capacity(repos.len());
        for repo in repos {
            let span = info_span!("repo", name = %repo.name);
            let _enter = span.enter();
            let outcome = self.sync_one(repo)?;
            info!(?outcome, "repository synced");
            outcomes.push((repo.name.clone(), outcome));
        }
        Ok(outcomes)
    }

    pub fn sync_one(&self, repo: &RepoSpec) -> Result<RepoOutcome> {
        if !repo.path.exists() {
            if self.dry_run {
                return Ok(RepoOutcome::Planned(format!(
                    "clone {} ({}) into {}",
                    repo.url,
                    repo.branch,
                    repo.path.display()
                )));
            }
            self.vcs.clone_branch(&repo.url, &repo.branch, &repo.path)?;
            return Ok(RepoOutcome::Cloned);
        }
        if self.dry_run {
            return Ok(RepoOutcome::Planned(format!(
                "fetch and fast-forward {} to origin/{}",
                repo.path.display(),
                repo.branch
            )));
        }

        self.vcs.fetch(&repo.path, &repo.branch)?;
        self.vcs.checkout(&repo.path, &repo.branch)?;
        let remote_ref = format!("origin/{}", repo.branch);
        let local = self.vcs.rev_parse(&repo.path, "HEAD")?;
        let remote = self.vcs.rev_parse(&repo.path, &remote_ref)?;
        if local == remote {
            return Ok(RepoOutcome::UpToDate);
        }
        if self.vcs.is_ancestor(&repo.path, &local, &remote)? {
            self.vcs.fast_forward(&repo.path, &repo.branch)?;
            return Ok(RepoOutcome::FastForwarded {
                from: local,
                to: remote,
            });
        }
        if self.vcs.is_ancestor(&repo.path, &remote, &local)? {
            warn!(branch = %repo.branch, "local branch is ahead of origin, leaving it");
            return Ok(RepoOutcome::Ahead);
        }
        Err(LocError::Divergent {
            repo: repo.name.clone(),
            branch: repo.branch.clone(),
        })
    }
}

/// [`Vcs`] backed by the `git` command line.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
        }
    }
}

impl GitCli {
    fn run<I, S>(&self, repo: &Path, args: I) -> Result<std::process::Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| LocError::Vcs {
                repo: repo.display().to_string(),
                message: format!("failed to start {}: {}", self.program, e),
            })
    }

    /// Run and require success; returns trimmed stdout.
    fn call<I, S>(&self, repo: &Path, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self.run(repo, args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LocError::Vcs {
                repo: repo.display().to_string(),
                message: stderr.trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Vcs for GitCli {
    fn clone_branch(&self, url: &str, branch: &str, dest: &Path) -> Result<()> {
        let dest_arg = dest.as_os_str();
        self.call(
            dest,
            [
                OsStr::new("clone"),
                OsStr::new("--branch"),
                OsStr::new(branch),
                OsStr::new(url),
                dest_arg,
            ],
        )?;
        Ok(())
    }

    fn fetch(&self, repo: &Path, branch: &str) -> Result<()> {
        self.call(
            repo,
            [
                OsStr::new("-C"),
                repo.as_os_str(),
                OsStr::new("fetch"),
                OsStr::new("origin"),
                OsStr::new(branch),
            ],
        )?;
        Ok(())
    }

    fn checkout(&self, repo: &Path, branch: &str) -> Result<()> {
        self.call(
            repo,
            [OsStr::new("-C"), repo.as_os_str(), OsStr::new("checkout"), OsStr::new(branch)],
        )?;
        Ok(())
    }

    fn rev_parse(&self, repo: &Path, rev: &str) -> Result<String> {
        self.call(
            repo,
            [OsStr::new("-C"), repo.as_os_str(), OsStr::new("rev-parse"), OsStr::new(rev)],
        )
    }

    fn is_ancestor(&self, repo: &Path, ancestor: &str, descendant: &str) -> Result<bool> {
        let output = self.run(
            repo,
            [
                OsStr::new("-C"),
                repo.as_os_str(),
                OsStr::new("merge-base"),
                OsStr::new("--is-ancestor"),
                OsStr::new(ancestor),
                OsStr::new(descendant),
            ],
        )?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(LocError::Vcs {
                repo: repo.display().to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    fn fast_forward(&self, repo: &Path, branch: &str) -> Result<()> {
        let remote_ref = format!("origin/{}", branch);
        self.call(
            repo,
            [
                OsStr::new("-C"),
                repo.as_os_str(),
                OsStr::new("merge"),
                OsStr::new("--ff-only"),
                OsStr::new(&remote_ref),
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Scripted VCS; `ancestry` lists (a, b) pairs where a is an ancestor of b.
    #[derive(Default)]
    struct FakeVcs {
        local: String,
        remote: String,
        ancestry: Vec<(String, String)>,
        calls: RefCell<Vec<String>>,
    }

    impl Vcs for FakeVcs {
        fn clone_branch(&self, url: &str, branch: &str, _dest: &Path) -> Result<()> {
            self.calls.borrow_mut().push(format!("clone {url} {branch}"));
            Ok(())
        }
        fn fetch(&self, _repo: &Path, branch: &str) -> Result<()> {
            self.calls.borrow_mut().push(format!("fetch {branch}"));
            Ok(())
        }
        fn checkout(&self, _repo: &Path, branch: &str) -> Result<()> {
            self.calls.borrow_mut().push(format!("checkout {branch}"));
            Ok(())
        }
        fn rev_parse(&self, _repo: &Path, rev: &str) -> Result<String> {
            Ok(if rev == "HEAD" { self.local.clone() } else { self.remote.clone() })
        }
        fn is_ancestor(&self, _repo: &Path, a: &str, b: &str) -> Result<bool> {
            Ok(self.ancestry.iter().any(|(x, y)| x == a && y == b))
        }
        fn fast_forward(&self, _repo: &Path, branch: &str) -> Result<()> {
            self.calls.borrow_mut().push(format!("ff {branch}"));
            Ok(())
        }
    }

    fn spec(path: &Path) -> RepoSpec {
        RepoSpec {
            name: "mod".into(),
            url: "https://example.invalid/mod.git".into(),
            branch: "main".into(),
            path: path.to_path_buf(),
        }
    }

    #[test]
    fn test_missing_clone_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RepoRunner::new(FakeVcs::default(), false);
        let outcome = runner.sync_one(&spec(&dir.path().join("absent"))).unwrap();
        assert_eq!(outcome, RepoOutcome::Cloned);
        assert_eq!(runner.vcs.calls.borrow()[0], "clone https://example.invalid/mod.git main");
    }

    #[test]
    fn test_behind_is_fast_forwarded() {
        let dir = tempfile::tempdir().unwrap();
        let vcs = FakeVcs {
            local: "a1".into(),
            remote: "b2".into(),
            ancestry: vec![("a1".into(), "b2".into())],
            ..Default::default()
        };
        let runner = RepoRunner::new(vcs, false);
        let outcome = runner.sync_one(&spec(dir.path())).unwrap();
        assert_eq!(outcome, RepoOutcome::FastForwarded { from: "a1".into(), to: "b2".into() });
        assert_eq!(*runner.vcs.calls.borrow(), vec!["fetch main", "checkout main", "ff main"]);
    }

    #[test]
    fn test_divergent_history_fails_loudly() {
        let dir = tempfile::tempdir().unwrap();
        let vcs = FakeVcs {
            local: "a1".into(),
            remote: "b2".into(),
            ..Default::default()
        };
        let runner = RepoRunner::new(vcs, false);
        let err = runner.sync_all(&[spec(dir.path())]).unwrap_err();
        assert!(matches!(err, LocError::Divergent { .. }));
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let runner = RepoRunner::new(FakeVcs::default(), true);
        let outcomes = runner
            .sync_all(&[spec(dir.path()), spec(&dir.path().join("absent"))])
            .unwrap();
        assert!(outcomes.iter().all(|(_, o)| matches!(o, RepoOutcome::Planned(_))));
        assert!(runner.vcs.calls.borrow().is_empty());
    }

    #[test]
    fn test_repos_toml_parses_with_default_branch() {
        #[derive(Deserialize)]
        struct File {
            repo: Vec<RepoSpec>,
        }
        let file: File = toml::from_str(
            "[[repo]]\nname = \"ru\"\nurl = \"git@host:ru.git\"\npath = \"_upstream/ru\"\n",
        )
        .unwrap();
        assert_eq!(file.repo[0].branch, "main");
    }
}
