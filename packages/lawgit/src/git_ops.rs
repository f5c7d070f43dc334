use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use chrono::{DateTime, FixedOffset};

use crate::error::{LawgitError, Result};

/// Wrapper around git CLI operations on a laws repository.
pub struct GitRepo {
    path: PathBuf,
}

impl GitRepo {
    /// Open an existing checkout.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.join(".git").exists() {
            return Err(LawgitError::Git {
                message: format!("{} is not a git repository", path.display()),
                stderr: String::new(),
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Clone a repository or open an existing one at the given path.
    ///
    /// Returns the repository and whether it was freshly cloned.
    pub fn clone_or_open(url: &str, path: &Path) -> Result<(Self, bool)> {
        let git_dir = path.join(".git");
        let cloned = if git_dir.exists() {
            tracing::info!(path = %path.display(), "opening existing git repo");
            false
        } else {
            tracing::info!(url, path = %path.display(), "cloning git repo");
            run_git(Path::new("."), &["clone", url, &path.to_string_lossy()])?;
            true
        };
        Ok((
            Self {
                path: path.to_path_buf(),
            },
            cloned,
        ))
    }

    /// Pull latest changes with fast-forward only.
    pub fn pull(&self) -> Result<()> {
        run_git(&self.path, &["pull", "--ff-only"])?;
        Ok(())
    }

    /// Working tree status in NUL-separated porcelain format.
    pub fn status(&self) -> Result<String> {
        run_git(
            &self.path,
            &["status", "--porcelain", "-z", "--untracked-files=all"],
        )
    }

    /// Whether the repository has at least one commit.
    pub fn has_head(&self) -> Result<bool> {
        Ok(git_output(&self.path, &["rev-parse", "--verify", "--quiet", "HEAD"])?
            .status
            .success())
    }

    /// Patch of a file's working tree state against HEAD.
    pub fn diff_head(&self, file: &str) -> Result<String> {
        run_git(&self.path, &["diff", "HEAD", "--", file])
    }

    /// Content of a file at HEAD, if it exists there.
    pub fn show_head(&self, file: &str) -> Result<Option<String>> {
        let output = git_output(&self.path, &["show", &format!("HEAD:{file}")])?;
        if !output.status.success() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
    }

    /// Commit the working tree state of `paths` on top of `branch` without
    /// checking it out. HEAD, the index and the working tree stay as they
    /// are. Returns `false` if the branch already has exactly that state.
    pub fn commit_to_branch(&self, branch: &str, message: &str, paths: &[&str]) -> Result<bool> {
        let reference = format!("refs/heads/{branch}");
        let parent = run_git(&self.path, &["rev-parse", "--verify", &reference])?;
        let parent = parent.trim();

        let index = TempIndex::new(&self.path)?;
        index.run(&["read-tree", parent])?;
        let mut args = vec!["add", "-A", "--"];
        args.extend_from_slice(paths);
        index.run(&args)?;
        let tree = index.run(&["write-tree"])?;
        let tree = tree.trim();

        let parent_tree = run_git(&self.path, &["rev-parse", &format!("{parent}^{{tree}}")])?;
        if parent_tree.trim() == tree {
            tracing::debug!(branch, "nothing to commit");
            return Ok(false);
        }

        let commit = run_git(&self.path, &["commit-tree", tree, "-p", parent, "-m", message])?;
        run_git(&self.path, &["update-ref", &reference, commit.trim(), parent])?;
        Ok(true)
    }

    pub fn current_branch(&self) -> Result<String> {
        Ok(run_git(&self.path, &["rev-parse", "--abbrev-ref", "HEAD"])?
            .trim()
            .to_string())
    }

    pub fn branch_exists(&self, name: &str) -> Result<bool> {
        let reference = format!("refs/heads/{name}");
        Ok(git_output(&self.path, &["rev-parse", "--verify", "--quiet", &reference])?
            .status
            .success())
    }

    pub fn checkout(&self, name: &str) -> Result<()> {
        run_git(&self.path, &["checkout", name])?;
        Ok(())
    }

    /// Create `name` at `start` without checking it out.
    pub fn create_branch(&self, name: &str, start: &str) -> Result<()> {
        run_git(&self.path, &["branch", name, start])?;
        Ok(())
    }

    /// Merge `branch` into the current branch.
    ///
    /// On conflicts the merge is aborted, leaving the current branch as it
    /// was, and `MergeConflict` is returned.
    pub fn merge(&self, branch: &str, no_ff: bool) -> Result<()> {
        let mut args = vec!["merge", "--no-edit"];
        if no_ff {
            args.push("--no-ff");
        }
        args.push(branch);

        let output = git_output(&self.path, &args)?;
        if output.status.success() {
            return Ok(());
        }

        let merging = git_output(&self.path, &["rev-parse", "--verify", "--quiet", "MERGE_HEAD"])?
            .status
            .success();
        if merging {
            tracing::warn!(branch, "merge conflict, aborting merge");
            run_git(&self.path, &["merge", "--abort"])?;
            return Err(LawgitError::MergeConflict {
                branch: branch.to_string(),
            });
        }
        Err(failure(&args, &output))
    }

    /// Stash the local changes of `paths`, untracked files included.
    /// Returns `false` if there was nothing to stash.
    pub fn stash_push(&self, paths: &[&str]) -> Result<bool> {
        let before = self.stash_count()?;
        let mut args = vec!["stash", "push", "--include-untracked", "--"];
        args.extend_from_slice(paths);
        run_git(&self.path, &args)?;
        Ok(self.stash_count()? > before)
    }

    pub fn stash_pop(&self) -> Result<()> {
        run_git(&self.path, &["stash", "pop"])?;
        Ok(())
    }

    pub fn stash_drop(&self) -> Result<()> {
        run_git(&self.path, &["stash", "drop"])?;
        Ok(())
    }

    fn stash_count(&self) -> Result<usize> {
        Ok(run_git(&self.path, &["stash", "list"])?.lines().count())
    }

    /// Committer date of HEAD.
    pub fn head_commit_date(&self) -> Result<DateTime<FixedOffset>> {
        let output = run_git(&self.path, &["log", "-1", "--format=%cI"])?;
        DateTime::parse_from_rfc3339(output.trim()).map_err(|e| LawgitError::Git {
            message: format!("unreadable commit date '{}': {e}", output.trim()),
            stderr: String::new(),
        })
    }

    /// Return the path to the repository.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// An index file of its own, removed again on drop.
struct TempIndex {
    repo_path: PathBuf,
    file: PathBuf,
}

impl TempIndex {
    fn new(repo_path: &Path) -> Result<Self> {
        let location = run_git(repo_path, &["rev-parse", "--git-path", "lawgit-index"])?;
        let file = repo_path.join(location.trim());
        if file.exists() {
            fs::remove_file(&file)?;
        }
        Ok(Self {
            repo_path: repo_path.to_path_buf(),
            file,
        })
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = git_command(&self.repo_path, args)
            .env("GIT_INDEX_FILE", &self.file)
            .output()
            .map_err(spawn_failure)?;
        checked(args, output)
    }
}

impl Drop for TempIndex {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.file) {
            tracing::debug!(error = %e, "temporary index not removed");
        }
    }
}

fn git_command(repo_path: &Path, args: &[&str]) -> Command {
    tracing::debug!(cwd = %repo_path.display(), args = ?args, "running git command");
    let mut command = Command::new("git");
    command.args(args).current_dir(repo_path);
    command
}

fn spawn_failure(e: std::io::Error) -> LawgitError {
    LawgitError::Git {
        message: format!("failed to execute git: {e}"),
        stderr: String::new(),
    }
}

/// Execute a git command without judging its exit status.
fn git_output(repo_path: &Path, args: &[&str]) -> Result<Output> {
    git_command(repo_path, args).output().map_err(spawn_failure)
}

/// Execute a git command in the given directory and return stdout.
fn run_git(repo_path: &Path, args: &[&str]) -> Result<String> {
    checked(args, git_output(repo_path, args)?)
}

/// Stdout of a finished git command, or its failure.
fn checked(args: &[&str], output: Output) -> Result<String> {
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !output.status.success() {
        return Err(failure(args, &output));
    }

    if !stderr.is_empty() {
        tracing::debug!(stderr = %stderr, "git stderr (non-fatal)");
    }

    Ok(stdout)
}

fn failure(args: &[&str], output: &Output) -> LawgitError {
    LawgitError::Git {
        message: format!(
            "git {} failed with exit code {:?}",
            args.join(" "),
            output.status.code()
        ),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}
