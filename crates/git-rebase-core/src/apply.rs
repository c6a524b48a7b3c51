use anyhow::{Result, anyhow};
use git_executor::git_command_executor::GitCommandExecutor;
use tracing::instrument;

/// Outcome of replaying one commit's tree delta on top of the current
/// head. `Clean`/`Conflict` leave the working tree and index updated;
/// `NoChanges`/`EmptyDiff` leave them untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
  Clean,
  NoChanges,
  EmptyDiff,
  Conflict,
}

/// Replays `commit_hash`'s change on top of `HEAD`, delegating the actual
/// three-way merge to the git CLI's own cherry-pick machinery rather than
/// reimplementing it. Fast-forward detection is the caller's
/// responsibility (the rebase engine checks it before ever calling this).
///
/// On conflict the index is left with unmerged entries and the working
/// tree carries conflict markers, exactly as a native `git cherry-pick`
/// would leave them; the sequencer's own bookkeeping (`CHERRY_PICK_HEAD`)
/// is discarded immediately via `--quit` so it can never collide with this
/// crate's own control directory. Re-invoking on an already-conflicted
/// index reports `Conflict` again without further side effects.
#[instrument(skip(executor))]
pub fn apply(executor: &GitCommandExecutor, repo_path: &str, commit_hash: &str) -> Result<ApplyOutcome> {
  let parent_ref = format!("{commit_hash}^");
  let parent_hash = executor.execute_command(&["rev-parse", &parent_ref], repo_path)?;
  let commit_tree = tree_of(executor, repo_path, commit_hash)?;
  let parent_tree = tree_of(executor, repo_path, &parent_hash)?;
  let head_tree = tree_of(executor, repo_path, "HEAD")?;

  if commit_tree == parent_tree {
    return Ok(ApplyOutcome::EmptyDiff);
  }
  if commit_tree == head_tree {
    return Ok(ApplyOutcome::NoChanges);
  }

  let (_, exit_code) = executor.execute_command_with_status(&["cherry-pick", "--no-commit", "--keep-redundant-commits", commit_hash], repo_path)?;

  // Drop the sequencer's own checkpoint regardless of outcome: this crate
  // tracks progress itself under rebase-merge/, and a leftover
  // CHERRY_PICK_HEAD would make the next cherry-pick invocation refuse to
  // start.
  let _ = executor.execute_command(&["cherry-pick", "--quit"], repo_path);

  match exit_code {
    0 => Ok(ApplyOutcome::Clean),
    1 => Ok(ApplyOutcome::Conflict),
    other => Err(anyhow!("git cherry-pick exited with unexpected code {other}")),
  }
}

#[instrument(skip(executor))]
fn tree_of(executor: &GitCommandExecutor, repo_path: &str, commit_ish: &str) -> Result<String> {
  executor.execute_command(&["rev-parse", &format!("{commit_ish}^{{tree}}")], repo_path)
}
