use crate::model::DiffFile;
use crate::parser;
use anyhow::Result;
use git_executor::git_command_executor::GitCommandExecutor;
use tracing::instrument;

const DIFF_ARGS: &[&str] = &["diff", "--full-index"];

/// Working-tree diff against `HEAD` (`git diff --full-index`).
#[instrument(skip(executor))]
pub fn working_tree_diff(executor: &GitCommandExecutor, repository_path: &str) -> Result<Vec<DiffFile>> {
  let output = executor.execute_command_raw(DIFF_ARGS, repository_path)?;
  Ok(parser::parse(&output))
}

/// Diff introduced by a single commit against its first parent
/// (`git diff --full-index <commit>^ <commit>`).
#[instrument(skip(executor))]
pub fn commit_diff(executor: &GitCommandExecutor, repository_path: &str, commit_hash: &str) -> Result<Vec<DiffFile>> {
  let parent = format!("{commit_hash}^");
  let mut args = DIFF_ARGS.to_vec();
  args.push(&parent);
  args.push(commit_hash);
  let output = executor.execute_command_raw(&args, repository_path)?;
  Ok(parser::parse(&output))
}

/// Diff between two arbitrary revisions (`git diff --full-index <from> <to>`).
#[instrument(skip(executor))]
pub fn diff_between(executor: &GitCommandExecutor, repository_path: &str, from: &str, to: &str) -> Result<Vec<DiffFile>> {
  let mut args = DIFF_ARGS.to_vec();
  args.push(from);
  args.push(to);
  let output = executor.execute_command_raw(&args, repository_path)?;
  Ok(parser::parse(&output))
}

/// Single file's record out of [`diff_between`], if the path appears in it.
#[instrument(skip(executor))]
pub fn diff_file_between(executor: &GitCommandExecutor, repository_path: &str, from: &str, to: &str, path: &str) -> Result<Option<DiffFile>> {
  let files = diff_between(executor, repository_path, from, to)?;
  Ok(files.into_iter().find(|f| f.new_path == path || f.old_path == path))
}
