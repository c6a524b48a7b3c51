use crate::model::Author;
use anyhow::Result;
use git_executor::git_command_executor::GitCommandExecutor;
use tracing::instrument;

fn message_and_description(message: &str, description: &str) -> String {
  if description.is_empty() {
    message.to_string()
  } else {
    format!("{message}\n\n{description}")
  }
}

fn author_env(author: &Author) -> Vec<(&str, &str)> {
  vec![("GIT_AUTHOR_NAME", author.name.as_str()), ("GIT_AUTHOR_EMAIL", author.email.as_str()), ("GIT_AUTHOR_DATE", author.date.as_str())]
}

/// Creates a single commit from the current index tree with the supplied
/// message, description, parents, and optional author override. Does not
/// move any reference — the caller advances `HEAD` itself.
#[instrument(skip(executor, author))]
pub fn create_commit(executor: &GitCommandExecutor, repo_path: &str, message: &str, description: &str, parents: &[&str], author: Option<&Author>) -> Result<String> {
  let tree = executor.execute_command(&["write-tree"], repo_path)?;
  let combined_message = message_and_description(message, description);

  let mut args = vec!["commit-tree", tree.as_str()];
  for parent in parents {
    args.push("-p");
    args.push(parent);
  }
  args.push("-m");
  args.push(&combined_message);

  let env_vars = author.map(author_env).unwrap_or_default();
  let hash = executor.execute_command_with_env(&args, repo_path, &env_vars)?;
  Ok(hash.trim().to_string())
}

/// Reads `name`/`email`/`date-iso` authorship off an existing commit, for
/// capturing the authorship of a commit about to be amended or replayed.
#[instrument(skip(executor))]
pub fn read_author(executor: &GitCommandExecutor, repo_path: &str, commit_hash: &str) -> Result<Author> {
  let format = "--format=%an%n%ae%n%ad";
  let output = executor.execute_command(&["show", "-s", format, "--date=raw", commit_hash], repo_path)?;
  let mut lines = output.lines();
  Ok(Author {
    name: lines.next().unwrap_or_default().to_string(),
    email: lines.next().unwrap_or_default().to_string(),
    date: lines.next().unwrap_or_default().to_string(),
  })
}

/// Replaces the current (detached) `HEAD` commit with a new commit over
/// the same parent, built from the current index tree. Keeps the existing
/// commit message when `message` is `None`; preserves authorship. Mirrors
/// `git commit --amend --no-edit`, expressed through the same
/// `write-tree` + `commit-tree` + `update-ref` primitives used elsewhere
/// in this crate so no extra working-tree state is touched.
#[instrument(skip(executor))]
pub fn amend_head(executor: &GitCommandExecutor, repo_path: &str, message: Option<&str>) -> Result<String> {
  let head = executor.execute_command(&["rev-parse", "HEAD"], repo_path)?;
  let parent = executor.execute_command(&["rev-parse", "HEAD^"], repo_path).unwrap_or_default();
  let author = read_author(executor, repo_path, &head)?;

  let final_message = match message {
    Some(message) => message.to_string(),
    None => executor.execute_command(&["show", "-s", "--format=%B", &head], repo_path)?,
  };

  let parents: Vec<&str> = if parent.is_empty() { vec![] } else { vec![parent.as_str()] };
  let new_hash = create_commit(executor, repo_path, &final_message, "", &parents, Some(&author))?;
  executor.execute_command(&["update-ref", "HEAD", &new_hash], repo_path)?;
  Ok(new_hash)
}
