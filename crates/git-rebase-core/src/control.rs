use crate::error::RebaseError;
use crate::model::RebaseInstruction;
use crate::todo;
use git_executor::git_command_executor::GitCommandExecutor;
use std::fs;
use std::path::PathBuf;

const REBASE_DIR: &str = "rebase-merge";

const HEAD_NAME: &str = "head-name";
const ONTO: &str = "onto";
const ORIG_HEAD: &str = "orig-head";
const GIT_REBASE_TODO: &str = "git-rebase-todo";
const DONE: &str = "done";
const AUTHOR_SCRIPT: &str = "author-script";
const MESSAGE: &str = "message";
const AMEND: &str = "amend";
const CURRENT_FIXUPS: &str = "current-fixups";
const REWRITTEN_PENDING: &str = "rewritten-pending";
const REWRITTEN_LIST: &str = "rewritten-list";
const STOPPED_SHA: &str = "stopped-sha";

/// The set of files under `<git-dir>/rebase-merge/` (plus the sibling
/// `REBASE_HEAD`) that together encode resumable rebase state. Every
/// method here operates on one named slot; the engine (`rebase.rs`)
/// composes them into the operations the public contract needs.
pub struct ControlStore {
  rebase_dir: PathBuf,
  rebase_head_path: PathBuf,
  orig_head_sibling_path: PathBuf,
}

impl ControlStore {
  pub fn open(executor: &GitCommandExecutor, repo_path: &str) -> Result<Self, RebaseError> {
    let git_dir_output = executor
      .execute_command(&["rev-parse", "--git-dir"], repo_path)
      .map_err(|e| RebaseError::NotARepository { path: format!("{repo_path} ({e})") })?;
    let git_dir = PathBuf::from(repo_path).join(git_dir_output.trim());

    Ok(Self {
      rebase_dir: git_dir.join(REBASE_DIR),
      rebase_head_path: git_dir.join("REBASE_HEAD"),
      orig_head_sibling_path: git_dir.join("ORIG_HEAD"),
    })
  }

  /// A rebase is in progress iff `git-rebase-todo` exists (the engine's
  /// own `is_in_progress()` contract), regardless of whether the todo
  /// list itself is currently empty.
  pub fn is_in_progress(&self) -> bool {
    self.slot_path(GIT_REBASE_TODO).exists()
  }

  pub fn create_dir(&self) -> Result<(), RebaseError> {
    fs::create_dir_all(&self.rebase_dir).map_err(|e| self.io_err("rebase-merge", e))
  }

  pub fn delete_all(&self) -> Result<(), RebaseError> {
    if self.rebase_dir.exists() {
      fs::remove_dir_all(&self.rebase_dir).map_err(|e| self.io_err("rebase-merge", e))?;
    }
    self.remove_rebase_head()
  }

  fn slot_path(&self, slot: &str) -> PathBuf {
    self.rebase_dir.join(slot)
  }

  fn io_err(&self, slot: &'static str, e: std::io::Error) -> RebaseError {
    RebaseError::ControlFile { slot, reason: e.to_string() }
  }

  fn get(&self, slot: &'static str) -> Option<String> {
    fs::read_to_string(self.slot_path(slot)).ok()
  }

  fn set(&self, slot: &'static str, content: &str) -> Result<(), RebaseError> {
    let mut content = content.to_string();
    if !content.ends_with('\n') {
      content.push('\n');
    }
    fs::write(self.slot_path(slot), content).map_err(|e| self.io_err(slot, e))
  }

  fn remove(&self, slot: &'static str) -> Result<(), RebaseError> {
    match fs::remove_file(self.slot_path(slot)) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(self.io_err(slot, e)),
    }
  }

  fn append_line(&self, slot: &'static str, line: &str) -> Result<(), RebaseError> {
    use std::io::Write;
    let mut file = fs::OpenOptions::new().create(true).append(true).open(self.slot_path(slot)).map_err(|e| self.io_err(slot, e))?;
    writeln!(file, "{line}").map_err(|e| self.io_err(slot, e))
  }

  fn lines(&self, slot: &'static str) -> Vec<String> {
    self.get(slot).map(|text| text.lines().map(str::to_string).collect()).unwrap_or_default()
  }

  pub fn create_head_name(&self, branch_ref: &str) -> Result<(), RebaseError> {
    self.set(HEAD_NAME, branch_ref)
  }

  pub fn get_head_name(&self) -> Option<String> {
    self.get(HEAD_NAME).map(|s| s.trim().to_string())
  }

  pub fn create_onto(&self, onto: &str) -> Result<(), RebaseError> {
    self.set(ONTO, onto)
  }

  /// Writes both `rebase-merge/orig-head` and the sibling `<git-dir>/ORIG_HEAD`
  /// that records the pre-rebase tip, mirroring `createOrigHeadFiles` (plural).
  pub fn create_orig_head(&self, orig_head: &str) -> Result<(), RebaseError> {
    self.set(ORIG_HEAD, orig_head)?;
    let mut content = orig_head.to_string();
    if !content.ends_with('\n') {
      content.push('\n');
    }
    fs::write(&self.orig_head_sibling_path, content).map_err(|e| self.io_err("ORIG_HEAD", e))
  }

  pub fn get_orig_head(&self) -> Option<String> {
    self.get(ORIG_HEAD).map(|s| s.trim().to_string())
  }

  pub fn create_author_script(&self, name: &str, email: &str, date: &str) -> Result<(), RebaseError> {
    self.set(AUTHOR_SCRIPT, &format!("GIT_AUTHOR_NAME={name}\nGIT_AUTHOR_EMAIL={email}\nGIT_AUTHOR_DATE={date}"))
  }

  /// Returns `(name, email, date)` from the three `GIT_AUTHOR_*` lines.
  pub fn get_author_script(&self) -> Option<(String, String, String)> {
    let text = self.get(AUTHOR_SCRIPT)?;
    let mut lines = text.lines();
    let name = lines.next()?.strip_prefix("GIT_AUTHOR_NAME=")?.to_string();
    let email = lines.next()?.strip_prefix("GIT_AUTHOR_EMAIL=")?.to_string();
    let date = lines.next()?.strip_prefix("GIT_AUTHOR_DATE=")?.to_string();
    Some((name, email, date))
  }

  pub fn remove_author_script(&self) -> Result<(), RebaseError> {
    self.remove(AUTHOR_SCRIPT)
  }

  pub fn create_amend(&self, hash: &str) -> Result<(), RebaseError> {
    self.set(AMEND, hash)
  }

  pub fn get_amend(&self) -> Option<String> {
    self.get(AMEND).map(|s| s.trim().to_string())
  }

  pub fn remove_amend(&self) -> Result<(), RebaseError> {
    self.remove(AMEND)
  }

  pub fn create_message(&self, message: &str) -> Result<(), RebaseError> {
    self.set(MESSAGE, message)
  }

  pub fn get_message(&self) -> String {
    self.get(MESSAGE).unwrap_or_default().trim_end_matches('\n').to_string()
  }

  pub fn remove_message(&self) -> Result<(), RebaseError> {
    self.remove(MESSAGE)
  }

  pub fn get_rebase_head(&self) -> Option<String> {
    fs::read_to_string(&self.rebase_head_path).ok().map(|s| s.trim().to_string())
  }

  pub fn create_rebase_head(&self, hash: &str) -> Result<(), RebaseError> {
    let mut content = hash.to_string();
    if !content.ends_with('\n') {
      content.push('\n');
    }
    fs::write(&self.rebase_head_path, content).map_err(|e| self.io_err("REBASE_HEAD", e))
  }

  pub fn remove_rebase_head(&self) -> Result<(), RebaseError> {
    match fs::remove_file(&self.rebase_head_path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(self.io_err("REBASE_HEAD", e)),
    }
  }

  pub fn create_stopped_sha(&self, hash: &str) -> Result<(), RebaseError> {
    self.set(STOPPED_SHA, hash)
  }

  pub fn remove_stopped_sha(&self) -> Result<(), RebaseError> {
    self.remove(STOPPED_SHA)
  }

  pub fn generate_todo(&self, instructions: &[RebaseInstruction]) -> Result<(), RebaseError> {
    fs::write(self.slot_path(GIT_REBASE_TODO), todo::serialise_todo_text(instructions)).map_err(|e| self.io_err(GIT_REBASE_TODO, e))
  }

  fn todo_lines(&self) -> Vec<String> {
    self.lines(GIT_REBASE_TODO)
  }

  pub fn peek_todo(&self) -> Option<RebaseInstruction> {
    let first = self.todo_lines().into_iter().next()?;
    todo::parse_line(&first).ok()
  }

  pub fn pop_todo(&self) -> Result<(), RebaseError> {
    let mut lines = self.todo_lines();
    if !lines.is_empty() {
      lines.remove(0);
    }
    let mut text = lines.join("\n");
    if !lines.is_empty() {
      text.push('\n');
    }
    fs::write(self.slot_path(GIT_REBASE_TODO), text).map_err(|e| self.io_err(GIT_REBASE_TODO, e))
  }

  pub fn peek_and_pop_todo(&self) -> Result<Option<RebaseInstruction>, RebaseError> {
    let Some(instruction) = self.peek_todo() else {
      return Ok(None);
    };
    self.pop_todo()?;
    Ok(Some(instruction))
  }

  pub fn append_done(&self, instruction: &RebaseInstruction) -> Result<(), RebaseError> {
    self.append_line(DONE, &todo::serialise_line(instruction))
  }

  pub fn get_last_done(&self) -> Option<RebaseInstruction> {
    let last = self.lines(DONE).into_iter().next_back()?;
    todo::parse_line(&last).ok()
  }

  pub fn append_rewritten_list(&self, hash_before: &str, hash_after: &str) -> Result<(), RebaseError> {
    self.append_line(REWRITTEN_LIST, &format!("{hash_before} {hash_after}"))
  }

  pub fn append_rewritten_pending(&self, hash: &str) -> Result<(), RebaseError> {
    self.append_line(REWRITTEN_PENDING, hash)
  }

  /// Flushes every pending source hash into `rewritten-list`, each mapped
  /// to `new_hash`, then removes the pending file.
  pub fn move_rewritten_pending_to_list(&self, new_hash: &str) -> Result<(), RebaseError> {
    for hash_before in self.lines(REWRITTEN_PENDING) {
      self.append_rewritten_list(&hash_before, new_hash)?;
    }
    self.remove(REWRITTEN_PENDING)
  }

  pub fn append_current_fixup(&self, instruction: &RebaseInstruction) -> Result<(), RebaseError> {
    let verb = instruction.kind.long_form();
    self.append_line(CURRENT_FIXUPS, &format!("{verb} {}", instruction.hash))
  }

  pub fn any_squash_in_current_fixup(&self) -> bool {
    self.lines(CURRENT_FIXUPS).iter().any(|line| line.starts_with("squash "))
  }

  pub fn remove_current_fixup(&self) -> Result<(), RebaseError> {
    self.remove(CURRENT_FIXUPS)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use test_utils::git_test_utils::TestRepo;

  fn open(repo: &TestRepo) -> ControlStore {
    let executor = GitCommandExecutor::new();
    ControlStore::open(&executor, repo.path().to_str().unwrap()).unwrap()
  }

  #[test]
  fn dir_lifecycle_is_idempotent() {
    let repo = TestRepo::new();
    repo.create_commit("initial", "a.txt", "a");
    let store = open(&repo);

    assert!(!store.is_in_progress());
    store.create_dir().unwrap();
    store.generate_todo(&[]).unwrap();
    assert!(store.is_in_progress());

    store.delete_all().unwrap();
    assert!(!store.is_in_progress());
    // deleting twice must not error
    store.delete_all().unwrap();
  }

  #[test]
  fn rewritten_pending_flushes_to_list() {
    let repo = TestRepo::new();
    repo.create_commit("initial", "a.txt", "a");
    let store = open(&repo);
    store.create_dir().unwrap();

    store.append_rewritten_pending("aaa").unwrap();
    store.append_rewritten_pending("bbb").unwrap();
    store.move_rewritten_pending_to_list("zzz").unwrap();

    let list = store.get("rewritten-list").unwrap_or_default();
    assert_eq!(list, "aaa zzz\nbbb zzz\n");
    assert!(store.get("rewritten-pending").is_none());
  }

  #[test]
  fn todo_peek_and_pop_walks_the_list() {
    let repo = TestRepo::new();
    repo.create_commit("initial", "a.txt", "a");
    let store = open(&repo);
    store.create_dir().unwrap();

    let instructions = vec![
      RebaseInstruction {
        kind: crate::model::InstructionKind::Pick,
        hash: "aaa".into(),
        message: "first".into(),
      },
      RebaseInstruction {
        kind: crate::model::InstructionKind::Pick,
        hash: "bbb".into(),
        message: "second".into(),
      },
    ];
    store.generate_todo(&instructions).unwrap();

    let first = store.peek_and_pop_todo().unwrap().unwrap();
    assert_eq!(first.hash, "aaa");
    let second = store.peek_and_pop_todo().unwrap().unwrap();
    assert_eq!(second.hash, "bbb");
    assert!(store.peek_and_pop_todo().unwrap().is_none());
  }
}
