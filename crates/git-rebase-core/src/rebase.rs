use crate::apply::{self, ApplyOutcome};
use crate::commit;
use crate::control::ControlStore;
use crate::error::RebaseError;
use crate::model::{Author, CommitId, CommitInfo, InstructionKind, RebaseInstruction, RebaseOutcome, StopReason};
use git_executor::git_command_executor::GitCommandExecutor;
use tracing::instrument;

/// Rebases every commit reachable from `HEAD` but not from `upstream` onto
/// `upstream`, in the order `git log` would report them (oldest first).
#[instrument(skip(executor))]
pub fn rebase(executor: &GitCommandExecutor, repo_path: &str, upstream: &str) -> Result<RebaseOutcome, RebaseError> {
  let instructions = get_default_todo(executor, repo_path, upstream)?;
  run(executor, repo_path, upstream, instructions)
}

/// Same as [`rebase`] but replays a caller-supplied todo list instead of the
/// default one-pick-per-commit list.
#[instrument(skip(executor, instructions))]
pub fn interactive_rebase(executor: &GitCommandExecutor, repo_path: &str, upstream: &str, instructions: Vec<RebaseInstruction>) -> Result<RebaseOutcome, RebaseError> {
  run(executor, repo_path, upstream, instructions)
}

fn run(executor: &GitCommandExecutor, repo_path: &str, upstream: &str, instructions: Vec<RebaseInstruction>) -> Result<RebaseOutcome, RebaseError> {
  ensure_git_available(executor)?;
  let store = start_rebase(executor, repo_path, upstream, &instructions)?;
  match process_todo_list(executor, repo_path, &store)? {
    Some(reason) => Ok(RebaseOutcome::Stopped(reason)),
    None => Ok(RebaseOutcome::Completed(end_rebase(executor, repo_path, &store)?)),
  }
}

/// Discards the in-progress rebase: restores head, index, and tracked
/// working-tree files to their state when the rebase started, then removes
/// the control directory.
#[instrument(skip(executor))]
pub fn abort(executor: &GitCommandExecutor, repo_path: &str) -> Result<(), RebaseError> {
  ensure_git_available(executor)?;
  let store = ControlStore::open(executor, repo_path)?;
  if !store.is_in_progress() {
    return Err(RebaseError::NoRebaseInProgress);
  }

  let orig_head = store.get_orig_head().ok_or_else(|| control_file_missing("orig-head"))?;
  let head_name = store.get_head_name().ok_or_else(|| control_file_missing("head-name"))?;

  // A conflicted pick can leave unmerged index entries behind; `reset
  // --hard` clears them unconditionally, unlike a plain `checkout`.
  reset_hard(executor, repo_path, &orig_head)?;
  update_symbolic_ref(executor, repo_path, "HEAD", &head_name)?;

  store.remove_stopped_sha()?;
  store.delete_all()
}

/// Resumes a stopped rebase: resolves the checkpoint left by the instruction
/// that stopped it, then carries on through the remaining todo list.
#[instrument(skip(executor, message, description))]
pub fn continue_rebase(executor: &GitCommandExecutor, repo_path: &str, message: Option<&str>, description: Option<&str>) -> Result<RebaseOutcome, RebaseError> {
  ensure_git_available(executor)?;
  let store = ControlStore::open(executor, repo_path)?;
  if !store.is_in_progress() {
    return Err(RebaseError::NoRebaseInProgress);
  }

  let last_done = store.get_last_done().ok_or_else(|| control_file_missing("done"))?;

  if last_done.kind != InstructionKind::Break {
    resolve_checkpoint(executor, repo_path, &store, &last_done, message, description)?;
  }

  match process_todo_list(executor, repo_path, &store)? {
    Some(reason) => Ok(RebaseOutcome::Stopped(reason)),
    None => Ok(RebaseOutcome::Completed(end_rebase(executor, repo_path, &store)?)),
  }
}

fn resolve_checkpoint(
  executor: &GitCommandExecutor,
  repo_path: &str,
  store: &ControlStore,
  last_done: &RebaseInstruction,
  message: Option<&str>,
  description: Option<&str>,
) -> Result<(), RebaseError> {
  let resolved_message = match message.filter(|m| !m.is_empty()) {
    Some(message) => match description.filter(|d| !d.is_empty()) {
      Some(description) => format!("{message}\n\n{description}"),
      None => message.to_string(),
    },
    None => store.get_message(),
  };

  let hash_before = store.get_rebase_head().unwrap_or_default();
  let amend = store.get_amend();

  let hash_after = if let Some(amend_hash) = &amend {
    if last_done.kind == InstructionKind::Edit && !any_staged_changes(executor, repo_path)? {
      amend_hash.clone()
    } else {
      commit::amend_head(executor, repo_path, Some(&resolved_message)).map_err(|e| RebaseError::command_failed("amend", e))?
    }
  } else {
    let (name, email, date) = store.get_author_script().ok_or_else(|| control_file_missing("author-script"))?;
    let parent = current_head(executor, repo_path)?;
    let author = Author { name, email, date };
    let new_hash =
      commit::create_commit(executor, repo_path, &resolved_message, "", &[parent.as_str()], Some(&author)).map_err(|e| RebaseError::command_failed("commit-tree", e))?;
    advance_detached_head(executor, repo_path, &new_hash)?;
    new_hash
  };

  if amend.is_some() {
    store.remove_amend()?;
  }
  store.remove_author_script()?;
  store.remove_current_fixup()?;

  if is_next_fixup_or_squash(store) {
    store.append_rewritten_pending(&hash_before)?;
  } else {
    store.move_rewritten_pending_to_list(&hash_after)?;
    if hash_after != hash_before {
      store.append_rewritten_list(&hash_before, &hash_after)?;
    }
  }

  store.remove_message()?;
  store.remove_rebase_head()?;
  store.remove_stopped_sha()?;
  Ok(())
}

#[instrument(skip(executor))]
pub fn is_in_progress(executor: &GitCommandExecutor, repo_path: &str) -> bool {
  ControlStore::open(executor, repo_path).map(|store| store.is_in_progress()).unwrap_or(false)
}

/// The message recorded for the commit the engine is currently stopped on
/// (empty if nothing is stopped, or no rebase is in progress).
#[instrument(skip(executor))]
pub fn get_stopped_message(executor: &GitCommandExecutor, repo_path: &str) -> Result<String, RebaseError> {
  let store = ControlStore::open(executor, repo_path)?;
  Ok(store.get_message())
}

/// Builds the default todo list: one `PICK` per commit reachable from
/// `HEAD` but not from `upstream`, oldest first.
#[instrument(skip(executor))]
pub fn get_default_todo(executor: &GitCommandExecutor, repo_path: &str, upstream: &str) -> Result<Vec<RebaseInstruction>, RebaseError> {
  let merge_base = executor.execute_command(&["merge-base", "HEAD", upstream], repo_path).map_err(|e| RebaseError::command_failed("merge-base", e))?;
  let range = format!("{merge_base}..HEAD");
  let log = executor
    .execute_command_raw(&["log", "--reverse", "--format=%H%x00%s", &range], repo_path)
    .map_err(|e| RebaseError::command_failed("log", e))?;

  let mut instructions = Vec::new();
  for line in log.lines() {
    if line.is_empty() {
      continue;
    }
    let mut parts = line.splitn(2, '\0');
    let hash = parts.next().unwrap_or_default().to_string();
    let message = parts.next().unwrap_or_default().to_string();
    instructions.push(RebaseInstruction { kind: InstructionKind::Pick, hash, message });
  }
  Ok(instructions)
}

fn start_rebase(executor: &GitCommandExecutor, repo_path: &str, upstream: &str, instructions: &[RebaseInstruction]) -> Result<ControlStore, RebaseError> {
  ensure_worktree_clean(executor, repo_path)?;

  let upstream_hash = executor.execute_command(&["rev-parse", upstream], repo_path).map_err(|e| RebaseError::command_failed("rev-parse", e))?;
  let head_name = current_branch_ref(executor, repo_path)?;
  let orig_head = current_head(executor, repo_path)?;

  let store = ControlStore::open(executor, repo_path)?;
  store.create_dir()?;
  store.create_head_name(&head_name)?;
  store.create_onto(&upstream_hash)?;
  store.create_orig_head(&orig_head)?;
  store.generate_todo(instructions)?;

  checkout_detached(executor, repo_path, &upstream_hash)?;

  Ok(store)
}

fn end_rebase(executor: &GitCommandExecutor, repo_path: &str, store: &ControlStore) -> Result<CommitId, RebaseError> {
  let final_head = current_head(executor, repo_path)?;
  let head_name = store.get_head_name().ok_or_else(|| control_file_missing("head-name"))?;

  update_ref(executor, repo_path, &head_name, &final_head)?;
  update_symbolic_ref(executor, repo_path, "HEAD", &head_name)?;
  store.remove_stopped_sha()?;
  store.delete_all()?;
  Ok(final_head)
}

/// Pops and runs instructions until the list is exhausted or one of them
/// stops the engine. `done` gets an entry for the instruction that caused a
/// stop too — it records progress, not only completed work.
fn process_todo_list(executor: &GitCommandExecutor, repo_path: &str, store: &ControlStore) -> Result<Option<StopReason>, RebaseError> {
  while let Some(instruction) = store.peek_and_pop_todo()? {
    if instruction.kind != InstructionKind::Break {
      store.create_rebase_head(&instruction.hash)?;
    }

    let stop = dispatch(executor, repo_path, store, &instruction)?;
    store.append_done(&instruction)?;

    if let Some(reason) = stop {
      return Ok(Some(reason));
    }
    store.remove_rebase_head()?;
  }
  Ok(None)
}

fn dispatch(executor: &GitCommandExecutor, repo_path: &str, store: &ControlStore, instruction: &RebaseInstruction) -> Result<Option<StopReason>, RebaseError> {
  match instruction.kind {
    InstructionKind::Pick => process_pick(executor, repo_path, store, instruction),
    InstructionKind::Reword => process_reword_or_edit(executor, repo_path, store, instruction, StopReason::Reword),
    InstructionKind::Edit => process_reword_or_edit(executor, repo_path, store, instruction, StopReason::Edit),
    InstructionKind::Drop => Ok(None),
    InstructionKind::Fixup => process_fixup(executor, repo_path, store, instruction),
    InstructionKind::Squash => process_squash(executor, repo_path, store, instruction),
    InstructionKind::Break => Ok(Some(StopReason::Break)),
    other => Err(RebaseError::UnsupportedInstruction { kind: other.long_form() }),
  }
}

/// Outcome of replaying one commit on top of the detached head, shared by
/// `PICK`, `REWORD`, and `EDIT` (all three replay the same way and differ
/// only in what they do with the result).
enum PickOutcome {
  Conflict,
  /// An empty-diff or already-applied commit: no new commit is created,
  /// the head is left exactly as it was.
  NoOp(CommitId),
  Resolved { new_hash: CommitId },
}

fn pick_commit(executor: &GitCommandExecutor, repo_path: &str, commit_info: &CommitInfo) -> Result<PickOutcome, RebaseError> {
  let head = current_head(executor, repo_path)?;
  let parent = commit_info.parents.first().cloned().unwrap_or_default();

  if !parent.is_empty() && head == parent {
    checkout_detached(executor, repo_path, &commit_info.hash)?;
    return Ok(PickOutcome::Resolved { new_hash: commit_info.hash.clone() });
  }

  match apply::apply(executor, repo_path, &commit_info.hash).map_err(|e| RebaseError::command_failed("cherry-pick", e))? {
    ApplyOutcome::Conflict => Ok(PickOutcome::Conflict),
    ApplyOutcome::EmptyDiff | ApplyOutcome::NoChanges => Ok(PickOutcome::NoOp(head)),
    ApplyOutcome::Clean => {
      let new_hash = commit::create_commit(executor, repo_path, &commit_info.message, &commit_info.description, &[head.as_str()], Some(&commit_info.author))
        .map_err(|e| RebaseError::command_failed("commit-tree", e))?;
      advance_detached_head(executor, repo_path, &new_hash)?;
      Ok(PickOutcome::Resolved { new_hash })
    }
  }
}

fn process_pick(executor: &GitCommandExecutor, repo_path: &str, store: &ControlStore, instruction: &RebaseInstruction) -> Result<Option<StopReason>, RebaseError> {
  let commit_info = get_commit_info(executor, repo_path, &instruction.hash)?;

  match pick_commit(executor, repo_path, &commit_info)? {
    PickOutcome::Conflict => {
      store.create_author_script(&commit_info.author.name, &commit_info.author.email, &commit_info.author.date)?;
      store.create_message(&commit_info.message_and_description())?;
      store.create_stopped_sha(&instruction.hash)?;
      Ok(Some(StopReason::Conflict))
    }
    PickOutcome::NoOp(_) => Ok(None),
    PickOutcome::Resolved { new_hash, .. } => {
      if is_next_fixup_or_squash(store) {
        store.append_rewritten_pending(&instruction.hash)?;
      } else if new_hash != instruction.hash {
        store.append_rewritten_list(&instruction.hash, &new_hash)?;
      }
      Ok(None)
    }
  }
}

fn process_reword_or_edit(
  executor: &GitCommandExecutor,
  repo_path: &str,
  store: &ControlStore,
  instruction: &RebaseInstruction,
  reason: StopReason,
) -> Result<Option<StopReason>, RebaseError> {
  let commit_info = get_commit_info(executor, repo_path, &instruction.hash)?;
  let outcome = pick_commit(executor, repo_path, &commit_info)?;
  store.create_message(&commit_info.message_and_description())?;

  match outcome {
    PickOutcome::Conflict => {
      store.create_author_script(&commit_info.author.name, &commit_info.author.email, &commit_info.author.date)?;
      store.create_stopped_sha(&instruction.hash)?;
      Ok(Some(StopReason::Conflict))
    }
    PickOutcome::NoOp(head) => {
      store.create_amend(&head)?;
      store.create_stopped_sha(&instruction.hash)?;
      Ok(Some(reason))
    }
    PickOutcome::Resolved { new_hash, .. } => {
      store.create_amend(&new_hash)?;
      store.create_stopped_sha(&instruction.hash)?;
      Ok(Some(reason))
    }
  }
}

fn process_fixup(executor: &GitCommandExecutor, repo_path: &str, store: &ControlStore, instruction: &RebaseInstruction) -> Result<Option<StopReason>, RebaseError> {
  let outcome = apply::apply(executor, repo_path, &instruction.hash).map_err(|e| RebaseError::command_failed("cherry-pick", e))?;

  if outcome == ApplyOutcome::Conflict {
    let head = current_head(executor, repo_path)?;
    let head_info = get_commit_info(executor, repo_path, &head)?;
    store.create_amend(&head)?;
    store.append_current_fixup(instruction)?;
    store.create_message(&head_info.message_and_description())?;
    store.create_stopped_sha(&instruction.hash)?;
    return Ok(Some(StopReason::Conflict));
  }

  if is_next_fixup_or_squash(store) {
    store.append_current_fixup(instruction)?;
    store.append_rewritten_pending(&instruction.hash)?;
    commit::amend_head(executor, repo_path, None).map_err(|e| RebaseError::command_failed("amend", e))?;
    return Ok(None);
  }

  if store.any_squash_in_current_fixup() {
    let head = current_head(executor, repo_path)?;
    let head_info = get_commit_info(executor, repo_path, &head)?;
    store.create_amend(&head)?;
    store.append_current_fixup(instruction)?;
    store.create_message(&head_info.message_and_description())?;
    return Ok(Some(StopReason::Squash));
  }

  let new_hash = commit::amend_head(executor, repo_path, None).map_err(|e| RebaseError::command_failed("amend", e))?;
  store.append_rewritten_pending(&instruction.hash)?;
  store.move_rewritten_pending_to_list(&new_hash)?;
  store.remove_current_fixup()?;
  Ok(None)
}

fn process_squash(executor: &GitCommandExecutor, repo_path: &str, store: &ControlStore, instruction: &RebaseInstruction) -> Result<Option<StopReason>, RebaseError> {
  let head = current_head(executor, repo_path)?;
  let combined_message = concatenated_message(executor, repo_path, &head, &instruction.hash)?;

  let outcome = apply::apply(executor, repo_path, &instruction.hash).map_err(|e| RebaseError::command_failed("cherry-pick", e))?;

  if outcome == ApplyOutcome::Conflict {
    store.create_amend(&head)?;
    store.create_message(&combined_message)?;
    store.append_current_fixup(instruction)?;
    store.create_stopped_sha(&instruction.hash)?;
    return Ok(Some(StopReason::Conflict));
  }

  if !is_next_fixup_or_squash(store) {
    store.create_amend(&head)?;
    store.create_message(&combined_message)?;
    return Ok(Some(StopReason::Squash));
  }

  store.append_rewritten_pending(&instruction.hash)?;
  store.append_current_fixup(instruction)?;
  commit::amend_head(executor, repo_path, Some(&combined_message)).map_err(|e| RebaseError::command_failed("amend", e))?;
  Ok(None)
}

fn is_next_fixup_or_squash(store: &ControlStore) -> bool {
  store.peek_todo().map(|instruction| instruction.kind.is_fixup_or_squash()).unwrap_or(false)
}

fn concatenated_message(executor: &GitCommandExecutor, repo_path: &str, previous_hash: &str, current_hash: &str) -> Result<String, RebaseError> {
  let previous = get_commit_info(executor, repo_path, previous_hash)?;
  let current = get_commit_info(executor, repo_path, current_hash)?;
  Ok(format!("{}\n\n{}", previous.message_and_description(), current.message_and_description()))
}

fn get_commit_info(executor: &GitCommandExecutor, repo_path: &str, hash: &str) -> Result<CommitInfo, RebaseError> {
  let format = "%H%x00%P%x00%an%x00%ae%x00%ad%x00%cn%x00%ce%x00%cd%x00%s%x00%b";
  let output = executor
    .execute_command_raw(&["show", "-s", &format!("--format={format}"), "--date=raw", hash], repo_path)
    .map_err(|e| RebaseError::command_failed("show", e))?;

  let fields: Vec<&str> = output.splitn(10, '\0').collect();
  let field = |i: usize| fields.get(i).copied().unwrap_or_default();

  Ok(CommitInfo {
    hash: field(0).trim().to_string(),
    parents: field(1).split_whitespace().map(str::to_string).collect(),
    author: Author { name: field(2).to_string(), email: field(3).to_string(), date: field(4).to_string() },
    committer: Author { name: field(5).to_string(), email: field(6).to_string(), date: field(7).to_string() },
    message: field(8).to_string(),
    description: field(9).trim_end_matches('\n').to_string(),
  })
}

fn current_head(executor: &GitCommandExecutor, repo_path: &str) -> Result<String, RebaseError> {
  executor.execute_command(&["rev-parse", "HEAD"], repo_path).map_err(|e| RebaseError::command_failed("rev-parse HEAD", e))
}

fn current_branch_ref(executor: &GitCommandExecutor, repo_path: &str) -> Result<String, RebaseError> {
  executor.execute_command(&["symbolic-ref", "HEAD"], repo_path).map_err(|e| RebaseError::command_failed("symbolic-ref HEAD", e))
}

fn checkout_detached(executor: &GitCommandExecutor, repo_path: &str, commit_hash: &str) -> Result<(), RebaseError> {
  executor.execute_command(&["checkout", "--detach", "--force", commit_hash], repo_path).map(|_| ()).map_err(|e| RebaseError::command_failed("checkout --detach", e))
}

fn reset_hard(executor: &GitCommandExecutor, repo_path: &str, commit_hash: &str) -> Result<(), RebaseError> {
  executor.execute_command(&["reset", "--hard", commit_hash], repo_path).map(|_| ()).map_err(|e| RebaseError::command_failed("reset --hard", e))
}

/// Advances a detached `HEAD` to a commit whose tree is already the index's
/// tree (just produced by `commit-tree`) — no working-tree sync needed.
fn advance_detached_head(executor: &GitCommandExecutor, repo_path: &str, commit_hash: &str) -> Result<(), RebaseError> {
  update_ref(executor, repo_path, "HEAD", commit_hash)
}

fn update_ref(executor: &GitCommandExecutor, repo_path: &str, refname: &str, hash: &str) -> Result<(), RebaseError> {
  executor.execute_command(&["update-ref", refname, hash], repo_path).map(|_| ()).map_err(|e| RebaseError::command_failed("update-ref", e))
}

fn update_symbolic_ref(executor: &GitCommandExecutor, repo_path: &str, name: &str, target: &str) -> Result<(), RebaseError> {
  executor.execute_command(&["symbolic-ref", name, target], repo_path).map(|_| ()).map_err(|e| RebaseError::command_failed("symbolic-ref", e))
}

fn any_staged_changes(executor: &GitCommandExecutor, repo_path: &str) -> Result<bool, RebaseError> {
  let (_, exit_code) =
    executor.execute_command_with_status(&["diff", "--cached", "--quiet"], repo_path).map_err(|e| RebaseError::command_failed("diff --cached", e))?;
  Ok(exit_code != 0)
}

/// Starting a rebase force-detaches `HEAD`, which silently discards any
/// uncommitted change to a tracked file. Refuse instead, matching the
/// precondition a real `git rebase` enforces before it touches the worktree.
fn ensure_worktree_clean(executor: &GitCommandExecutor, repo_path: &str) -> Result<(), RebaseError> {
  let (_, unstaged) = executor.execute_command_with_status(&["diff", "--quiet"], repo_path).map_err(|e| RebaseError::command_failed("diff", e))?;
  let (_, staged) = executor.execute_command_with_status(&["diff", "--cached", "--quiet"], repo_path).map_err(|e| RebaseError::command_failed("diff --cached", e))?;

  if unstaged != 0 || staged != 0 {
    Err(RebaseError::DirtyWorktree)
  } else {
    Ok(())
  }
}

fn control_file_missing(slot: &'static str) -> RebaseError {
  RebaseError::ControlFile { slot, reason: "missing".to_string() }
}

fn ensure_git_available(executor: &GitCommandExecutor) -> Result<(), RebaseError> {
  match executor.get_info() {
    Ok(_) => Ok(()),
    Err(e) => {
      let reason = e.to_string();
      if reason.to_lowercase().contains("too old") {
        Err(RebaseError::GitTooOld { reason })
      } else {
        Err(RebaseError::GitNotFound { reason })
      }
    }
  }
}
