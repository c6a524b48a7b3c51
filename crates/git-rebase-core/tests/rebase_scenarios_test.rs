use git_executor::git_command_executor::GitCommandExecutor;
use git_rebase_core::{InstructionKind, RebaseInstruction, RebaseOutcome, StopReason, continue_rebase, get_stopped_message, interactive_rebase, is_in_progress};
use pretty_assertions::assert_eq;
use test_utils::git_test_utils::TestRepo;

fn executor() -> GitCommandExecutor {
  GitCommandExecutor::new()
}

#[test]
fn reword_stops_with_a_pending_amend_then_continue_finishes_with_the_new_message() {
  let repo = TestRepo::new();
  let base = repo.create_commit("base", "a.txt", "a");
  let target = repo.create_commit("original message", "b.txt", "b");

  let instructions = vec![RebaseInstruction { kind: InstructionKind::Reword, hash: target.clone(), message: "original message".into() }];

  let executor = executor();
  let path = repo.path().to_str().unwrap();
  let outcome = interactive_rebase(&executor, path, &base, instructions).unwrap();
  assert_eq!(outcome, RebaseOutcome::Stopped(StopReason::Reword));

  let outcome = continue_rebase(&executor, path, Some("a better message"), None).unwrap();
  match outcome {
    RebaseOutcome::Completed(hash) => {
      let message = std::process::Command::new("git")
        .args(["show", "-s", "--format=%s", &hash])
        .current_dir(repo.path())
        .output()
        .unwrap();
      assert_eq!(String::from_utf8_lossy(&message.stdout).trim(), "a better message");
    }
    other => panic!("expected completion, got {other:?}"),
  }
}

#[test]
fn edit_stops_for_amendment_and_continue_picks_up_worktree_changes() {
  let repo = TestRepo::new();
  let base = repo.create_commit("base", "a.txt", "a");
  let target = repo.create_commit("edit me", "b.txt", "b");

  let instructions = vec![RebaseInstruction { kind: InstructionKind::Edit, hash: target.clone(), message: "edit me".into() }];

  let executor = executor();
  let path = repo.path().to_str().unwrap();
  let outcome = interactive_rebase(&executor, path, &base, instructions).unwrap();
  assert_eq!(outcome, RebaseOutcome::Stopped(StopReason::Edit));

  std::fs::write(repo.path().join("b.txt"), "b amended").unwrap();
  std::process::Command::new("git").args(["add", "b.txt"]).current_dir(repo.path()).output().unwrap();

  let outcome = continue_rebase(&executor, path, None, None).unwrap();
  match outcome {
    RebaseOutcome::Completed(hash) => {
      let content = std::fs::read_to_string(repo.path().join("b.txt")).unwrap();
      assert_eq!(content, "b amended");
      assert_eq!(repo.head(), hash);
    }
    other => panic!("expected completion, got {other:?}"),
  }
}

#[test]
fn fixup_folds_silently_into_the_previous_commit() {
  let repo = TestRepo::new();
  let base = repo.create_commit("base", "a.txt", "a");
  let keep = repo.create_commit("keep this message", "b.txt", "b");
  let fixup_commit = repo.create_commit("fixup commit, message discarded", "b.txt", "b fixed");

  let instructions = vec![
    RebaseInstruction { kind: InstructionKind::Pick, hash: keep, message: "keep this message".into() },
    RebaseInstruction { kind: InstructionKind::Fixup, hash: fixup_commit, message: "fixup commit, message discarded".into() },
  ];

  let executor = executor();
  let path = repo.path().to_str().unwrap();
  let outcome = interactive_rebase(&executor, path, &base, instructions).unwrap();

  match outcome {
    RebaseOutcome::Completed(hash) => {
      let content = std::fs::read_to_string(repo.path().join("b.txt")).unwrap();
      assert_eq!(content, "b fixed");
      let message = std::process::Command::new("git").args(["show", "-s", "--format=%s", &hash]).current_dir(repo.path()).output().unwrap();
      assert_eq!(String::from_utf8_lossy(&message.stdout).trim(), "keep this message");
    }
    other => panic!("expected completion, got {other:?}"),
  }
}

#[test]
fn squash_stops_for_a_combined_message_then_continue_writes_it() {
  let repo = TestRepo::new();
  let base = repo.create_commit("base", "a.txt", "a");
  let keep = repo.create_commit("first message", "b.txt", "b");
  let squash_commit = repo.create_commit("second message", "b.txt", "b squashed");

  let instructions = vec![
    RebaseInstruction { kind: InstructionKind::Pick, hash: keep, message: "first message".into() },
    RebaseInstruction { kind: InstructionKind::Squash, hash: squash_commit, message: "second message".into() },
  ];

  let executor = executor();
  let path = repo.path().to_str().unwrap();
  let outcome = interactive_rebase(&executor, path, &base, instructions).unwrap();
  assert_eq!(outcome, RebaseOutcome::Stopped(StopReason::Squash));

  let stopped_message = get_stopped_message(&executor, path).unwrap();
  assert!(stopped_message.contains("first message"));
  assert!(stopped_message.contains("second message"));

  let outcome = continue_rebase(&executor, path, Some("combined message"), None).unwrap();
  match outcome {
    RebaseOutcome::Completed(hash) => {
      let content = std::fs::read_to_string(repo.path().join("b.txt")).unwrap();
      assert_eq!(content, "b squashed");
      let message = std::process::Command::new("git").args(["show", "-s", "--format=%s", &hash]).current_dir(repo.path()).output().unwrap();
      assert_eq!(String::from_utf8_lossy(&message.stdout).trim(), "combined message");
    }
    other => panic!("expected completion, got {other:?}"),
  }
}

#[test]
fn continue_after_resolving_a_conflict_finishes_the_rebase() {
  let repo = TestRepo::new();
  repo.create_commit("base", "shared.txt", "base");
  repo.create_branch("upstream").unwrap();

  let conflicting = repo.create_commit("feature change", "shared.txt", "feature change");

  repo.checkout("upstream").unwrap();
  repo.create_commit("upstream change", "shared.txt", "upstream change");
  let upstream_head = repo.head();

  repo.reset_hard(&conflicting).unwrap();

  let executor = executor();
  let path = repo.path().to_str().unwrap();
  let instructions = vec![RebaseInstruction { kind: InstructionKind::Pick, hash: conflicting, message: "feature change".into() }];
  let outcome = interactive_rebase(&executor, path, &upstream_head, instructions).unwrap();
  assert_eq!(outcome, RebaseOutcome::Stopped(StopReason::Conflict));

  std::fs::write(repo.path().join("shared.txt"), "resolved content").unwrap();
  std::process::Command::new("git").args(["add", "shared.txt"]).current_dir(repo.path()).output().unwrap();

  let outcome = continue_rebase(&executor, path, None, None).unwrap();
  match outcome {
    RebaseOutcome::Completed(hash) => {
      let content = std::fs::read_to_string(repo.path().join("shared.txt")).unwrap();
      assert_eq!(content, "resolved content");
      assert_eq!(repo.head(), hash);
    }
    other => panic!("expected completion, got {other:?}"),
  }
  assert!(!is_in_progress(&executor, path));
}

#[test]
fn three_way_squash_chain_combines_all_messages_into_one_stop() {
  let repo = TestRepo::new();
  let base = repo.create_commit("base", "a.txt", "a");
  let keep = repo.create_commit("first message", "b.txt", "b");
  let second = repo.create_commit("second message", "b.txt", "b squashed once");
  let third = repo.create_commit("third message", "b.txt", "b squashed twice");

  // A trailing `break` keeps the rebase directory alive one instruction
  // past the squash chain's own resolution, so `rewritten-list` can be
  // inspected before `end_rebase` deletes it.
  let instructions = vec![
    RebaseInstruction { kind: InstructionKind::Pick, hash: keep.clone(), message: "first message".into() },
    RebaseInstruction { kind: InstructionKind::Squash, hash: second.clone(), message: "second message".into() },
    RebaseInstruction { kind: InstructionKind::Squash, hash: third.clone(), message: "third message".into() },
    RebaseInstruction { kind: InstructionKind::Break, hash: String::new(), message: String::new() },
  ];

  let executor = executor();
  let path = repo.path().to_str().unwrap();
  let outcome = interactive_rebase(&executor, path, &base, instructions).unwrap();
  assert_eq!(outcome, RebaseOutcome::Stopped(StopReason::Squash));

  let stopped_message = get_stopped_message(&executor, path).unwrap();
  assert!(stopped_message.contains("first message"));
  assert!(stopped_message.contains("second message"));
  assert!(stopped_message.contains("third message"));

  let outcome = continue_rebase(&executor, path, Some("all three folded"), None).unwrap();
  assert_eq!(outcome, RebaseOutcome::Stopped(StopReason::Break));

  let folded_hash = repo.head();
  let rewritten_list = std::fs::read_to_string(repo.path().join(".git/rebase-merge/rewritten-list")).unwrap();
  let mapped: Vec<&str> = rewritten_list.lines().collect();
  assert_eq!(mapped.len(), 3, "expected keep, second, and third each mapped once: {mapped:?}");
  for source in [&keep, &second, &third] {
    assert!(mapped.contains(&format!("{source} {folded_hash}").as_str()), "missing mapping for {source} in {mapped:?}");
  }

  let outcome = continue_rebase(&executor, path, None, None).unwrap();
  match outcome {
    RebaseOutcome::Completed(hash) => {
      assert_eq!(hash, folded_hash);
      let content = std::fs::read_to_string(repo.path().join("b.txt")).unwrap();
      assert_eq!(content, "b squashed twice");
      let message = std::process::Command::new("git").args(["show", "-s", "--format=%s", &hash]).current_dir(repo.path()).output().unwrap();
      assert_eq!(String::from_utf8_lossy(&message.stdout).trim(), "all three folded");
    }
    other => panic!("expected completion, got {other:?}"),
  }
  assert!(!is_in_progress(&executor, path));
}

#[test]
fn fixup_that_conflicts_stops_with_the_preceding_commits_message() {
  let repo = TestRepo::new();
  repo.create_commit("base", "shared.txt", "base");
  repo.create_branch("upstream").unwrap();

  let keep = repo.create_commit("keep this message", "a.txt", "a");
  let fixup_commit = repo.create_commit("fixup commit, message discarded", "shared.txt", "feature change");

  repo.checkout("upstream").unwrap();
  repo.create_commit("upstream change", "shared.txt", "upstream change");
  let upstream_head = repo.head();

  repo.reset_hard(&fixup_commit).unwrap();

  let executor = executor();
  let path = repo.path().to_str().unwrap();
  let instructions = vec![
    RebaseInstruction { kind: InstructionKind::Pick, hash: keep, message: "keep this message".into() },
    RebaseInstruction { kind: InstructionKind::Fixup, hash: fixup_commit.clone(), message: "fixup commit, message discarded".into() },
  ];
  let outcome = interactive_rebase(&executor, path, &upstream_head, instructions).unwrap();
  assert_eq!(outcome, RebaseOutcome::Stopped(StopReason::Conflict));

  let stopped_message = get_stopped_message(&executor, path).unwrap();
  assert_eq!(stopped_message, "keep this message");

  std::fs::write(repo.path().join("shared.txt"), "resolved content").unwrap();
  std::process::Command::new("git").args(["add", "shared.txt"]).current_dir(repo.path()).output().unwrap();

  let outcome = continue_rebase(&executor, path, None, None).unwrap();
  match outcome {
    RebaseOutcome::Completed(hash) => {
      let content = std::fs::read_to_string(repo.path().join("shared.txt")).unwrap();
      assert_eq!(content, "resolved content");
      let message = std::process::Command::new("git").args(["show", "-s", "--format=%s", &hash]).current_dir(repo.path()).output().unwrap();
      assert_eq!(String::from_utf8_lossy(&message.stdout).trim(), "keep this message");
    }
    other => panic!("expected completion, got {other:?}"),
  }
  assert!(!is_in_progress(&executor, path));
}

#[test]
fn break_stops_immediately_and_continue_resumes_the_remaining_picks() {
  let repo = TestRepo::new();
  let base = repo.create_commit("base", "a.txt", "a");
  let first = repo.create_commit("first", "b.txt", "b");
  let second = repo.create_commit("second", "c.txt", "c");

  let instructions = vec![
    RebaseInstruction { kind: InstructionKind::Pick, hash: first, message: "first".into() },
    RebaseInstruction { kind: InstructionKind::Break, hash: String::new(), message: String::new() },
    RebaseInstruction { kind: InstructionKind::Pick, hash: second, message: "second".into() },
  ];

  let executor = executor();
  let path = repo.path().to_str().unwrap();
  let outcome = interactive_rebase(&executor, path, &base, instructions).unwrap();
  assert_eq!(outcome, RebaseOutcome::Stopped(StopReason::Break));
  assert!(is_in_progress(&executor, path));

  let outcome = continue_rebase(&executor, path, None, None).unwrap();
  match outcome {
    RebaseOutcome::Completed(hash) => {
      let files = repo.get_files_in_commit(&hash).unwrap();
      assert!(files.contains(&"b.txt".to_string()));
      assert!(files.contains(&"c.txt".to_string()));
    }
    other => panic!("expected completion, got {other:?}"),
  }
  assert!(!is_in_progress(&executor, path));
}

#[test]
fn empty_diff_pick_is_a_silent_success_with_no_rewrite() {
  let repo = TestRepo::new();
  let base = repo.create_commit("base", "a.txt", "a");
  repo.create_branch_at("upstream", &base).unwrap();

  // A commit whose change has already landed on upstream under a different hash.
  let target = repo.create_commit("shared change", "b.txt", "b");

  repo.checkout("upstream").unwrap();
  repo.create_commit("shared change applied independently", "b.txt", "b");
  let upstream_head = repo.head();

  repo.checkout(&target).unwrap();

  let executor = executor();
  let path = repo.path().to_str().unwrap();
  let instructions = vec![RebaseInstruction { kind: InstructionKind::Pick, hash: target, message: "shared change".into() }];
  let outcome = interactive_rebase(&executor, path, &upstream_head, instructions).unwrap();

  match outcome {
    RebaseOutcome::Completed(hash) => assert_eq!(hash, upstream_head),
    other => panic!("expected completion, got {other:?}"),
  }
}
