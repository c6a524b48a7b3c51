use thiserror::Error;

/// Public error surface of the rebase engine. Algorithmic stops (conflict,
/// break, reword, edit, squash) are never represented here — see
/// [`crate::model::RebaseOutcome`].
#[derive(Debug, Error)]
pub enum RebaseError {
  #[error("git executable not found: {reason}")]
  GitNotFound { reason: String },

  #[error("git version too old: {reason}")]
  GitTooOld { reason: String },

  #[error("not a git repository: {path}")]
  NotARepository { path: String },

  #[error("no rebase in progress")]
  NoRebaseInProgress,

  #[error("worktree has uncommitted changes")]
  DirtyWorktree,

  #[error("git command failed: {command}: {source}")]
  CommandFailed { command: String, #[source] source: anyhow::Error },

  #[error("control file '{slot}' missing or unreadable: {reason}")]
  ControlFile { slot: &'static str, reason: String },

  #[error("invalid todo line: {line}")]
  InvalidTodoLine { line: String },

  #[error("instruction '{kind}' is not executable by this engine")]
  UnsupportedInstruction { kind: &'static str },
}

impl RebaseError {
  pub fn command_failed(command: impl Into<String>, source: anyhow::Error) -> Self {
    RebaseError::CommandFailed { command: command.into(), source }
  }
}
