use serde::{Deserialize, Serialize};

/// An opaque 40-character hex object id. Kept as a plain `String` rather
/// than a newtype: every call site either got it from git's own stdout or
/// is about to hand it back to git, so there is no validation worth doing
/// in between.
pub type CommitId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
  pub name: String,
  pub email: String,
  pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
  pub hash: CommitId,
  pub parents: Vec<CommitId>,
  pub author: Author,
  pub committer: Author,
  pub message: String,
  pub description: String,
}

impl CommitInfo {
  pub fn message_and_description(&self) -> String {
    if self.description.is_empty() {
      self.message.clone()
    } else {
      format!("{}\n\n{}", self.message, self.description)
    }
  }
}

/// One instruction in a rebase todo list. `hash`/`message` are empty for
/// `Break`; `Exec` carries its command line in `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebaseInstruction {
  pub kind: InstructionKind,
  pub hash: CommitId,
  pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstructionKind {
  Pick,
  Reword,
  Edit,
  Squash,
  Fixup,
  Exec,
  Break,
  Drop,
  Label,
  Reset,
  Merge,
  UpdateRef,
}

impl InstructionKind {
  pub fn long_form(self) -> &'static str {
    match self {
      InstructionKind::Pick => "pick",
      InstructionKind::Reword => "reword",
      InstructionKind::Edit => "edit",
      InstructionKind::Squash => "squash",
      InstructionKind::Fixup => "fixup",
      InstructionKind::Exec => "exec",
      InstructionKind::Break => "break",
      InstructionKind::Drop => "drop",
      InstructionKind::Label => "label",
      InstructionKind::Reset => "reset",
      InstructionKind::Merge => "merge",
      InstructionKind::UpdateRef => "update_ref",
    }
  }

  pub fn from_token(token: &str) -> Option<Self> {
    Some(match token {
      "pick" | "p" => InstructionKind::Pick,
      "reword" | "r" => InstructionKind::Reword,
      "edit" | "e" => InstructionKind::Edit,
      "squash" | "s" => InstructionKind::Squash,
      "fixup" | "f" => InstructionKind::Fixup,
      "exec" | "x" => InstructionKind::Exec,
      "break" | "b" => InstructionKind::Break,
      "drop" | "d" => InstructionKind::Drop,
      "label" | "l" => InstructionKind::Label,
      "reset" | "t" => InstructionKind::Reset,
      "merge" | "m" => InstructionKind::Merge,
      "update_ref" | "u" => InstructionKind::UpdateRef,
      _ => return None,
    })
  }

  pub fn is_fixup_or_squash(self) -> bool {
    matches!(self, InstructionKind::Fixup | InstructionKind::Squash)
  }
}

/// Why the engine stopped short of completing the todo list. Never an
/// `Err` — these are expected algorithmic outcomes, not engine bugs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
  Conflict,
  Break,
  Reword,
  Edit,
  Squash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RebaseOutcome {
  Completed(CommitId),
  Stopped(StopReason),
}
