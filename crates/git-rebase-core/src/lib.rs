pub mod apply;
pub mod commit;
pub mod control;
pub mod error;
pub mod model;
pub mod rebase;
pub mod todo;

pub use error::RebaseError;
pub use model::{Author, CommitId, CommitInfo, InstructionKind, RebaseInstruction, RebaseOutcome, StopReason};
pub use rebase::{abort, continue_rebase, get_default_todo, get_stopped_message, interactive_rebase, is_in_progress, rebase};
