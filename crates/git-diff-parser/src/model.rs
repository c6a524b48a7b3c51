use serde::{Deserialize, Serialize};

/// Whether a diff describes a single-parent change or a multi-parent
/// (combined / `diff --cc`) change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffKind {
  Normal,
  Combined,
}

/// The kind of change a [`DiffFile`] describes, derived incrementally from
/// the header lines observed while parsing (see `parser.rs`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffStatus {
  Unknown,
  New,
  Deleted,
  Modified,
  Renamed,
  RenamedAndModified,
  Copied,
  CopiedAndModified,
  TypeChanged,
  TypeChangedToSymlink,
  BinaryChanged,
}

/// A line range in a hunk header, e.g. `-12,4`. `count` is `-1` when the
/// header omitted the count (`-12` alone means a single-line range).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HunkRange {
  pub line: i64,
  pub count: i64,
}

/// One file entry parsed out of unified-diff text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffFile {
  pub kind: DiffKind,
  pub status: DiffStatus,
  pub old_path: String,
  pub new_path: String,
  /// One pre-image object id for a normal diff, one per parent for a
  /// combined diff.
  pub indices_before: Vec<String>,
  pub index_after: String,
  pub old_mode: u32,
  pub new_mode: u32,
  pub similarity_index: u32,
  /// One range per parent for combined diffs, one entry for normal diffs.
  pub hunk_ranges_before: Vec<HunkRange>,
  pub hunk_range_after: HunkRange,
  pub hunk_content: Vec<String>,
}

impl Default for DiffFile {
  fn default() -> Self {
    Self {
      kind: DiffKind::Normal,
      status: DiffStatus::Unknown,
      old_path: String::new(),
      new_path: String::new(),
      indices_before: Vec::new(),
      index_after: String::new(),
      old_mode: 0,
      new_mode: 0,
      similarity_index: 0,
      hunk_ranges_before: Vec::new(),
      hunk_range_after: HunkRange { line: 0, count: -1 },
      hunk_content: Vec::new(),
    }
  }
}
