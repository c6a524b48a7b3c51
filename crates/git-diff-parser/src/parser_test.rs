use crate::model::{DiffKind, DiffStatus};
use crate::parser::parse;
use pretty_assertions::assert_eq;

#[test]
fn parses_new_file() {
  let diff = "diff --git a/src/new.rs b/src/new.rs\n\
new file mode 100644\n\
index 0000000..e69de29\n\
--- /dev/null\n\
+++ b/src/new.rs\n\
@@ -0,0 +1,2 @@\n\
+fn main() {}\n\
+\n";

  let files = parse(diff);
  assert_eq!(files.len(), 1);
  let file = &files[0];
  assert_eq!(file.status, DiffStatus::New);
  assert_eq!(file.new_path, "src/new.rs");
  assert_eq!(file.old_path, "/dev/null");
  assert_eq!(file.new_mode, 100644);
  assert_eq!(file.hunk_range_after.line, 1);
  assert_eq!(file.hunk_range_after.count, 2);
  assert_eq!(file.hunk_content, vec!["+fn main() {}", "+"]);
}

#[test]
fn parses_modified_file_with_two_hunks() {
  let diff = "diff --git a/a.txt b/a.txt\n\
index aaa1111..bbb2222 100644\n\
--- a/a.txt\n\
+++ b/a.txt\n\
@@ -1,3 +1,3 @@\n\
 line one\n\
-line two\n\
+line TWO\n\
 line three\n\
@@ -10,2 +10,3 @@\n\
 tail\n\
+new tail line\n";

  let files = parse(diff);
  assert_eq!(files.len(), 1);
  assert_eq!(files[0].status, DiffStatus::Modified);
  // only the last hunk header parsed per file in this state machine design:
  // HUNK_CONTENT accumulates until the next "diff " line, so the second
  // "@@" line here is folded into the first hunk's content.
  assert!(files[0].hunk_content.contains(&"@@ -10,2 +10,3 @@".to_string()));
}

#[test]
fn parses_deleted_file() {
  let diff = "diff --git a/gone.txt b/gone.txt\n\
deleted file mode 100644\n\
index aaa1111..0000000\n\
--- a/gone.txt\n\
+++ /dev/null\n\
@@ -1,1 +0,0 @@\n\
-bye\n";

  let files = parse(diff);
  assert_eq!(files.len(), 1);
  assert_eq!(files[0].status, DiffStatus::Deleted);
  assert_eq!(files[0].new_path, "/dev/null");
  assert_eq!(files[0].old_mode, 100644);
}

#[test]
fn parses_rename_with_modification() {
  let diff = "diff --git a/old_name.txt b/new_name.txt\n\
similarity index 90%\n\
rename from old_name.txt\n\
rename to new_name.txt\n\
index aaa1111..bbb2222 100644\n\
--- a/old_name.txt\n\
+++ b/new_name.txt\n\
@@ -1,1 +1,1 @@\n\
-old content\n\
+new content\n";

  let files = parse(diff);
  assert_eq!(files.len(), 1);
  let file = &files[0];
  assert_eq!(file.status, DiffStatus::RenamedAndModified);
  assert_eq!(file.similarity_index, 90);
  assert_eq!(file.old_path, "old_name.txt");
  assert_eq!(file.new_path, "new_name.txt");
}

#[test]
fn parses_pure_rename_without_content_change() {
  let diff = "diff --git a/old_name.txt b/new_name.txt\n\
similarity index 100%\n\
rename from old_name.txt\n\
rename to new_name.txt\n";

  let files = parse(diff);
  assert_eq!(files.len(), 1);
  assert_eq!(files[0].status, DiffStatus::Renamed);
  assert_eq!(files[0].old_path, "old_name.txt");
  assert_eq!(files[0].new_path, "new_name.txt");
}

#[test]
fn parses_binary_file_and_continues_to_next_diff() {
  let diff = "diff --git a/image.png b/image.png\n\
index aaa1111..bbb2222 100644\n\
Binary files differ\n\
diff --git a/text.txt b/text.txt\n\
index ccc3333..ddd4444 100644\n\
--- a/text.txt\n\
+++ b/text.txt\n\
@@ -1,1 +1,1 @@\n\
-old\n\
+new\n";

  let files = parse(diff);
  assert_eq!(files.len(), 2);
  assert_eq!(files[0].status, DiffStatus::BinaryChanged);
  assert_eq!(files[0].new_path, "image.png");
  assert_eq!(files[1].status, DiffStatus::Modified);
  assert_eq!(files[1].new_path, "text.txt");
}

#[test]
fn parses_multiple_files_in_one_diff_stream() {
  let diff = "diff --git a/one.txt b/one.txt\n\
index 1111111..2222222 100644\n\
--- a/one.txt\n\
+++ b/one.txt\n\
@@ -1,1 +1,1 @@\n\
-a\n\
+b\n\
diff --git a/two.txt b/two.txt\n\
new file mode 100644\n\
index 0000000..3333333\n\
--- /dev/null\n\
+++ b/two.txt\n\
@@ -0,0 +1,1 @@\n\
+c\n";

  let files = parse(diff);
  assert_eq!(files.len(), 2);
  assert_eq!(files[0].new_path, "one.txt");
  assert_eq!(files[1].new_path, "two.txt");
  assert_eq!(files[1].status, DiffStatus::New);
}

#[test]
fn combined_diff_reproduces_file_b_aliasing_quirk() {
  // `diff --cc` is followed by a single path; the parser nonetheless copies
  // the second path group's logic onto fileB only when a second group
  // actually matched, reusing fileA's own text rather than a distinct
  // capture. With a single trailing path (the common `--cc` shape) no
  // second group matches, so new_path is left for the hunk-file lines to
  // fill in.
  let diff = "diff --cc conflicted.txt\n\
index 1111111,2222222..3333333\n\
--- a/conflicted.txt\n\
+++ b/conflicted.txt\n\
@@@ -1,2 -1,2 +1,2 @@@\n\
- old a\n\
 -old b\n\
++merged\n";

  let files = parse(diff);
  assert_eq!(files.len(), 1);
  assert_eq!(files[0].kind, DiffKind::Combined);
  assert_eq!(files[0].old_path, "conflicted.txt");
  assert_eq!(files[0].new_path, "conflicted.txt");
  assert_eq!(files[0].indices_before, vec!["1111111", "2222222"]);
  assert_eq!(files[0].index_after, "3333333");
}

#[test]
fn empty_input_yields_no_files() {
  assert!(parse("").is_empty());
  assert!(parse("\n\n\n").is_empty());
}

#[test]
fn combined_diff_hunk_header_parses_one_range_per_parent() {
  let diff = "diff --cc test.txt\n\
index 1111111,2222222..3333333\n\
--- a/test.txt\n\
+++ b/test.txt\n\
@@@ -1,4 -1,4 +1,8 @@@\n\
 unchanged\n";

  let files = parse(diff);
  assert_eq!(files.len(), 1);
  assert_eq!(
    files[0].hunk_ranges_before,
    vec![crate::model::HunkRange { line: 1, count: 4 }, crate::model::HunkRange { line: 1, count: 4 }]
  );
  assert_eq!(files[0].hunk_range_after, crate::model::HunkRange { line: 1, count: 8 });
}

#[test]
fn new_and_modified_files_in_one_stream_reproduce_the_full_s7_record_shapes() {
  let diff = "diff --git a/test2.txt b/test2.txt\n\
new file mode 100644\n\
index 0000000..f6f2656\n\
--- /dev/null\n\
+++ b/test2.txt\n\
@@ -0,0 +1,1 @@\n\
+Hello\n\
diff --git a/test.txt b/test.txt\n\
index 1111111..2222222 100644\n\
--- a/test.txt\n\
+++ b/test.txt\n\
@@ -1,1 +1,1 @@\n\
-old line\n\
+new line\n";

  let files = parse(diff);
  assert_eq!(files.len(), 2);

  assert_eq!(files[0].status, DiffStatus::New);
  assert_eq!(files[0].new_path, "test2.txt");
  assert_eq!(files[0].old_path, "/dev/null");
  assert_eq!(files[0].new_mode, 100644);
  assert_eq!(files[0].index_after, "f6f2656");
  assert_eq!(files[0].hunk_content, vec!["+Hello"]);

  assert_eq!(files[1].status, DiffStatus::Modified);
  assert_eq!(files[1].new_path, "test.txt");
  assert_eq!(files[1].old_path, "test.txt");
  assert_eq!(files[1].indices_before, vec!["1111111"]);
  assert_eq!(files[1].index_after, "2222222");
}
