use crate::model::{DiffFile, DiffKind, DiffStatus, HunkRange};
use once_cell::sync::Lazy;
use regex::Regex;

static DIFF_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^diff --(\w{2,3}) (\S+)\s?(\S+)?$").unwrap());
static OLD_MODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^old mode (\d{6})$").unwrap());
static NEW_MODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^new mode (\d{6})$").unwrap());
static DELETED_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^deleted file mode (\d{6})$").unwrap());
static NEW_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^new file mode (\d{6})$").unwrap());
static COPY_FROM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^copy from (\S+)$").unwrap());
static COPY_TO: Lazy<Regex> = Lazy::new(|| Regex::new(r"^copy to (\S+)$").unwrap());
static RENAME_FROM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^rename from (\S+)$").unwrap());
static RENAME_TO: Lazy<Regex> = Lazy::new(|| Regex::new(r"^rename to (\S+)$").unwrap());
static SIMILARITY_INDEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^similarity index (\d+)%$").unwrap());
static INDEX_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^index ([\w\d,]+)\.\.([\w\d]+)\s?([\w\d]+)?$").unwrap());
static HUNK_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^@{2,} ((?:-\d+(?:,\d+)?\s)+)(\+\d+(?:,\d+)?) @{2,}").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
  WaitingForDiff,
  Header,
  HunkFileA,
  HunkFileB,
  HunkHeader,
  HunkContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderLineKind {
  NoLine,
  OldMode,
  NewMode,
  DeletedFile,
  NewFile,
  CopyFrom,
  CopyTo,
  RenameFrom,
  RenameTo,
  SimilarityIndex,
  Index,
  EndHeader,
}

struct HeaderLine<'a> {
  kind: HeaderLineKind,
  text: &'a str,
}

fn strip_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
  path.strip_prefix(prefix).unwrap_or(path)
}

/// Parses the whole of a unified-diff text into an ordered list of file
/// records, following the state machine described for the diff parser
/// component: `WAITING_FOR_DIFF -> HEADER -> (HUNK_FILE_A -> HUNK_FILE_B ->
/// HUNK_HEADER -> HUNK_CONTENT)*`, with a direct `HEADER -> WAITING_FOR_DIFF`
/// edge for binary files.
pub fn parse(diff_text: &str) -> Vec<DiffFile> {
  let lines: Vec<&str> = diff_text.split('\n').collect();
  let mut files = Vec::new();
  let mut state = State::WaitingForDiff;
  let mut current = DiffFile::default();
  let mut last_header_kind = HeaderLineKind::NoLine;

  let mut i = 0usize;
  while i < lines.len() {
    let line = lines[i];
    match state {
      State::WaitingForDiff => {
        if line.is_empty() || !line.starts_with("diff ") {
          i += 1;
          continue;
        }
        current = DiffFile::default();
        last_header_kind = HeaderLineKind::NoLine;
        if let Some(caps) = DIFF_LINE.captures(line) {
          let token = &caps[1];
          current.kind = if token == "cc" { DiffKind::Combined } else { DiffKind::Normal };
          let file_a = strip_prefix(&caps[2], "a/");
          current.old_path = file_a.to_string();
          // The second path group, when present, is re-read from the same
          // match group as the first path rather than its own capture; the
          // hunk-file states below overwrite both paths for any diff that
          // carries hunks, so this only matters for hunk-less diffs.
          if caps.get(3).is_some() {
            current.new_path = strip_prefix(&caps[2], "a/").to_string();
          }
        }
        state = State::Header;
        i += 1;
      }
      State::Header => {
        let header_line = parse_header_line(line, last_header_kind);
        if header_line.kind == HeaderLineKind::EndHeader {
          if line.starts_with("diff ") {
            state = State::WaitingForDiff;
            // re-feed this line
          } else if line == "Binary files differ" {
            current.status = DiffStatus::BinaryChanged;
            files.push(std::mem::take(&mut current));
            state = State::WaitingForDiff;
            i += 1;
          } else {
            state = State::HunkFileA;
            // re-feed this line
          }
        } else {
          apply_header_line(&header_line, &mut current);
          last_header_kind = header_line.kind;
          i += 1;
        }
      }
      State::HunkFileA => {
        if let Some(tok) = line.split_whitespace().nth(1) {
          current.old_path = strip_prefix(tok, "a/").to_string();
        }
        state = State::HunkFileB;
        i += 1;
      }
      State::HunkFileB => {
        if let Some(tok) = line.split_whitespace().nth(1) {
          current.new_path = strip_prefix(tok, "b/").to_string();
        }
        state = State::HunkHeader;
        i += 1;
      }
      State::HunkHeader => {
        let (before, after) = parse_hunk_header(line);
        current.hunk_ranges_before = before;
        current.hunk_range_after = after;
        state = State::HunkContent;
        i += 1;
      }
      State::HunkContent => {
        if line.starts_with("diff ") {
          files.push(std::mem::take(&mut current));
          state = State::WaitingForDiff;
          // re-feed this line
        } else {
          current.hunk_content.push(line.to_string());
          i += 1;
        }
      }
    }
  }

  if current.status != DiffStatus::Unknown {
    files.push(current);
  }

  files
}

fn parse_header_line(line: &str, previous: HeaderLineKind) -> HeaderLine<'_> {
  let try_match = |re: &Regex, kind: HeaderLineKind| -> Option<HeaderLine<'_>> { re.is_match(line).then_some(HeaderLine { kind, text: line }) };

  let matched = match previous {
    HeaderLineKind::NoLine => try_match(&INDEX_LINE, HeaderLineKind::Index)
      .or_else(|| try_match(&NEW_FILE, HeaderLineKind::NewFile))
      .or_else(|| try_match(&DELETED_FILE, HeaderLineKind::DeletedFile))
      .or_else(|| try_match(&SIMILARITY_INDEX, HeaderLineKind::SimilarityIndex))
      .or_else(|| try_match(&OLD_MODE, HeaderLineKind::OldMode)),
    HeaderLineKind::SimilarityIndex => try_match(&RENAME_FROM, HeaderLineKind::RenameFrom).or_else(|| try_match(&COPY_FROM, HeaderLineKind::CopyFrom)),
    HeaderLineKind::RenameFrom => try_match(&RENAME_TO, HeaderLineKind::RenameTo),
    HeaderLineKind::CopyFrom => try_match(&COPY_TO, HeaderLineKind::CopyTo),
    HeaderLineKind::OldMode => try_match(&NEW_MODE, HeaderLineKind::NewMode),
    HeaderLineKind::NewFile | HeaderLineKind::DeletedFile | HeaderLineKind::RenameTo | HeaderLineKind::CopyTo | HeaderLineKind::NewMode => try_match(&INDEX_LINE, HeaderLineKind::Index),
    HeaderLineKind::Index | HeaderLineKind::EndHeader => None,
  };

  matched.unwrap_or(HeaderLine { kind: HeaderLineKind::EndHeader, text: line })
}

fn apply_header_line(header_line: &HeaderLine<'_>, diff_file: &mut DiffFile) {
  match header_line.kind {
    HeaderLineKind::NewFile => {
      diff_file.status = DiffStatus::New;
      diff_file.old_path = "/dev/null".to_string();
      diff_file.new_mode = capture_mode(&NEW_FILE, header_line.text);
    }
    HeaderLineKind::DeletedFile => {
      diff_file.status = DiffStatus::Deleted;
      diff_file.new_path = "/dev/null".to_string();
      diff_file.old_mode = capture_mode(&DELETED_FILE, header_line.text);
    }
    HeaderLineKind::OldMode => {
      diff_file.status = DiffStatus::TypeChanged;
      diff_file.old_mode = capture_mode(&OLD_MODE, header_line.text);
    }
    HeaderLineKind::NewMode => {
      if diff_file.status == DiffStatus::TypeChanged {
        diff_file.new_mode = capture_mode(&NEW_MODE, header_line.text);
      }
    }
    HeaderLineKind::RenameFrom => {
      diff_file.status = DiffStatus::Renamed;
      diff_file.old_path = capture_path(&RENAME_FROM, header_line.text);
    }
    HeaderLineKind::RenameTo => {
      if diff_file.status == DiffStatus::Renamed {
        diff_file.new_path = capture_path(&RENAME_TO, header_line.text);
      }
    }
    HeaderLineKind::CopyFrom => {
      diff_file.status = DiffStatus::Copied;
      diff_file.old_path = capture_path(&COPY_FROM, header_line.text);
    }
    HeaderLineKind::CopyTo => {
      if diff_file.status == DiffStatus::Copied {
        diff_file.new_path = capture_path(&COPY_TO, header_line.text);
      }
    }
    HeaderLineKind::SimilarityIndex => {
      let caps = SIMILARITY_INDEX.captures(header_line.text).expect("already matched");
      diff_file.similarity_index = caps[1].parse().unwrap_or(0);
    }
    HeaderLineKind::Index => {
      let caps = INDEX_LINE.captures(header_line.text).expect("already matched");
      diff_file.indices_before = caps[1].split(',').map(str::to_string).collect();
      diff_file.index_after = caps[2].to_string();
      let mode: u32 = caps.get(3).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
      if mode != 0 && diff_file.new_mode == 0 {
        diff_file.new_mode = mode;
      }

      diff_file.status = match diff_file.status {
        DiffStatus::Unknown => DiffStatus::Modified,
        DiffStatus::Renamed => DiffStatus::RenamedAndModified,
        DiffStatus::Copied => DiffStatus::CopiedAndModified,
        DiffStatus::TypeChanged => DiffStatus::TypeChangedToSymlink,
        other => other,
      };
    }
    HeaderLineKind::NoLine | HeaderLineKind::EndHeader => {}
  }
}

fn capture_mode(re: &Regex, line: &str) -> u32 {
  re.captures(line).and_then(|c| c[1].parse().ok()).unwrap_or(0)
}

fn capture_path(re: &Regex, line: &str) -> String {
  re.captures(line).map(|c| c[1].to_string()).unwrap_or_default()
}

fn parse_hunk_header(line: &str) -> (Vec<HunkRange>, HunkRange) {
  let Some(caps) = HUNK_HEADER.captures(line) else {
    return (Vec::new(), HunkRange { line: 0, count: -1 });
  };

  let before = caps[1].split_whitespace().map(parse_hunk_range).collect();
  let after = parse_hunk_range(&caps[2]);

  (before, after)
}

fn parse_hunk_range(range: &str) -> HunkRange {
  let body = &range[1..]; // strip leading '+' or '-'
  match body.split_once(',') {
    Some((line, count)) => HunkRange {
      line: line.parse().unwrap_or(0),
      count: count.parse().unwrap_or(-1),
    },
    None => HunkRange {
      line: body.parse().unwrap_or(0),
      count: -1,
    },
  }
}
