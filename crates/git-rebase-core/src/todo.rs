use crate::error::RebaseError;
use crate::model::{InstructionKind, RebaseInstruction};

/// Parses one todo-list line: `<verb> <hash> <message>`, except `break`
/// (verb only) and `exec <command>` (verb plus a single free-form field).
/// Tolerant of trailing whitespace; an unrecognised leading token is a
/// parse failure.
pub fn parse_line(line: &str) -> Result<RebaseInstruction, RebaseError> {
  let trimmed = line.trim_end().trim_start();
  if trimmed.is_empty() {
    return Err(RebaseError::InvalidTodoLine { line: line.to_string() });
  }

  let (token, rest) = match trimmed.split_once(char::is_whitespace) {
    Some((token, rest)) => (token, rest.trim_start()),
    None => (trimmed, ""),
  };

  let kind = InstructionKind::from_token(token).ok_or_else(|| RebaseError::InvalidTodoLine { line: line.to_string() })?;

  match kind {
    InstructionKind::Break => Ok(RebaseInstruction {
      kind,
      hash: String::new(),
      message: String::new(),
    }),
    InstructionKind::Exec => Ok(RebaseInstruction {
      kind,
      hash: String::new(),
      message: rest.to_string(),
    }),
    _ => {
      let (hash, message) = match rest.split_once(char::is_whitespace) {
        Some((hash, message)) => (hash.to_string(), message.trim_start().to_string()),
        None => (rest.to_string(), String::new()),
      };
      Ok(RebaseInstruction { kind, hash, message })
    }
  }
}

/// Re-serialises an instruction to its long form. `parse_line(serialise_line(i))
/// == i` for any instruction `parse_line` can produce.
pub fn serialise_line(instruction: &RebaseInstruction) -> String {
  match instruction.kind {
    InstructionKind::Break => "break".to_string(),
    InstructionKind::Exec => format!("exec {}", instruction.message),
    _ => format!("{} {} {}", instruction.kind.long_form(), instruction.hash, instruction.message).trim_end().to_string(),
  }
}

/// Parses a whole todo file, skipping blank lines.
pub fn parse_todo_text(text: &str) -> Result<Vec<RebaseInstruction>, RebaseError> {
  text.lines().filter(|line| !line.trim().is_empty()).map(parse_line).collect()
}

/// Serialises a todo list one instruction per line, LF-terminated. An
/// empty list serialises to an empty string (the exhausted-list sentinel).
pub fn serialise_todo_text(instructions: &[RebaseInstruction]) -> String {
  if instructions.is_empty() {
    return String::new();
  }
  let mut text = instructions.iter().map(serialise_line).collect::<Vec<_>>().join("\n");
  text.push('\n');
  text
}
