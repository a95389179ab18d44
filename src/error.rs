//! Shared error utilities used across the compilation pipeline.
//!
//! Diagnostics are kept lightweight on purpose – source-anchored errors
//! render the offending line up front and point at the offending byte with
//! a caret, so the error value needs no further context to display.

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

/// One variant per stage that can fail; every error is fatal and aborts the
/// compile at the first occurrence.
#[derive(Debug, Snafu)]
pub enum CompileError {
  #[snafu(display("{source_line}\n{marker} lex error: {message}"))]
  Lex {
    source_line: String,
    marker: String,
    message: String,
  },
  #[snafu(display("{source_line}\n{marker} syntax error: {message}"))]
  Syntax {
    source_line: String,
    marker: String,
    message: String,
  },
  #[snafu(display("{source_line}\n{marker} semantic error: {message}"))]
  Semantic {
    source_line: String,
    marker: String,
    message: String,
  },
  #[snafu(display("codegen error: {message}"))]
  Codegen { message: String },
}

impl CompileError {
  /// Lex error anchored at a byte offset in the source.
  pub fn lex_at(source: &str, loc: usize, message: impl Into<String>) -> Self {
    let (source_line, marker) = render_location(source, loc);
    Self::Lex {
      source_line,
      marker,
      message: message.into(),
    }
  }

  /// Syntax error anchored at a byte offset in the source.
  pub fn syntax_at(source: &str, loc: usize, message: impl Into<String>) -> Self {
    let (source_line, marker) = render_location(source, loc);
    Self::Syntax {
      source_line,
      marker,
      message: message.into(),
    }
  }

  /// Parse-time semantic error anchored at a byte offset in the source.
  pub fn semantic_at(source: &str, loc: usize, message: impl Into<String>) -> Self {
    let (source_line, marker) = render_location(source, loc);
    Self::Semantic {
      source_line,
      marker,
      message: message.into(),
    }
  }

  /// Code-generation error; the AST carries no source spans, so the message
  /// describes the offending node instead.
  pub fn codegen(message: impl Into<String>) -> Self {
    Self::Codegen {
      message: message.into(),
    }
  }
}

/// Extract the line containing `loc` and build a caret marker pointing at
/// the corresponding column.
fn render_location(source: &str, loc: usize) -> (String, String) {
  let safe_loc = loc.min(source.len());
  let line_start = source[..safe_loc].rfind('\n').map_or(0, |i| i + 1);
  let line_end = source[safe_loc..]
    .find('\n')
    .map_or(source.len(), |i| safe_loc + i);
  let line = source[line_start..line_end].to_string();
  let column = source[line_start..safe_loc].chars().count();
  let marker = format!("{}^", " ".repeat(column));
  (line, marker)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn caret_points_at_offending_column() {
    let source = "int main() { return @; }";
    let err = CompileError::lex_at(source, 20, "invalid token: '@'");
    let rendered = err.to_string();
    let mut lines = rendered.lines();
    assert_eq!(lines.next(), Some("int main() { return @; }"));
    let marker_line = lines.next().unwrap();
    assert!(marker_line.starts_with(&" ".repeat(20)));
    assert!(marker_line.contains("^ lex error: invalid token: '@'"));
  }

  #[test]
  fn caret_targets_correct_line_in_multiline_source() {
    let source = "int main() {\n  return $;\n}";
    let err = CompileError::syntax_at(source, 22, "bad token");
    let rendered = err.to_string();
    assert!(rendered.starts_with("  return $;\n"));
    // Column 9 on the second line.
    assert!(rendered.lines().nth(1).unwrap().starts_with("         ^"));
  }

  #[test]
  fn offset_past_end_of_source_is_clamped() {
    let err = CompileError::syntax_at("int", 99, "unexpected end of input");
    assert!(err.to_string().contains("unexpected end of input"));
  }
}
