//! Lexical analysis: turns the raw input string into a vector of tokens.
//!
//! The tokenizer is intentionally tiny – it knows nothing about semantics
//! beyond recognising keywords, operators and numeric literals.
//! Multi-character punctuators are matched before single-character ones to
//! avoid ambiguity, and identifier-shaped words are classified against the
//! keyword table after the whole word has been consumed so that e.g.
//! `interior` never lexes as `int` followed by `erior`.

use crate::error::{CompileError, CompileResult};

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Keyword,
  Punctuator,
  Ident,
  Num,
  Eof,
}

/// Thin wrapper for lexical information needed by later stages.
#[derive(Debug, Clone)]
pub struct Token {
  pub kind: TokenKind,
  pub value: Option<i32>,
  pub loc: usize,
  pub len: usize,
}

impl Token {
  /// Convenience constructor to keep the `tokenize` loop readable.
  pub fn new(kind: TokenKind, loc: usize, len: usize, value: Option<i32>) -> Self {
    Self {
      kind,
      value,
      loc,
      len,
    }
  }
}

const KEYWORDS: [&str; 9] = [
  "int", "return", "if", "else", "for", "while", "do", "break", "continue",
];

// Two-character punctuators must stay ahead of their one-character prefixes.
const MULTI_CHAR_PUNCTUATORS: [&str; 8] = ["==", "!=", "<=", ">=", "&&", "||", "++", "--"];

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
pub fn tokenize(input: &str) -> CompileResult<Vec<Token>> {
  let mut tokens = Vec::new();
  let bytes = input.as_bytes();
  let mut i = 0;

  while i < bytes.len() {
    let c = bytes[i];
    if c.is_ascii_whitespace() {
      i += 1;
      continue;
    }

    if c.is_ascii_digit() {
      let start = i;
      i += 1;
      while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
      }
      let text = &input[start..i];
      let value = text
        .parse::<i32>()
        .map_err(|err| CompileError::lex_at(input, start, format!("invalid number: {err}")))?;
      tokens.push(Token::new(TokenKind::Num, start, i - start, Some(value)));
      continue;
    }

    if c.is_ascii_alphabetic() || c == b'_' {
      let start = i;
      i += 1;
      while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
      }
      let kind = if KEYWORDS.contains(&&input[start..i]) {
        TokenKind::Keyword
      } else {
        TokenKind::Ident
      };
      tokens.push(Token::new(kind, start, i - start, None));
      continue;
    }

    if let Some(op) = MULTI_CHAR_PUNCTUATORS
      .into_iter()
      .find(|op| input[i..].starts_with(op))
    {
      tokens.push(Token::new(TokenKind::Punctuator, i, op.len(), None));
      i += op.len();
      continue;
    }

    if matches!(
      c,
      b'+'
        | b'-'
        | b'*'
        | b'/'
        | b'%'
        | b'('
        | b')'
        | b'{'
        | b'}'
        | b'<'
        | b'>'
        | b'['
        | b']'
        | b'='
        | b';'
        | b':'
        | b','
        | b'?'
        | b'!'
        | b'~'
        | b'&'
    ) {
      tokens.push(Token::new(TokenKind::Punctuator, i, 1, None));
      i += 1;
      continue;
    }

    let invalid_char = input[i..].chars().next().unwrap_or('\0');
    return Err(CompileError::lex_at(
      input,
      i,
      format!("invalid token: '{invalid_char}'"),
    ));
  }

  tokens.push(Token::new(TokenKind::Eof, input.len(), 0, None));
  Ok(tokens)
}

/// Return the slice from the source that produced this token.
pub fn token_text<'a>(token: &Token, source: &'a str) -> &'a str {
  let end = token.loc + token.len;
  &source[token.loc..end]
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: Option<&Token>, source: &str) -> String {
  match token {
    Some(t) => match t.kind {
      TokenKind::Eof => "EOF".to_string(),
      _ => token_text(t, source).to_string(),
    },
    None => "EOF".to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source)
      .unwrap()
      .iter()
      .map(|token| token.kind)
      .collect()
  }

  fn texts(source: &str) -> Vec<String> {
    let tokens = tokenize(source).unwrap();
    tokens
      .iter()
      .filter(|token| token.kind != TokenKind::Eof)
      .map(|token| token_text(token, source).to_string())
      .collect()
  }

  #[test]
  fn keywords_and_identifiers_are_distinguished() {
    assert_eq!(
      kinds("int returns"),
      vec![TokenKind::Keyword, TokenKind::Ident, TokenKind::Eof]
    );
    // A keyword prefix inside a longer word stays an identifier.
    assert_eq!(
      kinds("interior dot"),
      vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Eof]
    );
  }

  #[test]
  fn multi_char_punctuators_win_over_single_char() {
    assert_eq!(texts("<= < == = && & ++ +"), vec![
      "<=", "<", "==", "=", "&&", "&", "++", "+"
    ]);
  }

  #[test]
  fn adjacent_punctuators_split_greedily() {
    // `a==-b` must lex as `a`, `==`, `-`, `b`.
    assert_eq!(texts("a==-b"), vec!["a", "==", "-", "b"]);
  }

  #[test]
  fn numbers_carry_their_value() {
    let tokens = tokenize("return 42;").unwrap();
    let num = tokens
      .iter()
      .find(|token| token.kind == TokenKind::Num)
      .unwrap();
    assert_eq!(num.value, Some(42));
  }

  #[test]
  fn unknown_character_is_a_lex_error() {
    let err = tokenize("int main() { return @; }").unwrap_err();
    assert!(err.to_string().contains("invalid token: '@'"));
  }

  #[test]
  fn overflowing_literal_is_a_lex_error() {
    let err = tokenize("9999999999").unwrap_err();
    assert!(err.to_string().contains("invalid number"));
  }

  #[test]
  fn stream_always_ends_with_eof() {
    assert_eq!(kinds(""), vec![TokenKind::Eof]);
    assert_eq!(kinds("   \n\t "), vec![TokenKind::Eof]);
  }
}
