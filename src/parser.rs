//! Recursive-descent parser producing the program AST.
//!
//! The parser is a precedence-climbing set of helpers, one per operator
//! tier, each looping while its own operators are in view and delegating to
//! the next tighter-binding tier for operands. Statements dispatch on their
//! leading keyword. Function-level semantic checks (arity agreement, one
//! definition per name, call-site validation) run in the same single pass:
//! a function's declaration is registered before its body is parsed, so
//! direct recursion and calls to earlier declarations resolve without a
//! second pass. There is no backtracking and no error recovery – the first
//! failure aborts the parse.

use std::collections::{HashMap, HashSet};

use crate::ast::{
  BinaryOp, BlockItem, Declaration, Expr, ForInit, Function, PostfixOp, Program, Statement,
  UnaryOp,
};
use crate::error::{CompileError, CompileResult};
use crate::tokenizer::{Token, TokenKind, describe_token, token_text};
use crate::ty::Type;

/// Parse a token stream into a program.
pub fn parse(tokens: Vec<Token>, source: &str) -> CompileResult<Program> {
  let mut stream = TokenStream::new(tokens, source);
  let mut ctx = ParserContext::default();

  if stream.is_eof() {
    return Err(CompileError::syntax_at(source, 0, "program is empty"));
  }

  let mut functions = Vec::new();
  while !stream.is_eof() {
    functions.push(parse_function(&mut stream, &mut ctx)?);
  }

  Ok(Program { functions })
}

/// Semantic state threaded through the whole parse. Keeping it an explicit
/// value means independent parses never interfere with each other.
#[derive(Default)]
struct ParserContext {
  /// Function name to arity, populated at the first declaration.
  declared: HashMap<String, usize>,
  /// Names that already carry a body.
  defined: HashSet<String>,
  /// Nesting depth of loop bodies, for rejecting stray break/continue.
  loop_depth: usize,
}

impl ParserContext {
  fn declare_function(
    &mut self,
    name: &str,
    arity: usize,
    source: &str,
    loc: usize,
  ) -> CompileResult<()> {
    if let Some(&known) = self.declared.get(name)
      && known != arity
    {
      return Err(CompileError::semantic_at(
        source,
        loc,
        format!("conflicting declarations of '{name}': {known} parameter(s) vs {arity}"),
      ));
    }
    self.declared.insert(name.to_string(), arity);
    Ok(())
  }

  fn define_function(&mut self, name: &str, source: &str, loc: usize) -> CompileResult<()> {
    if !self.defined.insert(name.to_string()) {
      return Err(CompileError::semantic_at(
        source,
        loc,
        format!("'{name}' is defined more than once"),
      ));
    }
    Ok(())
  }

  fn check_call(&self, name: &str, argc: usize, source: &str, loc: usize) -> CompileResult<()> {
    match self.declared.get(name) {
      None => Err(CompileError::semantic_at(
        source,
        loc,
        format!("call to undeclared function '{name}'"),
      )),
      Some(&arity) if arity != argc => Err(CompileError::semantic_at(
        source,
        loc,
        format!("'{name}' takes {arity} argument(s) but {argc} were supplied"),
      )),
      Some(_) => Ok(()),
    }
  }
}

fn parse_function(stream: &mut TokenStream, ctx: &mut ParserContext) -> CompileResult<Function> {
  stream.skip("int")?;
  let (name, name_loc) = stream.get_ident()?;
  stream.skip("(")?;

  let mut params = Vec::new();
  if !stream.equal(")") {
    loop {
      stream.skip("int")?;
      let (param, param_loc) = stream.get_ident()?;
      if params.contains(&param) {
        return Err(CompileError::semantic_at(
          stream.source,
          param_loc,
          format!("duplicate parameter name '{param}'"),
        ));
      }
      params.push(param);
      if stream.equal(")") {
        break;
      }
      stream.skip(",")?;
    }
  }

  // Register the declaration before any body is parsed so the function can
  // call itself and later siblings can call it.
  ctx.declare_function(&name, params.len(), stream.source, name_loc)?;

  if stream.equal(";") {
    return Ok(Function {
      name,
      params,
      body: None,
    });
  }

  stream.skip("{")?;
  ctx.define_function(&name, stream.source, name_loc)?;

  let mut items = Vec::new();
  loop {
    if stream.equal("}") {
      break;
    }
    if stream.is_eof() {
      return Err(CompileError::syntax_at(
        stream.source,
        stream.current_loc(),
        "expected \"}\" before end of input",
      ));
    }
    items.push(parse_block_item(stream, ctx)?);
  }

  // Guarantee the definition terminates with a return.
  if !matches!(
    items.last(),
    Some(BlockItem::Statement(Statement::Return(_)))
  ) {
    items.push(BlockItem::Statement(Statement::Return(Expr::constant(0))));
  }

  Ok(Function {
    name,
    params,
    body: Some(items),
  })
}

fn parse_block_item(stream: &mut TokenStream, ctx: &mut ParserContext) -> CompileResult<BlockItem> {
  if stream.next_is("int") {
    return Ok(BlockItem::Declaration(parse_declaration(stream, ctx)?));
  }
  Ok(BlockItem::Statement(parse_statement(stream, ctx)?))
}

/// Parse `int [*] name [\[N\]] [= expr] ;`. The pointer and array forms only
/// populate the declaration's type metadata.
fn parse_declaration(
  stream: &mut TokenStream,
  ctx: &mut ParserContext,
) -> CompileResult<Declaration> {
  stream.skip("int")?;
  let mut ty = Type::int();
  if stream.equal("*") {
    ty = Type::pointer_to(ty);
  }

  let (name, _) = stream.get_ident()?;

  if stream.equal("[") {
    let (len, _) = stream.get_number()?;
    stream.skip("]")?;
    ty = Type::array_of(ty, len as usize);
  }

  let init = if stream.equal("=") {
    Some(parse_expr(stream, ctx)?)
  } else {
    None
  };
  stream.skip(";")?;

  Ok(Declaration { name, init, ty })
}

fn parse_statement(stream: &mut TokenStream, ctx: &mut ParserContext) -> CompileResult<Statement> {
  let loc = stream.current_loc();

  if stream.equal("return") {
    let expr = parse_expr(stream, ctx)?;
    stream.skip(";")?;
    return Ok(Statement::Return(expr));
  }

  if stream.equal("if") {
    stream.skip("(")?;
    let cond = parse_expr(stream, ctx)?;
    stream.skip(")")?;
    let then = parse_statement(stream, ctx)?;
    let otherwise = if stream.equal("else") {
      Some(parse_statement(stream, ctx)?)
    } else {
      None
    };
    return Ok(Statement::if_else(cond, then, otherwise));
  }

  if stream.equal("{") {
    let mut items = Vec::new();
    loop {
      if stream.equal("}") {
        break;
      }
      if stream.is_eof() {
        return Err(CompileError::syntax_at(
          stream.source,
          stream.current_loc(),
          "expected \"}\" before end of input",
        ));
      }
      items.push(parse_block_item(stream, ctx)?);
    }
    return Ok(Statement::Block(items));
  }

  if stream.equal("break") {
    if ctx.loop_depth == 0 {
      return Err(CompileError::semantic_at(
        stream.source,
        loc,
        "'break' outside of a loop",
      ));
    }
    stream.skip(";")?;
    return Ok(Statement::Break);
  }

  if stream.equal("continue") {
    if ctx.loop_depth == 0 {
      return Err(CompileError::semantic_at(
        stream.source,
        loc,
        "'continue' outside of a loop",
      ));
    }
    stream.skip(";")?;
    return Ok(Statement::Continue);
  }

  if stream.equal("while") {
    stream.skip("(")?;
    let cond = parse_expr(stream, ctx)?;
    stream.skip(")")?;
    ctx.loop_depth += 1;
    let body = parse_statement(stream, ctx)?;
    ctx.loop_depth -= 1;
    return Ok(Statement::while_loop(cond, body));
  }

  if stream.equal("do") {
    ctx.loop_depth += 1;
    let body = parse_statement(stream, ctx)?;
    ctx.loop_depth -= 1;
    stream.skip("while")?;
    stream.skip("(")?;
    let cond = parse_expr(stream, ctx)?;
    stream.skip(")")?;
    stream.skip(";")?;
    return Ok(Statement::do_while(body, cond));
  }

  if stream.equal("for") {
    stream.skip("(")?;
    let init = if stream.next_is("int") {
      // The declaration consumes its own terminating semicolon.
      ForInit::Declaration(parse_declaration(stream, ctx)?)
    } else if stream.equal(";") {
      ForInit::Expression(None)
    } else {
      let expr = parse_expr(stream, ctx)?;
      stream.skip(";")?;
      ForInit::Expression(Some(expr))
    };

    // A missing condition means an infinite loop.
    let cond = if stream.equal(";") {
      Expr::constant(1)
    } else {
      let expr = parse_expr(stream, ctx)?;
      stream.skip(";")?;
      expr
    };

    let step = if stream.next_is(")") {
      None
    } else {
      Some(parse_expr(stream, ctx)?)
    };
    stream.skip(")")?;

    ctx.loop_depth += 1;
    let body = parse_statement(stream, ctx)?;
    ctx.loop_depth -= 1;
    return Ok(Statement::for_loop(init, cond, step, body));
  }

  // Expression statement, possibly the bare `;`.
  if stream.equal(";") {
    return Ok(Statement::Expression(None));
  }
  let expr = parse_expr(stream, ctx)?;
  stream.skip(";")?;
  Ok(Statement::Expression(Some(expr)))
}

fn parse_expr(stream: &mut TokenStream, ctx: &mut ParserContext) -> CompileResult<Expr> {
  // An identifier directly followed by `=` starts an assignment; everything
  // else falls through to the conditional tier. `==` never matches here
  // because the whole punctuator text is compared.
  if let (Some(first), Some(second)) = (stream.peek(), stream.peek_second())
    && first.kind == TokenKind::Ident
    && second.kind == TokenKind::Punctuator
    && token_text(second, stream.source) == "="
  {
    let (name, _) = stream.get_ident()?;
    stream.skip("=")?;
    let value = parse_expr(stream, ctx)?;
    return Ok(Expr::assignment(name, value));
  }

  parse_conditional(stream, ctx)
}

fn parse_conditional(stream: &mut TokenStream, ctx: &mut ParserContext) -> CompileResult<Expr> {
  let cond = parse_logical_or(stream, ctx)?;

  if stream.equal("?") {
    let then = parse_expr(stream, ctx)?;
    stream.skip(":")?;
    let otherwise = parse_conditional(stream, ctx)?;
    return Ok(Expr::conditional(cond, then, otherwise));
  }

  Ok(cond)
}

fn parse_logical_or(stream: &mut TokenStream, ctx: &mut ParserContext) -> CompileResult<Expr> {
  let mut node = parse_logical_and(stream, ctx)?;

  loop {
    let op_str = match stream
      .peek()
      .filter(|token| token.kind == TokenKind::Punctuator)
      .map(|token| token_text(token, stream.source))
    {
      Some(symbol @ "||") => symbol,
      _ => break,
    };

    stream.skip(op_str)?;
    let rhs = parse_logical_and(stream, ctx)?;
    node = Expr::binary(BinaryOp::LogicalOr, node, rhs);
  }

  Ok(node)
}

fn parse_logical_and(stream: &mut TokenStream, ctx: &mut ParserContext) -> CompileResult<Expr> {
  let mut node = parse_equality(stream, ctx)?;

  loop {
    let op_str = match stream
      .peek()
      .filter(|token| token.kind == TokenKind::Punctuator)
      .map(|token| token_text(token, stream.source))
    {
      Some(symbol @ "&&") => symbol,
      _ => break,
    };

    stream.skip(op_str)?;
    let rhs = parse_equality(stream, ctx)?;
    node = Expr::binary(BinaryOp::LogicalAnd, node, rhs);
  }

  Ok(node)
}

fn parse_equality(stream: &mut TokenStream, ctx: &mut ParserContext) -> CompileResult<Expr> {
  let mut node = parse_relational(stream, ctx)?;

  loop {
    let op_str = match stream
      .peek()
      .filter(|token| token.kind == TokenKind::Punctuator)
      .map(|token| token_text(token, stream.source))
    {
      Some(symbol @ "==") => symbol,
      Some(symbol @ "!=") => symbol,
      _ => break,
    };

    let op = match op_str {
      "==" => BinaryOp::Eq,
      "!=" => BinaryOp::Ne,
      _ => unreachable!(),
    };

    stream.skip(op_str)?;
    let rhs = parse_relational(stream, ctx)?;
    node = Expr::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_relational(stream: &mut TokenStream, ctx: &mut ParserContext) -> CompileResult<Expr> {
  let mut node = parse_add(stream, ctx)?;

  loop {
    let op_str = match stream
      .peek()
      .filter(|token| token.kind == TokenKind::Punctuator)
      .map(|token| token_text(token, stream.source))
    {
      Some(symbol @ "<") => symbol,
      Some(symbol @ "<=") => symbol,
      Some(symbol @ ">") => symbol,
      Some(symbol @ ">=") => symbol,
      _ => break,
    };

    let op = match op_str {
      "<" => BinaryOp::Lt,
      "<=" => BinaryOp::Le,
      ">" => BinaryOp::Gt,
      ">=" => BinaryOp::Ge,
      _ => unreachable!(),
    };

    stream.skip(op_str)?;
    let rhs = parse_add(stream, ctx)?;
    node = Expr::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_add(stream: &mut TokenStream, ctx: &mut ParserContext) -> CompileResult<Expr> {
  let mut node = parse_mul(stream, ctx)?;

  loop {
    let op_str = match stream
      .peek()
      .filter(|token| token.kind == TokenKind::Punctuator)
      .map(|token| token_text(token, stream.source))
    {
      Some(symbol @ "+") => symbol,
      Some(symbol @ "-") => symbol,
      _ => break,
    };

    let op = match op_str {
      "+" => BinaryOp::Add,
      "-" => BinaryOp::Sub,
      _ => unreachable!(),
    };

    stream.skip(op_str)?;
    let rhs = parse_mul(stream, ctx)?;
    node = Expr::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_mul(stream: &mut TokenStream, ctx: &mut ParserContext) -> CompileResult<Expr> {
  let mut node = parse_unary(stream, ctx)?;

  loop {
    let op_str = match stream
      .peek()
      .filter(|token| token.kind == TokenKind::Punctuator)
      .map(|token| token_text(token, stream.source))
    {
      Some(symbol @ "*") => symbol,
      Some(symbol @ "/") => symbol,
      Some(symbol @ "%") => symbol,
      _ => break,
    };

    let op = match op_str {
      "*" => BinaryOp::Mul,
      "/" => BinaryOp::Div,
      "%" => BinaryOp::Mod,
      _ => unreachable!(),
    };

    stream.skip(op_str)?;
    let rhs = parse_unary(stream, ctx)?;
    node = Expr::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_unary(stream: &mut TokenStream, ctx: &mut ParserContext) -> CompileResult<Expr> {
  if stream.equal("-") {
    let operand = parse_unary(stream, ctx)?;
    return Ok(Expr::unary(UnaryOp::Negate, operand));
  }
  if stream.equal("~") {
    let operand = parse_unary(stream, ctx)?;
    return Ok(Expr::unary(UnaryOp::Complement, operand));
  }
  if stream.equal("!") {
    let operand = parse_unary(stream, ctx)?;
    return Ok(Expr::unary(UnaryOp::LogicalNot, operand));
  }
  if stream.equal("*") {
    let operand = parse_unary(stream, ctx)?;
    return Ok(Expr::unary(UnaryOp::Dereference, operand));
  }
  if stream.equal("&") {
    let operand = parse_unary(stream, ctx)?;
    return Ok(Expr::unary(UnaryOp::AddressOf, operand));
  }

  parse_postfix(stream, ctx)
}

fn parse_postfix(stream: &mut TokenStream, ctx: &mut ParserContext) -> CompileResult<Expr> {
  let mut node = parse_primary(stream, ctx)?;

  loop {
    let op_str = match stream
      .peek()
      .filter(|token| token.kind == TokenKind::Punctuator)
      .map(|token| token_text(token, stream.source))
    {
      Some(symbol @ "++") => symbol,
      Some(symbol @ "--") => symbol,
      _ => break,
    };

    let loc = stream.current_loc();
    stream.skip(op_str)?;
    let op = match op_str {
      "++" => PostfixOp::Increment,
      "--" => PostfixOp::Decrement,
      _ => unreachable!(),
    };

    node = match node {
      Expr::Variable { name, index: None } => Expr::postfix(op, name),
      _ => {
        return Err(CompileError::syntax_at(
          stream.source,
          loc,
          format!("'{op_str}' target must be a variable"),
        ));
      }
    };
  }

  Ok(node)
}

fn parse_primary(stream: &mut TokenStream, ctx: &mut ParserContext) -> CompileResult<Expr> {
  if stream.equal("(") {
    let node = parse_expr(stream, ctx)?;
    stream.skip(")")?;
    return Ok(node);
  }

  if matches!(
    stream.peek().map(|token| token.kind),
    Some(TokenKind::Ident)
  ) {
    let (name, name_loc) = stream.get_ident()?;

    if stream.equal("(") {
      let mut args = Vec::new();
      if !stream.equal(")") {
        loop {
          args.push(parse_expr(stream, ctx)?);
          if stream.equal(")") {
            break;
          }
          stream.skip(",")?;
        }
      }
      ctx.check_call(&name, args.len(), stream.source, name_loc)?;
      return Ok(Expr::call(name, args));
    }

    if stream.equal("[") {
      let index = parse_expr(stream, ctx)?;
      stream.skip("]")?;
      return Ok(Expr::indexed(name, index));
    }

    return Ok(Expr::variable(name));
  }

  if matches!(stream.peek().map(|token| token.kind), Some(TokenKind::Num)) {
    let (value, _) = stream.get_number()?;
    return Ok(Expr::constant(value));
  }

  let got = describe_token(stream.current(), stream.source);
  Err(CompileError::syntax_at(
    stream.source,
    stream.current_loc(),
    format!("expected an expression, but got \"{got}\""),
  ))
}

/// Lightweight cursor over the token vector.
struct TokenStream<'a> {
  tokens: Vec<Token>,
  source: &'a str,
  pos: usize,
}

impl<'a> TokenStream<'a> {
  /// Take ownership of the token stream; the parser will advance `pos` as it consumes input.
  fn new(tokens: Vec<Token>, source: &'a str) -> Self {
    Self {
      tokens,
      source,
      pos: 0,
    }
  }

  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  fn peek_second(&self) -> Option<&Token> {
    self.tokens.get(self.pos + 1)
  }

  fn current(&self) -> Option<&Token> {
    self.peek()
  }

  fn current_loc(&self) -> usize {
    self
      .tokens
      .get(self.pos)
      .map_or(self.source.len(), |token| token.loc)
  }

  /// Consume the current token if its whole text matches the given keyword
  /// or punctuator.
  fn equal(&mut self, op: &str) -> bool {
    if let Some(token) = self.peek()
      && matches!(token.kind, TokenKind::Punctuator | TokenKind::Keyword)
      && token.len == op.len()
      && token_text(token, self.source) == op
    {
      self.pos += 1;
      return true;
    }
    false
  }

  /// Non-consuming variant of `equal`.
  fn next_is(&self, op: &str) -> bool {
    if let Some(token) = self.peek() {
      matches!(token.kind, TokenKind::Punctuator | TokenKind::Keyword)
        && token.len == op.len()
        && token_text(token, self.source) == op
    } else {
      false
    }
  }

  fn skip(&mut self, s: &str) -> CompileResult<()> {
    if self.equal(s) {
      Ok(())
    } else {
      let (loc, got) = self.describe_current();
      Err(CompileError::syntax_at(
        self.source,
        loc,
        format!("expected \"{s}\", but got \"{got}\""),
      ))
    }
  }

  /// Parse the current token as an integer literal returning its value and location.
  fn get_number(&mut self) -> CompileResult<(i32, usize)> {
    if let Some(token) = self.tokens.get(self.pos)
      && token.kind == TokenKind::Num
    {
      let value = token.value.ok_or_else(|| {
        CompileError::syntax_at(
          self.source,
          token.loc,
          "internal error: numeric token missing value",
        )
      })?;
      let loc = token.loc;
      self.pos += 1;
      return Ok((value, loc));
    }

    let (loc, got) = self.describe_current();
    Err(CompileError::syntax_at(
      self.source,
      loc,
      format!("expected a number, but got \"{got}\""),
    ))
  }

  /// Parse the current token as an identifier.
  fn get_ident(&mut self) -> CompileResult<(String, usize)> {
    if let Some(token) = self.tokens.get(self.pos)
      && token.kind == TokenKind::Ident
    {
      let name = token_text(token, self.source).to_string();
      let loc = token.loc;
      self.pos += 1;
      return Ok((name, loc));
    }

    let (loc, got) = self.describe_current();
    Err(CompileError::syntax_at(
      self.source,
      loc,
      format!("expected an identifier, but got \"{got}\""),
    ))
  }

  fn describe_current(&self) -> (usize, String) {
    match self.tokens.get(self.pos) {
      Some(token) => (token.loc, describe_token(Some(token), self.source)),
      None => (self.source.len(), "EOF".to_string()),
    }
  }

  fn is_eof(&self) -> bool {
    matches!(self.peek().map(|token| token.kind), Some(TokenKind::Eof))
  }
}
