//! Code generation: lower the parsed AST into AT&T 32-bit x86 assembly.
//!
//! Every expression evaluates into the `%eax` accumulator; nothing else is
//! assumed preserved across a sub-expression, and `%ebx` serves as the
//! secondary register when two operands must meet. Locals live on the stack
//! frame addressed relative to `%ebp`: parameters sit above the saved frame
//! pointer at `8 + 4*i`, locals are pushed below it at -4, -8, … as their
//! declarations execute. Each lexical block tracks the byte size of its own
//! declarations so block exit (and break/continue unwinding) can release
//! exactly that storage.

use std::collections::{HashMap, HashSet};

use crate::ast::{
  BinaryOp, BlockItem, Declaration, Expr, ForInit, Program, PostfixOp, Statement, UnaryOp,
};
use crate::error::{CompileError, CompileResult};

/// Emit assembly for every function definition in the program, in program
/// order. Bare declarations produce no code.
pub fn generate(program: &Program) -> CompileResult<String> {
  let mut asm = String::new();
  for function in &program.functions {
    if let Some(body) = &function.body {
      let mut generator = FunctionGenerator::new(&function.name);
      generator.emit_function(&function.params, body)?;
      asm.push_str(&generator.asm);
    }
  }
  Ok(asm)
}

/// One lexical scope's bindings. A child starts from a snapshot of every
/// binding visible in its parent, so mutating the child never touches the
/// parent, plus a private record of the names declared directly here and
/// the byte size their storage adds to the frame.
#[derive(Debug, Clone)]
struct ScopeMap {
  vars: HashMap<String, i32>,
  declared_here: HashSet<String>,
  scope_byte_size: i32,
  next_offset: i32,
}

impl ScopeMap {
  fn root() -> Self {
    Self {
      vars: HashMap::new(),
      declared_here: HashSet::new(),
      scope_byte_size: 0,
      next_offset: -4,
    }
  }

  fn child(&self) -> Self {
    Self {
      vars: self.vars.clone(),
      declared_here: HashSet::new(),
      scope_byte_size: 0,
      next_offset: self.next_offset,
    }
  }

  /// Bind a local at the next free offset. Returns `None` when the name was
  /// already declared directly in this scope; shadowing an inherited
  /// binding is fine.
  fn declare_local(&mut self, name: &str) -> Option<i32> {
    if !self.declared_here.insert(name.to_string()) {
      return None;
    }
    let offset = self.next_offset;
    self.vars.insert(name.to_string(), offset);
    self.next_offset -= 4;
    self.scope_byte_size += 4;
    Some(offset)
  }

  /// Bind parameter `index` (0-based, left to right) above the saved frame
  /// pointer. Parameter storage belongs to the caller, so it does not count
  /// toward this scope's cleanup size.
  fn bind_param(&mut self, name: &str, index: usize) {
    self.declared_here.insert(name.to_string());
    self.vars.insert(name.to_string(), 8 + 4 * index as i32);
  }

  fn lookup(&self, name: &str) -> Option<i32> {
    self.vars.get(name).copied()
  }
}

/// Jump targets of the innermost loop plus the scope-stack depth when the
/// loop was entered, so break/continue know how far to unwind.
#[derive(Debug)]
struct LoopFrame {
  continue_label: String,
  break_label: String,
  scope_depth: usize,
}

struct FunctionGenerator<'a> {
  name: &'a str,
  asm: String,
  scopes: Vec<ScopeMap>,
  loops: Vec<LoopFrame>,
  label_counter: u32,
}

impl<'a> FunctionGenerator<'a> {
  fn new(name: &'a str) -> Self {
    Self {
      name,
      asm: String::new(),
      scopes: Vec::new(),
      loops: Vec::new(),
      label_counter: 0,
    }
  }

  fn emit(&mut self, line: &str) {
    self.asm.push_str("    ");
    self.asm.push_str(line);
    self.asm.push('\n');
  }

  fn emit_label(&mut self, label: &str) {
    self.asm.push_str(label);
    self.asm.push_str(":\n");
  }

  /// Function-local counter combined with the function name keeps labels
  /// unique across the whole program.
  fn next_label(&mut self) -> String {
    let label = format!("_{}_L{}", self.name, self.label_counter);
    self.label_counter += 1;
    label
  }

  fn current_scope(&self) -> CompileResult<&ScopeMap> {
    self
      .scopes
      .last()
      .ok_or_else(|| CompileError::codegen("internal error: no active scope"))
  }

  fn current_scope_mut(&mut self) -> CompileResult<&mut ScopeMap> {
    self
      .scopes
      .last_mut()
      .ok_or_else(|| CompileError::codegen("internal error: no active scope"))
  }

  /// The innermost scope's map already inherits every visible binding.
  fn variable_offset(&self, name: &str) -> CompileResult<i32> {
    self
      .current_scope()?
      .lookup(name)
      .ok_or_else(|| CompileError::codegen(format!("use of undeclared variable '{name}'")))
  }

  fn emit_function(&mut self, params: &[String], body: &[BlockItem]) -> CompileResult<()> {
    self.asm.push_str(&format!(".globl _{}\n", self.name));
    self.asm.push_str(&format!("_{}:\n", self.name));
    self.emit("push %ebp");
    self.emit("movl %esp, %ebp");

    let mut scope = ScopeMap::root();
    for (index, param) in params.iter().enumerate() {
      scope.bind_param(param, index);
    }
    self.scopes.push(scope);

    for item in body {
      self.emit_block_item(item)?;
    }

    // The parser guarantees the body ends in a return, whose epilogue
    // restores %esp; no block cleanup is needed for the root scope.
    self.scopes.pop();
    Ok(())
  }

  fn emit_block_item(&mut self, item: &BlockItem) -> CompileResult<()> {
    match item {
      BlockItem::Declaration(decl) => self.emit_declaration(decl),
      BlockItem::Statement(stmt) => self.emit_statement(stmt),
    }
  }

  /// Evaluate the initializer (constant 0 when absent) and push it; the
  /// push both stores the value and allocates the variable's slot.
  fn emit_declaration(&mut self, decl: &Declaration) -> CompileResult<()> {
    match &decl.init {
      Some(expr) => self.emit_expr(expr)?,
      None => self.emit("movl $0, %eax"),
    }
    if self.current_scope_mut()?.declare_local(&decl.name).is_none() {
      return Err(CompileError::codegen(format!(
        "duplicate declaration of '{}' in the same scope",
        decl.name
      )));
    }
    self.emit("push %eax");
    Ok(())
  }

  fn emit_statement(&mut self, stmt: &Statement) -> CompileResult<()> {
    match stmt {
      Statement::Return(expr) => {
        self.emit_expr(expr)?;
        self.emit("movl %ebp, %esp");
        self.emit("pop %ebp");
        self.emit("ret");
      }
      Statement::Expression(Some(expr)) => self.emit_expr(expr)?,
      Statement::Expression(None) => {}
      Statement::Block(items) => self.emit_block(items)?,
      Statement::If {
        cond,
        then,
        otherwise,
      } => {
        self.emit_expr(cond)?;
        self.emit("cmpl $0, %eax");
        match otherwise {
          Some(otherwise) => {
            let else_label = self.next_label();
            let end_label = self.next_label();
            self.emit(&format!("je {else_label}"));
            self.emit_statement(then)?;
            self.emit(&format!("jmp {end_label}"));
            self.emit_label(&else_label);
            self.emit_statement(otherwise)?;
            self.emit_label(&end_label);
          }
          None => {
            let end_label = self.next_label();
            self.emit(&format!("je {end_label}"));
            self.emit_statement(then)?;
            self.emit_label(&end_label);
          }
        }
      }
      Statement::While { cond, body } => {
        // The start label doubles as the continue target.
        let start_label = self.next_label();
        let break_label = self.next_label();
        self.emit_label(&start_label);
        self.emit_expr(cond)?;
        self.emit("cmpl $0, %eax");
        self.emit(&format!("je {break_label}"));
        self.loops.push(LoopFrame {
          continue_label: start_label.clone(),
          break_label: break_label.clone(),
          scope_depth: self.scopes.len(),
        });
        self.emit_statement(body)?;
        self.loops.pop();
        self.emit(&format!("jmp {start_label}"));
        self.emit_label(&break_label);
      }
      Statement::DoWhile { body, cond } => {
        let start_label = self.next_label();
        let break_label = self.next_label();
        self.emit_label(&start_label);
        self.loops.push(LoopFrame {
          continue_label: start_label.clone(),
          break_label: break_label.clone(),
          scope_depth: self.scopes.len(),
        });
        self.emit_statement(body)?;
        self.loops.pop();
        self.emit_expr(cond)?;
        self.emit("cmpl $0, %eax");
        self.emit(&format!("jne {start_label}"));
        self.emit_label(&break_label);
      }
      Statement::For {
        init,
        cond,
        step,
        body,
      } => {
        // A declaration in the head gets its own scope so the induction
        // variable's storage is released when the construct exits.
        let has_head_scope = matches!(init, ForInit::Declaration(_));
        if has_head_scope {
          let child = self.current_scope()?.child();
          self.scopes.push(child);
        }
        match init {
          ForInit::Declaration(decl) => self.emit_declaration(decl)?,
          ForInit::Expression(Some(expr)) => self.emit_expr(expr)?,
          ForInit::Expression(None) => {}
        }

        // The step runs between the body and the re-test, so continue
        // needs its own label distinct from the loop start.
        let start_label = self.next_label();
        let continue_label = self.next_label();
        let break_label = self.next_label();

        self.emit_label(&start_label);
        self.emit_expr(cond)?;
        self.emit("cmpl $0, %eax");
        self.emit(&format!("je {break_label}"));
        self.loops.push(LoopFrame {
          continue_label: continue_label.clone(),
          break_label: break_label.clone(),
          scope_depth: self.scopes.len(),
        });
        self.emit_statement(body)?;
        self.loops.pop();
        self.emit_label(&continue_label);
        if let Some(step) = step {
          self.emit_expr(step)?;
        }
        self.emit(&format!("jmp {start_label}"));
        self.emit_label(&break_label);

        if has_head_scope {
          self.exit_scope()?;
        }
      }
      Statement::Break => {
        let Some(frame) = self.loops.last() else {
          return Err(CompileError::codegen("'break' with no enclosing loop"));
        };
        let target = frame.break_label.clone();
        let depth = frame.scope_depth;
        self.emit_scope_unwind(depth);
        self.emit(&format!("jmp {target}"));
      }
      Statement::Continue => {
        let Some(frame) = self.loops.last() else {
          return Err(CompileError::codegen("'continue' with no enclosing loop"));
        };
        let target = frame.continue_label.clone();
        let depth = frame.scope_depth;
        self.emit_scope_unwind(depth);
        self.emit(&format!("jmp {target}"));
      }
    }
    Ok(())
  }

  fn emit_block(&mut self, items: &[BlockItem]) -> CompileResult<()> {
    let child = self.current_scope()?.child();
    self.scopes.push(child);
    for item in items {
      self.emit_block_item(item)?;
    }
    self.exit_scope()
  }

  /// Pop the innermost scope and release exactly the storage its own
  /// declarations added. Child scopes already cleaned up when they exited.
  fn exit_scope(&mut self) -> CompileResult<()> {
    let scope = self
      .scopes
      .pop()
      .ok_or_else(|| CompileError::codegen("internal error: no active scope"))?;
    if scope.scope_byte_size > 0 {
      self.emit(&format!("addl ${}, %esp", scope.scope_byte_size));
    }
    Ok(())
  }

  /// Emit the stack cleanup for every scope entered since the enclosing
  /// loop, innermost first, without discarding any compile-time scope
  /// state: the transfer leaves lexical scoping intact for whatever
  /// follows the break/continue.
  fn emit_scope_unwind(&mut self, loop_scope_depth: usize) {
    let sizes: Vec<i32> = self.scopes[loop_scope_depth..]
      .iter()
      .rev()
      .map(|scope| scope.scope_byte_size)
      .filter(|&size| size > 0)
      .collect();
    for size in sizes {
      self.emit(&format!("addl ${size}, %esp"));
    }
  }

  fn emit_expr(&mut self, expr: &Expr) -> CompileResult<()> {
    match expr {
      Expr::Constant(value) => {
        self.emit(&format!("movl ${value}, %eax"));
      }
      Expr::Variable { name, index } => {
        if index.is_some() {
          return Err(CompileError::codegen(format!(
            "indexed access to '{name}' is not implemented"
          )));
        }
        let offset = self.variable_offset(name)?;
        self.emit(&format!("movl {offset}(%ebp), %eax"));
      }
      Expr::Assignment { name, value } => {
        self.emit_expr(value)?;
        let offset = self.variable_offset(name)?;
        self.emit(&format!("movl %eax, {offset}(%ebp)"));
      }
      Expr::Conditional {
        cond,
        then,
        otherwise,
      } => {
        self.emit_expr(cond)?;
        self.emit("cmpl $0, %eax");
        let else_label = self.next_label();
        let end_label = self.next_label();
        self.emit(&format!("je {else_label}"));
        self.emit_expr(then)?;
        self.emit(&format!("jmp {end_label}"));
        self.emit_label(&else_label);
        self.emit_expr(otherwise)?;
        self.emit_label(&end_label);
      }
      Expr::Binary { op, lhs, rhs } => self.emit_binary(*op, lhs, rhs)?,
      Expr::Unary { op, operand } => self.emit_unary(*op, operand)?,
      Expr::Postfix { op, name } => {
        // The old value stays in %eax as the expression's result.
        let offset = self.variable_offset(name)?;
        self.emit(&format!("movl {offset}(%ebp), %eax"));
        self.emit("movl %eax, %ebx");
        match op {
          PostfixOp::Increment => self.emit("addl $1, %ebx"),
          PostfixOp::Decrement => self.emit("subl $1, %ebx"),
        }
        self.emit(&format!("movl %ebx, {offset}(%ebp)"));
      }
      Expr::Call { name, args } => {
        // Arguments go on the stack right to left; the caller discards
        // them once the callee returns.
        for arg in args.iter().rev() {
          self.emit_expr(arg)?;
          self.emit("push %eax");
        }
        self.emit(&format!("call _{name}"));
        if !args.is_empty() {
          self.emit(&format!("addl ${}, %esp", 4 * args.len()));
        }
      }
    }
    Ok(())
  }

  fn emit_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> CompileResult<()> {
    self.emit_expr(lhs)?;
    self.emit("push %eax");
    self.emit_expr(rhs)?;

    match op {
      BinaryOp::Add => {
        self.emit("pop %ebx");
        self.emit("addl %ebx, %eax");
      }
      BinaryOp::Sub => {
        self.emit("movl %eax, %ebx");
        self.emit("pop %eax");
        self.emit("subl %ebx, %eax");
      }
      BinaryOp::Mul => {
        self.emit("pop %ebx");
        self.emit("imul %ebx, %eax");
      }
      BinaryOp::Div => {
        self.emit("movl %eax, %ebx");
        self.emit("pop %eax");
        self.emit("cltd");
        self.emit("idivl %ebx");
      }
      BinaryOp::Mod => {
        self.emit("movl %eax, %ebx");
        self.emit("pop %eax");
        self.emit("cltd");
        self.emit("idivl %ebx");
        // Remainder comes back in %edx.
        self.emit("movl %edx, %eax");
      }
      BinaryOp::Eq => self.emit_comparison("sete"),
      BinaryOp::Ne => self.emit_comparison("setne"),
      BinaryOp::Lt => self.emit_comparison("setl"),
      BinaryOp::Le => self.emit_comparison("setle"),
      BinaryOp::Gt => self.emit_comparison("setg"),
      BinaryOp::Ge => self.emit_comparison("setge"),
      // Both operands are always fully evaluated before combining:
      // && and || do not short-circuit.
      BinaryOp::LogicalOr => {
        self.emit("pop %ebx");
        self.emit("orl %ebx, %eax");
        self.emit("movl $0, %eax");
        self.emit("setne %al");
      }
      BinaryOp::LogicalAnd => {
        self.emit("pop %ebx");
        self.emit("cmpl $0, %ebx");
        self.emit("setne %bl");
        self.emit("cmpl $0, %eax");
        self.emit("movl $0, %eax");
        self.emit("setne %al");
        self.emit("andb %bl, %al");
      }
    }
    Ok(())
  }

  /// Left operand was pushed, right is in %eax: compare lhs - rhs and
  /// materialize the boolean into the zeroed accumulator.
  fn emit_comparison(&mut self, set_instr: &str) {
    self.emit("pop %ebx");
    self.emit("cmpl %eax, %ebx");
    self.emit("movl $0, %eax");
    self.emit(&format!("{set_instr} %al"));
  }

  fn emit_unary(&mut self, op: UnaryOp, operand: &Expr) -> CompileResult<()> {
    match op {
      UnaryOp::Negate => {
        self.emit_expr(operand)?;
        self.emit("negl %eax");
      }
      UnaryOp::Complement => {
        self.emit_expr(operand)?;
        self.emit("notl %eax");
      }
      UnaryOp::LogicalNot => {
        self.emit_expr(operand)?;
        self.emit("cmpl $0, %eax");
        self.emit("movl $0, %eax");
        self.emit("sete %al");
      }
      UnaryOp::AddressOf => match operand {
        Expr::Variable { name, index: None } => {
          let offset = self.variable_offset(name)?;
          self.emit(&format!("leal {offset}(%ebp), %eax"));
        }
        _ => {
          return Err(CompileError::codegen(
            "'&' requires a bare variable operand",
          ));
        }
      },
      UnaryOp::Dereference => {
        self.emit_expr(operand)?;
        self.emit("movl (%eax), %eax");
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parser::parse;
  use crate::tokenizer::tokenize;

  fn compile(source: &str) -> String {
    let tokens = tokenize(source).unwrap();
    let program = parse(tokens, source).unwrap();
    generate(&program).unwrap()
  }

  fn compile_err(source: &str) -> CompileError {
    let tokens = tokenize(source).unwrap();
    let program = parse(tokens, source).unwrap();
    generate(&program).unwrap_err()
  }

  fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
  }

  #[test]
  fn constant_return_has_prologue_and_epilogue() {
    let asm = compile("int main() { return 2; }");
    assert!(asm.starts_with(".globl _main\n_main:\n"));
    for line in [
      "push %ebp",
      "movl %esp, %ebp",
      "movl $2, %eax",
      "movl %ebp, %esp",
      "pop %ebp",
      "ret",
    ] {
      assert!(asm.contains(line), "missing `{line}` in:\n{asm}");
    }
  }

  #[test]
  fn literal_boundaries_round_trip_into_the_accumulator() {
    assert!(compile("int main() { return 0; }").contains("movl $0, %eax"));
    assert!(compile("int main() { return 255; }").contains("movl $255, %eax"));
  }

  #[test]
  fn empty_body_returns_zero() {
    let asm = compile("int main() {}");
    assert!(asm.contains("movl $0, %eax"));
    assert!(asm.contains("ret"));
  }

  #[test]
  fn bare_declaration_emits_no_code() {
    let asm = compile("int helper(int x); int main() { return 0; }");
    assert!(!asm.contains("_helper:"));
    assert!(!asm.contains(".globl _helper"));
  }

  #[test]
  fn locals_descend_from_minus_four() {
    let asm = compile("int main() { int a = 1; int b = 2; return b; }");
    assert!(asm.contains("movl -8(%ebp), %eax"));
  }

  #[test]
  fn parameters_live_above_the_frame_pointer() {
    let asm = compile("int add(int a, int b) { return a + b; } int main() { return add(1, 2); }");
    assert!(asm.contains("movl 8(%ebp), %eax"));
    assert!(asm.contains("movl 12(%ebp), %eax"));
  }

  #[test]
  fn shadowed_block_releases_exactly_its_own_storage() {
    let asm = compile("int main() { int a = 1; { int a = 2; } return a; }");
    // Inner block frees its 4 bytes once; the return reads the outer slot.
    assert_eq!(count(&asm, "addl $4, %esp"), 1);
    assert!(asm.contains("movl -4(%ebp), %eax"));
  }

  #[test]
  fn shadowing_across_scopes_is_allowed() {
    let source = "int main() { int a = 1; { int a = 2; { int a = 3; } } return a; }";
    assert!(!compile(source).is_empty());
  }

  #[test]
  fn duplicate_declaration_in_one_scope_is_rejected() {
    let err = compile_err("int main() { int a = 1; int a = 2; return a; }");
    assert!(matches!(err, CompileError::Codegen { .. }));
    assert!(err.to_string().contains("duplicate declaration of 'a'"));
  }

  #[test]
  fn undeclared_variable_read_is_rejected() {
    let err = compile_err("int main() { return x; }");
    assert!(matches!(err, CompileError::Codegen { .. }));
    assert!(err.to_string().contains("undeclared variable 'x'"));
  }

  #[test]
  fn undeclared_assignment_target_is_rejected() {
    let err = compile_err("int main() { x = 3; return 0; }");
    assert!(err.to_string().contains("undeclared variable 'x'"));
  }

  #[test]
  fn assignment_leaves_the_value_in_the_accumulator() {
    let asm = compile("int main() { int a = 0; return a = 5; }");
    let store = asm.find("movl %eax, -4(%ebp)").unwrap();
    // No reload between the store and the epilogue: the assigned value is
    // the expression result.
    assert!(!asm[store..].contains("movl -4(%ebp), %eax"));
  }

  #[test]
  fn break_unwinds_every_scope_entered_since_loop_entry() {
    let source = "int main() {
      for (int i = 0; i < 10; i++) {
        int a = 1;
        {
          int b = 2;
          if (a) break;
        }
      }
      return 0;
    }";
    let asm = compile(source);
    // Two nested block scopes of 4 bytes each are released before the jump.
    assert!(
      asm.contains("addl $4, %esp\n    addl $4, %esp\n    jmp "),
      "break must release both block scopes before jumping:\n{asm}"
    );
  }

  #[test]
  fn for_head_declaration_is_released_once_after_the_loop() {
    let asm = compile("int main() { for (int i = 0; i < 3; i++) ; return 0; }");
    // Labels are allocated in order: start L0, continue L1, break L2.
    let break_label = asm.find("_main_L2:").unwrap();
    assert!(asm[break_label..].contains("addl $4, %esp"));
    assert_eq!(count(&asm[break_label..], "addl $4, %esp"), 1);
  }

  #[test]
  fn continue_in_a_for_loop_targets_the_step_label() {
    let asm = compile("int main() { for (int i = 0; i < 3; i++) { continue; } return 0; }");
    assert!(asm.contains("jmp _main_L1"));
    assert!(asm.contains("_main_L1:"));
  }

  #[test]
  fn while_continue_shares_the_loop_start_label() {
    let asm = compile("int main() { int n = 3; while (n) { n = n - 1; continue; } return n; }");
    // Once from continue, once from the loop-back jump.
    assert_eq!(count(&asm, "jmp _main_L0"), 2);
  }

  #[test]
  fn do_while_tests_the_condition_after_the_body() {
    let asm = compile("int main() { int n = 0; do { n = n + 1; } while (n < 3); return n; }");
    let start = asm.find("_main_L0:").unwrap();
    assert!(asm[start..].contains("jne _main_L0"));
  }

  #[test]
  fn labels_are_namespaced_per_function() {
    let source = "int f() { if (1) return 1; return 0; } int main() { if (1) return 2; return 3; }";
    let asm = compile(source);
    assert!(asm.contains("_f_L0:"));
    assert!(asm.contains("_main_L0:"));
  }

  #[test]
  fn call_pushes_arguments_right_to_left_with_caller_cleanup() {
    let asm = compile("int add(int a, int b) { return a + b; } int main() { return add(1, 2); }");
    let second = asm.find("movl $2, %eax").unwrap();
    let first = asm.find("movl $1, %eax").unwrap();
    assert!(second < first, "rightmost argument must be pushed first");
    assert!(asm.contains("call _add"));
    assert!(asm.contains("addl $8, %esp"));
  }

  #[test]
  fn zero_argument_call_skips_the_cleanup() {
    let asm = compile("int f() { return 1; } int main() { return f(); }");
    assert!(asm.contains("call _f"));
    assert!(!asm.contains("addl $0, %esp"));
  }

  #[test]
  fn forward_recursion_generates_a_self_call() {
    let source = "int fact(int n) { if (n < 2) return 1; return n * fact(n - 1); }
      int main() { return fact(5); }";
    let asm = compile(source);
    let body = asm.find("_fact:").unwrap();
    assert!(asm[body..asm.find("_main:").unwrap()].contains("call _fact"));
  }

  #[test]
  fn logical_and_evaluates_both_operands() {
    let asm = compile("int f() { return 1; } int main() { return 0 && f(); }");
    // No short-circuit: the call is emitted unconditionally.
    assert!(asm.contains("call _f"));
    assert!(asm.contains("andb %bl, %al"));
  }

  #[test]
  fn logical_or_combines_bitwise_and_normalizes() {
    let asm = compile("int main() { return 1 || 2; }");
    assert!(asm.contains("orl %ebx, %eax"));
    assert!(asm.contains("setne %al"));
  }

  #[test]
  fn division_widens_the_dividend() {
    let asm = compile("int main() { return 7 / 2; }");
    assert!(asm.contains("cltd"));
    assert!(asm.contains("idivl %ebx"));
  }

  #[test]
  fn modulo_selects_the_remainder_register() {
    let asm = compile("int main() { return 7 % 3; }");
    assert!(asm.contains("movl %edx, %eax"));
  }

  #[test]
  fn comparison_materializes_a_boolean() {
    let asm = compile("int main() { return 1 < 2; }");
    assert!(asm.contains("cmpl %eax, %ebx"));
    assert!(asm.contains("setl %al"));
  }

  #[test]
  fn postfix_increment_yields_the_old_value() {
    let asm = compile("int main() { int a = 5; return a++; }");
    let expected = "    movl -4(%ebp), %eax\n    movl %eax, %ebx\n    addl $1, %ebx\n    movl %ebx, -4(%ebp)\n";
    assert!(asm.contains(expected), "unexpected postfix sequence:\n{asm}");
  }

  #[test]
  fn address_of_and_dereference_round_trip_through_the_frame() {
    let asm = compile("int main() { int a = 3; return *&a; }");
    assert!(asm.contains("leal -4(%ebp), %eax"));
    assert!(asm.contains("movl (%eax), %eax"));
  }

  #[test]
  fn address_of_a_non_variable_is_rejected() {
    let err = compile_err("int main() { return &(1 + 2); }");
    assert!(matches!(err, CompileError::Codegen { .. }));
    assert!(err.to_string().contains("bare variable"));
  }

  #[test]
  fn indexed_variable_access_is_unimplemented() {
    let err = compile_err("int main() { int a[2]; return a[0]; }");
    assert!(matches!(err, CompileError::Codegen { .. }));
    assert!(err.to_string().contains("not implemented"));
  }

  #[test]
  fn conditional_expression_branches_on_zero() {
    let asm = compile("int main() { return 1 ? 2 : 3; }");
    assert!(asm.contains("je _main_L0"));
    assert!(asm.contains("jmp _main_L1"));
    assert!(asm.contains("movl $3, %eax"));
  }

  #[test]
  fn scope_snapshots_do_not_leak_into_parents() {
    let mut root = ScopeMap::root();
    assert_eq!(root.declare_local("a"), Some(-4));

    let mut child = root.child();
    assert_eq!(child.lookup("a"), Some(-4));
    assert_eq!(child.declare_local("b"), Some(-8));
    assert_eq!(child.declare_local("a"), Some(-12)); // shadow
    assert_eq!(child.scope_byte_size, 8);

    assert_eq!(root.lookup("a"), Some(-4));
    assert!(root.lookup("b").is_none());
    assert_eq!(root.scope_byte_size, 4);
  }

  #[test]
  fn redeclaring_in_the_same_scope_map_fails() {
    let mut root = ScopeMap::root();
    assert!(root.declare_local("a").is_some());
    assert!(root.declare_local("a").is_none());
  }

  #[test]
  fn parameters_do_not_count_toward_scope_cleanup() {
    let mut root = ScopeMap::root();
    root.bind_param("a", 0);
    root.bind_param("b", 1);
    assert_eq!(root.scope_byte_size, 0);
    assert_eq!(root.lookup("a"), Some(8));
    assert_eq!(root.lookup("b"), Some(12));
  }
}
