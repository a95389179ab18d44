//! End-to-end tests over the public API: whole programs in, assembly text
//! (or a stage error) out.

use minicc::{CompileError, generate_assembly};

mod valid_programs {
  use super::*;

  #[test]
  fn returns_a_constant() {
    let asm = generate_assembly("int main() { return 42; }").unwrap();
    assert!(asm.contains(".globl _main"));
    assert!(asm.contains("movl $42, %eax"));
    assert!(asm.contains("ret"));
  }

  #[test]
  fn arithmetic_precedence_is_reflected_in_operand_order() {
    // 1 + 2 * 3: the multiplication's operands are loaded after 1.
    let asm = generate_assembly("int main() { return 1 + 2 * 3; }").unwrap();
    let one = asm.find("movl $1, %eax").unwrap();
    let two = asm.find("movl $2, %eax").unwrap();
    let three = asm.find("movl $3, %eax").unwrap();
    assert!(one < two && two < three);
  }

  #[test]
  fn forward_declaration_then_recursive_definition() {
    let source = "int fib(int n);
      int fib(int n) {
        if (n < 2) return n;
        return fib(n - 1) + fib(n - 2);
      }
      int main() { return fib(10); }";
    let asm = generate_assembly(source).unwrap();
    assert!(asm.contains("_fib:"));
    assert!(asm.contains("call _fib"));
  }

  #[test]
  fn nested_scopes_loops_and_jumps_compile_together() {
    let source = "int main() {
      int total = 0;
      for (int i = 0; i < 10; i = i + 1) {
        int doubled = i * 2;
        {
          if (doubled > 10) break;
          total = total + doubled;
        }
      }
      while (total > 100) total = total - 1;
      do total = total + 1; while (0);
      return total;
    }";
    assert!(generate_assembly(source).is_ok());
  }

  #[test]
  fn logical_operators_evaluate_both_sides() {
    let source = "int side_effect() { return 1; }
      int main() { return 0 && side_effect(); }";
    let asm = generate_assembly(source).unwrap();
    assert!(
      asm.contains("call _side_effect"),
      "&& must still evaluate its right operand"
    );
  }

  #[test]
  fn ternary_and_unary_operators_compile() {
    let source = "int main() { int a = 4; return !a ? ~a : -a; }";
    let asm = generate_assembly(source).unwrap();
    assert!(asm.contains("notl %eax"));
    assert!(asm.contains("negl %eax"));
  }
}

mod invalid_programs {
  use super::*;

  #[test]
  fn unknown_character_fails_in_the_lexer() {
    let err = generate_assembly("int main() { return 1 @ 2; }").unwrap_err();
    assert!(matches!(err, CompileError::Lex { .. }));
  }

  #[test]
  fn missing_parenthesis_fails_in_the_parser() {
    let err = generate_assembly("int main( { return 0; }").unwrap_err();
    assert!(matches!(err, CompileError::Syntax { .. }));
  }

  #[test]
  fn call_arity_mismatch_produces_no_assembly() {
    let source = "int add(int a, int b) { return a + b; }
      int main() { return add(1, 2, 3); }";
    let err = generate_assembly(source).unwrap_err();
    assert!(matches!(err, CompileError::Semantic { .. }));
  }

  #[test]
  fn call_to_unknown_function_is_a_semantic_error() {
    let err = generate_assembly("int main() { return nope(); }").unwrap_err();
    assert!(matches!(err, CompileError::Semantic { .. }));
  }

  #[test]
  fn undeclared_variable_is_a_codegen_error() {
    let err = generate_assembly("int main() { return ghost; }").unwrap_err();
    assert!(matches!(err, CompileError::Codegen { .. }));
  }

  #[test]
  fn break_outside_a_loop_never_reaches_codegen() {
    let err = generate_assembly("int main() { break; }").unwrap_err();
    assert!(matches!(err, CompileError::Semantic { .. }));
  }
}
