use std::env;
use std::fs;
use std::process;

use minicc::generate_assembly;

/// Compiled when no path argument is supplied.
const DEFAULT_SOURCE: &str = "sample/program";

fn main() {
  let args: Vec<String> = env::args().collect();
  if args.len() > 2 {
    let program = args.first().map(String::as_str).unwrap_or("minicc");
    eprintln!("usage: {program} [path[.c]]");
    process::exit(1);
  }

  // Accept `foo.c` or plain `foo`; the output lands next to the input.
  let stem = match args.get(1) {
    Some(path) => path.strip_suffix(".c").unwrap_or(path).to_string(),
    None => DEFAULT_SOURCE.to_string(),
  };
  let source_path = format!("{stem}.c");
  let output_path = format!("{stem}.s");

  if let Err(message) = compile_file(&source_path, &output_path) {
    eprintln!("{message}");
    process::exit(1);
  }
}

fn compile_file(source_path: &str, output_path: &str) -> Result<(), String> {
  let source =
    fs::read_to_string(source_path).map_err(|err| format!("cannot read {source_path}: {err}"))?;
  let asm = generate_assembly(&source).map_err(|err| err.to_string())?;
  fs::write(output_path, asm).map_err(|err| format!("cannot write {output_path}: {err}"))?;
  Ok(())
}
