//! The REPL contract: one generator and one interpreter live across
//! inputs. Lowering appends blocks and scopes; the interpreter resumes at
//! the block where the previous run stopped.

use super::common::*;

use crate::emit::Generator;
use crate::vm::Vm;

fn feed(generator: &mut Generator, vm: &mut Vm, line: &str) {
  let ast = syntax::parse(line).unwrap();
  generator.generate(&ast).unwrap();
  vm.run(generator).unwrap();
}

#[test]
fn bindings_persist_across_lines() {
  let mut generator = Generator::new(vec![]);
  let mut vm = Vm::new();

  feed(&mut generator, &mut vm, "x = 1;");
  feed(&mut generator, &mut vm, "x = x + 1;");
  feed(&mut generator, &mut vm, "y = x + 10;");

  assert_eq!(int_binding(&mut vm, "x"), 2);
  assert_eq!(int_binding(&mut vm, "y"), 12);
}

#[test]
fn functions_survive_into_later_lines() {
  let mut generator = Generator::new(vec![]);
  let mut vm = Vm::new();

  feed(&mut generator, &mut vm, "fn sq(n) { n * n }");
  feed(&mut generator, &mut vm, "a = sq(6).get_return_value.clone;");

  assert_eq!(int_binding(&mut vm, "a"), 36);
  assert!(vm.saved_blocks().is_empty());
}
