use super::common::*;

use crate::bytecode::Register;
use crate::{Error, Vm};

#[test]
fn unknown_message_with_no_prototype_terminates() {
  let err = try_run("Object.frobnicate").unwrap_err();
  assert!(matches!(err, Error::Execution(..)));
}

#[test]
fn unknown_message_walks_the_whole_chain_first() {
  let err = try_run("P = Object.clone; Q = P.clone; Q.frobnicate").unwrap_err();
  assert!(matches!(err, Error::Execution(..)));
}

#[test]
fn storing_to_an_immutable_binding_terminates() {
  let err = try_run("x = 5; x y = 1; x y = 2;").unwrap_err();
  assert!(matches!(err, Error::Execution(..)));
}

#[test]
fn mutable_bindings_rebind() {
  let (_, mut vm, result) = run("x = 5; x y = mut 1; x y = 2; x.y");
  let y = object_at(&vm, result);
  assert_eq!(int_of(&mut vm, &y), 2);
}

#[test]
fn break_outside_a_loop_is_a_generation_error() {
  let err = try_run("break").unwrap_err();
  assert!(matches!(err, Error::BytecodeGeneration(..)));
}

#[test]
fn continue_outside_a_loop_is_a_generation_error() {
  let err = try_run("if 1 { continue }").unwrap_err();
  assert!(matches!(err, Error::BytecodeGeneration(..)));
}

#[test]
fn unbound_names_terminate() {
  let err = try_run("nonesuch").unwrap_err();
  assert!(matches!(err, Error::Execution(..)));
}

#[test]
fn reading_an_empty_register_is_an_execution_error() {
  let vm = Vm::new();
  let err = vm.at(Register::new(3)).unwrap_err();
  assert!(matches!(err, Error::Execution(..)));
}

#[test]
fn arithmetic_on_non_ints_terminates() {
  // P inherits `+` from Int but is not an Int itself
  let err = try_run("P = Int.clone; P + 1").unwrap_err();
  assert!(matches!(err, Error::DefaultStore(..)));
}

#[test]
fn arithmetic_without_a_handler_anywhere_is_not_understood() {
  let err = try_run("Object + 1").unwrap_err();
  assert!(matches!(err, Error::Execution(..)));
}

#[test]
fn parse_errors_surface_as_parsing_errors() {
  let err = try_run("fn {").unwrap_err();
  assert!(matches!(err, Error::Parsing(..)));
  let err = try_run("\"unterminated").unwrap_err();
  assert!(matches!(err, Error::Lexing(..)));
}

#[test]
fn division_by_zero_is_reported_not_fatal() {
  let err = try_run("1 / 0").unwrap_err();
  assert!(matches!(err, Error::DefaultStore(..)));
}
