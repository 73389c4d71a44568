use super::common::*;

#[test]
fn call_with_return_value() {
  let (_, mut vm, result) = run("fn sq(n) { n * n } sq(5).get_return_value");
  let out = object_at(&vm, result);
  assert_eq!(out.type_name(), "Int");
  assert_eq!(int_of(&mut vm, &out), 25);
  // the call machinery is fully unwound
  assert!(vm.saved_blocks().is_empty());
  assert!(!vm.has_pending_retval());
}

#[test]
fn defining_a_function_binds_its_name() {
  let (_, vm, _) = run("fn noop() { 0 }");
  let f = vm.fetch_object("noop").unwrap();
  assert!(f.get_store("body").is_some());
  assert!(f.get_store("param_names").is_some());
}

#[test]
fn two_parameters_bind_in_order() {
  let (_, mut vm, result) = run("fn sub(a, b) { a - b } sub(9, 4).get_return_value");
  let out = object_at(&vm, result);
  assert_eq!(int_of(&mut vm, &out), 5);
}

#[test]
fn variables_pass_as_arguments_by_name() {
  let (_, mut vm, result) = run("x = 6; fn twice(n) { n + n } twice(x).get_return_value");
  let out = object_at(&vm, result);
  assert_eq!(int_of(&mut vm, &out), 12);
}

#[test]
fn sequential_calls_get_fresh_body_contexts() {
  let (_, mut vm, result) = run(
    "fn sq(n) { n * n } a = sq(3).get_return_value.clone; sq(4).get_return_value",
  );
  let out = object_at(&vm, result);
  assert_eq!(int_of(&mut vm, &out), 16);
  assert_eq!(int_binding(&mut vm, "a"), 9);
  assert!(vm.saved_blocks().is_empty());
}

#[test]
fn repeat_calls_rewind_the_argument_counter() {
  // `call` resets num_passed_params, so every call binds from position zero
  let src = indoc::indoc! {"
    fn add(a, b) { a + b }
    add(1, 2).get_return_value;
    add(3, 4).get_return_value;
    add(5, 6).get_return_value
  "};
  let (_, mut vm, result) = run(src);
  let out = object_at(&vm, result);
  assert_eq!(int_of(&mut vm, &out), 11);
  assert!(vm.saved_blocks().is_empty());
  assert!(!vm.has_pending_retval());
}

#[test]
fn the_caller_resumes_right_after_the_call() {
  // the statement after the call runs exactly once
  let (_, mut vm, _) = run("fn f() { 1 } n = 0; f(); n = n + 1;");
  assert_eq!(int_binding(&mut vm, "n"), 1);
}

#[test]
fn function_parameters_do_not_leak_into_the_caller() {
  let (_, vm, _) = run("fn f(p) { p } f(1);");
  assert!(vm.fetch_object("p").is_err());
}
