use super::common::*;

#[test]
fn if_takes_the_true_branch() {
  let (_, mut vm, _) = run("x = 1; if x == 1 { x = 2 } else { x = 3 }");
  assert_eq!(int_binding(&mut vm, "x"), 2);
}

#[test]
fn if_takes_the_else_branch() {
  let (_, mut vm, _) = run("x = 0; if x == 1 { x = 2 } else { x = 3 }");
  assert_eq!(int_binding(&mut vm, "x"), 3);
}

#[test]
fn if_without_else_falls_through() {
  let (_, mut vm, _) = run("x = 0; if x == 1 { x = 2 } x = x + 10;");
  assert_eq!(int_binding(&mut vm, "x"), 10);
}

#[test]
fn else_if_chains() {
  let (_, mut vm, _) = run(
    "x = 2; if x == 0 { y = 10 } else if x == 2 { y = 20 } else { y = 30 }",
  );
  assert_eq!(int_binding(&mut vm, "y"), 20);
}

#[test]
fn non_false_conditions_count_as_true() {
  // conditional jumps compare against the singletons; an Int is not False
  let (_, mut vm, _) = run("x = 1; if 0 { x = 2 }");
  assert_eq!(int_binding(&mut vm, "x"), 2);
}

#[test]
fn branch_assignments_rebind_the_outer_name() {
  let (_, mut vm, _) = run("x = 1; y = 9; if x == 1 { y = x + 1 }");
  assert_eq!(int_binding(&mut vm, "y"), 2);
}
