use super::common::*;

use crate::bytecode::Stamp;
use crate::object::{self, Value};

#[test]
fn clones_compare_by_identity() {
  let (_, mut vm, _) = run("P = Object.clone; Q = P.clone;");
  let q = vm.fetch_object("Q").unwrap();

  let same = object::send(&q, "==", Some(&Stamp::Literal("Q".into())), None, &mut vm).unwrap();
  match same {
    Value::Object(o) => assert!(o.ptr_eq(&vm.bool_object(true))),
    other => panic!("== returned {other}"),
  }

  let different = object::send(&q, "!=", Some(&Stamp::Literal("P".into())), None, &mut vm).unwrap();
  match different {
    Value::Object(o) => assert!(o.ptr_eq(&vm.bool_object(true))),
    other => panic!("!= returned {other}"),
  }
}

#[test]
fn the_prototype_chain_ends_at_object() {
  let (_, vm, _) = run("P = Object.clone; Q = P.clone;");
  let object = vm.fetch_object("Object").unwrap();
  let p = vm.fetch_object("P").unwrap();
  let q = vm.fetch_object("Q").unwrap();

  assert!(q.prototype().unwrap().ptr_eq(&p));
  assert!(p.prototype().unwrap().ptr_eq(&object));
  assert!(object.prototype().is_none());
}

#[test]
fn uppercase_clones_are_class_like() {
  let (_, vm, _) = run("P = Object.clone;");
  let p = vm.fetch_object("P").unwrap();
  assert_eq!(p.type_name(), "P");
  assert!(p.has_default("clone"));
}

#[test]
fn lowercase_clones_keep_the_original_type_and_no_clone_default() {
  let (_, vm, _) = run("P = Object.clone; q = P.clone;");
  let q = vm.fetch_object("q").unwrap();
  assert_eq!(q.type_name(), "P");
  assert!(!q.has_default("clone"));
}

#[test]
fn uppercase_clones_register_globally_for_later_statements() {
  // braced lists at the top level are still global scopes and share the
  // global context
  let (_, vm, _) = run("P = Object.clone; { Q = P.clone; }; R = Q.clone;");
  assert!(vm.fetch_object("R").is_ok());
}

#[test]
fn clones_get_fresh_identities() {
  let (_, vm, _) = run("P = Object.clone; Q = P.clone;");
  let p = vm.fetch_object("P").unwrap();
  let q = vm.fetch_object("Q").unwrap();
  assert!(q.prototype().unwrap().ptr_eq(&p));
  assert_ne!(q.hash(), p.hash());
}
