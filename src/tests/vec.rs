use super::common::*;

use crate::object::{Store, StoreValue};

fn vec_len(obj: &crate::ObjectRef) -> usize {
  match obj.get_store("value") {
    Some(Store {
      value: StoreValue::Vec(v),
      ..
    }) => v.borrow().len(),
    other => panic!("value store is {other:?}"),
  }
}

#[test]
fn vec_literals_collect_their_elements() {
  let (_, vm, result) = run("[1, 2, 3]");
  let vec_obj = object_at(&vm, result);
  assert_eq!(vec_obj.type_name(), "Vec");
  assert_eq!(vec_len(&vec_obj), 3);
}

#[test]
fn get_fetches_by_index() {
  let (_, mut vm, result) = run("v = [4, 5, 6]; v.get 1");
  let element = object_at(&vm, result);
  assert_eq!(int_of(&mut vm, &element), 5);
}

#[test]
fn push_appends() {
  let (_, mut vm, result) = run("x = [7].push 8; x.get 1");
  let element = object_at(&vm, result);
  assert_eq!(int_of(&mut vm, &element), 8);

  let x = vm.fetch_object("x").unwrap();
  // x is stamped from the vector object; the elements live one link up
  assert_eq!(vec_len(&x.prototype().unwrap()), 2);
}

#[test]
fn get_out_of_range_is_a_default_store_error() {
  let err = try_run("v = [1]; v.get 4").unwrap_err();
  assert!(matches!(err, crate::Error::DefaultStore(..)));
}
