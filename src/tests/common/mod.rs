use std::path::PathBuf;

use crate::bytecode::Register;
use crate::emit::Generator;
use crate::error::Result;
use crate::object::{self, ObjectRef, Value};
use crate::vm::Vm;

/// Parse, lower and execute `src`, returning the machinery plus the
/// register holding the value of the last statement.
pub fn run(src: &str) -> (Generator, Vm, Option<Register>) {
  try_run(src).expect("program failed")
}

pub fn try_run(src: &str) -> Result<(Generator, Vm, Option<Register>)> {
  let ast = syntax::parse(src)?;
  let mut generator = Generator::new(vec![PathBuf::from(".")]);
  let result = generator.generate(&ast)?;
  let mut vm = Vm::new();
  vm.run(&generator)?;
  Ok((generator, vm, result))
}

/// The integer behind an object's `value` store.
pub fn int_of(vm: &mut Vm, obj: &ObjectRef) -> i32 {
  match object::send(obj, "value", None, None, vm).expect("no value store") {
    Value::Int(i) => i,
    other => panic!("value of {obj} is {other}, not an integer"),
  }
}

/// Look `name` up and read its integer value.
pub fn int_binding(vm: &mut Vm, name: &str) -> i32 {
  let obj = vm.fetch_object(name).expect("name not bound");
  int_of(vm, &obj)
}

pub fn object_at(vm: &Vm, register: Option<Register>) -> ObjectRef {
  match vm.at(register.expect("statement had no result")) {
    Ok(Value::Object(o)) => o,
    other => panic!("result register holds {other:?}"),
  }
}
