//! The default-stores table: built-in behavior behind the standard message
//! names. Handlers receive the most-derived receiver, the optional stamp of
//! the send, and the interpreter, and return one of the four value kinds.

use super::{new_vec, send, ObjectRef, Store, StoreValue, Value, VecRef};
use crate::bytecode::{Register, Stamp};
use crate::error::{Error, Result};
use crate::vm::Vm;

pub type Handler = fn(&ObjectRef, Option<&Stamp>, &mut Vm) -> Result<Value>;

/// The closed name-to-handler mapping.
pub fn lookup(name: &str) -> Option<Handler> {
  let handler: Handler = match name {
    "clone" => clone,
    "==" => equals,
    "!=" => not_equals,
    "store_value" => store_value,
    "get" => get,
    "push" => push,
    "clone_callable" => clone_callable,
    "store_param" => store_param,
    "pass_body" => pass_body,
    "pass_param" => pass_param,
    "call" => call,
    "get_return_value" => get_return_value,
    "%" => modulo,
    "*" => multiply,
    "/" => divide,
    "+" => add,
    "-" => subtract,
    "<<" => shift_left,
    ">>" => shift_right,
    "&" => bit_and,
    "><" => bit_xor,
    "|" => bit_or,
    "<" => less,
    "<=" => less_equal,
    ">" => greater,
    ">=" => greater_equal,
    _ => return None,
  };
  Some(handler)
}

/// Clone `obj` under a new name. An uppercase name makes the clone
/// class-like: it keeps the name as its type and gets `clone` reinstalled.
/// Either way the clone is registered in the current scope's context.
pub fn clone_object(original: &ObjectRef, name: &str, vm: &mut Vm) -> Result<ObjectRef> {
  let cloned = if name.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
    let cloned = ObjectRef::new(Some(original.clone()), name);
    cloned.enable_default("clone");
    cloned
  } else {
    ObjectRef::new(Some(original.clone()), original.type_name())
  };
  vm.put_object(name, cloned.clone());
  Ok(cloned)
}

fn clone(obj: &ObjectRef, stamp: Option<&Stamp>, vm: &mut Vm) -> Result<Value> {
  let name = stamp_literal("clone", stamp)?;
  Ok(Value::Object(clone_object(obj, &name, vm)?))
}

fn equals(obj: &ObjectRef, stamp: Option<&Stamp>, vm: &mut Vm) -> Result<Value> {
  let other = stamp_object("==", stamp, vm)?;
  let equal = if obj.type_name() == "Int" {
    int_value(obj)? == int_value(&other)?
  } else {
    obj.hash() == other.hash()
  };
  Ok(Value::Object(vm.bool_object(equal)))
}

fn not_equals(obj: &ObjectRef, stamp: Option<&Stamp>, vm: &mut Vm) -> Result<Value> {
  let other = stamp_object("!=", stamp, vm)?;
  let equal = if obj.type_name() == "Int" {
    int_value(obj)? == int_value(&other)?
  } else {
    obj.hash() == other.hash()
  };
  Ok(Value::Object(vm.bool_object(!equal)))
}

/// Bind the literal `stamp` as the receiver's `value` store, parsed
/// according to the receiver's type.
pub fn bind_value(obj: &ObjectRef, literal: &str) -> Result<()> {
  let store = match obj.type_name().as_str() {
    "Int" => {
      let parsed = literal.parse::<i32>().map_err(|_| {
        Error::default_store(format!("cannot parse `{literal}` as an Int value"))
      })?;
      Store::new(StoreValue::Int(parsed), true)
    }
    "Char" => Store::new(StoreValue::Char(literal.bytes().next().unwrap_or(0)), true),
    "String" => Store::new(StoreValue::Literal(literal.to_string()), true),
    other => {
      return Err(Error::default_store(format!(
        "store_value is not implemented for {other}"
      )))
    }
  };
  obj.add_store("value", store)
}

fn store_value(obj: &ObjectRef, stamp: Option<&Stamp>, _vm: &mut Vm) -> Result<Value> {
  let literal = stamp_literal("store_value", stamp)?;
  bind_value(obj, &literal)?;
  Ok(Value::Object(obj.clone()))
}

fn get(obj: &ObjectRef, stamp: Option<&Stamp>, vm: &mut Vm) -> Result<Value> {
  let register = stamp_register("get", stamp)?;
  let index_obj = register_object(register, vm)?;
  let index = match send(&index_obj, "value", None, None, vm)? {
    Value::Int(i) => i,
    _ => {
      return Err(Error::default_store(format!(
        "get index {index_obj} does not hold an integer value"
      )))
    }
  };
  let vec = value_vec(obj)?;
  let store = vec
    .borrow()
    .get(index as usize)
    .cloned()
    .ok_or_else(|| Error::default_store(format!("index {index} is out of range for {obj}")))?;
  Ok(store.unwrap())
}

fn push(obj: &ObjectRef, stamp: Option<&Stamp>, vm: &mut Vm) -> Result<Value> {
  let register = stamp_register("push", stamp)?;
  let value = register_object(register, vm)?;
  let vec = own_value_vec(obj)?;
  vec
    .borrow_mut()
    .push(Store::new(StoreValue::Object(value), true));
  Ok(Value::Object(obj.clone()))
}

/// Clone a callable: fresh `param_names`, zeroed `num_passed_params`.
fn clone_callable(obj: &ObjectRef, stamp: Option<&Stamp>, vm: &mut Vm) -> Result<Value> {
  let name = stamp_literal("clone_callable", stamp)?;
  let cloned = clone_object(obj, &name, vm)?;
  cloned.enable_default("clone_callable");

  let param_names = store_object(obj, "param_names")?;
  let fresh_names = clone_object(&param_names, "::param_names", vm)?;
  cloned.add_store("param_names", Store::new(StoreValue::Object(fresh_names), true))?;

  let int_proto = vm.fetch_global("Int")?;
  let counter = clone_object(&int_proto, "::num_passed_params", vm)?;
  bind_value(&counter, "0")?;
  cloned.add_store(
    "num_passed_params",
    Store::new(StoreValue::Object(counter), true),
  )?;

  Ok(Value::Object(cloned))
}

fn store_param(obj: &ObjectRef, stamp: Option<&Stamp>, vm: &mut Vm) -> Result<Value> {
  let name = stamp_literal("store_param", stamp)?;
  let param_names = store_object(obj, "param_names")?;

  let string_proto = vm.fetch_global("String")?;
  let param = clone_object(&string_proto, &format!("::{name}"), vm)?;
  bind_value(&param, &name)?;

  let register = vm.store_at_next_available(Value::Object(param));
  push(&param_names, Some(&Stamp::Register(register)), vm)?;
  Ok(Value::Object(obj.clone()))
}

fn pass_body(obj: &ObjectRef, stamp: Option<&Stamp>, _vm: &mut Vm) -> Result<Value> {
  let block = match stamp {
    Some(Stamp::Block(block)) => *block,
    _ => {
      return Err(Error::default_store(
        "pass_body expects a basic-block stamp".to_string(),
      ))
    }
  };
  obj.add_store("body", Store::new(StoreValue::Register(block), false))?;
  Ok(Value::Object(obj.clone()))
}

/// Bind the next positional argument in the context of the function body.
fn pass_param(obj: &ObjectRef, stamp: Option<&Stamp>, vm: &mut Vm) -> Result<Value> {
  let body = body_block(obj)?;
  let param = match stamp {
    Some(Stamp::Literal(name)) => vm.fetch_object(name)?,
    Some(Stamp::Register(register)) => register_object(*register, vm)?,
    _ => {
      return Err(Error::default_store(
        "pass_param expects an argument stamp".to_string(),
      ))
    }
  };

  let counter = store_object(obj, "num_passed_params")?;
  let param_names = store_object(obj, "param_names")?;

  let index_register = vm.store_at_next_available(Value::Object(counter.clone()));
  let name_obj = match get(&param_names, Some(&Stamp::Register(index_register)), vm)? {
    Value::Object(o) => o,
    _ => {
      return Err(Error::default_store(format!(
        "{obj} has a malformed param_names vector"
      )))
    }
  };
  let name = match send(&name_obj, "value", None, None, vm)? {
    Value::Str(name) => name,
    _ => {
      return Err(Error::default_store(format!(
        "parameter name {name_obj} does not hold a literal"
      )))
    }
  };

  vm.stage_param(body, name, param);

  let passed = int_value(&counter)?;
  bind_value(&counter, &(passed + 1).to_string())?;
  Ok(Value::Object(obj.clone()))
}

/// Save the caller's next block on the return stack and enter the body.
/// The argument counter rewinds here so the next call of the same callable
/// binds its parameters from position zero again.
fn call(obj: &ObjectRef, _stamp: Option<&Stamp>, vm: &mut Vm) -> Result<Value> {
  let body = body_block(obj)?;
  bind_value(&store_object(obj, "num_passed_params")?, "0")?;
  vm.save_next_bb();
  vm.jump(body);
  Ok(Value::Object(obj.clone()))
}

fn get_return_value(obj: &ObjectRef, _stamp: Option<&Stamp>, vm: &mut Vm) -> Result<Value> {
  let register = vm
    .take_retval()
    .ok_or_else(|| Error::default_store(format!("no return value pending on {obj}")))?;
  vm.at(register)
}

macro_rules! int_arithmetic {
  ($name:ident, $msg:literal, $op:expr) => {
    fn $name(obj: &ObjectRef, stamp: Option<&Stamp>, vm: &mut Vm) -> Result<Value> {
      arithmetic(obj, stamp, vm, $msg, $op)
    }
  };
}

macro_rules! int_compare {
  ($name:ident, $msg:literal, $op:expr) => {
    fn $name(obj: &ObjectRef, stamp: Option<&Stamp>, vm: &mut Vm) -> Result<Value> {
      comparison(obj, stamp, vm, $msg, $op)
    }
  };
}

int_arithmetic!(modulo, "%", |a, b| a.checked_rem(b));
int_arithmetic!(multiply, "*", |a, b| Some(i32::wrapping_mul(a, b)));
int_arithmetic!(divide, "/", |a, b| a.checked_div(b));
int_arithmetic!(add, "+", |a, b| Some(i32::wrapping_add(a, b)));
int_arithmetic!(subtract, "-", |a, b| Some(i32::wrapping_sub(a, b)));
int_arithmetic!(shift_left, "<<", |a, b| Some(i32::wrapping_shl(a, b as u32)));
int_arithmetic!(shift_right, ">>", |a, b| Some(i32::wrapping_shr(a, b as u32)));
int_arithmetic!(bit_and, "&", |a, b| Some(a & b));
int_arithmetic!(bit_xor, "><", |a, b| Some(a ^ b));
int_arithmetic!(bit_or, "|", |a, b| Some(a | b));

int_compare!(less, "<", |a, b| a < b);
int_compare!(less_equal, "<=", |a, b| a <= b);
int_compare!(greater, ">", |a, b| a > b);
int_compare!(greater_equal, ">=", |a, b| a >= b);

/// Integer arithmetic: clone the receiver's prototype and bind the result
/// as its mutable `value`.
fn arithmetic(
  obj: &ObjectRef,
  stamp: Option<&Stamp>,
  vm: &mut Vm,
  msg: &str,
  op: fn(i32, i32) -> Option<i32>,
) -> Result<Value> {
  let other = stamp_object(msg, stamp, vm)?;
  if obj.type_name() != "Int" {
    return Err(Error::default_store(format!(
      "{msg} default store not implemented for {} and {}",
      obj.type_name(),
      other.type_name()
    )));
  }
  let a = int_value(obj)?;
  let b = int_value(&other)?;
  let result = op(a, b)
    .ok_or_else(|| Error::default_store(format!("{msg} of {a} and {b} is undefined")))?;

  let prototype = obj.prototype().ok_or_else(|| {
    Error::default_store(format!("{msg} receiver {obj} has no prototype to clone"))
  })?;
  let result_obj = clone_object(&prototype, &format!("::lit_{result}"), vm)?;
  result_obj.add_store("value", Store::new(StoreValue::Int(result), true))?;
  Ok(Value::Object(result_obj))
}

fn comparison(
  obj: &ObjectRef,
  stamp: Option<&Stamp>,
  vm: &mut Vm,
  msg: &str,
  op: fn(i32, i32) -> bool,
) -> Result<Value> {
  let other = stamp_object(msg, stamp, vm)?;
  if obj.type_name() != "Int" {
    return Err(Error::default_store(format!(
      "{msg} default store not implemented for {} and {}",
      obj.type_name(),
      other.type_name()
    )));
  }
  let result = op(int_value(obj)?, int_value(&other)?);
  Ok(Value::Object(vm.bool_object(result)))
}

fn stamp_literal(msg: &str, stamp: Option<&Stamp>) -> Result<String> {
  match stamp {
    Some(Stamp::Literal(s)) => Ok(s.clone()),
    _ => Err(Error::default_store(format!(
      "{msg} expects a literal stamp"
    ))),
  }
}

fn stamp_register(msg: &str, stamp: Option<&Stamp>) -> Result<Register> {
  match stamp {
    Some(Stamp::Register(r)) => Ok(*r),
    _ => Err(Error::default_store(format!(
      "{msg} expects a register stamp"
    ))),
  }
}

/// Resolve a stamp to an object: registers read the register file, literals
/// resolve through the scope stack.
fn stamp_object(msg: &str, stamp: Option<&Stamp>, vm: &mut Vm) -> Result<ObjectRef> {
  match stamp {
    Some(Stamp::Register(r)) => register_object(*r, vm),
    Some(Stamp::Literal(name)) => vm.fetch_object(name),
    _ => Err(Error::default_store(format!("{msg} expects an argument"))),
  }
}

fn register_object(register: Register, vm: &Vm) -> Result<ObjectRef> {
  match vm.at(register)? {
    Value::Object(o) => Ok(o),
    other => Err(Error::execution(format!(
      "register {register} holds {other}, not an object"
    ))),
  }
}

fn store_object(obj: &ObjectRef, name: &str) -> Result<ObjectRef> {
  match obj.get_store(name) {
    Some(Store {
      value: StoreValue::Object(o),
      ..
    }) => Ok(o),
    _ => Err(Error::default_store(format!(
      "{obj} has no `{name}` object store"
    ))),
  }
}

fn body_block(obj: &ObjectRef) -> Result<u32> {
  match obj.get_store("body") {
    Some(Store {
      value: StoreValue::Register(block),
      ..
    }) => Ok(block),
    _ => Err(Error::default_store(format!("{obj} has no body to call"))),
  }
}

fn int_value(obj: &ObjectRef) -> Result<i32> {
  match obj.get_store("value") {
    Some(Store {
      value: StoreValue::Int(i),
      ..
    }) => Ok(i),
    _ => Err(Error::default_store(format!(
      "{obj} has no integer value store"
    ))),
  }
}

/// The receiver's `value` vector, resolved along the prototype chain and
/// created empty when absent anywhere on it.
fn value_vec(obj: &ObjectRef) -> Result<VecRef> {
  match obj.get_store("value") {
    Some(Store {
      value: StoreValue::Vec(v),
      ..
    }) => Ok(v),
    Some(_) => Err(Error::default_store(format!(
      "`value` of {obj} is not a vector"
    ))),
    None => {
      let v = new_vec();
      obj.add_store("value", Store::new(StoreValue::Vec(v.clone()), true))?;
      Ok(v)
    }
  }
}

/// Like [`value_vec`], but always the receiver's own vector, so appends
/// never mutate a prototype.
fn own_value_vec(obj: &ObjectRef) -> Result<VecRef> {
  match obj.get_own_store("value") {
    Some(Store {
      value: StoreValue::Vec(v),
      ..
    }) => Ok(v),
    Some(_) => Err(Error::default_store(format!(
      "`value` of {obj} is not a vector"
    ))),
    None => {
      let v = new_vec();
      obj.add_store("value", Store::new(StoreValue::Vec(v.clone()), true))?;
      Ok(v)
    }
  }
}
