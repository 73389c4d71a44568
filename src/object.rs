//! The object and store model: prototype-linked objects holding typed,
//! mutability-flagged stores, and the message-send resolution walk.

pub mod builtin;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

use crate::bytecode::Stamp;
use crate::error::{Error, Result};
use crate::vm::Vm;

/// A typed cell bound by name inside an object.
#[derive(Clone, Debug)]
pub struct Store {
  pub mutable: bool,
  pub value: StoreValue,
}

impl Store {
  pub fn new(value: StoreValue, mutable: bool) -> Store {
    Store { mutable, value }
  }

  /// Unwrap the payload into the value domain registers traffic in.
  /// Bytes and block indices surface as integers.
  pub fn unwrap(&self) -> Value {
    match &self.value {
      StoreValue::Object(o) => Value::Object(o.clone()),
      StoreValue::Literal(s) => Value::Str(s.clone()),
      StoreValue::Int(i) => Value::Int(*i),
      StoreValue::Char(b) => Value::Int(*b as i32),
      StoreValue::Vec(v) => Value::Vec(v.clone()),
      StoreValue::Register(b) => Value::Int(*b as i32),
    }
  }
}

#[derive(Clone, Debug)]
pub enum StoreValue {
  Object(ObjectRef),
  Literal(String),
  Int(i32),
  Char(u8),
  Vec(VecRef),
  /// A basic-block index; how function bodies are stored.
  Register(u32),
}

pub type VecRef = Rc<RefCell<Vec<Store>>>;

pub fn new_vec() -> VecRef {
  Rc::new(RefCell::new(vec![]))
}

/// What a send returns and registers hold: an object, a literal, an integer
/// or a shared vector of stores.
#[derive(Clone, Debug)]
pub enum Value {
  Object(ObjectRef),
  Str(String),
  Int(i32),
  Vec(VecRef),
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Object(o) => write!(f, "{o}"),
      Value::Str(s) => write!(f, "{s}"),
      Value::Int(i) => write!(f, "{i}"),
      Value::Vec(v) => write!(f, "vec[{}]", v.borrow().len()),
    }
  }
}

pub struct Object {
  hash: u32,
  prototype: Option<ObjectRef>,
  type_name: String,
  stores: IndexMap<String, Store>,
  default_stores: IndexSet<String>,
}

/// A shared handle to an [`Object`]. Identity comparisons go through the
/// object's random `hash`; `ptr_eq` is the stricter handle identity.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<Object>>);

impl ObjectRef {
  pub fn new(prototype: Option<ObjectRef>, type_name: impl Into<String>) -> ObjectRef {
    ObjectRef(Rc::new(RefCell::new(Object {
      hash: rand::random(),
      prototype,
      type_name: type_name.into(),
      stores: IndexMap::new(),
      default_stores: IndexSet::new(),
    })))
  }

  pub fn hash(&self) -> u32 {
    self.0.borrow().hash
  }

  pub fn type_name(&self) -> String {
    self.0.borrow().type_name.clone()
  }

  pub fn prototype(&self) -> Option<ObjectRef> {
    self.0.borrow().prototype.clone()
  }

  pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
    Rc::ptr_eq(&self.0, &other.0)
  }

  /// Bind `name` to `store`. Rebinding a name whose existing store is
  /// immutable is an execution error.
  pub fn add_store(&self, name: impl Into<String>, store: Store) -> Result<()> {
    let name = name.into();
    let immutable = matches!(
      self.0.borrow().stores.get(&name),
      Some(existing) if !existing.mutable
    );
    if immutable {
      return Err(Error::execution(format!(
        "cannot rebind immutable store `{name}` on {}",
        self
      )));
    }
    self.0.borrow_mut().stores.insert(name, store);
    Ok(())
  }

  /// Bind `name` unconditionally. Used while installing the runtime
  /// prototypes, before any program store exists to protect.
  pub(crate) fn set_store(&self, name: impl Into<String>, store: Store) {
    self.0.borrow_mut().stores.insert(name.into(), store);
  }

  /// Look `name` up on this object only.
  pub fn get_own_store(&self, name: &str) -> Option<Store> {
    self.0.borrow().stores.get(name).cloned()
  }

  /// Look `name` up along the prototype chain.
  pub fn get_store(&self, name: &str) -> Option<Store> {
    if let Some(store) = self.get_own_store(name) {
      return Some(store);
    }
    self.prototype().and_then(|p| p.get_store(name))
  }

  pub fn enable_default(&self, name: impl Into<String>) {
    self.0.borrow_mut().default_stores.insert(name.into());
  }

  pub fn has_default(&self, name: &str) -> bool {
    self.0.borrow().default_stores.contains(name)
  }
}

impl fmt::Display for ObjectRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let inner = self.0.borrow();
    write!(f, "{}-{:x}", inner.type_name, inner.hash)
  }
}

impl fmt::Debug for ObjectRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self)
  }
}

/// Send `msg` to `obj`.
///
/// Resolution order: the receiver's enabled default stores, then its own
/// stores, then the prototype chain. Whichever link of the chain resolves a
/// default store, the handler runs against the most-derived receiver — the
/// `forwarder` carried through the recursion.
pub fn send(
  obj: &ObjectRef,
  msg: &str,
  stamp: Option<&Stamp>,
  forwarder: Option<&ObjectRef>,
  vm: &mut Vm,
) -> Result<Value> {
  if obj.has_default(msg) {
    let handler = builtin::lookup(msg).ok_or_else(|| {
      Error::default_store(format!("no builtin behind default store `{msg}`"))
    })?;
    let receiver = forwarder.unwrap_or(obj).clone();
    return handler(&receiver, stamp, vm);
  }

  if let Some(store) = obj.get_own_store(msg) {
    return Ok(store.unwrap());
  }

  if let Some(prototype) = obj.prototype() {
    let forwarder = forwarder.unwrap_or(obj).clone();
    return send(&prototype, msg, stamp, Some(&forwarder), vm);
  }

  Err(Error::execution(format!(
    "message `{msg}` not understood by {}",
    forwarder.unwrap_or(obj)
  )))
}

/// A mapping from identifier to object. One context exists per active
/// lexical scope, except global scopes, which all share the single global
/// context.
#[derive(Default, Debug)]
pub struct Context {
  entries: IndexMap<String, ObjectRef>,
}

pub type ContextRef = Rc<RefCell<Context>>;

impl Context {
  pub fn add(&mut self, name: impl Into<String>, object: ObjectRef) {
    self.entries.insert(name.into(), object);
  }

  pub fn get(&self, name: &str) -> Option<ObjectRef> {
    self.entries.get(name).cloned()
  }

  pub fn contains(&self, name: &str) -> bool {
    self.entries.contains_key(name)
  }

  pub fn names(&self) -> Vec<String> {
    self.entries.keys().cloned().collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn immutable_stores_reject_rebinding() {
    let obj = ObjectRef::new(None, "Object");
    obj
      .add_store("body", Store::new(StoreValue::Register(3), false))
      .unwrap();
    let err = obj
      .add_store("body", Store::new(StoreValue::Register(4), false))
      .unwrap_err();
    assert!(matches!(err, Error::Execution(..)));
  }

  #[test]
  fn mutable_stores_rebind() {
    let obj = ObjectRef::new(None, "Int");
    obj
      .add_store("value", Store::new(StoreValue::Int(1), true))
      .unwrap();
    obj
      .add_store("value", Store::new(StoreValue::Int(2), true))
      .unwrap();
    assert!(matches!(
      obj.get_store("value"),
      Some(Store {
        value: StoreValue::Int(2),
        ..
      })
    ));
  }

  #[test]
  fn store_lookup_walks_the_prototype_chain() {
    let proto = ObjectRef::new(None, "Int");
    proto
      .add_store("value", Store::new(StoreValue::Int(7), true))
      .unwrap();
    let derived = ObjectRef::new(Some(proto), "Int");
    assert!(derived.get_own_store("value").is_none());
    assert!(matches!(
      derived.get_store("value"),
      Some(Store {
        value: StoreValue::Int(7),
        ..
      })
    ));
  }

  #[test]
  fn char_stores_unwrap_to_integers() {
    let store = Store::new(StoreValue::Char(b'a'), true);
    assert!(matches!(store.unwrap(), Value::Int(97)));
  }
}
