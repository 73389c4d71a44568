//! The interpreter: a register file, a basic-block dispatch loop, a scope
//! stack paired with contexts, and the saved-return machinery for calls.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use crate::bytecode::{Instruction, LexicalScope, Register};
use crate::emit::Generator;
use crate::error::{Error, Result};
use crate::object::{self, Context, ContextRef, ObjectRef, Store, StoreValue, Value};

#[derive(Debug)]
pub struct Vm {
  current_bb: u32,
  regs: Vec<Option<Value>>,
  should_terminate_bb: bool,
  /// Active scopes, innermost last. Global entries carry no context of
  /// their own; they resolve through the shared global context.
  scopes: Vec<ScopeEntry>,
  /// Which generator scopes are currently on the stack.
  on_stack: Vec<bool>,
  global: ContextRef,
  true_obj: ObjectRef,
  false_obj: ObjectRef,
  saved_bbs: Vec<u32>,
  retval: Option<Register>,
  /// Parameter bindings staged by `pass_param` for a body scope that is not
  /// on the stack yet, keyed by the body's beginning block.
  staged_params: Vec<(u32, String, ObjectRef)>,
}

#[derive(Debug)]
struct ScopeEntry {
  index: usize,
  context: Option<ContextRef>,
}

impl Vm {
  /// An interpreter with the built-in prototypes installed in a fresh
  /// global context.
  pub fn new() -> Vm {
    let global: ContextRef = Rc::new(RefCell::new(Context::default()));
    let (true_obj, false_obj) = install_prototypes(&global);
    Vm {
      current_bb: 0,
      regs: vec![],
      should_terminate_bb: false,
      scopes: vec![],
      on_stack: vec![],
      global,
      true_obj,
      false_obj,
      saved_bbs: vec![],
      retval: None,
      staged_params: vec![],
    }
  }

  /// Execute blocks starting from wherever the previous run stopped, until
  /// running past the end of the block list. The REPL relies on this:
  /// lowering appends blocks and `run` picks them up.
  pub fn run(&mut self, generator: &Generator) -> Result<()> {
    self.on_stack.resize(generator.scopes().len(), false);
    let file_size = generator.register_count() as usize;
    if self.regs.len() < file_size {
      self.regs.resize(file_size, None);
    }

    while (self.current_bb as usize) < generator.num_blocks() {
      for index in 0..generator.scopes().len() {
        let scope = &generator.scopes()[index];
        if scope.starts_at(self.current_bb) && !self.on_stack[index] {
          self.push_scope(index, scope);
        }
      }

      let block = generator.block(self.current_bb);
      for instruction in block.instructions() {
        self.execute(instruction, generator)?;
        if self.should_terminate_bb {
          break;
        }
      }

      if self.should_terminate_bb {
        self.should_terminate_bb = false;
        continue;
      }

      while let Some(entry) = self.scopes.last() {
        if generator.scopes()[entry.index].ends_at(self.current_bb) {
          self.pop_scope();
        } else {
          break;
        }
      }
      self.current_bb += 1;
    }
    Ok(())
  }

  fn execute(&mut self, instruction: &Instruction, generator: &Generator) -> Result<()> {
    match instruction {
      Instruction::Load { dst, name } => {
        let value = if name == "default" {
          Value::Str(name.clone())
        } else {
          Value::Object(self.fetch_object(name)?)
        };
        self.store_at(*dst, value);
      }
      Instruction::Store {
        obj,
        key,
        src,
        mutable,
      } => {
        let target = match self.at(*obj)? {
          Value::Object(o) => o,
          _ => return Err(Error::execution("attempted to store to not an object")),
        };
        match self.at(*src)? {
          Value::Object(o) => {
            target.add_store(key.clone(), Store::new(StoreValue::Object(o), *mutable))?
          }
          Value::Str(s) if s == "default" => target.enable_default(key.clone()),
          Value::Str(s) => {
            target.add_store(key.clone(), Store::new(StoreValue::Literal(s), *mutable))?
          }
          other => {
            return Err(Error::execution(format!(
              "cannot store {other} under `{key}`"
            )))
          }
        }
      }
      Instruction::Send {
        dst,
        obj,
        msg,
        stamp,
      } => {
        let target = match self.at(*obj)? {
          Value::Object(o) => o,
          _ => return Err(Error::execution("attempted to send to not an object")),
        };
        let result = object::send(&target, msg, stamp.as_ref(), None, self)?;
        self.store_at(*dst, result);
      }
      Instruction::Jump { target } => self.jump(*target),
      Instruction::JumpTrue { cond, target } => {
        if self.condition(*cond)?.ptr_eq(&self.true_obj) {
          self.jump(*target);
        }
      }
      Instruction::JumpFalse { cond, target } => {
        if self.condition(*cond)?.ptr_eq(&self.false_obj) {
          self.jump(*target);
        }
      }
      Instruction::JumpSaved { retval } => {
        self.push_retval(*retval)?;
        self.jump_saved(generator)?;
      }
    }
    Ok(())
  }

  fn condition(&self, register: Register) -> Result<ObjectRef> {
    match self.at(register)? {
      Value::Object(o) => Ok(o),
      other => Err(Error::execution(format!(
        "conditional jump on {other}, not an object"
      ))),
    }
  }

  /// Transfer control to block `target`; the rest of the current block does
  /// not execute.
  pub fn jump(&mut self, target: u32) {
    self.current_bb = target;
    self.should_terminate_bb = true;
  }

  /// Remember the block after the current one as the return address of a
  /// call about to happen.
  pub fn save_next_bb(&mut self) {
    self.saved_bbs.push(self.current_bb + 1);
  }

  fn jump_saved(&mut self, generator: &Generator) -> Result<()> {
    let target = self
      .saved_bbs
      .pop()
      .ok_or_else(|| Error::execution("the saved-return stack is empty"))?;

    // leaving the function body: unwind through its scope so a later call
    // enters it afresh
    while let Some(entry) = self.scopes.last() {
      let scope = &generator.scopes()[entry.index];
      if scope.is_global {
        break;
      }
      let done = scope.flags.can_return();
      self.pop_scope();
      if done {
        break;
      }
    }

    self.jump(target);
    Ok(())
  }

  fn push_retval(&mut self, retval: Option<Register>) -> Result<()> {
    if retval.is_some() {
      if self.retval.is_some() {
        return Err(Error::execution(
          "a return value is already in flight; it was never consumed",
        ));
      }
      self.retval = retval;
    }
    Ok(())
  }

  pub fn take_retval(&mut self) -> Option<Register> {
    self.retval.take()
  }

  pub fn has_pending_retval(&self) -> bool {
    self.retval.is_some()
  }

  pub fn saved_blocks(&self) -> &[u32] {
    &self.saved_bbs
  }

  fn push_scope(&mut self, index: usize, scope: &LexicalScope) {
    let context = if scope.is_global {
      None
    } else {
      let context: ContextRef = Rc::new(RefCell::new(Context::default()));
      let mut i = 0;
      while i < self.staged_params.len() {
        if self.staged_params[i].0 == scope.beginning {
          let (_, name, object) = self.staged_params.remove(i);
          context.borrow_mut().add(name, object);
        } else {
          i += 1;
        }
      }
      Some(context)
    };
    self.on_stack[index] = true;
    self.scopes.push(ScopeEntry { index, context });
  }

  fn pop_scope(&mut self) {
    if let Some(entry) = self.scopes.pop() {
      self.on_stack[entry.index] = false;
    }
  }

  /// Stage a parameter binding for the body scope beginning at `block`.
  /// `call` pushes that scope, which installs the binding.
  pub fn stage_param(&mut self, block: u32, name: String, object: ObjectRef) {
    self.staged_params.push((block, name, object));
  }

  pub fn store_at(&mut self, register: Register, value: Value) {
    let index = register.index() as usize;
    if index >= self.regs.len() {
      self.regs.resize(index + 1, None);
    }
    self.regs[index] = Some(value);
  }

  pub fn store_at_next_available(&mut self, value: Value) -> Register {
    let register = Register::new(self.regs.len() as u32);
    self.regs.push(Some(value));
    register
  }

  pub fn at(&self, register: Register) -> Result<Value> {
    self
      .regs
      .get(register.index() as usize)
      .cloned()
      .flatten()
      .ok_or_else(|| Error::execution(format!("read from empty register {register}")))
  }

  /// Resolve `name` through the local contexts, innermost first, then the
  /// global context.
  pub fn fetch_object(&self, name: &str) -> Result<ObjectRef> {
    for entry in self.scopes.iter().rev() {
      if let Some(context) = &entry.context {
        if let Some(object) = context.borrow().get(name) {
          return Ok(object);
        }
      }
    }
    if let Some(object) = self.global.borrow().get(name) {
      return Ok(object);
    }
    Err(Error::execution(format!("object not in scope: {name}")))
  }

  pub fn fetch_global(&self, name: &str) -> Result<ObjectRef> {
    self
      .global
      .borrow()
      .get(name)
      .ok_or_else(|| Error::execution(format!("object not in scope: {name}")))
  }

  /// Bind `name`. An existing binding is rebound where it lives, so loop
  /// bodies update enclosing names instead of shadowing them; new names
  /// land in the current scope's context.
  pub fn put_object(&mut self, name: &str, object: ObjectRef) {
    for entry in self.scopes.iter().rev() {
      if let Some(context) = &entry.context {
        if context.borrow().contains(name) {
          context.borrow_mut().add(name, object);
          return;
        }
      }
    }
    if self.global.borrow().contains(name) {
      self.global.borrow_mut().add(name, object);
      return;
    }
    match self.scopes.last().and_then(|entry| entry.context.clone()) {
      Some(context) => context.borrow_mut().add(name, object),
      None => self.global.borrow_mut().add(name, object),
    }
  }

  /// Names bound in the global context, in insertion order.
  pub fn global_names(&self) -> Vec<String> {
    self.global.borrow().names()
  }

  pub fn bool_object(&self, value: bool) -> ObjectRef {
    if value {
      self.true_obj.clone()
    } else {
      self.false_obj.clone()
    }
  }

  /// The `-r` dump: one line per register slot.
  pub fn dump(&self) -> String {
    let mut out = String::new();
    for (index, slot) in self.regs.iter().enumerate() {
      match slot {
        Some(value) => {
          let _ = writeln!(out, "r{index} {value}");
        }
        None => {
          let _ = writeln!(out, "r{index} EMPTY");
        }
      }
    }
    out
  }
}

impl Default for Vm {
  fn default() -> Self {
    Self::new()
  }
}

/// Pre-populate the global context with the built-in prototypes. Returns
/// the `True`/`False` singletons the conditional jumps compare against.
fn install_prototypes(global: &ContextRef) -> (ObjectRef, ObjectRef) {
  let mut context = global.borrow_mut();

  let object = ObjectRef::new(None, "Object");
  object.set_store("type", Store::new(StoreValue::Literal("Object".into()), false));
  for name in ["clone", "==", "!="] {
    object.enable_default(name);
  }
  context.add("Object", object.clone());

  let install = |context: &mut Context, name: &str, defaults: &[&str]| -> ObjectRef {
    let proto = ObjectRef::new(Some(object.clone()), name);
    proto.set_store("type", Store::new(StoreValue::Literal(name.into()), false));
    for default in defaults {
      proto.enable_default(*default);
    }
    context.add(name, proto.clone());
    proto
  };

  let true_obj = install(&mut context, "True", &[]);
  let false_obj = install(&mut context, "False", &[]);
  install(
    &mut context,
    "Int",
    &[
      "store_value",
      "%",
      "*",
      "/",
      "+",
      "-",
      "<<",
      ">>",
      "&",
      "><",
      "|",
      "<",
      "<=",
      ">",
      ">=",
    ],
  );
  install(&mut context, "Char", &["store_value"]);
  install(&mut context, "String", &["store_value"]);
  let vec = install(&mut context, "Vec", &["get", "push"]);
  let callable = install(
    &mut context,
    "Callable",
    &[
      "clone_callable",
      "store_param",
      "pass_body",
      "pass_param",
      "call",
      "get_return_value",
    ],
  );
  let param_names = ObjectRef::new(Some(vec), "Vec");
  callable.set_store("param_names", Store::new(StoreValue::Object(param_names), true));

  (true_obj, false_obj)
}
