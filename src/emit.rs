//! Lowering from the AST to basic blocks and lexical scopes.
//!
//! The generator owns the growing block list, the scope list and a register
//! counter. Appending an instruction returns a handle that callers keep to
//! back-patch jump targets once they exist; handles stay valid because
//! nothing reorders the instruction vectors.

use std::path::PathBuf;

use syntax::{Node, NodeKind};

use crate::bytecode::{
  serde, BasicBlock, InsnRef, Instruction, LexicalScope, Register, ScopeFlags, Stamp,
};
use crate::error::{Error, Result};

#[derive(Debug)]
pub struct Generator {
  register_count: u32,
  blocks: Vec<BasicBlock>,
  scopes: Vec<LexicalScope>,
  dirs: Vec<PathBuf>,
}

impl Generator {
  pub fn new(dirs: Vec<PathBuf>) -> Generator {
    Generator {
      register_count: 0,
      blocks: vec![],
      scopes: vec![],
      dirs,
    }
  }

  pub fn next_register(&mut self) -> Register {
    let register = Register::new(self.register_count);
    self.register_count += 1;
    register
  }

  pub fn register_count(&self) -> u32 {
    self.register_count
  }

  pub fn num_blocks(&self) -> usize {
    self.blocks.len()
  }

  pub fn block(&self, index: u32) -> &BasicBlock {
    &self.blocks[index as usize]
  }

  pub fn blocks(&self) -> &[BasicBlock] {
    &self.blocks
  }

  pub fn scopes(&self) -> &[LexicalScope] {
    &self.scopes
  }

  /// Append a new basic block and return its index.
  pub fn add_basic_block(&mut self) -> u32 {
    let index = self.blocks.len() as u32;
    self.blocks.push(BasicBlock::new(index));
    index
  }

  fn current_block(&mut self) -> u32 {
    match self.blocks.last() {
      Some(block) => block.index(),
      None => self.add_basic_block(),
    }
  }

  /// Append `instruction` to the current block.
  pub fn append(&mut self, instruction: Instruction) -> InsnRef {
    let block = self.current_block();
    let index = self.blocks[block as usize].push(instruction);
    InsnRef { block, index }
  }

  /// Point a previously appended jump at `target`.
  pub fn patch_jump(&mut self, insn: InsnRef, target: u32) {
    if let Some(instruction) = self
      .blocks
      .get_mut(insn.block as usize)
      .and_then(|b| b.instruction_mut(insn.index))
    {
      match instruction {
        Instruction::Jump { target: t }
        | Instruction::JumpTrue { target: t, .. }
        | Instruction::JumpFalse { target: t, .. } => *t = target,
        _ => {}
      }
    }
  }

  /// Whether a `can_be_global` scope opened right now would be global: the
  /// innermost still-open scope must be global (or there is none at all).
  /// Inside a function or loop body, nested statement lists get ordinary
  /// scopes instead.
  fn would_be_global(&self) -> bool {
    self
      .scopes
      .iter()
      .rev()
      .find(|scope| scope.is_open())
      .map_or(true, |scope| scope.is_global)
  }

  /// Open a scope on a fresh basic block.
  pub fn add_scope_beginning(&mut self, flags: ScopeFlags, can_be_global: bool) -> usize {
    let is_global = can_be_global && self.would_be_global();
    let beginning = self.add_basic_block();
    self.scopes.push(LexicalScope::new(beginning, flags, is_global));
    self.scopes.len() - 1
  }

  /// Open a scope on the current basic block.
  pub fn add_scope_beginning_current_bb(&mut self, flags: ScopeFlags, can_be_global: bool) -> usize {
    let is_global = can_be_global && self.would_be_global();
    let beginning = self.current_block();
    self.scopes.push(LexicalScope::new(beginning, flags, is_global));
    self.scopes.len() - 1
  }

  /// Close a scope at the current block and resolve its pending breaks.
  pub fn end_scope(&mut self, scope: usize) {
    let end = self.current_block();
    let (target, pending) = {
      let scope = &mut self.scopes[scope];
      scope.end = Some(end);
      (
        scope.break_dest.unwrap_or(end),
        std::mem::take(&mut scope.pending_breaks),
      )
    };
    for jump in pending {
      self.patch_jump(jump, target);
    }
  }

  /// Resolve and parse the target of a `use` against the search path.
  pub fn include_from(&self, name: &str) -> Result<Node> {
    let filename = if name.ends_with(".stamp") {
      name.to_string()
    } else {
      format!("{name}.stamp")
    };
    let mut resolved = PathBuf::from(&filename);
    for dir in &self.dirs {
      let candidate = dir.join(&filename);
      if candidate.is_file() {
        resolved = candidate;
        break;
      }
    }

    let source = std::fs::read_to_string(&resolved)
      .map_err(|_| Error::Parsing(format!("cannot find file to use: {name}")))?;
    Ok(syntax::parse(&source)?)
  }

  pub fn write_to_file(&self, path: &std::path::Path) -> Result<()> {
    let mut file = std::fs::File::create(path)
      .map_err(|e| Error::file_parsing(format!("cannot create {}: {e}", path.display())))?;
    serde::write(&mut file, &self.blocks, &self.scopes)
  }

  pub fn read_from_file(&mut self, path: &std::path::Path) -> Result<()> {
    let mut file = std::fs::File::open(path)
      .map_err(|e| Error::file_parsing(format!("cannot open {}: {e}", path.display())))?;
    let read = serde::read(&mut file)?;
    self.blocks = read.blocks;
    self.scopes = read.scopes;
    self.register_count = self.register_count.max(read.register_count);
    Ok(())
  }

  /// The `-b` dump: every block followed by the scope table.
  pub fn dump(&self) -> String {
    let mut out = String::new();
    for block in &self.blocks {
      out.push_str(&block.to_string());
    }
    out.push_str("Lexical scopes:\n");
    for scope in &self.scopes {
      out.push_str(&scope.to_string());
      out.push('\n');
    }
    out
  }

  /// Lower `node`, returning the register its value lives in when it has
  /// one.
  pub fn generate(&mut self, node: &Node) -> Result<Option<Register>> {
    match node.kind {
      NodeKind::Program => {
        let scope = self.add_scope_beginning(ScopeFlags::NONE, true);
        let out = self.generate_slist(&node.children)?;
        self.end_scope(scope);
        Ok(out)
      }
      NodeKind::SList => self.generate_slist(&node.children),
      NodeKind::Object => {
        let dst = self.next_register();
        self.append(Instruction::Load {
          dst,
          name: node.value.clone(),
        });
        Ok(Some(dst))
      }
      NodeKind::Int | NodeKind::Char | NodeKind::String => {
        let proto = match node.kind {
          NodeKind::Int => "Int",
          NodeKind::Char => "Char",
          _ => "String",
        };
        let obj = self.next_register();
        self.append(Instruction::Load {
          dst: obj,
          name: proto.to_string(),
        });
        let cloned = self.next_register();
        self.append(Instruction::Send {
          dst: cloned,
          obj,
          msg: "clone".to_string(),
          stamp: Some(Stamp::Literal(format!("::lit_{}", node.value))),
        });
        let dst = self.next_register();
        self.append(Instruction::Send {
          dst,
          obj: cloned,
          msg: "store_value".to_string(),
          stamp: Some(Stamp::Literal(node.value.clone())),
        });
        Ok(Some(dst))
      }
      NodeKind::Send => {
        let recv = child(node, 0)?;
        let msg = child(node, 1)?;
        let obj = self
          .generate(recv)?
          .ok_or_else(|| Error::generation("attempted to send to not an object"))?;
        let stamp = match msg.children.first() {
          None => None,
          Some(arg) if arg.is(NodeKind::Object) || arg.is(NodeKind::Value) => {
            Some(Stamp::Literal(arg.value.clone()))
          }
          Some(arg) => {
            let register = self
              .generate(arg)?
              .ok_or_else(|| Error::generation("message argument has no value"))?;
            Some(Stamp::Register(register))
          }
        };
        let dst = self.next_register();
        self.append(Instruction::Send {
          dst,
          obj,
          msg: msg.value.clone(),
          stamp,
        });
        Ok(Some(dst))
      }
      NodeKind::Store => {
        let obj = self
          .generate(child(node, 0)?)?
          .ok_or_else(|| Error::generation("attempted to store to not an object"))?;
        let src = self
          .generate(child(node, 2)?)?
          .ok_or_else(|| Error::generation("attempted to store not a value"))?;
        let mutable = node.children.len() == 4 && node.children[3].is(NodeKind::Mut);
        self.append(Instruction::Store {
          obj,
          key: child(node, 1)?.value.clone(),
          src,
          mutable,
        });
        Ok(None)
      }
      NodeKind::Vec => {
        let vec = self.next_register();
        self.append(Instruction::Load {
          dst: vec,
          name: "Vec".to_string(),
        });
        let mut dst = self.next_register();
        self.append(Instruction::Send {
          dst,
          obj: vec,
          msg: "clone".to_string(),
          stamp: Some(Stamp::Literal("::lit_vec".to_string())),
        });
        for element in &node.children {
          let register = self
            .generate(element)?
            .ok_or_else(|| Error::generation("vector element has no value"))?;
          let pushed = self.next_register();
          self.append(Instruction::Send {
            dst: pushed,
            obj: dst,
            msg: "push".to_string(),
            stamp: Some(Stamp::Register(register)),
          });
          dst = pushed;
        }
        Ok(Some(dst))
      }
      NodeKind::If => {
        let cond = self
          .generate(child(node, 0)?)?
          .ok_or_else(|| Error::generation("if condition has no value"))?;
        let jump_false = self.append(Instruction::JumpFalse { cond, target: 0 });
        let out = self.generate(child(node, 1)?)?;
        if node.children.len() == 3 {
          let skip_else = self.append(Instruction::Jump { target: 0 });
          let else_block = self.add_basic_block();
          self.patch_jump(jump_false, else_block);
          self.generate(child(node, 2)?)?;
          let tail = self.add_basic_block();
          self.patch_jump(skip_else, tail);
        } else {
          let tail = self.add_basic_block();
          self.patch_jump(jump_false, tail);
        }
        Ok(out)
      }
      NodeKind::While => {
        let condition_block = self.add_basic_block();
        let cond = self
          .generate(child(node, 0)?)?
          .ok_or_else(|| Error::generation("while condition has no value"))?;
        let jump_false = self.append(Instruction::JumpFalse { cond, target: 0 });
        let scope =
          self.add_scope_beginning(ScopeFlags::CAN_CONTINUE | ScopeFlags::CAN_BREAK, false);
        self.scopes[scope].continue_dest = Some(condition_block);
        let out = self.generate(child(node, 1)?)?;
        self.append(Instruction::Jump {
          target: condition_block,
        });
        let after = self.add_basic_block();
        self.scopes[scope].break_dest = Some(after);
        self.end_scope(scope);
        self.patch_jump(jump_false, after);
        Ok(out)
      }
      NodeKind::Break => {
        for index in (0..self.scopes.len()).rev() {
          if self.scopes[index].flags.can_break() && self.scopes[index].is_open() {
            let jump = self.append(Instruction::Jump { target: 0 });
            self.scopes[index].pending_breaks.push(jump);
            return Ok(None);
          }
        }
        Err(Error::generation(
          "break used outside of a statement that can break",
        ))
      }
      NodeKind::Continue => {
        for index in (0..self.scopes.len()).rev() {
          let scope = &self.scopes[index];
          if scope.flags.can_continue() && scope.is_open() {
            let target = scope.continue_dest.unwrap_or(scope.beginning);
            self.append(Instruction::Jump { target });
            return Ok(None);
          }
        }
        Err(Error::generation(
          "continue used outside of a statement that can continue",
        ))
      }
      NodeKind::Fn => {
        if node.children.len() < 2 {
          return Err(Error::generation("malformed function node"));
        }
        let name = child(node, 0)?;
        let callable = self.next_register();
        self.append(Instruction::Load {
          dst: callable,
          name: "Callable".to_string(),
        });
        let mut last = self.next_register();
        self.append(Instruction::Send {
          dst: last,
          obj: callable,
          msg: "clone_callable".to_string(),
          stamp: Some(Stamp::Literal(name.value.clone())),
        });
        for param in &node.children[1..node.children.len() - 1] {
          let dst = self.next_register();
          self.append(Instruction::Send {
            dst,
            obj: last,
            msg: "store_param".to_string(),
            stamp: Some(Stamp::Literal(param.value.clone())),
          });
          last = dst;
        }

        let skip_body = self.append(Instruction::Jump { target: 0 });
        let scope = self.add_scope_beginning(ScopeFlags::CAN_RETURN, false);
        let body_block = self.scopes[scope].beginning;
        let body = node
          .children
          .last()
          .ok_or_else(|| Error::generation("malformed function node"))?;
        let retval = self.generate(body)?;
        self.append(Instruction::JumpSaved { retval });
        self.end_scope(scope);
        let tail = self.add_basic_block();
        self.patch_jump(skip_body, tail);

        let dst = self.next_register();
        self.append(Instruction::Send {
          dst,
          obj: last,
          msg: "pass_body".to_string(),
          stamp: Some(Stamp::Block(body_block)),
        });
        Ok(Some(dst))
      }
      NodeKind::FnCall => {
        let mut last = self
          .generate(child(node, 0)?)?
          .ok_or_else(|| Error::generation("attempted to call not an object"))?;
        for arg in &node.children[1..] {
          let stamp = if arg.is(NodeKind::Object) || arg.is(NodeKind::Value) {
            Stamp::Literal(arg.value.clone())
          } else {
            let register = self
              .generate(arg)?
              .ok_or_else(|| Error::generation("call argument has no value"))?;
            Stamp::Register(register)
          };
          let dst = self.next_register();
          self.append(Instruction::Send {
            dst,
            obj: last,
            msg: "pass_param".to_string(),
            stamp: Some(stamp),
          });
          last = dst;
        }
        let dst = self.next_register();
        self.append(Instruction::Send {
          dst,
          obj: last,
          msg: "call".to_string(),
          stamp: None,
        });
        // the caller resumes in the block right after the call site
        self.add_basic_block();
        Ok(Some(dst))
      }
      NodeKind::Use => {
        let included = self.include_from(&node.value)?;
        self.generate(&included)
      }
      _ => Err(Error::generation(format!(
        "no bytecode generation implemented for {}",
        node.kind.name()
      ))),
    }
  }

  fn generate_slist(&mut self, children: &[Node]) -> Result<Option<Register>> {
    let mut last = None;
    for (i, node) in children.iter().enumerate() {
      if node.is(NodeKind::SList) {
        let scope = self.add_scope_beginning_current_bb(ScopeFlags::NONE, true);
        last = self.generate_slist(&node.children)?;
        self.end_scope(scope);

        // the nested scope claimed the current block; later statements in
        // this list need a block outside it
        if i != children.len() - 1 {
          self.add_basic_block();
        }
      } else {
        last = self.generate(node)?;
      }
    }
    Ok(last)
  }
}

fn child(node: &Node, index: usize) -> Result<&Node> {
  node
    .children
    .get(index)
    .ok_or_else(|| Error::generation(format!("malformed {} node", node.kind.name())))
}
