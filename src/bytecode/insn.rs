use std::fmt;

/// An index into the interpreter's register file. Registers are allocated
/// monotonically during lowering and never reused.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Register(u32);

impl Register {
  pub fn new(index: u32) -> Register {
    Register(index)
  }

  pub fn index(&self) -> u32 {
    self.0
  }
}

impl fmt::Display for Register {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "r{}", self.0)
  }
}

/// The optional payload of a `Send`: a register holding an object, a literal
/// identifier/string, or a raw basic-block index (only used to hand a
/// function body to `pass_body`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Stamp {
  Register(Register),
  Literal(String),
  Block(u32),
}

impl fmt::Display for Stamp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Stamp::Register(r) => write!(f, "{r}"),
      Stamp::Literal(s) => write!(f, "{s}"),
      Stamp::Block(b) => write!(f, "BB{b}"),
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
  /// Resolve `name` in the scope stack (or the literal string `default`)
  /// and place it in `dst`.
  Load { dst: Register, name: String },
  /// Bind `key` in the object held by `obj` to the value held by `src`.
  Store {
    obj: Register,
    key: String,
    src: Register,
    mutable: bool,
  },
  /// Send `msg` to the object in `obj`, with an optional stamp; the result
  /// lands in `dst`.
  Send {
    dst: Register,
    obj: Register,
    msg: String,
    stamp: Option<Stamp>,
  },
  Jump { target: u32 },
  /// Branch if the register holds the global `True`.
  JumpTrue { cond: Register, target: u32 },
  /// Branch if the register holds the global `False`.
  JumpFalse { cond: Register, target: u32 },
  /// Pop the saved-return stack, publish `retval` (if present) as the
  /// current return value, and jump to the popped block.
  JumpSaved { retval: Option<Register> },
}

impl fmt::Display for Instruction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Instruction::Load { dst, name } => write!(f, "Load {dst}, {name}"),
      Instruction::Store {
        obj,
        key,
        src,
        mutable,
      } => {
        write!(f, "Store {obj}, {key}, {src}")?;
        if *mutable {
          write!(f, ", mut")?;
        }
        Ok(())
      }
      Instruction::Send {
        dst,
        obj,
        msg,
        stamp,
      } => {
        write!(f, "Send {dst}, {obj}, {msg}")?;
        if let Some(stamp) = stamp {
          write!(f, ", {stamp}")?;
        }
        Ok(())
      }
      Instruction::Jump { target } => write!(f, "Jump BB{target}"),
      Instruction::JumpTrue { cond, target } => write!(f, "JumpTrue {cond}, BB{target}"),
      Instruction::JumpFalse { cond, target } => write!(f, "JumpFalse {cond}, BB{target}"),
      Instruction::JumpSaved { retval } => {
        write!(f, "JumpSaved")?;
        if let Some(retval) = retval {
          write!(f, " {retval}")?;
        }
        Ok(())
      }
    }
  }
}

impl Instruction {
  /// The largest register index this instruction touches, used while
  /// deserializing to size the register file.
  pub fn biggest_register(&self) -> Option<u32> {
    match self {
      Instruction::Load { dst, .. } => Some(dst.index()),
      Instruction::Store { obj, src, .. } => Some(obj.index().max(src.index())),
      Instruction::Send {
        dst, obj, stamp, ..
      } => {
        let mut biggest = dst.index().max(obj.index());
        if let Some(Stamp::Register(r)) = stamp {
          biggest = biggest.max(r.index());
        }
        Some(biggest)
      }
      Instruction::Jump { .. } => None,
      Instruction::JumpTrue { cond, .. } | Instruction::JumpFalse { cond, .. } => {
        Some(cond.index())
      }
      Instruction::JumpSaved { retval } => retval.map(|r| r.index()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_matches_dump_format() {
    let insn = Instruction::Send {
      dst: Register::new(1),
      obj: Register::new(0),
      msg: "clone".into(),
      stamp: Some(Stamp::Literal("::lit_5".into())),
    };
    assert_eq!(insn.to_string(), "Send r1, r0, clone, ::lit_5");

    let insn = Instruction::Send {
      dst: Register::new(3),
      obj: Register::new(2),
      msg: "call".into(),
      stamp: None,
    };
    assert_eq!(insn.to_string(), "Send r3, r2, call");

    let insn = Instruction::Store {
      obj: Register::new(0),
      key: "x".into(),
      src: Register::new(4),
      mutable: true,
    };
    assert_eq!(insn.to_string(), "Store r0, x, r4, mut");

    let insn = Instruction::JumpFalse {
      cond: Register::new(7),
      target: 3,
    };
    assert_eq!(insn.to_string(), "JumpFalse r7, BB3");
  }

  #[test]
  fn biggest_register() {
    let insn = Instruction::Send {
      dst: Register::new(1),
      obj: Register::new(9),
      msg: "push".into(),
      stamp: Some(Stamp::Register(Register::new(4))),
    };
    assert_eq!(insn.biggest_register(), Some(9));
    assert_eq!(Instruction::Jump { target: 0 }.biggest_register(), None);
  }
}
