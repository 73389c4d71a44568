//! The bytecode container: a stream of tagged records.
//!
//! Scalars are native-endian; strings are a `u32` length followed by raw
//! bytes. `0xBB` starts a basic block, `0xAA` a lexical-scope record, and
//! `0x00` ends the stream. Everything else is an instruction opcode inside
//! the current block.

use std::io::{self, Read, Write};

use super::{BasicBlock, Instruction, LexicalScope, Register, ScopeFlags, Stamp};
use crate::error::{Error, Result};

const TAG_BLOCK: u8 = 0xbb;
const TAG_SCOPE: u8 = 0xaa;
const TAG_END: u8 = 0x00;

const OP_SEND: u8 = 0x01;
const OP_LOAD: u8 = 0x02;
const OP_STORE: u8 = 0x03;
const OP_JUMP: u8 = 0x04;
const OP_JUMP_TRUE: u8 = 0x05;
const OP_JUMP_FALSE: u8 = 0x06;
const OP_JUMP_SAVED: u8 = 0x07;

const STAMP_NONE: u8 = 0x00;
const STAMP_REGISTER: u8 = 0x01;
const STAMP_LITERAL: u8 = 0x02;
const STAMP_BLOCK: u8 = 0x03;

pub fn write(w: &mut impl Write, blocks: &[BasicBlock], scopes: &[LexicalScope]) -> Result<()> {
  for block in blocks {
    write_u8(w, TAG_BLOCK)?;
    for instruction in block.instructions() {
      write_instruction(w, instruction)?;
    }
  }
  for scope in scopes {
    write_scope(w, scope)?;
  }
  write_u8(w, TAG_END)?;
  Ok(())
}

#[derive(Debug)]
pub struct ReadOutcome {
  pub blocks: Vec<BasicBlock>,
  pub scopes: Vec<LexicalScope>,
  /// One past the largest register index seen in any instruction; the size
  /// the register file needs.
  pub register_count: u32,
}

pub fn read(r: &mut impl Read) -> Result<ReadOutcome> {
  let mut blocks: Vec<BasicBlock> = vec![];
  let mut scopes = vec![];
  let mut register_count = 0u32;

  loop {
    let tag = match try_read_u8(r)? {
      None | Some(TAG_END) => break,
      Some(tag) => tag,
    };
    match tag {
      TAG_BLOCK => {
        let index = blocks.len() as u32;
        blocks.push(BasicBlock::new(index));
      }
      TAG_SCOPE => scopes.push(read_scope(r)?),
      opcode => {
        let instruction = read_instruction(r, opcode)?;
        if let Some(biggest) = instruction.biggest_register() {
          register_count = register_count.max(biggest + 1);
        }
        match blocks.last_mut() {
          Some(block) => {
            block.push(instruction);
          }
          None => {
            return Err(Error::file_parsing(format!(
              "unexpected first byte of file: {opcode}; the file might not be an object-stamp file"
            )))
          }
        }
      }
    }
  }

  Ok(ReadOutcome {
    blocks,
    scopes,
    register_count,
  })
}

fn write_instruction(w: &mut impl Write, instruction: &Instruction) -> Result<()> {
  match instruction {
    Instruction::Send {
      dst,
      obj,
      msg,
      stamp,
    } => {
      write_u8(w, OP_SEND)?;
      write_u32(w, dst.index())?;
      write_u32(w, obj.index())?;
      write_string(w, msg)?;
      match stamp {
        None => write_u8(w, STAMP_NONE)?,
        Some(Stamp::Register(register)) => {
          write_u8(w, STAMP_REGISTER)?;
          write_u32(w, register.index())?;
        }
        Some(Stamp::Literal(literal)) => {
          write_u8(w, STAMP_LITERAL)?;
          write_string(w, literal)?;
        }
        Some(Stamp::Block(block)) => {
          write_u8(w, STAMP_BLOCK)?;
          write_u32(w, *block)?;
        }
      }
    }
    Instruction::Load { dst, name } => {
      write_u8(w, OP_LOAD)?;
      write_u32(w, dst.index())?;
      write_string(w, name)?;
    }
    Instruction::Store {
      obj,
      key,
      src,
      mutable,
    } => {
      write_u8(w, OP_STORE)?;
      write_u32(w, obj.index())?;
      write_string(w, key)?;
      write_u32(w, src.index())?;
      write_u8(w, u8::from(*mutable))?;
    }
    Instruction::Jump { target } => {
      write_u8(w, OP_JUMP)?;
      write_u32(w, *target)?;
    }
    Instruction::JumpTrue { cond, target } => {
      write_u8(w, OP_JUMP_TRUE)?;
      write_u32(w, *target)?;
      write_u32(w, cond.index())?;
    }
    Instruction::JumpFalse { cond, target } => {
      write_u8(w, OP_JUMP_FALSE)?;
      write_u32(w, *target)?;
      write_u32(w, cond.index())?;
    }
    Instruction::JumpSaved { retval } => {
      write_u8(w, OP_JUMP_SAVED)?;
      // register 0 is never a return value, so 0 encodes "none"
      write_u32(w, retval.map(|r| r.index()).unwrap_or(0))?;
    }
  }
  Ok(())
}

fn read_instruction(r: &mut impl Read, opcode: u8) -> Result<Instruction> {
  let instruction = match opcode {
    OP_SEND => {
      let dst = Register::new(read_u32(r)?);
      let obj = Register::new(read_u32(r)?);
      let msg = read_string(r)?;
      let stamp = match read_u8(r)? {
        STAMP_NONE => None,
        STAMP_REGISTER => Some(Stamp::Register(Register::new(read_u32(r)?))),
        STAMP_LITERAL => Some(Stamp::Literal(read_string(r)?)),
        STAMP_BLOCK => Some(Stamp::Block(read_u32(r)?)),
        other => {
          return Err(Error::file_parsing(format!(
            "unrecognized stamp type: {other}"
          )))
        }
      };
      Instruction::Send {
        dst,
        obj,
        msg,
        stamp,
      }
    }
    OP_LOAD => Instruction::Load {
      dst: Register::new(read_u32(r)?),
      name: read_string(r)?,
    },
    OP_STORE => Instruction::Store {
      obj: Register::new(read_u32(r)?),
      key: read_string(r)?,
      src: Register::new(read_u32(r)?),
      mutable: read_u8(r)? != 0,
    },
    OP_JUMP => Instruction::Jump {
      target: read_u32(r)?,
    },
    OP_JUMP_TRUE => Instruction::JumpTrue {
      target: read_u32(r)?,
      cond: Register::new(read_u32(r)?),
    },
    OP_JUMP_FALSE => Instruction::JumpFalse {
      target: read_u32(r)?,
      cond: Register::new(read_u32(r)?),
    },
    OP_JUMP_SAVED => {
      let retval = match read_u32(r)? {
        0 => None,
        index => Some(Register::new(index)),
      };
      Instruction::JumpSaved { retval }
    }
    other => {
      return Err(Error::file_parsing(format!(
        "unrecognized instruction code: {other}"
      )))
    }
  };
  Ok(instruction)
}

fn write_scope(w: &mut impl Write, scope: &LexicalScope) -> Result<()> {
  write_u8(w, TAG_SCOPE)?;
  write_u8(w, u8::from(scope.is_global))?;
  write_i32(w, scope.beginning as i32)?;
  write_u8(w, scope.flags.bits())?;
  if scope.flags.can_continue() {
    write_u32(w, scope.continue_dest.unwrap_or(0))?;
  }
  if scope.flags.can_break() {
    write_u32(w, scope.break_dest.unwrap_or(0))?;
  }
  write_i32(w, scope.end.map(|e| e as i32).unwrap_or(-1))?;
  Ok(())
}

fn read_scope(r: &mut impl Read) -> Result<LexicalScope> {
  let is_global = read_u8(r)? != 0;
  let beginning = read_i32(r)?;
  let flags = ScopeFlags::from_bits(read_u8(r)?);

  let mut scope = LexicalScope::new(beginning.max(0) as u32, flags, is_global);
  if flags.can_continue() {
    scope.continue_dest = Some(read_u32(r)?);
  }
  if flags.can_break() {
    scope.break_dest = Some(read_u32(r)?);
  }
  let end = read_i32(r)?;
  scope.end = (end >= 0).then_some(end as u32);
  Ok(scope)
}

fn io_error(e: io::Error) -> Error {
  Error::file_parsing(format!("unexpected end of bytecode stream: {e}"))
}

fn write_u8(w: &mut impl Write, value: u8) -> Result<()> {
  w.write_all(&[value]).map_err(io_error)
}

fn write_u32(w: &mut impl Write, value: u32) -> Result<()> {
  w.write_all(&value.to_ne_bytes()).map_err(io_error)
}

fn write_i32(w: &mut impl Write, value: i32) -> Result<()> {
  w.write_all(&value.to_ne_bytes()).map_err(io_error)
}

fn write_string(w: &mut impl Write, value: &str) -> Result<()> {
  write_u32(w, value.len() as u32)?;
  w.write_all(value.as_bytes()).map_err(io_error)
}

/// Read one byte, reporting a clean end-of-stream as `None`.
fn try_read_u8(r: &mut impl Read) -> Result<Option<u8>> {
  let mut buf = [0u8; 1];
  match r.read_exact(&mut buf) {
    Ok(()) => Ok(Some(buf[0])),
    Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
    Err(e) => Err(io_error(e)),
  }
}

fn read_u8(r: &mut impl Read) -> Result<u8> {
  let mut buf = [0u8; 1];
  r.read_exact(&mut buf).map_err(io_error)?;
  Ok(buf[0])
}

fn read_u32(r: &mut impl Read) -> Result<u32> {
  let mut buf = [0u8; 4];
  r.read_exact(&mut buf).map_err(io_error)?;
  Ok(u32::from_ne_bytes(buf))
}

fn read_i32(r: &mut impl Read) -> Result<i32> {
  let mut buf = [0u8; 4];
  r.read_exact(&mut buf).map_err(io_error)?;
  Ok(i32::from_ne_bytes(buf))
}

fn read_string(r: &mut impl Read) -> Result<String> {
  let len = read_u32(r)? as usize;
  let mut buf = vec![0u8; len];
  r.read_exact(&mut buf).map_err(io_error)?;
  String::from_utf8(buf).map_err(|_| Error::file_parsing("string record is not valid utf-8"))
}
