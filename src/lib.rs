//! Stamp: a small prototype-based, message-passing language.
//!
//! Source text is lexed and parsed (the `syntax` crate), lowered into
//! register bytecode organized as basic blocks and lexical scopes
//! ([`emit::Generator`]), optionally serialized to a compact binary
//! container ([`bytecode::serde`]), and executed by an interpreter
//! ([`vm::Vm`]) against a runtime of prototype-linked objects that
//! communicate only by named messages.

pub mod bytecode;
pub mod emit;
pub mod error;
pub mod object;
pub mod vm;

pub use syntax;

pub use bytecode::{BasicBlock, Instruction, LexicalScope, Register, ScopeFlags, Stamp};
pub use emit::Generator;
pub use error::{Error, Result};
pub use object::{Object, ObjectRef, Store, StoreValue, Value};
pub use vm::Vm;

#[cfg(test)]
mod tests;
