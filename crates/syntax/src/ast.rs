use std::fmt;

use span::Span;

/// The node kinds produced by the parser and consumed by bytecode lowering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
  Program,
  SList,
  Object,
  Value,
  Message,
  Send,
  Store,
  Int,
  Char,
  String,
  Vec,
  Fn,
  FnCall,
  If,
  While,
  Break,
  Continue,
  Mut,
  Use,
}

impl NodeKind {
  pub fn name(&self) -> &'static str {
    match self {
      NodeKind::Program => "Program",
      NodeKind::SList => "SList",
      NodeKind::Object => "Object",
      NodeKind::Value => "Value",
      NodeKind::Message => "Message",
      NodeKind::Send => "Send",
      NodeKind::Store => "Store",
      NodeKind::Int => "Int",
      NodeKind::Char => "Char",
      NodeKind::String => "String",
      NodeKind::Vec => "Vec",
      NodeKind::Fn => "Fn",
      NodeKind::FnCall => "FnCall",
      NodeKind::If => "If",
      NodeKind::While => "While",
      NodeKind::Break => "Break",
      NodeKind::Continue => "Continue",
      NodeKind::Mut => "Mut",
      NodeKind::Use => "Use",
    }
  }
}

/// A uniform syntax tree node: a kind, the token text it carries, its span
/// in the source it was parsed from, and its ordered children.
#[derive(Clone, Debug)]
pub struct Node {
  pub kind: NodeKind,
  pub value: String,
  pub span: Span,
  pub children: Vec<Node>,
}

impl Node {
  pub fn new(kind: NodeKind, value: impl Into<String>, span: Span) -> Node {
    Node {
      kind,
      value: value.into(),
      span,
      children: vec![],
    }
  }

  pub fn with_children(
    kind: NodeKind,
    value: impl Into<String>,
    span: Span,
    children: Vec<Node>,
  ) -> Node {
    Node {
      kind,
      value: value.into(),
      span,
      children,
    }
  }

  pub fn is(&self, kind: NodeKind) -> bool {
    self.kind == kind
  }

  fn fmt_indent(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    writeln!(f, "{:indent$}{}({})", "", self.kind.name(), self.value, indent = depth * 2)?;
    for child in &self.children {
      child.fmt_indent(f, depth + 1)?;
    }
    Ok(())
  }
}

/// Renders the indented tree dump used by the `-a` flag.
impl fmt::Display for Node {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.fmt_indent(f, 0)
  }
}
