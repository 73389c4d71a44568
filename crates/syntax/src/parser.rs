//! Recursive-descent parser for Stamp.
//!
//! Statements are message sends at heart: operators are messages, `name =
//! rhs` stamps the result of `rhs` with `name` (by riding along on an
//! argument-less final message, or by cloning the result), and `obj key =
//! rhs` binds a store inside an object.

use span::{LineCol, Span};

use crate::ast::{Node, NodeKind};
use crate::lexer::{lex, unescape, Token, TokenKind};
use crate::{Error, Result};

use TokenKind::*;

/// Parse a whole source text into a `Program` node.
pub fn parse(src: &str) -> Result<Node> {
  let tokens = lex(src)?;
  let mut parser = Parser {
    src,
    tokens,
    pos: 0,
  };
  parser.program()
}

struct Parser<'src> {
  src: &'src str,
  tokens: Vec<Token<'src>>,
  pos: usize,
}

impl<'src> Parser<'src> {
  fn program(&mut self) -> Result<Node> {
    let mut children = vec![];
    while !self.at_eof() {
      if self.bump_if(Tok_Semicolon) {
        continue;
      }
      children.push(self.stmt()?);
    }
    let span = Span::from(0..self.src.len());
    Ok(Node::with_children(NodeKind::Program, "", span, children))
  }

  fn stmt(&mut self) -> Result<Node> {
    match self.kind() {
      Some(Brk_CurlyL) => self.block(),
      Some(Kw_Use) => self.use_stmt(),
      Some(Kw_Fn) => self.function(),
      Some(Kw_If) => self.if_stmt(),
      Some(Kw_While) => self.while_stmt(),
      Some(Kw_Break) => {
        let span = self.bump().span;
        self.bump_if(Tok_Semicolon);
        Ok(Node::new(NodeKind::Break, "", span))
      }
      Some(Kw_Continue) => {
        let span = self.bump().span;
        self.bump_if(Tok_Semicolon);
        Ok(Node::new(NodeKind::Continue, "", span))
      }
      _ => self.expr_stmt(),
    }
  }

  /// `{ stmt* }`
  fn block(&mut self) -> Result<Node> {
    let open = self.expect(Brk_CurlyL)?.span;
    let mut children = vec![];
    while !self.at(Brk_CurlyR) {
      if self.at_eof() {
        return Err(self.error("unexpected end of input, expected `}`"));
      }
      if self.bump_if(Tok_Semicolon) {
        continue;
      }
      children.push(self.stmt()?);
    }
    let close = self.expect(Brk_CurlyR)?.span;
    Ok(Node::with_children(NodeKind::SList, "", open.join(close), children))
  }

  /// `use name ;`
  fn use_stmt(&mut self) -> Result<Node> {
    let span = self.expect(Kw_Use)?.span;
    let name = self.expect(Lit_Ident)?;
    let node = Node::new(NodeKind::Use, name.lexeme.to_string(), span.join(name.span));
    self.bump_if(Tok_Semicolon);
    Ok(node)
  }

  /// `fn name(p1, p2) { body }`
  fn function(&mut self) -> Result<Node> {
    let span = self.expect(Kw_Fn)?.span;
    let name = self.expect(Lit_Ident)?;
    let mut children = vec![Node::new(
      NodeKind::Value,
      name.lexeme.to_string(),
      name.span,
    )];

    self.expect(Brk_ParenL)?;
    while self.at(Lit_Ident) {
      let param = self.bump();
      children.push(Node::new(NodeKind::Value, param.lexeme.to_string(), param.span));
      if !self.bump_if(Tok_Comma) {
        break;
      }
    }
    self.expect(Brk_ParenR)?;

    let body = self.block()?;
    let span = span.join(body.span);
    children.push(body);
    Ok(Node::with_children(NodeKind::Fn, "", span, children))
  }

  /// `if cond { .. } [else { .. } | else if ..]`
  fn if_stmt(&mut self) -> Result<Node> {
    let span = self.expect(Kw_If)?.span;
    let cond = self.expr()?;
    let then = self.block()?;
    let mut span = span.join(then.span);
    let mut children = vec![cond, then];
    if self.bump_if(Kw_Else) {
      let branch = if self.at(Kw_If) {
        self.if_stmt()?
      } else {
        self.block()?
      };
      span = span.join(branch.span);
      children.push(branch);
    }
    Ok(Node::with_children(NodeKind::If, "", span, children))
  }

  /// `while cond { .. }`
  fn while_stmt(&mut self) -> Result<Node> {
    let span = self.expect(Kw_While)?.span;
    let cond = self.expr()?;
    let body = self.block()?;
    let span = span.join(body.span);
    Ok(Node::with_children(NodeKind::While, "", span, vec![cond, body]))
  }

  fn expr_stmt(&mut self) -> Result<Node> {
    let expr = self.expr()?;

    // `obj key = rhs` binds a store inside the object `obj` evaluates to
    let node = if self.at(Lit_Ident) && self.nth_is(1, Op_Equal) {
      let key = self.bump();
      self.expect(Op_Equal)?;
      let mutable = self.at(Kw_Mut).then(|| self.bump().span);
      let rhs = self.expr()?;
      let span = expr.span.join(rhs.span);
      let mut children = vec![
        expr,
        Node::new(NodeKind::Value, key.lexeme.to_string(), key.span),
        rhs,
      ];
      if let Some(mut_span) = mutable {
        children.push(Node::new(NodeKind::Mut, "", mut_span));
      }
      Node::with_children(NodeKind::Store, "", span, children)
    } else if self.at(Op_Equal) {
      if !expr.is(NodeKind::Object) {
        return Err(self.error("expected a name on the left side of `=`"));
      }
      self.bump();
      let rhs = self.expr()?;
      assign(expr, rhs)
    } else {
      expr
    };

    self.bump_if(Tok_Semicolon);
    Ok(node)
  }

  fn expr(&mut self) -> Result<Node> {
    let mut node = self.primary()?;
    loop {
      match self.kind() {
        Some(Op_Dot) => {
          self.bump();
          let name = self.expect(Lit_Ident)?;
          let msg = Node::new(NodeKind::Message, name.lexeme.to_string(), name.span);
          node = self.send(node, msg)?;
        }
        Some(kind) if kind.message().is_some() => {
          let tok = self.bump();
          let msg = Node::new(
            NodeKind::Message,
            kind.message().unwrap_or_default(),
            tok.span,
          );
          node = self.send(node, msg)?;
        }
        Some(Brk_ParenL) => {
          self.bump();
          let mut children = vec![node];
          while !self.at(Brk_ParenR) {
            children.push(self.expr()?);
            if !self.bump_if(Tok_Comma) {
              break;
            }
          }
          let close = self.expect(Brk_ParenR)?.span;
          let span = children[0].span.join(close);
          node = Node::with_children(NodeKind::FnCall, "", span, children);
        }
        _ => break,
      }
    }
    Ok(node)
  }

  /// Wrap `recv` in a send of `msg`, attaching a single operand when one
  /// follows directly (`3 + 4`, `x.foo y`). Operands do not chain; message
  /// chains associate to the left.
  fn send(&mut self, recv: Node, mut msg: Node) -> Result<Node> {
    if matches!(
      self.kind(),
      Some(Lit_Int | Lit_Char | Lit_String | Lit_Ident | Brk_SquareL)
    ) {
      msg.children.push(self.operand()?);
    }
    let span = recv.span.join(msg.span);
    Ok(Node::with_children(NodeKind::Send, "", span, vec![recv, msg]))
  }

  fn operand(&mut self) -> Result<Node> {
    self.primary()
  }

  fn primary(&mut self) -> Result<Node> {
    match self.kind() {
      Some(Lit_Int) => {
        let tok = self.bump();
        Ok(Node::new(NodeKind::Int, tok.lexeme.to_string(), tok.span))
      }
      Some(Lit_Char) => {
        let tok = self.bump();
        let body = &tok.lexeme[1..tok.lexeme.len() - 1];
        let decoded = unescape(body)
          .ok_or_else(|| Error::parsing(self.position_message("invalid character literal"), tok.span))?;
        Ok(Node::new(NodeKind::Char, decoded, tok.span))
      }
      Some(Lit_String) => {
        let tok = self.bump();
        let body = &tok.lexeme[1..tok.lexeme.len() - 1];
        let decoded = unescape(body)
          .ok_or_else(|| Error::parsing(self.position_message("invalid string literal"), tok.span))?;
        Ok(Node::new(NodeKind::String, decoded, tok.span))
      }
      Some(Lit_Ident) => {
        let tok = self.bump();
        Ok(Node::new(NodeKind::Object, tok.lexeme.to_string(), tok.span))
      }
      Some(Brk_SquareL) => {
        let open = self.bump().span;
        let mut children = vec![];
        while !self.at(Brk_SquareR) {
          children.push(self.expr()?);
          if !self.bump_if(Tok_Comma) {
            break;
          }
        }
        let close = self.expect(Brk_SquareR)?.span;
        Ok(Node::with_children(NodeKind::Vec, "", open.join(close), children))
      }
      Some(Brk_ParenL) => {
        self.bump();
        let inner = self.expr()?;
        self.expect(Brk_ParenR)?;
        Ok(inner)
      }
      _ => Err(self.error(format!("expected an expression, found {}", self.describe()))),
    }
  }

  fn at_eof(&self) -> bool {
    self.pos >= self.tokens.len()
  }

  fn kind(&self) -> Option<TokenKind> {
    self.tokens.get(self.pos).map(|t| t.kind)
  }

  fn at(&self, kind: TokenKind) -> bool {
    self.kind() == Some(kind)
  }

  fn nth_is(&self, n: usize, kind: TokenKind) -> bool {
    self.tokens.get(self.pos + n).map(|t| t.kind) == Some(kind)
  }

  fn bump(&mut self) -> Token<'src> {
    let tok = self.tokens[self.pos].clone();
    self.pos += 1;
    tok
  }

  fn bump_if(&mut self, kind: TokenKind) -> bool {
    if self.at(kind) {
      self.pos += 1;
      true
    } else {
      false
    }
  }

  fn expect(&mut self, kind: TokenKind) -> Result<Token<'src>> {
    if self.at(kind) {
      Ok(self.bump())
    } else {
      Err(self.error(format!("expected `{}`, found {}", kind.name(), self.describe())))
    }
  }

  fn describe(&self) -> String {
    match self.tokens.get(self.pos) {
      Some(tok) => format!("`{}`", tok.lexeme),
      None => "end of input".to_string(),
    }
  }

  fn span_here(&self) -> Span {
    self
      .tokens
      .get(self.pos)
      .map(|t| t.span)
      .unwrap_or_else(|| Span::from(self.src.len()..self.src.len()))
  }

  fn position_message(&self, message: impl std::fmt::Display) -> String {
    let at = LineCol::of(self.src, self.span_here().start);
    format!("{at}: {message}")
  }

  fn error(&self, message: impl std::fmt::Display) -> Error {
    Error::parsing(self.position_message(message), self.span_here())
  }
}

/// Desugar `name = rhs`.
///
/// When `rhs` ends in a message with no argument, the name becomes that
/// argument, so `P = Object.clone` performs a single clone stamped `P`.
/// Otherwise the result of `rhs` is cloned under the name, which is what
/// registers it in the surrounding context.
fn assign(name: Node, rhs: Node) -> Node {
  let name = Node::new(NodeKind::Value, name.value, name.span);
  let mut rhs = rhs;
  if rhs.is(NodeKind::Send) && rhs.children[1].children.is_empty() {
    rhs.children[1].children.push(name);
    return rhs;
  }
  let span = name.span.join(rhs.span);
  let msg = Node::with_children(NodeKind::Message, "clone", name.span, vec![name]);
  Node::with_children(NodeKind::Send, "", span, vec![rhs, msg])
}

#[cfg(test)]
mod tests {
  use super::*;

  fn dump(src: &str) -> String {
    parse(src).unwrap().to_string()
  }

  #[test]
  fn assignment_rides_on_bare_message() {
    let ast = dump("P = Object.clone;");
    assert_eq!(
      ast,
      "Program()\n  Send()\n    Object(Object)\n    Message(clone)\n      Value(P)\n"
    );
  }

  #[test]
  fn assignment_clones_computed_results() {
    let ast = dump("a = 3 + 4;");
    assert_eq!(
      ast,
      concat!(
        "Program()\n",
        "  Send()\n",
        "    Send()\n",
        "      Int(3)\n",
        "      Message(+)\n",
        "        Int(4)\n",
        "    Message(clone)\n",
        "      Value(a)\n",
      )
    );
  }

  #[test]
  fn sends_chain_left() {
    let ast = dump("1 + 2 * 3");
    assert_eq!(
      ast,
      concat!(
        "Program()\n",
        "  Send()\n",
        "    Send()\n",
        "      Int(1)\n",
        "      Message(+)\n",
        "        Int(2)\n",
        "    Message(*)\n",
        "      Int(3)\n",
      )
    );
  }

  #[test]
  fn store_statement() {
    let ast = dump("x y = mut 5;");
    assert_eq!(
      ast,
      concat!(
        "Program()\n",
        "  Store()\n",
        "    Object(x)\n",
        "    Value(y)\n",
        "    Int(5)\n",
        "    Mut()\n",
      )
    );
  }

  #[test]
  fn function_definition_and_call() {
    let ast = dump("fn sq(n) { n * n } sq(5)");
    assert_eq!(
      ast,
      concat!(
        "Program()\n",
        "  Fn()\n",
        "    Value(sq)\n",
        "    Value(n)\n",
        "    SList()\n",
        "      Send()\n",
        "        Object(n)\n",
        "        Message(*)\n",
        "          Object(n)\n",
        "  FnCall()\n",
        "    Object(sq)\n",
        "    Int(5)\n",
      )
    );
  }

  #[test]
  fn if_else_and_while() {
    let ast = dump("if x == 1 { x = 2 } else { x = 3 }");
    assert!(ast.starts_with("Program()\n  If()\n"));
    let ast = dump("while (i < 3) { break; continue }");
    assert_eq!(
      ast,
      concat!(
        "Program()\n",
        "  While()\n",
        "    Send()\n",
        "      Object(i)\n",
        "      Message(<)\n",
        "        Int(3)\n",
        "    SList()\n",
        "      Break()\n",
        "      Continue()\n",
      )
    );
  }

  #[test]
  fn vec_literal() {
    let ast = dump("[1, x]");
    assert_eq!(
      ast,
      concat!(
        "Program()\n",
        "  Vec()\n",
        "    Int(1)\n",
        "    Object(x)\n",
      )
    );
  }

  #[test]
  fn caret_is_clone() {
    assert_eq!(dump("Object ^ P;"), dump("Object.clone P;"));
  }

  #[test]
  fn use_statement() {
    let ast = dump("use prelude;");
    assert_eq!(ast, "Program()\n  Use(prelude)\n");
  }

  #[test]
  fn errors_carry_positions() {
    let err = parse("fn {").unwrap_err();
    assert_eq!(err.kind, crate::ErrorKind::Parsing);
    assert!(err.message.contains("1:4"), "{}", err.message);
  }
}
