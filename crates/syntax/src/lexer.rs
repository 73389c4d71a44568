#![allow(non_camel_case_types)]

use beef::lean::Cow;
use logos::Logos;
use span::{LineCol, Span};

use crate::{Error, Result};

#[derive(Clone, Debug)]
pub struct Token<'src> {
  pub lexeme: Cow<'src, str>,
  pub kind: TokenKind,
  pub span: Span,
}

impl<'src> Token<'src> {
  pub fn is(&self, kind: TokenKind) -> bool {
    self.kind == kind
  }
}

/// Lex `src` into a token stream, stopping at the first malformed token.
pub fn lex(src: &str) -> Result<Vec<Token<'_>>> {
  let mut tokens = vec![];
  let mut lexer = logos::Lexer::<TokenKind>::new(src);
  while let Some(kind) = lexer.next() {
    let lexeme = lexer.slice();
    let span: Span = lexer.span().into();

    if let TokenKind::_Error = kind {
      let at = LineCol::of(src, span.start);
      return Err(Error::lexing(
        format!("{at}: unrecognized token `{lexeme}`"),
        span,
      ));
    }

    tokens.push(Token {
      lexeme: lexeme.into(),
      kind,
      span,
    });
  }
  Ok(tokens)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Logos)]
pub enum TokenKind {
  // Keywords
  #[token("fn")]
  Kw_Fn,
  #[token("if")]
  Kw_If,
  #[token("else")]
  Kw_Else,
  #[token("while")]
  Kw_While,
  #[token("break")]
  Kw_Break,
  #[token("continue")]
  Kw_Continue,
  #[token("use")]
  Kw_Use,
  #[token("mut")]
  Kw_Mut,

  // Brackets
  #[token("{")]
  Brk_CurlyL,
  #[token("}")]
  Brk_CurlyR,
  #[token("(")]
  Brk_ParenL,
  #[token(")")]
  Brk_ParenR,
  #[token("[")]
  Brk_SquareL,
  #[token("]")]
  Brk_SquareR,

  // Misc characters
  #[token(".")]
  Op_Dot,
  #[token(",")]
  Tok_Comma,
  #[token(";")]
  Tok_Semicolon,
  #[token("=")]
  Op_Equal,

  // Operators; every one of these is a message name, and `^` is
  // shorthand for the `clone` message.
  #[token("^")]
  Op_Caret,
  #[token("%")]
  Op_Percent,
  #[token("*")]
  Op_Star,
  #[token("/")]
  Op_Slash,
  #[token("+")]
  Op_Plus,
  #[token("-")]
  Op_Minus,
  #[token("<<")]
  Op_Shl,
  #[token(">>")]
  Op_Shr,
  #[token("<")]
  Op_Less,
  #[token("<=")]
  Op_LessEqual,
  #[token(">")]
  Op_More,
  #[token(">=")]
  Op_MoreEqual,
  #[token("==")]
  Op_EqualEqual,
  #[token("!=")]
  Op_BangEqual,
  #[token("&")]
  Op_And,
  #[token("><")]
  Op_Xor,
  #[token("|")]
  Op_Pipe,
  #[token("!")]
  Op_Bang,
  #[token("&&")]
  Op_AndAnd,
  #[token("||")]
  Op_PipePipe,

  // Literals
  /// `0`, `425`, etc.
  #[regex(r"[0-9]+")]
  Lit_Int,
  /// `'a'`, `'\n'`, `'\x1b'`, etc.
  #[regex(r"'([^'\\]|\\x[0-9a-fA-F][0-9a-fA-F]|\\.)'")]
  Lit_Char,
  #[regex(r#""([^"\\]|\\.)*""#)]
  Lit_String,
  /// `a`, `B_c`, `__x0`, etc.
  #[regex("[a-zA-Z_][a-zA-Z0-9_]*")]
  Lit_Ident,

  #[doc(hidden)]
  #[regex(r"[ \t\n\r\f]+", logos::skip)]
  _Whitespace,
  #[doc(hidden)]
  #[regex(r"//[^\n]*", logos::skip)]
  _CommentLine,
  #[doc(hidden)]
  #[regex(r"/\*[^*]*\*+([^/*][^*]*\*+)*/", logos::skip)]
  _CommentBlock,

  /// Produced for malformed input and turned into a lexing error.
  #[doc(hidden)]
  #[error]
  _Error,
}

impl TokenKind {
  /// The message name an operator token sends, if it is an operator.
  pub fn message(&self) -> Option<&'static str> {
    use TokenKind::*;
    let m = match self {
      Op_Caret => "clone",
      Op_Percent => "%",
      Op_Star => "*",
      Op_Slash => "/",
      Op_Plus => "+",
      Op_Minus => "-",
      Op_Shl => "<<",
      Op_Shr => ">>",
      Op_Less => "<",
      Op_LessEqual => "<=",
      Op_More => ">",
      Op_MoreEqual => ">=",
      Op_EqualEqual => "==",
      Op_BangEqual => "!=",
      Op_And => "&",
      Op_Xor => "><",
      Op_Pipe => "|",
      Op_Bang => "!",
      Op_AndAnd => "&&",
      Op_PipePipe => "||",
      _ => return None,
    };
    Some(m)
  }

  pub fn name(&self) -> &'static str {
    use TokenKind::*;
    match self {
      Kw_Fn => "fn",
      Kw_If => "if",
      Kw_Else => "else",
      Kw_While => "while",
      Kw_Break => "break",
      Kw_Continue => "continue",
      Kw_Use => "use",
      Kw_Mut => "mut",
      Brk_CurlyL => "{",
      Brk_CurlyR => "}",
      Brk_ParenL => "(",
      Brk_ParenR => ")",
      Brk_SquareL => "[",
      Brk_SquareR => "]",
      Op_Dot => ".",
      Tok_Comma => ",",
      Tok_Semicolon => ";",
      Op_Equal => "=",
      Lit_Int => "integer",
      Lit_Char => "character",
      Lit_String => "string",
      Lit_Ident => "identifier",
      other => other.message().unwrap_or("<token>"),
    }
  }
}

/// Decode the C-style escape sequences of a char or string literal body.
///
/// `raw` excludes the surrounding quotes. Returns `None` for a truncated
/// escape, which the quote-matching lexer regexes already rule out.
pub fn unescape(raw: &str) -> Option<String> {
  let mut out = String::with_capacity(raw.len());
  let mut chars = raw.chars();
  while let Some(c) = chars.next() {
    if c != '\\' {
      out.push(c);
      continue;
    }
    match chars.next()? {
      'a' => out.push('\x07'),
      'b' => out.push('\x08'),
      'e' => out.push('\x1b'),
      'f' => out.push('\x0c'),
      'n' => out.push('\n'),
      'r' => out.push('\r'),
      't' => out.push('\t'),
      'v' => out.push('\x0b'),
      'x' => {
        let hi = chars.next()?;
        let lo = chars.next()?;
        let byte = u8::from_str_radix(&format!("{hi}{lo}"), 16).ok()?;
        out.push(byte as char);
      }
      other => out.push(other),
    }
  }
  Some(out)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kinds(src: &str) -> Vec<TokenKind> {
    lex(src).unwrap().into_iter().map(|t| t.kind).collect()
  }

  #[test]
  fn operators_and_idents() {
    use TokenKind::*;
    assert_eq!(
      kinds("a = 3 + 4;"),
      vec![Lit_Ident, Op_Equal, Lit_Int, Op_Plus, Lit_Int, Tok_Semicolon]
    );
    assert_eq!(kinds("x >< y"), vec![Lit_Ident, Op_Xor, Lit_Ident]);
    assert_eq!(kinds("i <= 3"), vec![Lit_Ident, Op_LessEqual, Lit_Int]);
    assert_eq!(kinds("P ^ Q"), vec![Lit_Ident, Op_Caret, Lit_Ident]);
  }

  #[test]
  fn keywords() {
    use TokenKind::*;
    assert_eq!(
      kinds("fn f() { break; continue }"),
      vec![
        Kw_Fn,
        Lit_Ident,
        Brk_ParenL,
        Brk_ParenR,
        Brk_CurlyL,
        Kw_Break,
        Tok_Semicolon,
        Kw_Continue,
        Brk_CurlyR
      ]
    );
    // `mutable` is an identifier, not the `mut` keyword
    assert_eq!(kinds("mutable"), vec![Lit_Ident]);
  }

  #[test]
  fn comments_are_skipped() {
    use TokenKind::*;
    assert_eq!(kinds("1 // one\n2 /* two\nlines */ 3"), vec![Lit_Int, Lit_Int, Lit_Int]);
  }

  #[test]
  fn literals() {
    use TokenKind::*;
    assert_eq!(kinds(r#""hi \"there\"" 'x' '\n' '\x41'"#), vec![Lit_String, Lit_Char, Lit_Char, Lit_Char]);
  }

  #[test]
  fn unterminated_string_is_an_error() {
    assert!(lex("\"oops").is_err());
    assert!(lex("'ab'").is_err());
  }

  #[test]
  fn unescape_sequences() {
    assert_eq!(unescape(r"a\nb").unwrap(), "a\nb");
    assert_eq!(unescape(r"\x41").unwrap(), "A");
    assert_eq!(unescape(r"\\").unwrap(), "\\");
    assert_eq!(unescape(r"\q").unwrap(), "q");
  }
}
