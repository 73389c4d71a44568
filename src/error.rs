use std::fmt;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// The closed set of error kinds the toolchain can produce. None of them is
/// recoverable by a running program; they propagate out to the driver, which
/// prints the display form and exits.
#[derive(Debug)]
pub enum Error {
  Lexing(String),
  Parsing(String),
  BytecodeGeneration(String),
  DefaultStore(String),
  FileParsing(String),
  Execution(String),
}

impl Error {
  pub fn generation(message: impl Into<String>) -> Error {
    Error::BytecodeGeneration(message.into())
  }

  pub fn default_store(message: impl Into<String>) -> Error {
    Error::DefaultStore(message.into())
  }

  pub fn file_parsing(message: impl Into<String>) -> Error {
    Error::FileParsing(message.into())
  }

  pub fn execution(message: impl Into<String>) -> Error {
    Error::Execution(message.into())
  }

  pub fn kind(&self) -> &'static str {
    match self {
      Error::Lexing(..) => "LexingError",
      Error::Parsing(..) => "ParsingError",
      Error::BytecodeGeneration(..) => "BytecodeGenerationError",
      Error::DefaultStore(..) => "DefaultStoreError",
      Error::FileParsing(..) => "FileParsingError",
      Error::Execution(..) => "ExecutionError",
    }
  }

  pub fn message(&self) -> &str {
    match self {
      Error::Lexing(m)
      | Error::Parsing(m)
      | Error::BytecodeGeneration(m)
      | Error::DefaultStore(m)
      | Error::FileParsing(m)
      | Error::Execution(m) => m,
    }
  }
}

impl From<syntax::Error> for Error {
  fn from(value: syntax::Error) -> Self {
    match value.kind {
      syntax::ErrorKind::Lexing => Error::Lexing(value.message),
      syntax::ErrorKind::Parsing => Error::Parsing(value.message),
    }
  }
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.kind(), self.message())
  }
}

impl std::error::Error for Error {}
