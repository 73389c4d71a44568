use std::path::PathBuf;

use super::common::*;

use crate::emit::Generator;
use crate::vm::Vm;

#[test]
fn use_splices_another_file() {
  // `use` names resolve against the search path as `<name>.stamp`
  let name = format!("stampuse{}", std::process::id());
  let path = std::env::temp_dir().join(format!("{name}.stamp"));
  std::fs::write(&path, "u = 40 + 2;").unwrap();

  let ast = syntax::parse(&format!("use {name}; w = u + 0;")).unwrap();
  let mut generator = Generator::new(vec![std::env::temp_dir()]);
  generator.generate(&ast).unwrap();
  let _ = std::fs::remove_file(&path);

  let mut vm = Vm::new();
  vm.run(&generator).unwrap();
  assert_eq!(int_binding(&mut vm, "u"), 42);
  assert_eq!(int_binding(&mut vm, "w"), 42);
}

#[test]
fn a_missing_use_target_is_a_parsing_error() {
  let ast = syntax::parse("use nonesuchmodule;").unwrap();
  let mut generator = Generator::new(vec![PathBuf::from(".")]);
  let err = generator.generate(&ast).unwrap_err();
  assert!(matches!(err, crate::Error::Parsing(..)));
}
