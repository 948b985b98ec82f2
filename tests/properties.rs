use std::collections::HashMap;

use mips_expr::tokenizer::{render_tokens, tokenize};
use mips_expr::{Instruction, Mnemonic, Operand, Register, compile};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Expr {
  Var(&'static str),
  Lit(i64),
  Bin(char, Box<Expr>, Box<Expr>),
}

impl Expr {
  fn infix(&self) -> String {
    match self {
      Expr::Var(name) => name.to_string(),
      Expr::Lit(value) => value.to_string(),
      Expr::Bin(op, lhs, rhs) => format!("({} {op} {})", lhs.infix(), rhs.infix()),
    }
  }

  fn eval(&self, env: &HashMap<String, i64>) -> i64 {
    match self {
      Expr::Var(name) => env[*name],
      Expr::Lit(value) => *value,
      Expr::Bin(op, lhs, rhs) => {
        let (a, b) = (lhs.eval(env), rhs.eval(env));
        match op {
          '+' => a.wrapping_add(b),
          '-' => a.wrapping_sub(b),
          _ => a.wrapping_mul(b),
        }
      }
    }
  }
}

fn expr() -> impl Strategy<Value = Expr> {
  let leaf = prop_oneof![
    prop::sample::select(vec!["a", "b", "c", "d"]).prop_map(Expr::Var),
    (0i64..100).prop_map(Expr::Lit),
  ];
  // At most four leaves, so at most seven temporaries.
  leaf.prop_recursive(2, 4, 2, |inner| {
    (inner.clone(), prop::sample::select(vec!['+', '-', '*']), inner)
      .prop_map(|(lhs, op, rhs)| Expr::Bin(op, Box::new(lhs), Box::new(rhs)))
  })
}

fn run(program: &[Instruction], env: &HashMap<String, i64>) -> i64 {
  let mut regs: HashMap<Register, i64> = HashMap::new();
  let read = |operand: &Option<Operand>, regs: &HashMap<Register, i64>| match operand {
    Some(Operand::Register(reg)) => regs[reg],
    Some(Operand::Immediate(value)) => *value,
    Some(Operand::Memory(name)) => env[name],
    None => panic!("missing operand"),
  };
  let mut last = 0;
  for instr in program {
    let a = read(&instr.source_a, &regs);
    let value = match instr.mnemonic {
      Mnemonic::Load | Mnemonic::Move => a,
      Mnemonic::Add => a.wrapping_add(read(&instr.source_b, &regs)),
      Mnemonic::Sub => a.wrapping_sub(read(&instr.source_b, &regs)),
      Mnemonic::Mul => a.wrapping_mul(read(&instr.source_b, &regs)),
      other => panic!("unexpected {other} in an assignment-free program"),
    };
    if let Some(Operand::Register(dest)) = &instr.destination {
      regs.insert(*dest, value);
    }
    last = value;
  }
  last
}

proptest! {
  #[test]
  fn compiled_code_matches_direct_evaluation(
    expr in expr(),
    a in -50i64..50,
    b in -50i64..50,
    c in -50i64..50,
    d in -50i64..50,
  ) {
    let env: HashMap<String, i64> = [("a", a), ("b", b), ("c", c), ("d", d)]
      .into_iter()
      .map(|(name, value)| (name.to_string(), value))
      .collect();
    let source = expr.infix();
    let program = compile(&source).unwrap();
    if let Expr::Bin(..) = expr {
      prop_assert_eq!(run(&program, &env), expr.eval(&env), "source: {}", source);
    } else {
      prop_assert!(program.is_empty());
    }
  }

  #[test]
  fn retokenizing_rendered_tokens_is_stable(
    input in proptest::string::string_regex("[a-c0-9_$t =+*/(),-]{0,48}").unwrap()
  ) {
    if let Ok(tokens) = tokenize(&input) {
      let rendered = render_tokens(&tokens);
      let again = tokenize(&rendered).unwrap();
      let lhs: Vec<_> = tokens.into_iter().map(|t| t.kind).collect();
      let rhs: Vec<_> = again.into_iter().map(|t| t.kind).collect();
      prop_assert_eq!(lhs, rhs);
    }
  }

  #[test]
  fn compile_never_panics(input in ".{0,48}") {
    let _ = compile(&input);
  }
}
