//! A small interpreter for the target stack machine, used to execute the
//! generated assembly in tests.
//!
//! Semantics assumed by the code generator:
//! - binary instructions pop `a`, then `b`, and push `a op b`;
//! - conditional jumps compare the top value with the one beneath it and pop nothing;
//! - `call` pushes the return address on the operand stack, `ret` pops it;
//! - `out` records the top value without popping it; `in` pushes the next input.

#![allow(dead_code)]

use std::collections::HashMap;

const STEP_LIMIT: usize = 100_000;

#[derive(Debug, Clone, Copy)]
enum Reg {
  Ax,
  Bx,
  Cx,
  Dx,
}

#[derive(Debug, Clone)]
enum Operand {
  Imm(i64),
  Reg(Reg),
  Mem { base: Option<Reg>, offset: i64 },
}

#[derive(Debug, Clone)]
enum Insn {
  Push(Operand),
  Pop(Operand),
  Arith(fn(i64, i64) -> i64),
  Sqrt,
  In,
  Out,
  Jmp(String),
  Jcc(fn(i64, i64) -> bool, String),
  Call(String),
  Ret,
  End,
}

#[derive(Debug, Default)]
pub struct Run {
  pub output: Vec<i64>,
  pub stack: Vec<i64>,
  pub memory: HashMap<i64, i64>,
}

pub fn run(asm: &str, input: &[i64]) -> Result<Run, String> {
  let (program, labels) = assemble(asm)?;
  let mut state = Run::default();
  let mut regs = [0i64; 4];
  let mut input = input.iter().copied();
  let mut pc = 0usize;

  for _ in 0..STEP_LIMIT {
    let insn = program.get(pc).ok_or_else(|| format!("fell off the program at {pc}"))?;
    pc += 1;
    match insn {
      Insn::Push(op) => {
        let value = read(op, &regs, &state.memory)?;
        state.stack.push(value);
      }
      Insn::Pop(op) => {
        let value = pop(&mut state.stack)?;
        match op {
          Operand::Imm(_) => return Err("pop into an immediate".into()),
          Operand::Reg(reg) => regs[*reg as usize] = value,
          Operand::Mem { base, offset } => {
            let addr = base.map_or(0, |reg| regs[reg as usize]) + offset;
            state.memory.insert(addr, value);
          }
        }
      }
      Insn::Arith(f) => {
        let a = pop(&mut state.stack)?;
        let b = pop(&mut state.stack)?;
        state.stack.push(f(a, b));
      }
      Insn::Sqrt => {
        let a = pop(&mut state.stack)?;
        state.stack.push((a as f64).sqrt() as i64);
      }
      Insn::In => {
        let value = input.next().ok_or("input exhausted")?;
        state.stack.push(value);
      }
      Insn::Out => {
        let top = *state.stack.last().ok_or("out on an empty stack")?;
        state.output.push(top);
      }
      Insn::Jmp(label) => pc = target(&labels, label)?,
      Insn::Jcc(cond, label) => {
        let len = state.stack.len();
        if len < 2 {
          return Err(format!("conditional jump to {label} needs two values"));
        }
        if cond(state.stack[len - 1], state.stack[len - 2]) {
          pc = target(&labels, label)?;
        }
      }
      Insn::Call(label) => {
        state.stack.push(pc as i64);
        pc = target(&labels, label)?;
      }
      Insn::Ret => {
        let addr = pop(&mut state.stack)?;
        pc = usize::try_from(addr).map_err(|_| format!("bad return address {addr}"))?;
      }
      Insn::End => return Ok(state),
    }
  }
  Err("step limit exceeded".into())
}

fn pop(stack: &mut Vec<i64>) -> Result<i64, String> {
  stack.pop().ok_or_else(|| "pop on an empty stack".to_string())
}

fn read(op: &Operand, regs: &[i64; 4], memory: &HashMap<i64, i64>) -> Result<i64, String> {
  Ok(match op {
    Operand::Imm(value) => *value,
    Operand::Reg(reg) => regs[*reg as usize],
    Operand::Mem { base, offset } => {
      let addr = base.map_or(0, |reg| regs[reg as usize]) + offset;
      memory.get(&addr).copied().unwrap_or(0)
    }
  })
}

fn target(labels: &HashMap<String, usize>, label: &str) -> Result<usize, String> {
  labels.get(label).copied().ok_or_else(|| format!("unknown label {label}"))
}

fn assemble(asm: &str) -> Result<(Vec<Insn>, HashMap<String, usize>), String> {
  let mut program = Vec::new();
  let mut labels = HashMap::new();

  for line in asm.lines().map(str::trim).filter(|line| !line.is_empty()) {
    if let Some(label) = line.strip_suffix(':') {
      if labels.insert(label.to_string(), program.len()).is_some() {
        return Err(format!("duplicate label {label}"));
      }
      continue;
    }

    let (mnemonic, arg) = match line.split_once(' ') {
      Some((mnemonic, arg)) => (mnemonic, Some(arg.trim())),
      None => (line, None),
    };
    let label = || arg.map(str::to_string).ok_or_else(|| format!("`{line}` needs a label"));
    let insn = match mnemonic {
      "push" => Insn::Push(operand(arg, line)?),
      "pop" => Insn::Pop(operand(arg, line)?),
      "add" => Insn::Arith(|a, b| a + b),
      "sub" => Insn::Arith(|a, b| a - b),
      "mul" => Insn::Arith(|a, b| a * b),
      "div" => Insn::Arith(|a, b| a / b),
      "sqrt" => Insn::Sqrt,
      "in" => Insn::In,
      "out" => Insn::Out,
      "jmp" => Insn::Jmp(label()?),
      "jae" => Insn::Jcc(|top, below| top >= below, label()?),
      "jb" => Insn::Jcc(|top, below| top < below, label()?),
      "ja" => Insn::Jcc(|top, below| top > below, label()?),
      "jbe" => Insn::Jcc(|top, below| top <= below, label()?),
      "je" => Insn::Jcc(|top, below| top == below, label()?),
      "jne" => Insn::Jcc(|top, below| top != below, label()?),
      "call" => Insn::Call(label()?),
      "ret" => Insn::Ret,
      "end" => Insn::End,
      other => return Err(format!("unknown instruction `{other}`")),
    };
    program.push(insn);
  }

  Ok((program, labels))
}

fn operand(arg: Option<&str>, line: &str) -> Result<Operand, String> {
  let arg = arg.ok_or_else(|| format!("`{line}` needs an operand"))?;
  if let Some(inner) = arg.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
    let (base, offset) = match inner.split_once('+') {
      Some((reg, offset)) => (Some(reg), offset),
      None if inner.chars().all(|c| c.is_ascii_digit()) => (None, inner),
      None => (Some(inner), "0"),
    };
    let base = base.map(|name| reg(name, line)).transpose()?;
    let offset = offset.parse().map_err(|_| format!("bad offset in `{line}`"))?;
    return Ok(Operand::Mem { base, offset });
  }
  if let Ok(value) = arg.parse() {
    return Ok(Operand::Imm(value));
  }
  Ok(Operand::Reg(reg(arg, line)?))
}

fn reg(name: &str, line: &str) -> Result<Reg, String> {
  match name {
    "ax" => Ok(Reg::Ax),
    "bx" => Ok(Reg::Bx),
    "cx" => Ok(Reg::Cx),
    "dx" => Ok(Reg::Dx),
    _ => Err(format!("unknown register `{name}` in `{line}`")),
  }
}

/// Wrap function definitions into a `PROGRAM_ROOT` with a `DECLARATION` chain.
pub fn program(functions: &[&str]) -> String {
  let mut chain = String::from("@");
  for func in functions.iter().rev() {
    chain = format!("DECLARATION {{ {chain} }} {{ {func} }}");
  }
  format!("{{ PROGRAM_ROOT {{@}} {{ {chain} }} }}")
}

/// A `FUNCTION` node with the given parameters and statements.
pub fn function(name: &str, params: &[&str], stmts: &[&str]) -> String {
  format!(
    "FUNCTION {{ {} }} {{ {name} {{@}} {{ {} }} }}",
    var_list(params),
    block(stmts)
  )
}

/// A `BLOCK` node holding `stmts` as a left-linked `OP` chain.
pub fn block(stmts: &[&str]) -> String {
  let mut chain = String::from("@");
  for stmt in stmts.iter().rev() {
    chain = format!("OP {{ {chain} }} {{ {stmt} }}");
  }
  format!("BLOCK {{@}} {{ {chain} }}")
}

/// A `VARLIST` chain, nearest element first, closed by an empty terminator.
pub fn var_list(names: &[&str]) -> String {
  let mut chain = String::from("VARLIST {@} {@}");
  for name in names.iter().rev() {
    chain = format!("VARLIST {{ {chain} }} {{ {name} }}");
  }
  chain
}
