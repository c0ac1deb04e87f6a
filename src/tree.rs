//! Generic owning binary tree, the raw shape the serialized AST arrives in.
//!
//! Children only mean something relative to their parent's kind; the typed
//! view lives in `ast`. This container knows nothing about either.

use std::io::{self, Write};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node<T> {
  pub value: T,
  pub left: Option<Box<Node<T>>>,
  pub right: Option<Box<Node<T>>>,
}

impl<T> Node<T> {
  pub fn new(value: T, left: Option<Node<T>>, right: Option<Node<T>>) -> Self {
    Self {
      value,
      left: left.map(Box::new),
      right: right.map(Box::new),
    }
  }

  pub fn leaf(value: T) -> Self {
    Self::new(value, None, None)
  }

  pub fn left(&self) -> Option<&Node<T>> {
    self.left.as_deref()
  }

  pub fn right(&self) -> Option<&Node<T>> {
    self.right.as_deref()
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree<T> {
  pub root: Node<T>,
}

impl<T> Tree<T> {
  pub fn new(root: Node<T>) -> Self {
    Self { root }
  }

  /// Write the tree as a Graphviz digraph, one record node per tree node.
  pub fn dump_dot<W, F>(&self, out: &mut W, mut render: F) -> io::Result<()>
  where
    W: Write,
    F: FnMut(&T) -> String,
  {
    writeln!(out, "digraph ast {{")?;
    writeln!(out, "  node [shape=record];")?;
    let mut next_id = 0usize;
    dump_node(&self.root, out, &mut render, &mut next_id)?;
    writeln!(out, "}}")
  }
}

fn dump_node<T, W, F>(node: &Node<T>, out: &mut W, render: &mut F, next_id: &mut usize) -> io::Result<usize>
where
  W: Write,
  F: FnMut(&T) -> String,
{
  let id = *next_id;
  *next_id += 1;
  let label = render(&node.value).replace('"', "\\\"");
  writeln!(out, "  n{id} [label=\"{label}\"];")?;

  for (child, edge) in [(node.left(), "L"), (node.right(), "R")] {
    if let Some(child) = child {
      let child_id = dump_node(child, out, render, next_id)?;
      writeln!(out, "  n{id} -> n{child_id} [label=\"{edge}\"];")?;
    }
  }
  Ok(id)
}
