//! Pattern trees: the boundary with the DAG-pattern elaborator.
//!
//! A pattern arrives here fully elaborated: every node carries the value
//! types inferred for its results, and leaves referring to the instruction's
//! declared operands carry their `$name` binding. Trees are acyclic;
//! cross-node sharing is expressed purely through name bindings, which the
//! flattener resolves against the instruction's operand list.

use core::fmt::Write;

use smallvec::SmallVec;

use crate::records::{Rec, RecordSet};
use crate::types::ValueType;

/// The value of a leaf pattern node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Leaf {
    /// A compile-time integer literal.
    Int(i64),
    /// A reference to a defined record (a register, an operand type, …).
    Def(Rec),
}

/// The shape of a pattern node: a leaf, or an operator applied to children.
#[derive(Clone, Debug)]
pub enum PatternNodeKind {
    /// A leaf value.
    Leaf(Leaf),
    /// An operator node.
    Op {
        /// The operator record (`set`, `implicit`, or an SDNode).
        op: Rec,
        /// Child nodes in operand order.
        children: Vec<PatternNode>,
    },
}

/// One node of a fully type-inferred pattern tree.
#[derive(Clone, Debug)]
pub struct PatternNode {
    kind: PatternNodeKind,
    types: SmallVec<[ValueType; 2]>,
    name: Option<String>,
}

impl PatternNode {
    /// Create a leaf node with the given inferred result types.
    pub fn leaf(value: Leaf, types: impl IntoIterator<Item = ValueType>) -> Self {
        PatternNode {
            kind: PatternNodeKind::Leaf(value),
            types: types.into_iter().collect(),
            name: None,
        }
    }

    /// Create an operator node with the given children and inferred types.
    pub fn op(
        op: Rec,
        children: Vec<PatternNode>,
        types: impl IntoIterator<Item = ValueType>,
    ) -> Self {
        PatternNode {
            kind: PatternNodeKind::Op { op, children },
            types: types.into_iter().collect(),
            name: None,
        }
    }

    /// Attach a `$name` binding to this node.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Is this node a leaf?
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, PatternNodeKind::Leaf(_))
    }

    /// The leaf value, if this node is a leaf.
    pub fn leaf_value(&self) -> Option<Leaf> {
        match self.kind {
            PatternNodeKind::Leaf(value) => Some(value),
            PatternNodeKind::Op { .. } => None,
        }
    }

    /// The leaf's record, if this node is a `Def` leaf.
    pub fn leaf_def(&self) -> Option<Rec> {
        match self.kind {
            PatternNodeKind::Leaf(Leaf::Def(rec)) => Some(rec),
            _ => None,
        }
    }

    /// The `$name` binding, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The operator record; `None` for leaves.
    pub fn operator(&self) -> Option<Rec> {
        match self.kind {
            PatternNodeKind::Op { op, .. } => Some(op),
            PatternNodeKind::Leaf(_) => None,
        }
    }

    /// The number of children (zero for leaves).
    pub fn num_children(&self) -> usize {
        self.children().len()
    }

    /// The `i`th child.
    pub fn child(&self, i: usize) -> &PatternNode {
        &self.children()[i]
    }

    /// The children, in operand order.
    pub fn children(&self) -> &[PatternNode] {
        match &self.kind {
            PatternNodeKind::Op { children, .. } => children,
            PatternNodeKind::Leaf(_) => &[],
        }
    }

    /// The number of inferred result types.
    pub fn num_types(&self) -> usize {
        self.types.len()
    }

    /// The inferred result types.
    pub fn types(&self) -> &[ValueType] {
        &self.types
    }

    /// Render this node for diagnostics, with record names resolved.
    pub fn dump(&self, records: &RecordSet) -> String {
        let mut out = String::new();
        self.dump_into(records, &mut out);
        out
    }

    fn dump_into(&self, records: &RecordSet, out: &mut String) {
        match &self.kind {
            PatternNodeKind::Leaf(Leaf::Int(value)) => {
                let _ = write!(out, "{}", value);
            }
            PatternNodeKind::Leaf(Leaf::Def(rec)) => out.push_str(records.name(*rec)),
            PatternNodeKind::Op { op, children } => {
                out.push('(');
                out.push_str(records.name(*op));
                for (i, child) in children.iter().enumerate() {
                    out.push_str(if i == 0 { " " } else { ", " });
                    child.dump_into(records, out);
                }
                out.push(')');
            }
        }
        if let Some(name) = &self.name {
            out.push_str(":$");
            out.push_str(name);
        }
    }
}

/// A pattern as elaborated for one instruction: one or more numbered trees,
/// flattened in order.
#[derive(Clone, Debug)]
pub struct TreePattern {
    trees: Vec<PatternNode>,
}

impl TreePattern {
    /// A pattern with a single tree.
    pub fn single(tree: PatternNode) -> Self {
        TreePattern { trees: vec![tree] }
    }

    /// A pattern with multiple numbered trees.
    pub fn new(trees: Vec<PatternNode>) -> Self {
        TreePattern { trees }
    }

    /// The trees, in declared order.
    pub fn trees(&self) -> &[PatternNode] {
        &self.trees
    }
}
