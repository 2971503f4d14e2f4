//! Instruction-semantics table generation for the semalift machine-code
//! lifter.
//!
//! This crate is the code-generator backend that turns a declarative
//! description of a target instruction set (the machine instructions, their
//! operands, the register classes, and the DAG patterns giving each
//! instruction's semantics) into three parallel static tables that together
//! form a compact, self-describing program:
//!
//! | TargetDesc + TreePattern       InstSema              C++ source text
//! |  (parsed target description,    (linear, typed        (InstSemantics[],
//! |   fully type-inferred pattern    node sequence          OpcodeToSemaIdx[],
//! |   trees)                         per instruction)       ConstantArray[])
//! |
//! |            |        [flatten]        |        [emit]        |
//! |            +----------------------->-+--------------------->+
//!
//! At translation time, a downstream interpreter looks up
//! `OpcodeToSemaIdx[opcode]` and executes `InstSemantics[]` from that
//! offset: each node is read as `(opcode, types…, operands…)`, produces one
//! result per non-void type, and later nodes refer to earlier results by
//! dense index. `END_OF_INSTRUCTION` terminates the block. 64-bit literals
//! live out of line in `ConstantArray[]`, referenced by pool index.
//!
//! The records parser and the pattern elaborator that produce the
//! `TargetDesc` snapshot, and the interpreter that consumes the emitted
//! tables, are external to this crate; the `records`, `pattern`, and
//! `target` modules define the boundary types they exchange with the core.

pub mod constants;
pub mod emit;
pub mod flatten;
mod fx;
pub mod pattern;
pub mod records;
pub mod result;
pub mod sema;
pub mod target;
pub mod types;

pub use crate::emit::{emit_semantics, SemanticsEmitter};
pub use crate::flatten::Flattener;
pub use crate::result::{SemaError, SemaResult};
