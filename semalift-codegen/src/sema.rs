//! The output data model: opcode tokens, semantics nodes, and the
//! per-instruction node sequence.

use core::fmt;

use smallvec::SmallVec;

use crate::types::ValueType;

/// The fixed set of generic stream opcodes understood by the downstream
/// interpreter, as opposed to selection-DAG opcodes. Emitted under the
/// `DCINS` namespace.
///
/// Each has a fixed arity schema `(types, operands)` known to the
/// interpreter: `END_OF_INSTRUCTION(0,0)`, `GET_REG(1,1)`, `GET_RC(1,1)`,
/// `PUT_REG(1,2)`, `PUT_RC(1,2)`, `MOV_CONSTANT(1,1)`, `CONSTANT_OP(1,1)`,
/// `CUSTOM_OP(N,2)`, `IMPLICIT(1,1+)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenericOpcode {
    /// Terminates an instruction's block in the stream.
    EndOfInstruction,
    /// Materialize an immediate machine operand.
    ConstantOp,
    /// Materialize an operand through a target-specific callback, keyed by
    /// an `OpTypes` enumerator.
    CustomOp,
    /// Read a register-class operand.
    GetRc,
    /// Read an explicit register.
    GetReg,
    /// Write a value to a register-class operand.
    PutRc,
    /// Write a value to an explicit register.
    PutReg,
    /// Materialize an interned 64-bit constant.
    MovConstant,
    /// Record an implicitly-defined register.
    Implicit,
}

impl GenericOpcode {
    /// The enumerator name emitted into the stream.
    pub fn enum_name(self) -> &'static str {
        match self {
            GenericOpcode::EndOfInstruction => "DCINS::END_OF_INSTRUCTION",
            GenericOpcode::ConstantOp => "DCINS::CONSTANT_OP",
            GenericOpcode::CustomOp => "DCINS::CUSTOM_OP",
            GenericOpcode::GetRc => "DCINS::GET_RC",
            GenericOpcode::GetReg => "DCINS::GET_REG",
            GenericOpcode::PutRc => "DCINS::PUT_RC",
            GenericOpcode::PutReg => "DCINS::PUT_REG",
            GenericOpcode::MovConstant => "DCINS::MOV_CONSTANT",
            GenericOpcode::Implicit => "DCINS::IMPLICIT",
        }
    }
}

/// An opcode token in the semantics stream: one of the generic opcodes, or a
/// selection-DAG operator enumerator such as `ISD::ADD`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Opcode {
    /// A generic stream opcode.
    Generic(GenericOpcode),
    /// A selection-DAG operator enumerator.
    Node(String),
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Generic(op) => f.write_str(op.enum_name()),
            Opcode::Node(name) => f.write_str(name),
        }
    }
}

/// Operand tokens of one semantics node, emitted verbatim: result indices,
/// machine-operand numbers, or qualified symbolic names.
pub type OperandList = SmallVec<[String; 4]>;

/// One operation in an instruction's semantics sequence.
///
/// Every non-void entry in `types` contributes exactly one new result to the
/// instruction's dense result index space, in emission order.
#[derive(Clone, Debug)]
pub struct SemaNode {
    /// The opcode token.
    pub opcode: Opcode,
    /// Result types; `Void` entries produce no result.
    pub types: SmallVec<[ValueType; 2]>,
    /// Operand tokens.
    pub operands: OperandList,
}

impl SemaNode {
    /// A node with the given opcode and no types or operands yet.
    pub fn new(opcode: Opcode) -> Self {
        SemaNode {
            opcode,
            types: SmallVec::new(),
            operands: SmallVec::new(),
        }
    }

    /// Shorthand for a generic-opcode node.
    pub fn generic(op: GenericOpcode) -> Self {
        SemaNode::new(Opcode::Generic(op))
    }

    /// The number of results this node defines (its non-void type count).
    pub fn num_defs(&self) -> usize {
        self.types.iter().filter(|ty| !ty.is_void()).count()
    }

    /// The number of stream words this node occupies.
    pub fn num_words(&self) -> usize {
        1 + self.types.len() + self.operands.len()
    }
}

impl fmt::Display for SemaNode {
    /// One stream line, without indentation: `<Opcode>, <Type…>, <Operand…>,`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        for ty in &self.types {
            write!(f, ", {}", ty)?;
        }
        for operand in &self.operands {
            write!(f, ", {}", operand)?;
        }
        f.write_str(",")
    }
}

/// The complete flattened semantics of one machine instruction: a valid
/// postfix linearization of its pattern.
#[derive(Clone, Debug, Default)]
pub struct InstSema {
    /// The nodes, in emission order.
    pub nodes: Vec<SemaNode>,
}

impl InstSema {
    /// The empty-semantics sentinel installed at slot 0 of the emitter.
    pub fn sentinel() -> Self {
        InstSema {
            nodes: vec![SemaNode::generic(GenericOpcode::EndOfInstruction)],
        }
    }

    /// Does this instruction have no flattened nodes?
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::ValueType::{Void, I32};

    #[test]
    fn display_matches_stream_format() {
        let mut node = SemaNode::generic(GenericOpcode::GetRc);
        node.types.push(I32);
        node.operands.push("1".to_string());
        assert_eq!(node.to_string(), "DCINS::GET_RC, MVT::i32, 1,");

        let mut node = SemaNode::new(Opcode::Node("ISD::ADD".to_string()));
        node.types.push(I32);
        node.operands.push("0".to_string());
        node.operands.push("1".to_string());
        assert_eq!(node.to_string(), "ISD::ADD, MVT::i32, 0, 1,");
    }

    #[test]
    fn num_defs_skips_void() {
        let mut node = SemaNode::generic(GenericOpcode::PutRc);
        node.types.push(Void);
        node.operands.push("0".to_string());
        node.operands.push("2".to_string());
        assert_eq!(node.num_defs(), 0);
        assert_eq!(node.num_words(), 4);
    }

    #[test]
    fn sentinel_is_a_single_terminator() {
        let sentinel = InstSema::sentinel();
        assert_eq!(sentinel.nodes.len(), 1);
        assert_eq!(
            sentinel.nodes[0].to_string(),
            "DCINS::END_OF_INSTRUCTION,"
        );
    }
}
