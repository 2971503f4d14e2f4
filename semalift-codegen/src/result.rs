//! Error types for semantics generation.

use std::io;

use thiserror::Error;

/// A fatal error discovered during semantics generation. Any of these aborts
/// the emission session; partial output must be discarded by the caller.
///
/// The one recoverable condition, a `set` whose output count disagrees with
/// its value child's result count, is not represented here: it is reported
/// through the log facade and skips only the offending instruction.
#[derive(Debug, Error)]
pub enum SemaError {
    /// A tree node's operator is neither `set`, `implicit`, nor an SDNode.
    #[error("unhandled operator `{operator}` in pattern for `{inst}`")]
    UnknownOperator {
        /// The instruction being flattened.
        inst: String,
        /// The operator record's name.
        operator: String,
    },

    /// A named operand's record is neither an `Operand` nor a register
    /// class, after `RegisterOperand` normalization.
    #[error("operand `{operand}` of `{inst}` is neither an Operand nor a RegisterClass")]
    UnknownOperandType {
        /// The instruction being flattened.
        inst: String,
        /// The offending operand or record name.
        operand: String,
    },

    /// A leaf the flattener cannot materialize.
    #[error("unhandled leaf `{leaf}` in pattern for `{inst}`")]
    UnknownLeaf {
        /// The instruction being flattened.
        inst: String,
        /// A rendering of the offending leaf.
        leaf: String,
    },

    /// A `set` output names an operand missing from the instruction's
    /// operand list.
    #[error("`set` output `{name}` not found in the operand list of `{inst}`")]
    MissingNamedOperand {
        /// The instruction being flattened.
        inst: String,
        /// The missing operand name.
        name: String,
    },

    /// A result dropped by a node equivalence is not a leaf node.
    #[error("node equivalence dropped a non-leaf result in pattern for `{inst}`")]
    DroppedNonLeaf {
        /// The instruction being flattened.
        inst: String,
    },

    /// A result dropped by a node equivalence is not a register.
    #[error("node equivalence dropped `{leaf}` in pattern for `{inst}`, which is not a register")]
    DroppedNonRegister {
        /// The instruction being flattened.
        inst: String,
        /// The offending record's name.
        leaf: String,
    },

    /// The output sink failed.
    #[error("failed to write semantics tables: {0}")]
    Io(#[from] io::Error),
}

/// Result alias for semantics generation.
pub type SemaResult<T> = Result<T, SemaError>;
