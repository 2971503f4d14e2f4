//! The record-classification boundary.
//!
//! The declarative-records parser (out of scope for this crate) produces a
//! universe of records with a deep class hierarchy: `Operand`,
//! `RegisterOperand`, `RegisterClass`, `Register`, `SDNode`, and so on. This
//! module reduces that hierarchy to a flat classification the flattener can
//! switch on: each record is a name plus a `RecordKind` tag, referenced by a
//! dense `Rec` entity index into a `RecordSet`.

use cranelift_entity::{entity_impl, PrimaryMap};

/// A compact reference to a record in a `RecordSet`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rec(u32);
entity_impl!(Rec, "rec");

/// Selection-DAG operator metadata attached to an `SdNode` record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SdNodeInfo {
    /// The opcode enumerator emitted for this operator, e.g. `ISD::ADD`.
    pub enum_name: String,
    /// The number of results the operator declares.
    pub num_results: usize,
}

/// Classification of a record, reduced from the source class hierarchy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordKind {
    /// An immediate or custom operand type.
    Operand,
    /// A register-class-typed operand wrapper; treated as the class it wraps.
    RegisterOperand {
        /// The wrapped register class.
        reg_class: Rec,
    },
    /// A class of allocatable registers.
    RegisterClass,
    /// A single named register.
    Register,
    /// A selection-DAG operator.
    SdNode(SdNodeInfo),
    /// A machine-instruction definition.
    Instruction,
    /// A bare marker def dispatched by name (`set`, `implicit`).
    Marker,
}

/// A record: its declared name and its classification.
#[derive(Clone, Debug)]
pub struct Record {
    /// The record's name as declared in the target description.
    pub name: String,
    /// The record's classification.
    pub kind: RecordKind,
}

/// The set of records backing one target description.
#[derive(Default)]
pub struct RecordSet {
    records: PrimaryMap<Rec, Record>,
}

impl RecordSet {
    /// Create an empty record set.
    pub fn new() -> Self {
        RecordSet {
            records: PrimaryMap::new(),
        }
    }

    /// Define a record, returning its reference.
    pub fn def(&mut self, name: impl Into<String>, kind: RecordKind) -> Rec {
        self.records.push(Record {
            name: name.into(),
            kind,
        })
    }

    /// The record's declared name.
    pub fn name(&self, rec: Rec) -> &str {
        &self.records[rec].name
    }

    /// The record's classification.
    pub fn kind(&self, rec: Rec) -> &RecordKind {
        &self.records[rec].kind
    }

    /// Resolve a `RegisterOperand` to the register class it wraps; any other
    /// record resolves to itself.
    pub fn normalize(&self, rec: Rec) -> Rec {
        match self.records[rec].kind {
            RecordKind::RegisterOperand { reg_class } => reg_class,
            _ => rec,
        }
    }

    /// Selection-DAG operator metadata, if `rec` is an `SdNode`.
    pub fn sdnode_info(&self, rec: Rec) -> Option<&SdNodeInfo> {
        match &self.records[rec].kind {
            RecordKind::SdNode(info) => Some(info),
            _ => None,
        }
    }
}
