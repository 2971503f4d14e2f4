//! The target context: an immutable snapshot of the parsed target
//! description, as consumed by the flattener and the emitter.
//!
//! The snapshot is built once by the records-parser boundary and read-only
//! thereafter. All sequences that drive emission (instructions, explicit
//! `Semantics` overrides) preserve declared order so the output is
//! reproducible.

use crate::fx::FxHashMap;
use crate::pattern::TreePattern;
use crate::records::{Rec, RecordSet};

/// One declared operand of a machine instruction.
#[derive(Clone, Debug)]
pub struct OperandInfo {
    /// The `$name` patterns use to refer to this operand.
    pub name: String,
    /// Index of the first machine-instruction operand backing this operand.
    pub mi_operand_no: u32,
    /// The operand-type tag, e.g. `OPERAND_IMMEDIATE` or `OPERAND_MEMORY`.
    pub operand_type: String,
    /// The operand's record: an `Operand`, `RegisterClass`, or
    /// `RegisterOperand`.
    pub rec: Rec,
}

/// One machine instruction, held in enum-value order.
#[derive(Clone, Debug)]
pub struct InstrInfo {
    /// The instruction's defining record.
    pub def: Rec,
    /// The instruction's name.
    pub name: String,
    /// The target namespace qualifying emitted symbols, e.g. `X86`.
    pub namespace: String,
    /// Declared operands, outputs first, in machine-operand order.
    pub operands: Vec<OperandInfo>,
    /// True for pseudo-instructions that never appear in machine code.
    pub is_codegen_only: bool,
    /// The instruction's selection pattern, if it declares one.
    pub pattern: Option<TreePattern>,
}

/// An explicit `Semantics` override: a pattern installed for an instruction
/// independently of the instruction's own selection pattern.
#[derive(Clone, Debug)]
pub struct SemanticsDef {
    /// The instruction record the override applies to.
    pub inst: Rec,
    /// The override pattern.
    pub pattern: TreePattern,
}

/// Immutable snapshot of the target description.
pub struct TargetDesc {
    name: String,
    records: RecordSet,
    instructions: Vec<InstrInfo>,
    instr_by_def: FxHashMap<Rec, usize>,
    equiv: FxHashMap<Rec, Rec>,
    semantics: Vec<SemanticsDef>,
}

impl TargetDesc {
    /// Create an empty description for the named target.
    pub fn new(name: impl Into<String>, records: RecordSet) -> Self {
        TargetDesc {
            name: name.into(),
            records,
            instructions: Vec::new(),
            instr_by_def: FxHashMap::default(),
            equiv: FxHashMap::default(),
            semantics: Vec::new(),
        }
    }

    /// Append an instruction, returning its enum value.
    pub fn add_instruction(&mut self, instr: InstrInfo) -> usize {
        let enum_value = self.instructions.len();
        self.instr_by_def.insert(instr.def, enum_value);
        self.instructions.push(instr);
        enum_value
    }

    /// Record a node equivalence: `specific` is semantically `independent`
    /// stripped of its trailing (flag-like) results.
    pub fn add_equiv(&mut self, specific: Rec, independent: Rec) {
        self.equiv.insert(specific, independent);
    }

    /// Append an explicit `Semantics` override. Overrides are processed in
    /// the order they were added.
    pub fn add_semantics(&mut self, inst: Rec, pattern: TreePattern) {
        self.semantics.push(SemanticsDef { inst, pattern });
    }

    /// The target's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The record universe.
    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    /// The instructions, in enum-value order.
    pub fn instructions(&self) -> &[InstrInfo] {
        &self.instructions
    }

    /// The instruction with the given enum value.
    pub fn instr(&self, enum_value: usize) -> &InstrInfo {
        &self.instructions[enum_value]
    }

    /// The enum value of the instruction defined by `def`, if any.
    pub fn instr_enum_value(&self, def: Rec) -> Option<usize> {
        self.instr_by_def.get(&def).copied()
    }

    /// The target-independent equivalent of a selection-DAG operator, if an
    /// equivalence was declared for it.
    pub fn equiv_target(&self, specific: Rec) -> Option<Rec> {
        self.equiv.get(&specific).copied()
    }

    /// The explicit `Semantics` overrides, in declared order.
    pub fn semantics(&self) -> &[SemanticsDef] {
        &self.semantics
    }
}
