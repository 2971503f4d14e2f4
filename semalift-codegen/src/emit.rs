//! The emitter: drives the flattener over every instruction of a target and
//! writes the three semantics tables as C++ source text.
//!
//! The tables are linked into the downstream translator by name, inside
//! `llvm::<Target>::(anonymous)`:
//!
//! - `InstSemantics[]`: the semantics stream. Offset 0 holds a lone
//!   `END_OF_INSTRUCTION`; each instruction with semantics occupies one
//!   block of `(opcode, types…, operands…)` words terminated by
//!   `END_OF_INSTRUCTION`.
//! - `OpcodeToSemaIdx[]`: one entry per instruction enum value, the starting
//!   offset of its block, or 0 for instructions without semantics.
//! - `ConstantArray[]`: the interned 64-bit constants; slot 0 is a reserved
//!   zero sentinel.

use std::io::{self, Write};

use log::debug;

use crate::constants::ConstantPool;
use crate::flatten::Flattener;
use crate::result::SemaResult;
use crate::sema::{GenericOpcode, InstSema};
use crate::target::TargetDesc;

/// Write the generated-file banner. Every line is 80 columns.
fn emit_source_file_header(desc: &str, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "/*===- TableGen'erated file -------------------------------------*- C++ -*-===*\\"
    )?;
    writeln!(w, "{}", banner_line(""))?;
    writeln!(w, "{}", banner_line(desc))?;
    writeln!(w, "{}", banner_line(""))?;
    writeln!(w, "{}", banner_line("Automatically generated file, do not edit!"))?;
    writeln!(w, "{}", banner_line(""))?;
    writeln!(
        w,
        "\\*===----------------------------------------------------------------------===*/"
    )?;
    writeln!(w)
}

fn banner_line(text: &str) -> String {
    format!("|* {:<75}*|", text)
}

/// Convenience entry point: flatten all of `target`'s semantics and write
/// the tables to `w`.
pub fn emit_semantics(target: &TargetDesc, w: &mut dyn Write) -> SemaResult<()> {
    SemanticsEmitter::new(target)?.run(w)?;
    Ok(())
}

/// Global driver: flattens every instruction of a target and emits the
/// semantics stream, the per-opcode offset table, and the constant pool.
pub struct SemanticsEmitter<'a> {
    target: &'a TargetDesc,
    pool: ConstantPool,
    inst_semas: Vec<InstSema>,

    /// Per instruction enum value: index into `inst_semas`, rewritten to the
    /// instruction's stream offset during emission. Zero means unassigned;
    /// `inst_semas[0]` is the empty sentinel.
    inst_idx: Vec<u32>,
}

impl<'a> SemanticsEmitter<'a> {
    /// Flatten all of `target`'s semantics. Explicit `Semantics` overrides
    /// are installed first; instructions still unassigned fall back to their
    /// own selection pattern, unless marked code-gen-only.
    pub fn new(target: &'a TargetDesc) -> SemaResult<Self> {
        let mut emitter = SemanticsEmitter {
            target,
            pool: ConstantPool::new(),
            inst_semas: vec![InstSema::sentinel()],
            inst_idx: vec![0; target.instructions().len()],
        };
        emitter.parse_semantics()?;
        emitter.parse_patterns()?;
        Ok(emitter)
    }

    /// Install semantics for the instruction with the given enum value.
    fn install(&mut self, enum_value: usize, sema: InstSema) {
        self.inst_idx[enum_value] = self.inst_semas.len() as u32;
        self.inst_semas.push(sema);
    }

    /// Phase one: explicit `Semantics` overrides, in declared order.
    fn parse_semantics(&mut self) -> SemaResult<()> {
        for def in self.target.semantics() {
            let enum_value = self
                .target
                .instr_enum_value(def.inst)
                .expect("Semantics record names an unknown instruction");
            let instr = self.target.instr(enum_value);
            debug!("explicit semantics for {}", instr.name);
            let sema = Flattener::new(self.target, instr, &mut self.pool)
                .flatten_pattern(&def.pattern)?;
            self.install(enum_value, sema);
        }
        Ok(())
    }

    /// Phase two: fall back to the instructions' own selection patterns.
    fn parse_patterns(&mut self) -> SemaResult<()> {
        for enum_value in 0..self.target.instructions().len() {
            if self.inst_idx[enum_value] != 0 {
                continue;
            }
            let instr = self.target.instr(enum_value);
            if instr.is_codegen_only {
                continue;
            }
            let pattern = match &instr.pattern {
                Some(pattern) => pattern,
                None => continue,
            };
            debug!("pattern semantics for {}", instr.name);
            let sema =
                Flattener::new(self.target, instr, &mut self.pool).flatten_pattern(pattern)?;
            self.install(enum_value, sema);
        }
        Ok(())
    }

    /// Write the three tables. Consumes the emitter: offset assignment
    /// rewrites the per-instruction index table in place.
    pub fn run(mut self, w: &mut dyn Write) -> io::Result<()> {
        emit_source_file_header("Target Instruction Semantics", w)?;

        writeln!(w, "namespace llvm {{")?;
        writeln!(w, "namespace {} {{", self.target.name())?;
        writeln!(w, "namespace {{")?;
        writeln!(w)?;

        writeln!(w, "const unsigned InstSemantics[] = {{")?;
        writeln!(w, "  {},", GenericOpcode::EndOfInstruction.enum_name())?;
        let mut offset: u32 = 1;
        for enum_value in 0..self.inst_idx.len() {
            if self.inst_idx[enum_value] == 0 {
                continue;
            }
            let sema = &self.inst_semas[self.inst_idx[enum_value] as usize];
            self.inst_idx[enum_value] = offset;
            offset += 1; // the block's trailing terminator
            writeln!(w, "  // {}", self.target.instr(enum_value).name)?;
            for node in &sema.nodes {
                offset += node.num_words() as u32;
                writeln!(w, "  {}", node)?;
            }
            writeln!(w, "  {},", GenericOpcode::EndOfInstruction.enum_name())?;
        }
        writeln!(w, "}};")?;
        writeln!(w)?;

        writeln!(w, "const unsigned OpcodeToSemaIdx[] = {{")?;
        for (enum_value, idx) in self.inst_idx.iter().enumerate() {
            writeln!(w, "{}, \t// {}", idx, self.target.instr(enum_value).name)?;
        }
        writeln!(w, "}};")?;
        writeln!(w)?;

        writeln!(w, "const uint64_t ConstantArray[] = {{")?;
        for value in self.pool.values() {
            writeln!(w, "  {}U,", value)?;
        }
        writeln!(w, "}};")?;
        writeln!(w)?;

        writeln!(w, "}} // end anonymous namespace")?;
        writeln!(w, "}} // end namespace {}", self.target.name())?;
        writeln!(w, "}} // end namespace llvm")?;
        Ok(())
    }
}
