//! End-to-end scenarios: build a small x86-flavored target description,
//! emit the three tables, and check the emitted text.

use semalift_codegen::emit::emit_semantics;
use semalift_codegen::pattern::{Leaf, PatternNode, TreePattern};
use semalift_codegen::records::{Rec, RecordKind, RecordSet, SdNodeInfo};
use semalift_codegen::target::{InstrInfo, OperandInfo, TargetDesc};
use semalift_codegen::types::ValueType::I32;

/// Builds the record universe and instructions for the test target.
struct TargetBuilder {
    records: RecordSet,
    set_op: Rec,
    gr32: Rec,
    eax: Rec,
    eflags: Rec,
    add: Rec,
    load: Rec,
    add_flag: Rec,
    i32mem: Rec,
    instructions: Vec<InstrInfo>,
    semantics: Vec<(Rec, TreePattern)>,
}

impl TargetBuilder {
    fn new() -> TargetBuilder {
        let mut records = RecordSet::new();
        let set_op = records.def("set", RecordKind::Marker);
        records.def("implicit", RecordKind::Marker);
        let gr32 = records.def("GR32", RecordKind::RegisterClass);
        let eax = records.def("EAX", RecordKind::Register);
        let eflags = records.def("EFLAGS", RecordKind::Register);
        let add = records.def(
            "add",
            RecordKind::SdNode(SdNodeInfo {
                enum_name: "ISD::ADD".to_string(),
                num_results: 1,
            }),
        );
        let load = records.def(
            "load",
            RecordKind::SdNode(SdNodeInfo {
                enum_name: "ISD::LOAD".to_string(),
                num_results: 1,
            }),
        );
        let add_flag = records.def(
            "X86add_flag",
            RecordKind::SdNode(SdNodeInfo {
                enum_name: "X86ISD::ADD".to_string(),
                num_results: 2,
            }),
        );
        let i32mem = records.def("i32mem", RecordKind::Operand);
        TargetBuilder {
            records,
            set_op,
            gr32,
            eax,
            eflags,
            add,
            load,
            add_flag,
            i32mem,
            instructions: Vec::new(),
            semantics: Vec::new(),
        }
    }

    fn rc_operand(&self, name: &str, mi: u32) -> OperandInfo {
        OperandInfo {
            name: name.to_string(),
            mi_operand_no: mi,
            operand_type: "OPERAND_REGISTER".to_string(),
            rec: self.gr32,
        }
    }

    fn mem_operand(&self, name: &str, mi: u32) -> OperandInfo {
        OperandInfo {
            name: name.to_string(),
            mi_operand_no: mi,
            operand_type: "OPERAND_MEMORY".to_string(),
            rec: self.i32mem,
        }
    }

    fn rc_leaf(&self, name: &str) -> PatternNode {
        PatternNode::leaf(Leaf::Def(self.gr32), [I32]).named(name)
    }

    /// `(set GR32:$dst, (<op> GR32:$a, <rhs>))`
    fn set_binary(&self, op: Rec, rhs: PatternNode) -> TreePattern {
        TreePattern::single(PatternNode::op(
            self.set_op,
            vec![
                self.rc_leaf("dst"),
                PatternNode::op(op, vec![self.rc_leaf("a"), rhs], [I32]),
            ],
            [],
        ))
    }

    fn add_instr(
        &mut self,
        name: &str,
        operands: Vec<OperandInfo>,
        pattern: Option<TreePattern>,
    ) -> Rec {
        let def = self.records.def(name, RecordKind::Instruction);
        self.instructions.push(InstrInfo {
            def,
            name: name.to_string(),
            namespace: "X86".to_string(),
            operands,
            is_codegen_only: false,
            pattern,
        });
        def
    }

    fn build(self) -> TargetDesc {
        let mut target = TargetDesc::new("X86", self.records);
        target.add_equiv(self.add_flag, self.add);
        for instr in self.instructions {
            target.add_instruction(instr);
        }
        for (inst, pattern) in self.semantics {
            target.add_semantics(inst, pattern);
        }
        target
    }
}

/// The shared test target:
///
/// | enum | name       | pattern                                            |
/// |------|------------|----------------------------------------------------|
/// | 0    | PHI        | (none)                                             |
/// | 1    | ADD32rr    | (set GR32:$dst, (add GR32:$a, GR32:$b))            |
/// | 2    | ADD32ri    | (set GR32:$dst, (add GR32:$a, 1234))               |
/// | 3    | ADD32ri_V2 | (set GR32:$dst, (add GR32:$a, 1234))               |
/// | 4    | TEST32rr   | (set GR32:$dst, (add GR32:$a, GR32:$a))            |
/// | 5    | LOAD32     | (set EAX, (load GR32:$p))                          |
/// | 6    | ADD32rr_F  | (set GR32:$dst, EFLAGS, (X86add_flag $a, $b))      |
/// | 7    | MOV32rm    | (set GR32:$dst, (load i32mem:$addr))               |
fn build_target() -> TargetDesc {
    let mut b = TargetBuilder::new();

    b.add_instr("PHI", vec![], None);

    let two_src = |b: &TargetBuilder| {
        vec![
            b.rc_operand("dst", 0),
            b.rc_operand("a", 1),
            b.rc_operand("b", 2),
        ]
    };
    let one_src = |b: &TargetBuilder| vec![b.rc_operand("dst", 0), b.rc_operand("a", 1)];

    let add_rr = b.set_binary(b.add, b.rc_leaf("b"));
    b.add_instr("ADD32rr", two_src(&b), Some(add_rr));

    let add_ri = b.set_binary(b.add, PatternNode::leaf(Leaf::Int(1234), [I32]));
    b.add_instr("ADD32ri", one_src(&b), Some(add_ri.clone()));
    b.add_instr("ADD32ri_V2", one_src(&b), Some(add_ri));

    let test_rr = b.set_binary(b.add, b.rc_leaf("a"));
    b.add_instr("TEST32rr", one_src(&b), Some(test_rr));

    let load_eax = TreePattern::single(PatternNode::op(
        b.set_op,
        vec![
            PatternNode::leaf(Leaf::Def(b.eax), [I32]),
            PatternNode::op(b.load, vec![b.rc_leaf("p")], [I32]),
        ],
        [],
    ));
    b.add_instr("LOAD32", vec![b.rc_operand("p", 0)], Some(load_eax));

    let add_rr_f = TreePattern::single(PatternNode::op(
        b.set_op,
        vec![
            b.rc_leaf("dst"),
            PatternNode::leaf(Leaf::Def(b.eflags), [I32]),
            PatternNode::op(b.add_flag, vec![b.rc_leaf("a"), b.rc_leaf("b")], [I32, I32]),
        ],
        [],
    ));
    b.add_instr("ADD32rr_F", two_src(&b), Some(add_rr_f));

    let mov_rm = TreePattern::single(PatternNode::op(
        b.set_op,
        vec![
            b.rc_leaf("dst"),
            PatternNode::op(
                b.load,
                vec![PatternNode::leaf(Leaf::Def(b.i32mem), [I32]).named("addr")],
                [I32],
            ),
        ],
        [],
    ));
    let operands = vec![b.rc_operand("dst", 0), b.mem_operand("addr", 1)];
    b.add_instr("MOV32rm", operands, Some(mov_rm));

    b.build()
}

fn emit(target: &TargetDesc) -> String {
    let mut out = Vec::new();
    emit_semantics(target, &mut out).expect("emission failed");
    String::from_utf8(out).expect("output is UTF-8")
}

/// Extract the text between `start` and the next `end`.
fn section<'a>(output: &'a str, start: &str, end: &str) -> &'a str {
    let begin = output.find(start).expect("section start") + start.len();
    let rest = &output[begin..];
    &rest[..rest.find(end).expect("section end")]
}

/// The semantics stream as one token per word, comments stripped.
fn stream_tokens(output: &str) -> Vec<String> {
    section(output, "const unsigned InstSemantics[] = {", "};")
        .lines()
        .map(|line| line.split("//").next().unwrap())
        .flat_map(|line| line.split(','))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// The per-instruction offsets, in enum order.
fn offsets(output: &str) -> Vec<usize> {
    section(output, "const unsigned OpcodeToSemaIdx[] = {", "};")
        .lines()
        .filter_map(|line| {
            let first = line.split(',').next()?.trim();
            if first.is_empty() {
                None
            } else {
                Some(first.parse().expect("offset entry"))
            }
        })
        .collect()
}

#[test]
fn simple_binary_add_block() {
    let output = emit(&build_target());
    assert!(output.contains(
        "  // ADD32rr\n\
         \x20 DCINS::GET_RC, MVT::i32, 1,\n\
         \x20 DCINS::GET_RC, MVT::i32, 2,\n\
         \x20 ISD::ADD, MVT::i32, 0, 1,\n\
         \x20 DCINS::PUT_RC, MVT::isVoid, 0, 2,\n\
         \x20 DCINS::END_OF_INSTRUCTION,\n"
    ));
}

#[test]
fn immediate_uses_shared_pool_slot() {
    let output = emit(&build_target());

    // Both ADD32ri and ADD32ri_V2 intern 1234; it gets pool index 1.
    let expected = "  // ADD32ri\n\
                    \x20 DCINS::GET_RC, MVT::i32, 1,\n\
                    \x20 DCINS::MOV_CONSTANT, MVT::i32, 1,\n\
                    \x20 ISD::ADD, MVT::i32, 0, 1,\n\
                    \x20 DCINS::PUT_RC, MVT::isVoid, 0, 2,\n\
                    \x20 DCINS::END_OF_INSTRUCTION,\n";
    assert!(output.contains(expected));
    assert!(output.contains(&expected.replace("// ADD32ri", "// ADD32ri_V2")));

    // One shared constant: the array is [sentinel, 1234].
    assert!(output.contains("const uint64_t ConstantArray[] = {\n  0U,\n  1234U,\n};"));
}

#[test]
fn duplicate_named_operand_is_materialized_once() {
    let output = emit(&build_target());
    assert!(output.contains(
        "  // TEST32rr\n\
         \x20 DCINS::GET_RC, MVT::i32, 1,\n\
         \x20 ISD::ADD, MVT::i32, 0, 0,\n\
         \x20 DCINS::PUT_RC, MVT::isVoid, 0, 1,\n\
         \x20 DCINS::END_OF_INSTRUCTION,\n"
    ));
}

#[test]
fn explicit_register_destination() {
    let output = emit(&build_target());
    assert!(output.contains(
        "  // LOAD32\n\
         \x20 DCINS::GET_RC, MVT::i32, 0,\n\
         \x20 ISD::LOAD, MVT::i32, 0,\n\
         \x20 DCINS::PUT_REG, MVT::isVoid, X86::EAX, 1,\n\
         \x20 DCINS::END_OF_INSTRUCTION,\n"
    ));
}

#[test]
fn equivalence_rewrites_to_independent_node() {
    let output = emit(&build_target());
    // X86add_flag loses its EFLAGS result and becomes ISD::ADD; the dropped
    // register surfaces as a trailing IMPLICIT node.
    assert!(output.contains(
        "  // ADD32rr_F\n\
         \x20 DCINS::GET_RC, MVT::i32, 1,\n\
         \x20 DCINS::GET_RC, MVT::i32, 2,\n\
         \x20 ISD::ADD, MVT::i32, 0, 1,\n\
         \x20 DCINS::PUT_RC, MVT::isVoid, 0, 2,\n\
         \x20 DCINS::IMPLICIT, MVT::isVoid, X86::EFLAGS,\n\
         \x20 DCINS::END_OF_INSTRUCTION,\n"
    ));
    assert!(!output.contains("X86ISD::ADD"));
}

#[test]
fn custom_operand_emits_op_type_token() {
    let output = emit(&build_target());
    assert!(output.contains(
        "  // MOV32rm\n\
         \x20 DCINS::CUSTOM_OP, MVT::i32, X86::OpTypes::i32mem, 1,\n\
         \x20 ISD::LOAD, MVT::i32, 0,\n\
         \x20 DCINS::PUT_RC, MVT::isVoid, 0, 1,\n\
         \x20 DCINS::END_OF_INSTRUCTION,\n"
    ));
}

#[test]
fn offset_table_points_at_block_starts() {
    let output = emit(&build_target());
    let tokens = stream_tokens(&output);
    let offsets = offsets(&output);

    assert_eq!(offsets.len(), 8);
    assert_eq!(offsets[0], 0, "PHI has no semantics");
    assert_eq!(tokens[0], "DCINS::END_OF_INSTRUCTION");

    // Every assigned offset lands on the first word of its block: the word
    // before it terminates the previous block.
    for &offset in &offsets[1..] {
        assert_ne!(offset, 0);
        assert_eq!(tokens[offset - 1], "DCINS::END_OF_INSTRUCTION");
    }

    // ADD32rr's block starts right after the leading terminator, with its
    // first GET_RC.
    assert_eq!(offsets[1], 1);
    assert_eq!(tokens[offsets[1]], "DCINS::GET_RC");

    // Blocks are laid out in enum order, so offsets strictly increase.
    for pair in offsets[1..].windows(2) {
        assert!(pair[0] < pair[1]);
    }

    // The stream ends with the last block's terminator.
    assert_eq!(tokens.last().unwrap(), "DCINS::END_OF_INSTRUCTION");
}

#[test]
fn offset_table_entries_carry_instruction_names() {
    let output = emit(&build_target());
    let table = section(&output, "const unsigned OpcodeToSemaIdx[] = {", "};");
    assert!(table.contains("0, \t// PHI"));
    assert!(table.contains(", \t// ADD32rr"));
    assert!(table.contains(", \t// MOV32rm"));
}

#[test]
fn output_is_wrapped_in_target_namespaces() {
    let output = emit(&build_target());
    assert!(output.starts_with("/*===- TableGen'erated file "));
    let llvm_ns = output.find("namespace llvm {").unwrap();
    let target_ns = output.find("namespace X86 {").unwrap();
    let anon_ns = output.find("namespace {").unwrap();
    assert!(llvm_ns < target_ns && target_ns < anon_ns);
    assert!(output.ends_with(
        "} // end anonymous namespace\n\
         } // end namespace X86\n\
         } // end namespace llvm\n"
    ));
}

#[test]
fn emission_is_deterministic() {
    let first = emit(&build_target());
    let second = emit(&build_target());
    assert_eq!(first, second);
}

#[test]
fn explicit_semantics_override_instruction_pattern() {
    let mut b = TargetBuilder::new();
    let operands = vec![
        b.rc_operand("dst", 0),
        b.rc_operand("a", 1),
        b.rc_operand("b", 2),
    ];
    let selection = b.set_binary(b.add, b.rc_leaf("b"));
    let def = b.add_instr("XCHG32", operands, Some(selection));
    // The override ignores $b entirely.
    let override_pattern = b.set_binary(b.add, b.rc_leaf("a"));
    b.semantics.push((def, override_pattern));

    let output = emit(&b.build());
    assert!(output.contains(
        "  // XCHG32\n\
         \x20 DCINS::GET_RC, MVT::i32, 1,\n\
         \x20 ISD::ADD, MVT::i32, 0, 0,\n\
         \x20 DCINS::PUT_RC, MVT::isVoid, 0, 1,\n\
         \x20 DCINS::END_OF_INSTRUCTION,\n"
    ));
}
