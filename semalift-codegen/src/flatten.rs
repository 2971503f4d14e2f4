//! The flattener: converts one instruction's DAG pattern into a linear
//! sequence of typed semantics nodes.
//!
//! Flattening is a postfix linearization: operands are materialized before
//! the operations that consume them, and later nodes refer to earlier
//! results through dense per-instruction result indices (def numbers). The
//! flattener also applies node-equivalence rewrites, records the implicit
//! registers those rewrites drop, and uniques named operands so that each is
//! materialized at most once per instruction.

use log::{debug, warn};
use smallvec::{smallvec, SmallVec};

use crate::constants::ConstantPool;
use crate::fx::FxHashMap;
use crate::pattern::{Leaf, PatternNode, TreePattern};
use crate::records::{Rec, RecordKind};
use crate::result::{SemaError, SemaResult};
use crate::sema::{GenericOpcode, InstSema, Opcode, OperandList, SemaNode};
use crate::target::{InstrInfo, OperandInfo, TargetDesc};
use crate::types::ValueType;

/// Per-instruction flattening engine. Create one per instruction and consume
/// it with `flatten_pattern`.
pub struct Flattener<'a> {
    target: &'a TargetDesc,
    inst: &'a InstrInfo,
    pool: &'a mut ConstantPool,

    sema: InstSema,

    /// Next def number; advanced once per non-void result appended.
    cur_def_no: u32,

    /// First def number of each named operand already materialized.
    operand_by_name: FxHashMap<String, u32>,

    /// Registers whose results were dropped by equivalence rewrites, in
    /// first-seen order.
    eliminated_implicit_regs: SmallVec<[Rec; 1]>,
}

impl<'a> Flattener<'a> {
    /// Create a flattener for one instruction of `target`.
    pub fn new(target: &'a TargetDesc, inst: &'a InstrInfo, pool: &'a mut ConstantPool) -> Self {
        Flattener {
            target,
            inst,
            pool,
            sema: InstSema::default(),
            cur_def_no: 0,
            operand_by_name: FxHashMap::default(),
            eliminated_implicit_regs: SmallVec::new(),
        }
    }

    /// Flatten every tree of `pattern`, in order, then finalize the sequence
    /// with one `IMPLICIT` node per equivalence-dropped register.
    pub fn flatten_pattern(mut self, pattern: &TreePattern) -> SemaResult<InstSema> {
        debug!("flattening pattern for {}", self.inst.name);
        for tree in pattern.trees() {
            self.flatten(tree, None)?;
        }

        let dropped = core::mem::take(&mut self.eliminated_implicit_regs);
        for reg in dropped {
            let mut node = SemaNode::generic(GenericOpcode::Implicit);
            node.types.push(ValueType::Void);
            node.operands.push(self.qualified_name(reg));
            self.add_semantics(node);
        }
        Ok(self.sema)
    }

    /// Flatten one node. `parent`, when present, receives one operand token
    /// per result the node defines.
    fn flatten(&mut self, node: &PatternNode, parent: Option<&mut OperandList>) -> SemaResult<()> {
        if let Some(op_info) = self.named_operand(node.name()) {
            return self.flatten_operand(node, parent, op_info);
        }
        if node.is_leaf() {
            return self.flatten_leaf(node, parent);
        }
        let op = node.operator().expect("non-leaf node has an operator");
        match self.target.records().name(op) {
            "set" => {
                assert!(parent.is_none(), "`set` must be at the root of a pattern tree");
                self.flatten_set(node)
            }
            "implicit" => {
                assert!(
                    parent.is_none(),
                    "`implicit` must be at the root of a pattern tree"
                );
                self.flatten_implicit(node)
            }
            name => {
                if self.target.records().sdnode_info(op).is_some() {
                    self.flatten_sdnode(node, parent)
                } else {
                    Err(SemaError::UnknownOperator {
                        inst: self.inst.name.clone(),
                        operator: name.to_string(),
                    })
                }
            }
        }
    }

    /// Materialize a named operand: `GET_RC` for register classes,
    /// `CONSTANT_OP` for immediate operands, `CUSTOM_OP` otherwise. A named
    /// operand is materialized once per instruction; later references reuse
    /// its recorded def number without emitting anything.
    fn flatten_operand(
        &mut self,
        node: &PatternNode,
        parent: Option<&mut OperandList>,
        op_info: &'a OperandInfo,
    ) -> SemaResult<()> {
        if let Some(&def_no) = self.operand_by_name.get(&op_info.name) {
            if let Some(parent) = parent {
                parent.push(def_no.to_string());
            }
            return Ok(());
        }

        let records = self.target.records();
        let rec = records.normalize(op_info.rec);
        let mut ns = match records.kind(rec) {
            RecordKind::Operand => {
                if op_info.operand_type == "OPERAND_IMMEDIATE" {
                    SemaNode::generic(GenericOpcode::ConstantOp)
                } else {
                    let mut ns = SemaNode::generic(GenericOpcode::CustomOp);
                    ns.operands.push(format!(
                        "{}::OpTypes::{}",
                        self.inst.namespace,
                        records.name(rec)
                    ));
                    ns
                }
            }
            RecordKind::RegisterClass => SemaNode::generic(GenericOpcode::GetRc),
            _ => {
                return Err(SemaError::UnknownOperandType {
                    inst: self.inst.name.clone(),
                    operand: op_info.name.clone(),
                })
            }
        };
        ns.types = node_types(node);
        ns.operands.push(op_info.mi_operand_no.to_string());

        self.operand_by_name
            .insert(op_info.name.clone(), self.cur_def_no);
        self.add_node(parent, ns);
        Ok(())
    }

    /// Materialize a leaf: `MOV_CONSTANT` for integer literals (interned in
    /// the constant pool), `GET_REG` for explicit registers.
    fn flatten_leaf(
        &mut self,
        node: &PatternNode,
        parent: Option<&mut OperandList>,
    ) -> SemaResult<()> {
        let leaf = node.leaf_value().expect("flatten_leaf on a non-leaf node");
        let mut ns = match leaf {
            Leaf::Int(value) => {
                let mut ns = SemaNode::generic(GenericOpcode::MovConstant);
                let idx = self.pool.intern(value as u64);
                ns.operands.push(idx.to_string());
                ns
            }
            Leaf::Def(rec) => match self.target.records().kind(rec) {
                RecordKind::Register => {
                    let mut ns = SemaNode::generic(GenericOpcode::GetReg);
                    ns.operands.push(self.qualified_name(rec));
                    ns
                }
                _ => {
                    return Err(SemaError::UnknownLeaf {
                        inst: self.inst.name.clone(),
                        leaf: self.target.records().name(rec).to_string(),
                    })
                }
            },
        };
        ns.types = node_types(node);
        self.add_node(parent, ns);
        Ok(())
    }

    /// Flatten a `set`: the last child computes the values, the leading
    /// children name their destinations (`PUT_RC` for register-class
    /// operands, `PUT_REG` for explicit registers). Destinations beyond what
    /// the (possibly equivalence-rewritten) child defines must be
    /// implicitly-defined registers; they are recorded for finalization.
    fn flatten_set(&mut self, node: &PatternNode) -> SemaResult<()> {
        let num_node_defs = node.num_children() - 1;
        let last = node.child(num_node_defs);
        if num_node_defs != last.num_types() {
            warn!(
                "invalid `set` in pattern for {}: {} output(s), but {} defines {} result(s); \
                 skipping\n  {}",
                self.inst.name,
                num_node_defs,
                last.dump(self.target.records()),
                last.num_types(),
                node.dump(self.target.records()),
            );
            return Ok(());
        }

        // Collect the value child's result tokens into a scratch list; only
        // the def numbers matter here.
        let mut results = OperandList::new();
        self.flatten(last, Some(&mut results))?;

        // The child may define fewer results than the `set` names if an
        // equivalence rewrite dropped some.
        let num_defs = results.len();
        let first_def = self.cur_def_no - num_defs as u32;

        for i in 0..num_defs {
            let child = node.child(i);
            let rec = child.leaf_def().ok_or_else(|| SemaError::UnknownLeaf {
                inst: self.inst.name.clone(),
                leaf: child.dump(self.target.records()),
            })?;
            let rec = self.target.records().normalize(rec);

            let mut ns = match self.target.records().kind(rec) {
                RecordKind::RegisterClass => {
                    let op_info = self.named_operand(child.name()).ok_or_else(|| {
                        SemaError::MissingNamedOperand {
                            inst: self.inst.name.clone(),
                            name: child.name().unwrap_or_default().to_string(),
                        }
                    })?;
                    let mut ns = SemaNode::generic(GenericOpcode::PutRc);
                    ns.operands.push(op_info.mi_operand_no.to_string());
                    ns
                }
                RecordKind::Register => {
                    let mut ns = SemaNode::generic(GenericOpcode::PutReg);
                    ns.operands.push(self.qualified_name(rec));
                    ns
                }
                _ => {
                    return Err(SemaError::UnknownOperandType {
                        inst: self.inst.name.clone(),
                        operand: self.target.records().name(rec).to_string(),
                    })
                }
            };
            ns.types.push(ValueType::Void);
            ns.operands.push((first_def + i as u32).to_string());
            self.add_semantics(ns);
        }

        for i in num_defs..num_node_defs {
            let child = node.child(i);
            let rec = match child.leaf_value() {
                None => {
                    return Err(SemaError::DroppedNonLeaf {
                        inst: self.inst.name.clone(),
                    })
                }
                Some(Leaf::Int(_)) => {
                    // An integer literal is a leaf, just not a register.
                    return Err(SemaError::DroppedNonRegister {
                        inst: self.inst.name.clone(),
                        leaf: child.dump(self.target.records()),
                    })
                }
                Some(Leaf::Def(rec)) => rec,
            };
            match self.target.records().kind(rec) {
                RecordKind::Register => {
                    if !self.eliminated_implicit_regs.contains(&rec) {
                        self.eliminated_implicit_regs.push(rec);
                    }
                }
                _ => {
                    return Err(SemaError::DroppedNonRegister {
                        inst: self.inst.name.clone(),
                        leaf: self.target.records().name(rec).to_string(),
                    })
                }
            }
        }
        Ok(())
    }

    /// Flatten an `implicit`: one node recording every implicitly-defined
    /// register named by the children.
    fn flatten_implicit(&mut self, node: &PatternNode) -> SemaResult<()> {
        let mut ns = SemaNode::generic(GenericOpcode::Implicit);
        ns.types = node_types(node);
        for child in node.children() {
            let rec = child.leaf_def().ok_or_else(|| SemaError::UnknownLeaf {
                inst: self.inst.name.clone(),
                leaf: child.dump(self.target.records()),
            })?;
            ns.operands.push(self.qualified_name(rec));
        }
        self.add_semantics(ns);
        Ok(())
    }

    /// Flatten an SDNode: recursively materialize the children, wiring their
    /// results as operand tokens, then append the operation itself. A node
    /// present in the equivalence relation is rewritten to its
    /// target-independent opcode, with the trailing dropped result types
    /// removed.
    fn flatten_sdnode(
        &mut self,
        node: &PatternNode,
        parent: Option<&mut OperandList>,
    ) -> SemaResult<()> {
        let records = self.target.records();
        let op = node.operator().expect("SDNode pattern node has an operator");
        let info = records
            .sdnode_info(op)
            .expect("flatten_sdnode on a non-SDNode operator");

        let mut ns = SemaNode::new(Opcode::Node(info.enum_name.clone()));
        ns.types = node_types(node);
        if let Some(equiv) = self.target.equiv_target(op) {
            let equiv_info = records
                .sdnode_info(equiv)
                .expect("equivalence target is not an SDNode");
            ns.opcode = Opcode::Node(equiv_info.enum_name.clone());
            debug_assert!(equiv_info.num_results <= node.num_types());
            for _ in 0..node.num_types() - equiv_info.num_results {
                ns.types.pop();
            }
        }
        for child in node.children() {
            self.flatten(child, Some(&mut ns.operands))?;
        }
        self.add_node(parent, ns);
        Ok(())
    }

    /// Look up `name` in the instruction's declared operand list.
    fn named_operand(&self, name: Option<&str>) -> Option<&'a OperandInfo> {
        let name = name?;
        self.inst.operands.iter().find(|op| op.name == name)
    }

    /// Append `node` to the sequence; if `parent` is present, first push one
    /// result token per non-void type, numbered by the def numbers the
    /// results acquire upon append.
    fn add_node(&mut self, parent: Option<&mut OperandList>, node: SemaNode) {
        if let Some(parent) = parent {
            let mut def_no = self.cur_def_no;
            for ty in &node.types {
                if !ty.is_void() {
                    parent.push(def_no.to_string());
                    def_no += 1;
                }
            }
        }
        self.add_semantics(node);
    }

    /// Append `node`, advancing the def counter by the results it defines.
    fn add_semantics(&mut self, node: SemaNode) {
        self.cur_def_no += node.num_defs() as u32;
        self.sema.nodes.push(node);
    }

    fn qualified_name(&self, rec: Rec) -> String {
        format!("{}::{}", self.inst.namespace, self.target.records().name(rec))
    }
}

/// A node's inferred types, or the void sentinel for effect-only nodes.
fn node_types(node: &PatternNode) -> SmallVec<[ValueType; 2]> {
    if node.num_types() == 0 {
        smallvec![ValueType::Void]
    } else {
        node.types().iter().copied().collect()
    }
}
