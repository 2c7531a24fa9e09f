//! Code blocks.
//!
//! A `CodeBlock` owns a sequence of IR entries (instruction plus source
//! attribute) for one declaration body, invariant, or contract clause.
//! Labels are block-local; splicing one block into another remaps both
//! registers and labels.

use rustc_hash::FxHashMap;

use crate::{Code, Label, Reg, SourceAttr};

/// One instruction with its source attribute.
#[derive(Clone, PartialEq, Debug)]
pub struct Entry {
    pub code: Code,
    pub attr: SourceAttr,
}

/// A sequence of IR entries.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct CodeBlock {
    entries: Vec<Entry>,
    /// Number of input registers (parameters), occupying registers
    /// `0..num_inputs`.
    num_inputs: u32,
    /// Next block-local label id.
    next_label: u32,
}

impl CodeBlock {
    pub fn new(num_inputs: u32) -> Self {
        CodeBlock {
            entries: Vec::new(),
            num_inputs,
            next_label: 0,
        }
    }

    #[inline]
    pub fn num_inputs(&self) -> u32 {
        self.num_inputs
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize) -> &Entry {
        &self.entries[i]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    /// Append an instruction.
    pub fn append(&mut self, code: Code, attr: SourceAttr) {
        self.entries.push(Entry { code, attr });
    }

    /// Insert an instruction at a remembered position.
    ///
    /// Used by switch and try-catch lowering, which only know the dispatch
    /// instruction's full shape after emitting every case body.
    pub fn insert(&mut self, index: usize, code: Code, attr: SourceAttr) {
        self.entries.insert(index, Entry { code, attr });
    }

    /// Allocate a fresh block-local label.
    pub fn fresh_label(&mut self) -> Label {
        let l = Label::from_raw(self.next_label);
        self.next_label += 1;
        l
    }

    /// Number of register slots this block uses: one past the highest
    /// register mentioned by any instruction, and at least `num_inputs`.
    pub fn num_slots(&self) -> u32 {
        let mut max: u32 = self.num_inputs;
        for entry in &self.entries {
            entry.code.for_each_reg(&mut |r: Reg| {
                if !r.is_null() {
                    max = max.max(r.raw() + 1);
                }
            });
        }
        max
    }

    /// Splice another block's entries onto the end of this one.
    ///
    /// Registers in `other` are rewritten through `binding` where bound;
    /// unbound registers are shifted past this block's current frame so the
    /// spliced code cannot clobber live values. Labels are re-allocated
    /// from this block's counter. All imported entries take `attr`, the
    /// source attribute of the instruction that motivated the splice.
    pub fn import_external(
        &mut self,
        other: &CodeBlock,
        binding: &FxHashMap<u32, u32>,
        attr: SourceAttr,
    ) {
        let free_slot = self.num_slots();
        let mut label_map: FxHashMap<Label, Label> = FxHashMap::default();
        // Pre-allocate a fresh label for every label id the other block
        // could have produced, definition or target.
        let mut map_label = |this: &mut CodeBlock, l: Label| -> Label {
            *label_map
                .entry(l)
                .or_insert_with(|| this.fresh_label())
        };

        for entry in &other.entries {
            let mut code = entry.code.clone();
            code.remap_regs(&mut |r: Reg| match binding.get(&r.raw()) {
                Some(&mapped) => Reg::from_raw(mapped),
                None => Reg::from_raw(free_slot + r.raw()),
            });
            code.remap_labels(&mut |l: Label| map_label(self, l));
            self.entries.push(Entry { code, attr });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Comparator, Constant, TypeId};

    fn attr() -> SourceAttr {
        SourceAttr::SYNTHETIC
    }

    #[test]
    fn num_slots_counts_past_highest_register() {
        let mut blk = CodeBlock::new(2);
        assert_eq!(blk.num_slots(), 2);
        blk.append(
            Code::Const {
                target: Reg::from_raw(5),
                value: Constant::Int(1),
            },
            attr(),
        );
        assert_eq!(blk.num_slots(), 6);
    }

    #[test]
    fn insert_places_before_bodies() {
        let mut blk = CodeBlock::new(0);
        blk.append(Code::Nop, attr());
        blk.append(Code::ret(), attr());
        blk.insert(1, Code::Goto(Label::from_raw(0)), attr());
        assert!(matches!(blk.get(0).code, Code::Nop));
        assert!(matches!(blk.get(1).code, Code::Goto(_)));
        assert!(matches!(blk.get(2).code, Code::Return { .. }));
    }

    #[test]
    fn import_remaps_bound_and_unbound_registers() {
        // Callee contract block: params at %0/%1, temp at %2.
        let mut contract = CodeBlock::new(2);
        contract.append(
            Code::Const {
                target: Reg::from_raw(2),
                value: Constant::Int(0),
            },
            attr(),
        );
        contract.append(
            Code::Assert {
                ty: TypeId::INT,
                lhs: Reg::from_raw(0),
                rhs: Reg::from_raw(2),
                op: Comparator::GtEq,
                msg: "precondition not satisfied".to_owned(),
            },
            attr(),
        );

        // Caller frame uses registers 0..4; operands are %3 and %1.
        let mut caller = CodeBlock::new(4);
        let binding: FxHashMap<u32, u32> = [(0, 3), (1, 1)].into_iter().collect();
        caller.import_external(&contract, &binding, attr());

        match &caller.get(0).code {
            Code::Const { target, .. } => assert_eq!(target.raw(), 4 + 2),
            other => panic!("unexpected {other:?}"),
        }
        match &caller.get(1).code {
            Code::Assert { lhs, rhs, .. } => {
                assert_eq!(lhs.raw(), 3);
                assert_eq!(rhs.raw(), 4 + 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn import_remaps_labels_freshly() {
        let mut inner = CodeBlock::new(0);
        let l = inner.fresh_label();
        inner.append(Code::Goto(l), attr());
        inner.append(Code::Label(l), attr());

        let mut outer = CodeBlock::new(0);
        // Take a label in the outer block first so ids would collide
        // without remapping.
        let outer_l = outer.fresh_label();
        outer.append(Code::Label(outer_l), attr());
        outer.import_external(&inner, &FxHashMap::default(), attr());

        let Code::Goto(imported) = outer.get(1).code else {
            panic!("expected goto");
        };
        assert_ne!(imported, outer_l);
        assert_eq!(outer.get(2).code, Code::Label(imported));
    }
}
