//! # Register File Tests
//!
//! Rename, writeback, commit and undo against the reference-counted
//! physical register pools, including the conservation laws that must hold
//! after any sequence of operations.

use o3sim_core::common::{ArchLayout, Dep, RegClass};
use o3sim_core::core::pipeline::reg_file::RegFile;
use o3sim_core::core::uop::{Opcode, Uinst, Uop};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn four_int_layout() -> ArchLayout {
    ArchLayout {
        int_regs: 4,
        flag_regs: 0,
        fp_stack_depth: 8,
        xmm_regs: 8,
    }
}

fn renamed(rf: &mut RegFile, uinst: Uinst, id: u64, specmode: bool) -> Uop {
    let mut uop = Uop::new(uinst, id, 0, 0);
    uop.specmode = specmode;
    uop.demand = RegFile::demand(&uop.uinst);
    rf.rename(&mut uop);
    uop
}

fn int_mappings(rf: &RegFile, count: u8) -> Vec<usize> {
    (0..count).map(|i| rf.mapping(Dep::Int(i))).collect()
}

fn int_busy(rf: &RegFile) -> Vec<u32> {
    (0..rf.size(RegClass::Int))
        .map(|reg| rf.phys(RegClass::Int, reg).busy)
        .collect()
}

#[test]
fn test_eight_register_rename_writeback_commit() {
    let mut rf = RegFile::new(four_int_layout(), [8, 16, 16]);
    assert_eq!(rf.free_count(RegClass::Int), 4);
    for i in 0..4 {
        let reg = rf.mapping(Dep::Int(i));
        assert_eq!(rf.phys(RegClass::Int, reg).busy, 1);
    }

    let old = rf.mapping(Dep::Int(1));
    let uop = renamed(
        &mut rf,
        Uinst::new(Opcode::Add)
            .with_idep(Dep::Int(0))
            .with_odep(Dep::Int(1)),
        0,
        false,
    );
    let new = rf.mapping(Dep::Int(1));
    assert_ne!(new, old);
    assert_eq!(rf.free_count(RegClass::Int), 3);
    assert_eq!(rf.phys(RegClass::Int, new).busy, 1);
    assert!(rf.phys(RegClass::Int, new).pending);
    assert_eq!(rf.phys(RegClass::Int, old).busy, 1);
    rf.check_integrity([&uop]);

    rf.write(&uop);
    assert!(!rf.phys(RegClass::Int, new).pending);

    rf.commit(&uop);
    assert_eq!(rf.phys(RegClass::Int, old).busy, 0);
    assert!(rf.is_free(RegClass::Int, old));
    assert_eq!(rf.free_count(RegClass::Int), 4);
    assert_eq!(rf.mapping(Dep::Int(1)), new);
    rf.check_integrity([]);
}

#[test]
fn test_readiness_follows_producer_writeback() {
    let mut rf = RegFile::new(four_int_layout(), [12, 16, 16]);
    let producer = renamed(
        &mut rf,
        Uinst::new(Opcode::Mult).with_odep(Dep::Int(2)),
        0,
        false,
    );
    let consumer = renamed(
        &mut rf,
        Uinst::new(Opcode::Add)
            .with_idep(Dep::Int(2))
            .with_odep(Dep::Int(3)),
        1,
        false,
    );
    assert!(!rf.is_ready(&consumer));
    rf.write(&producer);
    assert!(rf.is_ready(&consumer));
    // Readiness never regresses once reached.
    rf.write(&consumer);
    assert!(rf.is_ready(&consumer));
}

#[test]
#[should_panic(expected = "commit of speculative uop")]
fn test_commit_rejects_speculative_uop() {
    let mut rf = RegFile::new(four_int_layout(), [8, 16, 16]);
    let uop = renamed(
        &mut rf,
        Uinst::new(Opcode::Add)
            .with_idep(Dep::Int(0))
            .with_odep(Dep::Int(1)),
        0,
        true,
    );
    rf.write(&uop);
    rf.commit(&uop);
}

#[test]
fn test_flag_output_shares_integer_register() {
    let mut rf = RegFile::new(ArchLayout::default(), [40, 16, 16]);
    let uop = renamed(
        &mut rf,
        Uinst::new(Opcode::Sub)
            .with_idep(Dep::Int(0))
            .with_odep(Dep::Int(0))
            .with_odep(Dep::Flag(0))
            .with_odep(Dep::Flag(1)),
        0,
        true,
    );
    let host = rf.mapping(Dep::Int(0));
    assert_eq!(rf.mapping(Dep::Flag(0)), host);
    assert_eq!(rf.mapping(Dep::Flag(1)), host);
    assert_eq!(rf.phys(RegClass::Int, host).busy, 3);
    rf.check_integrity([&uop]);
}

#[derive(Clone, Debug)]
struct Op {
    inputs: Vec<u8>,
    outputs: Vec<u8>,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    (
        prop::collection::vec(0u8..4, 0..=3),
        prop::collection::vec(0u8..4, 0..=2),
    )
        .prop_map(|(inputs, outputs)| Op { inputs, outputs })
}

fn uinst_of(op: &Op) -> Uinst {
    let mut uinst = Uinst::new(Opcode::Add);
    for &i in &op.inputs {
        uinst = uinst.with_idep(Dep::Int(i));
    }
    for &o in &op.outputs {
        uinst = uinst.with_odep(Dep::Int(o));
    }
    uinst
}

proptest! {
    #[test]
    fn prop_rename_then_undo_restores_state(ops in prop::collection::vec(op_strategy(), 1..6)) {
        let mut rf = RegFile::new(four_int_layout(), [32, 16, 16]);
        let mappings = int_mappings(&rf, 4);
        let busy = int_busy(&rf);
        let free = rf.free_count(RegClass::Int);

        let uops: Vec<Uop> = ops
            .iter()
            .enumerate()
            .map(|(i, op)| renamed(&mut rf, uinst_of(op), i as u64, true))
            .collect();
        rf.check_integrity(uops.iter());

        for uop in uops.iter().rev() {
            rf.write(uop);
            rf.undo(uop);
        }
        prop_assert_eq!(int_mappings(&rf, 4), mappings);
        prop_assert_eq!(int_busy(&rf), busy);
        prop_assert_eq!(rf.free_count(RegClass::Int), free);
        rf.check_integrity([]);
    }

    #[test]
    fn prop_rename_writeback_commit_keeps_new_mappings(ops in prop::collection::vec(op_strategy(), 1..6)) {
        let mut rf = RegFile::new(four_int_layout(), [32, 16, 16]);
        let free = rf.free_count(RegClass::Int);

        let uops: Vec<Uop> = ops
            .iter()
            .enumerate()
            .map(|(i, op)| renamed(&mut rf, uinst_of(op), i as u64, false))
            .collect();
        let mappings = int_mappings(&rf, 4);

        for uop in &uops {
            rf.write(uop);
        }
        for uop in &uops {
            rf.commit(uop);
        }
        prop_assert_eq!(int_mappings(&rf, 4), mappings);
        // Only the architectural state stays allocated.
        prop_assert_eq!(rf.free_count(RegClass::Int), free);
        for reg in int_mappings(&rf, 4) {
            prop_assert_eq!(rf.phys(RegClass::Int, reg).busy, 1);
        }
        rf.check_integrity([]);
    }
}
