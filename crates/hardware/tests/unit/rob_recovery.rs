//! # Recovery Tests
//!
//! Squashing a thread's speculative path must drain the ROB from the tail,
//! undo every rename, return the functional model to the correct path, and
//! leave nothing of the wrong path behind.

use std::sync::Arc;

use o3sim_core::common::{Dep, RegClass};
use o3sim_core::config::Config;
use o3sim_core::core::cpu::Core;
use o3sim_core::core::pipeline::recovery;
use o3sim_core::core::pipeline::reg_file::RegFile;
use o3sim_core::core::pipeline::rob::RobEntry;
use o3sim_core::core::pipeline::stages::CycleEnv;
use o3sim_core::core::uop::{Opcode, Uinst, Uop};
use pretty_assertions::assert_eq;

use crate::common::mocks::{MockMemory, MockModel};

fn core_with_rob(size: usize) -> Core {
    let mut config = Config::default();
    config.queues.rob_size = size;
    Core::new(0, Arc::new(config), 64)
}

/// Renames `uinst` on thread 0 and places it in the ROB.
fn dispatch(core: &mut Core, uinst: Uinst, id: u64, specmode: bool) {
    let mut uop = Uop::new(uinst, id, 0, 0);
    uop.specmode = specmode;
    uop.demand = RegFile::demand(&uop.uinst);
    core.threads[0].reg_file.rename(&mut uop);
    uop.membership.rob = true;
    let handle = core.uops.insert(uop);
    core.rob.enqueue(RobEntry {
        uop: handle,
        thread: 0,
        id,
    });
}

fn snapshot(core: &Core) -> (Vec<usize>, usize) {
    let rf = &core.threads[0].reg_file;
    let mappings = (0..8).map(|i| rf.mapping(Dep::Int(i))).collect();
    (mappings, rf.free_count(RegClass::Int))
}

fn recovering_model(resume: u64) -> MockModel {
    let mut model = MockModel::new();
    let _ = model.expect_in_spec_mode().return_const(true);
    let _ = model.expect_recover().times(1).return_const(());
    let _ = model.expect_next_addr().return_const(resume);
    model
}

#[test]
fn test_full_speculative_rob_drains_completely() {
    let mut core = core_with_rob(4);
    core.threads[0].allocate(0, 0x1000, 0);
    let before = snapshot(&core);

    for i in 0..4u8 {
        dispatch(
            &mut core,
            Uinst::new(Opcode::Add)
                .with_idep(Dep::Int(i))
                .with_odep(Dep::Int(i + 1))
                .with_odep(Dep::Flag(0)),
            u64::from(i),
            true,
        );
    }
    assert!(!core.rob.can_enqueue(0));
    assert_ne!(snapshot(&core), before);

    let mut model = recovering_model(0x2000);
    let mut memory = MockMemory::new();
    let mut next_uop_id = 4;
    let mut env = CycleEnv {
        now: 10,
        model: &mut model,
        memory: &mut memory,
        next_uop_id: &mut next_uop_id,
    };
    recovery::recover(&mut core, &mut env, 0);

    assert!(core.rob.is_empty(0));
    assert!(core.uops.is_empty());
    assert_eq!(snapshot(&core), before);
    core.threads[0].reg_file.check_integrity([]);

    let thread = &core.threads[0];
    assert_eq!(thread.fetch_neip, 0x2000);
    assert_eq!(thread.stats.squashed, 4);
    assert_eq!(thread.stats.recoveries, 1);
}

#[test]
fn test_recovery_keeps_correct_path_prefix() {
    let mut config = Config::default();
    config.general.recover_penalty = 5;
    let mut core = Core::new(0, Arc::new(config), 64);
    core.threads[0].allocate(0, 0x1000, 0);

    dispatch(
        &mut core,
        Uinst::new(Opcode::Add)
            .with_idep(Dep::Int(0))
            .with_odep(Dep::Int(1)),
        0,
        false,
    );
    let after_branch = snapshot(&core);
    for id in 1..3 {
        dispatch(
            &mut core,
            Uinst::new(Opcode::Sub)
                .with_idep(Dep::Int(1))
                .with_odep(Dep::Int(2)),
            id,
            true,
        );
    }

    let mut model = recovering_model(0x1040);
    let mut memory = MockMemory::new();
    let mut next_uop_id = 3;
    let mut env = CycleEnv {
        now: 20,
        model: &mut model,
        memory: &mut memory,
        next_uop_id: &mut next_uop_id,
    };
    recovery::recover(&mut core, &mut env, 0);

    assert_eq!(core.rob.len(0), 1);
    assert_eq!(core.rob.head(0).map(|e| e.id), Some(0));
    assert_eq!(core.uops.len(), 1);
    assert_eq!(snapshot(&core), after_branch);
    assert_eq!(core.threads[0].fetch_resume_at, 25);
}

#[test]
fn test_recovery_clears_speculative_fetch_queue() {
    let mut core = core_with_rob(8);
    core.threads[0].allocate(0, 0x1000, 0);
    for id in 0..3 {
        let mut uop = Uop::new(Uinst::new(Opcode::Nop), id, 0, 0);
        uop.specmode = id > 0;
        uop.mop_size = 2;
        uop.membership.fetch_queue = true;
        let handle = core.uops.insert(uop);
        let thread = &mut core.threads[0];
        thread.fetch_queue.push_back(handle);
        thread.fetch_queue_bytes += 2;
    }

    let mut model = recovering_model(0x1002);
    let mut memory = MockMemory::new();
    let mut next_uop_id = 3;
    let mut env = CycleEnv {
        now: 0,
        model: &mut model,
        memory: &mut memory,
        next_uop_id: &mut next_uop_id,
    };
    recovery::recover(&mut core, &mut env, 0);

    let thread = &core.threads[0];
    assert_eq!(thread.fetch_queue.len(), 1);
    assert_eq!(thread.fetch_queue_bytes, 2);
    assert_eq!(core.uops.len(), 1);
}
