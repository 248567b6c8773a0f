//! # Dispatch and Issue Stage Tests
//!
//! Drives single stages of one core directly: the admission order of
//! dispatch and the stall it charges, and the issue rules for register
//! micro-ops, deferred stores and redundant prefetches.

use std::sync::Arc;

use o3sim_core::common::{AccessId, AccessKind, Dep};
use o3sim_core::config::Config;
use o3sim_core::core::cpu::Core;
use o3sim_core::core::pipeline::reg_file::RegFile;
use o3sim_core::core::pipeline::stages::{CycleEnv, dispatch_stage, issue_stage};
use o3sim_core::core::units::fu::{FuClass, FuParams};
use o3sim_core::core::uop::{Opcode, Uinst, Uop, UopHandle};
use o3sim_core::stats::DispatchStall;
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::mocks::{MockMemory, MockModel};

fn core(config: Config) -> Core {
    let mut core = Core::new(0, Arc::new(config), 64);
    core.threads[0].allocate(0, 0x1000, 0);
    core
}

/// Places `uinst` at the tail of thread 0's uop queue, as decode would.
fn decoded(core: &mut Core, uinst: Uinst, id: u64) -> UopHandle {
    let mut uop = Uop::new(uinst, id, 0, 0);
    uop.demand = RegFile::demand(&uop.uinst);
    uop.phy_addr = uop.uinst.address;
    uop.membership.uop_queue = true;
    let handle = core.uops.insert(uop);
    core.threads[0].uop_queue.push_back(handle);
    handle
}

fn add(dst: u8, src: u8) -> Uinst {
    Uinst::new(Opcode::Add)
        .with_idep(Dep::Int(src))
        .with_odep(Dep::Int(dst))
}

fn load(dst: u8, addr: u64) -> Uinst {
    Uinst::new(Opcode::Load)
        .with_idep(Dep::Int(0))
        .with_odep(Dep::Int(dst))
        .with_address(addr, 4)
}

/// Runs `stage` once at cycle `now` against `memory`.
fn run_stage(
    core: &mut Core,
    memory: &mut MockMemory,
    now: u64,
    stage: fn(&mut Core, &mut CycleEnv<'_>),
) {
    let mut model = MockModel::new();
    let mut next_uop_id = 100;
    let mut env = CycleEnv {
        now,
        model: &mut model,
        memory,
        next_uop_id: &mut next_uop_id,
    };
    stage(core, &mut env);
}

#[test]
fn test_dispatch_checks_rob_before_issue_queue() {
    let mut config = Config::default();
    config.queues.rob_size = 1;
    config.queues.iq_size = 1;
    let mut core = core(config);
    let _ = decoded(&mut core, add(1, 0), 0);
    let _ = decoded(&mut core, add(2, 1), 1);

    run_stage(&mut core, &mut MockMemory::new(), 0, dispatch_stage);

    // Both the ROB and the IQ are full; the ROB is named.
    assert_eq!(core.threads[0].uop_queue.len(), 1);
    assert_eq!(core.rob.len(0), 1);
    assert_eq!(core.stats.dispatch.get(DispatchStall::Used), 1);
    assert_eq!(core.stats.dispatch.get(DispatchStall::Rob), 3);
    assert_eq!(core.stats.dispatch.get(DispatchStall::Iq), 0);
}

#[rstest]
#[case::issue_queue(add(2, 1), DispatchStall::Iq)]
#[case::load_store_queue(load(2, 0x40), DispatchStall::Lsq)]
fn test_dispatch_checks_queue_before_rename(#[case] second: Uinst, #[case] stall: DispatchStall) {
    let mut config = Config::default();
    config.queues.iq_size = 1;
    config.queues.lsq_size = 1;
    // One register beyond the architectural mappings.
    config.reg_file.int_size = config.arch.int_regs + 1;
    let mut core = core(config);
    let first = if second.opcode == Opcode::Load {
        load(1, 0x80)
    } else {
        add(1, 0)
    };
    let _ = decoded(&mut core, first, 0);
    let _ = decoded(&mut core, second, 1);

    run_stage(&mut core, &mut MockMemory::new(), 0, dispatch_stage);

    assert_eq!(core.stats.dispatch.get(DispatchStall::Used), 1);
    assert_eq!(core.stats.dispatch.get(stall), 3);
    assert_eq!(core.stats.dispatch.get(DispatchStall::Rename), 0);
}

#[test]
fn test_dispatch_stalls_on_rename_with_room_in_queues() {
    let mut config = Config::default();
    config.reg_file.int_size = config.arch.int_regs + 1;
    let mut core = core(config);
    let _ = decoded(&mut core, add(1, 0), 0);
    let held = decoded(&mut core, add(2, 1), 1);

    run_stage(&mut core, &mut MockMemory::new(), 0, dispatch_stage);

    assert_eq!(core.stats.dispatch.get(DispatchStall::Rename), 3);
    assert_eq!(core.threads[0].uop_queue.front(), Some(&held));
    assert!(core.uops[held].membership.uop_queue);
    assert!(!core.uops[held].membership.rob);
}

#[test]
fn test_dispatch_routes_by_opcode() {
    let mut core = core(Config::default());
    let _ = decoded(&mut core, add(1, 0), 0);
    let _ = decoded(&mut core, load(2, 0x40), 1);
    let _ = decoded(
        &mut core,
        Uinst::new(Opcode::Store)
            .with_idep(Dep::Int(2))
            .with_address(0x80, 4),
        2,
    );
    let _ = decoded(&mut core, Uinst::new(Opcode::Prefetch).with_address(0xc0, 1), 3);

    run_stage(&mut core, &mut MockMemory::new(), 0, dispatch_stage);

    let queues = &core.threads[0].queues;
    assert_eq!(
        [queues.iq.len(), queues.lq.len(), queues.sq.len(), queues.pq.len()],
        [1, 1, 1, 1]
    );
    assert_eq!(core.rob.len(0), 4);
    core.check_integrity();
}

#[test]
fn test_younger_op_issues_past_busy_unit() {
    let mut config = Config::default();
    let _ = config.functional_units.0.insert(
        FuClass::IntMult,
        FuParams {
            count: 1,
            op_lat: 3,
            issue_lat: 3,
        },
    );
    let mut core = core(config);
    let mult = |dst, src| {
        Uinst::new(Opcode::Mult)
            .with_idep(Dep::Int(src))
            .with_odep(Dep::Int(dst))
    };
    let first = decoded(&mut core, mult(1, 0), 0);
    let blocked = decoded(&mut core, mult(3, 2), 1);
    let younger = decoded(&mut core, add(5, 4), 2);
    run_stage(&mut core, &mut MockMemory::new(), 0, dispatch_stage);

    run_stage(&mut core, &mut MockMemory::new(), 1, issue_stage);

    assert!(core.uops[first].issued);
    assert!(!core.uops[blocked].issued);
    assert!(core.uops[younger].issued);
    assert_eq!(core.uops[first].when, 4);
    assert_eq!(core.threads[0].queues.iq.iter().collect::<Vec<_>>(), vec![blocked]);
    assert_eq!(core.fu.stats(FuClass::IntMult).denied, 1);

    // The unit frees up after its issue latency.
    run_stage(&mut core, &mut MockMemory::new(), 4, issue_stage);
    assert!(core.uops[blocked].issued);
    assert!(core.threads[0].queues.iq.is_empty());
}

#[test]
fn test_store_issues_only_after_leaving_rob() {
    let mut core = core(Config::default());
    let store = decoded(
        &mut core,
        Uinst::new(Opcode::Store)
            .with_idep(Dep::Int(1))
            .with_address(0x200, 4),
        0,
    );
    run_stage(&mut core, &mut MockMemory::new(), 0, dispatch_stage);

    // Still in the ROB: the memory port is not even asked.
    run_stage(&mut core, &mut MockMemory::new(), 1, issue_stage);
    assert!(!core.uops[store].issued);
    assert_eq!(core.threads[0].queues.sq.len(), 1);

    let _ = core.rob.remove_head(0);
    core.uops[store].membership.rob = false;

    let mut memory = MockMemory::new();
    let _ = memory
        .expect_can_access()
        .withf(|_, _, kind, addr| *kind == AccessKind::Store && *addr == 0x200)
        .times(1)
        .return_const(true);
    let _ = memory
        .expect_access()
        .times(1)
        .return_const(AccessId(9));
    run_stage(&mut core, &mut memory, 2, issue_stage);

    assert!(core.uops[store].issued);
    assert!(core.threads[0].queues.sq.is_empty());
    assert_eq!(core.mem_inflight, vec![(AccessId(9), store)]);
}

#[test]
fn test_prefetch_of_recent_block_is_dropped() {
    let mut core = core(Config::default());
    let first = decoded(&mut core, Uinst::new(Opcode::Prefetch).with_address(0x1000, 1), 0);
    let same_block = decoded(&mut core, Uinst::new(Opcode::Prefetch).with_address(0x1010, 1), 1);
    run_stage(&mut core, &mut MockMemory::new(), 0, dispatch_stage);

    let mut memory = MockMemory::new();
    let _ = memory
        .expect_can_access()
        .withf(|_, _, kind, addr| *kind == AccessKind::Prefetch && *addr == 0x1000)
        .times(1)
        .return_const(true);
    let _ = memory
        .expect_access()
        .times(1)
        .return_const(AccessId(3));
    run_stage(&mut core, &mut memory, 1, issue_stage);

    assert!(core.threads[0].queues.pq.is_empty());
    assert_eq!(core.mem_inflight, vec![(AccessId(3), first)]);
    let dropped = &core.uops[same_block];
    assert!(dropped.completed);
    assert!(!dropped.membership.pq);
    assert!(dropped.membership.rob);
}
