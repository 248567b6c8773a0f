//! # End-to-End Simulation Tests
//!
//! Complete runs of trace workloads through the timing core, checking how
//! runs finish and the counters they leave behind.

use o3sim_core::Simulator;
use o3sim_core::common::{AccessId, SimError};
use o3sim_core::config::{BranchPredictorKind, RecoverKind, Sharing, SharingPolicy};
use o3sim_core::sim::FinishReason;
use o3sim_core::sim::trace::{ContextTrace, TraceWorkload};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::builder::{TraceBuilder, workload};
use crate::common::harness::{init_tracing, simulator, small_config};
use crate::common::mocks::MockMemory;

/// Straight-line arithmetic with a dependency chain.
fn straight_line(id: usize, start: u64, n: usize) -> ContextTrace {
    let mut builder = TraceBuilder::new(id, start);
    for i in 0..n {
        builder = builder.add((i % 4) as u8, ((i + 1) % 4) as u8);
    }
    builder.build()
}

/// A loop body executed `iterations` times, closed by a backward jump.
fn looped(id: usize, iterations: usize) -> ContextTrace {
    let mut builder = TraceBuilder::new(id, 0x4000);
    for _ in 0..iterations {
        builder = builder.add(0, 1).add(1, 2).jump(0x4000);
    }
    builder.add(2, 3).build()
}

#[test]
fn test_straight_line_trace_commits_everything() {
    let mut sim = simulator(small_config(1), workload(vec![straight_line(0, 0x1000, 40)]));
    let report = sim.run().unwrap();

    assert_eq!(sim.finished(), Some(FinishReason::ContextsFinished));
    assert_eq!(report.finish_reason, "ContextsFinished");
    assert_eq!(report.committed_macros, 40);
    assert_eq!(report.committed_uops, 40);
    assert_eq!(sim.model().executed(0), 40);
    assert!(sim.scheduler().is_empty());
    assert!(sim.cpu().idle());
    assert!(report.ipc > 0.0);
}

#[test]
fn test_taken_jump_is_recovered_and_then_learned() {
    let mut sim = simulator(small_config(1), workload(vec![looped(0, 12)]));
    let report = sim.run().unwrap();

    assert_eq!(sim.finished(), Some(FinishReason::ContextsFinished));
    assert_eq!(report.committed_macros, 12 * 3 + 1);
    assert_eq!(report.branch.branches, 12);
    // The first jumps miss in the BTB; later ones hit.
    assert!(report.branch.mispredicted >= 1);
    assert!(report.branch.mispredicted < 12);
    assert!(sim.model().spec_executed(0) > 0);

    let thread = &sim.cpu().cores()[0].threads[0];
    assert!(thread.stats.recoveries >= 1);
    assert_eq!(thread.stats.committed.total, 12 * 3 + 1);
    assert_eq!(thread.stats.committed.ctrl, 12);
}

#[test]
fn test_perfect_prediction_never_recovers() {
    let mut config = small_config(1);
    config.branch_predictor.kind = BranchPredictorKind::Perfect;
    let mut sim = simulator(config, workload(vec![looped(0, 8)]));
    let report = sim.run().unwrap();

    assert_eq!(report.branch.mispredicted, 0);
    assert_eq!(sim.model().spec_executed(0), 0);
    assert_eq!(sim.cpu().cores()[0].threads[0].stats.recoveries, 0);
}

#[rstest]
#[case::writeback(RecoverKind::Writeback)]
#[case::commit(RecoverKind::Commit)]
fn test_recovery_point_does_not_change_results(#[case] kind: RecoverKind) {
    let mut config = small_config(1);
    config.general.recover_kind = kind;
    config.general.recover_penalty = 3;
    let mut sim = simulator(config, workload(vec![looped(0, 6)]));
    let report = sim.run().unwrap();
    assert_eq!(sim.finished(), Some(FinishReason::ContextsFinished));
    assert_eq!(report.committed_macros, 6 * 3 + 1);
}

#[test]
fn test_loads_and_stores_reach_memory() {
    let trace = TraceBuilder::new(0, 0x1000)
        .load(0, 1, 0x8000)
        .add(0, 2)
        .store(0, 0x8004)
        .load(3, 1, 0x8040)
        .store(3, 0x8044)
        .build();
    let mut sim = simulator(small_config(1), workload(vec![trace]));
    let report = sim.run().unwrap();

    assert_eq!(report.committed_macros, 5);
    let memory = sim.memory().stats();
    assert_eq!(memory.loads, 2);
    assert_eq!(memory.stores, 2);
    assert!(memory.fetches >= 1);
}

#[test]
fn test_max_cycles_stops_the_run() {
    let mut config = small_config(1);
    config.general.max_cycles = Some(5);
    let mut sim = simulator(config, workload(vec![straight_line(0, 0x1000, 500)]));
    let report = sim.run().unwrap();
    assert_eq!(sim.finished(), Some(FinishReason::MaxCycles));
    assert_eq!(report.cycles, 5);
    assert!(report.committed_macros < 500);
}

#[test]
fn test_max_instructions_stops_the_run() {
    let mut config = small_config(1);
    config.general.max_instructions = Some(10);
    let mut sim = simulator(config, workload(vec![straight_line(0, 0x1000, 500)]));
    let report = sim.run().unwrap();
    assert_eq!(sim.finished(), Some(FinishReason::MaxInstructions));
    assert!(report.committed_macros >= 10);
    assert!(report.committed_macros < 500);
}

#[test]
fn test_ticking_a_finished_simulator_is_a_no_op() {
    let mut config = small_config(1);
    config.general.max_cycles = Some(3);
    let mut sim = simulator(config, workload(vec![straight_line(0, 0x1000, 100)]));
    let _ = sim.run().unwrap();
    let cycle = sim.cpu().cycle();
    assert_eq!(sim.tick().unwrap(), Some(FinishReason::MaxCycles));
    assert_eq!(sim.cpu().cycle(), cycle);
}

#[rstest]
#[case::time_slice("TimeSlice")]
#[case::shared("Shared")]
#[case::switch_on_event("SwitchOnEvent")]
fn test_two_threads_share_a_core(#[case] fetch_kind: &str) {
    let mut config = small_config(2);
    config.pipeline.fetch_kind = serde_json::from_str(&format!("\"{fetch_kind}\"")).unwrap();
    config.general.thread_quantum = 20;
    let contexts = vec![
        straight_line(0, 0x1000, 60),
        looped(1, 5),
    ];
    let mut sim = simulator(config, workload(contexts));
    let report = sim.run().unwrap();

    assert_eq!(sim.finished(), Some(FinishReason::ContextsFinished));
    assert_eq!(report.committed_macros, 60 + 5 * 3 + 1);
    let threads = &report.cores[0].threads;
    assert_eq!(threads[0].stats.committed_macros, 60);
    assert_eq!(threads[1].stats.committed_macros, 16);
}

/// A loop that reads, updates and writes back a word each iteration.
fn memory_loop(id: usize, start: u64, data: u64, iterations: usize) -> ContextTrace {
    let mut builder = TraceBuilder::new(id, start);
    for i in 0..iterations {
        let addr = data + 0x40 * i as u64;
        builder = builder.load(1, 0, addr).add(1, 2).store(1, addr + 4).jump(start);
    }
    builder.add(2, 3).build()
}

#[test]
fn test_two_threads_with_every_pool_shared() {
    let mut config = small_config(2);
    config.queues.rob_kind = Sharing::Shared;
    config.queues.rob_size = 8;
    config.queues.iq_kind = Sharing::Shared;
    config.queues.iq_size = 8;
    config.queues.lsq_kind = Sharing::Shared;
    config.queues.lsq_size = 8;
    config.reg_file.kind = Sharing::Shared;
    config.reg_file.int_size = 32;
    config.pipeline.dispatch_kind = SharingPolicy::Shared;
    config.pipeline.issue_kind = SharingPolicy::Shared;
    let contexts = vec![
        memory_loop(0, 0x1000, 0x8000, 4),
        memory_loop(1, 0x2000, 0x9000, 4),
    ];
    let mut sim = simulator(config, workload(contexts));
    let report = sim.run().unwrap();

    assert_eq!(sim.finished(), Some(FinishReason::ContextsFinished));
    assert_eq!(report.committed_macros, 2 * (4 * 4 + 1));
    let threads = &report.cores[0].threads;
    assert_eq!(threads[0].stats.committed_macros, 17);
    assert_eq!(threads[1].stats.committed_macros, 17);

    let memory = sim.memory().stats();
    assert_eq!(memory.loads, 8);
    assert_eq!(memory.stores, 8);

    let core = &sim.cpu().cores()[0];
    assert!(core.rob.is_empty(0));
    assert!(core.rob.is_empty(1));
    core.check_integrity();
}

#[test]
fn test_contexts_spread_over_cores() {
    let mut config = small_config(1);
    config.general.cores = 2;
    let mut sim = simulator(
        config,
        workload(vec![straight_line(0, 0x1000, 30), straight_line(1, 0x9000, 30)]),
    );
    let report = sim.run().unwrap();
    assert_eq!(report.cores.len(), 2);
    assert_eq!(report.cores[0].committed.total, 30);
    assert_eq!(report.cores[1].committed.total, 30);
}

#[test]
fn test_context_switching_runs_more_contexts_than_threads() {
    let mut config = small_config(1);
    config.general.context_switch = true;
    config.general.context_quantum = 40;
    let contexts = (0..3)
        .map(|id| straight_line(id, 0x1000 * (id as u64 + 1), 50))
        .collect();
    let mut sim = simulator(config, workload(contexts));
    let report = sim.run().unwrap();

    assert_eq!(sim.finished(), Some(FinishReason::ContextsFinished));
    assert_eq!(report.committed_macros, 150);
    for ctx in 0..3 {
        assert_eq!(sim.model().executed(ctx), 50);
    }
}

#[test]
fn test_static_scheduling_rejects_oversubscription() {
    let mut config = small_config(1);
    config.general.context_switch = false;
    let mut sim = simulator(
        config,
        workload(vec![straight_line(0, 0x1000, 4), straight_line(1, 0x2000, 4)]),
    );
    let err = sim.run().unwrap_err();
    assert!(matches!(err, SimError::NoFreeNode { context: 1 }));
}

#[test]
fn test_memory_that_never_completes_is_a_commit_stall() {
    init_tracing();
    let mut memory = MockMemory::new();
    let _ = memory.expect_block_size().return_const(64u64);
    let _ = memory.expect_can_access().return_const(true);
    let _ = memory.expect_access().return_const(AccessId(0));
    let _ = memory.expect_in_flight().return_const(true);
    let _ = memory.expect_tick().return_const(());

    let mut config = small_config(1);
    config.general.commit_stall_limit = 100;
    let model = workload(vec![straight_line(0, 0x1000, 100)]);
    let mut sim = Simulator::new(config, model, memory).unwrap();
    let report = sim.run().unwrap();

    assert_eq!(
        sim.finished(),
        Some(FinishReason::CommitStall { core: 0, thread: 0 })
    );
    assert_eq!(report.finish_reason, "CommitStall(core 0, thread 0)");
    assert_eq!(report.committed_macros, 0);
}

#[test]
fn test_trace_json_round_trip_through_file() {
    let json = r#"{
        "contexts": [
            { "id": 0, "insts": [
                { "addr": 4096, "size": 3, "next_addr": 4099,
                  "uinsts": [{ "opcode": "Add", "idep": [{ "Int": 0 }], "odep": [{ "Int": 0 }] }] },
                { "addr": 4099, "size": 2, "next_addr": 4101,
                  "uinsts": [{ "opcode": "Nop" }] }
            ] }
        ]
    }"#;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.json");
    std::fs::write(&path, json).unwrap();

    let model = TraceWorkload::from_file(&path).unwrap();
    assert_eq!(model.trace_len(0), 2);
    let mut sim = simulator(small_config(1), model);
    let report = sim.run().unwrap();
    assert_eq!(report.committed_macros, 2);
}

#[test]
fn test_unknown_register_operand_is_rejected() {
    let trace = TraceBuilder::new(0, 0x1000).add(0, 40).build();
    let model = workload(vec![trace]);
    let layout = small_config(1).arch;
    assert!(matches!(
        model.check_operands(&layout),
        Err(SimError::Trace(_))
    ));
}
