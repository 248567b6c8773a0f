//! # Context Scheduler Tests
//!
//! Placement of contexts on hardware threads with and without context
//! switching. No cycles are simulated: pipelines stay empty, so a signalled
//! eviction completes at the next scheduling step.

use std::sync::Arc;

use o3sim_core::common::SimError;
use o3sim_core::config::Config;
use o3sim_core::core::Cpu;
use o3sim_core::sim::scheduler::ContextScheduler;
use o3sim_core::sim::trace::TraceWorkload;
use pretty_assertions::assert_eq;

use crate::common::builder::{TraceBuilder, workload};

fn cpu(threads: usize, context_switch: bool, quantum: u64) -> Cpu {
    let mut config = Config::default();
    config.general.threads = threads;
    config.general.context_switch = context_switch;
    config.general.context_quantum = quantum;
    Cpu::new(Arc::new(config), 64)
}

fn contexts(n: usize) -> TraceWorkload {
    workload(
        (0..n)
            .map(|id| TraceBuilder::new(id, 0x1000 * (id as u64 + 1)).add(0, 1).build())
            .collect(),
    )
}

fn allocated(scheduler: &ContextScheduler, ctx: usize) -> Option<usize> {
    scheduler.slot(ctx).and_then(|slot| slot.allocated)
}

#[test]
fn test_static_policy_places_every_context() {
    let mut cpu = cpu(2, false, 100);
    let model = contexts(2);
    let mut scheduler = ContextScheduler::new(&cpu);
    scheduler.schedule(&mut cpu, &model, 0).unwrap();

    assert_eq!(allocated(&scheduler, 0), Some(0));
    assert_eq!(allocated(&scheduler, 1), Some(1));
    let threads = &cpu.cores()[0].threads;
    assert_eq!(threads[0].ctx, Some(0));
    assert_eq!(threads[0].fetch_neip, 0x1000);
    assert_eq!(threads[1].ctx, Some(1));
}

#[test]
fn test_static_policy_fails_without_free_node() {
    let mut cpu = cpu(2, false, 100);
    let model = contexts(3);
    let mut scheduler = ContextScheduler::new(&cpu);
    let err = scheduler.schedule(&mut cpu, &model, 0).unwrap_err();
    assert!(matches!(err, SimError::NoFreeNode { context: 2 }));
}

#[test]
fn test_affinity_restricts_placement() {
    let mut cpu = cpu(2, false, 100);
    let model = workload(vec![
        TraceBuilder::new(0, 0x1000).affinity(&[1]).add(0, 1).build(),
    ]);
    let mut scheduler = ContextScheduler::new(&cpu);
    scheduler.schedule(&mut cpu, &model, 0).unwrap();
    assert_eq!(allocated(&scheduler, 0), Some(1));
    assert_eq!(cpu.cores()[0].threads[0].ctx, None);
}

#[test]
fn test_quantum_expiry_rotates_waiting_context_in() {
    let mut cpu = cpu(2, true, 10);
    let model = contexts(3);
    let mut scheduler = ContextScheduler::new(&cpu);

    scheduler.schedule(&mut cpu, &model, 0).unwrap();
    assert_eq!(allocated(&scheduler, 0), Some(0));
    assert_eq!(allocated(&scheduler, 1), Some(1));
    assert_eq!(allocated(&scheduler, 2), None);

    scheduler.schedule(&mut cpu, &model, 5).unwrap();
    assert!(!cpu.cores()[0].threads[0].evict_signal);

    // Quantum expired: the oldest allocation is asked to leave.
    scheduler.schedule(&mut cpu, &model, 10).unwrap();
    assert!(cpu.cores()[0].threads[0].evict_signal);
    assert_eq!(allocated(&scheduler, 0), Some(0));

    // Its pipeline is empty, so the eviction completes and the context that
    // has waited longest takes the node.
    scheduler.schedule(&mut cpu, &model, 11).unwrap();
    assert_eq!(allocated(&scheduler, 0), None);
    assert_eq!(allocated(&scheduler, 2), Some(0));
    assert_eq!(scheduler.slot(0).map(|slot| slot.evict_when), Some(11));
}

#[test]
fn test_dynamic_policy_waits_instead_of_failing() {
    let mut cpu = cpu(1, true, 1_000);
    let model = contexts(2);
    let mut scheduler = ContextScheduler::new(&cpu);
    scheduler.schedule(&mut cpu, &model, 0).unwrap();
    scheduler.schedule(&mut cpu, &model, 1).unwrap();
    assert_eq!(allocated(&scheduler, 0), Some(0));
    assert_eq!(allocated(&scheduler, 1), None);
    assert_eq!(scheduler.len(), 2);
}
