//! Commit Stage: in-order retirement from the ROB head.
//!
//! A micro-op retires once it is the oldest of its thread, non-speculative,
//! and completed. Stores are the exception: they retire as soon as their
//! inputs are ready and perform the memory access afterwards from the store
//! queue. Committing trains the branch predictor and releases the physical
//! registers the micro-op made obsolete.
//!
//! The stage also watches every running thread for commit livelock and
//! resolves the speculative leftovers of threads about to be evicted.

use crate::config::RecoverKind;
use crate::core::cpu::Core;
use crate::core::pipeline::policy::StageWorker;
use crate::core::pipeline::recovery;
use crate::core::pipeline::stages::CycleEnv;
use crate::core::uop::Opcode;
use crate::sim::traits::ContextStatus;

/// Returns true if the ROB head of thread `t` may retire this cycle.
pub fn can_commit(core: &Core, t: usize) -> bool {
    if !core.rob.can_dequeue(t) {
        return false;
    }
    let Some(head) = core.rob.head(t) else {
        return false;
    };
    let uop = &core.uops[head.uop];
    if uop.specmode {
        return false;
    }
    if uop.opcode() == Opcode::Store {
        return uop.ready || core.threads[t].reg_file.is_ready(uop);
    }
    uop.completed
}

/// Retires the ROB head of thread `t`. The caller checked [`can_commit`].
fn commit_one(core: &mut Core, env: &mut CycleEnv<'_>, t: usize) {
    let Some(head) = core.rob.remove_head(t) else {
        return;
    };
    let recover_kind = core.config.general.recover_kind;
    let thread = &mut core.threads[t];
    let uop = &mut core.uops[head.uop];
    assert!(!uop.specmode, "commit of speculative uop {}", uop.id);

    thread.reg_file.commit(uop);
    let mispredicted = uop.mispredicted();
    if uop.opcode().is_ctrl() {
        thread.bpred.update(uop);
        thread.bpred.btb_update(uop);
        let branch = &mut thread.stats.branch;
        branch.btb_writes += 1;
        branch.branches += 1;
        if mispredicted {
            branch.mispredicted += 1;
        }
    }
    thread.stats.committed.record(uop.opcode());
    if uop.mop_index == 0 {
        thread.stats.committed_macros += 1;
    }
    thread.stats.rob.reads += 1;
    thread.last_commit_cycle = env.now;
    uop.membership.rob = false;

    tracing::trace!(
        core = core.id,
        thread = t,
        uop = uop.id,
        opcode = %uop.opcode(),
        eip = format_args!("{:#x}", uop.eip),
        "commit"
    );
    core.release(head.uop);

    if recover_kind == RecoverKind::Commit && mispredicted {
        recovery::recover(core, env, t);
        core.fu.release_all();
    }
}

struct Committer<'a, 'b> {
    core: &'a mut Core,
    env: &'a mut CycleEnv<'b>,
}

impl StageWorker for Committer<'_, '_> {
    fn eligible(&self, thread: usize) -> bool {
        can_commit(self.core, thread)
    }

    fn service(&mut self, thread: usize, quota: usize) -> usize {
        let mut done = 0;
        while done < quota && can_commit(self.core, thread) {
            commit_one(self.core, self.env, thread);
            done += 1;
        }
        done
    }
}

/// Updates the livelock watch of every thread; returns the first thread
/// that has not committed for longer than the stall limit.
fn check_livelock(core: &mut Core, env: &CycleEnv<'_>) -> Option<usize> {
    let limit = core.config.general.commit_stall_limit;
    let mut stalled = None;
    for thread in &mut core.threads {
        let running = thread
            .ctx
            .is_some_and(|ctx| env.model.status(ctx) == ContextStatus::Running);
        if !running {
            thread.last_commit_cycle = env.now;
        } else if env.now.saturating_sub(thread.last_commit_cycle) > limit {
            tracing::warn!(
                core = core.id,
                thread = thread.id,
                last_commit = thread.last_commit_cycle,
                now = env.now,
                "no commit within the stall limit"
            );
            let _ = stalled.get_or_insert(thread.id);
        }
    }
    stalled
}

/// Executes the commit stage of one core.
///
/// Returns the first thread found livelocked, if any.
pub fn commit_stage(core: &mut Core, env: &mut CycleEnv<'_>) -> Option<usize> {
    let stalled = check_livelock(core, env);

    let pipeline = core.config.pipeline;
    let threads = core.threads.len();
    let mut cursor = core.cursors.commit;
    let mut worker = Committer { core, env };
    let _ = pipeline
        .commit_kind
        .run(&mut cursor, threads, pipeline.commit_width, 1, &mut worker);
    let Committer { core, env } = worker;
    core.cursors.commit = cursor;

    // A thread being evicted can be left with only wrong-path work: squash it
    // so the pipeline drains.
    for t in 0..threads {
        let thread = &core.threads[t];
        let Some(ctx) = thread.ctx else {
            continue;
        };
        if !thread.evict_signal {
            continue;
        }
        let spec_head = match core.rob.head(t) {
            Some(head) => core.uops[head.uop].specmode,
            None => env.model.in_spec_mode(ctx),
        };
        if spec_head {
            recovery::recover(core, env, t);
        }
    }

    stalled
}
