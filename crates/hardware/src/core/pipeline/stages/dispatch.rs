//! Dispatch Stage: admission control and renaming.
//!
//! A micro-op leaves the uop queue only after passing, in order, the ROB
//! capacity, the IQ or LSQ capacity (memory micro-ops go to the LSQ), and the
//! register rename capacity. It is then renamed, appended to the ROB, and
//! placed in the IQ, LQ, SQ, or PQ. The first failed check names the stall
//! reason and the micro-op stays at the head of the uop queue.
//!
//! Every dispatch slot of the cycle is accounted: dispatched micro-ops count
//! as `used` or `spec`, and the slots left empty are charged to the last
//! stall reason seen.

use crate::core::cpu::Core;
use crate::core::pipeline::policy::StageWorker;
use crate::core::pipeline::rob::RobEntry;
use crate::core::pipeline::stages::CycleEnv;
use crate::core::uop::Opcode;
use crate::stats::DispatchStall;

/// Returns `Ok` if the head of thread `t`'s uop queue can be dispatched now.
pub fn can_dispatch(core: &Core, t: usize) -> Result<(), DispatchStall> {
    let thread = &core.threads[t];
    let Some(&head) = thread.uop_queue.front() else {
        return Err(if thread.ctx.is_some() {
            DispatchStall::UopQueue
        } else {
            DispatchStall::Ctx
        });
    };
    if !core.rob.can_enqueue(t) {
        return Err(DispatchStall::Rob);
    }
    let uop = &core.uops[head];
    if uop.opcode().is_mem() {
        let (used, core_used) = core.lsq_occupancy(t);
        if !core.capacity.lsq.admits(used, core_used, 1) {
            return Err(DispatchStall::Lsq);
        }
    } else {
        let (used, core_used) = core.iq_occupancy(t);
        if !core.capacity.iq.admits(used, core_used, 1) {
            return Err(DispatchStall::Iq);
        }
    }
    if !core.can_rename(t, uop) {
        return Err(DispatchStall::Rename);
    }
    Ok(())
}

/// Dispatches the head of thread `t`'s uop queue. The caller checked
/// [`can_dispatch`].
fn dispatch_one(core: &mut Core, t: usize, now: u64) {
    let thread = &mut core.threads[t];
    let Some(handle) = thread.uop_queue.pop_front() else {
        return;
    };
    let uop = &mut core.uops[handle];
    uop.membership.uop_queue = false;

    thread.reg_file.rename(uop);
    uop.ready = thread.reg_file.is_ready(uop);
    uop.dispatch_when = now;

    let queues = &mut thread.queues;
    match uop.opcode() {
        Opcode::Load => {
            queues.lq.push(handle);
            uop.membership.lq = true;
            thread.stats.lsq.writes += 1;
        }
        Opcode::Store => {
            queues.sq.push(handle);
            uop.membership.sq = true;
            thread.stats.lsq.writes += 1;
        }
        Opcode::Prefetch => {
            queues.pq.push(handle);
            uop.membership.pq = true;
            thread.stats.lsq.writes += 1;
        }
        _ => {
            queues.iq.push(handle);
            uop.membership.iq = true;
            thread.stats.iq.writes += 1;
        }
    }

    core.rob.enqueue(RobEntry {
        uop: handle,
        thread: t,
        id: uop.id,
    });
    uop.membership.rob = true;
    thread.stats.rob.writes += 1;
    thread.stats.dispatched.record(uop.opcode());

    let fate = if uop.specmode {
        DispatchStall::Spec
    } else {
        DispatchStall::Used
    };
    core.stats.dispatch.record(fate, 1);

    tracing::trace!(
        core = core.id,
        thread = t,
        uop = uop.id,
        opcode = %uop.opcode(),
        ready = uop.ready,
        "dispatch"
    );
}

struct Dispatcher<'a> {
    core: &'a mut Core,
    now: u64,
    last_stall: Option<DispatchStall>,
}

impl StageWorker for Dispatcher<'_> {
    fn eligible(&self, thread: usize) -> bool {
        let t = &self.core.threads[thread];
        t.ctx.is_some() && !t.uop_queue.is_empty()
    }

    fn service(&mut self, thread: usize, quota: usize) -> usize {
        let mut done = 0;
        while done < quota {
            if let Err(stall) = can_dispatch(self.core, thread) {
                self.last_stall = Some(stall);
                break;
            }
            dispatch_one(self.core, thread, self.now);
            done += 1;
        }
        done
    }
}

/// Executes the dispatch stage of one core.
pub fn dispatch_stage(core: &mut Core, env: &mut CycleEnv<'_>) {
    let pipeline = core.config.pipeline;
    let threads = core.threads.len();
    let mut cursor = core.cursors.dispatch;

    let mut worker = Dispatcher {
        core,
        now: env.now,
        last_stall: None,
    };
    let done = pipeline
        .dispatch_kind
        .run(&mut cursor, threads, pipeline.dispatch_width, 1, &mut worker);

    let core = worker.core;
    let idle = pipeline.dispatch_width - done;
    let reason = worker.last_stall.unwrap_or_else(|| {
        if core.threads.iter().any(|t| t.ctx.is_some()) {
            DispatchStall::UopQueue
        } else {
            DispatchStall::Ctx
        }
    });
    core.stats.dispatch.record(reason, idle as u64);
    core.cursors.dispatch = cursor;
}
