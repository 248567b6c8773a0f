//! Issue Stage: send ready micro-ops to the functional units and memory.
//!
//! Within a thread the queues are served in a fixed order: stores, loads,
//! prefetches, then register micro-ops. The store queue drains in order and
//! only with stores that already left the ROB. The other queues are scanned
//! oldest first; an entry that is not ready or finds no resource stays in
//! place and the scan moves on to the next one.

use crate::common::AccessKind;
use crate::core::cpu::Core;
use crate::core::pipeline::policy::StageWorker;
use crate::core::pipeline::stages::CycleEnv;
use crate::core::uop::UopHandle;

/// Marks `handle` as issued at `now` and refreshes the statistics.
fn mark_issued(core: &mut Core, t: usize, handle: UopHandle, now: u64) {
    let uop = &mut core.uops[handle];
    uop.issued = true;
    uop.issue_when = now;
    let thread = &mut core.threads[t];
    thread.reg_file.record_reads(uop);
    thread.stats.issued.record(uop.opcode());
    tracing::trace!(core = core.id, thread = t, uop = uop.id, opcode = %uop.opcode(), "issue");
}

/// Submits a memory access for `handle` and tracks it until completion.
fn issue_mem(core: &mut Core, env: &mut CycleEnv<'_>, t: usize, handle: UopHandle, kind: AccessKind) {
    let addr = core.uops[handle].phy_addr;
    let access = env.memory.access(core.id, t, kind, addr, env.now);
    core.uops[handle].membership.event_queue = true;
    core.mem_inflight.push((access, handle));
    core.threads[t].stats.lsq.reads += 1;
    mark_issued(core, t, handle, env.now);
}

/// Refreshes and returns the readiness of `handle`.
fn check_ready(core: &mut Core, t: usize, handle: UopHandle) -> bool {
    let uop = &mut core.uops[handle];
    if !uop.ready {
        uop.ready = core.threads[t].reg_file.is_ready(uop);
    }
    uop.ready
}

fn issue_sq(core: &mut Core, env: &mut CycleEnv<'_>, t: usize, quota: usize) -> usize {
    let mut done = 0;
    while done < quota {
        let Some(handle) = core.threads[t].queues.sq.get(0) else {
            break;
        };
        let uop = &core.uops[handle];
        if uop.membership.rob
            || !env
                .memory
                .can_access(core.id, t, AccessKind::Store, uop.phy_addr)
        {
            break;
        }
        let _ = core.threads[t].queues.sq.remove(0);
        core.uops[handle].membership.sq = false;
        issue_mem(core, env, t, handle, AccessKind::Store);
        done += 1;
    }
    done
}

fn issue_lq(core: &mut Core, env: &mut CycleEnv<'_>, t: usize, quota: usize) -> usize {
    let mut done = 0;
    let mut idx = 0;
    while done < quota {
        let Some(handle) = core.threads[t].queues.lq.get(idx) else {
            break;
        };
        if !check_ready(core, t, handle)
            || !env.memory.can_access(
                core.id,
                t,
                AccessKind::Load,
                core.uops[handle].phy_addr,
            )
        {
            idx += 1;
            continue;
        }
        let _ = core.threads[t].queues.lq.remove(idx);
        core.uops[handle].membership.lq = false;
        issue_mem(core, env, t, handle, AccessKind::Load);
        done += 1;
    }
    done
}

fn issue_pq(core: &mut Core, env: &mut CycleEnv<'_>, t: usize, quota: usize) -> usize {
    let mut done = 0;
    let mut idx = 0;
    while done < quota {
        let Some(handle) = core.threads[t].queues.pq.get(idx) else {
            break;
        };
        if !check_ready(core, t, handle) {
            idx += 1;
            continue;
        }
        let addr = core.uops[handle].phy_addr;

        // A prefetch of a recently prefetched block completes on the spot.
        if core.prefetch_history.is_redundant(addr) {
            let _ = core.threads[t].queues.pq.remove(idx);
            let uop = &mut core.uops[handle];
            uop.membership.pq = false;
            uop.issued = true;
            uop.completed = true;
            uop.issue_when = env.now;
            core.release(handle);
            continue;
        }

        if !env
            .memory
            .can_access(core.id, t, AccessKind::Prefetch, addr)
        {
            idx += 1;
            continue;
        }
        core.prefetch_history.record(addr);
        let _ = core.threads[t].queues.pq.remove(idx);
        core.uops[handle].membership.pq = false;
        issue_mem(core, env, t, handle, AccessKind::Prefetch);
        done += 1;
    }
    done
}

fn issue_iq(core: &mut Core, env: &mut CycleEnv<'_>, t: usize, quota: usize) -> usize {
    let now = env.now;
    let mut done = 0;
    let mut idx = 0;
    while done < quota {
        let Some(handle) = core.threads[t].queues.iq.get(idx) else {
            break;
        };
        if !check_ready(core, t, handle) {
            idx += 1;
            continue;
        }
        let Some(latency) = core.fu.reserve(&mut core.uops[handle], now) else {
            idx += 1;
            continue;
        };
        let _ = core.threads[t].queues.iq.remove(idx);
        core.threads[t].stats.iq.reads += 1;

        let uop = &mut core.uops[handle];
        uop.membership.iq = false;
        uop.membership.event_queue = true;
        uop.when = now + latency;
        let (when, id) = (uop.when, uop.id);
        core.event_queue.insert(when, id, handle);
        mark_issued(core, t, handle, now);
        done += 1;
    }
    done
}

/// Issues up to `quota` micro-ops of thread `t`; returns how many issued.
pub fn issue_thread(core: &mut Core, env: &mut CycleEnv<'_>, t: usize, quota: usize) -> usize {
    let mut left = quota;
    left -= issue_sq(core, env, t, left);
    left -= issue_lq(core, env, t, left);
    left -= issue_pq(core, env, t, left);
    left -= issue_iq(core, env, t, left);
    quota - left
}

struct Issuer<'a, 'b> {
    core: &'a mut Core,
    env: &'a mut CycleEnv<'b>,
}

impl StageWorker for Issuer<'_, '_> {
    fn eligible(&self, thread: usize) -> bool {
        !self.core.threads[thread].queues.is_empty()
    }

    fn service(&mut self, thread: usize, quota: usize) -> usize {
        issue_thread(self.core, self.env, thread, quota)
    }
}

/// Executes the issue stage of one core.
pub fn issue_stage(core: &mut Core, env: &mut CycleEnv<'_>) {
    let pipeline = core.config.pipeline;
    let threads = core.threads.len();
    let mut cursor = core.cursors.issue;
    let mut worker = Issuer { core, env };
    let _ = pipeline.issue_kind.run(
        &mut cursor,
        threads,
        pipeline.issue_width,
        pipeline.issue_width,
        &mut worker,
    );
    worker.core.cursors.issue = cursor;
}
