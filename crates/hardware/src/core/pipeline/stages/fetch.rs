//! Fetch Stage: run the functional model and predict the next address.
//!
//! A thread fetches from one memory block per cycle. It stops at the end of
//! the block, after a control micro-op predicted taken, when the fetch queue
//! holds `fetch_queue_size` bytes, or when its context stops running. Every
//! macro-instruction becomes one or more micro-ops appended to the thread's
//! fetch queue. Which threads fetch is decided by the [`FetchKind`] policy.

use crate::common::AccessKind;
use crate::common::constants::{FETCH_FAIRNESS_WINDOW, LONG_LATENCY_THRESHOLD};
use crate::config::FetchKind;
use crate::core::cpu::Core;
use crate::core::pipeline::reg_file::RegFile;
use crate::core::pipeline::stages::CycleEnv;
use crate::core::uop::{Opcode, Uinst, Uop};
use crate::sim::traits::ContextStatus;

#[inline]
const fn block_of(addr: u64, block_size: u64) -> u64 {
    addr - addr % block_size
}

/// Executes the fetch stage of one core.
pub fn fetch_stage(core: &mut Core, env: &mut CycleEnv<'_>) {
    let threads = core.threads.len();
    match core.config.pipeline.fetch_kind {
        FetchKind::Shared => {
            for t in 0..threads {
                if can_fetch(core, env, t) {
                    fetch_thread(core, env, t);
                }
            }
        }
        FetchKind::TimeSlice => {
            for _ in 0..threads {
                core.cursors.fetch = (core.cursors.fetch + 1) % threads;
                let t = core.cursors.fetch;
                if can_fetch(core, env, t) {
                    fetch_thread(core, env, t);
                    break;
                }
            }
        }
        FetchKind::SwitchOnEvent => switch_on_event(core, env),
    }
}

/// Returns true if thread `t` may fetch this cycle.
pub fn can_fetch(core: &Core, env: &CycleEnv<'_>, t: usize) -> bool {
    let thread = &core.threads[t];
    let Some(ctx) = thread.ctx else {
        return false;
    };
    if env.model.status(ctx) != ContextStatus::Running
        || env.now < thread.fetch_resume_at
        || thread.evict_signal
        || thread.fetch_queue_bytes >= core.config.queues.fetch_queue_size
    {
        return false;
    }
    let block = block_of(thread.fetch_neip, env.memory.block_size());
    thread.fetch_block == Some(block)
        || env
            .memory
            .can_access(core.id, t, AccessKind::Fetch, block)
}

/// Returns true if thread `t` has an operation in flight for longer than
/// the long-latency threshold.
fn long_latency_in_flight(core: &Core, now: u64, t: usize) -> bool {
    core.event_queue
        .iter()
        .chain(core.mem_inflight.iter().map(|&(_, h)| h))
        .map(|h| &core.uops[h])
        .any(|uop| uop.thread == t && now.saturating_sub(uop.issue_when) > LONG_LATENCY_THRESHOLD)
}

fn switch_on_event(core: &mut Core, env: &mut CycleEnv<'_>) {
    let threads = core.threads.len();
    let now = env.now;
    let current = core.cursors.fetch;

    // Just switched: the new thread is still paying the penalty.
    if now < core.threads[current].fetch_resume_at {
        return;
    }

    let current_can_fetch = can_fetch(core, env, current);
    let quantum = core.config.general.thread_quantum + core.config.general.thread_switch_penalty;
    let must_switch = !current_can_fetch
        || now - core.fetch_switch_when > quantum
        || long_latency_in_flight(core, now, current);

    if must_switch {
        let committed = core.threads[current].stats.committed.total;
        let next = (1..threads)
            .map(|step| (current + step) % threads)
            .filter(|&t| can_fetch(core, env, t))
            .find(|&t| {
                !current_can_fetch
                    || core.threads[t].stats.committed.total <= committed + FETCH_FAIRNESS_WINDOW
            });
        if let Some(next) = next {
            tracing::trace!(core = core.id, from = current, to = next, now, "fetch thread switch");
            core.cursors.fetch = next;
            core.fetch_switch_when = now;
            core.threads[next].fetch_resume_at = now + core.config.general.thread_switch_penalty;
        }
    }

    let t = core.cursors.fetch;
    if can_fetch(core, env, t) {
        fetch_thread(core, env, t);
    }
}

/// Fetches from the current memory block of thread `t`.
///
/// The caller has checked [`can_fetch`].
pub fn fetch_thread(core: &mut Core, env: &mut CycleEnv<'_>, t: usize) {
    let block_size = env.memory.block_size();
    let fetch_queue_size = core.config.queues.fetch_queue_size;
    let process_hints = core.config.general.process_prefetch_hints;
    let core_id = core.id;

    let thread = &mut core.threads[t];
    let Some(ctx) = thread.ctx else {
        return;
    };

    let block = block_of(thread.fetch_neip, block_size);
    if thread.fetch_block != Some(block) {
        let access = env
            .memory
            .access(core_id, t, AccessKind::Fetch, block, env.now);
        thread.fetch_block = Some(block);
        thread.fetch_access = Some(access);
    }

    while block_of(thread.fetch_neip, block_size) == block
        && thread.fetch_queue_bytes < fetch_queue_size
        && env.model.status(ctx) == ContextStatus::Running
    {
        let eip = thread.fetch_neip;
        let Some(mop) = env.model.execute(ctx, eip) else {
            break;
        };
        let specmode = env.model.in_spec_mode(ctx);
        let fall_through = eip + u64::from(mop.size);
        thread.fetch_neip = fall_through;

        let mut uinsts: Vec<Uinst> = mop
            .uinsts
            .into_iter()
            .filter(|u| process_hints || u.opcode != Opcode::Prefetch)
            .collect();
        if uinsts.is_empty() {
            uinsts.push(Uinst::new(Opcode::Nop));
        }
        let count = uinsts.len();

        for (index, uinst) in uinsts.into_iter().enumerate() {
            let id = *env.next_uop_id;
            *env.next_uop_id += 1;

            let mut uop = Uop::new(uinst, id, t, ctx);
            uop.eip = eip;
            uop.neip = mop.next_addr;
            uop.target_neip = mop.target_addr;
            uop.mop_size = mop.size;
            uop.mop_index = index;
            uop.mop_count = count;
            uop.fetch_access = thread.fetch_access;
            uop.phy_addr = uop.uinst.address;
            uop.specmode = specmode;
            uop.demand = RegFile::demand(&uop.uinst);
            uop.pred_neip = thread.fetch_neip;

            if uop.opcode().is_ctrl() {
                thread.stats.branch.btb_reads += 1;
                let target = thread.bpred.btb_lookup(&uop);
                let taken = thread.bpred.lookup(&mut uop);
                if let (Some(target), true) = (target, taken) {
                    thread.fetch_neip = target;
                    uop.pred_neip = target;
                }
            }

            tracing::trace!(
                core = core_id,
                thread = t,
                uop = uop.id,
                eip = format_args!("{:#x}", uop.eip),
                opcode = %uop.opcode(),
                spec = uop.specmode,
                "fetch"
            );
            uop.membership.fetch_queue = true;
            let handle = core.uops.insert(uop);
            thread.fetch_queue.push_back(handle);
            thread.stats.fetched += 1;
        }
        thread.fetch_queue_bytes += mop.size as usize;

        if thread.fetch_neip != fall_through {
            break;
        }
    }
}
