//! Misprediction recovery.
//!
//! Recovery squashes every speculative micro-op of one thread, youngest
//! first, from each structure that can hold one. Renaming is undone in
//! reverse program order through the ROB tail so that the RAT ends at the
//! mapping it had before the first wrong-path micro-op. The functional model
//! leaves speculative mode and fetch restarts at the resolved address after
//! the configured penalty.
//!
//! A squashed load or store whose memory access is still in flight stays in
//! the in-flight list with `squashed` set; writeback releases it without
//! producing anything.

use crate::core::cpu::Core;
use crate::core::pipeline::queues::IssuePool;
use crate::core::pipeline::stages::CycleEnv;
use crate::core::uop::{Membership, UopArena, UopHandle};

/// Drops the speculative entries of an issue-side queue.
fn squash_pool(
    pool: &mut IssuePool,
    uops: &mut UopArena,
    released: &mut Vec<UopHandle>,
    clear: fn(&mut Membership),
) {
    pool.retain(|&handle| {
        let uop = &mut uops[handle];
        if !uop.specmode {
            return true;
        }
        clear(&mut uop.membership);
        released.push(handle);
        false
    });
}

/// Squashes the speculative path of thread `t` and redirects its fetch.
pub fn recover(core: &mut Core, env: &mut CycleEnv<'_>, t: usize) {
    let Core {
        threads,
        rob,
        event_queue,
        uops,
        ..
    } = core;
    let thread = &mut threads[t];
    let mut released = Vec::new();

    while let Some(&handle) = thread.fetch_queue.back() {
        let uop = &mut uops[handle];
        if !uop.specmode {
            break;
        }
        let _ = thread.fetch_queue.pop_back();
        uop.membership.fetch_queue = false;
        if uop.mop_index == 0 {
            thread.fetch_queue_bytes -= uop.mop_size as usize;
        }
        released.push(handle);
    }

    while let Some(&handle) = thread.uop_queue.back() {
        let uop = &mut uops[handle];
        if !uop.specmode {
            break;
        }
        let _ = thread.uop_queue.pop_back();
        uop.membership.uop_queue = false;
        released.push(handle);
    }

    let queues = &mut thread.queues;
    squash_pool(&mut queues.iq, uops, &mut released, |m| m.iq = false);
    squash_pool(&mut queues.lq, uops, &mut released, |m| m.lq = false);
    squash_pool(&mut queues.sq, uops, &mut released, |m| m.sq = false);
    squash_pool(&mut queues.pq, uops, &mut released, |m| m.pq = false);

    event_queue.retain(|handle| {
        let uop = &mut uops[handle];
        if uop.thread != t || !uop.specmode {
            return true;
        }
        uop.membership.event_queue = false;
        false
    });

    while let Some(entry) = rob.tail(t) {
        let uop = &mut uops[entry.uop];
        if !uop.specmode {
            break;
        }
        if !uop.completed {
            thread.reg_file.write(uop);
        }
        thread.reg_file.undo(uop);
        if uop.membership.event_queue {
            uop.squashed = true;
        }
        let _ = rob.remove_tail(t);
        uop.membership.rob = false;
        released.push(entry.uop);
    }

    // Micro-ops may appear twice (queue and ROB); release is idempotent.
    let squashed = {
        released.sort_unstable();
        released.dedup();
        released.len() as u64
    };
    for handle in released {
        let _ = uops.release_if_unqueued(handle);
    }

    if let Some(ctx) = thread.ctx {
        if env.model.in_spec_mode(ctx) {
            env.model.recover(ctx);
        }
        thread.fetch_neip = env.model.next_addr(ctx);
    }
    let resume = env.now + core.config.general.recover_penalty;
    let thread = &mut core.threads[t];
    thread.fetch_resume_at = thread.fetch_resume_at.max(resume);
    thread.stats.squashed += squashed;
    thread.stats.recoveries += 1;

    tracing::debug!(
        core = core.id,
        thread = t,
        squashed,
        fetch_neip = format_args!("{:#x}", core.threads[t].fetch_neip),
        now = env.now,
        "recover"
    );
}
