//! Writeback Stage: complete micro-ops and resolve branches.
//!
//! Two sources feed writeback each cycle: memory accesses the memory system
//! reports as finished, and register operations whose scheduled completion
//! cycle has arrived. Completing a micro-op marks its outputs produced in the
//! register file. A control micro-op that turns out mispredicted triggers
//! recovery here when recovery happens at writeback.

use crate::config::RecoverKind;
use crate::core::cpu::Core;
use crate::core::pipeline::recovery;
use crate::core::pipeline::stages::CycleEnv;
use crate::core::uop::UopHandle;

/// Completes one micro-op leaving the event queue or the memory system.
fn writeback_uop(core: &mut Core, env: &mut CycleEnv<'_>, handle: UopHandle) {
    let recover_kind = core.config.general.recover_kind;
    let uop = &mut core.uops[handle];
    uop.membership.event_queue = false;

    // Squashed while its access was in flight: nothing to produce.
    if uop.squashed {
        core.release(handle);
        return;
    }

    uop.completed = true;
    let t = uop.thread;
    core.threads[t].reg_file.write(uop);
    tracing::trace!(
        core = core.id,
        thread = t,
        uop = uop.id,
        opcode = %uop.opcode(),
        now = env.now,
        "writeback"
    );

    let recover = recover_kind == RecoverKind::Writeback
        && uop.opcode().is_ctrl()
        && !uop.specmode
        && uop.neip != uop.pred_neip;
    core.release(handle);
    if recover {
        recovery::recover(core, env, t);
    }
}

/// Executes the writeback stage of one core.
pub fn writeback_stage(core: &mut Core, env: &mut CycleEnv<'_>) {
    let mut done = Vec::new();
    core.mem_inflight.retain(|&(access, handle)| {
        let finished = !env.memory.in_flight(access, env.now);
        if finished {
            done.push(handle);
        }
        !finished
    });
    for handle in done {
        writeback_uop(core, env, handle);
    }

    while let Some(handle) = core.event_queue.pop_due(env.now) {
        writeback_uop(core, env, handle);
    }
}
