//! Decode Stage: move fetched macro-instructions into the uop queue.
//!
//! One thread is decoded per cycle, chosen round-robin among the threads
//! with a non-empty fetch queue. Up to `decode_width` macro-instructions move
//! as a whole, and only once the instruction fetch access that brought them
//! in has completed.

use crate::core::cpu::Core;
use crate::core::pipeline::stages::CycleEnv;

/// Executes the decode stage of one core.
pub fn decode_stage(core: &mut Core, env: &mut CycleEnv<'_>) {
    let threads = core.threads.len();
    for _ in 0..threads {
        core.cursors.decode = (core.cursors.decode + 1) % threads;
        if !core.threads[core.cursors.decode].fetch_queue.is_empty() {
            break;
        }
    }

    let t = core.cursors.decode;
    let uop_queue_size = core.config.queues.uop_queue_size;
    let thread = &mut core.threads[t];

    for _ in 0..core.config.pipeline.decode_width {
        let Some(&head) = thread.fetch_queue.front() else {
            break;
        };
        if thread.uop_queue.len() >= uop_queue_size {
            break;
        }
        let first = &core.uops[head];
        if first
            .fetch_access
            .is_some_and(|access| env.memory.in_flight(access, env.now))
        {
            break;
        }
        let mop_size = first.mop_size as usize;

        while let Some(handle) = thread.fetch_queue.pop_front() {
            let uop = &mut core.uops[handle];
            uop.membership.fetch_queue = false;
            uop.membership.uop_queue = true;
            thread.uop_queue.push_back(handle);
            let next_is_new_macro = thread
                .fetch_queue
                .front()
                .is_none_or(|&next| core.uops[next].mop_index == 0);
            if next_is_new_macro {
                break;
            }
        }
        thread.fetch_queue_bytes -= mop_size;
    }
}
