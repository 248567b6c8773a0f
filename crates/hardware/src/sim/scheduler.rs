//! Context scheduler: placement of software contexts on hardware threads.
//!
//! Every hardware thread of the CPU is a *node*, numbered
//! `core * threads + thread`. A context goes through these states:
//! 1. **Mapped:** Assigned a home node by affinity, least-loaded first.
//! 2. **Allocated:** Occupying a node's pipeline.
//! 3. **Evicted:** Back to mapped once the node's pipeline drained.
//! 4. **Destroyed:** Forgotten once it is both finished and evicted.
//!
//! Without context switching (static policy) every runnable context must
//! find a free node or the run fails. With context switching (dynamic policy)
//! contexts that stop running are evicted, the oldest allocation is evicted
//! when its quantum expires and another context is waiting, and free nodes are
//! refilled with the waiting context evicted longest ago.

use std::collections::BTreeMap;

use crate::common::SimError;
use crate::core::Cpu;
use crate::sim::traits::{ContextStatus, FunctionalModel};

/// Scheduling state of one context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContextSlot {
    /// Home node chosen at mapping time.
    pub home: usize,
    /// Node currently running the context.
    pub allocated: Option<usize>,
    /// Cycle of the last allocation.
    pub alloc_when: u64,
    /// Cycle of the last completed eviction.
    pub evict_when: u64,
}

/// Maps contexts onto the hardware threads of a [`Cpu`].
#[derive(Clone, Debug)]
pub struct ContextScheduler {
    threads: usize,
    nodes: usize,
    context_switch: bool,
    quantum: u64,
    slots: BTreeMap<usize, ContextSlot>,
}

impl ContextScheduler {
    /// Creates a scheduler for the nodes of `cpu`.
    pub fn new(cpu: &Cpu) -> Self {
        let general = &cpu.config().general;
        Self {
            threads: general.threads,
            nodes: general.cores * general.threads,
            context_switch: general.context_switch,
            quantum: general.context_quantum,
            slots: BTreeMap::new(),
        }
    }

    /// Scheduling state of `ctx`, if it has been mapped and not destroyed.
    pub fn slot(&self, ctx: usize) -> Option<&ContextSlot> {
        self.slots.get(&ctx)
    }

    /// Number of contexts mapped and not yet destroyed.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if every context has been destroyed.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    const fn split(&self, node: usize) -> (usize, usize) {
        (node / self.threads, node % self.threads)
    }

    fn eligible(model: &dyn FunctionalModel, ctx: usize, node: usize) -> bool {
        model
            .affinity(ctx)
            .is_none_or(|nodes| nodes.contains(&node))
    }

    /// Maps contexts the model created since the last call.
    ///
    /// Finished contexts are never mapped, so a destroyed context stays gone.
    fn map_new(&mut self, model: &dyn FunctionalModel) {
        for ctx in model.contexts() {
            if self.slots.contains_key(&ctx) || model.status(ctx) == ContextStatus::Finished {
                continue;
            }
            let mut load = vec![0usize; self.nodes];
            for slot in self.slots.values() {
                load[slot.home] += 1;
            }
            let home = (0..self.nodes)
                .filter(|&node| Self::eligible(model, ctx, node))
                .min_by_key(|&node| load[node])
                .unwrap_or(0);
            tracing::debug!(ctx, home, "context mapped");
            let _ = self.slots.insert(ctx, ContextSlot { home, ..ContextSlot::default() });
        }
    }

    /// Completes pending evictions whose pipelines drained and destroys
    /// finished contexts that are no longer allocated.
    fn retire(&mut self, cpu: &mut Cpu, model: &dyn FunctionalModel, now: u64) {
        for core in cpu.cores_mut() {
            for t in 0..core.threads.len() {
                let thread = &core.threads[t];
                if !thread.evict_signal || thread.ctx.is_none() || !core.pipeline_empty(t) {
                    continue;
                }
                let node = core.id * self.threads + t;
                if let Some(ctx) = core.threads[t].evict() {
                    tracing::debug!(ctx, node, now, "context evicted");
                    if let Some(slot) = self.slots.get_mut(&ctx) {
                        slot.allocated = None;
                        slot.evict_when = now;
                    }
                }
            }
        }

        let live = model.contexts();
        self.slots.retain(|&ctx, slot| {
            let gone = !live.contains(&ctx) || model.status(ctx) == ContextStatus::Finished;
            let destroy = gone && slot.allocated.is_none();
            if destroy {
                tracing::debug!(ctx, "context destroyed");
            }
            !destroy
        });
    }

    /// Flags the context on `node` for eviction.
    fn signal_eviction(&self, cpu: &mut Cpu, node: usize) {
        let (core, thread) = self.split(node);
        let thread = &mut cpu.cores_mut()[core].threads[thread];
        if !thread.evict_signal {
            tracing::debug!(ctx = thread.ctx, node, "eviction signalled");
            thread.evict_signal = true;
        }
    }

    fn node_free(&self, cpu: &Cpu, node: usize) -> bool {
        let (core, thread) = self.split(node);
        cpu.cores()[core].threads[thread].ctx.is_none()
    }

    fn allocate(
        &mut self,
        cpu: &mut Cpu,
        model: &dyn FunctionalModel,
        ctx: usize,
        node: usize,
        now: u64,
    ) {
        let (core, thread) = self.split(node);
        cpu.cores_mut()[core].threads[thread].allocate(ctx, model.next_addr(ctx), now);
        if let Some(slot) = self.slots.get_mut(&ctx) {
            slot.allocated = Some(node);
            slot.alloc_when = now;
        }
        tracing::info!(ctx, core, thread, now, "context allocated");
    }

    /// Contexts that are running but not allocated.
    fn waiting(&self, model: &dyn FunctionalModel) -> Vec<usize> {
        self.slots
            .iter()
            .filter(|&(&ctx, slot)| {
                slot.allocated.is_none() && model.status(ctx) == ContextStatus::Running
            })
            .map(|(&ctx, _)| ctx)
            .collect()
    }

    /// Runs one scheduling step before the cores cycle.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NoFreeNode`] if, without context switching, a
    /// runnable context finds every hardware thread occupied.
    pub fn schedule(
        &mut self,
        cpu: &mut Cpu,
        model: &dyn FunctionalModel,
        now: u64,
    ) -> Result<(), SimError> {
        self.map_new(model);
        self.retire(cpu, model, now);

        // A context that stopped running gives its node back.
        let stopped: Vec<usize> = self
            .slots
            .iter()
            .filter(|&(&ctx, _)| {
                let status = model.status(ctx);
                status == ContextStatus::Finished
                    || (self.context_switch && status != ContextStatus::Running)
            })
            .filter_map(|(_, slot)| slot.allocated)
            .collect();
        for node in stopped {
            self.signal_eviction(cpu, node);
        }

        if self.context_switch {
            self.dynamic(cpu, model, now);
            Ok(())
        } else {
            self.static_schedule(cpu, model, now)
        }
    }

    fn static_schedule(
        &mut self,
        cpu: &mut Cpu,
        model: &dyn FunctionalModel,
        now: u64,
    ) -> Result<(), SimError> {
        for ctx in self.waiting(model) {
            let home = self.slots.get(&ctx).map_or(0, |slot| slot.home);
            let node = std::iter::once(home)
                .chain(0..self.nodes)
                .find(|&node| self.node_free(cpu, node) && Self::eligible(model, ctx, node))
                .ok_or(SimError::NoFreeNode { context: ctx })?;
            self.allocate(cpu, model, ctx, node, now);
        }
        Ok(())
    }

    fn dynamic(&mut self, cpu: &mut Cpu, model: &dyn FunctionalModel, now: u64) {
        let waiting = self.waiting(model);
        if waiting.is_empty() {
            return;
        }

        let evicting = cpu
            .cores()
            .iter()
            .flat_map(|core| &core.threads)
            .any(|thread| thread.evict_signal);
        if !evicting {
            let oldest = self
                .slots
                .values()
                .filter_map(|slot| slot.allocated.map(|node| (slot.alloc_when, node)))
                .min();
            if let Some((when, node)) = oldest {
                if when + self.quantum <= now {
                    self.signal_eviction(cpu, node);
                }
            }
        }

        for node in 0..self.nodes {
            if !self.node_free(cpu, node) {
                continue;
            }
            let next = waiting
                .iter()
                .copied()
                .filter(|&ctx| {
                    self.slots
                        .get(&ctx)
                        .is_some_and(|slot| slot.allocated.is_none())
                        && Self::eligible(model, ctx, node)
                })
                .min_by_key(|ctx| (self.slots.get(ctx).map_or(0, |slot| slot.evict_when), *ctx));
            if let Some(ctx) = next {
                self.allocate(cpu, model, ctx, node, now);
            }
        }
    }
}
