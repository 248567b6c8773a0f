use mockall::mock;
use o3sim_core::common::{AccessId, AccessKind};
use o3sim_core::core::uop::MacroInst;
use o3sim_core::sim::traits::{ContextStatus, FunctionalModel, MemoryPort};

mock! {
    pub Model {}
    impl FunctionalModel for Model {
        fn contexts(&self) -> Vec<usize>;
        fn status(&self, ctx: usize) -> ContextStatus;
        fn affinity(&self, ctx: usize) -> Option<Vec<usize>>;
        fn execute(&mut self, ctx: usize, addr: u64) -> Option<MacroInst>;
        fn in_spec_mode(&self, ctx: usize) -> bool;
        fn recover(&mut self, ctx: usize);
        fn next_addr(&self, ctx: usize) -> u64;
    }
}

mock! {
    pub Memory {}
    impl MemoryPort for Memory {
        fn block_size(&self) -> u64;
        fn can_access(&self, core: usize, thread: usize, kind: AccessKind, addr: u64) -> bool;
        fn access(&mut self, core: usize, thread: usize, kind: AccessKind, addr: u64, now: u64) -> AccessId;
        fn in_flight(&self, id: AccessId, now: u64) -> bool;
        fn tick(&mut self, now: u64);
    }
}
