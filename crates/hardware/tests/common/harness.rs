use o3sim_core::Simulator;
use o3sim_core::config::Config;
use o3sim_core::sim::memory::FixedLatencyMemory;
use o3sim_core::sim::trace::TraceWorkload;

/// Routes `tracing` output to the test writer; safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
}

/// A single-core configuration with `threads` hardware threads and a low
/// livelock limit so that broken runs fail quickly.
pub fn small_config(threads: usize) -> Config {
    let mut config = Config::default();
    config.general.threads = threads;
    config.general.commit_stall_limit = 2_000;
    config.general.max_cycles = Some(100_000);
    config
}

pub type TraceSim = Simulator<TraceWorkload, FixedLatencyMemory>;

/// Builds a simulator over `workload` with the fixed-latency memory port.
pub fn simulator(config: Config, workload: TraceWorkload) -> TraceSim {
    init_tracing();
    let memory = FixedLatencyMemory::new(config.memory, config.general.cores);
    Simulator::new(config, workload, memory).unwrap()
}
