//! # Stage Policy Tests
//!
//! How a stage width is divided between hardware threads under the shared
//! and time-slice policies.

use o3sim_core::config::SharingPolicy;
use o3sim_core::core::pipeline::policy::StageWorker;
use pretty_assertions::assert_eq;
use rstest::rstest;

/// Threads with a fixed backlog; every item costs one slot.
struct Backlog {
    work: Vec<usize>,
    served: Vec<usize>,
}

impl Backlog {
    fn new(work: &[usize]) -> Self {
        Self {
            work: work.to_vec(),
            served: vec![0; work.len()],
        }
    }
}

impl StageWorker for Backlog {
    fn eligible(&self, thread: usize) -> bool {
        self.work[thread] > 0
    }

    fn service(&mut self, thread: usize, quota: usize) -> usize {
        let done = quota.min(self.work[thread]);
        self.work[thread] -= done;
        self.served[thread] += done;
        done
    }
}

#[rstest]
#[case::one_per_turn(&[4, 4], 4, 1, &[2, 2])]
#[case::whole_turns(&[4, 4], 4, 4, &[4, 0])]
#[case::uneven_backlog(&[1, 5, 0], 4, 1, &[1, 3, 0])]
#[case::width_exceeds_work(&[1, 1], 8, 2, &[1, 1])]
fn test_shared_distribution(
    #[case] work: &[usize],
    #[case] width: usize,
    #[case] turn: usize,
    #[case] expected: &[usize],
) {
    let mut worker = Backlog::new(work);
    let mut current = work.len() - 1;
    let done = SharingPolicy::Shared.run(&mut current, work.len(), width, turn, &mut worker);
    assert_eq!(worker.served, expected);
    assert_eq!(done, expected.iter().sum::<usize>());
}

#[rstest]
#[case::first_thread(&[6, 6], 1, 0)]
#[case::skips_empty(&[0, 3, 6], 2, 1)]
#[case::wraps_around(&[2, 0, 0], 0, 0)]
fn test_time_slice_serves_one_thread(
    #[case] work: &[usize],
    #[case] start: usize,
    #[case] chosen: usize,
) {
    let mut worker = Backlog::new(work);
    let mut current = start;
    let _ = SharingPolicy::TimeSlice.run(&mut current, work.len(), 4, 1, &mut worker);
    assert_eq!(current, chosen);
    let served: Vec<usize> = worker
        .served
        .iter()
        .enumerate()
        .filter(|&(_, &n)| n > 0)
        .map(|(t, _)| t)
        .collect();
    assert_eq!(served, vec![chosen]);
}

#[test]
fn test_no_threads_does_nothing() {
    let mut worker = Backlog::new(&[]);
    let mut current = 0;
    assert_eq!(SharingPolicy::Shared.run(&mut current, 0, 4, 1, &mut worker), 0);
}
