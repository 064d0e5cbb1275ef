//! Incremental reveal of a long visible list.
//!
//! A load reveals a first slice right away and the rest in a bounded number of
//! chunks, giving the host a chance to paint between them. Every new load or
//! filter bumps a shared generation; reveals carrying an older generation are
//! dropped instead of rendered.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

pub type Generation = u64;

/// Shared monotonically increasing load token.
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter(Arc<AtomicU64>);

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Generation {
        self.0.load(Ordering::Acquire)
    }

    /// Start a new generation and return it.
    pub fn bump(&self) -> Generation {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.current() == generation
    }
}

/// Slice sizes for a reveal plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    pub initial_batch: usize,
    pub chunk_size: usize,
    pub max_chunks: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            initial_batch: 100,
            chunk_size: 1000,
            max_chunks: 10,
        }
    }
}

/// Reveal rows `0..upto` of the list belonging to `generation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reveal {
    pub generation: Generation,
    pub upto: usize,
    pub is_final: bool,
}

/// Cumulative reveal steps for one generation.
///
/// The first step shows `min(initial_batch, total)` rows; the remainder comes
/// in chunks large enough that there are at most `max_chunks` of them. The
/// last step always reveals everything, and an empty list still yields one
/// final step.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    generation: Generation,
    total: usize,
    first: usize,
    chunk: usize,
    revealed: Option<usize>,
}

impl BatchPlan {
    pub fn new(generation: Generation, total: usize, config: BatchConfig) -> Self {
        let first = config.initial_batch.min(total);
        let rest = total - first;
        let max_chunks = config.max_chunks.max(1);
        let chunk = config.chunk_size.max(1).max(rest.div_ceil(max_chunks));
        Self {
            generation,
            total,
            first,
            chunk,
            revealed: None,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_done(&self) -> bool {
        self.revealed == Some(self.total)
    }
}

impl Iterator for BatchPlan {
    type Item = Reveal;

    fn next(&mut self) -> Option<Reveal> {
        let upto = match self.revealed {
            None => self.first,
            Some(done) if done >= self.total => return None,
            Some(done) => (done + self.chunk).min(self.total),
        };
        self.revealed = Some(upto);
        Some(Reveal {
            generation: self.generation,
            upto,
            is_final: upto == self.total,
        })
    }
}

/// Hands out plans, bumping the shared generation for each.
#[derive(Debug, Clone, Default)]
pub struct BatchScheduler {
    counter: GenerationCounter,
    config: BatchConfig,
}

impl BatchScheduler {
    pub fn new(counter: GenerationCounter, config: BatchConfig) -> Self {
        Self { counter, config }
    }

    pub fn counter(&self) -> &GenerationCounter {
        &self.counter
    }

    /// Supersede whatever is in flight and plan a reveal of `total` rows.
    pub fn begin(&self, total: usize) -> BatchPlan {
        BatchPlan::new(self.counter.bump(), total, self.config)
    }
}

/// What the renderer currently shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderState {
    pub generation: Generation,
    pub upto: usize,
    pub complete: bool,
}

impl RenderState {
    /// Apply `reveal` unless it is stale; returns whether it was applied.
    pub fn apply(&mut self, reveal: Reveal, counter: &GenerationCounter) -> bool {
        if reveal.generation < self.generation || !counter.is_current(reveal.generation) {
            debug!(
                stale = reveal.generation,
                current = counter.current(),
                "dropping stale reveal"
            );
            return false;
        }
        self.generation = reveal.generation;
        self.upto = reveal.upto;
        self.complete = reveal.is_final;
        true
    }
}

/// Receives reveals from [`drive`].
pub trait RevealSink {
    fn reveal(&self, reveal: Reveal, counter: &GenerationCounter) -> bool;
}

impl RevealSink for RefCell<RenderState> {
    fn reveal(&self, reveal: Reveal, counter: &GenerationCounter) -> bool {
        self.borrow_mut().apply(reveal, counter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOutcome {
    Completed { revealed: usize },
    /// A newer generation started before this plan finished.
    Superseded { generation: Generation, revealed: usize },
}

/// Run `plan` to completion, yielding to the scheduler between chunks.
///
/// Stops as soon as the plan's generation is no longer current.
pub async fn drive<S>(plan: BatchPlan, counter: &GenerationCounter, sink: &S) -> DriveOutcome
where
    S: RevealSink + ?Sized,
{
    let generation = plan.generation();
    let mut revealed = 0;
    for reveal in plan {
        if !counter.is_current(generation) || !sink.reveal(reveal, counter) {
            debug!(generation, revealed, "batch superseded");
            return DriveOutcome::Superseded {
                generation,
                revealed,
            };
        }
        revealed = reveal.upto;
        if !reveal.is_final {
            tokio::task::yield_now().await;
        }
    }
    DriveOutcome::Completed { revealed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(initial_batch: usize, chunk_size: usize, max_chunks: usize) -> BatchConfig {
        BatchConfig {
            initial_batch,
            chunk_size,
            max_chunks,
        }
    }

    fn steps(plan: BatchPlan) -> Vec<usize> {
        plan.map(|r| r.upto).collect()
    }

    #[test]
    fn small_lists_render_in_one_step() {
        let plan = BatchPlan::new(1, 40, BatchConfig::default());
        let reveals: Vec<_> = plan.collect();
        assert_eq!(
            reveals,
            vec![Reveal {
                generation: 1,
                upto: 40,
                is_final: true
            }]
        );
    }

    #[test]
    fn empty_list_still_finishes() {
        let reveals: Vec<_> = BatchPlan::new(3, 0, BatchConfig::default()).collect();
        assert_eq!(reveals.len(), 1);
        assert!(reveals[0].is_final);
        assert_eq!(reveals[0].upto, 0);
    }

    #[test]
    fn initial_slice_then_fixed_chunks() {
        assert_eq!(
            steps(BatchPlan::new(1, 2500, BatchConfig::default())),
            vec![100, 1100, 2100, 2500]
        );
    }

    #[test]
    fn chunks_grow_to_respect_the_chunk_limit() {
        // 20_100 rows: rest 20_000 over at most 10 chunks -> 2_000 each
        let plan = BatchPlan::new(1, 20_100, BatchConfig::default());
        let ups = steps(plan);
        assert_eq!(ups.len(), 11);
        assert_eq!(ups[1], 2100);
        assert_eq!(*ups.last().unwrap(), 20_100);
    }

    #[test]
    fn scheduler_bumps_generation_per_plan() {
        let scheduler = BatchScheduler::default();
        let a = scheduler.begin(10);
        let b = scheduler.begin(10);
        assert_eq!(a.generation() + 1, b.generation());
        assert!(scheduler.counter().is_current(b.generation()));
        assert!(!scheduler.counter().is_current(a.generation()));
    }

    #[test]
    fn interleaved_reveals_keep_only_the_newest_generation() {
        let scheduler = BatchScheduler::new(GenerationCounter::new(), config(2, 2, 10));
        let mut state = RenderState::default();

        let mut first = scheduler.begin(6);
        assert!(state.apply(first.next().unwrap(), scheduler.counter()));

        let mut second = scheduler.begin(3);
        assert!(!state.apply(first.next().unwrap(), scheduler.counter()));
        for reveal in second.by_ref() {
            assert!(state.apply(reveal, scheduler.counter()));
        }
        for reveal in first {
            assert!(!state.apply(reveal, scheduler.counter()));
        }

        assert_eq!(
            state,
            RenderState {
                generation: 2,
                upto: 3,
                complete: true
            }
        );
    }

    #[tokio::test]
    async fn drive_reveals_everything() {
        let counter = GenerationCounter::new();
        let sink = RefCell::new(RenderState::default());
        let plan = BatchPlan::new(counter.bump(), 3210, BatchConfig::default());

        let outcome = drive(plan, &counter, &sink).await;

        assert_eq!(outcome, DriveOutcome::Completed { revealed: 3210 });
        assert_eq!(sink.borrow().upto, 3210);
        assert!(sink.borrow().complete);
    }

    #[tokio::test]
    async fn second_load_supersedes_the_first() {
        let counter = GenerationCounter::new();
        let sink = RefCell::new(RenderState::default());
        let first = BatchPlan::new(counter.bump(), 5000, BatchConfig::default());

        let first_run = drive(first, &counter, &sink);
        let second_run = async {
            tokio::task::yield_now().await;
            let plan = BatchPlan::new(counter.bump(), 300, BatchConfig::default());
            drive(plan, &counter, &sink).await
        };
        let (first_outcome, second_outcome) = tokio::join!(first_run, second_run);

        assert!(matches!(
            first_outcome,
            DriveOutcome::Superseded { generation: 1, .. }
        ));
        assert_eq!(second_outcome, DriveOutcome::Completed { revealed: 300 });
        assert_eq!(
            *sink.borrow(),
            RenderState {
                generation: 2,
                upto: 300,
                complete: true
            }
        );
    }

    proptest! {
        #[test]
        fn plan_always_ends_with_everything(
            total in 0usize..50_000,
            initial in 0usize..500,
            chunk in 1usize..3000,
            max_chunks in 1usize..20,
        ) {
            let counter = GenerationCounter::new();
            let plan = BatchPlan::new(counter.bump(), total, config(initial, chunk, max_chunks));
            let reveals: Vec<_> = plan.collect();

            prop_assert!(reveals.len() <= max_chunks + 1);
            prop_assert!(reveals.windows(2).all(|w| w[0].upto < w[1].upto));
            prop_assert!(reveals[..reveals.len() - 1].iter().all(|r| !r.is_final));

            let mut state = RenderState::default();
            for reveal in reveals {
                prop_assert!(state.apply(reveal, &counter));
            }
            prop_assert_eq!(state.upto, total);
            prop_assert!(state.complete);
        }
    }
}
