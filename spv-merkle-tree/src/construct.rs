//! Bottom-up construction, on the calling thread or on the worker pool.
//!
//! Both modes run the same level loop: hash the leaves, then for each level
//! pad an odd occupied count and combine sibling pairs into the parent
//! level. Hash jobs never touch the arena. They capture their inputs by
//! value and the results are written back once the whole level is done, so
//! a level's writes are complete before any job of the next level is built.

use std::sync::{mpsc, Arc};

use spv_task_pool::TaskPool;
use tracing::{debug, trace, warn};

use crate::{
    layout::occupied_counts, Digest, ExtensionPolicy, HashError, MerkleHasher, MerkleTree,
    MerkleTreeError, Node, PathEntry, EMPTY_DIGEST,
};

/// Outcome of a successful construction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstructionResult {
    /// Arena index of the root; `None` when the tree is uninitialized.
    pub root_offset: Option<usize>,
    /// Root digest; [`EMPTY_DIGEST`] when the tree is uninitialized.
    pub root_hash: Digest,
    /// Hash primitive invocations: one per leaf plus one per combined pair.
    pub hash_calls: u64,
}

impl ConstructionResult {
    /// The result of constructing an uninitialized tree.
    pub fn empty() -> Self {
        ConstructionResult {
            root_offset: None,
            root_hash: EMPTY_DIGEST,
            hash_calls: 0,
        }
    }

    /// Whether this is the result of an uninitialized tree.
    pub fn is_empty(&self) -> bool {
        self.root_offset.is_none()
    }
}

#[derive(Clone, Copy)]
enum PadSource<'a> {
    Generate,
    Ledger(&'a [PathEntry]),
}

type HashJob = Box<dyn FnOnce() -> Result<Digest, HashError> + Send + 'static>;

enum LevelExecutor<'p> {
    Inline,
    Pool(&'p mut TaskPool),
}

impl LevelExecutor<'_> {
    /// Run one level's jobs and store each result at its target offset.
    ///
    /// `level` is the level whose digests the jobs produce.
    fn run(
        &mut self,
        level: u32,
        jobs: Vec<(usize, HashJob)>,
        arena: &mut [Node],
    ) -> Result<(), MerkleTreeError> {
        let hash_failure = |source| MerkleTreeError::HashFailure { level, source };
        match self {
            LevelExecutor::Inline => {
                for (offset, job) in jobs {
                    arena[offset].hash = job().map_err(hash_failure)?;
                }
                Ok(())
            }
            LevelExecutor::Pool(pool) => {
                let (sender, receiver) = mpsc::channel();
                for (offset, job) in jobs {
                    let sender = sender.clone();
                    let submitted = pool.enqueue_tracked(move || {
                        let result = job();
                        let ok = result.is_ok();
                        sender.send((offset, result)).is_ok() && ok
                    });
                    if let Err(e) = submitted {
                        pool.cancel_pending();
                        pool.await_batch();
                        return Err(e.into());
                    }
                }
                drop(sender);

                let completed = pool.await_batch();
                let mut first_error = None;
                for (offset, result) in receiver.try_iter() {
                    match result {
                        Ok(digest) => arena[offset].hash = digest,
                        Err(e) if first_error.is_none() => first_error = Some(e),
                        Err(_) => {}
                    }
                }
                if let Some(e) = first_error {
                    return Err(hash_failure(e));
                }
                if !completed {
                    return Err(hash_failure(HashError::new("a hash task did not complete")));
                }
                Ok(())
            }
        }
    }
}

impl<H: MerkleHasher> MerkleTree<H> {
    /// Hash `chunks` into the leaves and reduce pairwise up to the root.
    ///
    /// Each chunk contributes its first `chunk_size` bytes; there must be
    /// exactly one chunk per leaf. With `worker_count > 1` every level is
    /// submitted as one batch to a pool of `worker_count` threads (kept for
    /// later runs) and the next level starts only after the batch barrier.
    ///
    /// The first failed level aborts the run with
    /// [`MerkleTreeError::HashFailure`]; later levels are not attempted. An
    /// uninitialized tree yields [`ConstructionResult::empty`].
    pub fn construct<C: AsRef<[u8]>>(
        &mut self,
        chunks: &[C],
        chunk_size: usize,
        worker_count: usize,
    ) -> Result<ConstructionResult, MerkleTreeError> {
        self.run_construction(chunks, chunk_size, worker_count, PadSource::Generate)
    }

    /// [`construct`](Self::construct) with one worker per available core
    /// minus the calling thread.
    pub fn construct_use_cores<C: AsRef<[u8]>>(
        &mut self,
        chunks: &[C],
        chunk_size: usize,
    ) -> Result<ConstructionResult, MerkleTreeError> {
        self.construct(chunks, chunk_size, TaskPool::available_workers())
    }

    /// Rebuild a tree whose odd levels were padded with random pads, taking
    /// every pad from `ledger` (as exported by the constructing side)
    /// instead of generating new ones.
    ///
    /// Only matters under [`ExtensionPolicy::UseSpecialKeys`]. A pad slot
    /// with no ledger entry fails with [`MerkleTreeError::MissingPad`].
    pub fn construct_with_pads<C: AsRef<[u8]>>(
        &mut self,
        chunks: &[C],
        chunk_size: usize,
        worker_count: usize,
        ledger: &[PathEntry],
    ) -> Result<ConstructionResult, MerkleTreeError> {
        self.run_construction(chunks, chunk_size, worker_count, PadSource::Ledger(ledger))
    }

    fn ensure_pool(&mut self, worker_count: usize) -> Result<(), MerkleTreeError> {
        if let Some(pool) = &self.pool {
            if pool.is_running() && pool.worker_count() == worker_count {
                return Ok(());
            }
        }
        if let Some(mut stale) = self.pool.take() {
            stale.shutdown()?;
        }
        self.pool = Some(TaskPool::new(worker_count)?);
        Ok(())
    }

    fn run_construction<C: AsRef<[u8]>>(
        &mut self,
        chunks: &[C],
        chunk_size: usize,
        worker_count: usize,
        pad_source: PadSource<'_>,
    ) -> Result<ConstructionResult, MerkleTreeError> {
        if !self.is_initialized() {
            return Ok(ConstructionResult::empty());
        }
        let leaf_count = self.leaf_count();
        if chunks.len() != leaf_count {
            return Err(MerkleTreeError::ChunkCountMismatch {
                expected: leaf_count,
                actual: chunks.len(),
            });
        }
        if let Some((index, chunk)) = chunks
            .iter()
            .enumerate()
            .find(|(_, chunk)| chunk.as_ref().len() < chunk_size)
        {
            return Err(MerkleTreeError::ChunkTooShort {
                index,
                len: chunk.as_ref().len(),
                chunk_size,
            });
        }

        let parallel = worker_count > 1;
        if parallel {
            self.ensure_pool(worker_count)?;
        }
        self.pads.clear_ledger();
        for node in self.arena.iter_mut() {
            node.hash = EMPTY_DIGEST;
        }

        let result = self.reduce(chunks, chunk_size, parallel, pad_source);
        match &result {
            Ok(outcome) => debug!(
                leaf_count,
                worker_count,
                hash_calls = outcome.hash_calls,
                root = %hex::encode(outcome.root_hash),
                "merkle tree constructed"
            ),
            Err(e) => warn!(leaf_count, worker_count, error = %e, "merkle tree construction failed"),
        }
        result
    }

    fn reduce<C: AsRef<[u8]>>(
        &mut self,
        chunks: &[C],
        chunk_size: usize,
        parallel: bool,
        pad_source: PadSource<'_>,
    ) -> Result<ConstructionResult, MerkleTreeError> {
        let leaf_count = self.leaf_count();
        let policy = self.options.extension_policy;
        let MerkleTree {
            arena,
            levels,
            hasher,
            pads,
            pool,
            ..
        } = self;
        let mut executor = match pool.as_mut() {
            Some(pool) if parallel => LevelExecutor::Pool(pool),
            _ => LevelExecutor::Inline,
        };

        match executor {
            LevelExecutor::Inline => {
                for (index, chunk) in chunks.iter().enumerate() {
                    arena[index].hash = hasher
                        .hash(&chunk.as_ref()[..chunk_size])
                        .map_err(|source| MerkleTreeError::HashFailure { level: 0, source })?;
                }
            }
            LevelExecutor::Pool(_) => {
                // Pool jobs are 'static, so the prefixes are shared through one buffer.
                let mut data = Vec::with_capacity(leaf_count * chunk_size);
                for chunk in chunks {
                    data.extend_from_slice(&chunk.as_ref()[..chunk_size]);
                }
                let data: Arc<[u8]> = Arc::from(data);
                let leaf_jobs = (0..leaf_count)
                    .map(|index| {
                        let data = Arc::clone(&data);
                        let hasher = Arc::clone(hasher);
                        let job: HashJob = Box::new(move || {
                            hasher.hash(&data[index * chunk_size..(index + 1) * chunk_size])
                        });
                        (index, job)
                    })
                    .collect();
                executor.run(0, leaf_jobs, arena)?;
            }
        }
        let mut hash_calls = leaf_count as u64;

        let occupied = occupied_counts(leaf_count, levels.len());
        for (index, pair) in levels.windows(2).enumerate() {
            let level = index as u32;
            let range = pair[0];
            let mut count = occupied[index];
            if count % 2 == 1 {
                let pad_offset = range.start + count;
                arena[pad_offset].hash = match policy {
                    ExtensionPolicy::UseCopy => arena[pad_offset - 1].hash,
                    ExtensionPolicy::UseSpecialKeys => match pad_source {
                        PadSource::Generate => pads.generate_and_record(level, pad_offset),
                        PadSource::Ledger(ledger) => {
                            let entry = ledger
                                .iter()
                                .find(|entry| {
                                    entry.level == level && entry.absolute_offset == pad_offset
                                })
                                .ok_or(MerkleTreeError::MissingPad {
                                    level,
                                    offset: pad_offset,
                                })?;
                            pads.record(*entry);
                            entry.hash
                        }
                    },
                };
                count += 1;
            }

            let jobs: Vec<(usize, HashJob)> = (range.start..range.start + count)
                .step_by(2)
                .map(|left| {
                    let parent = arena[left].parent_offset;
                    let (left_hash, right_hash) = (arena[left].hash, arena[left + 1].hash);
                    let hasher = Arc::clone(hasher);
                    let job: HashJob = Box::new(move || hasher.combine(&left_hash, &right_hash));
                    (parent, job)
                })
                .collect();
            trace!(level, pairs = jobs.len(), "combining level");
            hash_calls += jobs.len() as u64;
            executor.run(level + 1, jobs, arena)?;
        }

        let root_offset = levels.last().map(|root| root.start);
        let root_hash = root_offset.map_or(EMPTY_DIGEST, |root| arena[root].hash);
        Ok(ConstructionResult {
            root_offset,
            root_hash,
            hash_calls,
        })
    }
}
