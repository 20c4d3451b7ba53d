use std::{collections::HashMap, num::NonZeroUsize};

use parking_lot::Mutex;
use rayon::prelude::*;

/// A partitioned lock table of fixed-width rows keyed by an arbitrary `i64` index.
///
/// Every index maps to exactly one shard, holding a shard's lock grants exclusive access
/// to all of its rows. Updates to rows living in different shards never contend.
#[derive(Debug)]
pub struct RowShards {
    width: usize,
    shards: Box<[Mutex<HashMap<i64, Box<[f32]>>>]>,
}

impl RowShards {
    /// Creates a new empty `RowShards`.
    ///
    /// # Arguments
    /// * `width` - The amount of elements of every row.
    /// * `shards` - The amount of independently locked partitions.
    pub fn new(width: usize, shards: NonZeroUsize) -> Self {
        let shards = (0..shards.get())
            .map(|_| Mutex::new(HashMap::new()))
            .collect();

        Self { width, shards }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    fn shard(&self, index: i64) -> &Mutex<HashMap<i64, Box<[f32]>>> {
        let n = self.shards.len() as u64;
        &self.shards[(index as u64 % n) as usize]
    }

    /// Runs `f` over the row at `index`, materializing it first if it's absent.
    ///
    /// The row's shard stays locked for the whole call, so the materialization and the
    /// mutation are seen as a single step by every other caller.
    ///
    /// # Arguments
    /// * `index` - The index of the row.
    /// * `init` - Fills a freshly allocated row, only called if the row is absent.
    /// * `f` - The operation to run on the row.
    ///
    /// # Returns
    /// Whatever `f` returns.
    pub fn with_row<I, F, R>(&self, index: i64, init: I, f: F) -> R
    where
        I: FnOnce(&mut [f32]),
        F: FnOnce(&mut [f32]) -> R,
    {
        let mut shard = self.shard(index).lock();

        let row = shard.entry(index).or_insert_with(|| {
            let mut row = vec![0.; self.width].into_boxed_slice();
            init(&mut row[..]);
            row
        });

        f(&mut row[..])
    }

    /// Overwrites (or creates) the row at `index`.
    ///
    /// # Arguments
    /// * `index` - The index of the row.
    /// * `row` - The new contents, must be `width` elements long.
    pub fn insert(&self, index: i64, row: &[f32]) {
        debug_assert_eq!(row.len(), self.width);
        self.shard(index).lock().insert(index, Box::from(row));
    }

    /// Returns whether the row at `index` has been materialized.
    pub fn contains(&self, index: i64) -> bool {
        self.shard(index).lock().contains_key(&index)
    }

    /// Returns the amount of materialized rows.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the indices of every materialized row, sorted.
    pub fn indices(&self) -> Vec<i64> {
        let mut indices: Vec<_> = self
            .shards
            .iter()
            .flat_map(|shard| shard.lock().keys().copied().collect::<Vec<_>>())
            .collect();

        indices.sort_unstable();
        indices
    }

    /// Copies every materialized row, sorted by index.
    ///
    /// Shards are locked one at a time, so rows updated concurrently may be seen at
    /// different points in time.
    pub fn snapshot(&self) -> Vec<(i64, Box<[f32]>)> {
        let mut rows: Vec<_> = self
            .shards
            .par_iter()
            .flat_map_iter(|shard| {
                let shard = shard.lock();
                shard
                    .iter()
                    .map(|(&index, row)| (index, row.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();

        rows.sort_unstable_by_key(|&(index, _)| index);
        rows
    }
}
