use std::{fmt, num::NonZeroUsize};

use super::RowShards;
use crate::{
    error::{PsErr, Result},
    initialization::{Initializer, RowGen},
    msg::{DataType, EmbeddingTableInfo},
    tensor::{IndexedSlices, Tensor},
};

/// A growable table of `dim`-wide `f32` rows addressed by `i64` index.
///
/// Rows don't exist until they're first read or written, at which point the table's
/// initializer fills them in.
pub struct EmbeddingTable {
    name: String,
    dim: usize,
    initializer: Initializer,
    row_gen: Box<dyn RowGen>,
    rows: RowShards,
}

impl fmt::Debug for EmbeddingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingTable")
            .field("name", &self.name)
            .field("dim", &self.dim)
            .field("initializer", &self.initializer)
            .field("rows", &self.rows.len())
            .finish()
    }
}

impl EmbeddingTable {
    /// Creates a new empty `EmbeddingTable`.
    ///
    /// # Arguments
    /// * `info` - The table's metadata.
    /// * `shards` - The amount of independently locked row partitions.
    /// * `seed` - An optional seed for random initializers.
    ///
    /// # Returns
    /// An `UnsupportedDtype` error for non `float32` tables or an `InvalidInitializer`
    /// error if the initializer can't be built.
    pub fn new(info: &EmbeddingTableInfo, shards: NonZeroUsize, seed: Option<u64>) -> Result<Self> {
        if info.dtype != DataType::Float32 {
            return Err(PsErr::UnsupportedDtype {
                name: info.name.clone(),
                dtype: info.dtype.as_str().to_string(),
            });
        }

        Ok(Self {
            name: info.name.clone(),
            dim: info.dim,
            initializer: info.initializer,
            row_gen: info.initializer.build(seed)?,
            rows: RowShards::new(info.dim, shards),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn initializer(&self) -> Initializer {
        self.initializer
    }

    /// The metadata this table was registered with.
    pub fn info(&self) -> EmbeddingTableInfo {
        EmbeddingTableInfo::new(self.name.clone(), self.dim).with_initializer(self.initializer)
    }

    /// Returns the amount of materialized rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the indices of every materialized row, sorted.
    pub fn indices(&self) -> Vec<i64> {
        self.rows.indices()
    }

    pub fn contains(&self, index: i64) -> bool {
        self.rows.contains(index)
    }

    /// Runs `f` over the row at `index` while holding its lock, materializing it first if absent.
    pub fn update_row<F, R>(&self, index: i64, f: F) -> R
    where
        F: FnOnce(&mut [f32]) -> R,
    {
        self.rows.with_row(index, |row| self.row_gen.fill(row), f)
    }

    /// Returns a copy of the row at `index`, materializing it if absent.
    pub fn get_embedding_vector(&self, index: i64) -> Vec<f32> {
        self.update_row(index, |row| row.to_vec())
    }

    /// Gathers the rows at `indices` into a `indices.len() x dim` tensor.
    ///
    /// Output rows follow the order of `indices`, absent rows are materialized on the way.
    pub fn get_embedding_vectors(&self, indices: &[i64]) -> Tensor {
        let mut values = Vec::with_capacity(indices.len() * self.dim);

        for &index in indices {
            self.update_row(index, |row| values.extend_from_slice(row));
        }

        Tensor::from_parts(values, vec![indices.len(), self.dim])
    }

    /// Overwrites the rows at `indices` with the rows of `values`.
    ///
    /// # Returns
    /// A `ShapeMismatch` error if `values` isn't `indices.len() x dim`, in which case no row is written.
    pub fn set_embedding_vectors(&self, indices: &[i64], values: &Tensor) -> Result<()> {
        let expected = [indices.len(), self.dim];

        if values.shape() != expected {
            return Err(PsErr::shape_mismatch(&self.name, &expected, values.shape()));
        }

        let values = values.values();
        for (i, &index) in indices.iter().enumerate() {
            self.rows.insert(index, &values[i * self.dim..(i + 1) * self.dim]);
        }

        Ok(())
    }

    /// Copies every materialized row into an `IndexedSlices`, sorted by index.
    pub fn to_indexed_slices(&self) -> IndexedSlices {
        let rows = self.rows.snapshot();
        let mut indices = Vec::with_capacity(rows.len());
        let mut values = Vec::with_capacity(rows.len() * self.dim);

        for (index, row) in rows {
            indices.push(index);
            values.extend_from_slice(&row);
        }

        let values = Tensor::from_parts(values, vec![indices.len(), self.dim]);
        IndexedSlices::from_parts(values, indices)
    }
}
