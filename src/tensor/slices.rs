use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Tensor, ops};
use crate::error::{PsErr, Result};

/// A sparse gradient, a `rows x dim` block of values paired with the row index of each row.
///
/// Indices may repeat, each occurrence is an independent contribution to the same row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawIndexedSlices")]
pub struct IndexedSlices {
    values: Tensor,
    indices: Vec<i64>,
}

#[derive(Deserialize)]
struct RawIndexedSlices {
    values: Tensor,
    indices: Vec<i64>,
}

impl TryFrom<RawIndexedSlices> for IndexedSlices {
    type Error = PsErr;

    fn try_from(raw: RawIndexedSlices) -> Result<Self> {
        Self::new(raw.values, raw.indices)
    }
}

impl IndexedSlices {
    /// Creates a new `IndexedSlices`.
    ///
    /// # Arguments
    /// * `values` - A 2-D tensor holding one row per index.
    /// * `indices` - The row index of each row of `values`.
    ///
    /// # Returns
    /// A `ShapeMismatch` error if `values` isn't 2-D or its row count differs from `indices.len()`.
    pub fn new(values: Tensor, indices: Vec<i64>) -> Result<Self> {
        let shape = values.shape().to_vec();

        match *shape.as_slice() {
            [rows, _] if rows == indices.len() => Ok(Self { values, indices }),
            [_, dim] => Err(PsErr::shape_mismatch(
                "indexed slices",
                &[indices.len(), dim],
                &shape,
            )),
            _ => Err(PsErr::shape_mismatch(
                "indexed slices",
                &[indices.len(), 0],
                &shape,
            )),
        }
    }

    /// Builds slices whose row count is already known to match `indices`.
    pub(crate) fn from_parts(values: Tensor, indices: Vec<i64>) -> Self {
        debug_assert_eq!(values.shape().first(), Some(&indices.len()));
        Self { values, indices }
    }

    pub fn values(&self) -> &Tensor {
        &self.values
    }

    pub fn indices(&self) -> &[i64] {
        &self.indices
    }

    /// The width of every row.
    pub fn dim(&self) -> usize {
        self.values.shape()[1]
    }

    /// Iterates over `(index, row)` pairs in arrival order.
    ///
    /// Every index yields a row, even when `dim` is zero and rows are empty.
    pub fn rows(&self) -> impl Iterator<Item = (i64, &[f32])> {
        let dim = self.dim();
        let values = self.values.values();

        self.indices
            .iter()
            .enumerate()
            .map(move |(i, &index)| (index, &values[i * dim..(i + 1) * dim]))
    }

    /// Sums the rows of repeated indices into a single row.
    ///
    /// Unique indices keep the order of their first occurrence.
    pub fn merge_duplicates(&self) -> Self {
        let dim = self.dim();
        let mut position = HashMap::with_capacity(self.indices.len());
        let mut indices = Vec::with_capacity(self.indices.len());
        let mut values: Vec<f32> = Vec::with_capacity(self.values.len());

        for (index, row) in self.rows() {
            match position.get(&index) {
                Some(&at) => ops::add(&mut values[at * dim..(at + 1) * dim], row),
                None => {
                    position.insert(index, indices.len());
                    indices.push(index);
                    values.extend_from_slice(row);
                }
            }
        }

        let shape = vec![indices.len(), dim];

        Self {
            values: Tensor { values, shape },
            indices,
        }
    }
}
