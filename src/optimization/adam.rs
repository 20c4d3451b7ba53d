use std::{
    borrow::Cow,
    collections::HashMap,
    num::NonZeroUsize,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use log::{debug, warn};
use parking_lot::{Mutex, RwLock};

use super::{
    Optimizer,
    apply::{self, UpdateRule},
};
use crate::{
    error::Result,
    msg::ModelMsg,
    storage::{DEFAULT_SHARDS, EmbeddingTable, Model, RowShards},
    tensor::IndexedSlices,
};

/// The moment estimates of a dense parameter.
///
/// `v_hat_max` is only allocated when AMSGrad is enabled.
#[derive(Debug)]
struct Moments {
    m: Box<[f32]>,
    v: Box<[f32]>,
    v_hat_max: Box<[f32]>,
}

impl Moments {
    fn zeros(len: usize, amsgrad: bool) -> Self {
        Self {
            m: vec![0.; len].into_boxed_slice(),
            v: vec![0.; len].into_boxed_slice(),
            v_hat_max: vec![0.; if amsgrad { len } else { 0 }].into_boxed_slice(),
        }
    }
}

/// The Adam optimizer, with an optional AMSGrad variant.
///
/// Every call to `apply_gradients` counts as one step: the step counter is incremented once
/// and every element updated by that call shares the same bias correction. Moment estimates
/// are kept per dense parameter and per embedding row, sparse ones are laid out as
/// `[m | v | v_hat_max]` in a `RowShards` parallel to the table.
#[derive(Debug)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    amsgrad: bool,
    merge_indices: bool,
    shards: NonZeroUsize,
    step: AtomicU64,
    dense_slots: RwLock<HashMap<String, Arc<Mutex<Moments>>>>,
    sparse_slots: RwLock<HashMap<String, Arc<RowShards>>>,
}

impl Adam {
    /// Creates a new `Adam` optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `beta1`, `beta2`, `epsilon` - Hyperparameters to the optimization algorithm.
    /// * `amsgrad` - Whether to normalize by the running maximum of the second moment estimate.
    ///
    /// # Returns
    /// A new `Adam` instance.
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32, amsgrad: bool) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            amsgrad,
            merge_indices: false,
            shards: DEFAULT_SHARDS,
            step: AtomicU64::new(0),
            dense_slots: RwLock::new(HashMap::new()),
            sparse_slots: RwLock::new(HashMap::new()),
        }
    }

    /// Sets the amount of row partitions of the sparse moment tables.
    pub fn with_shards(mut self, shards: NonZeroUsize) -> Self {
        self.shards = shards;
        self
    }

    /// Whether repeated indices of a sparse gradient are summed into one update.
    ///
    /// Off by default, every occurrence is then applied as its own update.
    pub fn with_merged_indices(mut self, merge_indices: bool) -> Self {
        self.merge_indices = merge_indices;
        self
    }

    pub fn beta1(&self) -> f32 {
        self.beta1
    }

    pub fn beta2(&self) -> f32 {
        self.beta2
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    pub fn amsgrad(&self) -> bool {
        self.amsgrad
    }

    /// Returns the amount of steps taken so far.
    pub fn step(&self) -> u64 {
        self.step.load(Ordering::Acquire)
    }

    /// Overrides the step counter, the next call to `apply_gradients` will use `step + 1`.
    pub fn set_step(&self, step: u64) {
        self.step.store(step, Ordering::Release);
    }

    /// Returns copies of the first and second moments of a dense parameter.
    pub fn dense_moments(&self, name: &str) -> Option<(Vec<f32>, Vec<f32>)> {
        let slots = self.dense_slots.read().get(name).cloned()?;
        let moments = slots.lock();
        Some((moments.m.to_vec(), moments.v.to_vec()))
    }

    /// Returns copies of the first and second moments of an embedding row.
    ///
    /// Unlike lookups on the table itself, absent rows aren't materialized.
    pub fn sparse_moments(&self, table: &str, index: i64) -> Option<(Vec<f32>, Vec<f32>)> {
        let slots = self.sparse_slots.read().get(table).cloned()?;

        if !slots.contains(index) {
            return None;
        }

        let dim = slots.width() / self.slot_count();
        slots.with_row(
            index,
            |_| {},
            |row| Some((row[..dim].to_vec(), row[dim..2 * dim].to_vec())),
        )
    }

    /// The amount of `dim`-wide blocks stored per sparse row.
    fn slot_count(&self) -> usize {
        if self.amsgrad { 3 } else { 2 }
    }

    /// Returns the moments of a dense parameter, allocating zeroed ones if absent.
    fn moments_of(&self, name: &str, len: usize) -> Arc<Mutex<Moments>> {
        if let Some(slots) = self.dense_slots.read().get(name) {
            return Arc::clone(slots);
        }

        let amsgrad = self.amsgrad;
        let mut dense_slots = self.dense_slots.write();
        let slots = dense_slots.entry(name.to_string()).or_insert_with(|| {
            debug!(param = name, len = len; "allocating adam moments");
            Arc::new(Mutex::new(Moments::zeros(len, amsgrad)))
        });

        Arc::clone(slots)
    }

    /// Returns the moment table of an embedding table, allocating an empty one if absent.
    ///
    /// Moments allocated for a different `dim` are discarded and replaced by empty ones.
    fn row_moments_of(&self, table: &str, dim: usize) -> Arc<RowShards> {
        let width = dim * self.slot_count();

        if let Some(slots) = self.sparse_slots.read().get(table)
            && slots.width() == width
        {
            return Arc::clone(slots);
        }

        let mut sparse_slots = self.sparse_slots.write();
        let slots = sparse_slots.entry(table.to_string()).or_insert_with(|| {
            debug!(table = table, dim = dim; "allocating adam sparse moments");
            Arc::new(RowShards::new(width, self.shards))
        });

        if slots.width() != width {
            warn!(table = table, dim = dim; "adam moments don't match the table's dim, resetting them");
            *slots = Arc::new(RowShards::new(width, self.shards));
        }

        Arc::clone(slots)
    }
}

/// The update rule of a single Adam step, with its bias corrections already computed.
struct AdamStep<'a> {
    adam: &'a Adam,
    bias_correction1: f32,
    bias_correction2: f32,
}

impl<'a> AdamStep<'a> {
    fn new(adam: &'a Adam, step: u64) -> Self {
        let step = step as f64;

        Self {
            adam,
            bias_correction1: (1. - (adam.beta1 as f64).powf(step)) as f32,
            bias_correction2: (1. - (adam.beta2 as f64).powf(step)) as f32,
        }
    }

    /// Updates `param` in place along with its moments.
    ///
    /// `v_hat_max` must be as long as `param` when AMSGrad is enabled, it's ignored otherwise.
    fn update(
        &self,
        grad: &[f32],
        param: &mut [f32],
        m: &mut [f32],
        v: &mut [f32],
        v_hat_max: &mut [f32],
    ) {
        let Adam {
            learning_rate: lr,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            amsgrad,
            ..
        } = *self.adam;

        for (i, (p, &g)) in param.iter_mut().zip(grad).enumerate() {
            m[i] = b1 * m[i] + (1. - b1) * g;
            v[i] = b2 * v[i] + (1. - b2) * g * g;

            let m_hat = m[i] / self.bias_correction1;
            let mut v_hat = v[i] / self.bias_correction2;

            if amsgrad {
                v_hat_max[i] = v_hat_max[i].max(v_hat);
                v_hat = v_hat_max[i];
            }

            *p -= lr * m_hat / (v_hat.sqrt() + eps);
        }
    }
}

impl UpdateRule for AdamStep<'_> {
    type Slots = Arc<RowShards>;

    fn update_dense(&self, name: &str, grad: &[f32], param: &mut [f32]) {
        let slots = self.adam.moments_of(name, param.len());
        let mut moments = slots.lock();

        if moments.m.len() != param.len() {
            warn!(param = name; "adam moments don't match the parameter's size, resetting them");
            *moments = Moments::zeros(param.len(), self.adam.amsgrad);
        }

        let Moments { m, v, v_hat_max } = &mut *moments;
        self.update(grad, param, m, v, v_hat_max);
    }

    fn table_slots(&self, table: &EmbeddingTable) -> Arc<RowShards> {
        self.adam.row_moments_of(table.name(), table.dim())
    }

    fn update_row(&self, slots: &Arc<RowShards>, index: i64, grad: &[f32], row: &mut [f32]) {
        let dim = row.len();

        slots.with_row(
            index,
            |_| {},
            |slot| {
                let (m, rest) = slot.split_at_mut(dim);
                let (v, v_hat_max) = rest.split_at_mut(dim);
                self.update(grad, row, m, v, v_hat_max);
            },
        );
    }

    fn prepare<'s>(&self, slices: &'s IndexedSlices) -> Cow<'s, IndexedSlices> {
        if self.adam.merge_indices {
            Cow::Owned(slices.merge_duplicates())
        } else {
            Cow::Borrowed(slices)
        }
    }
}

impl Optimizer for Adam {
    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn init_from_model(&self, descriptor: &ModelMsg) {
        let mut dense_slots = self.dense_slots.write();
        for (name, tensor) in &descriptor.dense_parameters {
            let len = tensor.len();
            let slots = dense_slots.entry(name.clone()).or_insert_with(|| {
                Arc::new(Mutex::new(Moments::zeros(len, self.amsgrad)))
            });

            let mut moments = slots.lock();
            if moments.m.len() != len {
                *moments = Moments::zeros(len, self.amsgrad);
            }
        }
        drop(dense_slots);

        let mut sparse_slots = self.sparse_slots.write();
        for info in &descriptor.embedding_table_infos {
            let width = info.dim * self.slot_count();
            let slots = sparse_slots.entry(info.name.clone()).or_insert_with(|| {
                Arc::new(RowShards::new(width, self.shards))
            });

            // Tables keep their rows when registered again, so do their moments.
            if slots.width() != width {
                *slots = Arc::new(RowShards::new(width, self.shards));
            }
        }

        debug!(
            dense = descriptor.dense_parameters.len(),
            tables = descriptor.embedding_table_infos.len();
            "initialized adam state"
        );
    }

    fn apply_gradients(&self, grads: &ModelMsg, model: &Model) -> Result<()> {
        let step = self.step.fetch_add(1, Ordering::AcqRel) + 1;
        apply::apply_gradients(&AdamStep::new(self, step), grads, model)
    }
}
