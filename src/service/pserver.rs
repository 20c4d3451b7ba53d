use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use log::{info, warn};
use rayon::prelude::*;

use crate::{
    error::Result,
    msg::ModelMsg,
    optimization::Optimizer,
    storage::Model,
    tensor::Tensor,
};

/// The central server structure, it owns the model and the optimizer updating it.
///
/// Cloning is cheap and every clone shares the same state, so each connection can hold its own.
pub struct ParameterServer<O: Optimizer> {
    model: Arc<Model>,
    optimizer: Arc<O>,
    version: Arc<AtomicU64>,
}

impl<O: Optimizer> Clone for ParameterServer<O> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            optimizer: Arc::clone(&self.optimizer),
            version: Arc::clone(&self.version),
        }
    }
}

impl<O: Optimizer> ParameterServer<O> {
    /// Creates a new `ParameterServer`.
    ///
    /// # Arguments
    /// * `model` - The parameters to serve.
    /// * `optimizer` - The optimizer applying incoming gradients.
    pub fn new(model: Model, optimizer: O) -> Self {
        Self {
            model: Arc::new(model),
            optimizer: Arc::new(optimizer),
            version: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn optimizer(&self) -> &O {
        &self.optimizer
    }

    /// The amount of gradient messages applied successfully so far.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Seeds the model from a descriptor and allocates the optimizer's state for it.
    ///
    /// # Arguments
    /// * `msg` - The dense parameters, table infos and initial rows of the model.
    pub fn push_model(&self, msg: &ModelMsg) -> Result<()> {
        self.model.init_from_msg(msg)?;
        self.optimizer.init_from_model(msg);

        info!(
            dense = msg.dense_parameters.len(),
            tables = msg.embedding_table_infos.len();
            "model initialized"
        );

        Ok(())
    }

    /// Applies a gradient message to the model.
    ///
    /// # Returns
    /// The model version after this update, or the first validation error.
    pub fn push_gradients(&self, msg: &ModelMsg) -> Result<u64> {
        if let Err(e) = self.optimizer.apply_gradients(msg, &self.model) {
            warn!("rejected gradients: {e}");
            return Err(e);
        }

        Ok(self.version.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Applies several independent gradient messages in parallel.
    ///
    /// # Returns
    /// The result of each message, in the same order as `msgs`.
    pub fn push_gradients_batch(&self, msgs: &[ModelMsg]) -> Vec<Result<u64>> {
        msgs.par_iter().map(|msg| self.push_gradients(msg)).collect()
    }

    /// Returns a copy of a dense parameter.
    pub fn pull_dense(&self, name: &str) -> Result<Tensor> {
        Ok(self.model.dense_parameter(name)?.read().clone())
    }

    /// Looks up rows of an embedding table, materializing absent ones.
    pub fn pull_embedding_vectors(&self, name: &str, indices: &[i64]) -> Result<Tensor> {
        Ok(self.model.get_embedding_table(name)?.get_embedding_vectors(indices))
    }

    /// Returns a snapshot of the whole model.
    pub fn pull_model(&self) -> ModelMsg {
        self.model.to_msg()
    }
}
