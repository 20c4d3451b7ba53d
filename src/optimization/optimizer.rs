use crate::{error::Result, msg::ModelMsg, storage::Model};

/// Defines the strategy for updating model parameters based on calculated gradients.
///
/// Implementations are shared between every caller pushing gradients, so every method
/// takes `&self` and keeps its mutable state behind its own locks.
pub trait Optimizer: Send + Sync {
    /// Returns the learning rate.
    fn learning_rate(&self) -> f32;

    /// Allocates the optimizer's per-parameter state for the parameters `descriptor` declares.
    ///
    /// # Arguments
    /// * `descriptor` - The dense parameters and embedding tables of the model.
    fn init_from_model(&self, _descriptor: &ModelMsg) {}

    /// Applies a gradient message to the model.
    ///
    /// Dense gradients are applied before sparse ones, each section in name order. The
    /// first invalid entry aborts the call, entries applied before it stay applied.
    ///
    /// # Arguments
    /// * `grads` - The gradients to apply.
    /// * `model` - The parameters to update.
    ///
    /// # Returns
    /// An `UnknownParameter`, `UnknownTable` or `ShapeMismatch` error for the first invalid entry.
    fn apply_gradients(&self, grads: &ModelMsg, model: &Model) -> Result<()>;
}
