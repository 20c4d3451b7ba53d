use std::num::NonZeroUsize;

use super::{Adam, GradientDescent, Optimizer};
use crate::{error::Result, msg::ModelMsg, service::OptimizerSpec, storage::Model};

/// Every optimizer variant a server can be configured with.
#[derive(Debug)]
pub enum AnyOptimizer {
    GradientDescent(GradientDescent),
    Adam(Adam),
}

impl AnyOptimizer {
    /// Resolves an optimizer from its specification.
    ///
    /// # Arguments
    /// * `spec` - The optimizer's specification.
    /// * `shards` - The amount of row partitions of any per-row state.
    pub fn from_spec(spec: OptimizerSpec, shards: NonZeroUsize) -> Self {
        match spec {
            OptimizerSpec::GradientDescent { learning_rate } => {
                Self::GradientDescent(GradientDescent::new(learning_rate))
            }
            OptimizerSpec::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
                amsgrad,
            } => {
                let adam = Adam::new(learning_rate, beta1, beta2, epsilon, amsgrad);
                Self::Adam(adam.with_shards(shards))
            }
        }
    }
}

impl Optimizer for AnyOptimizer {
    fn learning_rate(&self) -> f32 {
        match self {
            AnyOptimizer::GradientDescent(opt) => opt.learning_rate(),
            AnyOptimizer::Adam(opt) => opt.learning_rate(),
        }
    }

    fn init_from_model(&self, descriptor: &ModelMsg) {
        match self {
            AnyOptimizer::GradientDescent(opt) => opt.init_from_model(descriptor),
            AnyOptimizer::Adam(opt) => opt.init_from_model(descriptor),
        }
    }

    fn apply_gradients(&self, grads: &ModelMsg, model: &Model) -> Result<()> {
        match self {
            AnyOptimizer::GradientDescent(opt) => opt.apply_gradients(grads, model),
            AnyOptimizer::Adam(opt) => opt.apply_gradients(grads, model),
        }
    }
}
