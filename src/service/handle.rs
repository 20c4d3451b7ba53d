use std::ops::Deref;

use tokio::task;

use super::ParameterServer;
use crate::{error::Result, msg::ModelMsg, optimization::Optimizer, tensor::Tensor};

/// The async interface to a `ParameterServer`.
///
/// It bridges the async runtime with the blocking CPU-bound implementation of the server,
/// so it must be used from a multi-threaded tokio runtime.
pub struct ServerHandle<O: Optimizer>(ParameterServer<O>);

impl<O: Optimizer> Clone for ServerHandle<O> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<O: Optimizer> Deref for ServerHandle<O> {
    type Target = ParameterServer<O>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<O: Optimizer> ServerHandle<O> {
    /// Creates a new `ServerHandle`.
    ///
    /// # Arguments
    /// * `server` - The underlying parameter server.
    ///
    /// # Returns
    /// A new `ServerHandle` instance.
    pub fn new(server: ParameterServer<O>) -> Self {
        Self(server)
    }

    /// Async call to the synchronous implementation of `ParameterServer::push_model`.
    pub async fn push_model(&self, msg: &ModelMsg) -> Result<()> {
        task::block_in_place(|| self.0.push_model(msg))
    }

    /// Async call to the synchronous implementation of `ParameterServer::push_gradients`.
    ///
    /// # Arguments
    /// * `msg` - The gradients to apply.
    ///
    /// # Returns
    /// The model version after this update, or the first validation error.
    pub async fn push_gradients(&self, msg: &ModelMsg) -> Result<u64> {
        task::block_in_place(|| self.0.push_gradients(msg))
    }

    /// Async call to the synchronous implementation of `ParameterServer::pull_dense`.
    pub async fn pull_dense(&self, name: &str) -> Result<Tensor> {
        task::block_in_place(|| self.0.pull_dense(name))
    }

    /// Async call to the synchronous implementation of `ParameterServer::pull_embedding_vectors`.
    pub async fn pull_embedding_vectors(&self, name: &str, indices: &[i64]) -> Result<Tensor> {
        task::block_in_place(|| self.0.pull_embedding_vectors(name, indices))
    }

    /// Async call to the synchronous implementation of `ParameterServer::pull_model`.
    pub async fn pull_model(&self) -> ModelMsg {
        task::block_in_place(|| self.0.pull_model())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{optimization::GradientDescent, storage::Model, tensor::ops::all_close};

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_pushes_from_tasks() {
        const WORKERS: usize = 8;

        let server = ParameterServer::new(Model::new(), GradientDescent::new(0.1));
        let handle = ServerHandle::new(server);

        let init = ModelMsg::new().with_dense("w", Tensor::new(vec![0.; 4], vec![4]).unwrap());
        handle.push_model(&init).await.unwrap();

        let mut tasks = Vec::with_capacity(WORKERS);
        for _ in 0..WORKERS {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                let grad = Tensor::new(vec![1.; 4], vec![4]).unwrap();
                let msg = ModelMsg::new().with_dense("w", grad);
                handle.push_gradients(&msg).await
            }));
        }

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let w = handle.pull_dense("w").await.unwrap();
        assert!(all_close(w.values(), &[-0.8; 4], 1e-5));
        assert_eq!(handle.version(), WORKERS as u64);
    }
}
