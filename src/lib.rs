//! A parameter server holding the authoritative copy of a model's dense tensors and sparse
//! embedding tables, applying gradient updates pushed concurrently by many workers.
//!
//! Embedding tables grow on demand: rows are created and initialized the first time they're
//! looked up or updated. Gradients are applied in place by a configurable optimizer, either
//! plain gradient descent or Adam (optionally AMSGrad).

pub mod error;
pub mod initialization;
pub mod msg;
pub mod optimization;
pub mod service;
pub mod storage;
pub mod tensor;

pub use error::{PsErr, Result};
