//! The messages exchanged with the transport layer.
//!
//! A `ModelMsg` plays two roles: workers push gradients with it, and training setup uses
//! it to describe (and seed) the model's parameters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    initialization::Initializer,
    tensor::{IndexedSlices, Tensor},
};

/// The element type of an embedding table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Float16,
    #[default]
    Float32,
    Float64,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Float16 => "float16",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
        }
    }
}

/// The metadata needed to register an embedding table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingTableInfo {
    pub name: String,
    pub dim: usize,
    #[serde(default)]
    pub initializer: Initializer,
    #[serde(default)]
    pub dtype: DataType,
}

impl EmbeddingTableInfo {
    /// Creates the info of a zero-initialized `float32` table.
    pub fn new(name: impl Into<String>, dim: usize) -> Self {
        Self {
            name: name.into(),
            dim,
            initializer: Initializer::Zero,
            dtype: DataType::Float32,
        }
    }

    pub fn with_initializer(mut self, initializer: Initializer) -> Self {
        self.initializer = initializer;
        self
    }

    pub fn with_dtype(mut self, dtype: DataType) -> Self {
        self.dtype = dtype;
        self
    }
}

/// A set of dense tensors, sparse slices and table metadata keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelMsg {
    pub dense_parameters: BTreeMap<String, Tensor>,
    pub indexed_slices: BTreeMap<String, IndexedSlices>,
    pub embedding_table_infos: Vec<EmbeddingTableInfo>,
}

impl ModelMsg {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dense(mut self, name: impl Into<String>, tensor: Tensor) -> Self {
        self.dense_parameters.insert(name.into(), tensor);
        self
    }

    pub fn with_slices(mut self, name: impl Into<String>, slices: IndexedSlices) -> Self {
        self.indexed_slices.insert(name.into(), slices);
        self
    }

    pub fn with_table(mut self, info: EmbeddingTableInfo) -> Self {
        self.embedding_table_infos.push(info);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.dense_parameters.is_empty()
            && self.indexed_slices.is_empty()
            && self.embedding_table_infos.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_gradient_message() {
        let json = r#"{
            "dense_parameters": { "t1": { "values": [1, 1], "shape": [2] } },
            "indexed_slices": {
                "t3": { "values": { "values": [1, 1, 1, 1], "shape": [2, 2] }, "indices": [1, 3] }
            },
            "embedding_table_infos": [ { "name": "t3", "dim": 2 } ]
        }"#;

        let msg: ModelMsg = serde_json::from_str(json).unwrap();

        assert_eq!(msg.dense_parameters["t1"].values(), [1., 1.]);
        assert_eq!(msg.indexed_slices["t3"].indices(), [1, 3]);
        assert_eq!(msg.embedding_table_infos, [EmbeddingTableInfo::new("t3", 2)]);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let msg: ModelMsg = serde_json::from_str("{}").unwrap();
        assert!(msg.is_empty());
    }

    #[test]
    fn rejects_inconsistent_slices() {
        let json = r#"{
            "indexed_slices": {
                "t3": { "values": { "values": [1, 1], "shape": [1, 2] }, "indices": [1, 3] }
            }
        }"#;

        assert!(serde_json::from_str::<ModelMsg>(json).is_err());
    }
}
