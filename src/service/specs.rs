use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::{error::Result, msg::EmbeddingTableInfo, storage::DEFAULT_SHARDS};

/// The specification for the `Optimizer` trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerSpec {
    #[serde(alias = "sgd")]
    GradientDescent { learning_rate: f32 },
    Adam {
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
        #[serde(default)]
        amsgrad: bool,
    },
}

/// The specification for the `ParameterServer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSpec {
    pub optimizer: OptimizerSpec,
    #[serde(default = "default_shards")]
    pub shards: NonZeroUsize,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub embedding_tables: Vec<EmbeddingTableInfo>,
}

fn default_shards() -> NonZeroUsize {
    DEFAULT_SHARDS
}

impl ServerSpec {
    /// Creates a spec with default shards, no seed and no tables.
    pub fn new(optimizer: OptimizerSpec) -> Self {
        Self {
            optimizer,
            shards: DEFAULT_SHARDS,
            seed: None,
            embedding_tables: Vec::new(),
        }
    }

    /// Parses a spec from a JSON document.
    ///
    /// # Returns
    /// An `InvalidConfig` error if the document isn't a valid spec.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::PsErr, initialization::Initializer};

    #[test]
    fn parses_full_spec() {
        let json = r#"{
            "optimizer": { "adam": { "learning_rate": 0.1, "beta1": 0.9, "beta2": 0.999, "epsilon": 1e-8 } },
            "shards": 4,
            "seed": 42,
            "embedding_tables": [
                { "name": "t3", "dim": 2, "initializer": "zero", "dtype": "float32" },
                { "name": "t4", "dim": 8, "initializer": { "normal": { "mean": 0, "std_dev": 0.01 } } }
            ]
        }"#;

        let spec = ServerSpec::from_json(json).unwrap();

        assert_eq!(
            spec.optimizer,
            OptimizerSpec::Adam {
                learning_rate: 0.1,
                beta1: 0.9,
                beta2: 0.999,
                epsilon: 1e-8,
                amsgrad: false,
            }
        );
        assert_eq!(spec.shards.get(), 4);
        assert_eq!(spec.seed, Some(42));
        assert_eq!(
            spec.embedding_tables[1].initializer,
            Initializer::Normal {
                mean: 0.,
                std_dev: 0.01
            }
        );
    }

    #[test]
    fn defaults() {
        let spec = ServerSpec::from_json(r#"{ "optimizer": { "sgd": { "learning_rate": 0.1 } } }"#)
            .unwrap();

        assert_eq!(spec, ServerSpec::new(OptimizerSpec::GradientDescent { learning_rate: 0.1 }));
    }

    #[test]
    fn invalid_config() {
        let err = ServerSpec::from_json(r#"{ "optimizer": "adam", "shards": 0 }"#).unwrap_err();
        assert!(matches!(err, PsErr::InvalidConfig(_)));
    }
}
