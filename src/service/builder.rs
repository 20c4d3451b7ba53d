use log::info;

use super::{ParameterServer, ServerSpec};
use crate::{
    error::Result,
    msg::ModelMsg,
    optimization::{AnyOptimizer, Optimizer},
    storage::Model,
};

/// Builds `ParameterServer`s given a specification.
#[derive(Debug, Default)]
pub struct ServerBuilder;

impl ServerBuilder {
    /// Creates a new `ServerBuilder`.
    ///
    /// # Returns
    /// A new `ServerBuilder` instance.
    pub fn new() -> Self {
        Self
    }

    /// Builds a new `ParameterServer` following a spec.
    ///
    /// The spec's embedding tables are registered right away and the optimizer's state is
    /// allocated for them, dense parameters arrive later through `push_model`.
    ///
    /// # Arguments
    /// * `spec` - The specification of the parameter server.
    ///
    /// # Returns
    /// A new server, or an error if any of the tables can't be registered.
    pub fn build(&self, spec: ServerSpec) -> Result<ParameterServer<AnyOptimizer>> {
        let model = Model::with_shards(spec.shards, spec.seed);

        for info in &spec.embedding_tables {
            model.set_embedding_table_info(info)?;
        }

        let optimizer = AnyOptimizer::from_spec(spec.optimizer, spec.shards);
        let descriptor = ModelMsg {
            embedding_table_infos: spec.embedding_tables,
            ..ModelMsg::default()
        };
        optimizer.init_from_model(&descriptor);

        info!(
            shards = spec.shards.get(),
            tables = descriptor.embedding_table_infos.len();
            "built parameter server with {:?}",
            spec.optimizer
        );

        Ok(ParameterServer::new(model, optimizer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::PsErr, msg::EmbeddingTableInfo, service::OptimizerSpec};

    #[test]
    fn builds_from_json() {
        let spec = ServerSpec::from_json(
            r#"{
                "optimizer": { "adam": { "learning_rate": 0.1, "beta1": 0.9, "beta2": 0.999, "epsilon": 1e-8 } },
                "shards": 2,
                "embedding_tables": [ { "name": "t3", "dim": 2 } ]
            }"#,
        )
        .unwrap();

        let server = ServerBuilder::new().build(spec).unwrap();

        assert!(matches!(server.optimizer(), AnyOptimizer::Adam(_)));
        assert_eq!(server.optimizer().learning_rate(), 0.1);
        assert_eq!(server.model().get_embedding_table("t3").unwrap().dim(), 2);
    }

    #[test]
    fn rejects_conflicting_tables() {
        let mut spec = ServerSpec::new(OptimizerSpec::GradientDescent { learning_rate: 0.1 });
        spec.embedding_tables = vec![
            EmbeddingTableInfo::new("t3", 2),
            EmbeddingTableInfo::new("t3", 4),
        ];

        let err = ServerBuilder::new().build(spec).err().unwrap();
        assert!(matches!(err, PsErr::ShapeMismatch { .. }));
    }
}
