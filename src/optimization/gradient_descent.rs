use super::{
    Optimizer,
    apply::{self, UpdateRule},
};
use crate::{
    error::Result,
    msg::ModelMsg,
    storage::{EmbeddingTable, Model},
    tensor::ops,
};

/// Plain stochastic gradient descent, `param -= learning_rate * grad`.
///
/// A row index repeated within one sparse gradient is updated once per occurrence.
#[derive(Debug, Clone, Copy)]
pub struct GradientDescent {
    learning_rate: f32,
}

impl GradientDescent {
    /// Creates a new `GradientDescent` optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    ///
    /// # Returns
    /// A new `GradientDescent` instance.
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }
}

impl UpdateRule for GradientDescent {
    type Slots = ();

    fn update_dense(&self, _name: &str, grad: &[f32], param: &mut [f32]) {
        ops::scaled_add(param, -self.learning_rate, grad);
    }

    fn table_slots(&self, _table: &EmbeddingTable) {}

    fn update_row(&self, _slots: &(), _index: i64, grad: &[f32], row: &mut [f32]) {
        ops::scaled_add(row, -self.learning_rate, grad);
    }
}

impl Optimizer for GradientDescent {
    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn apply_gradients(&self, grads: &ModelMsg, model: &Model) -> Result<()> {
        apply::apply_gradients(self, grads, model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::PsErr,
        msg::EmbeddingTableInfo,
        tensor::{IndexedSlices, Tensor, ops::all_close},
    };

    const TOLERANCE: f32 = 1e-4;

    fn tensor(values: &[f32], shape: &[usize]) -> Tensor {
        Tensor::new(values.to_vec(), shape.to_vec()).unwrap()
    }

    fn ones(rows: usize, dim: usize, indices: &[i64]) -> IndexedSlices {
        let values = tensor(&vec![1.; rows * dim], &[rows, dim]);
        IndexedSlices::new(values, indices.to_vec()).unwrap()
    }

    fn dense_model() -> Model {
        let model = Model::new();
        model
            .set_dense_parameter("t1", tensor(&[1., 2., 3., 4., 5., 6.], &[2, 3]))
            .unwrap();
        model
            .set_dense_parameter("t2", tensor(&[1., 2., 1.1, 2.2], &[2, 2]))
            .unwrap();
        model
    }

    fn dense_grads() -> ModelMsg {
        ModelMsg::new()
            .with_dense("t1", tensor(&[1.; 6], &[2, 3]))
            .with_dense("t2", tensor(&[1.; 4], &[2, 2]))
    }

    #[test]
    fn dense_update() {
        let model = dense_model();
        let opt = GradientDescent::new(0.1);

        opt.apply_gradients(&dense_grads(), &model).unwrap();

        assert_eq!(opt.learning_rate(), 0.1);
        assert!(all_close(
            &model.dense_values("t1").unwrap(),
            &[0.9, 1.9, 2.9, 3.9, 4.9, 5.9],
            TOLERANCE
        ));
        assert!(all_close(
            &model.dense_values("t2").unwrap(),
            &[0.9, 1.9, 1.0, 2.1],
            TOLERANCE
        ));
    }

    #[test]
    fn unknown_dense_name_leaves_model_unchanged() {
        let model = dense_model();
        let opt = GradientDescent::new(0.1);
        let grads = ModelMsg::new().with_dense("t3", tensor(&[1.; 4], &[2, 2]));

        let err = opt.apply_gradients(&grads, &model).unwrap_err();

        assert_eq!(err, PsErr::UnknownParameter { name: "t3".into() });
        assert_eq!(model.dense_values("t1").unwrap(), [1., 2., 3., 4., 5., 6.]);
        assert_eq!(model.dense_values("t2").unwrap(), [1., 2., 1.1, 2.2]);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let model = dense_model();
        let opt = GradientDescent::new(0.1);
        let grads = ModelMsg::new().with_dense("t1", tensor(&[1.; 6], &[3, 2]));

        let err = opt.apply_gradients(&grads, &model).unwrap_err();

        assert!(matches!(err, PsErr::ShapeMismatch { .. }));
        assert_eq!(model.dense_values("t1").unwrap(), [1., 2., 3., 4., 5., 6.]);
    }

    #[test]
    fn earlier_entries_stay_applied() {
        let model = dense_model();
        let opt = GradientDescent::new(0.1);
        let grads = dense_grads().with_slices("t3", ones(1, 2, &[0]));

        let err = opt.apply_gradients(&grads, &model).unwrap_err();

        assert_eq!(err, PsErr::UnknownTable { name: "t3".into() });
        assert!(all_close(
            &model.dense_values("t1").unwrap(),
            &[0.9, 1.9, 2.9, 3.9, 4.9, 5.9],
            TOLERANCE
        ));
    }

    #[test]
    fn sparse_update_with_repeated_indices() {
        let model = dense_model();
        let opt = GradientDescent::new(0.1);
        model
            .set_embedding_table_info(&EmbeddingTableInfo::new("t3", 2))
            .unwrap();
        opt.apply_gradients(&dense_grads(), &model).unwrap();

        let grads = dense_grads().with_slices("t3", ones(2, 2, &[1, 3]));
        opt.apply_gradients(&grads, &model).unwrap();

        let table = model.get_embedding_table("t3").unwrap();
        let vectors = table.get_embedding_vectors(&[1, 3]);
        assert!(all_close(vectors.values(), &[-0.1; 4], TOLERANCE));
        assert!(all_close(
            &model.dense_values("t1").unwrap(),
            &[0.8, 1.8, 2.8, 3.8, 4.8, 5.8],
            TOLERANCE
        ));

        let grads = ModelMsg::new().with_slices("t3", ones(4, 2, &[1, 3, 3, 5]));
        opt.apply_gradients(&grads, &model).unwrap();

        let vectors = table.get_embedding_vectors(&[1, 3, 5]);
        assert!(all_close(
            vectors.values(),
            &[-0.2, -0.2, -0.3, -0.3, -0.1, -0.1],
            TOLERANCE
        ));
    }

    #[test]
    fn sparse_width_mismatch_is_rejected() {
        let model = Model::new();
        let opt = GradientDescent::new(0.1);
        model
            .set_embedding_table_info(&EmbeddingTableInfo::new("t3", 2))
            .unwrap();

        let grads = ModelMsg::new().with_slices("t3", ones(1, 3, &[0]));
        let err = opt.apply_gradients(&grads, &model).unwrap_err();

        assert!(matches!(err, PsErr::ShapeMismatch { .. }));
        assert!(model.get_embedding_table("t3").unwrap().is_empty());
    }
}
