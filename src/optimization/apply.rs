use std::borrow::Cow;

use log::debug;

use crate::{
    error::{PsErr, Result},
    msg::ModelMsg,
    storage::{EmbeddingTable, Model},
    tensor::IndexedSlices,
};

/// The element-wise half of an optimizer, driven by `apply_gradients`.
pub(super) trait UpdateRule {
    /// Per-table state fetched once before updating a table's rows.
    type Slots;

    /// Updates a whole dense parameter while its lock is held.
    fn update_dense(&self, name: &str, grad: &[f32], param: &mut [f32]);

    /// Fetches the state needed to update the rows of `table`.
    fn table_slots(&self, table: &EmbeddingTable) -> Self::Slots;

    /// Updates one embedding row while its lock is held.
    fn update_row(&self, slots: &Self::Slots, index: i64, grad: &[f32], row: &mut [f32]);

    /// Gives the rule a chance to rewrite a sparse gradient before it's applied.
    fn prepare<'a>(&self, slices: &'a IndexedSlices) -> Cow<'a, IndexedSlices> {
        Cow::Borrowed(slices)
    }
}

/// Validates and applies every entry of `grads` to `model` following `rule`.
///
/// Each dense parameter is locked while it's updated, each embedding row is locked
/// (through its shard) while it's materialized and updated.
pub(super) fn apply_gradients<U: UpdateRule>(rule: &U, grads: &ModelMsg, model: &Model) -> Result<()> {
    for (name, grad) in &grads.dense_parameters {
        let param = model.dense_parameter(name)?;
        let mut param = param.write();

        if param.shape() != grad.shape() {
            return Err(PsErr::shape_mismatch(name, param.shape(), grad.shape()));
        }

        rule.update_dense(name, grad.values(), param.values_mut());
    }

    for (name, slices) in &grads.indexed_slices {
        let table = model.get_embedding_table(name)?;

        if slices.dim() != table.dim() {
            return Err(PsErr::shape_mismatch(
                name,
                &[slices.indices().len(), table.dim()],
                slices.values().shape(),
            ));
        }

        let slices = rule.prepare(slices);
        let slots = rule.table_slots(&table);

        for (index, grad) in slices.rows() {
            table.update_row(index, |row| rule.update_row(&slots, index, grad, row));
        }

        debug!(table = name.as_str(), rows = slices.indices().len(); "applied sparse gradient");
    }

    Ok(())
}
