/// A `RowGen` produces the initial values of lazily materialized rows.
pub trait RowGen: Send + Sync {
    /// Should overwrite every element of `row` with its initial value.
    ///
    /// # Arguments
    /// * `row` - The freshly allocated row to initialize.
    fn fill(&self, row: &mut [f32]);
}
