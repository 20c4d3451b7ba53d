use super::RowGen;

/// A row generator that always generates the same value.
#[derive(Debug, Clone, Copy)]
pub struct ConstRowGen {
    value: f32,
}

impl ConstRowGen {
    /// Creates a new `ConstRowGen` row generator.
    ///
    /// # Arguments
    /// * `value` - The value every element of a new row takes.
    ///
    /// # Returns
    /// A new `ConstRowGen` instance.
    pub fn new(value: f32) -> Self {
        Self { value }
    }

    /// A generator of all-zero rows.
    pub fn zero() -> Self {
        Self::new(0.)
    }
}

impl RowGen for ConstRowGen {
    fn fill(&self, row: &mut [f32]) {
        row.fill(self.value);
    }
}
