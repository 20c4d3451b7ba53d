use serde::{Deserialize, Serialize};

use super::ops;
use crate::error::{PsErr, Result};

/// A dense `f32` array with shape metadata.
///
/// The product of `shape` always equals the amount of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTensor")]
pub struct Tensor {
    pub(super) values: Vec<f32>,
    pub(super) shape: Vec<usize>,
}

#[derive(Deserialize)]
struct RawTensor {
    values: Vec<f32>,
    shape: Vec<usize>,
}

impl TryFrom<RawTensor> for Tensor {
    type Error = PsErr;

    fn try_from(raw: RawTensor) -> Result<Self> {
        Self::new(raw.values, raw.shape)
    }
}

impl Tensor {
    /// Creates a new `Tensor`.
    ///
    /// # Arguments
    /// * `values` - The flat, row-major values.
    /// * `shape` - The dimensions of the tensor.
    ///
    /// # Returns
    /// A `ShapeMismatch` error if the shape doesn't describe exactly `values.len()` elements.
    pub fn new(values: Vec<f32>, shape: Vec<usize>) -> Result<Self> {
        let len: usize = shape.iter().product();

        if len != values.len() {
            return Err(PsErr::shape_mismatch("tensor", &shape, &[values.len()]));
        }

        Ok(Self { values, shape })
    }

    /// Builds a tensor whose shape is already known to match its values.
    pub(crate) fn from_parts(values: Vec<f32>, shape: Vec<usize>) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), values.len());
        Self { values, shape }
    }

    /// Creates a zero-valued tensor of the given shape.
    pub fn zeros(shape: Vec<usize>) -> Self {
        let len = shape.iter().product();

        Self {
            values: vec![0.; len],
            shape,
        }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }

    /// Returns the `i`-th row of a 2-D tensor, `None` if out of bounds or not 2-D.
    pub fn row(&self, i: usize) -> Option<&[f32]> {
        let &[rows, dim] = self.shape.as_slice() else {
            return None;
        };

        (i < rows).then(|| &self.values[i * dim..(i + 1) * dim])
    }

    /// Adds `other` into this tensor element-wise.
    ///
    /// # Returns
    /// A `ShapeMismatch` error if the shapes differ.
    pub fn add(&mut self, other: &Tensor) -> Result<()> {
        self.check_shape(other)?;
        ops::add(&mut self.values, &other.values);
        Ok(())
    }

    /// Computes `self += alpha * other` element-wise.
    ///
    /// # Returns
    /// A `ShapeMismatch` error if the shapes differ.
    pub fn scaled_add(&mut self, alpha: f32, other: &Tensor) -> Result<()> {
        self.check_shape(other)?;
        ops::scaled_add(&mut self.values, alpha, &other.values);
        Ok(())
    }

    fn check_shape(&self, other: &Tensor) -> Result<()> {
        if self.shape != other.shape {
            return Err(PsErr::shape_mismatch("tensor", &self.shape, &other.shape));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_checks_shape() {
        let tensor = Tensor::new(vec![1., 2., 3., 4., 5., 6.], vec![2, 3]).unwrap();
        assert_eq!(tensor.len(), 6);
        assert_eq!(tensor.shape(), [2, 3]);

        let err = Tensor::new(vec![1., 2., 3.], vec![2, 2]).unwrap_err();
        assert!(matches!(err, PsErr::ShapeMismatch { .. }));
    }

    #[test]
    fn rows_of_a_matrix() {
        let tensor = Tensor::new(vec![1., 2., 3., 4.], vec![2, 2]).unwrap();
        assert_eq!(tensor.row(1), Some([3., 4.].as_slice()));
        assert_eq!(tensor.row(2), None);

        let flat = Tensor::new(vec![1., 2.], vec![2]).unwrap();
        assert_eq!(flat.row(0), None);
    }

    #[test]
    fn arithmetic_requires_matching_shapes() {
        let mut a = Tensor::new(vec![1., 2., 3., 4.], vec![2, 2]).unwrap();
        let b = Tensor::new(vec![1., 1., 1., 1.], vec![2, 2]).unwrap();
        let c = Tensor::new(vec![1., 1., 1., 1.], vec![4]).unwrap();

        a.add(&b).unwrap();
        assert_eq!(a.values(), [2., 3., 4., 5.]);

        a.scaled_add(-2., &b).unwrap();
        assert_eq!(a.values(), [0., 1., 2., 3.]);

        assert!(a.add(&c).is_err());
        assert_eq!(a.values(), [0., 1., 2., 3.]);
    }

    #[test]
    fn deserialization_validates_shape() {
        let ok: Tensor = serde_json::from_str(r#"{"values":[1,2],"shape":[1,2]}"#).unwrap();
        assert_eq!(ok.shape(), [1, 2]);

        let bad = serde_json::from_str::<Tensor>(r#"{"values":[1,2],"shape":[3]}"#);
        assert!(bad.is_err());
    }
}
