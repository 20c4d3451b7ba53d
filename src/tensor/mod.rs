mod dense;
pub mod ops;
mod slices;

pub use dense::Tensor;
pub use slices::IndexedSlices;
