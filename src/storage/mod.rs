mod embedding;
mod model;
mod rows;

pub use embedding::EmbeddingTable;
pub use model::{DEFAULT_SHARDS, DenseParam, Model};
pub use rows::RowShards;
