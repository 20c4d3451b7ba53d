use std::{collections::HashMap, num::NonZeroUsize, sync::Arc};

use log::debug;
use parking_lot::RwLock;

use super::EmbeddingTable;
use crate::{
    error::{PsErr, Result},
    msg::{EmbeddingTableInfo, ModelMsg},
    tensor::Tensor,
};

/// The default amount of row partitions of every embedding table.
pub const DEFAULT_SHARDS: NonZeroUsize = NonZeroUsize::new(16).unwrap();

/// A dense parameter, locked independently from every other one.
pub type DenseParam = Arc<RwLock<Tensor>>;

/// The authoritative copy of the model's parameters.
///
/// Dense tensors and embedding tables live in separate maps and a name belongs to at most
/// one of them. Each dense tensor has its own lock and each table partitions its rows, so
/// updates to different parameters never wait on each other.
///
/// Whenever both maps are locked, `dense` is locked first.
#[derive(Debug)]
pub struct Model {
    dense: RwLock<HashMap<String, DenseParam>>,
    tables: RwLock<HashMap<String, Arc<EmbeddingTable>>>,
    shards: NonZeroUsize,
    seed: Option<u64>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    /// Creates a new empty `Model` with `DEFAULT_SHARDS` partitions per table.
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS, None)
    }

    /// Creates a new empty `Model`.
    ///
    /// # Arguments
    /// * `shards` - The amount of row partitions of every embedding table.
    /// * `seed` - An optional seed for the random initializers of the tables.
    pub fn with_shards(shards: NonZeroUsize, seed: Option<u64>) -> Self {
        Self {
            dense: RwLock::new(HashMap::new()),
            tables: RwLock::new(HashMap::new()),
            shards,
            seed,
        }
    }

    /// Inserts or replaces a dense parameter.
    ///
    /// # Returns
    /// A `DuplicateTable` error if `name` is already an embedding table.
    pub fn set_dense_parameter(&self, name: impl Into<String>, tensor: Tensor) -> Result<()> {
        let name = name.into();
        let mut dense = self.dense.write();

        if self.tables.read().contains_key(&name) {
            return Err(PsErr::DuplicateTable { name });
        }

        match dense.get(&name) {
            Some(param) => *param.write() = tensor,
            None => {
                dense.insert(name, Arc::new(RwLock::new(tensor)));
            }
        }

        Ok(())
    }

    /// Returns the dense parameter called `name`.
    ///
    /// # Returns
    /// An `UnknownParameter` error if there's no such dense parameter.
    pub fn dense_parameter(&self, name: &str) -> Result<DenseParam> {
        self.dense
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| PsErr::UnknownParameter {
                name: name.to_string(),
            })
    }

    /// Returns a copy of the values of the dense parameter called `name`.
    pub fn dense_values(&self, name: &str) -> Result<Vec<f32>> {
        Ok(self.dense_parameter(name)?.read().values().to_vec())
    }

    /// Returns the sorted names of every dense parameter.
    pub fn dense_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.dense.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Registers an embedding table.
    ///
    /// Registering an already known table with the same `dim` keeps it, rows included.
    ///
    /// # Returns
    /// A `DuplicateTable` error if `name` is already a dense parameter, a `ShapeMismatch`
    /// error if the table exists with a different `dim`, or any error from building the table.
    pub fn set_embedding_table_info(&self, info: &EmbeddingTableInfo) -> Result<()> {
        let dense = self.dense.read();
        let mut tables = self.tables.write();

        if dense.contains_key(&info.name) {
            return Err(PsErr::DuplicateTable {
                name: info.name.clone(),
            });
        }

        if let Some(table) = tables.get(&info.name) {
            if table.dim() != info.dim {
                return Err(PsErr::shape_mismatch(&info.name, &[table.dim()], &[info.dim]));
            }

            debug!(table = info.name.as_str(); "embedding table already registered");
            return Ok(());
        }

        let seed = self.seed.map(|seed| seed ^ name_salt(&info.name));
        let table = EmbeddingTable::new(info, self.shards, seed)?;
        tables.insert(info.name.clone(), Arc::new(table));

        debug!(table = info.name.as_str(), dim = info.dim; "registered embedding table");
        Ok(())
    }

    /// Returns the embedding table called `name`.
    ///
    /// # Returns
    /// An `UnknownTable` error if no such table was registered.
    pub fn get_embedding_table(&self, name: &str) -> Result<Arc<EmbeddingTable>> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| PsErr::UnknownTable {
                name: name.to_string(),
            })
    }

    /// Returns the metadata of every registered table, sorted by name.
    pub fn embedding_table_infos(&self) -> Vec<EmbeddingTableInfo> {
        let mut infos: Vec<_> = self.tables.read().values().map(|t| t.info()).collect();
        infos.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Seeds the model from a descriptor.
    ///
    /// Tables are registered first, then dense parameters are inserted and finally the
    /// rows carried as indexed slices are written into their tables.
    pub fn init_from_msg(&self, msg: &ModelMsg) -> Result<()> {
        for info in &msg.embedding_table_infos {
            self.set_embedding_table_info(info)?;
        }

        for (name, tensor) in &msg.dense_parameters {
            self.set_dense_parameter(name.clone(), tensor.clone())?;
        }

        for (name, slices) in &msg.indexed_slices {
            let table = self.get_embedding_table(name)?;
            table.set_embedding_vectors(slices.indices(), slices.values())?;
        }

        Ok(())
    }

    /// Copies every parameter into a `ModelMsg`.
    ///
    /// Each parameter is copied under its own lock, the snapshot isn't atomic across parameters.
    pub fn to_msg(&self) -> ModelMsg {
        let dense_parameters = self
            .dense
            .read()
            .iter()
            .map(|(name, param)| (name.clone(), param.read().clone()))
            .collect();

        let indexed_slices = self
            .tables
            .read()
            .iter()
            .map(|(name, table)| (name.clone(), table.to_indexed_slices()))
            .collect();

        ModelMsg {
            dense_parameters,
            indexed_slices,
            embedding_table_infos: self.embedding_table_infos(),
        }
    }
}

/// FNV-1a over the table name, so tables sharing a model seed draw different rows.
fn name_salt(name: &str) -> u64 {
    name.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ b as u64).wrapping_mul(0x0100_0000_01b3)
    })
}
