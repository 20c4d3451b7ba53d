mod constant;
mod random;
mod row_gen;

use serde::{Deserialize, Serialize};

pub use constant::ConstRowGen;
pub use random::RandRowGen;
pub use row_gen::RowGen;

use crate::error::Result;

/// The specification for the `RowGen` of an embedding table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Initializer {
    #[default]
    Zero,
    Constant {
        value: f32,
    },
    Uniform {
        low: f32,
        high: f32,
    },
    Normal {
        mean: f32,
        std_dev: f32,
    },
}

impl Initializer {
    /// Resolves this specification into a row generator.
    ///
    /// # Arguments
    /// * `seed` - An optional seed for random initializers.
    ///
    /// # Returns
    /// The row generator or an `InvalidInitializer` error if the distribution parameters are invalid.
    pub fn build(self, seed: Option<u64>) -> Result<Box<dyn RowGen>> {
        let row_gen: Box<dyn RowGen> = match self {
            Initializer::Zero => Box::new(ConstRowGen::zero()),
            Initializer::Constant { value } => Box::new(ConstRowGen::new(value)),
            Initializer::Uniform { low, high } => Box::new(RandRowGen::uniform(seed, low, high)?),
            Initializer::Normal { mean, std_dev } => {
                Box::new(RandRowGen::normal(seed, mean, std_dev)?)
            }
        };

        Ok(row_gen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_the_default() {
        let init: Initializer = serde_json::from_str(r#""zero""#).unwrap();
        assert_eq!(init, Initializer::default());

        let mut row = [3.; 2];
        init.build(None).unwrap().fill(&mut row);
        assert_eq!(row, [0.; 2]);
    }

    #[test]
    fn parses_parameterized_initializers() {
        let init: Initializer = serde_json::from_str(r#"{"uniform":{"low":-1,"high":1}}"#).unwrap();
        assert_eq!(init, Initializer::Uniform { low: -1., high: 1. });

        let init: Initializer = serde_json::from_str(r#"{"constant":{"value":0.25}}"#).unwrap();
        let mut row = [0.; 3];
        init.build(None).unwrap().fill(&mut row);
        assert_eq!(row, [0.25; 3]);
    }

    #[test]
    fn invalid_distribution_fails_to_build() {
        let init = Initializer::Uniform { low: 1., high: 0. };
        assert!(init.build(Some(1)).is_err());
    }
}
