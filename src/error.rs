use std::{
    error::Error,
    fmt::{self, Display},
};

use rand_distr::{NormalError, uniform::Error as UniformError};

/// The parameter server's result type.
pub type Result<T> = std::result::Result<T, PsErr>;

/// Failures reported while registering, reading or updating parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum PsErr {
    /// A dense gradient references a parameter the model doesn't hold.
    UnknownParameter { name: String },
    /// A sparse gradient or lookup references an unregistered embedding table.
    UnknownTable { name: String },
    /// A name is already registered as the other parameter kind.
    DuplicateTable { name: String },
    /// A tensor's shape doesn't match the one it's applied to.
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    /// Embedding tables only store `float32` rows.
    UnsupportedDtype { name: String, dtype: String },
    /// An initializer was configured with invalid distribution parameters.
    InvalidInitializer(String),
    /// A configuration document couldn't be parsed.
    InvalidConfig(String),
}

impl PsErr {
    pub(crate) fn shape_mismatch(name: &str, expected: &[usize], got: &[usize]) -> Self {
        Self::ShapeMismatch {
            name: name.to_string(),
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }
}

impl Display for PsErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PsErr::UnknownParameter { name } => write!(f, "unknown dense parameter `{name}`"),
            PsErr::UnknownTable { name } => write!(f, "unknown embedding table `{name}`"),
            PsErr::DuplicateTable { name } => write!(
                f,
                "`{name}` is already registered as a different kind of parameter"
            ),
            PsErr::ShapeMismatch {
                name,
                expected,
                got,
            } => write!(
                f,
                "shape mismatch for `{name}`: expected {expected:?}, got {got:?}"
            ),
            PsErr::UnsupportedDtype { name, dtype } => {
                write!(f, "embedding table `{name}` has unsupported dtype {dtype}")
            }
            PsErr::InvalidInitializer(e) => write!(f, "invalid initializer: {e}"),
            PsErr::InvalidConfig(e) => write!(f, "invalid configuration: {e}"),
        }
    }
}

impl Error for PsErr {}

impl From<NormalError> for PsErr {
    fn from(value: NormalError) -> Self {
        Self::InvalidInitializer(value.to_string())
    }
}

impl From<UniformError> for PsErr {
    fn from(value: UniformError) -> Self {
        Self::InvalidInitializer(value.to_string())
    }
}

impl From<serde_json::Error> for PsErr {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidConfig(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_parameter() {
        let err = PsErr::UnknownParameter { name: "t3".into() };
        assert_eq!(err.to_string(), "unknown dense parameter `t3`");

        let err = PsErr::shape_mismatch("t1", &[2, 3], &[2, 2]);
        assert_eq!(
            err.to_string(),
            "shape mismatch for `t1`: expected [2, 3], got [2, 2]"
        );
    }

    #[test]
    fn distribution_errors_become_invalid_initializer() {
        let err: PsErr = rand_distr::Normal::<f32>::new(0., f32::NAN)
            .unwrap_err()
            .into();
        assert!(matches!(err, PsErr::InvalidInitializer(_)));
    }
}
