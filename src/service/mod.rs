mod builder;
mod handle;
mod pserver;
mod specs;

pub use builder::ServerBuilder;
pub use handle::ServerHandle;
pub use pserver::ParameterServer;
pub use specs::{OptimizerSpec, ServerSpec};
