pub mod topology;
pub mod types;

pub use topology::{Error as TopologyError, Topology};
pub use types::*;
