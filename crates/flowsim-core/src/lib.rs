#![warn(unreachable_pub, missing_debug_implementations)]

//! The core flow simulation engine. A [`Simulation`] owns a [topology](network::Topology) of
//! nodes and links, routes packets over latency-weighted [shortest paths](routing::Dijkstra),
//! paces each sender with TCP-style [congestion control](congestion::CongestionControl) and
//! advances everything through a [discrete-event scheduler](scheduler::EventQueue) in virtual
//! time.

#[macro_use]
mod ident;

pub mod clock;
pub mod congestion;
pub mod network;
pub mod opts;
pub mod presets;
pub mod report;
pub mod routing;
pub mod sampler;
pub mod scheduler;
pub mod sim;
pub mod stats;
pub mod units;

#[cfg(test)]
pub(crate) mod testing;

pub use congestion::{Algorithm, CongestionControl, TcpState};
pub use network::{Link, Node, NodeId, NodeKind, Packet, PacketId, Topology, TopologyError};
pub use opts::{SimOpts, TrafficLoad};
pub use presets::Preset;
pub use routing::{Bfs, Dijkstra, Route, RoutingAlgo};
pub use sim::{Error, SelectionError, SendOutcome, Simulation};
