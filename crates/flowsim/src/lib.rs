//! `flowsim` is a discrete-event simulator of packet flows over a small network. Nodes carry a
//! latency, a throughput and a congestion level; packets follow least-latency routes, and every
//! sender paces itself with TCP Tahoe or Reno congestion control. The simulation is driven in
//! virtual time, so runs are reproducible given a seeded random source.

#![warn(unreachable_pub, missing_docs)]

pub mod core;
