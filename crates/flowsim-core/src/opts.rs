//! This module defines the [`SimOpts`] configuration, which describes how a simulation paces
//! traffic and reacts to congestion.

use crate::{congestion::Algorithm, units::Millisecs};

/// How much traffic the simulation offers.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TrafficLoad {
    Light,
    #[default]
    Medium,
    Heavy,
}

impl TrafficLoad {
    /// Time between two packet generation attempts.
    pub fn generation_interval(&self) -> Millisecs {
        match self {
            TrafficLoad::Light => Millisecs::new(2_000),
            TrafficLoad::Medium => Millisecs::new(1_000),
            TrafficLoad::Heavy => Millisecs::new(300),
        }
    }

    /// Scales the congestion a successful send adds to each node on its path.
    pub fn congestion_multiplier(&self) -> f64 {
        match self {
            TrafficLoad::Light => 0.5,
            TrafficLoad::Medium => 1.0,
            TrafficLoad::Heavy => 2.0,
        }
    }

    /// Congestion drained from every node per decay tick.
    pub fn decay_rate(&self) -> f64 {
        match self {
            TrafficLoad::Heavy => 0.1,
            TrafficLoad::Light | TrafficLoad::Medium => 0.2,
        }
    }
}

impl std::fmt::Display for TrafficLoad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrafficLoad::Light => write!(f, "light"),
            TrafficLoad::Medium => write!(f, "medium"),
            TrafficLoad::Heavy => write!(f, "heavy"),
        }
    }
}

impl std::str::FromStr for TrafficLoad {
    type Err = ParseLoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(TrafficLoad::Light),
            "medium" => Ok(TrafficLoad::Medium),
            "heavy" => Ok(TrafficLoad::Heavy),
            _ => Err(ParseLoadError(s.to_owned())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown traffic load `{0}` (expected `light`, `medium` or `heavy`)")]
pub struct ParseLoadError(String);

/// Simulation options.
#[derive(Debug, Clone, typed_builder::TypedBuilder)]
pub struct SimOpts {
    /// Initial traffic load.
    #[builder(default)]
    pub traffic_load: TrafficLoad,
    /// Initial congestion control algorithm.
    #[builder(default)]
    pub algorithm: Algorithm,
    /// How long a node with packets in flight may go without an ACK.
    #[builder(default = Millisecs::new(2_000))]
    pub timeout_threshold: Millisecs,
    /// Period of the congestion decay tick.
    #[builder(default = Millisecs::new(500))]
    pub decay_period: Millisecs,
    /// Size of one packet in bits, used for throughput samples.
    #[builder(default = 1_500 * 8)]
    pub packet_size_bits: u64,
    /// Number of path records kept in the routing statistics.
    #[builder(default = 100)]
    pub routing_history_cap: usize,
    /// Number of latency/throughput points kept for reporting.
    #[builder(default = 50)]
    pub performance_history_cap: usize,
}

impl Default for SimOpts {
    fn default() -> Self {
        Self::builder().build()
    }
}
