use rand::Rng;

use crate::congestion::{Algorithm, CongestionControl};
use crate::units::{Mbps, Millisecs};

/// Upper bound on a node's congestion level.
pub const CONGESTION_MAX: f64 = 10.0;

/// Advisory buffer size carried by every node. Nothing enforces it.
pub const MAX_BUFFER_SIZE: usize = 10;

identifier!(NodeId, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum NodeKind {
    Cloud,
    Router,
    Switch,
    Pc,
}

impl NodeKind {
    /// The prefix used to name nodes of this kind.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Cloud => "CLOUD",
            NodeKind::Router => "ROUTER",
            NodeKind::Switch => "SWITCH",
            NodeKind::Pc => "PC",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label().to_lowercase())
    }
}

impl std::str::FromStr for NodeKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cloud" => Ok(NodeKind::Cloud),
            "router" => Ok(NodeKind::Router),
            "switch" => Ok(NodeKind::Switch),
            "pc" => Ok(NodeKind::Pc),
            _ => Err(ParseKindError(s.to_owned())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown node kind `{0}`")]
pub struct ParseKindError(String);

/// Fixed per-node attributes chosen at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_new::new, serde::Serialize)]
pub struct NodeAttrs {
    pub latency: Millisecs,
    pub throughput: Mbps,
}

impl NodeAttrs {
    /// Draws a latency in [5, 50] ms and a throughput in [100, 1000] Mbps.
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            latency: Millisecs::new(rng.gen_range(5..=50)),
            throughput: Mbps::new(rng.gen_range(100..=1000)),
        }
    }
}

/// Coarse congestion bands, used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum CongestionLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub latency: Millisecs,
    pub throughput: Mbps,
    pub(crate) congestion: f64,
    pub packets_in_flight: usize,
    pub last_ack_time: Millisecs,
    pub timeout_threshold: Millisecs,
    pub max_buffer_size: usize,
    pub control: CongestionControl,
}

impl Node {
    pub(crate) fn new(
        id: NodeId,
        kind: NodeKind,
        name: String,
        attrs: NodeAttrs,
        algorithm: Algorithm,
        now: Millisecs,
        timeout_threshold: Millisecs,
    ) -> Self {
        Self {
            id,
            kind,
            name,
            latency: attrs.latency,
            throughput: attrs.throughput,
            congestion: 0.0,
            packets_in_flight: 0,
            last_ack_time: now,
            timeout_threshold,
            max_buffer_size: MAX_BUFFER_SIZE,
            control: CongestionControl::new(algorithm),
        }
    }

    pub fn congestion(&self) -> f64 {
        self.congestion
    }

    /// Adds `amount` to the congestion level, capped at [`CONGESTION_MAX`].
    pub fn raise_congestion(&mut self, amount: f64) {
        self.congestion = (self.congestion + amount).clamp(0.0, CONGESTION_MAX);
    }

    /// Removes `amount` from the congestion level, floored at zero.
    pub fn ease_congestion(&mut self, amount: f64) {
        self.congestion = (self.congestion - amount).clamp(0.0, CONGESTION_MAX);
    }

    /// Probability that a packet crossing this node is dropped.
    pub fn loss_probability(&self) -> f64 {
        (self.congestion * 0.03).min(0.3)
    }

    pub fn congestion_level(&self) -> CongestionLevel {
        match self.congestion {
            c if c <= 1.0 => CongestionLevel::Low,
            c if c <= 3.0 => CongestionLevel::Medium,
            c if c <= 5.0 => CongestionLevel::High,
            _ => CongestionLevel::Critical,
        }
    }
}

/// An undirected link between two nodes. Links carry no weight of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_new::new, serde::Serialize)]
pub struct Link {
    pub a: NodeId,
    pub b: NodeId,
}

impl Link {
    pub fn connects(&self, x: NodeId, y: NodeId) -> bool {
        self.a == x && self.b == y || self.a == y && self.b == x
    }
}

identifier!(PacketId, u64);

/// A packet that was sent successfully and has not yet been acknowledged.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Packet {
    pub id: PacketId,
    pub src: NodeId,
    pub dst: NodeId,
    pub path: Vec<NodeId>,
    pub hop_count: usize,
    pub total_latency: Millisecs,
    pub created: Millisecs,
    /// The sender's window when the packet left.
    pub window: usize,
    pub algorithm: Algorithm,
}

impl Packet {
    /// Fraction of the journey completed at `now`, in [0, 1].
    pub fn progress(&self, now: Millisecs) -> f64 {
        if self.total_latency == Millisecs::ZERO {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.created).into_f64();
        (elapsed / self.total_latency.into_f64()).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> Node {
        Node::new(
            NodeId::ZERO,
            NodeKind::Router,
            "ROUTER1".to_owned(),
            NodeAttrs::new(Millisecs::new(10), Mbps::new(100)),
            Algorithm::Reno,
            Millisecs::ZERO,
            Millisecs::new(2_000),
        )
    }

    #[test]
    fn congestion_stays_in_bounds() {
        let mut n = node();
        for _ in 0..30 {
            n.raise_congestion(0.75);
            assert!(n.congestion() <= CONGESTION_MAX);
        }
        assert_eq!(n.congestion(), CONGESTION_MAX);
        for _ in 0..100 {
            n.ease_congestion(0.2);
            assert!(n.congestion() >= 0.0);
        }
        assert_eq!(n.congestion(), 0.0);
    }

    #[test]
    fn loss_probability_is_capped() {
        let mut n = node();
        assert_eq!(n.loss_probability(), 0.0);
        n.raise_congestion(5.0);
        assert!((n.loss_probability() - 0.15).abs() < 1e-9);
        n.raise_congestion(5.0);
        assert!((n.loss_probability() - 0.3).abs() < 1e-9);
        n.raise_congestion(5.0);
        assert!(n.loss_probability() <= 0.3);
    }

    #[test]
    fn congestion_levels_follow_bands() {
        let mut n = node();
        assert_eq!(n.congestion_level(), CongestionLevel::Low);
        n.raise_congestion(2.0);
        assert_eq!(n.congestion_level(), CongestionLevel::Medium);
        n.raise_congestion(2.5);
        assert_eq!(n.congestion_level(), CongestionLevel::High);
        n.raise_congestion(1.0);
        assert_eq!(n.congestion_level(), CongestionLevel::Critical);
    }

    #[test]
    fn sampled_attributes_are_in_range() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let attrs = NodeAttrs::sample(&mut rng);
            assert!((5..=50).contains(&attrs.latency.into_u64()));
            assert!((100..=1000).contains(&attrs.throughput.into_u64()));
        }
    }

    #[test]
    fn packet_progress_is_bounded() {
        let packet = Packet {
            id: PacketId::ZERO,
            src: NodeId::new(0),
            dst: NodeId::new(1),
            path: vec![NodeId::new(0), NodeId::new(1)],
            hop_count: 1,
            total_latency: Millisecs::new(40),
            created: Millisecs::new(100),
            window: 1,
            algorithm: Algorithm::Reno,
        };
        assert_eq!(packet.progress(Millisecs::new(50)), 0.0);
        assert_eq!(packet.progress(Millisecs::new(120)), 0.5);
        assert_eq!(packet.progress(Millisecs::new(500)), 1.0);
    }

    #[test]
    fn kinds_parse_case_insensitively() {
        assert_eq!("PC".parse::<NodeKind>().unwrap(), NodeKind::Pc);
        assert_eq!("Router".parse::<NodeKind>().unwrap(), NodeKind::Router);
        assert!("modem".parse::<NodeKind>().is_err());
    }
}
