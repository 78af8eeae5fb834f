//! Read-only summaries of a running simulation, meant for presentation layers.

use crate::{
    congestion::{Algorithm, TcpState},
    network::{CongestionLevel, NodeId, NodeKind},
    opts::TrafficLoad,
    routing::Route,
    sampler::Sampler,
    sim::{Error, Simulation},
    stats::RoutingStats,
    units::Millisecs,
};

/// Nodes above this congestion level are reported as congested.
pub const CONGESTED_ABOVE: f64 = 3.0;

#[derive(Debug, Clone, serde::Serialize)]
pub struct TcpSnapshot {
    pub node: NodeId,
    pub name: String,
    pub state: TcpState,
    pub window: usize,
    pub ssthresh: f64,
    pub packets_sent: u64,
    pub packets_acked: u64,
    pub in_flight: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct NetworkMetrics {
    pub nr_nodes: usize,
    pub nr_links: usize,
    pub active_packets: usize,
    /// Mean node latency, in milliseconds.
    pub avg_latency: f64,
    /// Mean node throughput, in Mbps.
    pub avg_throughput: f64,
    pub traffic_load: TrafficLoad,
    pub generation_interval: Millisecs,
    pub algorithm: Algorithm,
    pub congested: Vec<(String, f64)>,
    pub tcp: Vec<TcpSnapshot>,
    pub routing: RoutingStats,
}

/// How a route compares with the average hop count seen so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Comparison {
    Shorter,
    Longer,
    Equal,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct HopReport {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub latency: Millisecs,
    pub congestion: f64,
    pub level: CongestionLevel,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RouteAnalysis {
    pub route: Route,
    pub hops: Vec<HopReport>,
    pub avg_latency_per_hop: f64,
    pub network_avg_hops: f64,
    /// `None` until some traffic has been recorded.
    pub comparison: Option<Comparison>,
}

impl<S: Sampler> Simulation<S> {
    pub fn metrics(&self) -> Result<NetworkMetrics, Error> {
        let topo = self.topology();
        let nr_nodes = topo.nr_nodes();
        if nr_nodes == 0 {
            return Err(Error::EmptyTopology {
                needed: 1,
                found: 0,
            });
        }
        let avg_latency = topo.nodes().map(|n| n.latency.into_f64()).sum::<f64>() / nr_nodes as f64;
        let avg_throughput =
            topo.nodes().map(|n| n.throughput.into_f64()).sum::<f64>() / nr_nodes as f64;
        let congested = topo
            .nodes()
            .filter(|n| n.congestion() > CONGESTED_ABOVE)
            .map(|n| (n.name.clone(), n.congestion()))
            .collect();
        let tcp = topo
            .nodes()
            .map(|n| TcpSnapshot {
                node: n.id,
                name: n.name.clone(),
                state: n.control.state(),
                window: n.control.window_size(),
                ssthresh: n.control.ssthresh(),
                packets_sent: n.control.packets_sent(),
                packets_acked: n.control.packets_acked(),
                in_flight: n.packets_in_flight,
            })
            .collect();
        Ok(NetworkMetrics {
            nr_nodes,
            nr_links: topo.nr_links(),
            active_packets: self.list_active_packets().len(),
            avg_latency,
            avg_throughput,
            traffic_load: self.traffic_load(),
            generation_interval: self.traffic_load().generation_interval(),
            algorithm: self.algorithm(),
            congested,
            tcp,
            routing: self.routing_stats().clone(),
        })
    }

    /// Describes the shortest route between two nodes hop by hop.
    pub fn analyze_route(&self, src: NodeId, dst: NodeId) -> Result<RouteAnalysis, Error> {
        let route = self.shortest_path(src, dst)?;
        let hops = route
            .path
            .iter()
            .filter_map(|&id| self.node(id))
            .map(|n| HopReport {
                id: n.id,
                name: n.name.clone(),
                kind: n.kind,
                latency: n.latency,
                congestion: n.congestion(),
                level: n.congestion_level(),
            })
            .collect();
        let network_avg_hops = self.routing_stats().avg_hop_count;
        let comparison = (network_avg_hops > 0.0).then(|| {
            let hops = route.hop_count() as f64;
            if hops < network_avg_hops {
                Comparison::Shorter
            } else if hops > network_avg_hops {
                Comparison::Longer
            } else {
                Comparison::Equal
            }
        });
        Ok(RouteAnalysis {
            avg_latency_per_hop: route.avg_latency_per_hop(),
            route,
            hops,
            network_avg_hops,
            comparison,
        })
    }
}
