use std::collections::VecDeque;

use crate::{
    congestion::Algorithm,
    network::{NodeAttrs, NodeId, NodeKind, Topology},
    sampler::Sampler,
    sim::Simulation,
    units::{Mbps, Millisecs},
};

pub(crate) fn attrs(latency: u64) -> NodeAttrs {
    NodeAttrs::new(Millisecs::new(latency), Mbps::new(100))
}

pub(crate) fn add(topo: &mut Topology, kind: NodeKind, latency: u64) -> NodeId {
    topo.add_node(
        kind,
        attrs(latency),
        Algorithm::Reno,
        Millisecs::ZERO,
        Millisecs::new(2_000),
    )
}

/// Routers with the given latencies, linked in a chain.
pub(crate) fn line(latencies: &[u64]) -> (Topology, Vec<NodeId>) {
    let mut topo = Topology::new();
    let ids = latencies
        .iter()
        .map(|&l| add(&mut topo, NodeKind::Router, l))
        .collect::<Vec<_>>();
    for pair in ids.windows(2) {
        topo.connect(pair[0], pair[1]).unwrap();
    }
    (topo, ids)
}

/// `ROUTER1` (ID 0) with one PC per entry in `pcs`, each linked only to the router.
pub(crate) fn star(router: u64, pcs: &[u64]) -> (Topology, NodeId, Vec<NodeId>) {
    let mut topo = Topology::new();
    let r = add(&mut topo, NodeKind::Router, router);
    let pcs = pcs
        .iter()
        .map(|&l| {
            let pc = add(&mut topo, NodeKind::Pc, l);
            topo.connect(r, pc).unwrap();
            pc
        })
        .collect();
    (topo, r, pcs)
}

pub(crate) fn star_sim<S: Sampler>(
    router: u64,
    pcs: &[u64],
    sampler: S,
) -> (Simulation<S>, NodeId, Vec<NodeId>) {
    let mut sim = Simulation::new(Default::default(), sampler);
    let r = sim.add_node_with(NodeKind::Router, attrs(router));
    let pcs = pcs
        .iter()
        .map(|&l| {
            let pc = sim.add_node_with(NodeKind::Pc, attrs(l));
            sim.connect(r, pc).unwrap();
            pc
        })
        .collect();
    (sim, r, pcs)
}

/// A sampler that replays fixed decisions. Once the script runs out it picks `(0, 1)` and never
/// drops a packet.
#[derive(Debug, Default)]
pub(crate) struct Script {
    pairs: VecDeque<(usize, usize)>,
    chances: VecDeque<f64>,
}

impl Script {
    pub(crate) fn pairs(mut self, pairs: impl IntoIterator<Item = (usize, usize)>) -> Self {
        self.pairs.extend(pairs);
        self
    }

    pub(crate) fn chances(mut self, chances: impl IntoIterator<Item = f64>) -> Self {
        self.chances.extend(chances);
        self
    }
}

impl Sampler for Script {
    fn pick_pair(&mut self, _n: usize) -> (usize, usize) {
        self.pairs.pop_front().unwrap_or((0, 1))
    }

    fn chance(&mut self) -> f64 {
        self.chances.pop_front().unwrap_or(1.0)
    }

    fn node_attrs(&mut self) -> NodeAttrs {
        attrs(10)
    }
}
