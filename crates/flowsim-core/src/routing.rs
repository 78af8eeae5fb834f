//! This module defines how paths are found through a [`Topology`].
//!
//! Two searches are provided. [`Dijkstra`] finds the path with the least total latency, where
//! leaving a node costs that node's latency. [`Bfs`] finds *a* path, the first one discovered by
//! a breadth-first search, and ignores latency entirely.

use std::collections::VecDeque;

use petgraph::visit::{VisitMap, Visitable};

use crate::{
    network::{topology::Topology, types::NodeId},
    units::Millisecs,
};

/// The trait implemented by all routing algorithms.
pub trait RoutingAlgo {
    /// Returns a route from `src` to `dst`, or `None` if the nodes are unknown or disconnected.
    fn route(&self, topology: &Topology, src: NodeId, dst: NodeId) -> Option<Route>;
}

impl<R: RoutingAlgo> RoutingAlgo for &R {
    fn route(&self, topology: &Topology, src: NodeId, dst: NodeId) -> Option<Route> {
        (*self).route(topology, src, dst)
    }
}

/// An ordered sequence of nodes together with the latency of traversing it.
#[derive(Debug, Clone, PartialEq, Eq, derive_new::new, serde::Serialize)]
pub struct Route {
    pub path: Vec<NodeId>,
    pub latency: Millisecs,
}

impl Route {
    /// Builds a route over `path`, charging the latency of every node except the last.
    pub fn through(topology: &Topology, path: Vec<NodeId>) -> Self {
        let latency = path_latency(topology, &path);
        Self { path, latency }
    }

    pub fn hop_count(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    pub fn avg_latency_per_hop(&self) -> f64 {
        match self.hop_count() {
            0 => 0.0,
            hops => self.latency.into_f64() / hops as f64,
        }
    }

    pub fn src(&self) -> Option<NodeId> {
        self.path.first().copied()
    }

    pub fn dst(&self) -> Option<NodeId> {
        self.path.last().copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.path.contains(&id)
    }
}

/// Sum of node latencies along `path`, excluding the destination.
pub fn path_latency(topology: &Topology, path: &[NodeId]) -> Millisecs {
    let Some((_, upstream)) = path.split_last() else {
        return Millisecs::ZERO;
    };
    upstream
        .iter()
        .filter_map(|&id| topology.node(id))
        .map(|n| n.latency)
        .sum()
}

/// Latency-weighted shortest paths. Selection scans every unvisited node (O(V²)), breaking ties
/// in favor of the smallest node ID so results are reproducible.
#[derive(Debug, Default, Clone, Copy)]
pub struct Dijkstra;

impl RoutingAlgo for Dijkstra {
    fn route(&self, topology: &Topology, src: NodeId, dst: NodeId) -> Option<Route> {
        if !topology.contains(src) || !topology.contains(dst) {
            return None;
        }
        let n = topology.nr_nodes();
        let mut distances: Vec<Option<Millisecs>> = vec![None; n];
        let mut previous: Vec<Option<NodeId>> = vec![None; n];
        let mut visited = vec![false; n];
        distances[src.inner()] = Some(Millisecs::ZERO);

        loop {
            // Unreached nodes have no distance and are never selected
            let (current, dist) = (0..n)
                .filter(|&i| !visited[i])
                .filter_map(|i| distances[i].map(|d| (i, d)))
                .min_by_key(|&(i, d)| (d, i))?;
            let current = NodeId::new(current);
            if current == dst {
                let mut path = vec![dst];
                let mut cur = dst;
                while let Some(prev) = previous[cur.inner()] {
                    path.push(prev);
                    cur = prev;
                }
                path.reverse();
                return Some(Route::new(path, dist));
            }
            visited[current.inner()] = true;
            let cost = topology.node(current)?.latency;
            for succ in topology.neighbor_ids(current) {
                if visited[succ.inner()] {
                    continue;
                }
                let alt = dist + cost;
                if distances[succ.inner()].map_or(true, |d| alt < d) {
                    distances[succ.inner()] = Some(alt);
                    previous[succ.inner()] = Some(current);
                }
            }
        }
    }
}

/// Unweighted reachability search. Returns the first path found, which depends on the order
/// neighbors are enqueued; among paths of equal length it is not necessarily the fastest.
#[derive(Debug, Default, Clone, Copy)]
pub struct Bfs;

impl Bfs {
    /// Returns the node sequence of the first path discovered from `src` to `dst`.
    pub fn find_path(&self, topology: &Topology, src: NodeId, dst: NodeId) -> Option<Vec<NodeId>> {
        if !topology.contains(src) || !topology.contains(dst) {
            return None;
        }
        let g = &topology.graph;
        let mut discovered = g.visit_map();
        discovered.visit(Topology::index(src));

        let mut queue = VecDeque::new();
        queue.push_back(vec![src]);
        while let Some(path) = queue.pop_front() {
            let &last = path.last()?;
            if last == dst {
                return Some(path);
            }
            for succ in topology.neighbor_ids(last) {
                if discovered.visit(Topology::index(succ)) {
                    let mut next = path.clone();
                    next.push(succ);
                    queue.push_back(next);
                }
            }
        }
        None
    }
}

impl RoutingAlgo for Bfs {
    fn route(&self, topology: &Topology, src: NodeId, dst: NodeId) -> Option<Route> {
        self.find_path(topology, src, dst)
            .map(|path| Route::through(topology, path))
    }
}

#[cfg(test)]
mod tests {
    use rand::prelude::*;

    use super::*;
    use crate::{network::types::NodeKind, testing};

    #[test]
    fn star_routes_through_the_router() -> anyhow::Result<()> {
        let (topo, router, pcs) = testing::star(12, &[7, 9, 11, 13, 15, 17]);
        let route = Dijkstra
            .route(&topo, pcs[0], pcs[3])
            .ok_or_else(|| anyhow::anyhow!("no route"))?;
        let names = route
            .path
            .iter()
            .filter_map(|&id| topo.node(id))
            .map(|n| n.name.as_str())
            .collect::<Vec<_>>();
        insta::assert_yaml_snapshot!(names, @r###"
        - PC1
        - ROUTER1
        - PC4
        "###);
        assert_eq!(route.path, vec![pcs[0], router, pcs[3]]);
        assert_eq!(route.latency, Millisecs::new(12 + 7));
        assert_eq!(route.hop_count(), 2);
        Ok(())
    }

    #[test]
    fn dijkstra_prefers_low_latency_over_few_hops() -> anyhow::Result<()> {
        // 0 - 1 - 3 is two hops but slow; 0 - 2 - 4 - 3 is three hops and fast.
        let mut topo = Topology::new();
        let lat = [5, 50, 5, 5, 5];
        let ids = lat
            .iter()
            .map(|&l| testing::add(&mut topo, NodeKind::Router, l))
            .collect::<Vec<_>>();
        topo.connect(ids[0], ids[1])?;
        topo.connect(ids[1], ids[3])?;
        topo.connect(ids[0], ids[2])?;
        topo.connect(ids[2], ids[4])?;
        topo.connect(ids[4], ids[3])?;

        let fastest = Dijkstra.route(&topo, ids[0], ids[3]).unwrap();
        assert_eq!(fastest.path, vec![ids[0], ids[2], ids[4], ids[3]]);
        assert_eq!(fastest.latency, Millisecs::new(15));

        let any = Bfs.find_path(&topo, ids[0], ids[3]).unwrap();
        assert_eq!(any.len(), 3, "BFS returns the fewest-hop path");
        assert_eq!(any, vec![ids[0], ids[1], ids[3]]);
        assert_eq!(Route::through(&topo, any).latency, Millisecs::new(55));
        Ok(())
    }

    #[test]
    fn equal_cost_ties_pick_smallest_id() -> anyhow::Result<()> {
        // Diamond: 0 -> {1, 2} -> 3 with identical latencies.
        let mut topo = Topology::new();
        let ids = (0..4)
            .map(|_| testing::add(&mut topo, NodeKind::Router, 10))
            .collect::<Vec<_>>();
        topo.connect(ids[0], ids[2])?;
        topo.connect(ids[0], ids[1])?;
        topo.connect(ids[2], ids[3])?;
        topo.connect(ids[1], ids[3])?;
        for _ in 0..5 {
            let route = Dijkstra.route(&topo, ids[0], ids[3]).unwrap();
            assert_eq!(route.path, vec![ids[0], ids[1], ids[3]]);
        }
        Ok(())
    }

    #[test]
    fn bfs_takes_the_first_linked_branch() -> anyhow::Result<()> {
        // Diamond: 0 -> {2, 1} -> 3, with the link to 2 made first.
        let mut topo = Topology::new();
        let ids = (0..4)
            .map(|_| testing::add(&mut topo, NodeKind::Router, 10))
            .collect::<Vec<_>>();
        topo.connect(ids[0], ids[2])?;
        topo.connect(ids[0], ids[1])?;
        topo.connect(ids[1], ids[3])?;
        topo.connect(ids[2], ids[3])?;
        let path = Bfs.find_path(&topo, ids[0], ids[3]);
        assert_eq!(path, Some(vec![ids[0], ids[2], ids[3]]));
        assert_eq!(Bfs.find_path(&topo, ids[3], ids[3]), Some(vec![ids[3]]));
        Ok(())
    }

    #[test]
    fn disconnected_pair_has_no_path() {
        let mut topo = Topology::new();
        let a = testing::add(&mut topo, NodeKind::Pc, 10);
        let b = testing::add(&mut topo, NodeKind::Pc, 10);
        assert!(Dijkstra.route(&topo, a, b).is_none());
        assert!(Bfs.find_path(&topo, a, b).is_none());
        assert!(Bfs.route(&topo, a, b).is_none());
    }

    #[test]
    fn unknown_nodes_have_no_path() {
        let (topo, ids) = testing::line(&[10, 10]);
        assert!(Dijkstra.route(&topo, ids[0], NodeId::new(9)).is_none());
        assert!(Bfs.find_path(&topo, NodeId::new(9), ids[0]).is_none());
    }

    #[test]
    fn route_to_self_is_trivial() {
        let (topo, ids) = testing::line(&[10, 20]);
        let route = Dijkstra.route(&topo, ids[1], ids[1]).unwrap();
        assert_eq!(route.path, vec![ids[1]]);
        assert_eq!(route.latency, Millisecs::ZERO);
        assert_eq!(route.hop_count(), 0);
    }

    #[test]
    fn random_graphs_agree_with_bfs_reachability() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let nr_nodes = rng.gen_range(2..12);
            let mut topo = Topology::new();
            let ids = (0..nr_nodes)
                .map(|_| testing::add(&mut topo, NodeKind::Router, rng.gen_range(5..=50)))
                .collect::<Vec<_>>();
            for _ in 0..rng.gen_range(0..nr_nodes * 2) {
                let a = *ids.choose(&mut rng).unwrap();
                let b = *ids.choose(&mut rng).unwrap();
                let _ = topo.connect(a, b);
            }
            for &a in &ids {
                for &b in &ids {
                    let shortest = Dijkstra.route(&topo, a, b);
                    let reachable = Bfs.find_path(&topo, a, b);
                    assert_eq!(shortest.is_some(), reachable.is_some());
                    if let Some(route) = shortest {
                        assert_eq!(route.latency, path_latency(&topo, &route.path));
                        assert_eq!(route.src(), Some(a));
                        assert_eq!(route.dst(), Some(b));
                        let bfs_route = Route::through(&topo, reachable.unwrap());
                        assert!(route.latency <= bfs_route.latency);
                    }
                }
            }
        }
    }
}
