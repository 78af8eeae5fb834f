//! Ready-made topologies.

use crate::{
    network::{NodeId, NodeKind},
    sampler::Sampler,
    sim::{Error, Simulation},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// `ROUTER1` in the middle of six PCs.
    Star,
    /// Six routers, every pair linked.
    Mesh,
    /// Eight routers in a cycle.
    Ring,
    /// `CLOUD1` over two routers, each over two switches, each over two PCs.
    Tree,
    /// Seven routers in a chain.
    Linear,
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Preset::Star,
        Preset::Mesh,
        Preset::Ring,
        Preset::Tree,
        Preset::Linear,
    ];
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Preset::Star => "star",
            Preset::Mesh => "mesh",
            Preset::Ring => "ring",
            Preset::Tree => "tree",
            Preset::Linear => "linear",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for Preset {
    type Err = ParsePresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|p| p.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParsePresetError(s.to_owned()))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown topology `{0}` (expected star, mesh, ring, tree or linear)")]
pub struct ParsePresetError(String);

impl<S: Sampler> Simulation<S> {
    /// Resets the simulation and builds `preset` in its place.
    pub fn load_preset(&mut self, preset: Preset) -> Result<(), Error> {
        self.reset();
        match preset {
            Preset::Star => {
                let router = self.add_node(NodeKind::Router);
                for _ in 0..6 {
                    let pc = self.add_node(NodeKind::Pc);
                    self.connect(router, pc)?;
                }
            }
            Preset::Mesh => {
                let routers = self.add_nodes(NodeKind::Router, 6);
                for (i, &a) in routers.iter().enumerate() {
                    for &b in &routers[i + 1..] {
                        self.connect(a, b)?;
                    }
                }
            }
            Preset::Ring => {
                let routers = self.add_nodes(NodeKind::Router, 8);
                for (i, &a) in routers.iter().enumerate() {
                    self.connect(a, routers[(i + 1) % routers.len()])?;
                }
            }
            Preset::Tree => {
                let cloud = self.add_node(NodeKind::Cloud);
                let routers = self.add_nodes(NodeKind::Router, 2);
                for &r in &routers {
                    self.connect(cloud, r)?;
                }
                let switches = self.add_nodes(NodeKind::Switch, 4);
                for (i, &s) in switches.iter().enumerate() {
                    self.connect(routers[i / 2], s)?;
                }
                for &s in &switches {
                    for _ in 0..2 {
                        let pc = self.add_node(NodeKind::Pc);
                        self.connect(s, pc)?;
                    }
                }
            }
            Preset::Linear => {
                let routers = self.add_nodes(NodeKind::Router, 7);
                for pair in routers.windows(2) {
                    self.connect(pair[0], pair[1])?;
                }
            }
        }
        log::info!(
            "{} topology created with {} nodes",
            preset,
            self.topology().nr_nodes()
        );
        Ok(())
    }

    fn add_nodes(&mut self, kind: NodeKind, n: usize) -> Vec<NodeId> {
        (0..n).map(|_| self.add_node(kind)).collect()
    }
}
