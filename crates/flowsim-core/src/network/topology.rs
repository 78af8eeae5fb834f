use petgraph::{
    graph::{NodeIndex, UnGraph},
    visit::EdgeRef,
};

use crate::{
    congestion::Algorithm,
    network::types::{Link, Node, NodeAttrs, NodeId, NodeKind},
    units::Millisecs,
};

/// The network graph. Nodes live in an arena and are never removed individually, so a node's
/// [`NodeId`] is always its arena index. Adjacency is kept by the graph as index lists.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub(crate) graph: UnGraph<Node, ()>,
    pub(crate) links: Vec<Link>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node and returns its ID. The node is named after its kind and the number of nodes
    /// of that kind already present, e.g. the third PC is `PC3`.
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        attrs: NodeAttrs,
        algorithm: Algorithm,
        now: Millisecs,
        timeout_threshold: Millisecs,
    ) -> NodeId {
        let id = NodeId::new(self.graph.node_count());
        let nr_same_kind = self.graph.node_weights().filter(|n| n.kind == kind).count();
        let name = format!("{}{}", kind.label(), nr_same_kind + 1);
        let node = Node::new(id, kind, name, attrs, algorithm, now, timeout_threshold);
        let idx = self.graph.add_node(node);
        debug_assert_eq!(idx.index(), id.inner());
        id
    }

    /// Links `a` and `b` in both directions at once.
    ///
    /// Correctness properties:
    ///
    /// - A node cannot be linked to itself.
    /// - Both endpoints must already exist.
    /// - For any two nodes, there is at most one link between them.
    pub fn connect(&mut self, a: NodeId, b: NodeId) -> Result<Link, Error> {
        if a == b {
            return Err(Error::NodeAdjacentSelf(a));
        }
        let i = self.idx_of(a).ok_or(Error::UndeclaredNode(a))?;
        let j = self.idx_of(b).ok_or(Error::UndeclaredNode(b))?;
        if self.graph.find_edge(i, j).is_some() {
            return Err(Error::DuplicateLink { n1: a, n2: b });
        }
        self.graph.add_edge(i, j, ());
        let link = Link::new(a, b);
        self.links.push(link);
        Ok(link)
    }

    /// Returns the neighbors of `id` in the order their links were made, or `None` if `id` is
    /// unknown.
    pub fn neighbors(&self, id: NodeId) -> Option<Vec<NodeId>> {
        self.contains(id).then(|| self.neighbor_ids(id).collect())
    }

    pub(crate) fn neighbor_ids(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        // petgraph walks adjacency newest first; edge indices restore link order
        let mut edges = self
            .idx_of(id)
            .into_iter()
            .flat_map(|idx| self.graph.edges(idx))
            .map(|e| {
                let other = if e.source().index() == id.inner() {
                    e.target()
                } else {
                    e.source()
                };
                (e.id(), self.graph[other].id)
            })
            .collect::<Vec<_>>();
        edges.sort_by_key(|&(edge, _)| edge);
        edges.into_iter().map(|(_, n)| n)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.idx_of(id).map(|idx| &self.graph[idx])
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.idx_of(id).map(|idx| &mut self.graph[idx])
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Node> {
        self.graph.node_weights().find(|n| n.name == name)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.idx_of(id).is_some()
    }

    /// Removes every node and link.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.links.clear();
    }

    /// The graph index backing `id`. Does not check that the node exists.
    pub(crate) fn index(id: NodeId) -> NodeIndex {
        NodeIndex::new(id.inner())
    }

    fn idx_of(&self, id: NodeId) -> Option<NodeIndex> {
        (id.inner() < self.graph.node_count()).then(|| Self::index(id))
    }

    delegate::delegate! {
        to self.graph {
            #[call(node_weights)]
            pub fn nodes(&self) -> impl Iterator<Item = &Node>;

            #[call(node_weights_mut)]
            pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node>;

            #[call(node_count)]
            pub fn nr_nodes(&self) -> usize;
        }

        to self.links {
            #[call(iter)]
            pub fn links(&self) -> impl Iterator<Item = &Link>;

            #[call(len)]
            pub fn nr_links(&self) -> usize;
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Node {0} is connected to itself")]
    NodeAdjacentSelf(NodeId),

    #[error("Node {0} is not declared")]
    UndeclaredNode(NodeId),

    #[error("Duplicate links between {n1} and {n2}")]
    DuplicateLink { n1: NodeId, n2: NodeId },
}
