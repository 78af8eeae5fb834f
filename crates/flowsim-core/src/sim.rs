//! The flow simulator: one engine context owning the topology, the event queue, in-flight packets
//! and statistics. Every mutation happens inside an event handler, one at a time, in virtual time
//! order.

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rustc_hash::FxHashMap;

use crate::{
    clock::Clock,
    congestion::{Algorithm, CongestionControl, TcpState},
    network::{Link, Node, NodeAttrs, NodeId, NodeKind, Packet, PacketId, Topology, TopologyError},
    opts::{SimOpts, TrafficLoad},
    routing::{Bfs, Dijkstra, Route, RoutingAlgo},
    sampler::Sampler,
    scheduler::{Event, EventQueue},
    stats::{PathRecord, PerformanceHistory, RoutingStats},
    units::Millisecs,
};

/// Congestion removed from every node on a path when its ACK arrives.
const ACK_RELIEF: f64 = 0.2;
/// Congestion added to a node whose sender timed out.
const TIMEOUT_PENALTY: f64 = 2.0;
/// Base congestion added to every node on a path when a packet is lost.
const LOSS_PENALTY: f64 = 0.5;

/// What a single generation attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Fewer than two nodes exist.
    TooFewNodes,
    /// The source already has a full window in flight.
    WindowFull { src: NodeId },
    /// The chosen pair is disconnected.
    NoPath { src: NodeId, dst: NodeId },
    /// The packet was dropped at `at`.
    Lost { route: Route, at: NodeId },
    /// The packet left and its ACK is scheduled.
    Sent { packet: PacketId },
}

#[derive(Debug)]
pub struct Simulation<S = StdRng> {
    topology: Topology,
    opts: SimOpts,
    sampler: S,
    queue: EventQueue,
    now: Millisecs,
    running: bool,
    // Recurring events armed before the last start/reset carry an older epoch and are dropped
    epoch: u64,
    packets: FxHashMap<PacketId, Packet>,
    next_packet: PacketId,
    routing_stats: RoutingStats,
    performance: PerformanceHistory,
    performance_start: Millisecs,
}

impl<S: Sampler> Simulation<S> {
    pub fn new(opts: SimOpts, sampler: S) -> Self {
        let routing_stats = RoutingStats::new(opts.routing_history_cap);
        let performance =
            PerformanceHistory::new(opts.performance_history_cap, opts.packet_size_bits);
        Self {
            topology: Topology::new(),
            opts,
            sampler,
            queue: EventQueue::new(),
            now: Millisecs::ZERO,
            running: false,
            epoch: 0,
            packets: FxHashMap::default(),
            next_packet: PacketId::ZERO,
            routing_stats,
            performance,
            performance_start: Millisecs::ZERO,
        }
    }

    /// Adds a node with randomly drawn latency and throughput.
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let attrs = self.sampler.node_attrs();
        self.add_node_with(kind, attrs)
    }

    pub fn add_node_with(&mut self, kind: NodeKind, attrs: NodeAttrs) -> NodeId {
        let id = self.topology.add_node(
            kind,
            attrs,
            self.opts.algorithm,
            self.now,
            self.opts.timeout_threshold,
        );
        debug!("added {} ({}, latency {})", id, kind, attrs.latency);
        id
    }

    pub fn connect(&mut self, a: NodeId, b: NodeId) -> Result<Link, Error> {
        Ok(self.topology.connect(a, b)?)
    }

    /// Removes every node, link and packet, cancels all pending events, clears statistics and
    /// stops the simulation. Traffic load and algorithm are kept.
    pub fn reset(&mut self) {
        self.topology.clear();
        self.queue.cancel_all();
        self.packets.clear();
        self.running = false;
        self.epoch += 1;
        self.routing_stats = RoutingStats::new(self.opts.routing_history_cap);
        self.performance =
            PerformanceHistory::new(self.opts.performance_history_cap, self.opts.packet_size_bits);
        self.performance_start = self.now;
        info!("network reset");
    }

    /// Takes effect the next time packet generation re-arms.
    pub fn set_traffic_load(&mut self, load: TrafficLoad) {
        self.opts.traffic_load = load;
        info!("traffic load set to {load}");
    }

    /// Gives every node a fresh congestion controller running `algorithm`.
    pub fn set_congestion_algorithm(&mut self, algorithm: Algorithm) {
        self.opts.algorithm = algorithm;
        for node in self.topology.nodes_mut() {
            node.control = CongestionControl::new(algorithm);
        }
        info!("congestion control set to TCP {algorithm}");
    }

    /// Arms packet generation and congestion decay. Has no effect if already running.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.epoch += 1;
        let epoch = self.epoch;
        self.queue.schedule(self.now, Event::Generate { epoch });
        self.queue.schedule(self.now, Event::Decay { epoch });
        info!("simulation started at {}", self.now);
    }

    /// Stops recurring events from re-arming. ACKs already scheduled still fire.
    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            info!("simulation paused at {}", self.now);
        }
    }

    /// Fires the earliest pending event, advancing virtual time to it.
    pub fn step(&mut self) -> Option<Event> {
        let scheduled = self.queue.pop_earliest()?;
        self.now = self.now.max(scheduled.time());
        let event = scheduled.into_event();
        self.dispatch(event);
        Some(event)
    }

    /// Fires every event due at or before `deadline`, then leaves the clock at `deadline`.
    pub fn run_until(&mut self, deadline: Millisecs) {
        while let Some(scheduled) = self.queue.pop_due(deadline) {
            self.now = self.now.max(scheduled.time());
            self.dispatch(scheduled.into_event());
        }
        self.now = self.now.max(deadline);
    }

    pub fn run_for(&mut self, duration: Millisecs) {
        self.run_until(self.now + duration);
    }

    /// Fires every event due by the clock's current reading.
    pub fn catch_up<C: Clock>(&mut self, clock: &C) {
        self.run_until(clock.now());
    }

    fn dispatch(&mut self, event: Event) {
        match event {
            Event::Generate { epoch } => self.on_generate(epoch),
            Event::Decay { epoch } => self.on_decay(epoch),
            Event::Ack { packet } => self.on_ack(packet),
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.running && epoch == self.epoch
    }

    fn on_generate(&mut self, epoch: u64) {
        if !self.is_current(epoch) {
            return;
        }
        let outcome = self.attempt_send();
        debug!("{}: {:?}", self.now, outcome);
        self.check_timeouts();
        let next = self.now + self.opts.traffic_load.generation_interval();
        self.queue.schedule(next, Event::Generate { epoch });
    }

    fn on_decay(&mut self, epoch: u64) {
        if !self.is_current(epoch) {
            return;
        }
        let rate = self.opts.traffic_load.decay_rate();
        for node in self.topology.nodes_mut() {
            node.ease_congestion(rate);
        }
        let next = self.now + self.opts.decay_period.max(Millisecs::ONE);
        self.queue.schedule(next, Event::Decay { epoch });
    }

    fn on_ack(&mut self, id: PacketId) {
        // Packets dropped by a reset have nothing left to acknowledge
        let Some(packet) = self.packets.remove(&id) else {
            return;
        };
        let now = self.now;
        if let Some(src) = self.topology.node_mut(packet.src) {
            src.control.on_ack_received();
            src.packets_in_flight = src.packets_in_flight.saturating_sub(1);
            src.last_ack_time = now;
        }
        for &hop in &packet.path {
            if let Some(node) = self.topology.node_mut(hop) {
                node.ease_congestion(ACK_RELIEF);
            }
        }
        debug!("{}: ack for {} ({} -> {})", now, id, packet.src, packet.dst);
    }

    /// Picks a random pair and tries to send one packet between them. This is the send half of a
    /// generation tick; it does not check timeouts or re-arm anything.
    pub fn attempt_send(&mut self) -> SendOutcome {
        let n = self.topology.nr_nodes();
        if n < 2 {
            return SendOutcome::TooFewNodes;
        }
        let (src, dst) = self.sampler.pick_pair(n);
        let (src, dst) = (NodeId::new(src), NodeId::new(dst));

        let window = match self.topology.node(src) {
            Some(node) if node.packets_in_flight < node.control.window_size() => {
                node.control.window_size()
            }
            _ => return SendOutcome::WindowFull { src },
        };
        let Some(route) = Dijkstra.route(&self.topology, src, dst) else {
            return SendOutcome::NoPath { src, dst };
        };

        let lost_at = route.path.iter().copied().find(|&hop| {
            let p = self.topology.node(hop).map_or(0.0, Node::loss_probability);
            self.sampler.chance() < p
        });

        let outcome = match lost_at {
            Some(at) => {
                self.on_loss(&route);
                SendOutcome::Lost {
                    route: route.clone(),
                    at,
                }
            }
            None => SendOutcome::Sent {
                packet: self.launch(src, dst, &route, window),
            },
        };
        // Lost sends are recorded too, with the latency the route would have had
        self.track_performance(route.latency, route.path.len());
        outcome
    }

    fn on_loss(&mut self, route: &Route) {
        let Some(src) = route.src().and_then(|id| self.topology.node_mut(id)) else {
            return;
        };
        src.control.on_duplicate_ack();
        let factor = match src.control.state() {
            TcpState::SlowStart => 0.5,
            TcpState::FastRecovery => 1.5,
            TcpState::CongestionAvoidance => 1.0,
        };
        for &hop in &route.path {
            if let Some(node) = self.topology.node_mut(hop) {
                node.raise_congestion(factor * LOSS_PENALTY);
            }
        }
    }

    fn launch(&mut self, src: NodeId, dst: NodeId, route: &Route, window: usize) -> PacketId {
        let id = self.next_packet;
        self.next_packet = id.next();
        let mut algorithm = self.opts.algorithm;
        if let Some(node) = self.topology.node_mut(src) {
            node.packets_in_flight += 1;
            node.control.record_send();
            algorithm = node.control.algorithm();
        }
        self.packets.insert(
            id,
            Packet {
                id,
                src,
                dst,
                path: route.path.clone(),
                hop_count: route.hop_count(),
                total_latency: route.latency,
                created: self.now,
                window,
                algorithm,
            },
        );
        self.queue
            .schedule(self.now + route.latency, Event::Ack { packet: id });

        let increase =
            (1.0 / window.max(1) as f64) * self.opts.traffic_load.congestion_multiplier();
        for &hop in &route.path {
            if let Some(node) = self.topology.node_mut(hop) {
                node.raise_congestion(increase);
            }
        }
        id
    }

    /// Resets the controller of every node that has waited too long for an ACK.
    pub fn check_timeouts(&mut self) {
        let now = self.now;
        for node in self.topology.nodes_mut() {
            if node.packets_in_flight > 0
                && now.saturating_sub(node.last_ack_time) > node.timeout_threshold
            {
                warn!(
                    "{}: {} timed out with {} packets in flight",
                    now, node.name, node.packets_in_flight
                );
                node.control.on_timeout();
                node.packets_in_flight = 0;
                node.last_ack_time = now;
                node.raise_congestion(TIMEOUT_PENALTY);
            }
        }
    }

    fn track_performance(&mut self, latency: Millisecs, path_len: usize) {
        let time = self.now.saturating_sub(self.performance_start);
        self.performance.record(time, latency);
        self.routing_stats.record(PathRecord::new(
            path_len.saturating_sub(1),
            latency,
            time,
        ));
    }

    fn check_selection(&self, src: NodeId, dst: NodeId) -> Result<(), Error> {
        let found = self.topology.nr_nodes();
        if found < 2 {
            return Err(Error::EmptyTopology { needed: 2, found });
        }
        for id in [src, dst] {
            if !self.topology.contains(id) {
                return Err(SelectionError::UnknownNode(id).into());
            }
        }
        if src == dst {
            return Err(SelectionError::SameNode(src).into());
        }
        Ok(())
    }

    /// The least-latency route from `src` to `dst`.
    pub fn shortest_path(&self, src: NodeId, dst: NodeId) -> Result<Route, Error> {
        self.check_selection(src, dst)?;
        Dijkstra
            .route(&self.topology, src, dst)
            .ok_or(Error::NoPathExists { src, dst })
    }

    /// Some path from `src` to `dst`, ignoring latency.
    pub fn find_path(&self, src: NodeId, dst: NodeId) -> Result<Vec<NodeId>, Error> {
        self.check_selection(src, dst)?;
        Bfs.find_path(&self.topology, src, dst)
            .ok_or(Error::NoPathExists { src, dst })
    }

    /// Active packets ordered by ID.
    pub fn list_active_packets(&self) -> Vec<&Packet> {
        let mut packets = self.packets.values().collect::<Vec<_>>();
        packets.sort_by_key(|p| p.id);
        packets
    }

    pub fn latency_history(&self) -> Vec<(Millisecs, Millisecs)> {
        self.performance.latencies()
    }

    pub fn throughput_history(&self) -> Vec<(Millisecs, f64)> {
        self.performance.throughputs()
    }

    pub fn performance(&self) -> &PerformanceHistory {
        &self.performance
    }

    pub fn routing_stats(&self) -> &RoutingStats {
        &self.routing_stats
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn now(&self) -> Millisecs {
        self.now
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn traffic_load(&self) -> TrafficLoad {
        self.opts.traffic_load
    }

    pub fn algorithm(&self) -> Algorithm {
        self.opts.algorithm
    }

    pub fn opts(&self) -> &SimOpts {
        &self.opts
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    delegate::delegate! {
        to self.topology {
            pub fn node(&self, id: NodeId) -> Option<&Node>;

            pub fn find_by_name(&self, name: &str) -> Option<&Node>;

            pub fn neighbors(&self, id: NodeId) -> Option<Vec<NodeId>>;

            #[call(nodes)]
            pub fn list_nodes(&self) -> impl Iterator<Item = &Node>;

            #[call(links)]
            pub fn list_links(&self) -> impl Iterator<Item = &Link>;

            pub fn nr_nodes(&self) -> usize;
        }
    }

    #[cfg(test)]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.topology.node_mut(id)
    }
}

/// Why a pair of nodes cannot be used.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("source and destination are both {0}")]
    SameNode(NodeId),

    #[error("node {0} does not exist")]
    UnknownNode(NodeId),
}

/// Engine error. None of these are fatal; the simulation keeps running.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no path exists from {src} to {dst}")]
    NoPathExists { src: NodeId, dst: NodeId },

    #[error("invalid selection")]
    InvalidSelection(#[from] SelectionError),

    #[error("operation needs at least {needed} nodes, found {found}")]
    EmptyTopology { needed: usize, found: usize },

    #[error("invalid topology change")]
    Topology(#[from] TopologyError),
}
