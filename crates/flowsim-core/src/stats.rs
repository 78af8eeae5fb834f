//! Aggregate statistics recorded for every send attempt.

use std::collections::VecDeque;

use crate::units::Millisecs;

/// One recorded path: its hop count, its latency and when it was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_new::new, serde::Serialize)]
pub struct PathRecord {
    pub hops: usize,
    pub latency: Millisecs,
    pub time: Millisecs,
}

/// Process-wide routing statistics. The average is maintained incrementally.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RoutingStats {
    pub total_packets: u64,
    pub avg_hop_count: f64,
    /// `None` until the first record.
    pub min_hops: Option<usize>,
    pub max_hops: usize,
    history: VecDeque<PathRecord>,
    #[serde(skip)]
    cap: usize,
}

impl RoutingStats {
    pub fn new(cap: usize) -> Self {
        Self {
            total_packets: 0,
            avg_hop_count: 0.0,
            min_hops: None,
            max_hops: 0,
            history: VecDeque::with_capacity(cap),
            cap,
        }
    }

    pub fn record(&mut self, record: PathRecord) {
        self.total_packets += 1;
        let hops = record.hops;
        self.min_hops = Some(self.min_hops.map_or(hops, |m| m.min(hops)));
        self.max_hops = self.max_hops.max(hops);
        let n = self.total_packets as f64;
        self.avg_hop_count = (self.avg_hop_count * (n - 1.0) + hops as f64) / n;
        self.history.push_back(record);
        while self.history.len() > self.cap {
            self.history.pop_front();
        }
    }

    /// The most recent records, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &PathRecord> + '_ {
        self.history.iter()
    }
}

/// A point in the latency/throughput series.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PerfPoint {
    pub time: Millisecs,
    pub latency: Millisecs,
    /// Mbps
    pub throughput: f64,
}

/// Bounded latency and throughput series for external reporting.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PerformanceHistory {
    points: VecDeque<PerfPoint>,
    #[serde(skip)]
    cap: usize,
    #[serde(skip)]
    packet_size_bits: u64,
}

impl PerformanceHistory {
    pub fn new(cap: usize, packet_size_bits: u64) -> Self {
        Self {
            points: VecDeque::with_capacity(cap),
            cap,
            packet_size_bits,
        }
    }

    /// Records a latency sample taken at `time`. Throughput is one packet over the time since the
    /// previous sample; the first sample has zero throughput and a zero gap repeats the last one.
    pub fn record(&mut self, time: Millisecs, latency: Millisecs) {
        let throughput = match self.points.back() {
            None => 0.0,
            Some(prev) if time > prev.time => {
                let dt = time.saturating_sub(prev.time).into_secs_f64();
                self.packet_size_bits as f64 / (dt * 1_000_000.0)
            }
            Some(prev) => prev.throughput,
        };
        self.points.push_back(PerfPoint {
            time,
            latency,
            throughput,
        });
        while self.points.len() > self.cap {
            self.points.pop_front();
        }
    }

    pub fn points(&self) -> impl Iterator<Item = &PerfPoint> + '_ {
        self.points.iter()
    }

    pub fn latencies(&self) -> Vec<(Millisecs, Millisecs)> {
        self.points.iter().map(|p| (p.time, p.latency)).collect()
    }

    pub fn throughputs(&self) -> Vec<(Millisecs, f64)> {
        self.points.iter().map(|p| (p.time, p.throughput)).collect()
    }

    delegate::delegate! {
        to self.points {
            pub fn len(&self) -> usize;

            pub fn is_empty(&self) -> bool;
        }
    }
}
