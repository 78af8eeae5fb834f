//! TCP-style congestion control. Each node owns one [`CongestionControl`] which governs how many
//! packets it may have in flight when acting as a flow source.
//!
//! The model is a teaching approximation of Tahoe and Reno: windows are counted in packets,
//! duplicate ACKs are synthesized by the flow simulator whenever a send is lost, and there is no
//! retransmission of the lost packet itself.

use log::trace;

const INITIAL_CWND: f64 = 1.0;
const INITIAL_SSTHRESH: f64 = 64.0;
const MIN_SSTHRESH: f64 = 2.0;
const DUP_ACK_THRESHOLD: u32 = 3;

/// The congestion control variant run by every node.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum Algorithm {
    Tahoe,
    #[default]
    Reno,
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::Tahoe => write!(f, "Tahoe"),
            Algorithm::Reno => write!(f, "Reno"),
        }
    }
}

impl std::str::FromStr for Algorithm {
    type Err = ParseAlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tahoe" => Ok(Algorithm::Tahoe),
            "reno" => Ok(Algorithm::Reno),
            _ => Err(ParseAlgorithmError(s.to_owned())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown congestion control algorithm `{0}` (expected `tahoe` or `reno`)")]
pub struct ParseAlgorithmError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TcpState {
    SlowStart,
    CongestionAvoidance,
    /// Only reachable under Reno.
    FastRecovery,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CongestionControl {
    algorithm: Algorithm,
    cwnd: f64,
    ssthresh: f64,
    state: TcpState,
    duplicate_acks: u32,
    packets_sent: u64,
    packets_acked: u64,
}

impl CongestionControl {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            cwnd: INITIAL_CWND,
            ssthresh: INITIAL_SSTHRESH,
            state: TcpState::SlowStart,
            duplicate_acks: 0,
            packets_sent: 0,
            packets_acked: 0,
        }
    }

    /// The number of packets the owner may have in flight. Never less than one.
    pub fn window_size(&self) -> usize {
        self.cwnd.max(1.0).floor() as usize
    }

    pub fn on_ack_received(&mut self) {
        self.packets_acked += 1;
        self.duplicate_acks = 0;
        match self.state {
            TcpState::SlowStart => {
                self.cwnd += 1.0;
                if self.cwnd >= self.ssthresh {
                    self.state = TcpState::CongestionAvoidance;
                }
            }
            TcpState::CongestionAvoidance => {
                self.cwnd += 1.0 / self.cwnd;
            }
            TcpState::FastRecovery => {
                // Deflate back to the threshold picked at fast retransmit.
                self.cwnd = self.ssthresh;
                self.state = TcpState::CongestionAvoidance;
            }
        }
        trace!("{} ack: cwnd={:.2} state={:?}", self.algorithm, self.cwnd, self.state);
    }

    pub fn on_duplicate_ack(&mut self) {
        self.duplicate_acks += 1;
        match self.algorithm {
            Algorithm::Tahoe => {
                if self.duplicate_acks >= DUP_ACK_THRESHOLD {
                    self.on_timeout();
                }
            }
            Algorithm::Reno => {
                if self.duplicate_acks == DUP_ACK_THRESHOLD {
                    // Fast retransmit
                    self.ssthresh = self.halved_window();
                    self.cwnd = self.ssthresh + 3.0;
                    self.state = TcpState::FastRecovery;
                } else if self.state == TcpState::FastRecovery {
                    self.cwnd += 1.0;
                }
            }
        }
        trace!(
            "{} dup ack #{}: cwnd={:.2} state={:?}",
            self.algorithm,
            self.duplicate_acks,
            self.cwnd,
            self.state
        );
    }

    pub fn on_timeout(&mut self) {
        self.ssthresh = self.halved_window();
        self.cwnd = INITIAL_CWND;
        self.state = TcpState::SlowStart;
        self.duplicate_acks = 0;
    }

    pub(crate) fn record_send(&mut self) {
        self.packets_sent += 1;
    }

    fn halved_window(&self) -> f64 {
        (self.cwnd / 2.0).max(MIN_SSTHRESH)
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn cwnd(&self) -> f64 {
        self.cwnd
    }

    pub fn ssthresh(&self) -> f64 {
        self.ssthresh
    }

    pub fn state(&self) -> TcpState {
        self.state
    }

    pub fn duplicate_acks(&self) -> u32 {
        self.duplicate_acks
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    pub fn packets_acked(&self) -> u64 {
        self.packets_acked
    }
}
