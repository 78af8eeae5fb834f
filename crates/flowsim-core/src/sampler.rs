//! Randomness consumed by the flow simulator.
//!
//! Every random decision goes through [`Sampler`], which is implemented for any [`rand::Rng`].
//! Seeding a `StdRng` makes a run reproducible; tests that need exact control over which pair is
//! chosen or which node drops a packet can supply their own implementation.

use rand::Rng;

use crate::network::NodeAttrs;

pub trait Sampler {
    /// Picks an ordered pair of distinct indices in `0..n`, uniformly. `n` must be at least 2.
    fn pick_pair(&mut self, n: usize) -> (usize, usize);

    /// Returns a uniform sample in [0, 1).
    fn chance(&mut self) -> f64;

    /// Draws the fixed attributes of a newly added node.
    fn node_attrs(&mut self) -> NodeAttrs;
}

impl<R: Rng> Sampler for R {
    fn pick_pair(&mut self, n: usize) -> (usize, usize) {
        debug_assert!(n >= 2, "need two nodes to pick a pair");
        let src = self.gen_range(0..n);
        // Skip over `src` so the destination is uniform among the others
        let mut dst = self.gen_range(0..n - 1);
        if dst >= src {
            dst += 1;
        }
        (src, dst)
    }

    fn chance(&mut self) -> f64 {
        self.gen::<f64>()
    }

    fn node_attrs(&mut self) -> NodeAttrs {
        NodeAttrs::sample(self)
    }
}
