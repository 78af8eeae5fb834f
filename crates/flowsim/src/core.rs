//! Core flowsim data structures and routines. The most common entry point is
//! [`Simulation`], usually populated with [`Simulation::load_preset`] and then driven with
//! [`Simulation::run_for`].

pub use flowsim_core::*;
