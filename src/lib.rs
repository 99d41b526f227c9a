//! Tabular and model-based reinforcement learning over finite MDPs
//!
//! Value tables are laid out in [`ds::NSet`], a jagged N-dimensional container addressed by
//! state and state-action indices, so any MDP whose states fit a (possibly ragged) grid can be
//! solved without hashing.

/// Implemented RL algorithms
pub mod algo;

/// Linear action-value approximation
pub mod approx;

/// Implementations of strategies for time-decaying hyperparameters
pub mod decay;

/// Data structures
pub mod ds;

/// Crate errors
pub mod error;

/// Exploration policies
pub mod exploration;

/// Testing environments
pub mod gym;

/// Finite Markov decision processes
pub mod mdp;

/// Value tables and policies
pub mod tabular;

mod util;

pub use error::{Error, Result};
