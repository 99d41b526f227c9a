use rand::distributions::WeightedError;
use thiserror::Error;

use crate::decay::DecayError;

/// Failure to address a cell of an [`NSet`](crate::ds::NSet)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// Fewer index components remain than the rank of the node being addressed
    #[error("index has {remaining} remaining components but the node has rank {rank}")]
    Rank { remaining: usize, rank: usize },

    /// A component lies outside `[0, extent)` for its axis
    #[error("index[{axis}] = {index} is out of bounds for extent {extent}")]
    OutOfBounds {
        axis: usize,
        index: usize,
        extent: usize,
    },

    /// The index continues past a leaf
    #[error("index continues past a leaf at depth {depth}")]
    TooDeep { depth: usize },

    /// The index stops at a nested node instead of a leaf
    #[error("index addresses a nested node, not a leaf")]
    NotALeaf,
}

/// Crate error type
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Index(#[from] IndexError),

    /// A random draw or reduction was attempted on an empty collection
    #[error("cannot draw from an empty {0}")]
    Empty(&'static str),

    /// Probability weights could not form a distribution
    #[error("invalid weights: {0}")]
    Weights(#[from] WeightedError),

    /// An action of a finite MDP has no outcome to sample
    #[error("action {0:?} has no transitions")]
    NoTransitions(Vec<usize>),

    #[error(transparent)]
    Decay(#[from] DecayError),
}

pub type Result<T> = std::result::Result<T, Error>;
