use crate::{
    mdp::{Action, State},
    tabular::{IndexedPolicy, QFunc, VFunc},
};

pub mod dyna;
pub mod func_approx;
pub mod mc;

pub use dyna::{DynaQPlus, DynaQPlusConfig, PrioritizedSweeping, PrioritizedSweepingConfig};
pub use func_approx::{AverageRewardExpectedSarsa, ExpectedSarsa, ExpectedSarsaConfig};
pub use mc::ExploringStarts;

/// A learning rate α(s, a)
pub type LearningRate = fn(&State, &Action) -> f64;

/// The learned `(π, V, Q)` triple
#[derive(Debug, Clone)]
pub struct OptimalSolution {
    pub policy: IndexedPolicy,
    pub v: VFunc<f64>,
    pub q: QFunc<f64>,
}

/// Observer of a tabular control run
///
/// Both hooks default to doing nothing, and `()` ignores everything.
pub trait Listener {
    /// Called before every environment step with the freshly recomputed value table
    fn on_step(&mut self, _v: &VFunc<f64>, _state: &State) {}

    /// Called once per completed episode
    fn on_episode(&mut self, _episode: usize, _v: &VFunc<f64>) {}
}

impl Listener for () {}
