use rand::Rng;

use crate::{
    ds::NSet,
    error::{Error, Result},
};

mod finite;

pub use finite::{FiniteMdp, Transition};

/// A state of a finite MDP, identified by its index in the MDP's state set
///
/// A state with no actions is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct State {
    index: Vec<usize>,
    n_actions: usize,
}

impl State {
    pub fn new(index: Vec<usize>, n_actions: usize) -> Self {
        Self { index, n_actions }
    }

    /// Index of this state in [`Mdp::states`], also the prefix of every state-action index
    pub fn index(&self) -> &[usize] {
        &self.index
    }

    pub fn n_actions(&self) -> usize {
        self.n_actions
    }

    pub fn is_terminal(&self) -> bool {
        self.n_actions == 0
    }

    /// The actions available in this state, in slot order
    pub fn actions(&self) -> impl ExactSizeIterator<Item = Action> + '_ {
        (0..self.n_actions).map(|slot| Action::new(self, slot))
    }

    pub fn action(&self, slot: usize) -> Option<Action> {
        (slot < self.n_actions).then(|| Action::new(self, slot))
    }

    /// Pick one of this state's actions uniformly at random
    ///
    /// **Errors** if the state is terminal
    pub fn random_action<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Action> {
        if self.is_terminal() {
            return Err(Error::Empty("action set"));
        }
        Ok(Action::new(self, rng.gen_range(0..self.n_actions)))
    }
}

/// An action bound to a state
///
/// Its index is the state's index followed by the action's slot, which addresses the action's
/// cell in every state-action table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Action {
    index: Vec<usize>,
}

impl Action {
    fn new(state: &State, slot: usize) -> Self {
        let mut index = Vec::with_capacity(state.index.len() + 1);
        index.extend_from_slice(&state.index);
        index.push(slot);
        Self { index }
    }

    /// Full state-action index
    pub fn index(&self) -> &[usize] {
        &self.index
    }

    /// Index of the state this action belongs to
    pub fn state_index(&self) -> &[usize] {
        &self.index[..self.index.len() - 1]
    }

    /// Position of this action among its state's actions
    pub fn slot(&self) -> usize {
        self.index[self.index.len() - 1]
    }

    /// Draw one outcome of taking this action in `mdp`
    pub fn sample<M, R>(&self, mdp: &M, rng: &mut R) -> Result<Possible>
    where
        M: Mdp + ?Sized,
        R: Rng + ?Sized,
    {
        mdp.sample(self, rng)
    }
}

/// One sampled transition outcome
#[derive(Debug, Clone, PartialEq)]
pub struct Possible {
    pub next: State,
    pub reward: f64,
}

/// A finite Markov decision process
///
/// The state set is laid out in an [`NSet`] so that value tables can be built with the same
/// shape. Sampling must not depend on any state other than the action being taken.
pub trait Mdp {
    /// Discount factor γ
    fn gamma(&self) -> f64;

    /// Every state of the process, for full sweeps
    fn states(&self) -> &NSet<State>;

    /// Draw an initial state
    fn started<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<State>;

    /// Draw the outcome of taking `action`
    fn sample<R: Rng + ?Sized>(&self, action: &Action, rng: &mut R) -> Result<Possible>;
}
