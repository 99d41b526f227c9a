use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng,
};

use crate::{
    assert_interval,
    ds::NSet,
    error::{Error, Result},
};

use super::{Action, Mdp, Possible, State};

/// One possible outcome of an action
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub probability: f64,
    pub next: Vec<usize>,
    pub reward: f64,
}

/// A finite MDP given by explicit transition tables
///
/// Outcomes are stored per state-action pair in a table shaped like the action-value function,
/// and the start state is drawn from a weighted distribution.
///
/// ### Example
/// ```
/// # use tabular_rl::mdp::{FiniteMdp, Mdp};
/// # use rand::SeedableRng;
/// // state 0 has one action leading to the terminal state 1
/// let mut mdp = FiniteMdp::new(0.9, &[2], |ix| if ix[0] == 0 { 1 } else { 0 });
/// mdp.add_transition(&[0], 0, &[1], 1.0, 1.0).unwrap();
/// mdp.add_start(&[0], 1.0).unwrap();
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(0);
/// let s = mdp.started(&mut rng).unwrap();
/// let a = s.action(0).unwrap();
/// let outcome = a.sample(&mdp, &mut rng).unwrap();
/// assert!(outcome.next.is_terminal());
/// assert_eq!(outcome.reward, 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct FiniteMdp {
    gamma: f64,
    states: NSet<State>,
    transitions: NSet<Vec<Transition>>,
    start: Vec<(Vec<usize>, f64)>,
}

impl FiniteMdp {
    /// Lay out states in a rectangular set of shape `dim`, where the state at `index` has
    /// `n_actions(index)` actions
    ///
    /// **Panics** if `gamma` is not in the interval `[0,1]`
    pub fn new(gamma: f64, dim: &[usize], mut n_actions: impl FnMut(&[usize]) -> usize) -> Self {
        let states = NSet::new(dim, |ix| State::new(ix.to_vec(), n_actions(ix)));
        Self::from_states(gamma, states)
    }

    /// Use an already laid out (possibly jagged) state set
    ///
    /// Every state's own index must address it in `states`.
    ///
    /// **Panics** if `gamma` is not in the interval `[0,1]`
    pub fn from_states(gamma: f64, states: NSet<State>) -> Self {
        assert_interval!(gamma, 0.0, 1.0);
        let transitions = states.expand(|_, s| vec![s.n_actions()], |_| Vec::new());
        Self {
            gamma,
            states,
            transitions,
            start: Vec::new(),
        }
    }

    /// Add an outcome of taking action `slot` in `state`
    pub fn add_transition(
        &mut self,
        state: &[usize],
        slot: usize,
        next: &[usize],
        reward: f64,
        probability: f64,
    ) -> Result<()> {
        self.states.get(next)?;
        let mut index = state.to_vec();
        index.push(slot);
        self.transitions.get_mut(&index)?.push(Transition {
            probability,
            next: next.to_vec(),
            reward,
        });
        Ok(())
    }

    /// Add `state` to the start distribution with relative weight `weight`
    pub fn add_start(&mut self, state: &[usize], weight: f64) -> Result<()> {
        self.states.get(state)?;
        self.start.push((state.to_vec(), weight));
        Ok(())
    }

    pub fn state(&self, index: &[usize]) -> Result<&State> {
        Ok(self.states.get(index)?)
    }

    /// Outcomes recorded for `action`
    pub fn transitions(&self, action: &Action) -> Result<&[Transition]> {
        Ok(self.transitions.get(action.index())?.as_slice())
    }
}

impl Mdp for FiniteMdp {
    fn gamma(&self) -> f64 {
        self.gamma
    }

    fn states(&self) -> &NSet<State> {
        &self.states
    }

    fn started<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<State> {
        if self.start.is_empty() {
            return Err(Error::Empty("start distribution"));
        }
        let dist = WeightedIndex::new(self.start.iter().map(|(_, w)| *w))?;
        let (index, _) = &self.start[dist.sample(rng)];
        self.state(index).cloned()
    }

    fn sample<R: Rng + ?Sized>(&self, action: &Action, rng: &mut R) -> Result<Possible> {
        let outcomes = self.transitions(action)?;
        if outcomes.is_empty() {
            return Err(Error::NoTransitions(action.index().to_vec()));
        }
        let dist = WeightedIndex::new(outcomes.iter().map(|t| t.probability))?;
        let outcome = &outcomes[dist.sample(rng)];
        Ok(Possible {
            next: self.state(&outcome.next)?.clone(),
            reward: outcome.reward,
        })
    }
}
