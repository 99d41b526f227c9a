use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng,
};

use crate::{
    ds::NSet,
    error::{Error, Result},
    mdp::{Action, State},
    util::argmax,
};

use super::QFunc;

/// A mapping from states to probability distributions over their actions
pub trait Policy {
    /// Sample an action to take in `state`
    fn invoke<R: Rng + ?Sized>(&self, state: &State, rng: &mut R) -> Result<Action>;

    /// Probability of taking `action` in its state
    fn prob(&self, action: &Action) -> Result<f64>;

    /// The most probable action in `state`
    fn greedy(&self, state: &State) -> Result<Action>;
}

/// A policy stored as a table of action probabilities
///
/// Control algorithms own one of these and rewrite a state's row as their estimates improve.
#[derive(Debug, Clone)]
pub struct IndexedPolicy {
    probs: QFunc<f64>,
}

impl IndexedPolicy {
    /// Every action of a state equally likely
    pub fn uniform(states: &NSet<State>) -> Result<Self> {
        let mut probs = QFunc::new(states, || 0.0);
        for s in states {
            let p = 1.0 / s.n_actions() as f64;
            for a in s.actions() {
                probs.set(&a, p)?;
            }
        }
        Ok(Self { probs })
    }

    pub fn set(&mut self, action: &Action, probability: f64) -> Result<()> {
        self.probs.set(action, probability)
    }

    pub fn table(&self) -> &QFunc<f64> {
        &self.probs
    }
}

impl Policy for IndexedPolicy {
    fn invoke<R: Rng + ?Sized>(&self, state: &State, rng: &mut R) -> Result<Action> {
        let mut actions = state.actions().collect::<Vec<_>>();
        if actions.is_empty() {
            return Err(Error::Empty("action set"));
        }
        let weights = actions
            .iter()
            .map(|a| self.prob(a))
            .collect::<Result<Vec<_>>>()?;
        let ix = WeightedIndex::new(weights)?.sample(rng);
        Ok(actions.swap_remove(ix))
    }

    fn prob(&self, action: &Action) -> Result<f64> {
        self.probs.get(action).copied()
    }

    fn greedy(&self, state: &State) -> Result<Action> {
        let probs = state
            .actions()
            .map(|a| self.prob(&a))
            .collect::<Result<Vec<_>>>()?;
        argmax(probs)
            .and_then(|ix| state.action(ix))
            .ok_or(Error::Empty("action set"))
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn states() -> NSet<State> {
        NSet::from_vec(vec![State::new(vec![0], 4), State::new(vec![1], 0)])
    }

    #[test]
    fn uniform_rows_sum_to_one() {
        let states = states();
        let pi = IndexedPolicy::uniform(&states).unwrap();
        let s = states.get(&[0]).unwrap();
        let total: f64 = s.actions().map(|a| pi.prob(&a).unwrap()).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn deterministic_policy_always_picks_its_action() {
        let mut rng = StdRng::seed_from_u64(5);
        let states = states();
        let s = states.get(&[0]).unwrap();
        let mut pi = IndexedPolicy::uniform(&states).unwrap();
        for a in s.actions() {
            pi.set(&a, if a.slot() == 2 { 1.0 } else { 0.0 }).unwrap();
        }

        for _ in 0..20 {
            assert_eq!(pi.invoke(s, &mut rng).unwrap().slot(), 2);
        }
        assert_eq!(pi.greedy(s).unwrap().slot(), 2);
    }

    #[test]
    fn terminal_state_cannot_act() {
        let mut rng = StdRng::seed_from_u64(0);
        let states = states();
        let pi = IndexedPolicy::uniform(&states).unwrap();
        let terminal = states.get(&[1]).unwrap();
        assert!(matches!(pi.invoke(terminal, &mut rng), Err(Error::Empty(_))));
        assert!(matches!(pi.greedy(terminal), Err(Error::Empty(_))));
    }
}
