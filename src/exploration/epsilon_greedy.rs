use rand::{seq::SliceRandom, Rng};

use crate::{
    assert_interval,
    decay::{self, Decay},
    error::{Error, Result},
    mdp::State,
    tabular::{ActionValue, IndexedPolicy},
    util::argmax,
};

/// How to choose the greedy action when several actions share the maximal value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TieBreak {
    /// The first maximal action in slot order
    #[default]
    First,
    /// A maximal action chosen uniformly at random
    Random,
}

/// Rewrite `state`'s row of `policy` to be ε-greedy with respect to `q`
///
/// The greedy action gets probability `1 - ε + ε/n` and every other action `ε/n`, where `n` is
/// the number of actions in `state`. Terminal states are left untouched.
pub fn apply_epsilon_greedy<Q, R>(
    policy: &mut IndexedPolicy,
    q: &Q,
    state: &State,
    epsilon: f64,
    tie_break: TieBreak,
    rng: &mut R,
) -> Result<()>
where
    Q: ActionValue + ?Sized,
    R: Rng + ?Sized,
{
    if state.is_terminal() {
        return Ok(());
    }
    let actions = state.actions().collect::<Vec<_>>();
    let values = actions
        .iter()
        .map(|a| q.action_value(state, a))
        .collect::<Result<Vec<_>>>()?;

    let greedy = match tie_break {
        TieBreak::First => argmax(values.iter().copied()),
        TieBreak::Random => {
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let ties = (0..values.len())
                .filter(|&i| values[i] == max)
                .collect::<Vec<_>>();
            ties.choose(rng).copied()
        }
    }
    .ok_or(Error::Empty("action set"))?;

    let n = actions.len() as f64;
    for (i, action) in actions.iter().enumerate() {
        let p = if i == greedy {
            1.0 - epsilon + epsilon / n
        } else {
            epsilon / n
        };
        policy.set(action, p)?;
    }
    Ok(())
}

/// Epsilon greedy exploration policy with time-decaying epsilon threshold
#[derive(Debug, Clone)]
pub struct EpsilonGreedy<D: Decay> {
    epsilon: D,
    tie_break: TieBreak,
}

impl Default for EpsilonGreedy<decay::Constant> {
    fn default() -> Self {
        Self::new(decay::Constant::new(0.1))
    }
}

impl<D: Decay> EpsilonGreedy<D> {
    /// Initialize epsilon greedy policy with a decay strategy
    pub fn new(decay: D) -> Self {
        Self {
            epsilon: decay,
            tie_break: TieBreak::First,
        }
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Epsilon for the given episode
    ///
    /// **Panics** if the decay strategy leaves the interval `[0,1]`
    pub fn epsilon(&self, episode: usize) -> f64 {
        let epsilon = self.epsilon.evaluate(episode as f64);
        assert_interval!(epsilon, 0.0, 1.0);
        epsilon
    }

    /// Make `state`'s row of `policy` epsilon greedy with respect to `q` for the given episode
    pub fn apply<Q, R>(
        &self,
        policy: &mut IndexedPolicy,
        q: &Q,
        state: &State,
        episode: usize,
        rng: &mut R,
    ) -> Result<()>
    where
        Q: ActionValue + ?Sized,
        R: Rng + ?Sized,
    {
        apply_epsilon_greedy(policy, q, state, self.epsilon(episode), self.tie_break, rng)
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{
        ds::NSet,
        tabular::{Policy, QFunc},
    };

    fn setup() -> (NSet<State>, QFunc<f64>, IndexedPolicy) {
        let states = NSet::from_vec(vec![State::new(vec![0], 4)]);
        let q = QFunc::new(&states, || 0.0);
        let pi = IndexedPolicy::uniform(&states).unwrap();
        (states, q, pi)
    }

    #[test]
    fn greedy_action_gets_the_bulk() {
        let mut rng = StdRng::seed_from_u64(0);
        let (states, mut q, mut pi) = setup();
        let s = states.get(&[0]).unwrap();
        q.set(&s.action(2).unwrap(), 1.0).unwrap();

        apply_epsilon_greedy(&mut pi, &q, s, 0.2, TieBreak::First, &mut rng).unwrap();
        let probs = s.actions().map(|a| pi.prob(&a).unwrap()).collect::<Vec<_>>();
        assert_float_eq!(probs, vec![0.05, 0.05, 0.85, 0.05], abs_all <= 1e-12);
    }

    #[test]
    fn first_tie_break_is_stable() {
        let mut rng = StdRng::seed_from_u64(0);
        let (states, q, mut pi) = setup();
        let s = states.get(&[0]).unwrap();
        apply_epsilon_greedy(&mut pi, &q, s, 0.0, TieBreak::First, &mut rng).unwrap();
        assert_eq!(pi.greedy(s).unwrap().slot(), 0, "all tied, first wins");
    }

    #[test]
    fn random_tie_break_spreads_over_maxima() {
        let mut rng = StdRng::seed_from_u64(11);
        let (states, mut q, mut pi) = setup();
        let s = states.get(&[0]).unwrap();
        q.set(&s.action(0).unwrap(), -1.0).unwrap();

        let mut chosen = [0; 4];
        for _ in 0..300 {
            apply_epsilon_greedy(&mut pi, &q, s, 0.0, TieBreak::Random, &mut rng).unwrap();
            chosen[pi.greedy(s).unwrap().slot()] += 1;
        }
        assert_eq!(chosen[0], 0, "dominated action never greedy");
        assert!(chosen[1..].iter().all(|&c| c > 0), "every tied action gets picked");
    }

    #[test]
    fn decaying_epsilon() {
        let exploration = EpsilonGreedy::new(decay::Linear::new(0.1, 1.0, 0.0).unwrap());
        assert_eq!(exploration.epsilon(0), 1.0);
        assert_float_eq!(exploration.epsilon(5), 0.5, abs <= 1e-12);
        assert_eq!(exploration.epsilon(50), 0.0);
    }
}
