use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::{
    ds::NSet,
    error::{Error, Result},
    mdp::{Action, Mdp, Possible, State},
};

/// K-armed bandit environment
///
/// A single decision state with K arms, each of which has a normal distribution of rewards,
/// followed by a terminal state. The goal is to learn which arm has the highest mean reward.
#[derive(Debug, Clone)]
pub struct KArmedBandit<const K: usize> {
    arms: [Normal<f64>; K],
    states: NSet<State>,
}

impl<const K: usize> KArmedBandit<K> {
    /// Initialize a new K-armed bandit, drawing each arm's mean from the standard normal
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let means: [f64; K] = std::array::from_fn(|_| rng.sample(rand_distr::StandardNormal));
        Self::with_means(means)
    }

    /// Initialize a bandit with known arm means and unit variance
    pub fn with_means(means: [f64; K]) -> Self {
        let arms = means.map(|mean| Normal::new(mean, 1.0).expect("unit variance is valid"));
        let states = NSet::from_vec(vec![State::new(vec![0], K), State::new(vec![1], 0)]);
        Self { arms, states }
    }

    pub fn means(&self) -> [f64; K] {
        self.arms.map(|arm| arm.mean())
    }
}

impl<const K: usize> Mdp for KArmedBandit<K> {
    fn gamma(&self) -> f64 {
        1.0
    }

    fn states(&self) -> &NSet<State> {
        &self.states
    }

    fn started<R: Rng + ?Sized>(&self, _rng: &mut R) -> Result<State> {
        Ok(self.states.get(&[0])?.clone())
    }

    fn sample<R: Rng + ?Sized>(&self, action: &Action, rng: &mut R) -> Result<Possible> {
        if action.state_index() != [0] {
            return Err(Error::NoTransitions(action.index().to_vec()));
        }
        let arm = self
            .arms
            .get(action.slot())
            .ok_or_else(|| Error::NoTransitions(action.index().to_vec()))?;
        Ok(Possible {
            next: self.states.get(&[1])?.clone(),
            reward: arm.sample(rng),
        })
    }
}
