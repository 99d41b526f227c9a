use log::debug;
use rand::Rng;

use crate::{
    approx::ApproxQ,
    assert_interval,
    decay::{self, Decay},
    error::Result,
    exploration::EpsilonGreedy,
    mdp::{Mdp, Possible, State},
    tabular::{ActionValue, IndexedPolicy, Policy},
};

/// `Σ_a π(a|s)·q(s,a)`, which is `0` for a terminal state
pub fn expected_value<P, Q>(policy: &P, q: &Q, state: &State) -> Result<f64>
where
    P: Policy + ?Sized,
    Q: ActionValue + ?Sized,
{
    state
        .actions()
        .map(|a| -> Result<f64> { Ok(policy.prob(&a)? * q.action_value(state, &a)?) })
        .sum()
}

/// Configuration for the semi-gradient Expected Sarsa agents
#[derive(Debug, Clone)]
pub struct ExpectedSarsaConfig<D: Decay = decay::Constant> {
    pub exploration: EpsilonGreedy<D>,
    /// Weight step size α
    pub alpha: f64,
}

impl Default for ExpectedSarsaConfig {
    fn default() -> Self {
        Self {
            exploration: EpsilonGreedy::default(),
            alpha: 0.01,
        }
    }
}

/// Episodic semi-gradient Expected Sarsa
///
/// The behavior policy is made ε-greedy with respect to the approximator at every visited
/// state. The bootstrap target uses the policy's current row at the next state.
pub struct ExpectedSarsa<D: Decay = decay::Constant> {
    config: ExpectedSarsaConfig<D>,
    policy: IndexedPolicy,
    episode: usize,
}

impl<D: Decay> ExpectedSarsa<D> {
    /// **Panics** if `alpha` is not in the interval `[0,1]`
    pub fn new<M: Mdp + ?Sized>(mdp: &M, config: ExpectedSarsaConfig<D>) -> Result<Self> {
        assert_interval!(config.alpha, 0.0, 1.0);
        Ok(Self {
            config,
            policy: IndexedPolicy::uniform(mdp.states())?,
            episode: 0,
        })
    }

    /// Run one episode, updating `q` after every step
    pub fn go<M, Q, R>(&mut self, mdp: &M, q: &mut Q, rng: &mut R) -> Result<()>
    where
        M: Mdp + ?Sized,
        Q: ApproxQ + ?Sized,
        R: Rng + ?Sized,
    {
        let gamma = mdp.gamma();
        let mut s = mdp.started(rng)?;
        let mut steps = 0;
        while !s.is_terminal() {
            self.config
                .exploration
                .apply(&mut self.policy, &*q, &s, self.episode, rng)?;
            let a = self.policy.invoke(&s, rng)?;
            let Possible { next, reward } = a.sample(mdp, rng)?;

            let target = reward + gamma * expected_value(&self.policy, &*q, &next)?;
            let delta = target - q.action_value(&s, &a)?;
            let gradient = q.gradient(&s, &a)?;
            q.weights_mut().scaled_add(self.config.alpha * delta, &gradient);

            steps += 1;
            s = next;
        }
        debug!("steps={steps}");
        self.episode += 1;
        Ok(())
    }

    /// Run `episodes` episodes, calling `on_episode` with the episode index and the
    /// approximator after each one
    pub fn run<M, Q, R>(
        &mut self,
        mdp: &M,
        q: &mut Q,
        episodes: usize,
        rng: &mut R,
        mut on_episode: impl FnMut(usize, &Q),
    ) -> Result<()>
    where
        M: Mdp + ?Sized,
        Q: ApproxQ + ?Sized,
        R: Rng + ?Sized,
    {
        for episode in 0..episodes {
            debug!("{episode}/{episodes}");
            self.go(mdp, q, rng)?;
            on_episode(episode, q);
        }
        Ok(())
    }

    pub fn policy(&self) -> &IndexedPolicy {
        &self.policy
    }
}

/// Differential semi-gradient Expected Sarsa for continuing tasks
///
/// Learns the differential action values together with an estimate of the average reward
/// per step. There are no episodes: every call to [`step`](Self::step) continues from where
/// the previous one stopped, and ε is decayed by the step count. Reaching a terminal state is
/// an error.
pub struct AverageRewardExpectedSarsa<D: Decay = decay::Constant> {
    config: ExpectedSarsaConfig<D>,
    /// Average reward step size β
    beta: f64,
    policy: IndexedPolicy,
    state: Option<State>,
    average_reward: f64,
    steps: usize,
}

impl<D: Decay> AverageRewardExpectedSarsa<D> {
    /// **Panics** if `alpha` or `beta` is not in the interval `[0,1]`
    pub fn new<M>(mdp: &M, config: ExpectedSarsaConfig<D>, beta: f64) -> Result<Self>
    where
        M: Mdp + ?Sized,
    {
        assert_interval!(config.alpha, 0.0, 1.0);
        assert_interval!(beta, 0.0, 1.0);
        Ok(Self {
            config,
            beta,
            policy: IndexedPolicy::uniform(mdp.states())?,
            state: None,
            average_reward: 0.0,
            steps: 0,
        })
    }

    /// Take one action and update `q` and the average reward, returning the TD error
    pub fn step<M, Q, R>(&mut self, mdp: &M, q: &mut Q, rng: &mut R) -> Result<f64>
    where
        M: Mdp + ?Sized,
        Q: ApproxQ + ?Sized,
        R: Rng + ?Sized,
    {
        let s = match self.state.take() {
            Some(s) => s,
            None => mdp.started(rng)?,
        };
        self.config
            .exploration
            .apply(&mut self.policy, &*q, &s, self.steps, rng)?;
        let a = self.policy.invoke(&s, rng)?;
        let Possible { next, reward } = a.sample(mdp, rng)?;

        let expected = expected_value(&self.policy, &*q, &next)?;
        let delta = reward - self.average_reward + expected - q.action_value(&s, &a)?;
        let gradient = q.gradient(&s, &a)?;
        q.weights_mut().scaled_add(self.config.alpha * delta, &gradient);
        self.average_reward += self.beta * delta;

        self.state = Some(next);
        self.steps += 1;
        Ok(delta)
    }

    /// Step until `keep_going(steps, average_reward)` returns false
    pub fn run<M, Q, R>(
        &mut self,
        mdp: &M,
        q: &mut Q,
        rng: &mut R,
        mut keep_going: impl FnMut(usize, f64) -> bool,
    ) -> Result<()>
    where
        M: Mdp + ?Sized,
        Q: ApproxQ + ?Sized,
        R: Rng + ?Sized,
    {
        while keep_going(self.steps, self.average_reward) {
            self.step(mdp, q, rng)?;
        }
        debug!("steps={} average_reward={}", self.steps, self.average_reward);
        Ok(())
    }

    pub fn average_reward(&self) -> f64 {
        self.average_reward
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn policy(&self) -> &IndexedPolicy {
        &self.policy
    }
}
