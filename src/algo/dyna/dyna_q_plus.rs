use log::debug;
use rand::Rng;

use crate::{
    algo::{LearningRate, Listener, OptimalSolution},
    decay::{self, Decay},
    ds::DefaultBuf,
    error::{Error, Result},
    exploration::EpsilonGreedy,
    mdp::{Action, Mdp, Possible, State},
    tabular::{v_from_q, IndexedPolicy, Policy, QFunc, VFunc},
};

use super::q_learning_update;

/// Last observed outcome of a state-action pair
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEntry {
    pub next: State,
    pub reward: f64,
    /// Global step at which the outcome was observed
    pub time: u64,
}

/// Configuration for the [`DynaQPlus`] agent
#[derive(Debug, Clone)]
pub struct DynaQPlusConfig<D: Decay = decay::Constant> {
    pub exploration: EpsilonGreedy<D>,
    pub alpha: LearningRate,
    /// Weight of the `κ·sqrt(τ)` bonus for pairs not tried in `τ` steps
    pub kappa: f64,
    /// Planning updates per real step
    pub n: usize,
}

impl Default for DynaQPlusConfig {
    fn default() -> Self {
        Self {
            exploration: EpsilonGreedy::default(),
            alpha: |_, _| 0.1,
            kappa: 1e-3,
            n: 10,
        }
    }
}

/// Dyna-Q+ agent
///
/// Tabular Q-learning on real experience, plus `n` simulated updates per step replayed from a
/// deterministic model of the last observed outcomes. Simulated rewards carry an exploration
/// bonus that grows with the time since the pair was last tried for real.
///
/// Actions never tried in a visited state are modeled as a zero-reward self-loop first seen at
/// time `1`, so they accumulate a bonus from the start.
pub struct DynaQPlus<D: Decay = decay::Constant> {
    config: DynaQPlusConfig<D>,
    policy: IndexedPolicy,
    q: QFunc<f64>,
    v: VFunc<f64>,
    model: QFunc<Option<ModelEntry>>,
    replay: DefaultBuf<(State, Action)>,
    time: u64,
    episode: usize,
}

impl<D: Decay> DynaQPlus<D> {
    /// Initialize a new `DynaQPlus` agent for `mdp`
    pub fn new<M: Mdp + ?Sized>(mdp: &M, config: DynaQPlusConfig<D>) -> Result<Self> {
        let states = mdp.states();
        let q = QFunc::new(states, || 0.0);
        Ok(Self {
            config,
            policy: IndexedPolicy::uniform(states)?,
            v: VFunc::new(states, || 0.0),
            model: QFunc::copy_shape(&q, |_| None),
            replay: DefaultBuf::with_capacity(q.table().len()),
            q,
            time: 0,
            episode: 0,
        })
    }

    /// Run one episode from a freshly started state until it terminates
    pub fn go<M, R, L>(&mut self, mdp: &M, rng: &mut R, listener: &mut L) -> Result<()>
    where
        M: Mdp + ?Sized,
        R: Rng + ?Sized,
        L: Listener + ?Sized,
    {
        let gamma = mdp.gamma();
        let mut s = mdp.started(rng)?;
        let mut steps = 0;
        while !s.is_terminal() {
            v_from_q(mdp.states(), &self.q, &mut self.v)?;
            listener.on_step(&self.v, &s);
            self.time += 1;
            steps += 1;

            self.config
                .exploration
                .apply(&mut self.policy, &self.q, &s, self.episode, rng)?;
            let a = self.policy.invoke(&s, rng)?;
            let Possible { next, reward } = a.sample(mdp, rng)?;
            let alpha = (self.config.alpha)(&s, &a);
            q_learning_update(&mut self.q, &a, alpha, reward, gamma, &next)?;

            for other in s.actions().filter(|other| *other != a) {
                if self.model.get(&other)?.is_none() {
                    self.replay.append((s.clone(), other.clone()));
                    let entry = ModelEntry {
                        next: s.clone(),
                        reward: 0.0,
                        time: 1,
                    };
                    self.model.set(&other, Some(entry))?;
                }
            }
            if self.model.get(&a)?.is_none() {
                self.replay.append((s.clone(), a.clone()));
            }
            let entry = ModelEntry {
                next: next.clone(),
                reward,
                time: self.time,
            };
            self.model.set(&a, Some(entry))?;

            for _ in 0..self.config.n {
                self.plan(gamma, rng)?;
            }
            s = next;
        }
        listener.on_episode(self.episode, &self.v);
        debug!("steps={steps}");
        self.episode += 1;
        Ok(())
    }

    /// Run `episodes` episodes
    pub fn run<M, R, L>(
        &mut self,
        mdp: &M,
        episodes: usize,
        rng: &mut R,
        listener: &mut L,
    ) -> Result<()>
    where
        M: Mdp + ?Sized,
        R: Rng + ?Sized,
        L: Listener + ?Sized,
    {
        for episode in 0..episodes {
            debug!("{episode}/{episodes}");
            self.go(mdp, rng, listener)?;
        }
        Ok(())
    }

    /// One simulated backup of a previously observed pair
    fn plan<R: Rng + ?Sized>(&mut self, gamma: f64, rng: &mut R) -> Result<()> {
        let (s, a) = self.replay.rand(rng)?.clone();
        let ModelEntry { next, reward, time } = self
            .model
            .get(&a)?
            .clone()
            .ok_or(Error::Empty("model"))?;
        let bonus = self.config.kappa * (self.time.saturating_sub(time) as f64).sqrt();
        let alpha = (self.config.alpha)(&s, &a);
        q_learning_update(&mut self.q, &a, alpha, reward + bonus, gamma, &next)
    }

    pub fn q(&self) -> &QFunc<f64> {
        &self.q
    }

    pub fn model(&self) -> &QFunc<Option<ModelEntry>> {
        &self.model
    }

    /// Every state-action pair the model has an entry for, in first-modeled order
    pub fn replay(&self) -> &DefaultBuf<(State, Action)> {
        &self.replay
    }

    /// Snapshot of the current policy and value estimates
    pub fn solution(&self) -> OptimalSolution {
        OptimalSolution {
            policy: self.policy.clone(),
            v: self.v.clone(),
            q: self.q.clone(),
        }
    }

    pub fn into_solution(self) -> OptimalSolution {
        OptimalSolution {
            policy: self.policy,
            v: self.v,
            q: self.q,
        }
    }
}
