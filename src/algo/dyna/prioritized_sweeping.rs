use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet, BinaryHeap},
};

use log::{debug, trace};
use ordered_float::OrderedFloat;
use rand::Rng;

use crate::{
    algo::{LearningRate, Listener, OptimalSolution},
    decay::{self, Decay},
    error::{Error, Result},
    exploration::{EpsilonGreedy, TieBreak},
    mdp::{Action, Mdp, Possible, State},
    tabular::{max_action_value, v_from_q, IndexedPolicy, Policy, QFunc, VFunc},
};

use super::q_learning_update;

/// Configuration for the [`PrioritizedSweeping`] agent
#[derive(Debug, Clone)]
pub struct PrioritizedSweepingConfig<D: Decay = decay::Constant> {
    pub exploration: EpsilonGreedy<D>,
    pub alpha: LearningRate,
    /// Pairs whose backup would move Q by at most this much are not queued
    pub theta: f64,
    /// Maximum queued backups per real step
    pub n: usize,
}

impl Default for PrioritizedSweepingConfig {
    fn default() -> Self {
        Self {
            exploration: EpsilonGreedy::default().with_tie_break(TieBreak::Random),
            alpha: |_, _| 0.1,
            theta: 1e-4,
            n: 10,
        }
    }
}

/// Observed `(next, reward)` outcome counts of one state-action pair
#[derive(Debug, Clone, Default)]
struct Outcomes {
    counts: BTreeMap<(State, OrderedFloat<f64>), u64>,
}

impl Outcomes {
    fn record(&mut self, next: State, reward: f64) {
        *self.counts.entry((next, OrderedFloat(reward))).or_insert(0) += 1;
    }

    /// Draw an outcome with probability proportional to how often it was observed out of `total`
    fn draw<R: Rng + ?Sized>(&self, total: u64, rng: &mut R) -> Result<(&State, f64)> {
        if total == 0 {
            return Err(Error::Empty("outcome model"));
        }
        let mut remaining = rng.gen_range(0..total);
        for ((next, reward), &count) in &self.counts {
            if remaining < count {
                return Ok((next, reward.0));
            }
            remaining -= count;
        }
        Err(Error::Empty("outcome model"))
    }

    /// Mean reward of the observed outcomes that led to `next`
    fn expected_reward(&self, next: &State) -> Result<f64> {
        let (sum, mass) = self
            .counts
            .iter()
            .filter(|((s, _), _)| s == next)
            .fold((0.0, 0), |(sum, mass), ((_, r), &c)| {
                (sum + r.0 * c as f64, mass + c)
            });
        if mass == 0 {
            return Err(Error::Empty("outcome set"));
        }
        Ok(sum / mass as f64)
    }
}

#[derive(Debug)]
struct Entry {
    priority: OrderedFloat<f64>,
    seq: u64,
    state: State,
    action: Action,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Max-priority queue of pending backups, first in first out among equal priorities
#[derive(Debug, Default)]
struct SweepQueue {
    heap: BinaryHeap<Entry>,
    seq: u64,
}

impl SweepQueue {
    fn push(&mut self, priority: f64, state: State, action: Action) {
        self.heap.push(Entry {
            priority: OrderedFloat(priority),
            seq: self.seq,
            state,
            action,
        });
        self.seq += 1;
    }

    fn pop(&mut self) -> Option<(State, Action)> {
        self.heap.pop().map(|e| (e.state, e.action))
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

/// Prioritized sweeping agent for stochastic environments
///
/// Keeps a frequency model of observed outcomes and, after every real step, backs up the
/// state-action pairs whose values are most likely to change, propagating backwards through
/// the predecessors of each updated state.
pub struct PrioritizedSweeping<D: Decay = decay::Constant> {
    config: PrioritizedSweepingConfig<D>,
    policy: IndexedPolicy,
    q: QFunc<f64>,
    v: VFunc<f64>,
    model: QFunc<Outcomes>,
    visits: QFunc<u64>,
    predecessors: VFunc<BTreeSet<(State, Action)>>,
    queue: SweepQueue,
    episode: usize,
}

impl<D: Decay> PrioritizedSweeping<D> {
    /// Initialize a new `PrioritizedSweeping` agent for `mdp`
    pub fn new<M: Mdp + ?Sized>(mdp: &M, config: PrioritizedSweepingConfig<D>) -> Result<Self> {
        let states = mdp.states();
        Ok(Self {
            config,
            policy: IndexedPolicy::uniform(states)?,
            q: QFunc::new(states, || 0.0),
            v: VFunc::new(states, || 0.0),
            model: QFunc::new(states, Outcomes::default),
            visits: QFunc::new(states, || 0),
            predecessors: VFunc::new(states, BTreeSet::new),
            queue: SweepQueue::default(),
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
            steps += 1;

            self.config
                .exploration
                .apply(&mut self.policy, &self.q, &s, self.episode, rng)?;
            let a = self.policy.invoke(&s, rng)?;
            let Possible { next, reward } = a.sample(mdp, rng)?;
            self.model.get_mut(&a)?.record(next.clone(), reward);
            self.visits.accumulate(&a, 1)?;
            self.predecessors
                .get_mut(&next)?
                .insert((s.clone(), a.clone()));

            let target = reward + gamma * max_action_value(&self.q, &next)?;
            let priority = (target - *self.q.get(&a)?).abs();
            if priority > self.config.theta {
                self.queue.push(priority, s.clone(), a);
            }

            for _ in 0..self.config.n {
                let Some((sq, aq)) = self.queue.pop() else {
                    break;
                };
                self.sweep(&sq, &aq, gamma, rng)?;
            }
            trace!("queued={}", self.queue.len());
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

    /// Back up a queued pair from a modeled outcome, then queue its predecessors
    fn sweep<R>(&mut self, s: &State, a: &Action, gamma: f64, rng: &mut R) -> Result<()>
    where
        R: Rng + ?Sized,
    {
        let total = *self.visits.get(a)?;
        let (next, reward) = {
            let (next, reward) = self.model.get(a)?.draw(total, rng)?;
            (next.clone(), reward)
        };
        let alpha = (self.config.alpha)(s, a);
        q_learning_update(&mut self.q, a, alpha, reward, gamma, &next)?;

        let discounted = gamma * max_action_value(&self.q, s)?;
        for (s_pre, a_pre) in self.predecessors.get(s)? {
            let reward = self.model.get(a_pre)?.expected_reward(s)?;
            let priority = (reward + discounted - *self.q.get(a_pre)?).abs();
            if priority > self.config.theta {
                self.queue.push(priority, s_pre.clone(), a_pre.clone());
            }
        }
        Ok(())
    }

    pub fn q(&self) -> &QFunc<f64> {
        &self.q
    }

    /// Number of real visits to `action`
    pub fn visits(&self, action: &Action) -> Result<u64> {
        self.visits.get(action).copied()
    }

    /// Observed `(state, action)` pairs that led to `state`
    pub fn predecessors(&self, state: &State) -> Result<&BTreeSet<(State, Action)>> {
        self.predecessors.get(state)
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
