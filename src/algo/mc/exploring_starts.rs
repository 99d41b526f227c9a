use log::debug;
use rand::Rng;

use crate::{
    algo::OptimalSolution,
    ds::NSet,
    error::Result,
    mdp::{Action, Mdp, Possible, State},
    tabular::{v_from_q, IndexedPolicy, Policy, QFunc, VFunc},
    util::argmax,
};

/// First-visit Monte Carlo control with exploring starts
///
/// Each episode begins from a state drawn from the MDP's start distribution with a uniformly
/// random first action, then follows the current policy. After the episode, the return
/// following the first visit of every state-action pair is added to that pair's running
/// total, and every state seen is made deterministic on its best mean return.
///
/// The policy is followed without exploration after the first action, so the MDP must
/// terminate under every deterministic policy.
#[derive(Debug, Clone)]
pub struct ExploringStarts {
    policy: IndexedPolicy,
    /// Sum of first-visit returns
    q: QFunc<f64>,
    count: QFunc<u32>,
    /// Return accumulated before the first visit in the current episode
    baseline: QFunc<Option<f64>>,
    episode: usize,
}

impl ExploringStarts {
    /// Start from the uniform policy
    pub fn new<M: Mdp + ?Sized>(mdp: &M) -> Result<Self> {
        Ok(Self::with_policy(mdp, IndexedPolicy::uniform(mdp.states())?))
    }

    pub fn with_policy<M: Mdp + ?Sized>(mdp: &M, policy: IndexedPolicy) -> Self {
        let q = QFunc::new(mdp.states(), || 0.0);
        Self {
            policy,
            count: QFunc::copy_shape(&q, |_| 0),
            baseline: QFunc::copy_shape(&q, |_| None),
            q,
            episode: 0,
        }
    }

    /// Generate one episode and fold its returns into the estimates
    pub fn go<M, R>(&mut self, mdp: &M, rng: &mut R) -> Result<()>
    where
        M: Mdp + ?Sized,
        R: Rng + ?Sized,
    {
        let s = mdp.started(rng)?;
        if s.is_terminal() {
            self.episode += 1;
            return Ok(());
        }
        let a = s.random_action(rng)?;
        let mut visited: Vec<(State, Action)> = Vec::new();
        let total = match self.generate(mdp, s, a, &mut visited, rng) {
            Ok(total) => total,
            Err(err) => {
                for (_, a) in &visited {
                    self.baseline.set(a, None)?;
                }
                return Err(err);
            }
        };

        let mut touched: Vec<State> = Vec::new();
        for (s, a) in visited {
            let before = self.baseline.get_mut(&a)?.take().unwrap_or(0.0);
            self.q.accumulate(&a, total - before)?;
            self.count.accumulate(&a, 1)?;
            if !touched.contains(&s) {
                touched.push(s);
            }
        }
        for s in &touched {
            self.make_greedy(s)?;
        }
        self.episode += 1;
        Ok(())
    }

    /// Follow the policy from `(s, a)` to termination, marking first visits in `visited`,
    /// and return the undiscounted total reward
    fn generate<M, R>(
        &mut self,
        mdp: &M,
        mut s: State,
        mut a: Action,
        visited: &mut Vec<(State, Action)>,
        rng: &mut R,
    ) -> Result<f64>
    where
        M: Mdp + ?Sized,
        R: Rng + ?Sized,
    {
        let mut total = 0.0;
        let mut steps = 0;
        loop {
            let baseline = self.baseline.get_mut(&a)?;
            if baseline.is_none() {
                *baseline = Some(total);
                visited.push((s, a.clone()));
            }
            let Possible { next, reward } = a.sample(mdp, rng)?;
            total += reward;
            steps += 1;
            s = next;
            if s.is_terminal() {
                break;
            }
            a = self.policy.invoke(&s, rng)?;
        }
        debug!("steps={steps} return={total}");
        Ok(total)
    }

    /// Run `episodes` episodes
    pub fn run<M, R>(&mut self, mdp: &M, episodes: usize, rng: &mut R) -> Result<()>
    where
        M: Mdp + ?Sized,
        R: Rng + ?Sized,
    {
        for episode in 0..episodes {
            debug!("{episode}/{episodes}");
            self.go(mdp, rng)?;
        }
        Ok(())
    }

    /// Put all of `state`'s probability on its best mean return
    fn make_greedy(&mut self, state: &State) -> Result<()> {
        let means = state
            .actions()
            .map(|a| self.mean(&a))
            .collect::<Result<Vec<_>>>()?;
        let Some(best) = argmax(means) else {
            return Ok(());
        };
        for a in state.actions() {
            let p = if a.slot() == best { 1.0 } else { 0.0 };
            self.policy.set(&a, p)?;
        }
        Ok(())
    }

    /// Mean first-visit return, or the raw total when never visited
    fn mean(&self, action: &Action) -> Result<f64> {
        let total = *self.q.get(action)?;
        Ok(match *self.count.get(action)? {
            0 => total,
            n => total / n as f64,
        })
    }

    /// Number of completed episodes
    pub fn episodes(&self) -> usize {
        self.episode
    }

    pub fn count(&self, action: &Action) -> Result<u32> {
        self.count.get(action).copied()
    }

    pub fn policy(&self) -> &IndexedPolicy {
        &self.policy
    }

    /// Mean returns as Q, with V the row maxima of Q
    pub fn solution(&self, states: &NSet<State>) -> Result<OptimalSolution> {
        let mut q = self.q.clone();
        q.map_in_place(|ix, total| match self.count.at(ix) {
            Ok(&n) if n > 0 => total / n as f64,
            _ => *total,
        });
        let mut v = VFunc::new(states, || 0.0);
        v_from_q(states, &q, &mut v)?;
        Ok(OptimalSolution {
            policy: self.policy.clone(),
            v,
            q,
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{error::Error, mdp::FiniteMdp};

    /// `a --(r=1)--> b --(r=2)--> end`, one action each, starting anywhere
    fn chain() -> FiniteMdp {
        let mut mdp = FiniteMdp::new(1.0, &[3], |ix| usize::from(ix[0] < 2));
        mdp.add_transition(&[0], 0, &[1], 1.0, 1.0).unwrap();
        mdp.add_transition(&[1], 0, &[2], 2.0, 1.0).unwrap();
        mdp.add_start(&[0], 1.0).unwrap();
        mdp.add_start(&[1], 1.0).unwrap();
        mdp
    }

    /// State `a` can step to `b` for 1 or quit for 0; `b` quits for 2 or -1
    fn choice() -> FiniteMdp {
        let mut mdp = FiniteMdp::new(1.0, &[3], |ix| if ix[0] < 2 { 2 } else { 0 });
        mdp.add_transition(&[0], 0, &[1], 1.0, 1.0).unwrap();
        mdp.add_transition(&[0], 1, &[2], 0.0, 1.0).unwrap();
        mdp.add_transition(&[1], 0, &[2], 2.0, 1.0).unwrap();
        mdp.add_transition(&[1], 1, &[2], -1.0, 1.0).unwrap();
        mdp.add_start(&[0], 1.0).unwrap();
        mdp.add_start(&[1], 1.0).unwrap();
        mdp
    }

    #[test]
    fn q_is_the_mean_first_visit_return() {
        let mut rng = StdRng::seed_from_u64(0);
        let mdp = chain();
        let mut agent = ExploringStarts::new(&mdp).unwrap();
        agent.run(&mdp, 50, &mut rng).unwrap();

        let a = mdp.state(&[0]).unwrap().action(0).unwrap();
        let b = mdp.state(&[1]).unwrap().action(0).unwrap();
        assert_eq!(agent.count(&b).unwrap(), 50, "b is visited every episode");
        assert!(agent.count(&a).unwrap() > 0);

        let solution = agent.solution(mdp.states()).unwrap();
        assert_eq!(*solution.q.get(&a).unwrap(), 3.0, "return from a");
        assert_eq!(*solution.q.get(&b).unwrap(), 2.0, "return from b");
        assert_eq!(*solution.v.get(mdp.state(&[0]).unwrap()).unwrap(), 3.0);
        assert_eq!(*solution.v.get(mdp.state(&[2]).unwrap()).unwrap(), 0.0);
    }

    #[test]
    fn policy_becomes_deterministic_on_the_best_action() {
        let mut rng = StdRng::seed_from_u64(1);
        let mdp = choice();
        let mut agent = ExploringStarts::new(&mdp).unwrap();
        agent.run(&mdp, 200, &mut rng).unwrap();
        let solution = agent.solution(mdp.states()).unwrap();

        let b = mdp.state(&[1]).unwrap();
        assert_eq!(*solution.q.get(&b.action(0).unwrap()).unwrap(), 2.0);
        assert_eq!(*solution.q.get(&b.action(1).unwrap()).unwrap(), -1.0);
        assert_eq!(*solution.q.get(&mdp.state(&[0]).unwrap().action(1).unwrap()).unwrap(), 0.0);

        for (state, best) in [(0, 0), (1, 0)] {
            let s = mdp.state(&[state]).unwrap();
            for a in s.actions() {
                let expected = if a.slot() == best { 1.0 } else { 0.0 };
                assert_eq!(
                    agent.policy().prob(&a).unwrap(),
                    expected,
                    "state {state} slot {}",
                    a.slot()
                );
            }
        }
    }

    #[test]
    fn untouched_states_keep_their_policy() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut mdp = FiniteMdp::new(1.0, &[3], |ix| if ix[0] < 2 { 2 } else { 0 });
        for slot in 0..2 {
            mdp.add_transition(&[0], slot, &[2], 1.0, 1.0).unwrap();
            mdp.add_transition(&[1], slot, &[2], 1.0, 1.0).unwrap();
        }
        mdp.add_start(&[0], 1.0).unwrap();

        let mut agent = ExploringStarts::new(&mdp).unwrap();
        agent.run(&mdp, 5, &mut rng).unwrap();
        let s = mdp.state(&[1]).unwrap();
        for a in s.actions() {
            assert_eq!(agent.policy().prob(&a).unwrap(), 0.5, "state 1 is never visited");
        }
    }

    #[test]
    fn failed_episode_leaves_no_visit_marks() {
        let mut rng = StdRng::seed_from_u64(3);
        // `b` has an action but no outcome for it yet
        let mut mdp = FiniteMdp::new(1.0, &[3], |ix| usize::from(ix[0] < 2));
        mdp.add_transition(&[0], 0, &[1], 1.0, 1.0).unwrap();
        mdp.add_start(&[0], 1.0).unwrap();

        let mut agent = ExploringStarts::new(&mdp).unwrap();
        assert!(matches!(agent.go(&mdp, &mut rng), Err(Error::NoTransitions(_))));
        let a = mdp.state(&[0]).unwrap().action(0).unwrap();
        let b = mdp.state(&[1]).unwrap().action(0).unwrap();
        assert_eq!(*agent.baseline.get(&a).unwrap(), None);
        assert_eq!(*agent.baseline.get(&b).unwrap(), None);
        assert_eq!(agent.count(&a).unwrap(), 0);
        assert_eq!(agent.episodes(), 0);

        mdp.add_transition(&[1], 0, &[2], 2.0, 1.0).unwrap();
        agent.go(&mdp, &mut rng).unwrap();
        assert_eq!(agent.count(&a).unwrap(), 1, "a counts as a first visit again");
        assert_eq!(agent.count(&b).unwrap(), 1);
        let solution = agent.solution(mdp.states()).unwrap();
        assert_eq!(*solution.q.get(&a).unwrap(), 3.0);
    }
}
