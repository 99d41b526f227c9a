mod dyna_q_plus;
mod prioritized_sweeping;

pub use dyna_q_plus::{DynaQPlus, DynaQPlusConfig, ModelEntry};
pub use prioritized_sweeping::{PrioritizedSweeping, PrioritizedSweepingConfig};

use crate::{
    assert_interval,
    error::Result,
    mdp::{Action, State},
    tabular::{max_action_value, QFunc},
};

/// One-step Q-learning backup
///
/// `Q[s,a] += α·(reward + γ·max_a' Q[next,a'] − Q[s,a])`
fn q_learning_update(
    q: &mut QFunc<f64>,
    action: &Action,
    alpha: f64,
    reward: f64,
    gamma: f64,
    next: &State,
) -> Result<()> {
    assert_interval!(alpha, 0.0, 1.0);
    let target = reward + gamma * max_action_value(q, next)?;
    let current = *q.get(action)?;
    q.accumulate(action, alpha * (target - current))
}
