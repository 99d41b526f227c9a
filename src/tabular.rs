use std::ops::AddAssign;

use crate::{
    ds::NSet,
    error::Result,
    mdp::{Action, State},
};

mod policy;

pub use policy::{IndexedPolicy, Policy};

/// An action-value table with one cell per state-action pair
///
/// Shaped from a state set so that the state at index `i` owns a row of `n_actions` cells at
/// `i ++ [slot]`. Rows of different states may have different lengths.
#[derive(Debug, Clone)]
pub struct QFunc<T> {
    table: NSet<T>,
}

impl<T> QFunc<T> {
    /// Build a table over `states`, filling every cell with `default()`
    pub fn new(states: &NSet<State>, mut default: impl FnMut() -> T) -> Self {
        Self {
            table: states.expand(|_, s| vec![s.n_actions()], |_| default()),
        }
    }

    /// Build a table with the same shape as `other`, filling each cell with `element(index)`
    pub fn copy_shape<U>(other: &QFunc<U>, element: impl FnMut(&[usize]) -> T) -> Self {
        Self {
            table: NSet::copy_shape(&other.table, element),
        }
    }

    pub fn get(&self, action: &Action) -> Result<&T> {
        self.at(action.index())
    }

    pub fn get_mut(&mut self, action: &Action) -> Result<&mut T> {
        Ok(self.table.get_mut(action.index())?)
    }

    pub fn set(&mut self, action: &Action, value: T) -> Result<()> {
        Ok(self.table.set(action.index(), value)?)
    }

    /// Read a cell by its raw state-action index
    pub fn at(&self, index: &[usize]) -> Result<&T> {
        Ok(self.table.get(index)?)
    }

    /// Replace every cell with `f(index, cell)`
    pub fn map_in_place(&mut self, f: impl FnMut(&[usize], &T) -> T) {
        self.table.map_in_place(f);
    }

    pub fn table(&self) -> &NSet<T> {
        &self.table
    }
}

impl<T: AddAssign> QFunc<T> {
    /// `Q[s,a] += delta`
    pub fn accumulate(&mut self, action: &Action, delta: T) -> Result<()> {
        *self.get_mut(action)? += delta;
        Ok(())
    }
}

/// A state-value table with one cell per state
#[derive(Debug, Clone)]
pub struct VFunc<T> {
    table: NSet<T>,
}

impl<T> VFunc<T> {
    /// Build a table over `states`, filling every cell with `default()`
    pub fn new(states: &NSet<State>, mut default: impl FnMut() -> T) -> Self {
        Self {
            table: NSet::copy_shape(states, |_| default()),
        }
    }

    pub fn get(&self, state: &State) -> Result<&T> {
        Ok(self.table.get(state.index())?)
    }

    pub fn get_mut(&mut self, state: &State) -> Result<&mut T> {
        Ok(self.table.get_mut(state.index())?)
    }

    pub fn set(&mut self, state: &State, value: T) -> Result<()> {
        Ok(self.table.set(state.index(), value)?)
    }

    pub fn map_in_place(&mut self, f: impl FnMut(&[usize], &T) -> T) {
        self.table.map_in_place(f);
    }

    pub fn table(&self) -> &NSet<T> {
        &self.table
    }
}

impl<T: AddAssign> VFunc<T> {
    pub fn accumulate(&mut self, state: &State, delta: T) -> Result<()> {
        *self.get_mut(state)? += delta;
        Ok(())
    }
}

/// Anything that can score a state-action pair
pub trait ActionValue {
    fn action_value(&self, state: &State, action: &Action) -> Result<f64>;
}

impl ActionValue for QFunc<f64> {
    fn action_value(&self, _state: &State, action: &Action) -> Result<f64> {
        self.get(action).copied()
    }
}

/// `max_a Q[s,a]`, defined as `0` when `state` has no actions
pub fn max_action_value<Q: ActionValue + ?Sized>(q: &Q, state: &State) -> Result<f64> {
    let mut best: Option<f64> = None;
    for action in state.actions() {
        let value = q.action_value(state, &action)?;
        best = Some(best.map_or(value, |b| b.max(value)));
    }
    Ok(best.unwrap_or(0.0))
}

/// Set `V[s] = max_a Q[s,a]` for every state in `states`
pub fn v_from_q<Q: ActionValue + ?Sized>(
    states: &NSet<State>,
    q: &Q,
    v: &mut VFunc<f64>,
) -> Result<()> {
    for s in states {
        v.set(s, max_action_value(q, s)?)?;
    }
    Ok(())
}
