use ndarray::Array1;

use crate::{
    ds::NSet,
    error::Result,
    mdp::{Action, State},
    tabular::{ActionValue, QFunc},
};

mod tile_coding;

pub use tile_coding::SimpleTileCoding;

/// A differentiable action-value approximator `q(s, a; w)`
///
/// Its value is read through [`ActionValue`].
pub trait ApproxQ: ActionValue {
    /// `∇_w q(s, a; w)`
    fn gradient(&self, state: &State, action: &Action) -> Result<Array1<f64>>;

    fn weights(&self) -> &Array1<f64>;

    fn weights_mut(&mut self) -> &mut Array1<f64>;
}

/// A fixed feature map `x(s, a)`
pub trait Feature {
    /// Number of components in every feature vector
    fn len(&self) -> usize;

    fn features(&self, state: &State, action: &Action) -> Result<Array1<f64>>;
}

/// Linear approximator `q(s, a; w) = w · x(s, a)`
#[derive(Debug, Clone)]
pub struct LinearFunc<F: Feature> {
    feature: F,
    w: Array1<f64>,
}

impl<F: Feature> LinearFunc<F> {
    /// Zero-initialized weights sized to `feature`
    pub fn new(feature: F) -> Self {
        let w = Array1::zeros(feature.len());
        Self { feature, w }
    }

    pub fn feature(&self) -> &F {
        &self.feature
    }
}

impl<F: Feature> ActionValue for LinearFunc<F> {
    fn action_value(&self, state: &State, action: &Action) -> Result<f64> {
        Ok(self.w.dot(&self.feature.features(state, action)?))
    }
}

impl<F: Feature> ApproxQ for LinearFunc<F> {
    fn gradient(&self, state: &State, action: &Action) -> Result<Array1<f64>> {
        self.feature.features(state, action)
    }

    fn weights(&self) -> &Array1<f64> {
        &self.w
    }

    fn weights_mut(&mut self) -> &mut Array1<f64> {
        &mut self.w
    }
}

/// One component per state-action pair, so a linear approximator over it is exactly a table
#[derive(Debug, Clone)]
pub struct OneHot {
    positions: QFunc<usize>,
    len: usize,
}

impl OneHot {
    pub fn new(states: &NSet<State>) -> Self {
        let mut len = 0;
        let positions = QFunc::new(states, || {
            len += 1;
            len - 1
        });
        Self { positions, len }
    }
}

impl Feature for OneHot {
    fn len(&self) -> usize {
        self.len
    }

    fn features(&self, _state: &State, action: &Action) -> Result<Array1<f64>> {
        let mut x = Array1::zeros(self.len);
        x[*self.positions.get(action)?] = 1.0;
        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn states() -> NSet<State> {
        NSet::from_vec(vec![State::new(vec![0], 2), State::new(vec![1], 3)])
    }

    #[test]
    fn one_hot_positions_are_distinct() {
        let states = states();
        let feature = OneHot::new(&states);
        assert_eq!(feature.len(), 5);

        let mut seen = vec![0.0; 5];
        for s in &states {
            for a in s.actions() {
                let x = feature.features(s, &a).unwrap();
                assert_eq!(x.sum(), 1.0, "exactly one component set");
                seen.iter_mut().zip(x.iter()).for_each(|(acc, xi)| *acc += xi);
            }
        }
        assert_eq!(seen, vec![1.0; 5], "every component used once");
    }

    #[test]
    fn linear_func_over_one_hot_reads_weights() {
        let states = states();
        let mut q = LinearFunc::new(OneHot::new(&states));
        let s = states.get(&[1]).unwrap();
        let a = s.action(2).unwrap();

        let grad = q.gradient(s, &a).unwrap();
        q.weights_mut().scaled_add(3.0, &grad);
        assert_eq!(q.action_value(s, &a).unwrap(), 3.0);
        assert_eq!(q.action_value(s, &s.action(0).unwrap()).unwrap(), 0.0);
        assert_eq!(q.weights().sum(), 3.0, "only one weight moved");
    }
}
