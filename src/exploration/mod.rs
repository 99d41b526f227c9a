mod epsilon_greedy;

pub use epsilon_greedy::{apply_epsilon_greedy, EpsilonGreedy, TieBreak};
