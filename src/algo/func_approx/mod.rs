mod expected_sarsa;

pub use expected_sarsa::{
    expected_value, AverageRewardExpectedSarsa, ExpectedSarsa, ExpectedSarsaConfig,
};
