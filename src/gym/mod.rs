mod corridor;
mod k_armed_bandit;
mod random_walk;

pub use corridor::corridor;
pub use k_armed_bandit::KArmedBandit;
pub use random_walk::random_walk;
