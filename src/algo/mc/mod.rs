mod exploring_starts;

pub use exploring_starts::ExploringStarts;
