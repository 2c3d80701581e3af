pub mod decider;
pub mod scorer;
pub mod state;

pub use decider::{InterventionDecider, InterventionMode, RollSource, ThreadRoll};
pub use scorer::{ScoreBreakdown, Signal, score};
pub use state::InterventionState;
