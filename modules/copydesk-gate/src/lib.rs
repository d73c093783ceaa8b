pub mod gate;
pub mod log;

pub use gate::{EditorialGate, GateConfig, GateStage};
pub use log::{DecisionLog, InMemoryDecisionLog};
